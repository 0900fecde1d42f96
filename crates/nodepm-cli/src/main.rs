#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::uninlined_format_args)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use nodepm_core::pm::{Backend, PackageManager};
use nodepm_core::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "nodepm")]
#[command(author, version, about = "One command line over npm, yarn, pnpm and bun", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Force a package manager (npm, yarn1, yarn2, pnpm, bun)
    #[arg(long, global = true, value_name = "NAME")]
    pm: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Show the package manager used for the project
    Detect,

    /// Print the command that runs a package.json script
    RunCommand {
        /// Script name
        script: String,
    },

    /// Run a package.json script
    Run {
        /// Script name
        script: String,

        /// Arguments to pass to the script (after --)
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Add dependencies
    Add {
        /// Package specs (name or name@range)
        #[arg(required = true)]
        dependencies: Vec<String>,

        /// Save as devDependencies
        #[arg(short = 'D', long)]
        dev: bool,
    },

    /// Remove dependencies
    Remove {
        /// Package names
        #[arg(required = true)]
        dependencies: Vec<String>,
    },

    /// Install from package.json and the lockfile
    Install,

    /// Create a package.json with the package manager's defaults
    Init,

    /// Look up published versions of a package
    Versions {
        /// Package name
        name: String,

        /// List every published version instead of the latest
        #[arg(long)]
        all: bool,
    },

    /// List installed packages and report duplicated versions
    Find {
        /// Package name patterns (`*` matches any substring)
        #[arg(required = true)]
        patterns: Vec<String>,
    },

    /// Print the package.json of an installed package
    Manifest {
        /// Package name
        name: String,
    },

    /// List every declared dependency of the project
    Deps,

    /// Pin versions through the package manager's override field
    Resolutions {
        /// Pins as name@version
        #[arg(required = true)]
        pins: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Version) {
        return commands::version::run(cli.json);
    }

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    logging::init(cli.verbose, cli.json);

    let config = match Config::discover(cwd) {
        Ok(config) => config,
        Err(e) => commands::fail(&e, cli.json),
    };

    let forced = match cli.pm.as_deref().map(str::parse::<Backend>).transpose() {
        Ok(forced) => forced,
        Err(e) => commands::fail(&e, cli.json),
    };

    let backend = forced.or(config.package_manager);
    let config = config
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json)
        .with_package_manager(backend);

    let pm = PackageManager::system(config);
    tracing::debug!(backend = %pm.backend(), "dispatching");

    match cli.command {
        Commands::Version => commands::version::run(cli.json),
        Commands::Detect => commands::info::detect(&pm, cli.json),
        Commands::RunCommand { script } => commands::info::run_command(&pm, &script, cli.json),
        Commands::Run { script, args } => commands::run::run(&pm, &script, &args, cli.json),
        Commands::Add { dependencies, dev } => {
            commands::install::add(&pm, &dependencies, dev, cli.json)
        }
        Commands::Remove { dependencies } => commands::install::remove(&pm, &dependencies, cli.json),
        Commands::Install => commands::install::install(&pm, cli.json),
        Commands::Init => commands::install::init(&pm, cli.json),
        Commands::Versions { name, all } => commands::query::versions(&pm, &name, all, cli.json),
        Commands::Find { patterns } => commands::query::find(&pm, &patterns, cli.json),
        Commands::Manifest { name } => commands::query::manifest(&pm, &name, cli.json),
        Commands::Deps => commands::deps::list(&pm, cli.json),
        Commands::Resolutions { pins } => commands::deps::resolutions(&pm, &pins, cli.json),
    }
}
