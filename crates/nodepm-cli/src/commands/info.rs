//! `nodepm detect` and `nodepm run-command`.

use miette::Result;
use nodepm_core::pm::{Backend, Capabilities, CommandExecutor, PackageManager};
use serde::Serialize;

#[derive(Serialize)]
struct DetectResult {
    ok: bool,
    backend: Backend,
    binary: &'static str,
    available: bool,
    cwd: String,
    capabilities: Capabilities,
}

pub fn detect<E: CommandExecutor>(pm: &PackageManager<E>, json: bool) -> Result<()> {
    let backend = pm.backend();
    let result = DetectResult {
        ok: true,
        backend,
        binary: backend.binary(),
        available: backend.is_available(),
        cwd: pm.cwd().display().to_string(),
        capabilities: pm.capabilities(),
    };

    if json {
        return super::print_json(&result);
    }

    println!("{}", result.backend);
    if !result.available {
        eprintln!("warning: `{}` was not found on PATH", result.binary);
    }
    let caps = result.capabilities;
    for (name, supported) in [
        ("list installed", caps.list_installed),
        ("version lookup", caps.version_lookup),
        ("error parsing", caps.error_parsing),
    ] {
        if !supported {
            println!("  {name}: not supported");
        }
    }
    Ok(())
}

pub fn run_command<E: CommandExecutor>(
    pm: &PackageManager<E>,
    script: &str,
    json: bool,
) -> Result<()> {
    let command = pm.get_run_command(script);
    if json {
        super::print_json(&serde_json::json!({ "ok": true, "command": command }))
    } else {
        println!("{command}");
        Ok(())
    }
}
