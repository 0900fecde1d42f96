//! `nodepm versions`, `find` and `manifest`.

use miette::Result;
use nodepm_core::pm::{CommandExecutor, PackageManager, VersionLookup, VersionQuery};

pub fn versions<E: CommandExecutor>(
    pm: &PackageManager<E>,
    name: &str,
    all: bool,
    json: bool,
) -> Result<()> {
    let query = if all {
        VersionQuery::All
    } else {
        VersionQuery::Latest
    };

    let result = super::block_on(pm.get_installed_versions(name, query))?;
    let lookup = super::or_fail(result, json);

    if json {
        return super::print_json(&serde_json::json!({
            "ok": true,
            "name": name,
            "versions": lookup,
        }));
    }

    match lookup {
        VersionLookup::Latest(v) if v.is_empty() => {
            eprintln!("version lookup is not supported by {}", pm.backend());
        }
        VersionLookup::Latest(v) => println!("{v}"),
        VersionLookup::All(list) if list.is_empty() && !pm.capabilities().version_lookup => {
            eprintln!("version lookup is not supported by {}", pm.backend());
        }
        VersionLookup::All(list) => {
            for v in list {
                println!("{v}");
            }
        }
    }
    Ok(())
}

pub fn find<E: CommandExecutor>(
    pm: &PackageManager<E>,
    patterns: &[String],
    json: bool,
) -> Result<()> {
    let found = super::block_on(pm.find_installed_packages(patterns))?;

    if json {
        return super::print_json(&serde_json::json!({
            "ok": true,
            "installations": found,
        }));
    }

    let Some(meta) = found else {
        eprintln!(
            "could not list installed packages with {}",
            pm.backend().binary()
        );
        return Ok(());
    };

    if meta.dependencies.is_empty() {
        println!("no installed packages match {}", patterns.join(", "));
        return Ok(());
    }

    for (name, installs) in &meta.dependencies {
        let versions: Vec<&str> = installs.iter().map(|p| p.version.as_str()).collect();
        println!("{name} {}", versions.join(", "));
    }

    if meta.has_duplicates() {
        println!();
        println!("duplicated:");
        for (name, versions) in &meta.duplicated_dependencies {
            println!("  {name}: {}", versions.join(", "));
        }
        println!();
        println!("inspect with `{}`", meta.info_command);
        println!("try `{}` to deduplicate", meta.dedupe_command);
    }
    Ok(())
}

pub fn manifest<E: CommandExecutor>(
    pm: &PackageManager<E>,
    name: &str,
    json: bool,
) -> Result<()> {
    let doc = super::or_fail(pm.get_package_manifest(name, None), json);

    if json {
        return super::print_json(&serde_json::json!({
            "ok": true,
            "name": name,
            "manifest": doc,
        }));
    }

    match doc {
        Some(doc) => super::print_json(&doc),
        None => {
            eprintln!("{name} is not installed");
            std::process::exit(1);
        }
    }
}
