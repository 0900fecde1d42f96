//! `nodepm add`, `remove`, `install` and `init`.
//!
//! These change the project, so they report what ran and nothing else. On
//! failure the captured log stays behind and the error names it.

use miette::Result;
use nodepm_core::pm::{CommandExecutor, PackageIdentity, PackageManager, PmError};
use serde::Serialize;

#[derive(Serialize)]
struct ChangeResult<'a> {
    ok: bool,
    action: &'static str,
    backend: String,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    packages: &'a [String],
}

fn report<E: CommandExecutor>(
    pm: &PackageManager<E>,
    action: &'static str,
    packages: &[String],
    json: bool,
) -> Result<()> {
    if json {
        return super::print_json(&ChangeResult {
            ok: true,
            action,
            backend: pm.backend().to_string(),
            packages,
        });
    }
    if packages.is_empty() {
        eprintln!("{action}: done");
    } else {
        eprintln!("{action}: {}", packages.join(", "));
    }
    Ok(())
}

/// Reject anything that is not `name` or `name@range` before running the tool.
fn parse_specs(specs: &[String]) -> Result<Vec<PackageIdentity>, PmError> {
    specs.iter().map(|spec| PackageIdentity::parse(spec)).collect()
}

pub fn add<E: CommandExecutor>(
    pm: &PackageManager<E>,
    dependencies: &[String],
    dev: bool,
    json: bool,
) -> Result<()> {
    let ids = super::or_fail(parse_specs(dependencies), json);

    let result = super::block_on(pm.add_dependencies(&ids, dev))?;
    super::or_fail(result, json);
    report(pm, "added", dependencies, json)
}

pub fn remove<E: CommandExecutor>(
    pm: &PackageManager<E>,
    dependencies: &[String],
    json: bool,
) -> Result<()> {
    let ids = super::or_fail(parse_specs(dependencies), json);

    let result = super::block_on(pm.remove_dependencies(&ids))?;
    super::or_fail(result, json);
    report(pm, "removed", dependencies, json)
}

pub fn install<E: CommandExecutor>(pm: &PackageManager<E>, json: bool) -> Result<()> {
    let result = super::block_on(pm.run_install())?;
    super::or_fail(result, json);
    report(pm, "installed", &[], json)
}

pub fn init<E: CommandExecutor>(pm: &PackageManager<E>, json: bool) -> Result<()> {
    let result = super::block_on(pm.init_project())?;
    super::or_fail(result, json);
    report(pm, "initialized", &[], json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_specs() {
        let ok = vec![
            "react".to_string(),
            "react@^18.0.0".to_string(),
            "@types/node@20".to_string(),
        ];
        let ids = parse_specs(&ok).unwrap();
        assert_eq!(ids[2].name, "@types/node");
        assert_eq!(ids[1].version.as_deref(), Some("^18.0.0"));

        for bad in [String::new(), "-g".to_string()] {
            assert!(matches!(
                parse_specs(&["react".to_string(), bad]),
                Err(PmError::InvalidSpec(_))
            ));
        }
    }
}
