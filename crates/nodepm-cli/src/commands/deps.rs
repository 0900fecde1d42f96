//! `nodepm deps` and `nodepm resolutions`.

use miette::Result;
use nodepm_core::pm::{CommandExecutor, PackageIdentity, PackageManager, PmError};
use std::collections::BTreeMap;

pub fn list<E: CommandExecutor>(pm: &PackageManager<E>, json: bool) -> Result<()> {
    let deps = super::or_fail(pm.get_all_dependencies(), json);

    if json {
        return super::print_json(&serde_json::json!({
            "ok": true,
            "dependencies": deps,
        }));
    }

    for (name, range) in &deps {
        println!("{name}@{range}");
    }
    Ok(())
}

/// Parse `name@version` pins. A pin without a version is rejected.
fn parse_pins(pins: &[String]) -> Result<BTreeMap<String, String>, PmError> {
    let mut versions = BTreeMap::new();
    for pin in pins {
        let id = PackageIdentity::parse(pin)?;
        let Some(version) = id.version else {
            return Err(PmError::InvalidSpec(format!(
                "'{pin}' has no version to pin"
            )));
        };
        versions.insert(id.name, version);
    }
    Ok(versions)
}

pub fn resolutions<E: CommandExecutor>(
    pm: &PackageManager<E>,
    pins: &[String],
    json: bool,
) -> Result<()> {
    let versions = super::or_fail(parse_pins(pins), json);
    super::or_fail(pm.add_package_resolutions(&versions), json);

    if json {
        return super::print_json(&serde_json::json!({
            "ok": true,
            "backend": pm.backend(),
            "pinned": versions,
        }));
    }

    for (name, version) in &versions {
        eprintln!("pinned {name} to {version}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pins() {
        let pins = parse_pins(&["react@18.2.0".to_string(), "@types/node@20.1.0".to_string()])
            .unwrap();
        assert_eq!(pins["react"], "18.2.0");
        assert_eq!(pins["@types/node"], "20.1.0");

        assert!(matches!(
            parse_pins(&["react".to_string()]),
            Err(PmError::InvalidSpec(_))
        ));
    }
}
