//! `nodepm run` command implementation.

use miette::Result;
use nodepm_core::pm::{CommandExecutor, PackageManager};
use std::io::Write;

pub fn run<E: CommandExecutor>(
    pm: &PackageManager<E>,
    script: &str,
    args: &[String],
    json: bool,
) -> Result<()> {
    let result = super::block_on(pm.run_script(script, args, None))?;
    let stdout = super::or_fail(result, json);

    if json {
        return super::print_json(&serde_json::json!({
            "ok": true,
            "command": pm.get_run_command(script),
            "stdout": stdout,
        }));
    }

    let mut out = std::io::stdout().lock();
    let _ = out.write_all(stdout.as_bytes());
    let _ = out.flush();
    Ok(())
}
