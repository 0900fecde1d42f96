use miette::Result;
use nodepm_core::version::version_string;
use nodepm_core::VERSION;

pub fn run(json: bool) -> Result<()> {
    if json {
        super::print_json(&serde_json::json!({ "ok": true, "version": VERSION }))
    } else {
        println!("{}", version_string());
        Ok(())
    }
}
