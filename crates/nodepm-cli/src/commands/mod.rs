pub mod deps;
pub mod info;
pub mod install;
pub mod query;
pub mod run;
pub mod version;

use miette::{IntoDiagnostic, Result};
use nodepm_core::pm::PmError;
use serde::Serialize;
use std::future::Future;

/// Exit code for failures that carry no tool exit code.
const EXIT_ERROR: i32 = 1;

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

/// Drive one async package manager operation to completion.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    Ok(runtime.block_on(future))
}

/// Report `err` and exit.
///
/// Failed tools pass their exit code through.
pub fn fail(err: &PmError, json: bool) -> ! {
    if json {
        let error_json = serde_json::json!({
            "ok": false,
            "error": {
                "code": err.code(),
                "message": err.to_string()
            }
        });
        match serde_json::to_string_pretty(&error_json) {
            Ok(text) => println!("{text}"),
            Err(_) => println!("{error_json}"),
        }
    } else {
        eprintln!("error: {err}");
        if let PmError::Spawn { program, .. } = err {
            eprintln!("hint: is `{program}` installed and on PATH?");
        }
    }

    let code = err.exit_code().filter(|c| *c != 0).unwrap_or(EXIT_ERROR);
    std::process::exit(code);
}

/// Unwrap an operation result or report the error and exit.
pub fn or_fail<T>(result: Result<T, PmError>, json: bool) -> T {
    match result {
        Ok(value) => value,
        Err(e) => fail(&e, json),
    }
}
