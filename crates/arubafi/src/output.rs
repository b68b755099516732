//! JSON output to stdout.

use std::io::{self, Write};

use crate::error::CliError;

/// Serialize `data` as pretty or single-line JSON.
pub fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    };
    Ok(rendered)
}

/// Print the rendered output to stdout.
pub fn print_output(output: &str) -> Result<(), CliError> {
    if output.is_empty() {
        return Ok(());
    }
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{output}")?;
    Ok(())
}

/// Render and print in one go.
pub fn print_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<(), CliError> {
    print_output(&render_json(data, compact)?)
}
