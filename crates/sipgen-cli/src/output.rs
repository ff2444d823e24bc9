//! Diagnostic and report rendering. Everything here goes to stderr, so
//! generated SIP text on stdout stays clean.

use serde::Serialize;
use sipgen_core::Diagnostic;

use crate::cli::OutputFormat;

/// Diagnostics of one input.
#[derive(Debug, Serialize)]
pub struct HeaderReport {
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Render reports in the requested format.
pub fn render(reports: &[HeaderReport], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(reports)?),
        OutputFormat::Text => Ok(render_text(reports)),
    }
}

fn render_text(reports: &[HeaderReport]) -> String {
    let mut lines = Vec::new();
    for report in reports {
        if let Some(failure) = &report.failure {
            lines.push(format!("{}: failed: {failure}", report.input));
        }
        for diagnostic in &report.diagnostics {
            lines.push(format!("{}: {diagnostic}", report.input));
        }
    }
    lines.join("\n")
}

/// Print reports to stderr. Empty text output prints nothing.
pub fn emit(reports: &[HeaderReport], format: OutputFormat) -> anyhow::Result<()> {
    let rendered = render(reports, format)?;
    if !rendered.is_empty() {
        eprintln!("{rendered}");
    }
    Ok(())
}
