//! Renders failures at the process boundary for humans or automation.

use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, Write};

use crate::error::{Error, classify};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ErrorReport {
    pub error: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

impl ErrorReport {
    pub fn new(err: &anyhow::Error) -> Self {
        let kind = classify(err);
        Self {
            error: format!("{:#}", err),
            kind: kind.as_str(),
            exit_code: kind.exit_code(),
            retry_after_seconds: err.downcast_ref::<Error>().and_then(Error::retry_after),
        }
    }
}

/// Writes `err` to `w` in the requested mode.
pub fn write_error<W: Write>(w: &mut W, mode: OutputMode, err: &anyhow::Error) -> io::Result<()> {
    let report = ErrorReport::new(err);
    match mode {
        OutputMode::Json => {
            serde_json::to_writer(&mut *w, &report)?;
            writeln!(w)
        }
        OutputMode::Text => writeln!(w, "Error: {}", report.error),
    }
}
