//! Run metadata extraction from diagnostic file names.
//!
//! Diagnostic files are named
//!
//! ```text
//! [<uuid>-][<model>_<system>_<domain>_<frequency>_](nc)diag_[conv_]<var>_<loop>.<YYYYMMDDHH[mm]>[.<background>].nc4
//! ```
//!
//! The metadata tokens before `diag` are optional, and when fewer than four are
//! present they fill model, system, domain and frequency from the left. A file
//! named `WCOSS_CONUS_REALTIME_diag_ps_anl...` therefore has model `WCOSS` and
//! no frequency: a missing model cannot be told apart from a missing frequency.

use std::sync::LazyLock;

use regex::Regex;

use diag_common::{DiagError, DiagResult, Variable};

static DIAG_FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        // optional UUID prefix, then optional model/system/domain/frequency tokens
        r"^(?:[a-z0-9][a-z0-9-]*-)?(?:(\w+)_)?",
        // variable and loop
        r"(?:nc)?diag_(?:conv_)?(ps|q|t|uv)_(anl|ges|\d+)\..*?",
        // initialization time and background
        r"(\d{4})(\d{2})(\d{2})(\d{2})(\d{2})?(?:\.(\w+))?\.nc4",
    ))
    .expect("diag filename pattern is valid")
});

/// Run metadata parsed from a diagnostic file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagMeta {
    /// Component codes: `["u", "v"]` for wind, one code otherwise.
    pub variables: Vec<String>,
    pub loop_: String,
    /// `YYYY-MM-DDTHH:MM`; minutes default to `00`.
    pub initialization_time: String,
    pub model: Option<String>,
    pub system: Option<String>,
    pub domain: Option<String>,
    pub frequency: Option<String>,
    pub background: Option<String>,
}

impl DiagMeta {
    /// Variable short name, e.g. "uv" for wind.
    pub fn name(&self) -> String {
        self.variables.concat()
    }

    pub fn variable(&self) -> DiagResult<Variable> {
        self.name().parse()
    }
}

/// Parse run metadata from a diagnostic file name.
pub fn parse_diag_filename(filename: &str) -> DiagResult<DiagMeta> {
    let caps = DIAG_FILENAME_RE
        .captures(filename)
        .ok_or_else(|| DiagError::InvalidFilename(filename.to_string()))?;

    let group = |i: usize| caps.get(i).map(|m| m.as_str());
    let required = |i: usize| {
        group(i)
            .map(str::to_string)
            .ok_or_else(|| DiagError::InvalidFilename(filename.to_string()))
    };

    let mut tokens = group(1)
        .map(|meta| meta.split('_').map(str::to_string).collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter();

    let variable = required(2)?;
    let variables = if variable == "uv" {
        vec!["u".to_string(), "v".to_string()]
    } else {
        vec![variable]
    };

    let initialization_time = format!(
        "{}-{}-{}T{}:{}",
        required(4)?,
        required(5)?,
        required(6)?,
        required(7)?,
        group(8).unwrap_or("00")
    );

    Ok(DiagMeta {
        variables,
        loop_: required(3)?,
        initialization_time,
        model: tokens.next(),
        system: tokens.next(),
        domain: tokens.next(),
        frequency: tokens.next(),
        background: group(9).map(str::to_string),
    })
}
