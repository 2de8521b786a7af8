//! Typed parameter handles and their flat-text (par-file style) serialization.

use crate::constants::MJD;

/// A named float parameter of a timing-model component.
///
/// `frozen` parameters are held fixed during fitting; free parameters expose an
/// analytic derivative through their owning component.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    value: f64,
    frozen: bool,
}

impl Param {
    pub fn new(name: impl Into<String>, value: f64, frozen: bool) -> Self {
        Param {
            name: name.into(),
            value,
            frozen,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    pub fn frozen(&self) -> bool {
        self.frozen
    }

    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    /// One par-file line: `NAME  value  fitflag`, newline-terminated.
    ///
    /// The fit flag is `1` for free parameters and `0` for frozen ones, following
    /// the conventional parameter-file text format.
    pub fn as_parfile_line(&self) -> String {
        format!(
            "{:<15}{:>25}  {}\n",
            self.name,
            format_value(self.value),
            if self.frozen { 0 } else { 1 }
        )
    }
}

/// Render a float with full round-trip precision but without trailing noise.
/// `Display` already produces the shortest round-trip representation.
fn format_value(v: f64) -> String {
    format!("{v}")
}

/// Format a segment index with the conventional 4-digit zero padding.
pub fn indexed_name(prefix: &str, index: u16) -> String {
    format!("{prefix}{index:04}")
}

/// Split a prefixed parameter name like `SWX_0001` into its prefix and index.
///
/// Returns `None` when the trailing run of digits is missing or does not parse.
pub fn split_prefixed_name(name: &str) -> Option<(&str, u16)> {
    let digits_at = name.rfind(|c: char| !c.is_ascii_digit())? + 1;
    if digits_at == name.len() {
        return None;
    }
    let index = name[digits_at..].parse().ok()?;
    Some((&name[..digits_at], index))
}

/// Half-open MJD range `[start, end)` attached to a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MjdRange {
    pub start: MJD,
    pub end: MJD,
}

impl MjdRange {
    pub fn contains(&self, mjd: MJD) -> bool {
        self.start <= mjd && mjd < self.end
    }
}
