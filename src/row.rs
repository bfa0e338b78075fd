use std::fmt;

use serde::{Deserialize, Serialize};

use crate::task::TaskCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    /// Terminal rows hosting efficiency assays.
    Efficiency,
    /// Technician rows hosting safety assays.
    Safety,
}

impl RowKind {
    /// Assay categories are pinned to their row kind; calibrations and
    /// vacation blocks may sit on either kind of row.
    pub fn hosts(&self, category: TaskCategory) -> bool {
        match category {
            TaskCategory::EfficiencyAssay => matches!(self, RowKind::Efficiency),
            TaskCategory::SafetyAssay => matches!(self, RowKind::Safety),
            TaskCategory::Calibration | TaskCategory::Vacation => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RowKind::Efficiency => "efficiency",
            RowKind::Safety => "safety",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "efficiency" => Some(RowKind::Efficiency),
            "safety" => Some(RowKind::Safety),
            _ => None,
        }
    }
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row identifier. Efficiency rows use a numeric id space, safety rows a
/// spreadsheet-style letter space. Both are allocated sequentially and
/// never reused after deletion within a session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RowId {
    Index(u32),
    Letter(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIdParseError {
    raw: String,
}

impl fmt::Display for RowIdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid row id '{}' (expected digits or uppercase letters)",
            self.raw
        )
    }
}

impl std::error::Error for RowIdParseError {}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Index(n) => write!(f, "{n}"),
            RowId::Letter(code) => f.write_str(code),
        }
    }
}

impl std::str::FromStr for RowId {
    type Err = RowIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            return s.parse::<u32>().map(RowId::Index).map_err(|_| RowIdParseError {
                raw: s.to_string(),
            });
        }
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_uppercase()) {
            return Ok(RowId::Letter(s.to_string()));
        }
        Err(RowIdParseError { raw: s.to_string() })
    }
}

impl TryFrom<String> for RowId {
    type Error = RowIdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RowId> for String {
    fn from(value: RowId) -> Self {
        value.to_string()
    }
}

/// Letter code for a zero-based ordinal: 0 -> "A", 25 -> "Z", 26 -> "AA".
pub(crate) fn letter_code(mut ordinal: u32) -> String {
    let mut out = Vec::new();
    loop {
        out.push(b'A' + (ordinal % 26) as u8);
        if ordinal < 26 {
            break;
        }
        ordinal = ordinal / 26 - 1;
    }
    out.reverse();
    String::from_utf8(out).expect("letter codes are ascii")
}

/// Inverse of [`letter_code`]; `None` for anything but uppercase letters.
pub(crate) fn letter_ordinal(code: &str) -> Option<u32> {
    if code.is_empty() || !code.bytes().all(|b| b.is_ascii_uppercase()) {
        return None;
    }
    let mut value: u32 = 0;
    for b in code.bytes() {
        value = value.checked_mul(26)?.checked_add((b - b'A' + 1) as u32)?;
    }
    Some(value - 1)
}

/// A resource lane on the scheduling surface: a terminal or a technician.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    pub label: String,
    pub kind: RowKind,
}

impl Row {
    pub fn new(id: RowId, kind: RowKind) -> Self {
        let label = format!("Linha {id}");
        Self { id, label, kind }
    }

    pub fn with_label(id: RowId, kind: RowKind, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    RowInUse(RowId),
    RowNotFound(RowId),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::RowInUse(id) => {
                write!(f, "row {id} still has scheduled tasks")
            }
            RegistryError::RowNotFound(id) => write!(f, "row {id} not found"),
        }
    }
}

impl std::error::Error for RegistryError {}
