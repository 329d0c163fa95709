//! Citation markers in synthesized prose and their check against the result set.

use std::collections::BTreeSet;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::ResultSet;

/// `[12]`, `[12, 31]`, `[12; 31]`, `[Source 12]`, `[Source ID: 12]`.
static MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\[\s*(?:source(?:\s+id)?\s*:?\s*)?\d+(?:\s*[,;]\s*(?:source(?:\s+id)?\s*:?\s*)?\d+)*\s*\]",
    )
    .expect("citation marker pattern")
});

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("digits pattern"));

/// What to do when a summary cites ids outside its result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationPolicy {
    /// Attach the report and let the caller flag it.
    #[default]
    Report,
    /// Fail the synthesis stage.
    Strict,
}

impl CitationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::Strict => "strict",
        }
    }
}

impl FromStr for CitationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "report" => Ok(Self::Report),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown citation policy '{other}' (expected report or strict)")),
        }
    }
}

/// Distinct ids cited in `text`, in order of first appearance.
pub fn extract_citations(text: &str) -> Vec<i64> {
    let mut seen = BTreeSet::new();
    let mut ordered = Vec::new();
    for marker in MARKER.find_iter(text) {
        for digits in DIGITS.find_iter(marker.as_str()) {
            if let Ok(id) = digits.as_str().parse::<i64>() {
                if seen.insert(id) {
                    ordered.push(id);
                }
            }
        }
    }
    ordered
}

/// Result of checking a summary's markers against the rows it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CitationReport {
    /// Every id cited, first-appearance order.
    pub cited: Vec<i64>,
    /// Cited ids that are not in the result set.
    pub unresolved: Vec<i64>,
    /// Result-set ids never cited.
    pub uncited: Vec<i64>,
}

impl CitationReport {
    pub fn check(text: &str, rows: &ResultSet) -> Self {
        let cited = extract_citations(text);
        let known: BTreeSet<i64> = rows.ids().into_iter().collect();
        let cited_set: BTreeSet<i64> = cited.iter().copied().collect();

        let unresolved = cited.iter().copied().filter(|id| !known.contains(id)).collect();
        // a join can return one excerpt on several rows
        let mut seen = BTreeSet::new();
        let uncited = rows
            .ids()
            .into_iter()
            .filter(|id| !cited_set.contains(id) && seen.insert(*id))
            .collect();

        Self { cited, unresolved, uncited }
    }

    /// At least one marker, and every marker resolves.
    pub fn is_valid(&self) -> bool {
        !self.cited.is_empty() && self.unresolved.is_empty()
    }
}
