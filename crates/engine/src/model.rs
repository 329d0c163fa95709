use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Analysis type
// ---------------------------------------------------------------------------

/// Narrative frame the synthesizer writes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    #[default]
    Thematic,
    Narrative,
    DemographicComparison,
    PolicyImplications,
}

impl AnalysisType {
    pub const ALL: [AnalysisType; 4] = [
        Self::Thematic,
        Self::Narrative,
        Self::DemographicComparison,
        Self::PolicyImplications,
    ];

    /// Display label (also the heading the model ends its prompt with).
    pub fn label(&self) -> &'static str {
        match self {
            Self::Thematic => "Thematic Analysis",
            Self::Narrative => "Narrative Analysis",
            Self::DemographicComparison => "Demographic Comparison",
            Self::PolicyImplications => "Policy Implications",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Thematic => {
                "Identifies recurring patterns, concepts, and themes across participants."
            }
            Self::Narrative => {
                "Focuses on storytelling elements and how participants construct their experiences."
            }
            Self::DemographicComparison => {
                "Compares experiences across different demographic groups."
            }
            Self::PolicyImplications => {
                "Extracts insights relevant to policy development and system improvements."
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Thematic => "thematic",
            Self::Narrative => "narrative",
            Self::DemographicComparison => "demographic",
            Self::PolicyImplications => "policy",
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AnalysisType {
    type Err = String;

    /// Accepts the short name, the snake_case name, or the display label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c })
            .collect();
        match normalized.as_str() {
            "thematic" | "thematic_analysis" => Ok(Self::Thematic),
            "narrative" | "narrative_analysis" => Ok(Self::Narrative),
            "demographic" | "comparative" | "demographic_comparison" => {
                Ok(Self::DemographicComparison)
            }
            "policy" | "policy_implications" => Ok(Self::PolicyImplications),
            _ => Err(format!(
                "unknown analysis type '{s}' (expected thematic, narrative, demographic, or policy)"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Request / generated query
// ---------------------------------------------------------------------------

/// One user action: a question and the frame to answer it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub question: String,
    pub analysis: AnalysisType,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>, analysis: AnalysisType) -> Self {
        Self { question: question.into(), analysis }
    }
}

/// SQL produced by the translator. Untrusted; only ever handed to the
/// read-only executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedQuery {
    pub sql: String,
}

impl GeneratedQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }

    /// `sha256:<hex>` over the exact SQL text.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.sql.as_bytes());
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        format!("sha256:{hex}")
    }
}

// ---------------------------------------------------------------------------
// Excerpts
// ---------------------------------------------------------------------------

/// Columns every result set must carry.
pub const ID_COLUMN: &str = "entry_id";
pub const TEXT_COLUMN: &str = "data_unit";

/// One interview excerpt with its demographic context.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Excerpt {
    pub entry_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub race_ethnicity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income_range_fpl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<String>,
    /// Selected columns outside the known set, keyed by column name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub extra: BTreeMap<String, String>,
}

impl Excerpt {
    /// Build an excerpt from named column values in select order.
    ///
    /// Aggregate aliases the schema prompt asks for (`participant_race_ethnicity`,
    /// `relevant_subtopics`, ...) land in the matching field. Unknown columns go
    /// to `extra`. A join can repeat `entry_id` or `data_unit` (`SELECT *` over
    /// a LEFT JOIN leaves the joined copy null); the first non-null occurrence
    /// wins and later copies are dropped. Fails with the name of the first
    /// required column that has no non-null value.
    pub fn from_columns<I>(columns: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        let mut excerpt = Excerpt::default();
        let mut has_id = false;
        let mut has_text = false;

        for (name, value) in columns {
            let key = name.to_ascii_lowercase();
            match key.as_str() {
                ID_COLUMN => {
                    if has_id {
                        continue;
                    }
                    if let Some(raw) = value {
                        excerpt.entry_id = raw.trim().parse().map_err(|_| ID_COLUMN.to_string())?;
                        has_id = true;
                    }
                }
                TEXT_COLUMN => {
                    if has_text {
                        continue;
                    }
                    if let Some(text) = value {
                        excerpt.text = text;
                        has_text = true;
                    }
                }
                "data_unit_title" | "title" => excerpt.title = value,
                "participant_name" => excerpt.participant_name = value,
                "participant_type" => excerpt.participant_type = value,
                "age" => excerpt.age = value,
                "gender" => excerpt.gender = value,
                "race_ethnicity" | "participant_race_ethnicity" => excerpt.race_ethnicity = value,
                "insurance" | "participant_insurance" => excerpt.insurance = value,
                "income_range_fpl" => excerpt.income_range_fpl = value,
                "location_type" => excerpt.location_type = value,
                "state" => excerpt.state = value,
                "language" => excerpt.language = value,
                "topics" | "subtopics" | "common_topics" | "relevant_subtopics"
                | "relevant_topics" | "relevant_common_topics" => {
                    excerpt.topics = merge_tags(excerpt.topics.take(), value);
                }
                _ => {
                    if let Some(v) = value {
                        excerpt.extra.insert(name, v);
                    }
                }
            }
        }

        if !has_id {
            return Err(ID_COLUMN.to_string());
        }
        if !has_text {
            return Err(TEXT_COLUMN.to_string());
        }
        Ok(excerpt)
    }

    /// Demographic context as `label: value` pairs, skipping empty fields.
    pub fn context_pairs(&self) -> Vec<(&'static str, &str)> {
        let fields: [(&'static str, &Option<String>); 11] = [
            ("Participant type", &self.participant_type),
            ("Age", &self.age),
            ("Gender", &self.gender),
            ("Race/ethnicity", &self.race_ethnicity),
            ("Insurance", &self.insurance),
            ("Income (FPL)", &self.income_range_fpl),
            ("Location type", &self.location_type),
            ("State", &self.state),
            ("Language", &self.language),
            ("Topics", &self.topics),
            ("Title", &self.title),
        ];
        fields
            .into_iter()
            .filter_map(|(label, value)| {
                value.as_deref().filter(|v| !v.trim().is_empty()).map(|v| (label, v))
            })
            .collect()
    }
}

fn merge_tags(existing: Option<String>, next: Option<String>) -> Option<String> {
    match (existing, next) {
        (Some(a), Some(b)) if !b.is_empty() => Some(format!("{a},{b}")),
        (Some(a), _) => Some(a),
        (None, b) => b,
    }
}

/// Ordered rows returned by one retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ResultSet {
    /// Column names in select order.
    pub columns: Vec<String>,
    pub rows: Vec<Excerpt>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Excerpt>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Excerpt> {
        self.rows.iter()
    }

    pub fn ids(&self) -> Vec<i64> {
        self.rows.iter().map(|r| r.entry_id).collect()
    }

    pub fn get(&self, entry_id: i64) -> Option<&Excerpt> {
        self.rows.iter().find(|r| r.entry_id == entry_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(pairs: &[(&str, Option<&str>)]) -> Vec<(String, Option<String>)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(|s| s.to_string())))
            .collect()
    }

    #[test]
    fn analysis_type_parses_labels_and_short_names() {
        assert_eq!("thematic".parse::<AnalysisType>().unwrap(), AnalysisType::Thematic);
        assert_eq!(
            "Demographic Comparison".parse::<AnalysisType>().unwrap(),
            AnalysisType::DemographicComparison
        );
        assert_eq!(
            "comparative".parse::<AnalysisType>().unwrap(),
            AnalysisType::DemographicComparison
        );
        assert_eq!(
            "policy-implications".parse::<AnalysisType>().unwrap(),
            AnalysisType::PolicyImplications
        );
        assert!("sentiment".parse::<AnalysisType>().is_err());
    }

    #[test]
    fn excerpt_maps_known_columns_and_aliases() {
        let excerpt = Excerpt::from_columns(cols(&[
            ("entry_id", Some("7")),
            ("data_unit", Some("I wait months for a specialist.")),
            ("data_unit_title", Some("Waiting on specialists")),
            ("participant_race_ethnicity", Some("Asian")),
            ("participant_insurance", Some("Medicare Advantage")),
            ("relevant_subtopics", Some("Specialist Care [5]")),
            ("profile_picture_url", Some("https://example.org/p.png")),
            ("state", None),
        ]))
        .unwrap();

        assert_eq!(excerpt.entry_id, 7);
        assert_eq!(excerpt.title.as_deref(), Some("Waiting on specialists"));
        assert_eq!(excerpt.race_ethnicity.as_deref(), Some("Asian"));
        assert_eq!(excerpt.insurance.as_deref(), Some("Medicare Advantage"));
        assert_eq!(excerpt.topics.as_deref(), Some("Specialist Care [5]"));
        assert_eq!(excerpt.state, None);
        assert_eq!(
            excerpt.extra.get("profile_picture_url").map(String::as_str),
            Some("https://example.org/p.png")
        );
    }

    #[test]
    fn excerpt_requires_id_and_text() {
        let err = Excerpt::from_columns(cols(&[("data_unit", Some("text"))])).unwrap_err();
        assert_eq!(err, "entry_id");

        let err = Excerpt::from_columns(cols(&[("entry_id", Some("1"))])).unwrap_err();
        assert_eq!(err, "data_unit");

        let err =
            Excerpt::from_columns(cols(&[("entry_id", Some("x")), ("data_unit", Some("t"))]))
                .unwrap_err();
        assert_eq!(err, "entry_id");
    }

    #[test]
    fn repeated_required_columns_take_first_non_null() {
        // p.*, dt.* where the excerpt has no tag row
        let excerpt = Excerpt::from_columns(cols(&[
            ("entry_id", Some("2")),
            ("data_unit", Some("My daughter drives me.")),
            ("entry_id", None),
            ("data_type", None),
        ]))
        .unwrap();
        assert_eq!(excerpt.entry_id, 2);
        assert_eq!(excerpt.text, "My daughter drives me.");
        assert!(excerpt.extra.is_empty());

        let excerpt = Excerpt::from_columns(cols(&[
            ("entry_id", None),
            ("data_unit", Some("first")),
            ("entry_id", Some("5")),
            ("data_unit", Some("second")),
        ]))
        .unwrap();
        assert_eq!(excerpt.entry_id, 5);
        assert_eq!(excerpt.text, "first");

        let err = Excerpt::from_columns(cols(&[("entry_id", None), ("data_unit", Some("t")), ("entry_id", None)]))
            .unwrap_err();
        assert_eq!(err, "entry_id");
    }

    #[test]
    fn fingerprint_is_stable_sha256() {
        let q = GeneratedQuery::new("SELECT 1");
        let fp = q.fingerprint();
        assert!(fp.starts_with("sha256:"));
        assert_eq!(fp.len(), "sha256:".len() + 64);
        assert_eq!(fp, GeneratedQuery::new("SELECT 1").fingerprint());
        assert_ne!(fp, GeneratedQuery::new("SELECT 2").fingerprint());
    }

    #[test]
    fn context_pairs_skip_empty_fields() {
        let excerpt = Excerpt {
            entry_id: 1,
            text: "t".into(),
            age: Some("71-75".into()),
            gender: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(excerpt.context_pairs(), vec![("Age", "71-75")]);
    }
}
