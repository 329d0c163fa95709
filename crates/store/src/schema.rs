// Table layout of peoplesay.db

/// Main table. One row per excerpt, `entry_id` assigned 1..N in CSV order.
pub const SCHEMA: &str = r#"
DROP TABLE IF EXISTS peoplesay;
DROP TABLE IF EXISTS subtopics_table;
DROP TABLE IF EXISTS topics_table;
DROP TABLE IF EXISTS common_topics_table;
DROP TABLE IF EXISTS data_type_table;
DROP TABLE IF EXISTS insurance_table;
DROP TABLE IF EXISTS race_ethnicity_table;

CREATE TABLE peoplesay (
    entry_id INTEGER PRIMARY KEY,
    data_unit TEXT,
    language TEXT,
    data_unit_title TEXT,
    participant_type TEXT,
    participant_name TEXT,
    age TEXT,
    income_range_fpl TEXT,
    location_type TEXT,
    participant_short_code TEXT,
    state TEXT,
    gender TEXT,
    profile_picture_url TEXT,
    year_conducted_research INTEGER,
    full_transcript TEXT
);

CREATE TABLE subtopics_table (entry_id INTEGER NOT NULL, subtopics TEXT NOT NULL);
CREATE TABLE topics_table (entry_id INTEGER NOT NULL, topics TEXT NOT NULL);
CREATE TABLE common_topics_table (entry_id INTEGER NOT NULL, common_topics TEXT NOT NULL);
CREATE TABLE data_type_table (entry_id INTEGER NOT NULL, data_type TEXT NOT NULL);
CREATE TABLE insurance_table (entry_id INTEGER NOT NULL, insurance TEXT NOT NULL);
CREATE TABLE race_ethnicity_table (entry_id INTEGER NOT NULL, race_ethnicity TEXT NOT NULL);
"#;

pub const MAIN_TABLE: &str = "peoplesay";

/// Single-valued `peoplesay` columns and the CSV headers they load from.
/// The first entry is required.
pub const MAIN_COLUMNS: &[(&str, &str)] = &[
    ("data_unit", "Data Unit [web]"),
    ("language", "Language [web]"),
    ("data_unit_title", "Data Unit Title [web]"),
    ("participant_type", "Participant Type [web]"),
    ("participant_name", "Participant Name [web]"),
    ("age", "Age [web]"),
    ("income_range_fpl", "Income Range (FPL) [web]"),
    ("location_type", "Location Type [web]"),
    ("participant_short_code", "Participant Short Code [web]"),
    ("state", "State [web]"),
    ("gender", "Gender [web]"),
    ("profile_picture_url", "Profile Picture [web]"),
    ("year_conducted_research", "Year Conducted Research [web]"),
    ("full_transcript", "Full Transcript [web]"),
];

/// A multi-valued CSV column exploded into its own table.
#[derive(Debug, Clone, Copy)]
pub struct AuxTable {
    pub table: &'static str,
    pub column: &'static str,
    pub header: &'static str,
}

pub const AUX_TABLES: &[AuxTable] = &[
    AuxTable { table: "subtopics_table", column: "subtopics", header: "Subtopics [web]" },
    AuxTable { table: "topics_table", column: "topics", header: "Topics [web]" },
    AuxTable { table: "common_topics_table", column: "common_topics", header: "Common Topics [web]" },
    AuxTable { table: "data_type_table", column: "data_type", header: "Data Type [web]" },
    AuxTable { table: "insurance_table", column: "insurance", header: "Insurance [web]" },
    AuxTable { table: "race_ethnicity_table", column: "race_ethnicity", header: "Race/Ethnicity [web]" },
];

/// Categorical `peoplesay` columns reported by `profile`.
pub const CATEGORICAL_COLUMNS: &[&str] = &[
    "language",
    "participant_type",
    "age",
    "income_range_fpl",
    "location_type",
    "state",
    "gender",
    "year_conducted_research",
];
