use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tempfile::TempDir;

use peoplesay_engine::{
    AnalysisType, GeneratedQuery, Pipeline, PipelineError, PipelineOutcome, QueryRequest,
    QueryTranslator, ResultSet, RetrievalError, Retriever, Synthesizer, SynthesisError,
    TranslationError,
};
use peoplesay_store::{execute, init_from_csv, open_read_only, PopulateOutcome, SqliteRetriever};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture_db() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("peoplesay.db");
    let outcome = init_from_csv(&fixtures_dir().join("peoplesay_sample.csv"), &db, false).unwrap();
    assert!(matches!(outcome, PopulateOutcome::Created { excerpts: 6, .. }));
    (dir, db)
}

const ASIAN_ACCESS_SQL: &str = "\
SELECT
    p.entry_id, p.data_unit, p.data_unit_title, p.participant_name, p.age,
    p.income_range_fpl, p.location_type, p.state, p.gender, p.participant_type, p.language,
    GROUP_CONCAT(DISTINCT re.race_ethnicity) AS participant_race_ethnicity,
    GROUP_CONCAT(DISTINCT ins.insurance) AS participant_insurance,
    GROUP_CONCAT(DISTINCT st.subtopics) AS relevant_subtopics
FROM peoplesay p
JOIN race_ethnicity_table re ON p.entry_id = re.entry_id
JOIN insurance_table ins ON p.entry_id = ins.entry_id
JOIN subtopics_table st ON p.entry_id = st.entry_id
WHERE re.race_ethnicity = 'Asian'
  AND p.participant_type = 'Older Adult'
  AND p.age IN ('71-75', '76-80', '81-85', '90-95')
  AND st.subtopics LIKE '%Access to Care%'
GROUP BY p.entry_id, p.data_unit, p.data_unit_title, p.participant_name, p.age,
    p.income_range_fpl, p.location_type, p.state, p.gender, p.participant_type, p.language
ORDER BY p.entry_id;";

struct KnownQuery(&'static str);

impl QueryTranslator for KnownQuery {
    fn translate(&self, _: &QueryRequest, _: &str) -> Result<GeneratedQuery, TranslationError> {
        Ok(GeneratedQuery::new(self.0))
    }
}

/// Cites every row it is handed.
struct CiteAll;

impl Synthesizer for CiteAll {
    fn synthesize(&self, _: &QueryRequest, rows: &ResultSet) -> Result<String, SynthesisError> {
        let ids: Vec<String> = rows.ids().iter().map(|id| id.to_string()).collect();
        Ok(format!("Participants describe long waits [{}].", ids.join(", ")))
    }
}

fn count_rows(db: &Path) -> i64 {
    let conn = Connection::open(db).unwrap();
    conn.query_row("SELECT COUNT(*) FROM peoplesay", [], |r| r.get(0)).unwrap()
}

#[test]
fn pipeline_rows_equal_direct_execution() {
    let (_dir, db) = fixture_db();

    let direct = execute(&open_read_only(&db).unwrap(), ASIAN_ACCESS_SQL).unwrap();
    assert_eq!(direct.ids(), vec![1, 6]);

    let pipeline = Pipeline::new(KnownQuery(ASIAN_ACCESS_SQL), SqliteRetriever::new(&db), CiteAll);
    let request = QueryRequest::new(
        "How do older Asians feel about access to health care?",
        AnalysisType::Thematic,
    );
    let PipelineOutcome::Answered(report) = pipeline.run(&request).unwrap() else {
        panic!("expected an answer");
    };

    assert_eq!(report.rows, direct);
    assert_eq!(report.query.sql, ASIAN_ACCESS_SQL);
    assert!(report.citations.is_valid());

    let first = report.rows.get(1).unwrap();
    assert_eq!(first.race_ethnicity.as_deref(), Some("Asian"));
    assert_eq!(first.insurance.as_deref(), Some("Medicare & Medicaid (Dual Eligible)"));
    assert!(first.topics.as_deref().unwrap().contains("Access to Care [5]"));
}

#[test]
fn multi_valued_insurance_is_aggregated() {
    let (_dir, db) = fixture_db();
    let rows = execute(&open_read_only(&db).unwrap(), ASIAN_ACCESS_SQL).unwrap();
    let insurance = rows.get(6).unwrap().insurance.clone().unwrap();
    let mut parts: Vec<&str> = insurance.split(',').collect();
    parts.sort();
    assert_eq!(parts, vec!["Medigap", "Traditional Medicare"]);
}

#[test]
fn delete_is_rejected_and_never_executed() {
    let (_dir, db) = fixture_db();
    let before = count_rows(&db);

    let pipeline = Pipeline::new(
        KnownQuery("DELETE FROM peoplesay WHERE entry_id > 0"),
        SqliteRetriever::new(&db),
        CiteAll,
    );
    let err = pipeline
        .run(&QueryRequest::new("remove everything", AnalysisType::Narrative))
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Retrieval(RetrievalError::Rejected { ref keyword, .. }) if keyword.as_deref() == Some("delete")
    ));
    assert_eq!(count_rows(&db), before);
}

#[test]
fn select_smuggling_a_second_statement_is_rejected() {
    let (_dir, db) = fixture_db();
    let before = count_rows(&db);
    let retriever = SqliteRetriever::new(&db);
    let err = retriever
        .retrieve(&GeneratedQuery::new(
            "SELECT entry_id, data_unit FROM peoplesay; DROP TABLE peoplesay",
        ))
        .unwrap_err();
    assert!(matches!(err, RetrievalError::Rejected { .. }));
    assert_eq!(count_rows(&db), before);
}

#[test]
fn no_matching_excerpts_is_no_results() {
    let (_dir, db) = fixture_db();
    let pipeline = Pipeline::new(
        KnownQuery("SELECT entry_id, data_unit FROM peoplesay WHERE state = 'Alabama'"),
        SqliteRetriever::new(&db),
        CiteAll,
    );
    let outcome = pipeline
        .run(&QueryRequest::new("What do Alabamians say?", AnalysisType::PolicyImplications))
        .unwrap();
    assert!(matches!(outcome, PipelineOutcome::NoResults { .. }));
}
