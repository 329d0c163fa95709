//! `peoplesay ask`: one pipeline run, rendered as text or JSON.

use std::path::PathBuf;

use serde_json::{json, Value};

use peoplesay_config::{LlmConfigStatus, ResolvedLlmConfig, Settings};
use peoplesay_engine::{
    AnalysisType, CitationPolicy, Excerpt, GeneratedQuery, InsightReport, Pipeline,
    PipelineOutcome, QueryRequest,
};
use peoplesay_llm::{build_backend, LlmSynthesizer, LlmTranslator};
use peoplesay_store::SqliteRetriever;

use crate::exit_codes::{
    pipeline_exit_code, EXIT_AI_DISABLED, EXIT_AI_KEY_REJECTED, EXIT_AI_MISSING_KEY,
    EXIT_DB_MISSING, EXIT_NO_RESULTS, EXIT_SUCCESS, EXIT_SYNTHESIS,
};
use crate::{database_path, AiArgs, CliError};

/// Excerpt text longer than this is shortened in text output.
const EXCERPT_PREVIEW_CHARS: usize = 400;

pub struct AskArgs {
    pub question: String,
    pub analysis: Option<AnalysisType>,
    pub db: Option<PathBuf>,
    pub ai: AiArgs,
    pub strict_citations: bool,
    pub json: bool,
}

pub fn cmd_ask(args: AskArgs) -> Result<u8, CliError> {
    let mut settings = Settings::load();
    args.ai.apply(&mut settings);

    // Credentials first: nothing touches the database or the network without a key
    let config = ResolvedLlmConfig::resolve(&settings.ai, args.ai.api_key.as_deref());
    match config.status {
        LlmConfigStatus::Disabled => {
            return Err(CliError::new(EXIT_AI_DISABLED, "AI is disabled (provider = none)")
                .with_hint("set ai.provider in settings.json or pass --provider gemini"));
        }
        LlmConfigStatus::MissingKey => {
            let reason = config.blocking_reason.clone().unwrap_or_else(|| "No API key found".into());
            return Err(CliError::new(EXIT_AI_MISSING_KEY, reason)
                .with_hint("run `peoplesay ai doctor` to see where keys are looked up"));
        }
        LlmConfigStatus::Ready => {}
    }

    let db_path = database_path(args.db, &settings);
    if !db_path.is_file() {
        return Err(CliError::new(
            EXIT_DB_MISSING,
            format!("database not found: {}", db_path.display()),
        )
        .with_hint("build it with `peoplesay init-db --csv <export.csv>`"));
    }

    let backend = build_backend(&config)
        .map_err(|e| CliError::new(EXIT_AI_MISSING_KEY, e.to_string()))?;
    let policy = if args.strict_citations { CitationPolicy::Strict } else { settings.synthesis.citations };
    let pipeline = Pipeline::new(
        LlmTranslator::new(backend.clone()).with_verify_key(config.verify_key),
        SqliteRetriever::new(&db_path),
        LlmSynthesizer::new(backend),
    )
    .with_citation_policy(policy);

    let analysis = args.analysis.unwrap_or(settings.synthesis.default_analysis);
    let request = QueryRequest::new(args.question, analysis);
    log::debug!("asking with {} analysis against {}", analysis.as_str(), db_path.display());

    let outcome = pipeline.run(&request).map_err(|e| {
        let code = pipeline_exit_code(&e);
        let err = CliError::new(code, e.to_string());
        match code {
            EXIT_AI_KEY_REJECTED => {
                err.with_hint("check the key, or run `peoplesay ai doctor --test`")
            }
            EXIT_SYNTHESIS if policy == CitationPolicy::Strict => {
                err.with_hint("rerun without --strict-citations to see the summary and its citation report")
            }
            _ => err,
        }
    })?;

    match outcome {
        PipelineOutcome::Answered(report) => {
            if args.json {
                print_json(&report_json(&report))?;
            } else {
                print!("{}", render_report(&report));
            }
            Ok(EXIT_SUCCESS)
        }
        PipelineOutcome::NoResults { query } => {
            if args.json {
                print_json(&no_results_json(&request, &query))?;
            } else {
                print!("{}", render_query(&query));
                println!();
                println!("No data found matching your query.");
            }
            Ok(EXIT_NO_RESULTS)
        }
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::general(format!("JSON serialization failed: {e}")))?;
    println!("{text}");
    Ok(())
}

// ============================================================================
// JSON
// ============================================================================

fn query_json(query: &GeneratedQuery) -> Value {
    json!({
        "sql": query.sql,
        "query_hash": query.fingerprint(),
    })
}

/// Rows in result order. An id repeats when the query joined one excerpt
/// to several tag rows; every row is kept.
pub(crate) fn report_json(report: &InsightReport) -> Value {
    let sources: Vec<Value> = report
        .rows
        .iter()
        .map(|excerpt| serde_json::to_value(excerpt).unwrap_or(Value::Null))
        .collect();

    json!({
        "schema_version": 1,
        "status": "answered",
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "question": report.question,
        "analysis": report.analysis.as_str(),
        "query": query_json(&report.query),
        "summary": report.summary,
        "citations": {
            "valid": report.citations.is_valid(),
            "cited": report.citations.cited,
            "unresolved": report.citations.unresolved,
            "uncited": report.citations.uncited,
        },
        "row_count": report.rows.len(),
        "sources": sources,
    })
}

fn no_results_json(request: &QueryRequest, query: &GeneratedQuery) -> Value {
    json!({
        "schema_version": 1,
        "status": "no_results",
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "question": request.question.trim(),
        "analysis": request.analysis.as_str(),
        "query": query_json(query),
        "row_count": 0,
        "sources": [],
    })
}

// ============================================================================
// Text
// ============================================================================

fn heading(out: &mut String, title: &str) {
    out.push_str(title);
    out.push('\n');
    out.push_str(&"─".repeat(title.chars().count().max(30)));
    out.push('\n');
}

fn render_query(query: &GeneratedQuery) -> String {
    let mut out = String::new();
    heading(&mut out, "Query");
    out.push_str(query.sql.trim());
    out.push('\n');
    out.push_str(&format!("({})\n", query.fingerprint()));
    out
}

pub(crate) fn render_report(report: &InsightReport) -> String {
    let mut out = render_query(&report.query);
    out.push('\n');

    heading(&mut out, report.analysis.label());
    out.push_str(&report.summary);
    out.push_str("\n\n");

    let citations = &report.citations;
    if citations.cited.is_empty() {
        out.push_str("warning: summary cites no sources\n\n");
    } else if !citations.unresolved.is_empty() {
        out.push_str(&format!(
            "warning: summary cites sources not in the result set: {}\n\n",
            id_list(&citations.unresolved)
        ));
    } else {
        out.push_str(&format!(
            "Citations: {} cited, all resolved ({} of {} excerpts uncited)\n\n",
            citations.cited.len(),
            citations.uncited.len(),
            report.rows.len()
        ));
    }

    heading(&mut out, &format!("Sources ({})", report.rows.len()));
    for excerpt in report.rows.iter() {
        render_excerpt(&mut out, excerpt);
    }
    out
}

fn render_excerpt(out: &mut String, excerpt: &Excerpt) {
    let mut header = format!("[{}]", excerpt.entry_id);
    if let Some(name) = excerpt.participant_name.as_deref().filter(|n| !n.trim().is_empty()) {
        header.push(' ');
        header.push_str(name);
    }
    if let Some(title) = excerpt.title.as_deref().filter(|t| !t.trim().is_empty()) {
        header.push_str(&format!(" · {title}"));
    }
    out.push_str(&header);
    out.push('\n');

    let context: Vec<String> = excerpt
        .context_pairs()
        .into_iter()
        .filter(|(label, _)| *label != "Title")
        .map(|(label, value)| format!("{label}: {value}"))
        .collect();
    if !context.is_empty() {
        out.push_str(&format!("    {}\n", context.join(" | ")));
    }
    out.push_str(&format!("    \"{}\"\n\n", preview(excerpt.text.trim(), EXCERPT_PREVIEW_CHARS)));
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

fn id_list(ids: &[i64]) -> String {
    let parts: Vec<String> = ids.iter().map(|id| format!("[{id}]")).collect();
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use peoplesay_engine::{CitationReport, ResultSet};

    fn report(summary: &str) -> InsightReport {
        let rows = ResultSet::new(
            vec!["entry_id".into(), "data_unit".into()],
            vec![
                Excerpt {
                    entry_id: 1,
                    text: "The clinic is two hours away.".into(),
                    participant_name: Some("Mei".into()),
                    age: Some("71-75".into()),
                    race_ethnicity: Some("Asian".into()),
                    ..Default::default()
                },
                Excerpt { entry_id: 6, text: "Medigap covers most of it.".into(), ..Default::default() },
            ],
        );
        InsightReport {
            question: "How do older adults get care?".into(),
            analysis: AnalysisType::Thematic,
            query: GeneratedQuery::new("SELECT entry_id, data_unit FROM peoplesay"),
            citations: CitationReport::check(summary, &rows),
            rows,
            summary: summary.into(),
        }
    }

    #[test]
    fn text_output_lists_query_summary_and_sources() {
        let text = render_report(&report("Distance is a barrier [1]."));
        assert!(text.contains("SELECT entry_id, data_unit FROM peoplesay"));
        assert!(text.contains("(sha256:"));
        assert!(text.contains("Thematic Analysis"));
        assert!(text.contains("Citations: 1 cited, all resolved (1 of 2 excerpts uncited)"));
        assert!(text.contains("[1] Mei"));
        assert!(text.contains("Age: 71-75 | Race/ethnicity: Asian"));
        assert!(text.contains("\"Medigap covers most of it.\""));
    }

    #[test]
    fn text_output_flags_unresolved_citations() {
        let text = render_report(&report("Distance [1]. Cost [4]."));
        assert!(text.contains("warning: summary cites sources not in the result set: [4]"));

        let text = render_report(&report("No markers at all."));
        assert!(text.contains("warning: summary cites no sources"));
    }

    #[test]
    fn json_output_lists_sources_in_row_order() {
        let value = report_json(&report("Distance [1]. Cost [4]."));
        assert_eq!(value["schema_version"], 1);
        assert_eq!(value["analysis"], "thematic");
        assert_eq!(value["citations"]["valid"], false);
        assert_eq!(value["citations"]["unresolved"], json!([4]));
        assert_eq!(value["sources"][0]["entry_id"], 1);
        assert_eq!(value["sources"][0]["participant_name"], "Mei");
        assert_eq!(value["sources"][1]["entry_id"], 6);
        assert_eq!(value["sources"][1]["text"], "Medigap covers most of it.");
        assert!(value["query"]["query_hash"].as_str().unwrap().starts_with("sha256:"));
    }

    #[test]
    fn json_output_keeps_repeated_excerpts() {
        let mut joined = report("Distance [1].");
        let mut second = joined.rows.rows[0].clone();
        second.race_ethnicity = Some("Pacific Islander".into());
        joined.rows.rows.insert(1, second);
        joined.citations = CitationReport::check(&joined.summary, &joined.rows);

        let value = report_json(&joined);
        assert_eq!(value["row_count"], 3);
        let sources = value["sources"].as_array().unwrap();
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[0]["race_ethnicity"], "Asian");
        assert_eq!(sources[1]["race_ethnicity"], "Pacific Islander");
        assert_eq!(value["citations"]["uncited"], json!([6]));
    }

    #[test]
    fn preview_shortens_long_text() {
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("abc", 3), "abc");
    }
}
