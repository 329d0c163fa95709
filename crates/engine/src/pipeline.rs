//! Orchestrator: translate → retrieve → synthesize.
//!
//! One run per user action. Stages run strictly in order, none is re-entered,
//! and the first failure ends the run with the stage that produced it.
//! Partial state (a query without rows, rows without a summary) is dropped.

use std::borrow::Cow;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use serde::Serialize;

use crate::citations::{CitationPolicy, CitationReport};
use crate::error::{PipelineError, RetrievalError, Stage, SynthesisError, TranslationError};
use crate::model::{AnalysisType, GeneratedQuery, QueryRequest, ResultSet};
use crate::prompts::SCHEMA_DESCRIPTION;

/// Longest SQL prefix written to the log.
const LOG_SQL_CHARS: usize = 500;

// ============================================================================
// Stage seams
// ============================================================================

/// Natural language → SQL.
pub trait QueryTranslator {
    /// Runs before anything else in a pipeline run. A failure here means no
    /// database or model call is made.
    fn check_credentials(&self) -> Result<(), TranslationError> {
        Ok(())
    }

    fn translate(
        &self,
        request: &QueryRequest,
        schema: &str,
    ) -> Result<GeneratedQuery, TranslationError>;
}

/// SQL → rows, read-only.
pub trait Retriever {
    fn retrieve(&self, query: &GeneratedQuery) -> Result<ResultSet, RetrievalError>;
}

/// Rows → prose with citation markers.
pub trait Synthesizer {
    fn synthesize(&self, request: &QueryRequest, rows: &ResultSet) -> Result<String, SynthesisError>;
}

impl<T: QueryTranslator + ?Sized> QueryTranslator for Box<T> {
    fn check_credentials(&self) -> Result<(), TranslationError> {
        (**self).check_credentials()
    }

    fn translate(&self, request: &QueryRequest, schema: &str) -> Result<GeneratedQuery, TranslationError> {
        (**self).translate(request, schema)
    }
}

impl<T: Retriever + ?Sized> Retriever for Box<T> {
    fn retrieve(&self, query: &GeneratedQuery) -> Result<ResultSet, RetrievalError> {
        (**self).retrieve(query)
    }
}

impl<T: Synthesizer + ?Sized> Synthesizer for Box<T> {
    fn synthesize(&self, request: &QueryRequest, rows: &ResultSet) -> Result<String, SynthesisError> {
        (**self).synthesize(request, rows)
    }
}

// ============================================================================
// State machine
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Translating,
    Retrieving,
    Synthesizing,
    Done,
    Failed { stage: Stage, reason: String },
}

impl PipelineState {
    /// Forward-only transitions; any working stage may fail.
    pub fn can_transition_to(&self, next: &PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Idle, Translating) => true,
            (Translating, Retrieving) => true,
            (Retrieving, Synthesizing) => true,
            // zero rows short-circuits straight to Done
            (Retrieving, Done) => true,
            (Synthesizing, Done) => true,
            (Translating | Retrieving | Synthesizing, Failed { .. }) => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Translating => "translating",
            Self::Retrieving => "retrieving",
            Self::Synthesizing => "synthesizing",
            Self::Done => "done",
            Self::Failed { .. } => "failed",
        }
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Summary, query and rows of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsightReport {
    pub question: String,
    pub analysis: AnalysisType,
    pub query: GeneratedQuery,
    pub rows: ResultSet,
    pub summary: String,
    pub citations: CitationReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Answered(InsightReport),
    /// The query ran but matched nothing; synthesis was skipped.
    NoResults { query: GeneratedQuery },
}

impl PipelineOutcome {
    pub fn query(&self) -> &GeneratedQuery {
        match self {
            Self::Answered(report) => &report.query,
            Self::NoResults { query } => query,
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

pub struct Pipeline<T, R, S> {
    translator: T,
    retriever: R,
    synthesizer: S,
    schema: &'static str,
    citation_policy: CitationPolicy,
}

impl<T, R, S> Pipeline<T, R, S>
where
    T: QueryTranslator,
    R: Retriever,
    S: Synthesizer,
{
    pub fn new(translator: T, retriever: R, synthesizer: S) -> Self {
        Self {
            translator,
            retriever,
            synthesizer,
            schema: SCHEMA_DESCRIPTION,
            citation_policy: CitationPolicy::default(),
        }
    }

    pub fn with_citation_policy(mut self, policy: CitationPolicy) -> Self {
        self.citation_policy = policy;
        self
    }

    pub fn citation_policy(&self) -> CitationPolicy {
        self.citation_policy
    }

    pub fn run(&self, request: &QueryRequest) -> Result<PipelineOutcome, PipelineError> {
        self.run_observed(request, &mut |_: &PipelineState| {})
    }

    /// Run once, reporting every state entered (never `Idle`) to `observer`.
    pub fn run_observed(
        &self,
        request: &QueryRequest,
        observer: &mut dyn FnMut(&PipelineState),
    ) -> Result<PipelineOutcome, PipelineError> {
        let mut tracker = Tracker { state: PipelineState::Idle, observer };
        let result = self.drive(request, &mut tracker);
        if let Err(err) = &result {
            log::warn!("pipeline failed at {}: {}", err.stage(), err);
            tracker.enter(PipelineState::Failed { stage: err.stage(), reason: err.to_string() });
        }
        result
    }

    fn drive(
        &self,
        request: &QueryRequest,
        tracker: &mut Tracker<'_>,
    ) -> Result<PipelineOutcome, PipelineError> {
        // Translating
        tracker.enter(PipelineState::Translating);
        if request.question.trim().is_empty() {
            return Err(TranslationError::EmptyQuestion.into());
        }
        self.translator.check_credentials()?;
        let started = Instant::now();
        let query = self.translator.translate(request, self.schema)?;
        log::info!(
            "translated question in {} ms: {}",
            started.elapsed().as_millis(),
            truncate(&query.sql, LOG_SQL_CHARS)
        );

        // Retrieving
        tracker.enter(PipelineState::Retrieving);
        let rows = match self.retriever.retrieve(&query) {
            Ok(rows) if rows.is_empty() => None,
            Ok(rows) => Some(rows),
            Err(RetrievalError::NoMatches) => None,
            Err(e) => return Err(e.into()),
        };
        let Some(rows) = rows else {
            log::info!("query matched no excerpts; skipping synthesis");
            tracker.enter(PipelineState::Done);
            return Ok(PipelineOutcome::NoResults { query });
        };
        log::info!("retrieved {} excerpts", rows.len());

        // Synthesizing
        tracker.enter(PipelineState::Synthesizing);
        let started = Instant::now();
        let summary = self.synthesizer.synthesize(request, &rows)?;
        let summary = summary.trim().to_string();
        if summary.is_empty() {
            return Err(SynthesisError::EmptyOutput.into());
        }
        log::info!("synthesized summary in {} ms", started.elapsed().as_millis());

        let citations = CitationReport::check(&summary, &rows);
        if !citations.is_valid() {
            log::warn!(
                "citation check: {} cited, unresolved {:?}",
                citations.cited.len(),
                citations.unresolved
            );
            if self.citation_policy == CitationPolicy::Strict {
                return Err(if citations.cited.is_empty() {
                    SynthesisError::MissingCitations
                } else {
                    SynthesisError::UnresolvedCitations(citations.unresolved.clone())
                }
                .into());
            }
        }

        tracker.enter(PipelineState::Done);
        Ok(PipelineOutcome::Answered(InsightReport {
            question: request.question.trim().to_string(),
            analysis: request.analysis,
            query,
            rows,
            summary,
            citations,
        }))
    }
}

impl<T, R, S> Pipeline<T, R, S>
where
    T: QueryTranslator + Send + Sync + 'static,
    R: Retriever + Send + Sync + 'static,
    S: Synthesizer + Send + Sync + 'static,
{
    /// Run on a worker thread so the caller can keep handling input.
    /// Nothing is observable until the handle is joined.
    pub fn spawn(
        self: Arc<Self>,
        request: QueryRequest,
    ) -> JoinHandle<Result<PipelineOutcome, PipelineError>> {
        std::thread::spawn(move || self.run(&request))
    }
}

struct Tracker<'a> {
    state: PipelineState,
    observer: &'a mut dyn FnMut(&PipelineState),
}

impl Tracker<'_> {
    fn enter(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(&next),
            "illegal transition {} -> {}",
            self.state.as_str(),
            next.as_str()
        );
        log::debug!("pipeline: {} -> {}", self.state.as_str(), next.as_str());
        self.state = next;
        (self.observer)(&self.state);
    }
}

fn truncate(s: &str, max_chars: usize) -> Cow<'_, str> {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => Cow::Owned(format!("{}...", &s[..idx])),
        None => Cow::Borrowed(s),
    }
}
