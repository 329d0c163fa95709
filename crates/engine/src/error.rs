use std::fmt;

/// Failure while turning a question into SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// Question was empty after trimming.
    EmptyQuestion,
    /// No credential configured for the provider.
    MissingCredential(String),
    /// Provider rejected the credential (401/403 or key check failed).
    InvalidCredential(String),
    /// Network failure or timeout talking to the provider.
    Provider(String),
    /// Provider answered with no text.
    EmptyOutput,
    /// Provider answered, but the text is not a usable SELECT query.
    Unparseable(String),
}

impl fmt::Display for TranslationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyQuestion => write!(f, "question is empty"),
            Self::MissingCredential(msg) => write!(f, "missing API credential: {msg}"),
            Self::InvalidCredential(msg) => write!(f, "API credential rejected: {msg}"),
            Self::Provider(msg) => write!(f, "provider error: {msg}"),
            Self::EmptyOutput => write!(f, "model returned an empty query"),
            Self::Unparseable(text) => write!(f, "model output is not a SELECT query: {text}"),
        }
    }
}

impl std::error::Error for TranslationError {}

/// Failure while executing the generated query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalError {
    /// Read-only guard refused the statement before execution.
    Rejected { reason: String, keyword: Option<String> },
    /// Database file missing or cannot be opened.
    Unavailable(String),
    /// SQLite could not prepare the statement.
    Syntax(String),
    /// A column the synthesizer needs was not selected.
    MissingColumn(String),
    /// Query ran and matched nothing.
    NoMatches,
    /// Any other SQLite fault while stepping rows.
    Execution(String),
}

impl fmt::Display for RetrievalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { reason, keyword: Some(kw) } => {
                write!(f, "query rejected ({reason}): keyword `{kw}` is not allowed")
            }
            Self::Rejected { reason, keyword: None } => write!(f, "query rejected: {reason}"),
            Self::Unavailable(msg) => write!(f, "database unavailable: {msg}"),
            Self::Syntax(msg) => write!(f, "malformed query: {msg}"),
            Self::MissingColumn(col) => write!(f, "query result is missing required column '{col}'"),
            Self::NoMatches => write!(f, "no data found matching your query"),
            Self::Execution(msg) => write!(f, "query execution failed: {msg}"),
        }
    }
}

impl std::error::Error for RetrievalError {}

/// Failure while producing the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    MissingCredential(String),
    Provider(String),
    EmptyOutput,
    /// Strict citation policy: the summary cites no source at all.
    MissingCitations,
    /// Strict citation policy: the summary cites ids outside the result set.
    UnresolvedCitations(Vec<i64>),
}

impl fmt::Display for SynthesisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential(msg) => write!(f, "missing API credential: {msg}"),
            Self::Provider(msg) => write!(f, "provider error: {msg}"),
            Self::EmptyOutput => write!(f, "model returned an empty summary"),
            Self::MissingCitations => write!(f, "summary does not cite any source"),
            Self::UnresolvedCitations(ids) => {
                let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
                write!(f, "summary cites sources not in the result set: [{}]", ids.join(", "))
            }
        }
    }
}

impl std::error::Error for SynthesisError {}

/// Pipeline stage that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Translation,
    Retrieval,
    Synthesis,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Translation => "translation",
            Self::Retrieval => "retrieval",
            Self::Synthesis => "synthesis",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of one pipeline run. Carries the stage it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    Translation(TranslationError),
    Retrieval(RetrievalError),
    Synthesis(SynthesisError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Translation(_) => Stage::Translation,
            Self::Retrieval(_) => Stage::Retrieval,
            Self::Synthesis(_) => Stage::Synthesis,
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Translation(e) => write!(f, "{} failed: {e}", self.stage()),
            Self::Retrieval(e) => write!(f, "{} failed: {e}", self.stage()),
            Self::Synthesis(e) => write!(f, "{} failed: {e}", self.stage()),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Translation(e) => Some(e),
            Self::Retrieval(e) => Some(e),
            Self::Synthesis(e) => Some(e),
        }
    }
}

impl From<TranslationError> for PipelineError {
    fn from(e: TranslationError) -> Self {
        Self::Translation(e)
    }
}

impl From<RetrievalError> for PipelineError {
    fn from(e: RetrievalError) -> Self {
        Self::Retrieval(e)
    }
}

impl From<SynthesisError> for PipelineError {
    fn from(e: SynthesisError) -> Self {
        Self::Synthesis(e)
    }
}
