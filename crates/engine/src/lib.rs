pub mod citations;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod prompts;

pub use citations::{extract_citations, CitationPolicy, CitationReport};
pub use error::{PipelineError, RetrievalError, Stage, SynthesisError, TranslationError};
pub use model::{AnalysisType, Excerpt, GeneratedQuery, QueryRequest, ResultSet};
pub use pipeline::{
    InsightReport, Pipeline, PipelineOutcome, PipelineState, QueryTranslator, Retriever,
    Synthesizer,
};
