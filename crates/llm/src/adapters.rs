//! Pipeline stages backed by a language model.

use std::time::Instant;

use peoplesay_engine::prompts::{synthesis_prompt, translation_prompt};
use peoplesay_engine::{
    GeneratedQuery, QueryRequest, QueryTranslator, ResultSet, SynthesisError, Synthesizer,
    TranslationError,
};

use crate::backend::CompletionBackend;
use crate::sql::clean_sql;

/// Question → SQL through one completion call.
pub struct LlmTranslator<B> {
    backend: B,
    verify_key: bool,
}

impl<B: CompletionBackend> LlmTranslator<B> {
    pub fn new(backend: B) -> Self {
        Self { backend, verify_key: true }
    }

    /// Skip the key check before the first call.
    pub fn with_verify_key(mut self, verify: bool) -> Self {
        self.verify_key = verify;
        self
    }
}

impl<B: CompletionBackend> QueryTranslator for LlmTranslator<B> {
    fn check_credentials(&self) -> Result<(), TranslationError> {
        if !self.verify_key {
            return Ok(());
        }
        self.backend.verify_key().map_err(TranslationError::from)
    }

    fn translate(&self, request: &QueryRequest, schema: &str) -> Result<GeneratedQuery, TranslationError> {
        let prompt = translation_prompt(request, schema);
        let started = Instant::now();
        let raw = self.backend.complete(&prompt)?;
        log::debug!(
            "{} answered translation in {} ms",
            self.backend.model(),
            started.elapsed().as_millis()
        );
        clean_sql(&raw).map(GeneratedQuery::new)
    }
}

/// Rows → cited prose through one completion call.
pub struct LlmSynthesizer<B> {
    backend: B,
}

impl<B: CompletionBackend> LlmSynthesizer<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

impl<B: CompletionBackend> Synthesizer for LlmSynthesizer<B> {
    fn synthesize(&self, request: &QueryRequest, rows: &ResultSet) -> Result<String, SynthesisError> {
        let prompt = synthesis_prompt(request, rows);
        let started = Instant::now();
        let text = self.backend.complete(&prompt)?;
        log::debug!(
            "{} answered synthesis in {} ms",
            self.backend.model(),
            started.elapsed().as_millis()
        );
        Ok(text.trim().to_string())
    }
}
