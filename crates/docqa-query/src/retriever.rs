//! Question answering over a workspace.

use docqa_core::{
    Answer, Error, GenerateError, GenerationRequest, Generator, Result, RetrievalResult,
};
use docqa_index::WorkspaceIndex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::context::{NO_DOCUMENTS_ANSWER, build_messages, dedup_sources};

/// Retrieval and generation limits.
#[derive(Debug, Clone)]
pub struct RetrieverSettings {
    /// Results used when the caller gives no `k`
    pub default_k: usize,
    /// Upper bound for `k`; larger requests are clamped
    pub max_k: usize,
    /// Completion length bound
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Wait bound for the generation call
    pub timeout: Duration,
}

impl Default for RetrieverSettings {
    fn default() -> Self {
        Self {
            default_k: 5,
            max_k: 50,
            max_tokens: 1024,
            temperature: 0.1,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Retriever and context assembler.
pub struct Retriever {
    index: Arc<WorkspaceIndex>,
    generator: Arc<dyn Generator>,
    settings: RetrieverSettings,
}

impl Retriever {
    #[must_use]
    pub fn new(
        index: Arc<WorkspaceIndex>,
        generator: Arc<dyn Generator>,
        settings: RetrieverSettings,
    ) -> Self {
        Self {
            index,
            generator,
            settings,
        }
    }

    /// Scored chunks for `query`, best first, without generation.
    pub async fn search(
        &self,
        workspace_id: &str,
        query: &str,
        k: Option<usize>,
    ) -> Result<Vec<RetrievalResult>> {
        let query = validate_query(query)?;
        let k = self.resolve_k(k)?;
        self.index.query(workspace_id, query, k).await
    }

    /// Answer `query` from the workspace's documents.
    ///
    /// An empty workspace gets a fixed answer without calling the generator.
    /// Generation failures are folded into the answer text and
    /// `generation_error`; retrieved sources are kept.
    pub async fn answer(&self, workspace_id: &str, query: &str, k: Option<usize>) -> Result<Answer> {
        let query = validate_query(query)?;
        let k = self.resolve_k(k)?;

        let results = self.index.query(workspace_id, query, k).await?;
        if results.is_empty() {
            debug!("No chunks in workspace {}, skipping generation", workspace_id);
            return Ok(Answer {
                answer: NO_DOCUMENTS_ANSWER.to_string(),
                sources: Vec::new(),
                generation_error: None,
            });
        }

        let request = GenerationRequest {
            messages: build_messages(&results, query),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let generated = match tokio::time::timeout(
            self.settings.timeout,
            self.generator.generate(&request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(GenerateError::Timeout(self.settings.timeout.as_secs())),
        };

        let sources = dedup_sources(&results);
        match generated {
            Ok(answer) => {
                info!(
                    "Answered in {} from {} chunks via {}",
                    workspace_id,
                    results.len(),
                    self.generator.model_name()
                );
                Ok(Answer {
                    answer,
                    sources,
                    generation_error: None,
                })
            }
            Err(e) => {
                warn!("Generation failed for workspace {}: {}", workspace_id, e);
                Ok(Answer {
                    answer: format!("Error generating answer: {e}"),
                    sources,
                    generation_error: Some(e.to_string()),
                })
            }
        }
    }

    fn resolve_k(&self, k: Option<usize>) -> Result<usize> {
        match k {
            None => Ok(self.settings.default_k.min(self.settings.max_k)),
            Some(0) => Err(Error::InvalidQuery("k must be at least 1".to_string())),
            Some(k) => Ok(k.min(self.settings.max_k)),
        }
    }
}

fn validate_query(query: &str) -> Result<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidQuery("query is empty".to_string()));
    }
    Ok(trimmed)
}
