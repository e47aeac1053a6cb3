
use std::fmt;
use std::path::Path;

use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::embeddings::Embedder;
use crate::store::ChunkStore;
use crate::vector::{SearchHit, VectorIndex};
use crate::{RagError, Result};

/// The pluggable answer-generation seam: an opaque, blocking
/// text-in/text-out call with a token budget.
pub trait LanguageModel {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}

/// Role tag for one utterance in an interactive session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One turn of an interactive session. Kept in memory only; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[inline]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Retrieval and generation knobs for a query session.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub top_k: usize,
    /// Keyword filter: retrieved chunks must contain all of these
    /// (case-insensitive substring match). Empty means no filtering.
    pub keywords: Vec<String>,
    /// How many trailing conversation turns to prepend to the query
    /// embedding. 0 disables history.
    pub context_turns: usize,
    pub max_tokens: u32,
    /// Hard character cap on the assembled prompt; over-length prompts are
    /// truncated from the tail.
    pub prompt_char_budget: usize,
}

/// A retrieved chunk surviving filtering, in retrieval-rank order.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    /// Positional index shared by the vector index and chunk store.
    pub index: usize,
    pub distance: f32,
    pub filepath: String,
    pub text: String,
}

/// Outcome of one query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Answered {
        answer: String,
        retrieved: Vec<RetrievedChunk>,
    },
    /// Retrieval (or the keyword filter) produced nothing to answer from.
    /// Deliberately not a fallback to unfiltered results.
    NoRelevantChunks,
}

/// Answers queries against a persisted index/store pair: embed, retrieve,
/// optionally keyword-filter, assemble context, generate.
pub struct QueryEngine<'a> {
    index: VectorIndex,
    store: ChunkStore,
    embedder: &'a Embedder,
    llm: &'a dyn LanguageModel,
    options: QueryOptions,
}

impl fmt::Debug for QueryEngine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryEngine")
            .field("index", &self.index)
            .field("store", &self.store)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'a> QueryEngine<'a> {
    /// Load the index and chunk store and validate their alignment. A
    /// missing or corrupt artifact, or a mismatched pair, is fatal: no query
    /// can run against it.
    #[inline]
    pub fn open(
        index_path: &Path,
        chunk_store_path: &Path,
        embedder: &'a Embedder,
        llm: &'a dyn LanguageModel,
        options: QueryOptions,
    ) -> Result<Self> {
        let index = VectorIndex::load(index_path)?;
        let store = ChunkStore::load(chunk_store_path)?;

        if store.len() != index.len() {
            return Err(RagError::Misaligned {
                store_len: store.len(),
                index_len: index.len(),
            });
        }

        info!(
            "Query engine ready: {} chunks, dimension {}",
            index.len(),
            index.dimension()
        );

        Ok(Self {
            index,
            store,
            embedder,
            llm,
            options,
        })
    }

    /// Answer one query, optionally against the rolling conversation window.
    #[inline]
    pub fn ask(&self, query: &str, history: &[ConversationTurn]) -> Result<QueryOutcome> {
        let embed_input = self.query_with_history(query, history);
        debug!("Embedding query (length: {})", embed_input.len());
        let query_vector = self.embedder.embed_one(&embed_input)?;

        let hits = self.index.search(&query_vector, self.options.top_k)?;
        debug!("Retrieved {} chunks", hits.len());

        let retrieved = self.filter_hits(&hits)?;
        if retrieved.is_empty() {
            return Ok(QueryOutcome::NoRelevantChunks);
        }

        let context = retrieved.iter().map(|c| c.text.as_str()).join(" ");
        let prompt = self.build_prompt(&context, query);
        let answer = self.llm.complete(&prompt, self.options.max_tokens)?;

        Ok(QueryOutcome::Answered { answer, retrieved })
    }

    /// Prepend the last `context_turns` history entries to the query text so
    /// the embedding sees the rolling conversation window.
    fn query_with_history(&self, query: &str, history: &[ConversationTurn]) -> String {
        if self.options.context_turns == 0 || history.is_empty() {
            return query.to_string();
        }

        let window_start = history.len().saturating_sub(self.options.context_turns);
        let context = history[window_start..]
            .iter()
            .map(|turn| format!("{}: {}", turn.role, turn.content))
            .join(" ");

        format!("{context} {query}")
    }

    /// Apply the keyword filter: a chunk survives only when its lowercased
    /// text contains every supplied keyword (logical AND). With no keywords
    /// every hit survives.
    fn filter_hits(&self, hits: &[SearchHit]) -> Result<Vec<RetrievedChunk>> {
        let keywords: Vec<String> = self
            .options
            .keywords
            .iter()
            .map(|k| k.to_lowercase())
            .collect();

        let mut retrieved = Vec::with_capacity(hits.len());
        for hit in hits {
            let record = self.store.get(hit.index)?;
            if !keywords.is_empty() {
                let text = record.text.to_lowercase();
                if !keywords.iter().all(|k| text.contains(k.as_str())) {
                    continue;
                }
            }
            retrieved.push(RetrievedChunk {
                index: hit.index,
                distance: hit.distance,
                filepath: record.filepath.clone(),
                text: record.text.clone(),
            });
        }

        if !self.options.keywords.is_empty() {
            debug!(
                "Keyword filter kept {}/{} chunks",
                retrieved.len(),
                hits.len()
            );
        }

        Ok(retrieved)
    }

    /// Render the fixed prompt template and enforce the character budget.
    ///
    /// The budget is character-based even though the model limit is in
    /// tokens, so truncation is a lossy approximation and may cut mid-word.
    fn build_prompt(&self, context: &str, query: &str) -> String {
        let mut prompt = format!(
            "Context information is below.\n\
             ---------------------\n\
             {context}\n\
             ---------------------\n\
             Given the context information and not prior knowledge, answer the query.\n\
             Query: {query}\n\
             Answer:"
        );

        let budget = self.options.prompt_char_budget;
        let char_count = prompt.chars().count();
        if char_count > budget {
            warn!(
                "Prompt length ({char_count} chars) exceeds budget ({budget}), truncating tail"
            );
            let byte_end = prompt
                .char_indices()
                .nth(budget)
                .map_or(prompt.len(), |(i, _)| i);
            prompt.truncate(byte_end);
        }

        prompt
    }
}
