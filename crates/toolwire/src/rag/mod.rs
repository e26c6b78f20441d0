//! Retrieval-augmented answering over a single document.
//!
//! The document is loaded, split into overlapping chunks and embedded in one
//! batch. Questions are embedded the same way, the closest chunks become the
//! context of a completion.

mod index;
mod loader;
mod splitter;

use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;
use toolwire_core::{ModelClient, PromptTemplate, TemplateError};
use toolwire_model::{
    EmbeddingProvider, EmbeddingRequest, ModelProviderError,
};

pub use index::{Chunk, VectorIndex};
pub use loader::load_document;
pub use splitter::TextSplitter;

/// The resume preset's answer when the resume does not cover a question.
pub const RESUME_FALLBACK: &str = "I don't know based on my resume.";
/// The policy preset's answer when the policy does not cover a question.
pub const POLICY_FALLBACK: &str = "I don't know based on policy document.";

const RESUME_PROMPT: &str = include_str!("../prompts/resume_qa.md");
const POLICY_PROMPT: &str = include_str!("../prompts/policy_qa.md");
const DEFAULT_TOP_K: usize = 4;

/// Errors that can occur while indexing or answering.
#[derive(Debug, Error)]
pub enum RagError {
    /// The document could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The document's path.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
    /// Text could not be extracted from a PDF.
    #[error("failed to extract text from {path}: {reason}")]
    Pdf {
        /// The document's path.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },
    /// The document has no text.
    #[error("{0} contains no text")]
    EmptyDocument(PathBuf),
    /// The embedding provider failed.
    #[error("embedding request failed: {0}")]
    Embedding(Box<dyn ModelProviderError>),
    /// The provider returned a different number of vectors than asked for.
    #[error("expected {expected} embeddings, got {actual}")]
    EmbeddingCount {
        /// Number of inputs sent.
        expected: usize,
        /// Number of vectors received.
        actual: usize,
    },
    /// The completion failed.
    #[error("model request failed: {0}")]
    Model(Box<dyn ModelProviderError>),
    /// The question could not be rendered into the prompt.
    #[error("failed to render the prompt: {0}")]
    Template(#[from] TemplateError),
    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

type EmbedResult = Result<Vec<Vec<f32>>, Box<dyn ModelProviderError>>;
type EmbedFuture = Pin<Box<dyn Future<Output = EmbedResult> + Send>>;
type EmbedFn = Arc<dyn Fn(EmbeddingRequest) -> EmbedFuture + Send + Sync>;

/// A type-erased [`EmbeddingProvider`].
#[derive(Clone)]
pub struct Embedder {
    embed_fn: EmbedFn,
}

impl Embedder {
    /// Wraps a provider.
    pub fn new<P: EmbeddingProvider + 'static>(provider: P) -> Self {
        let embed_fn: EmbedFn = Arc::new(move |req| {
            let fut = provider.embed(&req);
            Box::pin(async move {
                fut.await
                    .map_err(|err| Box::new(err) as Box<dyn ModelProviderError>)
            })
        });
        Self { embed_fn }
    }

    /// Embeds `inputs`, returning one vector per input in the same order.
    pub async fn embed(
        &self,
        inputs: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, RagError> {
        let expected = inputs.len();
        let vectors = (self.embed_fn)(EmbeddingRequest { inputs })
            .await
            .map_err(RagError::Embedding)?;
        if vectors.len() != expected {
            return Err(RagError::EmbeddingCount {
                expected,
                actual: vectors.len(),
            });
        }
        Ok(vectors)
    }
}

/// Splits `text` and indexes every chunk.
pub async fn build_index(
    text: &str,
    splitter: &TextSplitter,
    embedder: &Embedder,
) -> Result<VectorIndex, RagError> {
    let chunks = splitter.split(text);
    let vectors = embedder.embed(chunks.clone()).await?;
    info!("indexed {} chunks", chunks.len());
    Ok(chunks
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk { text, index })
        .zip(vectors)
        .collect())
}

/// The prompt of a [`DocumentQa`] and the answer it falls back to.
///
/// The template receives `{context}` and `{question}`.
#[derive(Clone, Debug)]
pub struct QaPrompt {
    template: PromptTemplate,
    fallback: String,
}

impl QaPrompt {
    /// Creates a prompt from a template string.
    pub fn new<S: Into<String>>(
        template: &str,
        fallback: S,
    ) -> Result<Self, TemplateError> {
        Ok(Self {
            template: PromptTemplate::from_template(template)?,
            fallback: fallback.into(),
        })
    }

    /// Interview questions answered as the candidate.
    #[inline]
    pub fn resume() -> Result<Self, TemplateError> {
        Self::new(RESUME_PROMPT, RESUME_FALLBACK)
    }

    /// Company policy questions answered as HR.
    #[inline]
    pub fn policy() -> Result<Self, TemplateError> {
        Self::new(POLICY_PROMPT, POLICY_FALLBACK)
    }

    /// Returns the fallback answer.
    #[inline]
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Maps a raw answer to the fallback when it is empty or admits not
    /// knowing.
    pub fn normalize(&self, answer: &str) -> String {
        let answer = answer.trim();
        if answer.is_empty() || answer.contains("I don't know") {
            self.fallback.clone()
        } else {
            answer.to_owned()
        }
    }
}

/// Answers questions from an indexed document.
#[derive(Clone)]
pub struct DocumentQa {
    index: Arc<VectorIndex>,
    embedder: Embedder,
    model_client: ModelClient,
    prompt: Arc<QaPrompt>,
    top_k: usize,
}

impl DocumentQa {
    /// Creates a QA chain over an existing index.
    pub fn new(
        index: VectorIndex,
        embedder: Embedder,
        model_client: ModelClient,
        prompt: QaPrompt,
    ) -> Self {
        Self {
            index: Arc::new(index),
            embedder,
            model_client,
            prompt: Arc::new(prompt),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Loads, splits and indexes a document.
    pub async fn from_document(
        path: &Path,
        embedder: Embedder,
        model_client: ModelClient,
        prompt: QaPrompt,
    ) -> Result<Self, RagError> {
        let text = load_document(path).await?;
        let index =
            build_index(&text, &TextSplitter::default(), &embedder).await?;
        Ok(Self::new(index, embedder, model_client, prompt))
    }

    /// Sets how many chunks are retrieved per question.
    #[inline]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Returns the prompt.
    #[inline]
    pub fn prompt(&self) -> &QaPrompt {
        &self.prompt
    }

    /// Retrieves the closest chunks and answers `question` from them,
    /// normalized with [`QaPrompt::normalize`].
    pub async fn answer(&self, question: &str) -> Result<String, RagError> {
        let context = self.retrieve(question).await?;
        debug!("retrieved {} chars of context", context.len());

        let prompt = self.prompt.template.format(&[
            ("context", context.as_str()),
            ("question", question),
        ])?;
        let answer = self
            .model_client
            .complete(prompt, None)
            .await
            .map_err(RagError::Model)?;
        Ok(self.prompt.normalize(&answer))
    }

    async fn retrieve(&self, question: &str) -> Result<String, RagError> {
        let query = self
            .embedder
            .embed(vec![question.to_owned()])
            .await?
            .pop()
            .unwrap_or_default();
        Ok(self
            .index
            .search(&query, self.top_k)
            .into_iter()
            .map(|(chunk, _)| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}
