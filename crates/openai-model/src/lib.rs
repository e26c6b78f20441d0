//! A model provider for OpenAI-compatible APIs.
//!
//! Chat completions are always streamed over server-sent events. The same
//! provider also serves the embeddings endpoint, see
//! [`EmbeddingProvider`].

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod config;
mod io;
mod proto;
mod response;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use mime::Mime;
use reqwest::{Client, Response, header};
use toolwire_model::{
    EmbeddingProvider, EmbeddingRequest, ErrorKind, ModelProvider,
    ModelProviderError, ModelRequest,
};

pub use config::{OpenAIConfig, OpenAIConfigBuilder};
use io::{Chunks, Sse};
pub use response::OpenAIResponse;

/// Error type for [`OpenAIProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        let kind = err
            .status()
            .map(|s| ErrorKind::from_status(s.as_u16()))
            .unwrap_or(ErrorKind::Other);
        Self::new(err.to_string(), kind)
    }

    /// Builds an error from a non-success response, preferring the message
    /// in the OpenAI error envelope over the raw body.
    async fn from_response(resp: Response) -> Self {
        let status = resp.status();
        let kind = ErrorKind::from_status(status.as_u16());
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<proto::ErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        Self::new(format!("{status}: {message}"), kind)
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// OpenAI-compatible model provider.
#[derive(Clone, Debug)]
pub struct OpenAIProvider {
    client: Client,
    config: Arc<OpenAIConfig>,
}

impl OpenAIProvider {
    /// Creates a new `OpenAIProvider` with the given configuration.
    #[inline]
    pub fn new(config: OpenAIConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Creates a provider that shares an existing HTTP client.
    #[inline]
    pub fn with_client(client: Client, config: OpenAIConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }
}

impl ModelProvider for OpenAIProvider {
    type Error = Error;
    type Response = OpenAIResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let openai_req = proto::create_request(req, &self.config);
        let resp_fut = self
            .client
            .post(self.config.endpoint("/chat/completions"))
            .bearer_auth(&self.config.api_key)
            .header(header::ACCEPT, "text/event-stream")
            .json(&openai_req)
            .send();

        async move {
            let resp = resp_fut.await.map_err(Error::from_reqwest)?;
            if !resp.status().is_success() {
                return Err(Error::from_response(resp).await);
            }

            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            let is_event_stream = content_type
                .and_then(|v| v.parse::<Mime>().ok())
                .map(|m| m.essence_str() == "text/event-stream")
                .unwrap_or(false);
            if !is_event_stream {
                return Err(Error::new(
                    format!("Unexpected content type: {content_type:?}"),
                    ErrorKind::Other,
                ));
            }

            let chunks = Chunks::from_response(resp);
            Ok(OpenAIResponse::from_sse(Sse::new(chunks)))
        }
    }
}

impl EmbeddingProvider for OpenAIProvider {
    type Error = Error;

    fn embed(
        &self,
        req: &EmbeddingRequest,
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, Self::Error>> + Send + 'static
    {
        let expected = req.inputs.len();
        let resp_fut = (expected > 0).then(|| {
            let body =
                proto::create_embedding_request(&req.inputs, &self.config);
            self.client
                .post(self.config.endpoint("/embeddings"))
                .bearer_auth(&self.config.api_key)
                .json(&body)
                .send()
        });

        async move {
            let Some(resp_fut) = resp_fut else {
                return Ok(vec![]);
            };
            let resp = resp_fut.await.map_err(Error::from_reqwest)?;
            if !resp.status().is_success() {
                return Err(Error::from_response(resp).await);
            }

            let mut resp: proto::EmbeddingResponse =
                resp.json().await.map_err(Error::from_reqwest)?;
            if resp.data.len() != expected {
                return Err(Error::new(
                    format!(
                        "expected {expected} embeddings, got {}",
                        resp.data.len()
                    ),
                    ErrorKind::Other,
                ));
            }
            resp.data.sort_by_key(|d| d.index);
            debug!("embedded {expected} inputs");
            Ok(resp.data.into_iter().map(|d| d.embedding).collect())
        }
    }
}
