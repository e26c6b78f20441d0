use std::error::Error;

use crate::embedding::EmbeddingRequest;
use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// The error type for a model provider.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// A type that represents a model provider, which is an entry for
/// sampling chat completions.
///
/// Once the provider is created, it should behave like a stateless object.
/// Callers may clone requests and send them again, for example when a
/// rate-limited request is retried.
pub trait ModelProvider: Send + Sync {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// The response type for this provider.
    type Response: ModelResponse<Error = Self::Error>;

    /// Sends a request to the model.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}

/// A provider that turns text into embedding vectors.
pub trait EmbeddingProvider: Send + Sync {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// Embeds every input of the request.
    ///
    /// The returned vectors must be in the same order as
    /// [`EmbeddingRequest::inputs`], one vector per input.
    fn embed(
        &self,
        req: &EmbeddingRequest,
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, Self::Error>> + Send + 'static;
}
