/// A batch of texts to embed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct EmbeddingRequest {
    /// Texts to embed, in order.
    pub inputs: Vec<String>,
}

impl EmbeddingRequest {
    /// Creates a request from any iterator of strings.
    #[inline]
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
        }
    }
}
