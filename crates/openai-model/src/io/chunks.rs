#[cfg(test)]
use std::collections::VecDeque;

use bytes::Bytes;
use reqwest::Response;

#[derive(Debug, PartialEq, Eq)]
pub struct Error(pub String);

/// A source of raw body chunks.
pub enum Chunks {
    Response(Response),
    #[cfg(test)]
    Memory(VecDeque<Bytes>),
}

impl Chunks {
    #[inline]
    pub fn from_response(response: Response) -> Self {
        Chunks::Response(response)
    }

    #[cfg(test)]
    pub fn from_static(chunks: &[&'static [u8]]) -> Self {
        Chunks::Memory(chunks.iter().copied().map(Bytes::from_static).collect())
    }

    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        match self {
            Chunks::Response(response) => {
                response.chunk().await.map_err(|err| Error(err.to_string()))
            }
            #[cfg(test)]
            Chunks::Memory(chunks) => Ok(chunks.pop_front()),
        }
    }
}
