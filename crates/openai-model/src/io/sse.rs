use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    Chunks(ChunksError),
    InvalidUtf8,
}

/// Reads the `data` payloads of server-sent events from a chunk stream.
///
/// Only the subset chat completion endpoints use is handled: `data`
/// fields (joined with `\n` when an event has several), comment lines,
/// and `\n` or `\r\n` line endings. Other fields such as `event` or `id`
/// are skipped.
pub struct Sse {
    buf: Vec<u8>,
    chunks: Chunks,
    exhausted: bool,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            chunks,
            exhausted: false,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            if let Some(event) = self.try_parse_event()? {
                return Ok(Some(event));
            }
            if self.exhausted {
                return Ok(None);
            }
            match self.chunks.next_chunk().await.map_err(Error::Chunks)? {
                Some(bytes) => self.buf.extend_from_slice(&bytes),
                None => self.exhausted = true,
            }
        }
    }

    fn try_parse_event(&mut self) -> Result<Option<String>, Error> {
        // Events without any data field are dispatched as nothing, keep
        // scanning until one carries data or the buffer runs dry.
        while let Some((block_len, sep_len)) = find_blank_line(&self.buf) {
            let block: Vec<u8> = self.buf.drain(..block_len + sep_len).collect();
            let block = std::str::from_utf8(&block[..block_len])
                .map_err(|_| Error::InvalidUtf8)?;

            let mut data: Option<String> = None;
            for line in block.lines() {
                let line = line.strip_suffix('\r').unwrap_or(line);
                if line.starts_with(':') {
                    continue;
                }
                let (field, value) = match line.split_once(':') {
                    Some((field, value)) => {
                        (field, value.strip_prefix(' ').unwrap_or(value))
                    }
                    None => (line, ""),
                };
                if field != "data" {
                    continue;
                }
                match &mut data {
                    Some(data) => {
                        data.push('\n');
                        data.push_str(value);
                    }
                    None => data = Some(value.to_owned()),
                }
            }

            if data.is_some() {
                return Ok(data);
            }
        }
        Ok(None)
    }
}

/// Finds the first blank line, returning the length of the event block
/// before it and the length of the separator.
fn find_blank_line(buf: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i < buf.len() {
        if buf[i..].starts_with(b"\r\n\r\n") {
            return Some((i, 4));
        }
        if buf[i..].starts_with(b"\n\n") {
            return Some((i, 2));
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_normal_events() {
        let chunks =
            Chunks::from_static(&[b"data: hello\n\n", b"data: bye\n\n"]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "bye");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_split_across_chunks() {
        let chunks = Chunks::from_static(&[b"data:", b" hello\n", b"\n"]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_comments_and_other_fields() {
        let chunks = Chunks::from_static(&[
            b": keep-alive\n\n",
            b"event: message\r\nid: 7\r\ndata: {\"a\":1}\r\n\r\n",
            b"data: line one\ndata: line two\n\n",
        ]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "{\"a\":1}");
        assert_eq!(
            sse.next_event().await.unwrap().unwrap(),
            "line one\nline two"
        );
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_incomplete_and_invalid() {
        let chunks = Chunks::from_static(&[b"data: dangling\n"]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap(), None);

        let chunks = Chunks::from_static(&[b"data: \xff\xfe\n\n"]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap_err(), Error::InvalidUtf8);
    }
}
