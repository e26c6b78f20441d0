use std::path::{Path, PathBuf};

use super::RagError;

/// Reads a document as plain text.
///
/// PDF files go through `pdf-extract`, anything else must be UTF-8 text.
pub async fn load_document(path: &Path) -> Result<String, RagError> {
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    let text = if is_pdf {
        let path_buf = path.to_path_buf();
        tokio::task::spawn_blocking(move || extract_pdf(path_buf)).await??
    } else {
        tokio::fs::read_to_string(path).await.map_err(|source| {
            RagError::Io {
                path: path.to_owned(),
                source,
            }
        })?
    };

    if text.trim().is_empty() {
        return Err(RagError::EmptyDocument(path.to_owned()));
    }
    debug!("loaded {} chars from {}", text.len(), path.display());
    Ok(text)
}

fn extract_pdf(path: PathBuf) -> Result<String, RagError> {
    pdf_extract::extract_text(&path).map_err(|err| RagError::Pdf {
        path,
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[tokio::test]
    async fn test_loads_text_file() {
        let mut file =
            tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(file, "Skills: Rust, Python").unwrap();
        let text = load_document(file.path()).await.unwrap();
        assert_eq!(text, "Skills: Rust, Python\n");
    }

    #[tokio::test]
    async fn test_rejects_empty_document() {
        let file = tempfile::Builder::new().suffix(".md").tempfile().unwrap();
        let err = load_document(file.path()).await.unwrap_err();
        assert!(matches!(err, RagError::EmptyDocument(_)));
    }
}
