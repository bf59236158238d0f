use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};
use eyre::Result;
use log::{debug, info, warn};
use thiserror::Error;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read PDF: {0}")]
    Pdf(String),
    #[error("extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A resume file as handed over by the user.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            mime: mime.into(),
        }
    }

    /// Reads a file from disk, guessing its MIME type from the extension
    /// unless `mime_override` is given.
    pub async fn from_path(path: &Path, mime_override: Option<&str>) -> Result<Self> {
        info!("reading resume from file: {}", path.display());

        let bytes = tokio::fs::read(path).await?;
        let mime = match mime_override {
            Some(mime) => mime.to_string(),
            None => mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        debug!("loaded {} ({} bytes, {})", file_name, bytes.len(), mime);

        Ok(Self::new(file_name, bytes, mime))
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

pub struct DocumentLoader;

impl DocumentLoader {
    /// Converts an upload into plain text. Unsupported MIME types yield an
    /// empty string.
    pub async fn extract(upload: &Upload) -> Result<String, LoadError> {
        match normalize_mime(&upload.mime).as_str() {
            MIME_PDF => {
                let bytes = upload.bytes.clone();
                tokio::task::spawn_blocking(move || Self::extract_pdf(&bytes)).await?
            }
            MIME_TEXT => Ok(Self::decode_text(&upload.bytes)),
            other => {
                warn!("unsupported document type '{}' for {}", other, upload.file_name);
                Ok(String::new())
            }
        }
    }

    /// Concatenates the text of every page that has any, one newline after
    /// each page.
    pub fn extract_pdf(bytes: &[u8]) -> Result<String, LoadError> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map_err(|e| LoadError::Pdf(e.to_string()))?;

        debug!("extracted {} PDF pages", pages.len());

        Ok(join_pages(pages))
    }

    /// Decodes a text file. A byte-order mark wins, then NUL-interleaved
    /// UTF-16, then whatever encoding the detector settles on.
    pub fn decode_text(bytes: &[u8]) -> String {
        let (encoding, body) = match Encoding::for_bom(bytes) {
            Some((encoding, bom_len)) => (encoding, &bytes[bom_len..]),
            None => (detect_encoding(bytes), bytes),
        };
        debug!("decoding text as {}", encoding.name());

        let (text, had_errors) = encoding.decode_without_bom_handling(body);
        if had_errors {
            warn!("input is not valid {}, some characters were replaced", encoding.name());
        }
        text.into_owned()
    }
}

fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    if let Some(encoding) = utf16_without_bom(bytes) {
        return encoding;
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

/// The detector never reports UTF-16, so spot it by the NUL high bytes of
/// mostly-ASCII text.
fn utf16_without_bom(bytes: &[u8]) -> Option<&'static Encoding> {
    let pairs = bytes.len() / 2;
    if pairs == 0 || bytes.len() % 2 != 0 {
        return None;
    }

    let (even_nuls, odd_nuls) = bytes
        .chunks_exact(2)
        .fold((0, 0), |(even, odd), pair| {
            (even + usize::from(pair[0] == 0), odd + usize::from(pair[1] == 0))
        });

    match (even_nuls, odd_nuls) {
        (0, odd) if odd * 2 >= pairs => Some(UTF_16LE),
        (even, 0) if even * 2 >= pairs => Some(UTF_16BE),
        _ => None,
    }
}

fn join_pages(pages: Vec<String>) -> String {
    pages
        .into_iter()
        .filter(|page| !page.trim().is_empty())
        .fold(String::new(), |mut text, page| {
            text.push_str(&page);
            text.push('\n');
            text
        })
}

fn normalize_mime(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
