// src/documents.rs
//! Resume document storage and plain-text extraction.

use crate::utils::{get_file_extension, sanitize_filename};
use anyhow::{Context, Result};
use regex::Regex;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};

pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];

const DOCX_BODY: &str = "word/document.xml";

/// Name a stored upload `<uuid>_<sanitized original name>`.
pub fn stored_filename(original: &str) -> String {
    format!("{}_{}", uuid::Uuid::new_v4(), sanitize_filename(original))
}

pub fn stored_path(upload_dir: &Path, original: &str) -> PathBuf {
    upload_dir.join(stored_filename(original))
}

/// Best-effort removal of a stored upload.
pub async fn remove_stored_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => info!("Removed stored file {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove stored file {}: {}", path.display(), e),
    }
}

/// Extract plain text from a stored resume. `None` when the file is missing,
/// unsupported, unreadable or yields no text.
pub async fn extract_text_from_file(path: &Path) -> Option<String> {
    let extension = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(get_file_extension)?;

    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Could not read {}: {}", path.display(), e);
            return None;
        }
    };

    let shown = path.display().to_string();
    let result = tokio::task::spawn_blocking(move || match extension.as_str() {
        "pdf" => extract_pdf_text(&bytes),
        // Legacy .doc is attempted with the docx reader
        "docx" | "doc" => extract_docx_text(&bytes),
        other => Err(anyhow::anyhow!("Unsupported file type: .{}", other)),
    })
    .await;

    let text = match result {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            warn!("Text extraction failed for {}: {:#}", shown, e);
            return None;
        }
        Err(e) => {
            warn!("Text extraction task failed for {}: {}", shown, e);
            return None;
        }
    };

    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

pub fn extract_pdf_text(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes).context("Failed to extract text from PDF")
}

fn docx_patterns() -> Option<&'static (Regex, Regex, Regex)> {
    static PATTERNS: OnceLock<Option<(Regex, Regex, Regex)>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some((
                Regex::new(r"</w:p>|<w:br\s*/>|<w:cr\s*/>").ok()?,
                Regex::new(r"<w:tab\s*/>").ok()?,
                Regex::new(r"<[^>]+>").ok()?,
            ))
        })
        .as_ref()
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Read the body part of a WordprocessingML container and flatten it to text.
pub fn extract_docx_text(bytes: &[u8]) -> Result<String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).context("Not a valid docx container")?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .with_context(|| format!("Missing {}", DOCX_BODY))?
        .read_to_string(&mut xml)
        .context("Failed to read document body")?;

    let (breaks, tabs, tags) =
        docx_patterns().ok_or_else(|| anyhow::anyhow!("Invalid docx patterns"))?;

    let text = breaks.replace_all(&xml, "\n");
    let text = tabs.replace_all(&text, "\t");
    let text = tags.replace_all(&text, "");

    Ok(decode_entities(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::{FileOptions, ZipWriter};

    fn docx_bytes(body: &str) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file::<_, ()>("[Content_Types].xml", FileOptions::default())
            .unwrap();
        zip.write_all(b"<Types/>").unwrap();
        zip.start_file::<_, ()>(DOCX_BODY, FileOptions::default())
            .unwrap();
        zip.write_all(body.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    const BODY: &str = r#"<?xml version="1.0"?><w:document><w:body>
<w:p><w:r><w:t>Jane Doe</w:t></w:r></w:p>
<w:p><w:r><w:t>Rust</w:t></w:r><w:r><w:tab/><w:t>Tokio &amp; Axum</w:t></w:r></w:p>
</w:body></w:document>"#;

    #[test]
    fn test_docx_text_keeps_paragraphs() {
        let text = extract_docx_text(&docx_bytes(BODY)).unwrap();
        let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        assert_eq!(lines, vec!["Jane Doe", "Rust\tTokio & Axum"]);
    }

    #[test]
    fn test_docx_rejects_non_zip() {
        assert!(extract_docx_text(b"plain text, not a zip").is_err());
    }

    #[test]
    fn test_docx_requires_document_part() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file::<_, ()>("other.xml", FileOptions::default())
            .unwrap();
        zip.write_all(b"<x/>").unwrap();
        let bytes = zip.finish().unwrap().into_inner();
        assert!(extract_docx_text(&bytes).is_err());
    }

    #[test]
    fn test_decode_entities_amp_last() {
        assert_eq!(decode_entities("&amp;lt; &lt;b&gt;"), "&lt; <b>");
    }

    #[test]
    fn test_stored_filename_is_prefixed() {
        let name = stored_filename("my resume.pdf");
        let (prefix, rest) = name.split_once('_').unwrap();
        assert!(uuid::Uuid::parse_str(prefix).is_ok());
        assert_eq!(rest, "my_resume.pdf");
    }

    #[tokio::test]
    async fn test_extract_text_from_docx_and_doc_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["cv.docx", "cv.DOC"] {
            let path = dir.path().join(name);
            std::fs::write(&path, docx_bytes(BODY)).unwrap();
            let text = extract_text_from_file(&path).await.unwrap();
            assert!(text.starts_with("Jane Doe"));
        }
    }

    #[tokio::test]
    async fn test_extract_text_failures_yield_none() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.pdf");
        assert!(extract_text_from_file(&missing).await.is_none());

        let broken = dir.path().join("broken.pdf");
        std::fs::write(&broken, b"%PDF-1.4 definitely not a pdf").unwrap();
        assert!(extract_text_from_file(&broken).await.is_none());

        let text = dir.path().join("notes.txt");
        std::fs::write(&text, b"hello").unwrap();
        assert!(extract_text_from_file(&text).await.is_none());

        let empty_docx = dir.path().join("empty.docx");
        std::fs::write(&empty_docx, docx_bytes("<w:document></w:document>")).unwrap();
        assert!(extract_text_from_file(&empty_docx).await.is_none());
    }

    #[tokio::test]
    async fn test_remove_stored_file_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.pdf");
        std::fs::write(&path, b"x").unwrap();
        remove_stored_file(&path).await;
        assert!(!path.exists());
        remove_stored_file(&path).await;
    }
}
