//! Artifact filename derivation for fetched documents.

use std::path::{Component, Path};

use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

/// Extension a URL path must carry to keep its own filename.
const DOCUMENT_EXTENSION: &str = ".pdf";

/// Hex characters of the URL digest used in synthesized names.
const HASH_PREFIX_LEN: usize = 16;

/// Chooses the local filename for a fetched URL.
///
/// Uses the last path segment when it names a `.pdf` file, otherwise
/// `document_<hash>.pdf` where `<hash>` is derived from the full URL.
pub(crate) fn artifact_filename(url: &Url) -> String {
    if let Some(mut segments) = url.path_segments()
        && let Some(last) = segments.next_back()
        && !last.is_empty()
    {
        let decoded = urlencoding::decode(last).map_or_else(
            |e| {
                debug!(segment = %last, error = %e, "URL decoding failed, using raw segment");
                last.to_string()
            },
            std::borrow::Cow::into_owned,
        );
        let sanitized = sanitize_filename(&decoded);
        if sanitized.to_lowercase().ends_with(DOCUMENT_EXTENSION)
            && sanitized.len() > DOCUMENT_EXTENSION.len()
            && is_safe_filename_segment(&sanitized)
        {
            return sanitized;
        }
    }

    synthesized_filename(url.as_str())
}

/// `document_<first 16 hex chars of sha256(url)>.pdf`
pub(crate) fn synthesized_filename(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let hex: String = digest
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<String>()
        .chars()
        .take(HASH_PREFIX_LEN)
        .collect();
    format!("document_{hex}{DOCUMENT_EXTENSION}")
}

/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > | and control characters.
pub(crate) fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(url: &str) -> Url {
        Url::parse(url).unwrap()
    }

    #[test]
    fn test_artifact_filename_uses_pdf_segment() {
        let url = parse("https://example.com/forms/w-9.pdf");
        assert_eq!(artifact_filename(&url), "w-9.pdf");
    }

    #[test]
    fn test_artifact_filename_pdf_extension_case_insensitive() {
        let url = parse("https://example.com/forms/INTAKE.PDF");
        assert_eq!(artifact_filename(&url), "INTAKE.PDF");
    }

    #[test]
    fn test_artifact_filename_decodes_percent_encoding() {
        let url = parse("https://example.com/forms/claim%20form.pdf");
        assert_eq!(artifact_filename(&url), "claim form.pdf");
    }

    #[test]
    fn test_artifact_filename_synthesizes_for_non_pdf() {
        let url = parse("https://example.com/download?id=42");
        let name = artifact_filename(&url);
        assert!(name.starts_with("document_"), "got {name}");
        assert!(name.ends_with(".pdf"));
        assert_eq!(name.len(), "document_".len() + 16 + ".pdf".len());
    }

    #[test]
    fn test_artifact_filename_synthesizes_for_bare_extension() {
        let url = parse("https://example.com/.pdf");
        assert!(artifact_filename(&url).starts_with("document_"));
    }

    #[test]
    fn test_synthesized_filename_is_stable_and_distinct() {
        let a = synthesized_filename("https://example.com/a");
        let b = synthesized_filename("https://example.com/b");
        assert_eq!(a, synthesized_filename("https://example.com/a"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_sanitize_filename_removes_invalid_chars() {
        assert_eq!(sanitize_filename("file:name.pdf"), "file_name.pdf");
        assert_eq!(sanitize_filename("file<name>.pdf"), "file_name_.pdf");
        assert_eq!(sanitize_filename("file|name.pdf"), "file_name.pdf");
    }

    #[test]
    fn test_encoded_slash_cannot_escape_directory() {
        let url = parse("https://example.com/%2e%2e%2fsecret.pdf");
        let name = artifact_filename(&url);
        assert!(!name.contains('/'));
    }
}
