//! Local checks on user-supplied content, run before anything is uploaded.

use std::path::Path;

use crate::error::Error;
use crate::runtime::Runtime;

/// Largest HTML document accepted for template creation (10 MiB).
pub const MAX_HTML_SIZE: usize = 10 * 1024 * 1024;

/// Largest file accepted for upload (50 MiB).
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

pub fn validate_html_content(html: &str) -> Result<(), Error> {
    if html.len() > MAX_HTML_SIZE {
        return Err(Error::validation(
            "html",
            format!(
                "HTML content size {} bytes exceeds maximum allowed size of {} bytes (10MB)",
                html.len(),
                MAX_HTML_SIZE
            ),
        ));
    }
    if html.is_empty() {
        return Err(Error::validation("html", "HTML content cannot be empty"));
    }
    if !html.contains('<') || !html.contains('>') {
        return Err(Error::validation(
            "html",
            "HTML content does not appear to contain valid HTML tags",
        ));
    }
    Ok(())
}

/// Rejects files larger than [`MAX_FILE_SIZE`]. A file that cannot be read is also invalid.
pub fn validate_file_size<R: Runtime>(runtime: &R, path: &Path) -> Result<(), Error> {
    let size = runtime
        .file_size(path)
        .map_err(|e| Error::validation("file", format!("{:#}", e)))?;
    if size > MAX_FILE_SIZE {
        return Err(Error::validation(
            "file",
            format!(
                "file size {} bytes exceeds maximum allowed size of {} bytes (50MB)",
                size, MAX_FILE_SIZE
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;

    #[test]
    fn test_html_accepts_markup() {
        assert!(validate_html_content("<p>Sign here</p>").is_ok());
    }

    #[test]
    fn test_html_rejects_empty_and_plain_text() {
        assert!(matches!(
            validate_html_content(""),
            Err(Error::Validation { ref message, .. }) if message.contains("empty")
        ));
        assert!(matches!(
            validate_html_content("just words"),
            Err(Error::Validation { ref field, .. }) if field == "html"
        ));
    }

    #[test]
    fn test_html_rejects_oversized() {
        let html = format!("<p>{}</p>", "a".repeat(MAX_HTML_SIZE));
        let err = validate_html_content(&html).unwrap_err();
        assert!(err.to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_file_size_limit() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_file_size()
            .returning(|p| match p.to_str() {
                Some("small.pdf") => Ok(1024),
                Some("huge.pdf") => Ok(MAX_FILE_SIZE + 1),
                _ => Err(anyhow::anyhow!("Failed to stat file")),
            });

        assert!(validate_file_size(&runtime, Path::new("small.pdf")).is_ok());
        assert!(matches!(
            validate_file_size(&runtime, Path::new("huge.pdf")),
            Err(Error::Validation { ref field, .. }) if field == "file"
        ));
        assert!(validate_file_size(&runtime, Path::new("missing.pdf")).is_err());
    }
}
