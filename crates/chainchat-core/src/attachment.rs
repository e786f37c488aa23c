//! Prompt attachments: local files or inline blobs turned into multipart content.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::types::{ContentPart, FileData, ImageUrl, Message};

/// Where the attachment bytes come from.
#[derive(Clone, Debug, PartialEq)]
enum Source {
    Path(PathBuf),
    Inline(Vec<u8>),
}

/// A file or blob attached to a prompt, tagged with a media type.
#[derive(Clone, Debug, PartialEq)]
pub struct Attachment {
    source: Source,
    media_type: String,
}

impl Attachment {
    /// Attach a local file. The media type is guessed from the extension when not given.
    pub fn from_path(path: impl Into<PathBuf>, media_type: Option<String>) -> Self {
        let path = path.into();
        let media_type = media_type.unwrap_or_else(|| guess_media_type(&path).to_string());
        Self {
            source: Source::Path(path),
            media_type,
        }
    }

    /// Attach an in-memory blob.
    pub fn inline(data: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            source: Source::Inline(data),
            media_type: media_type.into(),
        }
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            Source::Path(p) => Some(p),
            Source::Inline(_) => None,
        }
    }

    /// Read the attachment bytes.
    pub fn content(&self) -> Result<Vec<u8>> {
        match &self.source {
            Source::Path(path) => std::fs::read(path)
                .with_context(|| format!("failed to read attachment {}", path.display())),
            Source::Inline(data) => Ok(data.clone()),
        }
    }

    fn filename(&self) -> Option<String> {
        self.path()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }

    /// Convert into one message content part.
    ///
    /// Images become data-URI image parts, text becomes a text part, anything
    /// else is sent as a base64 file part.
    pub fn to_content_part(&self) -> Result<ContentPart> {
        let data = self.content()?;
        let mime = self.media_type.as_str();

        if mime.starts_with("image/") {
            return Ok(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: data_uri(mime, &data),
                    detail: None,
                },
            });
        }

        if is_textual(mime) {
            let text = String::from_utf8(data)
                .with_context(|| format!("attachment of type {mime} is not valid UTF-8"))?;
            let text = match self.filename() {
                Some(name) => format!("{name}:\n{text}"),
                None => text,
            };
            return Ok(ContentPart::Text { text });
        }

        Ok(ContentPart::File {
            file: FileData {
                filename: self.filename(),
                file_data: data_uri(mime, &data),
            },
        })
    }
}

/// Build the human message for a prompt, folding in any attachments.
///
/// Without attachments the prompt is a plain text message; with attachments the
/// prompt text comes first, followed by one part per attachment in order.
pub fn build_message_with_attachments(
    prompt: &str,
    attachments: Option<&[Attachment]>,
) -> Result<Vec<Message>> {
    let attachments = match attachments {
        Some(a) if !a.is_empty() => a,
        _ => return Ok(vec![Message::user(prompt)]),
    };

    let mut parts = vec![ContentPart::Text {
        text: prompt.to_string(),
    }];
    for attachment in attachments {
        parts.push(attachment.to_content_part()?);
    }
    Ok(vec![Message::user_parts(parts)])
}

fn data_uri(mime: &str, data: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(data))
}

fn is_textual(mime: &str) -> bool {
    mime.starts_with("text/")
        || matches!(
            mime,
            "application/json" | "application/xml" | "application/x-yaml" | "application/toml"
        )
}

/// Extension-based media type guess.
fn guess_media_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "xml" => "application/xml",
        "yaml" | "yml" => "application/x-yaml",
        "toml" => "application/toml",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "txt" | "rs" | "py" | "sh" | "log" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_media_type() {
        assert_eq!(guess_media_type(Path::new("photo.PNG")), "image/png");
        assert_eq!(guess_media_type(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(guess_media_type(Path::new("doc.pdf")), "application/pdf");
        assert_eq!(guess_media_type(Path::new("notes.txt")), "text/plain");
        assert_eq!(guess_media_type(Path::new("blob")), "application/octet-stream");
    }

    #[test]
    fn test_explicit_media_type_wins() {
        let a = Attachment::from_path("picture.bin", Some("image/png".into()));
        assert_eq!(a.media_type(), "image/png");
    }

    #[test]
    fn test_no_attachments_is_plain_text() {
        let msgs = build_message_with_attachments("hello", None).unwrap();
        assert_eq!(msgs, vec![Message::user("hello")]);

        let msgs = build_message_with_attachments("hello", Some(&[])).unwrap();
        assert_eq!(msgs, vec![Message::user("hello")]);
    }

    #[test]
    fn test_inline_image_becomes_data_uri() {
        let a = Attachment::inline(b"Hello".to_vec(), "image/png");
        match a.to_content_part().unwrap() {
            ContentPart::ImageUrl { image_url } => {
                assert_eq!(image_url.url, "data:image/png;base64,SGVsbG8=");
            }
            other => panic!("expected image part, got {other:?}"),
        }
    }

    #[test]
    fn test_text_file_inlined_with_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "buy milk").unwrap();

        let msgs =
            build_message_with_attachments("summarize", Some(&[Attachment::from_path(&path, None)]))
                .unwrap();
        match &msgs[0] {
            Message::User {
                content: crate::types::MessageContent::Parts(parts),
            } => {
                assert_eq!(parts.len(), 2);
                assert_eq!(
                    parts[0],
                    ContentPart::Text {
                        text: "summarize".into()
                    }
                );
                assert_eq!(
                    parts[1],
                    ContentPart::Text {
                        text: "notes.txt:\nbuy milk".into()
                    }
                );
            }
            other => panic!("expected multipart user message, got {other:?}"),
        }
    }

    #[test]
    fn test_pdf_becomes_file_part() {
        let a = Attachment::inline(vec![1, 2, 3], "application/pdf");
        match a.to_content_part().unwrap() {
            ContentPart::File { file } => {
                assert!(file.file_data.starts_with("data:application/pdf;base64,"));
                assert!(file.filename.is_none());
            }
            other => panic!("expected file part, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_error() {
        let a = Attachment::from_path("/nonexistent/chainchat/attachment.png", None);
        assert!(a.to_content_part().is_err());
    }
}
