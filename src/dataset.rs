//! Uploaded dataset descriptors.
//!
//! The host reads the file; this module decides whether it is tabular or an
//! image, decodes it into a [`RawContent`], and derives the column header.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

const CSV_MIME_TYPES: &[&str] = &["text/csv", "application/csv", "application/vnd.ms-excel"];
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

/// File acceptance event delivered by the host.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub name: String,
    /// MIME type if the host knows it, otherwise empty.
    pub mime_hint: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, mime_hint: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            mime_hint: mime_hint.into(),
            bytes: bytes.into(),
        }
    }

    fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }

    /// Detect the dataset kind, or `None` if the file is neither CSV-like nor image-like.
    pub fn detect_kind(&self) -> Option<DatasetKind> {
        let mime = self.mime_hint.trim().to_ascii_lowercase();
        let ext = self.extension();

        if CSV_MIME_TYPES.contains(&mime.as_str()) || ext.as_deref() == Some("csv") {
            return Some(DatasetKind::Tabular);
        }
        if mime.starts_with("image/")
            || ext
                .as_deref()
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e))
        {
            return Some(DatasetKind::Image);
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatasetKind {
    Tabular,
    Image,
}

impl DatasetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Tabular => "tabular (CSV)",
            DatasetKind::Image => "image",
        }
    }
}

/// File content as handed to the request client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "encoding", content = "data", rename_all = "snake_case")]
pub enum RawContent {
    Text(String),
    Image { mime: String, base64: String },
}

impl RawContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawContent::Text(text) => Some(text),
            RawContent::Image { .. } => None,
        }
    }
}

/// An accepted upload. Immutable until the session is reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetDescriptor {
    pub name: String,
    pub kind: DatasetKind,
    pub raw_content: RawContent,
    /// Header columns; empty for images.
    pub column_names: Vec<String>,
}

impl DatasetDescriptor {
    /// Build a descriptor from an upload, or `None` for unsupported file types.
    pub fn from_upload(upload: FileUpload) -> Option<Self> {
        let kind = upload.detect_kind()?;
        let descriptor = match kind {
            DatasetKind::Tabular => {
                let text = String::from_utf8_lossy(&upload.bytes).into_owned();
                let column_names = derive_column_names(&text);
                Self {
                    name: upload.name,
                    kind,
                    raw_content: RawContent::Text(text),
                    column_names,
                }
            }
            DatasetKind::Image => {
                let mime = if upload.mime_hint.trim().is_empty() {
                    image_mime_from_name(&upload.name)
                } else {
                    upload.mime_hint.trim().to_string()
                };
                Self {
                    name: upload.name,
                    kind,
                    raw_content: RawContent::Image {
                        mime,
                        base64: STANDARD.encode(&upload.bytes),
                    },
                    column_names: Vec::new(),
                }
            }
        };
        Some(descriptor)
    }

    pub fn is_tabular(&self) -> bool {
        self.kind == DatasetKind::Tabular
    }

    /// Every column except `target`, in header order.
    pub fn feature_columns<'a>(&'a self, target: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        feature_columns(&self.column_names, target)
    }
}

/// Every column except `target`, in header order.
pub fn feature_columns<'a>(
    columns: &'a [String],
    target: &'a str,
) -> impl Iterator<Item = &'a str> + 'a {
    columns
        .iter()
        .map(String::as_str)
        .filter(move |c| *c != target)
}

/// First `n` lines of CSV text (header included), newline-joined.
pub fn head(text: &str, n: usize) -> String {
    text.lines().take(n).collect::<Vec<_>>().join("\n")
}

/// Data rows 2 through `n + 1` of CSV text (header skipped), newline-joined.
pub fn data_rows(text: &str, n: usize) -> String {
    text.lines().skip(1).take(n).collect::<Vec<_>>().join("\n")
}

/// Split the first line on commas and strip whitespace and double quotes per field.
///
/// Deliberately not a CSV parser: quoted commas split the field.
pub fn derive_column_names(content: &str) -> Vec<String> {
    match content.lines().next() {
        Some(header) => header
            .split(',')
            .map(|field| field.trim().replace('"', ""))
            .collect(),
        None => Vec::new(),
    }
}

fn image_mime_from_name(name: &str) -> String {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg".into(),
        "" => "application/octet-stream".into(),
        other => format!("image/{other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_derivation_strips_quotes() {
        assert_eq!(derive_column_names("a,\"b\",c\nrow1"), vec!["a", "b", "c"]);
    }

    #[test]
    fn header_derivation_handles_crlf_and_padding() {
        assert_eq!(
            derive_column_names(" date , region ,amount\r\n2024-01,EU,3"),
            vec!["date", "region", "amount"]
        );
    }

    #[test]
    fn header_derivation_empty_content() {
        assert!(derive_column_names("").is_empty());
    }

    #[test]
    fn quoted_commas_are_not_special() {
        assert_eq!(derive_column_names("\"a,b\",c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn detects_kinds_from_mime_or_extension() {
        assert_eq!(
            FileUpload::new("sales.csv", "", b"a".to_vec()).detect_kind(),
            Some(DatasetKind::Tabular)
        );
        assert_eq!(
            FileUpload::new("export", "text/csv", b"a".to_vec()).detect_kind(),
            Some(DatasetKind::Tabular)
        );
        assert_eq!(
            FileUpload::new("cat.JPG", "", vec![0xff, 0xd8]).detect_kind(),
            Some(DatasetKind::Image)
        );
        assert_eq!(
            FileUpload::new("scan", "image/png", vec![0x89]).detect_kind(),
            Some(DatasetKind::Image)
        );
        assert_eq!(
            FileUpload::new("notes.txt", "text/plain", b"hi".to_vec()).detect_kind(),
            None
        );
    }

    #[test]
    fn image_descriptor_encodes_payload() {
        let d = DatasetDescriptor::from_upload(FileUpload::new("x.png", "", vec![1, 2, 3])).unwrap();
        assert_eq!(d.kind, DatasetKind::Image);
        assert!(d.column_names.is_empty());
        assert_eq!(
            d.raw_content,
            RawContent::Image {
                mime: "image/png".into(),
                base64: "AQID".into()
            }
        );
        assert_eq!(d.raw_content.as_text(), None);
    }

    #[test]
    fn tabular_helpers_slice_lines() {
        let csv = "h1,h2\n1,2\n3,4\n5,6\n7,8\n9,10\n";
        let d = DatasetDescriptor::from_upload(FileUpload::new("d.csv", "text/csv", csv)).unwrap();
        let text = d.raw_content.as_text().unwrap();
        assert_eq!(head(text, 5), "h1,h2\n1,2\n3,4\n5,6\n7,8");
        assert_eq!(data_rows(text, 3), "1,2\n3,4\n5,6");
        assert_eq!(d.feature_columns("h2").collect::<Vec<_>>(), vec!["h1"]);
    }
}
