//! Document properties from the PDF info dictionary.
//!
//! Extraction never fails: an unreadable or corrupt file is logged and
//! yields a record whose property fields are all empty.

use crate::error::{DigestError, Result};
use lopdf::{Dictionary, Document, Object};
use std::path::Path;
use tracing::{debug, error};

/// Embedded document properties of one PDF
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub filename: String,
    pub title: String,
    pub author: String,
    pub subject: String,
    pub creator: String,
    /// Four-digit year sliced from `CreationDate`, or empty
    pub creation_year: String,
}

impl DocumentMetadata {
    /// Metadata with every property empty
    pub fn empty(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Default::default()
        }
    }
}

/// Read the info dictionary of the PDF at `path`.
///
/// The document is dropped (and its file handle closed) before returning.
pub fn extract_metadata(path: &Path) -> DocumentMetadata {
    let filename = file_name(path);

    match read_info(path) {
        Ok(mut metadata) => {
            metadata.filename = filename;
            debug!(file = %metadata.filename, title = %metadata.title, "Metadata extracted");
            metadata
        }
        Err(e) => {
            error!(file = %filename, error = %e, "Error extracting metadata");
            DocumentMetadata::empty(filename)
        }
    }
}

/// Final path component as a display string
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn read_info(path: &Path) -> Result<DocumentMetadata> {
    let doc = Document::load(path).map_err(|e| DigestError::Pdf(e.to_string()))?;

    let Some(info) = info_dictionary(&doc) else {
        return Ok(DocumentMetadata::default());
    };

    let creation_date = text_entry(&doc, info, b"CreationDate");

    Ok(DocumentMetadata {
        filename: String::new(),
        title: text_entry(&doc, info, b"Title"),
        author: text_entry(&doc, info, b"Author"),
        subject: text_entry(&doc, info, b"Subject"),
        creator: text_entry(&doc, info, b"Creator"),
        creation_year: creation_year(&creation_date),
    })
}

/// The trailer's `Info` entry, inline or by reference
fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match resolve(doc, doc.trailer.get(b"Info").ok()?)? {
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// String value for `key`, or empty when missing or not a string
fn text_entry(doc: &Document, dict: &Dictionary, key: &[u8]) -> String {
    dict.get(key)
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| match obj {
            Object::String(bytes, _) => Some(decode_text(bytes)),
            _ => None,
        })
        .unwrap_or_default()
}

/// PDF text strings are UTF-16BE when they start with a byte-order mark,
/// otherwise PDFDocEncoding (close enough to Latin-1 for properties).
fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let (text, _, _) = encoding_rs::UTF_16BE.decode(rest);
        return text.into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}

/// `D:YYYY...` -> `YYYY`; anything else -> empty.
pub fn creation_year(creation_date: &str) -> String {
    if creation_date.starts_with("D:") && creation_date.len() >= 6 {
        creation_date.get(2..6).unwrap_or_default().to_string()
    } else {
        String::new()
    }
}
