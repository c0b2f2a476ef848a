//! Raw upstream records as returned by the Zotero Web API.
//!
//! The core never depends on the wire shape beyond the handful of accessors
//! defined here; everything else is carried opaquely and persisted as-is.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// MIME type that marks an attachment as a PDF
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// An opaque upstream record (item or collection)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Value);

impl RawRecord {
    /// Wrap a JSON value
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Borrow the underlying JSON value
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consume the record and return the underlying JSON value
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Record key, taken from `data.key` and falling back to the top-level `key`
    pub fn key(&self) -> Option<&str> {
        self.data_str("key")
            .or_else(|| self.0.get("key").and_then(Value::as_str))
            .filter(|k| !k.is_empty())
    }

    /// A field of the record's `data` object
    pub fn data(&self, field: &str) -> Option<&Value> {
        self.0.get("data").and_then(|d| d.get(field))
    }

    /// A string field of the record's `data` object
    pub fn data_str(&self, field: &str) -> Option<&str> {
        self.data(field).and_then(Value::as_str)
    }

    /// A string field of the record's `data` object, `None` when empty
    pub fn data_nonempty(&self, field: &str) -> Option<&str> {
        self.data_str(field).filter(|s| !s.is_empty())
    }

    /// A field of the record's `meta` object
    pub fn meta(&self, field: &str) -> Option<&Value> {
        self.0.get("meta").and_then(|m| m.get(field))
    }

    /// Whether this record is a PDF attachment.
    ///
    /// Any one of three signals is enough: the content type (top level or
    /// under `data`), the enclosure link type, or the attachment type.
    pub fn is_pdf_attachment(&self) -> bool {
        let content_type = self
            .0
            .get("contentType")
            .and_then(Value::as_str)
            .or_else(|| self.data_str("contentType"));
        let enclosure_type = self
            .0
            .pointer("/links/enclosure/type")
            .and_then(Value::as_str);
        let attachment_type = self
            .0
            .pointer("/attachment/attachmentType")
            .and_then(Value::as_str);

        [content_type, enclosure_type, attachment_type]
            .into_iter()
            .any(|signal| signal == Some(PDF_CONTENT_TYPE))
    }
}

impl From<Value> for RawRecord {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
