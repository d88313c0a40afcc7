//! Call arguments: a JSON value or a multipart form.

use std::path::Path;

use file_format::FileFormat;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;

use crate::error::{ClientError, ClientResult};

/// Content type set on JSON bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Arguments for one procedure call.
///
/// Built through `From`, so callers pass either a `serde_json::Value` or a
/// [`FormPayload`] and the invoker picks the body encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum CallRequest {
    /// Serialized as a JSON body.
    Json(Value),
    /// Sent as `multipart/form-data`, without a JSON content type.
    Form(FormPayload),
}

impl CallRequest {
    /// Serialize any value into a JSON call request.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> ClientResult<Self> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    /// Whether this request is a multipart form.
    pub fn is_form(&self) -> bool {
        matches!(self, Self::Form(_))
    }
}

impl Default for CallRequest {
    fn default() -> Self {
        Self::Json(Value::Object(Default::default()))
    }
}

impl From<Value> for CallRequest {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<FormPayload> for CallRequest {
    fn from(form: FormPayload) -> Self {
        Self::Form(form)
    }
}

/// A file attached to a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// File name reported to the server.
    pub file_name: String,
    /// Media type, e.g. `application/zip`.
    pub mime: Option<String>,
    /// Raw file contents.
    pub data: Vec<u8>,
}

impl FilePart {
    /// Create a file part from in-memory bytes.
    pub fn new(file_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: None,
            data: data.into(),
        }
    }

    /// Set the media type.
    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Read a file from disk, naming the part after it and sniffing its media type.
    pub async fn from_path(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ClientError::Config(format!("Not a file path: {}", path.display()))
            })?;
        let mime = FileFormat::from_bytes(&data).media_type().to_string();
        Ok(Self::new(file_name, data).mime(mime))
    }

    fn into_part(self) -> ClientResult<Part> {
        let part = Part::bytes(self.data).file_name(self.file_name);
        match self.mime {
            Some(mime) => Ok(part.mime_str(&mime)?),
            None => Ok(part),
        }
    }
}

/// A multipart form payload: text fields plus file parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormPayload {
    /// Text fields in insertion order.
    pub fields: Vec<(String, String)>,
    /// File parts in insertion order.
    pub files: Vec<(String, FilePart)>,
}

impl FormPayload {
    /// Create an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Add a file part.
    pub fn file(mut self, name: impl Into<String>, file: FilePart) -> Self {
        self.files.push((name.into(), file));
        self
    }

    /// Values of every text field with this name.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Total size of attached files in bytes.
    pub fn file_bytes(&self) -> usize {
        self.files.iter().map(|(_, f)| f.data.len()).sum()
    }

    /// Convert into a reqwest multipart form.
    pub fn into_form(self) -> ClientResult<Form> {
        let mut form = Form::new();
        for (name, value) in self.fields {
            form = form.text(name, value);
        }
        for (name, file) in self.files {
            form = form.part(name, file.into_part()?);
        }
        Ok(form)
    }
}
