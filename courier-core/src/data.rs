//! Request and response payloads.
//!
//! This module provides:
//! - [`Data`]: A request body or decoded response body
//! - [`FormData`]: A multipart form payload
//! - [`transform_request_data`] / [`transform_response_data`]: The default
//!   data transforms applied by the pipeline

use std::borrow::Cow;

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

/// A request body or a response body.
///
/// `Json` is the structured form: the default request transform encodes it to
/// text, and the default response transform produces it from text that
/// parses as JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Json(Value),
    Text(String),
    Bytes(Bytes),
    Form(FormData),
}

impl Data {
    /// Serialize any `Serialize` value into a `Data::Json` body.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Data::Json)
    }

    /// Returns true for a JSON object body, the only shape that gets a
    /// default `Content-Type: application/json`.
    pub fn is_json_object(&self) -> bool {
        matches!(self, Data::Json(Value::Object(_)))
    }

    /// Returns true for a multipart form body.
    pub fn is_form(&self) -> bool {
        matches!(self, Data::Form(_))
    }

    /// Borrow the body as text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Data::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the body as a JSON value, if it is JSON.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Data::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Deserialize the body into `T`.
    ///
    /// JSON bodies are converted directly; text and byte bodies are parsed.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match self {
            Data::Json(v) => T::deserialize(v),
            Data::Text(s) => serde_json::from_str(s),
            Data::Bytes(b) => serde_json::from_slice(b),
            Data::Form(_) => Err(serde::de::Error::custom("cannot deserialize a form body")),
        }
    }

    /// Encode the body into wire bytes.
    ///
    /// Forms are encoded as `multipart/form-data` with the given boundary.
    pub fn to_bytes(&self, boundary: &str) -> Bytes {
        match self {
            Data::Json(v) => Bytes::from(v.to_string()),
            Data::Text(s) => Bytes::from(s.clone()),
            Data::Bytes(b) => b.clone(),
            Data::Form(form) => form.encode(boundary),
        }
    }
}

impl From<Value> for Data {
    fn from(value: Value) -> Self {
        Data::Json(value)
    }
}

impl From<String> for Data {
    fn from(value: String) -> Self {
        Data::Text(value)
    }
}

impl From<&str> for Data {
    fn from(value: &str) -> Self {
        Data::Text(value.to_string())
    }
}

impl From<Bytes> for Data {
    fn from(value: Bytes) -> Self {
        Data::Bytes(value)
    }
}

impl From<Vec<u8>> for Data {
    fn from(value: Vec<u8>) -> Self {
        Data::Bytes(Bytes::from(value))
    }
}

impl From<FormData> for Data {
    fn from(value: FormData) -> Self {
        Data::Form(value)
    }
}

/// One field of a multipart form.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    File {
        filename: String,
        content_type: Option<String>,
        content: Bytes,
    },
}

/// A multipart form payload.
///
/// The transport is responsible for the `Content-Type` header, since it has to
/// carry the boundary it encodes with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    parts: Vec<(String, FormValue)>,
}

impl FormData {
    /// Create an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push((name.into(), FormValue::Text(value.into())));
        self
    }

    /// Add a file field.
    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: Option<&str>,
        content: impl Into<Bytes>,
    ) -> Self {
        self.parts.push((
            name.into(),
            FormValue::File {
                filename: filename.into(),
                content_type: content_type.map(str::to_string),
                content: content.into(),
            },
        ));
        self
    }

    /// All fields in insertion order.
    pub fn parts(&self) -> &[(String, FormValue)] {
        &self.parts
    }

    /// Returns true if the form has no fields.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Encode as a `multipart/form-data` body.
    pub fn encode(&self, boundary: &str) -> Bytes {
        let mut buf = BytesMut::new();
        for (name, value) in &self.parts {
            let name = escape_quoted(name);
            buf.put_slice(format!("--{boundary}\r\n").as_bytes());
            match value {
                FormValue::Text(text) => {
                    buf.put_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    buf.put_slice(text.as_bytes());
                }
                FormValue::File {
                    filename,
                    content_type,
                    content,
                } => {
                    let filename = escape_quoted(filename);
                    buf.put_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
                        )
                        .as_bytes(),
                    );
                    let content_type =
                        escape_quoted(content_type.as_deref().unwrap_or("application/octet-stream"));
                    buf.put_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
                    buf.put_slice(content);
                }
            }
            buf.put_slice(b"\r\n");
        }
        buf.put_slice(format!("--{boundary}--\r\n").as_bytes());
        buf.freeze()
    }
}

/// Percent-escape the characters that would end a quoted header parameter or
/// the header line itself.
fn escape_quoted(value: &str) -> Cow<'_, str> {
    if !value.contains(['"', '\r', '\n']) {
        return Cow::Borrowed(value);
    }
    Cow::Owned(
        value
            .replace('"', "%22")
            .replace('\r', "%0D")
            .replace('\n', "%0A"),
    )
}

/// Default request transform: JSON bodies are encoded to text, everything
/// else passes through.
pub fn transform_request_data(data: Option<Data>) -> Option<Data> {
    match data {
        Some(Data::Json(value)) => Some(Data::Text(value.to_string())),
        other => other,
    }
}

/// Default response transform: text that parses as JSON becomes `Data::Json`.
///
/// Parse failures keep the original text; this never fails.
pub fn transform_response_data(data: Data) -> Data {
    match data {
        Data::Text(text) => match serde_json::from_str::<Value>(&text) {
            Ok(value) => Data::Json(value),
            Err(_) => Data::Text(text),
        },
        other => other,
    }
}
