//! `multipart/form-data` bodies (RFC 7578).

use crate::types::{ParameterMap, media_type};
use crate::utils::mime::guess_part_type;
use bytes::{BufMut, Bytes, BytesMut};

/// One section of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl Part {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

/// An ordered list of form fields and files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<Part>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plain text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(Part {
            name: name.into(),
            file_name: None,
            content_type: None,
            data: Bytes::from(value.into()),
        });
        self
    }

    /// Add a file; its content type is guessed from the name, then the bytes.
    pub fn file(
        self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let file_name = file_name.into();
        let data = data.into();
        let content_type = guess_part_type(Some(&file_name), &data);
        self.file_with_type(name, file_name, data, content_type)
    }

    pub fn file_with_type(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        data: impl Into<Bytes>,
        content_type: impl Into<String>,
    ) -> Self {
        self.parts.push(Part {
            name: name.into(),
            file_name: Some(file_name.into()),
            content_type: Some(content_type.into()),
            data: data.into(),
        });
        self
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// A fresh boundary that will not collide with typical payloads.
    pub fn generate_boundary() -> String {
        format!("courier-{}", uuid::Uuid::new_v4().simple())
    }

    /// `Content-Type` header value for a given boundary.
    pub fn content_type(boundary: &str) -> String {
        format!("{}; boundary={boundary}", media_type::MULTIPART_FORM_DATA)
    }

    /// Serialize with `boundary`.
    pub fn encode(&self, boundary: &str) -> Bytes {
        let mut buf = BytesMut::new();
        for part in &self.parts {
            buf.put_slice(b"--");
            buf.put_slice(boundary.as_bytes());
            buf.put_slice(b"\r\n");

            buf.put_slice(b"Content-Disposition: form-data; name=\"");
            buf.put_slice(escape_quoted(&part.name).as_bytes());
            buf.put_u8(b'"');
            if let Some(file_name) = &part.file_name {
                buf.put_slice(b"; filename=\"");
                buf.put_slice(escape_quoted(file_name).as_bytes());
                buf.put_u8(b'"');
            }
            buf.put_slice(b"\r\n");
            if let Some(ct) = &part.content_type {
                buf.put_slice(b"Content-Type: ");
                buf.put_slice(ct.as_bytes());
                buf.put_slice(b"\r\n");
            }
            buf.put_slice(b"\r\n");
            buf.put_slice(&part.data);
            buf.put_slice(b"\r\n");
        }
        buf.put_slice(b"--");
        buf.put_slice(boundary.as_bytes());
        buf.put_slice(b"--\r\n");
        buf.freeze()
    }
}

// Quoted names percent-encode `"`, CR and LF.
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

impl From<&ParameterMap> for MultipartForm {
    fn from(params: &ParameterMap) -> Self {
        params
            .iter()
            .fold(Self::new(), |form, (key, value)| form.text(key, value))
    }
}
