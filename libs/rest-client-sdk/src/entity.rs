use std::io::{self, Write};

use bytes::Bytes;
use mime::Mime;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ClientError;

/// Produces the body of an outgoing request.
///
/// `write_to` may be invoked more than once for the same request (a
/// streamed entity is re-produced for every transmission), so implementations
/// must be able to write the same bytes repeatedly.
pub trait EntityProducer: Send + Sync {
    /// Write the entity to `out`.
    ///
    /// # Errors
    /// Returns an I/O error if serialization or the underlying writer fails.
    fn write_to(&self, out: &mut dyn Write) -> io::Result<()>;

    /// Media type of the produced entity, if it has a natural one.
    fn content_type(&self) -> Option<Mime> {
        None
    }
}

/// Decodes a response entity into a concrete type.
pub trait FromEntity: Sized {
    /// Decode the fully-read `content`.
    ///
    /// # Errors
    /// Returns [`ClientError::Entity`] or [`ClientError::Serialization`] when
    /// the bytes do not form a valid `Self`.
    fn from_entity(content: Bytes, content_type: Option<&Mime>) -> Result<Self, ClientError>;
}

/// JSON entity wrapper, usable on both sides of the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Serialize + Send + Sync> EntityProducer for Json<T> {
    fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer(out, &self.0).map_err(io::Error::other)
    }

    fn content_type(&self) -> Option<Mime> {
        Some(mime::APPLICATION_JSON)
    }
}

impl<T: DeserializeOwned> FromEntity for Json<T> {
    fn from_entity(content: Bytes, _content_type: Option<&Mime>) -> Result<Self, ClientError> {
        Ok(Json(serde_json::from_slice(&content)?))
    }
}

impl EntityProducer for Bytes {
    fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(self)
    }

    fn content_type(&self) -> Option<Mime> {
        Some(mime::APPLICATION_OCTET_STREAM)
    }
}

impl EntityProducer for Vec<u8> {
    fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(self)
    }

    fn content_type(&self) -> Option<Mime> {
        Some(mime::APPLICATION_OCTET_STREAM)
    }
}

impl EntityProducer for String {
    fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(self.as_bytes())
    }

    fn content_type(&self) -> Option<Mime> {
        Some(mime::TEXT_PLAIN_UTF_8)
    }
}

impl EntityProducer for &'static str {
    fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(self.as_bytes())
    }

    fn content_type(&self) -> Option<Mime> {
        Some(mime::TEXT_PLAIN_UTF_8)
    }
}

impl FromEntity for Bytes {
    fn from_entity(content: Bytes, _content_type: Option<&Mime>) -> Result<Self, ClientError> {
        Ok(content)
    }
}

impl FromEntity for Vec<u8> {
    fn from_entity(content: Bytes, _content_type: Option<&Mime>) -> Result<Self, ClientError> {
        Ok(content.to_vec())
    }
}

impl FromEntity for String {
    fn from_entity(content: Bytes, _content_type: Option<&Mime>) -> Result<Self, ClientError> {
        String::from_utf8(content.to_vec())
            .map_err(|e| ClientError::Entity(format!("Invalid UTF-8: {e}")))
    }
}

impl FromEntity for serde_json::Value {
    fn from_entity(content: Bytes, _content_type: Option<&Mime>) -> Result<Self, ClientError> {
        Ok(serde_json::from_slice(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Product {
        id: u32,
        name: String,
    }

    #[test]
    fn test_json_producer_writes_compact_json() {
        let entity = Json(Product { id: 1, name: "Bread".to_owned() });
        let mut out = Vec::new();
        entity.write_to(&mut out).unwrap();
        assert_eq!(out, br#"{"id":1,"name":"Bread"}"#);
        assert_eq!(entity.content_type(), Some(mime::APPLICATION_JSON));
    }

    #[test]
    fn test_json_decoding() {
        let content = Bytes::from_static(br#"{"id":7,"name":"Milk"}"#);
        let Json(product) = Json::<Product>::from_entity(content, None).unwrap();
        assert_eq!(product, Product { id: 7, name: "Milk".to_owned() });
    }

    #[test]
    fn test_json_decoding_failure() {
        let err = Json::<Product>::from_entity(Bytes::from_static(b"<feed/>"), None).unwrap_err();
        assert!(matches!(err, ClientError::Serialization(_)));
    }

    #[test]
    fn test_string_rejects_invalid_utf8() {
        let err = String::from_entity(Bytes::from_static(&[0xff, 0xfe]), None).unwrap_err();
        assert!(matches!(err, ClientError::Entity(_)));
    }

    #[test]
    fn test_producer_is_repeatable() {
        let entity = String::from("hello");
        let mut first = Vec::new();
        let mut second = Vec::new();
        entity.write_to(&mut first).unwrap();
        entity.write_to(&mut second).unwrap();
        assert_eq!(first, second);
    }
}
