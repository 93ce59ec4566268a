//! Gzip content-encoding adapters.

use std::io;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use http::HeaderMap;
use http::header::CONTENT_ENCODING;
use rest_client_sdk::{BodyReader, BodyWriter, ClientRequest, InputStreamAdapter, OutputStreamAdapter, ResponseHead};

/// Decodes response bodies sent with `Content-Encoding: gzip`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GzipInputAdapter;

impl InputStreamAdapter for GzipInputAdapter {
    fn adapt(&self, input: BodyReader, head: &ResponseHead) -> io::Result<BodyReader> {
        if is_gzip(&head.headers) {
            Ok(Box::new(GzDecoder::new(input)))
        } else {
            Ok(input)
        }
    }
}

/// Compresses request entities of requests that declare
/// `Content-Encoding: gzip`.
///
/// The gzip trailer is written when the adapted writer is dropped.
#[derive(Debug, Clone, Copy)]
pub struct GzipOutputAdapter {
    level: Compression,
}

impl Default for GzipOutputAdapter {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl GzipOutputAdapter {
    /// `level` from 0 (store) to 9 (best).
    #[must_use]
    pub fn with_level(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl OutputStreamAdapter for GzipOutputAdapter {
    fn adapt(&self, output: BodyWriter, request: &ClientRequest) -> io::Result<BodyWriter> {
        if is_gzip(request.headers()) {
            Ok(Box::new(GzEncoder::new(output, self.level)))
        } else {
            Ok(output)
        }
    }
}

fn is_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(CONTENT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|coding| coding.trim().eq_ignore_ascii_case("gzip"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderValue, StatusCode};
    use parking_lot::Mutex;
    use rest_client_sdk::HandlerContext;
    use std::io::{Read, Write};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn request(encoding: Option<&'static str>) -> ClientRequest {
        ClientRequest::builder()
            .uri("http://localhost/upload")
            .header_opt(CONTENT_ENCODING, encoding)
            .unwrap()
            .build()
            .unwrap()
    }

    fn head(encoding: &'static str) -> ResponseHead {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static(encoding));
        ResponseHead {
            status: StatusCode::OK,
            headers,
        }
    }

    #[test]
    fn test_round_trip() {
        let context = HandlerContext::new()
            .with_input_adapter(GzipInputAdapter)
            .with_output_adapter(GzipOutputAdapter::default());

        let sink = Sink::default();
        {
            let mut writer = context
                .adapt_output(Box::new(sink.clone()), &request(Some("gzip")))
                .unwrap();
            writer.write_all(b"compressible compressible compressible").unwrap();
        }
        let compressed = sink.0.lock().clone();
        assert_eq!(&compressed[..2], [0x1f, 0x8b]);

        let mut reader = context
            .adapt_input(Box::new(io::Cursor::new(compressed)), &head("gzip"))
            .unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "compressible compressible compressible");
    }

    #[test]
    fn test_identity_passes_through() {
        let sink = Sink::default();
        {
            let mut writer = GzipOutputAdapter::default()
                .adapt(Box::new(sink.clone()), &request(None))
                .unwrap();
            writer.write_all(b"plain").unwrap();
        }
        assert_eq!(*sink.0.lock(), b"plain");

        let mut reader = GzipInputAdapter
            .adapt(Box::new(io::Cursor::new(b"plain".to_vec())), &head("identity"))
            .unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"plain");
    }

    #[test]
    fn test_coding_list_detection() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("identity, GZIP"));
        assert!(is_gzip(&headers));
        assert!(!is_gzip(&HeaderMap::new()));
    }
}
