mod common;

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;

use http::{Method, StatusCode};
use httpmock::prelude::*;
use rest_client::{AsyncConnectionHandler, GzipInputAdapter, ReqwestTransport, RestClient};
use rest_client_sdk::{ClientConfig, ClientRequest, ClientResponse, HandlerContext, Json};
use tracing_test::traced_test;

use common::runtime;

#[derive(Debug, serde::Deserialize)]
struct Product {
    #[serde(rename = "Name")]
    name: String,
}

#[derive(Debug, serde::Deserialize)]
struct Feed {
    value: Vec<Product>,
}

#[test]
fn test_get_forwards_headers_and_reads_body() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/OData.svc/Products")
            .header("accept", "application/json")
            .header("x-tenant", "acme");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"value":[{"Name":"Bread"},{"Name":"Milk"}]}"#);
    });

    let rt = runtime();
    let handler = AsyncConnectionHandler::new(rt.handle().clone());
    let request = ClientRequest::builder()
        .uri(server.url("/OData.svc/Products"))
        .header("accept", "application/json")
        .unwrap()
        .header("x-tenant", "acme")
        .unwrap()
        .attribute(ClientConfig::default())
        .build()
        .unwrap();

    let response = handler.submit(request, &HandlerContext::new()).unwrap().get().unwrap();

    assert_eq!(response.status().unwrap(), StatusCode::OK);
    assert_eq!(response.message().unwrap(), "OK");
    let Json(feed) = response.entity::<Json<Feed>>().unwrap();
    let names: Vec<_> = feed.value.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Bread", "Milk"]);
    assert!(handler.is_open());
    mock.assert();
}

#[test]
fn test_buffered_post_sends_content_length() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/OData.svc/Products")
            .header("content-length", "8")
            .header("content-type", "text/plain; charset=utf-8")
            .body("<entry/>");
        then.status(201);
    });

    let rt = runtime();
    let handler = AsyncConnectionHandler::new(rt.handle().clone());
    let request = ClientRequest::builder()
        .method(Method::POST)
        .uri(server.url("/OData.svc/Products"))
        .attribute(ClientConfig::default().with_chunked(false))
        .entity("<entry/>")
        .build()
        .unwrap();

    let response = handler.submit(request, &HandlerContext::new()).unwrap().get().unwrap();
    assert_eq!(response.status().unwrap(), StatusCode::CREATED);
    mock.assert();
}

#[test]
fn test_chunked_post_streams_body() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/OData.svc/Products")
            .header("transfer-encoding", "chunked")
            .body("<entry><title>Streamed</title></entry>");
        then.status(201);
    });

    let rt = runtime();
    let handler = AsyncConnectionHandler::new(rt.handle().clone());
    let request = ClientRequest::builder()
        .method(Method::POST)
        .uri(server.url("/OData.svc/Products"))
        .attribute(ClientConfig::default().with_chunked(true))
        .entity(String::from("<entry><title>Streamed</title></entry>"))
        .build()
        .unwrap();

    let response = handler.submit(request, &HandlerContext::new()).unwrap().get().unwrap();
    assert_eq!(response.status().unwrap(), StatusCode::CREATED);
    mock.assert();
}

#[test]
fn test_non_canonical_reason_phrase_is_kept() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0_u8; 2048];
        let read = stream.read(&mut buf).unwrap();
        assert!(read > 0);
        stream
            .write_all(b"HTTP/1.1 200 Feed Ready\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok")
            .unwrap();
    });

    let rt = runtime();
    let handler = AsyncConnectionHandler::new(rt.handle().clone());
    let request = ClientRequest::builder()
        .uri(format!("http://{addr}/OData.svc/Products"))
        .attribute(ClientConfig::default())
        .build()
        .unwrap();

    let response = handler.submit(request, &HandlerContext::new()).unwrap().get().unwrap();
    assert_eq!(response.status().unwrap(), StatusCode::OK);
    assert_eq!(response.message().unwrap(), "Feed Ready");
    assert_eq!(response.entity::<String>().unwrap(), "ok");
    server.join().unwrap();
}

#[test]
fn test_no_content_yields_eof_body() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(DELETE).path("/OData.svc/Products(1)");
        then.status(204);
    });

    let rt = runtime();
    let handler = AsyncConnectionHandler::new(rt.handle().clone());
    let request = ClientRequest::builder()
        .method(Method::DELETE)
        .uri(server.url("/OData.svc/Products(1)"))
        .attribute(ClientConfig::default())
        .build()
        .unwrap();

    let response = handler.submit(request, &HandlerContext::new()).unwrap().get().unwrap();
    assert_eq!(response.status().unwrap(), StatusCode::NO_CONTENT);

    let mut body = Vec::new();
    response.take_body().unwrap().read_to_end(&mut body).unwrap();
    assert!(body.is_empty());
}

#[test]
fn test_gzip_response_is_decoded() {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(b"decoded through the input chain").unwrap();
    let compressed = encoder.finish().unwrap();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/compressed");
        then.status(200)
            .header("content-encoding", "gzip")
            .body(compressed.clone());
    });

    let rt = runtime();
    let handler = AsyncConnectionHandler::new(rt.handle().clone());
    let context = HandlerContext::new().with_input_adapter(GzipInputAdapter);
    let request = ClientRequest::builder()
        .uri(server.url("/compressed"))
        .attribute(ClientConfig::default())
        .build()
        .unwrap();

    let response = handler.submit(request, &context).unwrap().get().unwrap();
    assert_eq!(response.entity::<String>().unwrap(), "decoded through the input chain");
}

#[test]
fn test_rest_client_resource_get() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/OData.svc/Products")
            .query_param("$format", "json")
            .header("accept", "application/json");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"value":[{"Name":"Bread"}]}"#);
    });

    let rt = runtime();
    let handler = Arc::new(AsyncConnectionHandler::new(rt.handle().clone()));
    let client = RestClient::new(ClientConfig::default(), handler.clone());

    let response = client
        .resource(server.url("/OData.svc/Products?$format=json"))
        .accept(&mime::APPLICATION_JSON)
        .unwrap()
        .get()
        .unwrap();

    let Json(feed) = response.entity::<Json<Feed>>().unwrap();
    assert_eq!(feed.value[0].name, "Bread");
    mock.assert();

    handler.shutdown();
    let err = client.resource(server.url("/OData.svc/Products")).get().unwrap_err();
    assert!(matches!(err, rest_client_sdk::ClientError::Closed));
}

#[test]
fn test_connection_refused_surfaces_as_execution_error() {
    let rt = runtime();
    let handler = AsyncConnectionHandler::new(rt.handle().clone());
    let request = ClientRequest::builder()
        .uri("http://127.0.0.1:1/unreachable")
        .attribute(ClientConfig::default())
        .build()
        .unwrap();

    let pending = handler.submit(request, &HandlerContext::new()).unwrap();
    assert!(matches!(
        pending.get(),
        Err(rest_client_sdk::ClientError::Execution(_))
    ));
}

#[test]
#[traced_test]
fn test_insecure_flag_logs_warning() {
    let rt = runtime();
    let config = ClientConfig::default().danger_skip_hostname_verification();

    let transport = ReqwestTransport::from_config(&config, rt.handle());

    assert!(transport.is_ok());
    assert!(logs_contain("TLS hostname verification is DISABLED"));
}

#[test]
#[traced_test]
fn test_secure_default_does_not_warn() {
    let rt = runtime();
    assert!(ReqwestTransport::from_config(&ClientConfig::default(), rt.handle()).is_ok());
    assert!(!logs_contain("hostname verification is DISABLED"));
}
