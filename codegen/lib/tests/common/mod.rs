//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::io::Write;

use flate2::Compression;
use flate2::write::DeflateEncoder;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SCHEMA_PATH: &str = "/api/v1/internal/contenttype";
pub const GENERATOR_PATH: &str = "/default/codegen-ts";

#[derive(Clone, Copy)]
pub enum Method {
    Stored,
    Deflated,
}

/// Builds a minimal zip archive holding `entries`.
pub fn zip_archive(entries: &[(&str, &str)], method: Method) -> Vec<u8> {
    let mut out = Vec::new();
    let mut central = Vec::new();

    for (name, contents) in entries {
        let data = contents.as_bytes();
        let mut crc = flate2::Crc::new();
        crc.update(data);
        let crc = crc.sum();

        let (method_id, payload) = match method {
            Method::Stored => (0u16, data.to_vec()),
            Method::Deflated => {
                let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data).unwrap();
                (8u16, encoder.finish().unwrap())
            }
        };
        let offset = out.len() as u32;

        put_u32(&mut out, 0x0403_4b50);
        put_u16(&mut out, 20);
        put_u16(&mut out, 0);
        put_u16(&mut out, method_id);
        put_u16(&mut out, 0);
        put_u16(&mut out, 0x21);
        put_u32(&mut out, crc);
        put_u32(&mut out, payload.len() as u32);
        put_u32(&mut out, data.len() as u32);
        put_u16(&mut out, name.len() as u16);
        put_u16(&mut out, 0);
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(&payload);

        put_u32(&mut central, 0x0201_4b50);
        put_u16(&mut central, 20);
        put_u16(&mut central, 20);
        put_u16(&mut central, 0);
        put_u16(&mut central, method_id);
        put_u16(&mut central, 0);
        put_u16(&mut central, 0x21);
        put_u32(&mut central, crc);
        put_u32(&mut central, payload.len() as u32);
        put_u32(&mut central, data.len() as u32);
        put_u16(&mut central, name.len() as u16);
        put_u16(&mut central, 0);
        put_u16(&mut central, 0);
        put_u16(&mut central, 0);
        put_u16(&mut central, 0);
        put_u32(&mut central, 0);
        put_u32(&mut central, offset);
        central.extend_from_slice(name.as_bytes());
    }

    let central_offset = out.len() as u32;
    let central_size = central.len() as u32;
    out.extend_from_slice(&central);

    put_u32(&mut out, 0x0605_4b50);
    put_u16(&mut out, 0);
    put_u16(&mut out, 0);
    put_u16(&mut out, entries.len() as u16);
    put_u16(&mut out, entries.len() as u16);
    put_u32(&mut out, central_size);
    put_u32(&mut out, central_offset);
    put_u16(&mut out, 0);
    out
}

fn put_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Serves a content type listing whose newest row has the given timestamps.
pub async fn mount_fingerprint(server: &MockServer, created_at: &str, updated_at: &str) {
    let body = format!(r#"{{"data":[{{"createdAt":"{created_at}","updatedAt":"{updated_at}"}}]}}"#);
    for order_by in ["createdAt", "updatedAt"] {
        Mock::given(method("GET"))
            .and(path(SCHEMA_PATH))
            .and(query_param("order_by", order_by))
            .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
            .mount(server)
            .await;
    }
}

/// Serves `archive` from the generator endpoint.
pub async fn mount_bundle(server: &MockServer, archive: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(GENERATOR_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
        .mount(server)
        .await;
}

/// Number of requests the generator endpoint has received.
pub async fn bundle_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == GENERATOR_PATH)
        .count()
}

pub fn client_for(server: &MockServer) -> codegen_lib::RemoteClient {
    codegen_lib::RemoteClient::new("test-key")
        .with_schema_url(format!("{}{SCHEMA_PATH}", server.uri()))
        .with_generator_url(format!("{}{GENERATOR_PATH}", server.uri()))
}

/// A small generated SDK, including one model with the duplicate import.
pub fn sample_sdk() -> Vec<(&'static str, &'static str)> {
    vec![
        ("package.json", r#"{"name":"flotiq-api","scripts":{"build":"tsc"}}"#),
        ("README.md", "# Flotiq API\n"),
        ("src/index.ts", "export * from './models';\n"),
        (
            "src/models/FooWithoutInternal.ts",
            "import { exists } from '../runtime';\n\
             import { DataSource, DataSourceFromJSON } from './DataSource';\n\
             import { DataSource, DataSourceFromJSON, DataSourceToJSON } from './DataSource';\n\
             export interface FooWithoutInternal {}\n",
        ),
        ("src/models/DataSource.ts", "export interface DataSource {}\n"),
    ]
}
