mod common;

use std::fs;

use common::FakeServer;
use medrag::{fetch_remote_snapshot, resolve_index_path, FetchOutcome, IndexSource, RagError};
use tempfile::tempdir;

#[test]
fn present_destination_issues_no_request() {
    let server = FakeServer::start(vec![(200, "application/octet-stream", "fresh".to_string())]);
    let dir = tempdir().expect("tempdir");
    let dest = dir.path().join("medical_index.jsonl");
    fs::write(&dest, "cached").expect("seed destination");

    let outcome = fetch_remote_snapshot(&format!("{}/file", server.url), &dest).expect("fetch");
    assert_eq!(outcome, FetchOutcome::AlreadyPresent);
    assert!(server.requests().is_empty());
    assert_eq!(fs::read_to_string(&dest).expect("read"), "cached");
}

#[test]
fn absent_destination_is_downloaded_verbatim() {
    let body = "{\"id\":\"1\",\"document\":\"x\",\"embedding\":[1.0]}\n".to_string();
    let server = FakeServer::start(vec![(200, "application/octet-stream", body.clone())]);
    let dir = tempdir().expect("tempdir");
    let dest = dir.path().join("nested").join("medical_index.jsonl");

    let url = format!("{}/uc?id=abc", server.url);
    let outcome = fetch_remote_snapshot(&url, &dest).expect("fetch");
    assert_eq!(outcome, FetchOutcome::Downloaded { bytes: body.len() });
    assert_eq!(fs::read_to_string(&dest).expect("read"), body);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].request_line, "GET /uc?id=abc HTTP/1.1");
    assert!(requests[0].header("authorization").is_none());
}

#[test]
fn failed_status_reports_download_failure_and_writes_nothing() {
    let server = FakeServer::start(vec![(404, "text/html", "not found".to_string())]);
    let dir = tempdir().expect("tempdir");
    let dest = dir.path().join("medical_index.jsonl");
    let source = IndexSource::Remote {
        url: format!("{}/uc?id=missing", server.url),
        dest: dest.clone(),
    };

    let err = resolve_index_path(&source).expect_err("404 must fail");
    match err {
        RagError::Download { status, .. } => assert_eq!(status.as_u16(), 404),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dest.exists());
}

#[test]
fn local_source_resolves_without_network() {
    let dir = tempdir().expect("tempdir");
    let source = IndexSource::Local {
        dir: dir.path().join("Embedded_Med_books"),
    };
    assert_eq!(
        resolve_index_path(&source).expect("local path"),
        dir.path().join("Embedded_Med_books")
    );
}
