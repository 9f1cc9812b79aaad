//! Watch mode against a mock service and a real fingerprint file.

mod common;

use std::fs;

use codegen_lib::{
    Fingerprint, FingerprintStore, JsonFingerprintFile, Pipeline, TickOutcome, Watcher,
};
use common::{Method, bundle_requests, client_for, mount_bundle, mount_fingerprint, sample_sdk, zip_archive};
use tempfile::TempDir;
use wiremock::MockServer;

struct Fixture {
    server: MockServer,
    project: TempDir,
    state: TempDir,
}

impl Fixture {
    async fn new() -> Self {
        Self {
            server: MockServer::start().await,
            project: TempDir::new().unwrap(),
            state: TempDir::new().unwrap(),
        }
    }

    fn store(&self) -> JsonFingerprintFile {
        JsonFingerprintFile::new(self.state.path().join("watch-config.json"))
    }

    fn watcher(&self) -> Watcher<codegen_lib::RemoteClient, JsonFingerprintFile> {
        let pipeline = Pipeline::new(
            client_for(&self.server),
            self.project.path().join("flotiqApi"),
        );
        Watcher::new(pipeline, self.store())
    }
}

#[tokio::test]
async fn first_poll_only_records_baseline() {
    let fx = Fixture::new().await;
    mount_fingerprint(&fx.server, "2024-01-01T00:00:00Z", "2024-01-01T00:00:00Z").await;
    mount_bundle(&fx.server, zip_archive(&sample_sdk(), Method::Stored)).await;

    let outcome = fx.watcher().tick().await;

    assert!(matches!(outcome, TickOutcome::Baseline));
    assert_eq!(
        fx.store().load().unwrap(),
        Some(Fingerprint::new("2024-01-01T00:00:00Z", "2024-01-01T00:00:00Z"))
    );
    assert_eq!(bundle_requests(&fx.server).await, 0);
    assert!(!fx.project.path().join("flotiqApi").exists());
}

#[tokio::test]
async fn unchanged_schema_leaves_file_and_sdk_alone() {
    let fx = Fixture::new().await;
    mount_fingerprint(&fx.server, "2024-01-01T00:00:00Z", "2024-01-01T00:00:00Z").await;
    mount_bundle(&fx.server, zip_archive(&sample_sdk(), Method::Stored)).await;
    let watcher = fx.watcher();

    watcher.tick().await;
    let before = fs::metadata(fx.store().path()).unwrap().modified().unwrap();
    let raw_before = fs::read(fx.store().path()).unwrap();

    let outcome = watcher.tick().await;

    assert!(matches!(outcome, TickOutcome::Unchanged));
    assert_eq!(fs::read(fx.store().path()).unwrap(), raw_before);
    assert_eq!(
        fs::metadata(fx.store().path()).unwrap().modified().unwrap(),
        before
    );
    assert_eq!(bundle_requests(&fx.server).await, 0);
}

#[tokio::test]
async fn schema_change_regenerates_once_and_updates_baseline() {
    let fx = Fixture::new().await;
    fx.store()
        .save(&Fingerprint::new("2024-01-01T00:00:00Z", "2024-01-01T00:00:00Z"))
        .unwrap();
    mount_fingerprint(&fx.server, "2024-01-01T00:00:00Z", "2024-02-01T00:00:00Z").await;
    mount_bundle(&fx.server, zip_archive(&sample_sdk(), Method::Stored)).await;
    let watcher = fx.watcher();

    let first = watcher.tick().await;
    let second = watcher.tick().await;

    assert!(matches!(first, TickOutcome::Regenerated));
    assert!(matches!(second, TickOutcome::Unchanged));
    assert_eq!(bundle_requests(&fx.server).await, 1);
    assert_eq!(
        fx.store().load().unwrap(),
        Some(Fingerprint::new("2024-01-01T00:00:00Z", "2024-02-01T00:00:00Z"))
    );
    assert!(
        fx.project
            .path()
            .join("flotiqApi/src/models/FooWithoutInternal.ts")
            .exists()
    );
}

#[tokio::test]
async fn failed_regeneration_still_advances_baseline() {
    let fx = Fixture::new().await;
    fx.store()
        .save(&Fingerprint::new("2024-01-01T00:00:00Z", "2024-01-01T00:00:00Z"))
        .unwrap();
    mount_fingerprint(&fx.server, "2024-01-01T00:00:00Z", "2024-02-01T00:00:00Z").await;
    mount_bundle(&fx.server, b"this is not a zip archive".to_vec()).await;

    let outcome = fx.watcher().tick().await;

    assert!(matches!(outcome, TickOutcome::RegenerationFailed(_)));
    assert_eq!(
        fx.store().load().unwrap().map(|fp| fp.updated_at),
        Some("2024-02-01T00:00:00Z".to_string())
    );
}

#[tokio::test]
async fn later_change_after_baseline_triggers_regeneration() {
    let fx = Fixture::new().await;
    mount_fingerprint(&fx.server, "2024-01-01T00:00:00Z", "2024-01-01T00:00:00Z").await;
    let watcher = fx.watcher();
    assert!(matches!(watcher.tick().await, TickOutcome::Baseline));

    fx.server.reset().await;
    mount_fingerprint(&fx.server, "2024-03-01T00:00:00Z", "2024-03-01T00:00:00Z").await;
    mount_bundle(&fx.server, zip_archive(&sample_sdk(), Method::Stored)).await;

    assert!(matches!(watcher.tick().await, TickOutcome::Regenerated));
    assert_eq!(bundle_requests(&fx.server).await, 1);
}
