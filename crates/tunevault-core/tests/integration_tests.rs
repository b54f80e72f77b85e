//! Integration tests for `TuneVault` core workflows.
//!
//! These tests verify end-to-end workflows including:
//! - Playlist lifecycle (create, update, play, remove)
//! - Restart recovery from directory-backed reconstruction backups
//! - Watch-later queue management and change notifications
//! - Channel collection with pagination
//! - Export/import of shareable playlist bundles
//!
//! All tests run a real [`PlaylistService`] over temporary directories;
//! only the platform resolver and pager are faked.

use std::str;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use tunevault_core::{
    // Errors
    BackupError,
    // Platform capabilities
    ChannelPager,
    Error,
    // Service surface
    PageCallback,
    PlatformChannel,
    PlatformContent,
    PlatformResolver,
    // Records
    PlaylistRecord,
    PlaylistService,
    ReconstructError,
    ResolveError,
    Result,
    StoreEvent,
    VideoDetails,
    VideoSummary,
};

// =============================================================================
// Test Fixtures and Utilities
// =============================================================================

/// Resolver fake with scriptable per-reference outcomes and a call log.
struct FakeResolver {
    /// References that resolve as permanently unavailable.
    gone: Vec<String>,
    /// References no enabled source covers.
    uncovered: Vec<String>,
    /// Every reference received, in call order.
    calls: Mutex<Vec<String>>,
}

impl FakeResolver {
    /// A resolver that resolves everything.
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            gone: Vec::new(),
            uncovered: Vec::new(),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// A resolver for which the given references are gone.
    fn with_gone(gone: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            gone: gone.iter().map(ToString::to_string).collect(),
            uncovered: Vec::new(),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// A resolver for which the given references have no source.
    fn with_uncovered(uncovered: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            gone: Vec::new(),
            uncovered: uncovered.iter().map(ToString::to_string).collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl PlatformResolver for FakeResolver {
    async fn resolve(
        &self,
        reference: &str,
    ) -> std::result::Result<PlatformContent, ResolveError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(reference.to_string());

        if self.gone.iter().any(|g| g == reference) {
            return Err(ResolveError::Unavailable);
        }
        if self.uncovered.iter().any(|u| u == reference) {
            return Err(ResolveError::NoCapability);
        }
        Ok(PlatformContent::Video(VideoDetails {
            url: reference.to_string(),
            title: resolved_title(reference),
            author: Some("Channel One".to_string()),
            duration_secs: Some(120),
            thumbnail_url: None,
        }))
    }
}

/// Fixed content pages behind the `ChannelPager` cursor contract.
struct FakePager {
    pages: Vec<Vec<PlatformContent>>,
    current: usize,
    fail_on_advance: bool,
}

impl FakePager {
    fn new(pages: Vec<Vec<PlatformContent>>) -> Self {
        Self {
            pages,
            current: 0,
            fail_on_advance: false,
        }
    }
}

#[async_trait]
impl ChannelPager for FakePager {
    fn current_items(&self) -> Vec<PlatformContent> {
        self.pages.get(self.current).cloned().unwrap_or_default()
    }

    fn has_more(&self) -> bool {
        self.current + 1 < self.pages.len()
    }

    async fn advance(&mut self) -> std::result::Result<(), ResolveError> {
        if self.fail_on_advance {
            return Err(ResolveError::Other("HTTP 500".to_string()));
        }
        self.current += 1;
        Ok(())
    }
}

/// Test fixture running a real service over a temporary storage root.
struct TestFixture {
    /// Storage root both stores keep their entries under.
    root: TempDir,
    /// The resolver behind the service, kept for call-log assertions.
    resolver: Arc<FakeResolver>,
    service: PlaylistService,
}

impl TestFixture {
    /// Create a fixture whose resolver resolves everything.
    async fn new() -> Result<Self> {
        Self::with_resolver(FakeResolver::ok()).await
    }

    /// Create a fixture over the given resolver.
    async fn with_resolver(resolver: Arc<FakeResolver>) -> Result<Self> {
        let root = TempDir::new()
            .map_err(|e| Error::Configuration(format!("Failed to create temp root: {e}")))?;
        let service = PlaylistService::open(root.path(), resolver.clone()).await?;
        Ok(Self {
            root,
            resolver,
            service,
        })
    }

    /// Open the same storage root again, as a fresh process would.
    async fn reopen(&self, resolver: Arc<FakeResolver>) -> Result<PlaylistService> {
        PlaylistService::open(self.root.path(), resolver).await
    }
}

fn resolved_title(reference: &str) -> String {
    format!("Title for {reference}")
}

fn video(url: &str) -> VideoSummary {
    VideoSummary::new(url, resolved_title(url))
}

fn page_video(url: &str) -> PlatformContent {
    PlatformContent::Video(VideoDetails {
        url: url.to_string(),
        title: resolved_title(url),
        author: None,
        duration_secs: None,
        thumbnail_url: None,
    })
}

// =============================================================================
// Playlist Lifecycle Workflows
// =============================================================================

#[tokio::test]
async fn test_playlist_crud_workflow() {
    let fixture = TestFixture::new().await.expect("fixture");
    let service = &fixture.service;

    let saved = service
        .create_or_update(PlaylistRecord::new("Road Trip", vec![video("https://v/1")]))
        .await;
    assert!(saved.date_updated > 0);

    assert!(service.add_member(&saved.id, video("https://v/2")).await);
    let fetched = service.playlist(&saved.id).await.expect("playlist");
    assert_eq!(
        fetched.member_references(),
        vec!["https://v/1", "https://v/2"]
    );

    assert!(service.record_played(&saved.id).await);
    let played = service.playlist(&saved.id).await.expect("playlist");
    assert!(played.date_last_played > 0);

    assert!(service.remove_playlist(&saved.id).await);
    assert!(service.playlist(&saved.id).await.is_none());
    assert!(service.playlists().await.is_empty());
}

#[tokio::test]
async fn test_last_played_and_last_updated_selection() {
    let fixture = TestFixture::new().await.expect("fixture");
    let service = &fixture.service;

    let first = service
        .create_or_update(PlaylistRecord::new("First", Vec::new()))
        .await;
    let second = service
        .create_or_update(PlaylistRecord::new("Second", Vec::new()))
        .await;

    service.record_played(&second.id).await;
    let last_played = service.last_played_playlist().await.expect("last played");
    assert_eq!(last_played.id, second.id);

    service.add_member(&first.id, video("https://v/1")).await;
    let last_updated = service
        .last_updated_playlist()
        .await
        .expect("last updated");
    assert_eq!(last_updated.id, first.id);
}

// =============================================================================
// Restart and Recovery Workflows
// =============================================================================

#[tokio::test]
async fn test_restart_rebuilds_playlists_from_backup() {
    let fixture = TestFixture::new().await.expect("fixture");

    let saved = fixture
        .service
        .create_or_update(PlaylistRecord::new(
            "Road Trip",
            vec![video("https://v/1"), video("https://v/2")],
        ))
        .await;
    fixture.service.flush().await;

    let resolver = FakeResolver::ok();
    let reopened = fixture.reopen(resolver.clone()).await.expect("reopen");

    let rebuilt = reopened.playlist(&saved.id).await.expect("rebuilt");
    assert_eq!(rebuilt.name, "Road Trip");
    assert_eq!(
        rebuilt.member_references(),
        vec!["https://v/1", "https://v/2"]
    );
    // Member details come from live resolution, not from the backup.
    assert_eq!(rebuilt.items[0].title, resolved_title("https://v/1"));
    assert_eq!(rebuilt.items[0].author.as_deref(), Some("Channel One"));
    // The compact format does not carry playback history.
    assert_eq!(rebuilt.date_last_played, 0);

    // Members were resolved in playback order.
    assert_eq!(resolver.calls(), vec!["https://v/1", "https://v/2"]);
}

#[tokio::test]
async fn test_restart_drops_unavailable_members_and_keeps_rest() {
    let fixture = TestFixture::new().await.expect("fixture");

    let saved = fixture
        .service
        .create_or_update(PlaylistRecord::new(
            "Mix",
            vec![
                video("https://v/1"),
                video("https://v/gone"),
                video("https://v/2"),
            ],
        ))
        .await;
    fixture.service.flush().await;

    let reopened = fixture
        .reopen(FakeResolver::with_gone(&["https://v/gone"]))
        .await
        .expect("reopen");

    // The playlist survives with the unavailable member dropped.
    let rebuilt = reopened.playlist(&saved.id).await.expect("rebuilt");
    assert_eq!(
        rebuilt.member_references(),
        vec!["https://v/1", "https://v/2"]
    );
    assert!(reopened.quarantined_playlists().await.is_empty());
}

#[tokio::test]
async fn test_missing_capability_quarantines_until_source_returns() {
    let fixture = TestFixture::new().await.expect("fixture");

    let saved = fixture
        .service
        .create_or_update(PlaylistRecord::new(
            "Mix",
            vec![video("https://v/1"), video("https://v/other-source")],
        ))
        .await;
    fixture.service.flush().await;

    // With the second source disabled the whole playlist is held back.
    let degraded = fixture
        .reopen(FakeResolver::with_uncovered(&["https://v/other-source"]))
        .await
        .expect("reopen");
    let report = degraded.load().await.expect("load");
    assert_eq!(report.playlists.loaded, 0);
    assert_eq!(report.playlists.quarantined, 1);
    assert!(degraded.playlists().await.is_empty());

    let quarantined = degraded.quarantined_playlists().await;
    assert_eq!(quarantined.len(), 1);
    assert!(quarantined[0].reason.contains("No source enabled for"));

    // The raw backup was retained, so re-enabling the source recovers the
    // playlist on the next load.
    let recovered = fixture.reopen(FakeResolver::ok()).await.expect("reopen");
    let rebuilt = recovered.playlist(&saved.id).await.expect("recovered");
    assert_eq!(
        rebuilt.member_references(),
        vec!["https://v/1", "https://v/other-source"]
    );
    assert!(recovered.quarantined_playlists().await.is_empty());
}

#[tokio::test]
async fn test_removals_survive_restart() {
    let fixture = TestFixture::new().await.expect("fixture");
    let service = &fixture.service;

    let keep = service
        .create_or_update(PlaylistRecord::new("Keep", vec![video("https://v/1")]))
        .await;
    let doomed = service
        .create_or_update(PlaylistRecord::new("Drop", vec![video("https://v/2")]))
        .await;
    service.add_to_watch_later(video("https://v/3")).await;

    service.remove_playlist(&doomed.id).await;
    service.replace_watch_later(Vec::new()).await;
    service.flush().await;

    let reopened = fixture.reopen(FakeResolver::ok()).await.expect("reopen");
    assert!(reopened.playlist(&keep.id).await.is_some());
    assert!(reopened.playlist(&doomed.id).await.is_none());
    assert!(reopened.watch_later().await.is_empty());
}

// =============================================================================
// Watch-Later Workflows
// =============================================================================

#[tokio::test]
async fn test_watch_later_queue_workflow() {
    let fixture = TestFixture::new().await.expect("fixture");
    let service = &fixture.service;

    assert!(service.add_to_watch_later(video("https://v/1")).await);
    assert!(service.add_to_watch_later(video("https://v/2")).await);
    // Same URL again is a no-op.
    assert!(!service.add_to_watch_later(video("https://v/1")).await);

    let urls: Vec<String> = service
        .watch_later()
        .await
        .into_iter()
        .map(|v| v.url)
        .collect();
    assert_eq!(urls, vec!["https://v/1", "https://v/2"]);

    assert!(service.remove_from_watch_later("https://v/1").await);
    assert!(!service.remove_from_watch_later("https://v/1").await);
    assert_eq!(service.watch_later().await.len(), 1);
}

#[tokio::test]
async fn test_watch_later_change_events() {
    let fixture = TestFixture::new().await.expect("fixture");
    let service = &fixture.service;
    let mut events = service.subscribe_watch_later();

    service.add_to_watch_later(video("https://v/1")).await;
    service.add_to_watch_later(video("https://v/1")).await; // duplicate, no event
    service.remove_from_watch_later("https://v/1").await;
    service
        .replace_watch_later(vec![video("https://v/2"), video("https://v/3")])
        .await;

    assert_eq!(
        events.try_recv().expect("saved"),
        StoreEvent::Saved {
            id: "https://v/1".to_string()
        }
    );
    assert_eq!(
        events.try_recv().expect("deleted"),
        StoreEvent::Deleted {
            id: "https://v/1".to_string()
        }
    );
    assert_eq!(events.try_recv().expect("cleared"), StoreEvent::Cleared);
    assert_eq!(
        events.try_recv().expect("saved all"),
        StoreEvent::SavedAll {
            ids: vec!["https://v/2".to_string(), "https://v/3".to_string()]
        }
    );
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_watch_later_survives_restart_with_fresh_resolution() {
    let fixture = TestFixture::new().await.expect("fixture");

    // The queued entry carries a stale local title; only its URL persists.
    fixture
        .service
        .add_to_watch_later(VideoSummary::new("https://v/1", "Stale local title"))
        .await;
    fixture.service.flush().await;

    let reopened = fixture.reopen(FakeResolver::ok()).await.expect("reopen");
    let queued = reopened.watch_later().await;
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].url, "https://v/1");
    assert_eq!(queued[0].title, resolved_title("https://v/1"));
}

#[tokio::test]
async fn test_watch_later_gone_entry_is_quarantined_on_reload() {
    let fixture = TestFixture::new().await.expect("fixture");

    fixture.service.add_to_watch_later(video("https://v/1")).await;
    fixture
        .service
        .add_to_watch_later(video("https://v/gone"))
        .await;
    fixture.service.flush().await;

    let reopened = fixture
        .reopen(FakeResolver::with_gone(&["https://v/gone"]))
        .await
        .expect("reopen");

    let queued = reopened.watch_later().await;
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].url, "https://v/1");

    let quarantined = reopened.quarantined_watch_later().await;
    assert_eq!(quarantined.len(), 1);
    assert_eq!(quarantined[0].id, "https://v/gone");
    assert!(quarantined[0].reason.contains("no longer available"));
}

// =============================================================================
// Channel Collection Workflows
// =============================================================================

#[tokio::test]
async fn test_channel_collection_workflow() {
    let fixture = TestFixture::new().await.expect("fixture");
    let channel = PlatformChannel::new("https://chan/1", "Channel One");
    let mut pager = FakePager::new(vec![
        vec![
            page_video("https://v/1"),
            PlatformContent::Other {
                kind: "post".to_string(),
            },
        ],
        vec![page_video("https://v/2"), page_video("https://v/3")],
    ]);

    let pages_seen = Arc::new(Mutex::new(Vec::new()));
    let pages_for_callback = Arc::clone(&pages_seen);
    let on_page: PageCallback = Box::new(move |page| {
        pages_for_callback
            .lock()
            .expect("callback lock")
            .push(page);
    });

    let built = fixture
        .service
        .build_from_channel(&channel, &mut pager, Some(on_page))
        .await
        .expect("channel build");

    assert_eq!(built.name, "Channel One");
    assert_eq!(
        built.member_references(),
        vec!["https://v/1", "https://v/2", "https://v/3"]
    );
    assert_eq!(*pages_seen.lock().expect("pages"), vec![1]);

    // Persisted like any other playlist, so it survives a restart.
    fixture.service.flush().await;
    let reopened = fixture.reopen(FakeResolver::ok()).await.expect("reopen");
    let rebuilt = reopened.playlist(&built.id).await.expect("rebuilt");
    assert_eq!(rebuilt.name, "Channel One");
    assert_eq!(rebuilt.items.len(), 3);
}

#[tokio::test]
async fn test_channel_collection_aborts_cleanly_on_page_failure() {
    let fixture = TestFixture::new().await.expect("fixture");
    let channel = PlatformChannel::new("https://chan/1", "Channel One");
    let mut pager = FakePager::new(vec![
        vec![page_video("https://v/1")],
        vec![page_video("https://v/2")],
    ]);
    pager.fail_on_advance = true;

    let err = fixture
        .service
        .build_from_channel(&channel, &mut pager, None)
        .await
        .expect_err("page failure");
    assert!(matches!(
        err,
        Error::Reconstruction(ReconstructError::ResolutionFailed { .. })
    ));

    assert!(fixture.service.playlists().await.is_empty());
}

// =============================================================================
// Export and Import Workflows
// =============================================================================

#[tokio::test]
async fn test_export_import_share_flow() {
    let source = TestFixture::new().await.expect("source fixture");
    let saved = source
        .service
        .create_or_update(PlaylistRecord::new(
            "Road Trip",
            vec![video("https://v/1"), video("https://v/2")],
        ))
        .await;

    let bundle = source
        .service
        .export_playlist(&saved.id)
        .await
        .expect("export");
    assert_eq!(bundle.file_name, "Road Trip.recp");
    // Export is pure text production; nothing is resolved.
    assert!(source.resolver.calls().is_empty());

    // Another instance imports the shared file.
    let target = TestFixture::new().await.expect("target fixture");
    let text = str::from_utf8(&bundle.bytes).expect("utf8 backup");
    let imported = target
        .service
        .import_playlist(text)
        .await
        .expect("import");

    assert_eq!(imported.record.name, "Road Trip");
    assert_ne!(imported.record.id, saved.id);
    assert_eq!(
        imported.record.member_references(),
        vec!["https://v/1", "https://v/2"]
    );
    assert!(imported.diagnostics.is_empty());
    assert!(
        target
            .service
            .playlist(&imported.record.id)
            .await
            .is_some()
    );
}

#[tokio::test]
async fn test_export_json_bundle_holds_backup_lines() {
    let fixture = TestFixture::new().await.expect("fixture");
    let saved = fixture
        .service
        .create_or_update(PlaylistRecord::new(
            "Road Trip",
            vec![video("https://v/1")],
        ))
        .await;

    let bundle = fixture
        .service
        .export_playlist_json(&saved.id)
        .await
        .expect("json export");
    assert_eq!(bundle.file_name, "Road Trip.json");

    let lines: Vec<String> = serde_json::from_slice(&bundle.bytes).expect("json lines");
    assert_eq!(lines, vec!["Road Trip", "https://v/1"]);
}

#[tokio::test]
async fn test_import_rejects_empty_backup() {
    let fixture = TestFixture::new().await.expect("fixture");

    let err = fixture
        .service
        .import_playlist("")
        .await
        .expect_err("empty backup");
    assert!(matches!(err, Error::Backup(BackupError::NoLines { .. })));
}

#[tokio::test]
async fn test_import_with_partial_loss_reports_diagnostics() {
    let fixture = TestFixture::with_resolver(FakeResolver::with_gone(&["https://v/gone"]))
        .await
        .expect("fixture");

    let imported = fixture
        .service
        .import_playlist("Mix\nhttps://v/1\nhttps://v/gone")
        .await
        .expect("import");

    assert_eq!(imported.record.member_references(), vec!["https://v/1"]);
    assert_eq!(
        imported.diagnostics,
        vec!["Mix:[https://v/gone] is no longer available"]
    );
}
