//! Playlist collections and the watch-later queue.
//!
//! [`PlaylistService`] is the embedder-facing surface: a store of named
//! playlists and a store for the watch-later queue, plus the
//! reconstruction, export and channel-collection flows that tie them
//! together. Both stores persist records as compact reconstruction text
//! and re-resolve members on load.

use std::cmp::Reverse;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::backup::{self, ExportBundle};
use crate::error::{Error, ReconstructError, ResolveError, StoreError};
use crate::platform::{ChannelPager, PlatformChannel, PlatformContent, PlatformResolver};
use crate::reconstruct::{Reconstructed, Reconstructor};
use crate::record::{PlaylistRecord, VideoSummary};
use crate::storage::{DirectoryStorage, RecordStorage};
use crate::store::{LoadReport, QuarantinedEntry, RecordBackup, RecordStore, StoreEvent};

/// Store name for named playlists.
const PLAYLISTS_STORE: &str = "playlists";

/// Store name for the watch-later queue; also the label single-entry
/// reconstruction errors carry.
const WATCH_LATER_STORE: &str = "watch_later";

/// Progress callback invoked with the 1-based count of fetched pages.
pub type PageCallback = Box<dyn Fn(usize) + Send + Sync>;

/// Codec for named playlists: label line plus one member reference per
/// line.
pub struct PlaylistBackup {
    reconstructor: Reconstructor,
}

impl PlaylistBackup {
    /// Create the codec over a reconstructor.
    #[must_use]
    pub fn new(reconstructor: Reconstructor) -> Self {
        Self { reconstructor }
    }
}

#[async_trait]
impl RecordBackup for PlaylistBackup {
    type Record = PlaylistRecord;

    fn record_id(&self, record: &PlaylistRecord) -> String {
        record.id.clone()
    }

    fn encode(&self, record: &PlaylistRecord, include_label: bool) -> String {
        backup::encode(
            include_label.then_some(record.name.as_str()),
            &record.member_references(),
        )
    }

    async fn rebuild(
        &self,
        id: &str,
        backup_text: &str,
        diagnostics: &mut Vec<String>,
    ) -> Result<PlaylistRecord, ReconstructError> {
        let job = backup::decode(id, backup_text)?;
        let rebuilt = self.reconstructor.rebuild_playlist(job).await?;
        diagnostics.extend(rebuilt.diagnostics);
        Ok(rebuilt.record)
    }
}

/// Codec for watch-later entries: the backup text is the URL alone, no
/// label line.
pub struct WatchLaterBackup {
    reconstructor: Reconstructor,
}

impl WatchLaterBackup {
    /// Create the codec over a reconstructor.
    #[must_use]
    pub fn new(reconstructor: Reconstructor) -> Self {
        Self { reconstructor }
    }
}

#[async_trait]
impl RecordBackup for WatchLaterBackup {
    type Record = VideoSummary;

    fn record_id(&self, record: &VideoSummary) -> String {
        record.url.clone()
    }

    fn encode(&self, record: &VideoSummary, _include_label: bool) -> String {
        record.url.clone()
    }

    async fn rebuild(
        &self,
        _id: &str,
        backup_text: &str,
        _diagnostics: &mut Vec<String>,
    ) -> Result<VideoSummary, ReconstructError> {
        self.reconstructor
            .resolve_video(WATCH_LATER_STORE, backup_text)
            .await
    }
}

/// Load outcome for both stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceLoadReport {
    /// Named playlists store.
    pub playlists: LoadReport,
    /// Watch-later store.
    pub watch_later: LoadReport,
}

/// Facade over the playlist and watch-later stores.
pub struct PlaylistService {
    playlists: RecordStore<PlaylistBackup>,
    watch_later: RecordStore<WatchLaterBackup>,
    reconstructor: Reconstructor,
}

impl PlaylistService {
    /// Create the service over explicit storages and a resolver.
    ///
    /// The two storages must be distinct namespaces; records of one store
    /// never mix with the other's. Call [`load`](Self::load) to populate
    /// the stores.
    pub fn new(
        playlist_storage: Arc<dyn RecordStorage>,
        watch_later_storage: Arc<dyn RecordStorage>,
        resolver: Arc<dyn PlatformResolver>,
    ) -> Self {
        let playlists = RecordStore::new(
            PLAYLISTS_STORE,
            playlist_storage,
            PlaylistBackup::new(Reconstructor::new(Arc::clone(&resolver))),
        )
        .with_unique_key(|p: &PlaylistRecord| p.id.clone());

        let watch_later = RecordStore::new(
            WATCH_LATER_STORE,
            watch_later_storage,
            WatchLaterBackup::new(Reconstructor::new(Arc::clone(&resolver))),
        )
        .with_unique_key(|v: &VideoSummary| v.url.clone());

        Self {
            playlists,
            watch_later,
            reconstructor: Reconstructor::new(resolver),
        }
    }

    /// Open directory-backed stores under `root` and load both.
    ///
    /// # Errors
    ///
    /// Fails when a store directory cannot be created or enumerated.
    pub async fn open(
        root: impl AsRef<Path>,
        resolver: Arc<dyn PlatformResolver>,
    ) -> Result<Self, Error> {
        let root = root.as_ref();
        let playlist_storage = DirectoryStorage::open(root.join(PLAYLISTS_STORE)).await?;
        let watch_later_storage = DirectoryStorage::open(root.join(WATCH_LATER_STORE)).await?;

        let service = Self::new(
            Arc::new(playlist_storage),
            Arc::new(watch_later_storage),
            resolver,
        );
        service.load().await?;
        Ok(service)
    }

    /// Load both stores from their backing storage, rebuilding every
    /// record.
    ///
    /// # Errors
    ///
    /// Fails only when a storage cannot be enumerated; individual records
    /// that fail to rebuild are quarantined, not fatal.
    pub async fn load(&self) -> Result<ServiceLoadReport, Error> {
        let playlists = self.playlists.load().await?;
        let watch_later = self.watch_later.load().await?;
        Ok(ServiceLoadReport {
            playlists,
            watch_later,
        })
    }

    /// Snapshot of all playlists, in collection order.
    pub async fn playlists(&self) -> Vec<PlaylistRecord> {
        self.playlists.get_all().await
    }

    /// One playlist by id.
    pub async fn playlist(&self, id: &str) -> Option<PlaylistRecord> {
        self.playlists.find(|p| p.id == id).await
    }

    /// Save a playlist, bumping its updated timestamp. Returns the record
    /// as saved.
    pub async fn create_or_update(&self, mut playlist: PlaylistRecord) -> PlaylistRecord {
        playlist.touch_updated();
        info!(
            "Saving playlist {} ({} items)",
            playlist.name,
            playlist.items.len()
        );
        self.playlists.save(playlist.clone(), true).await;
        playlist
    }

    /// Append one video to an existing playlist.
    ///
    /// Returns `false` when no playlist has that id.
    pub async fn add_member(&self, playlist_id: &str, video: VideoSummary) -> bool {
        let Some(mut playlist) = self.playlist(playlist_id).await else {
            warn!("Cannot add to playlist {playlist_id} - not found");
            return false;
        };

        playlist.items.push(video);
        playlist.touch_updated();
        self.playlists.save(playlist, true).await;
        true
    }

    /// Record a playback of the playlist, bumping its last-played
    /// timestamp only.
    ///
    /// Returns `false` when no playlist has that id.
    pub async fn record_played(&self, playlist_id: &str) -> bool {
        let Some(mut playlist) = self.playlist(playlist_id).await else {
            warn!("Cannot record playback of playlist {playlist_id} - not found");
            return false;
        };

        playlist.touch_played();
        self.playlists.save(playlist, true).await;
        true
    }

    /// The most recently played playlist; collection order breaks ties.
    pub async fn last_played_playlist(&self) -> Option<PlaylistRecord> {
        self.playlists
            .query(|records| {
                records
                    .iter()
                    .min_by_key(|p| Reverse(p.date_last_played))
                    .cloned()
            })
            .await
    }

    /// The most recently changed playlist; collection order breaks ties.
    pub async fn last_updated_playlist(&self) -> Option<PlaylistRecord> {
        self.playlists
            .query(|records| {
                records
                    .iter()
                    .min_by_key(|p| Reverse(p.date_updated))
                    .cloned()
            })
            .await
    }

    /// Delete a playlist. Returns `false` when no playlist has that id.
    pub async fn remove_playlist(&self, id: &str) -> bool {
        self.playlists.delete(id).await
    }

    /// Build a playlist from a channel's content, named after the channel.
    ///
    /// Collects the pager's pages in order, keeping video items only, and
    /// persists the result under a fresh id. `on_page` is notified with
    /// the 1-based count of fetched pages before each additional fetch; it
    /// observes progress but cannot steer it.
    ///
    /// # Errors
    ///
    /// A page fetch failure aborts the build; nothing is persisted.
    pub async fn build_from_channel(
        &self,
        channel: &PlatformChannel,
        pager: &mut dyn ChannelPager,
        on_page: Option<PageCallback>,
    ) -> Result<PlaylistRecord, Error> {
        info!("Collecting channel {} into a playlist", channel.name);

        let mut members = Vec::new();
        collect_videos(&mut members, pager.current_items());

        let mut pages = 1_usize;
        while pager.has_more() {
            if let Some(on_page) = &on_page {
                on_page(pages);
            }
            if let Err(err) = pager.advance().await {
                return Err(channel_failure(channel, err).into());
            }
            collect_videos(&mut members, pager.current_items());
            pages += 1;
        }

        info!(
            "Collected {} videos from {} over {} pages",
            members.len(),
            channel.name,
            pages
        );
        Ok(self
            .create_or_update(PlaylistRecord::new(channel.name.as_str(), members))
            .await)
    }

    /// Import a playlist from backup text, resolving every member.
    ///
    /// The playlist gets a fresh id, so importing never clobbers an
    /// existing record. Returns the rebuilt playlist together with the
    /// dropped-member diagnostics.
    ///
    /// # Errors
    ///
    /// Structural decode failures and fatal reconstruction failures; in
    /// either case nothing is persisted.
    pub async fn import_playlist(
        &self,
        backup_text: &str,
    ) -> Result<Reconstructed<PlaylistRecord>, Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let job = backup::decode(&id, backup_text)?;
        let rebuilt = self.reconstructor.rebuild_playlist(job).await?;
        self.playlists.save(rebuilt.record.clone(), true).await;
        Ok(rebuilt)
    }

    /// Export a playlist as a `.recp` file bundle holding its backup text.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no playlist has that id.
    pub async fn export_playlist(&self, id: &str) -> Result<ExportBundle, Error> {
        let playlist = self.require_playlist(id).await?;
        let text = self.playlists.reconstruction_string(&playlist, true);
        Ok(backup::text_bundle(&playlist.name, &text))
    }

    /// Export a playlist as a `.json` file bundle holding the array of its
    /// backup lines.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no playlist has that id.
    pub async fn export_playlist_json(&self, id: &str) -> Result<ExportBundle, Error> {
        let playlist = self.require_playlist(id).await?;
        let text = self.playlists.reconstruction_string(&playlist, true);
        Ok(backup::json_bundle(&playlist.name, &text)?)
    }

    /// Playlist entries that failed to rebuild at the last load.
    pub async fn quarantined_playlists(&self) -> Vec<QuarantinedEntry> {
        self.playlists.quarantined().await
    }

    /// Snapshot of the watch-later queue, in queue order.
    pub async fn watch_later(&self) -> Vec<VideoSummary> {
        self.watch_later.get_all().await
    }

    /// Replace the whole watch-later queue in one critical section; a
    /// concurrent add cannot slip between the clear and the rewrite.
    pub async fn replace_watch_later(&self, videos: Vec<VideoSummary>) {
        self.watch_later.replace_all(videos).await;
    }

    /// Queue a video for later, deduplicated by URL.
    ///
    /// Returns `false` when the video was already queued.
    pub async fn add_to_watch_later(&self, video: VideoSummary) -> bool {
        self.watch_later.save(video, false).await
    }

    /// Drop a video from the watch-later queue by URL.
    ///
    /// Returns `false` when the URL was not queued.
    pub async fn remove_from_watch_later(&self, url: &str) -> bool {
        self.watch_later.delete(url).await
    }

    /// Watch-later entries that failed to rebuild at the last load.
    pub async fn quarantined_watch_later(&self) -> Vec<QuarantinedEntry> {
        self.watch_later.quarantined().await
    }

    /// Subscribe to committed playlist-store mutations.
    #[must_use]
    pub fn subscribe_playlists(&self) -> broadcast::Receiver<StoreEvent> {
        self.playlists.subscribe()
    }

    /// Subscribe to committed watch-later mutations.
    ///
    /// Dropping the receiver unsubscribes it.
    #[must_use]
    pub fn subscribe_watch_later(&self) -> broadcast::Receiver<StoreEvent> {
        self.watch_later.subscribe()
    }

    /// Await pending durable writes across both stores.
    pub async fn flush(&self) {
        self.playlists.flush().await;
        self.watch_later.flush().await;
    }

    async fn require_playlist(&self, id: &str) -> Result<PlaylistRecord, StoreError> {
        self.playlist(id)
            .await
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }
}

impl std::fmt::Debug for PlaylistService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaylistService")
            .field("playlists", &self.playlists)
            .field("watch_later", &self.watch_later)
            .finish_non_exhaustive()
    }
}

fn collect_videos(members: &mut Vec<VideoSummary>, items: Vec<PlatformContent>) {
    for item in items {
        match item {
            PlatformContent::Video(details) => members.push(details.into()),
            PlatformContent::Other { kind } => {
                debug!("Skipping non-video channel item ({kind})");
            }
        }
    }
}

fn channel_failure(channel: &PlatformChannel, err: ResolveError) -> ReconstructError {
    match err {
        ResolveError::NoCapability => ReconstructError::CapabilityGap {
            label: channel.name.clone(),
            reference: channel.url.clone(),
        },
        err => ReconstructError::ResolutionFailed {
            label: channel.name.clone(),
            reference: channel.url.clone(),
            reason: err.to_string(),
            source: err,
        },
    }
}
