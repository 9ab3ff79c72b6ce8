//! The watch page: all viewer state, the backend requests that feed it, and
//! the wiring between grouper, source selector and player.
//!
//! Requests run as spawned tasks. Their completions come back one at a time
//! through a channel and are applied in arrival order by [`WatchPage::apply`].
//! Each completion carries the ticket it was issued under; one that no longer
//! matches the current page or selection is dropped.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};
use url::Url;

use crate::backend::WatchBackend;
use crate::error::{ApiError, PlayerError};
use crate::player::{MediaStack, PlayerAdapter};
use crate::ranges::{EpisodeRanges, group_episodes};
use crate::source::{PlaybackSource, SourceSelector};
use crate::types::{AnimeInfo, CaptionTrack, Episode, EpisodeServers, Translation};

/// Identifiers the page is opened with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageAddress {
    pub anime_id: Option<String>,
    pub data_id: Option<String>,
}

impl PageAddress {
    pub fn new(anime_id: Option<String>, data_id: Option<String>) -> Self {
        let clean = |id: Option<String>| id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            anime_id: clean(anime_id),
            data_id: clean(data_id),
        }
    }

    /// Reads `animeId` and `dataId` from a watch URL or a bare query string.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let url = match Url::parse(raw) {
            Ok(url) => url,
            Err(_) => {
                let query = raw.trim_start_matches('?');
                Url::parse(&format!("http://localhost/?{query}"))
                    .with_context(|| format!("invalid watch address {raw}"))?
            }
        };
        let mut anime_id = None;
        let mut data_id = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "animeId" => anime_id = Some(value.into_owned()),
                "dataId" => data_id = Some(value.into_owned()),
                _ => {}
            }
        }
        Ok(Self::new(anime_id, data_id))
    }

    pub fn is_empty(&self) -> bool {
        self.anime_id.is_none() && self.data_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionTicket {
    generation: u64,
    episode_id: String,
}

impl SelectionTicket {
    pub fn episode_id(&self) -> &str {
        &self.episode_id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub episode_id: Option<String>,
    pub translation: Translation,
    pub servers: EpisodeServers,
    pub servers_pending: bool,
}

#[derive(Debug)]
pub enum PageEvent {
    AnimeInfo {
        visit: u64,
        result: Result<AnimeInfo, ApiError>,
    },
    Episodes {
        visit: u64,
        result: Result<Vec<Episode>, ApiError>,
    },
    Servers {
        ticket: SelectionTicket,
        result: Result<EpisodeServers, ApiError>,
    },
}

pub struct WatchPage<B: WatchBackend, S: MediaStack> {
    backend: Arc<B>,
    selector: SourceSelector,
    player: PlayerAdapter<S>,
    address: PageAddress,
    /// Bumped on navigation; info and episode completions from an older
    /// visit are dropped.
    visit: u64,
    translation: Translation,
    anime: Option<AnimeInfo>,
    episodes: Vec<Episode>,
    ranges: EpisodeRanges,
    selected_range: Option<String>,
    selection: Selection,
    generation: u64,
    events_tx: UnboundedSender<PageEvent>,
    events_rx: UnboundedReceiver<PageEvent>,
    in_flight: usize,
}

impl<B: WatchBackend, S: MediaStack> WatchPage<B, S> {
    pub fn new(
        backend: Arc<B>,
        selector: SourceSelector,
        stack: S,
        address: PageAddress,
        translation: Translation,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            selector,
            player: PlayerAdapter::new(stack),
            address,
            visit: 0,
            translation,
            anime: None,
            episodes: Vec::new(),
            ranges: EpisodeRanges::default(),
            selected_range: None,
            selection: Selection::default(),
            generation: 0,
            events_tx,
            events_rx,
            in_flight: 0,
        }
    }

    /// Starts the info and episode requests for the current address.
    pub fn mount(&mut self) {
        let visit = self.visit;
        if let Some(anime_id) = self.address.anime_id.clone() {
            let backend = Arc::clone(&self.backend);
            self.spawn_request(async move {
                PageEvent::AnimeInfo {
                    visit,
                    result: backend.anime_info(&anime_id).await,
                }
            });
        }
        if let Some(data_id) = self.address.data_id.clone() {
            let backend = Arc::clone(&self.backend);
            self.spawn_request(async move {
                PageEvent::Episodes {
                    visit,
                    result: backend.episodes(&data_id).await,
                }
            });
        }
    }

    /// Resets page state for a new address and mounts it again.
    pub fn navigate(&mut self, address: PageAddress) {
        info!(?address, "navigating");
        self.visit += 1;
        self.generation += 1;
        self.address = address;
        self.anime = None;
        self.episodes.clear();
        self.ranges = EpisodeRanges::default();
        self.selected_range = None;
        self.selection = Selection::default();
        self.player.teardown();
        self.mount();
    }

    /// Next request completion, or `None` when nothing is outstanding.
    pub async fn next_event(&mut self) -> Option<PageEvent> {
        if self.in_flight == 0 {
            return None;
        }
        self.events_rx.recv().await
    }

    /// Applies a completion. Returns `false` when it was stale and dropped.
    pub fn apply(&mut self, event: PageEvent) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        match event {
            PageEvent::AnimeInfo { visit, result } => {
                if visit != self.visit {
                    debug!(visit, "dropping anime info from an earlier visit");
                    return false;
                }
                match result {
                    Ok(info) => {
                        if let Some(title) = info.title.as_deref() {
                            self.player.set_title(title);
                        }
                        self.anime = Some(info);
                    }
                    Err(err) => warn!(error = %err, "failed to load anime info"),
                }
                true
            }
            PageEvent::Episodes { visit, result } => {
                if visit != self.visit {
                    debug!(visit, "dropping episode list from an earlier visit");
                    return false;
                }
                let episodes = result.unwrap_or_else(|err| {
                    warn!(error = %err, "failed to load episodes");
                    Vec::new()
                });
                self.set_episodes(episodes);
                true
            }
            PageEvent::Servers { ticket, result } => self.apply_servers(ticket, result),
        }
    }

    /// Drains completions until no request is outstanding.
    pub async fn settle(&mut self) {
        while let Some(event) = self.next_event().await {
            self.apply(event);
        }
    }

    /// Selects an episode: embed for `translation` right away, servers when
    /// the backend answers. Any native stream is dropped.
    pub fn change_source(&mut self, episode_id: &str, translation: Translation) -> SelectionTicket {
        self.generation += 1;
        let ticket = SelectionTicket {
            generation: self.generation,
            episode_id: episode_id.to_string(),
        };
        self.selection = Selection {
            episode_id: Some(episode_id.to_string()),
            translation,
            servers: EpisodeServers::default(),
            servers_pending: true,
        };

        let source = self.selector.select(episode_id, translation);
        debug!(episode_id, ?source, "source changed");
        if let Some(embed) = source.embed_url() {
            if let Err(err) = self.player.show_embed(embed) {
                warn!(error = %err, "failed to show embed");
            }
        }
        if let Some(title) = self.episode_title(episode_id) {
            self.player.set_title(&title);
        }

        let backend = Arc::clone(&self.backend);
        let request = ticket.clone();
        self.spawn_request(async move {
            let result = backend.episode_servers(&request.episode_id).await;
            PageEvent::Servers {
                ticket: request,
                result,
            }
        });
        ticket
    }

    /// Episode button: the page's current translation, sub unless switched.
    pub fn select_episode(&mut self, episode_id: &str) -> SelectionTicket {
        self.change_source(episode_id, self.translation)
    }

    /// Range button: changes the visible episodes only.
    pub fn select_range(&mut self, key: &str) -> bool {
        if !self.ranges.contains_key(key) {
            return false;
        }
        self.selected_range = Some(key.to_string());
        true
    }

    /// Switches dub/sub and reloads the current episode in it.
    pub fn set_translation(&mut self, translation: Translation) -> Option<SelectionTicket> {
        self.translation = translation;
        let current = self.selection.episode_id.clone()?;
        Some(self.change_source(&current, translation))
    }

    pub async fn play_stream(
        &mut self,
        manifest: &str,
        tracks: &[CaptionTrack],
    ) -> Result<(), PlayerError> {
        self.player.load_stream(manifest, tracks).await
    }

    pub fn stop_stream(&mut self) -> Result<(), PlayerError> {
        self.player.clear_stream()
    }

    pub async fn wait_for_player(&mut self) -> Result<(), PlayerError> {
        self.player.wait_for_exit().await
    }

    pub fn teardown(&mut self) {
        self.player.teardown();
    }

    pub fn address(&self) -> &PageAddress {
        &self.address
    }

    pub fn anime(&self) -> Option<&AnimeInfo> {
        self.anime.as_ref()
    }

    pub fn episodes(&self) -> &[Episode] {
        &self.episodes
    }

    pub fn ranges(&self) -> &EpisodeRanges {
        &self.ranges
    }

    pub fn selected_range(&self) -> Option<&str> {
        self.selected_range.as_deref()
    }

    pub fn visible_episodes(&self) -> &[Episode] {
        self.selected_range
            .as_deref()
            .and_then(|key| self.ranges.get(key))
            .unwrap_or(&[])
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected_episode(&self) -> Option<&Episode> {
        let id = self.selection.episode_id.as_deref()?;
        self.episodes.iter().find(|ep| ep.id == id)
    }

    pub fn translation(&self) -> Translation {
        self.translation
    }

    pub fn source(&self) -> Option<PlaybackSource> {
        self.player.source()
    }

    pub fn player(&self) -> &PlayerAdapter<S> {
        &self.player
    }

    fn set_episodes(&mut self, mut episodes: Vec<Episode>) {
        episodes.sort_by_key(|ep| ep.number);
        info!(count = episodes.len(), "episodes loaded");
        self.ranges = group_episodes(&episodes);
        self.episodes = episodes;

        let keep = self
            .selected_range
            .as_deref()
            .is_some_and(|key| self.ranges.contains_key(key));
        if !keep {
            self.selected_range = self.ranges.first_key();
        }

        if let Some(first) = self.episodes.first().map(|ep| ep.id.clone()) {
            self.change_source(&first, self.translation);
        }
    }

    fn apply_servers(
        &mut self,
        ticket: SelectionTicket,
        result: Result<EpisodeServers, ApiError>,
    ) -> bool {
        let current = ticket.generation == self.generation
            && self.selection.episode_id.as_deref() == Some(ticket.episode_id.as_str());
        if !current {
            debug!(episode_id = %ticket.episode_id, "dropping stale server list");
            return false;
        }
        self.selection.servers = match result {
            Ok(servers) => servers,
            Err(err) => {
                warn!(episode_id = %ticket.episode_id, error = %err, "failed to load servers");
                EpisodeServers::default()
            }
        };
        self.selection.servers_pending = false;
        true
    }

    fn episode_title(&self, episode_id: &str) -> Option<String> {
        let episode = self.episodes.iter().find(|ep| ep.id == episode_id)?;
        let show = self
            .anime
            .as_ref()
            .and_then(|info| info.title.clone())
            .unwrap_or_else(|| String::from("anwatch"));
        Some(format!("{show} - Episode {}", episode.number))
    }

    fn spawn_request<F>(&mut self, request: F)
    where
        F: Future<Output = PageEvent> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            // The receiver lives as long as the page.
            let _ = tx.send(request.await);
        });
    }
}
