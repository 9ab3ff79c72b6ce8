//! Player adapter: owns the single playback surface and moves it between
//! nothing, the embed page, and a native HLS stream.
//!
//! Every transition disposes the current skin, then the current decoder,
//! before anything new is attached, so at most one of each is alive.

use std::mem;

use tracing::{debug, info, warn};

use crate::error::PlayerError;
use crate::source::PlaybackSource;
use crate::types::CaptionTrack;

pub mod mpv;
#[cfg(test)]
pub mod testing;

/// Release of a playback resource. Must be safe to call more than once.
pub trait Dispose {
    fn dispose(&mut self);
}

pub trait Skin: Dispose {
    /// Resolves when the user closes the player.
    async fn wait(&mut self) -> Result<(), PlayerError>;
}

/// Decoder, skin and embed surface the adapter drives.
pub trait MediaStack {
    type Decoder: Dispose;
    type Skin: Skin;

    async fn attach_decoder(&mut self, manifest: &str) -> Result<Self::Decoder, PlayerError>;

    fn attach_skin(
        &mut self,
        decoder: &Self::Decoder,
        options: &SkinOptions,
        captions: &[CaptionSlot],
    ) -> Result<Self::Skin, PlayerError>;

    fn show_embed(&mut self, url: &str) -> Result<(), PlayerError>;

    /// Title for the next skin.
    fn set_title(&mut self, _title: &str) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Play,
    Progress,
    CurrentTime,
    Mute,
    Volume,
    Captions,
    Settings,
    Fullscreen,
}

impl Control {
    pub fn as_str(self) -> &'static str {
        match self {
            Control::Play => "play",
            Control::Progress => "progress",
            Control::CurrentTime => "current-time",
            Control::Mute => "mute",
            Control::Volume => "volume",
            Control::Captions => "captions",
            Control::Settings => "settings",
            Control::Fullscreen => "fullscreen",
        }
    }
}

pub const STREAM_CONTROLS: [Control; 8] = [
    Control::Play,
    Control::Progress,
    Control::CurrentTime,
    Control::Mute,
    Control::Volume,
    Control::Captions,
    Control::Settings,
    Control::Fullscreen,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkinOptions {
    pub controls: Vec<Control>,
    pub captions_active: bool,
    pub captions_update: bool,
}

impl SkinOptions {
    pub fn stream_defaults() -> Self {
        Self {
            controls: STREAM_CONTROLS.to_vec(),
            captions_active: true,
            captions_update: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackMode {
    Disabled,
    Showing,
}

/// A caption track as attached to the skin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionSlot {
    pub file: String,
    pub label: String,
    pub srclang: String,
    pub mode: TrackMode,
}

/// Keeps `captions` tracks only, fills in labels and language tags, and shows
/// the first track flagged default. Nothing is shown without a default.
pub fn prepare_captions(tracks: &[CaptionTrack]) -> Vec<CaptionSlot> {
    let mut slots: Vec<CaptionSlot> = tracks
        .iter()
        .filter(|track| track.is_captions())
        .enumerate()
        .map(|(index, track)| {
            let label = track
                .label
                .clone()
                .filter(|label| !label.trim().is_empty())
                .unwrap_or_else(|| format!("Track {}", index + 1));
            let srclang = track
                .label
                .as_deref()
                .map(|label| label.to_lowercase().chars().take(2).collect::<String>())
                .filter(|lang| !lang.is_empty())
                .unwrap_or_else(|| format!("lang{index}"));
            CaptionSlot {
                file: track.file.clone(),
                label,
                srclang,
                mode: TrackMode::Disabled,
            }
        })
        .collect();

    let default_index = tracks
        .iter()
        .filter(|track| track.is_captions())
        .position(|track| track.default);
    if let Some(slot) = default_index.and_then(|index| slots.get_mut(index)) {
        slot.mode = TrackMode::Showing;
    }
    slots
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    IframeActive,
    StreamActive,
}

enum Active<S: MediaStack> {
    Idle,
    Iframe {
        url: String,
    },
    Stream {
        manifest: String,
        tracks: Vec<CaptionTrack>,
        captions: Vec<CaptionSlot>,
        decoder: S::Decoder,
        skin: S::Skin,
    },
}

pub struct PlayerAdapter<S: MediaStack> {
    stack: S,
    active: Active<S>,
    /// Last embed URL; the stream path falls back to it.
    embed_url: Option<String>,
    options: SkinOptions,
}

impl<S: MediaStack> PlayerAdapter<S> {
    pub fn new(stack: S) -> Self {
        Self {
            stack,
            active: Active::Idle,
            embed_url: None,
            options: SkinOptions::stream_defaults(),
        }
    }

    pub fn state(&self) -> PlayerState {
        match self.active {
            Active::Idle => PlayerState::Idle,
            Active::Iframe { .. } => PlayerState::IframeActive,
            Active::Stream { .. } => PlayerState::StreamActive,
        }
    }

    pub fn captions(&self) -> &[CaptionSlot] {
        match &self.active {
            Active::Stream { captions, .. } => captions,
            _ => &[],
        }
    }

    pub fn showing_caption(&self) -> Option<&CaptionSlot> {
        self.captions()
            .iter()
            .find(|slot| slot.mode == TrackMode::Showing)
    }

    pub fn source(&self) -> Option<PlaybackSource> {
        match &self.active {
            Active::Idle => None,
            Active::Iframe { url } => Some(PlaybackSource::Embed(url.clone())),
            Active::Stream {
                manifest, tracks, ..
            } => Some(PlaybackSource::Stream {
                manifest: manifest.clone(),
                tracks: tracks.clone(),
            }),
        }
    }

    pub fn set_title(&mut self, title: &str) {
        self.stack.set_title(title);
    }

    /// Shows the embed, tearing down any native stream first.
    pub fn show_embed(&mut self, url: &str) -> Result<(), PlayerError> {
        self.release();
        self.embed_url = Some(url.to_string());
        self.mount_embed()
    }

    /// Attaches a native stream. The same manifest and track list is a no-op.
    pub async fn load_stream(
        &mut self,
        manifest: &str,
        tracks: &[CaptionTrack],
    ) -> Result<(), PlayerError> {
        if let Active::Stream {
            manifest: current,
            tracks: current_tracks,
            ..
        } = &self.active
        {
            if current == manifest && current_tracks.as_slice() == tracks {
                debug!(manifest, "stream unchanged, keeping decoder and skin");
                return Ok(());
            }
        }

        self.release();

        let mut decoder = match self.stack.attach_decoder(manifest).await {
            Ok(decoder) => decoder,
            Err(err) => {
                warn!(manifest, error = %err, "decoder attach failed, falling back to embed");
                self.fall_back();
                return Err(err);
            }
        };

        let captions = prepare_captions(tracks);
        let skin = match self.stack.attach_skin(&decoder, &self.options, &captions) {
            Ok(skin) => skin,
            Err(err) => {
                warn!(manifest, error = %err, "skin attach failed, falling back to embed");
                decoder.dispose();
                self.fall_back();
                return Err(err);
            }
        };

        info!(manifest, captions = captions.len(), "stream active");
        self.active = Active::Stream {
            manifest: manifest.to_string(),
            tracks: tracks.to_vec(),
            captions,
            decoder,
            skin,
        };
        Ok(())
    }

    /// Drops the native stream and goes back to the embed, if one is known.
    pub fn clear_stream(&mut self) -> Result<(), PlayerError> {
        if !matches!(self.active, Active::Stream { .. }) {
            return Ok(());
        }
        self.release();
        self.mount_embed()
    }

    /// Waits for the user to close the native player. Returns at once when no
    /// stream is active.
    pub async fn wait_for_exit(&mut self) -> Result<(), PlayerError> {
        match &mut self.active {
            Active::Stream { skin, .. } => skin.wait().await,
            _ => Ok(()),
        }
    }

    pub fn teardown(&mut self) {
        self.release();
        self.embed_url = None;
    }

    fn mount_embed(&mut self) -> Result<(), PlayerError> {
        let Some(url) = self.embed_url.clone() else {
            self.active = Active::Idle;
            return Ok(());
        };
        // The embed counts as mounted even when opening it fails; the URL
        // stays available for display.
        self.active = Active::Iframe { url: url.clone() };
        self.stack.show_embed(&url)
    }

    fn fall_back(&mut self) {
        if let Err(err) = self.mount_embed() {
            warn!(error = %err, "embed fallback failed");
        }
    }

    fn release(&mut self) {
        if let Active::Stream {
            mut decoder,
            mut skin,
            manifest,
            ..
        } = mem::replace(&mut self.active, Active::Idle)
        {
            skin.dispose();
            decoder.dispose();
            debug!(%manifest, "stream released");
        }
    }
}

impl<S: MediaStack> Drop for PlayerAdapter<S> {
    fn drop(&mut self) {
        self.release();
    }
}
