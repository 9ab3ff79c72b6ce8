use url::Url;

use crate::types::{CaptionTrack, Translation};

/// What the player should show for the current selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackSource {
    Embed(String),
    Stream {
        manifest: String,
        tracks: Vec<CaptionTrack>,
    },
}

impl PlaybackSource {
    pub fn embed_url(&self) -> Option<&str> {
        match self {
            PlaybackSource::Embed(url) => Some(url),
            PlaybackSource::Stream { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceSelector {
    embed_base: Url,
}

impl SourceSelector {
    pub fn new(embed_base: &str) -> anyhow::Result<Self> {
        let embed_base = Url::parse(embed_base.trim())?;
        if embed_base.cannot_be_a_base() {
            anyhow::bail!("embed base {embed_base} cannot carry path segments");
        }
        Ok(Self { embed_base })
    }

    /// `<embed-base>/<episode-id>/<dub|sub>`, with the id percent-encoded.
    pub fn embed_url(&self, episode_id: &str, translation: Translation) -> String {
        let mut url = self.embed_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(episode_id)
                .push(translation.as_str());
        }
        url.into()
    }

    /// Source for an episode selection. Direct streams are handed to the
    /// player separately, so a selection always resolves to the embed.
    pub fn select(&self, episode_id: &str, translation: Translation) -> PlaybackSource {
        PlaybackSource::Embed(self.embed_url(episode_id, translation))
    }
}
