//! HLS manifest resolution for the direct-stream path.
//!
//! The decoder handed to the player is the resolved media stream: a master
//! playlist is narrowed to its highest-bandwidth variant, a media playlist is
//! used as is.

use m3u8_rs::{AlternativeMediaType, Playlist};
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::PlayerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStream {
    pub manifest_url: String,
    /// URL the player should open.
    pub stream_url: String,
    pub variant_count: usize,
    pub bandwidth: Option<u64>,
    pub resolution: Option<(u64, u64)>,
    pub subtitle_renditions: usize,
    /// `None` for a master playlist, whose media playlist is not fetched here.
    pub live: Option<bool>,
}

pub async fn fetch_and_resolve(client: &Client, manifest_url: &str) -> Result<ResolvedStream, PlayerError> {
    let fetch_err = |reason: String| PlayerError::ManifestFetch {
        url: manifest_url.to_string(),
        reason,
    };
    let response = client
        .get(manifest_url)
        .send()
        .await
        .map_err(|err| fetch_err(err.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(fetch_err(format!("HTTP {status}")));
    }
    let body = response
        .bytes()
        .await
        .map_err(|err| fetch_err(err.to_string()))?;
    let resolved = resolve_manifest(manifest_url, &body)?;
    debug!(
        manifest = %resolved.manifest_url,
        stream = %resolved.stream_url,
        variants = resolved.variant_count,
        bandwidth = ?resolved.bandwidth,
        resolution = ?resolved.resolution,
        subtitles = resolved.subtitle_renditions,
        live = ?resolved.live,
        "resolved HLS manifest"
    );
    Ok(resolved)
}

pub fn resolve_manifest(manifest_url: &str, body: &[u8]) -> Result<ResolvedStream, PlayerError> {
    let parse_err = |reason: String| PlayerError::ManifestParse {
        url: manifest_url.to_string(),
        reason,
    };
    let playlist = m3u8_rs::parse_playlist_res(body).map_err(|err| parse_err(format!("{err:?}")))?;

    match playlist {
        Playlist::MasterPlaylist(master) => {
            let subtitle_renditions = master
                .alternatives
                .iter()
                .filter(|alt| matches!(alt.media_type, AlternativeMediaType::Subtitles))
                .count();
            let best = master
                .variants
                .iter()
                .filter(|variant| !variant.is_i_frame)
                .max_by_key(|variant| variant.bandwidth)
                .ok_or_else(|| PlayerError::EmptyManifest {
                    url: manifest_url.to_string(),
                })?;
            let base = Url::parse(manifest_url).map_err(|err| parse_err(err.to_string()))?;
            let stream_url = base
                .join(&best.uri)
                .map_err(|err| parse_err(err.to_string()))?;
            Ok(ResolvedStream {
                manifest_url: manifest_url.to_string(),
                stream_url: stream_url.into(),
                variant_count: master.variants.len(),
                bandwidth: Some(best.bandwidth),
                resolution: best.resolution.as_ref().map(|res| (res.width, res.height)),
                subtitle_renditions,
                live: None,
            })
        }
        Playlist::MediaPlaylist(media) => {
            if media.segments.is_empty() && media.end_list {
                return Err(PlayerError::EmptyManifest {
                    url: manifest_url.to_string(),
                });
            }
            Ok(ResolvedStream {
                manifest_url: manifest_url.to_string(),
                stream_url: manifest_url.to_string(),
                variant_count: 1,
                bandwidth: None,
                resolution: None,
                subtitle_renditions: 0,
                live: Some(!media.end_list),
            })
        }
    }
}
