//! Terminal labels for the episode browser.

use crate::page::Selection;
use crate::ranges::EpisodeRanges;
use crate::source::PlaybackSource;
use crate::types::{AnimeInfo, Episode, ServerDescriptor, Translation};

const ACTIVE: &str = "\u{25b6} ";
const INACTIVE: &str = "  ";
const DESCRIPTION_WIDTH: usize = 280;

/// Title and a shortened description, or nothing before the info arrives.
pub fn header(info: Option<&AnimeInfo>) -> Vec<String> {
    let Some(info) = info else {
        return Vec::new();
    };
    let mut lines = vec![info.title.clone().unwrap_or_else(|| String::from("Untitled"))];
    if let Some(description) = info.description.as_deref().map(str::trim) {
        if !description.is_empty() {
            lines.push(shorten(description, DESCRIPTION_WIDTH));
        }
    }
    let details = info.details();
    if !details.is_empty() {
        lines.push(details.join(", "));
    }
    if let Some(poster) = info.poster.as_deref().filter(|p| !p.is_empty()) {
        lines.push(format!("Poster: {poster}"));
    }
    lines
}

pub fn range_labels(ranges: &EpisodeRanges, selected: Option<&str>) -> Vec<String> {
    ranges
        .iter()
        .map(|(bucket, episodes)| {
            let key = bucket.key();
            let marker = if selected == Some(key.as_str()) {
                ACTIVE
            } else {
                INACTIVE
            };
            format!("{marker}{key} ({} episodes)", episodes.len())
        })
        .collect()
}

/// Highlights the episode whose id matches the selection.
pub fn episode_labels(episodes: &[Episode], active_id: Option<&str>) -> Vec<String> {
    episodes
        .iter()
        .map(|ep| {
            let marker = if active_id == Some(ep.id.as_str()) {
                ACTIVE
            } else {
                INACTIVE
            };
            match ep.title.as_deref().filter(|t| !t.is_empty()) {
                Some(title) => format!("{marker}Episode {}: {title}", ep.number),
                None => format!("{marker}Episode {}", ep.number),
            }
        })
        .collect()
}

pub fn server_summary(selection: &Selection) -> String {
    if selection.episode_id.is_none() {
        return String::from("No episode selected.");
    }
    if selection.servers_pending {
        return String::from("Loading servers...");
    }
    if selection.servers.is_empty() {
        return String::from("No servers listed.");
    }
    let servers = &selection.servers;
    [("Sub", &servers.sub), ("Dub", &servers.dub), ("Raw", &servers.raw)]
        .into_iter()
        .filter(|(_, list)| !list.is_empty())
        .map(|(label, list)| format!("{label}: {}", server_names(list)))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// One line describing what the player is showing.
pub fn status_line(
    source: Option<&PlaybackSource>,
    episode: Option<&Episode>,
    translation: Translation,
) -> String {
    let episode = episode
        .map(|ep| format!("Episode {}", ep.number))
        .unwrap_or_else(|| String::from("No episode"));
    match source {
        None => format!("{episode} ({}), player idle", translation.label()),
        Some(PlaybackSource::Embed(url)) => {
            format!("{episode} ({}), embed {url}", translation.label())
        }
        Some(PlaybackSource::Stream { manifest, tracks }) => {
            let captions = tracks.iter().filter(|t| t.is_captions()).count();
            format!("{episode}, stream {manifest} [{captions} caption tracks]")
        }
    }
}

fn server_names(list: &[ServerDescriptor]) -> String {
    list.iter()
        .map(|server| server.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn shorten(text: &str, width: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(width).collect();
    if chars.next().is_some() {
        format!("{}...", head.trim_end())
    } else {
        head
    }
}
