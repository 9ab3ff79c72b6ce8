use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::WatchBackend;
use crate::config::Settings;
use crate::error::ApiError;
use crate::types::{AnimeInfo, Episode, EpisodeServers, SearchHit};

const ERROR_BODY_LIMIT: usize = 240;

pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let client = Client::builder().user_agent(&settings.user_agent).build()?;
        let base = normalize_base(&settings.api_base_url)?;
        Ok(Self { client, base })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = endpoint_url(&self.base, endpoint)?;
        debug!(%url, ?query, "backend request");
        let response = self
            .client
            .get(url)
            .query(query)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|source| ApiError::Request { endpoint, source })?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| ApiError::Request { endpoint, source })?;
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint,
                status,
                body: text.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }
        serde_json::from_str(&text).map_err(|source| ApiError::Decode { endpoint, source })
    }
}

impl WatchBackend for HttpBackend {
    async fn anime_info(&self, anime_id: &str) -> Result<AnimeInfo, ApiError> {
        let payload: AnimeInfoPayload = self.get_json("animeInfo", &[("animeId", anime_id)]).await?;
        Ok(payload.anime_info)
    }

    async fn episodes(&self, data_id: &str) -> Result<Vec<Episode>, ApiError> {
        let payload: EpisodesPayload = self.get_json("episodes", &[("dataId", data_id)]).await?;
        Ok(payload.episodes)
    }

    async fn episode_servers(&self, episode_id: &str) -> Result<EpisodeServers, ApiError> {
        self.get_json("episodeServers", &[("episodeId", episode_id)])
            .await
    }

    async fn search(&self, keyword: &str) -> Result<Vec<SearchHit>, ApiError> {
        let payload: SearchPayload = self.get_json("search", &[("keyword", keyword)]).await?;
        Ok(payload.anime_list)
    }
}

/// Makes sure relative endpoints land under the configured base path.
fn normalize_base(raw: &str) -> Result<Url, url::ParseError> {
    let mut base = Url::parse(raw.trim())?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

fn endpoint_url(base: &Url, endpoint: &'static str) -> Result<Url, ApiError> {
    base.join(endpoint)
        .map_err(|source| ApiError::Url { endpoint, source })
}

// --- Wire payloads ---

#[derive(Debug, Deserialize)]
struct AnimeInfoPayload {
    #[serde(rename = "animeInfo")]
    #[serde(default)]
    anime_info: AnimeInfo,
}

#[derive(Debug, Deserialize)]
struct EpisodesPayload {
    #[serde(default)]
    episodes: Vec<Episode>,
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(rename = "animeList")]
    #[serde(default)]
    anime_list: Vec<SearchHit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_join_under_base_path() {
        let base = normalize_base("https://api.example.com/v2").unwrap();
        assert_eq!(
            endpoint_url(&base, "episodes").unwrap().as_str(),
            "https://api.example.com/v2/episodes"
        );

        let bare = normalize_base("https://api.example.com").unwrap();
        assert_eq!(
            endpoint_url(&bare, "episodeServers").unwrap().as_str(),
            "https://api.example.com/episodeServers"
        );
    }

    #[test]
    fn invalid_base_is_rejected() {
        assert!(normalize_base("not a url").is_err());
    }

    #[test]
    fn episodes_payload_decodes() {
        let payload: EpisodesPayload = serde_json::from_str(
            r#"{"episodes":[{"id":"ep-2","number":2,"title":"Two"},{"id":"ep-1","number":1}]}"#,
        )
        .unwrap();
        assert_eq!(payload.episodes.len(), 2);
        assert_eq!(payload.episodes[0].title.as_deref(), Some("Two"));
    }

    #[test]
    fn search_payload_without_list_is_empty() {
        let payload: SearchPayload = serde_json::from_str("{}").unwrap();
        assert!(payload.anime_list.is_empty());
    }
}
