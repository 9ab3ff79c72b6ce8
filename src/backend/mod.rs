use std::future::Future;

use crate::error::ApiError;
use crate::types::{AnimeInfo, Episode, EpisodeServers, SearchHit};

pub mod http;

/// Remote watch backend. Futures are `Send` so the page can run requests as
/// spawned tasks and take their completions in arrival order.
pub trait WatchBackend: Send + Sync + 'static {
    fn anime_info(
        &self,
        anime_id: &str,
    ) -> impl Future<Output = Result<AnimeInfo, ApiError>> + Send;

    fn episodes(&self, data_id: &str)
    -> impl Future<Output = Result<Vec<Episode>, ApiError>> + Send;

    fn episode_servers(
        &self,
        episode_id: &str,
    ) -> impl Future<Output = Result<EpisodeServers, ApiError>> + Send;

    fn search(&self, keyword: &str) -> impl Future<Output = Result<Vec<SearchHit>, ApiError>> + Send;
}
