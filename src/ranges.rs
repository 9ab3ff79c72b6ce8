//! Grouping of episodes into 100-wide numeric ranges for the browser.

use std::collections::BTreeMap;
use std::fmt;

use crate::types::Episode;

pub const RANGE_WIDTH: u32 = 100;

/// A 1-based window of episode numbers, e.g. `101–200`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RangeBucket {
    pub start: u32,
    pub end: u32,
}

impl RangeBucket {
    /// Bucket holding `number` when the highest episode number is `max_number`.
    pub fn for_number(number: u32, max_number: u32) -> Self {
        let start = number.saturating_sub(1) / RANGE_WIDTH * RANGE_WIDTH + 1;
        let end = start
            .saturating_add(RANGE_WIDTH - 1)
            .min(max_number)
            .max(start);
        Self { start, end }
    }

    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RangeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\u{2013}{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeRanges {
    buckets: BTreeMap<u32, (RangeBucket, Vec<Episode>)>,
}

impl EpisodeRanges {
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Bucket keys ordered by their numeric start.
    pub fn keys(&self) -> Vec<String> {
        self.buckets.values().map(|(bucket, _)| bucket.key()).collect()
    }

    pub fn first_key(&self) -> Option<String> {
        self.buckets.values().next().map(|(bucket, _)| bucket.key())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&[Episode]> {
        self.buckets
            .values()
            .find(|(bucket, _)| bucket.key() == key)
            .map(|(_, episodes)| episodes.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RangeBucket, &[Episode])> {
        self.buckets
            .values()
            .map(|(bucket, episodes)| (bucket, episodes.as_slice()))
    }
}

/// Partitions `episodes` into ranges. Input order does not matter; episodes
/// inside a range come out sorted by number.
pub fn group_episodes(episodes: &[Episode]) -> EpisodeRanges {
    let Some(max_number) = episodes.iter().map(|ep| ep.number).max() else {
        return EpisodeRanges::default();
    };

    let mut buckets: BTreeMap<u32, (RangeBucket, Vec<Episode>)> = BTreeMap::new();
    for episode in episodes {
        let bucket = RangeBucket::for_number(episode.number, max_number);
        buckets
            .entry(bucket.start)
            .or_insert_with(|| (bucket, Vec::new()))
            .1
            .push(episode.clone());
    }
    for (_, members) in buckets.values_mut() {
        members.sort_by_key(|ep| ep.number);
    }
    EpisodeRanges { buckets }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(range: std::ops::RangeInclusive<u32>) -> Vec<Episode> {
        range.map(|n| Episode::new(format!("ep{n}"), n)).collect()
    }

    #[test]
    fn splits_150_episodes_into_two_ranges() {
        let ranges = group_episodes(&numbered(1..=150));
        assert_eq!(ranges.keys(), vec!["1\u{2013}100", "101\u{2013}150"]);

        let first = ranges.get("1\u{2013}100").unwrap();
        assert_eq!(first.len(), 100);
        assert_eq!(first.first().map(|ep| ep.number), Some(1));
        assert_eq!(first.last().map(|ep| ep.number), Some(100));

        let second = ranges.get("101\u{2013}150").unwrap();
        assert_eq!(second.len(), 50);
        assert_eq!(second.last().map(|ep| ep.number), Some(150));
    }

    #[test]
    fn single_episode_range_is_clamped_to_its_number() {
        let ranges = group_episodes(&[Episode::new("ep57", 57)]);
        assert_eq!(ranges.keys(), vec!["1\u{2013}57"]);
        assert_eq!(ranges.len(), 1);
        let only = ranges.get("1\u{2013}57").unwrap();
        assert_eq!(only, &[Episode::new("ep57", 57)]);
    }

    #[test]
    fn empty_list_yields_no_ranges() {
        let ranges = group_episodes(&[]);
        assert!(ranges.is_empty());
        assert!(ranges.keys().is_empty());
        assert_eq!(ranges.first_key(), None);
    }

    #[test]
    fn every_episode_lands_in_exactly_one_range() {
        let mut episodes = numbered(1..=1000);
        episodes.reverse();
        episodes.retain(|ep| ep.number % 7 != 0);
        let ranges = group_episodes(&episodes);

        let total: usize = ranges.iter().map(|(_, members)| members.len()).sum();
        assert_eq!(total, episodes.len());
        for episode in &episodes {
            let holding = ranges
                .iter()
                .filter(|(_, members)| members.iter().any(|m| m.id == episode.id))
                .count();
            assert_eq!(holding, 1, "episode {} held by {holding} ranges", episode.number);
        }

        let starts: Vec<u32> = ranges.iter().map(|(bucket, _)| bucket.start).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        assert_eq!(starts, sorted);
        assert_eq!(ranges.len(), 10);
    }

    #[test]
    fn keys_sort_numerically_not_lexically() {
        let episodes = vec![
            Episode::new("a", 950),
            Episode::new("b", 5),
            Episode::new("c", 205),
        ];
        let ranges = group_episodes(&episodes);
        assert_eq!(
            ranges.keys(),
            vec!["1\u{2013}100", "201\u{2013}300", "901\u{2013}950"]
        );
    }

    #[test]
    fn grouping_is_deterministic() {
        let episodes = numbered(1..=321);
        assert_eq!(group_episodes(&episodes), group_episodes(&episodes));
    }

    #[test]
    fn boundaries_are_aligned_to_hundreds() {
        assert_eq!(RangeBucket::for_number(100, 500), RangeBucket { start: 1, end: 100 });
        assert_eq!(RangeBucket::for_number(101, 500), RangeBucket { start: 101, end: 200 });
        assert_eq!(RangeBucket::for_number(500, 500), RangeBucket { start: 401, end: 500 });
    }

    #[test]
    fn episode_zero_joins_first_range() {
        let ranges = group_episodes(&[Episode::new("special", 0), Episode::new("ep1", 1)]);
        assert_eq!(ranges.keys(), vec!["1\u{2013}1"]);
        assert_eq!(ranges.get("1\u{2013}1").map(<[Episode]>::len), Some(2));
    }

    #[test]
    fn numbers_near_u32_max_stay_in_their_range() {
        let ranges = group_episodes(&[
            Episode::new("big", u32::MAX),
            Episode::new("first", 1),
        ]);
        assert_eq!(
            ranges.keys(),
            vec!["1\u{2013}100", "4294967201\u{2013}4294967295"]
        );

        let episodes: Vec<Episode> = serde_json::from_str(
            r#"[{"id":"a","number":4294967250},{"id":"b","number":1}]"#,
        )
        .unwrap();
        let ranges = group_episodes(&episodes);
        assert_eq!(
            ranges.keys(),
            vec!["1\u{2013}100", "4294967201\u{2013}4294967250"]
        );
    }
}
