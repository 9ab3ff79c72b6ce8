use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Translation {
    #[default]
    Sub,
    Dub,
}

impl Translation {
    pub fn as_str(self) -> &'static str {
        match self {
            Translation::Sub => "sub",
            Translation::Dub => "dub",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Translation::Sub => "Sub",
            Translation::Dub => "Dub",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Translation::Sub => Translation::Dub,
            Translation::Dub => Translation::Sub,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Episode {
    #[serde(alias = "episodeId")]
    pub id: String,
    pub number: u32,
    #[serde(default)]
    pub title: Option<String>,
}

#[cfg(test)]
impl Episode {
    pub fn new(id: impl Into<String>, number: u32) -> Self {
        Self {
            id: id.into(),
            number,
            title: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnimeInfo {
    #[serde(default, alias = "name")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
    /// Every other field the backend sends.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnimeInfo {
    /// Scalar extra fields as `key: value`, in key order.
    pub fn details(&self) -> Vec<String> {
        let mut fields: Vec<(&String, String)> = self
            .extra
            .iter()
            .filter_map(|(key, value)| match value {
                Value::String(s) if !s.is_empty() => Some((key, s.clone())),
                Value::Number(n) => Some((key, n.to_string())),
                Value::Bool(b) => Some((key, b.to_string())),
                _ => None,
            })
            .collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        fields
            .into_iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerDescriptor {
    #[serde(alias = "serverId")]
    pub id: Value,
    #[serde(alias = "serverName")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EpisodeServers {
    #[serde(default)]
    pub sub: Vec<ServerDescriptor>,
    #[serde(default)]
    pub dub: Vec<ServerDescriptor>,
    #[serde(default)]
    pub raw: Vec<ServerDescriptor>,
}

impl EpisodeServers {
    pub fn is_empty(&self) -> bool {
        self.sub.is_empty() && self.dub.is_empty() && self.raw.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionTrack {
    pub file: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_caption_kind")]
    pub kind: String,
    #[serde(default)]
    pub default: bool,
}

fn default_caption_kind() -> String {
    String::from("captions")
}

impl CaptionTrack {
    pub fn captions(file: impl Into<String>, label: Option<&str>, default: bool) -> Self {
        Self {
            file: file.into(),
            label: label.map(str::to_string),
            kind: default_caption_kind(),
            default,
        }
    }

    pub fn is_captions(&self) -> bool {
        self.kind == "captions"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchHit {
    #[serde(alias = "animeId")]
    pub id: String,
    #[serde(default, rename = "dataId")]
    pub data_id: Option<Value>,
    #[serde(default, alias = "name")]
    pub title: String,
}

impl SearchHit {
    pub fn data_id(&self) -> Option<String> {
        match &self.data_id {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn servers_tolerate_missing_arrays() {
        let servers: EpisodeServers =
            serde_json::from_str(r#"{"sub":[{"id":4,"name":"HD-1"}]}"#).unwrap();
        assert_eq!(servers.sub.len(), 1);
        assert_eq!(servers.sub[0].name, "HD-1");
        assert!(servers.dub.is_empty());
    }

    #[test]
    fn caption_track_wire_shape_defaults() {
        let track: CaptionTrack =
            serde_json::from_str(r#"{"file":"https://cdn/en.vtt","kind":"captions"}"#).unwrap();
        assert_eq!(track.label, None);
        assert!(!track.default);
        assert!(track.is_captions());

        let thumbs: CaptionTrack =
            serde_json::from_str(r#"{"file":"https://cdn/t.vtt","kind":"thumbnails"}"#).unwrap();
        assert!(!thumbs.is_captions());
    }

    #[test]
    fn search_hit_accepts_numeric_data_id() {
        let hit: SearchHit =
            serde_json::from_str(r#"{"id":"one-piece-100","dataId":100,"name":"One Piece"}"#)
                .unwrap();
        assert_eq!(hit.title, "One Piece");
        assert_eq!(hit.data_id().as_deref(), Some("100"));
    }

    #[test]
    fn anime_info_keeps_unknown_fields() {
        let info: AnimeInfo = serde_json::from_str(
            r#"{"name":"Frieren","rating":"PG-13","poster":"p.jpg","episodes":28,"genres":["Fantasy"]}"#,
        )
        .unwrap();
        assert_eq!(info.title.as_deref(), Some("Frieren"));
        assert_eq!(info.poster.as_deref(), Some("p.jpg"));
        assert_eq!(info.extra.get("rating"), Some(&Value::from("PG-13")));
        assert_eq!(info.extra.get("genres"), Some(&serde_json::json!(["Fantasy"])));
        assert!(!info.extra.contains_key("name"));
        assert_eq!(info.details(), vec!["episodes: 28", "rating: PG-13"]);
    }
}
