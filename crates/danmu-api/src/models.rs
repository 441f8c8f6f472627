use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

static PLATFORM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"【(.+?)】").expect("Invalid platform pattern"));
static SOURCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"from\s+([A-Za-z0-9_\-]+)\s*$").expect("Invalid source pattern"));
static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})").expect("Invalid year pattern"));

/// GET /api/v2/search/anime
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAnimeResponse {
    #[serde(default)]
    pub error_code: i32,
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub animes: Vec<Anime>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anime {
    pub anime_id: i64,
    #[serde(default, deserialize_with = "string_or_number")]
    pub bangumi_id: String,
    pub anime_title: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub type_description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub episode_count: usize,
}

impl Anime {
    pub fn year(&self) -> Option<i32> {
        let date = self.start_date.as_deref()?;
        YEAR_RE.captures(date)?.get(1)?.as_str().parse().ok()
    }

    /// Collection source, taken from the `from <source>` suffix of the title.
    pub fn source(&self) -> Option<&str> {
        SOURCE_RE
            .captures(&self.anime_title)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }

    pub fn category(&self) -> &str {
        if self.type_description.is_empty() {
            &self.kind
        } else {
            &self.type_description
        }
    }
}

/// GET /api/v2/bangumi/{animeId}
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BangumiResponse {
    #[serde(default)]
    pub error_code: i32,
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub bangumi: Option<Bangumi>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bangumi {
    pub anime_id: i64,
    #[serde(default, deserialize_with = "string_or_number")]
    pub bangumi_id: String,
    #[serde(default)]
    pub anime_title: String,
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

/// Consecutive episodes coming from the same platform.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeGroup<'a> {
    pub platform: String,
    pub episodes: Vec<&'a Episode>,
}

impl Bangumi {
    /// Split episodes into runs of the same platform, keeping their order.
    pub fn episode_groups(&self) -> Vec<EpisodeGroup<'_>> {
        let mut groups: Vec<EpisodeGroup<'_>> = Vec::new();

        for episode in &self.episodes {
            let platform = episode.platform().unwrap_or_default();
            match groups.last_mut() {
                Some(group) if group.platform == platform => group.episodes.push(episode),
                _ => groups.push(EpisodeGroup {
                    platform: platform.to_string(),
                    episodes: vec![episode],
                }),
            }
        }

        groups
    }

    /// Episodes of the first group whose platform is allowed, trying
    /// `allowed` in priority order. With no filter the first group is used.
    pub fn filtered_episodes(&self, allowed: &[String]) -> Vec<&Episode> {
        let mut groups = self.episode_groups();
        if allowed.is_empty() {
            return groups.into_iter().next().map(|g| g.episodes).unwrap_or_default();
        }

        for platform in allowed {
            if let Some(index) = groups
                .iter()
                .position(|g| g.platform.eq_ignore_ascii_case(platform.trim()))
            {
                return groups.swap_remove(index).episodes;
            }
        }
        Vec::new()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    #[serde(default, deserialize_with = "string_or_number")]
    pub season_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub episode_id: String,
    #[serde(default)]
    pub episode_title: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub episode_number: String,
}

impl Episode {
    /// Platform tag at the start of the title, e.g. `qq` in `【qq】 第1集`
    pub fn platform(&self) -> Option<&str> {
        PLATFORM_RE
            .captures(&self.episode_title)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim())
    }

    pub fn number(&self) -> Option<i32> {
        self.episode_number.trim().parse().ok()
    }
}

/// GET /api/v2/comment/{episodeId}
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentResponse {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Comment {
    pub cid: i64,
    /// `time,mode,color,user`
    pub p: String,
    /// Text
    pub m: String,
}

impl Comment {
    pub(crate) fn progress_ms(&self) -> i64 {
        self.field(0)
            .and_then(|t| t.parse::<f64>().ok())
            .map(|secs| (secs * 1000.0).round() as i64)
            .unwrap_or_default()
    }

    pub(crate) fn mode(&self) -> i32 {
        self.field(1).and_then(|m| m.parse().ok()).unwrap_or(1)
    }

    pub(crate) fn color(&self) -> u32 {
        self.field(2).and_then(|c| c.parse().ok()).unwrap_or(16777215)
    }

    pub(crate) fn user(&self) -> &str {
        self.field(3).unwrap_or_default()
    }

    fn field(&self, index: usize) -> Option<&str> {
        self.p.split(',').nth(index).map(str::trim)
    }
}

fn default_true() -> bool {
    true
}

/// Accept ids sent either as JSON strings or numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Int(i64),
        Float(f64),
        Null,
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Int(n) => n.to_string(),
        StringOrNumber::Float(f) => (f as i64).to_string(),
        StringOrNumber::Null => String::new(),
    })
}
