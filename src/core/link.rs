use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// How a link title was obtained. Ordered by confidence.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TitleSource {
    /// Capitalized host name.
    #[default]
    Domain,
    /// Synthesized from a known service's URL layout.
    Pattern,
    /// Read from the page's `<title>`.
    Fetched,
}

/// A catalogued URL. One row per (url, source task) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: Uuid,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub title_source: TitleSource,
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_task_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

/// A link row before the store has assigned it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLink {
    pub url: String,
    pub title: String,
    pub title_source: TitleSource,
    pub domain: String,
    pub source_task_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

impl NewLink {
    pub fn into_link(self, id: Uuid) -> Link {
        Link {
            id,
            url: self.url,
            title: self.title,
            title_source: self.title_source,
            domain: self.domain,
            source_task_id: self.source_task_id,
            created_at: self.created_at,
        }
    }
}

/// Host name without a leading `www.`.
pub fn domain_of(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host).to_string()
}
