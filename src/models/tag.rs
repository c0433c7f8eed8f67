use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who attached a tag: a person, or the automated tagger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AuthorType {
    #[default]
    #[serde(rename = "human")]
    Human,
    #[serde(rename = "llm", alias = "automated")]
    Automated,
}

impl AuthorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorType::Human => "human",
            AuthorType::Automated => "llm",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "llm" | "automated" => AuthorType::Automated,
            _ => AuthorType::Human,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub author_type: AuthorType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTag {
    pub name: String,
    #[serde(default)]
    pub author_type: AuthorType,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagWithCount {
    #[serde(flatten)]
    pub tag: Tag,
    pub usage_count: i64,
}
