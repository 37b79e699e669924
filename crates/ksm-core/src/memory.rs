use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Free-form metadata attached to a stored memory.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemoryType {
    ProjectConfig,
    Architecture,
    ErrorSolution,
    Preference,
    LearnedPattern,
    Conversation,
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProjectConfig => write!(f, "project-config"),
            Self::Architecture => write!(f, "architecture"),
            Self::ErrorSolution => write!(f, "error-solution"),
            Self::Preference => write!(f, "preference"),
            Self::LearnedPattern => write!(f, "learned-pattern"),
            Self::Conversation => write!(f, "conversation"),
        }
    }
}

impl std::str::FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project-config" => Ok(Self::ProjectConfig),
            "architecture" => Ok(Self::Architecture),
            "error-solution" => Ok(Self::ErrorSolution),
            "preference" => Ok(Self::Preference),
            "learned-pattern" => Ok(Self::LearnedPattern),
            "conversation" => Ok(Self::Conversation),
            _ => Err(format!("invalid memory type: {s}")),
        }
    }
}

/// Which container a memory lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryScope {
    /// Cross-project, tied to the person.
    User,
    /// Tied to one project directory.
    Project,
}

impl fmt::Display for MemoryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Project => write!(f, "project"),
        }
    }
}

impl std::str::FromStr for MemoryScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "project" => Ok(Self::Project),
            _ => Err(format!("invalid scope: {s}")),
        }
    }
}

/// A single ranked hit returned by a search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub memory: Option<String>,
    #[serde(default)]
    pub chunk: Option<String>,
    #[serde(default)]
    pub similarity: f64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    /// Set by the caller when results from several scopes are merged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<MemoryScope>,
}

impl SearchHit {
    /// Memory text, falling back to the matched chunk.
    pub fn text(&self) -> &str {
        self.memory
            .as_deref()
            .or(self.chunk.as_deref())
            .unwrap_or("")
    }

    /// Similarity as a rounded percentage.
    pub fn percent(&self) -> u32 {
        (self.similarity * 100.0).round().clamp(0.0, 100.0) as u32
    }
}

/// Listings carry no score; they are treated as fully relevant.
impl From<&MemoryRecord> for SearchHit {
    fn from(record: &MemoryRecord) -> Self {
        Self {
            id: Some(record.id.clone()),
            memory: record.summary.clone(),
            chunk: None,
            similarity: 1.0,
            title: record.title.clone(),
            metadata: record.metadata.clone(),
            scope: None,
        }
    }
}

/// A stored memory as returned by a listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl MemoryRecord {
    pub fn text(&self) -> &str {
        self.summary
            .as_deref()
            .or(self.content.as_deref())
            .unwrap_or("")
    }

    /// Creation time in local time. Missing or unparsable timestamps read as now.
    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now)
            .with_timezone(&Local)
    }

    /// String value of a metadata key, if present.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key)?.as_str()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, rename = "static")]
    pub static_facts: Vec<String>,
    #[serde(default)]
    pub dynamic: Vec<String>,
}

// --- Operation payloads ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddResult {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListResult {
    #[serde(default)]
    pub memories: Vec<MemoryRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileResult {
    #[serde(default)]
    pub profile: Profile,
}
