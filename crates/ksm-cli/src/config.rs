//! Settings resolution.
//!
//! Lookup order for the API key:
//! 1. `KIMI_SUPERMEMORY_API_KEY`, then the legacy `SUPERMEMORY_API_KEY`
//! 2. `apiKey` in the JSON config file (`$KIMI_SUPERMEMORY_CONFIG` or
//!    `~/.config/kimi/supermemory.json`)
//! 3. The credentials file written by `kimi-supermemory init`
//!
//! Every other setting comes from the config file, else a built-in default.
//! A missing or malformed file reads as an empty one.

use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use tracing::debug;

use ksm_client::{SearchOptions, DEFAULT_API_URL};

use crate::credentials;

pub const API_KEY_ENV: &str = "KIMI_SUPERMEMORY_API_KEY";
pub const LEGACY_API_KEY_ENV: &str = "SUPERMEMORY_API_KEY";
const CONFIG_PATH_ENV: &str = "KIMI_SUPERMEMORY_CONFIG";

const DEFAULT_FILTER_PROMPT: &str = "You are a stateful coding agent. Remember all the \
information, including but not limited to user's coding preferences, tech stack, \
behaviours, workflows, and any other relevant details.";

const BUILTIN_KEYWORD_PATTERNS: &[&str] = &[
    r"remember",
    r"memorize",
    r"save\s+this",
    r"note\s+this",
    r"keep\s+in\s+mind",
    r"don'?t\s+forget",
    r"learn\s+this",
    r"store\s+this",
    r"record\s+this",
    r"make\s+a\s+note",
    r"take\s+note",
    r"jot\s+down",
    r"commit\s+to\s+memory",
    r"remember\s+that",
    r"never\s+forget",
    r"always\s+remember",
];

/// Raw contents of the JSON config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileConfig {
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub similarity_threshold: Option<f64>,
    pub max_memories: Option<usize>,
    pub max_project_memories: Option<usize>,
    pub max_profile_items: Option<usize>,
    pub inject_profile: Option<bool>,
    pub container_tag_prefix: Option<String>,
    pub filter_prompt: Option<String>,
    pub keyword_patterns: Option<Vec<String>>,
}

/// Where the resolved API key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Env(&'static str),
    ConfigFile,
    Credentials,
}

/// Resolved settings. Built once at startup and only shared by reference.
#[derive(Debug)]
pub struct Settings {
    pub api_key: Option<String>,
    pub key_source: Option<KeySource>,
    pub api_url: String,
    pub similarity_threshold: f64,
    pub max_memories: usize,
    pub max_project_memories: usize,
    pub max_profile_items: usize,
    pub inject_profile: bool,
    pub container_tag_prefix: String,
    pub filter_prompt: String,
    pub keyword_patterns: Vec<Regex>,
}

impl Settings {
    /// Resolve from the process environment and the files on disk.
    pub fn load() -> Self {
        let file = config_path()
            .map(|p| load_file_config(&p))
            .unwrap_or_default();
        let credentials_key = credentials::credentials_path()
            .and_then(|p| credentials::load_api_key(&p));
        Self::resolve(|name| std::env::var(name).ok(), file, credentials_key)
    }

    pub fn resolve(
        env: impl Fn(&str) -> Option<String>,
        file: FileConfig,
        credentials_key: Option<String>,
    ) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let (api_key, key_source) = if let Some(k) = non_empty(env(API_KEY_ENV)) {
            (Some(k), Some(KeySource::Env(API_KEY_ENV)))
        } else if let Some(k) = non_empty(env(LEGACY_API_KEY_ENV)) {
            (Some(k), Some(KeySource::Env(LEGACY_API_KEY_ENV)))
        } else if let Some(k) = non_empty(file.api_key) {
            (Some(k), Some(KeySource::ConfigFile))
        } else if let Some(k) = non_empty(credentials_key) {
            (Some(k), Some(KeySource::Credentials))
        } else {
            (None, None)
        };

        let user_patterns = file.keyword_patterns.unwrap_or_default();
        let keyword_patterns = BUILTIN_KEYWORD_PATTERNS
            .iter()
            .copied()
            .chain(user_patterns.iter().map(String::as_str))
            .filter_map(compile_pattern)
            .collect();

        Self {
            api_key,
            key_source,
            api_url: file.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            similarity_threshold: file.similarity_threshold.unwrap_or(0.6),
            max_memories: file.max_memories.unwrap_or(5),
            max_project_memories: file.max_project_memories.unwrap_or(10),
            max_profile_items: file.max_profile_items.unwrap_or(5),
            inject_profile: file.inject_profile.unwrap_or(true),
            container_tag_prefix: file
                .container_tag_prefix
                .unwrap_or_else(|| "kimi".to_string()),
            filter_prompt: file
                .filter_prompt
                .unwrap_or_else(|| DEFAULT_FILTER_PROMPT.to_string()),
            keyword_patterns,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            threshold: self.similarity_threshold,
            limit: self.max_memories,
        }
    }

    /// True when the text contains a "remember this"-style request.
    pub fn matches_keyword(&self, text: &str) -> bool {
        self.keyword_patterns.iter().any(|re| re.is_match(text))
    }
}

fn compile_pattern(pattern: &str) -> Option<Regex> {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(e) => {
            debug!("dropping keyword pattern {pattern:?}: {e}");
            None
        }
    }
}

/// Read the config file. Missing or malformed files yield an empty config.
pub fn load_file_config(path: &Path) -> FileConfig {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return FileConfig::default(),
    };
    match serde_json_lenient::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            debug!("ignoring malformed config {}: {e}", path.display());
            FileConfig::default()
        }
    }
}

/// Resolve the config file path.
pub fn config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(p));
    }
    credentials::home_dir().map(|home| home.join(".config").join("kimi").join("supermemory.json"))
}

/// Show the active config path (for `kimi-supermemory config`).
pub fn show_config_path() -> String {
    match config_path() {
        Some(p) if p.exists() => format!("{} (loaded)", p.display()),
        Some(p) => format!("{} (not found, using defaults)", p.display()),
        None => "no config path resolved (using defaults)".into(),
    }
}
