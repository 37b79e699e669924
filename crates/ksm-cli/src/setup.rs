//! Commands that work without an API key: `init`, `init-codebase`, `config`.

use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::config::{self, KeySource, Settings, API_KEY_ENV};
use crate::credentials;

pub const API_KEY_PREFIX: &str = "sm_";
const CONSOLE_URL: &str = "https://console.supermemory.ai";

/// Source of interactive answers.
pub trait Prompt {
    fn ask(&mut self, question: &str) -> Result<String>;
    /// Like `ask`, without echoing the answer.
    fn secret(&mut self, question: &str) -> Result<String>;
}

pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn ask(&mut self, question: &str) -> Result<String> {
        print!("{question} ");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("failed to read stdin")?;
        Ok(line.trim().to_string())
    }

    fn secret(&mut self, question: &str) -> Result<String> {
        let answer = rpassword::prompt_password_stdout(&format!("{question} "))
            .context("failed to read API key")?;
        Ok(answer.trim().to_string())
    }
}

pub fn is_valid_api_key(key: &str) -> bool {
    key.starts_with(API_KEY_PREFIX) && key.len() > API_KEY_PREFIX.len()
}

/// Interactive setup. Stores the key in the credentials file.
pub fn cmd_init(
    settings: &Settings,
    prompt: &mut dyn Prompt,
    out: &mut dyn Write,
    credentials_path: &Path,
) -> Result<()> {
    writeln!(out, "\nKimi Supermemory Setup\n")?;

    if settings.is_configured() {
        writeln!(out, "✓ API key is already configured")?;
        let change = prompt.ask("Would you like to change it? (y/n)")?;
        if !matches!(change.to_lowercase().as_str(), "y" | "yes") {
            writeln!(out, "\nSetup complete!")?;
            return Ok(());
        }
    }

    writeln!(out, "Get your API key from: {CONSOLE_URL}\n")?;
    let api_key = prompt.secret("Enter your Supermemory API key:")?;
    if !is_valid_api_key(&api_key) {
        bail!("Invalid API key. It should start with '{API_KEY_PREFIX}'");
    }

    credentials::save(credentials_path, &api_key)?;

    writeln!(out, "\n✓ Credentials saved!")?;
    writeln!(out, "  Location: {}", credentials_path.display())?;
    writeln!(out, "\nYou can also set the environment variable:")?;
    writeln!(out, "  export {API_KEY_ENV}=\"{api_key}\"")?;
    Ok(())
}

pub const INIT_CODEBASE_GUIDE: &str = r#"
Codebase Memory Initialization

Memory for a codebase is built by hand. Follow these steps:

1. RESEARCH THE CODEBASE
   - Read README.md, the build manifest and config files
   - Explore the project structure
   - Identify tech stack and conventions

2. SAVE KEY INSIGHTS
   Use these commands to save what you learn:

   # Tech stack and commands
   kimi-supermemory add "Rust workspace. Build: cargo build, Test: cargo test" --type project-config

   # Architecture insights
   kimi-supermemory add "HTTP handlers in src/api/, storage in src/store/" --type architecture

   # Conventions
   kimi-supermemory add "Errors use thiserror in libraries, anyhow in binaries" --type learned-pattern

   # Preferences (for cross-project memory)
   kimi-supermemory add "I prefer explicit return types on functions" --type preference --scope user

3. VERIFY MEMORIES
   kimi-supermemory list

4. USE CONTEXT IN SESSIONS
   At the start of each session, fetch context:
   kimi-supermemory context

Saved memories are searched and retrieved by relevance to your queries.
"#;

pub fn cmd_init_codebase() -> &'static str {
    INIT_CODEBASE_GUIDE
}

/// Resolved settings, with the API key masked.
pub fn cmd_config(settings: &Settings) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Config: {}", config::show_config_path());
    let _ = writeln!(out);

    let key = match (&settings.api_key, settings.key_source) {
        (Some(key), Some(source)) => format!("{} ({})", mask_key(key), describe(source)),
        (Some(key), None) => mask_key(key),
        _ => "(not set)".to_string(),
    };
    let _ = writeln!(out, "[api]");
    let _ = writeln!(out, "  key = {key}");
    let _ = writeln!(out, "  url = {}", settings.api_url);
    let _ = writeln!(out);
    let _ = writeln!(out, "[retrieval]");
    let _ = writeln!(out, "  similarity_threshold = {}", settings.similarity_threshold);
    let _ = writeln!(out, "  max_memories = {}", settings.max_memories);
    let _ = writeln!(out, "  max_project_memories = {}", settings.max_project_memories);
    let _ = writeln!(out, "  max_profile_items = {}", settings.max_profile_items);
    let _ = writeln!(out, "  inject_profile = {}", settings.inject_profile);
    let _ = writeln!(out);
    let _ = writeln!(out, "[tags]");
    let _ = writeln!(out, "  container_tag_prefix = {}", settings.container_tag_prefix);
    let _ = writeln!(out);
    let _ = writeln!(out, "[capture]");
    let _ = writeln!(out, "  filter_prompt = {}", settings.filter_prompt);
    let _ = writeln!(out, "  keyword_patterns ({}):", settings.keyword_patterns.len());
    for re in &settings.keyword_patterns {
        let _ = writeln!(out, "    {}", re.as_str());
    }
    out
}

fn describe(source: KeySource) -> String {
    match source {
        KeySource::Env(name) => format!("from ${name}"),
        KeySource::ConfigFile => "from config file".to_string(),
        KeySource::Credentials => "from credentials file".to_string(),
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
