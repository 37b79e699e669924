//! Handlers for the memory verbs: add, search, list, forget, context.
//!
//! Each handler checks that an API key is configured, then its required
//! argument, and only then talks to the memory service. On success it returns
//! the text to print on stdout.

use std::fmt::Write;
use std::path::PathBuf;

use serde_json::json;
use thiserror::Error;
use tracing::warn;

use ksm_core::{
    is_fully_private, strip_private_content, ClientError, ContainerTags, MemoryClient,
    MemoryRecord, MemoryScope, MemoryType, Metadata, SearchHit, TagResolver,
};

use crate::aggregate::{join2, join3, merge_ranked, DEFAULT_MERGED_LIMIT};
use crate::args::CommandRequest;
use crate::config::{Settings, API_KEY_ENV};
use crate::context::{self, DEFAULT_CONTEXT_QUERY, EMPTY_CONTEXT, KEYWORD_NUDGE};
use crate::logger::Logger;

pub const ADD_USAGE: &str =
    "Usage: kimi-supermemory add <content> [--type <type>] [--scope <scope>]";
pub const SEARCH_USAGE: &str = "Usage: kimi-supermemory search <query> [--scope <scope>]";
pub const FORGET_USAGE: &str = "Usage: kimi-supermemory forget <memory-id>";

const DEFAULT_LIST_LIMIT: usize = 20;
const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{API_KEY_ENV} not set")]
    NotConfigured,

    #[error("{message}")]
    Validation {
        message: String,
        usage: &'static str,
    },

    #[error("Cannot store fully private content")]
    PolicyRejected,

    #[error("{0}")]
    Remote(#[from] ClientError),

    #[error("{scope} scope: {source}")]
    PartialRemote {
        scope: MemoryScope,
        source: ClientError,
    },
}

impl CommandError {
    fn missing(what: &str, usage: &'static str) -> Self {
        Self::Validation {
            message: format!("{what} is required"),
            usage,
        }
    }

    /// Follow-up line printed after the error message.
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotConfigured => Some(
                "Get your API key from https://console.supermemory.ai, \
                 then run `kimi-supermemory init`"
                    .into(),
            ),
            Self::Validation { usage, .. } => Some((*usage).to_string()),
            _ => None,
        }
    }
}

/// Everything a handler needs, built once in `main`.
pub struct App<'a> {
    pub settings: &'a Settings,
    pub client: &'a dyn MemoryClient,
    pub tags: &'a dyn TagResolver,
    pub logger: &'a Logger,
}

impl App<'_> {
    fn require_configured(&self) -> Result<(), CommandError> {
        if self.settings.is_configured() {
            Ok(())
        } else {
            Err(CommandError::NotConfigured)
        }
    }

    fn tags_for(&self, request: &CommandRequest) -> ContainerTags {
        let directory = request
            .directory
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let directory = std::fs::canonicalize(&directory).unwrap_or(directory);
        self.tags.resolve(&directory)
    }
}

fn required<'r>(
    value: &'r Option<String>,
    what: &str,
    usage: &'static str,
) -> Result<&'r str, CommandError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| CommandError::missing(what, usage))
}

// ---------------------------------------------------------------------------
// add
// ---------------------------------------------------------------------------

pub fn cmd_add(app: &App, request: &CommandRequest) -> Result<String, CommandError> {
    app.require_configured()?;
    let content = required(&request.content, "content", ADD_USAGE)?;

    let scope = request.scope.unwrap_or(MemoryScope::Project);
    let tags = app.tags_for(request);

    if is_fully_private(content) {
        return Err(CommandError::PolicyRejected);
    }
    let sanitized = strip_private_content(content);

    let mut metadata = Metadata::new();
    if let Some(ty) = &request.memory_type {
        if ty.parse::<MemoryType>().is_err() {
            warn!("unknown memory type {ty:?}, storing it anyway");
        }
        metadata.insert("type".into(), ty.clone().into());
    }

    let result = app
        .client
        .add(&sanitized, tags.for_scope(scope), &metadata)
        .inspect_err(|e| app.logger.log("add failed", json!({ "error": e.to_string() })))?;
    app.logger.log(
        "memory added",
        json!({ "id": result.id, "scope": scope.to_string() }),
    );

    let mut out = format!("✓ Memory added to {scope} scope\n  ID: {}\n", result.id);
    if let Some(ty) = &request.memory_type {
        let _ = writeln!(out, "  Type: {ty}");
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// search
// ---------------------------------------------------------------------------

pub fn cmd_search(app: &App, request: &CommandRequest) -> Result<String, CommandError> {
    app.require_configured()?;
    let query = required(&request.query, "query", SEARCH_USAGE)?;
    let tags = app.tags_for(request);

    let (label, hits) = match request.scope {
        Some(scope) => {
            let result = app.client.search(query, tags.for_scope(scope))?;
            (scope.to_string(), result.results)
        }
        None => {
            let client = app.client;
            let (user, project) = join2(
                || client.search(query, &tags.user),
                || client.search(query, &tags.project),
            );
            let user = user.map_err(|source| CommandError::PartialRemote {
                scope: MemoryScope::User,
                source,
            })?;
            let project = project.map_err(|source| CommandError::PartialRemote {
                scope: MemoryScope::Project,
                source,
            })?;
            let limit = request.limit().unwrap_or(DEFAULT_MERGED_LIMIT);
            (
                "all".to_string(),
                merge_ranked(user.results, project.results, limit),
            )
        }
    };

    app.logger.log(
        "search",
        json!({ "query": query, "scope": label, "results": hits.len() }),
    );
    Ok(render_search(query, &label, &hits))
}

fn render_search(query: &str, scope: &str, hits: &[SearchHit]) -> String {
    let mut out = format!(
        "\nSearch results for: \"{query}\"\nScope: {scope}\nFound: {} memories\n\n",
        hits.len()
    );
    if hits.is_empty() {
        out.push_str("No memories found.\n");
        return out;
    }
    for (i, hit) in hits.iter().enumerate() {
        let scope_label = hit.scope.map(|s| format!(" [{s}]")).unwrap_or_default();
        let _ = writeln!(
            out,
            "{}. [{}%]{scope_label} {}",
            i + 1,
            hit.percent(),
            preview(hit.text())
        );
        if let Some(id) = &hit.id {
            let _ = writeln!(out, "   ID: {id}");
        }
        out.push('\n');
    }
    out
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

pub fn cmd_list(app: &App, request: &CommandRequest) -> Result<String, CommandError> {
    app.require_configured()?;
    let scope = request.scope.unwrap_or(MemoryScope::Project);
    let tags = app.tags_for(request);
    let limit = request.limit().unwrap_or(DEFAULT_LIST_LIMIT);

    let result = app.client.list(tags.for_scope(scope), limit)?;
    Ok(render_list(scope, &result.memories))
}

fn render_list(scope: MemoryScope, memories: &[MemoryRecord]) -> String {
    let title = match scope {
        MemoryScope::User => "User",
        MemoryScope::Project => "Project",
    };
    let mut out = format!("\n{title} Memories ({}):\n\n", memories.len());
    if memories.is_empty() {
        out.push_str("No memories found.\n");
        return out;
    }
    for (i, mem) in memories.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, mem.text());
        let _ = writeln!(out, "   ID: {}", mem.id);
        let _ = writeln!(
            out,
            "   Created: {}",
            mem.created_at().format("%Y-%m-%d %H:%M")
        );
        if let Some(ty) = mem.metadata_str("type") {
            let _ = writeln!(out, "   Type: {ty}");
        }
        out.push('\n');
    }
    out
}

// ---------------------------------------------------------------------------
// forget
// ---------------------------------------------------------------------------

pub fn cmd_forget(app: &App, request: &CommandRequest) -> Result<String, CommandError> {
    app.require_configured()?;
    let id = required(&request.memory_id, "memory-id", FORGET_USAGE)?;

    app.client.delete(id)?;
    app.logger.log("memory deleted", json!({ "id": id }));
    Ok(format!("✓ Memory {id} deleted\n"))
}

// ---------------------------------------------------------------------------
// context
// ---------------------------------------------------------------------------

/// Best-effort: a failing fetch contributes an empty section instead of an error.
pub fn cmd_context(app: &App, request: &CommandRequest) -> Result<String, CommandError> {
    app.require_configured()?;
    let tags = app.tags_for(request);
    let query = request.query.as_deref().unwrap_or("").trim();
    let search_query = if query.is_empty() {
        DEFAULT_CONTEXT_QUERY
    } else {
        query
    };

    let client = app.client;
    let max_project = app.settings.max_project_memories;
    let (profile, user, project) = join3(
        || client.profile(&tags.user, Some(query)),
        || client.search(search_query, &tags.user),
        || client.list(&tags.project, max_project),
    );

    let input = context::assemble(profile, user, project);
    app.logger.log(
        "context",
        json!({
            "profile": input.profile.is_some(),
            "user": input.user.len(),
            "project": input.project.len(),
        }),
    );

    match context::format_context(app.settings, &input) {
        Some(mut block) => {
            if !query.is_empty() && app.settings.matches_keyword(query) {
                block.push('\n');
                block.push_str(KEYWORD_NUDGE);
                block.push('\n');
            }
            Ok(block)
        }
        None => Ok(format!("{EMPTY_CONTEXT}\n")),
    }
}
