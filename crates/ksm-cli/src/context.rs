//! Context block for prompt injection.
//!
//! Combines the user profile, ranked user memories and recent project
//! memories. Each source is optional: a failed fetch contributes nothing.

use std::fmt::Write;

use tracing::warn;

use ksm_core::{ClientResult, ListResult, Profile, ProfileResult, SearchHit, SearchResult};

use crate::config::Settings;

pub const CONTEXT_HEADER: &str = "[SUPERMEMORY]";

/// Query used for the user-memory search when none is given.
pub const DEFAULT_CONTEXT_QUERY: &str = "general context";

pub const EMPTY_CONTEXT: &str =
    "[SUPERMEMORY] No memories found. Use 'kimi-supermemory add' to save some.";

/// Merged, uniformly shaped input for the formatter.
#[derive(Debug, Default)]
pub struct ContextInput {
    pub profile: Option<Profile>,
    pub user: Vec<SearchHit>,
    pub project: Vec<SearchHit>,
}

/// Collapse the three fetch outcomes, degrading each failure to empty.
pub fn assemble(
    profile: ClientResult<ProfileResult>,
    user: ClientResult<SearchResult>,
    project: ClientResult<ListResult>,
) -> ContextInput {
    let profile = profile
        .map_err(|e| warn!("context: profile fetch failed: {e}"))
        .ok()
        .map(|r| r.profile);
    let user = user
        .map_err(|e| warn!("context: user search failed: {e}"))
        .map(|r| r.results)
        .unwrap_or_default();
    let project: Vec<SearchHit> = project
        .map_err(|e| warn!("context: project listing failed: {e}"))
        .map(|r| r.memories.iter().map(SearchHit::from).collect())
        .unwrap_or_default();

    ContextInput {
        profile,
        user,
        project,
    }
}

/// Render the context block, or `None` when there is nothing to show.
pub fn format_context(settings: &Settings, input: &ContextInput) -> Option<String> {
    let mut sections: Vec<String> = Vec::new();

    if settings.inject_profile {
        if let Some(profile) = &input.profile {
            if let Some(s) = bullet_section("User Profile", &profile.static_facts, settings) {
                sections.push(s);
            }
            if let Some(s) = bullet_section("Recent Context", &profile.dynamic, settings) {
                sections.push(s);
            }
        }
    }

    let project: Vec<&SearchHit> = input
        .project
        .iter()
        .filter(|h| !h.text().trim().is_empty())
        .collect();
    if !project.is_empty() {
        let mut s = String::from("## Project Knowledge\n");
        for hit in project {
            let _ = writeln!(s, "- {}", hit.text().trim());
        }
        sections.push(s);
    }

    let relevant: Vec<&SearchHit> = input
        .user
        .iter()
        .filter(|h| h.similarity >= settings.similarity_threshold)
        .filter(|h| !h.text().trim().is_empty())
        .take(settings.max_memories)
        .collect();
    if !relevant.is_empty() {
        let mut s = String::from("## Relevant Memories\n");
        for hit in relevant {
            let _ = writeln!(s, "- [{}%] {}", hit.percent(), hit.text().trim());
        }
        sections.push(s);
    }

    if sections.is_empty() {
        return None;
    }

    let mut out = format!("{CONTEXT_HEADER}\n\n");
    out.push_str(&sections.join("\n"));
    Some(out)
}

fn bullet_section(title: &str, items: &[String], settings: &Settings) -> Option<String> {
    let items: Vec<&String> = items
        .iter()
        .filter(|i| !i.trim().is_empty())
        .take(settings.max_profile_items)
        .collect();
    if items.is_empty() {
        return None;
    }
    let mut s = format!("## {title}\n");
    for item in items {
        let _ = writeln!(s, "- {}", item.trim());
    }
    Some(s)
}

/// Hint appended when the query asks to remember something.
pub const KEYWORD_NUDGE: &str = "[SUPERMEMORY] A memory request was detected. \
Save it with: kimi-supermemory add \"<what to remember>\"";

#[cfg(test)]
mod tests {
    use ksm_core::{ClientError, MemoryRecord};

    use super::*;
    use crate::config::FileConfig;

    fn settings() -> Settings {
        Settings::resolve(|_: &str| None, FileConfig::default(), None)
    }

    fn hit(text: &str, similarity: f64) -> SearchHit {
        SearchHit {
            memory: Some(text.into()),
            similarity,
            ..Default::default()
        }
    }

    fn failure() -> ClientError {
        ClientError::Transport("connection refused".into())
    }

    #[test]
    fn test_all_failures_yield_empty_input() {
        let input = assemble(Err(failure()), Err(failure()), Err(failure()));
        assert!(input.profile.is_none());
        assert!(input.user.is_empty());
        assert!(input.project.is_empty());
        assert!(format_context(&settings(), &input).is_none());
    }

    #[test]
    fn test_listing_mapped_to_full_similarity() {
        let list = ListResult {
            memories: vec![MemoryRecord {
                id: "m1".into(),
                summary: Some("Build with cargo xtask".into()),
                title: Some("Build".into()),
                ..Default::default()
            }],
        };
        let input = assemble(Err(failure()), Err(failure()), Ok(list));
        assert_eq!(input.project.len(), 1);
        assert_eq!(input.project[0].similarity, 1.0);
        assert_eq!(input.project[0].id.as_deref(), Some("m1"));
        assert_eq!(input.project[0].title.as_deref(), Some("Build"));
    }

    #[test]
    fn test_one_failure_keeps_other_sections() {
        let search = SearchResult {
            results: vec![hit("Prefers explicit return types", 0.91)],
        };
        let input = assemble(Err(failure()), Ok(search), Err(failure()));
        let block = format_context(&settings(), &input).unwrap();
        assert!(block.starts_with(CONTEXT_HEADER));
        assert!(block.contains("## Relevant Memories"));
        assert!(block.contains("- [91%] Prefers explicit return types"));
        assert!(!block.contains("## Project Knowledge"));
    }

    #[test]
    fn test_full_block_section_order() {
        let input = ContextInput {
            profile: Some(Profile {
                static_facts: vec!["Senior Rust developer".into()],
                dynamic: vec!["Working on the auth refactor".into()],
            }),
            user: vec![hit("Likes small commits", 0.8)],
            project: vec![hit("Uses sqlx for database access", 1.0)],
        };
        let block = format_context(&settings(), &input).unwrap();
        let profile = block.find("## User Profile").unwrap();
        let recent = block.find("## Recent Context").unwrap();
        let project = block.find("## Project Knowledge").unwrap();
        let relevant = block.find("## Relevant Memories").unwrap();
        assert!(profile < recent && recent < project && project < relevant);
    }

    #[test]
    fn test_threshold_filters_user_hits() {
        let input = ContextInput {
            user: vec![hit("weak match", 0.3)],
            ..Default::default()
        };
        assert!(format_context(&settings(), &input).is_none());
    }

    #[test]
    fn test_max_memories_caps_user_hits() {
        let user = (0..8).map(|i| hit(&format!("memory {i}"), 0.9)).collect();
        let input = ContextInput {
            user,
            ..Default::default()
        };
        let block = format_context(&settings(), &input).unwrap();
        assert_eq!(block.matches("- [90%]").count(), 5);
    }

    #[test]
    fn test_profile_skipped_when_injection_disabled() {
        let file = FileConfig {
            inject_profile: Some(false),
            ..Default::default()
        };
        let settings = Settings::resolve(|_: &str| None, file, None);
        let input = ContextInput {
            profile: Some(Profile {
                static_facts: vec!["fact".into()],
                dynamic: Vec::new(),
            }),
            ..Default::default()
        };
        assert!(format_context(&settings, &input).is_none());
    }

    #[test]
    fn test_profile_items_capped() {
        let input = ContextInput {
            profile: Some(Profile {
                static_facts: (0..9).map(|i| format!("fact {i}")).collect(),
                dynamic: Vec::new(),
            }),
            ..Default::default()
        };
        let block = format_context(&settings(), &input).unwrap();
        assert!(block.contains("- fact 4"));
        assert!(!block.contains("- fact 5"));
    }
}
