//! Container tags scope every memory to a person or a project directory.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::memory::MemoryScope;

/// The pair of opaque container tags for one working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerTags {
    pub user: String,
    pub project: String,
}

impl ContainerTags {
    pub fn for_scope(&self, scope: MemoryScope) -> &str {
        match scope {
            MemoryScope::User => &self.user,
            MemoryScope::Project => &self.project,
        }
    }
}

pub trait TagResolver {
    fn resolve(&self, directory: &Path) -> ContainerTags;
}

/// Derives tags from a hash of the user identity and of the directory path.
#[derive(Debug, Clone)]
pub struct HashedTagResolver {
    prefix: String,
    identity: String,
}

impl HashedTagResolver {
    pub fn new(prefix: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            identity: identity.into(),
        }
    }
}

impl TagResolver for HashedTagResolver {
    fn resolve(&self, directory: &Path) -> ContainerTags {
        ContainerTags {
            user: format!("{}_user_{}", self.prefix, short_hash(&self.identity)),
            project: format!(
                "{}_project_{}",
                self.prefix,
                short_hash(&directory.to_string_lossy())
            ),
        }
    }
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = format!("{digest:x}");
    hex.truncate(16);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_prefixed_and_stable() {
        let resolver = HashedTagResolver::new("kimi", "dev@example.com");
        let a = resolver.resolve(Path::new("/home/dev/project"));
        let b = resolver.resolve(Path::new("/home/dev/project"));
        assert_eq!(a, b);
        assert!(a.user.starts_with("kimi_user_"));
        assert!(a.project.starts_with("kimi_project_"));
        assert_eq!(a.user.len(), "kimi_user_".len() + 16);
    }

    #[test]
    fn test_project_tag_depends_on_directory() {
        let resolver = HashedTagResolver::new("kimi", "dev@example.com");
        let a = resolver.resolve(Path::new("/work/a"));
        let b = resolver.resolve(Path::new("/work/b"));
        assert_eq!(a.user, b.user);
        assert_ne!(a.project, b.project);
    }

    #[test]
    fn test_for_scope() {
        let tags = ContainerTags {
            user: "u".into(),
            project: "p".into(),
        };
        assert_eq!(tags.for_scope(MemoryScope::User), "u");
        assert_eq!(tags.for_scope(MemoryScope::Project), "p");
    }

    #[test]
    fn test_known_digest() {
        // sha256("abc") = ba7816bf8f01cfea...
        assert_eq!(short_hash("abc"), "ba7816bf8f01cfea");
    }
}
