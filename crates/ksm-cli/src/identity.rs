use std::cell::OnceCell;
use std::path::Path;
use std::process::Command;

use ksm_core::{ContainerTags, HashedTagResolver, TagResolver};

/// Tag resolver keyed on the local git identity, looked up on first use.
pub struct GitIdentityTags {
    prefix: String,
    resolver: OnceCell<HashedTagResolver>,
}

impl GitIdentityTags {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            resolver: OnceCell::new(),
        }
    }
}

impl TagResolver for GitIdentityTags {
    fn resolve(&self, directory: &Path) -> ContainerTags {
        self.resolver
            .get_or_init(|| HashedTagResolver::new(&self.prefix, user_identity()))
            .resolve(directory)
    }
}

/// `git config user.email`, else the login name, else "anonymous".
fn user_identity() -> String {
    git_email()
        .or_else(|| std::env::var("USER").ok())
        .or_else(|| std::env::var("USERNAME").ok())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "anonymous".to_string())
}

fn git_email() -> Option<String> {
    let output = Command::new("git")
        .args(["config", "user.email"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let email = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!email.is_empty()).then_some(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_use_prefix() {
        let tags = GitIdentityTags::new("team").resolve(Path::new("/tmp/project"));
        assert!(tags.user.starts_with("team_user_"));
        assert!(tags.project.starts_with("team_project_"));
    }

    #[test]
    fn test_identity_is_cached() {
        let resolver = GitIdentityTags::new("kimi");
        let a = resolver.resolve(Path::new("/a"));
        let b = resolver.resolve(Path::new("/b"));
        assert_eq!(a.user, b.user);
    }
}
