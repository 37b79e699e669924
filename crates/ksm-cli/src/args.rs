//! Command-line token parsing.
//!
//! Flags may appear anywhere after the command. A known flag always consumes
//! the next token as its value; everything else is positional.

use std::fmt;
use std::path::PathBuf;

use ksm_core::MemoryScope;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Add,
    Search,
    List,
    Forget,
    Context,
    Init,
    InitCodebase,
    Config,
    Help,
}

impl Command {
    /// Unknown commands fall back to help.
    fn from_token(token: &str) -> Self {
        match token {
            "add" => Self::Add,
            "search" => Self::Search,
            "list" => Self::List,
            "forget" => Self::Forget,
            "context" => Self::Context,
            "init" => Self::Init,
            "init-codebase" => Self::InitCodebase,
            "config" => Self::Config,
            _ => Self::Help,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Add => "add",
            Self::Search => "search",
            Self::List => "list",
            Self::Forget => "forget",
            Self::Context => "context",
            Self::Init => "init",
            Self::InitCodebase => "init-codebase",
            Self::Config => "config",
            Self::Help => "help",
        };
        f.write_str(name)
    }
}

/// Value of an integer flag. Unparsable input is kept so handlers can report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumberArg {
    Value(usize),
    Invalid(String),
}

impl NumberArg {
    fn parse(raw: &str) -> Self {
        match raw.parse::<usize>() {
            Ok(n) => Self::Value(n),
            Err(_) => Self::Invalid(raw.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Flag {
    Type,
    Scope,
    Limit,
    Directory,
    Query,
}

impl Flag {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "--type" => Some(Self::Type),
            "--scope" => Some(Self::Scope),
            "--limit" => Some(Self::Limit),
            "--directory" => Some(Self::Directory),
            "--query" => Some(Self::Query),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandRequest {
    pub command: Command,
    pub content: Option<String>,
    pub query: Option<String>,
    /// Passed through as metadata without validation.
    pub memory_type: Option<String>,
    pub scope: Option<MemoryScope>,
    pub memory_id: Option<String>,
    pub limit: Option<NumberArg>,
    pub directory: Option<PathBuf>,
}

impl CommandRequest {
    fn new(command: Command) -> Self {
        Self {
            command,
            content: None,
            query: None,
            memory_type: None,
            scope: None,
            memory_id: None,
            limit: None,
            directory: None,
        }
    }

    /// The `--limit` value, or `None` when absent, zero or not a number.
    pub fn limit(&self) -> Option<usize> {
        match &self.limit {
            Some(NumberArg::Value(n)) if *n > 0 => Some(*n),
            Some(NumberArg::Value(_)) => None,
            Some(NumberArg::Invalid(raw)) => {
                warn!("ignoring --limit {raw:?}: not a positive integer");
                None
            }
            None => None,
        }
    }

    fn apply(&mut self, flag: Flag, value: String) {
        match flag {
            Flag::Type => self.memory_type = Some(value),
            Flag::Scope => match value.parse() {
                Ok(scope) => self.scope = Some(scope),
                Err(e) => warn!("ignoring --scope: {e}"),
            },
            Flag::Limit => self.limit = Some(NumberArg::parse(&value)),
            Flag::Directory => self.directory = Some(PathBuf::from(value)),
            Flag::Query => self.query = Some(value),
        }
    }
}

/// Parse the tokens following the program name.
///
/// `add` and `search` take all positional words joined with spaces, so
/// `add "x y z"` and `add x y z` store the same content. `forget` takes only
/// the first positional word as the memory id. An explicit `--query` is
/// kept over positional words.
pub fn parse_args<I, S>(tokens: I) -> CommandRequest
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut tokens = tokens.into_iter().map(Into::into);
    let command = tokens
        .next()
        .map(|t| Command::from_token(&t))
        .unwrap_or(Command::Help);
    let mut request = CommandRequest::new(command);
    let mut positional: Vec<String> = Vec::new();

    while let Some(token) = tokens.next() {
        if let Some(flag) = Flag::from_token(&token) {
            match tokens.next() {
                Some(value) => request.apply(flag, value),
                None => warn!("{token} expects a value"),
            }
        } else if token.starts_with("--") {
            let skipped = tokens.next();
            warn!("ignoring unknown flag {token} {}", skipped.unwrap_or_default());
        } else {
            positional.push(token);
        }
    }

    match command {
        Command::Add if !positional.is_empty() => {
            request.content = Some(positional.join(" "));
        }
        Command::Search if request.query.is_none() && !positional.is_empty() => {
            request.query = Some(positional.join(" "));
        }
        Command::Forget => {
            request.memory_id = positional.into_iter().next();
        }
        _ => {}
    }

    request
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(tokens: &[&str]) -> CommandRequest {
        parse_args(tokens.iter().copied())
    }

    #[test]
    fn test_empty_defaults_to_help() {
        assert_eq!(parse(&[]).command, Command::Help);
    }

    #[test]
    fn test_unknown_command_is_help() {
        assert_eq!(parse(&["frobnicate", "x"]).command, Command::Help);
        assert_eq!(parse(&["--help"]).command, Command::Help);
        assert_eq!(parse(&["-h"]).command, Command::Help);
    }

    #[test]
    fn test_known_commands() {
        assert_eq!(parse(&["init-codebase"]).command, Command::InitCodebase);
        assert_eq!(parse(&["context"]).command, Command::Context);
        assert_eq!(parse(&["config"]).command, Command::Config);
    }

    #[test]
    fn test_add_quoted_and_bare_words_match() {
        let quoted = parse(&["add", "x y z"]);
        let bare = parse(&["add", "x", "y", "z"]);
        assert_eq!(quoted.content.as_deref(), Some("x y z"));
        assert_eq!(bare.content, quoted.content);
    }

    #[test]
    fn test_forget_first_positional_wins() {
        let req = parse(&["forget", "id1", "id2"]);
        assert_eq!(req.memory_id.as_deref(), Some("id1"));
        assert!(req.query.is_none());
    }

    #[test]
    fn test_flag_values_never_positional() {
        let req = parse(&[
            "add",
            "Uses",
            "--type",
            "project-config",
            "Bun",
            "--scope",
            "user",
        ]);
        assert_eq!(req.content.as_deref(), Some("Uses Bun"));
        assert_eq!(req.memory_type.as_deref(), Some("project-config"));
        assert_eq!(req.scope, Some(MemoryScope::User));
    }

    #[test]
    fn test_flag_value_that_looks_like_flag_is_consumed() {
        let req = parse(&["add", "--type", "--scope", "hello"]);
        assert_eq!(req.memory_type.as_deref(), Some("--scope"));
        assert_eq!(req.scope, None);
        assert_eq!(req.content.as_deref(), Some("hello"));
    }

    #[test]
    fn test_flag_first_then_content() {
        let req = parse(&["add", "--type", "architecture", "API", "in", "src/api"]);
        assert_eq!(req.content.as_deref(), Some("API in src/api"));
    }

    #[test]
    fn test_trailing_flag_without_value() {
        let req = parse(&["search", "tests", "--scope"]);
        assert_eq!(req.query.as_deref(), Some("tests"));
        assert_eq!(req.scope, None);
    }

    #[test]
    fn test_unknown_flag_dropped_with_value() {
        let req = parse(&["add", "hello", "--verbose", "yes", "world"]);
        assert_eq!(req.content.as_deref(), Some("hello world"));
    }

    #[test]
    fn test_invalid_scope_is_absent() {
        let req = parse(&["search", "q", "--scope", "global"]);
        assert_eq!(req.scope, None);
    }

    #[test]
    fn test_limit_numeric() {
        let req = parse(&["list", "--limit", "7"]);
        assert_eq!(req.limit, Some(NumberArg::Value(7)));
        assert_eq!(req.limit(), Some(7));
    }

    #[test]
    fn test_limit_non_numeric_treated_as_absent() {
        let req = parse(&["list", "--limit", "ten"]);
        assert_eq!(req.limit, Some(NumberArg::Invalid("ten".into())));
        assert_eq!(req.limit(), None);

        let negative = parse(&["list", "--limit", "-3"]);
        assert_eq!(negative.limit(), None);

        let zero = parse(&["list", "--limit", "0"]);
        assert_eq!(zero.limit(), None);
    }

    #[test]
    fn test_search_query_from_flag() {
        let req = parse(&["search", "--query", "testing workflow"]);
        assert_eq!(req.query.as_deref(), Some("testing workflow"));
    }

    #[test]
    fn test_search_query_flag_wins_over_positionals() {
        let req = parse(&["search", "--query", "testing workflow", "stray"]);
        assert_eq!(req.query.as_deref(), Some("testing workflow"));
    }

    #[test]
    fn test_context_query_and_directory() {
        let req = parse(&["context", "--directory", "/work/app", "--query", "auth"]);
        assert_eq!(req.directory, Some(PathBuf::from("/work/app")));
        assert_eq!(req.query.as_deref(), Some("auth"));
        assert!(req.content.is_none());
    }

    #[test]
    fn test_positionals_ignored_for_list() {
        let req = parse(&["list", "stray"]);
        assert!(req.content.is_none());
        assert!(req.query.is_none());
        assert!(req.memory_id.is_none());
    }
}
