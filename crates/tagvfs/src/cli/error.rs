//! Helpful error types for CLI commands
//!
//! Core errors are wrapped with a hint about what to try next.

use std::fmt;
use tagvfs::TagvfsError;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Wrap a core error raised while operating on `path`.
    pub fn from_core(err: TagvfsError, path: &str) -> Self {
        let base = Self::new(err.to_string()).with_context(format!("Path: {}", path));
        match err {
            TagvfsError::NotFound(_) => base
                .with_suggestion(format!("TRY: tagvfs ls {}", parent_of(path)))
                .with_suggestion("TRY: tagvfs ls /tags   (to see known tags)"),
            TagvfsError::InvalidOperation(_) => base.with_suggestion(
                "TRY: end the tag query with '=' and give a single object name, e.g. /tags/a/b/=/file.txt",
            ),
            TagvfsError::UnknownRelation(_) => {
                base.with_suggestion("TRY: use 'includes' or 'is_equivalent'")
            }
            TagvfsError::Store(_) => {
                base.with_suggestion("TRY: check that no other tagvfs process holds the store")
            }
            _ => base,
        }
    }
}

fn parent_of(path: &str) -> &str {
    match path.trim_end_matches('/').rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((parent, _)) => parent,
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;
        if let Some(context) = &self.context {
            writeln!(f)?;
            writeln!(f, "{}", context)?;
        }
        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "{}", suggestion)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

/// Print a command failure as a JSON object on stdout
pub fn print_json_error(err: &anyhow::Error) {
    let payload = match err.downcast_ref::<HelpfulError>() {
        Some(helpful) => serde_json::json!({
            "error": helpful.message,
            "context": helpful.context,
            "suggestions": helpful.suggestions,
        }),
        None => serde_json::json!({
            "error": format!("{:#}", err),
        }),
    };
    println!("{}", payload);
}
