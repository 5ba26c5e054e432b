//! Error types for EPUB assembly.
//!
//! Library code returns [`AssemblyError`]; the binary wraps it with `anyhow` context.

use std::fmt;
use std::path::PathBuf;

/// Pipeline stage an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Sync,
    Scaffold,
    Articles,
    Toc,
    Manifest,
    Navigation,
    Package,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Sync => "sync",
            Stage::Scaffold => "scaffold",
            Stage::Articles => "articles",
            Stage::Toc => "toc",
            Stage::Manifest => "manifest",
            Stage::Navigation => "navigation",
            Stage::Package => "package",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    /// A content fragment could not be recovered by the lenient parser.
    /// Recorded as a diagnostic by the sanitizer; never returned from a run.
    #[error("malformed fragment #{index}: {reason}")]
    MalformedFragment { index: usize, reason: String },

    #[error("article data for {url} unusable ({path:?}): {source}")]
    MissingArticleData {
        url: String,
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("template `{name}` not found at {path:?}: {source}")]
    MissingTemplate {
        name: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("template `{name}` failed{}: {source}", for_url(.url))]
    Template {
        name: &'static str,
        /// Unset when the template fails to compile at load time.
        stage: Option<Stage>,
        url: Option<String>,
        source: minijinja::Error,
    },

    #[error("skeleton directory not found: {path:?}")]
    MissingSkeleton { path: PathBuf },

    #[error("output directory already exists: {path:?}")]
    OutputExists { path: PathBuf },

    #[error("invalid article url {url}: {reason}")]
    InvalidArticleUrl { url: String, reason: String },

    #[error("epub path {path} is produced by both {first} and {second}")]
    PathCollision {
        path: String,
        first: String,
        second: String,
    },

    #[error("state snapshot {path:?} unusable: {source}")]
    State {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{stage}: I/O error at {path:?}: {source}")]
    Io {
        stage: Stage,
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, AssemblyError>;

fn for_url(url: &Option<String>) -> String {
    url.as_deref()
        .map(|url| format!(" for {url}"))
        .unwrap_or_default()
}

impl AssemblyError {
    pub fn io(stage: Stage, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            stage,
            path: path.into(),
            source,
        }
    }

    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArticleUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Attach the article being rendered to a template failure.
    pub fn for_article(self, article_url: &str) -> Self {
        match self {
            Self::Template {
                name,
                stage,
                url: None,
                source,
            } => Self::Template {
                name,
                stage,
                url: Some(article_url.to_owned()),
                source,
            },
            other => other,
        }
    }

    /// Stage the error aborted, when it is tied to one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::MalformedFragment { .. } => None,
            Self::MissingArticleData { .. }
            | Self::InvalidArticleUrl { .. }
            | Self::PathCollision { .. } => Some(Stage::Articles),
            Self::Template { stage, .. } => *stage,
            Self::MissingTemplate { .. } => None,
            Self::MissingSkeleton { .. } | Self::OutputExists { .. } => Some(Stage::Scaffold),
            Self::State { .. } => Some(Stage::Sync),
            Self::Io { stage, .. } => Some(*stage),
        }
    }
}
