//! Query routing between the summary and vector engines.
//!
//! Routing sits behind [`QueryRouter`] so a real intent classifier can replace the keyword
//! strategy without touching the pipeline or the engines.

use serde::{Deserialize, Serialize};

const SUMMARY_KEYWORD: &str = "summarize";

/// Query engine selected for a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    /// Synthesize an answer over every indexed chunk.
    Summary,
    /// Answer from the chunks most similar to the question.
    Vector,
}

impl Route {
    /// Stable label used in logs and responses.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Vector => "vector",
        }
    }
}

/// Strategy that picks a query engine for free-text input.
pub trait QueryRouter: Send + Sync {
    /// Decide which engine should answer `query`.
    fn route(&self, query: &str) -> Route;
}

/// Routes to the summary engine when the query mentions a keyword, case-insensitively.
#[derive(Debug, Clone)]
pub struct KeywordRouter {
    keyword: String,
}

impl KeywordRouter {
    /// Build a router matching `keyword` anywhere in the query.
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into().to_lowercase(),
        }
    }
}

impl Default for KeywordRouter {
    fn default() -> Self {
        Self::new(SUMMARY_KEYWORD)
    }
}

impl QueryRouter for KeywordRouter {
    fn route(&self, query: &str) -> Route {
        if !self.keyword.is_empty() && query.to_lowercase().contains(&self.keyword) {
            Route::Summary
        } else {
            Route::Vector
        }
    }
}
