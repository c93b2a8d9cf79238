//! Summary index answered with the tree-summarize strategy.
//!
//! Chunk texts are packed into prompts that fit the context budget, every packed prompt is
//! answered concurrently, and the partial answers are packed and answered again until a single
//! answer remains.

use super::prompts::{CONTEXT_SEPARATOR, tree_summarize_prompt};
use super::types::{QueryEngine, QueryError, QueryResponse, SourceNode};
use crate::ingestion::{Node, TokenCounter};
use crate::llm::CompletionRequest;
use crate::models::Models;
use async_trait::async_trait;
use futures_util::future::try_join_all;

/// Index over every chunk of a document, used for whole-document questions.
pub struct SummaryIndex {
    nodes: Vec<Node>,
    context_tokens: usize,
    token_counter: TokenCounter,
}

impl SummaryIndex {
    /// Build a summary index; `context_tokens` bounds each generated prompt.
    pub fn new(nodes: Vec<Node>, context_tokens: usize, token_counter: TokenCounter) -> Self {
        Self {
            nodes,
            context_tokens: context_tokens.max(1),
            token_counter,
        }
    }

    /// Nodes held by the index, in document order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    fn count(&self, text: &str) -> usize {
        self.token_counter.as_ref()(text)
    }

    /// Group texts greedily so each group's joined text stays within `budget` tokens.
    ///
    /// A text larger than the budget forms a group of its own. When packing cannot reduce the
    /// number of texts, adjacent pairs are merged so every round makes progress.
    fn pack(&self, texts: &[String], budget: usize) -> Vec<String> {
        let separator_tokens = self.count(CONTEXT_SEPARATOR);
        let mut groups: Vec<Vec<&str>> = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_tokens = 0usize;

        for text in texts {
            let tokens = self.count(text);
            let added = if current.is_empty() {
                tokens
            } else {
                tokens + separator_tokens
            };
            if !current.is_empty() && current_tokens + added > budget {
                groups.push(std::mem::take(&mut current));
                current_tokens = 0;
                current.push(text);
                current_tokens += tokens;
            } else {
                current.push(text);
                current_tokens += added;
            }
        }
        if !current.is_empty() {
            groups.push(current);
        }

        if texts.len() > 1 && groups.len() >= texts.len() {
            return texts
                .chunks(2)
                .map(|pair| pair.join(CONTEXT_SEPARATOR))
                .collect();
        }

        groups
            .into_iter()
            .map(|group| group.join(CONTEXT_SEPARATOR))
            .collect()
    }
}

#[async_trait]
impl QueryEngine for SummaryIndex {
    async fn query(&self, models: &Models, query: &str) -> Result<QueryResponse, QueryError> {
        if self.nodes.is_empty() {
            return Err(QueryError::EmptyIndex);
        }

        let overhead = self.count(&tree_summarize_prompt("", query));
        let budget = self.context_tokens.saturating_sub(overhead).max(1);
        let mut texts: Vec<String> = self.nodes.iter().map(|node| node.text.clone()).collect();
        let mut round = 0usize;

        let response = loop {
            round += 1;
            let groups = self.pack(&texts, budget);
            tracing::debug!(
                round,
                inputs = texts.len(),
                prompts = groups.len(),
                "Tree summarize round"
            );

            let mut answers = try_join_all(groups.iter().map(|context| {
                models
                    .llm
                    .complete(CompletionRequest::new(tree_summarize_prompt(context, query)))
            }))
            .await?;

            if answers.len() <= 1 {
                break answers.pop().unwrap_or_default();
            }
            texts = answers;
        };

        Ok(QueryResponse {
            response,
            sources: self
                .nodes
                .iter()
                .map(|node| SourceNode {
                    ordinal: node.ordinal,
                    page_label: node.page_label.clone(),
                    score: None,
                    text: node.text.clone(),
                })
                .collect(),
        })
    }
}
