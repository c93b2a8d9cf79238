//! In-process model doubles shared by unit tests.

use crate::embedding::{EmbeddingClient, EmbeddingClientError};
use crate::llm::{CompletionRequest, LlmClient, LlmClientError};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

const FAKE_DIMENSION: usize = 256;
const CONTEXT_FENCE: &str = "---------------------";

/// Echoes a short slice of the prompt context so answers reveal what they were built from.
#[derive(Default)]
pub(crate) struct FakeLlm {
    prompts: Mutex<Vec<String>>,
    responses: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl FakeLlm {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub(crate) fn last_response(&self) -> Option<String> {
        self.responses.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LlmClient for FakeLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmClientError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LlmClientError::GenerationFailed(
                "simulated outage".into(),
            ));
        }
        let context = request
            .prompt
            .split(CONTEXT_FENCE)
            .nth(1)
            .unwrap_or("")
            .trim()
            .chars()
            .take(120)
            .collect::<String>();
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(request.prompt);
        let response = format!("answer {}: {context}", prompts.len());
        self.responses.lock().unwrap().push(response.clone());
        Ok(response)
    }
}

/// Deterministic bag-of-words embeddings: texts sharing words score as similar.
#[derive(Default)]
pub(crate) struct FakeEmbedder {
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl FakeEmbedder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn encode(text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; FAKE_DIMENSION];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            embedding[(hasher.finish() % FAKE_DIMENSION as u64) as usize] += 1.0;
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingClient for FakeEmbedder {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmbeddingClientError::ProviderUnavailable(
                "simulated outage".into(),
            ));
        }
        Ok(texts.iter().map(|text| Self::encode(text)).collect())
    }
}
