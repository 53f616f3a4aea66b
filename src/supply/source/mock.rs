use anyhow::anyhow;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::supply::decoder::WireQuestion;
use crate::supply::source::{FetchError, FetchRequest, QuestionSource};

pub enum MockOutcome {
    Batch(Vec<WireQuestion>),
    RateLimited,
    TransportError,
}

/// Scripted stand-in for the remote endpoint. Outcomes are served in the
/// order they were pushed; once the script runs out every fetch returns an
/// empty batch. A gated source parks each fetch until `release_one`, to
/// observe the in-flight guard.
#[derive(Clone, Default)]
pub struct MockSource {
    outcomes: Arc<Mutex<VecDeque<MockOutcome>>>,
    requests: Arc<Mutex<Vec<FetchRequest>>>,
    gate: Option<Arc<Semaphore>>,
}

impl MockSource {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn gated() -> Self {
        MockSource {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Default::default()
        }
    }

    pub fn release_one(&self) {
        self.gate
            .as_ref()
            .expect("release_one called on an ungated source")
            .add_permits(1);
    }

    pub fn push_batch(&self, batch: Vec<WireQuestion>) {
        self.outcomes.lock().push_back(MockOutcome::Batch(batch));
    }

    pub fn push_rate_limited(&self) {
        self.outcomes.lock().push_back(MockOutcome::RateLimited);
    }

    pub fn push_transport_error(&self) {
        self.outcomes.lock().push_back(MockOutcome::TransportError);
    }

    pub fn fetch_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<FetchRequest> {
        self.requests.lock().last().copied()
    }
}

#[async_trait]
impl QuestionSource for MockSource {
    async fn fetch(&self, request: FetchRequest) -> Result<Vec<WireQuestion>, FetchError> {
        self.requests.lock().push(request);
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("mock gate closed").forget();
        }
        let outcome = self.outcomes.lock().pop_front();
        match outcome {
            None => Ok(Vec::new()),
            Some(MockOutcome::Batch(batch)) => Ok(batch),
            Some(MockOutcome::RateLimited) => Err(FetchError::RateLimited),
            Some(MockOutcome::TransportError) => {
                Err(FetchError::Transport(anyhow!("connection reset")))
            }
        }
    }
}

/// Builds a wire record the way the real endpoint would, all fields base64
/// encoded.
pub fn wire_question(category: &str, difficulty: &str, prompt: &str) -> WireQuestion {
    WireQuestion {
        category: B64.encode(category),
        difficulty: B64.encode(difficulty),
        question: B64.encode(prompt),
        correct_answer: B64.encode("yes"),
        incorrect_answers: vec![B64.encode("no"), B64.encode("maybe")],
    }
}
