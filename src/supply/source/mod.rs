use async_trait::async_trait;
use thiserror::Error;

use crate::selection::CategoryId;
use crate::supply::decoder::WireQuestion;
use crate::supply::question::Difficulty;

pub mod otdb;

#[cfg(test)]
pub mod mock;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FetchRequest {
    pub amount: usize,
    pub difficulty: Difficulty,
    pub category_id: Option<CategoryId>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    /// The upstream asked us to slow down. Transient; the pool retries after
    /// its back-off delay without surfacing anything.
    #[error("rate limited by the question source")]
    RateLimited,
    /// DNS failure, timeout, 5xx, unparseable body. The pool retries once at
    /// most before surfacing this to the caller.
    #[error("question source transport error")]
    Transport(#[source] anyhow::Error),
}

/// The remote supply of trivia questions. An empty batch is not an error;
/// the upstream may simply be exhausted for the requested filters.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<Vec<WireQuestion>, FetchError>;
}
