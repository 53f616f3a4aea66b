use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use parking_lot::RwLock;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

use crate::selection::Category;
use crate::supply::decoder::WireQuestion;
use crate::supply::source::{FetchError, FetchRequest, QuestionSource};

const BASE_URL: &str = "https://opentdb.com";

// Upstream response codes, per the Open Trivia DB API.
const RESPONSE_OK: u8 = 0;
const RESPONSE_NO_RESULTS: u8 = 1;
const RESPONSE_TOKEN_NOT_FOUND: u8 = 3;
const RESPONSE_TOKEN_EXHAUSTED: u8 = 4;
const RESPONSE_RATE_LIMITED: u8 = 5;

#[derive(Debug, Deserialize)]
struct QuestionResponse {
    response_code: u8,
    #[serde(default)]
    results: Vec<WireQuestion>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct CategoryResponse {
    trivia_categories: Vec<Category>,
}

/// The Open Trivia DB endpoint. Holds the session continuation token that
/// keeps the upstream from repeating questions within a session.
pub struct OtdbSource {
    client: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl OtdbSource {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        OtdbSource {
            client,
            base_url: BASE_URL.to_owned(),
            token: RwLock::new(None),
        }
    }

    /// Requests a fresh session token from the upstream.
    pub async fn request_token(&self) -> Result<()> {
        let body = self
            .client
            .get(format!("{}/api_token.php", self.base_url))
            .query(&[("command", "request")])
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        let response: TokenResponse =
            serde_json::from_slice(&body).context("Failed to parse token response")?;
        info!("Obtained new session token");
        *self.token.write() = Some(response.token);
        Ok(())
    }

    /// Fetches the full category catalogue.
    pub async fn fetch_categories(&self) -> Result<Vec<Category>> {
        let body = self
            .client
            .get(format!("{}/api_category.php", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        let response: CategoryResponse =
            serde_json::from_slice(&body).context("Failed to parse category catalogue")?;
        Ok(response.trivia_categories)
    }
}

fn transport(error: reqwest::Error) -> FetchError {
    FetchError::Transport(error.into())
}

#[async_trait]
impl QuestionSource for OtdbSource {
    async fn fetch(&self, request: FetchRequest) -> Result<Vec<WireQuestion>, FetchError> {
        let mut params: Vec<(&str, String)> = vec![
            ("amount", request.amount.to_string()),
            ("difficulty", request.difficulty.as_str().to_owned()),
            ("encode", "base64".to_owned()),
        ];
        if let Some(category_id) = request.category_id {
            params.push(("category", category_id.to_string()));
        }
        if let Some(token) = self.token.read().clone() {
            params.push(("token", token));
        }

        debug!(
            "Requesting {} {} question(s) from upstream",
            request.amount, request.difficulty
        );
        let response = self
            .client
            .get(format!("{}/api.php", self.base_url))
            .query(&params)
            .send()
            .await
            .map_err(transport)?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        let bytes = response
            .error_for_status()
            .map_err(transport)?
            .bytes()
            .await
            .map_err(transport)?;
        let body: QuestionResponse =
            serde_json::from_slice(&bytes).map_err(|e| FetchError::Transport(e.into()))?;

        match body.response_code {
            RESPONSE_OK => Ok(body.results),
            RESPONSE_NO_RESULTS => Ok(Vec::new()),
            RESPONSE_TOKEN_NOT_FOUND | RESPONSE_TOKEN_EXHAUSTED => {
                // The session token expired or ran dry. Drop it and let the
                // back-off path try again tokenless.
                info!("Session token no longer valid, discarding it");
                *self.token.write() = None;
                Ok(Vec::new())
            }
            RESPONSE_RATE_LIMITED => Err(FetchError::RateLimited),
            other => Err(FetchError::Transport(anyhow!(
                "Unexpected upstream response code {}",
                other
            ))),
        }
    }
}
