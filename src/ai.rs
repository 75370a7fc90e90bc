//! HTTP client for the remote AI query backend.
//!
//! Two requests per question:
//!
//! 1. `POST auth_url` with HTTP Basic client credentials and the form body
//!    `grant_type=client_credentials`; the JSON reply carries `access_token`.
//! 2. `GET endpoint?User_Prompt=…&System_Instruction_Planning=&System_Instruction_Query_Processing=&Max_Query_Limit=N`
//!    with `Authorization: Bearer <token>`; the reply is arbitrary JSON.
//!
//! Client id and secret are read from the environment variables named in
//! `[ai]` when the client is built. They are never logged.
//!
//! # Error mapping
//!
//! | Condition | Error |
//! |-----------|-------|
//! | token endpoint answers 400/401/403 | `Authentication` |
//! | any other non-2xx | `Backend { status }` |
//! | reply JSON carries an `error` field | `Backend` |
//! | connect failure | `Connection(Unreachable)` |
//! | deadline exceeded | `Timeout` |

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use datasynergy_core::{ConnectionFailure, Result, ServiceError};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::config::AiConfig;

/// Longest slice of an upstream error body carried into messages.
const MAX_ERROR_BODY: usize = 200;

#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    fn basic_header(&self) -> String {
        let raw = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"********")
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AiClient {
    http: reqwest::Client,
    auth_url: String,
    endpoint: String,
    credentials: ClientCredentials,
    max_query_limit: u32,
    timeout: Duration,
}

fn truncate(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}…", &body[..cut]),
        None => body.to_string(),
    }
}

fn transport_error(stage: &str, e: reqwest::Error) -> ServiceError {
    if e.is_timeout() {
        ServiceError::Timeout(format!("{} request timed out", stage))
    } else if e.is_connect() {
        ServiceError::connection(
            ConnectionFailure::Unreachable,
            format!("{} endpoint unreachable: {}", stage, e),
        )
    } else {
        ServiceError::connection(
            ConnectionFailure::Other,
            format!("{} request failed: {}", stage, e),
        )
    }
}

impl AiClient {
    pub fn new(
        auth_url: impl Into<String>,
        endpoint: impl Into<String>,
        credentials: ClientCredentials,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            auth_url: auth_url.into(),
            endpoint: endpoint.into(),
            credentials,
            max_query_limit: 5,
            timeout,
        })
    }

    pub fn with_max_query_limit(mut self, limit: u32) -> Self {
        self.max_query_limit = limit;
        self
    }

    /// Builds the client described by `[ai]`.
    ///
    /// Returns `Ok(None)` when the backend is disabled or its credential
    /// variables are unset; the bridge then goes straight to the local
    /// responder.
    pub fn from_config(config: &AiConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let (Some(auth_url), Some(endpoint)) = (&config.auth_url, &config.endpoint) else {
            return Err(ServiceError::validation(
                "ai.auth_url and ai.endpoint are required when ai.enabled = true",
            ));
        };
        let id = std::env::var(&config.client_id_env).ok();
        let secret = std::env::var(&config.client_secret_env).ok();
        let (Some(client_id), Some(client_secret)) = (id, secret) else {
            tracing::warn!(
                id_var = %config.client_id_env,
                secret_var = %config.client_secret_env,
                "AI backend enabled but credentials are not set; using the local responder only"
            );
            return Ok(None);
        };
        let client = Self::new(
            auth_url.clone(),
            endpoint.clone(),
            ClientCredentials {
                client_id,
                client_secret,
            },
            config.timeout(),
        )?
        .with_max_query_limit(config.max_query_limit);
        Ok(Some(client))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Client-credentials exchange.
    pub async fn access_token(&self) -> Result<String> {
        let response = self
            .http
            .post(&self.auth_url)
            .header("Authorization", self.credentials.basic_header())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await
            .map_err(|e| transport_error("token", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(
                if matches!(
                    status,
                    StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
                ) {
                    ServiceError::Authentication(format!(
                        "token endpoint returned {}: {}",
                        status,
                        truncate(&body)
                    ))
                } else {
                    ServiceError::backend(Some(status.as_u16()), truncate(&body))
                },
            );
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::backend(None, format!("malformed token response: {}", e)))?;
        token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ServiceError::Authentication("token response missing access_token".into())
            })
    }

    /// One query with an already obtained token.
    pub async fn query(&self, token: &str, prompt: &str) -> Result<Value> {
        let limit = self.max_query_limit.to_string();
        let response = self
            .http
            .get(&self.endpoint)
            .bearer_auth(token)
            .query(&[
                ("User_Prompt", prompt),
                ("System_Instruction_Planning", ""),
                ("System_Instruction_Query_Processing", ""),
                ("Max_Query_Limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| transport_error("query", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::backend(Some(status.as_u16()), truncate(&body)));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| ServiceError::backend(None, format!("malformed query response: {}", e)))?;

        match data.get("error") {
            None | Some(Value::Null) => Ok(data),
            Some(Value::String(msg)) => Err(ServiceError::backend(None, msg.clone())),
            Some(other) => Err(ServiceError::backend(None, other.to_string())),
        }
    }

    /// Token exchange plus query, bounded as a whole by the client timeout.
    pub async fn ask(&self, prompt: &str) -> Result<Value> {
        let exchange = async {
            let token = self.access_token().await?;
            self.query(&token, prompt).await
        };
        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                ServiceError::Timeout(format!(
                    "AI backend did not answer within {}s",
                    self.timeout.as_secs_f64()
                ))
            })?
    }
}
