//! Natural-language query bridge.
//!
//! A question first goes to the remote AI backend (when one is configured)
//! and falls back to the local responder when that stage fails. Callers
//! only see a failure when both stages fail, as one error naming both
//! causes.

use std::time::Duration;

use datasynergy_core::models::NlResult;
use datasynergy_core::responder::{classify, local_answer};
use datasynergy_core::{Result, ServiceError};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::ai::AiClient;
use crate::config::{Config, FallbackConfig};

/// Which stage produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOrigin {
    AiBackend,
    LocalResponder,
}

/// An answer and the stage that produced it.
///
/// Serializes with `natural_language` and `raw_json` next to the tagged
/// `result`, so every JSON consumer can read the same pair regardless of
/// the variant.
#[derive(Debug, Clone, PartialEq)]
pub struct NlAnswer {
    pub origin: AnswerOrigin,
    pub result: NlResult,
}

impl Serialize for NlAnswer {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("NlAnswer", 4)?;
        state.serialize_field("origin", &self.origin)?;
        state.serialize_field("natural_language", self.result.natural_language())?;
        state.serialize_field("raw_json", &self.result.raw_json())?;
        state.serialize_field("result", &self.result)?;
        state.end()
    }
}

pub struct NlBridge {
    ai: Option<AiClient>,
    fallback_enabled: bool,
    fallback_latency: Duration,
    fallback_timeout: Duration,
}

impl NlBridge {
    pub fn new(ai: Option<AiClient>, fallback: &FallbackConfig) -> Self {
        Self {
            ai,
            fallback_enabled: fallback.enabled,
            fallback_latency: fallback.latency(),
            fallback_timeout: fallback.timeout(),
        }
    }

    /// Local responder only.
    pub fn local_only() -> Self {
        Self::new(None, &FallbackConfig::default())
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(AiClient::from_config(&config.ai)?, &config.fallback))
    }

    pub fn has_ai_backend(&self) -> bool {
        self.ai.is_some()
    }

    async fn local(&self, query: &str) -> serde_json::Value {
        if !self.fallback_latency.is_zero() {
            tokio::time::sleep(self.fallback_latency).await;
        }
        local_answer(query)
    }

    async fn fallback(&self, query: &str) -> Result<NlAnswer> {
        if !self.fallback_enabled {
            return Err(ServiceError::backend(None, "local responder is disabled"));
        }
        let data = tokio::time::timeout(self.fallback_timeout, self.local(query))
            .await
            .map_err(|_| {
                ServiceError::Timeout(format!(
                    "local responder did not answer within {}s",
                    self.fallback_timeout.as_secs_f64()
                ))
            })?;
        Ok(NlAnswer {
            origin: AnswerOrigin::LocalResponder,
            result: classify(data),
        })
    }

    pub async fn ask(&self, query: &str) -> Result<NlAnswer> {
        if query.trim().is_empty() {
            return Err(ServiceError::validation("query must not be empty"));
        }

        let primary = match &self.ai {
            Some(ai) => match ai.ask(query).await {
                Ok(data) => {
                    debug!("AI backend answered");
                    return Ok(NlAnswer {
                        origin: AnswerOrigin::AiBackend,
                        result: classify(data),
                    });
                }
                Err(e) => {
                    warn!(error = %e, "AI backend failed; falling back to the local responder");
                    Some(e)
                }
            },
            None => None,
        };

        match (self.fallback(query).await, primary) {
            (Ok(answer), _) => Ok(answer),
            (Err(local), None) => Err(local),
            (Err(local), Some(remote)) => Err(consolidate(remote, local)),
        }
    }
}

fn consolidate(remote: ServiceError, local: ServiceError) -> ServiceError {
    let message = format!("AI backend: {}; local responder: {}", remote, local);
    match (&remote, &local) {
        (ServiceError::Timeout(_), ServiceError::Timeout(_)) => ServiceError::Timeout(message),
        (ServiceError::Backend { status, .. }, _) => ServiceError::backend(*status, message),
        _ => ServiceError::backend(None, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let err = NlBridge::local_only().ask("  ").await.unwrap_err();
        assert_eq!(err.code(), "validation");
    }

    #[tokio::test]
    async fn test_local_only_answers_genepoint() {
        let answer = NlBridge::local_only()
            .ask("Tell me about GenePoint")
            .await
            .unwrap();
        assert_eq!(answer.origin, AnswerOrigin::LocalResponder);
        match &answer.result {
            NlResult::Raw(raw) => {
                assert_eq!(raw.raw_json["Account_Details"]["Account_Number"], "CC947211");
                assert!(raw.natural_language.contains("GenePoint"));
            }
            other => panic!("expected raw result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fallback_timeout() {
        let bridge = NlBridge::new(
            None,
            &FallbackConfig {
                enabled: true,
                latency_ms: 100,
                timeout_secs: 1,
            },
        );
        assert!(bridge.ask("hello").await.is_ok());

        let mut slow = bridge;
        slow.fallback_timeout = Duration::from_millis(20);
        let err = slow.ask("hello").await.unwrap_err();
        assert_eq!(err.code(), "timeout");
    }

    #[tokio::test]
    async fn test_disabled_fallback_without_ai() {
        let bridge = NlBridge::new(
            None,
            &FallbackConfig {
                enabled: false,
                ..FallbackConfig::default()
            },
        );
        assert_eq!(bridge.ask("hello").await.unwrap_err().code(), "backend");
    }

    #[test]
    fn test_consolidated_error_names_both() {
        let err = consolidate(
            ServiceError::backend(Some(503), "unavailable"),
            ServiceError::Timeout("local responder did not answer".into()),
        );
        assert_eq!(err.code(), "backend");
        let text = err.to_string();
        assert!(text.contains("(503)"));
        assert!(text.contains("AI backend"));
        assert!(text.contains("local responder"));

        let err = consolidate(
            ServiceError::Timeout("a".into()),
            ServiceError::Timeout("b".into()),
        );
        assert_eq!(err.code(), "timeout");
    }

    #[test]
    fn test_answer_json_carries_rendered_pair() {
        let answer = NlAnswer {
            origin: AnswerOrigin::AiBackend,
            result: classify(serde_json::json!({
                "answer": "Retention is 91%",
                "sources": [{ "name": "CRM Data", "confidence": 90 }]
            })),
        };
        let value = serde_json::to_value(&answer).unwrap();
        assert_eq!(value["origin"], "ai_backend");
        assert_eq!(value["natural_language"], "Retention is 91%");
        assert_eq!(value["raw_json"]["sources"][0]["name"], "CRM Data");
        assert_eq!(value["result"]["kind"], "structured");

        let local = NlAnswer {
            origin: AnswerOrigin::LocalResponder,
            result: classify(local_answer("Tell me about GenePoint")),
        };
        let value = serde_json::to_value(&local).unwrap();
        assert_eq!(value["raw_json"]["Account_Details"]["Account_Name"], "GenePoint");
        assert_eq!(value["natural_language"], value["result"]["natural_language"]);
    }
}
