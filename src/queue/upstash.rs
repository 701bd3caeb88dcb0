//! REST-protocol queue store.
//!
//! Speaks the single-endpoint REST dialect of the hosted Redis-compatible
//! store: each command is a JSON array POSTed to the base URL with a
//! bearer token, answered by `{"result": ...}` or `{"error": "..."}`.
//!
//! The claim is one server-side script invocation (`EVAL`), so pop,
//! payload fetch, and payload delete happen in a single atomic round trip.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{QueueStore, RawClaim};
use crate::config::QueueConfig;
use crate::error::{Result, WorkerError};

/// Pops the lowest-scored member of KEYS[1], removes and returns its
/// payload from the hash KEYS[2]. Returns nil when the set is empty.
const CLAIM_SCRIPT: &str = r#"
local popped = redis.call('ZPOPMIN', KEYS[1], 1)
if #popped == 0 then
  return nil
end
local member = popped[1]
local score = popped[2]
local payload = redis.call('HGET', KEYS[2], member)
if payload then
  redis.call('HDEL', KEYS[2], member)
end
return {member, score, payload}
"#;

/// Queue store client over the REST protocol
pub struct UpstashQueueStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
    queue_name: String,
    data_key: String,
}

impl UpstashQueueStore {
    pub fn new(config: &QueueConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| WorkerError::configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.rest_url.trim_end_matches('/').to_string(),
            token: config.rest_token.clone(),
            queue_name: config.queue_name.clone(),
            data_key: config.data_key.clone(),
        })
    }

    /// Execute one command array against the REST endpoint.
    async fn execute(&self, operation: &str, command: Value) -> Result<Value> {
        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.token)
            .json(&command)
            .send()
            .await
            .map_err(|e| WorkerError::transport(operation, e))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| WorkerError::transport(operation, e))?;

        if let Some(error) = body.get("error").and_then(Value::as_str) {
            return Err(WorkerError::queue_store(operation, error));
        }
        if !status.is_success() {
            return Err(WorkerError::queue_store(
                operation,
                format!("HTTP {status}"),
            ));
        }

        Ok(body.get("result").cloned().unwrap_or(Value::Null))
    }

    /// Parse the script reply: nil, or `[member, score, payload|nil]`.
    fn parse_claim_reply(result: Value) -> Result<Option<RawClaim>> {
        let entries = match result {
            Value::Null => return Ok(None),
            Value::Array(entries) if entries.is_empty() => return Ok(None),
            Value::Array(entries) => entries,
            other => {
                return Err(WorkerError::queue_store(
                    "claim",
                    format!("unexpected reply shape: {other}"),
                ))
            }
        };

        let id = entries
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| WorkerError::queue_store("claim", "missing member in reply"))?
            .to_string();

        let priority = match entries.get(1) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or_default(),
            // Scores come back as strings from the REST protocol.
            Some(Value::String(s)) => s.parse::<f64>().map_err(|e| {
                WorkerError::queue_store("claim", format!("unparseable score '{s}': {e}"))
            })?,
            other => {
                return Err(WorkerError::queue_store(
                    "claim",
                    format!("missing score in reply: {other:?}"),
                ))
            }
        };

        let payload = match entries.get(2) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };

        Ok(Some(RawClaim {
            id,
            priority,
            payload,
        }))
    }
}

#[async_trait]
impl QueueStore for UpstashQueueStore {
    async fn claim_lowest(&self) -> Result<Option<RawClaim>> {
        let command = json!([
            "EVAL",
            CLAIM_SCRIPT,
            "2",
            self.queue_name,
            self.data_key
        ]);
        let result = self.execute("claim", command).await?;
        Self::parse_claim_reply(result)
    }

    async fn queue_len(&self) -> Result<u64> {
        let result = self
            .execute("queue_len", json!(["ZCARD", self.queue_name]))
            .await?;
        result
            .as_u64()
            .ok_or_else(|| WorkerError::queue_store("queue_len", format!("non-numeric reply: {result}")))
    }

    async fn ping(&self) -> Result<()> {
        let result = self.execute("ping", json!(["PING"])).await?;
        match result.as_str() {
            Some("PONG") => Ok(()),
            _ => Err(WorkerError::queue_store(
                "ping",
                format!("unexpected reply: {result}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_reply_nil_means_empty() {
        assert_eq!(
            UpstashQueueStore::parse_claim_reply(Value::Null).unwrap(),
            None
        );
        assert_eq!(
            UpstashQueueStore::parse_claim_reply(json!([])).unwrap(),
            None
        );
    }

    #[test]
    fn claim_reply_with_string_score() {
        let claim = UpstashQueueStore::parse_claim_reply(json!(["t-1", "3", "{\"a\":1}"]))
            .unwrap()
            .unwrap();
        assert_eq!(claim.id, "t-1");
        assert_eq!(claim.priority, 3.0);
        assert_eq!(claim.payload.as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn claim_reply_with_numeric_score() {
        let claim = UpstashQueueStore::parse_claim_reply(json!(["t-2", 1.5, Value::Null]))
            .unwrap()
            .unwrap();
        assert_eq!(claim.id, "t-2");
        assert_eq!(claim.priority, 1.5);
        assert_eq!(claim.payload, None);
    }

    #[test]
    fn claim_reply_missing_payload_entry() {
        // Lua nil truncates the reply array after the score.
        let claim = UpstashQueueStore::parse_claim_reply(json!(["t-3", "7"]))
            .unwrap()
            .unwrap();
        assert_eq!(claim.payload, None);
    }

    #[test]
    fn claim_reply_garbage_is_an_error() {
        assert!(UpstashQueueStore::parse_claim_reply(json!("PONG")).is_err());
        assert!(UpstashQueueStore::parse_claim_reply(json!([42, "3"])).is_err());
        assert!(UpstashQueueStore::parse_claim_reply(json!(["t-4", "not-a-score"])).is_err());
    }
}
