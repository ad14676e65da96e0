use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use metrics::counter;
use serde_json::json;
use uuid::Uuid;

use crate::chain::SwapReceipt;
use crate::db::RuleStore;
use crate::models::{address_key, ExecutionKey, RuleEventType};

const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Best-effort audit trail. Write failures and slow writes are logged and
/// dropped; they never reach the trading pipeline.
#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn RuleStore>,
    write_timeout: Duration,
}

impl AuditLog {
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self {
            store,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub async fn record(&self, rule_id: Uuid, event_type: RuleEventType, details: serde_json::Value) {
        let write = self.store.append_rule_event(rule_id, event_type, details);

        match tokio::time::timeout(self.write_timeout, write).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                counter!("audit_write_failures_total").increment(1);
                tracing::warn!(rule_id = %rule_id, event = %event_type, error = %e, "Audit write failed");
            }
            Err(_) => {
                counter!("audit_write_failures_total").increment(1);
                tracing::warn!(rule_id = %rule_id, event = %event_type, "Audit write timed out");
            }
        }
    }

    pub async fn executed(
        &self,
        rule_id: Uuid,
        token_in: &Address,
        token_out: &Address,
        amount: &str,
        receipt: &SwapReceipt,
        key: &ExecutionKey,
    ) {
        let details = json!({
            "tokenIn": address_key(token_in),
            "tokenOut": address_key(token_out),
            "amount": amount,
            "result": receipt.raw,
            "txHash": receipt.tx_hash,
            "idempotencyKey": key.to_string(),
        });
        self.record(rule_id, RuleEventType::Executed, details).await;
    }

    pub async fn failed(&self, rule_id: Uuid, token_in: &Address, error: &str) {
        let details = json!({
            "tokenIn": address_key(token_in),
            "error": error,
        });
        self.record(rule_id, RuleEventType::Failed, details).await;
    }
}
