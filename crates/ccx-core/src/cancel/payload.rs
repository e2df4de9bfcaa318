use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use ccx_model::Strategy;

use crate::error::GateError;

/// Single JSON patch (RFC 6902) operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,
}

/// Serialized patch moving a run to the status requested by one strategy.
///
/// Cloning shares the underlying bytes.
#[derive(Clone, Debug)]
pub struct TransitionPayload {
    strategy: Strategy,
    bytes: Arc<[u8]>,
}

impl TransitionPayload {
    fn build(strategy: Strategy) -> Result<Self, GateError> {
        let ops = [PatchOperation {
            op: "add".to_string(),
            path: "/spec/status".to_string(),
            value: Value::String(strategy.target_status().as_str().to_string()),
        }];

        let bytes = serde_json::to_vec(&ops).map_err(|e| {
            GateError::Payload(format!("failed to marshal {strategy} patch: {e}"))
        })?;
        Ok(Self {
            strategy,
            bytes: bytes.into(),
        })
    }

    /// Strategy this payload implements.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Raw JSON patch document.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// The three transition payloads, built once at startup.
#[derive(Clone, Debug)]
pub struct TransitionPayloads {
    cancel: TransitionPayload,
    gracefully_cancel: TransitionPayload,
    gracefully_stop: TransitionPayload,
}

impl TransitionPayloads {
    /// Serialize every payload. Fails only if serialization itself fails.
    pub fn new() -> Result<Self, GateError> {
        Ok(Self {
            cancel: TransitionPayload::build(Strategy::Cancel)?,
            gracefully_cancel: TransitionPayload::build(Strategy::GracefullyCancel)?,
            gracefully_stop: TransitionPayload::build(Strategy::GracefullyStop)?,
        })
    }

    /// Payload for `strategy`.
    pub fn get(&self, strategy: Strategy) -> &TransitionPayload {
        match strategy {
            Strategy::Cancel => &self.cancel,
            Strategy::GracefullyCancel => &self.gracefully_cancel,
            Strategy::GracefullyStop => &self.gracefully_stop,
        }
    }
}
