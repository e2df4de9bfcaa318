//! Cancellation fan-out.
//!
//! The transition written to each conflicting run depends only on the strategy,
//! so the three patch documents are serialized once ([`TransitionPayloads::new`])
//! and shared by every reconcile pass.
mod payload;
pub use payload::{PatchOperation, TransitionPayload, TransitionPayloads};

mod executor;
pub use executor::CancelExecutor;
