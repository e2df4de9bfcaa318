//! Prometheus backend for ccx reconcile metrics.
//!
//! [`PrometheusMetrics`] implements [`ccx_core::MetricsBackend`]; hand it to the reconciler
//! as a metrics handle and expose [`PrometheusMetrics::gather`] however the host process
//! serves metrics.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use ccx_core::{MemoryStore, Reconciler, GateConfig, TransitionPayloads};
//! use ccx_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let store = Arc::new(MemoryStore::new());
//! let payloads = Arc::new(TransitionPayloads::new()?);
//!
//! let reconciler = Reconciler::new(store.clone(), store, payloads, GateConfig::default())
//!     .with_metrics(Arc::new(metrics.clone()));
//! # let _ = reconciler;
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `ccx_reconciles_total{outcome}` - Counter
//! - `ccx_reconcile_duration_seconds{outcome}` - Histogram
//! - `ccx_cancellations_total{strategy, outcome}` - Counter
mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
