//! Well-known label keys.
//!
//! The reconciler and the admission layer communicate only through labels on the run,
//! so both sides must agree on these keys.

/// Label recording that concurrency controls were already evaluated for a run.
///
/// Once a run carries this label, reconciling it again is a no-op.
pub const LABEL_CONCURRENCY_APPLIED: &str = "ccx.dev/concurrency";

/// Label placed by the admission layer when *it* put the run on hold.
///
/// A run that was created pending by its author does not carry it and stays pending
/// after concurrency controls are applied.
pub const LABEL_START_ON_ADMISSION: &str = "ccx.dev/start-on-admission";
