mod labels;
pub use labels::Labels;

mod selector;
pub use selector::Selector;

mod constants;
pub use constants::{LABEL_CONCURRENCY_APPLIED, LABEL_START_ON_ADMISSION};

/// Namespace a run or a policy lives in.
///
/// Policies only ever apply to runs of their own namespace.
pub type Namespace = String;

/// Name of a run, unique within its namespace.
pub type RunName = String;
