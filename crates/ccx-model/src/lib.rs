mod domain;
pub use domain::{LABEL_CONCURRENCY_APPLIED, LABEL_START_ON_ADMISSION};
pub use domain::{Labels, Namespace, RunName, Selector};

mod error;
pub use error::{ModelError, ModelResult};

mod policy;
pub use policy::ConcurrencyPolicy;

mod run;
pub use run::{Run, SpecStatus};

mod strategy;
pub use strategy::{BackoffStrategy, Strategy};
