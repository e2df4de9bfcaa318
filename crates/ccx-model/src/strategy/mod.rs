mod concurrency;
pub use concurrency::Strategy;

mod backoff;
pub use backoff::BackoffStrategy;
