use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown concurrency strategy: {0}")]
    UnknownStrategy(String),

    #[error("unknown run spec status: {0}")]
    UnknownSpecStatus(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
