use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("invalid identifier '{0}'")]
    InvalidId(String),
    #[error("unknown channel kind '{0}'")]
    UnknownChannelKind(String),
}
