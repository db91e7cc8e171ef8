use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StagsError {
  #[error("ValidationError: {0}")]
  Validation(ValidationError),
  #[error("document {0} not found")]
  NotFound(i32),
  #[error("user {uid} does not own document {id}")]
  NotOwner { id: i32, uid: i32 },
  #[error("not logged in")]
  Unauthenticated,
  #[error("bad request: {0}")]
  BadRequest(String),
  #[error("DieselError: {0}")]
  DieselError(#[from] diesel::result::Error),
  #[error("PoolError: {0}")]
  PoolError(String),
  #[error("MigrationError: {0}")]
  MigrationError(String),
  #[error("AuthError: {0}")]
  AuthError(String),
  #[error("HttpError: {0}")]
  HttpError(#[from] reqwest::Error),
  #[error("ConfigError: {0}")]
  ConfigError(#[from] config::ConfigError),
  #[error("IO error: {0}")]
  IoError(#[from] io::Error),
  #[error("Error: {0}")]
  Other(String),
}

impl StagsError {
  /// Errors caused by the caller's input rather than by storage or the environment.
  pub fn is_rejection(&self) -> bool {
    matches!(
      self,
      StagsError::Validation(_)
        | StagsError::NotFound(_)
        | StagsError::NotOwner { .. }
        | StagsError::Unauthenticated
        | StagsError::BadRequest(_)
    )
  }
}

impl From<ValidationError> for StagsError {
  fn from(err: ValidationError) -> StagsError {
    StagsError::Validation(err)
  }
}

impl From<diesel_async::pooled_connection::deadpool::PoolError> for StagsError {
  fn from(err: diesel_async::pooled_connection::deadpool::PoolError) -> StagsError {
    StagsError::PoolError(err.to_string())
  }
}

impl From<serde_json::error::Error> for StagsError {
  fn from(err: serde_json::error::Error) -> StagsError {
    StagsError::Other(err.to_string())
  }
}

impl From<String> for StagsError {
  fn from(message: String) -> Self {
    StagsError::Other(message)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("unrecognized document type '{0}'")]
  UnknownType(String),
  #[error("at least one tag is required")]
  NoTags,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejections_are_told_apart_from_failures() {
    assert!(StagsError::NotFound(3).is_rejection());
    assert!(StagsError::from(ValidationError::NoTags).is_rejection());
    assert!(!StagsError::PoolError("timed out".into()).is_rejection());
    assert!(!StagsError::from(diesel::result::Error::NotFound).is_rejection());
  }

  #[test]
  fn validation_messages_name_the_offending_value() {
    let err = StagsError::from(ValidationError::UnknownType("badtype".into()));
    assert_eq!(err.to_string(), "ValidationError: unrecognized document type 'badtype'");
    assert_eq!(ValidationError::NoTags.to_string(), "at least one tag is required");
  }
}
