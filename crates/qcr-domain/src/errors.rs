// error.rs
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
  #[error("Error de validación: {0}")]
  ValidationError(String),
  #[error("Error de almacenamiento: {0}")]
  StorageError(String),
  #[error("Error de serialización: {0}")]
  SerializationError(String),
  #[error("No encontrado: {0}")]
  NotFound(String),
}

impl From<serde_json::Error> for DomainError {
  fn from(e: serde_json::Error) -> Self {
    Self::SerializationError(e.to_string())
  }
}

impl From<uuid::Error> for DomainError {
  fn from(e: uuid::Error) -> Self {
    Self::SerializationError(format!("uuid: {}", e))
  }
}
