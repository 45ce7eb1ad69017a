// errors.rs
use thiserror::Error;

/// Errores de construcción del cliente. Los fallos de llamadas concretas
/// nunca se propagan por aquí: viajan como `ApiResponse::Error`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
  #[error("URL base inválida: {0}")]
  InvalidBaseUrl(String),
  #[error("Configuración inválida: {0}")]
  InvalidConfig(String),
}
