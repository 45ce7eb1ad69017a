// Archivo: errors.rs
// Propósito: errores del registro de procedencia y alias Result<T>.
use thiserror::Error;
/// Errores del registro de procedencia.
///
/// - `NotFound`: paso inexistente.
/// - `Storage`: fallo del almacenamiento subyacente.
/// - `Corrupt`: un registro guardado no se pudo interpretar.
/// - `Other`: cualquier otro error.
#[derive(Error, Debug)]
pub enum FlowError {
  #[error("No encontrado: {0}")]
  NotFound(String),
  /// Error genérico de almacenamiento (BD, mutex envenenado, etc.).
  #[error("Error de almacenamiento: {0}")]
  Storage(String),
  #[error("Registro corrupto: {0}")]
  Corrupt(String),
  #[error("Otro: {0}")]
  Other(String),
}
/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, FlowError>;
