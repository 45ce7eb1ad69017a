use qcr_client::ApiError;
use thiserror::Error;
use uuid::Uuid;

// Errores inesperados del orquestador.
//
// Fallos de almacenamiento, filas de catálogo ausentes o registros corruptos.
// Los fallos esperados (backend caído, aplicación ocupada, parámetros
// inválidos...) no usan este tipo: viajan como `WorkFailure` dentro de un
// `WorkStatus`.
#[derive(Error, Debug)]
pub enum WorkflowError {
  /// Errores del registro de procedencia.
  #[error("Error de flujo: {0}")]
  Flow(#[from] flow::FlowError),

  /// Errores de los repositorios del dominio.
  #[error("Error de dominio: {0}")]
  Domain(#[from] qcr_domain::DomainError),

  #[error("Error de serializacion: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("No encontrado: {0}")]
  NotFound(String),

  /// Datos del backend con una forma que no se puede materializar.
  #[error("Error de validacion: {0}")]
  Validation(String),
}

/// Fallo esperado de una unidad de trabajo. Se informa al usuario y nunca se
/// propaga como `Err`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkFailure {
  #[error("Error del backend {0}")]
  Backend(ApiError),

  /// La aplicación sigue ocupada y no se pudo liberar.
  #[error("Aplicación ocupada: {0}")]
  ResourceBusy(ApiError),

  #[error("La aplicación está en uso por otro usuario ({owner})")]
  CrossUserConflict { owner: Uuid },

  #[error("La sesión expiró: no hay referencia de sesión en el navegador")]
  MissingBrowserReference,

  #[error("Parámetros inválidos: {0}")]
  Validation(String),

  #[error("Fallo al subir un fichero auxiliar: {0}")]
  UploadFailed(ApiError),

  #[error("El cálculo terminó con error")]
  CalculationFailed,

  #[error("La aplicación {0} no está activa")]
  InactiveApplication(String),
}

/// Resultado de una operación cuyo fallo es esperado.
pub type Outcome<T> = std::result::Result<T, WorkFailure>;
