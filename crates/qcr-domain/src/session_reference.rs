use crate::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkKind {
  Interactive,
  Calculation,
}

impl WorkKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      WorkKind::Interactive => "interactive",
      WorkKind::Calculation => "calculation",
    }
  }
}

impl FromStr for WorkKind {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "interactive" => Ok(WorkKind::Interactive),
      "calculation" => Ok(WorkKind::Calculation),
      other => Err(DomainError::SerializationError(format!("tipo de trabajo desconocido: {}", other))),
    }
  }
}

/// Registro local de trabajo pendiente en el backend (sesión o cálculo).
///
/// Es una caché: se crea al arrancar el trabajo y se borra al cerrarlo,
/// cancelarlo, encontrarlo obsoleto o completarlo. Guarda el dataset de
/// entrada y los argumentos enviados para poder registrar el paso de
/// procedencia sin el formulario original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReference {
  pub id: Uuid,
  pub user_id: Uuid,
  pub command_id: Uuid,
  pub application_id: Uuid,
  /// Identificador asignado por el backend.
  pub session_id: String,
  pub kind: WorkKind,
  pub dataset_id: Option<Uuid>,
  pub parameters: JsonValue,
  pub start_time: DateTime<Utc>,
}

impl SessionReference {
  pub fn new(user_id: Uuid,
             command_id: Uuid,
             application_id: Uuid,
             session_id: impl Into<String>,
             kind: WorkKind,
             dataset_id: Option<Uuid>,
             parameters: JsonValue)
             -> Self {
    Self { id: Uuid::new_v4(),
           user_id,
           command_id,
           application_id,
           session_id: session_id.into(),
           kind,
           dataset_id,
           parameters,
           start_time: Utc::now() }
  }
}
