// Archivo: domain.rs
// Propósito: la arista de procedencia `ProcessStep`.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Arista de procedencia: `outfile_id` se obtuvo aplicando `command_id` a
/// `infile_id` con `parameters`.
///
/// `infile_id` puede faltar (registro importado o entrada borrada); en ese
/// caso el historial se corta en este paso.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessStep {
    pub id: Uuid,
    pub command_id: Uuid,
    pub infile_id: Option<Uuid>,
    pub outfile_id: Uuid,
    /// Instantánea de los argumentos efectivamente enviados.
    pub parameters: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl ProcessStep {
    pub fn new(command_id: Uuid, infile_id: Option<Uuid>, outfile_id: Uuid, parameters: JsonValue) -> Self {
        Self { id: Uuid::new_v4(),
               command_id,
               infile_id,
               outfile_id,
               parameters,
               created_at: Utc::now() }
    }
}
