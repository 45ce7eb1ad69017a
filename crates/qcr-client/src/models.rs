// Archivo: models.rs
// Propósito: modelos tipados de las cargas que intercambia el backend.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Estado de una sesión interactiva o de un cálculo en el backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
  Submitted,
  Running,
  Successful,
  Failed,
  #[serde(other)]
  Unknown,
}

impl RunStatus {
  /// Terminado con éxito o con fallo.
  pub fn is_finished(&self) -> bool {
    matches!(self, RunStatus::Successful | RunStatus::Failed)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDataFile {
  pub qcrbox_file_id: String,
  pub filename: String,
  #[serde(default)]
  pub filetype: Option<String>,
}

/// Dataset remoto. Los ficheros se conservan en el orden en que los devuelve
/// el backend; el primero es el fichero principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDataset {
  pub qcrbox_dataset_id: String,
  #[serde(default)]
  pub data_files: IndexMap<String, BackendDataFile>,
}

impl BackendDataset {
  pub fn first_file(&self) -> Option<&BackendDataFile> {
    self.data_files.values().next()
  }

  pub fn file_named(&self, filename: &str) -> Option<&BackendDataFile> {
    self.data_files
        .get(filename)
        .or_else(|| self.data_files.values().find(|f| f.filename == filename))
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendParameter {
  pub name: String,
  pub dtype: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub required: bool,
  #[serde(default)]
  pub default_value: Option<JsonValue>,
  #[serde(default)]
  pub choices: Option<Vec<JsonValue>>,
  #[serde(default)]
  pub min_value: Option<f64>,
  #[serde(default)]
  pub max_value: Option<f64>,
  #[serde(default)]
  pub regex: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendCommand {
  pub name: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub interactive: bool,
  #[serde(default)]
  pub parameters: Vec<BackendParameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendApplication {
  pub name: String,
  pub slug: String,
  pub version: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub url: Option<String>,
  #[serde(default)]
  pub gui_port: Option<i32>,
  #[serde(default)]
  pub commands: Vec<BackendCommand>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSession {
  pub interactive_session_id: String,
  pub status: RunStatus,
  #[serde(default)]
  pub output_dataset_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCalculation {
  pub calculation_id: String,
  pub status: RunStatus,
  #[serde(default)]
  pub output_dataset_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStarted {
  pub interactive_session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationStarted {
  pub calculation_id: String,
}

/// Petición de ejecución: identifica la aplicación por slug y versión y
/// transporta los argumentos ya ligados, en orden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandInvocation {
  pub application_slug: String,
  pub application_version: String,
  pub command_name: String,
  pub arguments: IndexMap<String, JsonValue>,
}

/// Fichero enviado al backend.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
  pub filename: String,
  pub content: Vec<u8>,
}

impl UploadFile {
  pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
    Self { filename: filename.into(), content: content.into() }
  }
}

// El contenido puede ser grande; sólo se muestra su tamaño.
impl std::fmt::Debug for UploadFile {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("UploadFile")
     .field("filename", &self.filename)
     .field("bytes", &self.content.len())
     .finish()
  }
}
