// application.rs
use crate::ValidationRule;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;
use uuid::Uuid;

/// Aplicación externa expuesta por el backend. Su identidad es
/// `(name, version)`; sólo la sincronización del catálogo la crea, reactiva o
/// desactiva.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
  pub id: Uuid,
  pub name: String,
  pub version: String,
  pub slug: String,
  pub url: Option<String>,
  pub description: Option<String>,
  pub port: Option<i32>,
  pub active: bool,
}

impl Application {
  pub fn new(name: impl Into<String>, version: impl Into<String>, slug: impl Into<String>) -> Self {
    Self { id: Uuid::new_v4(),
           name: name.into(),
           version: version.into(),
           slug: slug.into(),
           url: None,
           description: None,
           port: None,
           active: true }
  }

  pub fn key(&self) -> (&str, &str) {
    (&self.name, &self.version)
  }
}

/// Operación de una aplicación. `interactive` decide si abre una sesión o
/// lanza un cálculo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
  pub id: Uuid,
  pub application_id: Uuid,
  pub name: String,
  pub description: Option<String>,
  pub interactive: bool,
  /// En el orden declarado por el backend.
  pub parameters: Vec<ParameterSpec>,
}

impl Command {
  pub fn new(application_id: Uuid, name: impl Into<String>, interactive: bool, parameters: Vec<ParameterSpec>) -> Self {
    Self { id: Uuid::new_v4(),
           application_id,
           name: name.into(),
           description: None,
           interactive,
           parameters }
  }

  pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
    self.parameters.iter().find(|p| p.name == name)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
  pub name: String,
  /// Tipo tal como lo declara el backend (por ejemplo `QCrBox.data_file`).
  pub dtype: String,
  pub description: Option<String>,
  pub required: bool,
  pub default: Option<JsonValue>,
  pub validation: Option<ValidationRule>,
}

impl ParameterSpec {
  pub fn new(name: impl Into<String>, dtype: impl Into<String>, required: bool) -> Self {
    Self { name: name.into(),
           dtype: dtype.into(),
           description: None,
           required,
           default: None,
           validation: None }
  }

  pub fn with_default(mut self, default: JsonValue) -> Self {
    self.default = Some(default);
    self
  }

  pub fn with_validation(mut self, rule: ValidationRule) -> Self {
    self.validation = Some(rule);
    self
  }

  pub fn kind(&self) -> ParamKind {
    // FromStr de ParamKind nunca falla
    self.dtype.parse().unwrap_or(ParamKind::String)
  }
}

/// Clase de parámetro derivada del `dtype` declarado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
  String,
  Number,
  Integer,
  Boolean,
  /// Referencia a un fichero de un dataset local.
  DatasetReference,
  /// Fichero auxiliar que se sube junto a la petición.
  AuxiliaryUpload,
  /// Ruta de salida; se limpia de separadores.
  OutputPath,
}

impl FromStr for ParamKind {
  type Err = std::convert::Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let lower = s.trim().to_ascii_lowercase();
    let tail = lower.rsplit('.').next().unwrap_or(lower.as_str());
    Ok(match tail {
      _ if lower.contains("upload") => ParamKind::AuxiliaryUpload,
      _ if lower.contains("output_path") || tail == "path" => ParamKind::OutputPath,
      _ if lower.contains("data_file") || tail == "dataset" => ParamKind::DatasetReference,
      "bool" | "boolean" => ParamKind::Boolean,
      "int" | "integer" => ParamKind::Integer,
      "float" | "number" | "double" => ParamKind::Number,
      // str, string y cualquier tipo desconocido se tratan como texto
      _ => ParamKind::String,
    })
  }
}
