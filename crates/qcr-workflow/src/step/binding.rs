// Archivo: binding.rs
// Propósito: convertir los valores enviados en un formulario en los
// argumentos de una invocación, en el orden declarado por el comando.
//
// Lo comparten el camino interactivo y el de lotes. Las consultas de
// ficheros y las subidas auxiliares se hacen al final, cuando todo lo demás
// ya validó, de modo que un formulario inválido no llega al backend.

use crate::errors::{Outcome, WorkFailure, WorkflowError};
use flow::{FlowEngine, StepRepository};
use indexmap::IndexMap;
use qcr_client::{ApiError, ApiResponse, BackendClient, UploadFile};
use qcr_domain::{Command, Dataset, DatasetRepository, ParamKind, ParameterSpec};
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;

/// Argumentos listos para enviar, en el orden de los parámetros.
pub type CommandArguments = IndexMap<String, JsonValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
  Text(String),
  Upload(UploadFile),
}

/// Valores enviados por el usuario más la acción "terminar sesión".
#[derive(Debug, Clone, Default)]
pub struct FormValues {
  values: HashMap<String, FormValue>,
  end_session: bool,
}

impl FormValues {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.values.insert(name.into(), FormValue::Text(value.into()));
    self
  }

  pub fn with_upload(mut self, name: impl Into<String>, file: UploadFile) -> Self {
    self.values.insert(name.into(), FormValue::Upload(file));
    self
  }

  /// Marca el envío como la acción de cerrar la sesión interactiva.
  pub fn ending_session(mut self) -> Self {
    self.end_session = true;
    self
  }

  pub fn is_end_session(&self) -> bool {
    self.end_session
  }

  pub fn get(&self, name: &str) -> Option<&FormValue> {
    self.values.get(name)
  }

  /// Texto enviado para `name`, recortado; `None` si falta o está vacío.
  pub fn text(&self, name: &str) -> Option<&str> {
    match self.values.get(name) {
      Some(FormValue::Text(s)) if !s.trim().is_empty() => Some(s.trim()),
      _ => None,
    }
  }
}

/// Sufijo de los ids que ya designan un fichero y no un dataset.
pub const DATA_FILE_ID_SUFFIX: &str = "_df";

/// Forma en que el backend espera una referencia a fichero.
pub fn data_file_argument(id: &str) -> JsonValue {
  json!({ "data_file_id": id })
}

pub struct ParameterBinder<'a> {
  backend: &'a dyn BackendClient,
  datasets: &'a dyn DatasetRepository,
  lineage: &'a FlowEngine<dyn StepRepository>,
}

impl<'a> ParameterBinder<'a> {
  pub fn new(backend: &'a dyn BackendClient,
             datasets: &'a dyn DatasetRepository,
             lineage: &'a FlowEngine<dyn StepRepository>)
             -> Self {
    Self { backend, datasets, lineage }
  }

  /// Liga los parámetros de `command` para ejecutarlo sobre `dataset`.
  ///
  /// El primer parámetro de tipo dataset siempre apunta a `dataset`, se haya
  /// enviado lo que se haya enviado. Los siguientes deben nombrar (por id
  /// local o del backend) un dataset de su ascendencia.
  pub fn bind(&self,
              command: &Command,
              dataset: &Dataset,
              form: &FormValues)
              -> Result<Outcome<CommandArguments>, WorkflowError> {
    let mut arguments = CommandArguments::new();
    let mut uploads: Vec<(&str, &UploadFile)> = Vec::new();
    let mut references: Vec<(&str, Dataset)> = Vec::new();
    let mut primary_bound = false;
    let mut ancestry: Option<Vec<Dataset>> = None;

    for spec in &command.parameters {
      let name = spec.name.as_str();
      match spec.kind() {
        ParamKind::DatasetReference => {
          if !primary_bound {
            primary_bound = true;
            arguments.insert(spec.name.clone(), JsonValue::Null);
            references.push((name, dataset.clone()));
            continue;
          }
          let Some(choice) = form.text(name) else {
            if spec.required {
              return Ok(Err(missing(spec)));
            }
            continue;
          };
          if ancestry.is_none() {
            ancestry = Some(self.ancestor_chain(dataset)?);
          }
          let chain = ancestry.as_deref().unwrap_or(&[]);
          match chain.iter().find(|d| d.id.to_string() == choice || d.backend_id == choice) {
            Some(found) => {
              arguments.insert(spec.name.clone(), JsonValue::Null);
              references.push((name, found.clone()));
            }
            None => {
              return Ok(Err(WorkFailure::Validation(format!("{}: '{}' no pertenece a la ascendencia de {}",
                                                            name, choice, dataset.display_filename))));
            }
          }
        }
        ParamKind::AuxiliaryUpload => match form.get(name) {
          Some(FormValue::Upload(file)) => {
            // hueco reservado para conservar el orden declarado
            arguments.insert(spec.name.clone(), JsonValue::Null);
            uploads.push((name, file));
          }
          _ if spec.required => return Ok(Err(missing(spec))),
          _ => {}
        },
        ParamKind::Boolean => {
          let value = JsonValue::Bool(form.text(name).map(is_truthy).unwrap_or(false));
          if let Err(f) = check_rule(spec, &value) {
            return Ok(Err(f));
          }
          arguments.insert(spec.name.clone(), value);
        }
        kind => match scalar_value(spec, kind, form.text(name)) {
          Ok(Some(value)) => {
            if let Err(f) = check_rule(spec, &value) {
              return Ok(Err(f));
            }
            arguments.insert(spec.name.clone(), value);
          }
          Ok(None) => {}
          Err(f) => return Ok(Err(f)),
        },
      }
    }

    for (name, referenced) in references {
      match self.data_file_id(&referenced) {
        Ok(file_id) => {
          arguments.insert(name.to_string(), data_file_argument(&file_id));
        }
        Err(e) => {
          log::error!("No se pudo resolver el fichero de {} ({}): {}",
                      referenced.display_filename,
                      referenced.backend_id,
                      e);
          return Ok(Err(WorkFailure::Backend(e)));
        }
      }
    }

    for (name, file) in uploads {
      match self.backend.append_to_dataset(&dataset.backend_id, file) {
        ApiResponse::Success(updated) => match updated.file_named(&file.filename) {
          Some(data_file) => {
            arguments.insert(name.to_string(), data_file_argument(&data_file.qcrbox_file_id));
          }
          None => {
            let err = ApiError::malformed(format!("el dataset {} no contiene {}", dataset.backend_id, file.filename));
            return Ok(Err(WorkFailure::UploadFailed(err)));
          }
        },
        ApiResponse::Error(e) => {
          log::error!("No se pudo añadir {} al dataset {}: {}", file.filename, dataset.backend_id, e);
          return Ok(Err(WorkFailure::UploadFailed(e)));
        }
      }
    }
    Ok(Ok(arguments))
  }

  /// Id en el backend del fichero principal de `dataset`.
  fn data_file_id(&self, dataset: &Dataset) -> Result<String, ApiError> {
    if dataset.backend_id.ends_with(DATA_FILE_ID_SUFFIX) {
      return Ok(dataset.backend_id.clone());
    }
    match self.backend.get_dataset(&dataset.backend_id) {
      ApiResponse::Success(remote) => remote.file_named(&dataset.filename)
                                            .map(|f| f.qcrbox_file_id.clone())
                                            .ok_or_else(|| {
                                              ApiError::malformed(format!("el dataset {} no contiene {}",
                                                                          dataset.backend_id, dataset.filename))
                                            }),
      ApiResponse::Error(e) => Err(e),
    }
  }

  /// El propio dataset seguido de sus ancestros, del más cercano al más
  /// lejano. Los ancestros ya borrados del registro se omiten.
  fn ancestor_chain(&self, dataset: &Dataset) -> Result<Vec<Dataset>, WorkflowError> {
    let mut chain = vec![dataset.clone()];
    for id in self.lineage.ancestor_ids(&dataset.id)? {
      if let Some(found) = self.datasets.get_dataset(&id)? {
        chain.push(found);
      }
    }
    Ok(chain)
  }
}

fn is_truthy(raw: &str) -> bool {
  matches!(raw.to_ascii_lowercase().as_str(), "on" | "true" | "1" | "yes")
}

fn missing(spec: &ParameterSpec) -> WorkFailure {
  WorkFailure::Validation(format!("{}: parámetro obligatorio sin valor", spec.name))
}

fn invalid(spec: &ParameterSpec, raw: &str) -> WorkFailure {
  WorkFailure::Validation(format!("{}: '{}' no es un valor válido de tipo {}", spec.name, raw, spec.dtype))
}

fn check_rule(spec: &ParameterSpec, value: &JsonValue) -> Outcome<()> {
  match &spec.validation {
    Some(rule) => rule.check(value)
                      .map_err(|e| WorkFailure::Validation(format!("{}: {}", spec.name, e))),
    None => Ok(()),
  }
}

/// Quita los separadores de ruta.
fn sanitize_path(raw: &str) -> String {
  raw.chars().filter(|c| *c != '/' && *c != '\\').collect()
}

fn scalar_value(spec: &ParameterSpec, kind: ParamKind, raw: Option<&str>) -> Outcome<Option<JsonValue>> {
  let Some(raw) = raw else {
    return match &spec.default {
      Some(JsonValue::String(s)) if kind == ParamKind::OutputPath => Ok(Some(JsonValue::String(sanitize_path(s)))),
      Some(default) => Ok(Some(default.clone())),
      None if spec.required => Err(missing(spec)),
      None => Ok(None),
    };
  };
  match kind {
    ParamKind::Integer => raw.parse::<i64>().map(|v| Some(json!(v))).map_err(|_| invalid(spec, raw)),
    ParamKind::Number => raw.parse::<f64>()
                            .ok()
                            .and_then(serde_json::Number::from_f64)
                            .map(|n| Some(JsonValue::Number(n)))
                            .ok_or_else(|| invalid(spec, raw)),
    ParamKind::OutputPath => Ok(Some(JsonValue::String(sanitize_path(raw)))),
    _ => Ok(Some(JsonValue::String(raw.to_string()))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn truthy_values() {
    for raw in ["on", "TRUE", "1", "yes"] {
      assert!(is_truthy(raw), "{}", raw);
    }
    for raw in ["off", "false", "0", "no", "maybe"] {
      assert!(!is_truthy(raw), "{}", raw);
    }
  }

  #[test]
  fn path_separators_are_removed() {
    assert_eq!(sanitize_path("../out/dir\\file.cif"), "..outdirfile.cif");
  }

  #[test]
  fn scalars_parse_by_kind() {
    let spec = ParameterSpec::new("n", "int", true);
    assert_eq!(scalar_value(&spec, ParamKind::Integer, Some("7")), Ok(Some(json!(7))));
    assert!(scalar_value(&spec, ParamKind::Integer, Some("7.5")).is_err());
    assert!(scalar_value(&spec, ParamKind::Integer, None).is_err());
    let optional = ParameterSpec::new("x", "float", false).with_default(json!(0.5));
    assert_eq!(scalar_value(&optional, ParamKind::Number, None), Ok(Some(json!(0.5))));
  }
}
