// Archivo: datasets.rs
// Propósito: ciclo de vida de los datasets y consultas de procedencia.

use super::Orchestrator;
use crate::errors::{Outcome, WorkFailure, WorkflowError};
use flow::ProcessStep;
use qcr_client::{ApiResponse, BackendDataset, UploadFile};
use qcr_domain::{disambiguate_display_name, Actor, Dataset};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Paso que produjo un dataset: comando, entrada y parámetros aplicados.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOrigin {
  pub command_id: Uuid,
  pub infile_id: Option<Uuid>,
  pub parameters: JsonValue,
}

impl Orchestrator {
  /// Registra localmente un dataset del backend.
  ///
  /// Nombre y tipo salen del primer fichero; el nombre visible se
  /// desambigua frente a los datasets activos. Con `origin` se añade además
  /// el paso de procedencia. Un dataset ya registrado se devuelve tal cual.
  pub fn save_dataset_metadata(&self,
                               actor: &Actor,
                               remote: &BackendDataset,
                               group_id: Uuid,
                               origin: Option<StepOrigin>)
                               -> Result<Dataset, WorkflowError> {
    if let Some(existing) = self.repos.datasets.find_dataset_by_backend_id(&remote.qcrbox_dataset_id)? {
      log::info!("[{}] dataset {} ya registrado como {}",
                 actor.username,
                 remote.qcrbox_dataset_id,
                 existing.display_filename);
      return Ok(existing);
    }
    let file = remote.first_file().ok_or_else(|| {
                                    WorkflowError::Validation(format!("el dataset {} no contiene ficheros",
                                                                      remote.qcrbox_dataset_id))
                                  })?;

    let taken = self.repos.datasets.active_display_filenames()?;
    let display = disambiguate_display_name(&file.filename, taken.as_slice());
    let dataset = Dataset::new(&remote.qcrbox_dataset_id,
                               &file.filename,
                               display,
                               Some(actor.id),
                               group_id,
                               file.filetype.clone());
    self.repos.datasets.save_dataset(dataset.clone())?;

    if let Some(origin) = origin {
      self.lineage
          .record_step(origin.command_id, origin.infile_id, dataset.id, origin.parameters)?;
    }
    log::info!("[{}] dataset {} registrado como {}",
               actor.username,
               dataset.backend_id,
               dataset.display_filename);
    Ok(dataset)
  }

  /// Recupera el dataset de salida `backend_id` y lo registra.
  pub(crate) fn materialize_output(&self,
                                   actor: &Actor,
                                   backend_id: &str,
                                   group_id: Uuid,
                                   origin: StepOrigin)
                                   -> Result<Outcome<Dataset>, WorkflowError> {
    match self.backend.get_dataset(backend_id) {
      ApiResponse::Success(remote) => Ok(Ok(self.save_dataset_metadata(actor, &remote, group_id, Some(origin))?)),
      ApiResponse::Error(e) => Ok(Err(WorkFailure::Backend(e))),
    }
  }

  /// Sube un fichero nuevo y lo registra sin paso de procedencia.
  pub fn upload_dataset(&self,
                        actor: &Actor,
                        group_id: Uuid,
                        file: &UploadFile)
                        -> Result<Outcome<Dataset>, WorkflowError> {
    if !self.config.accepts_upload(&file.filename) {
      log::warn!("[{}] subida rechazada: {}", actor.username, file.filename);
      let wanted = self.config.upload_extension.as_deref().unwrap_or_default();
      return Ok(Err(WorkFailure::Validation(format!("{} no tiene la extensión {}", file.filename, wanted))));
    }
    match self.backend.upload_dataset(file) {
      ApiResponse::Success(remote) => Ok(Ok(self.save_dataset_metadata(actor, &remote, group_id, None)?)),
      ApiResponse::Error(e) => {
        log::error!("[{}] no se pudo subir {}: {}", actor.username, file.filename, e);
        Ok(Err(WorkFailure::UploadFailed(e)))
      }
    }
  }

  /// Borra el dataset en el backend y lo desactiva localmente.
  ///
  /// Si el borrado falla pero el backend ya no conoce el dataset, se da por
  /// borrado.
  pub fn delete_dataset(&self, actor: &Actor, dataset: &Dataset) -> Result<Outcome<()>, WorkflowError> {
    if let ApiResponse::Error(e) = self.backend.delete_dataset(&dataset.backend_id) {
      match self.backend.get_dataset(&dataset.backend_id) {
        ApiResponse::Error(check) if check.is_not_found() => {
          log::warn!("[{}] {} ya no existía en el backend", actor.username, dataset.display_filename);
        }
        _ => {
          log::error!("[{}] no se pudo borrar {}: {}", actor.username, dataset.display_filename, e);
          return Ok(Err(WorkFailure::Backend(e)));
        }
      }
    }
    self.repos.datasets.set_dataset_active(&dataset.id, false)?;
    log::info!("[{}] dataset {} desactivado", actor.username, dataset.display_filename);
    Ok(Ok(()))
  }

  pub fn download_dataset(&self, actor: &Actor, dataset: &Dataset) -> Outcome<Vec<u8>> {
    log::info!("[{}] descargando {}", actor.username, dataset.display_filename);
    self.backend.download_dataset(&dataset.backend_id).into_result().map_err(WorkFailure::Backend)
  }

  /// Pasos que llevaron a `dataset`, de la raíz al propio dataset.
  pub fn get_file_history(&self, dataset: &Dataset) -> Result<Vec<ProcessStep>, WorkflowError> {
    Ok(self.lineage.file_history(&dataset.id)?)
  }

  /// Pasos que consumieron `dataset` o alguno de sus derivados, en anchura.
  pub fn get_file_descendants(&self, dataset: &Dataset) -> Result<Vec<ProcessStep>, WorkflowError> {
    Ok(self.lineage.file_descendants(&dataset.id)?)
  }
}
