// Archivo: orchestrator.rs
// Propósito: punto de entrada de las peticiones de trabajo.
//
// Cada petición recibe el actor y su referencia de navegador, habla con el
// backend de forma bloqueante y devuelve un `WorkStatus`. Los fallos
// esperados viajan dentro del estado; sólo los problemas de almacenamiento
// o de catálogo se devuelven como `Err`.

use super::{work_key, Repositories};
use crate::config::WorkflowConfig;
use crate::directory::{DirectorySync, SyncReport};
use crate::errors::{WorkFailure, WorkflowError};
use crate::status::WorkStatus;
use crate::step::{FormValues, ParameterBinder, RequestContext};
use flow::{FlowEngine, StepRepository};
use qcr_client::{BackendClient, CommandInvocation};
use qcr_domain::{Application, Command, Dataset};
use std::sync::Arc;

pub struct Orchestrator {
  pub(crate) backend: Arc<dyn BackendClient>,
  pub(crate) repos: Repositories,
  pub(crate) lineage: FlowEngine<dyn StepRepository>,
  pub(crate) config: WorkflowConfig,
}

impl Orchestrator {
  pub fn new(backend: Arc<dyn BackendClient>, repos: Repositories, config: WorkflowConfig) -> Self {
    let lineage = FlowEngine::new(repos.steps.clone());
    Self { backend,
           repos,
           lineage,
           config }
  }

  pub fn config(&self) -> &WorkflowConfig {
    &self.config
  }

  pub fn repositories(&self) -> &Repositories {
    &self.repos
  }

  pub fn lineage(&self) -> &FlowEngine<dyn StepRepository> {
    &self.lineage
  }

  /// Sincroniza el catálogo local con el del backend. Quien llama debe
  /// evitarlo mientras haya un envío de comando en curso.
  pub fn update_apps(&self) -> Result<Option<SyncReport>, WorkflowError> {
    DirectorySync::new(self.backend.as_ref(), self.repos.catalog.as_ref()).run()
  }

  /// Ejecuta `command` sobre `dataset` con los valores del formulario.
  ///
  /// Un comando interactivo abre una sesión (con el protocolo de contención
  /// si la aplicación está ocupada); uno por lotes lanza un cálculo y lo
  /// consulta una vez. Si el formulario trae la acción de terminar, se
  /// cierra la sesión abierta.
  pub fn handle_command(&self,
                        ctx: &mut RequestContext<'_>,
                        command: &Command,
                        dataset: &Dataset,
                        form: &FormValues)
                        -> Result<WorkStatus, WorkflowError> {
    if form.is_end_session() {
      return self.close_session(ctx, command, dataset);
    }

    let application = self.application_of(command)?;
    let key = work_key(&application, command, dataset);
    if !application.active {
      log::warn!("[{}] {}: la aplicación está inactiva", ctx.actor.username, key);
      return Ok(WorkStatus::failed(WorkFailure::InactiveApplication(application.name)));
    }

    let binder = ParameterBinder::new(self.backend.as_ref(), self.repos.datasets.as_ref(), &self.lineage);
    let arguments = match binder.bind(command, dataset, form)? {
      Ok(arguments) => arguments,
      Err(failure) => {
        log::warn!("[{}] {}: {}", ctx.actor.username, key, failure);
        return Ok(WorkStatus::failed(failure));
      }
    };

    let invocation = CommandInvocation { application_slug: application.slug.clone(),
                                         application_version: application.version.clone(),
                                         command_name: command.name.clone(),
                                         arguments };
    log::info!("[{}] {}: lanzando", ctx.actor.username, key);
    if command.interactive {
      self.start_session(ctx, &application, command, dataset, &invocation)
    } else {
      self.start_calculation(ctx, &application, command, dataset, &invocation)
    }
  }

  pub(crate) fn application_of(&self, command: &Command) -> Result<Application, WorkflowError> {
    self.repos
        .catalog
        .get_application(&command.application_id)?
        .ok_or_else(|| WorkflowError::NotFound(format!("aplicación {} del comando {}", command.application_id, command.name)))
  }

  /// Borra las referencias locales de `backend_id` y lo olvida en el
  /// navegador.
  pub(crate) fn settle(&self, ctx: &mut RequestContext<'_>, backend_id: &str) -> Result<(), WorkflowError> {
    let removed = self.repos.sessions.delete_references_by_session_id(backend_id)?;
    ctx.cookie.forget(backend_id);
    log::debug!("[{}] {} referencias de {} eliminadas", ctx.actor.username, removed, backend_id);
    Ok(())
  }
}
