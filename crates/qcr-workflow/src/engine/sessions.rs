// Archivo: sessions.rs
// Propósito: apertura y cierre de sesiones interactivas y el protocolo de
// contención cuando la aplicación está ocupada.

use super::{work_key, Orchestrator, StepOrigin};
use crate::errors::{WorkFailure, WorkflowError};
use crate::status::{MessageLevel, WorkStatus};
use crate::step::RequestContext;
use qcr_client::{ApiError, ApiResponse, CommandInvocation, RunStatus, SessionStarted};
use qcr_domain::{Application, Command, Dataset, SessionReference, WorkKind};
use serde_json::Value as JsonValue;

impl Orchestrator {
  pub(crate) fn start_session(&self,
                              ctx: &mut RequestContext<'_>,
                              application: &Application,
                              command: &Command,
                              dataset: &Dataset,
                              invocation: &CommandInvocation)
                              -> Result<WorkStatus, WorkflowError> {
    let key = work_key(application, command, dataset);
    let busy = match self.backend.create_interactive_session(invocation) {
      ApiResponse::Success(started) => {
        return self.session_opened(ctx, application, command, dataset, invocation, started);
      }
      ApiResponse::Error(e) if e.is_resource_busy() => e,
      ApiResponse::Error(e) => {
        log::error!("[{}] {}: no se pudo abrir la sesión: {}", ctx.actor.username, key, e);
        return Ok(WorkStatus::failed(WorkFailure::Backend(e)));
      }
    };

    log::warn!("[{}] {}: aplicación ocupada ({})", ctx.actor.username, key, busy);
    if let Some(failure) = self.release_application(ctx, application, busy, &key)? {
      return Ok(WorkStatus::failed(failure));
    }

    // un único reintento
    match self.backend.create_interactive_session(invocation) {
      ApiResponse::Success(started) => self.session_opened(ctx, application, command, dataset, invocation, started),
      ApiResponse::Error(e) => {
        log::error!("[{}] {}: el reintento falló: {}", ctx.actor.username, key, e);
        let failure = if e.is_resource_busy() {
          WorkFailure::ResourceBusy(e)
        } else {
          WorkFailure::Backend(e)
        };
        Ok(WorkStatus::failed(failure))
      }
    }
  }

  /// Intenta liberar la aplicación antes del reintento. Devuelve el fallo
  /// que impide reintentar, o `None` si se puede reintentar.
  ///
  /// Basta una referencia de otro usuario para no cerrar nada; si todas son
  /// propias se cierran todas.
  fn release_application(&self,
                         ctx: &mut RequestContext<'_>,
                         application: &Application,
                         busy: ApiError,
                         key: &str)
                         -> Result<Option<WorkFailure>, WorkflowError> {
    let existing = self.repos.sessions.references_for_application(&application.id)?;
    if let Some(foreign) = existing.iter().find(|r| r.user_id != ctx.actor.id) {
      log::warn!("[{}] {}: en uso por el usuario {}", ctx.actor.username, key, foreign.user_id);
      return Ok(Some(WorkFailure::CrossUserConflict { owner: foreign.user_id }));
    }
    let mut targets: Vec<(String, WorkKind)> =
      existing.into_iter().map(|r| (r.session_id, r.kind)).collect();
    if targets.is_empty() {
      targets.extend(ctx.cookie.app_session_id.clone().map(|id| (id, WorkKind::Interactive)));
    }
    if targets.is_empty() {
      log::warn!("[{}] {}: ocupada sin referencia local que cerrar", ctx.actor.username, key);
      return Ok(Some(WorkFailure::ResourceBusy(busy)));
    }

    for (backend_id, kind) in targets {
      let stopped = match kind {
        WorkKind::Interactive => self.backend.close_interactive_session(&backend_id).map(|_| ()),
        WorkKind::Calculation => self.backend.cancel_calculation(&backend_id),
      };
      match stopped {
        ApiResponse::Success(()) => {
          log::info!("[{}] {}: trabajo previo {} cerrado", ctx.actor.username, key, backend_id);
        }
        ApiResponse::Error(e) if e.is_not_found() => {
          log::warn!("[{}] {}: referencia obsoleta {}", ctx.actor.username, key, backend_id);
        }
        ApiResponse::Error(e) => {
          log::error!("[{}] {}: no se pudo cerrar {}: {}", ctx.actor.username, key, backend_id, e);
          return Ok(Some(WorkFailure::Backend(e)));
        }
      }
      self.settle(ctx, &backend_id)?;
    }
    Ok(None)
  }

  fn session_opened(&self,
                    ctx: &mut RequestContext<'_>,
                    application: &Application,
                    command: &Command,
                    dataset: &Dataset,
                    invocation: &CommandInvocation,
                    started: SessionStarted)
                    -> Result<WorkStatus, WorkflowError> {
    let session_id = started.interactive_session_id;
    let reference = SessionReference::new(ctx.actor.id,
                                          command.id,
                                          application.id,
                                          session_id.clone(),
                                          WorkKind::Interactive,
                                          Some(dataset.id),
                                          serde_json::to_value(&invocation.arguments)?);
    self.repos.sessions.save_reference(reference)?;
    ctx.cookie.app_session_id = Some(session_id.clone());
    log::info!("[{}] {}: sesión {} abierta",
               ctx.actor.username,
               work_key(application, command, dataset),
               session_id);

    let text = match application.port {
      Some(port) => format!("Sesión de {} abierta en el puerto {}", application.name, port),
      None => format!("Sesión de {} abierta", application.name),
    };
    Ok(WorkStatus::active().message(MessageLevel::Info, text))
  }

  /// Cierra la sesión interactiva guardada en el navegador.
  ///
  /// Sin referencia de navegador no se intenta nada. Si la sesión produjo
  /// datos se materializan como dataset nuevo con su paso de procedencia.
  pub fn close_session(&self,
                       ctx: &mut RequestContext<'_>,
                       command: &Command,
                       dataset: &Dataset)
                       -> Result<WorkStatus, WorkflowError> {
    let Some(session_id) = ctx.cookie.app_session_id.clone() else {
      log::warn!("[{}] {}::{}: cierre sin sesión en el navegador",
                 ctx.actor.username,
                 command.name,
                 dataset.display_filename);
      return Ok(WorkStatus::failed(WorkFailure::MissingBrowserReference));
    };
    let reference = self.repos.sessions.find_reference_by_session_id(&session_id)?;

    let closed = match self.backend.close_interactive_session(&session_id) {
      ApiResponse::Success(closed) => closed,
      ApiResponse::Error(e) if e.is_not_found() => {
        log::warn!("[{}] sesión {} inexistente en el backend", ctx.actor.username, session_id);
        self.settle(ctx, &session_id)?;
        return Ok(WorkStatus::idle().message(MessageLevel::Warning, "La sesión ya no existía"));
      }
      ApiResponse::Error(e) => {
        log::error!("[{}] no se pudo cerrar la sesión {}: {}", ctx.actor.username, session_id, e);
        return Ok(WorkStatus::failed(WorkFailure::Backend(e)));
      }
    };
    self.settle(ctx, &session_id)?;
    log::info!("[{}] sesión {} cerrada ({:?})", ctx.actor.username, session_id, closed.status);

    let mut status = match closed.output_dataset_id {
      Some(output_id) => {
        let origin = origin_of(reference.as_ref(), command, dataset);
        match self.materialize_output(ctx.actor, &output_id, dataset.group_id, origin)? {
          Ok(created) => WorkStatus::completed(created.id).message(MessageLevel::Success,
                                                                   format!("Se creó {}", created.display_filename)),
          Err(failure) => {
            log::warn!("[{}] salida {} de la sesión {} no recuperada: {}",
                       ctx.actor.username,
                       output_id,
                       session_id,
                       failure);
            WorkStatus::no_output().message(MessageLevel::Warning,
                                            format!("No se pudo recuperar la salida: {}", failure))
          }
        }
      }
      None => WorkStatus::no_output().message(MessageLevel::Info, "La sesión terminó sin producir datos"),
    };
    if closed.status != RunStatus::Successful {
      status = status.message(MessageLevel::Warning, "La sesión se cerró de forma forzada");
    }
    Ok(status)
  }
}

/// Origen del paso de procedencia de una salida: lo guardado en la
/// referencia si la hay, si no el comando y dataset de la petición.
pub(crate) fn origin_of(reference: Option<&SessionReference>, command: &Command, dataset: &Dataset) -> StepOrigin {
  match reference {
    Some(r) => StepOrigin { command_id: r.command_id,
                            infile_id: r.dataset_id.or(Some(dataset.id)),
                            parameters: r.parameters.clone() },
    None => {
      log::warn!("{} sobre {}: sin referencia guardada, el paso se registra sin parámetros",
                 command.name,
                 dataset.display_filename);
      StepOrigin { command_id: command.id,
                   infile_id: Some(dataset.id),
                   parameters: JsonValue::Null }
    }
  }
}
