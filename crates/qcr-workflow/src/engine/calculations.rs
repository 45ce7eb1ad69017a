// Archivo: calculations.rs
// Propósito: lanzar, consultar y cancelar cálculos por lotes.

use super::sessions::origin_of;
use super::{work_key, Orchestrator};
use crate::errors::{WorkFailure, WorkflowError};
use crate::status::{MessageLevel, WorkStatus};
use crate::step::RequestContext;
use qcr_client::{ApiResponse, CommandInvocation, RunStatus};
use qcr_domain::{Application, Command, Dataset, SessionReference, WorkKind};

impl Orchestrator {
  pub(crate) fn start_calculation(&self,
                                  ctx: &mut RequestContext<'_>,
                                  application: &Application,
                                  command: &Command,
                                  dataset: &Dataset,
                                  invocation: &CommandInvocation)
                                  -> Result<WorkStatus, WorkflowError> {
    let key = work_key(application, command, dataset);
    let started = match self.backend.invoke_command(invocation) {
      ApiResponse::Success(started) => started,
      ApiResponse::Error(e) => {
        log::error!("[{}] {}: no se pudo lanzar el cálculo: {}", ctx.actor.username, key, e);
        return Ok(WorkStatus::failed(WorkFailure::Backend(e)));
      }
    };

    let reference = SessionReference::new(ctx.actor.id,
                                          command.id,
                                          application.id,
                                          started.calculation_id.clone(),
                                          WorkKind::Calculation,
                                          Some(dataset.id),
                                          serde_json::to_value(&invocation.arguments)?);
    self.repos.sessions.save_reference(reference)?;
    ctx.cookie.calculation_id = Some(started.calculation_id.clone());
    log::info!("[{}] {}: cálculo {} lanzado", ctx.actor.username, key, started.calculation_id);

    let delay = self.config.calc_initial_delay();
    if !delay.is_zero() {
      std::thread::sleep(delay);
    }
    self.poll_calculation(ctx, dataset, command)
  }

  /// Consulta el cálculo en curso.
  ///
  /// El id sale de la referencia del navegador o, si falta, de la referencia
  /// persistida del usuario para `command`. Un cálculo pendiente no tiene
  /// efectos; uno terminado se liquida y, si produjo datos, se materializa.
  pub fn poll_calculation(&self,
                          ctx: &mut RequestContext<'_>,
                          dataset: &Dataset,
                          command: &Command)
                          -> Result<WorkStatus, WorkflowError> {
    let calculation_id = match ctx.cookie.calculation_id.clone() {
      Some(id) => Some(id),
      None => self.repos
                  .sessions
                  .references_for_user(&ctx.actor.id, WorkKind::Calculation)?
                  .into_iter()
                  .find(|r| r.command_id == command.id)
                  .map(|r| r.session_id),
    };
    let Some(calculation_id) = calculation_id else {
      return Ok(WorkStatus::idle().message(MessageLevel::Info, "No hay cálculos pendientes"));
    };
    let reference = self.repos.sessions.find_reference_by_session_id(&calculation_id)?;

    let calculation = match self.backend.get_calculation(&calculation_id) {
      ApiResponse::Success(calculation) => calculation,
      ApiResponse::Error(e) if e.is_not_found() => {
        log::warn!("[{}] cálculo {} inexistente en el backend", ctx.actor.username, calculation_id);
        self.settle(ctx, &calculation_id)?;
        return Ok(WorkStatus::idle().message(MessageLevel::Warning, "El cálculo ya no existía"));
      }
      ApiResponse::Error(e) => {
        log::error!("[{}] no se pudo consultar el cálculo {}: {}", ctx.actor.username, calculation_id, e);
        return Ok(WorkStatus::failed(WorkFailure::Backend(e)));
      }
    };

    match calculation.status {
      RunStatus::Successful => {}
      RunStatus::Failed => {
        log::warn!("[{}] cálculo {} de {} falló sobre {}",
                   ctx.actor.username,
                   calculation_id,
                   command.name,
                   dataset.display_filename);
        self.settle(ctx, &calculation_id)?;
        return Ok(WorkStatus::failed(WorkFailure::CalculationFailed));
      }
      other => {
        if other == RunStatus::Unknown {
          log::warn!("[{}] estado desconocido para el cálculo {}", ctx.actor.username, calculation_id);
        }
        let text = format!("Cálculo en curso; vuelva a consultar en {} s", self.config.auto_refresh_secs);
        return Ok(WorkStatus::pending().message(MessageLevel::Info, text));
      }
    }

    let Some(output_id) = calculation.output_dataset_id else {
      log::info!("[{}] cálculo {} terminado sin salida", ctx.actor.username, calculation_id);
      self.settle(ctx, &calculation_id)?;
      return Ok(WorkStatus::no_output().message(MessageLevel::Info, "El cálculo terminó sin producir datos"));
    };

    let origin = origin_of(reference.as_ref(), command, dataset);
    match self.materialize_output(ctx.actor, &output_id, dataset.group_id, origin)? {
      Ok(created) => {
        self.settle(ctx, &calculation_id)?;
        log::info!("[{}] cálculo {} materializado como {}",
                   ctx.actor.username,
                   calculation_id,
                   created.display_filename);
        Ok(WorkStatus::completed(created.id).message(MessageLevel::Success,
                                                     format!("Se creó {}", created.display_filename)))
      }
      // la referencia se conserva para reintentar la consulta
      Err(failure) => {
        log::error!("[{}] salida {} del cálculo {} no recuperada: {}",
                    ctx.actor.username,
                    output_id,
                    calculation_id,
                    failure);
        Ok(WorkStatus::failed(failure))
      }
    }
  }

  /// Cancela el cálculo del navegador o, sin él, todos los del usuario. Las
  /// referencias locales se borran aunque el backend no confirme.
  pub fn cancel_calculation(&self, ctx: &mut RequestContext<'_>) -> Result<WorkStatus, WorkflowError> {
    let targets: Vec<String> = match ctx.cookie.calculation_id.clone() {
      Some(id) => vec![id],
      None => self.repos
                  .sessions
                  .references_for_user(&ctx.actor.id, WorkKind::Calculation)?
                  .into_iter()
                  .map(|r| r.session_id)
                  .collect(),
    };
    if targets.is_empty() {
      return Ok(WorkStatus::idle().message(MessageLevel::Info, "No hay cálculos que cancelar"));
    }

    let mut status = WorkStatus::cancelled();
    for calculation_id in targets {
      match self.backend.cancel_calculation(&calculation_id) {
        ApiResponse::Success(()) => {
          log::info!("[{}] cálculo {} cancelado", ctx.actor.username, calculation_id);
        }
        ApiResponse::Error(e) => {
          log::warn!("[{}] el backend no confirmó la cancelación de {}: {}", ctx.actor.username, calculation_id, e);
          status = status.message(MessageLevel::Warning,
                                  format!("El backend no confirmó la cancelación de {}: {}", calculation_id, e));
        }
      }
      self.settle(ctx, &calculation_id)?;
    }
    Ok(status.message(MessageLevel::Info, "Cálculo cancelado"))
  }
}
