// Archivo: admin.rs
// Propósito: operaciones administrativas sobre las referencias de sesión.

use super::Orchestrator;
use crate::errors::{WorkFailure, WorkflowError};
use crate::status::{MessageLevel, WorkStatus};
use qcr_client::{ApiResponse, RunStatus};
use qcr_domain::{Actor, SessionReference, WorkKind};
use uuid::Uuid;

impl Orchestrator {
  /// Referencias abiertas, de la más antigua a la más reciente.
  pub fn list_session_references(&self) -> Result<Vec<SessionReference>, WorkflowError> {
    Ok(self.repos.sessions.list_references()?)
  }

  /// Cierra administrativamente la referencia `reference_id`.
  ///
  /// Si el backend ya no conoce el trabajo o éste terminó, la referencia se
  /// borra sin más; si sigue vivo se cierra o cancela y se borra sólo si el
  /// backend lo confirma.
  pub fn reap_session_reference(&self, actor: &Actor, reference_id: &Uuid) -> Result<WorkStatus, WorkflowError> {
    let Some(reference) = self.repos.sessions.get_reference(reference_id)? else {
      return Ok(WorkStatus::idle().message(MessageLevel::Info, "La referencia ya no existe"));
    };
    let backend_id = reference.session_id.as_str();

    let probe: ApiResponse<RunStatus> = match reference.kind {
      WorkKind::Interactive => self.backend.get_interactive_session(backend_id).map(|s| s.status),
      WorkKind::Calculation => self.backend.get_calculation(backend_id).map(|c| c.status),
    };
    let still_running = match probe {
      ApiResponse::Success(status) => !status.is_finished(),
      ApiResponse::Error(e) if e.is_not_found() => false,
      ApiResponse::Error(e) => {
        log::error!("[{}] no se pudo consultar {} {}: {}", actor.username, reference.kind.as_str(), backend_id, e);
        return Ok(WorkStatus::failed(WorkFailure::Backend(e)));
      }
    };

    if still_running {
      let stopped = match reference.kind {
        WorkKind::Interactive => self.backend.close_interactive_session(backend_id).map(|_| ()),
        WorkKind::Calculation => self.backend.cancel_calculation(backend_id),
      };
      if let ApiResponse::Error(e) = stopped {
        if !e.is_not_found() {
          log::error!("[{}] no se pudo cerrar {} {}: {}", actor.username, reference.kind.as_str(), backend_id, e);
          return Ok(WorkStatus::failed(WorkFailure::Backend(e)));
        }
      }
    }

    self.repos.sessions.delete_reference(&reference.id)?;
    log::info!("[{}] referencia {} ({} {}) eliminada",
               actor.username,
               reference.id,
               reference.kind.as_str(),
               backend_id);
    if still_running {
      Ok(WorkStatus::cancelled().message(MessageLevel::Success, format!("{} cerrado", backend_id)))
    } else {
      Ok(WorkStatus::idle().message(MessageLevel::Info, format!("{} ya había terminado", backend_id)))
    }
  }
}
