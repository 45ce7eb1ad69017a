// Archivo: directory.rs
// Propósito: conciliar el espejo local de aplicaciones, comandos y
// parámetros con el catálogo del backend, por clave (nombre, versión).

use crate::errors::WorkflowError;
use qcr_client::{ApiResponse, BackendApplication, BackendClient, BackendParameter};
use qcr_domain::{Application, CatalogRepository, Command, ParameterSpec, ValidationRule};
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

/// Ids locales afectados por una sincronización.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
  pub new_apps: Vec<Uuid>,
  pub reactivated_apps: Vec<Uuid>,
  pub deactivated_apps: Vec<Uuid>,
  pub updated_ports: Vec<Uuid>,
}

impl SyncReport {
  /// Número de aplicaciones escritas. Una reactivación con puerto nuevo es
  /// una sola escritura.
  pub fn writes(&self) -> usize {
    let mut written: HashSet<&Uuid> = HashSet::new();
    written.extend(&self.new_apps);
    written.extend(&self.reactivated_apps);
    written.extend(&self.deactivated_apps);
    written.extend(&self.updated_ports);
    written.len()
  }

  pub fn is_empty(&self) -> bool {
    self.writes() == 0
  }
}

pub struct DirectorySync<'a> {
  backend: &'a dyn BackendClient,
  catalog: &'a dyn CatalogRepository,
}

impl<'a> DirectorySync<'a> {
  pub fn new(backend: &'a dyn BackendClient, catalog: &'a dyn CatalogRepository) -> Self {
    Self { backend, catalog }
  }

  /// Ejecuta la conciliación. `Ok(None)` si el backend no respondió; en ese
  /// caso no se escribe nada.
  ///
  /// Nunca borra: las aplicaciones que desaparecen del backend sólo se
  /// desactivan. Sobre un catálogo sin cambios no hace ninguna escritura.
  pub fn run(&self) -> Result<Option<SyncReport>, WorkflowError> {
    let remote = match self.backend.list_applications() {
      ApiResponse::Success(apps) => apps,
      ApiResponse::Error(e) => {
        log::warn!("No se pudo obtener el catálogo del backend: {}", e);
        return Ok(None);
      }
    };

    let local = self.catalog.list_applications()?;
    let mut report = SyncReport::default();
    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut remote_keys: HashSet<(&str, &str)> = HashSet::new();

    for app in &remote {
      if !remote_keys.insert((app.name.as_str(), app.version.as_str())) {
        log::warn!("Aplicación duplicada en el catálogo remoto: {} {}", app.name, app.version);
        continue;
      }
      match local.iter().find(|l| l.key() == (app.name.as_str(), app.version.as_str())) {
        None => {
          let id = self.create_application(app)?;
          seen.insert(id);
          report.new_apps.push(id);
        }
        Some(existing) => {
          seen.insert(existing.id);
          let port_changed = existing.port != app.gui_port;
          if !existing.active || port_changed {
            let mut updated = existing.clone();
            updated.active = true;
            updated.port = app.gui_port;
            self.catalog.save_application(updated)?;
            if !existing.active {
              report.reactivated_apps.push(existing.id);
            }
            if port_changed {
              report.updated_ports.push(existing.id);
            }
          }
        }
      }
    }

    for gone in local.iter().filter(|a| a.active && !seen.contains(&a.id)) {
      let mut updated = gone.clone();
      updated.active = false;
      self.catalog.save_application(updated)?;
      report.deactivated_apps.push(gone.id);
    }

    log::info!("Catálogo sincronizado: {} nuevas, {} reactivadas, {} desactivadas, {} con puerto nuevo",
               report.new_apps.len(),
               report.reactivated_apps.len(),
               report.deactivated_apps.len(),
               report.updated_ports.len());
    Ok(Some(report))
  }

  fn create_application(&self, remote: &BackendApplication) -> Result<Uuid, WorkflowError> {
    let mut application = Application::new(&remote.name, &remote.version, &remote.slug);
    application.url = remote.url.clone();
    application.description = remote.description.clone();
    application.port = remote.gui_port;
    let app_id = self.catalog.save_application(application)?;

    for cmd in &remote.commands {
      let parameters = cmd.parameters.iter().map(parameter_spec).collect();
      let mut command = Command::new(app_id, &cmd.name, cmd.interactive, parameters);
      command.description = cmd.description.clone();
      self.catalog.save_command(command)?;
    }
    log::info!("Aplicación nueva {} {} con {} comandos", remote.name, remote.version, remote.commands.len());
    Ok(app_id)
  }
}

fn parameter_spec(remote: &BackendParameter) -> ParameterSpec {
  ParameterSpec { name: remote.name.clone(),
                  dtype: remote.dtype.clone(),
                  description: remote.description.clone(),
                  required: remote.required,
                  default: remote.default_value.clone(),
                  validation: ValidationRule::select(remote.choices.clone(),
                                                     remote.min_value,
                                                     remote.max_value,
                                                     remote.regex.clone()) }
}
