// Archivo: engine/mod.rs
// Propósito: el orquestador y los repositorios que se le inyectan.

mod admin;
mod calculations;
mod datasets;
mod orchestrator;
mod sessions;

pub use datasets::StepOrigin;
pub use orchestrator::Orchestrator;

use flow::{InMemoryStepRepository, StepRepository};
use qcr_domain::{Application, CatalogRepository, Command, Dataset, DatasetRepository, InMemoryDomainRepository,
                 SessionReferenceRepository};
use std::sync::Arc;

/// Repositorios que usa el orquestador, uno por entidad.
#[derive(Clone)]
pub struct Repositories {
  pub datasets: Arc<dyn DatasetRepository>,
  pub catalog: Arc<dyn CatalogRepository>,
  pub sessions: Arc<dyn SessionReferenceRepository>,
  pub steps: Arc<dyn StepRepository>,
}

impl Repositories {
  /// Todos los contratos servidos por un mismo almacén (p. ej. Diesel).
  pub fn shared<R>(store: Arc<R>) -> Self
    where R: DatasetRepository + CatalogRepository + SessionReferenceRepository + StepRepository + 'static
  {
    Self { datasets: store.clone(),
           catalog: store.clone(),
           sessions: store.clone(),
           steps: store }
  }

  /// Repositorio de dominio dado y pasos en un almacén aparte.
  pub fn with_domain<D>(domain: Arc<D>, steps: Arc<dyn StepRepository>) -> Self
    where D: DatasetRepository + CatalogRepository + SessionReferenceRepository + 'static
  {
    Self { datasets: domain.clone(),
           catalog: domain.clone(),
           sessions: domain,
           steps }
  }

  pub fn in_memory() -> Self {
    Self::with_domain(Arc::new(InMemoryDomainRepository::new()),
                      Arc::new(InMemoryStepRepository::new()))
  }
}

/// Clave legible de una unidad de trabajo para las líneas de log.
pub(crate) fn work_key(application: &Application, command: &Command, dataset: &Dataset) -> String {
  format!("{} {}::{} sobre {} ({})",
          application.name, application.version, command.name, dataset.display_filename, dataset.id)
}
