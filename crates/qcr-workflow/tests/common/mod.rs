// Utilidades compartidas por las pruebas de integración del orquestador.
#![allow(dead_code)]

use flow::InMemoryStepRepository;
use indexmap::IndexMap;
use qcr_client::stubs::ScriptedBackend;
use qcr_client::{ApiError, ApiResponse, BackendCalculation, BackendDataFile, BackendDataset, BackendSession, RunStatus};
use qcr_domain::{Actor, Dataset, DomainStubs, InMemoryDomainRepository, SampleCatalog};
use qcr_workflow::{Orchestrator, Repositories, WorkflowConfig};
use std::sync::Arc;
use uuid::Uuid;

pub struct Fixture {
  pub backend: Arc<ScriptedBackend>,
  pub domain: Arc<InMemoryDomainRepository>,
  pub orchestrator: Orchestrator,
  pub catalog: SampleCatalog,
  pub dataset: Dataset,
  pub actor: Actor,
  pub group_id: Uuid,
}

/// Orquestador sin esperas sobre el catálogo de ejemplo y `sample.cif`.
pub fn fixture() -> Fixture {
  fixture_with(WorkflowConfig::immediate())
}

pub fn fixture_with(config: WorkflowConfig) -> Fixture {
  let group_id = Uuid::new_v4();
  let (repo, catalog, dataset) = DomainStubs::sample_repo(group_id).expect("repo de ejemplo");
  let domain = Arc::new(repo);
  let backend = Arc::new(ScriptedBackend::new());
  let repos = Repositories::with_domain(domain.clone(), Arc::new(InMemoryStepRepository::new()));
  let orchestrator = Orchestrator::new(backend.clone(), repos, config);
  Fixture { backend,
            domain,
            orchestrator,
            catalog,
            dataset,
            actor: Actor::new(Uuid::new_v4(), "alice"),
            group_id }
}

/// Id de fichero que devuelve `script_input_lookup` para `sample.cif`.
pub const SAMPLE_FILE_ID: &str = "qcrbox_ds_sample-file";

impl Fixture {
  /// Programa la consulta con la que se resuelve el fichero principal del
  /// dataset de ejemplo antes de ejecutar un comando.
  pub fn script_input_lookup(&self) -> &ScriptedBackend {
    self.backend
        .on_get_dataset(ApiResponse::Success(remote_dataset(&self.dataset.backend_id, &self.dataset.filename)))
  }
}

pub fn other_actor() -> Actor {
  Actor::new(Uuid::new_v4(), "bob")
}

pub fn busy() -> ApiError {
  ApiError::new(409, "application is busy")
}

pub fn not_found() -> ApiError {
  ApiError::new(404, "not found")
}

pub fn server_error() -> ApiError {
  ApiError::new(500, "internal error")
}

pub fn remote_dataset(id: &str, filename: &str) -> BackendDataset {
  let mut data_files = IndexMap::new();
  data_files.insert(filename.to_string(),
                    BackendDataFile { qcrbox_file_id: format!("{}-file", id),
                                      filename: filename.to_string(),
                                      filetype: Some("cif".into()) });
  BackendDataset { qcrbox_dataset_id: id.to_string(), data_files }
}

pub fn calculation(id: &str, status: RunStatus, output: Option<&str>) -> BackendCalculation {
  BackendCalculation { calculation_id: id.to_string(),
                       status,
                       output_dataset_id: output.map(str::to_string) }
}

pub fn session(id: &str, status: RunStatus, output: Option<&str>) -> BackendSession {
  BackendSession { interactive_session_id: id.to_string(),
                   status,
                   output_dataset_id: output.map(str::to_string) }
}
