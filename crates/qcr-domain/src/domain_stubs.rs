use crate::domain_repository::{CatalogRepository, DatasetRepository, InMemoryDomainRepository};
use crate::{Application, Command, Dataset, DomainError, ParameterSpec, ValidationRule};
use serde_json::json;
use uuid::Uuid;

/// Catálogo de ejemplo: una aplicación con un comando interactivo y uno por
/// lotes.
pub struct SampleCatalog {
    pub application: Application,
    pub interactive: Command,
    pub batch: Command,
}

pub struct DomainStubs;

impl DomainStubs {
    pub fn sample_catalog() -> SampleCatalog {
        let mut application = Application::new("Olex2", "1.5", "olex2");
        application.port = Some(12001);
        application.description = Some("Refinamiento interactivo".into());

        let interactive = Command::new(application.id,
                                       "interactive",
                                       true,
                                       vec![ParameterSpec::new("input_file", "QCrBox.data_file", true)]);

        let batch = Command::new(application.id,
                                 "refine",
                                 false,
                                 vec![ParameterSpec::new("input_file", "QCrBox.data_file", true),
                                      ParameterSpec::new("n_cycles", "int", false).with_default(json!(10))
                                                                                   .with_validation(ValidationRule::Range { min: Some(1.0),
                                                                                                                            max: Some(100.0) }),
                                      ParameterSpec::new("weighting", "bool", false),
                                      ParameterSpec::new("output_name", "QCrBox.output_path", false)]);

        SampleCatalog { application, interactive, batch }
    }

    /// Repositorio en memoria con el catálogo de ejemplo y un dataset
    /// `sample.cif` perteneciente a `group_id`.
    pub fn sample_repo(group_id: Uuid) -> Result<(InMemoryDomainRepository, SampleCatalog, Dataset), DomainError> {
        let repo = InMemoryDomainRepository::new();
        let catalog = Self::sample_catalog();
        repo.save_application(catalog.application.clone())?;
        repo.save_command(catalog.interactive.clone())?;
        repo.save_command(catalog.batch.clone())?;
        let dataset = Dataset::new("qcrbox_ds_sample", "sample.cif", "sample.cif", None, group_id, Some("cif".into()));
        repo.save_dataset(dataset.clone())?;
        Ok((repo, catalog, dataset))
    }
}
