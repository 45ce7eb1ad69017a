mod actor;
mod application;
mod dataset;
mod domain_repository;
mod domain_stubs;
mod errors;
mod session_reference;
mod validation;

pub use actor::Actor;
pub use application::{Application, Command, ParamKind, ParameterSpec};
pub use dataset::{disambiguate_display_name, Dataset};
pub use domain_repository::{CatalogRepository, DatasetRepository, InMemoryDomainRepository,
                            SessionReferenceRepository};
pub use domain_stubs::{DomainStubs, SampleCatalog};
pub use errors::DomainError;
pub use session_reference::{SessionReference, WorkKind};
pub use validation::ValidationRule;
