//! qcr-workflow: orquestador de sesiones y cálculos
//!
//! Arranca, consulta y cierra trabajo en el backend (sesiones interactivas
//! y cálculos por lotes), resuelve la contención por aplicación entre
//! usuarios y materializa los resultados como datasets con su paso de
//! procedencia. Concilia tres fuentes de estado: el backend, la referencia
//! que guarda el navegador (`SessionCookie`) y las `SessionReference`
//! persistidas.

pub mod config;
pub mod directory;
pub mod engine;
pub mod errors;
pub mod status;
pub mod step;

pub use config::WorkflowConfig;
pub use directory::{DirectorySync, SyncReport};
pub use engine::{Orchestrator, Repositories, StepOrigin};
pub use errors::{Outcome, WorkFailure, WorkflowError};
pub use status::{MessageLevel, UserMessage, WorkState, WorkStatus};
pub use step::{CommandArguments, FormValue, FormValues, ParameterBinder, RequestContext, SessionCookie};
