// Archivo: lib.rs
// Propósito: adaptador tipado hacia el backend que ejecuta aplicaciones
// (catálogo, datasets, sesiones interactivas y cálculos por lotes).

mod client;
mod config;
mod errors;
mod http;
mod models;
mod response;
pub mod stubs;

pub use client::BackendClient;
pub use config::ClientConfig;
pub use errors::ClientError;
pub use http::HttpBackendClient;
pub use models::{BackendApplication, BackendCalculation, BackendCommand, BackendDataFile, BackendDataset,
                 BackendParameter, BackendSession, CalculationStarted, CommandInvocation, RunStatus, SessionStarted,
                 UploadFile};
pub use response::{truncate_for_log, ApiError, ApiResponse, MALFORMED_RESPONSE_CODE, TRANSPORT_ERROR_CODE};
