//! Crate `flow`: registro de procedencia de datasets
//!
//! Cada ejecución que produce un dataset deja un `ProcessStep` inmutable que
//! enlaza el comando usado, el dataset de entrada, el de salida y los
//! parámetros aplicados. El contrato de persistencia es `StepRepository`;
//! `InMemoryStepRepository` sirve para pruebas y `FlowEngine` recorre el
//! grafo resultante (historial hacia atrás y descendientes hacia adelante).
//!
//! Diseño resumido:
//! - Sólo se añade: ningún paso se modifica ni se borra.
//! - Cada dataset debería ser la salida de a lo sumo un paso; no se impone
//!   en escritura, y los recorridos toleran ciclos con un conjunto de
//!   visitados.
//!
//! Ejemplo rápido:
//! ```rust
//! use flow::stubs::InMemoryStepRepository;
//! use std::sync::Arc;
//! let repo = Arc::new(InMemoryStepRepository::new());
//! let engine = flow::FlowEngine::new(repo);
//! let history = engine.file_history(&uuid::Uuid::new_v4()).unwrap();
//! assert!(history.is_empty());
//! ```
pub mod domain;
pub mod engine;
pub mod errors;
pub mod repository;
pub mod stubs;

pub use domain::*;
pub use engine::*;
pub use errors::*;
pub use repository::*;
pub use stubs::*;
