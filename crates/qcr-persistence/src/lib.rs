//! Persistencia Diesel para el registro de datasets, el catálogo, las
//! referencias de sesión y el registro de procedencia.
//!
//! `DieselRepository` implementa todos los traits de repositorio de
//! `qcr-domain` y `flow::StepRepository` sobre un pool r2d2. SQLite por
//! defecto; Postgres con la feature `pg`. Las migraciones van embebidas y se
//! aplican al crear el repositorio.

mod domain_persistence;
mod flow_persistence;
pub mod schema;

pub use domain_persistence::{new_from_env, DieselRepository, MIGRATIONS};
#[cfg(not(feature = "pg"))]
pub use domain_persistence::new_sqlite_for_test;
