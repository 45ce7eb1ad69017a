// Archivo: stubs.rs
// Propósito: repositorio de pasos en memoria para pruebas y wiring rápido.
// No es durable.
use crate::domain::ProcessStep;
use crate::errors::{FlowError, Result};
use crate::repository::StepRepository;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Pasos guardados en orden de inserción.
pub struct InMemoryStepRepository {
    steps: Mutex<Vec<ProcessStep>>,
}

impl InMemoryStepRepository {
    pub fn new() -> Self {
        Self { steps: Mutex::new(Vec::new()) }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<ProcessStep>>> {
        self.steps
            .lock()
            .map_err(|e| FlowError::Storage(format!("mutex poisoned: {:?}", e)))
    }
}

impl Default for InMemoryStepRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl StepRepository for InMemoryStepRepository {
    fn append_step(&self, step: &ProcessStep) -> Result<Uuid> {
        let mut steps = self.lock()?;
        if steps.iter().any(|s| s.id == step.id) {
            return Err(FlowError::Storage(format!("paso duplicado: {}", step.id)));
        }
        steps.push(step.clone());
        Ok(step.id)
    }

    fn get_step(&self, id: &Uuid) -> Result<Option<ProcessStep>> {
        Ok(self.lock()?.iter().find(|s| &s.id == id).cloned())
    }

    fn find_step_by_output(&self, dataset_id: &Uuid) -> Result<Option<ProcessStep>> {
        Ok(self.lock()?.iter().find(|s| &s.outfile_id == dataset_id).cloned())
    }

    fn find_steps_by_input(&self, dataset_id: &Uuid) -> Result<Vec<ProcessStep>> {
        Ok(self.lock()?
               .iter()
               .filter(|s| s.infile_id.as_ref() == Some(dataset_id))
               .cloned()
               .collect())
    }

    fn list_steps(&self) -> Result<Vec<ProcessStep>> {
        Ok(self.lock()?.clone())
    }
}
