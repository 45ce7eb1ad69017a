// Archivo: repository.rs
// Propósito: contrato `StepRepository` que deben implementar las
// persistencias (Diesel, en memoria, etc.).
use crate::domain::ProcessStep;
use crate::errors::Result;
use uuid::Uuid;

/// Almacén de sólo-añadir de `ProcessStep`.
pub trait StepRepository: Send + Sync {
    /// Añade un paso. No valida unicidad de la salida.
    fn append_step(&self, step: &ProcessStep) -> Result<Uuid>;

    fn get_step(&self, id: &Uuid) -> Result<Option<ProcessStep>>;

    /// Paso que produjo `dataset_id`. Si hubiera varios (datos corruptos) se
    /// devuelve el más antiguo.
    fn find_step_by_output(&self, dataset_id: &Uuid) -> Result<Option<ProcessStep>>;

    /// Pasos que consumieron `dataset_id`, en orden de creación.
    fn find_steps_by_input(&self, dataset_id: &Uuid) -> Result<Vec<ProcessStep>>;

    /// Todos los pasos en orden de creación.
    fn list_steps(&self) -> Result<Vec<ProcessStep>>;
}
