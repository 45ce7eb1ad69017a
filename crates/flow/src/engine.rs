// Archivo: engine.rs
// Propósito: recorridos del grafo de procedencia sobre un `StepRepository`.
//
// El grafo no se materializa: cada recorrido consulta el repositorio paso a
// paso y lleva un conjunto de visitados para no quedar atrapado en ciclos.
use crate::domain::ProcessStep;
use crate::errors::Result;
use crate::repository::StepRepository;
use serde_json::Value as JsonValue;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

/// Motor de procedencia.
///
/// Acepta repositorios concretos o `dyn StepRepository`.
pub struct FlowEngine<R>
    where R: StepRepository + ?Sized
{
    repo: Arc<R>,
}

impl<R> Clone for FlowEngine<R> where R: StepRepository + ?Sized
{
    fn clone(&self) -> Self {
        Self { repo: Arc::clone(&self.repo) }
    }
}

impl<R> FlowEngine<R> where R: StepRepository + ?Sized
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Crea y añade el paso `infile --command--> outfile`.
    pub fn record_step(&self,
                       command_id: Uuid,
                       infile_id: Option<Uuid>,
                       outfile_id: Uuid,
                       parameters: JsonValue)
                       -> Result<ProcessStep> {
        let step = ProcessStep::new(command_id, infile_id, outfile_id, parameters);
        self.repo.append_step(&step)?;
        log::info!("Paso de procedencia {} registrado: {:?} -> {}",
                   step.id,
                   step.infile_id,
                   step.outfile_id);
        Ok(step)
    }

    /// Historial de `dataset_id` desde la raíz hasta el propio dataset.
    ///
    /// Se detiene cuando no hay paso creador o cuando la entrada del paso es
    /// nula. Un ciclo se registra como error y corta el recorrido.
    pub fn file_history(&self, dataset_id: &Uuid) -> Result<Vec<ProcessStep>> {
        let mut chain: Vec<ProcessStep> = Vec::new();
        let mut visited: HashSet<Uuid> = HashSet::new();
        let mut current = *dataset_id;
        loop {
            if !visited.insert(current) {
                log::error!("Ciclo de procedencia detectado en el dataset {}; historial truncado", current);
                break;
            }
            let Some(step) = self.repo.find_step_by_output(&current)? else {
                break;
            };
            let upstream = step.infile_id;
            chain.push(step);
            match upstream {
                Some(next) => current = next,
                None => {
                    log::warn!("Paso sin dataset de entrada para {}; historial truncado", current);
                    break;
                }
            }
        }
        chain.reverse();
        Ok(chain)
    }

    /// Datasets de entrada del historial, del más reciente al más antiguo.
    pub fn ancestor_ids(&self, dataset_id: &Uuid) -> Result<Vec<Uuid>> {
        Ok(self.file_history(dataset_id)?
               .into_iter()
               .rev()
               .filter_map(|s| s.infile_id)
               .collect())
    }

    /// Pasos que consumieron `dataset_id` y, transitivamente, sus salidas,
    /// en anchura.
    pub fn file_descendants(&self, dataset_id: &Uuid) -> Result<Vec<ProcessStep>> {
        let mut out = Vec::new();
        let mut visited: HashSet<Uuid> = HashSet::new();
        let mut queue: VecDeque<Uuid> = VecDeque::new();
        visited.insert(*dataset_id);
        queue.push_back(*dataset_id);
        while let Some(current) = queue.pop_front() {
            for step in self.repo.find_steps_by_input(&current)? {
                if visited.insert(step.outfile_id) {
                    queue.push_back(step.outfile_id);
                } else {
                    log::error!("Ciclo de procedencia detectado en el dataset {}", step.outfile_id);
                    continue;
                }
                out.push(step);
            }
        }
        Ok(out)
    }
}
