use crate::{Application, Command, Dataset, DomainError, SessionReference, WorkKind};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Registro de datasets. Los datasets no se borran: se desactivan.
pub trait DatasetRepository: Send + Sync {
    /// Inserta o reemplaza por `id`.
    fn save_dataset(&self, dataset: Dataset) -> Result<Uuid, DomainError>;

    fn get_dataset(&self, id: &Uuid) -> Result<Option<Dataset>, DomainError>;

    fn find_dataset_by_backend_id(&self, backend_id: &str) -> Result<Option<Dataset>, DomainError>;

    /// Datasets activos ordenados por fecha de creación.
    fn list_active_datasets(&self) -> Result<Vec<Dataset>, DomainError>;

    fn set_dataset_active(&self, id: &Uuid, active: bool) -> Result<(), DomainError>;

    /// Nombres visibles ocupados por datasets activos.
    fn active_display_filenames(&self) -> Result<Vec<String>, DomainError> {
        Ok(self.list_active_datasets()?.into_iter().map(|d| d.display_filename).collect())
    }
}

/// Espejo local del catálogo de aplicaciones del backend.
pub trait CatalogRepository: Send + Sync {
    /// Todas las aplicaciones, activas o no.
    fn list_applications(&self) -> Result<Vec<Application>, DomainError>;

    fn get_application(&self, id: &Uuid) -> Result<Option<Application>, DomainError>;

    /// Inserta o reemplaza por `id`.
    fn save_application(&self, application: Application) -> Result<Uuid, DomainError>;

    /// Inserta o reemplaza el comando junto con sus parámetros.
    fn save_command(&self, command: Command) -> Result<Uuid, DomainError>;

    fn get_command(&self, id: &Uuid) -> Result<Option<Command>, DomainError>;

    fn list_commands(&self, application_id: &Uuid) -> Result<Vec<Command>, DomainError>;

    fn find_application(&self, name: &str, version: &str) -> Result<Option<Application>, DomainError> {
        Ok(self.list_applications()?
               .into_iter()
               .find(|a| a.name == name && a.version == version))
    }
}

/// Almacén de referencias a trabajo pendiente en el backend.
pub trait SessionReferenceRepository: Send + Sync {
    fn save_reference(&self, reference: SessionReference) -> Result<Uuid, DomainError>;

    fn get_reference(&self, id: &Uuid) -> Result<Option<SessionReference>, DomainError>;

    /// Todas las referencias, de la más antigua a la más reciente.
    fn list_references(&self) -> Result<Vec<SessionReference>, DomainError>;

    /// Devuelve `true` si existía.
    fn delete_reference(&self, id: &Uuid) -> Result<bool, DomainError>;

    fn find_reference_by_session_id(&self, session_id: &str) -> Result<Option<SessionReference>, DomainError> {
        Ok(self.list_references()?.into_iter().find(|r| r.session_id == session_id))
    }

    fn references_for_application(&self, application_id: &Uuid) -> Result<Vec<SessionReference>, DomainError> {
        Ok(self.list_references()?
               .into_iter()
               .filter(|r| &r.application_id == application_id)
               .collect())
    }

    fn references_for_user(&self, user_id: &Uuid, kind: WorkKind) -> Result<Vec<SessionReference>, DomainError> {
        Ok(self.list_references()?
               .into_iter()
               .filter(|r| &r.user_id == user_id && r.kind == kind)
               .collect())
    }

    /// Borra todas las referencias a `session_id` y devuelve cuántas había.
    fn delete_references_by_session_id(&self, session_id: &str) -> Result<usize, DomainError> {
        let mut deleted = 0;
        for r in self.list_references()?.into_iter().filter(|r| r.session_id == session_id) {
            if self.delete_reference(&r.id)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

/// Implementación en memoria para tests y desarrollo.
pub struct InMemoryDomainRepository {
    datasets: Arc<Mutex<HashMap<Uuid, Dataset>>>,
    applications: Arc<Mutex<HashMap<Uuid, Application>>>,
    commands: Arc<Mutex<HashMap<Uuid, Command>>>,
    references: Arc<Mutex<HashMap<Uuid, SessionReference>>>,
}

impl InMemoryDomainRepository {
    pub fn new() -> Self {
        Self { datasets: Arc::new(Mutex::new(HashMap::new())),
               applications: Arc::new(Mutex::new(HashMap::new())),
               commands: Arc::new(Mutex::new(HashMap::new())),
               references: Arc::new(Mutex::new(HashMap::new())) }
    }

    // Helper to map poisoned mutex errors into DomainError
    fn lock_map<'a, T>(&'a self, m: &'a Mutex<T>, name: &str) -> Result<std::sync::MutexGuard<'a, T>, DomainError> {
        m.lock()
         .map_err(|e| DomainError::StorageError(format!("Mutex '{}' poisoned: {}", name, e)))
    }
}

impl Default for InMemoryDomainRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetRepository for InMemoryDomainRepository {
    fn save_dataset(&self, dataset: Dataset) -> Result<Uuid, DomainError> {
        let id = dataset.id;
        self.lock_map(&self.datasets, "datasets")?.insert(id, dataset);
        Ok(id)
    }

    fn get_dataset(&self, id: &Uuid) -> Result<Option<Dataset>, DomainError> {
        Ok(self.lock_map(&self.datasets, "datasets")?.get(id).cloned())
    }

    fn find_dataset_by_backend_id(&self, backend_id: &str) -> Result<Option<Dataset>, DomainError> {
        let map = self.lock_map(&self.datasets, "datasets")?;
        let mut found: Vec<&Dataset> = map.values().filter(|d| d.backend_id == backend_id).collect();
        found.sort_by_key(|d| d.created_at);
        Ok(found.first().map(|d| (*d).clone()))
    }

    fn list_active_datasets(&self) -> Result<Vec<Dataset>, DomainError> {
        let map = self.lock_map(&self.datasets, "datasets")?;
        let mut out: Vec<Dataset> = map.values().filter(|d| d.active).cloned().collect();
        out.sort_by_key(|d| d.created_at);
        Ok(out)
    }

    fn set_dataset_active(&self, id: &Uuid, active: bool) -> Result<(), DomainError> {
        let mut map = self.lock_map(&self.datasets, "datasets")?;
        let dataset = map.get_mut(id)
                         .ok_or_else(|| DomainError::NotFound(format!("dataset {}", id)))?;
        dataset.active = active;
        Ok(())
    }
}

impl CatalogRepository for InMemoryDomainRepository {
    fn list_applications(&self) -> Result<Vec<Application>, DomainError> {
        let map = self.lock_map(&self.applications, "applications")?;
        let mut out: Vec<Application> = map.values().cloned().collect();
        out.sort_by(|a, b| (&a.name, &a.version).cmp(&(&b.name, &b.version)));
        Ok(out)
    }

    fn get_application(&self, id: &Uuid) -> Result<Option<Application>, DomainError> {
        Ok(self.lock_map(&self.applications, "applications")?.get(id).cloned())
    }

    fn save_application(&self, application: Application) -> Result<Uuid, DomainError> {
        let id = application.id;
        self.lock_map(&self.applications, "applications")?.insert(id, application);
        Ok(id)
    }

    fn save_command(&self, command: Command) -> Result<Uuid, DomainError> {
        if self.get_application(&command.application_id)?.is_none() {
            return Err(DomainError::ValidationError(format!("El comando {} apunta a una aplicación inexistente",
                                                            command.name)));
        }
        let id = command.id;
        self.lock_map(&self.commands, "commands")?.insert(id, command);
        Ok(id)
    }

    fn get_command(&self, id: &Uuid) -> Result<Option<Command>, DomainError> {
        Ok(self.lock_map(&self.commands, "commands")?.get(id).cloned())
    }

    fn list_commands(&self, application_id: &Uuid) -> Result<Vec<Command>, DomainError> {
        let map = self.lock_map(&self.commands, "commands")?;
        let mut out: Vec<Command> = map.values().filter(|c| &c.application_id == application_id).cloned().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}

impl SessionReferenceRepository for InMemoryDomainRepository {
    fn save_reference(&self, reference: SessionReference) -> Result<Uuid, DomainError> {
        let id = reference.id;
        self.lock_map(&self.references, "references")?.insert(id, reference);
        Ok(id)
    }

    fn get_reference(&self, id: &Uuid) -> Result<Option<SessionReference>, DomainError> {
        Ok(self.lock_map(&self.references, "references")?.get(id).cloned())
    }

    fn list_references(&self) -> Result<Vec<SessionReference>, DomainError> {
        let map = self.lock_map(&self.references, "references")?;
        let mut out: Vec<SessionReference> = map.values().cloned().collect();
        out.sort_by_key(|r| r.start_time);
        Ok(out)
    }

    fn delete_reference(&self, id: &Uuid) -> Result<bool, DomainError> {
        Ok(self.lock_map(&self.references, "references")?.remove(id).is_some())
    }
}
