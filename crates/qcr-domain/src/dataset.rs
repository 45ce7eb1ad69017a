// dataset.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Metadatos locales de un dataset guardado en el backend.
///
/// `filename` es el nombre original y no cambia; `display_filename` es único
/// entre los datasets activos. Nunca se borra físicamente: se desactiva.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
  pub id: Uuid,
  pub backend_id: String,
  pub filename: String,
  pub display_filename: String,
  pub owner_id: Option<Uuid>,
  pub group_id: Uuid,
  pub filetype: Option<String>,
  pub created_at: DateTime<Utc>,
  pub active: bool,
}

impl Dataset {
  pub fn new(backend_id: impl Into<String>,
             filename: impl Into<String>,
             display_filename: impl Into<String>,
             owner_id: Option<Uuid>,
             group_id: Uuid,
             filetype: Option<String>)
             -> Self {
    Self { id: Uuid::new_v4(),
           backend_id: backend_id.into(),
           filename: filename.into(),
           display_filename: display_filename.into(),
           owner_id,
           group_id,
           filetype,
           created_at: Utc::now(),
           active: true }
  }
}

/// Nombre visible para `filename` que no choca con `active_names`.
///
/// Si hay colisión se prueba `base(N).ext` con N = 2, 3, ... y se devuelve el
/// primero libre. La extensión es lo que sigue al último punto; un nombre sin
/// punto (o que sólo empieza por punto) no tiene extensión.
pub fn disambiguate_display_name<S: AsRef<str>>(filename: &str, active_names: &[S]) -> String {
  let taken: HashSet<&str> = active_names.iter().map(|s| s.as_ref()).collect();
  if !taken.contains(filename) {
    return filename.to_string();
  }
  let (base, ext) = match filename.rfind('.') {
    Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
    _ => (filename, ""),
  };
  let mut n: u32 = 2;
  loop {
    let candidate = format!("{}({}){}", base, n, ext);
    if !taken.contains(candidate.as_str()) {
      return candidate;
    }
    n += 1;
  }
}
