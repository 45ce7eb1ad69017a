// Archivo: config.rs
// Propósito: parámetros del orquestador cargados desde el entorno.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuración del orquestador.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
  /// Espera entre lanzar un cálculo y su primera consulta.
  pub calc_initial_delay_ms: u64,
  /// Intervalo sugerido a quien llama para volver a consultar un cálculo
  /// pendiente.
  pub auto_refresh_secs: u64,
  /// Extensión obligatoria de los ficheros subidos; `None` acepta todo.
  pub upload_extension: Option<String>,
}

impl Default for WorkflowConfig {
  fn default() -> Self {
    WorkflowConfig { calc_initial_delay_ms: 1000,
                     auto_refresh_secs: 5,
                     upload_extension: Some(".cif".to_string()) }
  }
}

impl WorkflowConfig {
  /// Lee `QCR_CALC_INITIAL_DELAY_MS`, `QCR_AUTO_REFRESH_SECS` y
  /// `QCR_UPLOAD_EXTENSION` (cadena vacía = sin filtro).
  pub fn from_env() -> Self {
    dotenvy::dotenv().ok();
    let defaults = Self::default();
    let upload_extension = match std::env::var("QCR_UPLOAD_EXTENSION") {
      Ok(ext) if ext.trim().is_empty() => None,
      Ok(ext) => Some(ext.trim().to_string()),
      Err(_) => defaults.upload_extension,
    };
    WorkflowConfig { calc_initial_delay_ms: env_u64("QCR_CALC_INITIAL_DELAY_MS", defaults.calc_initial_delay_ms),
                     auto_refresh_secs: env_u64("QCR_AUTO_REFRESH_SECS", defaults.auto_refresh_secs),
                     upload_extension }
  }

  /// Sin espera; útil en pruebas.
  pub fn immediate() -> Self {
    WorkflowConfig { calc_initial_delay_ms: 0, ..Self::default() }
  }

  pub fn calc_initial_delay(&self) -> Duration {
    Duration::from_millis(self.calc_initial_delay_ms)
  }

  pub fn auto_refresh(&self) -> Duration {
    Duration::from_secs(self.auto_refresh_secs)
  }

  /// `true` si `filename` cumple el filtro de extensión (sin distinguir
  /// mayúsculas).
  pub fn accepts_upload(&self, filename: &str) -> bool {
    match &self.upload_extension {
      Some(ext) => filename.to_lowercase().ends_with(&ext.to_lowercase()),
      None => true,
    }
  }
}

fn env_u64(key: &str, fallback: u64) -> u64 {
  match std::env::var(key) {
    Ok(raw) => match raw.trim().parse() {
      Ok(v) => v,
      Err(_) => {
        log::warn!("{}='{}' no es un entero válido; se usa {}", key, raw, fallback);
        fallback
      }
    },
    Err(_) => fallback,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn upload_filter_ignores_case() {
    let cfg = WorkflowConfig::default();
    assert!(cfg.accepts_upload("Structure.CIF"));
    assert!(!cfg.accepts_upload("notes.txt"));
    let open = WorkflowConfig { upload_extension: None, ..WorkflowConfig::default() };
    assert!(open.accepts_upload("notes.txt"));
  }

  #[test]
  fn defaults() {
    let cfg = WorkflowConfig::default();
    assert_eq!(cfg.calc_initial_delay(), Duration::from_millis(1000));
    assert_eq!(cfg.auto_refresh(), Duration::from_secs(5));
    assert_eq!(WorkflowConfig::immediate().calc_initial_delay(), Duration::ZERO);
  }
}
