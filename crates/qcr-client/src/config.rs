// Archivo: config.rs
// Propósito: parámetros de conexión con el backend, cargados desde el
// entorno (o un fichero `.env`).

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_LOG_LEN: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
  pub base_url: String,
  pub timeout_secs: u64,
  /// Longitud máxima de una respuesta exitosa al escribirla en el log.
  pub max_log_len: usize,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self { base_url: DEFAULT_BASE_URL.to_string(),
           timeout_secs: DEFAULT_TIMEOUT_SECS,
           max_log_len: DEFAULT_MAX_LOG_LEN }
  }
}

impl ClientConfig {
  /// Lee `QCR_API_BASE_URL`, `QCR_API_TIMEOUT_SECS` y `QCR_MAX_LENGTH_API_LOG`.
  /// Valores ausentes o no numéricos conservan el valor por defecto.
  pub fn from_env() -> Self {
    dotenvy::dotenv().ok();
    let defaults = Self::default();
    let base_url = std::env::var("QCR_API_BASE_URL").unwrap_or(defaults.base_url);
    Self { base_url,
           timeout_secs: env_number("QCR_API_TIMEOUT_SECS", defaults.timeout_secs),
           max_log_len: env_number("QCR_MAX_LENGTH_API_LOG", defaults.max_log_len) }
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

fn env_number<T: std::str::FromStr + Copy + std::fmt::Display>(key: &str, fallback: T) -> T {
  match std::env::var(key) {
    Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
                                   log::warn!("{}='{}' no es válido; se usa {}", key, raw, fallback);
                                   fallback
                                 }),
    Err(_) => fallback,
  }
}
