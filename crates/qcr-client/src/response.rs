// Archivo: response.rs
// Propósito: resultado uniforme de cada llamada al backend.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::Debug;
use thiserror::Error;

/// Código usado cuando la petición no llegó a obtener respuesta HTTP.
pub const TRANSPORT_ERROR_CODE: u16 = 0;
/// Código usado cuando la respuesta no se pudo interpretar.
pub const MALFORMED_RESPONSE_CODE: u16 = 1;

const NOT_FOUND: u16 = 404;
const CONFLICT: u16 = 409;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("[{code}] {message}")]
pub struct ApiError {
  pub code: u16,
  pub message: String,
}

impl ApiError {
  pub fn new(code: u16, message: impl Into<String>) -> Self {
    Self { code, message: message.into() }
  }

  pub fn transport(cause: impl std::fmt::Display) -> Self {
    Self::new(TRANSPORT_ERROR_CODE, cause.to_string())
  }

  pub fn malformed(cause: impl std::fmt::Display) -> Self {
    Self::new(MALFORMED_RESPONSE_CODE, format!("respuesta inválida: {}", cause))
  }

  pub fn is_not_found(&self) -> bool {
    self.code == NOT_FOUND
  }

  /// El backend rechaza la petición porque la aplicación ya tiene una
  /// ejecución activa.
  pub fn is_resource_busy(&self) -> bool {
    self.code == CONFLICT || self.message.to_lowercase().contains("busy")
  }

  pub fn is_transport(&self) -> bool {
    self.code == TRANSPORT_ERROR_CODE
  }
}

/// Éxito con carga tipada o error del backend. Nunca se lanza como pánico ni
/// como `Err` de Rust: quien llama decide qué hacer con cada variante.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
  Success(T),
  Error(ApiError),
}

impl<T> ApiResponse<T> {
  pub fn is_valid(&self) -> bool {
    matches!(self, ApiResponse::Success(_))
  }

  pub fn ok(self) -> Option<T> {
    match self {
      ApiResponse::Success(v) => Some(v),
      ApiResponse::Error(_) => None,
    }
  }

  pub fn error(&self) -> Option<&ApiError> {
    match self {
      ApiResponse::Success(_) => None,
      ApiResponse::Error(e) => Some(e),
    }
  }

  pub fn into_result(self) -> Result<T, ApiError> {
    match self {
      ApiResponse::Success(v) => Ok(v),
      ApiResponse::Error(e) => Err(e),
    }
  }

  pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ApiResponse<U> {
    match self {
      ApiResponse::Success(v) => ApiResponse::Success(f(v)),
      ApiResponse::Error(e) => ApiResponse::Error(e),
    }
  }
}

impl<T: Debug> ApiResponse<T> {
  /// Registra el resultado: los éxitos en `info` (recortados a `max_len`
  /// caracteres) y los errores en `error`.
  pub fn logged(self, call: &str, max_len: usize) -> Self {
    match &self {
      ApiResponse::Success(v) => {
        let text = format!("{:?}", v);
        log::info!("API {} -> {}", call, truncate_for_log(&text, max_len));
      }
      ApiResponse::Error(e) => log::error!("API {} -> error {}", call, e),
    }
    self
  }
}

impl<T> From<Result<T, ApiError>> for ApiResponse<T> {
  fn from(res: Result<T, ApiError>) -> Self {
    match res {
      Ok(v) => ApiResponse::Success(v),
      Err(e) => ApiResponse::Error(e),
    }
  }
}

/// Recorta `text` conservando el inicio y los dos últimos caracteres:
/// `inicio ... fin`. Opera sobre caracteres, no bytes.
pub fn truncate_for_log(text: &str, max_len: usize) -> Cow<'_, str> {
  let count = text.chars().count();
  if count <= max_len {
    return Cow::Borrowed(text);
  }
  let head: String = text.chars().take(max_len.saturating_sub(2)).collect();
  let tail: String = text.chars().skip(count.saturating_sub(2)).collect();
  Cow::Owned(format!("{} ... {}", head, tail))
}
