use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Usuario que origina una petición. La autenticación ocurre fuera; aquí
/// sólo interesa para propiedad, conflictos entre usuarios y logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
  pub id: Uuid,
  pub username: String,
}

impl Actor {
  pub fn new(id: Uuid, username: impl Into<String>) -> Self {
    Self { id, username: username.into() }
  }
}

impl std::fmt::Display for Actor {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.username)
  }
}
