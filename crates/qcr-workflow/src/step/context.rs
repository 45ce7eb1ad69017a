use qcr_domain::Actor;
use serde::{Deserialize, Serialize};

/// Referencia que guarda el navegador: la sesión interactiva y el cálculo
/// en curso de este cliente.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
  pub app_session_id: Option<String>,
  pub calculation_id: Option<String>,
}

impl SessionCookie {
  /// Olvida `backend_id` si coincide con la sesión o el cálculo guardados.
  pub fn forget(&mut self, backend_id: &str) {
    if self.app_session_id.as_deref() == Some(backend_id) {
      self.app_session_id = None;
    }
    if self.calculation_id.as_deref() == Some(backend_id) {
      self.calculation_id = None;
    }
  }
}

/// Contexto de una petición: quién la hace y su referencia de navegador,
/// que el orquestador actualiza en sitio.
pub struct RequestContext<'a> {
  pub actor: &'a Actor,
  pub cookie: &'a mut SessionCookie,
}

impl<'a> RequestContext<'a> {
  pub fn new(actor: &'a Actor, cookie: &'a mut SessionCookie) -> Self {
    Self { actor, cookie }
  }
}
