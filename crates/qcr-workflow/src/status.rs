// Archivo: status.rs
// Propósito: estado devuelto por cada punto de entrada del orquestador.

use crate::errors::WorkFailure;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
  Info,
  Success,
  Warning,
  Error,
}

/// Mensaje para mostrar al usuario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserMessage {
  pub level: MessageLevel,
  pub text: String,
}

/// Estado alcanzado por la unidad de trabajo.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkState {
  Idle,
  /// Sesión interactiva abierta.
  Active,
  /// Cálculo enviado y aún sin terminar.
  Pending,
  CompletedWithOutput,
  CompletedNoOutput,
  Cancelled,
  Failed(WorkFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkStatus {
  pub session_is_open: bool,
  pub calc_is_pending: bool,
  /// Dataset creado, si lo hubo.
  pub outfile_id: Option<Uuid>,
  pub state: WorkState,
  pub messages: Vec<UserMessage>,
}

impl WorkStatus {
  fn with_state(state: WorkState) -> Self {
    WorkStatus { session_is_open: matches!(state, WorkState::Active),
                 calc_is_pending: matches!(state, WorkState::Pending),
                 outfile_id: None,
                 state,
                 messages: Vec::new() }
  }

  pub fn idle() -> Self {
    Self::with_state(WorkState::Idle)
  }

  pub fn active() -> Self {
    Self::with_state(WorkState::Active)
  }

  pub fn pending() -> Self {
    Self::with_state(WorkState::Pending)
  }

  pub fn completed(outfile_id: Uuid) -> Self {
    let mut status = Self::with_state(WorkState::CompletedWithOutput);
    status.outfile_id = Some(outfile_id);
    status
  }

  pub fn no_output() -> Self {
    Self::with_state(WorkState::CompletedNoOutput)
  }

  pub fn cancelled() -> Self {
    Self::with_state(WorkState::Cancelled)
  }

  /// Estado fallido con el mensaje de error correspondiente ya añadido.
  pub fn failed(failure: WorkFailure) -> Self {
    let text = failure.to_string();
    Self::with_state(WorkState::Failed(failure)).message(MessageLevel::Error, text)
  }

  pub fn message(mut self, level: MessageLevel, text: impl Into<String>) -> Self {
    self.messages.push(UserMessage { level, text: text.into() });
    self
  }

  pub fn failure(&self) -> Option<&WorkFailure> {
    match &self.state {
      WorkState::Failed(f) => Some(f),
      _ => None,
    }
  }

  pub fn is_failed(&self) -> bool {
    self.failure().is_some()
  }

  pub fn has_message(&self, level: MessageLevel) -> bool {
    self.messages.iter().any(|m| m.level == level)
  }
}
