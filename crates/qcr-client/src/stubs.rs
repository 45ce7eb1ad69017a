// Archivo: stubs.rs
// Propósito: backend guionizado para pruebas y demostraciones sin red.
// Cada operación consume la siguiente respuesta programada para ella y toda
// llamada queda registrada.

use crate::client::BackendClient;
use crate::models::{BackendApplication, BackendCalculation, BackendDataset, BackendSession, CalculationStarted,
                    CommandInvocation, SessionStarted, UploadFile};
use crate::response::{ApiError, ApiResponse};
use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Código devuelto cuando no queda ninguna respuesta programada.
pub const UNSCRIPTED_CODE: u16 = 599;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
  ListApplications,
  UploadDataset,
  AppendToDataset,
  GetDataset,
  DownloadDataset,
  DeleteDataset,
  CreateInteractiveSession,
  GetInteractiveSession,
  CloseInteractiveSession,
  InvokeCommand,
  GetCalculation,
  CancelCalculation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
  ListApplications,
  UploadDataset { filename: String },
  AppendToDataset { dataset_id: String, filename: String },
  GetDataset(String),
  DownloadDataset(String),
  DeleteDataset(String),
  CreateInteractiveSession(CommandInvocation),
  GetInteractiveSession(String),
  CloseInteractiveSession(String),
  InvokeCommand(CommandInvocation),
  GetCalculation(String),
  CancelCalculation(String),
}

impl BackendCall {
  pub fn kind(&self) -> CallKind {
    match self {
      BackendCall::ListApplications => CallKind::ListApplications,
      BackendCall::UploadDataset { .. } => CallKind::UploadDataset,
      BackendCall::AppendToDataset { .. } => CallKind::AppendToDataset,
      BackendCall::GetDataset(_) => CallKind::GetDataset,
      BackendCall::DownloadDataset(_) => CallKind::DownloadDataset,
      BackendCall::DeleteDataset(_) => CallKind::DeleteDataset,
      BackendCall::CreateInteractiveSession(_) => CallKind::CreateInteractiveSession,
      BackendCall::GetInteractiveSession(_) => CallKind::GetInteractiveSession,
      BackendCall::CloseInteractiveSession(_) => CallKind::CloseInteractiveSession,
      BackendCall::InvokeCommand(_) => CallKind::InvokeCommand,
      BackendCall::GetCalculation(_) => CallKind::GetCalculation,
      BackendCall::CancelCalculation(_) => CallKind::CancelCalculation,
    }
  }
}

type Scripted = Box<dyn Any + Send>;

#[derive(Default)]
pub struct ScriptedBackend {
  queues: Mutex<HashMap<CallKind, VecDeque<Scripted>>>,
  calls: Mutex<Vec<BackendCall>>,
}

impl ScriptedBackend {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock<'a, T>(m: &'a Mutex<T>) -> MutexGuard<'a, T> {
    // Un pánico en otra prueba no debe bloquear el guion.
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  fn push<T: Send + 'static>(&self, kind: CallKind, response: ApiResponse<T>) -> &Self {
    Self::lock(&self.queues).entry(kind).or_default().push_back(Box::new(response));
    self
  }

  fn next<T: 'static>(&self, call: BackendCall) -> ApiResponse<T> {
    let kind = call.kind();
    Self::lock(&self.calls).push(call);
    let scripted = Self::lock(&self.queues).get_mut(&kind).and_then(|q| q.pop_front());
    match scripted.map(|b| b.downcast::<ApiResponse<T>>()) {
      Some(Ok(resp)) => *resp,
      Some(Err(_)) => ApiResponse::Error(ApiError::new(UNSCRIPTED_CODE, format!("respuesta de tipo incorrecto para {:?}", kind))),
      None => ApiResponse::Error(ApiError::new(UNSCRIPTED_CODE, format!("sin respuesta programada para {:?}", kind))),
    }
  }

  pub fn on_list_applications(&self, r: ApiResponse<Vec<BackendApplication>>) -> &Self {
    self.push(CallKind::ListApplications, r)
  }
  pub fn on_upload_dataset(&self, r: ApiResponse<BackendDataset>) -> &Self {
    self.push(CallKind::UploadDataset, r)
  }
  pub fn on_append_to_dataset(&self, r: ApiResponse<BackendDataset>) -> &Self {
    self.push(CallKind::AppendToDataset, r)
  }
  pub fn on_get_dataset(&self, r: ApiResponse<BackendDataset>) -> &Self {
    self.push(CallKind::GetDataset, r)
  }
  pub fn on_download_dataset(&self, r: ApiResponse<Vec<u8>>) -> &Self {
    self.push(CallKind::DownloadDataset, r)
  }
  pub fn on_delete_dataset(&self, r: ApiResponse<()>) -> &Self {
    self.push(CallKind::DeleteDataset, r)
  }
  pub fn on_create_interactive_session(&self, r: ApiResponse<SessionStarted>) -> &Self {
    self.push(CallKind::CreateInteractiveSession, r)
  }
  pub fn on_get_interactive_session(&self, r: ApiResponse<BackendSession>) -> &Self {
    self.push(CallKind::GetInteractiveSession, r)
  }
  pub fn on_close_interactive_session(&self, r: ApiResponse<BackendSession>) -> &Self {
    self.push(CallKind::CloseInteractiveSession, r)
  }
  pub fn on_invoke_command(&self, r: ApiResponse<CalculationStarted>) -> &Self {
    self.push(CallKind::InvokeCommand, r)
  }
  pub fn on_get_calculation(&self, r: ApiResponse<BackendCalculation>) -> &Self {
    self.push(CallKind::GetCalculation, r)
  }
  pub fn on_cancel_calculation(&self, r: ApiResponse<()>) -> &Self {
    self.push(CallKind::CancelCalculation, r)
  }

  pub fn calls(&self) -> Vec<BackendCall> {
    Self::lock(&self.calls).clone()
  }

  pub fn count(&self, kind: CallKind) -> usize {
    Self::lock(&self.calls).iter().filter(|c| c.kind() == kind).count()
  }

  /// Respuestas programadas que nadie consumió.
  pub fn pending(&self) -> usize {
    Self::lock(&self.queues).values().map(|q| q.len()).sum()
  }
}

impl BackendClient for ScriptedBackend {
  fn list_applications(&self) -> ApiResponse<Vec<BackendApplication>> {
    self.next(BackendCall::ListApplications)
  }
  fn upload_dataset(&self, file: &UploadFile) -> ApiResponse<BackendDataset> {
    self.next(BackendCall::UploadDataset { filename: file.filename.clone() })
  }
  fn append_to_dataset(&self, dataset_id: &str, file: &UploadFile) -> ApiResponse<BackendDataset> {
    self.next(BackendCall::AppendToDataset { dataset_id: dataset_id.to_string(), filename: file.filename.clone() })
  }
  fn get_dataset(&self, dataset_id: &str) -> ApiResponse<BackendDataset> {
    self.next(BackendCall::GetDataset(dataset_id.to_string()))
  }
  fn download_dataset(&self, dataset_id: &str) -> ApiResponse<Vec<u8>> {
    self.next(BackendCall::DownloadDataset(dataset_id.to_string()))
  }
  fn delete_dataset(&self, dataset_id: &str) -> ApiResponse<()> {
    self.next(BackendCall::DeleteDataset(dataset_id.to_string()))
  }
  fn create_interactive_session(&self, invocation: &CommandInvocation) -> ApiResponse<SessionStarted> {
    self.next(BackendCall::CreateInteractiveSession(invocation.clone()))
  }
  fn get_interactive_session(&self, session_id: &str) -> ApiResponse<BackendSession> {
    self.next(BackendCall::GetInteractiveSession(session_id.to_string()))
  }
  fn close_interactive_session(&self, session_id: &str) -> ApiResponse<BackendSession> {
    self.next(BackendCall::CloseInteractiveSession(session_id.to_string()))
  }
  fn invoke_command(&self, invocation: &CommandInvocation) -> ApiResponse<CalculationStarted> {
    self.next(BackendCall::InvokeCommand(invocation.clone()))
  }
  fn get_calculation(&self, calculation_id: &str) -> ApiResponse<BackendCalculation> {
    self.next(BackendCall::GetCalculation(calculation_id.to_string()))
  }
  fn cancel_calculation(&self, calculation_id: &str) -> ApiResponse<()> {
    self.next(BackendCall::CancelCalculation(calculation_id.to_string()))
  }
}
