// Archivo: http.rs
// Propósito: implementación de `BackendClient` sobre HTTP/JSON.
//
// Las respuestas exitosas llegan como `{"payload": {...}}` y los errores
// como `{"error": {"code": .., "message": ..}}`.

use crate::client::BackendClient;
use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::models::{BackendApplication, BackendCalculation, BackendDataset, BackendSession, CalculationStarted,
                    CommandInvocation, SessionStarted, UploadFile};
use crate::response::{ApiError, ApiResponse};
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use ureq::http::Response;
use ureq::{Agent, Body};

type Sent = Result<Response<Body>, ureq::Error>;

#[derive(Deserialize)]
struct Envelope<T> {
  payload: T,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
  error: ApiError,
}

#[derive(Deserialize)]
struct ApplicationsPayload {
  applications: Vec<BackendApplication>,
}

#[derive(Deserialize)]
struct DatasetsPayload {
  datasets: Vec<BackendDataset>,
}

#[derive(Deserialize)]
struct SessionsPayload {
  interactive_sessions: Vec<BackendSession>,
}

#[derive(Deserialize)]
struct CalculationsPayload {
  calculations: Vec<BackendCalculation>,
}

pub struct HttpBackendClient {
  agent: Agent,
  base_url: String,
  max_log_len: usize,
}

impl HttpBackendClient {
  pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
    let base_url = config.base_url.trim().trim_end_matches('/').to_string();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
      return Err(ClientError::InvalidBaseUrl(base_url));
    }
    if config.timeout_secs == 0 {
      return Err(ClientError::InvalidConfig("el timeout debe ser mayor que cero".to_string()));
    }
    let agent: Agent = Agent::config_builder().timeout_global(Some(config.timeout()))
                                              .http_status_as_error(false)
                                              .build()
                                              .into();
    Ok(Self { agent, base_url, max_log_len: config.max_log_len })
  }

  pub fn from_env() -> Result<Self, ClientError> {
    Self::new(&ClientConfig::from_env())
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  fn upload_body(file: &UploadFile) -> serde_json::Value {
    json!({
      "filename": file.filename,
      "content_b64": base64::engine::general_purpose::STANDARD.encode(&file.content),
    })
  }
}

// Lee el cuerpo y separa error de carga útil. Un sobre de error se respeta
// aunque el estado HTTP sea 2xx.
fn read_payload<T: DeserializeOwned>(sent: Sent) -> Result<T, ApiError> {
  let mut response = sent.map_err(ApiError::transport)?;
  let status = response.status().as_u16();
  let text = response.body_mut().read_to_string().map_err(ApiError::transport)?;
  if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(&text) {
    return Err(env.error);
  }
  if status >= 400 {
    return Err(status_error(status, &text));
  }
  serde_json::from_str::<Envelope<T>>(&text).map(|env| env.payload).map_err(ApiError::malformed)
}

fn read_unit(sent: Sent) -> Result<(), ApiError> {
  let mut response = sent.map_err(ApiError::transport)?;
  let status = response.status().as_u16();
  let text = response.body_mut().read_to_string().unwrap_or_default();
  if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(&text) {
    return Err(env.error);
  }
  if status >= 400 {
    return Err(status_error(status, &text));
  }
  Ok(())
}

fn read_bytes(sent: Sent) -> Result<Vec<u8>, ApiError> {
  let mut response = sent.map_err(ApiError::transport)?;
  let status = response.status().as_u16();
  if status >= 400 {
    let text = response.body_mut().read_to_string().unwrap_or_default();
    return Err(match serde_json::from_str::<ErrorEnvelope>(&text) {
                 Ok(env) => env.error,
                 Err(_) => status_error(status, &text),
               });
  }
  response.body_mut().read_to_vec().map_err(ApiError::transport)
}

fn status_error(status: u16, text: &str) -> ApiError {
  let message = text.trim();
  if message.is_empty() {
    ApiError::new(status, format!("HTTP {}", status))
  } else {
    ApiError::new(status, message)
  }
}

fn first<T>(items: Vec<T>, what: &str) -> Result<T, ApiError> {
  items.into_iter().next().ok_or_else(|| ApiError::malformed(format!("lista de {} vacía", what)))
}

impl BackendClient for HttpBackendClient {
  fn list_applications(&self) -> ApiResponse<Vec<BackendApplication>> {
    let sent = self.agent.get(&self.url("/applications")).call();
    ApiResponse::from(read_payload::<ApplicationsPayload>(sent).map(|p| p.applications))
      .logged("list_applications", self.max_log_len)
  }

  fn upload_dataset(&self, file: &UploadFile) -> ApiResponse<BackendDataset> {
    let sent = self.agent.post(&self.url("/datasets")).send_json(Self::upload_body(file));
    ApiResponse::from(read_payload::<DatasetsPayload>(sent).and_then(|p| first(p.datasets, "datasets")))
      .logged("upload_dataset", self.max_log_len)
  }

  fn append_to_dataset(&self, dataset_id: &str, file: &UploadFile) -> ApiResponse<BackendDataset> {
    let sent = self.agent
                   .post(&self.url(&format!("/datasets/{}", dataset_id)))
                   .send_json(Self::upload_body(file));
    ApiResponse::from(read_payload::<DatasetsPayload>(sent).and_then(|p| first(p.datasets, "datasets")))
      .logged("append_to_dataset", self.max_log_len)
  }

  fn get_dataset(&self, dataset_id: &str) -> ApiResponse<BackendDataset> {
    let sent = self.agent.get(&self.url(&format!("/datasets/{}", dataset_id))).call();
    ApiResponse::from(read_payload::<DatasetsPayload>(sent).and_then(|p| first(p.datasets, "datasets")))
      .logged("get_dataset", self.max_log_len)
  }

  fn download_dataset(&self, dataset_id: &str) -> ApiResponse<Vec<u8>> {
    let sent = self.agent.get(&self.url(&format!("/datasets/{}/download", dataset_id))).call();
    let res = ApiResponse::from(read_bytes(sent));
    match &res {
      ApiResponse::Success(bytes) => log::info!("API download_dataset -> {} bytes", bytes.len()),
      ApiResponse::Error(e) => log::error!("API download_dataset -> error {}", e),
    }
    res
  }

  fn delete_dataset(&self, dataset_id: &str) -> ApiResponse<()> {
    let sent = self.agent.delete(&self.url(&format!("/datasets/{}", dataset_id))).call();
    ApiResponse::from(read_unit(sent)).logged("delete_dataset", self.max_log_len)
  }

  fn create_interactive_session(&self, invocation: &CommandInvocation) -> ApiResponse<SessionStarted> {
    let sent = self.agent.post(&self.url("/interactive_sessions")).send_json(invocation);
    ApiResponse::from(read_payload::<SessionStarted>(sent)).logged("create_interactive_session", self.max_log_len)
  }

  fn get_interactive_session(&self, session_id: &str) -> ApiResponse<BackendSession> {
    let sent = self.agent.get(&self.url(&format!("/interactive_sessions/{}", session_id))).call();
    ApiResponse::from(read_payload::<SessionsPayload>(sent).and_then(|p| first(p.interactive_sessions, "sesiones")))
      .logged("get_interactive_session", self.max_log_len)
  }

  fn close_interactive_session(&self, session_id: &str) -> ApiResponse<BackendSession> {
    let sent = self.agent
                   .post(&self.url(&format!("/interactive_sessions/{}/close", session_id)))
                   .send_empty();
    ApiResponse::from(read_payload::<SessionsPayload>(sent).and_then(|p| first(p.interactive_sessions, "sesiones")))
      .logged("close_interactive_session", self.max_log_len)
  }

  fn invoke_command(&self, invocation: &CommandInvocation) -> ApiResponse<CalculationStarted> {
    let sent = self.agent.post(&self.url("/commands/invoke")).send_json(invocation);
    ApiResponse::from(read_payload::<CalculationStarted>(sent)).logged("invoke_command", self.max_log_len)
  }

  fn get_calculation(&self, calculation_id: &str) -> ApiResponse<BackendCalculation> {
    let sent = self.agent.get(&self.url(&format!("/calculations/{}", calculation_id))).call();
    ApiResponse::from(read_payload::<CalculationsPayload>(sent).and_then(|p| first(p.calculations, "cálculos")))
      .logged("get_calculation", self.max_log_len)
  }

  fn cancel_calculation(&self, calculation_id: &str) -> ApiResponse<()> {
    let sent = self.agent.delete(&self.url(&format!("/calculations/{}", calculation_id))).call();
    ApiResponse::from(read_unit(sent)).logged("cancel_calculation", self.max_log_len)
  }
}
