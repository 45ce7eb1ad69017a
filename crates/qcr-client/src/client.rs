use crate::models::{BackendApplication, BackendCalculation, BackendDataset, BackendSession, CalculationStarted,
                    CommandInvocation, SessionStarted, UploadFile};
use crate::response::ApiResponse;

/// Operaciones que el orquestador necesita del backend. Cada llamada
/// devuelve un `ApiResponse`; ninguna entra en pánico ante errores remotos.
pub trait BackendClient: Send + Sync {
  /// Catálogo completo de aplicaciones con sus comandos y parámetros.
  fn list_applications(&self) -> ApiResponse<Vec<BackendApplication>>;

  fn upload_dataset(&self, file: &UploadFile) -> ApiResponse<BackendDataset>;

  /// Añade un fichero auxiliar a un dataset existente.
  fn append_to_dataset(&self, dataset_id: &str, file: &UploadFile) -> ApiResponse<BackendDataset>;

  fn get_dataset(&self, dataset_id: &str) -> ApiResponse<BackendDataset>;

  fn download_dataset(&self, dataset_id: &str) -> ApiResponse<Vec<u8>>;

  fn delete_dataset(&self, dataset_id: &str) -> ApiResponse<()>;

  fn create_interactive_session(&self, invocation: &CommandInvocation) -> ApiResponse<SessionStarted>;

  fn get_interactive_session(&self, session_id: &str) -> ApiResponse<BackendSession>;

  /// Cierra la sesión; el estado devuelto indica si el cierre fue limpio y si
  /// se produjo un dataset de salida.
  fn close_interactive_session(&self, session_id: &str) -> ApiResponse<BackendSession>;

  fn invoke_command(&self, invocation: &CommandInvocation) -> ApiResponse<CalculationStarted>;

  fn get_calculation(&self, calculation_id: &str) -> ApiResponse<BackendCalculation>;

  fn cancel_calculation(&self, calculation_id: &str) -> ApiResponse<()>;
}
