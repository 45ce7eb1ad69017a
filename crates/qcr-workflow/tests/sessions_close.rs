mod common;

use common::{fixture, not_found, remote_dataset, session, Fixture};
use qcr_client::stubs::CallKind;
use qcr_client::{ApiResponse, RunStatus};
use qcr_domain::{DatasetRepository, SessionReference, SessionReferenceRepository, WorkKind};
use qcr_workflow::{FormValues, MessageLevel, RequestContext, SessionCookie, WorkFailure, WorkState};
use serde_json::json;

fn open_session(f: &Fixture, id: &str) -> SessionCookie {
  let reference = SessionReference::new(f.actor.id,
                                        f.catalog.interactive.id,
                                        f.catalog.application.id,
                                        id,
                                        WorkKind::Interactive,
                                        Some(f.dataset.id),
                                        json!({"input_file": {"data_file_id": "qcrbox_ds_sample"}}));
  f.domain.save_reference(reference).unwrap();
  SessionCookie { app_session_id: Some(id.to_string()),
                  calculation_id: None }
}

#[test]
fn close_requires_browser_reference() {
  let f = fixture();
  // existe referencia persistida pero el navegador no la tiene
  let _ = open_session(&f, "s-1");
  let mut cookie = SessionCookie::default();
  let mut ctx = RequestContext::new(&f.actor, &mut cookie);
  let st = f.orchestrator.close_session(&mut ctx, &f.catalog.interactive, &f.dataset).unwrap();

  assert_eq!(st.failure(), Some(&WorkFailure::MissingBrowserReference));
  assert!(f.backend.calls().is_empty());
  assert!(f.domain.find_reference_by_session_id("s-1").unwrap().is_some());
}

#[test]
fn close_with_output_creates_dataset_and_step() {
  let f = fixture();
  let mut cookie = open_session(&f, "s-1");
  f.backend
   .on_close_interactive_session(ApiResponse::Success(session("s-1", RunStatus::Successful, Some("ds-edit"))))
   .on_get_dataset(ApiResponse::Success(remote_dataset("ds-edit", "edited.cif")));

  let mut ctx = RequestContext::new(&f.actor, &mut cookie);
  let st = f.orchestrator.close_session(&mut ctx, &f.catalog.interactive, &f.dataset).unwrap();

  assert_eq!(st.state, WorkState::CompletedWithOutput);
  assert!(!st.has_message(MessageLevel::Warning));
  let created = f.domain.get_dataset(&st.outfile_id.unwrap()).unwrap().unwrap();
  assert_eq!(created.display_filename, "edited.cif");
  let history = f.orchestrator.get_file_history(&created).unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].command_id, f.catalog.interactive.id);
  assert_eq!(history[0].parameters, json!({"input_file": {"data_file_id": "qcrbox_ds_sample"}}));
  assert!(f.domain.find_reference_by_session_id("s-1").unwrap().is_none());
  assert!(cookie.app_session_id.is_none());
}

#[test]
fn close_without_output_is_a_normal_outcome() {
  let f = fixture();
  let mut cookie = open_session(&f, "s-1");
  f.backend
   .on_close_interactive_session(ApiResponse::Success(session("s-1", RunStatus::Successful, None)));

  let mut ctx = RequestContext::new(&f.actor, &mut cookie);
  let st = f.orchestrator.close_session(&mut ctx, &f.catalog.interactive, &f.dataset).unwrap();

  assert_eq!(st.state, WorkState::CompletedNoOutput);
  assert!(!st.is_failed());
  assert_eq!(f.backend.count(CallKind::GetDataset), 0);
  assert!(f.domain.find_reference_by_session_id("s-1").unwrap().is_none());
}

#[test]
fn forced_close_adds_warning() {
  let f = fixture();
  let mut cookie = open_session(&f, "s-1");
  f.backend
   .on_close_interactive_session(ApiResponse::Success(session("s-1", RunStatus::Failed, None)));

  let mut ctx = RequestContext::new(&f.actor, &mut cookie);
  let st = f.orchestrator.close_session(&mut ctx, &f.catalog.interactive, &f.dataset).unwrap();

  assert_eq!(st.state, WorkState::CompletedNoOutput);
  assert!(st.has_message(MessageLevel::Warning));
  assert!(f.domain.find_reference_by_session_id("s-1").unwrap().is_none());
}

#[test]
fn stale_session_is_settled() {
  let f = fixture();
  let mut cookie = open_session(&f, "s-1");
  f.backend.on_close_interactive_session(ApiResponse::Error(not_found()));

  let mut ctx = RequestContext::new(&f.actor, &mut cookie);
  let st = f.orchestrator.close_session(&mut ctx, &f.catalog.interactive, &f.dataset).unwrap();

  assert_eq!(st.state, WorkState::Idle);
  assert!(f.domain.find_reference_by_session_id("s-1").unwrap().is_none());
  assert!(cookie.app_session_id.is_none());
}

#[test]
fn end_session_submission_closes_instead_of_starting() {
  let f = fixture();
  let mut cookie = open_session(&f, "s-1");
  f.backend
   .on_close_interactive_session(ApiResponse::Success(session("s-1", RunStatus::Successful, None)));

  let mut ctx = RequestContext::new(&f.actor, &mut cookie);
  let form = FormValues::new().ending_session();
  let st = f.orchestrator.handle_command(&mut ctx, &f.catalog.interactive, &f.dataset, &form).unwrap();

  assert_eq!(st.state, WorkState::CompletedNoOutput);
  assert_eq!(f.backend.count(CallKind::CreateInteractiveSession), 0);
  assert_eq!(f.backend.count(CallKind::CloseInteractiveSession), 1);
  assert_eq!(f.domain.list_active_datasets().unwrap().len(), 1);
}
