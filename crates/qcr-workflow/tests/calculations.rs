mod common;

use common::{calculation, fixture, not_found, remote_dataset, server_error, SAMPLE_FILE_ID};
use qcr_client::stubs::{BackendCall, CallKind};
use qcr_client::{ApiResponse, CalculationStarted, RunStatus};
use qcr_domain::{DatasetRepository, SessionReference, SessionReferenceRepository, WorkKind};
use qcr_workflow::{FormValues, MessageLevel, RequestContext, SessionCookie, WorkFailure, WorkState};
use serde_json::json;

fn invoked(id: &str) -> ApiResponse<CalculationStarted> {
  ApiResponse::Success(CalculationStarted { calculation_id: id.to_string() })
}

#[test]
fn running_calculation_is_pending_without_side_effects() {
  let f = fixture();
  f.script_input_lookup()
   .on_invoke_command(invoked("c-1"))
   .on_get_calculation(ApiResponse::Success(calculation("c-1", RunStatus::Running, None)));

  let mut cookie = SessionCookie::default();
  let mut ctx = RequestContext::new(&f.actor, &mut cookie);
  let st = f.orchestrator
            .handle_command(&mut ctx, &f.catalog.batch, &f.dataset, &FormValues::new())
            .unwrap();

  assert_eq!(st.state, WorkState::Pending);
  assert!(st.calc_is_pending);
  assert_eq!(st.outfile_id, None);
  assert_eq!(cookie.calculation_id.as_deref(), Some("c-1"));
  assert!(f.domain.find_reference_by_session_id("c-1").unwrap().is_some());
  assert_eq!(f.domain.list_active_datasets().unwrap().len(), 1);
  assert_eq!(f.backend.count(CallKind::GetDataset), 1);

  let sent = f.backend
              .calls()
              .into_iter()
              .find_map(|c| match c {
                BackendCall::InvokeCommand(inv) => Some(inv),
                _ => None,
              })
              .expect("se invocó el comando");
  assert_eq!(sent.command_name, "refine");
  assert_eq!(sent.arguments["input_file"], json!({"data_file_id": SAMPLE_FILE_ID}));
  assert_eq!(sent.arguments["n_cycles"], json!(10));
  assert_eq!(sent.arguments["weighting"], json!(false));
  assert!(!sent.arguments.contains_key("output_name"));
}

#[test]
fn successful_calculation_creates_dataset_and_step() {
  let f = fixture();
  f.script_input_lookup()
   .on_invoke_command(invoked("c-1"))
   .on_get_calculation(ApiResponse::Success(calculation("c-1", RunStatus::Successful, Some("ds-out"))))
   .on_get_dataset(ApiResponse::Success(remote_dataset("ds-out", "sample.cif")));

  let form = FormValues::new().with_text("n_cycles", "5").with_text("weighting", "on");
  let mut cookie = SessionCookie::default();
  let mut ctx = RequestContext::new(&f.actor, &mut cookie);
  let st = f.orchestrator.handle_command(&mut ctx, &f.catalog.batch, &f.dataset, &form).unwrap();

  assert_eq!(st.state, WorkState::CompletedWithOutput);
  let created_id = st.outfile_id.expect("dataset creado");
  let created = f.domain.get_dataset(&created_id).unwrap().expect("registrado");
  assert_eq!(created.backend_id, "ds-out");
  assert_eq!(created.filename, "sample.cif");
  assert_eq!(created.display_filename, "sample(2).cif");
  assert_eq!(created.owner_id, Some(f.actor.id));

  let history = f.orchestrator.get_file_history(&created).unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].command_id, f.catalog.batch.id);
  assert_eq!(history[0].infile_id, Some(f.dataset.id));
  assert_eq!(history[0].parameters["n_cycles"], json!(5));
  assert_eq!(history[0].parameters["weighting"], json!(true));

  assert!(f.domain.find_reference_by_session_id("c-1").unwrap().is_none());
  assert!(cookie.calculation_id.is_none());
}

#[test]
fn failed_calculation_removes_reference_and_creates_nothing() {
  let f = fixture();
  f.script_input_lookup()
   .on_invoke_command(invoked("c-1"))
   .on_get_calculation(ApiResponse::Success(calculation("c-1", RunStatus::Failed, None)));

  let mut cookie = SessionCookie::default();
  let mut ctx = RequestContext::new(&f.actor, &mut cookie);
  let st = f.orchestrator
            .handle_command(&mut ctx, &f.catalog.batch, &f.dataset, &FormValues::new())
            .unwrap();

  assert_eq!(st.failure(), Some(&WorkFailure::CalculationFailed));
  assert!(f.domain.find_reference_by_session_id("c-1").unwrap().is_none());
  assert_eq!(f.domain.list_active_datasets().unwrap().len(), 1);
  assert!(cookie.calculation_id.is_none());
}

#[test]
fn poll_falls_back_to_stored_reference() {
  let f = fixture();
  let reference = SessionReference::new(f.actor.id,
                                        f.catalog.batch.id,
                                        f.catalog.application.id,
                                        "c-7",
                                        WorkKind::Calculation,
                                        Some(f.dataset.id),
                                        json!({}));
  f.domain.save_reference(reference).unwrap();
  f.backend
   .on_get_calculation(ApiResponse::Success(calculation("c-7", RunStatus::Submitted, None)));

  let mut cookie = SessionCookie::default();
  let mut ctx = RequestContext::new(&f.actor, &mut cookie);
  let st = f.orchestrator.poll_calculation(&mut ctx, &f.dataset, &f.catalog.batch).unwrap();

  assert_eq!(st.state, WorkState::Pending);
  assert_eq!(f.backend.calls(), vec![BackendCall::GetCalculation("c-7".into())]);
  assert!(f.domain.find_reference_by_session_id("c-7").unwrap().is_some());
}

#[test]
fn poll_of_unknown_calculation_settles_reference() {
  let f = fixture();
  let reference = SessionReference::new(f.actor.id,
                                        f.catalog.batch.id,
                                        f.catalog.application.id,
                                        "c-lost",
                                        WorkKind::Calculation,
                                        None,
                                        json!({}));
  f.domain.save_reference(reference).unwrap();
  f.backend.on_get_calculation(ApiResponse::Error(not_found()));

  let mut cookie = SessionCookie { app_session_id: None,
                                   calculation_id: Some("c-lost".into()) };
  let mut ctx = RequestContext::new(&f.actor, &mut cookie);
  let st = f.orchestrator.poll_calculation(&mut ctx, &f.dataset, &f.catalog.batch).unwrap();

  assert_eq!(st.state, WorkState::Idle);
  assert!(st.has_message(MessageLevel::Warning));
  assert!(f.domain.find_reference_by_session_id("c-lost").unwrap().is_none());
  assert!(cookie.calculation_id.is_none());
}

#[test]
fn poll_without_any_calculation_is_idle() {
  let f = fixture();
  let mut cookie = SessionCookie::default();
  let mut ctx = RequestContext::new(&f.actor, &mut cookie);
  let st = f.orchestrator.poll_calculation(&mut ctx, &f.dataset, &f.catalog.batch).unwrap();
  assert_eq!(st.state, WorkState::Idle);
  assert!(f.backend.calls().is_empty());
}

#[test]
fn output_fetch_failure_keeps_reference_for_next_poll() {
  let f = fixture();
  f.script_input_lookup()
   .on_invoke_command(invoked("c-1"))
   .on_get_calculation(ApiResponse::Success(calculation("c-1", RunStatus::Successful, Some("ds-out"))))
   .on_get_dataset(ApiResponse::Error(server_error()));

  let mut cookie = SessionCookie::default();
  let mut ctx = RequestContext::new(&f.actor, &mut cookie);
  let st = f.orchestrator
            .handle_command(&mut ctx, &f.catalog.batch, &f.dataset, &FormValues::new())
            .unwrap();

  assert!(matches!(st.failure(), Some(WorkFailure::Backend(_))));
  assert!(f.domain.find_reference_by_session_id("c-1").unwrap().is_some());
}

#[test]
fn cancel_removes_reference_even_if_backend_fails() {
  let f = fixture();
  let reference = SessionReference::new(f.actor.id,
                                        f.catalog.batch.id,
                                        f.catalog.application.id,
                                        "c-1",
                                        WorkKind::Calculation,
                                        Some(f.dataset.id),
                                        json!({}));
  f.domain.save_reference(reference).unwrap();
  f.backend.on_cancel_calculation(ApiResponse::Error(server_error()));

  let mut cookie = SessionCookie { app_session_id: None,
                                   calculation_id: Some("c-1".into()) };
  let mut ctx = RequestContext::new(&f.actor, &mut cookie);
  let st = f.orchestrator.cancel_calculation(&mut ctx).unwrap();

  assert_eq!(st.state, WorkState::Cancelled);
  assert!(st.has_message(MessageLevel::Warning));
  assert_eq!(f.backend.count(CallKind::CancelCalculation), 1);
  assert!(f.domain.find_reference_by_session_id("c-1").unwrap().is_none());
  assert!(cookie.calculation_id.is_none());
}

#[test]
fn validation_failure_reaches_no_backend() {
  let f = fixture();
  let form = FormValues::new().with_text("n_cycles", "500");
  let mut cookie = SessionCookie::default();
  let mut ctx = RequestContext::new(&f.actor, &mut cookie);
  let st = f.orchestrator.handle_command(&mut ctx, &f.catalog.batch, &f.dataset, &form).unwrap();

  assert!(matches!(st.failure(), Some(WorkFailure::Validation(_))));
  assert!(f.backend.calls().is_empty());
}

#[test]
fn unresolved_input_file_stops_before_invocation() {
  let f = fixture();
  f.backend.on_get_dataset(ApiResponse::Error(server_error()));

  let mut cookie = SessionCookie::default();
  let mut ctx = RequestContext::new(&f.actor, &mut cookie);
  let st = f.orchestrator
            .handle_command(&mut ctx, &f.catalog.batch, &f.dataset, &FormValues::new())
            .unwrap();

  assert!(matches!(st.failure(), Some(WorkFailure::Backend(_))));
  assert_eq!(f.backend.calls(), vec![BackendCall::GetDataset("qcrbox_ds_sample".into())]);
  assert!(f.domain.list_references().unwrap().is_empty());
  assert!(cookie.calculation_id.is_none());
}

#[test]
fn cookie_only_poll_records_step_without_parameters() {
  let f = fixture();
  f.backend
   .on_get_calculation(ApiResponse::Success(calculation("c-9", RunStatus::Successful, Some("ds-out"))))
   .on_get_dataset(ApiResponse::Success(remote_dataset("ds-out", "result.cif")));

  let mut cookie = SessionCookie { app_session_id: None,
                                   calculation_id: Some("c-9".into()) };
  let mut ctx = RequestContext::new(&f.actor, &mut cookie);
  let st = f.orchestrator.poll_calculation(&mut ctx, &f.dataset, &f.catalog.batch).unwrap();

  assert_eq!(st.state, WorkState::CompletedWithOutput);
  let created = f.domain.get_dataset(&st.outfile_id.expect("salida")).unwrap().expect("registrado");
  let history = f.orchestrator.get_file_history(&created).unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].command_id, f.catalog.batch.id);
  assert_eq!(history[0].infile_id, Some(f.dataset.id));
  assert_eq!(history[0].parameters, serde_json::Value::Null);
  assert!(cookie.calculation_id.is_none());
}
