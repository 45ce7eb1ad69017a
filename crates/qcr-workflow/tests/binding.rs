mod common;

use common::{fixture, not_found, remote_dataset, server_error, SAMPLE_FILE_ID};
use flow::{FlowEngine, InMemoryStepRepository, StepRepository};
use qcr_client::stubs::{BackendCall, CallKind};
use qcr_client::{ApiResponse, UploadFile};
use qcr_domain::{Command, Dataset, DatasetRepository, ParameterSpec, ValidationRule};
use qcr_workflow::{FormValues, ParameterBinder, WorkFailure};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

fn lineage() -> FlowEngine<dyn StepRepository> {
  let steps: Arc<dyn StepRepository> = Arc::new(InMemoryStepRepository::new());
  FlowEngine::new(steps)
}

fn command(parameters: Vec<ParameterSpec>) -> Command {
  Command::new(Uuid::new_v4(), "refine", false, parameters)
}

#[test]
fn omitted_boolean_binds_false_and_primary_dataset_is_forced() {
  let f = fixture();
  let lineage = lineage();
  let binder = ParameterBinder::new(f.backend.as_ref(), f.domain.as_ref(), &lineage);
  let form = FormValues::new().with_text("input_file", "some-other-dataset");
  f.script_input_lookup();

  let args = binder.bind(&f.catalog.batch, &f.dataset, &form).unwrap().expect("ligado");

  assert_eq!(args["input_file"], json!({"data_file_id": SAMPLE_FILE_ID}));
  assert_eq!(f.backend.calls(), vec![BackendCall::GetDataset("qcrbox_ds_sample".into())]);
  assert_eq!(args["weighting"], json!(false));
  let names: Vec<&str> = args.keys().map(String::as_str).collect();
  assert_eq!(names, vec!["input_file", "n_cycles", "weighting"]);
}

#[test]
fn later_dataset_reference_must_come_from_ancestry() {
  let f = fixture();
  let lineage = lineage();
  let root = Dataset::new("ds-root", "root.cif", "root.cif", None, f.group_id, None);
  let stranger = Dataset::new("ds-other", "other.cif", "other.cif", None, f.group_id, None);
  f.domain.save_dataset(root.clone()).unwrap();
  f.domain.save_dataset(stranger.clone()).unwrap();
  lineage.record_step(Uuid::new_v4(), Some(root.id), f.dataset.id, json!({})).unwrap();

  let cmd = command(vec![ParameterSpec::new("input_file", "QCrBox.data_file", true),
                         ParameterSpec::new("reference_file", "QCrBox.data_file", true)]);
  let binder = ParameterBinder::new(f.backend.as_ref(), f.domain.as_ref(), &lineage);

  let form = FormValues::new().with_text("reference_file", root.id.to_string());
  f.script_input_lookup();
  f.backend.on_get_dataset(ApiResponse::Success(remote_dataset("ds-root", "root.cif")));
  let args = binder.bind(&cmd, &f.dataset, &form).unwrap().expect("ancestro válido");
  assert_eq!(args["input_file"], json!({"data_file_id": SAMPLE_FILE_ID}));
  assert_eq!(args["reference_file"], json!({"data_file_id": "ds-root-file"}));

  let by_backend_id = FormValues::new().with_text("reference_file", "ds-root");
  f.script_input_lookup();
  f.backend.on_get_dataset(ApiResponse::Success(remote_dataset("ds-root", "root.cif")));
  assert!(binder.bind(&cmd, &f.dataset, &by_backend_id).unwrap().is_ok());

  let form = FormValues::new().with_text("reference_file", stranger.id.to_string());
  let outcome = binder.bind(&cmd, &f.dataset, &form).unwrap();
  assert!(matches!(outcome, Err(WorkFailure::Validation(_))));
  assert_eq!(f.backend.count(CallKind::GetDataset), 4);
}

#[test]
fn auxiliary_upload_is_appended_and_keeps_declared_order() {
  let f = fixture();
  let lineage = lineage();
  f.script_input_lookup()
   .on_append_to_dataset(ApiResponse::Success(remote_dataset("ds-appended", "data.hkl")));
  let cmd = command(vec![ParameterSpec::new("input_file", "QCrBox.data_file", true),
                         ParameterSpec::new("hkl_file", "QCrBox.upload", true),
                         ParameterSpec::new("label", "str", false)]);
  let binder = ParameterBinder::new(f.backend.as_ref(), f.domain.as_ref(), &lineage);
  let form = FormValues::new().with_upload("hkl_file", UploadFile::new("data.hkl", b"h k l".to_vec()))
                              .with_text("label", "first run");

  let args = binder.bind(&cmd, &f.dataset, &form).unwrap().expect("ligado");

  assert_eq!(args["input_file"], json!({"data_file_id": SAMPLE_FILE_ID}));
  assert_eq!(args["hkl_file"], json!({"data_file_id": "ds-appended-file"}));
  assert_eq!(args["label"], json!("first run"));
  let names: Vec<&str> = args.keys().map(String::as_str).collect();
  assert_eq!(names, vec!["input_file", "hkl_file", "label"]);
  assert_eq!(f.backend.count(CallKind::AppendToDataset), 1);
}

#[test]
fn invalid_form_makes_no_upload() {
  let f = fixture();
  let lineage = lineage();
  let cmd = command(vec![ParameterSpec::new("input_file", "QCrBox.data_file", true),
                         ParameterSpec::new("hkl_file", "QCrBox.upload", true),
                         ParameterSpec::new("n_cycles", "int", true)]);
  let binder = ParameterBinder::new(f.backend.as_ref(), f.domain.as_ref(), &lineage);
  let form = FormValues::new().with_upload("hkl_file", UploadFile::new("data.hkl", b"x".to_vec()))
                              .with_text("n_cycles", "many");

  let outcome = binder.bind(&cmd, &f.dataset, &form).unwrap();

  assert!(matches!(outcome, Err(WorkFailure::Validation(_))));
  assert!(f.backend.calls().is_empty());
}

#[test]
fn upload_failure_aborts_submission() {
  let f = fixture();
  let lineage = lineage();
  f.script_input_lookup().on_append_to_dataset(ApiResponse::Error(server_error()));
  let cmd = command(vec![ParameterSpec::new("input_file", "QCrBox.data_file", true),
                         ParameterSpec::new("hkl_file", "QCrBox.upload", true)]);
  let binder = ParameterBinder::new(f.backend.as_ref(), f.domain.as_ref(), &lineage);
  let form = FormValues::new().with_upload("hkl_file", UploadFile::new("data.hkl", b"x".to_vec()));

  let outcome = binder.bind(&cmd, &f.dataset, &form).unwrap();
  assert!(matches!(outcome, Err(WorkFailure::UploadFailed(_))));
}

#[test]
fn output_paths_and_rules() {
  let f = fixture();
  let lineage = lineage();
  let cmd = command(vec![ParameterSpec::new("input_file", "QCrBox.data_file", true),
                         ParameterSpec::new("output_name", "QCrBox.output_path", false),
                         ParameterSpec::new("mode", "str", false).with_validation(ValidationRule::Choice { choices: vec![json!("fast"),
                                                                                                                        json!("full")] })
                                                                 .with_default(json!("fast"))]);
  let binder = ParameterBinder::new(f.backend.as_ref(), f.domain.as_ref(), &lineage);

  let form = FormValues::new().with_text("output_name", "../tmp/out.cif");
  f.script_input_lookup();
  let args = binder.bind(&cmd, &f.dataset, &form).unwrap().expect("ligado");
  assert_eq!(args["output_name"], json!("..tmpout.cif"));
  assert_eq!(args["mode"], json!("fast"));

  let form = FormValues::new().with_text("mode", "slow");
  assert!(matches!(binder.bind(&cmd, &f.dataset, &form).unwrap(), Err(WorkFailure::Validation(_))));
}

#[test]
fn dataset_reference_needs_file_lookup_before_submission() {
  let f = fixture();
  let lineage = lineage();
  f.backend.on_get_dataset(ApiResponse::Error(not_found()));
  let binder = ParameterBinder::new(f.backend.as_ref(), f.domain.as_ref(), &lineage);
  let form = FormValues::new().with_upload("hkl_file", UploadFile::new("data.hkl", b"x".to_vec()));
  let cmd = command(vec![ParameterSpec::new("input_file", "QCrBox.data_file", true),
                         ParameterSpec::new("hkl_file", "QCrBox.upload", true)]);

  let outcome = binder.bind(&cmd, &f.dataset, &form).unwrap();

  assert!(matches!(outcome, Err(WorkFailure::Backend(e)) if e.is_not_found()));
  assert_eq!(f.backend.count(CallKind::AppendToDataset), 0);
}

#[test]
fn dataset_without_its_file_is_a_backend_failure() {
  let f = fixture();
  let lineage = lineage();
  f.backend.on_get_dataset(ApiResponse::Success(remote_dataset("qcrbox_ds_sample", "renamed.cif")));
  let binder = ParameterBinder::new(f.backend.as_ref(), f.domain.as_ref(), &lineage);

  let outcome = binder.bind(&f.catalog.batch, &f.dataset, &FormValues::new()).unwrap();

  assert!(matches!(outcome, Err(WorkFailure::Backend(_))));
}

#[test]
fn file_ids_are_sent_without_lookup() {
  let f = fixture();
  let lineage = lineage();
  let direct = Dataset::new("ds-7_df", "direct.cif", "direct.cif", None, f.group_id, None);
  f.domain.save_dataset(direct.clone()).unwrap();
  let binder = ParameterBinder::new(f.backend.as_ref(), f.domain.as_ref(), &lineage);

  let args = binder.bind(&f.catalog.batch, &direct, &FormValues::new()).unwrap().expect("ligado");

  assert_eq!(args["input_file"], json!({"data_file_id": "ds-7_df"}));
  assert!(f.backend.calls().is_empty());
}
