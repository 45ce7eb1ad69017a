// Implementación de `flow::StepRepository` sobre el mismo pool que el resto
// de repositorios.
use crate::domain_persistence::{from_millis, parse_uuid, to_millis, DieselRepository};
use crate::schema;
use diesel::prelude::*;
use flow::{FlowError, ProcessStep, StepRepository};
use uuid::Uuid;

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::process_steps)]
struct StepRow {
  pub id: String,
  pub command_id: String,
  pub infile_id: Option<String>,
  pub outfile_id: String,
  pub parameters: String,
  pub created_at_ts: i64,
}

impl StepRow {
  fn from_domain(s: &ProcessStep) -> flow::Result<Self> {
    Ok(Self { id: s.id.to_string(),
              command_id: s.command_id.to_string(),
              infile_id: s.infile_id.map(|u| u.to_string()),
              outfile_id: s.outfile_id.to_string(),
              parameters: serde_json::to_string(&s.parameters).map_err(|e| FlowError::Corrupt(e.to_string()))?,
              created_at_ts: to_millis(&s.created_at) })
  }

  fn into_domain(self) -> flow::Result<ProcessStep> {
    let corrupt = |e: qcr_domain::DomainError| FlowError::Corrupt(e.to_string());
    Ok(ProcessStep { id: parse_uuid(&self.id).map_err(corrupt)?,
                     command_id: parse_uuid(&self.command_id).map_err(corrupt)?,
                     infile_id: self.infile_id.as_deref().map(parse_uuid).transpose().map_err(corrupt)?,
                     outfile_id: parse_uuid(&self.outfile_id).map_err(corrupt)?,
                     parameters: serde_json::from_str(&self.parameters).map_err(|e| FlowError::Corrupt(e.to_string()))?,
                     created_at: from_millis(self.created_at_ts).map_err(corrupt)? })
  }
}

fn map_flow_err<T>(res: std::result::Result<T, diesel::result::Error>) -> flow::Result<T> {
  res.map_err(|e| FlowError::Storage(format!("db: {}", e)))
}

impl StepRepository for DieselRepository {
  fn append_step(&self, step: &ProcessStep) -> flow::Result<Uuid> {
    use schema::process_steps::dsl::*;
    let mut conn = self.conn_raw().map_err(|e| FlowError::Storage(format!("pool: {}", e)))?;
    let row = StepRow::from_domain(step)?;
    map_flow_err(diesel::insert_into(process_steps).values(&row).execute(&mut conn))?;
    Ok(step.id)
  }

  fn get_step(&self, step_id: &Uuid) -> flow::Result<Option<ProcessStep>> {
    use schema::process_steps::dsl::*;
    let mut conn = self.conn_raw().map_err(|e| FlowError::Storage(format!("pool: {}", e)))?;
    let row = map_flow_err(process_steps.filter(id.eq(step_id.to_string()))
                                        .first::<StepRow>(&mut conn)
                                        .optional())?;
    row.map(StepRow::into_domain).transpose()
  }

  fn find_step_by_output(&self, dataset_id: &Uuid) -> flow::Result<Option<ProcessStep>> {
    use schema::process_steps::dsl::*;
    let mut conn = self.conn_raw().map_err(|e| FlowError::Storage(format!("pool: {}", e)))?;
    let row = map_flow_err(process_steps.filter(outfile_id.eq(dataset_id.to_string()))
                                        .order(created_at_ts.asc())
                                        .first::<StepRow>(&mut conn)
                                        .optional())?;
    row.map(StepRow::into_domain).transpose()
  }

  fn find_steps_by_input(&self, dataset_id: &Uuid) -> flow::Result<Vec<ProcessStep>> {
    use schema::process_steps::dsl::*;
    let mut conn = self.conn_raw().map_err(|e| FlowError::Storage(format!("pool: {}", e)))?;
    let rows = map_flow_err(process_steps.filter(infile_id.eq(dataset_id.to_string()))
                                         .order(created_at_ts.asc())
                                         .load::<StepRow>(&mut conn))?;
    rows.into_iter().map(StepRow::into_domain).collect()
  }

  fn list_steps(&self) -> flow::Result<Vec<ProcessStep>> {
    use schema::process_steps::dsl::*;
    let mut conn = self.conn_raw().map_err(|e| FlowError::Storage(format!("pool: {}", e)))?;
    let rows = map_flow_err(process_steps.order(created_at_ts.asc()).load::<StepRow>(&mut conn))?;
    rows.into_iter().map(StepRow::into_domain).collect()
  }
}
