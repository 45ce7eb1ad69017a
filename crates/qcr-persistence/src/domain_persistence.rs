use crate::schema;
use chrono::{DateTime, TimeZone, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::Error as DieselError;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use qcr_domain::{Application, CatalogRepository, Command, Dataset, DatasetRepository, DomainError, ParameterSpec,
                 SessionReference, SessionReferenceRepository, ValidationRule, WorkKind};
use std::sync::Arc;
use uuid::Uuid;
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");
#[cfg(feature = "pg")]
pub(crate) type DbConn = PgConnection;
#[cfg(not(feature = "pg"))]
pub(crate) type DbConn = SqliteConnection;
type DbPool = Pool<ConnectionManager<DbConn>>;
/// Repositorio Diesel que implementa todos los contratos de persistencia.
#[derive(Clone)]
pub struct DieselRepository {
  pool: Arc<DbPool>,
}
impl DieselRepository {
  /// Crea el pool y aplica las migraciones pendientes.
  pub fn new(database_url: &str) -> Result<Self, DomainError> {
    let manager = ConnectionManager::<DbConn>::new(database_url);
    let pool = Pool::builder().max_size(4)
                              .build(manager)
                              .map_err(|e| DomainError::StorageError(format!("pool: {}", e)))?;
    let repo = DieselRepository { pool: Arc::new(pool) };
    let mut c = repo.conn()?;
    #[cfg(not(feature = "pg"))]
    {
      let _ = diesel::sql_query("PRAGMA journal_mode = WAL;").execute(&mut c);
      let _ = diesel::sql_query("PRAGMA busy_timeout = 5000;").execute(&mut c);
    }
    c.run_pending_migrations(MIGRATIONS)
     .map_err(|e| DomainError::StorageError(format!("migraciones: {}", e)))?;
    Ok(repo)
  }
  pub(crate) fn conn_raw(&self) -> std::result::Result<PooledConnection<ConnectionManager<DbConn>>, r2d2::Error> {
    self.pool.get()
  }
  fn conn(&self) -> Result<PooledConnection<ConnectionManager<DbConn>>, DomainError> {
    self.conn_raw().map_err(|e| DomainError::StorageError(format!("pool: {}", e)))
  }
}
/// Abre el repositorio indicado por `QCR_DB_URL` (o `DATABASE_URL`).
#[cfg(feature = "pg")]
pub fn new_from_env() -> Result<DieselRepository, DomainError> {
  dotenvy::dotenv().ok();
  let url = std::env::var("QCR_DB_URL").or_else(|_| std::env::var("DATABASE_URL"))
                                       .map_err(|_| DomainError::StorageError("QCR_DB_URL / DATABASE_URL no definida".into()))?;
  let l = url.to_lowercase();
  if !(l.starts_with("postgres://") || l.starts_with("postgresql://")) {
    return Err(DomainError::StorageError("QCR_DB_URL no parece una URL de Postgres".into()));
  }
  DieselRepository::new(&url)
}
/// Abre el repositorio indicado por `QCR_DB_URL` (o `DATABASE_URL`); sin
/// ninguna de las dos usa el fichero `qcrflow.db`.
#[cfg(not(feature = "pg"))]
pub fn new_from_env() -> Result<DieselRepository, DomainError> {
  dotenvy::dotenv().ok();
  let url = std::env::var("QCR_DB_URL").or_else(|_| std::env::var("DATABASE_URL"))
                                       .unwrap_or_else(|_| "qcrflow.db".into());
  log::info!("Usando base de datos SQLite en {}", url);
  DieselRepository::new(&url)
}
/// Repositorio SQLite sobre `database_url` (normalmente un fichero temporal).
#[cfg(not(feature = "pg"))]
pub fn new_sqlite_for_test(database_url: &str) -> Result<DieselRepository, DomainError> {
  DieselRepository::new(database_url)
}
// Filas Diesel. El orden de los campos sigue al de `schema.rs`.
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::datasets)]
struct DatasetRow {
  pub id: String,
  pub backend_id: String,
  pub filename: String,
  pub display_filename: String,
  pub owner_id: Option<String>,
  pub group_id: String,
  pub filetype: Option<String>,
  pub created_at_ts: i64,
  pub active: bool,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::applications)]
struct ApplicationRow {
  pub id: String,
  pub name: String,
  pub version: String,
  pub slug: String,
  pub url: Option<String>,
  pub description: Option<String>,
  pub port: Option<i32>,
  pub active: bool,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::commands)]
struct CommandRow {
  pub id: String,
  pub application_id: String,
  pub name: String,
  pub description: Option<String>,
  pub interactive: bool,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::command_parameters)]
struct ParameterRow {
  pub id: String,
  pub command_id: String,
  pub position: i32,
  pub name: String,
  pub dtype: String,
  pub description: Option<String>,
  pub required: bool,
  pub default_value: Option<String>,
  pub validation: Option<String>,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::session_references)]
struct ReferenceRow {
  pub id: String,
  pub user_id: String,
  pub command_id: String,
  pub application_id: String,
  pub session_id: String,
  pub kind: String,
  pub dataset_id: Option<String>,
  pub parameters: String,
  pub start_time_ts: i64,
}
fn map_db_err<T>(res: std::result::Result<T, DieselError>) -> Result<T, DomainError> {
  res.map_err(|e| DomainError::StorageError(format!("db: {}", e)))
}
pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, DomainError> {
  Ok(Uuid::parse_str(s)?)
}
fn parse_opt_uuid(s: Option<&str>) -> Result<Option<Uuid>, DomainError> {
  s.map(parse_uuid).transpose()
}
pub(crate) fn to_millis(ts: &DateTime<Utc>) -> i64 {
  ts.timestamp_millis()
}
pub(crate) fn from_millis(ms: i64) -> Result<DateTime<Utc>, DomainError> {
  Utc.timestamp_millis_opt(ms)
     .single()
     .ok_or_else(|| DomainError::SerializationError(format!("instante fuera de rango: {}", ms)))
}
impl DatasetRow {
  fn from_domain(d: &Dataset) -> Self {
    Self { id: d.id.to_string(),
           backend_id: d.backend_id.clone(),
           filename: d.filename.clone(),
           display_filename: d.display_filename.clone(),
           owner_id: d.owner_id.map(|u| u.to_string()),
           group_id: d.group_id.to_string(),
           filetype: d.filetype.clone(),
           created_at_ts: to_millis(&d.created_at),
           active: d.active }
  }
  fn into_domain(self) -> Result<Dataset, DomainError> {
    Ok(Dataset { id: parse_uuid(&self.id)?,
                 backend_id: self.backend_id,
                 filename: self.filename,
                 display_filename: self.display_filename,
                 owner_id: parse_opt_uuid(self.owner_id.as_deref())?,
                 group_id: parse_uuid(&self.group_id)?,
                 filetype: self.filetype,
                 created_at: from_millis(self.created_at_ts)?,
                 active: self.active })
  }
}
impl ApplicationRow {
  fn from_domain(a: &Application) -> Self {
    Self { id: a.id.to_string(),
           name: a.name.clone(),
           version: a.version.clone(),
           slug: a.slug.clone(),
           url: a.url.clone(),
           description: a.description.clone(),
           port: a.port,
           active: a.active }
  }
  fn into_domain(self) -> Result<Application, DomainError> {
    Ok(Application { id: parse_uuid(&self.id)?,
                     name: self.name,
                     version: self.version,
                     slug: self.slug,
                     url: self.url,
                     description: self.description,
                     port: self.port,
                     active: self.active })
  }
}
impl ParameterRow {
  fn from_domain(command_id: &str, position: i32, p: &ParameterSpec) -> Result<Self, DomainError> {
    let default_value = p.default.as_ref().map(serde_json::to_string).transpose()?;
    let validation = p.validation.as_ref().map(serde_json::to_string).transpose()?;
    Ok(Self { id: Uuid::new_v4().to_string(),
              command_id: command_id.to_string(),
              position,
              name: p.name.clone(),
              dtype: p.dtype.clone(),
              description: p.description.clone(),
              required: p.required,
              default_value,
              validation })
  }
  fn into_domain(self) -> Result<ParameterSpec, DomainError> {
    let default = self.default_value.as_deref().map(serde_json::from_str).transpose()?;
    let validation = self.validation
                         .as_deref()
                         .map(serde_json::from_str::<ValidationRule>)
                         .transpose()?;
    Ok(ParameterSpec { name: self.name,
                       dtype: self.dtype,
                       description: self.description,
                       required: self.required,
                       default,
                       validation })
  }
}
impl ReferenceRow {
  fn from_domain(r: &SessionReference) -> Result<Self, DomainError> {
    Ok(Self { id: r.id.to_string(),
              user_id: r.user_id.to_string(),
              command_id: r.command_id.to_string(),
              application_id: r.application_id.to_string(),
              session_id: r.session_id.clone(),
              kind: r.kind.as_str().to_string(),
              dataset_id: r.dataset_id.map(|u| u.to_string()),
              parameters: serde_json::to_string(&r.parameters)?,
              start_time_ts: to_millis(&r.start_time) })
  }
  fn into_domain(self) -> Result<SessionReference, DomainError> {
    Ok(SessionReference { id: parse_uuid(&self.id)?,
                          user_id: parse_uuid(&self.user_id)?,
                          command_id: parse_uuid(&self.command_id)?,
                          application_id: parse_uuid(&self.application_id)?,
                          session_id: self.session_id,
                          kind: self.kind.parse::<WorkKind>()?,
                          dataset_id: parse_opt_uuid(self.dataset_id.as_deref())?,
                          parameters: serde_json::from_str(&self.parameters)?,
                          start_time: from_millis(self.start_time_ts)? })
  }
}
impl DieselRepository {
  fn load_command(&self, conn: &mut DbConn, row: CommandRow) -> Result<Command, DomainError> {
    use schema::command_parameters::dsl as p;
    let params = map_db_err(p::command_parameters.filter(p::command_id.eq(&row.id))
                                                 .order(p::position.asc())
                                                 .load::<ParameterRow>(conn))?;
    let parameters = params.into_iter()
                           .map(ParameterRow::into_domain)
                           .collect::<Result<Vec<_>, _>>()?;
    Ok(Command { id: parse_uuid(&row.id)?,
                 application_id: parse_uuid(&row.application_id)?,
                 name: row.name,
                 description: row.description,
                 interactive: row.interactive,
                 parameters })
  }
}
impl DatasetRepository for DieselRepository {
  fn save_dataset(&self, dataset: Dataset) -> Result<Uuid, DomainError> {
    use schema::datasets::dsl::*;
    let mut conn = self.conn()?;
    let row = DatasetRow::from_domain(&dataset);
    let updated = map_db_err(diesel::update(datasets.filter(id.eq(&row.id))).set((backend_id.eq(&row.backend_id),
                                                                                    filename.eq(&row.filename),
                                                                                    display_filename.eq(&row.display_filename),
                                                                                    owner_id.eq(row.owner_id.clone()),
                                                                                    group_id.eq(&row.group_id),
                                                                                    filetype.eq(row.filetype.clone()),
                                                                                    created_at_ts.eq(row.created_at_ts),
                                                                                    active.eq(row.active)))
                                                                              .execute(&mut conn))?;
    if updated == 0 {
      map_db_err(diesel::insert_into(datasets).values(&row).execute(&mut conn))?;
    }
    Ok(dataset.id)
  }
  fn get_dataset(&self, dataset_id: &Uuid) -> Result<Option<Dataset>, DomainError> {
    use schema::datasets::dsl::*;
    let mut conn = self.conn()?;
    let row = map_db_err(datasets.filter(id.eq(dataset_id.to_string()))
                                 .first::<DatasetRow>(&mut conn)
                                 .optional())?;
    row.map(DatasetRow::into_domain).transpose()
  }
  fn find_dataset_by_backend_id(&self, wanted: &str) -> Result<Option<Dataset>, DomainError> {
    use schema::datasets::dsl::*;
    let mut conn = self.conn()?;
    let row = map_db_err(datasets.filter(backend_id.eq(wanted))
                                 .order(created_at_ts.asc())
                                 .first::<DatasetRow>(&mut conn)
                                 .optional())?;
    row.map(DatasetRow::into_domain).transpose()
  }
  fn list_active_datasets(&self) -> Result<Vec<Dataset>, DomainError> {
    use schema::datasets::dsl::*;
    let mut conn = self.conn()?;
    let rows = map_db_err(datasets.filter(active.eq(true))
                                  .order(created_at_ts.asc())
                                  .load::<DatasetRow>(&mut conn))?;
    rows.into_iter().map(DatasetRow::into_domain).collect()
  }
  fn set_dataset_active(&self, dataset_id: &Uuid, flag: bool) -> Result<(), DomainError> {
    use schema::datasets::dsl::*;
    let mut conn = self.conn()?;
    let n = map_db_err(diesel::update(datasets.filter(id.eq(dataset_id.to_string()))).set(active.eq(flag))
                                                                                     .execute(&mut conn))?;
    if n == 0 {
      return Err(DomainError::NotFound(format!("dataset {}", dataset_id)));
    }
    Ok(())
  }
  fn active_display_filenames(&self) -> Result<Vec<String>, DomainError> {
    use schema::datasets::dsl::*;
    let mut conn = self.conn()?;
    map_db_err(datasets.filter(active.eq(true)).select(display_filename).load::<String>(&mut conn))
  }
}
impl CatalogRepository for DieselRepository {
  fn list_applications(&self) -> Result<Vec<Application>, DomainError> {
    use schema::applications::dsl::*;
    let mut conn = self.conn()?;
    let rows = map_db_err(applications.order((name.asc(), version.asc())).load::<ApplicationRow>(&mut conn))?;
    rows.into_iter().map(ApplicationRow::into_domain).collect()
  }
  fn get_application(&self, app_id: &Uuid) -> Result<Option<Application>, DomainError> {
    use schema::applications::dsl::*;
    let mut conn = self.conn()?;
    let row = map_db_err(applications.filter(id.eq(app_id.to_string()))
                                     .first::<ApplicationRow>(&mut conn)
                                     .optional())?;
    row.map(ApplicationRow::into_domain).transpose()
  }
  fn save_application(&self, application: Application) -> Result<Uuid, DomainError> {
    use schema::applications::dsl::*;
    let mut conn = self.conn()?;
    let row = ApplicationRow::from_domain(&application);
    let updated = map_db_err(diesel::update(applications.filter(id.eq(&row.id))).set((name.eq(&row.name),
                                                                                        version.eq(&row.version),
                                                                                        slug.eq(&row.slug),
                                                                                        url.eq(row.url.clone()),
                                                                                        description.eq(row.description.clone()),
                                                                                        port.eq(row.port),
                                                                                        active.eq(row.active)))
                                                                                  .execute(&mut conn))?;
    if updated == 0 {
      map_db_err(diesel::insert_into(applications).values(&row).execute(&mut conn))?;
    }
    Ok(application.id)
  }
  fn save_command(&self, command: Command) -> Result<Uuid, DomainError> {
    use schema::command_parameters::dsl as p;
    use schema::commands::dsl as c;
    if self.get_application(&command.application_id)?.is_none() {
      return Err(DomainError::ValidationError(format!("El comando {} apunta a una aplicación inexistente",
                                                      command.name)));
    }
    let cmd_id = command.id.to_string();
    let row = CommandRow { id: cmd_id.clone(),
                           application_id: command.application_id.to_string(),
                           name: command.name.clone(),
                           description: command.description.clone(),
                           interactive: command.interactive };
    let params = command.parameters
                        .iter()
                        .enumerate()
                        .map(|(i, spec)| ParameterRow::from_domain(&cmd_id, i as i32, spec))
                        .collect::<Result<Vec<_>, _>>()?;
    let mut pooled = self.conn()?;
    let conn: &mut DbConn = &mut pooled;
    map_db_err(conn.transaction::<_, DieselError, _>(|conn| {
                     diesel::delete(p::command_parameters.filter(p::command_id.eq(&cmd_id))).execute(conn)?;
                     diesel::delete(c::commands.filter(c::id.eq(&cmd_id))).execute(conn)?;
                     diesel::insert_into(c::commands).values(&row).execute(conn)?;
                     for param in &params {
                       diesel::insert_into(p::command_parameters).values(param).execute(conn)?;
                     }
                     Ok(())
                   }))?;
    Ok(command.id)
  }
  fn get_command(&self, command_id: &Uuid) -> Result<Option<Command>, DomainError> {
    use schema::commands::dsl::*;
    let mut pooled = self.conn()?;
    let conn: &mut DbConn = &mut pooled;
    let row = map_db_err(commands.filter(id.eq(command_id.to_string()))
                                 .first::<CommandRow>(conn)
                                 .optional())?;
    row.map(|r| self.load_command(conn, r)).transpose()
  }
  fn list_commands(&self, app_id: &Uuid) -> Result<Vec<Command>, DomainError> {
    use schema::commands::dsl::*;
    let mut pooled = self.conn()?;
    let conn: &mut DbConn = &mut pooled;
    let rows = map_db_err(commands.filter(application_id.eq(app_id.to_string()))
                                  .order(name.asc())
                                  .load::<CommandRow>(conn))?;
    rows.into_iter().map(|r| self.load_command(conn, r)).collect()
  }
}
impl SessionReferenceRepository for DieselRepository {
  fn save_reference(&self, reference: SessionReference) -> Result<Uuid, DomainError> {
    use schema::session_references::dsl::*;
    let mut conn = self.conn()?;
    let row = ReferenceRow::from_domain(&reference)?;
    map_db_err(diesel::delete(session_references.filter(id.eq(&row.id))).execute(&mut conn))?;
    map_db_err(diesel::insert_into(session_references).values(&row).execute(&mut conn))?;
    Ok(reference.id)
  }
  fn get_reference(&self, ref_id: &Uuid) -> Result<Option<SessionReference>, DomainError> {
    use schema::session_references::dsl::*;
    let mut conn = self.conn()?;
    let row = map_db_err(session_references.filter(id.eq(ref_id.to_string()))
                                           .first::<ReferenceRow>(&mut conn)
                                           .optional())?;
    row.map(ReferenceRow::into_domain).transpose()
  }
  fn list_references(&self) -> Result<Vec<SessionReference>, DomainError> {
    use schema::session_references::dsl::*;
    let mut conn = self.conn()?;
    let rows = map_db_err(session_references.order(start_time_ts.asc()).load::<ReferenceRow>(&mut conn))?;
    rows.into_iter().map(ReferenceRow::into_domain).collect()
  }
  fn delete_reference(&self, ref_id: &Uuid) -> Result<bool, DomainError> {
    use schema::session_references::dsl::*;
    let mut conn = self.conn()?;
    let n = map_db_err(diesel::delete(session_references.filter(id.eq(ref_id.to_string()))).execute(&mut conn))?;
    Ok(n > 0)
  }
  fn find_reference_by_session_id(&self, wanted: &str) -> Result<Option<SessionReference>, DomainError> {
    use schema::session_references::dsl::*;
    let mut conn = self.conn()?;
    let row = map_db_err(session_references.filter(session_id.eq(wanted))
                                           .order(start_time_ts.asc())
                                           .first::<ReferenceRow>(&mut conn)
                                           .optional())?;
    row.map(ReferenceRow::into_domain).transpose()
  }
  fn delete_references_by_session_id(&self, wanted: &str) -> Result<usize, DomainError> {
    use schema::session_references::dsl::*;
    let mut conn = self.conn()?;
    map_db_err(diesel::delete(session_references.filter(session_id.eq(wanted))).execute(&mut conn))
  }
}
