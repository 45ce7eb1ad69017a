use qcr_client::{HttpBackendClient, UploadFile};
use qcr_domain::{Actor, CatalogRepository, Command, Dataset, DatasetRepository, ParamKind};
use qcr_persistence::DieselRepository;
use qcr_workflow::{FormValues, Orchestrator, Repositories, RequestContext, SessionCookie, WorkStatus, WorkflowConfig};
use std::error::Error;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Menú de operador para el orquestador.
///
/// Usa el backend HTTP configurado en `QCR_API_BASE_URL` y el almacén de
/// `qcr-persistence` (SQLite por defecto). El usuario es `$USER` y su
/// referencia de navegador vive en memoria mientras dura el programa.
fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let backend = Arc::new(HttpBackendClient::from_env()?);
    let store = Arc::new(qcr_persistence::new_from_env()?);
    let orchestrator = Orchestrator::new(backend, Repositories::shared(store.clone()), WorkflowConfig::from_env());

    let username = std::env::var("USER").unwrap_or_else(|_| "operator".into());
    let actor = Actor::new(Uuid::new_v5(&Uuid::NAMESPACE_OID, username.as_bytes()), username);
    // un grupo por usuario
    let group_id = actor.id;
    let mut cookie = SessionCookie::default();
    tracing::info!("qcrflow iniciado como {}", actor);

    loop {
        println!("\n== qcrflow ==");
        println!("1) Sincronizar aplicaciones");
        println!("2) Ver datasets");
        println!("3) Subir dataset");
        println!("4) Ejecutar comando");
        println!("5) Consultar cálculo");
        println!("6) Cerrar sesión interactiva");
        println!("7) Cancelar cálculo");
        println!("8) Historial y descendientes de un dataset");
        println!("9) Ver referencias de sesión");
        println!("10) Cerrar una referencia de sesión");
        println!("11) Borrar dataset");
        println!("12) Descargar dataset");
        println!("0) Salir");

        let choice = prompt("Elige una opción: ")?;
        match choice.trim() {
            "1" => match orchestrator.update_apps() {
                Ok(Some(report)) => println!("Nuevas: {}, reactivadas: {}, desactivadas: {}, puertos: {}",
                                             report.new_apps.len(),
                                             report.reactivated_apps.len(),
                                             report.deactivated_apps.len(),
                                             report.updated_ports.len()),
                Ok(None) => println!("El backend no respondió; catálogo sin cambios"),
                Err(e) => eprintln!("Error sincronizando: {}", e),
            },
            "2" => match store.list_active_datasets() {
                Ok(datasets) => {
                    println!("\nID                                   | BACKEND                | NOMBRE");
                    println!("-----------------------------------------------------------------------------------");
                    for d in datasets {
                        println!("{} | {} | {}", d.id, d.backend_id, d.display_filename);
                    }
                }
                Err(e) => eprintln!("Error listando datasets: {}", e),
            },
            "3" => {
                let path = prompt("Ruta del fichero: ")?;
                let path = Path::new(path.trim());
                let content = match std::fs::read(path) {
                    Ok(c) => c,
                    Err(e) => { eprintln!("No se pudo leer {}: {}", path.display(), e); continue; }
                };
                let filename = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
                match orchestrator.upload_dataset(&actor, group_id, &UploadFile::new(filename, content)) {
                    Ok(Ok(d)) => println!("Dataset creado: {} ({})", d.display_filename, d.id),
                    Ok(Err(f)) => eprintln!("{}", f),
                    Err(e) => eprintln!("Error subiendo: {}", e),
                }
            }
            "4" => {
                let Some(dataset) = pick_dataset(&store)? else { continue };
                let Some(command) = pick_command(&store)? else { continue };
                let form = if command.interactive && cookie.app_session_id.is_some()
                              && confirm("Hay una sesión abierta. ¿Terminarla? escribir 'yes': ")?
                {
                    FormValues::new().ending_session()
                } else {
                    read_form(&command)?
                };
                let mut ctx = RequestContext::new(&actor, &mut cookie);
                report(orchestrator.handle_command(&mut ctx, &command, &dataset, &form));
            }
            "5" => {
                let Some(dataset) = pick_dataset(&store)? else { continue };
                let Some(command) = pick_command(&store)? else { continue };
                let mut ctx = RequestContext::new(&actor, &mut cookie);
                report(orchestrator.poll_calculation(&mut ctx, &dataset, &command));
            }
            "6" => {
                let Some(dataset) = pick_dataset(&store)? else { continue };
                let Some(command) = pick_command(&store)? else { continue };
                let mut ctx = RequestContext::new(&actor, &mut cookie);
                report(orchestrator.close_session(&mut ctx, &command, &dataset));
            }
            "7" => {
                let mut ctx = RequestContext::new(&actor, &mut cookie);
                report(orchestrator.cancel_calculation(&mut ctx));
            }
            "8" => {
                let Some(dataset) = pick_dataset(&store)? else { continue };
                match orchestrator.get_file_history(&dataset) {
                    Ok(steps) => {
                        println!("Historial ({} pasos):", steps.len());
                        for s in steps {
                            println!("  {:?} --{}--> {}", s.infile_id, s.command_id, s.outfile_id);
                        }
                    }
                    Err(e) => eprintln!("Error leyendo historial: {}", e),
                }
                match orchestrator.get_file_descendants(&dataset) {
                    Ok(steps) => {
                        println!("Descendientes ({} pasos):", steps.len());
                        for s in steps {
                            println!("  {:?} --{}--> {}", s.infile_id, s.command_id, s.outfile_id);
                        }
                    }
                    Err(e) => eprintln!("Error leyendo descendientes: {}", e),
                }
            }
            "9" => match orchestrator.list_session_references() {
                Ok(refs) => {
                    for r in refs {
                        println!("{} | {} | {} | usuario {} | desde {}",
                                 r.id,
                                 r.kind.as_str(),
                                 r.session_id,
                                 r.user_id,
                                 r.start_time.format("%Y-%m-%d %H:%M:%S"));
                    }
                }
                Err(e) => eprintln!("Error listando referencias: {}", e),
            },
            "10" => {
                let id_s = prompt("Id de la referencia (UUID): ")?;
                let id = match Uuid::parse_str(id_s.trim()) {
                    Ok(u) => u,
                    Err(_) => { eprintln!("UUID inválido"); continue; }
                };
                report(orchestrator.reap_session_reference(&actor, &id));
            }
            "11" => {
                let Some(dataset) = pick_dataset(&store)? else { continue };
                if !confirm(&format!("Confirma borrado de {}? escribir 'yes' para confirmar: ", dataset.display_filename))? {
                    println!("Borrado cancelado");
                    continue;
                }
                match orchestrator.delete_dataset(&actor, &dataset) {
                    Ok(Ok(())) => println!("Dataset borrado: {}", dataset.display_filename),
                    Ok(Err(f)) => eprintln!("{}", f),
                    Err(e) => eprintln!("Error borrando: {}", e),
                }
            }
            "12" => {
                let Some(dataset) = pick_dataset(&store)? else { continue };
                let target = prompt("Guardar como (ruta .zip): ")?;
                match orchestrator.download_dataset(&actor, &dataset) {
                    Ok(bytes) => match std::fs::write(target.trim(), &bytes) {
                        Ok(()) => println!("{} bytes escritos en {}", bytes.len(), target.trim()),
                        Err(e) => eprintln!("No se pudo escribir: {}", e),
                    },
                    Err(f) => eprintln!("{}", f),
                }
            }
            "0" => {
                println!("Saliendo...");
                break;
            }
            other => {
                println!("Opción inválida: {}", other);
            }
        }
    }

    Ok(())
}

fn report(result: Result<WorkStatus, qcr_workflow::WorkflowError>) {
    match result {
        Ok(status) => {
            println!("Estado: {:?}", status.state);
            if let Some(id) = status.outfile_id {
                println!("Dataset de salida: {}", id);
            }
            for m in status.messages {
                println!("[{:?}] {}", m.level, m.text);
            }
        }
        Err(e) => eprintln!("Error: {}", e),
    }
}

fn pick_dataset(store: &DieselRepository) -> Result<Option<Dataset>, Box<dyn Error>> {
    let datasets = store.list_active_datasets()?;
    if datasets.is_empty() {
        println!("No hay datasets activos");
        return Ok(None);
    }
    for (i, d) in datasets.iter().enumerate() {
        println!("{}) {}", i + 1, d.display_filename);
    }
    Ok(pick(&prompt("Dataset: ")?, datasets))
}

fn pick_command(store: &DieselRepository) -> Result<Option<Command>, Box<dyn Error>> {
    let mut commands = Vec::new();
    for app in store.list_applications()?.into_iter().filter(|a| a.active) {
        for c in store.list_commands(&app.id)? {
            println!("{}) {} {} :: {}{}",
                     commands.len() + 1,
                     app.name,
                     app.version,
                     c.name,
                     if c.interactive { " (interactivo)" } else { "" });
            commands.push(c);
        }
    }
    if commands.is_empty() {
        println!("No hay comandos; sincroniza las aplicaciones primero");
        return Ok(None);
    }
    Ok(pick(&prompt("Comando: ")?, commands))
}

fn pick<T>(answer: &str, items: Vec<T>) -> Option<T> {
    let index = answer.trim().parse::<usize>().ok().filter(|i| *i >= 1)?;
    let picked = items.into_iter().nth(index - 1);
    if picked.is_none() {
        println!("Selección inválida");
    }
    picked
}

/// Pide un valor por parámetro. El primer dataset se fija solo.
fn read_form(command: &Command) -> io::Result<FormValues> {
    let mut form = FormValues::new();
    let mut primary_seen = false;
    for p in &command.parameters {
        match p.kind() {
            ParamKind::DatasetReference if !primary_seen => {
                primary_seen = true;
            }
            ParamKind::AuxiliaryUpload => {
                let path = prompt(&format!("{} (ruta de fichero, enter para omitir): ", p.name))?;
                let path = Path::new(path.trim());
                if path.as_os_str().is_empty() {
                    continue;
                }
                match std::fs::read(path) {
                    Ok(content) => {
                        let filename = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
                        form = form.with_upload(&p.name, UploadFile::new(filename, content));
                    }
                    Err(e) => eprintln!("No se pudo leer {}: {}", path.display(), e),
                }
            }
            _ => {
                let hint = match &p.default {
                    Some(d) => format!(" [{}]", d),
                    None => String::new(),
                };
                let value = prompt(&format!("{} ({}){}: ", p.name, p.dtype, hint))?;
                form = form.with_text(&p.name, value.trim());
            }
        }
    }
    Ok(form)
}

fn confirm(msg: &str) -> io::Result<bool> {
    Ok(prompt(msg)?.trim().to_lowercase() == "yes")
}

fn prompt(msg: &str) -> io::Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s)
}
