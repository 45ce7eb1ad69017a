// Decodificación de los sobres HTTP contra un servidor local de una sola
// respuesta.

use qcr_client::{ApiResponse, BackendClient, ClientConfig, HttpBackendClient, RunStatus, MALFORMED_RESPONSE_CODE};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

/// Atiende una conexión con `status` y `body`; devuelve la línea de petición.
fn serve_once(status: u16, body: &'static str) -> (HttpBackendClient, JoinHandle<String>) {
  let listener = TcpListener::bind("127.0.0.1:0").expect("puerto local");
  let addr = listener.local_addr().expect("dirección");
  let handle = thread::spawn(move || {
    let (stream, _) = listener.accept().expect("conexión");
    let mut reader = BufReader::new(stream.try_clone().expect("clon"));
    let mut request_line = String::new();
    reader.read_line(&mut request_line).expect("línea de petición");
    let mut content_length = 0usize;
    let mut chunked = false;
    loop {
      let mut line = String::new();
      reader.read_line(&mut line).expect("cabecera");
      if line.trim().is_empty() {
        break;
      }
      if let Some((name, value)) = line.split_once(':') {
        if name.eq_ignore_ascii_case("content-length") {
          content_length = value.trim().parse().unwrap_or(0);
        } else if name.eq_ignore_ascii_case("transfer-encoding") {
          chunked = value.trim().eq_ignore_ascii_case("chunked");
        }
      }
    }
    if chunked {
      loop {
        let mut size = String::new();
        reader.read_line(&mut size).expect("tamaño de trozo");
        let size = usize::from_str_radix(size.trim(), 16).unwrap_or(0);
        let mut chunk = vec![0u8; size + 2];
        reader.read_exact(&mut chunk).expect("trozo");
        if size == 0 {
          break;
        }
      }
    } else {
      let mut request_body = vec![0u8; content_length];
      reader.read_exact(&mut request_body).expect("cuerpo");
    }

    let mut stream = stream;
    write!(stream,
           "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
           status,
           body.len(),
           body).expect("respuesta");
    stream.flush().expect("flush");
    request_line.trim().to_string()
  });
  let cfg = ClientConfig { base_url: format!("http://{}", addr), timeout_secs: 5, max_log_len: 80 };
  (HttpBackendClient::new(&cfg).expect("cliente"), handle)
}

#[test]
fn close_session_reads_session_list_envelope() {
  let (client, server) = serve_once(200,
                                    r#"{"payload":{"interactive_sessions":[{"interactive_session_id":"s1","status":"successful","output_dataset_id":"d9"}]}}"#);

  let closed = client.close_interactive_session("s1");

  assert_eq!(server.join().expect("servidor"), "POST /interactive_sessions/s1/close HTTP/1.1");
  match closed {
    ApiResponse::Success(session) => {
      assert_eq!(session.interactive_session_id, "s1");
      assert_eq!(session.status, RunStatus::Successful);
      assert_eq!(session.output_dataset_id.as_deref(), Some("d9"));
    }
    ApiResponse::Error(e) => panic!("cierre no decodificado: {}", e),
  }
}

#[test]
fn get_session_reads_session_list_envelope() {
  let (client, server) =
    serve_once(200, r#"{"payload":{"interactive_sessions":[{"interactive_session_id":"s2","status":"running"}]}}"#);

  let session = client.get_interactive_session("s2");

  server.join().expect("servidor");
  match session {
    ApiResponse::Success(s) => {
      assert_eq!(s.status, RunStatus::Running);
      assert_eq!(s.output_dataset_id, None);
    }
    ApiResponse::Error(e) => panic!("sesión no decodificada: {}", e),
  }
}

#[test]
fn create_session_reads_flat_payload() {
  let (client, server) = serve_once(200, r#"{"payload":{"interactive_session_id":"s3"}}"#);
  let invocation = qcr_client::CommandInvocation { application_slug: "olex2".into(),
                                                   application_version: "1.5".into(),
                                                   command_name: "interactive".into(),
                                                   arguments: Default::default() };

  let started = client.create_interactive_session(&invocation);

  assert_eq!(server.join().expect("servidor"), "POST /interactive_sessions HTTP/1.1");
  assert!(matches!(started, ApiResponse::Success(s) if s.interactive_session_id == "s3"));
}

#[test]
fn calculation_reads_calculation_list_envelope() {
  let (client, server) =
    serve_once(200, r#"{"payload":{"calculations":[{"calculation_id":"c1","status":"stopped"}]}}"#);

  let calc = client.get_calculation("c1");

  assert_eq!(server.join().expect("servidor"), "GET /calculations/c1 HTTP/1.1");
  assert!(matches!(calc, ApiResponse::Success(c) if c.status == RunStatus::Unknown));
}

#[test]
fn dataset_keeps_file_order() {
  let (client, server) = serve_once(200,
                                    r#"{"payload":{"datasets":[{"qcrbox_dataset_id":"d1","data_files":{
                                      "a.cif":{"qcrbox_file_id":"d1_df","filename":"a.cif"},
                                      "a.hkl":{"qcrbox_file_id":"d2_df","filename":"a.hkl"}}}]}}"#);

  let dataset = client.get_dataset("d1");

  server.join().expect("servidor");
  match dataset {
    ApiResponse::Success(d) => {
      assert_eq!(d.first_file().map(|f| f.qcrbox_file_id.as_str()), Some("d1_df"));
      assert_eq!(d.file_named("a.hkl").map(|f| f.qcrbox_file_id.as_str()), Some("d2_df"));
    }
    ApiResponse::Error(e) => panic!("dataset no decodificado: {}", e),
  }
}

#[test]
fn error_envelope_wins_over_success_status() {
  let (client, server) = serve_once(200, r#"{"error":{"code":404,"message":"no such session"}}"#);

  let closed = client.close_interactive_session("gone");

  server.join().expect("servidor");
  assert!(matches!(closed, ApiResponse::Error(e) if e.is_not_found()));
}

#[test]
fn bare_status_code_becomes_api_error() {
  let (client, server) = serve_once(409, "");

  let started = client.invoke_command(&qcr_client::CommandInvocation { application_slug: "olex2".into(),
                                                                      application_version: "1.5".into(),
                                                                      command_name: "refine".into(),
                                                                      arguments: Default::default() });

  server.join().expect("servidor");
  assert!(matches!(started, ApiResponse::Error(e) if e.is_resource_busy() && e.code == 409));
}

#[test]
fn empty_session_list_is_malformed() {
  let (client, server) = serve_once(200, r#"{"payload":{"interactive_sessions":[]}}"#);

  let closed = client.close_interactive_session("s1");

  server.join().expect("servidor");
  assert!(matches!(closed, ApiResponse::Error(e) if e.code == MALFORMED_RESPONSE_CODE));
}
