use std::sync::{Arc, Mutex};

use tablescope_adapters::export::DirectoryExporter;
use tablescope_adapters::http::HttpConsoleBackend;
use tablescope_core::backend::ConsoleBackend;
use tablescope_core::connectivity::{ConnectionIndicator, ConnectivityMonitor};
use tablescope_core::model::QueryResult;
use tablescope_core::session::{Command, SessionController};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

type RequestLog = Arc<Mutex<Vec<String>>>;

async fn spawn_canned_api() -> (String, RequestLog) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let address = listener.local_addr().expect("listener address");
    let log: RequestLog = Arc::default();
    let server_log = Arc::clone(&log);

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let log = Arc::clone(&server_log);
            tokio::spawn(async move {
                serve_one(stream, log).await;
            });
        }
    });

    (format!("http://{address}/api"), log)
}

async fn serve_one(mut stream: TcpStream, log: RequestLog) {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];
    let (head, body) = loop {
        let read = stream.read(&mut chunk).await.expect("read request");
        if read == 0 {
            return;
        }
        buffer.extend_from_slice(&chunk[..read]);
        let text = String::from_utf8_lossy(&buffer).into_owned();
        if let Some((head, body)) = text.split_once("\r\n\r\n") {
            let content_length = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if body.len() >= content_length {
                break (head.to_string(), body.to_string());
            }
        }
    };

    let request_line = head.lines().next().unwrap_or_default().to_string();
    log.lock().expect("lock").push(request_line.clone());
    let (status, payload) = route(&request_line, &body);

    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );
    stream
        .write_all(response.as_bytes())
        .await
        .expect("write response");
    let _ = stream.shutdown().await;
}

fn route(request_line: &str, body: &str) -> (&'static str, String) {
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let target = parts.next().unwrap_or_default();

    match (method, target) {
        ("GET", "/api/databases") => (
            "200 OK",
            r#"{"databases":[{"id":"main","name":"Main","path":"/data/main.db"},{"id":"logs","name":"Logs","path":"/data/logs.db"}]}"#.to_string(),
        ),
        ("GET", "/api/databases/main/info") => ("200 OK", r#"{"tables":2}"#.to_string()),
        ("GET", "/api/databases/main/tables") => {
            ("200 OK", r#"{"tables":["users","order items"]}"#.to_string())
        }
        ("GET", "/api/databases/main/schema/order%20items") => (
            "200 OK",
            r#"{"columns":[{"cid":0,"name":"id","type":"INTEGER","notnull":1,"dflt_value":null,"pk":1}],"indexes":[],"createTable":"CREATE TABLE \"order items\" (id INTEGER PRIMARY KEY)"}"#.to_string(),
        ),
        ("GET", "/api/databases/main/table/users?page=2&limit=10") => (
            "200 OK",
            r#"{"data":[{"id":11,"email":"<b>k@example.com</b>"}],"pagination":{"page":2,"totalPages":2,"total":11}}"#.to_string(),
        ),
        ("POST", "/api/databases/main/query") if body.contains("SELEC ") => (
            "400 Bad Request",
            r#"{"error":"near \"SELEC\": syntax error"}"#.to_string(),
        ),
        ("POST", "/api/databases/main/query") => (
            "200 OK",
            r#"{"data":[{"x":1}],"rowCount":1,"executionTime":3}"#.to_string(),
        ),
        _ => ("500 Internal Server Error", r#"{"error":"boom"}"#.to_string()),
    }
}

#[tokio::test]
async fn reads_catalog_schema_and_pages_over_http() {
    let (base_url, log) = spawn_canned_api().await;
    let backend = HttpConsoleBackend::new(&base_url).expect("valid base url");

    let databases = backend.list_databases().await.expect("databases");
    assert_eq!(databases.len(), 2);
    assert_eq!(databases[1].path, "/data/logs.db");

    let tables = backend.list_tables("main").await.expect("tables");
    assert_eq!(tables, vec!["users", "order items"]);

    let info = backend
        .table_info("main", "order items")
        .await
        .expect("schema");
    assert!(info.columns[0].is_primary_key);
    assert!(info.indexes.is_empty());

    let page = backend.table_page("main", "users", 2, 10).await.expect("page");
    assert_eq!(page.pagination.page, 2);
    assert_eq!(page.pagination.total_rows, 11);

    let error = backend
        .list_tables("missing")
        .await
        .expect_err("server error should fail the load");
    assert!(error.message().contains("500"));

    let requests = log.lock().expect("lock").clone();
    assert!(requests.contains(&"GET /api/databases/main/schema/order%20items HTTP/1.1".to_string()));
}

#[tokio::test]
async fn query_errors_on_error_status_are_reported_as_failures() {
    let (base_url, _log) = spawn_canned_api().await;
    let backend = HttpConsoleBackend::new(&base_url).expect("valid base url");

    let result = backend.run_query("main", "SELEC 1").await.expect("query body");

    assert_eq!(result, QueryResult::failure("near \"SELEC\": syntax error"));
}

#[tokio::test]
async fn session_runs_against_http_backend() {
    let (base_url, _log) = spawn_canned_api().await;
    let backend = Arc::new(HttpConsoleBackend::new(&base_url).expect("valid base url"));
    let temp_dir = tempfile::TempDir::new().expect("temp dir");
    let mut session = SessionController::new(
        Arc::clone(&backend),
        Box::new(DirectoryExporter::new(temp_dir.path())),
        ConnectionIndicator::new(),
        10,
    );

    session
        .dispatch(Command::LoadDatabases)
        .await
        .expect("load databases");
    session
        .dispatch(Command::RunQuery("SELECT 1 AS x".to_string()))
        .await
        .expect("run query");

    let panel = session.query_panel();
    assert_eq!(panel.timing.as_deref(), Some("Executed in 3ms (1 rows)"));
    assert_eq!(
        panel.results.as_ref().map(|model| model.columns.clone()),
        Some(vec!["x".to_string()])
    );
}

#[tokio::test]
async fn monitor_reports_down_when_nothing_listens() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("address");
    drop(listener);

    let backend = Arc::new(
        HttpConsoleBackend::new(&format!("http://{address}/api")).expect("valid base url"),
    );
    let indicator = ConnectionIndicator::new();
    indicator.set(true);
    let monitor = ConnectivityMonitor::new(backend, indicator.clone());

    assert!(!monitor.poll().await);
    assert!(!indicator.is_connected());
}
