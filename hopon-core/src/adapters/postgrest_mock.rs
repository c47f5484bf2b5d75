//! Mock PostgREST server for testing
//!
//! Serves a single in-memory table over HTTP so the hosted store can be
//! exercised without a Supabase project. Supported:
//! - GET with `col=eq.value`, `col=is.null` and `or=(col.eq.value,...)` filters, ordered by
//!   `created_at` descending
//! - POST (insert, returns the row)
//! - PATCH with filters (returns the updated rows)
//! - DELETE with filters (returns the removed rows)
//!
//! Requests without the expected `apikey` header get 401.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::Value as JsonValue;

type Rows = Arc<Mutex<Vec<JsonValue>>>;

/// Mock PostgREST server for testing
pub struct MockPostgrestServer {
    port: u16,
    rows: Rows,
    running: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockPostgrestServer {
    /// Start on a random local port, accepting `api_key`
    pub fn start(api_key: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let rows: Rows = Arc::new(Mutex::new(Vec::new()));

        listener.set_nonblocking(true)?;

        let running_clone = running.clone();
        let rows_clone = rows.clone();
        let api_key = api_key.to_string();
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let rows = rows_clone.clone();
                        let key = api_key.clone();
                        thread::spawn(move || handle_connection(stream, &rows, &key));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            rows,
            running,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Put a raw row into the table
    pub fn seed(&self, row: JsonValue) {
        self.rows.lock().unwrap().push(row);
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockPostgrestServer {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Request {
    method: String,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: String,
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    stream.set_nonblocking(false).ok()?;
    let mut data = Vec::new();
    let mut buffer = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let mut lines = head.lines();
    let mut first = lines.next()?.split_whitespace();
    let method = first.next()?.to_string();
    let target = first.next()?.to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    while data.len() < header_end + content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);
    }
    let body = String::from_utf8_lossy(&data[header_end..]).to_string();

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path.to_string(), query.to_string()),
        None => (target, String::new()),
    };
    let query = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();

    Some(Request {
        method,
        path,
        query,
        headers,
        body,
    })
}

fn cell(row: &JsonValue, column: &str) -> Option<String> {
    match row.get(column)? {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Parse `(a.eq."x",b.eq.y)` into column/value pairs
fn parse_or(expr: &str) -> Vec<(String, String)> {
    expr.trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .filter_map(|clause| {
            let (column, rest) = clause.split_once('.')?;
            let value = rest.strip_prefix("eq.")?;
            Some((column.to_string(), value.trim_matches('"').to_string()))
        })
        .collect()
}

fn matches(row: &JsonValue, query: &[(String, String)]) -> bool {
    query.iter().all(|(key, value)| match key.as_str() {
        "select" | "order" => true,
        "or" => parse_or(value)
            .iter()
            .any(|(column, expected)| cell(row, column).as_deref() == Some(expected.as_str())),
        column if value == "is.null" => cell(row, column).is_none(),
        column => match value.strip_prefix("eq.") {
            Some(expected) => cell(row, column).as_deref() == Some(expected),
            None => false,
        },
    })
}

fn handle_connection(mut stream: TcpStream, rows: &Rows, api_key: &str) {
    let Some(request) = read_request(&mut stream) else {
        return;
    };

    let authorized = request
        .headers
        .iter()
        .any(|(k, v)| k == "apikey" && v == api_key);
    if !authorized {
        send_response(&mut stream, 401, "Unauthorized", r#"{"message":"Invalid API key"}"#);
        return;
    }
    if request.path != "/rest/v1/rides" {
        send_response(&mut stream, 404, "Not Found", r#"{"message":"relation does not exist"}"#);
        return;
    }

    let mut table = rows.lock().unwrap();
    match request.method.as_str() {
        "GET" => {
            let mut found: Vec<JsonValue> = table
                .iter()
                .filter(|row| matches(row, &request.query))
                .cloned()
                .collect();
            found.sort_by(|a, b| cell(b, "created_at").cmp(&cell(a, "created_at")));
            send_json(&mut stream, 200, "OK", &JsonValue::Array(found));
        }
        "POST" => match serde_json::from_str::<JsonValue>(&request.body) {
            Ok(row) => {
                table.push(row.clone());
                send_json(&mut stream, 201, "Created", &JsonValue::Array(vec![row]));
            }
            Err(_) => send_response(&mut stream, 400, "Bad Request", r#"{"message":"bad json"}"#),
        },
        "PATCH" => {
            let changes = match serde_json::from_str::<JsonValue>(&request.body) {
                Ok(JsonValue::Object(changes)) => changes,
                _ => {
                    send_response(&mut stream, 400, "Bad Request", r#"{"message":"bad json"}"#);
                    return;
                }
            };
            let mut updated = Vec::new();
            for row in table.iter_mut().filter(|row| matches(row, &request.query)) {
                if let JsonValue::Object(fields) = row {
                    for (key, value) in &changes {
                        fields.insert(key.clone(), value.clone());
                    }
                }
                updated.push(row.clone());
            }
            send_json(&mut stream, 200, "OK", &JsonValue::Array(updated));
        }
        "DELETE" => {
            let (removed, kept): (Vec<JsonValue>, Vec<JsonValue>) = table
                .drain(..)
                .partition(|row| matches(row, &request.query));
            *table = kept;
            send_json(&mut stream, 200, "OK", &JsonValue::Array(removed));
        }
        _ => send_response(&mut stream, 405, "Method Not Allowed", r#"{"message":"method not allowed"}"#),
    }
}

fn send_json(stream: &mut TcpStream, status: u16, status_text: &str, body: &JsonValue) {
    send_response(stream, status, status_text, &body.to_string());
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
