#![allow(dead_code)]

use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use assert_cmd::Command;
use serde_json::Value;
use tiny_http::{Header, Response, Server};

/// `taskflow` pointed at `data_dir`, with ambient TASKFLOW_* settings removed
pub fn taskflow_cmd(data_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("taskflow").expect("binary");
    for var in [
        "TASKFLOW_DATA_DIR",
        "TASKFLOW_CONFIG",
        "TASKFLOW_REMOTE_URL",
        "TASKFLOW_API_KEY",
        "TASKFLOW_ACCESS_TOKEN",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd.arg("--data-dir").arg(data_dir);
    cmd
}

/// Run with `--json`, assert success, and return the envelope's `data`
pub fn json_data(data_dir: &Path, args: &[&str]) -> Value {
    let output = taskflow_cmd(data_dir)
        .arg("--json")
        .args(args)
        .output()
        .expect("run taskflow");
    assert!(
        output.status.success(),
        "taskflow {args:?} failed: {}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    let envelope: Value = serde_json::from_slice(&output.stdout).expect("json envelope");
    assert_eq!(envelope["schema_version"], "taskflow.v1");
    assert_eq!(envelope["status"], "success");
    envelope["data"].clone()
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub apikey: Option<String>,
    pub authorization: Option<String>,
    pub prefer: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Default)]
struct FakeState {
    tasks: Vec<Value>,
    categories: Vec<Value>,
    requests: Vec<RecordedRequest>,
    fail_status: Option<u16>,
    delay: Option<Duration>,
}

/// Minimal PostgREST look-alike on a random local port
pub struct FakeRemote {
    base_url: String,
    state: Arc<Mutex<FakeState>>,
    server: Arc<Server>,
    handle: Option<JoinHandle<()>>,
}

impl FakeRemote {
    pub fn start() -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("bind fake remote"));
        let addr = server
            .server_addr()
            .to_ip()
            .expect("fake remote listens on ip");
        let state = Arc::new(Mutex::new(FakeState::default()));

        let handle = {
            let server = Arc::clone(&server);
            let state = Arc::clone(&state);
            std::thread::spawn(move || {
                for request in server.incoming_requests() {
                    handle_request(&state, request);
                }
            })
        };

        Self {
            base_url: format!("http://{addr}"),
            state,
            server,
            handle: Some(handle),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn seed_task(&self, row: Value) {
        self.lock().tasks.push(row);
    }

    pub fn seed_category(&self, row: Value) {
        self.lock().categories.push(row);
    }

    pub fn tasks(&self) -> Vec<Value> {
        self.lock().tasks.clone()
    }

    pub fn categories(&self) -> Vec<Value> {
        self.lock().categories.clone()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Answer every request with `status` until cleared
    pub fn fail_with(&self, status: Option<u16>) {
        self.lock().fail_status = status;
    }

    pub fn delay(&self, delay: Option<Duration>) {
        self.lock().delay = delay;
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Drop for FakeRemote {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn header(request: &tiny_http::Request, name: &str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|header| header.field.as_str().as_str().eq_ignore_ascii_case(name))
        .map(|header| header.value.as_str().to_string())
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), value.replace("%2A", "*")),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

fn eq_filter(value: Option<&str>) -> Option<String> {
    value.and_then(|v| v.strip_prefix("eq.")).map(str::to_string)
}

fn handle_request(state: &Arc<Mutex<FakeState>>, mut request: tiny_http::Request) {
    let mut body = String::new();
    let _ = request.as_reader().read_to_string(&mut body);
    let (path, query) = match request.url().split_once('?') {
        Some((path, query)) => (path.to_string(), parse_query(query)),
        None => (request.url().to_string(), Vec::new()),
    };
    let recorded = RecordedRequest {
        method: request.method().to_string().to_uppercase(),
        path: path.clone(),
        query,
        apikey: header(&request, "apikey"),
        authorization: header(&request, "Authorization"),
        prefer: header(&request, "Prefer"),
        body,
    };

    let delay = {
        let state = state.lock().unwrap_or_else(|p| p.into_inner());
        state.delay
    };
    if let Some(delay) = delay {
        std::thread::sleep(delay);
    }

    let (status, payload) = {
        let mut state = state.lock().unwrap_or_else(|p| p.into_inner());
        state.requests.push(recorded.clone());
        match state.fail_status {
            Some(status) => (status, r#"{"message":"injected"}"#.to_string()),
            None => route(&mut state, &recorded),
        }
    };

    let content_type = Header::from_bytes("Content-Type", "application/json").expect("header");
    let response = Response::from_string(payload)
        .with_status_code(status)
        .with_header(content_type);
    let _ = request.respond(response);
}

fn route(state: &mut FakeState, request: &RecordedRequest) -> (u16, String) {
    let table = match request.path.as_str() {
        "/rest/v1/tasks" => &mut state.tasks,
        "/rest/v1/categories" => &mut state.categories,
        _ => return (404, r#"{"message":"no such table"}"#.to_string()),
    };

    match request.method.as_str() {
        "GET" => {
            let owner = eq_filter(request.param("user_id"));
            let mut rows: Vec<Value> = table
                .iter()
                .filter(|row| owner.as_deref().map_or(true, |owner| row["user_id"] == owner))
                .cloned()
                .collect();
            if request.param("order") == Some("order.asc") {
                rows.sort_by_key(|row| row["order"].as_u64().unwrap_or(0));
            }
            (200, Value::Array(rows).to_string())
        }
        "POST" => match serde_json::from_str::<Value>(&request.body) {
            Ok(row) => {
                table.push(row);
                (201, String::new())
            }
            Err(_) => (400, r#"{"message":"bad json"}"#.to_string()),
        },
        "PATCH" => {
            let Ok(Value::Object(patch)) = serde_json::from_str::<Value>(&request.body) else {
                return (400, r#"{"message":"bad json"}"#.to_string());
            };
            let (column, value) = match eq_filter(request.param("id")) {
                Some(id) => ("id", id),
                None => match eq_filter(request.param("category_id")) {
                    Some(id) => ("category_id", id),
                    None => return (400, r#"{"message":"missing filter"}"#.to_string()),
                },
            };
            for row in table.iter_mut().filter(|row| row[column] == value.as_str()) {
                if let Value::Object(fields) = row {
                    for (key, field) in &patch {
                        fields.insert(key.clone(), field.clone());
                    }
                }
            }
            (204, String::new())
        }
        "DELETE" => {
            let Some(id) = eq_filter(request.param("id")) else {
                return (400, r#"{"message":"missing filter"}"#.to_string());
            };
            table.retain(|row| row["id"] != id.as_str());
            (204, String::new())
        }
        _ => (405, String::new()),
    }
}

/// A remote task row as the hosted table stores it
pub fn task_row(id: &str, owner: &str, title: &str, order: u32) -> Value {
    serde_json::json!({
        "id": id,
        "user_id": owner,
        "title": title,
        "description": null,
        "status": "pending",
        "priority": "medium",
        "category_id": null,
        "due_date": null,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z",
        "order": order
    })
}

pub fn category_row(id: &str, owner: &str, name: &str) -> Value {
    serde_json::json!({
        "id": id,
        "user_id": owner,
        "name": name,
        "color": "#10b981",
        "created_at": "2024-01-01T00:00:00Z"
    })
}
