#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::{Arc, Mutex};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::{Value, json};

const ISOLATED_VARS: &[&str] = &[
    "NCSYNC_CONFIG",
    "NCSYNC_SOURCE_URL",
    "NCSYNC_SOURCE_TOKEN",
    "NCSYNC_SOURCE_BASE_ID",
    "NCSYNC_SOURCE_API_VERSION",
    "NCSYNC_SOURCE_WORKSPACE_ID",
    "NCSYNC_TARGET_URL",
    "NCSYNC_TARGET_TOKEN",
    "NCSYNC_TARGET_BASE_ID",
    "NCSYNC_TARGET_API_VERSION",
    "NCSYNC_TARGET_WORKSPACE_ID",
    "NCSYNC_IGNORE_CASE",
    "NCSYNC_INCLUDE_DELETE_OPS",
    "NCSYNC_INCLUDE_SYSTEM_COLUMNS",
    "NCSYNC_TIMEOUT",
    "RUST_LOG",
    "HTTP_PROXY",
    "http_proxy",
    "HTTPS_PROXY",
    "https_proxy",
    "ALL_PROXY",
    "all_proxy",
];

/// The binary, run from `dir` with no ambient config, env vars, or proxies.
pub fn ncsync(dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("ncsync");
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join("xdg"))
        .env("NO_PROXY", "127.0.0.1,localhost")
        .env("NO_COLOR", "1");
    for var in ISOLATED_VARS {
        cmd.env_remove(var);
    }
    cmd
}

pub fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("json")
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json_body(&self) -> Value {
        serde_json::from_str(&self.body).expect("json body")
    }
}

#[derive(Debug, Clone)]
struct Route {
    method: &'static str,
    path: String,
    status: u16,
    body: String,
    truncated: bool,
}

/// Minimal NocoDB stand-in: answers canned routes, one connection at a time,
/// and records every request it sees. Unknown routes get a 404.
pub struct StubServer {
    routes: Vec<Route>,
}

pub struct RunningStub {
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl RunningStub {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn mutations(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|req| req.method != "GET")
            .collect()
    }
}

impl StubServer {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn route(mut self, method: &'static str, path: &str, status: u16, body: Value) -> Self {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            status,
            body: body.to_string(),
            truncated: false,
        });
        self
    }

    /// A 200 whose `Content-Length` promises more than is sent before the
    /// connection closes.
    pub fn truncated(mut self, method: &'static str, path: &str, body: Value) -> Self {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            status: 200,
            body: body.to_string(),
            truncated: true,
        });
        self
    }

    pub fn get(self, path: &str, body: Value) -> Self {
        self.route("GET", path, 200, body)
    }

    /// Serve a base whose tables are `(id, title, columns)`.
    pub fn base(mut self, base_id: &str, tables: &[(&str, &str, Value)]) -> Self {
        let listing = tables
            .iter()
            .map(|(id, title, _)| json!({"id": id, "title": title}))
            .collect::<Vec<_>>();
        self = self.get(
            &format!("/api/v2/meta/bases/{}/tables?includeM2M=true", base_id),
            json!({ "list": listing }),
        );
        for (id, title, columns) in tables {
            self = self.get(
                &format!("/api/v2/meta/tables/{}", id),
                json!({"id": id, "title": title, "columns": columns}),
            );
        }
        self
    }

    pub fn start(self) -> RunningStub {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
        let addr = listener.local_addr().expect("local addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let routes = self.routes;

        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                serve(stream, &routes, &recorded);
            }
        });

        RunningStub {
            url: format!("http://{}", addr),
            requests,
        }
    }
}

fn serve(
    stream: TcpStream,
    routes: &[Route],
    recorded: &Mutex<Vec<RecordedRequest>>,
) -> Option<()> {
    let mut reader = BufReader::new(stream.try_clone().ok()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_lowercase(), value.trim().to_string()));
        }
    }

    let length = headers
        .iter()
        .find(|(name, _)| name == "content-length")
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).ok()?;

    let request = RecordedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    };

    let (status, payload, truncated) = routes
        .iter()
        .find(|route| route.method == request.method && route.path == request.path)
        .map(|route| (route.status, route.body.clone(), route.truncated))
        .unwrap_or_else(|| (404, json!({"msg": "not found"}).to_string(), false));
    let declared = if truncated {
        payload.len() + 64
    } else {
        payload.len()
    };
    // Record before replying; the client may exit as soon as it reads the response.
    recorded.lock().expect("requests lock").push(request);

    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason(status),
        declared,
        payload
    );
    let mut stream = stream;
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
    Some(())
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
