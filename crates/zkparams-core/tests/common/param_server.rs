//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a fixed set of bodies by request path, one connection per request
//! (`Connection: close`). A route can lie about its `Content-Length`, omit it,
//! or answer with an error status. Every GET is counted per path.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Route {
    pub body: Vec<u8>,
    pub status: u16,
    /// Header value to send; `None` omits the header (body ends at close).
    pub content_length: Option<u64>,
    /// Pause between 1 KiB writes.
    pub write_delay: Option<Duration>,
}

impl Route {
    pub fn ok(body: &[u8]) -> Self {
        Route {
            body: body.to_vec(),
            status: 200,
            content_length: Some(body.len() as u64),
            write_delay: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Route {
            body: Vec::new(),
            status,
            content_length: Some(0),
            write_delay: None,
        }
    }
}

pub struct ParamServer {
    base_url: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

impl ParamServer {
    /// Base URL with trailing slash, e.g. `http://127.0.0.1:12345/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, name: &str) -> String {
        format!("{}{}", self.base_url, name)
    }

    /// GETs received for `/<name>`.
    pub fn hits(&self, name: &str) -> usize {
        let path = format!("/{}", name);
        self.hits.lock().unwrap().get(&path).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().unwrap().values().sum()
    }
}

/// Starts a server in a background thread serving `routes` keyed by file
/// name. Unknown paths get 404. The server runs until the process exits.
pub fn start(routes: Vec<(&str, Route)>) -> ParamServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes: Arc<HashMap<String, Route>> = Arc::new(
        routes
            .into_iter()
            .map(|(name, r)| (format!("/{}", name), r))
            .collect(),
    );
    let hits = Arc::new(Mutex::new(HashMap::new()));
    let server_hits = Arc::clone(&hits);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            let hits = Arc::clone(&server_hits);
            thread::spawn(move || handle(stream, &routes, &hits));
        }
    });
    ParamServer {
        base_url: format!("http://127.0.0.1:{}/", port),
        hits,
    }
}

fn handle(
    mut stream: TcpStream,
    routes: &HashMap<String, Route>,
    hits: &Mutex<HashMap<String, usize>>,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let mut parts = request.lines().next().unwrap_or("").split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("");
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        return;
    }
    *hits.lock().unwrap().entry(path.to_string()).or_insert(0) += 1;

    let not_found = Route::status(404);
    let route = routes.get(path).unwrap_or(&not_found);
    let mut head = format!(
        "HTTP/1.1 {} {}\r\nConnection: close\r\nContent-Type: application/octet-stream\r\n",
        route.status,
        reason(route.status)
    );
    if let Some(len) = route.content_length {
        head.push_str(&format!("Content-Length: {}\r\n", len));
    }
    head.push_str("\r\n");
    if stream.write_all(head.as_bytes()).is_err() {
        return;
    }
    for block in route.body.chunks(1024) {
        if let Some(d) = route.write_delay {
            thread::sleep(d);
        }
        if stream.write_all(block).is_err() {
            return;
        }
    }
    let _ = stream.flush();
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
