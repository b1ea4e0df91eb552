//! In-process HTTP/1.1 document store for provider tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use couchconf_config::{CouchDbOptions, WatchOptions};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub const DATABASE: &str = "settings";

#[derive(Debug)]
struct Store {
	documents: BTreeMap<String, Value>,
	all_docs_status: u16,
	all_docs_requests: usize,
	feed_connections: usize,
}

/// Serves `_all_docs`, single documents and a continuous `_changes` feed
/// for one database.
pub struct StoreServer {
	addr: SocketAddr,
	store: Arc<Mutex<Store>>,
	changes: broadcast::Sender<String>,
	task: JoinHandle<()>,
}

impl StoreServer {
	pub async fn start(documents: &[(&str, Value)]) -> Self {
		init_tracing();
		let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind store server");
		let addr = listener.local_addr().expect("local addr");
		let store = Arc::new(Mutex::new(Store {
			documents: documents.iter().map(|(id, doc)| (id.to_string(), doc.clone())).collect(),
			all_docs_status: 200,
			all_docs_requests: 0,
			feed_connections: 0,
		}));
		let (changes, _) = broadcast::channel(64);

		let task = {
			let store = Arc::clone(&store);
			let changes = changes.clone();
			tokio::spawn(async move {
				while let Ok((stream, _)) = listener.accept().await {
					tokio::spawn(serve(stream, Arc::clone(&store), changes.clone()));
				}
			})
		};

		Self {
			addr,
			store,
			changes,
			task,
		}
	}

	/// Options pointing at this server with short feed timings.
	pub fn options(&self) -> CouchDbOptions {
		CouchDbOptions::new("127.0.0.1", self.addr.port(), DATABASE).watch(WatchOptions {
			retry_delay_ms: 50,
			debounce_ms: 100,
			..WatchOptions::default()
		})
	}

	pub fn put(&self, id: &str, document: Value) {
		self.store.lock().documents.insert(id.to_string(), document);
	}

	pub fn set_all_docs_status(&self, status: u16) {
		self.store.lock().all_docs_status = status;
	}

	pub fn all_docs_requests(&self) -> usize {
		self.store.lock().all_docs_requests
	}

	pub fn feed_connections(&self) -> usize {
		self.store.lock().feed_connections
	}

	/// Emits one change event on every open feed connection.
	pub fn change(&self, seq: i64, id: &str) {
		let line = json!({ "seq": seq, "id": id, "changes": [{ "rev": format!("{seq}-x") }] }).to_string();
		let _ = self.changes.send(line);
	}
}

impl Drop for StoreServer {
	fn drop(&mut self) {
		self.task.abort();
	}
}

/// Client without proxy discovery so loopback requests stay local.
pub fn client() -> reqwest::Client {
	reqwest::Client::builder().no_proxy().build().expect("build client")
}

/// Address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
	listener.local_addr().expect("local addr")
}

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Polls `condition` every 10ms for up to five seconds.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
	for _ in 0..500 {
		if condition() {
			return true;
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
	condition()
}

async fn serve(mut stream: TcpStream, store: Arc<Mutex<Store>>, changes: broadcast::Sender<String>) {
	let Some(head) = read_request_head(&mut stream).await else {
		return;
	};
	let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
	let method = request_line.next().unwrap_or_default().to_string();
	let target = request_line.next().unwrap_or_default().to_string();
	let (path, _query) = target.split_once('?').unwrap_or((target.as_str(), ""));
	let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

	match segments.as_slice() {
		[db, "_changes"] if *db == DATABASE => {
			let mut lines = changes.subscribe();
			store.lock().feed_connections += 1;
			let head = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n";
			if stream.write_all(head.as_bytes()).await.is_err() {
				return;
			}
			while let Ok(line) = lines.recv().await {
				let framed = format!("{line}\n");
				if stream.write_all(framed.as_bytes()).await.is_err() || stream.flush().await.is_err() {
					return;
				}
			}
		}
		[db, "_all_docs"] if *db == DATABASE => {
			let (status, body) = {
				let mut store = store.lock();
				store.all_docs_requests += 1;
				let rows: Vec<Value> = store
					.documents
					.iter()
					.map(|(id, doc)| {
						let mut doc = doc.clone();
						if let Value::Object(fields) = &mut doc {
							fields.insert("_id".to_string(), json!(id));
							fields.insert("_rev".to_string(), json!("1-abc"));
						}
						json!({ "id": id, "key": id, "value": { "rev": "1-abc" }, "doc": doc })
					})
					.collect();
				let body = json!({ "total_rows": rows.len(), "offset": 0, "rows": rows });
				(store.all_docs_status, body.to_string())
			};
			respond(&mut stream, status, &body, method == "HEAD").await;
		}
		[db, id] if *db == DATABASE => {
			let id = urlencoding::decode(id).map(|id| id.into_owned()).unwrap_or_default();
			let body = store.lock().documents.get(&id).map(Value::to_string);
			match body {
				Some(body) => respond(&mut stream, 200, &body, method == "HEAD").await,
				None => respond(&mut stream, 404, r#"{"error":"not_found","reason":"missing"}"#, method == "HEAD").await,
			}
		}
		_ => respond(&mut stream, 404, r#"{"error":"not_found"}"#, method == "HEAD").await,
	}
}

async fn respond(stream: &mut TcpStream, status: u16, body: &str, head_only: bool) {
	let reason = match status {
		200 => "OK",
		404 => "Not Found",
		_ => "Error",
	};
	let mut response = format!(
		"HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
		body.len()
	);
	if !head_only {
		response.push_str(body);
	}
	let _ = stream.write_all(response.as_bytes()).await;
	let _ = stream.shutdown().await;
}

async fn read_request_head(stream: &mut TcpStream) -> Option<String> {
	let mut head = Vec::new();
	let mut buf = [0u8; 1024];
	while !head.windows(4).any(|w| w == b"\r\n\r\n") {
		let n = stream.read(&mut buf).await.ok()?;
		if n == 0 {
			return None;
		}
		head.extend_from_slice(&buf[..n]);
	}
	Some(String::from_utf8_lossy(&head).into_owned())
}
