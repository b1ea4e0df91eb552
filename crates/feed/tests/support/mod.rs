//! Scripted HTTP/1.1 change-feed server for watcher tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use couchconf_feed::FeedConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// One action taken on an open feed connection.
#[derive(Debug, Clone)]
pub enum Step {
	Line(String),
	Pause(Duration),
}

/// Behaviour of one accepted connection.
#[derive(Debug, Clone)]
pub struct Script {
	pub status: u16,
	pub steps: Vec<Step>,
	pub hold_open: bool,
	/// When false the request is read but never answered.
	pub replies: bool,
}

impl Script {
	/// Writes `lines` then closes the connection.
	pub fn lines(lines: &[&str]) -> Self {
		Self {
			status: 200,
			steps: lines.iter().map(|line| Step::Line((*line).to_string())).collect(),
			hold_open: false,
			replies: true,
		}
	}

	/// Answers with `status` and an empty body.
	pub fn status(status: u16) -> Self {
		Self {
			status,
			steps: Vec::new(),
			hold_open: false,
			replies: true,
		}
	}

	/// Accepts the request and never sends response headers.
	pub fn silent() -> Self {
		Self {
			replies: false,
			..Self::status(200).held()
		}
	}

	/// Keeps the connection open after the last step.
	pub fn held(mut self) -> Self {
		self.hold_open = true;
		self
	}

	/// Waits before the first step.
	pub fn delayed(mut self, delay: Duration) -> Self {
		self.steps.insert(0, Step::Pause(delay));
		self
	}
}

/// Feed server answering connection `n` with `scripts[n]`.
///
/// Connections beyond the script list are held open silently.
pub struct FeedServer {
	addr: SocketAddr,
	connections: Arc<AtomicUsize>,
	task: JoinHandle<()>,
}

impl FeedServer {
	pub async fn start(scripts: Vec<Script>) -> Self {
		init_tracing();
		let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind feed server");
		let addr = listener.local_addr().expect("local addr");
		let connections = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&connections);

		let task = tokio::spawn(async move {
			while let Ok((stream, _)) = listener.accept().await {
				let index = counter.fetch_add(1, Ordering::SeqCst);
				let script = scripts.get(index).cloned().unwrap_or_else(|| Script::lines(&[]).held());
				tokio::spawn(serve(stream, script));
			}
		});

		Self { addr, connections, task }
	}

	pub fn feed_config(&self) -> FeedConfig {
		let url = format!("http://{}/settings/_changes?feed=continuous", self.addr);
		FeedConfig::new(url.parse().expect("feed url"))
			.retry_delay(Duration::from_millis(50))
			.debounce(Duration::from_millis(100))
	}

	pub fn connections(&self) -> usize {
		self.connections.load(Ordering::SeqCst)
	}
}

impl Drop for FeedServer {
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

async fn serve(mut stream: TcpStream, script: Script) {
	if read_request_head(&mut stream).await.is_none() {
		return;
	}
	if !script.replies {
		hold(&mut stream).await;
		return;
	}

	let head = format!(
		"HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n",
		script.status,
		if script.status == 200 { "OK" } else { "Error" }
	);
	if stream.write_all(head.as_bytes()).await.is_err() {
		return;
	}

	for step in script.steps {
		match step {
			Step::Line(line) => {
				let framed = format!("{line}\n");
				if stream.write_all(framed.as_bytes()).await.is_err() || stream.flush().await.is_err() {
					return;
				}
			}
			Step::Pause(delay) => tokio::time::sleep(delay).await,
		}
	}

	if script.hold_open {
		hold(&mut stream).await;
		return;
	}
	let _ = stream.shutdown().await;
}

/// Drains the connection until the client closes it.
async fn hold(stream: &mut TcpStream) {
	let mut sink = [0u8; 256];
	while matches!(stream.read(&mut sink).await, Ok(n) if n > 0) {}
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
