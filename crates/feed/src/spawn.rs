use std::future::Future;
use std::sync::OnceLock;

use tokio::task::JoinHandle;

fn runtime_handle() -> tokio::runtime::Handle {
	if let Ok(handle) = tokio::runtime::Handle::try_current() {
		return handle;
	}

	static GLOBAL_RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
	let runtime = GLOBAL_RT.get_or_init(|| {
		tokio::runtime::Builder::new_multi_thread()
			.enable_all()
			.worker_threads(1)
			.thread_name("couchconf-feed")
			.build()
			.expect("failed to build couchconf-feed background runtime")
	});
	runtime.handle().clone()
}

/// Spawns a long-lived background task on the caller's runtime, or on a
/// shared fallback runtime when called from synchronous host code.
pub fn spawn_background<F>(name: &'static str, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(task = name, "feed.spawn");
	runtime_handle().spawn(fut)
}
