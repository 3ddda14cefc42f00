use reqwest::header::{HeaderMap, HeaderValue};
use rlimit::Resource;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// # Panics
pub fn warn_ulimit() {
    let (limit, _) = rlimit::getrlimit(Resource::NOFILE).unwrap();
    if limit <= 2048 {
        warn!(
            "Your file limit is very low which may introduce errors while probing many URLs at once. Consider raising your file limit via `ulimit -n 10240`"
        );
    }
}

#[must_use]
pub fn init_http_client() -> reqwest::Client {
    let mut headers = HeaderMap::new();
    headers.insert(
        "User-Agent",
        HeaderValue::from_str(&format!(
            "{}/{} (+{})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_REPOSITORY")
        ))
        .expect("valid User-Agent header"),
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .expect("Unable to build HTTP client")
}

/// Spawn a task that watches for CTRL + C signal and cancels a [`CancellationToken`] when caught
pub fn spawn_ct_watcher(ct: CancellationToken) {
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Caught CTRL+C signal!");
        ct.cancel();
    });
}
