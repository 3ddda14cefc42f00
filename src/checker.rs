use std::{future::Future, sync::Arc, time::Duration};

use anyhow::{Result, ensure};
use indicatif::ProgressBar;
use reqwest::StatusCode;
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, info};

use crate::playlist::Entry;

/// Configuration for a single checking run.
#[derive(Debug, Clone)]
pub struct CheckConfig {
    /// Maximum number of probes in flight at once.
    pub concurrency: usize,
    /// Timeout applied to each probe attempt.
    pub timeout: Duration,
    /// Additional attempts after a failed probe.
    pub retries: u32,
    /// Emit a `Live/Valid` / `Dead/Invalid` line per probed URL.
    pub verbose: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            timeout: Duration::from_secs(5),
            retries: 3,
            verbose: false,
        }
    }
}

/// The liveness verdict for the entry at `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub index: usize,
    pub live: bool,
}

/// Issues one reachability check per URL, with timeout and retry.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
    timeout: Duration,
    retries: u32,
    verbose: bool,
}

impl HttpProber {
    #[must_use]
    pub fn new(client: reqwest::Client, config: &CheckConfig) -> Self {
        Self {
            client,
            timeout: config.timeout,
            retries: config.retries,
            verbose: config.verbose,
        }
    }

    /// Probes `url` with a HEAD request, retrying immediately on failure.
    ///
    /// A URL is live only when a response arrives within the timeout and its
    /// status is exactly 200. Transport errors and every other status count
    /// as a failed attempt. All failure modes degrade to `false` once the
    /// attempts are exhausted; this never returns an error.
    pub async fn probe(&self, url: &str) -> bool {
        for attempt in 0..=self.retries {
            match self.client.head(url).timeout(self.timeout).send().await {
                Ok(res) if res.status() == StatusCode::OK => {
                    if self.verbose {
                        info!("Live/Valid: {url}");
                    }
                    return true;
                }
                Ok(res) => {
                    if attempt == self.retries {
                        debug!("{url} answered {} after {attempt} retries", res.status());
                    }
                }
                Err(e) => {
                    if attempt == self.retries {
                        debug!("Error checking URL: {url} - {e}");
                    }
                }
            }
        }

        if self.verbose {
            info!("Dead/Invalid: {url}");
        }
        false
    }
}

/// Runs probes over a set of entries with bounded parallelism.
///
/// Constructed once per run; validates the configuration before any probe is
/// dispatched.
#[derive(Debug)]
pub struct Checker {
    prober: HttpProber,
    concurrency: usize,
}

impl Checker {
    /// # Errors
    /// Errors when the configuration cannot drive a run (zero concurrency or
    /// a zero timeout).
    pub fn new(client: reqwest::Client, config: &CheckConfig) -> Result<Self> {
        ensure!(config.concurrency > 0, "concurrency must be at least 1");
        ensure!(!config.timeout.is_zero(), "probe timeout must be positive");

        Ok(Self {
            prober: HttpProber::new(client, config),
            concurrency: config.concurrency,
        })
    }

    /// Probes every entry and returns exactly one result per entry.
    ///
    /// Results carry the originating entry index and may arrive in any
    /// completion order. Returns only once every probe has finished; a dead
    /// URL never aborts its siblings. `progress` is ticked once per
    /// completed probe.
    pub async fn run(&self, entries: &[Entry], progress: Option<&ProgressBar>) -> Vec<ProbeResult> {
        dispatch(entries.len(), self.concurrency, progress, |index| {
            let prober = self.prober.clone();
            let url = entries[index].url_text().to_string();
            async move { prober.probe(&url).await }
        })
        .await
    }
}

/// Spawns one task per work item, gated by a semaphore of `concurrency`
/// permits, and gathers every verdict keyed by item index.
async fn dispatch<F, Fut>(
    total: usize,
    concurrency: usize,
    progress: Option<&ProgressBar>,
    mut probe: F,
) -> Vec<ProbeResult>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = bool> + Send + 'static,
{
    let slots = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();

    for index in 0..total {
        let slots = Arc::clone(&slots);
        let attempt = probe(index);

        tasks.spawn(async move {
            let _permit = slots.acquire_owned().await.expect("probe semaphore closed");
            ProbeResult {
                index,
                live: attempt.await,
            }
        });
    }

    let mut results = Vec::with_capacity(total);
    while let Some(joined) = tasks.join_next().await {
        results.push(joined.expect("probe task panicked"));
        if let Some(bar) = progress {
            bar.inc(1);
        }
    }

    results
}

/// Keeps the entries whose probe came back live, in original relative order.
///
/// # Panics
/// Panics when `results` does not hold exactly one verdict per entry, which
/// is a caller contract violation.
#[must_use]
pub fn collate(entries: Vec<Entry>, results: &[ProbeResult]) -> Vec<Entry> {
    assert_eq!(
        entries.len(),
        results.len(),
        "expected one probe result per entry"
    );

    let mut live = vec![false; entries.len()];
    for result in results {
        live[result.index] = result.live;
    }

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| live[index].then_some(entry))
        .collect()
}
