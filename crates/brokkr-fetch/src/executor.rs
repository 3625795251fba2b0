//! Bounded-concurrency download executor
//!
//! All tasks in a batch are spawned at once; an owned semaphore permit
//! caps how many touch the network simultaneously. Execution order is
//! unordered but results are index-preserving: `results[i]` corresponds
//! to `tasks[i]`, so callers can zip tasks and results positionally.
//! A task-level failure never aborts its siblings.

use brokkr_core::error::{Error, Result};
use brokkr_core::types::{DownloadResult, DownloadTask, NetworkConfig};
use futures_util::StreamExt;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use reqwest::StatusCode;
use std::fs;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// How a single transfer ended when it did not fail
enum Transfer {
    /// Body streamed to disk, counting the given number of bytes
    Completed(u64),

    /// Optional file absent upstream; nothing left on disk
    SkippedOptional,
}

/// Executes download batches against one shared HTTP client
pub struct DownloadExecutor {
    client: reqwest::Client,
    concurrency: usize,
    show_progress: bool,
}

impl DownloadExecutor {
    /// Build an executor from network settings and a concurrency ceiling.
    ///
    /// The request timeout applies per transfer for the whole batch; it
    /// is not adjustable mid-batch.
    pub fn new(network: &NetworkConfig, concurrency: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&network.user_agent)
            .timeout(Duration::from_secs(network.download_timeout_secs))
            .build()
            .map_err(|e| Error::network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            concurrency: concurrency.max(1),
            show_progress: false,
        })
    }

    /// Enable or disable per-file progress bars
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Run every task in the batch, at most `concurrency` at a time.
    ///
    /// Dropping the returned future cancels in-flight workers at their
    /// next await point, including while parked on permit acquisition.
    pub async fn process(&self, tasks: Vec<DownloadTask>) -> Vec<DownloadResult> {
        if tasks.is_empty() {
            return Vec::new();
        }

        // Kept so a panicked worker still yields a failed result at its slot.
        let snapshots: Vec<DownloadTask> = tasks.clone();

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let progress = self.show_progress.then(MultiProgress::new);
        let mut join_set = JoinSet::new();

        for (index, task) in tasks.into_iter().enumerate() {
            let client = self.client.clone();
            let semaphore = semaphore.clone();
            let bar = progress.as_ref().map(|mp| {
                let pb = mp.add(ProgressBar::new(0));
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("{msg:30} [{wide_bar:.cyan/blue}] {bytes}/{total_bytes}")
                        .expect("Invalid progress bar template")
                        .progress_chars("#>-"),
                );
                pb.set_message(task.file_name());
                pb
            });

            join_set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (index, DownloadResult::failed(task, "executor shut down"));
                    }
                };

                let result = download_one(&client, task, bar.as_ref()).await;

                if let Some(pb) = bar {
                    if result.success {
                        pb.finish();
                    } else {
                        pb.abandon_with_message(format!("{} failed", result.task.file_name()));
                    }
                }

                (index, result)
            });
        }

        let mut slots: Vec<Option<DownloadResult>> = snapshots.iter().map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => warn!("download worker panicked: {}", e),
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    DownloadResult::failed(snapshots[index].clone(), "download worker panicked")
                })
            })
            .collect()
    }
}

/// Run one task to completion, converting every failure mode into a
/// failed result for this task only
async fn download_one(
    client: &reqwest::Client,
    task: DownloadTask,
    bar: Option<&ProgressBar>,
) -> DownloadResult {
    let started = Instant::now();

    match transfer(client, &task, bar).await {
        Ok(Transfer::Completed(bytes)) => {
            debug!("downloaded {} ({} bytes)", task.url, bytes);
            DownloadResult::succeeded(task, bytes, started.elapsed())
        }
        Ok(Transfer::SkippedOptional) => DownloadResult::succeeded(task, 0, started.elapsed()),
        Err(message) => {
            // Best-effort removal of the partial file.
            let _ = fs::remove_file(&task.output_path);
            let mut result = DownloadResult::failed(task, message);
            result.duration = started.elapsed();
            result
        }
    }
}

async fn transfer(
    client: &reqwest::Client,
    task: &DownloadTask,
    bar: Option<&ProgressBar>,
) -> std::result::Result<Transfer, String> {
    if let Some(parent) = task.output_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create {}: {}", parent.display(), e))?;
    }

    let mut file = fs::File::create(&task.output_path)
        .map_err(|e| format!("failed to create {}: {}", task.output_path.display(), e))?;

    let mut request = client.get(&task.url);
    for (name, value) in &task.headers {
        request = request.header(name, value);
    }

    let response = request
        .send()
        .await
        .map_err(|e| format!("request for {} failed: {}", task.url, e))?;

    let status = response.status();
    if !status.is_success() {
        if task.optional && (status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN) {
            // Upstream does not publish this file for every release;
            // drop the empty placeholder and report success.
            drop(file);
            let _ = fs::remove_file(&task.output_path);
            debug!("optional file {} absent upstream ({})", task.url, status);
            return Ok(Transfer::SkippedOptional);
        }
        return Err(format!("unexpected status {} for {}", status, task.url));
    }

    if let (Some(pb), Some(total)) = (bar, response.content_length()) {
        pb.set_length(total);
    }

    let mut downloaded: u64 = 0;
    let mut stream = response.bytes_stream();

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| format!("failed to read download chunk: {}", e))?;
        file.write_all(&chunk)
            .map_err(|e| format!("failed to write {}: {}", task.output_path.display(), e))?;
        downloaded += chunk.len() as u64;

        if let Some(pb) = bar {
            pb.set_position(downloaded);
        }
    }

    Ok(Transfer::Completed(downloaded))
}
