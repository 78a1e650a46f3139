//! Scheduled fetch → parse → merge → reload cycle. One update tick fetches
//! every configured source, merges whatever succeeded into the on-disk
//! blocklist artifact, and — if the merge produced a result — swaps the
//! matcher to the new snapshot. A tick with zero successful fetches is
//! reported as failed and does not touch the artifact.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;

use super::fetcher::SourceFetcher;
use super::merger::{self, SourceInput};
use crate::config::{Source, SourceConfig};
use crate::error::Result;
use crate::matcher::Matcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdaterPhase {
    Idle,
    Fetching,
    Merging,
    ReloadNotify,
}

#[derive(Debug, Default)]
pub struct UpdateReport {
    pub sources_attempted: usize,
    pub sources_succeeded: usize,
    pub domain_count: usize,
}

/// Drives the scheduled update cycle. Holds no lock across an `.await`
/// boundary — the fetch/merge/reload sequence is inherently sequential
/// per tick, so there is nothing to contend on between ticks.
pub struct Updater {
    fetcher: SourceFetcher,
    source_config: SourceConfig,
    matcher: Arc<Matcher>,
    blocklist_path: PathBuf,
    whitelist_path: Option<PathBuf>,
    cache_dir: PathBuf,
    preset: Option<String>,
    interval: Duration,
    running: AtomicBool,
    stop: Notify,
    run_now: Notify,
    last_run_epoch_secs: AtomicU64,
}

impl Updater {
    pub fn new(
        fetcher: SourceFetcher,
        source_config: SourceConfig,
        matcher: Arc<Matcher>,
        blocklist_path: PathBuf,
        whitelist_path: Option<PathBuf>,
        cache_dir: PathBuf,
        preset: Option<String>,
        interval: Duration,
    ) -> Self {
        Updater {
            fetcher,
            source_config,
            matcher,
            blocklist_path,
            whitelist_path,
            cache_dir,
            preset,
            interval,
            running: AtomicBool::new(true),
            stop: Notify::new(),
            run_now: Notify::new(),
            last_run_epoch_secs: AtomicU64::new(0),
        }
    }

    /// Triggers an out-of-cycle update without resetting the periodic
    /// timer — a manual "update now" request and the next scheduled tick
    /// are independent.
    pub fn trigger_now(&self) {
        self.run_now.notify_one();
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stop.notify_waiters();
    }

    /// Runs until `stop()` is called. A tick that fails with a fatal
    /// error (as opposed to individual source fetch failures, which are
    /// tolerated) sleeps 60s and retries rather than exiting the loop.
    pub async fn run(&self, run_on_startup: bool) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        if run_on_startup {
            self.run_tick().await;
        } else {
            interval.tick().await;
        }

        while self.running.load(Ordering::SeqCst) {
            tokio::select! {
                _ = interval.tick() => {
                    self.run_tick().await;
                }
                _ = self.run_now.notified() => {
                    self.run_tick().await;
                }
                _ = self.stop.notified() => {
                    break;
                }
            }
        }
    }

    async fn run_tick(&self) {
        match self.perform_update().await {
            Ok(report) if report.sources_succeeded > 0 => {
                tracing::info!(
                    attempted = report.sources_attempted,
                    succeeded = report.sources_succeeded,
                    domains = report.domain_count,
                    "blocklist update complete"
                );
            }
            Ok(_) => {
                tracing::warn!("blocklist update tick had zero successful sources, artifact untouched");
            }
            Err(e) => {
                tracing::error!(error = %e, "blocklist update tick failed, retrying in 60s");
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
        }
        self.last_run_epoch_secs.store(now_epoch_secs(), Ordering::Relaxed);
    }

    async fn perform_update(&self) -> Result<UpdateReport> {
        let sources = self.source_config.resolve_for_update(self.preset.as_deref());
        let attempted = sources.len();

        let mut fetched_texts: Vec<(Source, String)> = Vec::new();
        for source in sources {
            match self.fetcher.fetch(&source).await {
                Ok(report) => match tokio::fs::read_to_string(&report.path).await {
                    Ok(text) => fetched_texts.push((source, text)),
                    Err(e) => tracing::warn!(id = %source.id, error = %e, "failed to re-read fetched source"),
                },
                Err(e) => tracing::warn!(id = %source.id, error = %e, "source fetch failed, skipping"),
            }
        }

        let succeeded = fetched_texts.len();
        if succeeded == 0 {
            return Ok(UpdateReport {
                sources_attempted: attempted,
                sources_succeeded: 0,
                domain_count: 0,
            });
        }

        let inputs: Vec<SourceInput> = fetched_texts
            .iter()
            .map(|(source, text)| SourceInput {
                id: &source.id,
                text,
                format: source.format,
            })
            .collect();

        let merge_report = merger::merge(&inputs, &self.blocklist_path)?;

        self.matcher.reload_from_files(&self.blocklist_path, self.whitelist_path.as_deref())?;

        Ok(UpdateReport {
            sources_attempted: attempted,
            sources_succeeded: succeeded,
            domain_count: merge_report.domain_count,
        })
    }

    pub fn cache_dir(&self) -> &PathBuf {
        &self.cache_dir
    }
}

fn now_epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
