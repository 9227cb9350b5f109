use std::sync::Arc;
use std::time::Duration;

use garde::Validate;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::error::{AnalysisError, EngineError};
use crate::models::analysis::AnalysisOutcome;
use crate::models::job::{
    cache_key, AnalysisType, Job, JobStatus, JobStatusResponse, JobSummary, SubmitResponse,
};
use crate::models::request::AnalysisRequest;
use crate::services::cache::{CacheStats, ResponseCache};
use crate::services::confidence::{self, ConfidenceVerdict};
use crate::services::job_store::JobStore;
use crate::services::parser;
use crate::services::prompts;
use crate::services::provider::ProviderClient;
use crate::services::stats::{self, JobStats};
use crate::services::storage::PhotoSource;

/// Owns the job store and response cache and drives each job through
/// `pending -> processing -> completed | failed`.
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Clone)]
pub struct JobEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: EngineConfig,
    store: JobStore,
    cache: ResponseCache,
    provider: Option<Arc<dyn ProviderClient>>,
    photos: Arc<dyn PhotoSource>,
}

/// What happened to a job after a failed attempt.
enum FailureDisposition {
    Retry { attempt: u32 },
    Failed,
}

impl JobEngine {
    pub fn new(
        config: EngineConfig,
        provider: Option<Arc<dyn ProviderClient>>,
        photos: Arc<dyn PhotoSource>,
    ) -> Self {
        let cache = ResponseCache::new(config.cache_ttl);
        Self {
            inner: Arc::new(EngineInner {
                config,
                store: JobStore::new(),
                cache,
                provider,
                photos,
            }),
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.inner.store
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.inner.cache
    }

    /// Accept an analysis request.
    ///
    /// A cached result produces a job that is already completed and never
    /// reaches the provider. Otherwise a pending job is created and run in the
    /// background. Identical requests that arrive while one is in flight each
    /// get their own job.
    pub fn submit(&self, request: AnalysisRequest) -> Result<SubmitResponse, EngineError> {
        request.validate()?;
        if self.inner.provider.is_none() {
            return Err(EngineError::ProviderUnavailable);
        }

        let AnalysisRequest {
            photo_id,
            user_id,
            analysis_type,
        } = request;
        metrics::counter!(
            "analysis_jobs_submitted_total",
            "analysis_type" => analysis_type.to_string()
        )
        .increment(1);

        let key = cache_key(&photo_id, analysis_type, &user_id);
        if let Some(cached) = self.inner.cache.get(&key) {
            // never started, so it stays out of the processing-time average
            let mut job = Job::new(
                &photo_id,
                &user_id,
                analysis_type,
                self.inner.config.max_retries,
            );
            job.mark_completed(AnalysisOutcome::Parsed(cached));
            let job = self.inner.store.insert(job);

            debug!(
                job_id = %job.id,
                analysis_type = %analysis_type,
                cache_key = %key,
                "Served analysis from cache"
            );
            return Ok(SubmitResponse {
                job_id: job.id,
                status: job.status,
            });
        }

        let job = self.inner.store.create(
            &photo_id,
            &user_id,
            analysis_type,
            self.inner.config.max_retries,
        );
        info!(
            job_id = %job.id,
            photo_id = %photo_id,
            analysis_type = %analysis_type,
            "Analysis job queued"
        );

        let engine = self.clone();
        let job_id = job.id.clone();
        tokio::spawn(async move {
            engine.run(&job_id).await;
        });

        Ok(SubmitResponse {
            job_id: job.id,
            status: job.status,
        })
    }

    /// Current state of a job. Callers must check ownership before exposing it.
    pub fn poll(&self, job_id: &str) -> Result<JobStatusResponse, EngineError> {
        self.inner.store.get(job_id).map(JobStatusResponse::from)
    }

    pub fn get_job(&self, job_id: &str) -> Result<Job, EngineError> {
        self.inner.store.get(job_id)
    }

    /// A user's jobs, newest first, without result payloads.
    pub fn list(&self, user_id: &str, limit: usize) -> Vec<JobSummary> {
        self.inner
            .store
            .list_by_user(user_id, limit)
            .iter()
            .map(JobSummary::from)
            .collect()
    }

    pub fn stats(&self) -> JobStats {
        stats::compute(&self.inner.store.snapshot())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Execute one attempt of a pending job.
    ///
    /// The job is claimed by moving it from `pending` to `processing` under its
    /// store lock; a run that finds the job in any other state does nothing,
    /// so concurrent runs of the same job never both write to it.
    pub async fn run(&self, job_id: &str) {
        let claimed = self.inner.store.update(job_id, |job| {
            if job.status != JobStatus::Pending {
                return None;
            }
            job.mark_processing();
            Some((
                job.photo_id.clone(),
                job.user_id.clone(),
                job.analysis_type,
                job.retry_count,
                job.cache_key(),
            ))
        });

        let (photo_id, user_id, analysis_type, retry_count, key) = match claimed {
            Ok(Some(claim)) => claim,
            Ok(None) => {
                debug!(job_id = %job_id, "Job is not pending, skipping run");
                return;
            }
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Job disappeared before it could run");
                return;
            }
        };

        info!(
            job_id = %job_id,
            analysis_type = %analysis_type,
            retry_count = retry_count,
            "Processing analysis job"
        );

        let start = Instant::now();
        match self.execute(&photo_id, &user_id, analysis_type).await {
            Ok(outcome) => {
                if let AnalysisOutcome::Parsed(result) = &outcome {
                    self.inner.cache.put(&key, result.clone());
                }
                let degraded = outcome.is_degraded();
                if let Err(e) = self
                    .inner
                    .store
                    .update(job_id, |job| job.mark_completed(outcome))
                {
                    warn!(job_id = %job_id, error = %e, "Job removed while processing");
                    return;
                }

                metrics::counter!("analysis_jobs_completed_total").increment(1);
                metrics::histogram!("analysis_processing_seconds")
                    .record(start.elapsed().as_secs_f64());
                info!(
                    job_id = %job_id,
                    analysis_type = %analysis_type,
                    degraded = degraded,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Analysis job completed"
                );
            }
            Err(err) => self.handle_failure(job_id, err),
        }
    }

    /// Load the photo, call the provider, parse and gate the response.
    async fn execute(
        &self,
        photo_id: &str,
        user_id: &str,
        analysis_type: AnalysisType,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let provider = self
            .inner
            .provider
            .as_ref()
            .ok_or(AnalysisError::NotConfigured)?;

        let image = self.inner.photos.load(photo_id, user_id).await?;
        image::guess_format(&image).map_err(|_| AnalysisError::UnsupportedImage)?;

        let prompt = prompts::build_prompt(analysis_type);
        let deadline = self.inner.config.provider_timeout;

        metrics::counter!("analysis_provider_calls_total").increment(1);
        let raw = tokio::time::timeout(deadline, provider.call(prompt, &image))
            .await
            .map_err(|_| AnalysisError::Timeout(deadline))??;

        let mut result = match parser::parse(&raw, analysis_type) {
            Ok(result) => result,
            Err(degraded) => {
                warn!(
                    photo_id = %photo_id,
                    analysis_type = %analysis_type,
                    reason = %degraded.reason,
                    "Provider response could not be parsed, returning degraded result"
                );
                return Ok(AnalysisOutcome::Degraded(degraded));
            }
        };

        match confidence::validate(result.confidence(), &self.inner.config.confidence)? {
            ConfidenceVerdict::Warning(score) => {
                warn!(
                    photo_id = %photo_id,
                    analysis_type = %analysis_type,
                    confidence = score,
                    "Analysis confidence below warning threshold"
                );
                result.push_warning(confidence::warning_message(score));
            }
            ConfidenceVerdict::Passed | ConfidenceVerdict::Ungated => {}
        }

        Ok(AnalysisOutcome::Parsed(result))
    }

    fn handle_failure(&self, job_id: &str, err: AnalysisError) {
        let retryable = err.is_retryable();
        let disposition = self.inner.store.update(job_id, |job| {
            if retryable && job.retry_count < job.max_retries {
                job.mark_retrying();
                FailureDisposition::Retry {
                    attempt: job.retry_count,
                }
            } else {
                job.mark_failed(err.public_message());
                FailureDisposition::Failed
            }
        });

        match disposition {
            Ok(FailureDisposition::Retry { attempt }) => {
                let delay = self.inner.config.retry_base_delay * attempt;
                metrics::counter!("analysis_jobs_retried_total").increment(1);
                warn!(
                    job_id = %job_id,
                    error = %err,
                    retry_count = attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Analysis attempt failed, scheduling retry"
                );
                self.schedule_retry(job_id.to_string(), delay);
            }
            Ok(FailureDisposition::Failed) => {
                metrics::counter!("analysis_jobs_failed_total", "reason" => err.reason())
                    .increment(1);
                error!(
                    job_id = %job_id,
                    error = %err,
                    retryable = retryable,
                    "Analysis job failed"
                );
            }
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Job removed while processing");
            }
        }
    }

    /// Re-run a job once `delay` has elapsed. Only this job's task waits.
    fn schedule_retry(&self, job_id: String, delay: Duration) {
        let engine = self.clone();
        let deadline = Instant::now() + delay;
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            engine.run(&job_id).await;
        });
    }

    /// Remove expired cache entries.
    pub fn sweep_cache(&self) -> usize {
        let removed = self.inner.cache.sweep();
        info!(removed = removed, "Swept expired cache entries");
        removed
    }

    /// Remove terminal jobs older than the retention window.
    pub fn sweep_jobs(&self) -> usize {
        let removed = self.inner.store.sweep(self.inner.config.job_retention);
        info!(removed = removed, "Swept expired jobs");
        removed
    }

    /// Start the periodic cache and job sweeps.
    pub fn spawn_maintenance(&self) -> MaintenanceHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let cache_task = spawn_periodic(
            "cache_sweep",
            self.inner.config.cache_sweep_interval,
            shutdown_rx.clone(),
            {
                let engine = self.clone();
                move || {
                    engine.sweep_cache();
                }
            },
        );
        let job_task = spawn_periodic(
            "job_sweep",
            self.inner.config.job_sweep_interval,
            shutdown_rx,
            {
                let engine = self.clone();
                move || {
                    engine.sweep_jobs();
                }
            },
        );

        MaintenanceHandle {
            shutdown: shutdown_tx,
            tasks: vec![cache_task, job_task],
        }
    }
}

/// Shortest period a maintenance task will tick at.
const MIN_MAINTENANCE_PERIOD: Duration = Duration::from_millis(1);

fn spawn_periodic<F>(
    name: &'static str,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() + Send + 'static,
{
    // interval_at panics on a zero period
    let period = period.max(MIN_MAINTENANCE_PERIOD);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        debug!(task = name, period_ms = period.as_millis() as u64, "Maintenance task started");
        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    // a dropped handle also stops the task
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => tick(),
            }
        }
        debug!(task = name, "Maintenance task stopped");
    })
}

/// Handle for the background sweep tasks.
pub struct MaintenanceHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl MaintenanceHandle {
    /// Stop both sweeps and wait for them to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
    }
}
