use chrono::Utc;
use dashmap::DashMap;

use crate::error::EngineError;
use crate::models::job::{AnalysisType, Job};

/// In-memory owner of all job records, indexed by ID and by owning user.
///
/// Callers only ever receive clones; all mutation goes through
/// [`JobStore::update`], which holds the job's shard lock for the duration of
/// the mutator.
#[derive(Default)]
pub struct JobStore {
    jobs: DashMap<String, Job>,
    by_user: DashMap<String, Vec<String>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and store a new pending job.
    pub fn create(
        &self,
        photo_id: &str,
        user_id: &str,
        analysis_type: AnalysisType,
        max_retries: u32,
    ) -> Job {
        self.insert(Job::new(photo_id, user_id, analysis_type, max_retries))
    }

    /// Store a prepared job record and return a snapshot of it.
    pub(crate) fn insert(&self, job: Job) -> Job {
        self.by_user
            .entry(job.user_id.clone())
            .or_default()
            .push(job.id.clone());
        self.jobs.insert(job.id.clone(), job.clone());
        job
    }

    pub fn get(&self, job_id: &str) -> Result<Job, EngineError> {
        self.jobs
            .get(job_id)
            .map(|job| job.value().clone())
            .ok_or_else(|| EngineError::NotFound(job_id.to_string()))
    }

    /// A user's jobs, newest first.
    pub fn list_by_user(&self, user_id: &str, limit: usize) -> Vec<Job> {
        let ids = match self.by_user.get(user_id) {
            Some(ids) => ids.clone(),
            None => return Vec::new(),
        };

        let mut jobs: Vec<Job> = ids
            .iter()
            .filter_map(|id| self.jobs.get(id).map(|job| job.value().clone()))
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit);
        jobs
    }

    /// Apply `mutator` to a job atomically and return its output.
    pub fn update<F, R>(&self, job_id: &str, mutator: F) -> Result<R, EngineError>
    where
        F: FnOnce(&mut Job) -> R,
    {
        let mut job = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| EngineError::NotFound(job_id.to_string()))?;
        Ok(mutator(&mut job))
    }

    /// Copy of every job, for read-only aggregation.
    pub fn snapshot(&self) -> Vec<Job> {
        self.jobs.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Delete terminal jobs that finished more than `retention` ago.
    /// Returns how many were removed.
    pub fn sweep(&self, retention: chrono::Duration) -> usize {
        let cutoff = Utc::now() - retention;
        let mut removed: Vec<(String, String)> = Vec::new();

        self.jobs.retain(|id, job| {
            let finished = job.completed_at.unwrap_or(job.created_at);
            let expired = job.status.is_terminal() && finished < cutoff;
            if expired {
                removed.push((job.user_id.clone(), id.clone()));
            }
            !expired
        });

        for (user_id, job_id) in &removed {
            if let Some(mut ids) = self.by_user.get_mut(user_id) {
                ids.retain(|id| id != job_id);
            }
        }
        self.by_user.retain(|_, ids| !ids.is_empty());

        removed.len()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
