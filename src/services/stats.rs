use serde::Serialize;

use crate::models::job::{Job, JobStatus};

/// Aggregate view over all retained jobs.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobStats {
    pub total_jobs: usize,
    pub pending_jobs: usize,
    pub processing_jobs: usize,
    pub completed_jobs: usize,
    pub failed_jobs: usize,
    /// Mean of `completed_at - started_at` over completed jobs, in milliseconds.
    pub average_processing_time: f64,
    /// Completed jobs as a percentage of all jobs.
    pub success_rate: f64,
}

/// Compute stats from a snapshot of jobs.
pub fn compute(jobs: &[Job]) -> JobStats {
    let mut stats = JobStats {
        total_jobs: jobs.len(),
        ..Default::default()
    };

    let mut processing_total_ms = 0i64;
    let mut timed = 0usize;

    for job in jobs {
        match job.status {
            JobStatus::Pending => stats.pending_jobs += 1,
            JobStatus::Processing => stats.processing_jobs += 1,
            JobStatus::Completed => stats.completed_jobs += 1,
            JobStatus::Failed => stats.failed_jobs += 1,
        }
        if let Some(elapsed) = job.processing_time() {
            processing_total_ms += elapsed.num_milliseconds();
            timed += 1;
        }
    }

    if timed > 0 {
        stats.average_processing_time = processing_total_ms as f64 / timed as f64;
    }
    if stats.total_jobs > 0 {
        stats.success_rate = stats.completed_jobs as f64 / stats.total_jobs as f64 * 100.0;
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::{AnalysisOutcome, AnalysisResult, MealAnalysis};
    use crate::models::job::AnalysisType;
    use chrono::{Duration, Utc};

    fn completed(ms: i64) -> Job {
        let mut job = Job::new("p", "u", AnalysisType::Meal, 3);
        job.mark_processing();
        job.mark_completed(AnalysisOutcome::Parsed(AnalysisResult::Meal(
            MealAnalysis::default(),
        )));
        let start = Utc::now();
        job.started_at = Some(start);
        job.completed_at = Some(start + Duration::milliseconds(ms));
        job
    }

    fn failed(ms: i64) -> Job {
        let mut job = Job::new("p", "u", AnalysisType::Meal, 3);
        job.mark_processing();
        job.mark_failed("nope".to_string());
        let start = Utc::now();
        job.started_at = Some(start);
        job.completed_at = Some(start + Duration::milliseconds(ms));
        job
    }

    #[test]
    fn test_empty_store() {
        assert_eq!(compute(&[]), JobStats::default());
    }

    #[test]
    fn test_success_rate_and_average_over_completed_only() {
        let jobs = vec![completed(1000), completed(3000), completed(2000), failed(60_000)];
        let stats = compute(&jobs);
        assert_eq!(stats.total_jobs, 4);
        assert_eq!(stats.completed_jobs, 3);
        assert_eq!(stats.failed_jobs, 1);
        assert!((stats.success_rate - 75.0).abs() < 1e-9);
        assert!((stats.average_processing_time - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_counts_in_flight_jobs() {
        let mut processing = Job::new("p", "u", AnalysisType::Body, 3);
        processing.mark_processing();
        let pending = Job::new("p", "u", AnalysisType::Body, 3);
        let stats = compute(&[processing, pending, completed(500)]);
        assert_eq!(stats.pending_jobs, 1);
        assert_eq!(stats.processing_jobs, 1);
        assert_eq!(stats.average_processing_time, 500.0);
        assert!((stats.success_rate - 100.0 / 3.0).abs() < 1e-9);
    }
}
