//! Test doubles for the engine's collaborators.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use photo_analysis_engine::config::EngineConfig;
use photo_analysis_engine::models::job::JobStatusResponse;
use photo_analysis_engine::services::engine::JobEngine;
use photo_analysis_engine::services::provider::{ProviderClient, ProviderError};
use photo_analysis_engine::services::storage::{PhotoSource, StorageError};
use tokio::time::sleep;

use crate::fixtures;

/// One scripted provider behaviour.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(&'static str),
    /// 503 from the provider.
    Unavailable,
    /// 400 from the provider.
    Rejected,
    /// Never answers.
    Hang,
}

/// Provider that replays scripted replies and counts calls.
pub struct MockProvider {
    script: Mutex<VecDeque<MockReply>>,
    fallback: MockReply,
    calls: AtomicUsize,
    latency: Option<Duration>,
}

impl MockProvider {
    pub fn always(reply: MockReply) -> Arc<Self> {
        Self::scripted(Vec::new(), reply)
    }

    /// Replies from `script` in order, then `fallback` forever.
    pub fn scripted(script: Vec<MockReply>, fallback: MockReply) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
            latency: None,
        })
    }

    pub fn slow(reply: MockReply, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: reply,
            calls: AtomicUsize::new(0),
            latency: Some(latency),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    async fn call(&self, _prompt: &str, _image: &[u8]) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        if let Some(latency) = self.latency {
            sleep(latency).await;
        }

        match reply {
            MockReply::Text(text) => Ok(text.to_string()),
            MockReply::Unavailable => Err(ProviderError::Api {
                status: 503,
                message: "upstream overloaded".to_string(),
            }),
            MockReply::Rejected => Err(ProviderError::Api {
                status: 400,
                message: "image rejected".to_string(),
            }),
            MockReply::Hang => std::future::pending().await,
        }
    }
}

/// Photo source backed by a map of `photo_id -> bytes`.
#[derive(Default)]
pub struct InMemoryPhotos {
    photos: HashMap<String, Vec<u8>>,
}

impl InMemoryPhotos {
    pub fn with_photo(mut self, photo_id: &str, bytes: &[u8]) -> Self {
        self.photos.insert(photo_id.to_string(), bytes.to_vec());
        self
    }
}

#[async_trait]
impl PhotoSource for InMemoryPhotos {
    async fn load(&self, photo_id: &str, _user_id: &str) -> Result<Vec<u8>, StorageError> {
        self.photos
            .get(photo_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(photo_id.to_string()))
    }
}

/// Photos `p1`..`p5` as valid PNG bytes.
pub fn standard_photos() -> Arc<InMemoryPhotos> {
    let photos = (1..=5).fold(InMemoryPhotos::default(), |photos, n| {
        photos.with_photo(&format!("p{}", n), fixtures::PNG_BYTES)
    });
    Arc::new(photos)
}

pub fn engine_with(provider: Arc<MockProvider>, config: EngineConfig) -> JobEngine {
    JobEngine::new(config, Some(provider), standard_photos())
}

/// Poll until the job reaches `completed` or `failed`.
pub async fn wait_for_terminal(engine: &JobEngine, job_id: &str) -> JobStatusResponse {
    for _ in 0..100_000 {
        let status = engine.poll(job_id).expect("job should exist");
        if status.status.is_terminal() {
            return status;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not finish", job_id);
}
