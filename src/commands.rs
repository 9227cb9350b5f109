//! JSON-lines command protocol spoken by the engine binary.
//!
//! Each input line is one [`Command`]; each output line is a [`Reply`].

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::job::AnalysisType;
use crate::models::request::AnalysisRequest;
use crate::services::engine::JobEngine;

const DEFAULT_LIST_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    #[serde(rename_all = "camelCase")]
    Submit {
        photo_id: String,
        user_id: String,
        analysis_type: AnalysisType,
    },
    #[serde(rename_all = "camelCase")]
    Poll { job_id: String, user_id: String },
    #[serde(rename_all = "camelCase")]
    List {
        user_id: String,
        limit: Option<usize>,
    },
    Stats,
}

#[derive(Debug, Serialize)]
pub struct Reply {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Reply {
    fn success<T: Serialize>(data: T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self {
                ok: true,
                data: Some(value),
                error: None,
            },
            Err(e) => Self::failure(format!("Failed to encode reply: {}", e)),
        }
    }

    fn failure(message: String) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message),
        }
    }
}

impl From<EngineError> for Reply {
    fn from(err: EngineError) -> Self {
        Reply::failure(err.to_string())
    }
}

/// Parse and execute one input line.
pub fn handle_line(engine: &JobEngine, line: &str) -> Reply {
    match serde_json::from_str::<Command>(line) {
        Ok(command) => handle(engine, command),
        Err(e) => Reply::failure(format!("Invalid command: {}", e)),
    }
}

pub fn handle(engine: &JobEngine, command: Command) -> Reply {
    match command {
        Command::Submit {
            photo_id,
            user_id,
            analysis_type,
        } => match engine.submit(AnalysisRequest {
            photo_id,
            user_id,
            analysis_type,
        }) {
            Ok(response) => Reply::success(response),
            Err(e) => e.into(),
        },
        Command::Poll { job_id, user_id } => match engine.get_job(&job_id) {
            // Another user's job is reported exactly like a missing one.
            Ok(job) if job.user_id == user_id => {
                Reply::success(crate::models::job::JobStatusResponse::from(job))
            }
            Ok(_) => EngineError::NotFound(job_id).into(),
            Err(e) => e.into(),
        },
        Command::List { user_id, limit } => {
            Reply::success(engine.list(&user_id, limit.unwrap_or(DEFAULT_LIST_LIMIT)))
        }
        Command::Stats => Reply::success(engine.stats()),
    }
}
