use crate::{model_state::LoadPhase, tutor::TutorSettings};
use serde::{Deserialize, Serialize};

/// Seconds since the Unix epoch, with sub-second precision.
pub fn timestamp() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorContext {
    TextTutor,
    ImageAnalyzer,
    Protocol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeartbeatStatus {
    Ready,
    Loading,
    Failed,
}

impl From<LoadPhase> for HeartbeatStatus {
    fn from(phase: LoadPhase) -> Self {
        match phase {
            LoadPhase::Ready => Self::Ready,
            LoadPhase::Failed => Self::Failed,
            LoadPhase::Unloaded | LoadPhase::Loading => Self::Loading,
        }
    }
}

/// Frames sent to clients as `{"event": ..., "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    ConnectionEstablished {
        client_id: String,
        models_loaded: bool,
        timestamp: f64,
    },
    ModelLoadingStatus {
        message: String,
        timestamp: f64,
    },
    KeepAlive {
        status: HeartbeatStatus,
        active_connections: usize,
        timestamp: f64,
    },
    TextResponseStart {
        message_id: String,
        timestamp: f64,
    },
    TextResponseChunk {
        message_id: String,
        content: String,
        timestamp: f64,
    },
    TextResponseComplete {
        message_id: String,
        timestamp: f64,
    },
    ImageAnalysisStart {
        client_id: String,
        timestamp: f64,
    },
    ImageAnalysisResult {
        result: String,
        client_id: String,
        timestamp: f64,
    },
    Error {
        message: String,
        context: ErrorContext,
        timestamp: f64,
    },
    Pong {
        client_id: String,
        timestamp: f64,
    },
}

impl ServerEvent {
    pub fn connection_established(client_id: impl Into<String>, models_loaded: bool) -> Self {
        Self::ConnectionEstablished {
            client_id: client_id.into(),
            models_loaded,
            timestamp: timestamp(),
        }
    }

    pub fn loading_status(message: impl Into<String>) -> Self {
        Self::ModelLoadingStatus {
            message: message.into(),
            timestamp: timestamp(),
        }
    }

    pub fn keep_alive(status: HeartbeatStatus, active_connections: usize) -> Self {
        Self::KeepAlive {
            status,
            active_connections,
            timestamp: timestamp(),
        }
    }

    pub fn text_start(message_id: impl Into<String>) -> Self {
        Self::TextResponseStart {
            message_id: message_id.into(),
            timestamp: timestamp(),
        }
    }

    pub fn text_chunk(message_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::TextResponseChunk {
            message_id: message_id.into(),
            content: content.into(),
            timestamp: timestamp(),
        }
    }

    pub fn text_complete(message_id: impl Into<String>) -> Self {
        Self::TextResponseComplete {
            message_id: message_id.into(),
            timestamp: timestamp(),
        }
    }

    pub fn image_start(client_id: impl Into<String>) -> Self {
        Self::ImageAnalysisStart {
            client_id: client_id.into(),
            timestamp: timestamp(),
        }
    }

    pub fn image_result(result: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self::ImageAnalysisResult {
            result: result.into(),
            client_id: client_id.into(),
            timestamp: timestamp(),
        }
    }

    pub fn error(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Error {
            message: message.into(),
            context,
            timestamp: timestamp(),
        }
    }

    pub fn pong(client_id: impl Into<String>) -> Self {
        Self::Pong {
            client_id: client_id.into(),
            timestamp: timestamp(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ConnectionEstablished { .. } => "connection_established",
            Self::ModelLoadingStatus { .. } => "model_loading_status",
            Self::KeepAlive { .. } => "keep_alive",
            Self::TextResponseStart { .. } => "text_response_start",
            Self::TextResponseChunk { .. } => "text_response_chunk",
            Self::TextResponseComplete { .. } => "text_response_complete",
            Self::ImageAnalysisStart { .. } => "image_analysis_start",
            Self::ImageAnalysisResult { .. } => "image_analysis_result",
            Self::Error { .. } => "error",
            Self::Pong { .. } => "pong",
        }
    }

    /// Request id for the text response events.
    pub fn message_id(&self) -> Option<&str> {
        match self {
            Self::TextResponseStart { message_id, .. }
            | Self::TextResponseChunk { message_id, .. }
            | Self::TextResponseComplete { message_id, .. } => Some(message_id),
            _ => None,
        }
    }

    pub fn timestamp(&self) -> f64 {
        match self {
            Self::ConnectionEstablished { timestamp, .. }
            | Self::ModelLoadingStatus { timestamp, .. }
            | Self::KeepAlive { timestamp, .. }
            | Self::TextResponseStart { timestamp, .. }
            | Self::TextResponseChunk { timestamp, .. }
            | Self::TextResponseComplete { timestamp, .. }
            | Self::ImageAnalysisStart { timestamp, .. }
            | Self::ImageAnalysisResult { timestamp, .. }
            | Self::Error { timestamp, .. }
            | Self::Pong { timestamp, .. } => *timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorRequest {
    pub message: String,
    #[serde(default)]
    pub settings: TutorSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageQuestion {
    /// Remote URL, local path or `data:image/...;base64,` payload.
    pub image_url: String,
    pub question: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PingPayload {
    #[serde(default)]
    pub timestamp: Option<f64>,
}

/// Frames received from clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    AskAiTutor(TutorRequest),
    AskImageQuestion(ImageQuestion),
    Ping(PingPayload),
}
