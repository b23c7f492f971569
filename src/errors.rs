use serde::Serialize;

/// All application errors, categorized by domain.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ── Data / Import ──
    #[error("Invalid CSV format: {0}")]
    InvalidCsvFormat(String),

    #[error("Failed to read record stream: {0}")]
    StreamRead(String),

    #[error("Dataset contains no records")]
    EmptyDataset,

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read file: {0}")]
    FileRead(String),

    #[error("Failed to write file: {0}")]
    FileWrite(String),

    #[error("Ingestion cancelled")]
    IngestionCancelled,

    #[error("Ingestion superseded by a newer dataset")]
    IngestionSuperseded,

    // ── Query / Playback ──
    #[error("No order book data available")]
    NoData,

    #[error("Playback session is closed")]
    PlaybackClosed,

    // ── Configuration ──
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Serialization ──
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ── General ──
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Serializable error response for the frontend.
#[derive(Debug, Serialize, Clone)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        let code = match err {
            AppError::InvalidCsvFormat(_) => "INVALID_CSV_FORMAT",
            AppError::StreamRead(_) => "STREAM_READ",
            AppError::EmptyDataset => "EMPTY_DATASET",
            AppError::FileNotFound(_) => "FILE_NOT_FOUND",
            AppError::FileRead(_) => "FILE_READ",
            AppError::FileWrite(_) => "FILE_WRITE",
            AppError::IngestionCancelled => "INGESTION_CANCELLED",
            AppError::IngestionSuperseded => "INGESTION_SUPERSEDED",
            AppError::NoData => "NO_DATA",
            AppError::PlaybackClosed => "PLAYBACK_CLOSED",
            AppError::InvalidConfig(_) => "INVALID_CONFIG",
            AppError::Serialization(_) => "SERIALIZATION",
            AppError::Internal(_) => "INTERNAL",
        };
        ErrorResponse {
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

// Allow AppError to be returned from Tauri commands.
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let response = ErrorResponse::from(self);
        response.serialize(serializer)
    }
}

// ── Conversions from external errors ──

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::StreamRead(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::InvalidConfig(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileRead(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_codes() {
        let resp = ErrorResponse::from(&AppError::EmptyDataset);
        assert_eq!(resp.code, "EMPTY_DATASET");
        assert_eq!(resp.message, "Dataset contains no records");

        let resp = ErrorResponse::from(&AppError::StreamRead("broken pipe".into()));
        assert_eq!(resp.code, "STREAM_READ");
        assert!(resp.message.contains("broken pipe"));
    }

    #[test]
    fn test_error_serializes_as_response() {
        let json = serde_json::to_value(AppError::NoData).unwrap();
        assert_eq!(json["code"], "NO_DATA");
        assert_eq!(json["message"], "No order book data available");
    }
}
