use std::io;
use std::time::Duration;
use kafkanode_protocol::{ErrorCode, ErrorResponse, ProtocolError};
use thiserror::Error;

/// Failures reported by a broker backend.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Broker unavailable: {0}")]
    Unavailable(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Topic does not exist: {0}")]
    UnknownTopic(String),

    #[error("Partition {partition} does not exist on topic {topic}")]
    UnknownPartition { topic: String, partition: u32 },

    #[error("Topic already exists: {0}")]
    TopicAlreadyExists(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

pub type BrokerResult<T> = std::result::Result<T, BrokerError>;

impl BrokerError {
    /// Wire form sent back in an error frame.
    pub fn to_error_response(&self) -> ErrorResponse {
        match self {
            BrokerError::UnknownTopic(topic) => ErrorResponse::new(ErrorCode::UnknownTopic, topic),
            BrokerError::TopicAlreadyExists(topic) => {
                ErrorResponse::new(ErrorCode::TopicAlreadyExists, topic)
            }
            BrokerError::UnknownPartition { .. } => {
                ErrorResponse::new(ErrorCode::UnknownPartition, self.to_string())
            }
            BrokerError::Unavailable(reason) => ErrorResponse::new(ErrorCode::Unavailable, reason),
            other => ErrorResponse::new(ErrorCode::InvalidRequest, other.to_string()),
        }
    }

    pub fn from_error_response(resp: ErrorResponse) -> Self {
        match resp.code {
            ErrorCode::UnknownTopic => BrokerError::UnknownTopic(resp.message),
            ErrorCode::TopicAlreadyExists => BrokerError::TopicAlreadyExists(resp.message),
            ErrorCode::Unavailable => BrokerError::Unavailable(resp.message),
            ErrorCode::UnknownPartition | ErrorCode::InvalidRequest => {
                BrokerError::Rejected(resp.message)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("No client available, connect first")]
    NoClient,

    #[error("Topic does not exist: {0}")]
    NoTopic(String),

    #[error("Message must be an object or a primitive, not an array")]
    MessageNotObject,

    #[error("Messages must be an array")]
    MessagesNotArray,

    #[error("Consumer id must be a string")]
    ConsumerIdNotString,

    #[error("Invalid topic spec for {topic:?}: {reason}")]
    InvalidTopicSpec { topic: String, reason: &'static str },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Errors that already announce themselves through a dedicated event.
    pub(crate) fn has_dedicated_event(&self) -> bool {
        matches!(self, Error::NoClient | Error::NoTopic(_))
    }
}
