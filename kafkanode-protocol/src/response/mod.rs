mod error_response;
mod fetch_response;
mod metadata_response;
mod produce_ack;

pub use error_response::{ErrorCode, ErrorResponse};
pub use fetch_response::FetchResponse;
pub use metadata_response::{MetadataResponse, PartitionEntry, TopicEntry};
pub use produce_ack::ProduceAck;
