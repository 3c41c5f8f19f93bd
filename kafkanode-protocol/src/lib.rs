pub mod errors;
pub mod frame;
pub mod payload;
pub mod record;
mod op_code;
mod request;
mod response;
mod utils;

// Public re-exports for easy access
pub use errors::{DeserializeError, ProtocolError};
pub use frame::{Frame, FrameType, FRAME_HEADER_LEN, PROTOCOL_VERSION};
pub use op_code::OpCode;
pub use payload::Payload;
pub use record::Record;

pub use request::{
    CommitOffsetRequest, CreateTopicsRequest, FetchRequest, MetadataRequest, ProduceRequest,
    TopicDescriptor,
};
pub use response::{
    ErrorCode, ErrorResponse, FetchResponse, MetadataResponse, PartitionEntry, ProduceAck,
    TopicEntry,
};
