mod commit_offset;
mod create_topics;
mod fetch;
mod metadata;
mod produce;

pub use commit_offset::CommitOffsetRequest;
pub use create_topics::{CreateTopicsRequest, TopicDescriptor};
pub use fetch::FetchRequest;
pub use metadata::MetadataRequest;
pub use produce::ProduceRequest;
