//! Clients of the external collaborators: search index, message bus and
//! object storage

pub mod bus;
pub mod object_storage;
pub mod search;

pub use bus::BusClient;
#[cfg(feature = "s3")]
pub use object_storage::S3ObjectStorage;
pub use object_storage::{InMemoryObjectStorage, ObjectStorage, PhotoUploader, PutObject};
pub use search::{SearchClient, SearchResults};
