pub mod device;
pub mod local;
pub mod remote;

pub use device::{DeviceStorage, FileStorage};
pub use local::LocalStore;
pub use remote::{
    create_redis_client, DocumentStore, MemoryDocumentStore, RedisDocumentStore, RemoteStore,
    RemoteWriterHandle, Subscription, SyncStatus,
};
