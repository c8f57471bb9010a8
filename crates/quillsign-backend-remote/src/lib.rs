pub mod backend;
pub mod realtime;

pub use backend::RemoteBackend;
pub use realtime::RealtimeSubscriber;
