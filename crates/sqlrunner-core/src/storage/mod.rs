pub mod lock;
pub mod schema;
pub mod store;

pub use lock::{LockGuard, GLOBAL_LOCK_NAME};
pub use store::Store;
