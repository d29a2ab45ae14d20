//! Executors that deferred work (such as an asynchronous lease return) can be
//! handed to.

pub mod spawner;

pub use spawner::{ThreadSpawner, WorkSpawner};
#[cfg(feature = "tokio-runtime")]
pub use spawner::TokioSpawner;
