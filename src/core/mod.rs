//! 核心层：错误类型、驱逐清理队列、后台清扫、优雅关闭

pub mod cleanup_queue;
pub mod error;
pub mod shutdown;
pub mod sweeper;

pub use cleanup_queue::{CleanupJob, CleanupQueue};
pub use error::AgentError;
pub use shutdown::{
    CacheShutdown, CleanupQueueDrain, ShutdownCleanup, ShutdownCoordinator, ShutdownManager,
    ShutdownReason,
};
pub use sweeper::{spawn_sweeper, sweep_all};
