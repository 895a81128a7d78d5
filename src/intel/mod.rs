//! 会话情报：按会话累积的诈骗情报记录、合并规则与字段规范化

pub mod normalize;
mod record;
mod store;

pub use record::{IntelUpdate, SessionIntel};
pub use store::IntelStore;
