//! 回调上报：判定累积情报是否值得上报，并把规范化后的结果发送给外部收集端
//!
//! 上报不是一次性闩锁：每次情报变好都可以再次上报，新结果覆盖旧结果。

mod gate;
mod payload;
mod reporter;

pub use gate::{should_report, CallbackGate};
pub use payload::{ExtractedIntelligence, FinalResultPayload};
pub use reporter::{CallbackError, DisabledReporter, HttpReporter, Reporter};
