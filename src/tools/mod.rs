//! 工具层：Tool trait、注册表、带超时与审计日志的执行器，以及情报抽取工具 scam_intel

pub mod context;
pub mod executor;
pub mod registry;
pub mod scam_intel;
pub mod schema;

pub use context::{SessionMetadata, TurnContext};
pub use executor::ToolExecutor;
pub use registry::{Tool, ToolRegistry};
pub use scam_intel::{ScamIntelArgs, ScamIntelTool};
pub use schema::tool_call_schema_json;
