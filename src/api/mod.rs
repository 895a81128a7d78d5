//! 对外接口：请求 / 响应结构与 HTTP 路由（server feature）

pub mod schemas;

#[cfg(feature = "server")]
pub mod routes;

pub use schemas::{AnalysisRequest, AnalysisResponse, ChatMessage, Timestamp};

#[cfg(feature = "server")]
pub use routes::{router, ApiState};
