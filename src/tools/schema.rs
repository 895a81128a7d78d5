//! 工具调用 JSON Schema 生成（schemars 自动生成）
//!
//! 将「合法 tool call」的 JSON 结构注入 system prompt，减少 LLM 输出格式错误。

use schemars::{schema_for, JsonSchema};

/// 工具调用请求格式：与 planner 解析的 `{"tool": "...", "args": {...}}` 一致（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct ToolCallFormat {
    /// 工具名，如 scam_intel
    pub tool: String,
    /// 工具参数，字段见各工具的 parameters
    pub args: serde_json::Value,
}

/// 返回工具调用的 JSON Schema 字符串，可拼入 system prompt
pub fn tool_call_schema_json() -> String {
    let schema = schema_for!(ToolCallFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_names_tool_and_args() {
        let schema: serde_json::Value = serde_json::from_str(&tool_call_schema_json()).unwrap();
        assert!(schema["properties"]["tool"].is_object());
        assert!(!schema["properties"]["args"].is_null());
    }
}
