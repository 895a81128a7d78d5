//! 单个会话的情报记录与合并规则
//!
//! 合并只做并集：集合字段不缩小，scam_detected 只会 false -> true，message_count 取最大值。

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::Evictable;

/// 一个会话累积的情报
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIntel {
    pub bank_accounts: BTreeSet<String>,
    pub upi_ids: BTreeSet<String>,
    pub phishing_links: BTreeSet<String>,
    pub phone_numbers: BTreeSet<String>,
    pub suspicious_keywords: BTreeSet<String>,
    pub scam_detected: bool,
    /// 至少成功上报过一次；不阻止后续上报
    pub callback_sent: bool,
    pub message_count: u32,
    pub agent_notes: String,
    /// 成功上报次数
    pub reports_sent: u32,
    pub last_reported_at: Option<DateTime<Utc>>,
}

impl Evictable for SessionIntel {}

/// 一次工具调用带来的部分情报
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntelUpdate {
    pub bank_accounts: Vec<String>,
    pub upi_ids: Vec<String>,
    pub phishing_links: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub suspicious_keywords: Vec<String>,
    pub scam_detected: bool,
    pub message_count: u32,
    pub agent_notes: String,
}

fn union(target: &mut BTreeSet<String>, incoming: Vec<String>) {
    target.extend(
        incoming
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty()),
    );
}

impl SessionIntel {
    /// 把部分情报并入当前记录
    pub fn merge(&mut self, update: IntelUpdate) {
        union(&mut self.bank_accounts, update.bank_accounts);
        union(&mut self.upi_ids, update.upi_ids);
        union(&mut self.phishing_links, update.phishing_links);
        union(&mut self.phone_numbers, update.phone_numbers);
        union(&mut self.suspicious_keywords, update.suspicious_keywords);

        self.scam_detected |= update.scam_detected;
        self.message_count = self.message_count.max(update.message_count);
        if !update.agent_notes.is_empty() {
            self.agent_notes = update.agent_notes;
        }
    }

    /// 是否含有可上报的关键情报（银行账户 / UPI / 电话 / 钓鱼链接，关键词不算）
    pub fn has_actionable_intel(&self) -> bool {
        !self.bank_accounts.is_empty()
            || !self.upi_ids.is_empty()
            || !self.phone_numbers.is_empty()
            || !self.phishing_links.is_empty()
    }

    /// 记录一次成功上报
    pub fn record_report(&mut self) {
        self.callback_sent = true;
        self.reports_sent += 1;
        self.last_reported_at = Some(Utc::now());
    }

    /// 注入 agent 提示词的情报摘要：已拿到什么、还缺什么
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "### CURRENT EXTRACTED INTELLIGENCE SUMMARY".to_string(),
            format!("- Scam Detected: {}", self.scam_detected),
            format!("- Bank Accounts: {}", render(&self.bank_accounts)),
            format!("- UPI IDs: {}", render(&self.upi_ids)),
            format!("- Phishing Links: {}", render(&self.phishing_links)),
            format!("- Phone Numbers: {}", render(&self.phone_numbers)),
            format!("- Suspicious Keywords: {}", render(&self.suspicious_keywords)),
            String::new(),
            "### GUIDANCE".to_string(),
            "1. If info is already in the list above, DO NOT call scam_intel again for it.".to_string(),
            "2. Only call scam_intel to ADD NEW intelligence or UPDATE the scam score.".to_string(),
            "3. Continue the persona to extract the MISSING items above.".to_string(),
        ];

        let missing = self.missing_fields();
        if !missing.is_empty() {
            lines.push(format!("Still missing: {}", missing.join(", ")));
        }
        lines.join("\n")
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("bank accounts", &self.bank_accounts),
            ("UPI IDs", &self.upi_ids),
            ("phishing links", &self.phishing_links),
            ("phone numbers", &self.phone_numbers),
        ]
        .into_iter()
        .filter(|(_, set)| set.is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

fn render(set: &BTreeSet<String>) -> String {
    let items: Vec<&str> = set.iter().map(String::as_str).collect();
    format!("[{}]", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merge_is_monotonic() {
        let mut intel = SessionIntel::default();
        intel.merge(IntelUpdate {
            bank_accounts: strings(&["111", "222"]),
            scam_detected: true,
            message_count: 5,
            agent_notes: "Scam Score: 90".to_string(),
            ..Default::default()
        });

        let before = intel.clone();
        intel.merge(IntelUpdate {
            bank_accounts: strings(&["222", " 333 ", ""]),
            scam_detected: false,
            message_count: 3,
            ..Default::default()
        });

        assert!(intel.scam_detected);
        assert_eq!(intel.message_count, 5);
        assert_eq!(intel.agent_notes, "Scam Score: 90");
        assert!(intel.bank_accounts.is_superset(&before.bank_accounts));
        assert_eq!(
            intel.bank_accounts.iter().cloned().collect::<Vec<_>>(),
            strings(&["111", "222", "333"])
        );
    }

    #[test]
    fn test_notes_overwritten_only_when_present() {
        let mut intel = SessionIntel::default();
        intel.merge(IntelUpdate {
            agent_notes: "first".to_string(),
            ..Default::default()
        });
        intel.merge(IntelUpdate {
            agent_notes: "second".to_string(),
            message_count: 7,
            ..Default::default()
        });
        assert_eq!(intel.agent_notes, "second");
        assert_eq!(intel.message_count, 7);
    }

    #[test]
    fn test_keywords_alone_are_not_actionable() {
        let mut intel = SessionIntel::default();
        intel.merge(IntelUpdate {
            suspicious_keywords: strings(&["urgent", "kyc"]),
            scam_detected: true,
            ..Default::default()
        });
        assert!(!intel.has_actionable_intel());

        intel.merge(IntelUpdate {
            phone_numbers: strings(&["9876543210"]),
            ..Default::default()
        });
        assert!(intel.has_actionable_intel());
    }

    #[test]
    fn test_summary_lists_missing_fields() {
        let mut intel = SessionIntel::default();
        intel.merge(IntelUpdate {
            upi_ids: strings(&["fraud@ybl"]),
            ..Default::default()
        });
        let summary = intel.summary();
        assert!(summary.contains("- UPI IDs: [fraud@ybl]"));
        assert!(summary.contains("Still missing: bank accounts, phishing links, phone numbers"));
    }

    #[test]
    fn test_update_deserializes_partial_camel_case() {
        let update: IntelUpdate =
            serde_json::from_str(r#"{"upiIds": ["a@b"], "scamDetected": true}"#).unwrap();
        assert_eq!(update.upi_ids, strings(&["a@b"]));
        assert!(update.scam_detected);
        assert!(update.bank_accounts.is_empty());
    }
}
