//! 情报字段规范化（纯函数）
//!
//! 各字段独立处理：抽取、规范格式、去重并排序。无法识别的条目保留去空白后的原文，避免丢失情报。

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

static UPI_RE: OnceLock<Regex> = OnceLock::new();
static URL_RE: OnceLock<Regex> = OnceLock::new();

fn upi_re() -> &'static Regex {
    UPI_RE.get_or_init(|| Regex::new(r"[A-Za-z0-9._\-]{2,256}@[A-Za-z][A-Za-z0-9]{1,63}").unwrap())
}

fn url_re() -> &'static Regex {
    URL_RE.get_or_init(|| Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s<>"']+"#).unwrap())
}

fn collect<'a, I, F>(items: I, normalize_one: F) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
    F: Fn(&str) -> Vec<String>,
{
    items
        .into_iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .flat_map(normalize_one)
        .filter(|item| !item.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// 银行账号：去掉空格与连字符；纯数字则按数字保留，否则保留原文
pub fn bank_accounts<'a>(items: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    collect(items, |raw| {
        let compact: String = raw.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
        if compact.chars().all(|c| c.is_ascii_alphanumeric()) {
            vec![compact.to_ascii_uppercase()]
        } else {
            vec![raw.to_string()]
        }
    })
}

/// UPI ID：抽取 handle@provider 并转小写；一条文本可能含多个 ID
pub fn upi_ids<'a>(items: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    collect(items, |raw| {
        let found: Vec<String> = upi_re()
            .find_iter(raw)
            .map(|m| m.as_str().to_lowercase())
            .collect();
        if found.is_empty() {
            vec![raw.to_string()]
        } else {
            found
        }
    })
}

/// 电话号码：印度手机号统一为 +91XXXXXXXXXX，其它号码保留数字（国际号码保留前导 +）
pub fn phone_numbers<'a>(items: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    collect(items, |raw| vec![canonical_phone(raw)])
}

fn canonical_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let is_mobile = |d: &str| d.len() == 10 && matches!(d.as_bytes()[0], b'6'..=b'9');

    if is_mobile(digits.as_str()) {
        return format!("+91{digits}");
    }
    if digits.len() == 11 && digits.starts_with('0') && is_mobile(&digits[1..]) {
        return format!("+91{}", &digits[1..]);
    }
    if digits.len() == 12 && digits.starts_with("91") && is_mobile(&digits[2..]) {
        return format!("+{digits}");
    }
    if digits.is_empty() {
        return raw.to_string();
    }
    if raw.trim_start().starts_with('+') {
        format!("+{digits}")
    } else {
        digits
    }
}

/// 钓鱼链接：抽取 URL，去掉句尾标点
pub fn phishing_links<'a>(items: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    collect(items, |raw| {
        let found: Vec<String> = url_re()
            .find_iter(raw)
            .map(|m| {
                m.as_str()
                    .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | ')' | ']'))
                    .to_string()
            })
            .collect();
        if found.is_empty() {
            vec![raw.to_string()]
        } else {
            found
        }
    })
}

/// 关键词：去空白、转小写
pub fn keywords<'a>(items: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    collect(items, |raw| vec![raw.to_lowercase()])
}
