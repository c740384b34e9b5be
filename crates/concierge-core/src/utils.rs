use std::sync::OnceLock;

use chrono::{DateTime, Local};
use regex::Regex;

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len.saturating_sub(3)).collect::<String>();
    out.push_str("...");
    out
}

pub fn clock_label(at: DateTime<Local>) -> String {
    at.format("%H:%M:%S").to_string()
}

/// Mask bot tokens and URL credentials before text leaves the process.
pub fn redact_secrets(text: &str) -> String {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    static USERINFO: OnceLock<Regex> = OnceLock::new();

    let token = TOKEN.get_or_init(|| {
        Regex::new(r"\d{6,12}:[A-Za-z0-9_-]{30,}").expect("valid token regex")
    });
    let userinfo = USERINFO.get_or_init(|| {
        Regex::new(r"(?P<scheme>[a-zA-Z][a-zA-Z0-9+.-]*://)[^/\s:@]+(:[^/\s@]*)?@")
            .expect("valid userinfo regex")
    });

    let masked = token.replace_all(text, "<bot-token>");
    userinfo.replace_all(&masked, "${scheme}***@").into_owned()
}
