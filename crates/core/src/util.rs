use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::HeaderMap;

use crate::config::HttpConfig;

/// Split a comma-separated username list, preserving order and dropping blank entries.
pub fn split_assignees(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// Shorten a response body for inclusion in an error message.
pub fn truncate_for_error(value: &str, max_chars: usize) -> String {
    let value = value.trim();
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &value[..idx]),
        None => value.to_string(),
    }
}

pub fn build_http_client(config: &HttpConfig, headers: HeaderMap) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs.max(1)))
        .build()
        .context("Failed to create HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_assignees() {
        assert_eq!(split_assignees("a, b ,,c"), vec!["a", "b", "c"]);
        assert!(split_assignees("").is_empty());
        assert!(split_assignees(" , ").is_empty());
    }

    #[test]
    fn test_truncate_for_error() {
        assert_eq!(truncate_for_error("  short  ", 10), "short");
        assert_eq!(truncate_for_error("abcdef", 3), "abc...");
        assert_eq!(truncate_for_error("ééé", 2), "éé...");
    }
}
