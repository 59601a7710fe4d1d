use chrono::{DateTime, Utc};

pub fn parse_option_id(s: &str) -> Result<String, String> {
    let id = s.trim();
    if id.is_empty() {
        return Err("option id cannot be empty".to_string());
    }
    Ok(id.to_string())
}

pub fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC3339 timestamp: {e}"))
}

pub fn parse_base_url(s: &str) -> Result<String, String> {
    let url = s.trim().trim_end_matches('/');
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(format!("base url must start with http:// or https://, got {}", s));
    }
    Ok(url.to_string())
}
