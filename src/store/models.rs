use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One browser endpoint willing to receive notifications.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Subscription {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub topics: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Normalizes a requested topic list into the stored, deduplicated set.
///
/// An absent or empty list collapses to `["default"]`. A list that is
/// present but contains only blank/whitespace entries is rejected
/// (`None`) rather than silently falling back to `default` — the caller
/// asked for *something* and gave us nothing usable.
pub fn normalize_topics(requested: Option<Vec<String>>) -> Option<Vec<String>> {
    match requested {
        None => Some(vec!["default".to_string()]),
        Some(topics) if topics.is_empty() => Some(vec!["default".to_string()]),
        Some(topics) => {
            let mut seen = std::collections::HashSet::new();
            let mut out = Vec::new();
            for t in topics {
                let t = t.trim();
                if t.is_empty() {
                    continue;
                }
                if seen.insert(t.to_string()) {
                    out.push(t.to_string());
                }
            }
            if out.is_empty() {
                None
            } else {
                Some(out)
            }
        }
    }
}

/// Normalizes a single trigger topic: absent/empty -> the literal "default".
pub fn normalize_topic(requested: Option<&str>) -> String {
    match requested {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => "default".to_string(),
    }
}
