//! DispatchAttempt - one Event Log row per dispatch attempt
//!
//! Rows are append-only. `NewAttempt` carries whatever the caller knows;
//! stores fill the gaps with defaults and never reject an incomplete row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Action, DEFAULT_FRONTEND_ID};

/// Maximum stored length of `message`, in characters
pub const MESSAGE_MAX_CHARS: usize = 255;

/// Maximum stored length of `response_snippet`, in characters
pub const RESPONSE_MAX_CHARS: usize = 5000;

/// Default sample size for [`AttemptStats`]
pub const DEFAULT_STATS_SAMPLE: usize = 50;

/// Column header of the CSV export
pub const CSV_HEADER: &str = "when,frontend,domain,scope,action,http,ok,ms,message";

/// A persisted dispatch attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchAttempt {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub frontend: String,
    pub domain: String,
    pub scope: String,
    pub action: Action,
    pub endpoint: String,
    /// 0 if no response was received
    pub http_code: u16,
    pub ok: bool,
    pub latency_ms: u64,
    pub message: String,
    pub response_snippet: Option<String>,
}

/// Partially-filled row handed to an event store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewAttempt {
    pub created_at: Option<DateTime<Utc>>,
    pub frontend: Option<String>,
    pub domain: Option<String>,
    pub scope: Option<String>,
    pub action: Option<Action>,
    pub endpoint: Option<String>,
    pub http_code: Option<u16>,
    pub ok: Option<bool>,
    pub latency_ms: Option<u64>,
    pub message: Option<String>,
    pub response_snippet: Option<String>,
}

impl NewAttempt {
    /// Fill unset fields with defaults and apply length limits
    pub fn into_attempt(self, id: i64, now: DateTime<Utc>) -> DispatchAttempt {
        DispatchAttempt {
            id,
            created_at: self.created_at.unwrap_or(now),
            frontend: self
                .frontend
                .unwrap_or_else(|| DEFAULT_FRONTEND_ID.to_string()),
            domain: self.domain.unwrap_or_default(),
            scope: self.scope.unwrap_or_default(),
            action: self.action.unwrap_or_default(),
            endpoint: self.endpoint.unwrap_or_default(),
            http_code: self.http_code.unwrap_or(0),
            ok: self.ok.unwrap_or(false),
            latency_ms: self.latency_ms.unwrap_or(0),
            message: truncate_chars(&self.message.unwrap_or_default(), MESSAGE_MAX_CHARS),
            response_snippet: self
                .response_snippet
                .map(|s| truncate_chars(&s, RESPONSE_MAX_CHARS)),
        }
    }
}

impl DispatchAttempt {
    /// `YYYY-MM-DD HH:MM frontend/domain scope http OK|FAIL NNms message`
    pub fn summary_line(&self) -> String {
        format!(
            "{} {}/{} {} {} {} {}ms {}",
            self.created_at.format("%Y-%m-%d %H:%M"),
            self.frontend,
            self.domain,
            self.scope,
            self.http_code,
            if self.ok { "OK" } else { "FAIL" },
            self.latency_ms,
            self.message
        )
    }

    /// One CSV record matching [`CSV_HEADER`]
    pub fn csv_record(&self) -> String {
        let when = self.created_at.format("%Y-%m-%d %H:%M").to_string();
        let http = self.http_code.to_string();
        let ms = self.latency_ms.to_string();
        [
            when.as_str(),
            self.frontend.as_str(),
            self.domain.as_str(),
            self.scope.as_str(),
            self.action.as_str(),
            http.as_str(),
            if self.ok { "1" } else { "0" },
            ms.as_str(),
            self.message.as_str(),
        ]
        .iter()
        .map(|field| csv_escape(field))
        .collect::<Vec<_>>()
        .join(",")
    }
}

/// Quote a CSV field when it contains a delimiter, quote or line break
fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Equality filters for listing attempts; `None` matches anything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptFilter {
    pub frontend: Option<String>,
    pub domain: Option<String>,
    pub scope: Option<String>,
    pub action: Option<Action>,
}

impl AttemptFilter {
    /// Filter used by stats: frontend + domain, optionally scope
    pub fn for_stats(frontend: &str, domain: &str, scope: Option<&str>) -> Self {
        Self {
            frontend: Some(frontend.to_string()),
            domain: Some(domain.to_string()),
            scope: scope.filter(|s| !s.is_empty()).map(str::to_string),
            action: None,
        }
    }

    /// Whether a row satisfies every supplied filter
    pub fn matches(&self, attempt: &DispatchAttempt) -> bool {
        self.frontend.as_ref().is_none_or(|f| *f == attempt.frontend)
            && self.domain.as_ref().is_none_or(|d| *d == attempt.domain)
            && self.scope.as_ref().is_none_or(|s| *s == attempt.scope)
            && self.action.is_none_or(|a| a == attempt.action)
    }
}

/// Success rate and latency over recent attempts
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttemptStats {
    pub count: usize,
    /// Percentage rounded to one decimal, `None` when `count == 0`
    pub success_rate: Option<f64>,
    /// Nearest-rank 95th percentile latency in ms, `None` when `count == 0`
    pub p95: Option<u64>,
}

impl AttemptStats {
    /// Compute stats over an already-limited sample
    pub fn from_attempts(attempts: &[DispatchAttempt]) -> Self {
        let count = attempts.len();
        if count == 0 {
            return Self {
                count: 0,
                success_rate: None,
                p95: None,
            };
        }

        let successes = attempts.iter().filter(|a| a.ok).count();
        let mut latencies: Vec<u64> = attempts.iter().map(|a| a.latency_ms).collect();
        latencies.sort_unstable();
        let idx = (0.95 * (count - 1) as f64).floor() as usize;

        Self {
            count,
            success_rate: Some((successes as f64 * 1000.0 / count as f64).round() / 10.0),
            p95: latencies.get(idx).copied(),
        }
    }
}

/// Truncate to at most `max` characters, respecting char boundaries
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn attempt(ok: bool, latency_ms: u64) -> DispatchAttempt {
        NewAttempt {
            ok: Some(ok),
            latency_ms: Some(latency_ms),
            ..Default::default()
        }
        .into_attempt(1, Utc::now())
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let row = NewAttempt::default().into_attempt(7, now);
        assert_eq!(row.id, 7);
        assert_eq!(row.created_at, now);
        assert_eq!(row.frontend, "default");
        assert_eq!(row.action, Action::Revalidate);
        assert_eq!(row.http_code, 0);
        assert!(!row.ok);
        assert_eq!(row.latency_ms, 0);
        assert_eq!(row.message, "");
        assert_eq!(row.response_snippet, None);
    }

    #[test]
    fn test_message_and_response_truncated() {
        let row = NewAttempt {
            message: Some("m".repeat(400)),
            response_snippet: Some("é".repeat(6000)),
            ..Default::default()
        }
        .into_attempt(1, Utc::now());
        assert_eq!(row.message.chars().count(), MESSAGE_MAX_CHARS);
        assert_eq!(
            row.response_snippet.unwrap().chars().count(),
            RESPONSE_MAX_CHARS
        );
    }

    #[test]
    fn test_stats_empty() {
        let stats = AttemptStats::from_attempts(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.success_rate, None);
        assert_eq!(stats.p95, None);
    }

    #[test]
    fn test_stats_nearest_rank_p95() {
        let rows = vec![
            attempt(true, 50),
            attempt(true, 120),
            attempt(false, 80),
            attempt(true, 200),
        ];
        let stats = AttemptStats::from_attempts(&rows);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.success_rate, Some(75.0));
        // sorted [50, 80, 120, 200], index floor(0.95 * 3) = 2
        assert_eq!(stats.p95, Some(120));
    }

    #[test]
    fn test_stats_rounds_to_one_decimal() {
        let rows = vec![attempt(true, 10), attempt(false, 10), attempt(false, 10)];
        let stats = AttemptStats::from_attempts(&rows);
        assert_eq!(stats.success_rate, Some(33.3));
        assert_eq!(stats.p95, Some(10));
    }

    #[test]
    fn test_filter_matches() {
        let row = NewAttempt {
            frontend: Some("site".into()),
            domain: Some("content".into()),
            scope: Some("node:1".into()),
            action: Some(Action::Revalidate),
            ..Default::default()
        }
        .into_attempt(1, Utc::now());

        assert!(AttemptFilter::default().matches(&row));
        assert!(AttemptFilter::for_stats("site", "content", None).matches(&row));
        assert!(AttemptFilter::for_stats("site", "content", Some("node:1")).matches(&row));
        assert!(!AttemptFilter::for_stats("site", "content", Some("node:2")).matches(&row));
        let by_action = AttemptFilter {
            action: Some(Action::Test),
            ..Default::default()
        };
        assert!(!by_action.matches(&row));
    }

    #[test]
    fn test_csv_record_quotes_fields() {
        let row = NewAttempt {
            created_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 9, 5, 0).unwrap()),
            frontend: Some("site".into()),
            domain: Some("path".into()),
            scope: Some("/a,b".into()),
            http_code: Some(200),
            ok: Some(true),
            latency_ms: Some(42),
            message: Some("said \"hi\"".into()),
            ..Default::default()
        }
        .into_attempt(3, Utc::now());
        assert_eq!(
            row.csv_record(),
            "2024-05-01 09:05,site,path,\"/a,b\",revalidate,200,1,42,\"said \"\"hi\"\"\""
        );
    }

    #[test]
    fn test_summary_line() {
        let row = NewAttempt {
            created_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 9, 5, 0).unwrap()),
            frontend: Some("site".into()),
            domain: Some("content".into()),
            scope: Some("all".into()),
            http_code: Some(500),
            latency_ms: Some(12),
            ..Default::default()
        }
        .into_attempt(3, Utc::now());
        assert_eq!(
            row.summary_line(),
            "2024-05-01 09:05 site/content all 500 FAIL 12ms "
        );
    }

    #[test]
    fn test_truncate_chars_short_input() {
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
    }
}
