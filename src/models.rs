use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Up,
    Down,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Up => f.write_str("UP"),
            Status::Down => f.write_str("DOWN"),
        }
    }
}

/// Result of one probe. A DOWN outcome always carries a zero latency.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    target: String,
    timestamp: DateTime<Local>,
    status: Status,
    latency: Duration,
}

impl ProbeOutcome {
    pub fn up(target: impl Into<String>, timestamp: DateTime<Local>, latency: Duration) -> Self {
        Self {
            target: target.into(),
            timestamp,
            status: Status::Up,
            latency,
        }
    }

    pub fn down(target: impl Into<String>, timestamp: DateTime<Local>) -> Self {
        Self {
            target: target.into(),
            timestamp,
            status: Status::Down,
            latency: Duration::ZERO,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn latency_seconds(&self) -> f64 {
        self.latency.as_secs_f64()
    }

    pub fn is_down(&self) -> bool {
        self.status == Status::Down
    }
}

/// One history row; column names match the workbook headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Download Time (s)")]
    pub download_time: String,
    #[serde(rename = "Status")]
    pub status: Status,
}

impl From<&ProbeOutcome> for HistoryRow {
    fn from(outcome: &ProbeOutcome) -> Self {
        Self {
            timestamp: iso_timestamp(outcome.timestamp()),
            url: outcome.target().to_string(),
            download_time: format!("{:.4}", outcome.latency_seconds()),
            status: outcome.status(),
        }
    }
}

pub const ALERT_SUBJECT: &str = "Proxy Server Down Alert!";

/// Notification for one DOWN outcome. Lives only until dispatch returns.
#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub subject: String,
    pub body: String,
}

impl AlertEvent {
    pub fn proxy_down(proxy: &str, outcome: &ProbeOutcome) -> Self {
        Self {
            subject: ALERT_SUBJECT.to_string(),
            body: format!(
                "The proxy server at {} seems to be down.\n\
                 Failed to connect to {} at {}.\n\
                 Please check the proxy server status.",
                proxy,
                outcome.target(),
                iso_timestamp(outcome.timestamp())
            ),
        }
    }
}

pub fn iso_timestamp(ts: DateTime<Local>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn up_row_formats_latency_to_four_places() {
        let outcome = ProbeOutcome::up("https://ok.example", at_noon(), Duration::from_millis(250));
        let row = HistoryRow::from(&outcome);
        assert_eq!(row.download_time, "0.2500");
        assert_eq!(row.status, Status::Up);
        assert_eq!(row.timestamp, "2025-03-01T12:00:00.000000");
        assert_eq!(row.url, "https://ok.example");
    }

    #[test]
    fn down_outcome_has_zero_latency() {
        let outcome = ProbeOutcome::down("https://down.example", at_noon());
        assert!(outcome.is_down());
        assert_eq!(outcome.latency_seconds(), 0.0);
        assert_eq!(HistoryRow::from(&outcome).download_time, "0.0000");
    }

    #[test]
    fn status_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Status::Down).unwrap(), "\"DOWN\"");
        assert_eq!(Status::Up.to_string(), "UP");
    }

    #[test]
    fn alert_body_names_proxy_target_and_time() {
        let outcome = ProbeOutcome::down("https://down.example", at_noon());
        let event = AlertEvent::proxy_down("10.0.0.1:3128", &outcome);
        assert_eq!(event.subject, "Proxy Server Down Alert!");
        assert!(event.body.contains("10.0.0.1:3128"));
        assert!(event.body.contains("https://down.example"));
        assert!(event.body.contains("2025-03-01T12:00:00"));
    }
}
