//! Request anomaly heuristics.
//!
//! These run next to the signature scan and look at how a source behaves
//! rather than what the request says. History comes from the caller-owned
//! [`ActivitySnapshot`]; the heuristics themselves keep no state.

use crate::activity::ActivitySnapshot;
use crate::config::DetectorConfig;
use crate::types::RequestDescriptor;

/// Fixed score added per detected anomaly.
pub const ANOMALY_SCORE: u32 = 15;

/// User-agent substrings associated with scanners and attack tooling.
const SUSPICIOUS_AGENTS: &[&str] = &[
    "sqlmap",
    "nikto",
    "nmap",
    "masscan",
    "dirbuster",
    "gobuster",
    "wpscan",
    "havij",
    "acunetix",
    "metasploit",
];

/// A single behavioral irregularity found for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// More requests from this source inside the window than the
    /// configured ceiling.
    ExcessiveRate { recent_requests: u32 },

    /// The user agent names a known scanning or exploitation tool.
    SuspiciousUserAgent(String),

    /// Requests arrive with machine-like spacing.
    RoboticTiming { mean_interval_ms: u64 },
}

impl Anomaly {
    pub fn describe(&self) -> String {
        match self {
            Anomaly::ExcessiveRate { recent_requests } => {
                format!("excessive request rate ({recent_requests} in window)")
            }
            Anomaly::SuspiciousUserAgent(agent) => {
                format!("suspicious user agent ({agent})")
            }
            Anomaly::RoboticTiming { mean_interval_ms } => {
                format!("robotic request timing ({mean_interval_ms}ms mean interval)")
            }
        }
    }
}

/// Run every heuristic against one request and its activity snapshot.
pub fn detect_anomalies(
    request: &RequestDescriptor,
    activity: &ActivitySnapshot,
    config: &DetectorConfig,
) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();

    if activity.recent_requests > config.rate_anomaly_threshold {
        anomalies.push(Anomaly::ExcessiveRate {
            recent_requests: activity.recent_requests,
        });
    }

    if let Some(agent) = request.header("user-agent") {
        let lowered = agent.to_ascii_lowercase();
        if let Some(hit) = SUSPICIOUS_AGENTS.iter().find(|s| lowered.contains(*s)) {
            anomalies.push(Anomaly::SuspiciousUserAgent((*hit).to_string()));
        }
    }

    if activity.recent_requests >= config.min_timing_samples {
        if let Some(mean_interval_ms) = activity.mean_interval_ms {
            if mean_interval_ms < config.robotic_interval_ms {
                anomalies.push(Anomaly::RoboticTiming { mean_interval_ms });
            }
        }
    }

    anomalies
}

#[cfg(test)]
mod tests {
    use super::*;

    fn browser_request() -> RequestDescriptor {
        let mut request = RequestDescriptor {
            url: "/articles/42".to_string(),
            method: "GET".to_string(),
            ip: "198.51.100.7".to_string(),
            ..RequestDescriptor::default()
        };
        request.headers.insert(
            "user-agent".to_string(),
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36".to_string(),
        );
        request
    }

    #[test]
    fn quiet_browser_traffic_is_clean() {
        let activity = ActivitySnapshot {
            recent_requests: 3,
            mean_interval_ms: Some(2500),
        };
        let anomalies =
            detect_anomalies(&browser_request(), &activity, &DetectorConfig::default());
        assert!(anomalies.is_empty());
    }

    #[test]
    fn scanner_user_agent_is_flagged() {
        let mut request = browser_request();
        request
            .headers
            .insert("user-agent".to_string(), "sqlmap/1.7".to_string());
        let anomalies = detect_anomalies(
            &request,
            &ActivitySnapshot::default(),
            &DetectorConfig::default(),
        );
        assert_eq!(
            anomalies,
            vec![Anomaly::SuspiciousUserAgent("sqlmap".to_string())]
        );
    }

    #[test]
    fn high_request_rate_is_flagged() {
        let activity = ActivitySnapshot {
            recent_requests: 31,
            mean_interval_ms: Some(300),
        };
        let anomalies =
            detect_anomalies(&browser_request(), &activity, &DetectorConfig::default());
        assert!(anomalies
            .iter()
            .any(|a| matches!(a, Anomaly::ExcessiveRate { .. })));
    }

    #[test]
    fn robotic_timing_needs_enough_samples() {
        let config = DetectorConfig::default();
        let sparse = ActivitySnapshot {
            recent_requests: 2,
            mean_interval_ms: Some(10),
        };
        assert!(detect_anomalies(&browser_request(), &sparse, &config).is_empty());

        let dense = ActivitySnapshot {
            recent_requests: 10,
            mean_interval_ms: Some(10),
        };
        assert!(detect_anomalies(&browser_request(), &dense, &config)
            .iter()
            .any(|a| matches!(a, Anomaly::RoboticTiming { .. })));
    }

    #[test]
    fn missing_user_agent_is_not_an_anomaly_by_itself() {
        let mut request = browser_request();
        request.headers.clear();
        let anomalies = detect_anomalies(
            &request,
            &ActivitySnapshot::default(),
            &DetectorConfig::default(),
        );
        assert!(anomalies.is_empty());
    }
}
