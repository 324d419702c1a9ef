//! Security event monitoring and alerting.
//!
//! # Data Flow
//! ```text
//! scored events (limiter, detector, verifier)
//!     → rolling event log (bounded, oldest evicted first)
//!     → alert rules: severity / source rate / repeat offender
//!     → AlertNotifier hook + dashboard aggregates
//! ```
//!
//! # Design Decisions
//! - At most one alert per event; the strongest triggered rule wins
//! - Alerts mutate only through explicit resolution
//! - The notifier is an external collaborator behind a trait; the shipped
//!   one writes to the process log

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use uuid::Uuid;

use crate::config::validation::{validate_monitor, ValidationError};
use crate::config::MonitorConfig;
use crate::observability::metrics;
use crate::types::{now_millis, Severity};

/// Classification of a monitored event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityEventKind {
    Threat,
    Anomaly,
    Attack,
    Suspicious,
}

impl SecurityEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SecurityEventKind::Threat => "threat",
            SecurityEventKind::Anomaly => "anomaly",
            SecurityEventKind::Attack => "attack",
            SecurityEventKind::Suspicious => "suspicious",
        }
    }
}

/// One monitored occurrence. Immutable once recorded.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityEvent {
    pub timestamp_ms: u64,
    pub kind: SecurityEventKind,
    pub severity: Severity,
    /// Originating key, usually the client IP.
    pub source: String,
    pub details: String,
    pub client_identity: Option<String>,
}

impl SecurityEvent {
    pub fn new(
        kind: SecurityEventKind,
        severity: Severity,
        source: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            timestamp_ms: now_millis(),
            kind,
            severity,
            source: source.into(),
            details: details.into(),
            client_identity: None,
        }
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.client_identity = Some(identity.into());
        self
    }
}

/// Alert raised when an event crosses a threshold.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub id: String,
    pub timestamp_ms: u64,
    pub severity: Severity,
    pub message: String,
    pub details: String,
    pub source: String,
    pub resolved: bool,
}

/// Notification side effect on alert creation.
pub trait AlertNotifier: Send + Sync {
    fn notify(&self, alert: &Alert);
}

/// Default notifier writing alerts into the process log.
pub struct TracingNotifier;

impl AlertNotifier for TracingNotifier {
    fn notify(&self, alert: &Alert) {
        match alert.severity {
            Severity::Critical => tracing::error!(
                alert_id = %alert.id,
                source = %alert.source,
                "{}",
                alert.message
            ),
            Severity::High => tracing::warn!(
                alert_id = %alert.id,
                source = %alert.source,
                "{}",
                alert.message
            ),
            _ => tracing::info!(
                alert_id = %alert.id,
                source = %alert.source,
                "{}",
                alert.message
            ),
        }
    }
}

/// Aggregate view served to dashboards.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardData {
    pub total_alerts: usize,
    pub critical_alerts: usize,
    pub resolved_alerts: usize,
    /// Newest last.
    pub recent_events: Vec<SecurityEvent>,
    /// Event counts by kind.
    pub threat_stats: HashMap<String, usize>,
}

struct MonitorState {
    events: VecDeque<SecurityEvent>,
    alerts: Vec<Alert>,
    alerts_by_source: HashMap<String, usize>,
    kind_counts: HashMap<String, usize>,
}

/// Rolling event log with threshold alerting.
pub struct SecurityMonitor {
    state: Mutex<MonitorState>,
    notifier: Box<dyn AlertNotifier>,
    config: MonitorConfig,
}

impl SecurityMonitor {
    pub fn new(config: MonitorConfig) -> Result<Self, Vec<ValidationError>> {
        Self::with_notifier(config, TracingNotifier)
    }

    pub fn with_notifier(
        config: MonitorConfig,
        notifier: impl AlertNotifier + 'static,
    ) -> Result<Self, Vec<ValidationError>> {
        validate_monitor(&config)?;
        Ok(Self {
            state: Mutex::new(MonitorState {
                events: VecDeque::new(),
                alerts: Vec::new(),
                alerts_by_source: HashMap::new(),
                kind_counts: HashMap::new(),
            }),
            notifier: Box::new(notifier),
            config,
        })
    }

    /// Record one event and raise an alert if a rule triggers.
    pub fn monitor_event(&self, event: SecurityEvent) {
        metrics::record_event(event.kind);

        let alert = {
            let mut state = self.state.lock().expect("monitor mutex poisoned");

            *state
                .kind_counts
                .entry(event.kind.as_str().to_string())
                .or_insert(0) += 1;
            state.events.push_back(event.clone());
            while state.events.len() > self.config.max_events {
                state.events.pop_front();
            }

            let triggered = self.strongest_rule(&state, &event);
            triggered.map(|(severity, message)| {
                let alert = Alert {
                    id: Uuid::new_v4().to_string(),
                    timestamp_ms: now_millis(),
                    severity,
                    message,
                    details: event.details.clone(),
                    source: event.source.clone(),
                    resolved: false,
                };
                state.alerts.push(alert.clone());
                if state.alerts.len() > self.config.max_alerts {
                    state.alerts.remove(0);
                }
                *state
                    .alerts_by_source
                    .entry(event.source.clone())
                    .or_insert(0) += 1;
                alert
            })
        };

        // Notify outside the lock; the hook may be arbitrarily slow.
        if let Some(alert) = alert {
            metrics::record_alert(alert.severity);
            self.notifier.notify(&alert);
        }
    }

    /// Mark an alert resolved.
    ///
    /// Returns `false` for unknown ids and for alerts already resolved.
    pub fn resolve_alert(&self, id: &str) -> bool {
        let mut state = self.state.lock().expect("monitor mutex poisoned");
        match state.alerts.iter_mut().find(|a| a.id == id) {
            Some(alert) if !alert.resolved => {
                alert.resolved = true;
                true
            }
            _ => false,
        }
    }

    pub fn dashboard(&self) -> DashboardData {
        let state = self.state.lock().expect("monitor mutex poisoned");
        let recent = self.config.recent_events.min(state.events.len());
        DashboardData {
            total_alerts: state.alerts.len(),
            critical_alerts: state
                .alerts
                .iter()
                .filter(|a| a.severity == Severity::Critical)
                .count(),
            resolved_alerts: state.alerts.iter().filter(|a| a.resolved).count(),
            recent_events: state
                .events
                .iter()
                .skip(state.events.len() - recent)
                .cloned()
                .collect(),
            threat_stats: state.kind_counts.clone(),
        }
    }

    /// Pick the strongest alert rule the event triggers, if any.
    fn strongest_rule(
        &self,
        state: &MonitorState,
        event: &SecurityEvent,
    ) -> Option<(Severity, String)> {
        let prior_alerts = state
            .alerts_by_source
            .get(&event.source)
            .copied()
            .unwrap_or(0);
        if prior_alerts > self.config.offender_threshold {
            return Some((
                Severity::Critical,
                format!(
                    "Repeated offender: {} alerts already recorded for {}",
                    prior_alerts, event.source
                ),
            ));
        }

        if event.severity >= Severity::High {
            return Some((
                event.severity,
                format!("{} event from {}", event.kind.as_str(), event.source),
            ));
        }

        let cutoff = event.timestamp_ms.saturating_sub(self.config.rate_window_ms);
        let recent_from_source = state
            .events
            .iter()
            .rev()
            .take_while(|e| e.timestamp_ms >= cutoff)
            .filter(|e| e.source == event.source)
            .count();
        if recent_from_source > self.config.rate_threshold {
            return Some((
                Severity::High,
                format!(
                    "Event rate from {} exceeded {} in window",
                    event.source, self.config.rate_threshold
                ),
            ));
        }

        None
    }
}
