//! Stateless threat scanning over normalized requests.
//!
//! # Data Flow
//! ```text
//! RequestDescriptor + ActivitySnapshot
//!     → scan buffer (url + method + headers + body + query, lower-cased)
//!     → signature matching (severity-weighted score)
//!     → anomaly heuristics (fixed score per finding)
//!     → ThreatAnalysis { risk score, action, confidence }
//! ```
//!
//! # Design Decisions
//! - Scanning is synchronous, CPU-only and side-effect-free so it can sit
//!   on the request hot path
//! - Recent history lives with the caller; the detector only reads a
//!   snapshot of it
//! - Malformed or empty request fields scan as empty strings and can only
//!   lower the score, never raise an error

mod anomaly;
mod patterns;

pub use anomaly::{detect_anomalies, Anomaly, ANOMALY_SCORE};
pub use patterns::{CatalogError, PatternCatalog, ThreatCategory, ThreatPattern};

use serde::Serialize;
use std::sync::Arc;

use crate::activity::ActivitySnapshot;
use crate::config::DetectorConfig;
use crate::types::RequestDescriptor;

/// Disposition for a scored request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatAction {
    Allow,
    Monitor,
    Challenge,
    Block,
}

/// Result of scanning one request.
#[derive(Debug, Clone)]
pub struct ThreatAnalysis {
    pub is_threat: bool,
    /// Catalog signatures that matched, in catalog order.
    pub threats: Vec<ThreatPattern>,
    pub anomalies: Vec<Anomaly>,
    pub risk_score: u32,
    pub action: ThreatAction,
    /// Accumulated per matching signal, capped at 1.0.
    pub confidence: f64,
}

impl ThreatAnalysis {
    /// Highest severity among matched signatures, if any matched.
    pub fn max_severity(&self) -> Option<crate::types::Severity> {
        self.threats.iter().map(|p| p.severity).max()
    }
}

const BLOCK_THRESHOLD: u32 = 80;
const CHALLENGE_THRESHOLD: u32 = 50;
const MONITOR_THRESHOLD: u32 = 20;

const PATTERN_CONFIDENCE: f64 = 0.25;
const ANOMALY_CONFIDENCE: f64 = 0.15;

/// Signature and heuristic scanner.
pub struct ThreatDetector {
    catalog: Arc<PatternCatalog>,
    config: DetectorConfig,
}

impl ThreatDetector {
    pub fn new(catalog: Arc<PatternCatalog>, config: DetectorConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    /// Scan one request.
    ///
    /// `activity` is the caller's view of the source's recent history; pass
    /// a default snapshot when none is tracked.
    pub fn analyze(
        &self,
        request: &RequestDescriptor,
        activity: &ActivitySnapshot,
    ) -> ThreatAnalysis {
        let buffer = scan_buffer(request);

        let mut risk_score = 0u32;
        let mut confidence = 0f64;
        let mut threats = Vec::new();
        for pattern in self.catalog.patterns() {
            if pattern.matcher.is_match(&buffer) {
                risk_score += pattern.severity.weight();
                confidence += PATTERN_CONFIDENCE;
                threats.push(pattern.clone());
            }
        }

        let anomalies = detect_anomalies(request, activity, &self.config);
        risk_score += ANOMALY_SCORE * anomalies.len() as u32;
        confidence += ANOMALY_CONFIDENCE * anomalies.len() as f64;

        let action = if risk_score >= BLOCK_THRESHOLD {
            ThreatAction::Block
        } else if risk_score >= CHALLENGE_THRESHOLD {
            ThreatAction::Challenge
        } else if risk_score >= MONITOR_THRESHOLD {
            ThreatAction::Monitor
        } else {
            ThreatAction::Allow
        };

        ThreatAnalysis {
            is_threat: !threats.is_empty() || risk_score > MONITOR_THRESHOLD,
            threats,
            anomalies,
            risk_score,
            action,
            confidence: confidence.min(1.0),
        }
    }
}

/// Flatten every scannable request attribute into one lower-cased buffer.
fn scan_buffer(request: &RequestDescriptor) -> String {
    let mut buffer = String::with_capacity(
        request.url.len() + request.method.len() + request.body.len() + 128,
    );
    buffer.push_str(&request.url);
    buffer.push(' ');
    buffer.push_str(&request.method);
    for (name, value) in &request.headers {
        buffer.push(' ');
        buffer.push_str(name);
        buffer.push(':');
        buffer.push_str(value);
    }
    buffer.push(' ');
    buffer.push_str(&request.body);
    for (name, value) in &request.query {
        buffer.push(' ');
        buffer.push_str(name);
        buffer.push('=');
        buffer.push_str(value);
    }
    buffer.make_ascii_lowercase();
    buffer
}
