//! Individual trust signal checks.
//!
//! Each check is one independent signal source behind the [`SignalCheck`]
//! trait, so any of them can be swapped for a richer implementation (an
//! identity provider, a device attestation service, an IP reputation feed)
//! without touching the fusion rule.

use crate::activity::ActivitySnapshot;
use crate::cache::BoundedCache;
use crate::config::ZeroTrustConfig;
use crate::detector::ThreatAnalysis;
use crate::types::RequestDescriptor;
use crate::verifier::session::SessionRecord;

/// Header carrying the client's device fingerprint.
pub const FINGERPRINT_HEADER: &str = "x-device-fingerprint";

/// Verdict from one signal source.
#[derive(Debug, Clone, Default)]
pub struct SignalVerdict {
    pub penalty: u32,
    /// Named challenge raised when the check fails.
    pub challenge: Option<&'static str>,
}

impl SignalVerdict {
    pub fn pass() -> Self {
        Self::default()
    }

    pub fn fail(penalty: u32, challenge: &'static str) -> Self {
        Self {
            penalty,
            challenge: Some(challenge),
        }
    }
}

/// Context assembled once per verification and shared by all checks.
pub struct CheckContext<'a> {
    pub request: &'a RequestDescriptor,
    /// Session resolved from the request, if one was found.
    pub session: Option<&'a SessionRecord>,
    /// Navigation history for the session (or source, when anonymous).
    pub activity: ActivitySnapshot,
    /// Scan result for this request, when the caller ran the detector.
    pub analysis: Option<&'a ThreatAnalysis>,
    pub config: &'a ZeroTrustConfig,
}

/// A single substitutable trust signal.
pub trait SignalCheck: Send + Sync {
    fn name(&self) -> &'static str;
    fn evaluate(&self, ctx: &CheckContext<'_>) -> SignalVerdict;
}

/// Credential presence and session validity.
pub struct IdentityCheck;

impl SignalCheck for IdentityCheck {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn evaluate(&self, ctx: &CheckContext<'_>) -> SignalVerdict {
        let credential = ctx
            .request
            .header("authorization")
            .map(str::trim)
            .filter(|v| !v.is_empty());
        match credential {
            Some(_) => SignalVerdict::pass(),
            None => SignalVerdict::fail(30, "credentials"),
        }
    }
}

/// Device fingerprint consistency against the session registry.
pub struct DeviceCheck;

impl SignalCheck for DeviceCheck {
    fn name(&self) -> &'static str {
        "device"
    }

    fn evaluate(&self, ctx: &CheckContext<'_>) -> SignalVerdict {
        let fingerprint = ctx.request.header(FINGERPRINT_HEADER).unwrap_or("");
        match ctx.session {
            Some(session) => {
                if fingerprint.is_empty() {
                    SignalVerdict::fail(10, "device_attestation")
                } else if fingerprint != session.fingerprint {
                    // A token replayed from a different device.
                    SignalVerdict::fail(25, "device_attestation")
                } else {
                    SignalVerdict::pass()
                }
            }
            // Nothing to compare against; the device is unverifiable.
            None => SignalVerdict::fail(15, "device_attestation"),
        }
    }
}

/// Origin reputation, memoized per IP in a bounded cache.
pub struct NetworkCheck {
    reputation: BoundedCache<String, u32>,
}

impl NetworkCheck {
    pub fn new(cache_size: usize) -> Self {
        Self {
            reputation: BoundedCache::new(cache_size),
        }
    }

    fn penalty_for(&self, ip: &str, config: &ZeroTrustConfig) -> u32 {
        if let Some(penalty) = self.reputation.get(&ip.to_string()) {
            return penalty;
        }
        let penalty = if ip.is_empty() {
            20
        } else if config.denied_networks.iter().any(|p| ip.starts_with(p)) {
            40
        } else {
            0
        };
        self.reputation.set(ip.to_string(), penalty);
        penalty
    }
}

impl SignalCheck for NetworkCheck {
    fn name(&self) -> &'static str {
        "network"
    }

    fn evaluate(&self, ctx: &CheckContext<'_>) -> SignalVerdict {
        match self.penalty_for(&ctx.request.ip, ctx.config) {
            0 => SignalVerdict::pass(),
            penalty => SignalVerdict {
                penalty,
                challenge: Some("network_verification"),
            },
        }
    }
}

/// Navigation-speed heuristics over the session's own history.
pub struct BehavioralCheck;

impl SignalCheck for BehavioralCheck {
    fn name(&self) -> &'static str {
        "behavioral"
    }

    fn evaluate(&self, ctx: &CheckContext<'_>) -> SignalVerdict {
        if ctx.session.is_none() {
            // No baseline to judge against.
            return if ctx.config.strict_mode {
                SignalVerdict::fail(20, "behavioral_baseline")
            } else {
                SignalVerdict::pass()
            };
        }
        if ctx.activity.recent_requests > ctx.config.max_navigation_rate {
            return SignalVerdict::fail(20, "behavioral_check");
        }
        if let Some(interval) = ctx.activity.mean_interval_ms {
            // Page-to-page navigation faster than any human reads.
            if ctx.activity.recent_requests >= 5 && interval < 150 {
                return SignalVerdict::fail(20, "behavioral_check");
            }
        }
        SignalVerdict::pass()
    }
}

/// Detector subscore folded into the fusion, when enabled.
pub struct ThreatSignalCheck;

impl SignalCheck for ThreatSignalCheck {
    fn name(&self) -> &'static str {
        "threat"
    }

    fn evaluate(&self, ctx: &CheckContext<'_>) -> SignalVerdict {
        if !ctx.config.include_threat_score {
            return SignalVerdict::pass();
        }
        let Some(analysis) = ctx.analysis else {
            return SignalVerdict::pass();
        };
        if !analysis.is_threat {
            return SignalVerdict::pass();
        }
        // Strict mode lets a hot scan dominate the fusion on its own;
        // otherwise it is one capped voice among five.
        let penalty = if ctx.config.strict_mode {
            analysis.risk_score
        } else {
            analysis.risk_score.min(40)
        };
        SignalVerdict {
            penalty,
            challenge: Some("content_inspection"),
        }
    }
}

/// The default signal set, in evaluation order.
pub fn default_checks(reputation_cache_size: usize) -> Vec<Box<dyn SignalCheck>> {
    vec![
        Box::new(IdentityCheck),
        Box::new(DeviceCheck),
        Box::new(NetworkCheck::new(reputation_cache_size)),
        Box::new(BehavioralCheck),
        Box::new(ThreatSignalCheck),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::now_millis;

    fn request() -> RequestDescriptor {
        let mut request = RequestDescriptor {
            url: "/account".to_string(),
            method: "GET".to_string(),
            ip: "198.51.100.7".to_string(),
            ..RequestDescriptor::default()
        };
        request
            .headers
            .insert("authorization".to_string(), "Bearer abc123".to_string());
        request
            .headers
            .insert(FINGERPRINT_HEADER.to_string(), "fp-1".to_string());
        request
    }

    fn session(fingerprint: &str) -> SessionRecord {
        SessionRecord {
            token: "t-1".to_string(),
            fingerprint: fingerprint.to_string(),
            issued_at_ms: now_millis(),
        }
    }

    fn ctx<'a>(
        request: &'a RequestDescriptor,
        session: Option<&'a SessionRecord>,
        config: &'a ZeroTrustConfig,
    ) -> CheckContext<'a> {
        CheckContext {
            request,
            session,
            activity: ActivitySnapshot::default(),
            analysis: None,
            config,
        }
    }

    #[test]
    fn identity_fails_without_authorization() {
        let config = ZeroTrustConfig::default();
        let mut request = request();
        request.headers.remove("authorization");
        let verdict = IdentityCheck.evaluate(&ctx(&request, None, &config));
        assert_eq!(verdict.penalty, 30);
        assert_eq!(verdict.challenge, Some("credentials"));
    }

    #[test]
    fn device_mismatch_is_penalized_harder_than_absence() {
        let config = ZeroTrustConfig::default();
        let request = request();
        let bound = session("fp-1");
        let other = session("fp-2");

        let matching = DeviceCheck.evaluate(&ctx(&request, Some(&bound), &config));
        assert_eq!(matching.penalty, 0);

        let mismatch = DeviceCheck.evaluate(&ctx(&request, Some(&other), &config));
        let unverifiable = DeviceCheck.evaluate(&ctx(&request, None, &config));
        assert!(mismatch.penalty > unverifiable.penalty);
        assert_eq!(mismatch.challenge, Some("device_attestation"));
    }

    #[test]
    fn denied_network_prefix_is_flagged_and_memoized() {
        let mut config = ZeroTrustConfig::default();
        config.denied_networks.push("203.0.113.".to_string());
        let check = NetworkCheck::new(8);

        let mut request = request();
        request.ip = "203.0.113.9".to_string();
        let verdict = check.evaluate(&ctx(&request, None, &config));
        assert_eq!(verdict.penalty, 40);

        // Second evaluation answers from the reputation cache.
        check.evaluate(&ctx(&request, None, &config));
        assert_eq!(check.reputation.stats().hits, 1);
    }

    #[test]
    fn behavioral_flags_abusive_navigation_rate() {
        let config = ZeroTrustConfig::default();
        let request = request();
        let bound = session("fp-1");
        let mut context = ctx(&request, Some(&bound), &config);
        context.activity = ActivitySnapshot {
            recent_requests: config.max_navigation_rate + 1,
            mean_interval_ms: Some(500),
        };
        let verdict = BehavioralCheck.evaluate(&context);
        assert_eq!(verdict.challenge, Some("behavioral_check"));
    }

    #[test]
    fn behavioral_passes_unknown_session_outside_strict_mode() {
        let mut config = ZeroTrustConfig::default();
        config.strict_mode = false;
        let request = request();
        let verdict = BehavioralCheck.evaluate(&ctx(&request, None, &config));
        assert_eq!(verdict.penalty, 0);
    }
}
