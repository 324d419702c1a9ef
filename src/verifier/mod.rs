//! Zero-trust request verification.
//!
//! # Data Flow
//! ```text
//! RequestDescriptor (+ detector analysis)
//!     → session lookup (storage boundary, the only await)
//!     → five signal checks: identity, device, network, behavioral, threat
//!     → fusion: allowed = risk < 70 AND challenges < 3
//!     → session token minted on allow
//! ```
//!
//! # Design Decisions
//! - Every request is re-evaluated from its signals; a login is never a
//!   standing pass (continuous verification can be toggled off per config)
//! - Checks are substitutable behind `SignalCheck`; the fusion rule is the
//!   contract and stays fixed
//! - No events are persisted here; the caller records the completed
//!   decision, so an abandoned call leaves no partial state
//! - Settings swap wholesale through an ArcSwap, never field by field

mod checks;
mod session;

pub use checks::{
    default_checks, BehavioralCheck, CheckContext, DeviceCheck, IdentityCheck, NetworkCheck,
    SignalCheck, SignalVerdict, ThreatSignalCheck, FINGERPRINT_HEADER,
};
pub use session::{SessionRecord, SessionRegistry};

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::activity::ActivityTracker;
use crate::config::validation::{validate_zero_trust, ValidationError};
use crate::config::ZeroTrustConfig;
use crate::detector::ThreatAnalysis;
use crate::observability::metrics;
use crate::types::RequestDescriptor;

/// Risk at or above which a request is refused outright.
const RISK_CEILING: u32 = 70;

/// Challenge count at which a request is refused outright.
const MAX_CHALLENGES: usize = 3;

/// Completed verification decision.
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub allowed: bool,
    pub risk_score: u32,
    /// Named challenges raised by failing checks.
    pub challenges: Vec<String>,
    /// Present only when `allowed`; opaque token for the client session.
    pub session_token: Option<String>,
    /// Set when a storage fault degraded session handling for this call.
    pub degraded: bool,
}

/// Multi-signal risk aggregator.
pub struct ZeroTrustVerifier {
    checks: Vec<Box<dyn SignalCheck>>,
    sessions: SessionRegistry,
    /// Per-session (or per-source) navigation history.
    navigation: ActivityTracker,
    config: ArcSwap<ZeroTrustConfig>,
}

impl ZeroTrustVerifier {
    /// Build a verifier with the default signal set.
    pub fn new(
        sessions: SessionRegistry,
        config: ZeroTrustConfig,
    ) -> Result<Self, Vec<ValidationError>> {
        let checks = default_checks(config.reputation_cache_size);
        Self::with_checks(sessions, config, checks)
    }

    /// Build a verifier with a custom signal set.
    pub fn with_checks(
        sessions: SessionRegistry,
        config: ZeroTrustConfig,
        checks: Vec<Box<dyn SignalCheck>>,
    ) -> Result<Self, Vec<ValidationError>> {
        validate_zero_trust(&config)?;
        Ok(Self {
            checks,
            sessions,
            navigation: ActivityTracker::new(60_000, 128),
            config: ArcSwap::from_pointee(config),
        })
    }

    /// Replace the runtime settings wholesale.
    pub fn update_config(&self, config: ZeroTrustConfig) {
        self.config.store(Arc::new(config));
    }

    pub fn config(&self) -> Arc<ZeroTrustConfig> {
        self.config.load_full()
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Verify one request.
    ///
    /// `analysis` is the detector's scan of this same request, when the
    /// caller ran one; it participates as the fifth signal.
    pub async fn verify_request(
        &self,
        request: &RequestDescriptor,
        analysis: Option<&ThreatAnalysis>,
    ) -> VerificationOutcome {
        let config = self.config.load_full();
        let mut degraded = false;

        let session = match &request.session_id {
            Some(id) => match self.sessions.lookup(id).await {
                Ok(session) => session,
                Err(error) => {
                    // An unreadable session verifies as no session at all.
                    tracing::warn!(%error, "Session lookup failed");
                    metrics::record_store_failure("verifier");
                    degraded = true;
                    None
                }
            },
            None => None,
        };

        let navigation_key = match (&session, &request.session_id) {
            (Some(s), _) => format!("session:{}", s.token),
            (None, Some(id)) => format!("session:{id}"),
            (None, None) => format!("ip:{}", request.ip),
        };
        let activity = self.navigation.record(&navigation_key);

        if !config.continuous_verification {
            if let Some(session) = &session {
                // Established sessions ride on their original verification.
                return VerificationOutcome {
                    allowed: true,
                    risk_score: 0,
                    challenges: Vec::new(),
                    session_token: Some(session.token.clone()),
                    degraded,
                };
            }
        }

        let ctx = CheckContext {
            request,
            session: session.as_ref(),
            activity,
            analysis,
            config: config.as_ref(),
        };

        let mut risk_score = 0u32;
        let mut challenges = Vec::new();
        for check in &self.checks {
            let verdict = check.evaluate(&ctx);
            risk_score = risk_score.saturating_add(verdict.penalty);
            if let Some(challenge) = verdict.challenge {
                tracing::debug!(
                    check = check.name(),
                    penalty = verdict.penalty,
                    challenge,
                    "Signal check failed"
                );
                challenges.push(challenge.to_string());
            }
        }

        let allowed = risk_score < RISK_CEILING && challenges.len() < MAX_CHALLENGES;
        metrics::record_verification(allowed);

        let session_token = if allowed {
            self.token_for(request, session, &mut degraded).await
        } else {
            tracing::info!(
                client = %request.ip,
                risk_score,
                challenges = challenges.len(),
                "Request failed zero-trust verification"
            );
            None
        };

        VerificationOutcome {
            allowed,
            risk_score,
            challenges,
            session_token,
            degraded,
        }
    }

    /// Reuse a session whose binding still holds, otherwise mint a fresh
    /// one bound to the presented fingerprint.
    async fn token_for(
        &self,
        request: &RequestDescriptor,
        session: Option<SessionRecord>,
        degraded: &mut bool,
    ) -> Option<String> {
        let fingerprint = request.header(FINGERPRINT_HEADER).unwrap_or("");
        if let Some(session) = session {
            if session.fingerprint == fingerprint {
                return Some(session.token);
            }
        }
        match self.sessions.issue(fingerprint).await {
            Ok(session) => Some(session.token),
            Err(error) => {
                // The decision stands; the client just gets no session and
                // will be fully re-verified next time.
                tracing::warn!(%error, "Session issue failed");
                metrics::record_store_failure("verifier");
                *degraded = true;
                None
            }
        }
    }
}
