//! Request-security middleware.
//!
//! Two layers run in front of every content route: the rate limiter
//! (outermost, cheapest) and the scan-plus-verify layer. Both translate
//! engine decisions into HTTP and record the completed decision with the
//! monitor; nothing is recorded for requests abandoned mid-flight.

use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, State};
use axum::http::request::Parts;
use axum::http::{HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

use crate::detector::{ThreatAction, ThreatAnalysis};
use crate::limiter::{scoped_key, RateLimitDecision};
use crate::monitor::{SecurityEvent, SecurityEventKind};
use crate::observability::metrics;
use crate::types::{now_millis, RequestDescriptor, Severity};

use super::GatewayState;

/// Header clients use to present their session.
pub const SESSION_HEADER: &str = "x-session-id";

/// Header carrying a newly issued or confirmed session token.
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// Keyed rate limiting; rejections answer 429 with retry headers.
pub async fn rate_limit_middleware(
    State(state): State<GatewayState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.rate_limit.enabled {
        return next.run(request).await;
    }

    let client = client_ip(&request);
    let key = scoped_key(&state.config.rate_limit.scope, &client);
    let decision = state.limiter.check_limit(&key).await;

    if decision.degraded {
        state.monitor.monitor_event(SecurityEvent::new(
            SecurityEventKind::Anomaly,
            Severity::Medium,
            client.clone(),
            "rate limit answered by fail policy: store unavailable",
        ));
    }

    if decision.allowed {
        let mut response = next.run(request).await;
        apply_rate_headers(&mut response, state.limiter.config().max_requests, &decision);
        response
    } else {
        state.monitor.monitor_event(SecurityEvent::new(
            SecurityEventKind::Suspicious,
            Severity::Medium,
            client.clone(),
            format!("rate limit exceeded for key {key}"),
        ));

        let mut response =
            (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response();
        apply_rate_headers(&mut response, state.limiter.config().max_requests, &decision);
        let retry_secs = decision
            .reset_at_ms
            .saturating_sub(now_millis())
            .div_ceil(1000)
            .max(1);
        insert_header(&mut response, "retry-after", &retry_secs.to_string());
        response
    }
}

/// Content scan plus zero-trust verification.
pub async fn verify_middleware(
    State(state): State<GatewayState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let client = client_ip(&request);
    let (parts, body) = request.into_parts();
    let method = parts.method.to_string();

    let bytes = match axum::body::to_bytes(body, state.config.listener.max_body_size).await {
        Ok(bytes) => bytes,
        Err(_) => {
            metrics::record_request(&method, 413, started);
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let descriptor = build_descriptor(&parts, &bytes, client);
    let activity = state
        .source_activity
        .record(&format!("ip:{}", descriptor.ip));
    let analysis = state.detector.analyze(&descriptor, &activity);

    if analysis.is_threat || !analysis.anomalies.is_empty() {
        record_threat_event(&state, &descriptor, &analysis);
    }

    if analysis.action == ThreatAction::Block {
        tracing::warn!(
            client = %descriptor.ip,
            risk_score = analysis.risk_score,
            signatures = analysis.threats.len(),
            "Request blocked by threat scan"
        );
        metrics::record_request(&method, 403, started);
        return (StatusCode::FORBIDDEN, "Request blocked").into_response();
    }

    let outcome = state.verifier.verify_request(&descriptor, Some(&analysis)).await;

    if outcome.degraded {
        state.monitor.monitor_event(
            SecurityEvent::new(
                SecurityEventKind::Anomaly,
                Severity::Medium,
                descriptor.ip.clone(),
                "verification degraded: session store unavailable",
            )
            .with_identity(descriptor.session_id.clone().unwrap_or_default()),
        );
    }

    if !outcome.allowed {
        state.monitor.monitor_event(
            SecurityEvent::new(
                SecurityEventKind::Suspicious,
                Severity::High,
                descriptor.ip.clone(),
                format!(
                    "zero-trust refusal: risk {} with challenges [{}]",
                    outcome.risk_score,
                    outcome.challenges.join(", ")
                ),
            )
            .with_identity(descriptor.session_id.clone().unwrap_or_default()),
        );
        metrics::record_request(&method, 401, started);
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "verification_failed",
                "risk_score": outcome.risk_score,
                "challenges": outcome.challenges,
            })),
        )
            .into_response();
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    let mut response = next.run(request).await;
    if let Some(token) = &outcome.session_token {
        insert_header(&mut response, SESSION_TOKEN_HEADER, token);
    }
    metrics::record_request(&method, response.status().as_u16(), started);
    response
}

fn record_threat_event(
    state: &GatewayState,
    descriptor: &RequestDescriptor,
    analysis: &ThreatAnalysis,
) {
    for pattern in &analysis.threats {
        metrics::record_threat(pattern.category.as_str(), action_str(analysis.action));
    }

    let kind = match analysis.action {
        ThreatAction::Block => SecurityEventKind::Attack,
        ThreatAction::Challenge => SecurityEventKind::Threat,
        _ => SecurityEventKind::Suspicious,
    };
    let severity = analysis.max_severity().unwrap_or(Severity::Medium);
    let mut findings: Vec<String> = analysis
        .threats
        .iter()
        .map(|p| p.name.clone())
        .collect();
    findings.extend(analysis.anomalies.iter().map(|a| a.describe()));

    state.monitor.monitor_event(
        SecurityEvent::new(
            kind,
            severity,
            descriptor.ip.clone(),
            format!(
                "{} {}: {}",
                descriptor.method,
                descriptor.url,
                findings.join("; ")
            ),
        )
        .with_identity(descriptor.session_id.clone().unwrap_or_default()),
    );
}

fn action_str(action: ThreatAction) -> &'static str {
    match action {
        ThreatAction::Allow => "allow",
        ThreatAction::Monitor => "monitor",
        ThreatAction::Challenge => "challenge",
        ThreatAction::Block => "block",
    }
}

/// Client address: first X-Forwarded-For hop, else the socket peer.
fn client_ip<B>(request: &Request<B>) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Flatten the raw request into the engine's descriptor.
fn build_descriptor(parts: &Parts, body: &Bytes, ip: String) -> RequestDescriptor {
    let mut headers = HashMap::new();
    for (name, value) in parts.headers.iter() {
        headers.insert(
            name.as_str().to_ascii_lowercase(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }
    let session_id = headers
        .get(SESSION_HEADER)
        .map(String::to_owned)
        .filter(|s| !s.is_empty());

    RequestDescriptor {
        url: parts.uri.to_string(),
        method: parts.method.to_string(),
        headers,
        body: String::from_utf8_lossy(body).into_owned(),
        query: parts.uri.query().map(parse_query).unwrap_or_default(),
        ip,
        session_id,
    }
}

fn parse_query(raw: &str) -> HashMap<String, String> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) => (name.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

fn apply_rate_headers(response: &mut Response, limit: u32, decision: &RateLimitDecision) {
    insert_header(response, "x-ratelimit-limit", &limit.to_string());
    insert_header(
        response,
        "x-ratelimit-remaining",
        &decision.remaining.to_string(),
    );
    insert_header(
        response,
        "x-ratelimit-reset",
        &(decision.reset_at_ms / 1000).to_string(),
    );
}

fn insert_header(response: &mut Response, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        response.headers_mut().insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_strings_parse_into_pairs() {
        let query = parse_query("q=select&page=2&flag");
        assert_eq!(query.get("q"), Some(&"select".to_string()));
        assert_eq!(query.get("page"), Some(&"2".to_string()));
        assert_eq!(query.get("flag"), Some(&String::new()));
    }

    #[test]
    fn forwarded_header_wins_over_socket_peer() {
        let request = Request::builder()
            .uri("/")
            .header("x-forwarded-for", "203.0.113.4, 10.0.0.1")
            .body(())
            .unwrap();
        assert_eq!(client_ip(&request), "203.0.113.4");
    }

    #[test]
    fn missing_peer_reads_as_unknown() {
        let request = Request::builder().uri("/").body(()).unwrap();
        assert_eq!(client_ip(&request), "unknown");
    }
}
