//! Authorization gate integration tests: route classification and the
//! redirect-to-sign-in flow, exercised against the real local provider.

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderValue};
use tempfile::tempdir;

use brickline::identity::{
    AuthProvider, Gate, GateOutcome, LocalAuthProvider, LoginRequest, RouteClass, RouteTable,
    SessionManager, SESSION_COOKIE,
};
use brickline::profiles::{hash_password, FileProfiles, Profile, ProfileStore};

fn provider_with_user(root: &std::path::Path, username: &str, password: &str) -> Arc<LocalAuthProvider> {
    let profiles = Arc::new(FileProfiles::new(root));
    let mut profile = Profile::new(username);
    profile.password_hash = Some(hash_password(password).unwrap());
    profiles.create(profile).unwrap();
    Arc::new(LocalAuthProvider::new(profiles, SessionManager::default()))
}

fn session_headers(provider: &LocalAuthProvider, username: &str, password: &str) -> HeaderMap {
    let resp = provider
        .login(&LoginRequest { username: username.into(), password: password.into(), ip: None })
        .expect("login should succeed");
    let mut headers = HeaderMap::new();
    headers.insert(
        "cookie",
        HeaderValue::from_str(&format!("{}={}", SESSION_COOKIE, resp.session.token)).unwrap(),
    );
    headers
}

#[test]
fn anonymous_admin_page_redirects_and_round_trips() {
    let tmp = tempdir().unwrap();
    let provider = provider_with_user(tmp.path(), "ada", "pw");
    let gate = Gate::new(RouteTable::marketplace_defaults(), provider.clone());

    let original = "/admin/properties/42";
    let decision = gate.authorize(original, &HeaderMap::new());
    assert_eq!(decision.class, RouteClass::AdminOnly);
    let location = match decision.outcome {
        GateOutcome::RedirectToSignIn { location } => location,
        other => panic!("expected redirect, got {other:?}"),
    };
    let next = location.split("next=").nth(1).expect("redirect carries a next param");
    assert_eq!(urlencoding::decode(next).unwrap(), original);

    // After signing in, the same path passes the gate; authorization for the
    // admin operation itself is the handler's job, not the gate's.
    let headers = session_headers(&provider, "ada", "pw");
    let decision = gate.authorize(original, &headers);
    assert_eq!(decision.outcome, GateOutcome::Allow);
    assert_eq!(decision.subject.unwrap().user_id, "ada");
}

#[test]
fn public_paths_allow_anonymous_callers() {
    let tmp = tempdir().unwrap();
    let provider = provider_with_user(tmp.path(), "bob", "pw");
    let gate = Gate::new(RouteTable::marketplace_defaults(), provider);

    for path in ["/", "/healthz", "/listings", "/listings/abc-123", "/signin?next=%2Fbookings"] {
        let decision = gate.authorize(path, &HeaderMap::new());
        assert_eq!(decision.outcome, GateOutcome::Allow, "path {path} should be public");
        assert!(decision.subject.is_none());
    }
}

#[test]
fn unknown_paths_default_to_protected() {
    let tmp = tempdir().unwrap();
    let provider = provider_with_user(tmp.path(), "cyn", "pw");
    let gate = Gate::new(RouteTable::marketplace_defaults(), provider.clone());

    let decision = gate.authorize("/export/everything", &HeaderMap::new());
    assert_eq!(decision.class, RouteClass::Protected);
    assert!(matches!(decision.outcome, GateOutcome::RedirectToSignIn { .. }));

    let headers = session_headers(&provider, "cyn", "pw");
    let decision = gate.authorize("/export/everything", &headers);
    assert_eq!(decision.outcome, GateOutcome::Allow);
}

#[test]
fn logout_makes_the_gate_redirect_again() {
    let tmp = tempdir().unwrap();
    let provider = provider_with_user(tmp.path(), "dot", "pw");
    let gate = Gate::new(RouteTable::marketplace_defaults(), provider.clone());

    let headers = session_headers(&provider, "dot", "pw");
    assert_eq!(gate.authorize("/bookings", &headers).outcome, GateOutcome::Allow);

    assert!(provider.logout(&headers));
    let decision = gate.authorize("/bookings", &headers);
    assert!(matches!(decision.outcome, GateOutcome::RedirectToSignIn { .. }));
}

#[test]
fn bad_credentials_do_not_open_a_session() {
    let tmp = tempdir().unwrap();
    let provider = provider_with_user(tmp.path(), "eve", "right");
    let err = provider
        .login(&LoginRequest { username: "eve".into(), password: "wrong".into(), ip: None })
        .unwrap_err();
    assert_eq!(err.http_status(), 401);

    let err = provider
        .login(&LoginRequest { username: "nobody".into(), password: "x".into(), ip: None })
        .unwrap_err();
    assert_eq!(err.http_status(), 401);
}
