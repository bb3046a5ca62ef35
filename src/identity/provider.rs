use std::sync::Arc;

use axum::http::HeaderMap;

use crate::error::ApiError;
use crate::profiles::{self, ProfileStore};
use crate::tprintln;

use super::principal::{Attrs, Subject};
use super::session::{Session, SessionManager};

pub const SESSION_COOKIE: &str = "brickline_session";

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub ip: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub session: Session,
}

/// The identity collaborator. The server only ever asks four questions: who
/// is calling, where to send an anonymous caller, and how to open or close a
/// session. `current_subject` never fails; a broken or missing token is an
/// anonymous caller, not an error.
pub trait AuthProvider: Send + Sync {
    fn current_subject(&self, headers: &HeaderMap) -> Option<Subject>;
    fn sign_in_redirect_url(&self, return_path: &str) -> String;
    fn login(&self, req: &LoginRequest) -> Result<LoginResponse, ApiError>;
    fn logout(&self, headers: &HeaderMap) -> bool;
}

pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie").or_else(|| headers.get("Cookie"))?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name { return Some(v[1..].to_string()); }
        }
    }
    None
}

pub fn session_token(headers: &HeaderMap) -> Option<String> {
    parse_cookie(headers, SESSION_COOKIE)
}

/// Session-cookie provider backed by the in-process session tables and the
/// profile directory for credential checks.
pub struct LocalAuthProvider {
    profiles: Arc<dyn ProfileStore>,
    sm: SessionManager,
    sign_in_path: String,
}

impl LocalAuthProvider {
    pub fn new(profiles: Arc<dyn ProfileStore>, sm: SessionManager) -> Self {
        Self { profiles, sm, sign_in_path: "/signin".to_string() }
    }
}

impl AuthProvider for LocalAuthProvider {
    fn current_subject(&self, headers: &HeaderMap) -> Option<Subject> {
        let token = session_token(headers)?;
        self.sm.validate(&token)
    }

    fn sign_in_redirect_url(&self, return_path: &str) -> String {
        format!("{}?next={}", self.sign_in_path, urlencoding::encode(return_path))
    }

    fn login(&self, req: &LoginRequest) -> Result<LoginResponse, ApiError> {
        let profile = match self.profiles.get(&req.username) {
            Ok(Some(p)) => p,
            Ok(None) => return Err(ApiError::auth("invalid_credentials", "invalid username or password")),
            Err(e) => {
                tracing::error!("login: profile lookup failed for '{}': {e:#}", req.username);
                return Err(ApiError::downstream("profile_lookup_failed", "could not verify credentials"));
            }
        };
        let ok = profile
            .password_hash
            .as_deref()
            .map(|phc| profiles::verify_password(phc, &req.password))
            .unwrap_or(false);
        if !ok {
            return Err(ApiError::auth("invalid_credentials", "invalid username or password"));
        }
        let subject = Subject {
            user_id: profile.user_id.clone(),
            attrs: Attrs { ip: req.ip.clone(), ..Default::default() },
        };
        let session = self.sm.issue(subject);
        tprintln!("auth.login user={} sid={}", profile.user_id, session.session_id);
        Ok(LoginResponse { session })
    }

    fn logout(&self, headers: &HeaderMap) -> bool {
        match session_token(headers) {
            Some(token) => self.sm.logout(&token),
            None => false,
        }
    }
}
