//! The per-request authorization gate.
//!
//! The gate runs before every handler and composes the route classifier with
//! the session resolver. It is the UX tier of a two-tier model: it can wave a
//! request through or bounce an anonymous caller to sign-in, but for admin
//! routes the authoritative decision belongs to the handler-level role check
//! (`admin_verdict`), which consults the persisted profile. An Allow from the
//! gate on an admin route means "is logged in", nothing more.

use std::sync::Arc;

use axum::http::HeaderMap;

use crate::profiles::Role;

use super::principal::Subject;
use super::provider::AuthProvider;
use super::routes::{RouteClass, RouteTable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Allow,
    RedirectToSignIn { location: String },
    Reject,
}

#[derive(Debug, Clone)]
pub struct AuthDecision {
    pub class: RouteClass,
    pub subject: Option<Subject>,
    pub outcome: GateOutcome,
}

pub struct Gate {
    rules: RouteTable,
    provider: Arc<dyn AuthProvider>,
}

impl Gate {
    pub fn new(rules: RouteTable, provider: Arc<dyn AuthProvider>) -> Self {
        Self { rules, provider }
    }

    pub fn rules(&self) -> &RouteTable { &self.rules }

    /// Evaluate one request. Public paths never touch the resolver. Anonymous
    /// callers on any other path are redirected to sign-in carrying the full
    /// original path and query as the return destination. A failed resolver
    /// lookup is an anonymous caller; it is never retried here, because the
    /// safe default for a flaky identity check is to demand re-authentication
    /// rather than stall the request pipeline.
    pub fn authorize(&self, path_and_query: &str, headers: &HeaderMap) -> AuthDecision {
        let path = path_and_query.split('?').next().unwrap_or(path_and_query);
        let class = self.rules.classify(path);
        if class == RouteClass::Public {
            return AuthDecision { class, subject: None, outcome: GateOutcome::Allow };
        }
        match self.provider.current_subject(headers) {
            None => {
                let location = self.provider.sign_in_redirect_url(path_and_query);
                AuthDecision { class, subject: None, outcome: GateOutcome::RedirectToSignIn { location } }
            }
            Some(subject) => AuthDecision { class, subject: Some(subject), outcome: GateOutcome::Allow },
        }
    }
}

/// Handler-tier role verdict for admin operations, in the gate's decision
/// vocabulary. Exhaustive over Role so a new role is a compile-time decision.
pub fn admin_verdict(role: Role) -> GateOutcome {
    match role {
        Role::Admin => GateOutcome::Allow,
        Role::User | Role::Agent => GateOutcome::Reject,
    }
}
