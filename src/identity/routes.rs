//! Path classification for the authorization gate.
//!
//! Every request path falls into exactly one of three classes. Classification
//! is a pure function of a fixed, ordered rule table: admin prefixes are
//! checked first, then the public patterns, and anything unmatched stays
//! Protected. The ordering is deliberate: a path under an admin prefix keeps
//! its admin requirement even when a broader public pattern also matches it.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Reachable without a session.
    Public,
    /// Requires an authenticated Subject.
    Protected,
    /// Requires an authenticated Subject; handlers re-verify the admin role.
    AdminOnly,
}

/// A pattern matches a path when:
/// - it ends in `/*`: the base itself and everything nested under it, or
/// - it ends in `*`: any path starting with the base, or
/// - otherwise: the exact path, or the pattern followed by a `/` segment.
fn pattern_matches(pattern: &str, path: &str) -> bool {
    if let Some(base) = pattern.strip_suffix("/*") {
        return path == base || (path.len() > base.len() && path.starts_with(base) && path.as_bytes()[base.len()] == b'/');
    }
    if let Some(base) = pattern.strip_suffix('*') {
        return path.starts_with(base);
    }
    if path == pattern { return true; }
    path.starts_with(pattern) && path[pattern.len()..].starts_with('/')
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    admin_prefixes: Vec<String>,
    public: Vec<String>,
    protected: Vec<String>,
}

impl RouteTable {
    pub fn new<S: Into<String>>(
        admin_prefixes: impl IntoIterator<Item = S>,
        public: impl IntoIterator<Item = S>,
        protected: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            admin_prefixes: admin_prefixes.into_iter().map(Into::into).collect(),
            public: public.into_iter().map(Into::into).collect(),
            protected: protected.into_iter().map(Into::into).collect(),
        }
    }

    /// The rule table for the marketplace surface.
    pub fn marketplace_defaults() -> Self {
        Self::new(
            ["/admin"],
            ["/", "/healthz", "/signin", "/login", "/listings/*", "/media/*"],
            ["/logout", "/profile", "/favorites/*", "/bookings/*"],
        )
    }

    /// Classify a path. Admin rules win over everything; public patterns are
    /// consulted next; unmatched paths default to Protected.
    pub fn classify(&self, path: &str) -> RouteClass {
        let path = if path.is_empty() { "/" } else { path };
        if self.admin_prefixes.iter().any(|p| pattern_matches(p, path)) {
            return RouteClass::AdminOnly;
        }
        if self.public.iter().any(|p| pattern_matches(p, path)) {
            return RouteClass::Public;
        }
        if self.protected.iter().any(|p| pattern_matches(p, path)) {
            return RouteClass::Protected;
        }
        // everything unmatched requires a session
        RouteClass::Protected
    }
}
