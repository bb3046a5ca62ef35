//! Role-gated admin handler tests: the two-step identity + role re-check,
//! verified with spy collaborators so call counts and mutation counts are
//! observable, plus the documented non-idempotence of create.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::Json;
use parking_lot::Mutex;
use tempfile::tempdir;

use brickline::assets::{DiskAssets, DEFAULT_MAX_UPLOAD_BYTES};
use brickline::identity::{
    AuthProvider, Gate, GateOutcome, LocalAuthProvider, LoginRequest, RouteTable, SessionManager,
    Subject, SESSION_COOKIE,
};
use brickline::listings::{Listing, ListingStatus, ListingType};
use brickline::profiles::{hash_password, Profile, ProfileStore, ProfileUpdate, Role};
use brickline::server::{self, AppState, LISTINGS};
use brickline::storage::{ResourceStore, StoredRecord};

/// Profile store spy: a plain in-memory map that counts lookups.
struct CountingProfiles {
    map: Mutex<HashMap<String, Profile>>,
    gets: AtomicUsize,
}

impl CountingProfiles {
    fn new() -> Self {
        Self { map: Mutex::new(HashMap::new()), gets: AtomicUsize::new(0) }
    }

    fn seed(&self, username: &str, password: &str, role: Role) {
        let mut profile = Profile::new(username);
        profile.password_hash = Some(hash_password(password).unwrap());
        profile.role = role;
        self.map.lock().insert(username.to_string(), profile);
    }
}

impl ProfileStore for CountingProfiles {
    fn get(&self, user_id: &str) -> anyhow::Result<Option<Profile>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.map.lock().get(user_id).cloned())
    }

    fn create(&self, profile: Profile) -> anyhow::Result<Profile> {
        self.map.lock().insert(profile.user_id.clone(), profile.clone());
        Ok(profile)
    }

    fn update(&self, user_id: &str, changes: ProfileUpdate) -> anyhow::Result<Profile> {
        let mut map = self.map.lock();
        let profile = map.get_mut(user_id).ok_or_else(|| anyhow::anyhow!("profile not found"))?;
        if let Some(name) = changes.display_name { profile.display_name = Some(name); }
        if let Some(role) = changes.role { profile.role = role; }
        if let Some(verified) = changes.verified { profile.verified = verified; }
        if let Some(password) = changes.password { profile.password_hash = Some(hash_password(&password)?); }
        Ok(profile.clone())
    }

    fn list(&self) -> anyhow::Result<Vec<Profile>> {
        Ok(self.map.lock().values().cloned().collect())
    }
}

/// Resource store spy: in-memory records plus a mutation counter covering
/// insert, update and delete.
struct SpyResources {
    records: Mutex<Vec<(String, StoredRecord)>>,
    mutations: AtomicUsize,
}

impl SpyResources {
    fn new() -> Self {
        Self { records: Mutex::new(Vec::new()), mutations: AtomicUsize::new(0) }
    }
}

impl ResourceStore for SpyResources {
    fn insert(&self, collection: &str, body: serde_json::Map<String, serde_json::Value>) -> anyhow::Result<StoredRecord> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let now = chrono::Utc::now().timestamp_millis();
        let rec = StoredRecord {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            body,
        };
        self.records.lock().push((collection.to_string(), rec.clone()));
        Ok(rec)
    }

    fn get(&self, collection: &str, id: &str) -> anyhow::Result<Option<StoredRecord>> {
        Ok(self
            .records
            .lock()
            .iter()
            .find(|(c, r)| c == collection && r.id == id)
            .map(|(_, r)| r.clone()))
    }

    fn update(&self, collection: &str, id: &str, body: serde_json::Map<String, serde_json::Value>) -> anyhow::Result<Option<StoredRecord>> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock();
        for (c, r) in records.iter_mut() {
            if c == collection && r.id == id {
                r.body = body;
                r.updated_at = chrono::Utc::now().timestamp_millis();
                return Ok(Some(r.clone()));
            }
        }
        Ok(None)
    }

    fn delete(&self, collection: &str, id: &str) -> anyhow::Result<bool> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|(c, r)| !(c == collection && r.id == id));
        Ok(records.len() < before)
    }

    fn list(&self, collection: &str) -> anyhow::Result<Vec<StoredRecord>> {
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|(c, _)| c == collection)
            .map(|(_, r)| r.clone())
            .collect())
    }
}

fn test_state(profiles: Arc<CountingProfiles>, resources: Arc<SpyResources>) -> AppState {
    let media_root = tempdir().unwrap().keep();
    let provider = Arc::new(LocalAuthProvider::new(profiles.clone(), SessionManager::default()));
    let gate = Arc::new(Gate::new(RouteTable::marketplace_defaults(), provider.clone()));
    AppState {
        provider,
        profiles,
        resources,
        assets: Arc::new(DiskAssets::new(&media_root, "/media", DEFAULT_MAX_UPLOAD_BYTES)),
        gate,
        media_root,
        max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
    }
}

fn cookie_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("cookie", HeaderValue::from_str(&format!("{SESSION_COOKIE}={token}")).unwrap());
    headers
}

fn login_headers(state: &AppState, username: &str, password: &str) -> HeaderMap {
    let resp = state
        .provider
        .login(&LoginRequest { username: username.into(), password: password.into(), ip: None })
        .expect("login should succeed");
    cookie_headers(&resp.session.token)
}

fn sample_listing() -> Listing {
    Listing {
        title: "Canalside maisonette".into(),
        description: "Three floors, two terraces".into(),
        listing_type: ListingType::Sale,
        price: 320_000,
        city: "Manchester".into(),
        bedrooms: Some(3),
        images: vec![],
        status: ListingStatus::Pending,
        created_by: None,
    }
}

#[tokio::test]
async fn unauthenticated_fails_before_any_profile_lookup() {
    let profiles = Arc::new(CountingProfiles::new());
    let resources = Arc::new(SpyResources::new());
    let state = test_state(profiles.clone(), resources.clone());

    let err = server::require_admin(&state, &HeaderMap::new()).unwrap_err();
    assert_eq!(err.http_status(), 401);
    assert_eq!(profiles.gets.load(Ordering::SeqCst), 0, "no profile lookup for an anonymous caller");
    assert_eq!(resources.mutations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn non_admin_is_forbidden_and_the_store_is_untouched() {
    let profiles = Arc::new(CountingProfiles::new());
    profiles.seed("carol", "pw", Role::User);
    let resources = Arc::new(SpyResources::new());
    let state = test_state(profiles.clone(), resources.clone());
    let headers = login_headers(&state, "carol", "pw");

    let result = server::admin_listing_create(State(state.clone()), headers, Json(sample_listing())).await;
    let err = result.unwrap_err();
    assert_eq!(err.http_status(), 403);
    assert_eq!(resources.mutations.load(Ordering::SeqCst), 0, "forbidden call must not mutate");
    assert!(resources.list(LISTINGS).unwrap().is_empty());
}

#[tokio::test]
async fn agent_role_is_not_admin() {
    let profiles = Arc::new(CountingProfiles::new());
    profiles.seed("fred", "pw", Role::Agent);
    let resources = Arc::new(SpyResources::new());
    let state = test_state(profiles, resources.clone());
    let headers = login_headers(&state, "fred", "pw");

    let err = server::require_admin(&state, &headers).unwrap_err();
    assert_eq!(err.http_status(), 403);
}

#[tokio::test]
async fn admin_create_runs_the_mutation_and_queues_for_approval() {
    let profiles = Arc::new(CountingProfiles::new());
    profiles.seed("dave", "pw", Role::Admin);
    let resources = Arc::new(SpyResources::new());
    let state = test_state(profiles, resources.clone());
    let headers = login_headers(&state, "dave", "pw");

    let Json(out) = server::admin_listing_create(State(state.clone()), headers, Json(sample_listing()))
        .await
        .expect("admin create should succeed");
    assert_eq!(out.get("status").and_then(|s| s.as_str()), Some("ok"));
    let record = out.get("record").unwrap();
    assert!(record.get("id").and_then(|v| v.as_str()).is_some());
    // created listings always enter the approval queue under the creator's name
    assert_eq!(record.get("status").and_then(|v| v.as_str()), Some("pending"));
    assert_eq!(record.get("created_by").and_then(|v| v.as_str()), Some("dave"));
    assert_eq!(resources.mutations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn create_is_not_idempotent_two_calls_two_records() {
    // Documented gap: the handler does not deduplicate retried requests, so a
    // repeated create call makes a second record. This assertion keeps the
    // behavior deliberate.
    let profiles = Arc::new(CountingProfiles::new());
    profiles.seed("dave", "pw", Role::Admin);
    let resources = Arc::new(SpyResources::new());
    let state = test_state(profiles, resources.clone());
    let headers = login_headers(&state, "dave", "pw");

    let Json(first) = server::admin_listing_create(State(state.clone()), headers.clone(), Json(sample_listing()))
        .await
        .unwrap();
    let Json(second) = server::admin_listing_create(State(state.clone()), headers, Json(sample_listing()))
        .await
        .unwrap();
    let id1 = first["record"]["id"].as_str().unwrap();
    let id2 = second["record"]["id"].as_str().unwrap();
    assert_ne!(id1, id2);
    assert_eq!(resources.list(LISTINGS).unwrap().len(), 2);
}

#[tokio::test]
async fn end_to_end_admin_path_gate_then_role_check() {
    let profiles = Arc::new(CountingProfiles::new());
    profiles.seed("erin", "pw", Role::User);
    let resources = Arc::new(SpyResources::new());
    let state = test_state(profiles.clone(), resources.clone());

    let rec = resources.insert(LISTINGS, sample_listing().to_body()).unwrap();
    let path = format!("/admin/api/listings/{}", rec.id);

    // No session: the gate bounces to sign-in, preserving the destination.
    let decision = state.gate.authorize(&path, &HeaderMap::new());
    match decision.outcome {
        GateOutcome::RedirectToSignIn { location } => {
            let next = location.split("next=").nth(1).unwrap();
            assert_eq!(urlencoding::decode(next).unwrap(), path);
        }
        other => panic!("expected redirect, got {other:?}"),
    }

    // Signed in with role `user`: the gate allows, the handler refuses.
    let headers = login_headers(&state, "erin", "pw");
    assert_eq!(state.gate.authorize(&path, &headers).outcome, GateOutcome::Allow);
    let mut update = sample_listing();
    update.title = "Canalside maisonette (reduced)".into();
    let err = server::admin_listing_update(
        State(state.clone()),
        headers.clone(),
        Path(rec.id.clone()),
        Json(update.clone()),
    )
    .await
    .unwrap_err();
    assert_eq!(err.http_status(), 403);

    // Promoted to admin: same session, fresh role read, mutation goes through.
    profiles.update("erin", ProfileUpdate { role: Some(Role::Admin), ..Default::default() }).unwrap();
    let Json(out) = server::admin_listing_update(
        State(state.clone()),
        headers,
        Path(rec.id.clone()),
        Json(update),
    )
    .await
    .expect("admin update should succeed");
    assert_eq!(out["record"]["title"].as_str(), Some("Canalside maisonette (reduced)"));
}

#[tokio::test]
async fn first_authenticated_access_creates_the_profile() {
    let profiles = Arc::new(CountingProfiles::new());
    let resources = Arc::new(SpyResources::new());
    let state = test_state(profiles.clone(), resources);

    // A subject authenticated out-of-band has a session but no profile yet.
    let sm = SessionManager::default();
    let session = sm.issue(Subject::new("fresh"));
    let headers = cookie_headers(&session.token);

    let Json(out) = server::profile_show(State(state.clone()), headers).await.unwrap();
    assert_eq!(out["profile"]["role"].as_str(), Some("user"));
    assert_eq!(out["profile"]["verified"].as_bool(), Some(false));
    assert!(profiles.get("fresh").unwrap().is_some());
}
