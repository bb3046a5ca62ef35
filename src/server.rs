//!
//! brickline HTTP server
//! ---------------------
//! This module defines the Axum-based HTTP API for the marketplace.
//!
//! Responsibilities:
//! - Session management with an HttpOnly cookie issued at login.
//! - The per-request authorization gate (route classification + session
//!   resolution) mounted as middleware in front of every handler.
//! - Public listing browse/search, protected bookings/favorites/profile,
//!   and the role-gated admin back-office (listing CRUD and approval, user
//!   directory, media uploads).
//! - First-run demo listings and startup inventory logs.
//!
//! The gate is a UX tier only. Every admin handler re-resolves the caller and
//! re-reads the persisted role before mutating anything; an Allow from the
//! middleware never authorizes an admin operation by itself.

use std::fs;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use futures_util::FutureExt; // for catch_unwind on async blocks
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::assets::{AssetStore, DiskAssets, DEFAULT_MAX_UPLOAD_BYTES};
use crate::bookings::{self, Booking, BookingPayload, Favorite};
use crate::error::ApiError;
use crate::identity::{
    admin_verdict, AuthProvider, Gate, GateOutcome, LocalAuthProvider, LoginRequest, RouteTable,
    SessionManager, Subject, SESSION_COOKIE,
};
use crate::listings::{self, Listing, ListingQuery, ListingStatus};
use crate::profiles::{
    ensure_default_admin, ensure_profile, FileProfiles, Profile, ProfileStore, ProfileUpdate,
    PublicProfile, Role,
};
use crate::storage::{ResourceStore, Store};

pub const LISTINGS: &str = "listings";
pub const BOOKINGS: &str = "bookings";
pub const FAVORITES: &str = "favorites";

/// Shared server state injected into all handlers. Every collaborator sits
/// behind its trait so tests can substitute spies and hosted services can
/// replace the local implementations.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn AuthProvider>,
    pub profiles: Arc<dyn ProfileStore>,
    pub resources: Arc<dyn ResourceStore>,
    pub assets: Arc<dyn AssetStore>,
    pub gate: Arc<Gate>,
    pub media_root: PathBuf,
    pub max_upload_bytes: u64,
}

fn log_startup_folders(data_root: &str, media_root: &str) {
    let cwd = std::env::current_dir().ok();
    let exe = std::env::current_exe().ok();
    let data_env = std::env::var("BRICKLINE_DATA_FOLDER").ok();
    info!(
        target: "startup",
        "brickline starting. Folder configuration: cwd={:?}, exe={:?}, data_root='{}', media_root='{}', BRICKLINE_DATA_FOLDER_env={:?}",
        cwd, exe, data_root, media_root, data_env
    );
}

/// Create a couple of approved demo listings so a fresh install has a
/// browsable public surface. Only runs when the catalog is empty.
fn seed_demo_listings(resources: &dyn ResourceStore) -> anyhow::Result<()> {
    if !resources.list(LISTINGS)?.is_empty() {
        return Ok(());
    }
    println!("Empty catalog detected, creating demo listings");
    let demos = [
        Listing {
            title: "Two-bed garden flat".into(),
            description: "Ground floor flat with a private garden, five minutes from the station.".into(),
            listing_type: crate::listings::ListingType::Rent,
            price: 1450,
            city: "Leeds".into(),
            bedrooms: Some(2),
            images: vec![],
            status: ListingStatus::Approved,
            created_by: Some("admin".into()),
        },
        Listing {
            title: "Harbourside studio".into(),
            description: "Compact studio with water views, available for short stays.".into(),
            listing_type: crate::listings::ListingType::Shortlet,
            price: 95,
            city: "Bristol".into(),
            bedrooms: Some(1),
            images: vec![],
            status: ListingStatus::Approved,
            created_by: Some("admin".into()),
        },
    ];
    for listing in demos {
        resources.insert(LISTINGS, listing.to_body())?;
    }
    println!("Created demo listings");
    Ok(())
}

/// Print the catalog inventory on startup.
fn log_catalog_summary(profiles: &dyn ProfileStore, resources: &dyn ResourceStore) {
    let profile_count = profiles.list().map(|p| p.len()).unwrap_or(0);
    let records = resources.list(LISTINGS).unwrap_or_default();
    let mut approved = 0usize;
    let mut pending = 0usize;
    let mut rejected = 0usize;
    for rec in &records {
        match listings::decode(rec).map(|l| l.status) {
            Some(ListingStatus::Approved) => approved += 1,
            Some(ListingStatus::Rejected) => rejected += 1,
            _ => pending += 1,
        }
    }
    println!("Catalog: {} profiles, {} listings ({} approved, {} pending, {} rejected)", profile_count, records.len(), approved, pending, rejected);
    info!("Catalog: {} profiles, {} listings ({} approved, {} pending, {} rejected)", profile_count, records.len(), approved, pending, rejected);
}

/// Start the brickline HTTP server bound to the given port.
///
/// This sets up the stores under the data root, ensures an admin profile
/// exists, seeds demo listings on first run, and mounts all routes behind the
/// authorization gate.
pub async fn run_with_ports(http_port: u16, data_root: &str, media_root: &str, max_upload_bytes: u64) -> anyhow::Result<()> {
    log_startup_folders(data_root, media_root);

    fs::create_dir_all(data_root)
        .with_context(|| format!("Failed to create or access data root: {}", data_root))?;
    let profiles: Arc<dyn ProfileStore> = Arc::new(FileProfiles::new(data_root));
    ensure_default_admin(profiles.as_ref())
        .with_context(|| format!("While ensuring default admin under data root: {}", data_root))?;

    let resources: Arc<dyn ResourceStore> = Arc::new(
        Store::new(std::path::Path::new(data_root).join("records"))
            .with_context(|| format!("While creating record store under: {}", data_root))?,
    );
    if let Err(e) = seed_demo_listings(resources.as_ref()) {
        tracing::warn!("Failed to create demo listings: {e}");
    }
    log_catalog_summary(profiles.as_ref(), resources.as_ref());

    let assets: Arc<dyn AssetStore> = Arc::new(DiskAssets::new(media_root, "/media", max_upload_bytes));
    let provider = Arc::new(LocalAuthProvider::new(profiles.clone(), SessionManager::default()));
    let gate = Arc::new(Gate::new(RouteTable::marketplace_defaults(), provider.clone()));

    let state = AppState {
        provider,
        profiles,
        resources,
        assets,
        gate,
        media_root: PathBuf::from(media_root),
        max_upload_bytes,
    };

    let app = router(state);
    let addr: SocketAddr = format!("0.0.0.0:{}", http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Convenience entry point using default port and folders.
pub async fn run() -> anyhow::Result<()> {
    run_with_ports(7878, "data", "data/media", DEFAULT_MAX_UPLOAD_BYTES).await
}

pub fn router(state: AppState) -> Router {
    let upload_limit = state.max_upload_bytes as usize;
    Router::new()
        .route("/", get(|| async { "brickline ok" }))
        .route("/healthz", get(healthz))
        .route("/signin", get(signin))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/listings", get(listings_index))
        .route("/listings/{id}", get(listings_show))
        .route("/media/{file}", get(media_show))
        .route("/profile", get(profile_show).put(profile_update))
        .route("/favorites", get(favorites_index))
        .route("/favorites/{listing_id}", put(favorites_add).delete(favorites_remove))
        .route("/bookings", get(bookings_index).post(bookings_create))
        .route("/admin/api/listings", post(admin_listing_create))
        .route("/admin/api/listings/{id}", put(admin_listing_update).delete(admin_listing_delete))
        .route("/admin/api/listings/{id}/approve", post(admin_listing_approve))
        .route("/admin/api/listings/{id}/reject", post(admin_listing_reject))
        .route("/admin/api/users", get(admin_users_index))
        .route("/admin/api/users/{user_id}/role", put(admin_user_role))
        .route("/admin/api/users/{user_id}/verify", put(admin_user_verify))
        .route("/admin/api/media", post(admin_media_upload).layer(DefaultBodyLimit::max(upload_limit)))
        .route("/admin/api/media/{id}", delete(admin_media_delete))
        .layer(middleware::from_fn_with_state(state.clone(), gate_middleware))
        .with_state(state)
}

/// The authorization gate, mounted in front of every route.
///
/// RedirectToSignIn renders as a 303 for page loads (GET/HEAD) and as a 401
/// JSON body carrying the sign-in URL for API calls; the decision is the same
/// either way. Admin requests additionally run under a panic guard so a
/// handler panic becomes a 500 instead of a torn connection.
pub async fn gate_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let decision = state.gate.authorize(&path_and_query, req.headers());
    match decision.outcome {
        GateOutcome::Allow => {
            if decision.class == crate::identity::RouteClass::AdminOnly {
                match AssertUnwindSafe(next.run(req)).catch_unwind().await {
                    Ok(resp) => resp,
                    Err(panic_payload) => {
                        let msg = if let Some(s) = panic_payload.downcast_ref::<&str>() { *s }
                                  else if let Some(s) = panic_payload.downcast_ref::<String>() { s.as_str() }
                                  else { "panic" };
                        error!(target: "panic", "admin handler panic on {}: {}", path_and_query, msg);
                        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({
                            "status": "error",
                            "code": "internal_panic",
                            "message": "internal server error"
                        }))).into_response()
                    }
                }
            } else {
                next.run(req).await
            }
        }
        GateOutcome::RedirectToSignIn { location } => {
            if req.method() == Method::GET || req.method() == Method::HEAD {
                Redirect::to(&location).into_response()
            } else {
                (StatusCode::UNAUTHORIZED, Json(json!({
                    "status": "error",
                    "code": "unauthenticated",
                    "message": "sign in required",
                    "sign_in": location
                }))).into_response()
            }
        }
        GateOutcome::Reject => {
            ApiError::forbidden("forbidden", "not allowed").into_response()
        }
    }
}

fn set_session_cookie(token: &str) -> HeaderValue {
    // HttpOnly cookie scoped to path / with SameSite=Strict
    HeaderValue::from_str(&format!("{}={}; HttpOnly; Secure; SameSite=Strict; Path=/", SESSION_COOKIE, token)).unwrap()
}

fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_str(&format!("{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; Secure; SameSite=Strict; Path=/", SESSION_COOKIE)).unwrap()
}

/// Resolve the caller or fail with 401. Handlers never trust the gate; this
/// is always a fresh lookup.
pub fn require_subject(state: &AppState, headers: &HeaderMap) -> Result<Subject, ApiError> {
    state
        .provider
        .current_subject(headers)
        .ok_or_else(|| ApiError::auth("unauthenticated", "sign in required"))
}

/// The handler-tier admin check: re-resolve the caller, then re-read the
/// persisted role. This, not the gate, is the security boundary for every
/// admin mutation. Anonymous callers fail before any profile lookup happens.
pub fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<Profile, ApiError> {
    let subject = require_subject(state, headers)?;
    let profile = match state.profiles.get(&subject.user_id) {
        Ok(Some(p)) => p,
        Ok(None) => return Err(ApiError::auth("unknown_subject", "sign in required")),
        Err(e) => {
            // A failed lookup reads as "cannot establish authorization", the
            // same as an absent profile; it is not retried here.
            error!("profile lookup failed for '{}': {e:#}", subject.user_id);
            return Err(ApiError::auth("unknown_subject", "sign in required"));
        }
    };
    match admin_verdict(profile.role) {
        GateOutcome::Allow => Ok(profile),
        _ => {
            info!("admin access denied for '{}' (role {})", profile.user_id, profile.role.as_str());
            Err(ApiError::forbidden("admin_only", "administrator role required"))
        }
    }
}

// ---------------------------------------------------------------------------
// Public surface
// ---------------------------------------------------------------------------

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

#[derive(Debug, Deserialize)]
struct SigninQuery {
    next: Option<String>,
}

async fn signin(Query(q): Query<SigninQuery>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "sign_in_required",
        "login": "/login",
        "next": q.next,
    }))
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    username: String,
    password: String,
}

async fn login(State(state): State<AppState>, Json(payload): Json<LoginPayload>) -> impl IntoResponse {
    let req = LoginRequest { username: payload.username, password: payload.password, ip: None };
    match state.provider.login(&req) {
        Ok(resp) => {
            let mut headers = HeaderMap::new();
            headers.insert("Set-Cookie", set_session_cookie(&resp.session.token));
            (StatusCode::OK, headers, Json(json!({"status": "ok", "session_id": resp.session.session_id})))
        }
        Err(e) => {
            let status = StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, HeaderMap::new(), Json(json!({"status": "error", "code": e.code_str(), "message": e.message()})))
        }
    }
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let removed = state.provider.logout(&headers);
    let mut h = HeaderMap::new();
    h.insert("Set-Cookie", clear_session_cookie());
    (StatusCode::OK, h, Json(json!({"status": "ok", "removed": removed})))
}

async fn listings_index(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let records = state.resources.list(LISTINGS)?;
    let mut results = Vec::new();
    for rec in records {
        let Some(listing) = listings::decode(&rec) else { continue };
        if listing.status != ListingStatus::Approved { continue; }
        if !listings::matches(&listing, &query) { continue; }
        results.push(serde_json::to_value(&rec).unwrap_or_default());
    }
    Ok(Json(json!({"status": "ok", "results": results})))
}

async fn listings_show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let rec = state
        .resources
        .get(LISTINGS, &id)?
        .ok_or_else(|| ApiError::not_found("not_found", "no such listing"))?;
    let approved = listings::decode(&rec).map(|l| l.status == ListingStatus::Approved).unwrap_or(false);
    if !approved {
        // pending and rejected listings are indistinguishable from absent ones
        return Err(ApiError::not_found("not_found", "no such listing"));
    }
    Ok(Json(json!({"status": "ok", "record": rec})))
}

fn is_safe_media_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        && !name.contains("..")
}

fn content_type_for(file: &str) -> &'static str {
    match file.rsplit('.').next() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

async fn media_show(State(state): State<AppState>, Path(file): Path<String>) -> Response {
    if !is_safe_media_name(&file) {
        return ApiError::not_found("not_found", "no such asset").into_response();
    }
    let path = state.media_root.join(&file);
    match fs::read(&path) {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type_for(&file))], bytes).into_response(),
        Err(_) => ApiError::not_found("not_found", "no such asset").into_response(),
    }
}

// ---------------------------------------------------------------------------
// Protected surface
// ---------------------------------------------------------------------------

pub async fn profile_show(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let subject = require_subject(&state, &headers)?;
    // First authenticated access creates the default profile.
    let profile = ensure_profile(state.profiles.as_ref(), &subject.user_id)?;
    Ok(Json(json!({"status": "ok", "profile": PublicProfile::from(&profile)})))
}

#[derive(Debug, Deserialize)]
pub struct ProfileSelfPayload {
    display_name: Option<String>,
    password: Option<String>,
}

/// Self-service profile update. Role and verification are deliberately not
/// reachable from here; those change only through the admin surface.
pub async fn profile_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ProfileSelfPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let subject = require_subject(&state, &headers)?;
    ensure_profile(state.profiles.as_ref(), &subject.user_id)?;
    let changes = ProfileUpdate {
        display_name: payload.display_name,
        password: payload.password,
        role: None,
        verified: None,
    };
    let updated = state.profiles.update(&subject.user_id, changes)?;
    Ok(Json(json!({"status": "ok", "profile": PublicProfile::from(&updated)})))
}

fn approved_listing(state: &AppState, listing_id: &str) -> Result<(), ApiError> {
    let rec = state
        .resources
        .get(LISTINGS, listing_id)?
        .ok_or_else(|| ApiError::not_found("not_found", "no such listing"))?;
    match listings::decode(&rec) {
        Some(l) if l.status == ListingStatus::Approved => Ok(()),
        _ => Err(ApiError::not_found("not_found", "no such listing")),
    }
}

async fn favorites_index(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let subject = require_subject(&state, &headers)?;
    let records = state.resources.list(FAVORITES)?;
    let results: Vec<serde_json::Value> = records
        .iter()
        .filter(|rec| bookings::record_user_id(rec) == Some(subject.user_id.as_str()))
        .map(|rec| serde_json::to_value(rec).unwrap_or_default())
        .collect();
    Ok(Json(json!({"status": "ok", "results": results})))
}

async fn favorites_add(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let subject = require_subject(&state, &headers)?;
    approved_listing(&state, &listing_id)?;
    let existing = state.resources.list(FAVORITES)?.into_iter().find(|rec| {
        bookings::record_user_id(rec) == Some(subject.user_id.as_str())
            && bookings::record_listing_id(rec) == Some(listing_id.as_str())
    });
    if let Some(rec) = existing {
        return Ok(Json(json!({"status": "ok", "record": rec})));
    }
    let favorite = Favorite { user_id: subject.user_id, listing_id };
    let rec = state.resources.insert(FAVORITES, favorite.to_body())?;
    Ok(Json(json!({"status": "ok", "record": rec})))
}

async fn favorites_remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let subject = require_subject(&state, &headers)?;
    let existing = state.resources.list(FAVORITES)?.into_iter().find(|rec| {
        bookings::record_user_id(rec) == Some(subject.user_id.as_str())
            && bookings::record_listing_id(rec) == Some(listing_id.as_str())
    });
    let removed = match existing {
        Some(rec) => state.resources.delete(FAVORITES, &rec.id)?,
        None => false,
    };
    Ok(Json(json!({"status": "ok", "removed": removed})))
}

async fn bookings_index(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let subject = require_subject(&state, &headers)?;
    let records = state.resources.list(BOOKINGS)?;
    let results: Vec<serde_json::Value> = records
        .iter()
        .filter(|rec| bookings::record_user_id(rec) == Some(subject.user_id.as_str()))
        .map(|rec| serde_json::to_value(rec).unwrap_or_default())
        .collect();
    Ok(Json(json!({"status": "ok", "results": results})))
}

async fn bookings_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<BookingPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let subject = require_subject(&state, &headers)?;
    payload.validate()?;
    approved_listing(&state, &payload.listing_id)?;
    let booking = Booking::from_payload(payload, subject.user_id);
    let rec = state.resources.insert(BOOKINGS, booking.to_body())?;
    Ok(Json(json!({"status": "ok", "record": rec})))
}

// ---------------------------------------------------------------------------
// Admin surface. Every handler starts with the authoritative role check.
// ---------------------------------------------------------------------------

pub async fn admin_listing_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut payload): Json<Listing>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let admin = require_admin(&state, &headers)?;
    payload.validate()?;
    // New listings always enter the approval queue; approval is explicit.
    payload.status = ListingStatus::Pending;
    payload.created_by = Some(admin.user_id);
    let rec = state.resources.insert(LISTINGS, payload.to_body())?;
    Ok(Json(json!({"status": "ok", "record": rec})))
}

pub async fn admin_listing_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(mut payload): Json<Listing>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&state, &headers)?;
    payload.validate()?;
    let existing = state
        .resources
        .get(LISTINGS, &id)?
        .ok_or_else(|| ApiError::not_found("not_found", "no such listing"))?;
    if let Some(prev) = listings::decode(&existing) {
        // status and provenance travel with the record, not the payload
        payload.status = prev.status;
        payload.created_by = prev.created_by;
    }
    let rec = state
        .resources
        .update(LISTINGS, &id, payload.to_body())?
        .ok_or_else(|| ApiError::not_found("not_found", "no such listing"))?;
    Ok(Json(json!({"status": "ok", "record": rec})))
}

pub async fn admin_listing_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&state, &headers)?;
    let deleted = state.resources.delete(LISTINGS, &id)?;
    if !deleted {
        return Err(ApiError::not_found("not_found", "no such listing"));
    }
    Ok(Json(json!({"status": "ok", "deleted": true})))
}

fn set_listing_status(state: &AppState, id: &str, status: ListingStatus) -> Result<Json<serde_json::Value>, ApiError> {
    let existing = state
        .resources
        .get(LISTINGS, id)?
        .ok_or_else(|| ApiError::not_found("not_found", "no such listing"))?;
    let mut listing = listings::decode(&existing)
        .ok_or_else(|| ApiError::internal("corrupt_record", "listing record is unreadable"))?;
    listing.status = status;
    let rec = state
        .resources
        .update(LISTINGS, id, listing.to_body())?
        .ok_or_else(|| ApiError::not_found("not_found", "no such listing"))?;
    Ok(Json(json!({"status": "ok", "record": rec})))
}

pub async fn admin_listing_approve(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&state, &headers)?;
    set_listing_status(&state, &id, ListingStatus::Approved)
}

pub async fn admin_listing_reject(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&state, &headers)?;
    set_listing_status(&state, &id, ListingStatus::Rejected)
}

pub async fn admin_users_index(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&state, &headers)?;
    let all = state.profiles.list()?;
    let results: Vec<PublicProfile> = all.iter().map(PublicProfile::from).collect();
    Ok(Json(json!({"status": "ok", "results": results})))
}

#[derive(Debug, Deserialize)]
pub struct RolePayload {
    role: String,
}

pub async fn admin_user_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Json(payload): Json<RolePayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&state, &headers)?;
    let role = Role::parse(&payload.role)
        .ok_or_else(|| ApiError::validation("unknown_role", "role must be one of user, agent, admin"))?;
    if state.profiles.get(&user_id)?.is_none() {
        return Err(ApiError::not_found("not_found", "no such profile"));
    }
    // Sessions stay live across a role change; the role is re-read on every
    // admin request, so promotion and demotion take effect immediately.
    let updated = state.profiles.update(&user_id, ProfileUpdate { role: Some(role), ..Default::default() })?;
    Ok(Json(json!({"status": "ok", "profile": PublicProfile::from(&updated)})))
}

#[derive(Debug, Deserialize)]
pub struct VerifyPayload {
    verified: bool,
}

pub async fn admin_user_verify(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Json(payload): Json<VerifyPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&state, &headers)?;
    if state.profiles.get(&user_id)?.is_none() {
        return Err(ApiError::not_found("not_found", "no such profile"));
    }
    let updated = state
        .profiles
        .update(&user_id, ProfileUpdate { verified: Some(payload.verified), ..Default::default() })?;
    Ok(Json(json!({"status": "ok", "profile": PublicProfile::from(&updated)})))
}

pub async fn admin_media_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&state, &headers)?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let asset = state.assets.upload(&body, content_type)?;
    Ok(Json(json!({"status": "ok", "asset": asset})))
}

pub async fn admin_media_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&state, &headers)?;
    let deleted = state.assets.delete(&id)?;
    if !deleted {
        return Err(ApiError::not_found("not_found", "no such asset"));
    }
    Ok(Json(json!({"status": "ok", "deleted": true})))
}
