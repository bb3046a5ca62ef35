//! Profile directory: the persisted authorization attributes for subjects.
//! One JSON catalog file under the data root, guarded by a process-local lock.
//! The role stored here is the security boundary for admin operations; the
//! session only proves who is calling, never what they may do.

use anyhow::{anyhow, Context, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use parking_lot::Mutex;
use password_hash::{PasswordHash, SaltString};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Agent,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Role::User),
            "agent" => Some(Role::Agent),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub verified: bool,
    /// Argon2 PHC string; absent for subjects that authenticate elsewhere.
    #[serde(default)]
    pub password_hash: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Profile {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            user_id: user_id.into(),
            display_name: None,
            role: Role::default(),
            verified: false,
            password_hash: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// API-facing view of a profile. The password hash stays in the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct PublicProfile {
    pub user_id: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub verified: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&Profile> for PublicProfile {
    fn from(p: &Profile) -> Self {
        Self {
            user_id: p.user_id.clone(),
            display_name: p.display_name.clone(),
            role: p.role,
            verified: p.verified,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Set-if-present change set, applied under the catalog lock.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub role: Option<Role>,
    pub verified: Option<bool>,
    pub password: Option<String>,
}

pub trait ProfileStore: Send + Sync {
    fn get(&self, user_id: &str) -> Result<Option<Profile>>;
    fn create(&self, profile: Profile) -> Result<Profile>;
    fn update(&self, user_id: &str, changes: ProfileUpdate) -> Result<Profile>;
    fn list(&self) -> Result<Vec<Profile>>;
}

pub struct FileProfiles {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileProfiles {
    pub fn new(db_root: impl AsRef<Path>) -> Self {
        Self { path: db_root.as_ref().join("profiles.json"), lock: Mutex::new(()) }
    }

    fn read_all(&self) -> Result<Vec<Profile>> {
        if !self.path.exists() { return Ok(Vec::new()); }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("reading profile catalog {}", self.path.display()))?;
        let profiles: Vec<Profile> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing profile catalog {}", self.path.display()))?;
        Ok(profiles)
    }

    fn write_all(&self, profiles: &[Profile]) -> Result<()> {
        if let Some(dir) = self.path.parent() { fs::create_dir_all(dir).ok(); }
        let raw = serde_json::to_string_pretty(profiles)?;
        fs::write(&self.path, raw)
            .with_context(|| format!("writing profile catalog {}", self.path.display()))?;
        Ok(())
    }
}

impl ProfileStore for FileProfiles {
    fn get(&self, user_id: &str) -> Result<Option<Profile>> {
        let _g = self.lock.lock();
        Ok(self.read_all()?.into_iter().find(|p| p.user_id == user_id))
    }

    fn create(&self, profile: Profile) -> Result<Profile> {
        let _g = self.lock.lock();
        let mut all = self.read_all()?;
        if all.iter().any(|p| p.user_id == profile.user_id) {
            return Err(anyhow!("profile already exists: {}", profile.user_id));
        }
        all.push(profile.clone());
        self.write_all(&all)?;
        Ok(profile)
    }

    fn update(&self, user_id: &str, changes: ProfileUpdate) -> Result<Profile> {
        let _g = self.lock.lock();
        let mut all = self.read_all()?;
        let Some(profile) = all.iter_mut().find(|p| p.user_id == user_id) else {
            return Err(anyhow!("profile not found: {}", user_id));
        };
        if let Some(name) = changes.display_name { profile.display_name = Some(name); }
        if let Some(role) = changes.role { profile.role = role; }
        if let Some(verified) = changes.verified { profile.verified = verified; }
        if let Some(password) = changes.password { profile.password_hash = Some(hash_password(&password)?); }
        profile.updated_at = chrono::Utc::now().timestamp_millis();
        let updated = profile.clone();
        self.write_all(&all)?;
        Ok(updated)
    }

    fn list(&self) -> Result<Vec<Profile>> {
        let _g = self.lock.lock();
        self.read_all()
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2.hash_password(password.as_bytes(), &salt).map_err(|e| anyhow!(e.to_string()))?.to_string();
    Ok(phc)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else { false }
}

/// Fetch the caller's profile, creating the default one on first
/// authenticated access. New profiles always start as an unverified `user`;
/// promotion happens only through the admin surface.
pub fn ensure_profile(store: &dyn ProfileStore, user_id: &str) -> Result<Profile> {
    if let Some(existing) = store.get(user_id)? {
        return Ok(existing);
    }
    store.create(Profile::new(user_id))
}

/// Seed an administrator on an empty catalog so a fresh install is usable.
pub fn ensure_default_admin(store: &dyn ProfileStore) -> Result<()> {
    if !store.list()?.is_empty() { return Ok(()); }
    let mut admin = Profile::new("admin");
    admin.display_name = Some("Administrator".to_string());
    admin.role = Role::Admin;
    admin.verified = true;
    admin.password_hash = Some(hash_password("brickline")?);
    store.create(admin)?;
    tracing::warn!("seeded default admin account 'admin' with the default password; change it before exposing the server");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn role_parse_round_trips() {
        for role in [Role::User, Role::Agent, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn password_hash_verifies_and_rejects() {
        let phc = hash_password("s3cr3t!").unwrap();
        assert!(verify_password(&phc, "s3cr3t!"));
        assert!(!verify_password(&phc, "wrong"));
        assert!(!verify_password("not-a-phc-string", "s3cr3t!"));
    }

    #[test]
    fn create_get_update_list() {
        let tmp = tempdir().unwrap();
        let store = FileProfiles::new(tmp.path());
        assert!(store.get("ada").unwrap().is_none());

        store.create(Profile::new("ada")).unwrap();
        let got = store.get("ada").unwrap().unwrap();
        assert_eq!(got.role, Role::User);
        assert!(!got.verified);

        let updated = store
            .update("ada", ProfileUpdate { role: Some(Role::Admin), verified: Some(true), ..Default::default() })
            .unwrap();
        assert_eq!(updated.role, Role::Admin);
        assert!(updated.verified);
        assert!(updated.updated_at >= got.updated_at);

        assert!(store.update("ghost", ProfileUpdate::default()).is_err());
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn ensure_profile_creates_default_user_once() {
        let tmp = tempdir().unwrap();
        let store = FileProfiles::new(tmp.path());
        let first = ensure_profile(&store, "newcomer").unwrap();
        assert_eq!(first.role, Role::User);
        let again = ensure_profile(&store, "newcomer").unwrap();
        assert_eq!(again.created_at, first.created_at);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn default_admin_seeded_only_on_empty_catalog() {
        let tmp = tempdir().unwrap();
        let store = FileProfiles::new(tmp.path());
        ensure_default_admin(&store).unwrap();
        let admin = store.get("admin").unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(verify_password(admin.password_hash.as_deref().unwrap(), "brickline"));

        // a second call must not reseed or overwrite
        ensure_default_admin(&store).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }
}
