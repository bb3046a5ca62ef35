use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attrs {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
}

/// The authenticated caller of a request. Absence of a Subject means the
/// request is anonymous, which is a valid state rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subject {
    pub user_id: String,
    #[serde(default)]
    pub attrs: Attrs,
}

impl Subject {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), attrs: Attrs::default() }
    }
}
