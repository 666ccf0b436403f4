// Port for the durable per-session key-value store
use crate::domain::identity::{Identity, RoleCode, TenantScope, normalize_session_value};
use tokio::sync::watch;

pub const USER_ID_KEY: &str = "userid";
pub const ROLE_ID_KEY: &str = "roleid";
pub const INC_USER_ID_KEY: &str = "incuserid";
pub const TOKEN_KEY: &str = "token";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session store is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("session values could not be serialized: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Synchronous, last-write-wins string store shared by every open session.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// `None` removes the key. The in-process view is updated even when persisting fails.
    fn set(&self, key: &str, value: Option<&str>) -> Result<(), SessionError>;

    /// Pick up writes made outside this process. Returns true when anything changed.
    fn refresh(&self) -> Result<bool, SessionError> {
        Ok(false)
    }

    /// Change notifications, if the medium offers them
    fn subscribe(&self) -> Option<watch::Receiver<u64>> {
        None
    }
}

/// Read the three identity keys, normalizing "null" and blanks to absence
pub fn read_identity(store: &dyn SessionStore) -> Identity {
    let read = |key: &str| normalize_session_value(store.get(key).as_deref());

    let user_id = read(USER_ID_KEY);
    let role_id = read(ROLE_ID_KEY).and_then(|raw| {
        let role = RoleCode::parse(&raw);
        if role.is_none() {
            tracing::debug!(value = %raw, "ignoring unparseable stored role");
        }
        role
    });
    let inc_user_id = read(INC_USER_ID_KEY).and_then(|raw| {
        let scope = TenantScope::parse(&raw);
        if scope.is_none() {
            tracing::debug!(value = %raw, "ignoring unparseable stored tenant id");
        }
        scope
    });

    Identity::new(user_id, role_id, inc_user_id)
}
