// Session store adapters: process-local memory and a shared TOML file
use crate::application::session_store::{SessionError, SessionStore};
use crate::infrastructure::config::{SessionBackend, SessionSettings};
use anyhow::Context;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::SystemTime;
use tokio::sync::watch;

type Values = BTreeMap<String, String>;

fn apply(values: &mut Values, key: &str, value: Option<&str>) {
    match value {
        Some(value) => {
            values.insert(key.to_string(), value.to_string());
        }
        None => {
            values.remove(key);
        }
    }
}

/// Store shared by everything in one process
pub struct InMemorySessionStore {
    values: RwLock<Values>,
    revision: watch::Sender<u64>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(Values::new()),
            revision: watch::Sender::new(0),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: Option<&str>) -> Result<(), SessionError> {
        {
            let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
            apply(&mut values, key, value);
        }
        self.revision.send_modify(|revision| *revision += 1);
        Ok(())
    }

    fn subscribe(&self) -> Option<watch::Receiver<u64>> {
        Some(self.revision.subscribe())
    }
}

/// Open whichever store the settings name
pub fn open_session_store(settings: &SessionSettings) -> anyhow::Result<Arc<dyn SessionStore>> {
    match settings.backend {
        SessionBackend::Memory => {
            tracing::info!("using a process-local session store");
            Ok(Arc::new(InMemorySessionStore::new()))
        }
        SessionBackend::File => {
            let store = FileSessionStore::open(&settings.path)
                .with_context(|| format!("failed to open session store at {}", settings.path))?;
            Ok(Arc::new(store))
        }
    }
}

/// Store persisted as a flat TOML table, shared by every process that opens the same path
pub struct FileSessionStore {
    path: PathBuf,
    values: RwLock<Values>,
    modified: Mutex<Option<SystemTime>>,
    revision: watch::Sender<u64>,
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

fn read_values(path: &Path) -> Result<Values, SessionError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(toml::from_str(&text)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Values::new()),
        Err(e) => Err(e.into()),
    }
}

impl FileSessionStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let values = read_values(&path)?;
        tracing::info!(path = %path.display(), keys = values.len(), "opened session store");

        Ok(Self {
            modified: Mutex::new(modified_at(&path)),
            values: RwLock::new(values),
            revision: watch::Sender::new(0),
            path,
        })
    }

    fn persist(&self, values: &Values) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, toml::to_string(values)?)?;

        let mut modified = self.modified.lock().unwrap_or_else(PoisonError::into_inner);
        *modified = modified_at(&self.path);
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: Option<&str>) -> Result<(), SessionError> {
        let snapshot = {
            let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
            apply(&mut values, key, value);
            values.clone()
        };
        self.revision.send_modify(|revision| *revision += 1);
        self.persist(&snapshot)
    }

    fn refresh(&self) -> Result<bool, SessionError> {
        let on_disk = modified_at(&self.path);
        {
            let mut modified = self.modified.lock().unwrap_or_else(PoisonError::into_inner);
            if *modified == on_disk {
                return Ok(false);
            }
            *modified = on_disk;
        }

        let fresh = read_values(&self.path)?;
        let changed = {
            let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
            if *values == fresh {
                false
            } else {
                *values = fresh;
                true
            }
        };

        if changed {
            tracing::debug!(path = %self.path.display(), "session store changed on disk");
            self.revision.send_modify(|revision| *revision += 1);
        }
        Ok(changed)
    }

    fn subscribe(&self) -> Option<watch::Receiver<u64>> {
        Some(self.revision.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir()
            .join(format!("incubation-console-{}-{}", name, nanos))
            .join("session.toml")
    }

    #[test]
    fn test_in_memory_none_removes_key() {
        let store = InMemorySessionStore::new();
        let mut changes = store.subscribe().unwrap();

        store.set("userid", Some("42")).unwrap();
        assert_eq!(store.get("userid").as_deref(), Some("42"));
        assert!(changes.has_changed().unwrap());

        store.set("userid", None).unwrap();
        assert_eq!(store.get("userid"), None);
        assert_eq!(*changes.borrow_and_update(), 2);
    }

    #[test]
    fn test_settings_pick_the_backend() {
        let path = temp_path("backend");
        let mut settings = SessionSettings {
            backend: SessionBackend::Memory,
            path: path.display().to_string(),
            poll_interval_ms: 500,
        };
        let memory = open_session_store(&settings).unwrap();
        memory.set("userid", Some("42")).unwrap();
        assert!(!path.exists());

        settings.backend = SessionBackend::File;
        let file = open_session_store(&settings).unwrap();
        file.set("userid", Some("7")).unwrap();
        assert!(path.exists());
        assert_eq!(memory.get("userid").as_deref(), Some("42"));
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let path = temp_path("persist");
        let store = FileSessionStore::open(&path).unwrap();
        store.set("userid", Some("42")).unwrap();
        store.set("roleid", Some("1")).unwrap();
        store.set("roleid", None).unwrap();

        let reopened = FileSessionStore::open(&path).unwrap();
        assert_eq!(reopened.get("userid").as_deref(), Some("42"));
        assert_eq!(reopened.get("roleid"), None);
        let text = fs::read_to_string(&path).unwrap();
        assert!(!text.contains("null"));
    }

    #[test]
    fn test_refresh_picks_up_other_writers() {
        let path = temp_path("refresh");
        let ours = FileSessionStore::open(&path).unwrap();
        ours.set("userid", Some("42")).unwrap();
        assert!(!ours.refresh().unwrap());

        // Coarse filesystem clocks need a visible mtime step
        std::thread::sleep(Duration::from_millis(1100));
        let theirs = FileSessionStore::open(&path).unwrap();
        theirs.set("userid", Some("77")).unwrap();

        assert!(ours.refresh().unwrap());
        assert_eq!(ours.get("userid").as_deref(), Some("77"));
        assert!(!ours.refresh().unwrap());
    }

    #[test]
    fn test_corrupt_file_is_a_parse_error() {
        let path = temp_path("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "userid = [").unwrap();

        assert!(matches!(
            FileSessionStore::open(&path),
            Err(SessionError::Parse(_))
        ));
    }
}
