// Contact lookup - SPOC fetch that is cancelled when its owner goes away
use crate::application::incubation_api::{IncubationApi, Scope};
use crate::domain::user::Contact;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

const FETCH_FAILED: &str = "Failed to fetch contacts";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContactState {
    pub loading: bool,
    pub contacts: Vec<Contact>,
    pub error: Option<String>,
}

/// One in-flight lookup. Dropping it aborts the request; an aborted lookup
/// never publishes a result.
pub struct ContactLookup {
    state: watch::Receiver<ContactState>,
    task: Option<JoinHandle<()>>,
}

impl ContactLookup {
    pub fn spawn(api: Arc<dyn IncubationApi>, user_id: Option<String>, inc_user_id: Option<String>) -> Self {
        let Some(user_id) = user_id.filter(|id| !id.trim().is_empty()) else {
            let (_, state) = watch::channel(ContactState::default());
            return Self { state, task: None };
        };

        let (tx, state) = watch::channel(ContactState {
            loading: true,
            ..Default::default()
        });

        let task = tokio::spawn(async move {
            let scope = Scope {
                user_id: Some(&user_id),
                inc_user_id: inc_user_id.as_deref(),
            };
            let next = match api.contacts(scope).await {
                Ok(contacts) => {
                    debug!(user_id = %user_id, count = contacts.len(), "fetched contacts");
                    ContactState {
                        loading: false,
                        contacts,
                        error: None,
                    }
                }
                Err(e) => {
                    error!(user_id = %user_id, error = %e, "failed to fetch contacts");
                    ContactState {
                        loading: false,
                        contacts: Vec::new(),
                        error: Some(e.user_message(FETCH_FAILED)),
                    }
                }
            };
            tx.send_replace(next);
        });

        Self {
            state,
            task: Some(task),
        }
    }

    pub fn state(&self) -> ContactState {
        self.state.borrow().clone()
    }

    /// Wait until the lookup has settled
    pub async fn finished(&mut self) -> ContactState {
        let settled = self
            .state
            .wait_for(|state| !state.loading)
            .await
            .map(|state| state.clone());
        settled.unwrap_or_else(|_| self.state.borrow().clone())
    }
}

impl Drop for ContactLookup {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                debug!("contact lookup cancelled");
                task.abort();
            }
        }
    }
}
