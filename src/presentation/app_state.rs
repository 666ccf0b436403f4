// Application state for HTTP handlers
use crate::application::data_provider::DataProvider;
use crate::application::incubation_admin::IncubationAdmin;
use crate::application::incubation_api::IncubationApi;
use crate::application::user_directory::UserDirectory;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<DataProvider>,
    pub users: UserDirectory,
    pub incubations: IncubationAdmin,
    /// Used directly by the per-request contact lookups
    pub api: Arc<dyn IncubationApi>,
}

impl AppState {
    pub fn new(provider: Arc<DataProvider>, api: Arc<dyn IncubationApi>, asset_base_url: &str) -> Self {
        Self {
            provider,
            users: UserDirectory::new(api.clone()),
            incubations: IncubationAdmin::new(api.clone(), asset_base_url),
            api,
        }
    }
}
