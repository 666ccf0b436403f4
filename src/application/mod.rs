// Application layer - Use cases and the ports they depend on
pub mod contact_lookup;
pub mod dashboard_service;
pub mod data_provider;
pub mod incubation_admin;
pub mod incubation_api;
pub mod scope;
pub mod session_store;
pub mod user_directory;

#[cfg(test)]
pub mod testing;
