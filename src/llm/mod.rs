pub mod models;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod request;
pub mod types;
