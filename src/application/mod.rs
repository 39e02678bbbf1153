pub mod app_error;
pub mod cache_keys;
pub mod client_apps;
pub mod use_cases;
