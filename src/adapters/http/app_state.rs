use std::sync::Arc;

use axum::extract::FromRef;

use crate::{infra::config::AppConfig, use_cases::token_validator::TokenValidator};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub token_validator: Arc<TokenValidator>,
}

impl FromRef<AppState> for Arc<TokenValidator> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.token_validator.clone()
    }
}
