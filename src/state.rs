use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::db::RecordStore;
use crate::middleware::RateLimiter;
use crate::tenant::ConfigProvider;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub config: Arc<dyn ConfigProvider>,
    pub auth: Arc<AuthService>,
    pub env: AppConfig,
    pub login_limiter: RateLimiter,
}

impl AppState {
    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn config(&self) -> &dyn ConfigProvider {
        self.config.as_ref()
    }
}

pub type SharedState = Arc<AppState>;
