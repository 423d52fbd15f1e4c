use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use hr_evaluation::auth::AuthService;
use hr_evaluation::config::AppConfig;
use hr_evaluation::db::{seed, MemoryStore, PgStore, RecordStore};
use hr_evaluation::middleware::RateLimiter;
use hr_evaluation::services::reminders;
use hr_evaluation::state::{AppState, SharedState};
use hr_evaluation::tenant::{ConfigProvider, StaticConfig};
use hr_evaluation::{time_utils, web};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let env = AppConfig::from_env()?;

    let store: Arc<dyn RecordStore> = match &env.database_url {
        Some(url) => Arc::new(PgStore::connect(url).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, records are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let config = StaticConfig::for_tenant(&env.tenant_id)?;
    let tenant = config.current_tenant();
    tracing::info!("Tenant: {}", tenant.display_name);
    if !time_utils::is_valid_timezone(&tenant.timezone) {
        tracing::warn!("Unknown timezone '{}', reminder dates use UTC", tenant.timezone);
    }
    for issue in config.category_weight_issues() {
        tracing::warn!("Category weights: {}", issue);
    }

    let auth = AuthService::from_tenant(config.current_tenant())
        .context("failed to prepare demo accounts")?;
    seed::seed_all(store.as_ref(), &config, chrono::Utc::now()).await?;

    let shared: SharedState = Arc::new(AppState {
        store,
        config: Arc::new(config),
        auth: Arc::new(auth),
        env: env.clone(),
        login_limiter: RateLimiter::for_logins(),
    });

    let scheduler = JobScheduler::new().await?;

    // Deadline and approval reminders - daily at 00:00 UTC (09:00 in Tokyo)
    let shared_for_reminders = shared.clone();
    scheduler
        .add(Job::new_async("0 0 0 * * *", move |_uuid, _l| {
            let state = shared_for_reminders.clone();
            Box::pin(async move {
                match reminders::run(&state, chrono::Utc::now()).await {
                    Ok(report) => tracing::info!(
                        "Reminder run finished: {} deadline notices, {} pending approvals",
                        report.notices.len(),
                        report.pending.len()
                    ),
                    Err(e) => tracing::error!("Reminder run failed: {}", e),
                }
            })
        })?)
        .await?;

    // Login limiter cleanup - hourly
    let shared_for_cleanup = shared.clone();
    scheduler
        .add(Job::new_async("0 0 * * * *", move |_uuid, _l| {
            let state = shared_for_cleanup.clone();
            Box::pin(async move {
                state.login_limiter.cleanup().await;
            })
        })?)
        .await?;

    scheduler.start().await?;
    tracing::info!("Scheduler started:");
    tracing::info!("  - Deadline reminders: daily");
    tracing::info!("  - Login limiter cleanup: hourly");

    let mut app = web::routes(shared.clone()).layer(TraceLayer::new_for_http());
    if let Some(origin) = &env.cors_origin {
        let origin: HeaderValue = origin.parse().context("CORS_ORIGIN is not a valid header value")?;
        app = app.layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
                .allow_credentials(true),
        );
    }

    tracing::info!("Listening on {}", env.bind_addr);
    let listener = tokio::net::TcpListener::bind(&env.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
