mod app;
mod auth;
mod config;
mod error;
mod media;
mod recipes;
mod state;
mod storage;
mod users;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "recipebox=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;

    // Run migrations if present
    if let Err(e) = sqlx::migrate!("./migrations").run(&app_state.db).await {
        tracing::warn!(error = %e, "migrations folder not found or migration failed; continuing");
    }

    // `recipebox create-superuser <email> <password>` bootstraps an admin
    // account and exits.
    let mut args = std::env::args().skip(1);
    if args.next().as_deref() == Some("create-superuser") {
        let (Some(email), Some(password)) = (args.next(), args.next()) else {
            anyhow::bail!("usage: recipebox create-superuser <email> <password>");
        };
        let user = users::services::create_superuser(&app_state.db, &email, &password).await?;
        tracing::info!(user_id = %user.id, email = %user.email, "superuser created");
        return Ok(());
    }

    let app = app::build_app(app_state);
    app::serve(app).await
}
