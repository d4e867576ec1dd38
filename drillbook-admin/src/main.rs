//! Drillbook admin service - Main entry point
//!
//! HTTP admin surface over the curriculum document store: course, lesson,
//! and rudiment CRUD plus manual reordering and reference resolution.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use drillbook_core::config::{self, TomlConfig};
use drillbook_core::db::{init_database, CurriculumStore};
use drillbook_core::reference::ReferenceResolver;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use drillbook_admin::api;

/// Command-line arguments for drillbook-admin
#[derive(Parser, Debug)]
#[command(name = "drillbook-admin")]
#[command(about = "Curriculum admin service for Drillbook")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5730", env = "DRILLBOOK_ADMIN_PORT")]
    port: u16,

    /// Database file path (falls back to config file, then platform default)
    #[arg(short, long, env = "DRILLBOOK_DB")]
    db_path: Option<PathBuf>,

    /// Grant the admin role to a user ID and exit
    #[arg(long, value_name = "UID")]
    grant_admin: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drillbook_admin=debug,drillbook_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let toml_config = TomlConfig::load().context("Failed to load config file")?;
    let db_path = config::resolve_db_path(args.db_path.as_deref(), &toml_config);

    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    if let Some(uid) = args.grant_admin {
        sqlx::query("INSERT OR REPLACE INTO admins (uid, role) VALUES (?, 'admin')")
            .bind(&uid)
            .execute(&pool)
            .await?;
        info!("Granted admin role to {}", uid);
        return Ok(());
    }

    let state = api::AppState {
        store: CurriculumStore::new(pool),
        resolver: ReferenceResolver::new(toml_config.catalog()),
    };
    let app = api::create_router(state);

    let bind_addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Drillbook admin service listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
