mod cli;

use axum::Router;
use backend::AppState;
use backend::card::{DiskCard, parse_character_card};
use backend::stores::{self, StoreConfig};
use clap::Parser;
use cli::{Cli, Command, StoreKind};
use std::net::SocketAddr;
use std::path::PathBuf;
use tower_http::services::ServeDir;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const AVATAR_PREVIEW_CHARS: usize = 48;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match Cli::parse().command {
        Command::Serve {
            port,
            store,
            store_path,
            dist_dir,
        } => serve(port, store_config(store, store_path), dist_dir).await,
        Command::Inspect { path, full } => inspect(path, full).await,
    }
}

fn store_config(kind: StoreKind, path: Option<PathBuf>) -> StoreConfig {
    let path = path.unwrap_or_else(|| kind.default_path());
    match kind {
        StoreKind::Local => StoreConfig::Local { path },
        StoreKind::Sqlite => StoreConfig::Sqlite {
            url: format!("sqlite://{}", path.display()),
        },
        StoreKind::Memory => StoreConfig::Memory,
    }
}

async fn serve(
    port: u16,
    config: StoreConfig,
    dist_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = stores::open(&config).await?;
    tracing::info!("Using {:?} store", config);

    let mut router = Router::new();
    if let Some(dist_dir) = dist_dir {
        router = router.fallback_service(ServeDir::new(dist_dir));
    }
    let router = backend::init(router, AppState::new(store));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

async fn inspect(path: PathBuf, full: bool) -> Result<(), Box<dyn std::error::Error>> {
    let Some(mut character) = parse_character_card(&DiskCard::open(&path)).await? else {
        tracing::warn!("No character data found in {}", path.display());
        return Ok(());
    };

    if !full && character.avatar.len() > AVATAR_PREVIEW_CHARS {
        let total = character.avatar.len();
        character.avatar.truncate(AVATAR_PREVIEW_CHARS);
        character.avatar.push_str(&format!("... ({} chars)", total));
    }
    println!("{}", serde_json::to_string_pretty(&character)?);
    Ok(())
}
