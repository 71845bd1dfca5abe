//! PromptRelay: fan one prompt out to several AI chat tabs and collect the
//! replies.

use std::path::PathBuf;
use std::sync::Arc;

use promptrelay_core::RelayConfig;
use promptrelay_server::panel::{render_text, PanelView};
use promptrelay_server::{build_router, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn resolve_data_dir() -> PathBuf {
    std::env::var("PROMPTRELAY_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

fn print_help() {
    println!("PromptRelay: broadcast prompts to AI chat tabs");
    println!();
    println!("Usage: promptrelay [command]");
    println!();
    println!("Commands:");
    println!("  (none) | serve           Start the server");
    println!("  tabs                     List detected chat tabs and exit");
    println!("  help                     Show this help message");
    println!();
    println!("Environment:");
    println!("  PORT                     HTTP port (default 3010)");
    println!("  PROMPTRELAY_CDP_URL      DevTools endpoint (default http://127.0.0.1:9222)");
    println!("  PROMPTRELAY_BROWSER      cdp | memory (default cdp)");
    println!("  PROMPTRELAY_DATA_DIR     Data directory holding agent.json (default ./data)");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("serve");

    match command {
        "serve" => {}
        "tabs" => return list_tabs().await,
        "--help" | "-h" | "help" => {
            print_help();
            return Ok(());
        }
        other => {
            eprintln!("Unknown command: {}. Use 'promptrelay help' for usage.", other);
            std::process::exit(1);
        }
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = RelayConfig::from_env(&data_dir)?;
    let port = config.port;

    let state = Arc::new(AppState::new(config));
    state.start();

    let app = build_router(state.clone());

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("PromptRelay listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn list_tabs() -> anyhow::Result<()> {
    let config = RelayConfig::from_env(resolve_data_dir())?;
    let state = AppState::new(config);
    state.start();

    let scan = state
        .coordinator
        .check_connection()
        .await
        .map_err(|e| e.to_string());
    let failed = scan.is_err();
    print!("{}", render_text(&PanelView::from_scan(scan)));
    if failed {
        std::process::exit(1);
    }
    Ok(())
}
