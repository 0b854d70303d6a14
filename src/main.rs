use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use volley_graph::api::{build_router, parse_id, state::AppState};
use volley_graph::calculate::{performance_index, PlayerStatsReport};
use volley_graph::config::AppConfig;
use volley_graph::models::Player;
use volley_graph::storage::{DocumentStore, StorageConfig};

#[derive(Parser)]
#[command(name = "volley-graph")]
#[command(about = "Volleyball league and team shop backend")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },

    /// List players ranked by performance index
    Players {
        /// Include retired players
        #[arg(long)]
        all: bool,
    },

    /// Show the advanced statistics of one player
    Stats {
        /// Player ID
        player_id: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Config file if present, defaults otherwise, then command-line overrides.
fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = if cli.config.exists() {
        AppConfig::from_file(&cli.config)
            .with_context(|| format!("Failed to load config from {:?}", cli.config))?
    } else {
        AppConfig::default()
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    Ok(config)
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli)?;

    init_tracing(&config.log_level, cli.json_logs);
    tracing::info!("Starting volley-graph v{}", env!("CARGO_PKG_VERSION"));

    let store = DocumentStore::open(StorageConfig::new(config.data_dir.clone()))
        .with_context(|| format!("Failed to open data directory {:?}", config.data_dir))?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;

            let addr = format!("{}:{}", config.server.host, config.server.port);
            let app = build_router(AppState::new(store, config));
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
        Commands::Players { all } => {
            let mut players: Vec<(f64, Player)> = store
                .find_where(|p: &Player| all || !p.retired)
                .await?
                .into_iter()
                .map(|p| (performance_index(&p.stats, p.main_position), p))
                .collect();
            players.sort_by(|a, b| b.0.total_cmp(&a.0));

            println!("\n=== Players ({}) ===", players.len());
            println!("{:<36}  {:<24}  {:<5}  {:>7}  {:>6}", "ID", "NAME", "POS", "MATCHES", "INDEX");
            for (index, p) in &players {
                println!(
                    "{:<36}  {:<24}  {:<5}  {:>7}  {:>6.1}",
                    p.id,
                    p.name,
                    p.main_position.code(),
                    p.stats.matches_played,
                    index
                );
            }
        }
        Commands::Stats { player_id, json } => {
            let id = parse_id(&player_id).map_err(|e| anyhow::anyhow!("{}", e))?;
            let player = store
                .find_by_id::<Player>(&id)
                .await?
                .with_context(|| format!("Player {} not found", id))?;
            let report = PlayerStatsReport::from_player(&player);

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            let s = &report.stats;
            println!("\n=== {} ({}) ===", report.player_name, report.position.label());
            println!("Matches played:       {}", player.stats.matches_played);
            println!("Performance index:    {:.1}", s.performance_index);
            println!("Reception efficiency: {:.3}", s.reception_efficiency);
            println!("Attack efficiency:    {:.3}", s.attack_efficiency);
            println!("Kill percentage:      {:.3}", s.kill_percentage);
            println!("Serve efficiency:     {:.3}", s.serve_efficiency);
            println!("Ace percentage:       {:.3}", s.ace_percentage);
            println!("Blocks per set:       {:.3}", s.blocks_per_set);
            println!("Dig efficiency:       {:.3}", s.dig_efficiency);
            println!("Consistency:          {:.1}", s.consistency_score);
            println!("Versatility:          {:.1}", s.versatility_score);
            println!("Conduct:              {:.1}", s.conduct_rating);
        }
    }

    Ok(())
}
