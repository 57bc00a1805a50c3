mod config;
mod plan_cmds;
mod serve_cmd;
#[cfg(test)]
mod test_util;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use fitplan_core::llm::{ChatCompletionClient, ChatModel, ModelError};
use fitplan_db::config::DbConfig;
use fitplan_db::pool;

use config::FitplanConfig;

#[derive(Parser)]
#[command(name = "fitplan", about = "AI-generated workout and diet plans")]
struct Cli {
    /// Database URL (overrides FITPLAN_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a fitplan config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = DbConfig::DEFAULT_URL)]
        db_url: String,
        /// API key for the model provider
        #[arg(long)]
        api_key: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the database if needed and apply migrations
    DbInit,
    /// Run the HTTP API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 3000)]
        port: u16,
        /// Apply pending migrations before serving
        #[arg(long)]
        migrate: bool,
    },
    /// Regenerate workout and diet plans for a user
    Generate {
        /// User ID (UUID)
        user_id: String,
    },
    /// Show a user's profile, plans and latest progress
    Show {
        /// User ID (UUID)
        user_id: String,
    },
}

/// Execute the `fitplan init` command: write config file.
fn cmd_init(db_url: &str, api_key: Option<String>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let has_key = api_key.is_some();
    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
            max_connections: None,
        },
        llm: config::LlmSection {
            api_key,
            ..config::LlmSection::default()
        },
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    if has_key {
        println!("  llm.api_key  = (set)");
    } else {
        println!("  llm.api_key  = (unset; set FITPLAN_LLM_API_KEY or edit the file)");
    }
    println!();
    println!("Next: run `fitplan db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `fitplan db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = FitplanConfig::resolve(cli_db_url)?;

    println!("Initializing fitplan database...");

    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("fitplan db-init complete.");
    Ok(())
}

/// Execute the `fitplan serve` command.
async fn cmd_serve(
    cli_db_url: Option<&str>,
    bind: &str,
    port: u16,
    migrate: bool,
) -> anyhow::Result<()> {
    let resolved = FitplanConfig::resolve(cli_db_url)?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    if migrate {
        pool::run_migrations(&db_pool).await?;
    }

    let model: Option<Arc<dyn ChatModel>> = match ChatCompletionClient::new(&resolved.llm_config) {
        Ok(client) => Some(Arc::new(client)),
        Err(ModelError::MissingApiKey) => {
            tracing::warn!("no model API key configured; plan generation will fail");
            None
        }
        Err(e) => {
            db_pool.close().await;
            return Err(e.into());
        }
    };

    let state = serve_cmd::AppState {
        pool: db_pool.clone(),
        model,
    };
    let result = serve_cmd::run_serve(state, bind, port).await;
    db_pool.close().await;
    result
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            db_url,
            api_key,
            force,
        } => {
            cmd_init(&db_url, api_key, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Serve {
            bind,
            port,
            migrate,
        } => {
            cmd_serve(cli.database_url.as_deref(), &bind, port, migrate).await?;
        }
        Commands::Generate { user_id } => {
            let resolved = FitplanConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = plan_cmds::run_generate(&db_pool, &resolved.llm_config, &user_id).await;
            db_pool.close().await;
            result?;
        }
        Commands::Show { user_id } => {
            let resolved = FitplanConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = plan_cmds::run_show(&db_pool, &user_id).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}
