pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::{DatabaseManager, PgUserStore};
use crate::logging::{Logger, TracingLogger};

#[derive(Parser)]
#[command(name = "starter")]
#[command(about = "Starter CLI - maintenance tasks for the user mirror")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Inspect and repair mirrored users")]
    Users {
        #[command(subcommand)]
        cmd: commands::users::UserCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Database and logger for one CLI invocation
pub struct CliContext {
    pub config: AppConfig,
    pub db: DatabaseManager,
    pub logger: Arc<dyn Logger>,
}

impl CliContext {
    pub async fn connect(config: AppConfig) -> anyhow::Result<Self> {
        let mut database = config.database.clone();
        // Migrations only run when asked for
        database.run_migrations = false;

        let db = DatabaseManager::connect(&database).await?;
        let logger: Arc<dyn Logger> = Arc::new(TracingLogger::new(config.is_development()));
        Ok(Self { config, db, logger })
    }

    pub fn store(&self) -> PgUserStore {
        PgUserStore::new(self.db.pool().clone(), self.logger.clone())
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let context = CliContext::connect(AppConfig::from_env()).await?;

    let result = match cli.command {
        Commands::Migrate => commands::migrate::handle(&context, output_format).await,
        Commands::Users { cmd } => commands::users::handle(cmd, &context, output_format).await,
    };

    context.db.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_defaults_to_text() {
        let cli = Cli::try_parse_from(["starter", "migrate"]).unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Text));

        let cli = Cli::try_parse_from(["starter", "users", "show", "u1", "--json"]).unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
    }

    #[test]
    fn text_flag_is_not_accepted() {
        assert!(Cli::try_parse_from(["starter", "--text", "migrate"]).is_err());
    }
}
