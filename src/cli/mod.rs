pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "crm")]
#[command(about = "Travel CRM admin CLI - migrations, API keys and health checks")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Issue, revoke and list API keys")]
    ApiKey {
        #[command(subcommand)]
        cmd: commands::api_key::ApiKeyCommands,
    },

    #[command(about = "Check a running server's /health endpoint")]
    Health {
        #[arg(long, help = "Base URL of the server (default: http://localhost:<CRM_API_PORT>)")]
        url: Option<String>,
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

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::ApiKey { cmd } => commands::api_key::handle(cmd, output_format).await,
        Commands::Health { url } => commands::health::handle(url, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_api_key_issue() {
        let cli = Cli::try_parse_from(["crm", "--json", "api-key", "issue", "--user-id", "7", "--label", "website"])
            .expect("parse");
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        match cli.command {
            Commands::ApiKey {
                cmd: commands::api_key::ApiKeyCommands::Issue { user_id, label },
            } => {
                assert_eq!(user_id, 7);
                assert_eq!(label.as_deref(), Some("website"));
            }
            _ => panic!("expected api-key issue"),
        }
    }

    #[test]
    fn health_url_is_optional() {
        let cli = Cli::try_parse_from(["crm", "health"]).expect("parse");
        assert!(matches!(cli.command, Commands::Health { url: None }));
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Text));
    }

    #[test]
    fn issue_requires_user_id() {
        assert!(Cli::try_parse_from(["crm", "api-key", "issue"]).is_err());
    }
}
