use clap::Subcommand;
use serde_json::json;

use crate::auth::{generate_api_key, key_fingerprint};
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::{service, DatabaseManager};

#[derive(Subcommand)]
pub enum ApiKeyCommands {
    #[command(about = "Issue a new API key for a user")]
    Issue {
        #[arg(long, help = "User (tenant) the key belongs to")]
        user_id: i64,

        #[arg(long, help = "Free-form label, e.g. the website using the key")]
        label: Option<String>,
    },

    #[command(about = "Revoke an API key")]
    Revoke {
        #[arg(help = "The full key value")]
        key: String,
    },

    #[command(about = "List a user's API keys")]
    List {
        #[arg(long, help = "User (tenant) to list keys for")]
        user_id: i64,
    },
}

pub async fn handle(cmd: ApiKeyCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect().await?;

    match cmd {
        ApiKeyCommands::Issue { user_id, label } => {
            if service::find_user(&pool, user_id).await?.is_none() {
                output_error(&output_format, &format!("User {} not found", user_id), Some("USER_NOT_FOUND"))?;
                anyhow::bail!("user {} not found", user_id);
            }

            let key_value = generate_api_key();
            let key = service::insert_api_key(&pool, user_id, &key_value, label.as_deref()).await?;
            tracing::info!(user_id, fingerprint = %key_fingerprint(&key_value), "issued API key");

            match output_format {
                OutputFormat::Json => output_success(
                    &output_format,
                    "API key issued",
                    Some(json!({
                        "id": key.id,
                        "user_id": key.user_id,
                        "label": key.label,
                        "api_key": key_value,
                    })),
                ),
                OutputFormat::Text => {
                    println!("✓ API key issued for user {}", user_id);
                    println!("{}", key_value);
                    println!("Store it now; it is not shown again.");
                    Ok(())
                }
            }
        }

        ApiKeyCommands::Revoke { key } => {
            if service::revoke_api_key(&pool, &key).await? {
                output_success(
                    &output_format,
                    "API key revoked",
                    Some(json!({ "fingerprint": key_fingerprint(&key) })),
                )
            } else {
                output_error(&output_format, "Unknown or already revoked API key", Some("KEY_NOT_FOUND"))?;
                anyhow::bail!("unknown or already revoked API key");
            }
        }

        ApiKeyCommands::List { user_id } => {
            let keys = service::list_api_keys(&pool, user_id).await?;
            if keys.is_empty() {
                return output_empty_collection(&output_format, "api_keys", "No API keys for this user");
            }

            match output_format {
                OutputFormat::Json => {
                    let items: Vec<_> = keys
                        .iter()
                        .map(|k| {
                            json!({
                                "id": k.id,
                                "fingerprint": key_fingerprint(&k.key_value),
                                "label": k.label,
                                "active": k.is_usable(),
                                "created_at": k.created_at,
                                "revoked_at": k.revoked_at,
                            })
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&json!({ "api_keys": items }))?);
                }
                OutputFormat::Text => {
                    println!("{:<8} {:<14} {:<8} {:<26} LABEL", "ID", "FINGERPRINT", "ACTIVE", "CREATED");
                    for k in &keys {
                        println!(
                            "{:<8} {:<14} {:<8} {:<26} {}",
                            k.id,
                            key_fingerprint(&k.key_value),
                            if k.is_usable() { "yes" } else { "no" },
                            k.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                            k.label.as_deref().unwrap_or("-"),
                        );
                    }
                }
            }
            Ok(())
        }
    }
}
