//! Command-line interface.
//!
//! Without a subcommand the binary starts the server. Subcommands talk to a
//! running server over HTTP, except `config check` and `db` which work on
//! local files:
//! - `status` - Show server health and address coverage
//! - `sync [--user <id>]` - Run the address sync (all users or one)
//! - `config check` - Validate configuration file
//! - `db hash-passwords` - Hash any plaintext passwords left in the users table

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::sync::{SyncStats, SyncStatus};

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "slt-broadband")]
#[command(author, version, about = "Broadband qualification and customer address sync service", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "slt-broadband.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// API URL to connect to
    #[arg(long, env = "SLT_API_URL", default_value = "http://localhost:5000")]
    pub api_url: String,

    /// Admin token (can also be set via SLT_TOKEN env var)
    #[arg(long, env = "SLT_TOKEN")]
    pub token: Option<String>,

    /// Subcommand to run (if none, starts the server)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show server health and address coverage
    Status,

    /// Copy qualification locations onto user records
    Sync {
        /// Sync a single user from the newest qualification with a location
        #[arg(long)]
        user: Option<String>,
    },

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

/// Database subcommands
#[derive(Subcommand, Debug)]
pub enum DbCommands {
    /// Replace plaintext passwords with argon2 hashes
    HashPasswords {
        /// Write the hashes (without this flag, just lists affected users)
        #[arg(long)]
        execute: bool,
    },
}

#[derive(Debug, Deserialize)]
struct SyncRunResponse {
    message: String,
    stats: SyncStats,
}

#[derive(Debug, Deserialize)]
struct SyncUserResponse {
    message: String,
    user: SyncedUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncedUser {
    id: String,
    email: String,
    address: Option<crate::db::Address>,
}

/// Create an HTTP client with the given token
fn create_client(token: Option<&str>) -> Result<Client> {
    let mut headers = reqwest::header::HeaderMap::new();
    if let Some(token) = token {
        headers.insert(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {}", token)
                .parse()
                .context("Invalid token format")?,
        );
    }

    Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")
}

/// Run a CLI command
pub async fn run_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Some(Commands::Status) => cmd_status(cli).await,
        Some(Commands::Sync { user: None }) => cmd_sync_all(cli).await,
        Some(Commands::Sync { user: Some(id) }) => cmd_sync_user(cli, id).await,
        Some(Commands::Config(ConfigCommands::Check)) => cmd_config_check(cli).await,
        Some(Commands::Db(DbCommands::HashPasswords { execute })) => {
            cmd_hash_passwords(cli, *execute).await
        }
        None => {
            // No subcommand means start the server - this is handled in main.rs
            Ok(())
        }
    }
}

/// Turn a non-success response into an error, with a hint for 401s.
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::UNAUTHORIZED {
        anyhow::bail!(
            "Authentication required. Use --token or set SLT_TOKEN environment variable."
        );
    }
    let body = response.text().await.unwrap_or_default();
    anyhow::bail!("Server returned error {}: {}", status, body);
}

/// Display server status
async fn cmd_status(cli: &Cli) -> Result<()> {
    let client = create_client(cli.token.as_deref())?;
    let base_url = &cli.api_url;

    println!("Connecting to {}...", base_url);

    let healthy = match client.get(format!("{}/health", base_url)).send().await {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    };
    if !healthy {
        anyhow::bail!("Server at {} is not responding. Is it running?", base_url);
    }

    let response = client
        .get(format!("{}/api/sync-addresses/status", base_url))
        .send()
        .await
        .context("Failed to fetch sync status")?;
    let status: SyncStatus = check_response(response)
        .await?
        .json()
        .await
        .context("Failed to parse status response")?;

    println!();
    println!("=== Server Status ===");
    println!();
    println!("Health:     [OK] Healthy");
    println!();
    println!("Address coverage:");
    println!("  Users:                 {}", status.total_users);
    println!("  With address:          {}", status.users_with_address);
    println!("  Without address:       {}", status.users_without_address);
    println!("  Coverage:              {}", status.sync_percentage);
    println!(
        "  Located qualifications: {}",
        status.qualifications_with_location
    );
    println!();
    Ok(())
}

/// Run the batch sync
async fn cmd_sync_all(cli: &Cli) -> Result<()> {
    let client = create_client(cli.token.as_deref())?;

    let response = client
        .post(format!("{}/api/sync-addresses", cli.api_url))
        .send()
        .await
        .context("Failed to connect to server")?;
    let body: SyncRunResponse = check_response(response)
        .await?
        .json()
        .await
        .context("Failed to parse sync response")?;

    println!("{}", body.message);
    println!();
    println!("  Processed:    {}", body.stats.total_qualifications);
    println!("  Synced:       {}", body.stats.synced_count);
    println!("  Errors:       {}", body.stats.error_count);
    println!("  Success rate: {}", body.stats.success_rate);
    Ok(())
}

/// Sync one user
async fn cmd_sync_user(cli: &Cli, user_id: &str) -> Result<()> {
    let client = create_client(cli.token.as_deref())?;

    let response = client
        .post(format!("{}/api/sync-addresses/user/{}", cli.api_url, user_id))
        .send()
        .await
        .context("Failed to connect to server")?;
    let body: SyncUserResponse = check_response(response)
        .await?
        .json()
        .await
        .context("Failed to parse sync response")?;

    println!("{}", body.message);
    println!();
    println!("  User:    {} ({})", body.user.email, body.user.id);
    if let Some(address) = body.user.address {
        println!("  Street:  {}", address.street);
        println!("  City:    {}", address.city);
        println!("  District: {}", address.district);
        println!("  Province: {}", address.province);
        if !address.postal_code.is_empty() {
            println!("  Postal:  {}", address.postal_code);
        }
    }
    Ok(())
}

async fn cmd_config_check(cli: &Cli) -> Result<()> {
    use crate::config::Config;

    let config_path = &cli.config;

    println!("Checking configuration file: {}", config_path.display());
    println!();

    if !config_path.exists() {
        println!(
            "[!!] Configuration file not found: {}",
            config_path.display()
        );
        println!();
        println!("A default configuration will be used when starting the server.");
        return Ok(());
    }

    match Config::load(config_path) {
        Ok(config) => {
            println!("[OK] Configuration file is valid!");
            println!();
            println!("=== Configuration Summary ===");
            println!();
            println!("Server:");
            println!("  Host:         {}", config.server.host);
            println!("  API Port:     {}", config.server.api_port);
            println!("  Data Dir:     {}", config.server.data_dir.display());
            println!("  Database:     {}", config.database_path().display());
            println!();
            println!("Sync:");
            println!("  Batch Limit:  {}", config.sync.batch_limit);
            println!();
            println!("Logging:");
            println!("  Level:        {}", config.logging.level);
            println!();

            let token_configured = std::fs::read_to_string(config_path)
                .map(|c| c.contains("admin_token"))
                .unwrap_or(false);
            if !token_configured {
                println!("Warnings:");
                println!(
                    "  [!] No admin_token configured - a random token is generated on each start"
                );
                println!();
            }

            Ok(())
        }
        Err(e) => {
            println!("[!!] Configuration file is invalid!");
            println!();
            println!("Error: {}", e);
            println!();
            println!("Please check the configuration file syntax and try again.");
            anyhow::bail!("Invalid configuration file");
        }
    }
}

/// Users whose stored password is not a complete argon2 hash
fn users_needing_hash(users: Vec<crate::db::User>) -> Vec<crate::db::User> {
    use crate::api::auth::is_password_hashed;

    users
        .into_iter()
        .filter(|u| !is_password_hashed(&u.password_hash))
        .collect()
}

/// Hash plaintext passwords stored by older account flows
async fn cmd_hash_passwords(cli: &Cli, execute: bool) -> Result<()> {
    use crate::api::auth::hash_password;
    use crate::config::Config;
    use crate::db::{self, User};

    let config = Config::load(&cli.config)?;
    let db_path = config.database_path();
    if !db_path.exists() {
        anyhow::bail!("Database not found at {}", db_path.display());
    }

    let pool = db::init(&db_path).await?;

    println!();
    println!("=== Password Hashing Tool ===");
    println!();

    if !execute {
        println!("[DRY RUN] Showing affected users. Use --execute to write hashes.");
        println!();
    }

    let users = users_needing_hash(User::list_all(&pool).await?);
    if users.is_empty() {
        println!("All passwords are already hashed.");
        db::close(&pool).await;
        return Ok(());
    }

    for user in &users {
        if execute {
            let hash = hash_password(&user.password_hash)
                .map_err(|e| anyhow::anyhow!("Failed to hash password for {}: {}", user.email, e))?;
            User::update_password_hash(&pool, &user.id, &hash).await?;
            println!("  [OK] {}", user.email);
        } else {
            println!("  [ ] {}", user.email);
        }
    }

    println!();
    if execute {
        println!("Hashed {} password(s).", users.len());
    } else {
        println!("{} password(s) would be hashed.", users.len());
    }

    db::close(&pool).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::hash_password;
    use crate::db::User;

    fn user(email: &str, password_hash: &str) -> User {
        User {
            id: email.to_string(),
            email: email.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            phone_number: String::new(),
            password_hash: password_hash.to_string(),
            status: "active".to_string(),
            street: None,
            city: None,
            district: None,
            province: None,
            postal_code: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_users_needing_hash() {
        let hashed = hash_password("s3cure-pass").unwrap();
        let users = vec![
            user("plain@example.lk", "hunter2"),
            user("hashed@example.lk", &hashed),
            user("truncated@example.lk", "$argon2id$garbage"),
        ];

        let emails: Vec<_> = users_needing_hash(users)
            .into_iter()
            .map(|u| u.email)
            .collect();
        assert_eq!(emails, vec!["plain@example.lk", "truncated@example.lk"]);
    }

    #[test]
    fn test_parse_sync_subcommand() {
        let cli = Cli::try_parse_from(["slt-broadband", "sync", "--user", "u-1"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Sync { user: Some(ref id) }) if id == "u-1"
        ));
    }
}
