//! Command-line interface definition for madabank-net
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for session management and authenticated requests.

use clap::{Parser, Subcommand};

/// madabank-net - Authenticated API client
///
/// Log in, issue authenticated requests and inspect the stored session.
/// Expired access tokens are refreshed transparently.
#[derive(Parser, Debug, Clone)]
#[command(name = "madabank-net")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "MADABANK_CONFIG", default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Override the API base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for madabank-net
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Log in and store the issued token pair
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },

    /// Remove stored credentials
    Logout,

    /// Show whether credentials are stored
    Status,

    /// Exchange the stored refresh token for a new token pair
    Refresh,

    /// Send an authenticated GET request and print the JSON response
    Get {
        /// Path relative to the API base URL, e.g. `/users/profile`
        path: String,

        /// Query parameter as `key=value`; may be repeated
        #[arg(short, long = "query", value_parser = parse_key_value)]
        query: Vec<(String, String)>,
    },

    /// Send an authenticated POST request and print the JSON response
    Post {
        /// Path relative to the API base URL
        path: String,

        /// JSON request body
        #[arg(short, long)]
        data: Option<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            json_logs: false,
            base_url: None,
            command: Commands::Status,
        }
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{}`", raw))?;
    if key.is_empty() {
        return Err(format!("empty key in `{}`", raw));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default() {
        let cli = Cli::default();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(!cli.verbose);
        assert!(!cli.json_logs);
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn test_cli_parse_login() {
        let cli = Cli::try_parse_from([
            "madabank-net",
            "login",
            "--email",
            "a@b.c",
            "--password",
            "secret",
        ])
        .unwrap();
        if let Commands::Login { email, password } = cli.command {
            assert_eq!(email, "a@b.c");
            assert_eq!(password, "secret");
        } else {
            panic!("Expected Login command");
        }
    }

    #[test]
    fn test_cli_login_requires_password() {
        let cli = Cli::try_parse_from(["madabank-net", "login", "--email", "a@b.c"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_cli_parse_get_with_queries() {
        let cli = Cli::try_parse_from([
            "madabank-net",
            "get",
            "/transactions/history",
            "--query",
            "page=2",
            "-q",
            "limit=10",
        ])
        .unwrap();
        if let Commands::Get { path, query } = cli.command {
            assert_eq!(path, "/transactions/history");
            assert_eq!(
                query,
                vec![
                    ("page".to_string(), "2".to_string()),
                    ("limit".to_string(), "10".to_string())
                ]
            );
        } else {
            panic!("Expected Get command");
        }
    }

    #[test]
    fn test_cli_rejects_malformed_query() {
        let cli = Cli::try_parse_from(["madabank-net", "get", "/x", "--query", "novalue"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_cli_parse_post_with_data() {
        let cli = Cli::try_parse_from([
            "madabank-net",
            "post",
            "/transfers",
            "--data",
            r#"{"amount":10}"#,
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Post { ref data, .. } if data.as_deref() == Some(r#"{"amount":10}"#)
        ));
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::try_parse_from([
            "madabank-net",
            "--verbose",
            "--json-logs",
            "--base-url",
            "http://localhost:8080",
            "status",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(cli.json_logs);
        assert_eq!(cli.base_url.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn test_parse_key_value_keeps_equals_in_value() {
        assert_eq!(
            parse_key_value("filter=a=b").unwrap(),
            ("filter".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("=x").is_err());
    }
}
