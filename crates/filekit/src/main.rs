//! Filekit CLI
//!
//! Command line access to the file service over the local platform.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use filekit::config::{default_config_path, Config};
use filekit::{
    DirEntry, DirectorySource, DownloadOptions, Entry, FileService, FileSource, LocalPlatform,
    UploadMethod, UploadOptions,
};
use tracing_subscriber::EnvFilter;

/// Filekit - fetch, store and move files under a sandboxed root.
#[derive(Parser, Debug)]
#[command(name = "filekit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Get or create a directory
    Mkdir {
        /// Directory path
        path: String,

        /// Create missing parent directories
        #[arg(long, short)]
        recursive: bool,
    },

    /// List a directory
    Ls {
        /// Directory path
        path: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Check whether a file exists
    Exists {
        /// File path or URL
        path: String,
    },

    /// Download a URL into a directory
    Download {
        /// Source URL
        url: String,

        /// Target directory
        path: String,

        /// File name (defaults to the name at the end of the URL)
        #[arg(long, short)]
        name: Option<String>,

        /// Retries after the first failed try
        #[arg(long, short)]
        attempts: Option<u32>,

        /// Extra request header (NAME=VALUE), may be repeated
        #[arg(long = "header", short = 'H', value_parser = parse_key_value)]
        headers: Vec<(String, String)>,
    },

    /// Upload a file to a server
    Upload {
        /// Local file path or URL
        path: String,

        /// Server URL
        url: String,

        /// File name sent to the server
        name: String,

        /// MIME type (inferred when omitted)
        #[arg(long)]
        mime: Option<String>,

        /// Form field name for the file
        #[arg(long, default_value = "file")]
        file_key: String,

        /// Extra form field (NAME=VALUE), may be repeated
        #[arg(long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,

        /// Extra request header (NAME=VALUE), may be repeated
        #[arg(long = "header", short = 'H', value_parser = parse_key_value)]
        headers: Vec<(String, String)>,

        /// Use PUT instead of POST
        #[arg(long)]
        put: bool,

        /// Accept any TLS certificate
        #[arg(long)]
        trust_all: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Copy a file into a directory
    Cp {
        /// Source file
        from: String,

        /// Destination directory
        to: String,

        /// New file name
        #[arg(long, short)]
        name: Option<String>,
    },

    /// Move a file into a directory
    Mv {
        /// Source file
        from: String,

        /// Destination directory
        to: String,

        /// New file name
        #[arg(long, short)]
        name: Option<String>,
    },

    /// Show the MIME type of a file
    Mime {
        /// File path or URL
        path: String,

        /// Only use the type reported by the platform
        #[arg(long)]
        no_guess: bool,
    },

    /// Show or guess the extension of a file
    Ext {
        /// File path or URL
        path: String,

        /// Guess the extension from the file's MIME type
        #[arg(long)]
        guess: bool,

        /// Include the leading dot
        #[arg(long)]
        dot: bool,
    },

    /// Print the cache directory for an order
    CacheDir {
        /// Order identifier
        order_id: String,
    },

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected NAME=VALUE, got {:?}", s))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = Config::load(&config_path)?;
    config.apply_env_overrides();

    // Initialize tracing
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.log_level.to_lowercase()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Using config file: {:?}", config_path);

    if let Commands::Config(command) = &cli.command {
        return run_config_command(command, &config, &config_path);
    }

    config.validate()?;

    let service = FileService::new(LocalPlatform::from_config(&config))
        .with_default_attempts(config.transfer.attempts);
    service
        .request_file_system(Some(config.storage.kind), None)
        .await?;

    match cli.command {
        Commands::Mkdir { path, recursive } => {
            let dir = if recursive {
                service.get_directory_recursive(&path, None).await?
            } else {
                service.get_directory(&path, None).await?
            };
            println!("{}", dir.full_path());
        }
        Commands::Ls { path, json } => {
            let entries = service
                .get_files_in_directory(DirectorySource::Path(path))
                .await?;

            if json {
                let listing: Vec<serde_json::Value> = entries
                    .iter()
                    .map(|entry| {
                        serde_json::json!({
                            "name": entry.name(),
                            "path": entry.full_path(),
                            "directory": entry.is_directory(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                for entry in &entries {
                    match entry {
                        DirEntry::Directory(dir) => println!("{}/", dir.name()),
                        DirEntry::File(file) => println!("{}", file.name()),
                    }
                }
            }
        }
        Commands::Exists { path } => {
            let exists = service.file_exists(&path).await;
            println!("{}", exists);
            if !exists {
                std::process::exit(1);
            }
        }
        Commands::Download {
            url,
            path,
            name,
            attempts,
            headers,
        } => {
            let options = DownloadOptions {
                headers: headers.into_iter().collect(),
            };
            let file = service
                .download_file(&url, &path, name.as_deref(), Some(&options), attempts)
                .await?;
            println!("{}", file.full_path());
        }
        Commands::Upload {
            path,
            url,
            name,
            mime,
            file_key,
            params,
            headers,
            put,
            trust_all,
            json,
        } => {
            let options = UploadOptions {
                file_key,
                mime_type: mime,
                params: params.into_iter().collect::<HashMap<_, _>>(),
                headers: headers.into_iter().collect::<HashMap<_, _>>(),
                method: if put {
                    UploadMethod::Put
                } else {
                    UploadMethod::Post
                },
                ..UploadOptions::default()
            };
            let result = service
                .upload_file(&path, &url, &name, Some(options), trust_all)
                .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!(
                    "Uploaded {} bytes (HTTP {})",
                    result.bytes_sent, result.response_code
                );
            }
        }
        Commands::Cp { from, to, name } => {
            let file = service.copy_file(&from, &to, name.as_deref()).await?;
            println!("{}", file.full_path());
        }
        Commands::Mv { from, to, name } => {
            let file = service.move_file(&from, &to, name.as_deref()).await?;
            println!("{}", file.full_path());
        }
        Commands::Mime { path, no_guess } => {
            let mime = service
                .get_file_mime_type(FileSource::Path(path), no_guess)
                .await;
            println!("{}", mime);
        }
        Commands::Ext { path, guess, dot } => {
            let ext = if guess {
                service
                    .guess_file_extension(FileSource::Path(path), dot)
                    .await
            } else {
                let name = service.get_file_name(&FileSource::Path(path));
                service.get_file_extension(&name, false, dot)
            };
            println!("{}", ext);
        }
        Commands::CacheDir { order_id } => {
            println!("{}", service.get_cache_dir(&order_id));
        }
        // Handled before the service is created
        Commands::Config(_) => {}
    }

    Ok(())
}

fn run_config_command(
    command: &ConfigCommands,
    config: &Config,
    path: &std::path::Path,
) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => {
            print!("{}", config.to_toml()?);
        }
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {} (use --force to overwrite)",
                    path.display()
                );
            }
            Config::default().save(path)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }
    Ok(())
}
