//! tagvfs command-line interface
//!
//! Every command takes a query path, the same path a filesystem bridge
//! would see:
//!
//! ```text
//! tagvfs add /tags/holiday/2020/=/beach.jpg ./beach.jpg
//! tagvfs ls  /tags/holiday/@/=
//! tagvfs mkdir /relations/holiday/includes/trip
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tagvfs::config::default_config_path;
use tagvfs::Config;
use tagvfs_logging::LogConfig;

mod cli;

#[derive(Parser, Debug)]
#[command(
    name = "tagvfs",
    version,
    about = "Tag-based object store addressed by query paths"
)]
struct Cli {
    /// Config file (default: $TAGVFS_HOME/tagvfs.toml)
    #[arg(long, global = true, env = "TAGVFS_CONFIG")]
    config: Option<PathBuf>,

    /// Log info-level events to stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the repository and write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Config {
        #[arg(long)]
        json: bool,
    },

    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
        #[arg(long)]
        json: bool,
    },

    /// Show the parsed and reasoned form of a query path, and its objects
    Resolve {
        path: String,
        #[arg(long)]
        json: bool,
    },

    /// Store a local file as an object at a taggable path
    Add {
        /// Destination, e.g. /tags/a/b/=/name.txt or /archive/name.txt
        path: String,
        /// File whose content is copied into the object
        file: PathBuf,
    },

    /// Print an object's content (or a /stats counter)
    Cat { path: String },

    /// Remove an object from a tag context, or erase it under /archive
    Rm { path: String },

    /// Create a tag or a relation
    Mkdir { path: String },

    /// Delete a tag or a relation
    Rmdir { path: String },

    /// Tags carried by an object
    Tags {
        path: String,
        #[arg(long)]
        json: bool,
    },

    /// Run deduplication for one object or the whole archive
    Dedup {
        /// Inode to deduplicate
        #[arg(required_unless_present = "all")]
        inode: Option<i64>,
        /// Deduplicate every object
        #[arg(long, conflicts_with = "inode")]
        all: bool,
        #[arg(long)]
        json: bool,
    },

    /// Store counters
    Stats {
        #[arg(long)]
        json: bool,
    },
}

fn command_wants_json(cmd: &Commands) -> bool {
    match cmd {
        Commands::Config { json }
        | Commands::Ls { json, .. }
        | Commands::Resolve { json, .. }
        | Commands::Tags { json, .. }
        | Commands::Dedup { json, .. }
        | Commands::Stats { json } => *json,
        _ => false,
    }
}

fn run_command(command: Commands, config: Config, config_path: PathBuf) -> Result<()> {
    match command {
        Commands::Init { force } => cli::admin::init(&config, &config_path, force),
        Commands::Config { json } => cli::admin::show_config(&config, &config_path, json),
        Commands::Stats { json } => cli::admin::stats(config, json),
        Commands::Dedup { inode, all, json } => cli::admin::dedup(
            config,
            cli::admin::DedupArgs { inode, all, json },
        ),
        Commands::Ls { path, json } => cli::objects::ls(config, &path, json),
        Commands::Resolve { path, json } => cli::objects::resolve(config, &path, json),
        Commands::Add { path, file } => cli::objects::add(config, &path, &file),
        Commands::Cat { path } => cli::objects::cat(config, &path),
        Commands::Rm { path } => cli::objects::rm(config, &path),
        Commands::Mkdir { path } => cli::tags::mkdir(config, &path),
        Commands::Rmdir { path } => cli::tags::rmdir(config, &path),
        Commands::Tags { path, json } => cli::tags::show(config, &path, json),
    }
}

fn load_config(path: &Path) -> Result<Config> {
    Config::load_or_default(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json_mode = command_wants_json(&cli.command);
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{:?}", err);
            return ExitCode::from(1);
        }
    };

    if let Err(err) = tagvfs_logging::init_logging(LogConfig {
        app_name: "tagvfs",
        log_dir: config.logs_dir(),
        verbose: cli.verbose || config.log.verbose,
    }) {
        eprintln!("Warning: failed to initialize logging: {:#}", err);
    }

    match run_command(cli.command, config, config_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if json_mode {
                cli::error::print_json_error(&err);
            } else {
                eprintln!("{:?}", err);
            }
            ExitCode::from(1)
        }
    }
}
