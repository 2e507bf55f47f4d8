use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "shelf")]
#[command(about = "Keep a local product catalog in sync with its remote collection")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create or replace a product in the local store
    #[command(alias = "new")]
    Add(AddArgs),
    /// List recently updated local products
    List {
        /// Number of products to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reconcile the local store with the remote collection
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
    /// Manage the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
pub struct AddArgs {
    /// Display name
    #[arg(long)]
    pub name: String,
    /// Existing key to overwrite (a new key is generated when omitted)
    #[arg(long)]
    pub key: Option<String>,
    #[arg(long, default_value = "")]
    pub category: String,
    #[arg(long, default_value = "")]
    pub sub_category: String,
    /// Storefront URL
    #[arg(long, value_name = "URL")]
    pub link: Option<String>,
    #[arg(long, default_value_t = 0)]
    pub likes: u64,
    #[arg(long, default_value_t = 0)]
    pub comments: u64,
    #[arg(long, default_value_t = 0)]
    pub supplier_orders: u64,
    /// Rating between 0 and 5
    #[arg(long, default_value_t = 0.0)]
    pub rating: f64,
    #[arg(long, default_value_t = 0.0)]
    pub supplier_price: f64,
    #[arg(long, default_value_t = 0.0)]
    pub store_price: f64,
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Push local products to the remote collection
    Push {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Pull remote products into the local store
    Pull {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Push, then pull
    Both {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recent sync runs
    History {
        /// Number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recently resolved sync conflicts
    Conflicts {
        /// Number of conflicts to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create or update the config file
    Init {
        /// Document API root, e.g. an emulator at http://localhost:8080/v1
        #[arg(long, value_name = "URL")]
        remote_url: Option<String>,
        /// Remote project id
        #[arg(long, value_name = "ID")]
        project_id: Option<String>,
        /// Remote database id
        #[arg(long, value_name = "ID")]
        database: Option<String>,
        /// Remote collection holding product documents
        #[arg(long, value_name = "NAME")]
        collection: Option<String>,
        /// Bearer token sent with remote requests
        #[arg(long, value_name = "TOKEN")]
        auth_token: Option<String>,
        /// Local database file to store in the config
        #[arg(long, value_name = "PATH")]
        local_db_path: Option<PathBuf>,
        /// Records reconciled at once
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Print the effective configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
