//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};

use crate::domain::NodeId;

/// Partial tree marking and lazy expansion for large hierarchies
#[derive(Parser, Debug)]
#[command(name = "marktree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug output (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Local config file (default: ./.marktree.toml)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mark the tree breadth-first and render it
    Render {
        #[command(flatten)]
        tree: TreeArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Tree)]
        format: OutputFormat,
    },

    /// List marked node ids in marking order
    Ids {
        #[command(flatten)]
        tree: TreeArgs,
    },

    /// Mark the tree and open the path down to a node
    Expose {
        /// Node to expose
        id: NodeId,

        #[command(flatten)]
        tree: TreeArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Tree)]
        format: OutputFormat,
    },

    /// List all descendant ids of a node (0 = whole hierarchy)
    Descendants {
        /// Node id
        id: NodeId,

        /// Hierarchy document or directory
        #[arg(short, long, value_hint = ValueHint::AnyPath)]
        source: Option<PathBuf>,

        /// Children strategy (default from config)
        #[arg(long)]
        children_method: Option<String>,
    },

    /// Print the title path from the top level down to a node
    Breadcrumbs {
        /// Node id
        id: NodeId,

        /// Hierarchy document or directory
        #[arg(short, long, value_hint = ValueHint::AnyPath)]
        source: Option<PathBuf>,

        /// Keep only the last N entries
        #[arg(long)]
        max_depth: Option<usize>,

        /// Separator between titles
        #[arg(long, default_value = " > ")]
        separator: String,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Options shared by the tree marking commands.
#[derive(Args, Debug, Clone, Default)]
pub struct TreeArgs {
    /// Hierarchy document (.toml/.json) or directory (default: hierarchy_file)
    #[arg(value_hint = ValueHint::AnyPath)]
    pub source: Option<PathBuf>,

    /// Start marking at this node instead of the virtual root
    #[arg(long)]
    pub root: Option<NodeId>,

    /// Soft cap on marked nodes (0 disables)
    #[arg(short, long)]
    pub threshold: Option<usize>,

    /// Child count above which a node is shown limited
    #[arg(long)]
    pub max_children: Option<usize>,

    /// Never limit nodes with many children
    #[arg(long)]
    pub no_limit: bool,

    /// Only mark children matching FIELD=VALUE or FIELD in V1,V2
    #[arg(long)]
    pub filter: Option<String>,

    /// Expand and open a marked node after the first pass (repeatable)
    #[arg(short, long = "expand")]
    pub expand: Vec<NodeId>,

    /// AllChildrenIncludingDeleted | AllChildren | Children
    #[arg(long)]
    pub children_method: Option<String>,

    /// numChildren | numHistoricalChildren
    #[arg(long)]
    pub count_method: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Indented terminal tree
    #[default]
    Tree,
    /// Nested JSON
    Json,
    /// Nested <ul>/<li> lists
    Html,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}
