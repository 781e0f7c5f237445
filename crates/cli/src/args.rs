//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// snipshelf - offline layer tooling
///
/// Builds the precache manifest into the worker, drives the worker lifecycle
/// against a deployment, and manages snippets pinned for offline viewing.
#[derive(Parser, Debug)]
#[command(name = "snipshelf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Deployment origin, overriding configuration
    #[arg(long, global = true, env = "SNIPSHELF_ORIGIN")]
    pub origin: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inject the precache manifest into the worker source
    Inject(InjectArgs),

    /// Drive the worker lifecycle against the deployment
    #[command(subcommand)]
    Worker(WorkerCommand),

    /// Manage snippets pinned for offline viewing
    #[command(subcommand)]
    Offline(OfflineCommand),

    /// Mirror a server mutation into the pinned copies
    #[command(subcommand)]
    Mirror(MirrorCommand),

    /// Show whether the worker would be registered
    Register,
}

/// Arguments for the inject command
#[derive(Parser, Debug)]
pub struct InjectArgs {
    /// Finalized build output directory
    #[arg(long, default_value = "dist")]
    pub dist: PathBuf,

    /// Worker source containing the manifest placeholder
    #[arg(long)]
    pub worker: PathBuf,

    /// Base path the build is deployed under
    #[arg(long, default_value = "/")]
    pub base: String,

    /// Also write the manifest as a JSON array
    #[arg(long)]
    pub manifest_out: Option<PathBuf>,
}

/// Shared worker arguments
#[derive(Parser, Debug)]
pub struct ManifestArg {
    /// Precache manifest: a JSON array of paths, or an emitted worker script
    #[arg(long, default_value = "dist/sw.js")]
    pub manifest: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum WorkerCommand {
    /// Populate the precache for the manifest's version
    Install(ManifestArg),

    /// Delete stale caches and take control
    Activate(ManifestArg),

    /// Answer one request the way the worker would
    Fetch(FetchArgs),

    /// List caches and their entry counts
    Caches,
}

/// Arguments for the worker fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub manifest: ManifestArg,

    /// Root-relative path to request
    pub path: String,

    /// Treat the request as a page navigation
    #[arg(long)]
    pub navigate: bool,

    /// Request destination
    #[arg(long, value_enum, default_value = "empty")]
    pub destination: DestinationArg,

    /// Print the response body
    #[arg(long)]
    pub body: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum DestinationArg {
    Document,
    Script,
    Style,
    Font,
    Image,
    Manifest,
    Empty,
}

#[derive(Subcommand, Debug)]
pub enum OfflineCommand {
    /// Save a snippet (JSON record) for offline viewing
    Save { record: String },

    /// List pinned snippets
    List,

    /// Show one pinned snippet
    Show { id: String },

    /// Apply a partial update (JSON with an id)
    Edit { patch: String },

    /// Remove a pinned snippet
    Remove { id: String },

    /// Remove every pinned snippet
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum MirrorCommand {
    /// Mirror a successful edit response (JSON)
    Edit { response: String },

    /// Mirror a server-side deletion
    Delete { id: String },

    /// Mirror an account deletion
    AccountDeleted,
}
