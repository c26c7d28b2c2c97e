//! CLI argument parsing for manifest, asset, and enrichment commands.
//!
//! The CLI is thin: each command loads its inputs, calls one core operation,
//! and prints the result as JSON so it can be piped into other tools.
use crate::assets::LATEST_VERSION;
use crate::config::SettingsOverrides;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "cdex",
    version,
    about = "Resolve data-dictionary assets and enrich dictionaries with CDE permissible values",
    after_help = "Examples:\n  cdex manifest\n  cdex assets --model CDS --version latest\n  cdex filters --model CDS\n  cdex codes --bindings cde-map.json\n  cdex enrich --dictionary dict.json --bindings cde-map.json --response cdes.json --out enriched.json\n  cdex session clear",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Settings shared by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Repository root serving `{tier}/cache/...`
    #[arg(long, global = true, value_name = "URL")]
    pub repo_root: Option<String>,

    /// Deployment tier (defaults to prod)
    #[arg(long, global = true, value_name = "TIER")]
    pub tier: Option<String>,

    /// Directory holding the session cache
    #[arg(long, global = true, value_name = "DIR")]
    pub session_dir: Option<PathBuf>,

    /// JSON settings file (repo_root, tier, session_dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Keep the session in memory for this invocation only
    #[arg(long, global = true)]
    pub no_session: bool,

    /// HTTP timeout in seconds
    #[arg(long, global = true, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// Emit debug logs on stderr
    #[arg(long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            repo_root: self.repo_root.clone(),
            tier: self.tier.clone(),
            session_dir: self.session_dir.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Manifest(ManifestArgs),
    Assets(AssetsArgs),
    /// Print the release notes for a model version (cached per session)
    ReleaseNotes(AssetsArgs),
    Filters(FiltersArgs),
    Codes(CodesArgs),
    Enrich(EnrichArgs),
    /// Print the resolved settings
    Settings,
    /// Manage the session cache
    #[command(subcommand)]
    Session(SessionCommand),
}

#[derive(Parser, Debug)]
#[command(about = "Print the content manifest (fetched once per session)")]
pub struct ManifestArgs {
    /// Print only model names with their current and known versions
    #[arg(long)]
    pub summary: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Resolve asset URLs (or release notes) for a model version")]
pub struct AssetsArgs {
    /// Model name as listed in content.json
    #[arg(long, value_name = "NAME")]
    pub model: String,

    /// Version to resolve; `latest` means the manifest's current version
    #[arg(long, value_name = "VERSION", default_value = LATEST_VERSION)]
    pub version: String,
}

#[derive(Parser, Debug)]
#[command(about = "Build facet filter containers and the option list")]
pub struct FiltersArgs {
    /// Use this model's navigator configuration from the manifest
    #[arg(long, value_name = "NAME", conflicts_with = "navigator_config")]
    pub model: Option<String>,

    /// Read the navigator configuration from a JSON file instead
    #[arg(long, value_name = "PATH", required_unless_present = "model")]
    pub navigator_config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(about = "List the CDE code/version pairs to request for a binding map")]
pub struct CodesArgs {
    /// Binding map JSON (`{"path;code.version": {CDECode, CDEVersion, CDEOrigin}}`)
    #[arg(long, value_name = "PATH")]
    pub bindings: PathBuf,
}

#[derive(Parser, Debug)]
#[command(about = "Enrich a dictionary with CDE permissible values")]
pub struct EnrichArgs {
    /// Dictionary JSON to enrich (never modified in place)
    #[arg(long, value_name = "PATH")]
    pub dictionary: PathBuf,

    /// Binding map JSON
    #[arg(long, value_name = "PATH")]
    pub bindings: PathBuf,

    /// Vocabulary service response JSON; omit when the query failed
    #[arg(long, value_name = "PATH")]
    pub response: Option<PathBuf>,

    /// Record that the vocabulary query returned an error
    #[arg(long)]
    pub response_error: bool,

    /// Output path for the enriched dictionary (stdout when omitted)
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Write the enrichment counters to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Drop every cached entry (ends the session)
    Clear,
}
