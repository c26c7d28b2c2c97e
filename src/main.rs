use anyhow::{Context, Result};
use clap::Parser;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod assets;
mod cde;
mod cli;
mod config;
mod filters;
mod manifest;
mod session;

use cli::{
    AssetsArgs, CodesArgs, Command, EnrichArgs, FiltersArgs, GlobalArgs, ManifestArgs, RootArgs,
    SessionCommand,
};
use config::Settings;
use filters::FilterConfig;
use manifest::{ContentManifest, HttpSource, ManifestCache};
use session::{FileSessionCache, MemorySessionCache, SessionCache};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.global.verbose);

    let settings = Settings::from_process(&args.global.overrides(), args.global.config.as_deref())?;
    tracing::debug!(
        repo_root = settings.repo_root(),
        tier = settings.tier(),
        session_dir = %settings.session_dir().display(),
        "settings resolved"
    );
    let session = open_session(&args.global, &settings);
    let source = HttpSource::new(Some(Duration::from_secs(args.global.timeout)));
    let manifests = ManifestCache::new(session.as_ref(), &source, &settings);

    match args.command {
        Command::Manifest(cmd) => cmd_manifest(&manifests, &cmd),
        Command::Assets(cmd) => cmd_assets(&manifests, &settings, &cmd),
        Command::ReleaseNotes(cmd) => cmd_release_notes(&manifests, &cmd),
        Command::Filters(cmd) => cmd_filters(&manifests, &cmd),
        Command::Codes(cmd) => cmd_codes(&cmd),
        Command::Enrich(cmd) => cmd_enrich(&cmd),
        Command::Settings => print_json(&settings),
        Command::Session(SessionCommand::Clear) => {
            session.clear()?;
            tracing::info!(dir = %settings.session_dir().display(), "session cleared");
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn open_session(global: &GlobalArgs, settings: &Settings) -> Box<dyn SessionCache> {
    if global.no_session {
        Box::new(MemorySessionCache::new())
    } else {
        Box::new(FileSessionCache::new(settings.session_dir().to_path_buf()))
    }
}

fn cmd_manifest(manifests: &ManifestCache<'_>, args: &ManifestArgs) -> Result<()> {
    let manifest = manifests.fetch_manifest()?;
    if args.summary {
        return print_json(&manifest_summary(&manifest));
    }
    print_json(&manifest)
}

#[derive(Serialize)]
struct ModelSummary<'a> {
    name: &'a str,
    current_version: &'a str,
    versions: &'a [String],
}

fn manifest_summary(manifest: &ContentManifest) -> Vec<ModelSummary<'_>> {
    manifest
        .models
        .iter()
        .map(|(name, assets)| ModelSummary {
            name,
            current_version: &assets.current_version,
            versions: &assets.versions,
        })
        .collect()
}

fn cmd_assets(manifests: &ManifestCache<'_>, settings: &Settings, args: &AssetsArgs) -> Result<()> {
    let manifest = manifests.fetch_manifest()?;
    let model = manifest.require_model(&args.model)?;
    if args.version != assets::LATEST_VERSION
        && !model.versions().is_empty()
        && !model.versions().contains(&args.version)
    {
        tracing::warn!(
            model = %args.model,
            version = %args.version,
            "requested version is not listed in the manifest"
        );
    }
    let urls = assets::build_asset_urls(Some(&model), &args.version, settings);
    print_json(&urls)
}

fn cmd_release_notes(manifests: &ManifestCache<'_>, args: &AssetsArgs) -> Result<()> {
    let manifest = manifests.fetch_manifest()?;
    let model = manifest.require_model(&args.model)?;
    let notes = manifests.fetch_release_notes(&model, &args.version)?;
    println!("{notes}");
    Ok(())
}

fn cmd_filters(manifests: &ManifestCache<'_>, args: &FiltersArgs) -> Result<()> {
    let navigator_config: Option<Value> = match (&args.navigator_config, &args.model) {
        (Some(path), _) => Some(read_json(path)?),
        (None, Some(name)) => manifests
            .fetch_manifest()?
            .require_model(name)?
            .assets
            .and_then(|assets| assets.model_navigator_config),
        (None, None) => None,
    };
    print_json(&FilterConfig::from_navigator_config(
        navigator_config.as_ref(),
    ))
}

fn cmd_codes(args: &CodesArgs) -> Result<()> {
    let raw: Value = read_json(&args.bindings)?;
    let bindings = cde::parse_binding_map(&raw);
    let codes: Vec<cde::CodeVersion> = cde::requested_codes(&bindings);
    print_json(&codes)
}

fn cmd_enrich(args: &EnrichArgs) -> Result<()> {
    let dictionary: Value = read_json(&args.dictionary)?;
    let raw_bindings: Value = read_json(&args.bindings)?;
    let bindings = cde::parse_binding_map(&raw_bindings);
    let response = match &args.response {
        Some(path) => cde::parse_descriptors(&read_json(path)?),
        None => Vec::new(),
    };
    let response_was_error = args.response_error || args.response.is_none();

    let enriched = cde::update_enums(&dictionary, &bindings, &response, response_was_error);

    match &args.out {
        Some(out) => {
            write_json(out, &enriched.dictionary)?;
            tracing::info!(path = %out.display(), "wrote enriched dictionary");
        }
        None => print_json(&enriched.dictionary)?,
    }
    if let Some(report) = &args.report {
        write_json(report, &enriched.report)?;
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize output JSON")?;
    println!("{json}");
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize output JSON")?;
    std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value = serde_json::from_str(&content)
        .with_context(|| format!("parse JSON {}", path.display()))?;
    Ok(value)
}
