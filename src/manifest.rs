//! Content manifest types and the fetch-once-per-session accessor.
//!
//! `content.json` maps each model name to the filenames and versions that
//! are published for it. The manifest is fetched at most once per session;
//! only a body that parses completely is ever written to the session cache.
use crate::assets::{build_asset_urls, resolve_version};
use crate::config::Settings;
use crate::session::{SessionCache, MANIFEST_KEY, RELEASE_NOTES_KEY};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// How often a cancellable fetch re-checks its cancel flag.
const CANCEL_POLL: Duration = Duration::from_millis(25);

/// Per-model entry of `content.json`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ManifestAssets {
    pub model_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loading_file: Option<String>,
    pub current_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<String>,
    #[serde(default)]
    pub versions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_navigator_logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_navigator_config: Option<Value>,
}

/// Parsed `content.json`: model name to published assets.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct ContentManifest {
    pub models: BTreeMap<String, ManifestAssets>,
}

/// A model name paired with its manifest entry, as handed to asset resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelEntry {
    pub name: String,
    pub assets: Option<ManifestAssets>,
}

impl ModelEntry {
    /// Versions known for the model, in published order.
    pub fn versions(&self) -> &[String] {
        self.assets
            .as_ref()
            .map(|assets| assets.versions.as_slice())
            .unwrap_or_default()
    }
}

impl ContentManifest {
    pub fn model(&self, name: &str) -> Option<ModelEntry> {
        self.models.get(name).map(|assets| ModelEntry {
            name: name.to_string(),
            assets: Some(assets.clone()),
        })
    }

    /// Like [`ContentManifest::model`], but a missing entry is a typed error.
    pub fn require_model(&self, name: &str) -> Result<ModelEntry, ManifestError> {
        self.model(name)
            .ok_or_else(|| ManifestError::UnknownModel(name.to_string()))
    }
}

/// The single hard-failure surface of manifest access.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// Network failure or a body that does not parse as a manifest.
    #[error("content manifest is unavailable")]
    Unavailable,
    /// The caller aborted before the session cache was populated.
    #[error("content manifest fetch was cancelled")]
    Cancelled,
    #[error("model {0:?} is not listed in the content manifest")]
    UnknownModel(String),
    #[error("release notes for {model} {version} are unavailable")]
    ReleaseNotesUnavailable { model: String, version: String },
}

/// Transport used to GET a text body.
pub trait ManifestSource {
    fn fetch_text(&self, url: &str) -> Result<String>;

    /// GET that gives up once `cancel` is raised, returning `Ok(None)`.
    ///
    /// The default only checks before the request; transports that can
    /// abandon a request in flight override it.
    fn fetch_text_cancellable(&self, url: &str, cancel: &AtomicBool) -> Result<Option<String>> {
        if cancel.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.fetch_text(url).map(Some)
    }
}

/// Blocking HTTP transport; one request, no retries.
pub struct HttpSource {
    agent: ureq::Agent,
}

impl HttpSource {
    pub fn new(timeout: Option<Duration>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(timeout)
            .build();
        Self {
            agent: config.into(),
        }
    }
}

impl ManifestSource for HttpSource {
    fn fetch_text(&self, url: &str) -> Result<String> {
        http_get(&self.agent, url)
    }

    /// Runs the request on a worker thread and polls `cancel` while waiting.
    /// A cancelled request is abandoned; its late result is discarded.
    fn fetch_text_cancellable(&self, url: &str, cancel: &AtomicBool) -> Result<Option<String>> {
        let (tx, rx) = mpsc::channel();
        let agent = self.agent.clone();
        let worker_url = url.to_string();
        thread::spawn(move || {
            let _ = tx.send(http_get(&agent, &worker_url));
        });
        loop {
            if cancel.load(Ordering::SeqCst) {
                tracing::info!(url, "http fetch abandoned after cancellation");
                return Ok(None);
            }
            match rx.recv_timeout(CANCEL_POLL) {
                Ok(result) => return result.map(Some),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(anyhow!("http worker for {url} exited without a result"));
                }
            }
        }
    }
}

fn http_get(agent: &ureq::Agent, url: &str) -> Result<String> {
    let start = Instant::now();
    let mut response = agent
        .get(url)
        .call()
        .with_context(|| format!("GET {url}"))?;
    let body = response
        .body_mut()
        .read_to_string()
        .with_context(|| format!("read response body from {url}"))?;
    let elapsed_ms = start.elapsed().as_millis();
    tracing::info!(
        elapsed_ms,
        response_bytes = body.len(),
        url,
        "http fetch complete"
    );
    Ok(body)
}

/// Session-cached access to the manifest and per-version release notes.
pub struct ManifestCache<'a> {
    cache: &'a dyn SessionCache,
    source: &'a dyn ManifestSource,
    settings: &'a Settings,
}

impl<'a> ManifestCache<'a> {
    pub fn new(
        cache: &'a dyn SessionCache,
        source: &'a dyn ManifestSource,
        settings: &'a Settings,
    ) -> Self {
        Self {
            cache,
            source,
            settings,
        }
    }

    /// Return the session's manifest, fetching it on the first call.
    pub fn fetch_manifest(&self) -> Result<ContentManifest, ManifestError> {
        self.fetch_manifest_cancellable(None)
    }

    /// As [`ManifestCache::fetch_manifest`], honoring `cancel` until the cache is populated.
    ///
    /// Raising `cancel` while the request is in flight abandons it; nothing is
    /// cached and `Cancelled` is returned.
    pub fn fetch_manifest_cancellable(
        &self,
        cancel: Option<&AtomicBool>,
    ) -> Result<ContentManifest, ManifestError> {
        if let Some(raw) = self.cache.get(MANIFEST_KEY) {
            match serde_json::from_str::<ContentManifest>(&raw) {
                Ok(manifest) => {
                    tracing::debug!(models = manifest.models.len(), "manifest cache hit");
                    return Ok(manifest);
                }
                Err(err) => {
                    tracing::warn!(%err, "cached manifest failed to parse; refetching");
                }
            }
        }

        if is_cancelled(cancel) {
            return Err(ManifestError::Cancelled);
        }
        let url = self.settings.manifest_url();
        let fetched = match cancel {
            Some(flag) => self.source.fetch_text_cancellable(&url, flag),
            None => self.source.fetch_text(&url).map(Some),
        };
        let raw = match fetched {
            Ok(Some(raw)) => raw,
            Ok(None) => return Err(ManifestError::Cancelled),
            Err(err) => {
                tracing::warn!(url = %url, error = %format!("{err:#}"), "manifest fetch failed");
                return Err(ManifestError::Unavailable);
            }
        };
        let manifest: ContentManifest = serde_json::from_str(&raw).map_err(|err| {
            tracing::warn!(url = %url, %err, "manifest body does not match the expected shape");
            ManifestError::Unavailable
        })?;
        if is_cancelled(cancel) {
            return Err(ManifestError::Cancelled);
        }

        if let Err(err) = self.cache.set(MANIFEST_KEY, &raw) {
            tracing::warn!(error = %format!("{err:#}"), "manifest not written to session cache");
        }
        tracing::info!(models = manifest.models.len(), "manifest fetched");
        Ok(manifest)
    }

    /// Fetch the release notes for a model version once per session.
    pub fn fetch_release_notes(
        &self,
        model: &ModelEntry,
        version: &str,
    ) -> Result<String, ManifestError> {
        let resolved = model
            .assets
            .as_ref()
            .and_then(|assets| resolve_version(assets, version))
            .unwrap_or(version)
            .to_string();
        let unavailable = || ManifestError::ReleaseNotesUnavailable {
            model: model.name.clone(),
            version: resolved.clone(),
        };
        let key = format!("{RELEASE_NOTES_KEY}:{}:{resolved}", model.name);
        if let Some(notes) = self.cache.get(&key) {
            tracing::debug!(key = %key, "release notes cache hit");
            return Ok(notes);
        }

        let Some(url) = build_asset_urls(Some(model), version, self.settings).changelog else {
            return Err(unavailable());
        };
        let notes = self.source.fetch_text(&url).map_err(|err| {
            tracing::warn!(url = %url, error = %format!("{err:#}"), "release notes fetch failed");
            unavailable()
        })?;
        if let Err(err) = self.cache.set(&key, &notes) {
            tracing::warn!(key = %key, error = %format!("{err:#}"), "release notes not cached");
        }
        Ok(notes)
    }
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|flag| flag.load(Ordering::SeqCst))
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
