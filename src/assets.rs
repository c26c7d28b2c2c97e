//! Asset URL resolution for one model version.
//!
//! Every field degrades independently: a missing model, missing assets, or a
//! missing filename yields that field's empty sentinel instead of an error.
use crate::config::Settings;
use crate::manifest::{ManifestAssets, ModelEntry};
use serde::Serialize;

/// Version sentinel that resolves to the manifest's `current-version`.
pub const LATEST_VERSION: &str = "latest";

/// Absolute URLs for every downloadable artifact of a model version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelAssetUrls {
    pub model_files: Vec<String>,
    pub readme: Option<String>,
    pub loading_file: Option<String>,
    pub navigator_icon: String,
    pub changelog: Option<String>,
}

/// Resolve `"latest"` to the current version; any other request is literal.
///
/// Returns `None` when the resolved version is blank; otherwise it is
/// returned exactly as given.
pub fn resolve_version<'a>(assets: &'a ManifestAssets, requested: &'a str) -> Option<&'a str> {
    let resolved = if requested == LATEST_VERSION {
        assets.current_version.as_str()
    } else {
        requested
    };
    (!resolved.trim().is_empty()).then_some(resolved)
}

/// Build the asset URLs for `model` at `version`.
pub fn build_asset_urls(
    model: Option<&ModelEntry>,
    version: &str,
    settings: &Settings,
) -> ModelAssetUrls {
    let Some(model) = model else {
        return ModelAssetUrls::default();
    };
    let Some(assets) = model.assets.as_ref() else {
        return ModelAssetUrls::default();
    };
    let name = model.name.trim();
    if name.is_empty() {
        return ModelAssetUrls::default();
    }
    let Some(version) = resolve_version(assets, version) else {
        tracing::debug!(model = name, "no version to resolve asset urls against");
        return ModelAssetUrls::default();
    };

    let url_for = |filename: &str| settings.asset_url(name, version, filename);
    let optional = |filename: &Option<String>| {
        filename
            .as_deref()
            .filter(|filename| !filename.trim().is_empty())
            .map(url_for)
    };

    ModelAssetUrls {
        model_files: assets
            .model_files
            .iter()
            .map(|filename| url_for(filename))
            .collect(),
        readme: optional(&assets.readme_file),
        loading_file: optional(&assets.loading_file),
        navigator_icon: optional(&assets.model_navigator_logo).unwrap_or_default(),
        changelog: optional(&assets.release_notes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn settings() -> Settings {
        Settings::new("https://repo.example", "prod", PathBuf::from("/tmp")).expect("settings")
    }

    fn model() -> ModelEntry {
        ModelEntry {
            name: "CDS".to_string(),
            assets: Some(ManifestAssets {
                model_files: vec!["a".to_string(), "b".to_string()],
                readme_file: Some("README.md".to_string()),
                loading_file: None,
                current_version: "1.0".to_string(),
                release_notes: Some("release-notes.md".to_string()),
                versions: vec!["1.0".to_string(), "2.1".to_string()],
                model_navigator_logo: Some("logo.png".to_string()),
                model_navigator_config: None,
            }),
        }
    }

    #[test]
    fn latest_resolves_to_current_version() {
        let urls = build_asset_urls(Some(&model()), LATEST_VERSION, &settings());
        assert_eq!(
            urls.model_files,
            vec![
                "https://repo.example/prod/cache/CDS/1.0/a".to_string(),
                "https://repo.example/prod/cache/CDS/1.0/b".to_string(),
            ]
        );
        assert_eq!(
            urls.readme.as_deref(),
            Some("https://repo.example/prod/cache/CDS/1.0/README.md")
        );
        assert_eq!(urls.loading_file, None);
        assert_eq!(
            urls.navigator_icon,
            "https://repo.example/prod/cache/CDS/1.0/logo.png"
        );
        assert!(urls
            .changelog
            .as_deref()
            .is_some_and(|url| url.ends_with("/1.0/release-notes.md")));
    }

    #[test]
    fn explicit_version_is_used_literally() {
        let urls = build_asset_urls(Some(&model()), "2.1", &settings());
        assert!(urls.model_files[0].ends_with("/2.1/a"));
        assert!(urls.model_files[1].ends_with("/2.1/b"));
        assert_eq!(urls.model_files.len(), 2);
    }

    #[test]
    fn explicit_version_is_not_rewritten() {
        let entry = model();
        let assets = entry.assets.as_ref().expect("fixture assets");
        assert_eq!(resolve_version(assets, " 2.1 "), Some(" 2.1 "));
        assert_eq!(resolve_version(assets, "   "), None);
        let urls = build_asset_urls(Some(&entry), "2.1-rc ", &settings());
        assert_eq!(urls.model_files[0], "https://repo.example/prod/cache/CDS/2.1-rc /a");
    }

    #[test]
    fn missing_inputs_degrade_to_empty_sentinels() {
        let empty = ModelAssetUrls::default();
        assert_eq!(build_asset_urls(None, LATEST_VERSION, &settings()), empty);

        let bare = ModelEntry {
            name: "CDS".to_string(),
            assets: None,
        };
        assert_eq!(build_asset_urls(Some(&bare), LATEST_VERSION, &settings()), empty);
        assert_eq!(
            build_asset_urls(Some(&ModelEntry::default()), "1.0", &settings()),
            empty
        );
    }

    #[test]
    fn empty_file_list_and_missing_logo() {
        let mut entry = model();
        if let Some(assets) = entry.assets.as_mut() {
            assets.model_files.clear();
            assets.model_navigator_logo = None;
            assets.readme_file = Some("  ".to_string());
        }
        let urls = build_asset_urls(Some(&entry), LATEST_VERSION, &settings());
        assert!(urls.model_files.is_empty());
        assert_eq!(urls.navigator_icon, "");
        assert_eq!(urls.readme, None);
    }

    #[test]
    fn blank_current_version_yields_no_urls() {
        let mut entry = model();
        if let Some(assets) = entry.assets.as_mut() {
            assets.current_version = String::new();
        }
        let urls = build_asset_urls(Some(&entry), LATEST_VERSION, &settings());
        assert_eq!(urls, ModelAssetUrls::default());
    }
}
