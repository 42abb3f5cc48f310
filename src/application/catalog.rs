// ============================================================
// Layer 2 — Configuration Catalog
// ============================================================
// Named configurations live at <root>/<mode>/<name>.yaml, e.g.
//
//   config/
//     supervised/basic.yaml
//     gan/basic.yaml
//     ...
//
// A use case asks for (mode, name); the catalog resolves the file,
// parses it, checks the mode matches, then applies CLI overrides
// before anything is constructed.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};

use crate::domain::{
    config::{ConfigOverrides, ExperimentConfig},
    modes::ModeKind,
};

pub struct ConfigCatalog {
    root: PathBuf,
}

impl ConfigCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, mode: ModeKind, name: &str) -> PathBuf {
        self.root.join(mode.as_str()).join(format!("{name}.yaml"))
    }

    /// Every `<mode>/<name>.yaml` under the root, grouped by mode.
    pub fn available(&self) -> BTreeMap<String, Vec<String>> {
        let mut found = BTreeMap::new();
        for mode in ModeKind::ALL {
            let dir = self.root.join(mode.as_str());
            let Ok(entries) = fs::read_dir(&dir) else { continue };

            let mut names: Vec<String> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "yaml"))
                .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .collect();
            if names.is_empty() {
                continue;
            }
            names.sort();
            found.insert(mode.as_str().to_string(), names);
        }
        found
    }

    /// One `mode: a, b` line per mode.
    pub fn listing(&self) -> String {
        let available = self.available();
        if available.is_empty() {
            return format!("  (no configurations under '{}')", self.root.display());
        }
        available
            .iter()
            .map(|(mode, names)| format!("  {mode}: {}", names.join(", ")))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn resolve(&self, mode: ModeKind, name: &str) -> Result<PathBuf> {
        let path = self.path_for(mode, name);
        if !path.is_file() {
            let listing = self.listing();
            tracing::error!(
                "Configuration '{}' not found. Available configurations:\n{}",
                path.display(),
                listing
            );
            bail!(
                "configuration '{}' does not exist; available:\n{}",
                path.display(),
                listing
            );
        }
        Ok(path)
    }

    /// Resolve, parse, check the mode and apply overrides.
    pub fn load(&self, mode: ModeKind, name: &str, overrides: &ConfigOverrides) -> Result<ExperimentConfig> {
        let path = self.resolve(mode, name)?;
        let config = load_config_file(&path, mode, overrides)?;
        tracing::info!("Loaded configuration '{}'", path.display());
        Ok(config)
    }
}

pub fn load_config_file(path: &Path, mode: ModeKind, overrides: &ConfigOverrides) -> Result<ExperimentConfig> {
    let mut config = ExperimentConfig::from_yaml_file(path)
        .with_context(|| format!("Cannot load configuration '{}'", path.display()))?;
    if config.mode() != mode {
        bail!(
            "configuration '{}' is for mode '{}', not '{}'",
            path.display(),
            config.mode(),
            mode
        );
    }
    config.apply_overrides(overrides);
    Ok(config)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(root: &Path, mode: &str, name: &str, body: &str) {
        let dir = root.join(mode);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{name}.yaml")), body).unwrap();
    }

    #[test]
    fn test_listing_groups_by_mode() {
        let root = tempdir().unwrap();
        write(root.path(), "supervised", "basic", "");
        write(root.path(), "supervised", "large", "");
        write(root.path(), "gan", "basic", "");
        fs::write(root.path().join("supervised").join("notes.txt"), "").unwrap();

        let catalog = ConfigCatalog::new(root.path());
        let available = catalog.available();
        assert_eq!(available["supervised"], vec!["basic", "large"]);
        assert_eq!(available["gan"], vec!["basic"]);
        assert!(catalog.listing().contains("supervised: basic, large"));
    }

    #[test]
    fn test_missing_config_error_lists_available() {
        let root = tempdir().unwrap();
        write(root.path(), "supervised", "basic", "");

        let catalog = ConfigCatalog::new(root.path());
        let err = catalog.resolve(ModeKind::Gan, "basic").unwrap_err().to_string();
        assert!(err.contains("does not exist"));
        assert!(err.contains("supervised: basic"));
    }

    #[test]
    fn test_overrides_applied_after_load() {
        let root = tempdir().unwrap();
        write(root.path(), "supervised", "basic", crate::domain::config::tests::MINIMAL);

        let overrides = ConfigOverrides { epochs: Some(9), batch_size: Some(2), ..Default::default() };
        let config = ConfigCatalog::new(root.path())
            .load(ModeKind::Supervised, "basic", &overrides)
            .unwrap();
        assert_eq!(config.training.epochs, 9);
        assert_eq!(config.training.batch_size, 2);
    }

    #[test]
    fn test_mode_mismatch_rejected() {
        let root = tempdir().unwrap();
        write(root.path(), "gan", "basic", crate::domain::config::tests::MINIMAL);
        let result = ConfigCatalog::new(root.path()).load(ModeKind::Gan, "basic", &ConfigOverrides::default());
        assert!(result.is_err());
    }
}
