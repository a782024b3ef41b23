use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::loader::{load_with_timeout, ModelLoadError, ModelLoader, SyntheticModelLoader};
use super::source::{LandmarkerOptions, SharedLandmarker};

/// Registry of model loaders, selected by model asset path.
pub struct LoaderRegistry {
    loaders: HashMap<String, Arc<dyn ModelLoader>>,
    default_name: Option<String>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self {
            loaders: HashMap::new(),
            default_name: None,
        }
    }

    /// Registry with the loaders compiled into this build.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(SyntheticModelLoader);
        registry
    }

    /// Register a loader. The first registered loader becomes the default.
    pub fn register<L: ModelLoader + 'static>(&mut self, loader: L) {
        let name = loader.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.loaders.insert(name, Arc::new(loader));
    }

    /// Set default loader by name.
    pub fn set_default(&mut self, name: &str) -> anyhow::Result<()> {
        if !self.loaders.contains_key(name) {
            anyhow::bail!("loader '{}' not registered", name);
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ModelLoader>> {
        self.loaders.get(name).cloned()
    }

    /// List registered loaders.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.loaders.keys().cloned().collect();
        names.sort();
        names
    }

    /// Select a loader for `model_asset_path`.
    ///
    /// Prefers the default loader when it handles the path.
    pub fn loader_for(
        &self,
        model_asset_path: &str,
    ) -> Result<Arc<dyn ModelLoader>, ModelLoadError> {
        if let Some(default_loader) = self.default_name.as_deref().and_then(|name| self.get(name)) {
            if default_loader.handles(model_asset_path) {
                return Ok(default_loader);
            }
        }
        let mut names: Vec<&String> = self.loaders.keys().collect();
        names.sort();
        names
            .into_iter()
            .filter_map(|name| self.loaders.get(name))
            .find(|loader| loader.handles(model_asset_path))
            .cloned()
            .ok_or_else(|| ModelLoadError::NoLoader(model_asset_path.to_string()))
    }

    /// Load a landmark source for `options`, bounded by `timeout`.
    pub fn load(
        &self,
        options: &LandmarkerOptions,
        timeout: Duration,
    ) -> Result<SharedLandmarker, ModelLoadError> {
        let loader = self.loader_for(&options.model_asset_path)?;
        log::info!(
            "loading pose model {} with {} loader",
            options.model_asset_path,
            loader.name()
        );
        load_with_timeout(loader, options, timeout)
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
