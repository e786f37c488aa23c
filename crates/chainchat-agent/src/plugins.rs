//! Plugin hooks: the explicit registry of extra providers and tool classes.
//!
//! Plugins are compiled in and registered at startup. Their tool classes form
//! the `chainchat_plugins` package: one submodule per plugin, fingerprinted by
//! the plugins' names and versions, so adding or upgrading a plugin starts a
//! new tool cache generation.

use tracing::{debug, info, warn};

use chainchat_providers::registry::{ProviderSpec, PROVIDERS};

use crate::community;
use crate::discovery::{ClassSpec, Distribution, Ecosystem, Module, Package, PLUGIN_PACKAGE};

/// An extension that contributes providers and/or tool classes.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    fn register_providers(&self, _register: &mut dyn FnMut(ProviderSpec)) {}

    fn register_tools(&self, _register: &mut dyn FnMut(ClassSpec)) {}
}

/// Registers the built-in OpenAI-compatible providers.
pub struct BuiltinProviders;

impl Plugin for BuiltinProviders {
    fn name(&self) -> &str {
        "chainchat-openai-compatible"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn register_providers(&self, register: &mut dyn FnMut(ProviderSpec)) {
        for spec in PROVIDERS {
            register(spec.clone());
        }
    }
}

/// Registered plugins, in registration order.
#[derive(Default)]
pub struct PluginManager {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// A manager with every compiled-in plugin registered.
    pub fn with_builtins() -> Self {
        let mut manager = Self::new();
        manager.register(Box::new(BuiltinProviders));
        manager
    }

    pub fn register(&mut self, plugin: Box<dyn Plugin>) {
        info!(plugin = plugin.name(), version = plugin.version(), "registered plugin");
        self.plugins.push(plugin);
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Every registered provider spec. The first registration of a name wins.
    pub fn providers(&self) -> Vec<ProviderSpec> {
        let mut specs: Vec<ProviderSpec> = Vec::new();
        for plugin in &self.plugins {
            plugin.register_providers(&mut |spec: ProviderSpec| {
                if specs.iter().any(|s| s.name == spec.name) {
                    warn!(plugin = plugin.name(), provider = spec.name, "duplicate provider ignored");
                } else {
                    specs.push(spec);
                }
            });
        }
        specs
    }

    /// The plugin tool package, or `None` when no plugin registers tools.
    pub fn tools_package(&self) -> Option<Package> {
        let mut root = Module::new(PLUGIN_PACKAGE);
        let mut distributions = Vec::new();

        for plugin in &self.plugins {
            let mut classes = Vec::new();
            plugin.register_tools(&mut |class: ClassSpec| classes.push(class));
            if classes.is_empty() {
                continue;
            }
            debug!(plugin = plugin.name(), classes = classes.len(), "plugin tool classes");
            let path = format!("{PLUGIN_PACKAGE}.{}", module_name(plugin.name()));
            root = root.with_submodule(Module::new(path).with_classes(&classes));
            distributions.push(Distribution::new(plugin.name(), plugin.version()));
        }

        if distributions.is_empty() {
            return None;
        }
        Some(Package::new(PLUGIN_PACKAGE, distributions).with_root(root))
    }

    /// Installed packages: the community package plus the plugin tools.
    pub fn ecosystem(&self) -> Ecosystem {
        let mut ecosystem = Ecosystem::new();
        ecosystem.install(community::package());
        if let Some(package) = self.tools_package() {
            ecosystem.install(package);
        }
        ecosystem
    }
}

/// A plugin name as a single module path segment.
fn module_name(plugin: &str) -> String {
    plugin
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}
