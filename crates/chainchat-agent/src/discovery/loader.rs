//! Tool loader: turns requested tool names into bound instances.
//!
//! The active mapping merges the tool index of every active package (earlier
//! packages win on a name clash). It is built once per loader and reused for
//! both listings and resolution; [`ToolLoader::invalidate`] drops it after
//! the installed packages change.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use super::cache::{ToolDescriptor, ToolIndexCache};
use super::ecosystem::Ecosystem;
use super::{ToolError, COMMUNITY_PACKAGE, PLUGIN_PACKAGE};
use crate::tools::Tool;

pub struct ToolLoader {
    ecosystem: Ecosystem,
    cache: ToolIndexCache,
    packages: Vec<String>,
    mapping: OnceLock<BTreeMap<String, ToolDescriptor>>,
}

impl ToolLoader {
    /// A loader over the community and plugin packages.
    pub fn new(ecosystem: Ecosystem, cache: ToolIndexCache) -> Self {
        Self::with_packages(
            ecosystem,
            cache,
            vec![COMMUNITY_PACKAGE.to_string(), PLUGIN_PACKAGE.to_string()],
        )
    }

    pub fn with_packages(ecosystem: Ecosystem, cache: ToolIndexCache, packages: Vec<String>) -> Self {
        Self {
            ecosystem,
            cache,
            packages,
            mapping: OnceLock::new(),
        }
    }

    pub fn ecosystem(&self) -> &Ecosystem {
        &self.ecosystem
    }

    /// Replace the installed packages and forget the memoized mapping.
    pub fn set_ecosystem(&mut self, ecosystem: Ecosystem) {
        self.ecosystem = ecosystem;
        self.invalidate();
    }

    pub fn invalidate(&mut self) {
        self.mapping = OnceLock::new();
    }

    /// Every discoverable tool, keyed by name.
    pub fn tools(&self) -> Result<&BTreeMap<String, ToolDescriptor>, ToolError> {
        if let Some(mapping) = self.mapping.get() {
            return Ok(mapping);
        }
        let mut merged = BTreeMap::new();
        for package in &self.packages {
            for (name, descriptor) in self.cache.lookup_tools(&self.ecosystem, package)? {
                merged.entry(name).or_insert(descriptor);
            }
        }
        debug!(tools = merged.len(), "built tool mapping");
        Ok(self.mapping.get_or_init(|| merged))
    }

    /// Tool name → description, for listings.
    pub fn descriptions(&self) -> Result<BTreeMap<&str, Option<&str>>, ToolError> {
        Ok(self
            .tools()?
            .iter()
            .map(|(name, d)| (name.as_str(), d.description.as_deref()))
            .collect())
    }

    /// Instantiate the named tools in the order given, duplicates included.
    ///
    /// `None` or an empty list binds no tools and yields `None`.
    pub fn resolve(
        &self,
        names: Option<&[String]>,
    ) -> Result<Option<Vec<Arc<dyn Tool>>>, ToolError> {
        let Some(names) = names.filter(|n| !n.is_empty()) else {
            return Ok(None);
        };
        let tools = self.tools()?;

        names
            .iter()
            .map(|name| {
                let descriptor = tools
                    .get(name)
                    .ok_or_else(|| ToolError::NotFound { name: name.clone() })?;
                self.instantiate(descriptor)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    fn instantiate(&self, descriptor: &ToolDescriptor) -> Result<Arc<dyn Tool>, ToolError> {
        let class = self
            .ecosystem
            .resolve_class(&descriptor.module, &descriptor.class)?;
        let factory = class.factory.ok_or_else(|| ToolError::NotInstantiable {
            class: format!("{}.{}", descriptor.module, descriptor.class),
        })?;
        debug!(tool = %descriptor.name, class = %descriptor.class, "instantiating tool");
        Ok(factory())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::ecosystem::{Capability, ClassSpec, Module, Package};
    use crate::discovery::Distribution;
    use crate::tools::ToolArgs;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Named(&'static str);

    #[async_trait]
    impl Tool for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "test tool"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _args: ToolArgs) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn new_a() -> Arc<dyn Tool> {
        Arc::new(Named("a"))
    }
    fn new_b() -> Arc<dyn Tool> {
        Arc::new(Named("b"))
    }
    fn new_plugin_a() -> Arc<dyn Tool> {
        Arc::new(Named("plugin-a"))
    }

    const A: ClassSpec = ClassSpec::tool("ATool", "a", "Tool A", new_a);
    const B: ClassSpec = ClassSpec::tool("BTool", "b", "Tool B", new_b);
    const PLUGIN_A: ClassSpec = ClassSpec::tool("PluginATool", "a", "Plugin A", new_plugin_a);
    const NO_FACTORY: ClassSpec = ClassSpec {
        name: "Declarative",
        bases: &[Capability::Tool],
        tool_name: Some("declarative"),
        description: None,
        factory: None,
    };

    fn ecosystem() -> Ecosystem {
        let community = Module::new(COMMUNITY_PACKAGE).with_submodule(
            Module::new(format!("{COMMUNITY_PACKAGE}.tools")).with_submodule(
                Module::new(format!("{COMMUNITY_PACKAGE}.tools.ab"))
                    .with_classes(&[A, B, NO_FACTORY]),
            ),
        );
        let plugins = Module::new(PLUGIN_PACKAGE)
            .with_submodule(Module::new(format!("{PLUGIN_PACKAGE}.p")).with_classes(&[PLUGIN_A]));

        let mut eco = Ecosystem::new();
        eco.install(
            Package::new(COMMUNITY_PACKAGE, vec![Distribution::new("community", "1")])
                .with_root(community),
        );
        eco.install(
            Package::new(PLUGIN_PACKAGE, vec![Distribution::new("p", "1")]).with_root(plugins),
        );
        eco
    }

    fn loader() -> ToolLoader {
        ToolLoader::new(ecosystem(), ToolIndexCache::open_in_memory().unwrap())
    }

    fn resolve(
        loader: &ToolLoader,
        list: &[&str],
    ) -> Result<Option<Vec<Arc<dyn Tool>>>, ToolError> {
        let names: Vec<String> = list.iter().map(|s| s.to_string()).collect();
        loader.resolve(Some(names.as_slice()))
    }

    #[test]
    fn test_resolve_keeps_order_and_duplicates() {
        let loader = loader();
        let tools = resolve(&loader, &["b", "a", "b"]).unwrap().unwrap();
        let got: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(got, vec!["b", "a", "b"]);
    }

    #[test]
    fn test_resolve_empty_is_none() {
        let loader = loader();
        assert!(loader.resolve(None).unwrap().is_none());
        assert!(resolve(&loader, &[]).unwrap().is_none());
    }

    #[test]
    fn test_resolve_missing_names_tool() {
        let loader = loader();
        let err = resolve(&loader, &["a", "missing"]).err().unwrap();
        assert!(matches!(err, ToolError::NotFound { ref name } if name == "missing"));
        assert_eq!(err.to_string(), "Tool missing not found. Use `list-tools`.");
    }

    #[test]
    fn test_community_wins_name_clash() {
        let loader = loader();
        let tools = resolve(&loader, &["a"]).unwrap().unwrap();
        assert_eq!(tools[0].name(), "a");
    }

    #[test]
    fn test_not_instantiable() {
        let loader = loader();
        let err = resolve(&loader, &["declarative"]).err().unwrap();
        assert!(matches!(err, ToolError::NotInstantiable { .. }));
    }

    #[test]
    fn test_descriptions_memoized_until_invalidated() {
        let mut loader = loader();
        let descriptions = loader.descriptions().unwrap();
        assert_eq!(descriptions.get("b"), Some(&Some("Tool B")));
        assert_eq!(descriptions.get("declarative"), Some(&None));

        // New ecosystem version, same loader: the memo hides it until invalidated.
        let mut eco = ecosystem();
        eco.install(Package::new(COMMUNITY_PACKAGE, vec![Distribution::new("community", "2")]));
        loader.ecosystem = eco.clone();
        assert!(loader.tools().unwrap().contains_key("b"));

        loader.set_ecosystem(eco);
        assert!(!loader.tools().unwrap().contains_key("b"));
    }
}
