//! Package scanner.
//!
//! Walks a module tree depth-first and yields every class implementing a
//! capability. The static variant only reads declared classes; the dynamic
//! variant imports each module first so classes registered by import side
//! effects are found too. A module whose import fails is logged and skipped
//! together with its submodules; its siblings are still scanned.
//!
//! Scans are lazy and single-use. Callers cache the results.

use std::collections::VecDeque;

use tracing::{debug, warn};

use super::ecosystem::{Capability, ClassSpec, Ecosystem, Module};

/// A class found by a scan, with the module that provides it.
#[derive(Clone, Debug)]
pub struct FoundClass {
    pub module: String,
    pub class: ClassSpec,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Static,
    Dynamic,
}

/// Lazy iterator over the classes of a module tree.
pub struct ClassScan<'a> {
    stack: Vec<&'a Module>,
    ready: VecDeque<FoundClass>,
    base: Capability,
    mode: Mode,
}

/// Scan declared classes under `root` without running import hooks.
pub fn find_classes<'a>(ecosystem: &'a Ecosystem, root: &str, base: Capability) -> ClassScan<'a> {
    ClassScan::new(ecosystem, root, base, Mode::Static)
}

/// Scan under `root`, importing every module first.
pub fn find_classes_dynamic<'a>(
    ecosystem: &'a Ecosystem,
    root: &str,
    base: Capability,
) -> ClassScan<'a> {
    ClassScan::new(ecosystem, root, base, Mode::Dynamic)
}

impl<'a> ClassScan<'a> {
    fn new(ecosystem: &'a Ecosystem, root: &str, base: Capability, mode: Mode) -> Self {
        let stack = match ecosystem.find_module(root) {
            Some(module) => vec![module],
            None => {
                warn!(module = root, "scan root not found");
                Vec::new()
            }
        };
        Self {
            stack,
            ready: VecDeque::new(),
            base,
            mode,
        }
    }

    /// Visit one module: queue its matching classes and its submodules.
    fn visit(&mut self, module: &'a Module) {
        let classes = match self.mode {
            Mode::Static => module.classes.clone(),
            Mode::Dynamic => match module.import() {
                Ok(classes) => classes,
                Err(e) => {
                    warn!(module = %module.path, error = %e, "skipping module that failed to import");
                    return;
                }
            },
        };
        debug!(module = %module.path, classes = classes.len(), "scanned module");

        let base = self.base;
        self.ready.extend(
            classes
                .into_iter()
                .filter(|c| c.is_subtype_of(base))
                .map(|class| FoundClass {
                    module: module.path.clone(),
                    class,
                }),
        );
        // Reverse so submodules come off the stack in declaration order.
        self.stack.extend(module.submodules.iter().rev());
    }
}

impl Iterator for ClassScan<'_> {
    type Item = FoundClass;

    fn next(&mut self) -> Option<FoundClass> {
        loop {
            if let Some(found) = self.ready.pop_front() {
                return Some(found);
            }
            let module = self.stack.pop()?;
            self.visit(module);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::ecosystem::Package;
    use crate::discovery::Distribution;
    use crate::tools::{Tool, ToolArgs};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct Stub;

    #[async_trait]
    impl Tool for Stub {
        fn name(&self) -> &str {
            "stub"
        }
        fn description(&self) -> &str {
            "stub"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _args: ToolArgs) -> anyhow::Result<String> {
            Ok(String::new())
        }
    }

    fn new_stub() -> Arc<dyn Tool> {
        Arc::new(Stub)
    }

    const DECLARED: ClassSpec = ClassSpec::tool("DeclaredTool", "declared", "declared", new_stub);
    const REGISTERED: ClassSpec =
        ClassSpec::tool("RegisteredTool", "registered", "registered", new_stub);
    const NESTED: ClassSpec = ClassSpec::tool("NestedTool", "nested", "nested", new_stub);
    const KIT: ClassSpec = ClassSpec {
        name: "Kit",
        bases: &[Capability::Toolkit],
        tool_name: None,
        description: None,
        factory: None,
    };

    fn registers() -> anyhow::Result<Vec<ClassSpec>> {
        Ok(vec![REGISTERED])
    }

    fn raises() -> anyhow::Result<Vec<ClassSpec>> {
        anyhow::bail!("No module named 'missing_dep'")
    }

    fn ecosystem() -> Ecosystem {
        let root = Module::new("pkg").with_submodule(
            Module::new("pkg.tools")
                .with_submodule(Module::new("pkg.tools.good").with_classes(&[DECLARED, KIT]))
                .with_submodule(
                    Module::new("pkg.tools.bad")
                        .with_import(raises)
                        .with_submodule(Module::new("pkg.tools.bad.child").with_classes(&[NESTED])),
                )
                .with_submodule(Module::new("pkg.tools.hooked").with_import(registers)),
        );
        let mut eco = Ecosystem::new();
        eco.install(Package::new("pkg", vec![Distribution::new("pkg", "1")]).with_root(root));
        eco
    }

    fn names(scan: ClassScan<'_>) -> Vec<&'static str> {
        scan.map(|f| f.class.name).collect()
    }

    #[test]
    fn test_static_scan_skips_import_hooks() {
        let eco = ecosystem();
        let found = names(find_classes(&eco, "pkg", Capability::Tool));
        assert_eq!(found, vec!["DeclaredTool", "NestedTool"]);
    }

    #[test]
    fn test_dynamic_scan_survives_failed_import() {
        let eco = ecosystem();
        let found: Vec<FoundClass> =
            find_classes_dynamic(&eco, "pkg.tools", Capability::Tool).collect();
        let names: Vec<&str> = found.iter().map(|f| f.class.name).collect();
        assert_eq!(names, vec!["DeclaredTool", "RegisteredTool"]);
        assert_eq!(found[0].module, "pkg.tools.good");
        assert_eq!(found[1].module, "pkg.tools.hooked");
    }

    #[test]
    fn test_filters_by_capability() {
        let eco = ecosystem();
        let found = names(find_classes(&eco, "pkg", Capability::Toolkit));
        assert_eq!(found, vec!["Kit"]);
    }

    #[test]
    fn test_unknown_root_is_empty() {
        let eco = ecosystem();
        assert_eq!(find_classes(&eco, "nope", Capability::Tool).count(), 0);
    }

    #[test]
    fn test_scan_is_lazy() {
        let eco = ecosystem();
        let mut scan = find_classes_dynamic(&eco, "pkg.tools", Capability::Tool);
        assert_eq!(scan.next().unwrap().class.name, "DeclaredTool");
        // Only the path to the first match has been visited.
        assert!(!scan.stack.is_empty());
    }
}
