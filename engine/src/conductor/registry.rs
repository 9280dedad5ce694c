//! Capability Registry
//!
//! Closed, process-wide mapping from a capability name to its implementation.
//! Built once at startup through `CapabilityRegistryBuilder`; read-only after.

use sdk::errors::EngineError;
use sdk::{Capability, CapabilityDescriptor};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Registry of the workers a plan may delegate to
#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Arc<dyn Capability>>,
    /// Registration order, used for stable catalog listings
    order: Vec<String>,
}

impl CapabilityRegistry {
    pub fn builder() -> CapabilityRegistryBuilder {
        CapabilityRegistryBuilder::default()
    }

    /// Look up a capability by name.
    pub fn resolve(&self, name: &str) -> Option<&Arc<dyn Capability>> {
        self.capabilities.get(name)
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Read-only snapshot of every descriptor, for the plan compiler.
    pub fn catalog(&self) -> Catalog {
        let descriptors = self
            .order
            .iter()
            .filter_map(|name| self.capabilities.get(name))
            .map(|cap| cap.descriptor().clone())
            .collect();
        Catalog { descriptors }
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("capabilities", &self.order)
            .finish()
    }
}

#[derive(Default)]
pub struct CapabilityRegistryBuilder {
    registry: CapabilityRegistry,
}

impl CapabilityRegistryBuilder {
    /// Add a capability. Names must be unique.
    pub fn register(mut self, capability: Arc<dyn Capability>) -> Result<Self, EngineError> {
        let name = capability.name().to_string();
        if self.registry.capabilities.contains_key(&name) {
            return Err(EngineError::DuplicateCapability(name));
        }

        debug!("Registered capability '{}'", name);
        self.registry.order.push(name.clone());
        self.registry.capabilities.insert(name, capability);
        Ok(self)
    }

    pub fn build(self) -> CapabilityRegistry {
        self.registry
    }
}

/// Descriptors of every registered capability, in registration order
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    descriptors: Vec<CapabilityDescriptor>,
}

impl Catalog {
    pub fn new(descriptors: Vec<CapabilityDescriptor>) -> Self {
        Self { descriptors }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&CapabilityDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    pub fn descriptors(&self) -> &[CapabilityDescriptor] {
        &self.descriptors
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Render the catalog as planner instructions.
    ///
    /// One numbered entry per capability with its summary, the fields every
    /// step must carry, and the context it depends on.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();

        for (i, d) in self.descriptors.iter().enumerate() {
            parts.push(format!("{}.  `{}`: {}", i + 1, d.name, d.summary));

            let mut fields = Vec::new();
            if d.requires_goal {
                fields.push("goal".to_string());
            }
            fields.extend(d.required_params.iter().cloned());
            if !fields.is_empty() {
                parts.push(format!("    Required fields: {}", fields.join(", ")));
            }

            if !d.reads.is_empty() {
                let reads: Vec<&str> = d.reads.iter().map(|s| s.as_str()).collect();
                parts.push(format!(
                    "    Needs an earlier step to produce: {}",
                    reads.join(", ")
                ));
            }
            if let Some(slot) = d.writes {
                parts.push(format!("    Produces: {}", slot));
            }
        }

        parts.join("\n")
    }
}
