use algocore::{GraphError, NodeHandle, NodeType, PropertyMap, SlotDef};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of available node types
pub struct NodeRegistry {
    kinds: HashMap<String, Arc<dyn NodeType>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self { kinds: HashMap::new() }
    }

    /// Register a node type
    pub fn register(&mut self, kind: Arc<dyn NodeType>) {
        let type_name = kind.type_name().to_string();
        tracing::info!("registering node type: {}", type_name);
        self.kinds.insert(type_name, kind);
    }

    /// Create a node of the given type: allocate, run the `setup` hook,
    /// apply the initial parameter map (exact-name matching against the
    /// declared parameter and input slots; unmatched entries warn, never
    /// fail), then run the `init` hook.
    pub fn create(&self, type_name: &str, parameters: PropertyMap) -> Result<NodeHandle, GraphError> {
        self.create_labeled(type_name, "", parameters)
    }

    /// Like [`NodeRegistry::create`], with a human label used by rule
    /// disambiguation and the graph export.
    pub fn create_labeled(
        &self,
        type_name: &str,
        label: &str,
        parameters: PropertyMap,
    ) -> Result<NodeHandle, GraphError> {
        let kind = self
            .kinds
            .get(type_name)
            .ok_or_else(|| GraphError::UnknownNodeType(type_name.to_string()))?;
        let node = NodeHandle::new(kind.clone(), label);
        kind.setup(&node);
        if !parameters.is_empty() {
            node.apply_parameters(parameters);
        }
        kind.init(&node);
        Ok(node)
    }

    /// Get all registered node types
    pub fn list_types(&self) -> Vec<String> {
        self.kinds.keys().cloned().collect()
    }

    /// Declared slots of a node type, if registered.
    pub fn slots(&self, type_name: &str) -> Option<Vec<SlotDef>> {
        self.kinds.get(type_name).map(|k| k.slots())
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
