use crate::error::NodeError;
use crate::events::{NodeEvent, NodeEventKind};
use crate::rules::PropagationRules;
use crate::slot::{builtin_slots, SlotDef, SlotKind, KEEP_INPUT, PARALLEL_EXECUTION, PROPAGATION_RULES};
use crate::value::{PropertyMap, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use uuid::Uuid;

pub type NodeId = Uuid;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A unit of computation with named input, output and parameter slots.
///
/// Implementations declare their slot registry once and provide a
/// synchronous `run`; the model has no suspension points, so a computation
/// either blocks its thread (serial driver) or runs on the shared worker
/// pool (concurrent driver).
pub trait NodeType: Send + Sync {
    /// Unique type identifier (e.g., "stats.moving_average")
    fn type_name(&self) -> &str;

    /// Declared slots of this node type. Built-in parameters are added on
    /// top of these when a node is created.
    fn slots(&self) -> Vec<SlotDef>;

    /// Factory hook, called right after allocation and before any
    /// parameter is applied.
    fn setup(&self, _node: &NodeHandle) {}

    /// Factory hook, called after the initial parameter map is applied.
    fn init(&self, _node: &NodeHandle) {}

    /// Core of the node. Reads inputs and parameters, writes outputs.
    fn run(&self, ctx: &mut RunContext) -> Result<(), NodeError>;
}

/// Lifecycle state. `Finished` is terminal; a failed computation stays in
/// `Started` forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Created,
    Started,
    Finished,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Created => write!(f, "created"),
            NodeState::Started => write!(f, "started"),
            NodeState::Finished => write!(f, "finished"),
        }
    }
}

/// One endpoint record of an edge. `done` is a snapshot of the neighbor's
/// completion as of the last propagation event, not a live query; the two
/// sides of an edge may transiently disagree with the neighbor's real
/// state until the next propagation event.
#[derive(Clone)]
pub(crate) struct Link {
    pub(crate) node: NodeHandle,
    pub(crate) done: bool,
}

pub(crate) struct NodeBody {
    pub(crate) state: NodeState,
    pub(crate) parameters: PropertyMap,
    pub(crate) inputs: PropertyMap,
    pub(crate) outputs: PropertyMap,
    pub(crate) rules: PropagationRules,
    pub(crate) ancestors: HashMap<NodeId, Link>,
    pub(crate) descendants: HashMap<NodeId, Link>,
    /// Advisory-error relay subscriptions, maintained symmetrically by
    /// connect/disconnect.
    pub(crate) relays: HashMap<NodeId, NodeHandle>,
}

struct NodeCell {
    id: NodeId,
    label: String,
    type_name: String,
    slots: Vec<SlotDef>,
    kind: Arc<dyn NodeType>,
    events: broadcast::Sender<NodeEvent>,
    body: Mutex<NodeBody>,
}

/// Shared handle to one node. Edges hold reciprocal handles, so a node
/// stays alive while any neighbor or external handle refers to it; a node
/// never holds a handle to itself.
#[derive(Clone)]
pub struct NodeHandle(Arc<NodeCell>);

impl NodeHandle {
    /// Allocate a node of the given type. The slot registry is resolved
    /// once here: built-in parameters plus the type's declared slots, with
    /// parameter defaults seeded into the parameter map.
    pub fn new(kind: Arc<dyn NodeType>, label: impl Into<String>) -> Self {
        let mut slots = builtin_slots();
        slots.extend(kind.slots());

        let mut parameters = PropertyMap::new();
        for slot in &slots {
            if slot.kind == SlotKind::Parameter {
                if let Some(default) = &slot.default {
                    parameters.insert(slot.name.to_string(), default.clone());
                }
            }
        }

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        NodeHandle(Arc::new(NodeCell {
            id: Uuid::new_v4(),
            label: label.into(),
            type_name: kind.type_name().to_string(),
            slots,
            kind,
            events,
            body: Mutex::new(NodeBody {
                state: NodeState::Created,
                parameters,
                inputs: PropertyMap::new(),
                outputs: PropertyMap::new(),
                rules: PropagationRules::new(),
                ancestors: HashMap::new(),
                descendants: HashMap::new(),
                relays: HashMap::new(),
            }),
        }))
    }

    fn body(&self) -> MutexGuard<'_, NodeBody> {
        // A panicked computation must not wedge the rest of the graph.
        self.0.body.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn label(&self) -> &str {
        &self.0.label
    }

    pub fn type_name(&self) -> &str {
        &self.0.type_name
    }

    /// The resolved slot registry of this node.
    pub fn slots(&self) -> &[SlotDef] {
        &self.0.slots
    }

    pub fn find_slot(&self, name: &str) -> Option<&SlotDef> {
        self.0.slots.iter().find(|s| s.name == name)
    }

    pub fn state(&self) -> NodeState {
        self.body().state
    }

    pub fn is_started(&self) -> bool {
        self.state() != NodeState::Created
    }

    pub fn is_finished(&self) -> bool {
        self.state() == NodeState::Finished
    }

    // --- built-in configuration ------------------------------------------

    pub fn keep_input(&self) -> bool {
        self.body()
            .parameters
            .get(KEEP_INPUT)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn set_keep_input(&self, keep: bool) {
        self.body()
            .parameters
            .insert(KEEP_INPUT.to_string(), Value::Bool(keep));
    }

    /// Whether this node launches its descendants on the worker pool. The
    /// flag belongs to the upstream node: a finishing node launches its
    /// children with its own flag, never theirs.
    pub fn parallel(&self) -> bool {
        self.body()
            .parameters
            .get(PARALLEL_EXECUTION)
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    pub fn set_parallel(&self, parallel: bool) {
        self.body()
            .parameters
            .insert(PARALLEL_EXECUTION.to_string(), Value::Bool(parallel));
    }

    pub fn rules(&self) -> PropagationRules {
        self.body().rules.clone()
    }

    pub fn set_rules(&self, rules: PropagationRules) {
        self.body().rules = rules;
    }

    // --- slot access -----------------------------------------------------

    pub fn parameter(&self, name: &str) -> Option<Value> {
        self.body().parameters.get(name).cloned()
    }

    pub fn input(&self, name: &str) -> Option<Value> {
        self.body().inputs.get(name).cloned()
    }

    pub fn output(&self, name: &str) -> Option<Value> {
        self.body().outputs.get(name).cloned()
    }

    /// Apply a name-value map to declared parameter and input slots. An
    /// entry matches a slot by exact name; unmatched or ill-typed entries
    /// produce a warning, not a failure. The reserved `PropagationRules`
    /// key decodes into the rule table.
    pub fn apply_parameters(&self, parameters: PropertyMap) {
        for (name, value) in parameters {
            if name == PROPAGATION_RULES {
                match PropagationRules::from_value(&value) {
                    Some(rules) => self.set_rules(rules),
                    None => {
                        tracing::warn!(node = %self, "malformed {PROPAGATION_RULES} entry ignored")
                    }
                }
                continue;
            }
            match self.find_slot(&name).cloned() {
                Some(slot) if slot.is_writable() => {
                    if !slot.ty.admits(&value) {
                        tracing::warn!(node = %self, slot = %name, "cannot set slot: type mismatch");
                        continue;
                    }
                    self.write_slot(&slot, value);
                }
                _ => {
                    tracing::warn!(node = %self, property = %name, "not among the node's declared slots")
                }
            }
        }
    }

    /// Route a value to its slot map. `InputList` slots append instead of
    /// replacing.
    pub(crate) fn write_slot(&self, slot: &SlotDef, value: Value) {
        let mut body = self.body();
        match slot.kind {
            SlotKind::Parameter => {
                body.parameters.insert(slot.name.to_string(), value);
            }
            SlotKind::Input => {
                body.inputs.insert(slot.name.to_string(), value);
            }
            SlotKind::InputList => {
                let entry = body
                    .inputs
                    .entry(slot.name.to_string())
                    .or_insert_with(|| Value::Array(Vec::new()));
                match entry {
                    Value::Array(items) => items.push(value),
                    other => *other = Value::Array(vec![value]),
                }
            }
            SlotKind::Output => {
                body.outputs.insert(slot.name.to_string(), value);
            }
        }
    }

    /// Snapshot the parent-side slots the bus may propagate: every declared
    /// output and parameter with its current value, if readable.
    pub(crate) fn read_propagable_slots(&self) -> Vec<(SlotDef, Option<Value>)> {
        let body = self.body();
        self.0
            .slots
            .iter()
            .filter(|s| matches!(s.kind, SlotKind::Output | SlotKind::Parameter))
            .map(|s| {
                let value = match s.kind {
                    SlotKind::Output => body.outputs.get(s.name).cloned(),
                    _ => body.parameters.get(s.name).cloned(),
                };
                (s.clone(), value)
            })
            .collect()
    }

    /// Drop every input value, releasing payloads that have already been
    /// delivered downstream.
    pub fn clear_inputs(&self) {
        self.body().inputs.clear();
    }

    // --- adjacency -------------------------------------------------------

    pub(crate) fn insert_ancestor(&self, ancestor: &NodeHandle, done: bool) {
        let mut body = self.body();
        body.ancestors
            .insert(ancestor.id(), Link { node: ancestor.clone(), done });
        body.relays.insert(ancestor.id(), ancestor.clone());
    }

    pub(crate) fn insert_descendant(&self, descendant: &NodeHandle, done: bool) {
        let mut body = self.body();
        body.descendants
            .insert(descendant.id(), Link { node: descendant.clone(), done });
        body.relays.insert(descendant.id(), descendant.clone());
    }

    pub(crate) fn remove_ancestor(&self, id: NodeId) {
        let mut body = self.body();
        body.ancestors.remove(&id);
        body.relays.remove(&id);
    }

    pub(crate) fn remove_descendant(&self, id: NodeId) {
        let mut body = self.body();
        body.descendants.remove(&id);
        body.relays.remove(&id);
    }

    pub(crate) fn has_ancestor(&self, id: NodeId) -> bool {
        self.body().ancestors.contains_key(&id)
    }

    pub(crate) fn has_descendant(&self, id: NodeId) -> bool {
        self.body().descendants.contains_key(&id)
    }

    pub fn ancestor_count(&self) -> usize {
        self.body().ancestors.len()
    }

    pub fn descendant_count(&self) -> usize {
        self.body().descendants.len()
    }

    pub fn ancestor_nodes(&self) -> Vec<NodeHandle> {
        self.body().ancestors.values().map(|l| l.node.clone()).collect()
    }

    pub fn descendant_nodes(&self) -> Vec<NodeHandle> {
        self.body().descendants.values().map(|l| l.node.clone()).collect()
    }

    /// Ancestors whose stored completion flag is still false.
    pub fn pending_ancestors(&self) -> Vec<NodeHandle> {
        self.body()
            .ancestors
            .values()
            .filter(|l| !l.done)
            .map(|l| l.node.clone())
            .collect()
    }

    /// Every stored ancestor flag is true. Vacuously true for a source node.
    pub fn all_inputs_ready(&self) -> bool {
        self.body().ancestors.values().all(|l| l.done)
    }

    /// Record that the given ancestor finished, as seen from this node.
    pub fn note_ancestor_finished(&self, id: NodeId) {
        if let Some(link) = self.body().ancestors.get_mut(&id) {
            link.done = true;
        }
    }

    /// Record that the given descendant finished, as seen from this node.
    pub fn note_descendant_finished(&self, id: NodeId) {
        if let Some(link) = self.body().descendants.get_mut(&id) {
            link.done = true;
        }
    }

    // --- lifecycle -------------------------------------------------------

    /// Atomic check-and-set shared across all callers: transition
    /// Created -> Started iff every stored ancestor flag is true. Guards
    /// against double dispatch when several ancestors finish concurrently.
    pub fn try_start(&self) -> bool {
        {
            let mut body = self.body();
            if body.state != NodeState::Created || !body.ancestors.values().all(|l| l.done) {
                return false;
            }
            body.state = NodeState::Started;
        }
        self.emit(NodeEventKind::Started);
        true
    }

    /// Transition Started -> Finished and publish the completion event.
    /// Called by the execution drivers once the computation succeeded.
    pub fn set_finished(&self) {
        self.body().state = NodeState::Finished;
        self.emit(NodeEventKind::Finished);
    }

    /// Run the node's computation synchronously on the calling thread. The
    /// input map is moved into the computation and the remainder restored
    /// afterwards; outputs are written only on success.
    pub fn run_computation(&self) -> Result<(), NodeError> {
        let kind = self.0.kind.clone();
        let mut ctx = {
            let mut body = self.body();
            RunContext {
                node_id: self.0.id,
                name: self.to_string(),
                inputs: std::mem::take(&mut body.inputs),
                parameters: body.parameters.clone(),
                outputs: PropertyMap::new(),
            }
        };
        let result = kind.run(&mut ctx);
        let mut body = self.body();
        body.inputs = ctx.inputs;
        if result.is_ok() {
            body.outputs.extend(ctx.outputs);
        }
        result
    }

    // --- events & advisory errors ----------------------------------------

    /// Subscribe to this node's lifecycle and advisory notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.0.events.subscribe()
    }

    fn emit(&self, kind: NodeEventKind) {
        let _ = self.0.events.send(NodeEvent::now(self.id(), self.label(), kind));
    }

    /// Raise an advisory error. The message is pushed breadth-first along
    /// the relay subscriptions wired by connect, reaching every node
    /// connected through any chain of edges exactly once. This is a
    /// diagnostic channel, not an exception: nothing is halted by it.
    pub fn abort(&self, message: impl Into<String>) {
        let message = message.into();
        let origin = self.id();
        let mut seen = HashSet::from([origin]);
        let mut queue = VecDeque::from([self.clone()]);
        while let Some(node) = queue.pop_front() {
            node.emit(NodeEventKind::Aborted { origin, message: message.clone() });
            let peers: Vec<NodeHandle> = node.body().relays.values().cloned().collect();
            for peer in peers {
                if seen.insert(peer.id()) {
                    queue.push_back(peer);
                }
            }
        }
    }

    // --- persistence plumbing --------------------------------------------

    pub(crate) fn snapshot_maps(&self) -> (PropertyMap, PropertyMap, PropertyMap) {
        let body = self.body();
        (body.parameters.clone(), body.inputs.clone(), body.outputs.clone())
    }

    /// Restore one stored value by slot-name match. Unknown names warn and
    /// are skipped; `InputList` values are restored verbatim, not appended.
    pub(crate) fn restore_slot(&self, name: &str, value: Value, expected: SlotKind) {
        let slot = match self.find_slot(name) {
            Some(slot) => slot.clone(),
            None => {
                tracing::warn!(node = %self, slot = %name, "stored slot not declared, skipped");
                return;
            }
        };
        let group_matches = match expected {
            SlotKind::Input | SlotKind::InputList => {
                matches!(slot.kind, SlotKind::Input | SlotKind::InputList)
            }
            other => slot.kind == other,
        };
        if !group_matches {
            tracing::warn!(node = %self, slot = %name, "stored slot kind changed, skipped");
            return;
        }
        let mut body = self.body();
        match slot.kind {
            SlotKind::Parameter => body.parameters.insert(name.to_string(), value),
            SlotKind::Output => body.outputs.insert(name.to_string(), value),
            SlotKind::Input | SlotKind::InputList => body.inputs.insert(name.to_string(), value),
        };
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.label().is_empty() {
            write!(f, "{}[{}]", self.type_name(), &self.id().to_string()[..8])
        } else {
            write!(f, "{}({})[{}]", self.type_name(), self.label(), &self.id().to_string()[..8])
        }
    }
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeHandle")
            .field("id", &self.id())
            .field("type", &self.type_name())
            .field("label", &self.label())
            .field("state", &self.state())
            .finish()
    }
}

impl PartialEq for NodeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for NodeHandle {}

impl std::hash::Hash for NodeHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

/// Execution context handed to a node's computation. Inputs are moved in,
/// so a node may `take` them (pairs with `KeepInput=false`) or borrow them
/// (pairs with `KeepInput=true`).
pub struct RunContext {
    node_id: NodeId,
    name: String,
    inputs: PropertyMap,
    parameters: PropertyMap,
    outputs: PropertyMap,
}

impl RunContext {
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Printable node name, for diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name)
    }

    /// Move an input value out of the node.
    pub fn take_input(&mut self, name: &str) -> Option<Value> {
        self.inputs.remove(name)
    }

    /// Get required input or return error
    pub fn require_input(&self, name: &str) -> Result<&Value, NodeError> {
        self.inputs
            .get(name)
            .ok_or_else(|| NodeError::MissingInput(name.to_string()))
    }

    pub fn take_required_input(&mut self, name: &str) -> Result<Value, NodeError> {
        self.inputs
            .remove(name)
            .ok_or_else(|| NodeError::MissingInput(name.to_string()))
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    pub fn set_output(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.outputs.insert(name.into(), value.into());
    }
}


#[cfg(test)]
mod tests {
    use super::testkit::*;
    use super::*;
    use crate::connect::connect;

    #[test]
    fn readiness_tracks_every_ancestor_flag() {
        let a = probe("a");
        let b = probe("b");
        let n = probe("n");
        connect(&a, &n);
        connect(&b, &n);
        assert!(!n.all_inputs_ready());

        n.note_ancestor_finished(a.id());
        assert!(!n.all_inputs_ready());
        n.note_ancestor_finished(b.id());
        assert!(n.all_inputs_ready());

        // Flipping any single entry back breaks readiness.
        n.body().ancestors.get_mut(&a.id()).unwrap().done = false;
        assert!(!n.all_inputs_ready());
    }

    #[test]
    fn start_is_check_and_set() {
        let n = probe("n");
        assert!(n.try_start());
        assert!(!n.try_start());
        assert_eq!(n.state(), NodeState::Started);
    }

    #[test]
    fn start_refused_until_ready() {
        let a = probe("a");
        let n = probe("n");
        connect(&a, &n);
        assert!(!n.try_start());
        n.note_ancestor_finished(a.id());
        assert!(n.try_start());
    }

    #[test]
    fn defaults_are_seeded_from_the_registry() {
        let s = source("s");
        assert_eq!(s.parameter("Gain"), Some(Value::Number(1.0)));
        assert!(!s.keep_input());
        assert!(s.parallel());
    }

    #[test]
    fn apply_parameters_matches_by_exact_name() {
        let s = sink("s");
        let mut params = PropertyMap::new();
        params.insert("Gain".into(), Value::Number(3.0));
        params.insert("Value".into(), Value::Number(7.0));
        params.insert("NoSuchSlot".into(), Value::Number(0.0));
        params.insert("KeepInput".into(), Value::Bool(true));
        s.apply_parameters(params);

        assert_eq!(s.parameter("Gain"), Some(Value::Number(3.0)));
        assert_eq!(s.input("Value"), Some(Value::Number(7.0)));
        assert!(s.keep_input());
        assert!(s.parameter("NoSuchSlot").is_none());
    }

    #[test]
    fn apply_parameters_rejects_ill_typed_values() {
        let s = sink("s");
        let mut params = PropertyMap::new();
        params.insert("Gain".into(), Value::from("loud"));
        s.apply_parameters(params);
        // The default survives the ignored write.
        assert_eq!(s.parameter("Gain"), Some(Value::Number(1.0)));
    }

    #[test]
    fn input_list_slots_accumulate() {
        let s = sink("s");
        let slot = s.find_slot("Bag").unwrap().clone();
        s.write_slot(&slot, Value::Number(1.0));
        s.write_slot(&slot, Value::Number(2.0));
        assert_eq!(
            s.input("Bag"),
            Some(Value::Array(vec![Value::Number(1.0), Value::Number(2.0)]))
        );
    }

    #[test]
    fn run_computation_moves_inputs_and_writes_outputs() {
        let s = source("s");
        s.run_computation().unwrap();
        assert_eq!(s.output("Value"), Some(Value::Number(1.0)));
        assert_eq!(s.output("Extra"), Some(Value::Number(2.0)));
    }

    #[test]
    fn abort_reaches_every_relayed_node_once() {
        let a = probe("a");
        let b = probe("b");
        let c = probe("c");
        connect(&a, &b);
        connect(&b, &c);

        let mut rx_a = a.subscribe();
        let mut rx_c = c.subscribe();
        b.abort("boom");

        let got = rx_a.try_recv().unwrap();
        assert!(matches!(
            got.kind,
            NodeEventKind::Aborted { origin, ref message } if origin == b.id() && message == "boom"
        ));
        let got = rx_c.try_recv().unwrap();
        assert!(matches!(got.kind, NodeEventKind::Aborted { .. }));
        // Exactly once per node.
        assert!(rx_a.try_recv().is_err());
        assert!(rx_c.try_recv().is_err());
    }
}
