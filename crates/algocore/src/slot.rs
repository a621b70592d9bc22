use crate::value::Value;

/// Name of the built-in parameter controlling input retention.
pub const KEEP_INPUT: &str = "KeepInput";
/// Name of the built-in parameter deciding how a node launches its descendants.
pub const PARALLEL_EXECUTION: &str = "ParallelExecution";
/// Reserved factory key holding a node's propagation-rule table.
pub const PROPAGATION_RULES: &str = "PropagationRules";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Input,
    /// Input that appends each arriving value into an array, so a node with
    /// several parents accumulates all of their outputs.
    InputList,
    Output,
    Parameter,
}

/// Declared payload type of a slot. For `InputList` slots this is the
/// element type, not the array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Bool,
    Number,
    String,
    Bytes,
    Json,
    Array,
    Object,
    Any,
}

impl ValueType {
    pub fn admits(&self, value: &Value) -> bool {
        match self {
            ValueType::Bool => matches!(value, Value::Bool(_)),
            ValueType::Number => matches!(value, Value::Number(_)),
            ValueType::String => matches!(value, Value::String(_)),
            ValueType::Bytes => matches!(value, Value::Bytes(_)),
            ValueType::Json => matches!(value, Value::Json(_)),
            ValueType::Array => matches!(value, Value::Array(_)),
            ValueType::Object => matches!(value, Value::Object(_)),
            ValueType::Any => true,
        }
    }
}

/// One entry of a node type's slot registry. The registry is resolved once
/// per node at creation and inspected by name at runtime by the factory and
/// the propagation bus.
#[derive(Debug, Clone)]
pub struct SlotDef {
    pub name: &'static str,
    pub kind: SlotKind,
    pub ty: ValueType,
    pub default: Option<Value>,
}

impl SlotDef {
    pub fn input(name: &'static str, ty: ValueType) -> Self {
        Self { name, kind: SlotKind::Input, ty, default: None }
    }

    pub fn input_list(name: &'static str, element: ValueType) -> Self {
        Self { name, kind: SlotKind::InputList, ty: element, default: None }
    }

    pub fn output(name: &'static str, ty: ValueType) -> Self {
        Self { name, kind: SlotKind::Output, ty, default: None }
    }

    pub fn parameter(name: &'static str, ty: ValueType, default: Value) -> Self {
        Self { name, kind: SlotKind::Parameter, ty, default: Some(default) }
    }

    /// Whether the slot can receive a value from the factory or the bus.
    pub fn is_writable(&self) -> bool {
        matches!(self.kind, SlotKind::Input | SlotKind::InputList | SlotKind::Parameter)
    }
}

/// Parameters every node carries regardless of its declared slots.
pub fn builtin_slots() -> Vec<SlotDef> {
    vec![
        SlotDef::parameter(KEEP_INPUT, ValueType::Bool, Value::Bool(false)),
        SlotDef::parameter(PARALLEL_EXECUTION, ValueType::Bool, Value::Bool(true)),
    ]
}
