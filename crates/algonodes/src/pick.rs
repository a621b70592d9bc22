use crate::numbers;
use algocore::{NodeError, NodeType, RunContext, SlotDef, Value, ValueType};

/// Picks one element of an array by position.
pub struct ElementPicker;

impl NodeType for ElementPicker {
    fn type_name(&self) -> &str {
        "array.pick"
    }

    fn slots(&self) -> Vec<SlotDef> {
        vec![
            SlotDef::input("Array", ValueType::Array),
            SlotDef::parameter("Position", ValueType::Number, Value::from(0i64)),
            SlotDef::output("PickedElement", ValueType::Number),
        ]
    }

    fn run(&self, ctx: &mut RunContext) -> Result<(), NodeError> {
        let values = numbers(ctx.input("Array"), "Array")?;
        if values.is_empty() {
            return Err(NodeError::validation("input is empty"));
        }
        let position = ctx.parameter("Position").and_then(Value::as_i64).unwrap_or(0);
        if position < 0 || position as usize >= values.len() {
            return Err(NodeError::validation("position is out of range"));
        }
        ctx.set_output("PickedElement", values[position as usize]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use algocore::{NodeHandle, PropertyMap};
    use std::sync::Arc;

    fn picker(input: Vec<f64>, position: i64) -> NodeHandle {
        let node = NodeHandle::new(Arc::new(ElementPicker), "pick");
        let mut params = PropertyMap::new();
        params.insert("Array".into(), Value::from(input));
        params.insert("Position".into(), Value::from(position));
        node.apply_parameters(params);
        node
    }

    #[test]
    fn picks_by_position() {
        let node = picker(vec![10.0, 20.0, 30.0], 1);
        node.run_computation().unwrap();
        assert_eq!(node.output("PickedElement"), Some(Value::Number(20.0)));
    }

    #[test]
    fn out_of_range_position_fails_validation() {
        let node = picker(vec![10.0, 20.0], 2);
        assert!(matches!(
            node.run_computation().unwrap_err(),
            NodeError::Validation(_)
        ));
        assert!(node.output("PickedElement").is_none());
    }
}
