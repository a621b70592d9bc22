use crate::numbers;
use algocore::{NodeError, NodeType, RunContext, SlotDef, Value, ValueType};

/// Percentile of an array: sorts the input ascending and picks the element
/// at index `floor(order * len / 100)`.
pub struct Percentile;

impl NodeType for Percentile {
    fn type_name(&self) -> &str {
        "stats.percentile"
    }

    fn slots(&self) -> Vec<SlotDef> {
        vec![
            SlotDef::input("Array", ValueType::Array),
            SlotDef::parameter("Order", ValueType::Number, Value::from(50i64)),
            SlotDef::output("Percentile", ValueType::Number),
        ]
    }

    fn run(&self, ctx: &mut RunContext) -> Result<(), NodeError> {
        // Move the input array in order to sort it in place.
        let input = ctx.take_input("Array");
        let mut values = numbers(input.as_ref(), "Array")?;
        if values.is_empty() {
            return Err(NodeError::validation("input is empty"));
        }
        let order = ctx.parameter("Order").and_then(Value::as_f64).unwrap_or(50.0);
        if !(0.0..100.0).contains(&order) {
            return Err(NodeError::validation("order must be in [0, 100)"));
        }
        values.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let index = (order * values.len() as f64 / 100.0).floor() as usize;
        ctx.set_output("Percentile", values[index]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use algocore::{NodeHandle, PropertyMap};
    use std::sync::Arc;

    fn percentile(input: Vec<f64>, order: i64) -> NodeHandle {
        let node = NodeHandle::new(Arc::new(Percentile), "pct");
        let mut params = PropertyMap::new();
        params.insert("Array".into(), Value::from(input));
        params.insert("Order".into(), Value::from(order));
        node.apply_parameters(params);
        node
    }

    #[test]
    fn picks_from_the_sorted_array() {
        let node = percentile(vec![3.0, 1.0, 2.0], 50);
        node.run_computation().unwrap();
        // sorted [1, 2, 3], index floor(50 * 3 / 100) = 1
        assert_eq!(node.output("Percentile"), Some(Value::Number(2.0)));
    }

    #[test]
    fn empty_input_fails_validation_and_writes_nothing() {
        let node = percentile(Vec::new(), 50);
        let err = node.run_computation().unwrap_err();
        assert!(matches!(err, NodeError::Validation(_)));
        assert!(node.output("Percentile").is_none());
    }

    #[test]
    fn out_of_range_order_fails_validation() {
        let node = percentile(vec![1.0, 2.0], 100);
        assert!(matches!(
            node.run_computation().unwrap_err(),
            NodeError::Validation(_)
        ));
    }
}
