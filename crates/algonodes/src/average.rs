use crate::numbers;
use algocore::{NodeError, NodeType, RunContext, SlotDef, Value, ValueType};

/// Moving average over a sliding window. An input of length `n` with window
/// `w` yields `n - w` outputs, the k-th being the mean of elements
/// `k .. k + w`.
pub struct MovingAverage;

impl NodeType for MovingAverage {
    fn type_name(&self) -> &str {
        "stats.moving_average"
    }

    fn slots(&self) -> Vec<SlotDef> {
        vec![
            SlotDef::input("Array", ValueType::Array),
            SlotDef::parameter("Size", ValueType::Number, Value::from(3i64)),
            SlotDef::output("Array", ValueType::Array),
        ]
    }

    fn run(&self, ctx: &mut RunContext) -> Result<(), NodeError> {
        // Move the input array, no need to copy it.
        let input = ctx.take_input("Array");
        let values = numbers(input.as_ref(), "Array")?;
        if values.is_empty() {
            return Err(NodeError::validation("input is empty"));
        }
        let size = ctx.parameter("Size").and_then(Value::as_i64).unwrap_or(3);
        if size <= 0 {
            return Err(NodeError::validation("window size must be positive"));
        }
        let size = size as usize;
        if values.len() < size {
            return Err(NodeError::validation("window does not fit the input"));
        }

        let output: Vec<f64> = (0..values.len() - size)
            .map(|k| values[k..k + size].iter().sum::<f64>() / size as f64)
            .collect();
        ctx.set_output("Array", Value::from(output));
        Ok(())
    }
}
