use crate::numbers;
use algocore::{NodeError, NodeType, RunContext, SlotDef, Value, ValueType};

/// Arithmetic mean of an accumulating input: every finished parent appends
/// one element, so the node averages across all of its parents.
pub struct Mean;

impl NodeType for Mean {
    fn type_name(&self) -> &str {
        "stats.mean"
    }

    fn slots(&self) -> Vec<SlotDef> {
        vec![
            SlotDef::input_list("Array", ValueType::Number),
            SlotDef::output("Mean", ValueType::Number),
        ]
    }

    fn run(&self, ctx: &mut RunContext) -> Result<(), NodeError> {
        let values = numbers(ctx.input("Array"), "Array")?;
        if values.is_empty() {
            return Err(NodeError::validation("input is empty"));
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        ctx.set_output("Mean", mean);
        Ok(())
    }
}
