use algocore::{NodeError, NodeType, RunContext, SlotDef, Value, ValueType};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Produces a reproducible array of uniform random numbers in `[0, 1)`.
pub struct RandomNumbers;

impl NodeType for RandomNumbers {
    fn type_name(&self) -> &str {
        "source.random"
    }

    fn slots(&self) -> Vec<SlotDef> {
        vec![
            SlotDef::parameter("Amount", ValueType::Number, Value::from(10i64)),
            SlotDef::parameter("Seed", ValueType::Number, Value::from(0i64)),
            SlotDef::output("Numbers", ValueType::Array),
        ]
    }

    fn run(&self, ctx: &mut RunContext) -> Result<(), NodeError> {
        let amount = ctx.parameter("Amount").and_then(Value::as_i64).unwrap_or(10);
        if amount <= 0 {
            return Err(NodeError::validation("amount must be positive"));
        }
        let seed = ctx.parameter("Seed").and_then(Value::as_i64).unwrap_or(0) as u64;
        let mut rng = StdRng::seed_from_u64(seed);
        let numbers: Vec<f64> = (0..amount).map(|_| rng.gen::<f64>()).collect();
        ctx.set_output("Numbers", Value::from(numbers));
        Ok(())
    }
}
