//! Standard node library
//!
//! Collection of built-in nodes for the demo pipeline: a seeded random
//! source and a handful of small array statistics.

mod average;
mod mean;
mod percentile;
mod pick;
mod random;

pub use average::MovingAverage;
pub use mean::Mean;
pub use percentile::Percentile;
pub use pick::ElementPicker;
pub use random::RandomNumbers;

use algocore::{NodeError, Value};
use algoruntime::NodeRegistry;
use std::sync::Arc;

/// Register all standard nodes with a registry
pub fn register_all(registry: &mut NodeRegistry) {
    registry.register(Arc::new(random::RandomNumbers));
    registry.register(Arc::new(average::MovingAverage));
    registry.register(Arc::new(percentile::Percentile));
    registry.register(Arc::new(pick::ElementPicker));
    registry.register(Arc::new(mean::Mean));
}

/// Read a slot value as a vector of numbers.
pub(crate) fn numbers(value: Option<&Value>, field: &str) -> Result<Vec<f64>, NodeError> {
    let value = value.ok_or_else(|| NodeError::MissingInput(field.to_string()))?;
    let items = value.as_array().ok_or_else(|| NodeError::InvalidInputType {
        field: field.to_string(),
        expected: "array of numbers".to_string(),
    })?;
    items
        .iter()
        .map(|item| {
            item.as_f64().ok_or_else(|| NodeError::InvalidInputType {
                field: field.to_string(),
                expected: "array of numbers".to_string(),
            })
        })
        .collect()
}
