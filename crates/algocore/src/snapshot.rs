//! Slot persistence. A node's current slot values are written as three
//! name-value maps; loading applies them purely by slot-name match, so a
//! snapshot survives slot reordering but not renaming.

use crate::error::GraphError;
use crate::node::NodeHandle;
use crate::slot::SlotKind;
use crate::value::PropertyMap;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Serialized form of a node's slot values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotSnapshot {
    pub parameters: PropertyMap,
    pub inputs: PropertyMap,
    pub outputs: PropertyMap,
}

/// Capture the node's current slot values.
pub fn snapshot(node: &NodeHandle) -> SlotSnapshot {
    let (parameters, inputs, outputs) = node.snapshot_maps();
    SlotSnapshot { parameters, inputs, outputs }
}

/// Write the node's slot values to a byte stream.
pub fn save_slots<W: Write>(node: &NodeHandle, writer: W) -> Result<(), GraphError> {
    serde_json::to_writer(writer, &snapshot(node))?;
    Ok(())
}

/// Load slot values from a byte stream, matching each stored entry to a
/// declared slot by name. Unknown names are skipped with a warning.
pub fn load_slots<R: Read>(node: &NodeHandle, reader: R) -> Result<(), GraphError> {
    let snapshot: SlotSnapshot = serde_json::from_reader(reader)?;
    for (name, value) in snapshot.parameters {
        node.restore_slot(&name, value, SlotKind::Parameter);
    }
    for (name, value) in snapshot.inputs {
        node.restore_slot(&name, value, SlotKind::Input);
    }
    for (name, value) in snapshot.outputs {
        node.restore_slot(&name, value, SlotKind::Output);
    }
    Ok(())
}
