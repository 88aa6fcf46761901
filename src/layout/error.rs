use thiserror::Error;

use crate::ir::NodeRef;

/// Reasons a layout call is rejected. Every variant is detected before any
/// geometry is produced, so a failed call leaves nothing half-built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("link {link} references unknown node {node}")]
    MissingReference { link: usize, node: NodeRef },

    #[error("node {name:?} does not belong to any column")]
    ColumnUnassigned { name: String },

    #[error("column {column:?} has no flow (all node values are zero)")]
    DegenerateColumn { column: String },

    #[error(
        "column {column:?} needs {required} units of padding but only {available} are available"
    )]
    ColumnOverflow {
        column: String,
        required: f64,
        available: f64,
    },

    #[error("link {link} has invalid value {value}")]
    InvalidValue { link: usize, value: f64 },
}
