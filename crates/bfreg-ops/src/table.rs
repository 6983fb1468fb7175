//! The static operation table.
//!
//! Every kernel arithmetic entry point is described by one [`OpSpec`].
//! [`OpTable`] indexes them by name; dispatch itself is a single generic
//! routine driven by these records.

use indexmap::IndexMap;

use crate::error::DispatchError;

/// Shape of one kernel entry point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpSpec {
    /// Entry point name.
    pub name: &'static str,
    /// Number of value inputs (0, 1 or 2).
    pub inputs: usize,
    /// Number of value outputs (1 or 2).
    pub outputs: usize,
}

impl OpSpec {
    const fn new(name: &'static str, inputs: usize, outputs: usize) -> Self {
        Self {
            name,
            inputs,
            outputs,
        }
    }

    /// Registers a single call needs.
    pub fn registers(&self) -> usize {
        self.inputs + self.outputs
    }
}

/// Every entry point the dispatcher knows.
pub static OPS: &[OpSpec] = &[
    OpSpec::new("const_log2", 0, 1),
    OpSpec::new("const_pi", 0, 1),
    OpSpec::new("sqrt", 1, 1),
    OpSpec::new("exp", 1, 1),
    OpSpec::new("log", 1, 1),
    OpSpec::new("cos", 1, 1),
    OpSpec::new("sin", 1, 1),
    OpSpec::new("tan", 1, 1),
    OpSpec::new("acos", 1, 1),
    OpSpec::new("asin", 1, 1),
    OpSpec::new("atan", 1, 1),
    OpSpec::new("add", 2, 1),
    OpSpec::new("sub", 2, 1),
    OpSpec::new("mul", 2, 1),
    OpSpec::new("div", 2, 1),
    OpSpec::new("fmod", 2, 1),
    OpSpec::new("remainder", 2, 1),
    OpSpec::new("logic_or", 2, 1),
    OpSpec::new("logic_xor", 2, 1),
    OpSpec::new("logic_and", 2, 1),
    OpSpec::new("pow", 2, 1),
    OpSpec::new("atan2", 2, 1),
    OpSpec::new("divrem", 2, 2),
];

/// Name-indexed view of [`OPS`].
#[derive(Clone, Debug)]
pub struct OpTable {
    ops: IndexMap<&'static str, &'static OpSpec>,
}

impl OpTable {
    /// Index the built-in table.
    pub fn builtin() -> Self {
        Self {
            ops: OPS.iter().map(|op| (op.name, op)).collect(),
        }
    }

    /// Look up `name`.
    pub fn get(&self, name: &str) -> Result<&'static OpSpec, DispatchError> {
        self.ops
            .get(name)
            .copied()
            .ok_or_else(|| DispatchError::UnknownOp {
                name: name.to_string(),
            })
    }

    /// Number of entry points.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Entry points in table order.
    pub fn iter(&self) -> impl Iterator<Item = &'static OpSpec> + '_ {
        self.ops.values().copied()
    }
}

impl Default for OpTable {
    fn default() -> Self {
        Self::builtin()
    }
}
