//! Operation inputs.

use bfreg_core::BigFloat;

/// One input of a dispatched operation.
///
/// Numbers and text are promoted to temporary values with the call's
/// options before any register is bound for the call itself.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Operand<'a> {
    /// An existing value.
    Value(&'a BigFloat),
    /// A float64, ingested exactly.
    Number(f64),
    /// Text, parsed with the call's options.
    Text(&'a str),
}

impl<'a> From<&'a BigFloat> for Operand<'a> {
    fn from(v: &'a BigFloat) -> Self {
        Self::Value(v)
    }
}

impl From<f64> for Operand<'_> {
    fn from(x: f64) -> Self {
        Self::Number(x)
    }
}

impl<'a> From<&'a str> for Operand<'a> {
    fn from(s: &'a str) -> Self {
        Self::Text(s)
    }
}
