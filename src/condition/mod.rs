//! Device-state conditions with edge-triggered gating.
//!
//! A reminder's `device_condition` is parsed once into a [`DeviceCondition`]. Each cycle
//! [`DeviceCondition::gate`] evaluates it against the [`DeviceRegistry`] and reports
//! "satisfied" only on a false→true transition, tracked through the reminder's latch.
//! Any parse or evaluation failure counts as `false`.

pub mod expr;
pub mod parser;

pub use expr::{Expr, ExprError};

use crate::device::DeviceRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCondition {
    /// No condition: always satisfied, latch never touched.
    Always,
    Expr(Expr),
    /// Failed to parse. Gates as permanently false.
    Invalid(ExprError),
}

impl DeviceCondition {
    pub fn parse(src: &str) -> Self {
        if src.trim().is_empty() {
            return Self::Always;
        }
        match parser::parse(src) {
            Ok(expr) => Self::Expr(expr),
            Err(e) => Self::Invalid(e),
        }
    }

    /// Evaluate the raw truth value, without gating.
    pub fn evaluate(&self, registry: &dyn DeviceRegistry) -> Result<bool, ExprError> {
        match self {
            Self::Always => Ok(true),
            Self::Invalid(e) => Err(e.clone()),
            Self::Expr(expr) => match expr.eval(registry)? {
                crate::device::Value::Bool(b) => Ok(b),
                other => Err(ExprError::NotBoolean(other.type_name())),
            },
        }
    }

    /// Edge-triggered check: `true` only on the cycle the condition turns true.
    pub fn gate(&self, latched: &mut bool, registry: &dyn DeviceRegistry) -> bool {
        if matches!(self, Self::Always) {
            return true;
        }

        let now_true = match self.evaluate(registry) {
            Ok(b) => b,
            Err(e) => {
                tracing::trace!(error = %e, "condition evaluation failed, treating as false");
                false
            }
        };

        if !now_true {
            *latched = false;
            return false;
        }
        if *latched {
            return false;
        }
        *latched = true;
        true
    }
}
