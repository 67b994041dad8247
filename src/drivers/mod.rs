//! Pin bindings and peripheral drivers.

pub mod binding;
pub mod stepper;
