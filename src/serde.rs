//! Serde extensions

mod color;
