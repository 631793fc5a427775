//! HTTP endpoint handlers, one module per resource.

pub mod classify;
pub mod health;
pub mod history;
