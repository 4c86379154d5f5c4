//! API handlers module

pub mod form;
pub mod health;
pub mod materials;
pub mod progress;
pub mod publications;
pub mod research;
