//! Request queue model and stores.

mod models;
mod sheet;

pub use models::*;
pub use sheet::{JsonFileSheet, MemorySheet, RequestSheet};
