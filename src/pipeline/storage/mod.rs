pub mod warehouse;

pub use warehouse::{LoadLogEntry, TransformLogEntry, Warehouse};
