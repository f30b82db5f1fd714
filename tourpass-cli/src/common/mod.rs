pub mod offline;
pub mod store;

pub use offline::{EstimatedDirections, FixtureContent};
pub use store::JsonFileStore;
