pub mod filter;
pub mod models;

pub use filter::FilterState;
pub use models::{Category, Coordinate, HelperRecord, HelperRole, RadiusKm, ResultSet};
