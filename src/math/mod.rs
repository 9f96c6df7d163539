pub mod bounds;
pub mod segment;
