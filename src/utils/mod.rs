pub mod math;
pub mod serde;
