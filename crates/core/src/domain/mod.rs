pub mod ids;
pub mod order;
pub mod org;
