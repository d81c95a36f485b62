pub mod analyze;
pub mod audit;
