pub mod aggregator;
pub mod pricing;
pub mod quota;
