pub mod quota;
pub mod response;
pub mod usage;
