pub mod contract;
pub mod model;
pub mod token;
