//! CLI command implementations

pub mod doctor;
pub mod migrate;

pub use doctor::DoctorArgs;
pub use migrate::{ToBareArgs, ToRegularArgs};
