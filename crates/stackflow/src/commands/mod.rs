pub mod deploy;
pub mod outputs;
pub mod status;
pub mod teardown;
pub mod validate;
