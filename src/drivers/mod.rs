//! Reader drivers and task placement.

#[cfg(target_os = "espidf")]
pub mod rc522;
pub mod sim_reader;
pub mod task_pin;
