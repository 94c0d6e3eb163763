pub mod log;
pub mod memory;
pub mod queue;
