pub mod cache;
pub mod tasks;
pub mod timer;
