pub mod event;
pub mod plan;
pub mod result;
pub mod task;
