pub mod health;
pub mod plans;
pub mod tasks;
