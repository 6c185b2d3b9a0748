mod error;
pub mod models;
mod pool;
mod store;

pub use error::*;
pub use pool::*;
pub use store::StateStore;
