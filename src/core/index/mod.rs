pub mod database;
pub mod model;

pub use database::ModIndex;
pub use model::{FileDescriptor, ModEntry};
