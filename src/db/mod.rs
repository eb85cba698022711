mod memory;
mod models;
mod schema;
mod sql;

pub use memory::MemoryStore;
pub use sql::DbStore;
