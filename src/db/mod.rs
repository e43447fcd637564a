pub mod pool;
pub mod queries;
pub mod schema;

pub use pool::{create_store, Dialect, FeeStore};
pub use schema::discover_schema;
