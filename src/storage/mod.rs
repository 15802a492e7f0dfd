pub mod surrealdb;
pub mod traits;

pub use surrealdb::SurrealStorage;
pub use traits::StorageBackend;
