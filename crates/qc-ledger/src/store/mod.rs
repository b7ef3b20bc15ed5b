//! Transactional multi-index object store.

pub mod database;
pub mod object;
pub mod table;

pub use database::{Database, Stored, Tables};
pub(crate) use object::object_identity;
pub use object::{ChainObject, IndexKey, IndexSpec, KeyPart};
pub use table::Table;
