//! Storage layer: source documents under a data root, write-once result sets.

mod error;
pub use error::StoreError;

mod results;
pub use results::{ResultStore, Saved};
