//! Shared data model for keeper level scripts.
//!
//! Holds the static symbol tables used by the script front end, the serde
//! level definitions that populate the name catalogs, and validation of those
//! definitions.

pub mod catalog;
pub mod defs;
pub mod symbols;
pub mod validate;

pub use catalog::SymbolCatalog;
pub use defs::*;
pub use symbols::*;
pub use validate::{ValidationError, validate_level};
