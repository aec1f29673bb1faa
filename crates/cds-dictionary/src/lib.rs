//! CDS resource dictionary.
//!
//! The dictionary is the read-only store of [`ResourceDefinition`]s that the
//! resolver consults to find how each resource assignment is sourced.
//!
//! [`ResourceDefinition`]: cds_config::ResourceDefinition

mod dictionary;
mod error;
mod fs_dictionary;
mod memory;

pub use dictionary::{DictionaryLookup, ResourceDictionary};
pub use error::DictionaryError;
pub use fs_dictionary::FsResourceDictionary;
pub use memory::InMemoryDictionary;
