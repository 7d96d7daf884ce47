//! Random method table and host dispatch.
//!
//! Models the host library's pluggable random method: a table of six
//! slots, each either served by the entropy adapter, delegated to the
//! software generator, or left unset.

mod engine;
mod table;

pub use crate::adapter::Capability;
pub use engine::{return_code, RandEngine, RandMethod};
pub use table::{MethodTable, Provider, Slot};
