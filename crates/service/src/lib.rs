//! Service layer holding the garage business rules on top of `models`.
//! - `garage` is the domain module: appointment lifecycle, billing derivation
//!   and customer de-duplication, written against a persistence gateway trait.
//! - Storage backends (SeaORM, in-memory) implement that gateway.

pub mod errors;
pub mod garage;
#[cfg(test)]
pub mod test_support;
