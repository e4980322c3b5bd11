//! Request origin to namespace resolution.
//!
//! # Responsibility
//! - Map the identity of a requesting module to the partition it came from.
//! - Map that partition to the namespace its libraries are loaded into.
//!
//! # Invariants
//! - Resolution is deterministic and performs no I/O.
//! - Rules are tried in declaration order; unmatched origins use the base
//!   namespace.

pub mod partition;
