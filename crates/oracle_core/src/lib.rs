//! Core cryptography and data model for the snapshot oracle
//! Key derivation against the remote MPC root key, EIP-712 hashing,
//! signature assembly and verification, snapshot construction

pub mod eip712;
pub mod kdf;
pub mod signature;
pub mod snapshot;
pub mod types;

pub use eip712::*;
pub use kdf::*;
pub use signature::*;
pub use snapshot::*;
pub use types::*;
