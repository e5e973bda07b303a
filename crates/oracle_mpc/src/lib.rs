//! Remote threshold-signer client for the snapshot oracle
//! One query operation (root public key) and one signing operation, plus
//! the per-request pipeline that turns a snapshot into a signed attestation

pub mod client;
pub mod gateway;

pub use client::*;
pub use gateway::*;
