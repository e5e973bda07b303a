//! EVM-side collaborators for the snapshot oracle
//! JSON-RPC reads against vault and token contracts across the supported
//! chains; failures here abort snapshot construction before signing

pub mod rpc;
pub mod vault;

pub use rpc::*;
pub use vault::*;
