pub mod ed25519;
pub mod hash;
pub mod keypair;

pub use keypair::KeyPair;
