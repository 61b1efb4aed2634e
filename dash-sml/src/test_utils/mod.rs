//! Deterministic fixtures for tests of this crate and of its dependents.
//!
//! Keys are derived from small integer seeds, so the same masternode, quorum or
//! diff is produced on every run.

mod blockhash;
mod diff;
mod header_chain;
mod masternode;
mod quorum;

use blsful::{Bls12381G2Impl, SecretKey, Signature, SignatureSchemes};

pub use self::diff::DiffBuilder;
pub use self::header_chain::TestHeaderChain;
pub use self::masternode::TestMasternode;
pub use self::quorum::TestQuorum;
use crate::bls_sig_utils::{BLSPublicKey, BLSSignature};

/// A BLS secret key derived from `seed`.
pub fn secret_key(seed: &[u8]) -> SecretKey<Bls12381G2Impl> {
    SecretKey::<Bls12381G2Impl>::from_hash(seed)
}

pub fn public_key(secret_key: &SecretKey<Bls12381G2Impl>) -> BLSPublicKey {
    BLSPublicKey::from_g1(&secret_key.public_key().0)
}

/// Signs `message` with the basic scheme.
pub fn sign(secret_key: &SecretKey<Bls12381G2Impl>, message: &[u8]) -> BLSSignature {
    match secret_key.sign(SignatureSchemes::Basic, message) {
        Ok(Signature::Basic(point)) => BLSSignature::from_g2(&point),
        other => panic!("basic signing failed: {:?}", other.err()),
    }
}
