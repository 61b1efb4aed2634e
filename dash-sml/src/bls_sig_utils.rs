// Rust Dash Library
// Written for Dash in 2022 by
//     The Dash Core Developers
//
// To the extent possible under law, the author(s) have dedicated all
// copyright and related and neighboring rights to this software to
// the public domain worldwide. This software is distributed without
// any warranty.
//
// You should have received a copy of the CC0 Public Domain Dedication
// along with this software.
// If not, see <http://creativecommons.org/publicdomain/zero/1.0/>.
//

//! BLS keys and signatures as they appear on the wire.
//!
//! Both types are kept as compressed bytes so that decoding a message never
//! touches curve arithmetic. Conversion into `blsful` types happens only when a
//! quorum is actually verified, and all signatures use the basic scheme.

use std::fmt;
use std::io;

use blsful::inner_types::{G1Affine, G1Projective, G2Affine, G2Projective};
use blsful::{Bls12381G2Impl, PublicKey, Signature};

use crate::consensus::{Decodable, Encodable, encode};
use crate::sml::quorum_validation_error::QuorumValidationError;

/// A BLS public key, 48 bytes compressed G1 point.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BLSPublicKey([u8; 48]);

/// A BLS signature, 96 bytes compressed G2 point.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BLSSignature([u8; 96]);

macro_rules! impl_bls_bytes {
    ($name:ident, $len:expr) => {
        impl $name {
            pub const SIZE: usize = $len;

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn to_bytes(&self) -> [u8; $len] {
                self.0
            }

            pub fn is_zeroed(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                $name(bytes)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = encode::Error;

            fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
                let bytes: [u8; $len] = bytes
                    .try_into()
                    .map_err(|_| encode::Error::ParseFailed(concat!(stringify!($name), " has wrong length")))?;
                Ok($name(bytes))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(self.0))
            }
        }

        impl Encodable for $name {
            fn consensus_encode<W: io::Write + ?Sized>(&self, writer: &mut W) -> Result<usize, io::Error> {
                self.0.consensus_encode(writer)
            }
        }

        impl Decodable for $name {
            fn consensus_decode<R: io::Read + ?Sized>(reader: &mut R) -> Result<Self, encode::Error> {
                Ok($name(Decodable::consensus_decode(reader)?))
            }
        }
    };
}

impl_bls_bytes!(BLSPublicKey, 48);
impl_bls_bytes!(BLSSignature, 96);

impl BLSPublicKey {
    /// Decompresses the key into a curve point.
    pub fn to_g1(&self) -> Result<G1Projective, QuorumValidationError> {
        Option::<G1Affine>::from(G1Affine::from_compressed(&self.0))
            .map(G1Projective::from)
            .ok_or_else(|| QuorumValidationError::InvalidBLSPublicKey(self.to_string()))
    }

    pub fn from_g1(point: &G1Projective) -> Self {
        BLSPublicKey(G1Affine::from(point).to_compressed())
    }
}

impl BLSSignature {
    /// Decompresses the signature into a curve point.
    pub fn to_g2(&self) -> Result<G2Projective, QuorumValidationError> {
        Option::<G2Affine>::from(G2Affine::from_compressed(&self.0))
            .map(G2Projective::from)
            .ok_or_else(|| QuorumValidationError::InvalidBLSSignature(self.to_string()))
    }

    pub fn from_g2(point: &G2Projective) -> Self {
        BLSSignature(G2Affine::from(point).to_compressed())
    }

    /// Sums signatures over the same message into one aggregate.
    pub fn aggregate<'a, I>(signatures: I) -> Result<BLSSignature, QuorumValidationError>
    where
        I: IntoIterator<Item = &'a BLSSignature>,
    {
        let points = signatures
            .into_iter()
            .map(BLSSignature::to_g2)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BLSSignature::from_g2(&points.iter().sum::<G2Projective>()))
    }

    /// Verifies this signature with the basic scheme.
    pub fn verify(&self, public_key: &BLSPublicKey, message: &[u8]) -> Result<(), QuorumValidationError> {
        let public_key: PublicKey<Bls12381G2Impl> = public_key.try_into()?;
        let signature: Signature<Bls12381G2Impl> = self.try_into()?;
        signature
            .verify(&public_key, message)
            .map_err(|e| QuorumValidationError::InvalidBLSSignature(e.to_string()))
    }

    /// Verifies an aggregate of signatures that all signed `message`.
    pub fn verify_same_message_aggregate<'a, I>(
        &self,
        public_keys: I,
        message: &[u8],
    ) -> Result<(), QuorumValidationError>
    where
        I: IntoIterator<Item = &'a BLSPublicKey>,
    {
        let points = public_keys
            .into_iter()
            .map(BLSPublicKey::to_g1)
            .collect::<Result<Vec<_>, _>>()?;
        if points.is_empty() {
            return Err(QuorumValidationError::AllCommitmentAggregatedSignatureNotValid(
                "no public keys to aggregate".to_string(),
            ));
        }
        let aggregate_key = PublicKey::<Bls12381G2Impl>(points.iter().sum::<G1Projective>());
        let signature: Signature<Bls12381G2Impl> = self.try_into()?;
        signature
            .verify(&aggregate_key, message)
            .map_err(|e| QuorumValidationError::AllCommitmentAggregatedSignatureNotValid(e.to_string()))
    }
}

impl TryFrom<&BLSPublicKey> for PublicKey<Bls12381G2Impl> {
    type Error = QuorumValidationError;

    fn try_from(value: &BLSPublicKey) -> Result<Self, Self::Error> {
        Ok(PublicKey(value.to_g1()?))
    }
}

impl TryFrom<&BLSSignature> for Signature<Bls12381G2Impl> {
    type Error = QuorumValidationError;

    fn try_from(value: &BLSSignature) -> Result<Self, Self::Error> {
        Ok(Signature::Basic(value.to_g2()?))
    }
}
