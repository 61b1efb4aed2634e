// Rust Dash Library
// Written in 2014 by
//     Andrew Poelstra <apoelstra@wpsoftware.net>
// Updated for Dash in 2025 by
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

//! Dash consensus-encodable types.
//!
//! Everything that travels in a `mnlistdiff` or `qrinfo` message implements
//! [`Encodable`] and [`Decodable`]. Decoding is bounds checked: a peer-supplied
//! count is validated against [`MAX_VEC_SIZE`] before anything proportional to it
//! is allocated.

use std::io::{self, Cursor, Read, Write};

use thiserror::Error;

/// Maximum size, in bytes, of a vector we are allowed to decode.
pub const MAX_VEC_SIZE: usize = 4_000_000;

/// Encoding error.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error, including a short read.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Tried to allocate an oversized vector.
    #[error("allocation of oversized vector: requested {requested}, maximum {max}")]
    OversizedVectorAllocation {
        /// The capacity requested.
        requested: usize,
        /// The maximum capacity.
        max: usize,
    },
    /// VarInt was encoded in a non-minimal way.
    #[error("non-minimal varint")]
    NonMinimalVarInt,
    /// The LLMQ type byte does not name a known quorum type.
    #[error("unknown LLMQ type {0}")]
    UnknownLLMQType(u8),
    /// The skip list mode of a quorum snapshot is out of range.
    #[error("unknown quorum snapshot skip list mode {0}")]
    UnknownSkipListMode(i32),
    /// Bytes were left over after decoding a whole message.
    #[error("data not consumed entirely when explicitly deserializing")]
    DataNotConsumed,
    /// Parsing error.
    #[error("parse failed: {0}")]
    ParseFailed(&'static str),
}

impl Error {
    /// True when the input simply ended early.
    pub fn is_short_read(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}

/// Encodes an object into a vector.
pub fn serialize<T: Encodable + ?Sized>(data: &T) -> Vec<u8> {
    let mut encoder = Vec::new();
    let len = data.consensus_encode(&mut encoder).expect("in-memory writers don't error");
    debug_assert_eq!(len, encoder.len());
    encoder
}

/// Encodes an object into a hex-encoded string.
pub fn serialize_hex<T: Encodable + ?Sized>(data: &T) -> String {
    hex::encode(serialize(data))
}

/// Deserializes an object from a vector, will error if said deserialization
/// doesn't consume the entire vector.
pub fn deserialize<T: Decodable>(data: &[u8]) -> Result<T, Error> {
    let (rv, consumed) = deserialize_partial(data)?;

    if consumed == data.len() {
        Ok(rv)
    } else {
        Err(Error::DataNotConsumed)
    }
}

/// Deserializes an object from a vector, but will not report an error if said
/// deserialization doesn't consume the entire vector.
pub fn deserialize_partial<T: Decodable>(data: &[u8]) -> Result<(T, usize), Error> {
    let mut decoder = Cursor::new(data);
    let rv = Decodable::consensus_decode(&mut decoder)?;
    let consumed = decoder.position() as usize;

    Ok((rv, consumed))
}

/// Data which can be encoded in a consensus-consistent way.
pub trait Encodable {
    /// Encodes an object with a well-defined format.
    ///
    /// Returns the number of bytes written on success. The only errors returned
    /// are errors propagated from the writer.
    fn consensus_encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, io::Error>;
}

/// Data which can be decoded in a consensus-consistent way.
pub trait Decodable: Sized {
    /// Decodes an object with a well-defined format.
    fn consensus_decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, Error>;
}

/// A variable-length unsigned integer.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct VarInt(pub u64);

impl VarInt {
    /// Gets the length of this VarInt when encoded.
    ///
    /// Returns 1 for 0..=0xFC, 3 for 0xFD..=(2^16-1), 5 for 0x10000..=(2^32-1),
    /// and 9 otherwise.
    #[inline]
    pub const fn len(&self) -> usize {
        match self.0 {
            0..=0xFC => 1,
            0xFD..=0xFFFF => 3,
            0x10000..=0xFFFFFFFF => 5,
            _ => 9,
        }
    }
}

impl Encodable for VarInt {
    #[inline]
    fn consensus_encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, io::Error> {
        match self.0 {
            0..=0xFC => {
                (self.0 as u8).consensus_encode(writer)?;
                Ok(1)
            }
            0xFD..=0xFFFF => {
                writer.write_all(&[0xFD])?;
                (self.0 as u16).consensus_encode(writer)?;
                Ok(3)
            }
            0x10000..=0xFFFFFFFF => {
                writer.write_all(&[0xFE])?;
                (self.0 as u32).consensus_encode(writer)?;
                Ok(5)
            }
            _ => {
                writer.write_all(&[0xFF])?;
                self.0.consensus_encode(writer)?;
                Ok(9)
            }
        }
    }
}

impl Decodable for VarInt {
    #[inline]
    fn consensus_decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, Error> {
        let n = u8::consensus_decode(reader)?;
        match n {
            0xFF => {
                let x = u64::consensus_decode(reader)?;
                if x < 0x100000000 {
                    Err(Error::NonMinimalVarInt)
                } else {
                    Ok(VarInt(x))
                }
            }
            0xFE => {
                let x = u32::consensus_decode(reader)?;
                if x < 0x10000 {
                    Err(Error::NonMinimalVarInt)
                } else {
                    Ok(VarInt(x as u64))
                }
            }
            0xFD => {
                let x = u16::consensus_decode(reader)?;
                if x < 0xFD {
                    Err(Error::NonMinimalVarInt)
                } else {
                    Ok(VarInt(x as u64))
                }
            }
            n => Ok(VarInt(n as u64)),
        }
    }
}

macro_rules! impl_int_encodable {
    ($ty:ident) => {
        impl Decodable for $ty {
            #[inline]
            fn consensus_decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, Error> {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                reader.read_exact(&mut buf)?;
                Ok($ty::from_le_bytes(buf))
            }
        }
        impl Encodable for $ty {
            #[inline]
            fn consensus_encode<W: Write + ?Sized>(
                &self,
                writer: &mut W,
            ) -> Result<usize, io::Error> {
                writer.write_all(&self.to_le_bytes())?;
                Ok(std::mem::size_of::<$ty>())
            }
        }
    };
}

impl_int_encodable!(u8);
impl_int_encodable!(u16);
impl_int_encodable!(u32);
impl_int_encodable!(u64);
impl_int_encodable!(i16);
impl_int_encodable!(i32);
impl_int_encodable!(i64);

impl Encodable for bool {
    #[inline]
    fn consensus_encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, io::Error> {
        (*self as u8).consensus_encode(writer)
    }
}

impl Decodable for bool {
    #[inline]
    fn consensus_decode<R: Read + ?Sized>(reader: &mut R) -> Result<bool, Error> {
        u8::consensus_decode(reader).map(|n| n != 0)
    }
}

impl<const N: usize> Encodable for [u8; N] {
    #[inline]
    fn consensus_encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, io::Error> {
        writer.write_all(&self[..])?;
        Ok(N)
    }
}

impl<const N: usize> Decodable for [u8; N] {
    #[inline]
    fn consensus_decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, Error> {
        let mut ret = [0; N];
        reader.read_exact(&mut ret)?;
        Ok(ret)
    }
}

/// Checks that `count` elements of `elem_size` bytes each stay under [`MAX_VEC_SIZE`].
#[inline]
pub fn check_vec_allocation(count: u64, elem_size: usize) -> Result<usize, Error> {
    let requested = usize::try_from(count)
        .ok()
        .and_then(|count| count.checked_mul(elem_size.max(1)))
        .unwrap_or(usize::MAX);
    if requested > MAX_VEC_SIZE {
        return Err(Error::OversizedVectorAllocation {
            requested,
            max: MAX_VEC_SIZE,
        });
    }
    Ok(count as usize)
}

impl<T: Encodable> Encodable for Vec<T> {
    #[inline]
    fn consensus_encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, io::Error> {
        let mut len = VarInt(self.len() as u64).consensus_encode(writer)?;
        for item in self.iter() {
            len += item.consensus_encode(writer)?;
        }
        Ok(len)
    }
}

impl<T: Decodable> Decodable for Vec<T> {
    #[inline]
    fn consensus_decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, Error> {
        let count = VarInt::consensus_decode(reader)?.0;
        let count = check_vec_allocation(count, std::mem::size_of::<T>())?;
        let mut ret = Vec::with_capacity(count);
        for _ in 0..count {
            ret.push(Decodable::consensus_decode(reader)?);
        }
        Ok(ret)
    }
}

/// Writes a length-prefixed byte string.
pub fn write_var_bytes<W: Write + ?Sized>(writer: &mut W, bytes: &[u8]) -> Result<usize, io::Error> {
    let len = VarInt(bytes.len() as u64).consensus_encode(writer)?;
    writer.write_all(bytes)?;
    Ok(len + bytes.len())
}

/// Reads a length-prefixed byte string.
pub fn read_var_bytes<R: Read + ?Sized>(reader: &mut R) -> Result<Vec<u8>, Error> {
    let count = VarInt::consensus_decode(reader)?.0;
    let count = check_vec_allocation(count, 1)?;
    let mut ret = vec![0u8; count];
    reader.read_exact(&mut ret)?;
    Ok(ret)
}

/// Writes a compact size, the u32 flavour of [`VarInt`] used for bitset lengths.
pub fn write_compact_size<W: Write + ?Sized>(writer: &mut W, value: u32) -> Result<usize, io::Error> {
    VarInt(value as u64).consensus_encode(writer)
}

/// Reads a compact size, rejecting values that do not fit in a u32.
pub fn read_compact_size<R: Read + ?Sized>(reader: &mut R) -> Result<u32, Error> {
    let value = VarInt::consensus_decode(reader)?.0;
    u32::try_from(value).map_err(|_| Error::ParseFailed("compact size exceeds u32"))
}

/// Reads `size` bits packed least significant bit first into `(size + 7) / 8` bytes.
pub fn read_fixed_bitset<R: Read + ?Sized>(reader: &mut R, size: usize) -> Result<Vec<bool>, Error> {
    let num_bytes = check_vec_allocation(size.div_ceil(8) as u64, 1)?;
    let mut bytes = vec![0u8; num_bytes];
    reader.read_exact(&mut bytes)?;
    Ok((0..size).map(|i| bytes[i / 8] & (1 << (i % 8)) != 0).collect())
}

/// Writes a bitset packed least significant bit first. The length is not written.
pub fn write_fixed_bitset<W: Write + ?Sized>(writer: &mut W, bits: &[bool]) -> Result<usize, io::Error> {
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (i, bit) in bits.iter().enumerate() {
        if *bit {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    writer.write_all(&bytes)?;
    Ok(bytes.len())
}

/// Reads a compact-size prefixed bitset of at most `max_bits` bits.
///
/// Bits are unpacked one per byte, so the declared size is checked against the
/// caller's bound before anything is read.
pub fn read_compact_bitset<R: Read + ?Sized>(reader: &mut R, max_bits: usize) -> Result<Vec<bool>, Error> {
    let size = read_compact_size(reader)? as usize;
    if size > max_bits {
        return Err(Error::OversizedVectorAllocation {
            requested: size,
            max: max_bits,
        });
    }
    read_fixed_bitset(reader, size)
}

/// Writes a compact-size prefixed bitset.
pub fn write_compact_bitset<W: Write + ?Sized>(writer: &mut W, bits: &[bool]) -> Result<usize, io::Error> {
    let mut len = write_compact_size(writer, bits.len() as u32)?;
    len += write_fixed_bitset(writer, bits)?;
    Ok(len)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn serialize_varint_test() {
        assert_eq!(serialize(&VarInt(10)), vec![10u8]);
        assert_eq!(serialize(&VarInt(0xFC)), vec![0xFCu8]);
        assert_eq!(serialize(&VarInt(0xFD)), vec![0xFDu8, 0xFD, 0]);
        assert_eq!(serialize(&VarInt(0xFFF)), vec![0xFDu8, 0xFF, 0xF]);
        assert_eq!(serialize(&VarInt(0xF0F0F0F)), vec![0xFEu8, 0xF, 0xF, 0xF, 0xF]);
        assert_eq!(
            serialize(&VarInt(0xF0F0F0F0F0E0)),
            vec![0xFFu8, 0xE0, 0xF0, 0xF0, 0xF0, 0xF0, 0xF0, 0, 0]
        );
        assert_eq!(VarInt(0xF0F0F0F0F0E0).len(), 9);
    }

    #[test]
    fn deserialize_nonminimal_varint() {
        assert_matches!(
            deserialize::<VarInt>(&[0xfd, 0x00, 0x00]),
            Err(Error::NonMinimalVarInt)
        );
        assert_matches!(
            deserialize::<VarInt>(&[0xfe, 0xff, 0x00, 0x00, 0x00]),
            Err(Error::NonMinimalVarInt)
        );
        assert_matches!(
            deserialize::<VarInt>(&[0xff, 0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00]),
            Err(Error::NonMinimalVarInt)
        );
    }

    #[test]
    fn oversized_vec_is_rejected_before_allocation() {
        // claims 0x10000000 32-byte entries
        let data = [0xfe, 0x00, 0x00, 0x00, 0x10];
        assert_matches!(
            deserialize::<Vec<[u8; 32]>>(&data),
            Err(Error::OversizedVectorAllocation { .. })
        );
        assert_matches!(
            read_var_bytes(&mut Cursor::new(&[0xfe, 0x00, 0x00, 0x00, 0x10][..])),
            Err(Error::OversizedVectorAllocation { .. })
        );
    }

    #[test]
    fn bitset_longer_than_its_bound_is_rejected() {
        // 9 bits declared, packed into two bytes
        let data = [0x09, 0xff, 0x01];
        assert_matches!(
            read_compact_bitset(&mut Cursor::new(&data[..]), 8),
            Err(Error::OversizedVectorAllocation { requested: 9, max: 8 })
        );
        let bits = read_compact_bitset(&mut Cursor::new(&data[..]), 9).unwrap();
        assert_eq!(bits, vec![true; 9]);
    }

    #[test]
    fn short_read_is_io_error() {
        let err = deserialize::<[u8; 32]>(&[0u8; 31]).unwrap_err();
        assert!(err.is_short_read());
        assert_matches!(deserialize::<u32>(&[1, 2]), Err(Error::Io(_)));
    }

    #[test]
    fn leftover_bytes_are_rejected() {
        assert_matches!(deserialize::<u16>(&[1, 2, 3]), Err(Error::DataNotConsumed));
        let (value, consumed) = deserialize_partial::<u16>(&[1, 2, 3]).unwrap();
        assert_eq!(value, 0x0201);
        assert_eq!(consumed, 2);
    }

    #[test]
    fn bitset_packing_is_lsb_first() {
        let bits = vec![true, false, false, true, false, false, false, false, true, true];
        let mut buf = Vec::new();
        let len = write_compact_bitset(&mut buf, &bits).unwrap();
        assert_eq!(len, 3);
        assert_eq!(buf, vec![10, 0b0000_1001, 0b0000_0011]);

        let decoded = read_compact_bitset(&mut Cursor::new(&buf), bits.len()).unwrap();
        assert_eq!(decoded, bits);
    }

    #[test]
    fn bool_decodes_any_nonzero_as_true() {
        assert!(deserialize::<bool>(&[2]).unwrap());
        assert!(!deserialize::<bool>(&[0]).unwrap());
    }
}
