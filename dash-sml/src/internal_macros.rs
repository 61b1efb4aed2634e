//! Internal macros.
//!
//! Macros meant to be used inside the crate only.

/// Implements `Encodable` and `Decodable` for a struct by encoding its fields in order.
macro_rules! impl_consensus_encoding {
    ($thing:ident, $($field:ident),+) => {
        impl $crate::consensus::Encodable for $thing {
            #[inline]
            fn consensus_encode<W: std::io::Write + ?Sized>(
                &self,
                writer: &mut W,
            ) -> Result<usize, std::io::Error> {
                let mut len = 0;
                $(len += $crate::consensus::Encodable::consensus_encode(&self.$field, writer)?;)+
                Ok(len)
            }
        }

        impl $crate::consensus::Decodable for $thing {
            #[inline]
            fn consensus_decode<R: std::io::Read + ?Sized>(
                reader: &mut R,
            ) -> Result<$thing, $crate::consensus::encode::Error> {
                Ok($thing {
                    $($field: $crate::consensus::Decodable::consensus_decode(reader)?),+
                })
            }
        }
    };
}
pub(crate) use impl_consensus_encoding;

/// Implements consensus encoding for a hash newtype as its 32 raw bytes.
macro_rules! impl_hashencode {
    ($hashtype:ident) => {
        impl $crate::consensus::Encodable for $hashtype {
            fn consensus_encode<W: std::io::Write + ?Sized>(
                &self,
                writer: &mut W,
            ) -> Result<usize, std::io::Error> {
                $crate::consensus::Encodable::consensus_encode(
                    <$hashtype as hashes::Hash>::as_byte_array(self),
                    writer,
                )
            }
        }

        impl $crate::consensus::Decodable for $hashtype {
            fn consensus_decode<R: std::io::Read + ?Sized>(
                reader: &mut R,
            ) -> Result<Self, $crate::consensus::encode::Error> {
                let bytes: [u8; 32] = $crate::consensus::Decodable::consensus_decode(reader)?;
                Ok(<$hashtype as hashes::Hash>::from_byte_array(bytes))
            }
        }
    };
}
pub(crate) use impl_hashencode;
