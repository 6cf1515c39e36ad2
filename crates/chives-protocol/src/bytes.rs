use chives_traits::{read_bytes, Error, Result, Streamable};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fmt::Debug;
use std::io::Cursor;
use std::ops::Deref;

/// A variable length byte string with a 32-bit length prefix on the wire.
#[derive(Hash, PartialEq, Eq, Clone, PartialOrd, Ord, Default)]
pub struct Bytes(Vec<u8>);

impl Bytes {
    pub fn new(v: Vec<u8>) -> Self {
        Bytes(v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl Streamable for Bytes {
    fn update_digest(&self, digest: &mut Sha256) {
        (self.0.len() as u32).update_digest(digest);
        digest.update(&self.0);
    }

    fn stream(&self, out: &mut Vec<u8>) -> Result<()> {
        if self.0.len() > u32::MAX as usize {
            Err(Error::InputTooLarge)
        } else {
            (self.0.len() as u32).stream(out)?;
            out.extend_from_slice(&self.0);
            Ok(())
        }
    }

    fn parse(input: &mut Cursor<&[u8]>) -> Result<Self> {
        let len = u32::parse(input)?;
        Ok(Bytes(read_bytes(input, len as usize)?.to_vec()))
    }
}

impl Debug for Bytes {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&hex::encode(&self.0))
    }
}

impl fmt::Display for Bytes {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&hex::encode(&self.0))
    }
}

impl From<&[u8]> for Bytes {
    fn from(v: &[u8]) -> Bytes {
        Bytes(v.to_vec())
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Bytes {
        Bytes(v)
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq<Vec<u8>> for Bytes {
    fn eq(&self, other: &Vec<u8>) -> bool {
        &self.0 == other
    }
}

impl PartialEq<&[u8]> for Bytes {
    fn eq(&self, other: &&[u8]) -> bool {
        self.0 == *other
    }
}

/// A fixed width byte array, streamed without any length prefix.
#[derive(Hash, PartialEq, Eq, Copy, Clone, PartialOrd, Ord)]
pub struct BytesImpl<const N: usize>([u8; N]);

impl<const N: usize> Default for BytesImpl<N> {
    fn default() -> Self {
        BytesImpl([0; N])
    }
}

impl<const N: usize> BytesImpl<N> {
    pub const fn new(v: [u8; N]) -> Self {
        BytesImpl(v)
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl<const N: usize> Streamable for BytesImpl<N> {
    fn update_digest(&self, digest: &mut Sha256) {
        digest.update(self.0);
    }

    fn stream(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&self.0);
        Ok(())
    }

    fn parse(input: &mut Cursor<&[u8]>) -> Result<Self> {
        Ok(BytesImpl(
            read_bytes(input, N)?.try_into().expect("length checked"),
        ))
    }
}

impl<const N: usize> From<[u8; N]> for BytesImpl<N> {
    fn from(v: [u8; N]) -> BytesImpl<N> {
        BytesImpl(v)
    }
}

impl<const N: usize> From<&[u8; N]> for BytesImpl<N> {
    fn from(v: &[u8; N]) -> BytesImpl<N> {
        BytesImpl(*v)
    }
}

impl<const N: usize> From<BytesImpl<N>> for [u8; N] {
    fn from(v: BytesImpl<N>) -> [u8; N] {
        v.0
    }
}

impl<const N: usize> TryFrom<&[u8]> for BytesImpl<N> {
    type Error = Error;

    fn try_from(v: &[u8]) -> Result<BytesImpl<N>> {
        if v.len() != N {
            Err(Error::InvalidString)
        } else {
            Ok(BytesImpl(v.try_into().expect("length checked")))
        }
    }
}

impl<const N: usize> TryFrom<Vec<u8>> for BytesImpl<N> {
    type Error = Error;

    fn try_from(v: Vec<u8>) -> Result<BytesImpl<N>> {
        Self::try_from(&v[..])
    }
}

impl<const N: usize> AsRef<[u8]> for BytesImpl<N> {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl<const N: usize> Deref for BytesImpl<N> {
    type Target = [u8; N];
    fn deref(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> Debug for BytesImpl<N> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&hex::encode(self.0))
    }
}

impl<const N: usize> fmt::Display for BytesImpl<N> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&hex::encode(self.0))
    }
}

impl<const N: usize> PartialEq<[u8; N]> for BytesImpl<N> {
    fn eq(&self, other: &[u8; N]) -> bool {
        &self.0 == other
    }
}

impl<const N: usize> PartialEq<BytesImpl<N>> for [u8; N] {
    fn eq(&self, other: &BytesImpl<N>) -> bool {
        self == &other.0
    }
}

impl<const N: usize> PartialEq<&[u8]> for BytesImpl<N> {
    fn eq(&self, other: &&[u8]) -> bool {
        self.0 == **other
    }
}

pub type Bytes32 = BytesImpl<32>;
pub type Bytes48 = BytesImpl<48>;
pub type Bytes96 = BytesImpl<96>;
