use crate::chives_error::{Error, Result};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::mem::size_of;

pub fn read_bytes<'a>(input: &'a mut Cursor<&[u8]>, len: usize) -> Result<&'a [u8]> {
    let pos = input.position();
    let buf: &'a [u8] = &input.get_ref()[pos as usize..];
    if buf.len() < len {
        Err(Error::EndOfBuffer)
    } else {
        let ret = &buf[..len];
        input.set_position(pos + len as u64);
        Ok(ret)
    }
}

/// The serialization format of the Chives protocol. Fixed-width integers are
/// big-endian, sequences carry a 32-bit length prefix and optional values a
/// one byte presence prefix.
pub trait Streamable {
    fn update_digest(&self, digest: &mut Sha256);
    fn stream(&self, out: &mut Vec<u8>) -> Result<()>;
    fn parse(input: &mut Cursor<&[u8]>) -> Result<Self>
    where
        Self: Sized;

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.stream(&mut out)?;
        Ok(out)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self>
    where
        Self: Sized,
    {
        let mut input = Cursor::new(bytes);
        let ret = Self::parse(&mut input)?;
        if input.position() == bytes.len() as u64 {
            Ok(ret)
        } else {
            Err(Error::InputTooLarge)
        }
    }

    /// The sha256 of the streamed encoding. Object names ("coin name",
    /// "bundle name") are defined as this hash.
    fn hash(&self) -> [u8; 32] {
        let mut ctx = Sha256::new();
        self.update_digest(&mut ctx);
        ctx.finalize().into()
    }
}

macro_rules! streamable_primitive {
    ($t:ty) => {
        impl Streamable for $t {
            fn update_digest(&self, digest: &mut Sha256) {
                digest.update(self.to_be_bytes());
            }
            fn stream(&self, out: &mut Vec<u8>) -> Result<()> {
                out.extend_from_slice(&self.to_be_bytes());
                Ok(())
            }
            fn parse(input: &mut Cursor<&[u8]>) -> Result<Self> {
                let sz = size_of::<$t>();
                Ok(<$t>::from_be_bytes(
                    read_bytes(input, sz)?.try_into().expect("size checked"),
                ))
            }
        }
    };
}

streamable_primitive!(u8);
streamable_primitive!(i8);
streamable_primitive!(u16);
streamable_primitive!(i16);
streamable_primitive!(u32);
streamable_primitive!(i32);
streamable_primitive!(u64);
streamable_primitive!(i64);
streamable_primitive!(u128);
streamable_primitive!(i128);

impl<T: Streamable> Streamable for Vec<T> {
    fn update_digest(&self, digest: &mut Sha256) {
        (self.len() as u32).update_digest(digest);
        for e in self {
            e.update_digest(digest);
        }
    }

    fn stream(&self, out: &mut Vec<u8>) -> Result<()> {
        if self.len() > u32::MAX as usize {
            Err(Error::SequenceTooLarge)
        } else {
            (self.len() as u32).stream(out)?;
            for e in self {
                e.stream(out)?;
            }
            Ok(())
        }
    }

    fn parse(input: &mut Cursor<&[u8]>) -> Result<Self> {
        let len = u32::parse(input)?;
        // a length prefix alone does not prove the elements are present, so
        // don't reserve capacity up-front
        let mut ret = Vec::<T>::new();
        for _ in 0..len {
            ret.push(T::parse(input)?);
        }
        Ok(ret)
    }
}

impl Streamable for String {
    fn update_digest(&self, digest: &mut Sha256) {
        let bytes = self.as_bytes();
        (bytes.len() as u32).update_digest(digest);
        digest.update(bytes);
    }

    fn stream(&self, out: &mut Vec<u8>) -> Result<()> {
        let bytes = self.as_bytes();
        if bytes.len() > u32::MAX as usize {
            Err(Error::InputTooLarge)
        } else {
            (bytes.len() as u32).stream(out)?;
            out.extend_from_slice(bytes);
            Ok(())
        }
    }

    fn parse(input: &mut Cursor<&[u8]>) -> Result<Self> {
        let len = u32::parse(input)?;
        Ok(String::from(
            std::str::from_utf8(read_bytes(input, len as usize)?)
                .map_err(|_| Error::InvalidString)?,
        ))
    }
}

impl Streamable for bool {
    fn update_digest(&self, digest: &mut Sha256) {
        digest.update(if *self { [1] } else { [0] });
    }

    fn stream(&self, out: &mut Vec<u8>) -> Result<()> {
        out.push(u8::from(*self));
        Ok(())
    }

    fn parse(input: &mut Cursor<&[u8]>) -> Result<Self> {
        match read_bytes(input, 1)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(Error::InvalidBool),
        }
    }
}

impl<T: Streamable> Streamable for Option<T> {
    fn update_digest(&self, digest: &mut Sha256) {
        match self {
            None => digest.update([0]),
            Some(v) => {
                digest.update([1]);
                v.update_digest(digest);
            }
        }
    }

    fn stream(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            None => out.push(0),
            Some(v) => {
                out.push(1);
                v.stream(out)?;
            }
        }
        Ok(())
    }

    fn parse(input: &mut Cursor<&[u8]>) -> Result<Self> {
        match read_bytes(input, 1)?[0] {
            0 => Ok(None),
            1 => Ok(Some(T::parse(input)?)),
            _ => Err(Error::InvalidOptional),
        }
    }
}

impl<T: Streamable, U: Streamable> Streamable for (T, U) {
    fn update_digest(&self, digest: &mut Sha256) {
        self.0.update_digest(digest);
        self.1.update_digest(digest);
    }
    fn stream(&self, out: &mut Vec<u8>) -> Result<()> {
        self.0.stream(out)?;
        self.1.stream(out)?;
        Ok(())
    }
    fn parse(input: &mut Cursor<&[u8]>) -> Result<Self> {
        Ok((T::parse(input)?, U::parse(input)?))
    }
}

impl<T: Streamable, U: Streamable, V: Streamable> Streamable for (T, U, V) {
    fn update_digest(&self, digest: &mut Sha256) {
        self.0.update_digest(digest);
        self.1.update_digest(digest);
        self.2.update_digest(digest);
    }
    fn stream(&self, out: &mut Vec<u8>) -> Result<()> {
        self.0.stream(out)?;
        self.1.stream(out)?;
        self.2.stream(out)?;
        Ok(())
    }
    fn parse(input: &mut Cursor<&[u8]>) -> Result<Self> {
        Ok((T::parse(input)?, U::parse(input)?, V::parse(input)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn roundtrip<T: Streamable + std::fmt::Debug + PartialEq>(v: T, expect: &[u8]) {
        let bytes = v.to_bytes().unwrap();
        assert_eq!(bytes, expect);
        assert_eq!(T::from_bytes(&bytes).unwrap(), v);
    }

    #[test]
    fn test_read_bytes() {
        let mut input = Cursor::<&[u8]>::new(&[0_u8, 1, 2, 3, 4]);
        assert_eq!(read_bytes(&mut input, 3).unwrap(), [0_u8, 1, 2]);
        assert_eq!(read_bytes(&mut input, 2).unwrap(), [3_u8, 4]);
        assert_eq!(read_bytes(&mut input, 1).unwrap_err(), Error::EndOfBuffer);
    }

    #[test]
    fn test_primitives() {
        roundtrip(0x1337_u16, &[0x13, 0x37]);
        roundtrip(-1_i8, &[0xff]);
        roundtrip(0xffee_ddcc_u32, &[0xff, 0xee, 0xdd, 0xcc]);
        roundtrip(1_u64, &[0, 0, 0, 0, 0, 0, 0, 1]);
        roundtrip(-2_i64, &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe]);
    }

    #[test]
    fn test_vec() {
        roundtrip(Vec::<u8>::new(), &[0, 0, 0, 0]);
        roundtrip(vec![1_u8, 2, 3], &[0, 0, 0, 3, 1, 2, 3]);
        roundtrip(vec![0x0102_u16], &[0, 0, 0, 1, 1, 2]);
    }

    #[test]
    fn test_truncated_vec() {
        // the length prefix claims more elements than the buffer holds
        assert_eq!(
            Vec::<u8>::from_bytes(&[0, 0, 0, 4, 1, 2, 3]).unwrap_err(),
            Error::EndOfBuffer
        );
    }

    #[test]
    fn test_string() {
        roundtrip(String::new(), &[0, 0, 0, 0]);
        roundtrip("abc".to_string(), &[0, 0, 0, 3, b'a', b'b', b'c']);
        assert_eq!(
            String::from_bytes(&[0, 0, 0, 2, 0xc3, 0x28]).unwrap_err(),
            Error::InvalidString
        );
    }

    #[rstest]
    #[case(&[0], Ok(false))]
    #[case(&[1], Ok(true))]
    #[case(&[2], Err(Error::InvalidBool))]
    fn test_bool(#[case] buf: &'static [u8], #[case] expect: Result<bool>) {
        assert_eq!(bool::from_bytes(buf), expect);
    }

    #[rstest]
    #[case(&[0], Ok(None))]
    #[case(&[1, 0x13, 0x37], Ok(Some(0x1337_u16)))]
    #[case(&[2, 0x13, 0x37], Err(Error::InvalidOptional))]
    fn test_optional(#[case] buf: &'static [u8], #[case] expect: Result<Option<u16>>) {
        assert_eq!(Option::<u16>::from_bytes(buf), expect);
    }

    #[test]
    fn test_tuple() {
        roundtrip((1_u8, 0x0203_u16), &[1, 2, 3]);
        roundtrip((1_u8, 2_u8, 3_u8), &[1, 2, 3]);
    }

    #[test]
    fn test_trailing_garbage() {
        assert_eq!(u8::from_bytes(&[1, 2]).unwrap_err(), Error::InputTooLarge);
    }

    #[test]
    fn test_hash_matches_stream() {
        use sha2::{Digest, Sha256};
        let v = vec![1_u8, 2, 3];
        let mut ctx = Sha256::new();
        ctx.update(v.to_bytes().unwrap());
        let expect: [u8; 32] = ctx.finalize().into();
        assert_eq!(v.hash(), expect);
    }
}
