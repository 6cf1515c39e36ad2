//! Streamable impls for the BLS key and signature types. Both are streamed
//! as their fixed-width compressed point encoding.

use crate::{read_bytes, Error, Result, Streamable};
use chia_bls::{PublicKey, Signature};
use sha2::{Digest, Sha256};
use std::io::Cursor;

impl Streamable for PublicKey {
    fn update_digest(&self, digest: &mut Sha256) {
        digest.update(self.to_bytes());
    }

    fn stream(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&self.to_bytes());
        Ok(())
    }

    fn parse(input: &mut Cursor<&[u8]>) -> Result<Self> {
        let bytes: [u8; 48] = read_bytes(input, 48)?.try_into().expect("length checked");
        PublicKey::from_bytes(&bytes).map_err(|e| Error::Custom(e.to_string()))
    }
}

impl Streamable for Signature {
    fn update_digest(&self, digest: &mut Sha256) {
        digest.update(self.to_bytes());
    }

    fn stream(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&self.to_bytes());
        Ok(())
    }

    fn parse(input: &mut Cursor<&[u8]>) -> Result<Self> {
        let bytes: [u8; 96] = read_bytes(input, 96)?.try_into().expect("length checked");
        Signature::from_bytes(&bytes).map_err(|e| Error::Custom(e.to_string()))
    }
}
