use crate::Bytes;
use chives_streamable_macro::Streamable;
use clvmr::allocator::NodePtr;
use clvmr::serde::{node_from_bytes, node_to_bytes};
use clvmr::Allocator;
use std::io;

/// A serialized CLVM program (or program argument).
#[derive(Streamable, Hash, Debug, Clone, Eq, PartialEq, Default)]
pub struct Program(Bytes);

impl Program {
    pub fn new(bytes: Bytes) -> Self {
        Program(bytes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// Deserialize into an allocator.
    pub fn to_node(&self, a: &mut Allocator) -> io::Result<NodePtr> {
        node_from_bytes(a, self.0.as_slice())
    }

    pub fn from_node(a: &Allocator, node: NodePtr) -> io::Result<Self> {
        Ok(Program(node_to_bytes(a, node)?.into()))
    }

    /// The program's name, the sha256 of its serialization.
    pub fn name(&self) -> [u8; 32] {
        use sha2::{Digest, Sha256};
        let mut ctx = Sha256::new();
        ctx.update(self.0.as_slice());
        ctx.finalize().into()
    }
}

impl From<Vec<u8>> for Program {
    fn from(v: Vec<u8>) -> Self {
        Program(v.into())
    }
}

impl From<&[u8]> for Program {
    fn from(v: &[u8]) -> Self {
        Program(v.into())
    }
}

impl AsRef<[u8]> for Program {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chives_traits::Streamable;
    use hex_literal::hex;

    #[test]
    fn node_roundtrip() {
        // (q . 1)
        let prog = Program::from(&hex!("ff0101")[..]);
        let mut a = Allocator::new();
        let node = prog.to_node(&mut a).unwrap();
        assert_eq!(Program::from_node(&a, node).unwrap(), prog);
    }

    #[test]
    fn streaming_is_length_prefixed() {
        let prog = Program::from(&hex!("80")[..]);
        assert_eq!(prog.to_bytes().unwrap(), hex!("0000000180"));
    }
}
