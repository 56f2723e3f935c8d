//! Immutable content-addressed chunks.

use alloy_primitives::keccak256;
use bytes::Bytes;

use crate::ChunkAddress;

/// Maximum payload size of a single chunk in bytes.
pub const MAX_CHUNK_SIZE: usize = 4096;

/// An immutable chunk: an address and its payload.
///
/// Cloning is cheap, the payload buffer is shared rather than copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    address: ChunkAddress,
    data: Bytes,
}

impl Chunk {
    /// Create a chunk, deriving its address from the payload.
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            address: Self::address_of(&data),
            data,
        }
    }

    /// Create a chunk with a caller-supplied address.
    ///
    /// The address is not checked against the payload; see [`verify`](Self::verify).
    pub fn with_address(address: ChunkAddress, data: impl Into<Bytes>) -> Self {
        Self {
            address,
            data: data.into(),
        }
    }

    /// Compute the content address of a payload.
    pub fn address_of(data: &[u8]) -> ChunkAddress {
        ChunkAddress(keccak256(data))
    }

    /// The chunk's address.
    #[inline]
    pub fn address(&self) -> &ChunkAddress {
        &self.address
    }

    /// The chunk's payload.
    #[inline]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Payload size in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true if the address matches the payload and the payload fits
    /// in a single chunk.
    pub fn verify(&self) -> bool {
        self.data.len() <= MAX_CHUNK_SIZE && Self::address_of(&self.data) == self.address
    }
}
