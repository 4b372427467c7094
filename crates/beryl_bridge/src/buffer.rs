//! The serialized-buffer ownership contract.
//!
//! The external side owns the buffer's backing memory until the bridge
//! has copied the logical contents out. Descriptors release their
//! backing on drop, so the copy-then-release ordering is enforced by
//! scope rather than by caller discipline.

use crate::error::BridgeError;

/// A buffer descriptor handed back by an external parser.
///
/// `len` is the logical content length; `capacity` is the size of the
/// backing allocation. Only the first `len` bytes are meaningful; the
/// rest must never be read. Dropping the descriptor releases the
/// external side's backing memory.
pub trait ParserBuffer {
    /// Logical content length in bytes.
    fn len(&self) -> usize;

    /// Size of the backing allocation, >= `len` for well-formed buffers.
    fn capacity(&self) -> usize;

    /// The full backing allocation.
    fn backing(&self) -> &[u8];
}

/// The external parser's entry point: source bytes, the file identifier
/// and starting line for error attribution, and an opaque metadata blob
/// in; a serialized-tree buffer descriptor out.
///
/// One implementation exists per integration technology (in-process
/// library, shared-library binding, subprocess); the bridge never
/// branches on which is behind the trait.
pub trait NativeParser {
    type Buffer: ParserBuffer;

    fn serialize(
        &self,
        source: &[u8],
        file: &str,
        line_offset: u32,
        metadata: &[u8],
    ) -> Result<Self::Buffer, BridgeError>;
}

/// Copy exactly `len` bytes out of a descriptor, then release it.
///
/// The copy completes before the descriptor drops on the success path;
/// on the error path the descriptor drops without any read beyond its
/// backing. Bytes in `len..capacity` are never touched.
pub fn copy_out<B: ParserBuffer>(buffer: B) -> Result<Vec<u8>, BridgeError> {
    let len = buffer.len();
    if len > buffer.capacity() || len > buffer.backing().len() {
        return Err(BridgeError::Decode(format!(
            "buffer length {} exceeds capacity {}",
            len,
            buffer.capacity()
        )));
    }
    let owned = buffer.backing()[..len].to_vec();
    drop(buffer);
    Ok(owned)
}

/// A heap-backed descriptor for in-process serializers and test doubles.
#[derive(Debug)]
pub struct HeapBuffer {
    backing: Vec<u8>,
    len: usize,
}

impl HeapBuffer {
    /// Wrap content directly: `len == capacity == content.len()`.
    pub fn from_content(content: Vec<u8>) -> Self {
        let len = content.len();
        Self {
            backing: content,
            len,
        }
    }

    /// Build a descriptor whose logical length is shorter than its
    /// backing, mimicking a growable native buffer.
    pub fn with_slack(backing: Vec<u8>, len: usize) -> Self {
        Self { backing, len }
    }
}

impl ParserBuffer for HeapBuffer {
    fn len(&self) -> usize {
        self.len
    }

    fn capacity(&self) -> usize {
        self.backing.len()
    }

    fn backing(&self) -> &[u8] {
        &self.backing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_out_takes_logical_length_only() {
        let mut backing = b"0123456789".to_vec();
        backing.extend_from_slice(&[0xEE; 10]);
        let buffer = HeapBuffer::with_slack(backing, 10);
        assert_eq!(buffer.capacity(), 20);

        let owned = copy_out(buffer).unwrap();
        assert_eq!(owned, b"0123456789");
    }

    #[test]
    fn test_copy_out_rejects_length_beyond_capacity() {
        let buffer = HeapBuffer::with_slack(vec![0; 4], 9);
        match copy_out(buffer) {
            Err(BridgeError::Decode(msg)) => assert!(msg.contains("exceeds capacity")),
            other => panic!("expected decode failure, got {:?}", other),
        }
    }
}
