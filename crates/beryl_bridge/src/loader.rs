//! Deserializes an external parser's buffer into syntax-tree nodes.
//!
//! The loader knows nothing about the parser behind the buffer; it
//! walks the tagged records the wire format declares and fails closed on
//! anything it does not recognize. Symbol bytes are resolved against the
//! interner under the buffer's declared source encoding, which is
//! derived once per loader and memoized.

use crate::error::BridgeError;
use crate::wire::{tag, Reader, VERSION};
use beryl_ast::node::{Node, NodeKind};
use beryl_ast::types::ScopeId;
use beryl_core::arena::CompilerArena;
use beryl_core::intern::{Encoding, InternedString, StringInterner};

/// Maximum node nesting the loader will follow. Buffers nested deeper
/// than any real program are treated as malformed.
const MAX_NODE_DEPTH: u32 = 200;

/// A decoded tree plus the metadata the parse result needs.
#[derive(Debug)]
pub struct LoadedTree<'a> {
    pub root: &'a Node<'a>,
    /// Names declared at the top level, in slot order; the root scope is
    /// materialized from this list.
    pub top_locals: Vec<InternedString>,
    /// The source encoding the buffer declared.
    pub encoding: Encoding,
}

/// Decodes one serialized buffer into arena-allocated nodes.
///
/// The interner is only borrowed for the duration of the decode, so its
/// lifetime is independent of the arena backing the returned tree.
pub struct TreeLoader<'a, 'i> {
    arena: &'a CompilerArena,
    interner: &'i StringInterner,
    /// Memoized source encoding; derived from the header exactly once.
    encoding: Option<Encoding>,
}

impl<'a, 'i> TreeLoader<'a, 'i> {
    pub fn new(arena: &'a CompilerArena, interner: &'i StringInterner) -> Self {
        Self {
            arena,
            interner,
            encoding: None,
        }
    }

    /// Decode a complete buffer. Any structural problem aborts the whole
    /// load; a partial tree is never returned.
    pub fn load(mut self, bytes: &[u8]) -> Result<LoadedTree<'a>, BridgeError> {
        let mut reader = Reader::new(bytes);
        reader.expect_magic()?;
        let version = reader.read_u8()?;
        if version != VERSION {
            return Err(BridgeError::Decode(format!(
                "unsupported buffer version {}",
                version
            )));
        }

        let name_len = reader.read_u16()? as usize;
        let name_bytes = reader.read_bytes(name_len)?;
        let encoding = self.source_encoding(name_bytes)?;

        let local_count = reader.read_u32()? as usize;
        let mut top_locals = Vec::with_capacity(local_count);
        for _ in 0..local_count {
            let raw = reader.read_cstr()?;
            top_locals.push(self.intern_symbol(raw)?);
        }

        let root = self.read_node(&mut reader, 0)?;
        if !reader.at_end() {
            return Err(BridgeError::Decode(format!(
                "{} trailing bytes after root node",
                reader.remaining()
            )));
        }
        Ok(LoadedTree {
            root,
            top_locals,
            encoding,
        })
    }

    /// Derive the buffer's source encoding, at most once per loader.
    fn source_encoding(&mut self, name_bytes: &[u8]) -> Result<Encoding, BridgeError> {
        if let Some(encoding) = self.encoding {
            return Ok(encoding);
        }
        let name = std::str::from_utf8(name_bytes)
            .map_err(|_| BridgeError::Decode("encoding name is not valid UTF-8".into()))?;
        let encoding = Encoding::by_name(name)
            .ok_or_else(|| BridgeError::Decode(format!("unknown source encoding '{}'", name)))?;
        self.encoding = Some(encoding);
        Ok(encoding)
    }

    fn intern_symbol(&self, raw: &[u8]) -> Result<InternedString, BridgeError> {
        // load() resolves the encoding before any symbol is read.
        let encoding = self.encoding.expect("encoding resolved before symbols");
        self.interner.intern_symbol(raw, encoding).ok_or_else(|| {
            BridgeError::Decode(format!(
                "symbol bytes are invalid for encoding {}",
                encoding.name()
            ))
        })
    }

    fn read_sym(&self, reader: &mut Reader<'_>) -> Result<InternedString, BridgeError> {
        let len = reader.read_u16()? as usize;
        let raw = reader.read_bytes(len)?;
        self.intern_symbol(raw)
    }

    fn read_node_list(
        &self,
        reader: &mut Reader<'_>,
        depth: u32,
    ) -> Result<&'a [&'a Node<'a>], BridgeError> {
        let count = reader.read_u32()? as usize;
        let mut nodes = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            nodes.push(self.read_node(reader, depth)?);
        }
        Ok(self.arena.alloc_slice_copy(&nodes))
    }

    fn read_node(&self, reader: &mut Reader<'_>, depth: u32) -> Result<&'a Node<'a>, BridgeError> {
        if depth > MAX_NODE_DEPTH {
            return Err(BridgeError::Decode("node nesting too deep".into()));
        }
        let tag_byte = reader.read_u8()?;
        let line = reader.read_u32()?;
        let kind = match tag_byte {
            tag::PROGRAM => NodeKind::Program {
                body: self.read_node_list(reader, depth + 1)?,
            },
            tag::LOCAL_ASSIGN => {
                let name = self.read_sym(reader)?;
                let address = reader.read_u32()?;
                let value = self.read_node(reader, depth + 1)?;
                NodeKind::LocalAssign {
                    name,
                    address,
                    value,
                }
            }
            tag::LOCAL_READ => {
                let name = self.read_sym(reader)?;
                let address = reader.read_u32()?;
                NodeKind::LocalRead { name, address }
            }
            tag::INTEGER => NodeKind::Integer {
                value: reader.read_i64()?,
            },
            tag::STR => {
                let len = reader.read_u32()? as usize;
                let raw = reader.read_bytes(len)?;
                NodeKind::Str {
                    value: self.intern_symbol(raw)?,
                }
            }
            tag::CALL => {
                let name = self.read_sym(reader)?;
                let receiver = match reader.read_u8()? {
                    0 => None,
                    1 => Some(self.read_node(reader, depth + 1)?),
                    other => {
                        return Err(BridgeError::Decode(format!(
                            "bad receiver marker {}",
                            other
                        )))
                    }
                };
                NodeKind::Call {
                    receiver,
                    name,
                    args: self.read_node_list(reader, depth + 1)?,
                }
            }
            tag::BLOCK => {
                let param_count = reader.read_u32()? as usize;
                let mut params = Vec::with_capacity(param_count.min(16));
                for _ in 0..param_count {
                    params.push(self.read_sym(reader)?);
                }
                NodeKind::Block {
                    // Decoded blocks are unbound; the consumer builds
                    // their scopes when it walks the tree.
                    scope: ScopeId::INVALID,
                    params: self.arena.alloc_slice_copy(&params),
                    body: self.read_node_list(reader, depth + 1)?,
                }
            }
            tag::NIL => NodeKind::Nil,
            unknown => {
                return Err(BridgeError::Decode(format!(
                    "unrecognized node tag {} at offset {}",
                    unknown,
                    reader.position()
                )))
            }
        };
        Ok(self.arena.alloc(Node::new(kind, line)))
    }
}
