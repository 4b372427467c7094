//! Cross-crate test support: a wire-speaking parser double.
//!
//! [`WireParser`] implements the external-parser entry point by running
//! the in-process front end and re-serializing its tree into the wire
//! format, so the whole bridge path (serialize, buffer copy, decode) can
//! be exercised without a real native parser.

use beryl_ast::node::{Node, NodeKind};
use beryl_bridge::wire::{tag, Writer};
use beryl_bridge::{BridgeError, HeapBuffer, NativeParser};
use beryl_core::arena::CompilerArena;
use beryl_core::intern::StringInterner;
use beryl_parser::{InProcessBackend, ParseRequest, ParserBackend, RootScope};
use beryl_scope::ScopeArena;

/// A stand-in external parser: parses with the in-process backend and
/// answers with a wire-format buffer (padded with slack bytes, the way a
/// growable native buffer would be).
#[derive(Debug, Default)]
pub struct WireParser;

impl WireParser {
    pub fn new() -> Self {
        WireParser
    }
}

impl NativeParser for WireParser {
    type Buffer = HeapBuffer;

    fn serialize(
        &self,
        source: &[u8],
        file: &str,
        line_offset: u32,
        _metadata: &[u8],
    ) -> Result<HeapBuffer, BridgeError> {
        let arena = CompilerArena::new();
        let interner = StringInterner::new();
        let mut scopes = ScopeArena::new();
        let request = ParseRequest::new(source, file).with_line_offset(line_offset);
        let result = InProcessBackend::new()
            .parse(&arena, &interner, &mut scopes, &request)
            .map_err(|err| BridgeError::Backend(err.to_string()))?;

        let RootScope::Ready(root_scope) = result.scope else {
            return Err(BridgeError::Backend("missing root scope".into()));
        };

        let mut writer = Writer::with_header();
        writer.write_u16(5);
        writer.write_bytes(b"UTF-8");
        let names: Vec<_> = scopes.get(root_scope).names().collect();
        writer.write_u32(names.len() as u32);
        for name in names {
            writer.write_cstr(interner.resolve(name).as_bytes());
        }
        write_node(&mut writer, &interner, result.root);

        let content = writer.into_bytes();
        let len = content.len();
        let mut backing = content;
        backing.extend_from_slice(&[0xEE; 16]);
        Ok(HeapBuffer::with_slack(backing, len))
    }
}

fn write_node(writer: &mut Writer, interner: &StringInterner, node: &Node<'_>) {
    match node.kind {
        NodeKind::Program { body } => {
            writer.write_u8(tag::PROGRAM);
            writer.write_u32(node.line);
            write_node_list(writer, interner, body);
        }
        NodeKind::LocalAssign {
            name,
            address,
            value,
        } => {
            writer.write_u8(tag::LOCAL_ASSIGN);
            writer.write_u32(node.line);
            writer.write_sym(interner.resolve(name).as_bytes());
            writer.write_u32(address);
            write_node(writer, interner, value);
        }
        NodeKind::LocalRead { name, address } => {
            writer.write_u8(tag::LOCAL_READ);
            writer.write_u32(node.line);
            writer.write_sym(interner.resolve(name).as_bytes());
            writer.write_u32(address);
        }
        NodeKind::Integer { value } => {
            writer.write_u8(tag::INTEGER);
            writer.write_u32(node.line);
            writer.write_i64(value);
        }
        NodeKind::Str { value } => {
            writer.write_u8(tag::STR);
            writer.write_u32(node.line);
            let bytes = interner.resolve(value).as_bytes();
            writer.write_u32(bytes.len() as u32);
            writer.write_bytes(bytes);
        }
        NodeKind::Call {
            receiver,
            name,
            args,
        } => {
            writer.write_u8(tag::CALL);
            writer.write_u32(node.line);
            writer.write_sym(interner.resolve(name).as_bytes());
            match receiver {
                Some(receiver) => {
                    writer.write_u8(1);
                    write_node(writer, interner, receiver);
                }
                None => writer.write_u8(0),
            }
            write_node_list(writer, interner, args);
        }
        NodeKind::Block { params, body, .. } => {
            // Scope ids are parse-local; they are not part of the wire.
            writer.write_u8(tag::BLOCK);
            writer.write_u32(node.line);
            writer.write_u32(params.len() as u32);
            for &param in params {
                writer.write_sym(interner.resolve(param).as_bytes());
            }
            write_node_list(writer, interner, body);
        }
        NodeKind::Nil => {
            writer.write_u8(tag::NIL);
            writer.write_u32(node.line);
        }
    }
}

fn write_node_list(writer: &mut Writer, interner: &StringInterner, nodes: &[&Node<'_>]) {
    writer.write_u32(nodes.len() as u32);
    for node in nodes {
        write_node(writer, interner, node);
    }
}

/// Flatten a tree into `(tag, line)` pairs in preorder, for comparing
/// trees produced by different backends.
pub fn shape(node: &Node<'_>) -> Vec<(&'static str, u32)> {
    let mut out = Vec::new();
    collect_shape(node, &mut out);
    out
}

fn collect_shape(node: &Node<'_>, out: &mut Vec<(&'static str, u32)>) {
    out.push((node.kind.tag_name(), node.line));
    match node.kind {
        NodeKind::Program { body } => {
            for child in body {
                collect_shape(child, out);
            }
        }
        NodeKind::LocalAssign { value, .. } => collect_shape(value, out),
        NodeKind::Call {
            receiver, args, ..
        } => {
            if let Some(receiver) = receiver {
                collect_shape(receiver, out);
            }
            for arg in args {
                collect_shape(arg, out);
            }
        }
        NodeKind::Block { body, .. } => {
            for child in body {
                collect_shape(child, out);
            }
        }
        NodeKind::LocalRead { .. } | NodeKind::Integer { .. } | NodeKind::Str { .. } | NodeKind::Nil => {}
    }
}
