//! End-to-end tests of the bridge cycle against a scripted parser double.

use std::sync::Mutex;

use beryl_ast::node::NodeKind;
use beryl_bridge::wire::{tag, Writer};
use beryl_bridge::{
    decode_eval_chain, BridgeError, BridgeRequest, EnclosingScope, HeapBuffer, NativeParser,
    ParserBridge,
};
use beryl_core::arena::CompilerArena;
use beryl_core::intern::{Encoding, StringInterner};
use beryl_scope::ScopeArena;

// ============================================================================
// Test doubles
// ============================================================================

/// Replays a canned buffer and records the request context it was handed.
struct ScriptedParser {
    buffer: Vec<u8>,
    /// Logical length handed back; defaults to the full buffer.
    len: Option<usize>,
    seen_metadata: Mutex<Vec<u8>>,
    seen_file: Mutex<(String, u32)>,
}

impl ScriptedParser {
    fn replaying(buffer: Vec<u8>) -> Self {
        Self {
            buffer,
            len: None,
            seen_metadata: Mutex::new(Vec::new()),
            seen_file: Mutex::new((String::new(), 0)),
        }
    }
}

impl NativeParser for ScriptedParser {
    type Buffer = HeapBuffer;

    fn serialize(
        &self,
        _source: &[u8],
        file: &str,
        line_offset: u32,
        metadata: &[u8],
    ) -> Result<HeapBuffer, BridgeError> {
        *self.seen_metadata.lock().unwrap() = metadata.to_vec();
        *self.seen_file.lock().unwrap() = (file.to_string(), line_offset);
        let len = self.len.unwrap_or(self.buffer.len());
        Ok(HeapBuffer::with_slack(self.buffer.clone(), len))
    }
}

/// Always reports a parser-side failure.
struct FailingParser;

impl NativeParser for FailingParser {
    type Buffer = HeapBuffer;

    fn serialize(
        &self,
        _source: &[u8],
        _file: &str,
        _line_offset: u32,
        _metadata: &[u8],
    ) -> Result<HeapBuffer, BridgeError> {
        Err(BridgeError::Backend("syntax error at line 3".into()))
    }
}

/// A well-formed buffer: program with one local assignment `a = 42`.
fn assignment_buffer() -> Vec<u8> {
    let mut writer = Writer::with_header();
    writer.write_u16(5);
    writer.write_bytes(b"UTF-8");
    writer.write_u32(1); // one top-level local
    writer.write_cstr(b"a");

    writer.write_u8(tag::PROGRAM);
    writer.write_u32(1);
    writer.write_u32(1);
    writer.write_u8(tag::LOCAL_ASSIGN);
    writer.write_u32(1);
    writer.write_sym(b"a");
    writer.write_u32(0); // depth 0, slot 0
    writer.write_u8(tag::INTEGER);
    writer.write_u32(1);
    writer.write_i64(42);
    writer.into_bytes()
}

// ============================================================================
// The serialize/copy/decode cycle
// ============================================================================

#[test]
fn test_parse_decodes_replayed_buffer() {
    let bridge = ParserBridge::new(ScriptedParser::replaying(assignment_buffer()));
    let arena = CompilerArena::new();
    let interner = StringInterner::new();

    let tree = bridge
        .parse(&arena, &interner, BridgeRequest::new(b"a = 42", "t.rb", b""))
        .unwrap();
    assert_eq!(tree.encoding, Encoding::Utf8);
    assert_eq!(tree.top_locals, vec![interner.intern("a")]);

    let NodeKind::Program { body } = tree.root.kind else {
        panic!("expected program root, got {}", tree.root.kind.tag_name());
    };
    let NodeKind::LocalAssign {
        name,
        address,
        value,
    } = body[0].kind
    else {
        panic!("expected assignment, got {}", body[0].kind.tag_name());
    };
    assert_eq!(name, interner.intern("a"));
    assert_eq!(address, 0);
    assert!(matches!(value.kind, NodeKind::Integer { value: 42 }));
}

#[test]
fn test_slack_beyond_logical_length_is_never_decoded() {
    // Pad the backing with garbage past the logical content; the parse
    // must succeed because only the first `len` bytes are copied.
    let content = assignment_buffer();
    let len = content.len();
    let mut backing = content;
    backing.extend_from_slice(&[0xEE; 32]);

    let mut parser = ScriptedParser::replaying(backing);
    parser.len = Some(len);
    let bridge = ParserBridge::new(parser);

    let arena = CompilerArena::new();
    let interner = StringInterner::new();
    bridge
        .parse(&arena, &interner, BridgeRequest::new(b"a = 42", "t.rb", b""))
        .expect("garbage past len must not reach the decoder");
}

#[test]
fn test_length_beyond_capacity_is_a_decode_error() {
    let mut parser = ScriptedParser::replaying(assignment_buffer());
    parser.len = Some(usize::MAX);
    let bridge = ParserBridge::new(parser);

    let arena = CompilerArena::new();
    let interner = StringInterner::new();
    let err = bridge
        .parse(&arena, &interner, BridgeRequest::new(b"", "t.rb", b""))
        .unwrap_err();
    assert!(matches!(err, BridgeError::Decode(_)), "got {:?}", err);
}

#[test]
fn test_backend_failure_is_distinct_from_decode_failure() {
    let bridge = ParserBridge::new(FailingParser);
    let arena = CompilerArena::new();
    let interner = StringInterner::new();
    let err = bridge
        .parse(&arena, &interner, BridgeRequest::new(b"def", "t.rb", b""))
        .unwrap_err();
    match err {
        BridgeError::Backend(msg) => assert!(msg.contains("syntax error")),
        other => panic!("expected backend failure, got {:?}", other),
    }
}

#[test]
fn test_request_file_and_line_offset_reach_the_parser() {
    let bridge = ParserBridge::new(ScriptedParser::replaying(assignment_buffer()));
    let arena = CompilerArena::new();
    let interner = StringInterner::new();

    let request = BridgeRequest::new(b"a = 42", "embedded.rb", b"").with_line_offset(120);
    bridge.parse(&arena, &interner, request).unwrap();

    let (file, offset) = bridge.native().seen_file.lock().unwrap().clone();
    assert_eq!(file, "embedded.rb");
    assert_eq!(offset, 120);
}

// ============================================================================
// Metadata folding
// ============================================================================

#[test]
fn test_plain_request_carries_empty_eval_chain_frame() {
    let parser = ScriptedParser::replaying(assignment_buffer());
    let bridge = ParserBridge::new(parser);
    let arena = CompilerArena::new();
    let interner = StringInterner::new();
    bridge
        .parse(&arena, &interner, BridgeRequest::new(b"a = 42", "t.rb", b"meta"))
        .unwrap();

    let seen = bridge.native().seen_metadata.lock().unwrap().clone();
    assert_eq!(&seen[..4], b"meta");
    assert_eq!(&seen[4..], &0u32.to_le_bytes());
}

#[test]
fn test_eval_request_folds_scope_chain_into_metadata() {
    let interner = StringInterner::new();
    let mut scopes = ScopeArena::new();
    let method = scopes.new_local(None, &[interner.intern("z")]);
    let block = scopes.new_block(method, &[interner.intern("x")]);

    let parser = ScriptedParser::replaying(assignment_buffer());
    let bridge = ParserBridge::new(parser);
    let arena = CompilerArena::new();
    let request = BridgeRequest::new(b"x + z", "(eval)", b"").with_enclosing(EnclosingScope {
        arena: &scopes,
        scope: block,
    });
    bridge.parse(&arena, &interner, request).unwrap();

    let seen = bridge.native().seen_metadata.lock().unwrap().clone();
    let chain_len = u32::from_le_bytes(seen[..4].try_into().unwrap()) as usize;
    let chain = &seen[4..];
    assert_eq!(chain.len(), chain_len);

    let groups = decode_eval_chain(chain).unwrap();
    assert_eq!(groups.len(), 2, "block plus owning method scope");
    assert_eq!(groups[0], vec![b"x".to_vec()]);
    assert_eq!(groups[1], vec![b"z".to_vec()]);
}
