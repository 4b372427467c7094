//! String interning and source encodings.
//!
//! All variable and method names are interned to enable O(1) comparison
//! via integer IDs. Symbol bytes arriving from an external parser are
//! decoded under a declared source encoding before interning.

use lasso::{Spur, ThreadedRodeo};
use std::fmt;
use std::sync::Arc;

/// An interned string identifier. This is a lightweight handle (u32)
/// that can be used to look up the actual string content.
///
/// Comparing two `InternedString` values is an O(1) integer comparison.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct InternedString(Spur);

impl InternedString {
    /// Create from a raw lasso key.
    #[inline]
    pub fn from_spur(spur: Spur) -> Self {
        Self(spur)
    }

    /// Get the raw lasso key.
    #[inline]
    pub fn as_spur(self) -> Spur {
        self.0
    }
}

impl fmt::Debug for InternedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InternedString({:?})", self.0)
    }
}

/// A source encoding a symbol's bytes are interpreted under.
///
/// The set is closed: external parsers report one of these names and
/// everything else is rejected at the decoding boundary.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Encoding {
    Utf8,
    UsAscii,
    /// Raw bytes, mapped byte-per-byte into the BMP (latin-1 style) so
    /// interning stays lossless.
    Binary,
}

impl Encoding {
    /// Resolve an encoding by its wire name. Returns `None` for names
    /// this layer does not understand.
    pub fn by_name(name: &str) -> Option<Encoding> {
        match name {
            "UTF-8" => Some(Encoding::Utf8),
            "US-ASCII" => Some(Encoding::UsAscii),
            "ASCII-8BIT" | "BINARY" => Some(Encoding::Binary),
            _ => None,
        }
    }

    /// The canonical wire name of this encoding.
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::UsAscii => "US-ASCII",
            Encoding::Binary => "ASCII-8BIT",
        }
    }

    /// Decode raw symbol bytes under this encoding. Returns `None` when
    /// the bytes are not valid for the encoding.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Encoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_owned),
            Encoding::UsAscii => {
                if bytes.is_ascii() {
                    // ASCII is a UTF-8 subset; this cannot fail.
                    std::str::from_utf8(bytes).ok().map(str::to_owned)
                } else {
                    None
                }
            }
            Encoding::Binary => Some(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

/// Thread-safe string interner.
///
/// Stores one copy of each unique string and returns lightweight handles.
/// Cloning shares the underlying storage.
#[derive(Clone)]
pub struct StringInterner {
    rodeo: Arc<ThreadedRodeo>,
}

impl StringInterner {
    /// Create a new string interner.
    pub fn new() -> Self {
        Self {
            rodeo: Arc::new(ThreadedRodeo::new()),
        }
    }

    /// Intern a string, returning a handle to the interned value.
    /// If the string was already interned, returns the existing handle.
    #[inline]
    pub fn intern(&self, s: &str) -> InternedString {
        InternedString::from_spur(self.rodeo.get_or_intern(s))
    }

    /// Intern a symbol arriving as raw bytes under a source encoding.
    /// Returns `None` when the bytes are invalid for the encoding.
    pub fn intern_symbol(&self, bytes: &[u8], encoding: Encoding) -> Option<InternedString> {
        encoding.decode(bytes).map(|s| self.intern(&s))
    }

    /// Look up an already-interned string without interning it if absent.
    #[inline]
    pub fn get(&self, s: &str) -> Option<InternedString> {
        self.rodeo.get(s).map(InternedString::from_spur)
    }

    /// Resolve an interned string handle back to its string content.
    #[inline]
    pub fn resolve(&self, key: InternedString) -> &str {
        self.rodeo.resolve(&key.as_spur())
    }

    /// Returns the number of interned strings.
    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    /// Returns true if no strings have been interned.
    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StringInterner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringInterner")
            .field("len", &self.len())
            .finish()
    }
}
