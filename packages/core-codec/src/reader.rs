//! Token reader over an in-memory document.
//!
//! `DocumentReader` walks a borrowed `Value` and hands out tokens the way a
//! pull parser would. Nodes live in an arena and are linked through `next`.
//! A composite is expanded one level at a time, the first time the cursor
//! steps into it:
//!
//! ```text
//! before:  Start ──────────────────────────────► End ──► (continuation)
//! after:   Start ──► Field ──► Value ──► ... ──► End ──► (continuation)
//! ```
//!
//! Every Start node gets its End node when it is created, so skipping a
//! subtree is a single jump to `End.next` no matter how large it is.

use std::borrow::Cow;

use bytes::Bytes;

use crate::classify::classify;
use crate::token::TokenKind;
use crate::value::{OpaqueValue, Value};
use crate::Error;

/// Index into the reader's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct NodeId(usize);

impl NodeId {
    fn new(index: usize) -> Self {
        NodeId(index)
    }

    fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct Node<'a> {
    kind: TokenKind,
    /// Field name for members of an object (on the field-name node, the
    /// value node, and both ends of a composite value).
    name: Option<Cow<'a, str>>,
    /// Position within the enclosing array.
    index: Option<usize>,
    /// `None` for field names, end tokens, and owned composites once their
    /// children have been split off.
    value: Option<Cow<'a, Value>>,
    /// Start node of the enclosing composite.
    parent: Option<NodeId>,
    depth: usize,
    next: Option<NodeId>,
    /// Paired end node, set on start nodes only.
    end: Option<NodeId>,
    expanded: bool,
}

/// A linked run of nodes produced for one child.
struct Segment {
    head: NodeId,
    tail: NodeId,
}

enum ChildKey<'a> {
    Field(Cow<'a, str>),
    Index(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Before,
    At(NodeId),
    Cleared(NodeId),
    Done,
}

/// Where the cursor sits in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    /// Before the first token, or on the root value itself.
    AtRoot,
    InObject,
    InArray,
    /// Past the last token.
    Done,
}

/// A pull-style token cursor over a borrowed document.
///
/// # Example
///
/// ```rust
/// use docstream_core::{DocumentReader, TokenKind, Value};
///
/// let doc: Value = [("n", 1)].into_iter().collect();
/// let mut reader = DocumentReader::new(&doc);
///
/// assert_eq!(reader.advance(), Some(TokenKind::StartObject));
/// assert_eq!(reader.advance(), Some(TokenKind::FieldName));
/// assert_eq!(reader.current_name(), Some("n"));
/// reader.advance();
/// assert_eq!(reader.as_i32().unwrap(), 1);
/// assert_eq!(reader.advance(), Some(TokenKind::EndObject));
/// assert_eq!(reader.advance(), None);
/// ```
#[derive(Debug)]
pub struct DocumentReader<'a> {
    nodes: Vec<Node<'a>>,
    root: NodeId,
    position: Position,
    last_cleared: Option<NodeId>,
}

impl<'a> DocumentReader<'a> {
    /// Create a reader positioned before the first token of `document`.
    pub fn new(document: &'a Value) -> Self {
        let mut reader = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            position: Position::Before,
            last_cleared: None,
        };
        let segment = reader.push_value(Cow::Borrowed(document), None, None, 0);
        reader.root = segment.head;
        reader
    }

    // ==================== Cursor movement ====================

    /// Move to the next token, descending into composites.
    ///
    /// Returns `None` once the stream is exhausted.
    pub fn advance(&mut self) -> Option<TokenKind> {
        self.step(false)
    }

    /// Move to the next token; on a start token, jump past its whole subtree
    /// without materializing it.
    pub fn advance_skip_children(&mut self) -> Option<TokenKind> {
        self.step(true)
    }

    /// On a start token, move onto its matching end token.
    ///
    /// The following `advance()` then continues after the composite. Does
    /// nothing on any other token.
    pub fn skip_children(&mut self) {
        if let Position::At(id) = self.position {
            if let Some(end) = self.node(id).end {
                tracing::trace!(node = id.0, "skipping children");
                self.position = Position::At(end);
            }
        }
    }

    /// Drop the current token without moving forward.
    ///
    /// `current_token()` reports nothing until the next `advance()`, which
    /// resumes after the cleared token.
    pub fn clear(&mut self) {
        if let Position::At(id) = self.position {
            self.last_cleared = Some(id);
            self.position = Position::Cleared(id);
        }
    }

    fn step(&mut self, skip: bool) -> Option<TokenKind> {
        let next = match self.position {
            Position::Before => Some(self.root),
            Position::At(id) | Position::Cleared(id) => self.successor(id, skip),
            Position::Done => None,
        };
        self.position = match next {
            Some(id) => Position::At(id),
            None => Position::Done,
        };
        next.map(|id| self.node(id).kind)
    }

    fn successor(&mut self, id: NodeId, skip: bool) -> Option<NodeId> {
        let node = self.node(id);
        if let Some(end) = node.end {
            if skip {
                tracing::trace!(node = id.0, "skipping subtree");
                return self.node(end).next;
            }
            if !node.expanded {
                self.expand(id);
            }
        }
        self.node(id).next
    }

    // ==================== Introspection ====================

    /// The token under the cursor, `None` before the start, after the end,
    /// or after `clear()`.
    pub fn current_token(&self) -> Option<TokenKind> {
        self.current().map(|node| node.kind)
    }

    /// Kind of the token most recently dropped by `clear()`.
    pub fn last_cleared(&self) -> Option<TokenKind> {
        self.last_cleared.map(|id| self.node(id).kind)
    }

    /// Field name of the current token when it belongs to an object member.
    pub fn current_name(&self) -> Option<&str> {
        self.current()?.name.as_deref()
    }

    /// Position of the current token within its enclosing array.
    pub fn current_index(&self) -> Option<usize> {
        self.current()?.index
    }

    /// The document value behind the current token.
    ///
    /// Start tokens expose the whole composite. Field names and end tokens
    /// have no value.
    pub fn current_value(&self) -> Option<&Value> {
        self.current()?.value.as_deref()
    }

    /// Nesting depth of the current token; the root value is at depth 0.
    pub fn depth(&self) -> Option<usize> {
        self.current().map(|node| node.depth)
    }

    pub fn state(&self) -> ReadState {
        let id = match self.position {
            Position::Before => return ReadState::AtRoot,
            Position::Done => return ReadState::Done,
            Position::At(id) | Position::Cleared(id) => id,
        };
        match self.node(id).parent.map(|p| self.node(p).kind) {
            None => ReadState::AtRoot,
            Some(TokenKind::StartArray) => ReadState::InArray,
            Some(_) => ReadState::InObject,
        }
    }

    /// Number of nodes built so far. Grows only as composites are entered.
    pub fn materialized_nodes(&self) -> usize {
        self.nodes.len()
    }

    // ==================== Typed accessors ====================

    pub fn as_bool(&self) -> Result<bool, Error> {
        match self.current_scalar(TokenKind::Bool) {
            Some(Value::Bool(b)) => Ok(*b),
            _ => Err(self.mismatch("bool")),
        }
    }

    /// Read the current integer as 32 bits; a 64-bit value that does not
    /// fit is an overflow, never truncated.
    pub fn as_i32(&self) -> Result<i32, Error> {
        match self.current_value() {
            Some(Value::Int32(i)) => Ok(*i),
            Some(Value::Int64(i)) => i32::try_from(*i).map_err(|_| Error::overflow(i, "i32")),
            _ => Err(self.mismatch("int32")),
        }
    }

    /// Read the current integer as 64 bits, widening 32-bit values.
    pub fn as_i64(&self) -> Result<i64, Error> {
        match self.current_value() {
            Some(Value::Int32(i)) => Ok(i64::from(*i)),
            Some(Value::Int64(i)) => Ok(*i),
            _ => Err(self.mismatch("int64")),
        }
    }

    pub fn as_f64(&self) -> Result<f64, Error> {
        match self.current_scalar(TokenKind::Float) {
            Some(Value::Float64(f)) => Ok(*f),
            _ => Err(self.mismatch("float64")),
        }
    }

    pub fn as_str(&self) -> Result<&str, Error> {
        match self.current_scalar(TokenKind::String) {
            Some(Value::String(s)) => Ok(s),
            _ => Err(self.mismatch("string")),
        }
    }

    pub fn as_binary(&self) -> Result<&Bytes, Error> {
        match self.current_scalar(TokenKind::Binary) {
            Some(Value::Binary(b)) => Ok(b),
            _ => Err(self.mismatch("binary")),
        }
    }

    pub fn as_opaque(&self) -> Result<&OpaqueValue, Error> {
        match self.current_scalar(TokenKind::Opaque) {
            Some(Value::Opaque(o)) => Ok(o),
            _ => Err(self.mismatch("opaque")),
        }
    }

    fn current_scalar(&self, kind: TokenKind) -> Option<&Value> {
        if self.current_token() == Some(kind) {
            self.current_value()
        } else {
            None
        }
    }

    fn mismatch(&self, expected: &str) -> Error {
        Error::mismatch(expected, self.current_token())
    }

    fn current(&self) -> Option<&Node<'a>> {
        match self.position {
            Position::At(id) => Some(self.node(id)),
            _ => None,
        }
    }

    // ==================== Arena ====================

    fn node(&self, id: NodeId) -> &Node<'a> {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<'a> {
        &mut self.nodes[id.index()]
    }

    fn alloc(&mut self, node: Node<'a>) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Build the node(s) for one value. Composites get a start/end pair
    /// linked to each other; the tail's `next` is left for the caller.
    fn push_value(
        &mut self,
        value: Cow<'a, Value>,
        key: Option<ChildKey<'a>>,
        parent: Option<NodeId>,
        depth: usize,
    ) -> Segment {
        let kind = classify(&value);
        let (name, index) = match key {
            Some(ChildKey::Field(name)) => (Some(name), None),
            Some(ChildKey::Index(i)) => (None, Some(i)),
            None => (None, None),
        };

        let closing = kind.closing();
        let head = self.alloc(Node {
            kind,
            name: name.clone(),
            index,
            value: Some(value),
            parent,
            depth,
            next: None,
            end: None,
            expanded: false,
        });

        let Some(end_kind) = closing else {
            return Segment { head, tail: head };
        };

        let tail = self.alloc(Node {
            kind: end_kind,
            name,
            index,
            value: None,
            parent,
            depth,
            next: None,
            end: None,
            expanded: true,
        });
        let start = self.node_mut(head);
        start.next = Some(tail);
        start.end = Some(tail);
        Segment { head, tail }
    }

    /// Splice the children of a start node between it and its end node.
    fn expand(&mut self, id: NodeId) {
        let (children, end, depth) = {
            let node = self.node_mut(id);
            // The cursor never returns to an expanded start node, so owned
            // values are moved into their children rather than cloned.
            let source = match node.value.take() {
                Some(Cow::Borrowed(value)) => {
                    node.value = Some(Cow::Borrowed(value));
                    Some(Cow::Borrowed(value))
                }
                owned => owned,
            };
            let children = source.map(child_values).unwrap_or_default();
            (children, node.end, node.depth + 1)
        };
        let Some(end) = end else {
            return;
        };

        let mut segments = Vec::with_capacity(children.len() * 2);
        for (key, value) in children {
            if let ChildKey::Field(name) = &key {
                let field = self.alloc(Node {
                    kind: TokenKind::FieldName,
                    name: Some(name.clone()),
                    index: None,
                    value: None,
                    parent: Some(id),
                    depth,
                    next: None,
                    end: None,
                    expanded: true,
                });
                segments.push(Segment {
                    head: field,
                    tail: field,
                });
            }
            segments.push(self.push_value(value, Some(key), Some(id), depth));
        }

        tracing::trace!(node = id.0, nodes = segments.len(), "expanded composite");

        let mut prev = id;
        for segment in &segments {
            self.node_mut(prev).next = Some(segment.head);
            prev = segment.tail;
        }
        self.node_mut(prev).next = Some(end);
        self.node_mut(id).expanded = true;
    }
}

impl Iterator for DocumentReader<'_> {
    type Item = TokenKind;

    fn next(&mut self) -> Option<TokenKind> {
        self.advance()
    }
}

/// Children of a composite, borrowing from the source tree where possible.
fn child_values<'a>(value: Cow<'a, Value>) -> Vec<(ChildKey<'a>, Cow<'a, Value>)> {
    match value {
        Cow::Borrowed(value) => match value {
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| (ChildKey::Field(Cow::Borrowed(k.as_str())), Cow::Borrowed(v)))
                .collect(),
            Value::Array(arr) => arr
                .iter()
                .enumerate()
                .map(|(i, v)| (ChildKey::Index(i), Cow::Borrowed(v)))
                .collect(),
            other => embedded_entries(other),
        },
        Cow::Owned(value) => match value {
            Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| (ChildKey::Field(Cow::Owned(k)), Cow::Owned(v)))
                .collect(),
            Value::Array(arr) => arr
                .into_iter()
                .enumerate()
                .map(|(i, v)| (ChildKey::Index(i), Cow::Owned(v)))
                .collect(),
            other => embedded_entries(&other),
        },
    }
}

fn embedded_entries<'a>(value: &Value) -> Vec<(ChildKey<'a>, Cow<'a, Value>)> {
    match value {
        Value::Opaque(opaque) => opaque
            .entries()
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (ChildKey::Field(Cow::Owned(k)), Cow::Owned(v)))
            .collect(),
        _ => Vec::new(),
    }
}
