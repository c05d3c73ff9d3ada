//! Property-based tests for the reader/writer bridge.
//!
//! These check structural guarantees over generated documents rather than
//! hand-picked ones.

use docstream_core::{
    copy_current_event, DocumentCodec, DocumentReader, Error, TokenKind, Value,
};
use proptest::prelude::*;

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 128,
        max_shrink_iters: 200,
        ..ProptestConfig::default()
    }
}

// =============================================================================
// Generators
// =============================================================================

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::Int32),
        any::<i64>().prop_map(Value::Int64),
        (-1.0e12f64..1.0e12).prop_map(Value::Float64),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
        prop::collection::vec(any::<u8>(), 0..16).prop_map(|b| Value::Binary(b.into())),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{1,6}", inner), 0..6)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}

fn arb_document() -> impl Strategy<Value = Value> {
    prop::collection::vec(("[a-z]{1,6}", arb_value()), 0..8)
        .prop_map(|entries| Value::Object(entries.into_iter().collect()))
}

// =============================================================================
// Helpers
// =============================================================================

/// Everything observable about one token.
#[derive(Debug, PartialEq)]
struct Observed {
    kind: TokenKind,
    name: Option<String>,
    index: Option<usize>,
    depth: Option<usize>,
}

fn observe(reader: &DocumentReader<'_>) -> Option<Observed> {
    Some(Observed {
        kind: reader.current_token()?,
        name: reader.current_name().map(str::to_string),
        index: reader.current_index(),
        depth: reader.depth(),
    })
}

fn drain(reader: &mut DocumentReader<'_>) -> Vec<Observed> {
    let mut out = Vec::new();
    while reader.advance().is_some() {
        out.extend(observe(reader));
    }
    out
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(config())]

    /// Decoding then re-encoding every token reproduces the document.
    #[test]
    fn round_trip(doc in arb_document()) {
        let codec = DocumentCodec::new();
        let mut reader = codec.decoder(&doc);
        let mut writer = codec.encoder();
        while reader.advance().is_some() {
            copy_current_event(&reader, &mut writer).unwrap();
        }
        prop_assert_eq!(writer.finish().unwrap(), doc);
    }

    /// Start and end tokens always pair up.
    #[test]
    fn starts_and_ends_balance(doc in arb_document()) {
        let mut open = Vec::new();
        for kind in DocumentReader::new(&doc) {
            if kind.is_start() {
                open.push(kind);
            } else if kind.is_end() {
                let start = open.pop();
                prop_assert_eq!(start.and_then(TokenKind::closing), Some(kind));
            }
        }
        prop_assert!(open.is_empty());
    }

    /// Skipping a subtree lands where walking through it would.
    #[test]
    fn skip_matches_full_walk(doc in arb_document(), pick in any::<prop::sample::Index>()) {
        let starts: Vec<usize> = DocumentReader::new(&doc)
            .enumerate()
            .filter(|(_, kind)| kind.is_start())
            .map(|(i, _)| i)
            .collect();
        let position = starts[pick.index(starts.len())];

        let mut skipping = DocumentReader::new(&doc);
        let mut walking = DocumentReader::new(&doc);
        for _ in 0..=position {
            skipping.advance();
            walking.advance();
        }

        skipping.advance_skip_children();

        let mut open = 1usize;
        while open > 0 {
            let kind = walking.advance().unwrap();
            if kind.is_start() {
                open += 1;
            } else if kind.is_end() {
                open -= 1;
            }
        }
        walking.advance();

        prop_assert_eq!(observe(&skipping), observe(&walking));
        prop_assert_eq!(drain(&mut skipping), drain(&mut walking));
    }

    /// Values written through the typed writers read back identically.
    #[test]
    fn scalars_survive(value in arb_scalar()) {
        let codec = DocumentCodec::new();
        let doc = codec.encode(|w| {
            w.write_start_object()?;
            w.write_field_name("v")?;
            w.write_value(value.clone())?;
            w.write_end_object()
        }).unwrap();

        let mut reader = codec.decoder(&doc);
        reader.advance();
        reader.advance();
        reader.advance();
        prop_assert_eq!(reader.current_value(), Some(&value));
    }
}

// =============================================================================
// Fixed scenarios
// =============================================================================

#[test]
fn empty_object_reads_open_close() {
    let codec = DocumentCodec::new();
    let doc = codec
        .encode(|w| {
            w.write_start_object()?;
            w.write_end_object()
        })
        .unwrap();
    let tokens: Vec<TokenKind> = codec.decoder(&doc).collect();
    assert_eq!(tokens, [TokenKind::StartObject, TokenKind::EndObject]);
}

#[test]
fn empty_array_reads_open_close() {
    let codec = DocumentCodec::new();
    let doc = codec
        .encode(|w| {
            w.write_start_object()?;
            w.write_field_name("list")?;
            w.write_start_array()?;
            w.write_end_array()?;
            w.write_end_object()
        })
        .unwrap();
    let tokens: Vec<TokenKind> = codec.decoder(&doc).collect();
    assert_eq!(
        tokens,
        [
            TokenKind::StartObject,
            TokenKind::FieldName,
            TokenKind::StartArray,
            TokenKind::EndArray,
            TokenKind::EndObject,
        ]
    );
}

#[test]
fn max_int64_needs_wide_accessor() {
    let codec = DocumentCodec::new();
    let doc = codec
        .encode(|w| {
            w.write_start_object()?;
            w.write_field_name("n")?;
            w.write_i64(9223372036854775807)?;
            w.write_end_object()
        })
        .unwrap();

    let mut reader = codec.decoder(&doc);
    reader.advance();
    reader.advance();
    reader.advance();
    assert!(matches!(reader.as_i32(), Err(Error::NumericOverflow { .. })));
    assert_eq!(reader.as_i64().unwrap(), 9223372036854775807);
}

#[test]
fn array_first_is_rejected() {
    let mut writer = DocumentCodec::new().encoder();
    assert!(matches!(
        writer.write_start_array(),
        Err(Error::StructuralViolation { .. })
    ));
    assert!(writer.write_start_object().is_ok());
}

#[test]
fn clear_then_resume() {
    let doc: Value = [("a", 1), ("b", 2)].into_iter().collect();
    let mut reader = DocumentReader::new(&doc);
    reader.advance();
    reader.advance();
    reader.advance();
    reader.clear();
    assert_eq!(reader.last_cleared(), Some(TokenKind::Int(docstream_core::IntWidth::W32)));
    assert_eq!(reader.advance(), Some(TokenKind::FieldName));
    assert_eq!(reader.current_name(), Some("b"));
}
