//! Resumability: feeding a document in chunks must be indistinguishable
//! from feeding it whole.

use jsondom::{
    parse, parse_in, Error, MonotonicResource, ParseOptions, Parser, ResourceHandle, Value,
    ValueBuilder,
};

const GLOSSARY: &str = r#"{
    "glossary": {
        "title": "example glossary",
        "GlossDiv": {
            "title": "S",
            "GlossList": {
                "GlossEntry": {
                    "ID": "SGML",
                    "SortAs": "SGML",
                    "GlossTerm": "Standard Generalized Markup Language",
                    "Acronym": "SGML",
                    "Abbrev": "ISO 8879:1986",
                    "GlossDef": {
                        "para": "A meta-markup language, used to create markup languages such as DocBook.",
                        "GlossSeeAlso": ["GML", "XML"]
                    },
                    "GlossSee": "markup"
                }
            }
        }
    }
}"#;

const DOCUMENTS: &[&str] = &[
    GLOSSARY,
    r#"[1, -1, 9223372036854775807, 9223372036854775808, 1.5]"#,
    r#""😀 smile é\t\"quoted\"""#,
    r#"{"":{"nested":[[],{},[[[null]]]],"π é 漢字":"π é 漢字"}}"#,
    "-0.000123e+9",
    "[true,false,null,0,-0,1e-20]",
];

fn parse_chunked(doc: &[u8], chunk_len: usize) -> Result<Value, Error> {
    let mut parser = Parser::new(ValueBuilder::new(ResourceHandle::default()));
    for chunk in doc.chunks(chunk_len.max(1)) {
        parser.write_some(chunk)?;
    }
    parser.finish()?;
    parser.into_handler().into_value()
}

#[test]
fn every_two_way_split_matches_one_shot() {
    for doc in DOCUMENTS {
        let bytes = doc.as_bytes();
        let whole = parse(bytes).unwrap();
        for split in 0..=bytes.len() {
            let mut parser = Parser::new(ValueBuilder::new(ResourceHandle::default()));
            parser.write_some(&bytes[..split]).unwrap();
            parser.write_some(&bytes[split..]).unwrap();
            parser.finish().unwrap();
            let split_value = parser.into_handler().into_value().unwrap();
            assert_eq!(split_value, whole, "split at {split} diverged for {doc}");
        }
    }
}

#[test]
fn single_byte_feeds_match_one_shot() {
    for doc in DOCUMENTS {
        let whole = parse(doc.as_bytes()).unwrap();
        let trickled = parse_chunked(doc.as_bytes(), 1).unwrap();
        assert_eq!(trickled, whole, "single-byte feed diverged for {doc}");
    }
}

#[test]
fn assorted_chunk_sizes_match_one_shot() {
    for doc in DOCUMENTS {
        let whole = parse(doc.as_bytes()).unwrap();
        for chunk_len in [2, 3, 5, 7, 16] {
            let value = parse_chunked(doc.as_bytes(), chunk_len).unwrap();
            assert_eq!(value, whole, "chunk length {chunk_len} diverged for {doc}");
        }
    }
}

#[test]
fn first_wins_on_duplicate_keys() {
    let value = parse(r#"{"a":1,"b":2,"a":3}"#).unwrap();
    let obj = value.as_object().unwrap();
    assert_eq!(obj.len(), 2);
    assert_eq!(obj["a"].as_i64(), Ok(1));
    assert_eq!(obj["b"].as_i64(), Ok(2));
    let keys: Vec<_> = obj.keys().collect();
    assert_eq!(keys, ["a", "b"]);
}

#[test]
fn number_kinds_at_the_boundaries() {
    let value = parse("[1, -1, 9223372036854775807, 9223372036854775808, 1.5]").unwrap();
    let arr = value.as_array().unwrap();
    assert!(arr[0].is_i64());
    assert!(arr[1].is_i64());
    assert_eq!(arr[2].as_i64(), Ok(i64::MAX));
    assert_eq!(arr[3].as_u64(), Ok(9_223_372_036_854_775_808));
    assert_eq!(arr[4].as_f64(), Ok(1.5));
}

#[test]
fn surrogate_pair_becomes_four_utf8_bytes() {
    let value = parse(r#""😀""#).unwrap();
    let s = value.as_string().unwrap();
    assert_eq!(s.as_bytes(), [0xF0, 0x9F, 0x98, 0x80]);
}

#[test]
fn truncated_object_reports_incomplete() {
    assert_eq!(parse(r#"{"x":"#).err(), Some(Error::Incomplete));
}

#[test]
fn second_top_level_token_reports_extra_data() {
    assert_eq!(parse("true false").err(), Some(Error::ExtraData));
}

#[test]
fn byte_order_mark_is_rejected() {
    assert_eq!(parse(b"\xEF\xBB\xBF{}".as_slice()).err(), Some(Error::Syntax));
}

#[test]
fn depth_limit_boundary() {
    let limit = ParseOptions::DEFAULT_MAX_DEPTH;
    let at_limit: String = "[".repeat(limit) + &"]".repeat(limit);
    assert!(parse(&at_limit).is_ok());
    let beyond: String = "[".repeat(limit + 1) + &"]".repeat(limit + 1);
    assert_eq!(parse(&beyond).err(), Some(Error::TooDeep));
}

#[test]
fn chunked_errors_surface_at_the_offending_chunk() {
    let mut parser = Parser::new(ValueBuilder::new(ResourceHandle::default()));
    parser.write_some(b"{\"a\": tru").unwrap();
    assert_eq!(parser.write_some(b"X}"), Err(Error::Syntax));
    // terminal until reset
    assert_eq!(parser.write_some(b"}"), Err(Error::Syntax));
}

#[test]
fn arena_backed_parse_end_to_end() {
    let arena = ResourceHandle::new(MonotonicResource::new());
    let value = parse_in(GLOSSARY, arena.clone()).unwrap();
    assert_eq!(value.storage(), &arena);
    let title = value.as_object().unwrap()["glossary"].as_object().unwrap()["title"]
        .as_string()
        .unwrap();
    assert_eq!(title.as_str().unwrap(), "example glossary");
    // the whole tree compares equal to a default-heap parse
    assert_eq!(value, parse(GLOSSARY).unwrap());
}
