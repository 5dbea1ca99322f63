/*
    Copyright 2025 TII (SSRC) and the contributors
    SPDX-License-Identifier: Apache-2.0
*/
use jsonc_parser::ParseOptions;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Parsed `devcontainer.json`. Keys keep the order they were read in.
pub type Document = Map<String, Value>;

#[derive(Error, Clone, PartialEq, Eq, Debug)]
pub enum ParseError {
    #[error("{0}")]
    Syntax(String),
    #[error("document is empty")]
    Empty,
    #[error("top-level value must be an object")]
    NotAnObject,
}

/// Parse JSON with `//` and `/* */` comments and trailing commas.
pub fn parse(s: &str) -> Result<Document, ParseError> {
    let s = s.strip_prefix('\u{feff}').unwrap_or(s);
    let options = ParseOptions {
        allow_loose_object_property_names: false,
        ..Default::default()
    };

    let value = jsonc_parser::parse_to_serde_value(s, &options)
        .map_err(|e| ParseError::Syntax(e.to_string()))?;

    match value {
        Some(Value::Object(doc)) => Ok(doc),
        Some(_) => Err(ParseError::NotAnObject),
        None => Err(ParseError::Empty),
    }
}

/// Canonical layout: 4 space indentation, keys in document order.
pub fn to_string(doc: &Document) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    doc.serialize(&mut ser)?;

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COMMENTED: &str = r#"// For format details, see https://aka.ms/devcontainer.json
{
    "name": "Rust", // inline
    /* block
       comment */
    "image": "mcr.microsoft.com/devcontainers/rust:1",
    "runArgs": [
        "--cap-add=SYS_PTRACE",
        "--security-opt", "seccomp=unconfined",
    ],
    "remoteEnv": { "URL": "http://example.com/*not a comment*/", },
}
"#;

    #[test]
    fn parses_comments_and_trailing_commas() {
        let doc = parse(COMMENTED).unwrap();
        assert_eq!(doc["name"], "Rust");
        assert_eq!(
            doc["runArgs"],
            json!(["--cap-add=SYS_PTRACE", "--security-opt", "seccomp=unconfined"])
        );
        assert_eq!(doc["remoteEnv"]["URL"], "http://example.com/*not a comment*/");
    }

    #[test]
    fn keeps_key_order() {
        let doc = parse(r#"{"z": 1, "a": 2, "m": {"y": 1, "b": 2}}"#).unwrap();
        let keys: Vec<_> = doc.keys().cloned().collect();
        assert_eq!(keys, ["z", "a", "m"]);
        assert_eq!(
            to_string(&doc).unwrap(),
            "{\n    \"z\": 1,\n    \"a\": 2,\n    \"m\": {\n        \"y\": 1,\n        \"b\": 2\n    }\n}"
        );
    }

    #[test]
    fn commas_and_slashes_inside_strings_survive() {
        let doc = parse(r#"{"a": "x, ]", "b": "// no", "c": "quote \" , }"}"#).unwrap();
        assert_eq!(doc["a"], "x, ]");
        assert_eq!(doc["b"], "// no");
        assert_eq!(doc["c"], "quote \" , }");
    }

    #[test]
    fn unterminated_comment_is_a_syntax_error() {
        let err = parse("{\n  \"a\": 1 /* open\n}").unwrap_err();
        assert!(matches!(err, ParseError::Syntax(_)), "{err:?}");
    }

    #[test]
    fn reports_syntax_errors() {
        let err = parse("{\n  // comment\n  \"a\": @\n}").unwrap_err();
        match err {
            ParseError::Syntax(message) => assert!(!message.is_empty()),
            e => panic!("unexpected error {e:?}"),
        }
        assert!(matches!(parse("{ name: 1 }").unwrap_err(), ParseError::Syntax(_)));
    }

    #[test]
    fn rejects_non_object_root() {
        assert_eq!(parse("[1, 2]").unwrap_err(), ParseError::NotAnObject);
        assert_eq!(parse("").unwrap_err(), ParseError::Empty);
        assert_eq!(parse("// nothing\n").unwrap_err(), ParseError::Empty);
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        assert!(parse("\u{feff}{}").unwrap().is_empty());
    }
}
