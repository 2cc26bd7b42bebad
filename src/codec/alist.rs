use super::{decode_atom, decode_value, Cursor};
use crate::common::{Handle, Value};
use crate::error::DecodeError;

/// Encode `((key . value)(key . value)...)`.
pub fn encode_alist<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a Handle, &'a Value)>,
{
    let mut out = String::from("(");

    for (key, value) in pairs {
        out.push('(');
        out.push_str(&key.to_short_string());
        out.push_str(" . ");
        out.push_str(&value.to_short_string());
        out.push(')');
    }

    out.push(')');
    out
}

/// Decode a complete association list.
pub fn decode_alist(text: &str) -> Result<Vec<(Handle, Value)>, DecodeError> {
    let mut cursor = Cursor::new(text);

    if !cursor.eat(b'(') {
        return Err(cursor.malformed("association list", 0));
    }

    let (pairs, closed) = read_pairs(&mut cursor)?;

    cursor.skip_whitespace();
    if !closed || !cursor.is_at_end() {
        return Err(cursor.malformed("association list", 0));
    }

    Ok(pairs)
}

/// Decode `(key . value)` pairs from the cursor until the closing paren of
/// the enclosing list, which is consumed, or the end of the text.
///
/// The cursor may start at any pair boundary, so a list that was appended to
/// can be decoded from where the previous decode stopped.
pub fn decode_pairs(cursor: &mut Cursor<'_>) -> Result<Vec<(Handle, Value)>, DecodeError> {
    Ok(read_pairs(cursor)?.0)
}

/// The pairs, and whether the closing paren was reached.
fn read_pairs(cursor: &mut Cursor<'_>) -> Result<(Vec<(Handle, Value)>, bool), DecodeError> {
    let mut pairs = Vec::new();

    loop {
        cursor.skip_whitespace();
        let start = cursor.pos();

        match cursor.peek() {
            None => return Ok((pairs, false)),
            Some(b')') => {
                cursor.advance(1);
                return Ok((pairs, true));
            }
            Some(b'(') => {
                cursor.advance(1);
                let key = decode_atom(cursor)?;

                if !cursor.eat(b'.') {
                    return Err(cursor.malformed("association list", start));
                }

                let value = decode_value(cursor)?;

                if !cursor.eat(b')') {
                    return Err(cursor.malformed("association list", start));
                }

                pairs.push((key, value));
            }
            Some(_) => return Err(cursor.malformed("association list", start)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::AtomType;

    fn pairs() -> Vec<(Handle, Value)> {
        vec![
            (
                Handle::node(AtomType::PREDICATE_NODE, "weights"),
                Value::Float(vec![0.5, 1.0 / 7.0]),
            ),
            (
                Handle::link(
                    AtomType::LIST_LINK,
                    vec![Handle::node(AtomType::CONCEPT_NODE, "k")],
                ),
                Value::Link(vec![Value::String(vec!["x".into()])]),
            ),
        ]
    }

    #[test]
    fn round_trip() {
        let pairs = pairs();
        let encoded = encode_alist(pairs.iter().map(|(k, v)| (k, v)));

        assert_eq!(
            encoded,
            format!(
                "(({} . {})({} . {}))",
                pairs[0].0, pairs[0].1, pairs[1].0, pairs[1].1
            )
        );
        assert_eq!(decode_alist(&encoded).unwrap(), pairs);
    }

    #[test]
    fn empty() {
        assert_eq!(encode_alist(Vec::<(&Handle, &Value)>::new()), "()");
        assert!(decode_alist("()").unwrap().is_empty());
    }

    #[test]
    fn restart_mid_string() {
        let pairs = pairs();
        let mut text = encode_alist(pairs[..1].iter().map(|(k, v)| (k, v)));
        // Drop the closing paren and append another pair.
        text.pop();
        let resume_at = text.len();
        text.push_str(&format!("({} . {}))", pairs[1].0, pairs[1].1));

        let mut cursor = Cursor::at(&text, resume_at);
        let tail = decode_pairs(&mut cursor).unwrap();

        assert_eq!(tail, pairs[1..].to_vec());
        assert_eq!(decode_alist(&text).unwrap(), pairs);
    }

    #[test]
    fn trailing_backslash_in_string_value() {
        let pairs = vec![
            (
                Handle::node(AtomType::PREDICATE_NODE, "path"),
                Value::String(vec!["a\\".into()]),
            ),
            (
                Handle::node(AtomType::PREDICATE_NODE, "nested"),
                Value::Link(vec![Value::String(vec![r"C:\dir\".into()])]),
            ),
        ];

        let encoded = encode_alist(pairs.iter().map(|(k, v)| (k, v)));

        assert_eq!(decode_alist(&encoded).unwrap(), pairs);
    }

    #[test]
    fn escaped_quotes_in_keys() {
        let pairs = vec![(
            Handle::node(AtomType::PREDICATE_NODE, "say \"hi\" (twice)"),
            Value::Float(vec![2.0]),
        )];

        let encoded = encode_alist(pairs.iter().map(|(k, v)| (k, v)));

        assert_eq!(decode_alist(&encoded).unwrap(), pairs);
    }

    #[test]
    fn deep_keys_are_rejected() {
        let depth = 100_000;
        let text = format!(
            "(({}{} . (FloatValue 1)))",
            "(ListLink ".repeat(depth),
            ")".repeat(depth)
        );

        assert!(matches!(
            decode_alist(&text),
            Err(DecodeError::MalformedAtom(_))
        ));
    }

    #[test]
    fn malformed_pair_is_an_error() {
        let missing_dot = r#"(((ConceptNode "k") (FloatValue 1)))"#;
        assert!(decode_alist(missing_dot).is_err());

        let bad_value = r#"(((ConceptNode "k") . (FloatValue 1 x)))"#;
        assert!(matches!(
            decode_alist(bad_value),
            Err(DecodeError::MalformedValue {
                kind: "FloatValue",
                ..
            })
        ));

        let unknown = r#"(((ConceptNode "k") . (Nope)))"#;
        assert!(matches!(
            decode_alist(unknown),
            Err(DecodeError::UnknownValueType(_))
        ));

        assert!(decode_alist("((ConceptNode").is_err());
        assert!(matches!(
            decode_alist(r#"(((ConceptNode "k") . (FloatValue 1))"#),
            Err(DecodeError::MalformedValue {
                kind: "association list",
                ..
            })
        ));
        assert!(decode_alist(r#"(((ConceptNode "k") . (FloatValue 1))"#).is_err());
        assert!(decode_alist("junk").is_err());
    }
}
