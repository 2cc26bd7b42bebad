use super::Cursor;
use crate::common::Value;
use crate::error::DecodeError;

type Decoder = fn(&mut Cursor<'_>, usize) -> Result<Value, DecodeError>;

/// Type tags and their decoders. Each decoder is called with the cursor just
/// past the tag and the offset where the value started.
const DECODERS: &[(&str, Decoder)] = &[
    ("LinkValue", decode_link_value),
    ("FloatValue", decode_float_value),
    ("SimpleTruthValue", decode_simple_truth_value),
    ("stv", decode_simple_truth_value),
    ("CountTruthValue", decode_count_truth_value),
    ("StringValue", decode_string_value),
];

/// Decode one value at the cursor and advance past it.
pub fn decode_value(cursor: &mut Cursor<'_>) -> Result<Value, DecodeError> {
    cursor.skip_whitespace();
    let start = cursor.pos();
    let rest = cursor.rest();

    let tag = rest
        .strip_prefix('(')
        .and_then(|inner| {
            inner
                .split(|c: char| c.is_ascii_whitespace() || c == '(' || c == ')')
                .next()
        })
        .unwrap_or("");

    let (name, decoder) = match DECODERS.iter().find(|(name, _)| *name == tag) {
        Some((name, decoder)) => (*name, *decoder),
        None => return Err(DecodeError::UnknownValueType(rest.to_string())),
    };

    cursor.advance(1 + name.len());

    match cursor.peek() {
        Some(b')') => {}
        Some(b) if b.is_ascii_whitespace() => {}
        _ => return Err(cursor.malformed(name, start)),
    }

    cursor
        .nested(|cursor| decoder(cursor, start))
        .unwrap_or_else(|| Err(cursor.malformed(name, start)))
}

fn decode_link_value(cursor: &mut Cursor<'_>, start: usize) -> Result<Value, DecodeError> {
    let mut values = Vec::new();

    loop {
        cursor.skip_whitespace();
        match cursor.peek() {
            Some(b')') => {
                cursor.advance(1);
                return Ok(Value::Link(values));
            }
            Some(b'(') => values.push(decode_value(cursor)?),
            _ => return Err(cursor.malformed("LinkValue", start)),
        }
    }
}

fn decode_float_value(cursor: &mut Cursor<'_>, start: usize) -> Result<Value, DecodeError> {
    let mut floats = Vec::new();

    loop {
        cursor.skip_whitespace();
        match cursor.peek() {
            Some(b')') => {
                cursor.advance(1);
                return Ok(Value::Float(floats));
            }
            Some(_) => {
                let f = cursor
                    .float()
                    .ok_or_else(|| cursor.malformed("FloatValue", start))?;
                floats.push(f);
            }
            None => return Err(cursor.malformed("FloatValue", start)),
        }
    }
}

fn decode_simple_truth_value(
    cursor: &mut Cursor<'_>,
    start: usize,
) -> Result<Value, DecodeError> {
    let [strength, confidence] = fields(cursor, "SimpleTruthValue", start)?;

    Ok(Value::SimpleTruth {
        strength,
        confidence,
    })
}

fn decode_count_truth_value(cursor: &mut Cursor<'_>, start: usize) -> Result<Value, DecodeError> {
    let [strength, confidence, count] = fields(cursor, "CountTruthValue", start)?;

    Ok(Value::CountTruth {
        strength,
        confidence,
        count,
    })
}

/// Exactly `N` floats followed by the closing paren.
fn fields<const N: usize>(
    cursor: &mut Cursor<'_>,
    kind: &'static str,
    start: usize,
) -> Result<[f64; N], DecodeError> {
    let mut out = [0.0; N];

    for field in out.iter_mut() {
        *field = cursor.float().ok_or_else(|| cursor.malformed(kind, start))?;
    }

    if !cursor.eat(b')') {
        return Err(cursor.malformed(kind, start));
    }

    Ok(out)
}

// Strings are taken verbatim between plain quotes, backslashes included: an
// escaped quote inside a string ends it early.
fn decode_string_value(cursor: &mut Cursor<'_>, start: usize) -> Result<Value, DecodeError> {
    let mut strings = Vec::new();

    loop {
        cursor.skip_whitespace();
        match cursor.peek() {
            Some(b')') => {
                cursor.advance(1);
                return Ok(Value::String(strings));
            }
            Some(b'"') => {
                cursor.advance(1);
                let end = cursor
                    .find(b'"')
                    .ok_or_else(|| cursor.malformed("StringValue", start))?;
                strings.push(cursor.text[cursor.pos()..end].to_string());
                cursor.pos = end + 1;
            }
            _ => return Err(cursor.malformed("StringValue", start)),
        }
    }
}
