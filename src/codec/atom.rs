use super::Cursor;
use crate::common::{Atom, AtomType, Handle};
use crate::error::DecodeError;

/// Decode one atom in its canonical short form, e.g. `(ConceptNode "cat")` or
/// `(ListLink (ConceptNode "a") (ConceptNode "b"))`, and advance past it.
pub fn decode_atom(cursor: &mut Cursor<'_>) -> Result<Handle, DecodeError> {
    cursor.skip_whitespace();

    cursor
        .nested(atom)
        .unwrap_or_else(|| Err(DecodeError::MalformedAtom(cursor.rest().to_string())))
}

fn atom(cursor: &mut Cursor<'_>) -> Result<Handle, DecodeError> {
    let start = cursor.pos();
    let malformed = |cursor: &Cursor<'_>| {
        DecodeError::MalformedAtom(cursor.text.get(start..).unwrap_or("").to_string())
    };

    if !cursor.eat(b'(') {
        return Err(malformed(cursor));
    }

    let type_start = cursor.pos();
    while let Some(b) = cursor.peek() {
        if !(b.is_ascii_alphanumeric() || b == b'_') {
            break;
        }
        cursor.advance(1);
    }
    let kind =
        AtomType::new(&cursor.text[type_start..cursor.pos()]).map_err(|_| malformed(cursor))?;

    cursor.skip_whitespace();

    if cursor.peek() == Some(b'"') {
        cursor.advance(1);
        let name = node_name(cursor).ok_or_else(|| malformed(cursor))?;

        if !cursor.eat(b')') {
            return Err(malformed(cursor));
        }

        return Ok(Handle::new(Atom::Node { kind, name }));
    }

    let mut outgoing = Vec::new();
    loop {
        cursor.skip_whitespace();
        match cursor.peek() {
            Some(b')') => {
                cursor.advance(1);
                return Ok(Handle::new(Atom::Link { kind, outgoing }));
            }
            Some(b'(') => outgoing.push(decode_atom(cursor)?),
            _ => return Err(malformed(cursor)),
        }
    }
}

/// Unescape a quoted name, the opening quote already consumed.
fn node_name(cursor: &mut Cursor<'_>) -> Option<String> {
    let mut name = String::new();
    let mut chars = cursor.rest().char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => name.push(chars.next()?.1),
            '"' => {
                cursor.advance(i + 1);
                return Some(name);
            }
            _ => name.push(c),
        }
    }

    None
}
