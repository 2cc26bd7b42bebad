//! Values attached to atoms under a key atom.

use std::fmt::{self, Display, Formatter, Write};

#[derive(Clone, Debug, PartialEq)]
/// An immutable payload. Replacing a value is always a whole-value overwrite.
pub enum Value {
    /// Numeric vector.
    Float(Vec<f64>),
    /// Nested list of values.
    Link(Vec<Value>),
    /// String vector.
    String(Vec<String>),
    /// Strength and confidence.
    SimpleTruth { strength: f64, confidence: f64 },
    /// Strength, confidence and count.
    CountTruth {
        strength: f64,
        confidence: f64,
        count: f64,
    },
}

impl Value {
    /// Type tag of this value, as it appears in the encoding.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Float(_) => "FloatValue",
            Value::Link(_) => "LinkValue",
            Value::String(_) => "StringValue",
            Value::SimpleTruth { .. } => "SimpleTruthValue",
            Value::CountTruth { .. } => "CountTruthValue",
        }
    }

    /// Canonical, type tagged encoding.
    ///
    /// Floats use the shortest representation that parses back to the same
    /// `f64`, so the encoding never loses precision.
    ///
    /// Strings are written between plain quotes; a string containing `"` does
    /// not survive a round trip.
    pub fn to_short_string(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = self.write_short(&mut out);
        out
    }

    fn write_short(&self, out: &mut String) -> fmt::Result {
        match self {
            Value::Float(floats) => {
                out.push_str("(FloatValue");
                for f in floats {
                    write!(out, " {}", f)?;
                }
            }
            Value::Link(values) => {
                out.push_str("(LinkValue");
                for v in values {
                    out.push(' ');
                    v.write_short(out)?;
                }
            }
            Value::String(strings) => {
                out.push_str("(StringValue");
                for s in strings {
                    write!(out, " \"{}\"", s)?;
                }
            }
            Value::SimpleTruth {
                strength,
                confidence,
            } => {
                write!(out, "(stv {} {}", strength, confidence)?;
            }
            Value::CountTruth {
                strength,
                confidence,
                count,
            } => {
                write!(out, "(CountTruthValue {} {} {}", strength, confidence, count)?;
            }
        }

        out.push(')');
        Ok(())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_short_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encodings() {
        assert_eq!(
            Value::Float(vec![1.0, 2.5, -0.125]).to_short_string(),
            "(FloatValue 1 2.5 -0.125)"
        );
        assert_eq!(
            Value::String(vec!["a b".into(), "c".into()]).to_short_string(),
            r#"(StringValue "a b" "c")"#
        );
        assert_eq!(
            Value::SimpleTruth {
                strength: 0.5,
                confidence: 0.25
            }
            .to_short_string(),
            "(stv 0.5 0.25)"
        );
        assert_eq!(
            Value::CountTruth {
                strength: 0.5,
                confidence: 0.25,
                count: 10.0
            }
            .to_short_string(),
            "(CountTruthValue 0.5 0.25 10)"
        );
        assert_eq!(
            Value::Link(vec![Value::Float(vec![1.0]), Value::Link(vec![])]).to_short_string(),
            "(LinkValue (FloatValue 1) (LinkValue))"
        );
    }

    #[test]
    fn floats_keep_full_precision() {
        let encoded = Value::Float(vec![0.1 + 0.2, 1.0 / 3.0]).to_short_string();

        assert_eq!(
            encoded,
            "(FloatValue 0.30000000000000004 0.3333333333333333)"
        );
    }
}
