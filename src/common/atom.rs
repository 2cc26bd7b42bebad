//! Atoms: the typed nodes and links of the persisted hypergraph.

use std::{
    borrow::Cow,
    fmt::{self, Debug, Display, Formatter},
    ops::Deref,
    str::FromStr,
    sync::Arc,
};

use crate::error::DecodeError;

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Name of an atom type, `[A-Za-z][A-Za-z0-9_]*`.
pub struct AtomType(Cow<'static, str>);

impl AtomType {
    pub const CONCEPT_NODE: AtomType = AtomType(Cow::Borrowed("ConceptNode"));
    pub const PREDICATE_NODE: AtomType = AtomType(Cow::Borrowed("PredicateNode"));
    pub const LIST_LINK: AtomType = AtomType(Cow::Borrowed("ListLink"));
    pub const EVALUATION_LINK: AtomType = AtomType(Cow::Borrowed("EvaluationLink"));
    pub const INHERITANCE_LINK: AtomType = AtomType(Cow::Borrowed("InheritanceLink"));

    /// Validate and wrap a type name.
    pub fn new(name: &str) -> Result<AtomType, DecodeError> {
        if !AtomType::is_valid(name) {
            return Err(DecodeError::InvalidType(name.to_string()));
        }

        Ok(AtomType(Cow::Owned(name.to_string())))
    }

    /// Returns true if `name` is a well formed type name.
    pub fn is_valid(name: &str) -> bool {
        let mut chars = name.chars();

        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AtomType {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<AtomType, DecodeError> {
        AtomType::new(s)
    }
}

impl Display for AtomType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Debug for AtomType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "AtomType({})", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// A node carries a name, a link carries an ordered outgoing set.
pub enum Atom {
    Node { kind: AtomType, name: String },
    Link { kind: AtomType, outgoing: Vec<Handle> },
}

impl Atom {
    pub fn kind(&self) -> &AtomType {
        match self {
            Atom::Node { kind, .. } | Atom::Link { kind, .. } => kind,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Atom::Node { name, .. } => Some(name),
            Atom::Link { .. } => None,
        }
    }

    /// Outgoing set; empty for nodes.
    pub fn outgoing(&self) -> &[Handle] {
        match self {
            Atom::Node { .. } => &[],
            Atom::Link { outgoing, .. } => outgoing,
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self, Atom::Node { .. })
    }

    pub fn is_link(&self) -> bool {
        matches!(self, Atom::Link { .. })
    }

    /// Canonical, order sensitive encoding, e.g.
    /// `(ListLink (ConceptNode "a") (ConceptNode "b"))`.
    ///
    /// Node names escape `"` and `\`, so distinct atoms never share an
    /// encoding.
    pub fn to_short_string(&self) -> String {
        let mut out = String::new();
        self.write_short(&mut out);
        out
    }

    fn write_short(&self, out: &mut String) {
        out.push('(');
        out.push_str(self.kind().as_str());

        match self {
            Atom::Node { name, .. } => {
                out.push_str(" \"");
                for c in name.chars() {
                    if c == '"' || c == '\\' {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push('"');
            }
            Atom::Link { outgoing, .. } => {
                for child in outgoing {
                    out.push(' ');
                    child.write_short(out);
                }
            }
        }

        out.push(')');
    }
}

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Cheap, shareable reference to an immutable [Atom]. Compared by content.
pub struct Handle(Arc<Atom>);

impl Handle {
    pub fn new(atom: Atom) -> Handle {
        Handle(Arc::new(atom))
    }

    pub fn node(kind: AtomType, name: impl Into<String>) -> Handle {
        Handle::new(Atom::Node {
            kind,
            name: name.into(),
        })
    }

    pub fn link(kind: AtomType, outgoing: Vec<Handle>) -> Handle {
        Handle::new(Atom::Link { kind, outgoing })
    }

    pub fn atom(&self) -> &Atom {
        &self.0
    }
}

impl Deref for Handle {
    type Target = Atom;

    fn deref(&self) -> &Atom {
        &self.0
    }
}

impl Display for Handle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_short_string())
    }
}

impl Debug for Handle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Handle{}", self.to_short_string())
    }
}
