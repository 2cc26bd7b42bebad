//! DHT storage key.
use rand::Rng;
use sha1_smol::Sha1;
use std::{
    fmt::{self, Debug, Display, Formatter},
    str::FromStr,
};

use crate::{Error, Result};

/// The size of storage keys in bytes.
pub const ID_SIZE: usize = 20;

#[derive(Clone, Copy, PartialEq, Ord, PartialOrd, Eq, Hash)]
/// A 20 byte SHA-1 digest addressing an entry on the DHT.
pub struct Id(pub [u8; ID_SIZE]);

impl Id {
    pub fn random() -> Id {
        let mut rng = rand::thread_rng();
        let random_bytes: [u8; ID_SIZE] = rng.gen();

        Id(random_bytes)
    }

    /// Create a new Id from some bytes. Returns Err if `bytes` is not of length
    /// [ID_SIZE].
    pub fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<Id> {
        let bytes = bytes.as_ref();
        if bytes.len() != ID_SIZE {
            return Err(Error::InvalidIdSize(bytes.len()));
        }

        let mut tmp: [u8; ID_SIZE] = [0; ID_SIZE];
        tmp[..ID_SIZE].clone_from_slice(&bytes[..ID_SIZE]);

        Ok(Id(tmp))
    }

    /// Plain SHA-1 of the concatenation of `parts`.
    pub fn digest(parts: &[&[u8]]) -> Id {
        let mut hasher = Sha1::new();
        for part in parts {
            hasher.update(part);
        }

        Id(hasher.digest().bytes())
    }

    /// Content address of an immutable blob: the SHA-1 of its bencoded form
    /// (`<len>:<bytes>`).
    pub fn for_immutable(v: &[u8]) -> Id {
        let prefix = format!("{}:", v.len());

        Id::digest(&[prefix.as_bytes(), v])
    }

    /// Returns true if `v` is the content addressed by this Id.
    pub fn validates_immutable(&self, v: &[u8]) -> bool {
        Id::for_immutable(v) == *self
    }

    pub fn as_bytes(&self) -> &[u8; ID_SIZE] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{:02x}", byte)?;
        }

        Ok(())
    }
}

impl Debug for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self)
    }
}

impl FromStr for Id {
    type Err = Error;

    fn from_str(s: &str) -> Result<Id> {
        if s.len() % 2 != 0 || !s.is_ascii() {
            return Err(Error::InvalidId(s.to_string()));
        }

        let bytes = (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16))
            .collect::<std::result::Result<Vec<u8>, _>>()
            .map_err(|_| Error::InvalidId(s.to_string()))?;

        Id::from_bytes(bytes)
    }
}

impl From<[u8; ID_SIZE]> for Id {
    fn from(bytes: [u8; ID_SIZE]) -> Id {
        Id(bytes)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let id = Id::random();
        let parsed: Id = id.to_string().parse().unwrap();

        assert_eq!(parsed, id);
        assert_eq!(id.to_string().len(), ID_SIZE * 2);
    }

    #[test]
    fn invalid_hex() {
        assert!(matches!("abc".parse::<Id>(), Err(Error::InvalidId(_))));
        assert!(matches!("zz".repeat(20).parse::<Id>(), Err(Error::InvalidId(_))));
        assert!(matches!("ab".parse::<Id>(), Err(Error::InvalidIdSize(1))));
    }

    #[test]
    fn immutable_hash() {
        let v = b"From the river to the sea, Palestine will be free";
        let target = Id::from_str("4238af8aff56cf6e0007d9d2003bf23d33eea7c3").unwrap();

        assert_eq!(Id::for_immutable(v), target);
        assert!(target.validates_immutable(v));
        assert!(!target.validates_immutable(&v[1..]));
    }
}
