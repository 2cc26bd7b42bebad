//! Data model shared by the codec, the transport and the storage backend.

mod atom;
mod id;
mod record;
mod value;

pub use atom::*;
pub use id::*;
pub use record::*;
pub use value::*;
