pub mod signatures;

pub use signatures::{verify_signature, EventSigner, PublicKeyEncoding};
