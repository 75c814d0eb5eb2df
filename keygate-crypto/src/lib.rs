//! Cryptographic primitives for the keygate licensing protocol.
//!
//! - 3DES-EDE3-CBC payload cipher keyed from a shared password
//! - Single-line base64 transport encoding
//! - `[KEY]` template signatures over MD5
//!
//! Everything here is a pure function of its inputs: no I/O, no global
//! state, safe to call from any thread.

mod cipher;
mod error;
mod key;
mod signature;

pub use cipher::{
    decode_base64_lenient, decrypt, encrypt, strip_line_breaks, PayloadCipher, BLOCK_SIZE,
};
pub use error::{CryptoError, CryptoResult};
pub use key::{CipherIv, CipherKey, DEFAULT_IV, IV_SIZE, KEY_SIZE};
pub use signature::{md5_hex, SignTemplate, PLACEHOLDER, SIGNATURE_LEN};
