//! Storage key derivation for published media.
//!
//! Keys are random rather than content-derived: re-uploading the same file
//! yields a new key, and nothing about the owner or original filename leaks
//! into public URLs.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use mime_guess::mime::Mime;
use rand::RngCore;

use super::aspect::AspectBucket;

/// Random bytes per generated name. 32 bytes of entropy makes collisions
/// negligible without an existence check against the store.
const KEY_ENTROPY_BYTES: usize = 32;

/// Generate a random asset file name with an extension derived from the
/// content type (e.g. `dGhpc...Zm8.mp4`).
#[must_use]
pub fn random_asset_name(content_type: &Mime) -> String {
    let mut key_bytes = [0u8; KEY_ENTROPY_BYTES];
    rand::thread_rng().fill_bytes(&mut key_bytes);
    let encoded = URL_SAFE_NO_PAD.encode(key_bytes);

    format!("{}.{}", encoded, content_type.subtype())
}

/// Generate an object store key namespaced by aspect bucket
/// (e.g. `landscape/dGhpc...Zm8.mp4`).
#[must_use]
pub fn object_key(bucket: AspectBucket, content_type: &Mime) -> String {
    format!("{}/{}", bucket.prefix(), random_asset_name(content_type))
}
