//! In-memory key holder.

use zeroize::Zeroize;

use super::kdf::KEY_LEN;

/// A 32-byte symmetric key that zeroes its memory when dropped.
///
/// Used for the session cipher key and the legacy key alike.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct CipherKey {
    bytes: [u8; KEY_LEN],
}

impl CipherKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes (e.g. to pass to `encrypt`/`decrypt`).
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl PartialEq for CipherKey {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl Eq for CipherKey {}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CipherKey(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_bytes() {
        let key = CipherKey::new([0x41; KEY_LEN]);
        let shown = format!("{key:?}");
        assert!(!shown.contains("41"));
        assert!(shown.contains("redacted"));
    }

    #[test]
    fn equality_is_by_value() {
        assert_eq!(CipherKey::new([1; KEY_LEN]), CipherKey::new([1; KEY_LEN]));
        assert_ne!(CipherKey::new([1; KEY_LEN]), CipherKey::new([2; KEY_LEN]));
    }
}
