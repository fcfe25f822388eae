//! Guest strings
//!
//! Guest strings are UTF-16 code-unit sequences. Storage is either owned by
//! the engine or externally owned by the embedder (shared `Rc` buffers).
//! The collector treats external strings as two-byte-per-unit internally,
//! so external one-byte buffers carry a forced width-indicator bit on the
//! string header; comparisons and iteration consult that bit.

use std::rc::Rc;

#[derive(Debug)]
enum StringStorage {
    /// Engine-owned UTF-16 units.
    Owned(Box<[u16]>),
    /// Externally-owned two-byte units.
    ExternalTwoByte(Rc<[u16]>),
    /// Externally-owned one-byte units; each maps to one UTF-16 unit.
    ExternalOneByte(Rc<[u8]>),
}

/// A guest string header plus storage.
#[derive(Debug)]
pub struct GuestString {
    storage: StringStorage,
    latin1: bool,
}

impl GuestString {
    /// An engine-owned string from UTF-16 units.
    pub fn owned(units: Vec<u16>) -> Self {
        Self {
            storage: StringStorage::Owned(units.into_boxed_slice()),
            latin1: false,
        }
    }

    /// An external string over two-byte units; no copy.
    pub fn external_two_byte(units: Rc<[u16]>) -> Self {
        Self {
            storage: StringStorage::ExternalTwoByte(units),
            latin1: false,
        }
    }

    /// An external string over one-byte units; no copy. The width-indicator
    /// bit is forced on so unit-width-sensitive operations stay correct.
    pub fn external_one_byte(units: Rc<[u8]>) -> Self {
        Self {
            storage: StringStorage::ExternalOneByte(units),
            latin1: true,
        }
    }

    /// Whether the width-indicator (one-byte) bit is set on the header.
    pub fn is_latin1(&self) -> bool {
        self.latin1
    }

    /// Whether the storage is externally owned.
    pub fn is_external(&self) -> bool {
        !matches!(self.storage, StringStorage::Owned(_))
    }

    /// Length in UTF-16 code units.
    pub fn len(&self) -> usize {
        match &self.storage {
            StringStorage::Owned(u) => u.len(),
            StringStorage::ExternalTwoByte(u) => u.len(),
            StringStorage::ExternalOneByte(u) => u.len(),
        }
    }

    /// Whether the string is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The code-unit sequence.
    pub fn code_units(&self) -> Vec<u16> {
        match &self.storage {
            StringStorage::Owned(u) => u.to_vec(),
            StringStorage::ExternalTwoByte(u) => u.to_vec(),
            StringStorage::ExternalOneByte(u) => u.iter().map(|&b| u16::from(b)).collect(),
        }
    }

    /// Decode to Rust text; unpaired surrogates are replaced.
    pub fn to_rust_string(&self) -> String {
        char::decode_utf16(self.code_units())
            .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_units() {
        let s = GuestString::owned(vec![0x68, 0x69]);
        assert_eq!(s.len(), 2);
        assert!(!s.is_latin1());
        assert!(!s.is_external());
        assert_eq!(s.to_rust_string(), "hi");
    }

    #[test]
    fn test_external_one_byte_forces_width_bit() {
        let backing: Rc<[u8]> = Rc::from(&b"abc"[..]);
        let s = GuestString::external_one_byte(Rc::clone(&backing));
        assert!(s.is_latin1());
        assert!(s.is_external());
        assert_eq!(s.code_units(), vec![0x61, 0x62, 0x63]);
    }

    #[test]
    fn test_external_two_byte() {
        let backing: Rc<[u16]> = Rc::from(&[0x65E5u16, 0x672C][..]);
        let s = GuestString::external_two_byte(backing);
        assert!(!s.is_latin1());
        assert_eq!(s.to_rust_string(), "日本");
    }

    #[test]
    fn test_surrogate_pair_decodes() {
        let s = GuestString::owned(vec![0xD83D, 0xDE00]);
        assert_eq!(s.to_rust_string(), "😀");
    }
}
