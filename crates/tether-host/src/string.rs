//! Host strings with width-tagged storage
//!
//! The host runtime stores each string in the narrowest per-codepoint width
//! that fits its contents: 1 byte (latin-1 range), 2 bytes (BMP), or 4 bytes
//! (full Unicode scalars). The storage is shared (`Rc<[_]>`) so the guest
//! engine can view 1- and 2-byte storage externally without copying.

use std::rc::Rc;

/// Per-codepoint storage width of a host string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrWidth {
    /// 1 byte per codepoint (values <= 0xFF).
    One,
    /// 2 bytes per codepoint (values <= 0xFFFF).
    Two,
    /// 4 bytes per codepoint (full Unicode scalar values).
    Four,
}

/// A width-tagged shared view of a host string's backing storage.
#[derive(Debug, Clone)]
pub enum StrStorageView {
    /// 1-byte-per-codepoint storage.
    Latin1(Rc<[u8]>),
    /// 2-byte-per-codepoint storage.
    Ucs2(Rc<[u16]>),
    /// 4-byte-per-codepoint storage.
    Ucs4(Rc<[u32]>),
}

#[derive(Debug)]
enum StrStorage {
    Latin1(Rc<[u8]>),
    Ucs2(Rc<[u16]>),
    Ucs4(Rc<[u32]>),
}

#[derive(Debug)]
struct StrData {
    storage: StrStorage,
}

/// A host unicode string: shared, immutable, width-tagged storage.
///
/// Cloning bumps the refcount of the same string object; identity is the
/// underlying allocation.
#[derive(Debug, Clone)]
pub struct HostStr {
    data: Rc<StrData>,
}

impl HostStr {
    /// Build a host string from Rust text, selecting the narrowest storage
    /// width that holds every codepoint.
    pub fn new(text: &str) -> Self {
        let scalars: Vec<u32> = text.chars().map(u32::from).collect();
        Self::from_scalars(&scalars)
    }

    /// Build a host string from raw Unicode scalar values, selecting the
    /// narrowest storage width.
    pub fn from_scalars(scalars: &[u32]) -> Self {
        let max = scalars.iter().copied().max().unwrap_or(0);
        let storage = if max <= 0xFF {
            StrStorage::Latin1(scalars.iter().map(|&c| c as u8).collect())
        } else if max <= 0xFFFF {
            StrStorage::Ucs2(scalars.iter().map(|&c| c as u16).collect())
        } else {
            StrStorage::Ucs4(scalars.to_vec().into())
        };
        Self {
            data: Rc::new(StrData { storage }),
        }
    }

    /// Storage width of this string.
    pub fn width(&self) -> StrWidth {
        match self.data.storage {
            StrStorage::Latin1(_) => StrWidth::One,
            StrStorage::Ucs2(_) => StrWidth::Two,
            StrStorage::Ucs4(_) => StrWidth::Four,
        }
    }

    /// Codepoint count (not bytes, not UTF-16 units).
    pub fn len(&self) -> usize {
        match &self.data.storage {
            StrStorage::Latin1(b) => b.len(),
            StrStorage::Ucs2(u) => u.len(),
            StrStorage::Ucs4(u) => u.len(),
        }
    }

    /// Whether the string is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A shared view of the backing storage, tagged by width.
    pub fn storage_view(&self) -> StrStorageView {
        match &self.data.storage {
            StrStorage::Latin1(b) => StrStorageView::Latin1(Rc::clone(b)),
            StrStorage::Ucs2(u) => StrStorageView::Ucs2(Rc::clone(u)),
            StrStorage::Ucs4(u) => StrStorageView::Ucs4(Rc::clone(u)),
        }
    }

    /// The 1-byte backing storage, if this string uses it.
    pub fn latin1_storage(&self) -> Option<Rc<[u8]>> {
        match &self.data.storage {
            StrStorage::Latin1(b) => Some(Rc::clone(b)),
            _ => None,
        }
    }

    /// The 2-byte backing storage, if this string uses it.
    pub fn ucs2_storage(&self) -> Option<Rc<[u16]>> {
        match &self.data.storage {
            StrStorage::Ucs2(u) => Some(Rc::clone(u)),
            _ => None,
        }
    }

    /// The 4-byte backing storage, if this string uses it.
    pub fn ucs4_storage(&self) -> Option<Rc<[u32]>> {
        match &self.data.storage {
            StrStorage::Ucs4(u) => Some(Rc::clone(u)),
            _ => None,
        }
    }

    /// Iterate the codepoints as raw scalar values.
    pub fn scalars(&self) -> Vec<u32> {
        match &self.data.storage {
            StrStorage::Latin1(b) => b.iter().map(|&c| u32::from(c)).collect(),
            StrStorage::Ucs2(u) => u.iter().map(|&c| u32::from(c)).collect(),
            StrStorage::Ucs4(u) => u.to_vec(),
        }
    }

    /// Render to Rust text. Unpaired values outside the scalar range are
    /// replaced.
    pub fn to_rust_string(&self) -> String {
        self.scalars()
            .iter()
            .map(|&c| char::from_u32(c).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }

    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.data) as usize
    }

    /// Whether two handles refer to the same string object.
    pub fn same_object(&self, other: &HostStr) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}
