//! Buffer-protocol objects
//!
//! A host buffer exposes raw bytes plus an item-format code. The byte
//! storage is shared (`Rc<RefCell<..>>`) so a guest typed-array view over
//! the same buffer sees mutations from either side immediately.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Item format of a buffer, after the host's format-code convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemFormat {
    /// Unsigned 8-bit (`B`).
    U8,
    /// Signed 8-bit (`b`).
    I8,
    /// Unsigned 16-bit (`H`).
    U16,
    /// Signed 16-bit (`h`).
    I16,
    /// Unsigned 32-bit (`I`).
    U32,
    /// Signed 32-bit (`i`).
    I32,
    /// 32-bit float (`f`).
    F32,
    /// 64-bit float (`d`).
    F64,
    /// A format code with no guest typed-array equivalent.
    Other(String),
}

impl ItemFormat {
    /// The host format code for this item type.
    pub fn code(&self) -> &str {
        match self {
            ItemFormat::U8 => "B",
            ItemFormat::I8 => "b",
            ItemFormat::U16 => "H",
            ItemFormat::I16 => "h",
            ItemFormat::U32 => "I",
            ItemFormat::I32 => "i",
            ItemFormat::F32 => "f",
            ItemFormat::F64 => "d",
            ItemFormat::Other(code) => code,
        }
    }

    /// Size of one item in bytes, if the format is known.
    pub fn item_size(&self) -> Option<usize> {
        match self {
            ItemFormat::U8 | ItemFormat::I8 => Some(1),
            ItemFormat::U16 | ItemFormat::I16 => Some(2),
            ItemFormat::U32 | ItemFormat::I32 | ItemFormat::F32 => Some(4),
            ItemFormat::F64 => Some(8),
            ItemFormat::Other(_) => None,
        }
    }
}

#[derive(Debug)]
struct BufferData {
    bytes: Rc<RefCell<Vec<u8>>>,
    format: ItemFormat,
}

/// A reference-counted host buffer-protocol object.
#[derive(Debug, Clone)]
pub struct HostBuffer {
    data: Rc<BufferData>,
}

impl HostBuffer {
    /// Create a buffer from raw bytes and an item format.
    pub fn new(bytes: Vec<u8>, format: ItemFormat) -> Self {
        Self {
            data: Rc::new(BufferData {
                bytes: Rc::new(RefCell::new(bytes)),
                format,
            }),
        }
    }

    /// The buffer's item format.
    pub fn format(&self) -> &ItemFormat {
        &self.data.format
    }

    /// Length in bytes.
    pub fn byte_len(&self) -> usize {
        self.data.bytes.borrow().len()
    }

    /// Shared handle to the backing byte storage.
    pub fn bytes(&self) -> Rc<RefCell<Vec<u8>>> {
        Rc::clone(&self.data.bytes)
    }

    /// Read one byte.
    pub fn get_byte(&self, index: usize) -> Option<u8> {
        self.data.bytes.borrow().get(index).copied()
    }

    /// Write one byte. Out-of-range writes are ignored and reported false.
    pub fn set_byte(&self, index: usize, value: u8) -> bool {
        let mut bytes = self.data.bytes.borrow_mut();
        match bytes.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.data) as usize
    }

    /// Whether two handles refer to the same buffer object.
    pub fn same_object(&self, other: &HostBuffer) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    /// Downgrade to a weak handle that does not keep the buffer alive.
    pub fn downgrade(&self) -> WeakHostBuffer {
        WeakHostBuffer {
            data: Rc::downgrade(&self.data),
        }
    }
}

/// A weak handle to a host buffer.
#[derive(Debug, Clone)]
pub struct WeakHostBuffer {
    data: Weak<BufferData>,
}

impl WeakHostBuffer {
    /// Whether any strong reference to the buffer still exists.
    pub fn is_alive(&self) -> bool {
        self.data.strong_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_bytes() {
        let buf = HostBuffer::new(vec![1, 2, 3], ItemFormat::U8);
        let shared = buf.bytes();
        shared.borrow_mut()[1] = 9;
        assert_eq!(buf.get_byte(1), Some(9));
    }

    #[test]
    fn test_item_sizes() {
        assert_eq!(ItemFormat::F64.item_size(), Some(8));
        assert_eq!(ItemFormat::Other("q".into()).item_size(), None);
        assert_eq!(ItemFormat::I16.code(), "h");
    }

    #[test]
    fn test_bounds() {
        let buf = HostBuffer::new(vec![0; 2], ItemFormat::U8);
        assert!(buf.set_byte(1, 7));
        assert!(!buf.set_byte(2, 7));
        assert_eq!(buf.get_byte(5), None);
    }
}
