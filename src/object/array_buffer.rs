//! ArrayBuffer and the shared-backing-store model views are built on.
//! spec.md §3 "ArrayBuffer", §4.5.

use std::rc::Rc;
use std::cell::RefCell;

/// Backing storage for an ArrayBuffer: either inline bytes owned by the
/// engine, or an externally-owned buffer with an optional free callback
/// run on detach/collection.
pub enum Backing {
    Inline(Vec<u8>),
    External {
        ptr: *mut u8,
        len: usize,
        free: Option<Box<dyn FnOnce()>>,
    },
}

impl std::fmt::Debug for Backing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backing::Inline(bytes) => f.debug_tuple("Inline").field(&bytes.len()).finish(),
            Backing::External { len, .. } => f.debug_struct("External").field("len", len).finish(),
        }
    }
}

impl Backing {
    fn len(&self) -> usize {
        match self {
            Backing::Inline(bytes) => bytes.len(),
            Backing::External { len, .. } => *len,
        }
    }

    fn as_slice(&self) -> &[u8] {
        match self {
            Backing::Inline(bytes) => bytes,
            // SAFETY: host guarantees the pointer is valid for `len` bytes
            // until detach (see `ArrayBufferData::detach`) or collection.
            Backing::External { ptr, len, .. } => unsafe { std::slice::from_raw_parts(*ptr, *len) },
        }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Backing::Inline(bytes) => bytes,
            Backing::External { ptr, len, .. } => unsafe { std::slice::from_raw_parts_mut(*ptr, *len) },
        }
    }
}

/// Error returned when an operation targets a detached or out-of-range
/// region of an ArrayBuffer. The caller maps this to a JS `TypeError` (for
/// detach-related failures) or `RangeError` (for bounds failures).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayBufferError {
    Detached,
    OutOfRange,
}

/// Shared so that detaching through one handle is visible through every
/// `TypedArray`/`DataView` built over the same buffer.
#[derive(Debug)]
pub struct ArrayBufferData {
    inner: RefCell<ArrayBufferInner>,
}

#[derive(Debug)]
struct ArrayBufferInner {
    backing: Option<Backing>,
    detached: bool,
}

impl ArrayBufferData {
    pub fn new_inline(len: usize) -> Rc<Self> {
        Rc::new(Self {
            inner: RefCell::new(ArrayBufferInner {
                backing: Some(Backing::Inline(vec![0u8; len])),
                detached: false,
            }),
        })
    }

    pub fn new_external(ptr: *mut u8, len: usize, free: Option<Box<dyn FnOnce()>>) -> Rc<Self> {
        Rc::new(Self {
            inner: RefCell::new(ArrayBufferInner {
                backing: Some(Backing::External { ptr, len, free }),
                detached: false,
            }),
        })
    }

    pub fn byte_length(&self) -> usize {
        let inner = self.inner.borrow();
        if inner.detached {
            0
        } else {
            inner.backing.as_ref().map(|b| b.len()).unwrap_or(0)
        }
    }

    pub fn is_detached(&self) -> bool {
        self.inner.borrow().detached
    }

    /// Always detachable in this design (the spec allows a host to mark
    /// some buffers non-detachable; not modelled here since no caller in
    /// this crate creates a non-detachable buffer).
    pub fn is_detachable(&self) -> bool {
        true
    }

    /// Flips the detached flag, drops the backing storage (running the
    /// external free callback, if any) and zeroes the length. spec.md
    /// §4.5 "ArrayBuffer detachment".
    pub fn detach(&self) -> Result<(), ArrayBufferError> {
        let mut inner = self.inner.borrow_mut();
        if inner.detached {
            return Err(ArrayBufferError::Detached);
        }
        inner.detached = true;
        inner.backing = None; // runs Backing::External's Drop-equivalent below
        Ok(())
    }

    pub fn read(&self, offset: usize, len: usize) -> Result<Vec<u8>, ArrayBufferError> {
        let inner = self.inner.borrow();
        if inner.detached {
            return Err(ArrayBufferError::Detached);
        }
        let backing = inner.backing.as_ref().unwrap();
        let slice = backing.as_slice();
        slice
            .get(offset..offset + len)
            .map(|s| s.to_vec())
            .ok_or(ArrayBufferError::OutOfRange)
    }

    pub fn write(&self, offset: usize, bytes: &[u8]) -> Result<(), ArrayBufferError> {
        let mut inner = self.inner.borrow_mut();
        if inner.detached {
            return Err(ArrayBufferError::Detached);
        }
        let backing = inner.backing.as_mut().unwrap();
        let slice = backing.as_mut_slice();
        let dest = slice
            .get_mut(offset..offset + bytes.len())
            .ok_or(ArrayBufferError::OutOfRange)?;
        dest.copy_from_slice(bytes);
        Ok(())
    }
}

impl Drop for Backing {
    fn drop(&mut self) {
        if let Backing::External { free, .. } = self {
            if let Some(free) = free.take() {
                free();
            }
        }
    }
}
