//! Short-string-optimized byte buffer.

use std::alloc::Layout;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ptr::{self, NonNull};
use std::slice;
use std::str::Utf8Error;

use jsondom_alloc::ResourceHandle;

use crate::error::{Error, Result};

/// Strings up to this many bytes live inline in the control block.
const INLINE_CAP: usize = 16;

/// A mutable byte sequence allocated from a memory resource.
///
/// The model layer does not require UTF-8; the parser enforces UTF-8 on its
/// input, so documents built from parsed text always hold valid UTF-8.
/// Short contents are stored inline; longer contents live in a buffer
/// obtained from the resource, growing geometrically.
pub struct String {
    handle: ResourceHandle,
    len: u32,
    /// `INLINE_CAP` while inline, the heap buffer size otherwise.
    cap: u32,
    repr: Repr,
}

union Repr {
    inline: [u8; INLINE_CAP],
    heap: NonNull<u8>,
}

impl String {
    /// Maximum number of bytes a string (or an object key) can hold.
    pub const MAX_SIZE: usize = u32::MAX as usize - 1;

    /// An empty string using the default resource.
    pub fn new() -> Self {
        Self::new_in(ResourceHandle::default())
    }

    /// An empty string using the given resource.
    pub fn new_in(handle: ResourceHandle) -> Self {
        Self {
            handle,
            len: 0,
            cap: INLINE_CAP as u32,
            repr: Repr {
                inline: [0; INLINE_CAP],
            },
        }
    }

    /// Copy `bytes` into a new string on `handle`.
    pub fn from_slice(bytes: &[u8], handle: ResourceHandle) -> Result<Self> {
        let mut s = Self::new_in(handle);
        s.push_slice(bytes)?;
        Ok(s)
    }

    /// Copy `text` into a new string on `handle`.
    pub fn from_str_in(text: &str, handle: ResourceHandle) -> Result<Self> {
        Self::from_slice(text.as_bytes(), handle)
    }

    /// A string of `count` copies of `byte` on `handle`.
    pub fn repeated(byte: u8, count: usize, handle: ResourceHandle) -> Result<Self> {
        let mut s = Self::new_in(handle);
        s.resize(count, byte)?;
        Ok(s)
    }

    /// The resource this string allocates from.
    pub fn storage(&self) -> &ResourceHandle {
        &self.handle
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.cap as usize
    }

    fn is_inline(&self) -> bool {
        self.cap as usize == INLINE_CAP
    }

    fn data(&self) -> *const u8 {
        if self.is_inline() {
            // SAFETY: `cap == INLINE_CAP` implies the inline field is active.
            unsafe { self.repr.inline.as_ptr() }
        } else {
            unsafe { self.repr.heap.as_ptr() }
        }
    }

    fn data_mut(&mut self) -> *mut u8 {
        if self.is_inline() {
            unsafe { self.repr.inline.as_mut_ptr() }
        } else {
            unsafe { self.repr.heap.as_ptr() }
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: the first `len` bytes are always initialized.
        unsafe { slice::from_raw_parts(self.data(), self.len as usize) }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(self.data_mut(), self.len as usize) }
    }

    /// The contents as text, if they are valid UTF-8.
    pub fn as_str(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(self.as_bytes())
    }

    /// Append one byte.
    pub fn push(&mut self, byte: u8) -> Result<()> {
        self.reserve(1)?;
        unsafe { ptr::write(self.data_mut().add(self.len as usize), byte) };
        self.len += 1;
        Ok(())
    }

    /// Append a byte slice.
    pub fn push_slice(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.reserve(bytes.len())?;
        unsafe {
            ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                self.data_mut().add(self.len as usize),
                bytes.len(),
            );
        }
        self.len += bytes.len() as u32;
        Ok(())
    }

    /// Append text.
    pub fn push_str(&mut self, text: &str) -> Result<()> {
        self.push_slice(text.as_bytes())
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Grow or shrink to `new_len`, filling new bytes with `fill`.
    pub fn resize(&mut self, new_len: usize, fill: u8) -> Result<()> {
        if new_len > self.len as usize {
            let grow = new_len - self.len as usize;
            self.reserve(grow)?;
            unsafe {
                self.data_mut()
                    .add(self.len as usize)
                    .write_bytes(fill, grow);
            }
        }
        self.len = new_len as u32;
        Ok(())
    }

    /// Guarantee room for `additional` more bytes.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let required = (self.len as usize)
            .checked_add(additional)
            .filter(|&n| n <= Self::MAX_SIZE)
            .ok_or(Error::StringTooLarge)?;
        if required <= self.cap as usize {
            return Ok(());
        }
        self.grow_to(required)
    }

    fn grow_to(&mut self, required: usize) -> Result<()> {
        debug_assert!(required <= Self::MAX_SIZE);
        // Growth factor 1.5, never less than what was asked for.
        let new_cap = required
            .max(self.cap as usize + self.cap as usize / 2)
            .min(Self::MAX_SIZE);
        let layout = Layout::array::<u8>(new_cap).map_err(|_| Error::StringTooLarge)?;
        let new_ptr = self.handle.allocate(layout)?;
        unsafe {
            ptr::copy_nonoverlapping(self.data(), new_ptr.as_ptr(), self.len as usize);
            self.release_buffer();
            self.repr.heap = new_ptr;
        }
        self.cap = new_cap as u32;
        Ok(())
    }

    /// Non-binding request to drop unused capacity.
    pub fn shrink_to_fit(&mut self) {
        if self.is_inline() || self.len as usize == self.cap as usize {
            return;
        }
        if self.len as usize <= INLINE_CAP {
            let heap = unsafe { self.repr.heap };
            let cap = self.cap as usize;
            let mut inline = [0u8; INLINE_CAP];
            inline[..self.len as usize].copy_from_slice(self.as_bytes());
            self.repr = Repr { inline };
            self.cap = INLINE_CAP as u32;
            if !self.handle.deallocate_is_trivial() {
                // SAFETY: `heap` was allocated on this handle with this layout.
                unsafe {
                    self.handle
                        .deallocate(heap, Layout::from_size_align_unchecked(cap, 1));
                }
            }
            return;
        }
        let new_cap = self.len as usize;
        let Ok(layout) = Layout::array::<u8>(new_cap) else {
            return;
        };
        let Ok(new_ptr) = self.handle.allocate(layout) else {
            return; // keep the wider buffer
        };
        unsafe {
            ptr::copy_nonoverlapping(self.data(), new_ptr.as_ptr(), self.len as usize);
            self.release_buffer();
            self.repr.heap = new_ptr;
        }
        self.cap = new_cap as u32;
    }

    /// Deep copy onto another resource.
    pub fn clone_in(&self, handle: ResourceHandle) -> Result<Self> {
        Self::from_slice(self.as_bytes(), handle)
    }

    /// Deep copy on the same resource.
    pub fn try_clone(&self) -> Result<Self> {
        self.clone_in(self.handle.clone())
    }

    /// Release the heap buffer if there is one. Leaves `repr` stale; the
    /// caller must overwrite it or never touch it again.
    unsafe fn release_buffer(&mut self) {
        if !self.is_inline() && !self.handle.deallocate_is_trivial() {
            // SAFETY: sized exactly as allocated in `grow_to`/`shrink_to_fit`.
            let layout = Layout::from_size_align_unchecked(self.cap as usize, 1);
            self.handle.deallocate(self.repr.heap, layout);
        }
    }
}

impl Drop for String {
    fn drop(&mut self) {
        unsafe { self.release_buffer() };
    }
}

impl Default for String {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for String {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for String {}

impl PartialEq<str> for String {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for String {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialOrd for String {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for String {
    /// Byte-lexicographic order.
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl Hash for String {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl fmt::Debug for String {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Ok(text) => fmt::Debug::fmt(text, f),
            Err(_) => write!(f, "{:?}", self.as_bytes()),
        }
    }
}
