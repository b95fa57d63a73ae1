//! Insertion-ordered map with a hashed lookup index.
//!
//! Entries are stored contiguously in insertion order; a separate slot array
//! (always a power of two) maps hashes to the head of an intrusive
//! per-bucket chain threaded through the entry array. Both live in a single
//! allocation from the object's resource. Iteration order is insertion
//! order; lookup is expected O(1).

use std::alloc::Layout;
use std::fmt;
use std::ops::Index;
use std::ptr::{self, NonNull};
use std::slice;
use std::sync::LazyLock;

use ahash::RandomState;
use jsondom_alloc::ResourceHandle;

use crate::error::{Error, Result};
use crate::string;
use crate::value::Value;

/// Empty slot / end-of-chain marker.
const NIL: u32 = u32::MAX;

/// Fixed seeds keep the index hash deterministic across processes.
static INDEX_HASHER: LazyLock<RandomState> = LazyLock::new(|| {
    RandomState::with_seeds(
        0x243f_6a88_85a3_08d3,
        0x1319_8a2e_0370_7344,
        0xa409_3822_299f_31d0,
        0x082e_fa98_ec4e_6c89,
    )
});

fn hash_bytes(bytes: &[u8]) -> u64 {
    INDEX_HASHER.hash_one(bytes)
}

fn table_layout(slot_count: usize, capacity: usize) -> Option<(Layout, usize)> {
    let slots = Layout::array::<u32>(slot_count).ok()?;
    let entries = Layout::array::<KeyValuePair>(capacity).ok()?;
    slots.extend(entries).ok()
}

/// One key/value record of an [`Object`].
///
/// The key is immutable for the life of the entry and stored NUL-terminated
/// in a separate block from the object's resource; the value is freely
/// mutable.
pub struct KeyValuePair {
    next: u32,
    key_len: u32,
    key: NonNull<u8>,
    value: Value,
}

impl KeyValuePair {
    pub fn key(&self) -> &str {
        // SAFETY: keys only enter through `&str` APIs, so the bytes are
        // valid UTF-8 for the life of the entry.
        unsafe { std::str::from_utf8_unchecked(self.key_bytes()) }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    fn key_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.key.as_ptr(), self.key_len as usize) }
    }

    fn key_value_mut<'s>(&'s mut self) -> (&'s str, &'s mut Value) {
        // The key bytes live outside the entry, so the shared key borrow can
        // coexist with the exclusive value borrow.
        let key = unsafe {
            std::str::from_utf8_unchecked(slice::from_raw_parts(
                self.key.as_ptr(),
                self.key_len as usize,
            ))
        };
        (key, &mut self.value)
    }
}

/// An associative container of key/value pairs with unique keys, preserving
/// insertion order.
///
/// Keys compare by byte equality. All elements, and their children, use the
/// same resource the object was constructed with.
pub struct Object {
    handle: ResourceHandle,
    buf: Option<NonNull<u8>>,
    entries_offset: usize,
    size: u32,
    capacity: u32,
    slot_count: u32,
}

impl Object {
    /// Maximum number of entries.
    pub const MAX_SIZE: usize = 1 << 31;

    /// Maximum key size in bytes.
    pub const MAX_KEY_SIZE: usize = string::String::MAX_SIZE;

    const MIN_CAPACITY: usize = 16;
    const MIN_SLOTS: usize = 16;

    /// An empty object using the default resource.
    pub fn new() -> Self {
        Self::new_in(ResourceHandle::default())
    }

    /// An empty object using the given resource.
    pub fn new_in(handle: ResourceHandle) -> Self {
        Self {
            handle,
            buf: None,
            entries_offset: 0,
            size: 0,
            capacity: 0,
            slot_count: 0,
        }
    }

    /// An empty object with room for `capacity` entries.
    pub fn with_capacity_in(capacity: usize, handle: ResourceHandle) -> Result<Self> {
        let mut obj = Self::new_in(handle);
        obj.reserve(capacity)?;
        Ok(obj)
    }

    /// Build from `(key, value)` pairs in order. On duplicate keys the first
    /// occurrence wins.
    pub fn from_pairs<'a, I>(pairs: I, handle: ResourceHandle) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        let pairs = pairs.into_iter();
        let mut obj = Self::new_in(handle);
        obj.reserve(pairs.size_hint().0)?;
        for (key, value) in pairs {
            obj.try_insert(key, value)?;
        }
        Ok(obj)
    }

    /// The resource this object allocates from.
    pub fn storage(&self) -> &ResourceHandle {
        &self.handle
    }

    pub fn len(&self) -> usize {
        self.size as usize
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// The entries in insertion order.
    pub fn entries(&self) -> &[KeyValuePair] {
        unsafe { slice::from_raw_parts(self.entries_ptr(), self.size as usize) }
    }

    fn entries_mut_slice(&mut self) -> &mut [KeyValuePair] {
        unsafe { slice::from_raw_parts_mut(self.entries_ptr(), self.size as usize) }
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.entries().iter(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_> {
        IterMut {
            inner: self.entries_mut_slice().iter_mut(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries().iter().map(KeyValuePair::key)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries().iter().map(KeyValuePair::value)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.entries_mut_slice()
            .iter_mut()
            .map(KeyValuePair::value_mut)
    }

    /// The entry for `key`, if present.
    pub fn find(&self, key: &str) -> Option<&KeyValuePair> {
        self.find_index(key)
            .map(|index| unsafe { &*self.entries_ptr().add(index as usize) })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.find(key).map(KeyValuePair::value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.find_index(key)
            .map(|index| unsafe { &mut (*self.entries_ptr().add(index as usize)).value })
    }

    pub fn get_key_value(&self, key: &str) -> Option<(&str, &Value)> {
        self.find(key).map(|e| (e.key(), e.value()))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.find_index(key).is_some()
    }

    /// Insert or assign. Returns the previous value when `key` was already
    /// present.
    pub fn insert(&mut self, key: &str, value: Value) -> Result<Option<Value>> {
        if let Some(index) = self.find_index(key) {
            let value = self.adopt(value)?;
            let slot = unsafe { &mut (*self.entries_ptr().add(index as usize)).value };
            return Ok(Some(std::mem::replace(slot, value)));
        }
        self.insert_new(key, value)?;
        Ok(None)
    }

    /// Insert without overwriting. Returns the entry's value and whether the
    /// insertion took place; when `key` was already present the incoming
    /// value is discarded.
    pub fn try_insert(&mut self, key: &str, value: Value) -> Result<(&mut Value, bool)> {
        if let Some(index) = self.find_index(key) {
            let value_ref = unsafe { &mut (*self.entries_ptr().add(index as usize)).value };
            return Ok((value_ref, false));
        }
        let index = self.insert_new(key, value)?;
        Ok((
            unsafe { &mut (*self.entries_ptr().add(index as usize)).value },
            true,
        ))
    }

    /// The value for `key`, inserting null first when absent.
    pub fn get_or_insert_null(&mut self, key: &str) -> Result<&mut Value> {
        if let Some(index) = self.find_index(key) {
            return Ok(unsafe { &mut (*self.entries_ptr().add(index as usize)).value });
        }
        let null = Value::null_in(self.handle.clone());
        let index = self.insert_new(key, null)?;
        Ok(unsafe { &mut (*self.entries_ptr().add(index as usize)).value })
    }

    /// Remove the entry for `key` and return its value.
    ///
    /// The hole is back-filled with the tail entry, so the relative order of
    /// all other entries is preserved.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.find_index(key)?;
        Some(self.erase_index(index))
    }

    /// Like [`remove`](Object::remove), also returning an owned copy of the
    /// key.
    pub fn remove_entry(&mut self, key: &str) -> Option<(std::string::String, Value)> {
        let index = self.find_index(key)?;
        let owned = unsafe { (*self.entries_ptr().add(index as usize)).key().to_owned() };
        Some((owned, self.erase_index(index)))
    }

    /// Guarantee room for at least `new_capacity` entries.
    pub fn reserve(&mut self, new_capacity: usize) -> Result<()> {
        if new_capacity <= self.capacity as usize {
            return Ok(());
        }
        self.rehash(new_capacity)
    }

    /// Drop every entry, keeping the capacity.
    pub fn clear(&mut self) {
        unsafe {
            for i in 0..self.size {
                let entry = self.entries_ptr().add(i as usize);
                ptr::drop_in_place(ptr::addr_of_mut!((*entry).value));
                self.free_key((*entry).key, (*entry).key_len);
            }
            if self.slot_count > 0 {
                ptr::write_bytes(self.slots_ptr(), 0xFF, self.slot_count as usize);
            }
        }
        self.size = 0;
    }

    /// Deep copy onto another resource, preserving insertion order.
    pub fn clone_in(&self, handle: ResourceHandle) -> Result<Self> {
        let mut obj = Self::with_capacity_in(self.size as usize, handle)?;
        for (key, value) in self.iter() {
            let copy = value.clone_in(obj.handle.clone())?;
            obj.try_insert(key, copy)?;
        }
        Ok(obj)
    }

    /// Deep copy on the same resource.
    pub fn try_clone(&self) -> Result<Self> {
        self.clone_in(self.handle.clone())
    }

    //
    // table internals
    //

    fn slots_ptr(&self) -> *mut u32 {
        match self.buf {
            Some(buf) => buf.as_ptr() as *mut u32,
            None => NonNull::dangling().as_ptr(),
        }
    }

    fn entries_ptr(&self) -> *mut KeyValuePair {
        match self.buf {
            Some(buf) => unsafe { buf.as_ptr().add(self.entries_offset) as *mut KeyValuePair },
            None => NonNull::<KeyValuePair>::dangling().as_ptr(),
        }
    }

    fn slot_of(&self, hash: u64) -> usize {
        // slot_count is a power of two, so the mod is a mask
        (hash & (self.slot_count as u64 - 1)) as usize
    }

    fn find_index(&self, key: &str) -> Option<u32> {
        if self.size == 0 {
            return None;
        }
        let hash = hash_bytes(key.as_bytes());
        let mut index = unsafe { *self.slots_ptr().add(self.slot_of(hash)) };
        while index != NIL {
            let entry = unsafe { &*self.entries_ptr().add(index as usize) };
            if entry.key_bytes() == key.as_bytes() {
                return Some(index);
            }
            index = entry.next;
        }
        None
    }

    /// Rebind `value` to this object's resource if it came from elsewhere.
    fn adopt(&self, value: Value) -> Result<Value> {
        if value.storage() == &self.handle {
            Ok(value)
        } else {
            value.clone_in(self.handle.clone())
        }
    }

    fn insert_new(&mut self, key: &str, value: Value) -> Result<u32> {
        if key.len() > Self::MAX_KEY_SIZE {
            return Err(Error::KeyTooLarge);
        }
        if self.size as usize + 1 > Self::MAX_SIZE {
            return Err(Error::ObjectTooLarge);
        }
        let value = self.adopt(value)?;
        if self.size == self.capacity {
            let target = (self.capacity as usize * 2).max(Self::MIN_CAPACITY);
            self.rehash(target)?;
        }
        let key_ptr = self.allocate_key(key)?;
        let hash = hash_bytes(key.as_bytes());
        let index = self.size;
        unsafe {
            let slot = self.slots_ptr().add(self.slot_of(hash));
            ptr::write(
                self.entries_ptr().add(index as usize),
                KeyValuePair {
                    next: *slot,
                    key_len: key.len() as u32,
                    key: key_ptr,
                    value,
                },
            );
            *slot = index;
        }
        self.size += 1;
        Ok(index)
    }

    fn erase_index(&mut self, index: u32) -> Value {
        unsafe {
            let entries = self.entries_ptr();
            let hash = hash_bytes((*entries.add(index as usize)).key_bytes());
            self.unlink(index, hash);
            let entry = ptr::read(entries.add(index as usize));
            let last = self.size - 1;
            if index != last {
                let moved_hash = hash_bytes((*entries.add(last as usize)).key_bytes());
                self.repoint(last, index, moved_hash);
                ptr::copy_nonoverlapping(entries.add(last as usize), entries.add(index as usize), 1);
            }
            self.size -= 1;
            self.free_key(entry.key, entry.key_len);
            let KeyValuePair { value, .. } = entry;
            value
        }
    }

    /// Remove `index` from its bucket chain.
    fn unlink(&mut self, index: u32, hash: u64) {
        unsafe {
            let next = (*self.entries_ptr().add(index as usize)).next;
            let slot = self.slots_ptr().add(self.slot_of(hash));
            if *slot == index {
                *slot = next;
                return;
            }
            let mut cur = *slot;
            while cur != NIL {
                let entry = &mut *self.entries_ptr().add(cur as usize);
                if entry.next == index {
                    entry.next = next;
                    return;
                }
                cur = entry.next;
            }
        }
    }

    /// Redirect the one chain link referencing entry `from` to `to`.
    fn repoint(&mut self, from: u32, to: u32, hash: u64) {
        unsafe {
            let slot = self.slots_ptr().add(self.slot_of(hash));
            if *slot == from {
                *slot = to;
                return;
            }
            let mut cur = *slot;
            while cur != NIL {
                let entry = &mut *self.entries_ptr().add(cur as usize);
                if entry.next == from {
                    entry.next = to;
                    return;
                }
                cur = entry.next;
            }
        }
    }

    fn allocate_key(&self, key: &str) -> Result<NonNull<u8>> {
        let layout = Layout::array::<u8>(key.len() + 1).map_err(|_| Error::KeyTooLarge)?;
        let ptr = self.handle.allocate(layout)?;
        unsafe {
            ptr::copy_nonoverlapping(key.as_ptr(), ptr.as_ptr(), key.len());
            *ptr.as_ptr().add(key.len()) = 0;
        }
        Ok(ptr)
    }

    unsafe fn free_key(&self, key: NonNull<u8>, key_len: u32) {
        if !self.handle.deallocate_is_trivial() {
            let layout = Layout::from_size_align_unchecked(key_len as usize + 1, 1);
            self.handle.deallocate(key, layout);
        }
    }

    /// Move every entry into a fresh slot+entry buffer of `new_capacity` and
    /// rebuild the index. Insertion order is preserved because entries are
    /// re-inserted by ascending index.
    fn rehash(&mut self, new_capacity: usize) -> Result<()> {
        if new_capacity > Self::MAX_SIZE {
            return Err(Error::ObjectTooLarge);
        }
        let slot_count = new_capacity.next_power_of_two().max(Self::MIN_SLOTS);
        let (layout, offset) =
            table_layout(slot_count, new_capacity).ok_or(Error::ObjectTooLarge)?;
        let new_buf = self.handle.allocate(layout)?;
        unsafe {
            let slots = new_buf.as_ptr() as *mut u32;
            // all-ones is NIL in every slot
            ptr::write_bytes(slots, 0xFF, slot_count);
            let new_entries = new_buf.as_ptr().add(offset) as *mut KeyValuePair;
            if self.size > 0 {
                ptr::copy_nonoverlapping(self.entries_ptr(), new_entries, self.size as usize);
            }
            for i in 0..self.size {
                let entry = &mut *new_entries.add(i as usize);
                let slot = slots.add((hash_bytes(entry.key_bytes()) & (slot_count as u64 - 1)) as usize);
                entry.next = *slot;
                *slot = i;
            }
            self.release_table();
        }
        self.buf = Some(new_buf);
        self.entries_offset = offset;
        self.capacity = new_capacity as u32;
        self.slot_count = slot_count as u32;
        Ok(())
    }

    /// Release the table buffer if there is one. Leaves `buf` stale; the
    /// caller must overwrite it or never touch it again. Does not touch
    /// entries.
    unsafe fn release_table(&mut self) {
        if let Some(buf) = self.buf {
            if !self.handle.deallocate_is_trivial() {
                let (layout, _) = table_layout(self.slot_count as usize, self.capacity as usize)
                    .expect("layout was validated when the table was allocated");
                self.handle.deallocate(buf, layout);
            }
        }
    }
}

impl Drop for Object {
    fn drop(&mut self) {
        unsafe {
            for i in 0..self.size {
                let entry = self.entries_ptr().add(i as usize);
                ptr::drop_in_place(ptr::addr_of_mut!((*entry).value));
                self.free_key((*entry).key, (*entry).key_len);
            }
            self.release_table();
        }
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Object {
    /// Unordered comparison: equal sizes and every entry present in the
    /// other object with an equal value.
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|o| o == value))
    }
}

impl Index<&str> for Object {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        self.get(key).expect("no entry found for key")
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a Object {
    type Item = (&'a str, &'a Value);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Insertion-order iterator over `(key, value)`.
pub struct Iter<'a> {
    inner: slice::Iter<'a, KeyValuePair>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|e| (e.key(), e.value()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Iter<'_> {}

/// Insertion-order iterator over `(key, &mut value)`.
pub struct IterMut<'a> {
    inner: slice::IterMut<'a, KeyValuePair>,
}

impl<'a> Iterator for IterMut<'a> {
    type Item = (&'a str, &'a mut Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(KeyValuePair::key_value_mut)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for IterMut<'_> {}
