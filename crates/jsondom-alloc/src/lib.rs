//! # jsondom-alloc
//!
//! Pluggable memory resources for the `jsondom` document model.
//!
//! A [`MemoryResource`] hands out raw blocks described by [`Layout`] and
//! takes them back. Containers never talk to a resource directly; they hold
//! a [`ResourceHandle`], which refers either to the process-wide default
//! resource (plain heap allocation) or to a shared, user-provided resource
//! such as a [`MonotonicResource`] arena.

use std::alloc::{self, Layout};
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use bumpalo::Bump;

/// A resource refused to produce a block.
///
/// Allocation failure is always recoverable at the call site; callers map it
/// into their own error channel instead of aborting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocError;

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("memory resource allocation failed")
    }
}

impl std::error::Error for AllocError {}

/// A pluggable allocator.
///
/// Implementations decide where blocks come from and what releasing them
/// means. The contract is the usual one: a block returned by [`allocate`]
/// stays valid until it is passed to [`deallocate`] on an equal resource, or
/// until the resource itself is destroyed, whichever comes first.
///
/// [`allocate`]: MemoryResource::allocate
/// [`deallocate`]: MemoryResource::deallocate
pub trait MemoryResource {
    /// Allocate a block described by `layout`.
    ///
    /// The returned pointer is aligned to `layout.align()` and valid for
    /// reads and writes of `layout.size()` bytes.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Release a block previously obtained from [`allocate`].
    ///
    /// # Safety
    ///
    /// `ptr` must denote a block returned by [`allocate`] on this resource
    /// (or one comparing [`is_equal`]) with the same `layout`, and must not
    /// be used afterwards.
    ///
    /// [`allocate`]: MemoryResource::allocate
    /// [`is_equal`]: MemoryResource::is_equal
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Whether blocks from `self` may be released through `other`.
    ///
    /// The default compares object identity, which is correct for every
    /// stateful resource. Containers use this through [`ResourceHandle`]
    /// equality to decide between ownership transfer and element-wise copy.
    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        std::ptr::addr_eq(self, other)
    }

    /// `true` when [`deallocate`] is a no-op.
    ///
    /// Containers backed by such a resource may skip per-block free calls in
    /// their destructors; the memory is reclaimed when the resource goes
    /// away.
    ///
    /// [`deallocate`]: MemoryResource::deallocate
    fn deallocate_is_trivial(&self) -> bool {
        false
    }
}

/// The default resource: forwards to the global allocator.
///
/// Thread-safe. [`deallocate`](MemoryResource::deallocate) actually frees.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapResource;

impl MemoryResource for HeapResource {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            // `alloc` forbids zero-sized layouts; any well-aligned non-null
            // pointer will do because it is never dereferenced.
            return Ok(unsafe { NonNull::new_unchecked(layout.align() as *mut u8) });
        }
        // SAFETY: layout has non-zero size.
        NonNull::new(unsafe { alloc::alloc(layout) }).ok_or(AllocError)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() != 0 {
            alloc::dealloc(ptr.as_ptr(), layout);
        }
    }
}

/// A monotonic arena resource.
///
/// Bump-allocates from chunks owned by a [`bumpalo::Bump`]; an allocation
/// that does not fit the current chunk opens a new, geometrically larger
/// one. `deallocate` is a legal no-op: every block lives until the resource
/// is dropped, at which point all chunks are released at once.
///
/// Not thread-safe: the arena must be owned by one thread at a time (the
/// type is `!Sync`), which is how the handle's lack of `Send`/`Sync` bounds
/// surfaces to containers.
#[derive(Default)]
pub struct MonotonicResource {
    bump: Bump,
}

impl MonotonicResource {
    pub fn new() -> Self {
        Self { bump: Bump::new() }
    }

    /// Pre-size the first chunk to `bytes`.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bump: Bump::with_capacity(bytes),
        }
    }

    /// Total bytes currently held in chunks, used or not.
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }
}

impl MemoryResource for MonotonicResource {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        self.bump.try_alloc_layout(layout).map_err(|_| AllocError)
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {}

    fn deallocate_is_trivial(&self) -> bool {
        true
    }
}

impl fmt::Debug for MonotonicResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonotonicResource")
            .field("allocated_bytes", &self.bump.allocated_bytes())
            .finish()
    }
}

/// The process-wide default resource. Lives for the whole program; handles
/// to it carry no ownership and no refcount traffic.
static DEFAULT_RESOURCE: HeapResource = HeapResource;

#[derive(Clone)]
enum Inner {
    Default,
    Owned(Arc<dyn MemoryResource>),
}

/// A shared handle to a [`MemoryResource`].
///
/// Either a non-owning reference to the process-wide default resource, or
/// shared ownership of a user-provided one (cloning bumps the refcount).
/// Every container and every `Value` caches its handle; children allocate
/// through the same handle as their parent.
#[derive(Clone)]
pub struct ResourceHandle {
    inner: Inner,
}

impl ResourceHandle {
    /// Take shared ownership of `resource`.
    pub fn new<R: MemoryResource + 'static>(resource: R) -> Self {
        Self {
            inner: Inner::Owned(Arc::new(resource)),
        }
    }

    /// Borrow the underlying resource.
    pub fn get(&self) -> &dyn MemoryResource {
        match &self.inner {
            Inner::Default => &DEFAULT_RESOURCE,
            Inner::Owned(resource) => resource.as_ref(),
        }
    }

    /// Whether this handle refers to the process-wide default resource.
    pub fn is_default(&self) -> bool {
        matches!(self.inner, Inner::Default)
    }

    /// Shorthand for `self.get().allocate(layout)`.
    pub fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        self.get().allocate(layout)
    }

    /// Shorthand for `self.get().deallocate(ptr, layout)`.
    ///
    /// # Safety
    ///
    /// Same contract as [`MemoryResource::deallocate`].
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.get().deallocate(ptr, layout);
    }

    /// Shorthand for `self.get().deallocate_is_trivial()`.
    pub fn deallocate_is_trivial(&self) -> bool {
        self.get().deallocate_is_trivial()
    }
}

impl Default for ResourceHandle {
    /// A handle to the process-wide default resource.
    fn default() -> Self {
        Self {
            inner: Inner::Default,
        }
    }
}

impl From<Arc<dyn MemoryResource>> for ResourceHandle {
    fn from(resource: Arc<dyn MemoryResource>) -> Self {
        Self {
            inner: Inner::Owned(resource),
        }
    }
}

impl PartialEq for ResourceHandle {
    /// `a == b` iff `a.get().is_equal(b.get())`.
    fn eq(&self, other: &Self) -> bool {
        self.get().is_equal(other.get())
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Default => f.write_str("ResourceHandle(default)"),
            Inner::Owned(resource) => f
                .debug_tuple("ResourceHandle")
                .field(&Arc::as_ptr(resource))
                .finish(),
        }
    }
}
