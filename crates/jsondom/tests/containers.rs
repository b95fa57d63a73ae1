//! Container-level properties: insertion order, hash-index consistency
//! after erase storms, and the strong guarantee under injected allocation
//! failure.

use std::alloc::Layout;
use std::cell::Cell;
use std::ptr::NonNull;
use std::sync::Arc;

use jsondom::{
    AllocError, Array, HeapResource, MemoryResource, MonotonicResource, Object, ResourceHandle,
    Value,
};

#[test]
fn ten_thousand_keys_survive_an_erase_storm() {
    let mut obj = Object::new();
    for i in 0..10_000u32 {
        obj.try_insert(&format!("key-{i}"), Value::from(i as i64))
            .unwrap();
    }
    assert_eq!(obj.len(), 10_000);

    for i in (1..10_000u32).step_by(2) {
        assert!(obj.remove(&format!("key-{i}")).is_some());
    }
    assert_eq!(obj.len(), 5_000);

    // every survivor is findable with its value intact, every erased key is
    // gone, and iteration visits each survivor exactly once
    for i in (0..10_000u32).step_by(2) {
        assert_eq!(obj.get(&format!("key-{i}")), Some(&Value::from(i as i64)));
    }
    for i in (1..10_000u32).step_by(2) {
        assert!(!obj.contains_key(&format!("key-{i}")));
    }
    let mut seen: Vec<i64> = obj.values().map(|v| v.as_i64().unwrap()).collect();
    seen.sort_unstable();
    let expected: Vec<i64> = (0..10_000).step_by(2).map(i64::from).collect();
    assert_eq!(seen, expected);
}

#[test]
fn insertion_order_is_stable_without_erases() {
    let mut obj = Object::new();
    let keys: Vec<String> = (0..2_000).map(|i| format!("k{i:04}")).collect();
    for (i, key) in keys.iter().enumerate() {
        obj.try_insert(key, Value::from(i as i64)).unwrap();
        if i % 257 == 0 {
            obj.reserve(i + 100).unwrap();
        }
        if i % 613 == 0 {
            // non-erasing churn: assignment does not move entries
            obj.insert(&keys[i / 2], Value::from(-1i64)).unwrap();
        }
    }
    let iterated: Vec<&str> = obj.keys().collect();
    let expected: Vec<&str> = keys.iter().map(String::as_str).collect();
    assert_eq!(iterated, expected);
}

#[test]
fn find_agrees_with_entries_after_mixed_operations() {
    // deterministic xorshift, no rng dependency needed
    let mut state = 0x9E37_79B9_7F4A_7C15u64;
    let mut step = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    let mut obj = Object::new();
    for _ in 0..20_000 {
        let roll = step();
        let key = format!("k{}", roll % 512);
        match roll % 3 {
            0 => {
                obj.try_insert(&key, Value::from(roll as i64)).unwrap();
            }
            1 => {
                obj.insert(&key, Value::from(roll as i64)).unwrap();
            }
            _ => {
                obj.remove(&key);
            }
        }
        // the intrusive index stays consistent with the entry array
        if roll % 97 == 0 {
            for entry in obj.entries() {
                let found = obj.find(entry.key()).unwrap();
                assert!(std::ptr::eq(found, entry));
            }
        }
    }
    for entry in obj.entries() {
        assert!(std::ptr::eq(obj.find(entry.key()).unwrap(), entry));
    }
    assert!(obj.get("never-inserted").is_none());
}

/// A resource that refuses the k-th allocation and every one after it.
struct FailAfter {
    remaining: Cell<usize>,
}

impl FailAfter {
    fn armed(remaining: usize) -> Arc<Self> {
        Arc::new(Self {
            remaining: Cell::new(remaining),
        })
    }
}

impl MemoryResource for FailAfter {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if self.remaining.get() == 0 {
            return Err(AllocError);
        }
        self.remaining.set(self.remaining.get() - 1);
        HeapResource.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        HeapResource.deallocate(ptr, layout);
    }
}

fn sample_object(handle: ResourceHandle) -> Object {
    let mut obj = Object::new_in(handle.clone());
    for i in 0..20i64 {
        let mut arr = Array::new_in(handle.clone());
        arr.push(Value::int64_in(i, handle.clone())).unwrap();
        arr.push(
            Value::string_in("a payload string that outgrows the inline buffer", handle.clone())
                .unwrap(),
        )
        .unwrap();
        obj.try_insert(&format!("entry-{i}"), Value::from(arr)).unwrap();
    }
    obj
}

#[test]
fn failed_insert_leaves_the_object_untouched() {
    for budget in 0..12 {
        let resource = FailAfter::armed(usize::MAX);
        let handle = ResourceHandle::from(resource.clone() as Arc<dyn MemoryResource>);
        let mut obj = sample_object(handle.clone());
        let snapshot = obj.clone_in(ResourceHandle::default()).unwrap();

        resource.remaining.set(budget);
        let value = match Value::string_in("another heap-spilling payload string", handle.clone())
        {
            Ok(value) => value,
            Err(_) => {
                assert_eq!(obj, snapshot);
                continue;
            }
        };
        match obj.insert("entry-new", value) {
            Ok(_) => {
                resource.remaining.set(usize::MAX);
                assert!(obj.contains_key("entry-new"));
            }
            Err(_) => {
                resource.remaining.set(usize::MAX);
                assert_eq!(obj, snapshot, "failure at budget {budget} mutated the object");
            }
        }
    }
}

#[test]
fn failed_array_growth_leaves_the_array_untouched() {
    for budget in 0..6 {
        let resource = FailAfter::armed(usize::MAX);
        let handle = ResourceHandle::from(resource.clone() as Arc<dyn MemoryResource>);
        let mut arr = Array::new_in(handle.clone());
        for i in 0..10i64 {
            arr.push(Value::int64_in(i, handle.clone())).unwrap();
        }
        arr.shrink_to_fit();
        let snapshot = arr.clone_in(ResourceHandle::default()).unwrap();

        resource.remaining.set(budget);
        match arr.push(Value::int64_in(10, handle.clone())) {
            Ok(()) => {
                resource.remaining.set(usize::MAX);
                assert_eq!(arr.len(), 11);
            }
            Err(_) => {
                resource.remaining.set(usize::MAX);
                assert_eq!(arr, snapshot, "failure at budget {budget} mutated the array");
            }
        }
    }
}

#[test]
fn arena_tree_teardown_is_safe_and_bulk() {
    let arena = Arc::new(MonotonicResource::with_capacity(1 << 16));
    let handle = ResourceHandle::from(arena.clone() as Arc<dyn MemoryResource>);
    {
        let mut root = Object::new_in(handle.clone());
        for i in 0..100 {
            let mut arr = Array::new_in(handle.clone());
            for j in 0..10i64 {
                arr.push(Value::int64_in(j, handle.clone())).unwrap();
            }
            root.try_insert(&format!("row-{i}"), Value::from(arr)).unwrap();
        }
        assert!(arena.allocated_bytes() > 0);
        // dropping the tree performs no per-node deallocation; the arena
        // reclaims everything when the last handle goes away
    }
    assert!(arena.allocated_bytes() > 0);
    drop(handle);
}

#[test]
fn cross_resource_moves_copy_element_wise() {
    let arena = ResourceHandle::new(MonotonicResource::new());
    let mut on_heap = Array::new();
    on_heap
        .push(Value::string_in("from the default resource, long enough to spill", ResourceHandle::default()).unwrap())
        .unwrap();

    let mut on_arena = Array::new_in(arena.clone());
    // pushing a heap-backed value into an arena-backed array re-homes it
    on_arena
        .push(Value::string_in("from the default resource, long enough to spill", ResourceHandle::default()).unwrap())
        .unwrap();
    assert_eq!(on_arena[0].storage(), &arena);
    assert_eq!(on_arena[0], on_heap[0]);
}
