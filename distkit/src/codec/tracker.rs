use crate::runtime::heap::Handle;
use crate::runtime::values::{NativeFunction, Value};
use std::collections::HashMap;

/// What makes two encounters "the same value".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identity {
    Heap(Handle),
    Native(usize),
}

impl Identity {
    /// `None` for scalars, which are never deduplicated.
    pub fn of(value: &Value) -> Option<Identity> {
        match value {
            Value::Ref(handle) => Some(Identity::Heap(*handle)),
            Value::Native(native) => Some(Identity::Native(NativeFunction::identity(native))),
            _ => None,
        }
    }
}

/// Per-encode id assignment in first-encounter order.
#[derive(Debug, Default)]
pub struct RefTracker {
    seen: HashMap<Identity, u64>,
    next_id: u64,
}

impl RefTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, identity: Identity) -> Option<u64> {
        self.seen.get(&identity).copied()
    }

    /// Records `identity` and returns its fresh id. Must be called before recursing into the
    /// value so that back edges find it.
    pub fn assign(&mut self, identity: Identity) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.seen.insert(identity, id);
        id
    }

    pub fn assigned(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::heap::Heap;
    use crate::runtime::values::Arity;

    #[test]
    fn ids_follow_first_encounter() {
        let mut heap = Heap::new();
        let a = heap.array(Vec::<Value>::new());
        let b = heap.array(Vec::<Value>::new());
        let native = NativeFunction::new("noop", Arity::Fixed(0), |_, _| Ok(Value::Undefined));

        let mut tracker = RefTracker::new();
        let b_id = Identity::of(&b).unwrap();
        let native_id = Identity::of(&Value::Native(native.clone())).unwrap();
        assert_eq!(tracker.assign(b_id), 0);
        assert_eq!(tracker.assign(native_id), 1);
        assert_eq!(tracker.lookup(b_id), Some(0));
        assert_eq!(tracker.lookup(Identity::of(&a).unwrap()), None);
        assert_eq!(tracker.lookup(Identity::of(&Value::Native(native)).unwrap()), Some(1));
        assert_eq!(Identity::of(&Value::from("shared")), None);
    }
}
