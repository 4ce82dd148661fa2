/// Single-slot memoization cache for one logical query site.
///
/// Holds the last `(key, value)` pair only. The access pattern this serves is
/// "recompute on every UI refresh with unchanged parameters", so one slot
/// captures the common case and stale keys are never revisited intentionally.
/// Correctness rests entirely on the key capturing every input that affects
/// the closure's result; see [`QueryKey`](super::QueryKey).
#[derive(Debug, Default)]
pub struct Memo<K, V> {
    slot: Option<(K, V)>,
}

impl<K: PartialEq, V: Clone> Memo<K, V> {
    pub fn new() -> Self {
        Memo { slot: None }
    }

    /// Return the cached value when `key` equals the last key, otherwise
    /// invoke the closure, cache, and return its result.
    pub fn compute(&mut self, key: K, using: impl FnOnce() -> V) -> V {
        if let Some((last_key, last_value)) = &self.slot {
            if *last_key == key {
                return last_value.clone();
            }
        }
        let value = using();
        self.slot = Some((key, value.clone()));
        value
    }

    /// Drop the cached pair. The next `compute` always invokes the closure.
    pub fn clear(&mut self) {
        self.slot = None;
    }

    pub fn cached(&self) -> Option<&V> {
        self.slot.as_ref().map(|(_, value)| value)
    }
}
