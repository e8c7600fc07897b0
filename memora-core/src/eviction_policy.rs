/// Policy used by [`InMemoryEngine`](crate::InMemoryEngine) to pick a victim once it is full.
///
/// # Variants
///
/// * `FIFO` - **First In, First Out**
///   - The oldest inserted entry is removed first
///   - Reads do NOT change an entry's position
///
/// * `LRU` - **Least Recently Used** (default)
///   - The least recently read or written entry is removed first
///   - Every hit moves the entry to the "most recent" position
///
/// * `Random` - **Random replacement**
///   - A uniformly random entry is removed
///   - No bookkeeping on hits
///
/// # Examples
///
/// ```
/// use memora_core::EvictionPolicy;
///
/// assert_eq!(EvictionPolicy::default(), EvictionPolicy::LRU);
///
/// let policy: EvictionPolicy = "fifo".into();
/// assert_eq!(policy, EvictionPolicy::FIFO);
/// ```
///
/// # Performance Characteristics
///
/// | Policy | Eviction | Cache Hit | Storing a new key |
/// |--------|----------|-----------|-------------------|
/// | FIFO   | O(1)     | O(1)      | O(1)              |
/// | LRU    | O(1)     | O(n)      | O(1)              |
/// | Random | O(n)     | O(1)      | O(1)              |
///
/// Overwriting a key that is already stored is O(n) for every policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    FIFO,
    #[default]
    LRU,
    Random,
}

/// Converts a string slice to an `EvictionPolicy`.
///
/// The conversion is case-insensitive and falls back to LRU for unrecognized values.
///
/// ```
/// use memora_core::EvictionPolicy;
///
/// let random: EvictionPolicy = "RANDOM".into();
/// assert_eq!(random, EvictionPolicy::Random);
///
/// let unknown: EvictionPolicy = "lfu".into();
/// assert_eq!(unknown, EvictionPolicy::LRU);
/// ```
impl From<&str> for EvictionPolicy {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "fifo" => EvictionPolicy::FIFO,
            "random" => EvictionPolicy::Random,
            _ => EvictionPolicy::LRU,
        }
    }
}
