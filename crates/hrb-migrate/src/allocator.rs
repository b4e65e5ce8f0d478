//! Surrogate key allocation above a destination watermark.

use std::collections::HashMap;

use tracing::debug;

use hrb_model::{DestinationId, GlobalToken, SourceKey};

use crate::error::{MigrateError, Result};

/// `count` consecutive ids starting at `watermark + 1`.
pub fn allocate(watermark: i64, count: usize) -> Result<impl Iterator<Item = DestinationId>> {
    let overflow = || MigrateError::AllocationOverflow { watermark, count };
    let span = i64::try_from(count).map_err(|_| overflow())?;
    watermark.checked_add(span).ok_or_else(overflow)?;
    Ok((1..=span).map(move |offset| DestinationId(watermark + offset)))
}

/// A fresh row token, unrelated to the integer sequence.
pub fn new_token() -> GlobalToken {
    GlobalToken::new()
}

/// Allocates identities for one source collection.
///
/// `assign` consumes the allocator and yields the frozen [`IdentityMap`];
/// dependent builders only accept the map, so no lookup can precede allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityAllocator {
    watermark: i64,
}

impl IdentityAllocator {
    /// Start from the watermark read in the same critical section as the load.
    pub fn from_watermark(watermark: i64) -> Self {
        Self { watermark }
    }

    pub fn watermark(&self) -> i64 {
        self.watermark
    }

    /// Assign one destination id per key, in key order.
    pub fn assign<I>(self, keys: I) -> Result<IdentityMap>
    where
        I: IntoIterator<Item = SourceKey>,
    {
        let order: Vec<SourceKey> = keys.into_iter().collect();
        let mut ids = HashMap::with_capacity(order.len());
        for (key, id) in order.iter().zip(allocate(self.watermark, order.len())?) {
            if ids.insert(*key, id).is_some() {
                return Err(MigrateError::DuplicateSourceKey { key: *key });
            }
        }
        debug!(
            watermark = self.watermark,
            allocated = order.len(),
            "assigned identities"
        );
        Ok(IdentityMap {
            watermark: self.watermark,
            ids,
            order,
        })
    }
}

/// Frozen source-key to destination-id bijection for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityMap {
    watermark: i64,
    ids: HashMap<SourceKey, DestinationId>,
    order: Vec<SourceKey>,
}

impl IdentityMap {
    /// Destination id of `key`; a miss is an ordering bug and fatal.
    pub fn lookup(&self, key: SourceKey) -> Result<DestinationId> {
        self.get(key)
            .ok_or(MigrateError::UnmappedSourceKey { key })
    }

    /// Non-failing probe, for explicit inner joins only.
    pub fn get(&self, key: SourceKey) -> Option<DestinationId> {
        self.ids.get(&key).copied()
    }

    pub fn watermark(&self) -> i64 {
        self.watermark
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (SourceKey, DestinationId)> + '_ {
        self.order.iter().map(|key| (*key, self.ids[key]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn allocates_after_watermark() {
        let ids: Vec<i64> = allocate(41, 3).unwrap().map(|id| id.get()).collect();
        assert_eq!(ids, vec![42, 43, 44]);
        assert_eq!(allocate(0, 0).unwrap().count(), 0);
    }

    #[test]
    fn overflowing_allocation_fails() {
        assert!(matches!(
            allocate(i64::MAX - 1, 2),
            Err(MigrateError::AllocationOverflow { .. })
        ));
    }

    #[test]
    fn duplicate_keys_are_fatal() {
        let err = IdentityAllocator::from_watermark(0)
            .assign([SourceKey(5), SourceKey(6), SourceKey(5)])
            .unwrap_err();
        assert!(matches!(err, MigrateError::DuplicateSourceKey { key } if key == SourceKey(5)));
    }

    #[test]
    fn lookup_of_unallocated_key_fails() {
        let map = IdentityAllocator::from_watermark(10)
            .assign([SourceKey(1)])
            .unwrap();
        assert_eq!(map.lookup(SourceKey(1)).unwrap(), DestinationId(11));
        assert!(matches!(
            map.lookup(SourceKey(2)),
            Err(MigrateError::UnmappedSourceKey { .. })
        ));
        assert_eq!(map.get(SourceKey(2)), None);
    }

    proptest! {
        #[test]
        fn assignment_is_injective_and_consecutive(
            keys in prop::collection::hash_set(any::<i64>(), 0..200),
            watermark in 0i64..1_000_000_000,
        ) {
            let keys: Vec<SourceKey> = keys.into_iter().map(SourceKey).collect();
            let map = IdentityAllocator::from_watermark(watermark).assign(keys.clone()).unwrap();

            prop_assert_eq!(map.len(), keys.len());
            let ids: HashSet<i64> = keys.iter().map(|key| map.lookup(*key).unwrap().get()).collect();
            prop_assert_eq!(ids.len(), keys.len());
            for (offset, key) in keys.iter().enumerate() {
                prop_assert_eq!(map.lookup(*key).unwrap().get(), watermark + 1 + offset as i64);
            }
        }
    }
}
