//! Result aggregation.
//!
//! Records are bucketed by [`GroupKey`], then by descriptor location, while the
//! suite runs and handed to the baseline writer exactly once at teardown. Appends may come from several
//! test threads at once, so the map sits behind a mutex.

use crate::model::{ExpectationSetDescriptor, GroupKey, ResultRecord};
use crate::resource::ResourceLocation;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::trace;

/// Records taken from one copy of a descriptor.
///
/// Sample indices only make sense against the descriptor they were read
/// from, so copies of the same pack in different containers stay apart.
#[derive(Debug, Clone, PartialEq)]
pub struct OriginResults {
    /// Where the descriptor was loaded from.
    pub location: ResourceLocation,
    pub descriptor: Arc<ExpectationSetDescriptor>,
    /// Records in the order they were appended.
    pub records: Vec<ResultRecord>,
}

/// Everything recorded for one expectation set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupResults {
    /// One entry per descriptor location, in first-recorded order.
    pub origins: Vec<OriginResults>,
}

impl GroupResults {
    /// Total records across every origin.
    #[must_use]
    pub fn len(&self) -> usize {
        self.origins.iter().map(|origin| origin.records.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(
        &mut self,
        location: &ResourceLocation,
        descriptor: &Arc<ExpectationSetDescriptor>,
        record: ResultRecord,
    ) {
        if let Some(origin) = self
            .origins
            .iter_mut()
            .find(|origin| origin.location == *location)
        {
            origin.records.push(record);
            return;
        }
        self.origins.push(OriginResults {
            location: location.clone(),
            descriptor: Arc::clone(descriptor),
            records: vec![record],
        });
    }
}

/// Groups result records by key, preserving insertion order within a group.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    groups: Mutex<BTreeMap<GroupKey, GroupResults>>,
}

impl ResultAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record under `key`, next to other records from the same
    /// descriptor location. Nothing is deduplicated or reordered.
    pub fn record(
        &self,
        key: GroupKey,
        location: &ResourceLocation,
        descriptor: &Arc<ExpectationSetDescriptor>,
        record: ResultRecord,
    ) {
        let mut groups = self.groups.lock().unwrap_or_else(PoisonError::into_inner);
        trace!(group = %key, input = %record.input_path, "Recording result");
        groups
            .entry(key)
            .or_default()
            .push(location, descriptor, record);
    }

    /// Number of records held across all groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(GroupResults::len)
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain the map, leaving the aggregator empty.
    #[must_use]
    pub fn take(&self) -> BTreeMap<GroupKey, GroupResults> {
        let mut groups = self.groups.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *groups)
    }
}
