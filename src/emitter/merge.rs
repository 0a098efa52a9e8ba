//! Timestamp-ordered merge of per-source record runs.
//!
//! Each source is first turned into a [`SortedRun`]; runs are then merged
//! with a min-heap holding one pending record per source, so only the head
//! of each run is compared at any time.
//!
//! Order: timestamp, then source position (input order), then record kind,
//! then position within the source.

use crate::record::Record;
use chrono::{DateTime, Utc};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// One source's records, stably sorted by (timestamp, record kind)
#[derive(Debug, Clone, Default)]
pub struct SortedRun {
    records: Vec<Record>,
}

impl SortedRun {
    /// Sort records from one source
    ///
    /// Records with equal timestamp and kind keep their file order.
    pub fn new(mut records: Vec<Record>) -> Self {
        records.sort_by(|a, b| {
            a.timestamp()
                .cmp(&b.timestamp())
                .then_with(|| a.kind().cmp(&b.kind()))
        });
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Keep only records matching `keep`, preserving order
    pub fn retain(&mut self, keep: impl FnMut(&Record) -> bool) {
        self.records.retain(keep);
    }
}

impl IntoIterator for SortedRun {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// Pending head of one source
struct HeapEntry {
    timestamp: DateTime<Utc>,
    source: usize,
    record: Record,
}

impl HeapEntry {
    fn key(&self) -> (DateTime<Utc>, usize) {
        (self.timestamp, self.source)
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Iterator yielding `(source index, record)` in global timestamp order
///
/// Every source must already be ordered (see [`SortedRun`]); the merge
/// itself buffers one record per source.
pub struct OrderedMerge<I: Iterator<Item = Record>> {
    sources: Vec<I>,
    heap: BinaryHeap<Reverse<HeapEntry>>,
}

impl<I: Iterator<Item = Record>> OrderedMerge<I> {
    pub fn new(sources: Vec<I>) -> Self {
        let mut merge = Self {
            heap: BinaryHeap::with_capacity(sources.len()),
            sources,
        };
        for source in 0..merge.sources.len() {
            merge.refill(source);
        }
        merge
    }

    fn refill(&mut self, source: usize) {
        if let Some(record) = self.sources[source].next() {
            self.heap.push(Reverse(HeapEntry {
                timestamp: record.timestamp(),
                source,
                record,
            }));
        }
    }
}

impl<I: Iterator<Item = Record>> Iterator for OrderedMerge<I> {
    type Item = (usize, Record);

    fn next(&mut self) -> Option<Self::Item> {
        let Reverse(entry) = self.heap.pop()?;
        self.refill(entry.source);
        Some((entry.source, entry.record))
    }
}

/// Merge sorted runs, in the order the runs are given
///
/// **Public** - main entry point for ordering
pub fn merge_runs(runs: Vec<SortedRun>) -> OrderedMerge<std::vec::IntoIter<Record>> {
    OrderedMerge::new(runs.into_iter().map(IntoIterator::into_iter).collect())
}
