//! Work Distributor
//!
//! Splits unscraped pages into balanced contiguous slices, one per worker. Each
//! slice is also summarised as ranges for logging; workers walk only the pages
//! themselves, so a bridged gap is never fetched.

use serde::Serialize;

/// Inclusive span of pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    /// Pages covered, gap pages included
    pub fn span(&self) -> u32 {
        self.end - self.start + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerAssignment {
    pub worker_id: usize,
    /// Coarse view of `pages`, gaps up to the threshold bridged
    pub ranges: Vec<PageRange>,
    /// Unscraped pages handed to this worker, ascending
    pub pages: Vec<u32>,
}

impl WorkerAssignment {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Balanced split of `pages` across `worker_count` workers.
///
/// Worker `i` receives `len / workers` pages, plus one for the first
/// `len % workers` workers. Workers left with nothing are omitted.
pub fn distribute(pages: &[u32], worker_count: usize, gap_threshold: u32) -> Vec<WorkerAssignment> {
    let mut sorted = pages.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    if sorted.is_empty() || worker_count == 0 {
        return Vec::new();
    }

    let base = sorted.len() / worker_count;
    let remainder = sorted.len() % worker_count;

    let mut assignments = Vec::new();
    let mut offset = 0;

    for worker_id in 0..worker_count {
        let take = base + usize::from(worker_id < remainder);
        if take == 0 {
            continue;
        }

        let slice = &sorted[offset..offset + take];
        offset += take;

        assignments.push(WorkerAssignment {
            worker_id,
            ranges: group_into_ranges(slice, gap_threshold),
            pages: slice.to_vec(),
        });
    }

    assignments
}

/// Merge ascending pages into ranges, bridging gaps of at most `gap_threshold`.
pub fn group_into_ranges(sorted_pages: &[u32], gap_threshold: u32) -> Vec<PageRange> {
    let mut ranges: Vec<PageRange> = Vec::new();

    for &page in sorted_pages {
        match ranges.last_mut() {
            Some(range) if page.saturating_sub(range.end) <= gap_threshold => {
                range.end = range.end.max(page);
            }
            _ => ranges.push(PageRange {
                start: page,
                end: page,
            }),
        }
    }

    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_split_of_fresh_start() {
        let pages: Vec<u32> = (0..1000).collect();
        let assignments = distribute(&pages, 2, 10);

        assert_eq!(assignments.len(), 2);
        assert_eq!(assignments[0].ranges, vec![PageRange { start: 0, end: 499 }]);
        assert_eq!(assignments[1].ranges, vec![PageRange { start: 500, end: 999 }]);
    }

    #[test]
    fn test_balance_within_one_page() {
        for (count, workers) in [(7usize, 3usize), (100, 8), (17, 16), (1, 4), (33, 5)] {
            let pages: Vec<u32> = (0..count as u32).map(|p| p * 3).collect();
            let assignments = distribute(&pages, workers, 10);

            let sizes: Vec<usize> = assignments.iter().map(WorkerAssignment::page_count).collect();
            let max = *sizes.iter().max().unwrap();
            let min = *sizes.iter().min().unwrap();
            assert!(max - min <= 1, "{count} pages over {workers} workers: {sizes:?}");
            assert_eq!(sizes.iter().sum::<usize>(), count);
        }
    }

    #[test]
    fn test_remainder_goes_to_first_workers() {
        let pages: Vec<u32> = (0..7).collect();
        let sizes: Vec<usize> = distribute(&pages, 3, 0)
            .iter()
            .map(WorkerAssignment::page_count)
            .collect();
        assert_eq!(sizes, vec![3, 2, 2]);
    }

    #[test]
    fn test_idle_workers_are_omitted() {
        let assignments = distribute(&[4, 9], 5, 10);
        assert_eq!(assignments.len(), 2);
        assert_eq!(
            assignments.iter().map(|a| a.worker_id).collect::<Vec<_>>(),
            vec![0, 1]
        );
        assert!(distribute(&[], 4, 10).is_empty());
    }

    #[test]
    fn test_unsorted_input_with_duplicates() {
        let assignments = distribute(&[30, 2, 1, 2, 3], 1, 10);
        assert_eq!(
            assignments[0].ranges,
            vec![PageRange { start: 1, end: 3 }, PageRange { start: 30, end: 30 }]
        );
        assert_eq!(assignments[0].pages, vec![1, 2, 3, 30]);
    }

    #[test]
    fn test_gap_threshold_bridging() {
        let ranges = group_into_ranges(&[0, 1, 5, 15, 27, 28], 10);
        assert_eq!(
            ranges,
            vec![PageRange { start: 0, end: 15 }, PageRange { start: 27, end: 28 }]
        );

        let strict = group_into_ranges(&[0, 1, 3], 1);
        assert_eq!(
            strict,
            vec![PageRange { start: 0, end: 1 }, PageRange { start: 3, end: 3 }]
        );
    }

    #[test]
    fn test_bridged_gap_pages_are_not_assigned() {
        // pages 3..=7 were covered by an earlier run and dropped before distribution
        let assignments = distribute(&[0, 1, 2, 8, 9], 1, 10);

        assert_eq!(assignments[0].ranges, vec![PageRange { start: 0, end: 9 }]);
        assert_eq!(assignments[0].ranges[0].span(), 10);
        assert_eq!(assignments[0].pages, vec![0, 1, 2, 8, 9]);
        assert_eq!(assignments[0].page_count(), 5);
    }
}
