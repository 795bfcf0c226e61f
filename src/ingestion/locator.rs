//! Date Locator
//!
//! Finds the upstream page holding a given transaction time. Upstream ordering
//! is not guaranteed to be monotonic in date (new sales can be inserted ahead of
//! old ones between runs), so this is a bounded best-effort scan rather than a
//! binary search. Every call inspects at most `max_pages_to_check` pages.
//!
//! A scan does not stop when a page lies entirely on the far side of the
//! target. Upstream serves newest sales first, so a "stop once the page is no
//! longer older than the target" rule would end every forward search at page 0.
//! A scan ends only on an exact hit, a page whose span contains the target, an
//! empty page (forward only), or the page budget.

use chrono::{DateTime, FixedOffset};

use super::normalizer::parse_transaction_time;
use crate::scrapers::PageSource;
use crate::scrapers::record::RawSaleRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// From page 0 upwards. An empty page marks the end of the data.
    Forward,
    /// From `start_page` downwards. Empty pages are skipped, since a high
    /// start page usually lies past the end of the data.
    Backward { start_page: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocateResult {
    pub page_number: Option<u32>,
    pub found_exact: bool,
    pub pages_checked: u32,
}

impl LocateResult {
    fn miss(pages_checked: u32) -> Self {
        Self {
            page_number: None,
            found_exact: false,
            pages_checked,
        }
    }
}

enum PageVerdict {
    Empty,
    Exact,
    /// Target lies within the page's time span but no record matches it
    Spans,
    Elsewhere,
}

pub struct DateLocator<'a> {
    source: &'a dyn PageSource,
    items_per_page: u32,
}

impl<'a> DateLocator<'a> {
    pub fn new(source: &'a dyn PageSource, items_per_page: u32) -> Self {
        Self {
            source,
            items_per_page,
        }
    }

    pub async fn locate(
        &self,
        target: &str,
        direction: Direction,
        max_pages_to_check: u32,
    ) -> LocateResult {
        let target = target.trim();
        let target_time = parse_transaction_time(target);
        let mut checked = 0u32;

        let mut next_page = match direction {
            Direction::Forward => Some(0),
            Direction::Backward { start_page } => Some(start_page),
        };

        while let Some(page) = next_page {
            if checked >= max_pages_to_check {
                break;
            }

            let records = self.source.fetch_page(page, self.items_per_page).await;
            checked += 1;

            match classify_page(&records, target, target_time.as_ref()) {
                PageVerdict::Exact => {
                    tracing::debug!(page, checked, "Located exact transaction time");
                    return LocateResult {
                        page_number: Some(page),
                        found_exact: true,
                        pages_checked: checked,
                    };
                }
                PageVerdict::Spans => {
                    tracing::debug!(page, checked, "Target time falls inside page span");
                    return LocateResult {
                        page_number: Some(page),
                        found_exact: false,
                        pages_checked: checked,
                    };
                }
                PageVerdict::Empty if direction == Direction::Forward => {
                    tracing::debug!(page, checked, "Reached end of upstream data");
                    return LocateResult::miss(checked);
                }
                PageVerdict::Empty | PageVerdict::Elsewhere => {}
            }

            next_page = match direction {
                Direction::Forward => page.checked_add(1),
                Direction::Backward { .. } => page.checked_sub(1),
            };
        }

        LocateResult::miss(checked)
    }
}

fn record_times(records: &[RawSaleRecord]) -> Vec<(String, Option<DateTime<FixedOffset>>)> {
    records
        .iter()
        .filter_map(|r| r.get_optional_scalar("time"))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .map(|t| {
            let parsed = parse_transaction_time(&t);
            (t, parsed)
        })
        .collect()
}

fn classify_page(
    records: &[RawSaleRecord],
    target: &str,
    target_time: Option<&DateTime<FixedOffset>>,
) -> PageVerdict {
    if records.is_empty() {
        return PageVerdict::Empty;
    }

    let times = record_times(records);

    let exact = times.iter().any(|(raw, parsed)| {
        raw == target || matches!((parsed, target_time), (Some(a), Some(b)) if a == b)
    });
    if exact {
        return PageVerdict::Exact;
    }

    let Some(target_time) = target_time else {
        return PageVerdict::Elsewhere;
    };

    let parsed: Vec<_> = times.iter().filter_map(|(_, p)| *p).collect();
    match (parsed.iter().min(), parsed.iter().max()) {
        (Some(earliest), Some(latest)) if earliest <= target_time && target_time <= latest => {
            PageVerdict::Spans
        }
        _ => PageVerdict::Elsewhere,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::testing::ScriptedSource;

    fn pages_newest_first() -> ScriptedSource {
        ScriptedSource::from_times(&[
            &["2025-03-03T00:00:00Z", "2025-03-02T00:00:00Z"],
            &["2025-03-01T00:00:00Z", "2025-02-20T00:00:00Z"],
            &["2025-02-10T00:00:00Z", "2025-02-01T00:00:00Z"],
        ])
    }

    #[tokio::test]
    async fn test_forward_exact_match() {
        let source = pages_newest_first();
        let locator = DateLocator::new(&source, 10);

        let result = locator
            .locate("2025-02-20T00:00:00Z", Direction::Forward, 10)
            .await;
        assert_eq!(result.page_number, Some(1));
        assert!(result.found_exact);
        assert_eq!(result.pages_checked, 2);
    }

    #[tokio::test]
    async fn test_exact_match_by_instant() {
        let source = pages_newest_first();
        let locator = DateLocator::new(&source, 10);

        let result = locator
            .locate("2025-02-10T01:00:00+01:00", Direction::Forward, 10)
            .await;
        assert_eq!(result.page_number, Some(2));
        assert!(result.found_exact);
    }

    #[tokio::test]
    async fn test_out_of_order_pages_do_not_end_the_scan() {
        // a late insert pushed an older page ahead of newer ones
        let source = ScriptedSource::from_times(&[
            &["2025-01-05T00:00:00Z"],
            &["2025-03-01T00:00:00Z"],
            &["2025-02-01T00:00:00Z", "2025-01-20T00:00:00Z"],
        ]);
        let locator = DateLocator::new(&source, 10);

        let result = locator
            .locate("2025-01-20T00:00:00Z", Direction::Forward, 10)
            .await;
        assert_eq!(result.page_number, Some(2));
        assert!(result.found_exact);
        assert_eq!(result.pages_checked, 3);
    }

    #[tokio::test]
    async fn test_forward_span_without_exact_hit() {
        let source = pages_newest_first();
        let locator = DateLocator::new(&source, 10);

        let result = locator
            .locate("2025-02-25T00:00:00Z", Direction::Forward, 10)
            .await;
        assert_eq!(result.page_number, Some(1));
        assert!(!result.found_exact);
    }

    #[tokio::test]
    async fn test_forward_stops_at_end_of_data() {
        let source = pages_newest_first();
        let locator = DateLocator::new(&source, 10);

        let result = locator
            .locate("2020-01-01T00:00:00Z", Direction::Forward, 100)
            .await;
        assert_eq!(result, LocateResult::miss(4));
    }

    #[tokio::test]
    async fn test_backward_skips_empty_high_pages() {
        let source = pages_newest_first();
        let locator = DateLocator::new(&source, 10);

        let result = locator
            .locate("2025-03-03T00:00:00Z", Direction::Backward { start_page: 8 }, 20)
            .await;
        assert_eq!(result.page_number, Some(0));
        assert!(result.found_exact);
        assert_eq!(result.pages_checked, 9);
    }

    #[tokio::test]
    async fn test_search_is_bounded_in_both_directions() {
        // Every page holds data, none of it matching
        let source = ScriptedSource::endless("2019-01-01T00:00:00Z");
        let locator = DateLocator::new(&source, 10);

        for k in [0, 1, 5, 25] {
            let forward = locator.locate("2025-01-01T00:00:00Z", Direction::Forward, k).await;
            assert_eq!(forward, LocateResult::miss(k));

            let backward = locator
                .locate("2025-01-01T00:00:00Z", Direction::Backward { start_page: 5000 }, k)
                .await;
            assert_eq!(backward, LocateResult::miss(k));
        }
        assert_eq!(source.fetch_count(), 2 * (1 + 5 + 25));
    }

    #[tokio::test]
    async fn test_backward_stops_at_page_zero() {
        let source = pages_newest_first();
        let locator = DateLocator::new(&source, 10);

        let result = locator
            .locate("2030-01-01T00:00:00Z", Direction::Backward { start_page: 2 }, 100)
            .await;
        assert_eq!(result, LocateResult::miss(3));
    }
}
