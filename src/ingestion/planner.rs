//! Sandwich Planner
//!
//! Decides which pages a run fetches. With nothing stored the run takes a
//! bounded fresh start. Otherwise it fetches the pages before the page holding
//! the earliest stored sale and after the page holding the latest one, leaving
//! the already-covered middle alone. Any boundary that cannot be pinned down
//! exactly degrades to a fixed-size fallback region.

use serde::Serialize;

use super::error::StoreError;
use super::locator::{DateLocator, Direction, LocateResult};
use crate::scrapers::PageSource;
use crate::services::sales_store::SalesStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    FreshStart,
    DateSandwich,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::FreshStart => write!(f, "freshStart"),
            Strategy::DateSandwich => write!(f, "dateSandwich"),
        }
    }
}

/// Already-covered region, kept for diagnostics only
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRange {
    pub first_date: String,
    pub last_date: String,
    pub record_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionPlan {
    pub strategy: Strategy,
    pub older_pages: Vec<u32>,
    pub skipped_range: Option<SkippedRange>,
    pub newer_pages: Vec<u32>,
}

impl IngestionPlan {
    /// Union of both regions, ascending, without duplicates
    pub fn all_pages(&self) -> Vec<u32> {
        let mut pages: Vec<u32> = self
            .older_pages
            .iter()
            .chain(self.newer_pages.iter())
            .copied()
            .collect();
        pages.sort_unstable();
        pages.dedup();
        pages
    }
}

#[derive(Debug, Clone)]
pub struct PlannerSettings {
    pub items_per_page: u32,
    pub default_max_pages: u32,
    pub locator_max_pages: u32,
    pub locator_high_page: u32,
    pub fallback_region_pages: u32,
    pub fresh_start_pages: u32,
}

pub struct SandwichPlanner<'a> {
    source: &'a dyn PageSource,
    store: &'a dyn SalesStore,
    settings: PlannerSettings,
}

impl<'a> SandwichPlanner<'a> {
    pub fn new(
        source: &'a dyn PageSource,
        store: &'a dyn SalesStore,
        settings: PlannerSettings,
    ) -> Self {
        Self {
            source,
            store,
            settings,
        }
    }

    /// Build the plan for `max_pages` upstream pages (0 = configured default).
    ///
    /// Only a failing date-range query is an error; unlocatable dates never are.
    pub async fn plan(&self, max_pages: u32) -> Result<IngestionPlan, StoreError> {
        let max_pages = if max_pages == 0 {
            self.settings.default_max_pages
        } else {
            max_pages
        };

        let Some(range) = self.store.get_date_range().await? else {
            let bound = max_pages.min(self.settings.fresh_start_pages);
            tracing::info!(pages = bound, "No stored sales, planning fresh start");
            return Ok(IngestionPlan {
                strategy: Strategy::FreshStart,
                older_pages: (0..bound).collect(),
                skipped_range: None,
                newer_pages: Vec::new(),
            });
        };

        tracing::info!(
            first_date = %range.first_date,
            last_date = %range.last_date,
            records = range.total_records,
            "Planning date sandwich around stored sales"
        );

        let locator = DateLocator::new(self.source, self.settings.items_per_page);
        let budget = self.settings.locator_max_pages;

        let first = locator
            .locate(&range.first_date, Direction::Forward, budget)
            .await;
        let older_pages = match exact_page(&first) {
            Some(page) => (0..page.min(max_pages)).collect(),
            None => {
                tracing::warn!(
                    pages_checked = first.pages_checked,
                    "Could not locate earliest stored sale, using fallback region near page 0"
                );
                self.head_fallback(max_pages)
            }
        };

        let mut last = locator
            .locate(&range.last_date, Direction::Forward, budget)
            .await;
        if exact_page(&last).is_none() && max_pages > 0 {
            let start_page = self.settings.locator_high_page.min(max_pages - 1);
            tracing::debug!(start_page, "Forward search missed latest sale, searching backward");
            last = locator
                .locate(&range.last_date, Direction::Backward { start_page }, budget)
                .await;
        }
        let newer_pages = match exact_page(&last) {
            Some(page) => (page.saturating_add(1)..max_pages).collect(),
            None => {
                tracing::warn!(
                    pages_checked = last.pages_checked,
                    "Could not locate latest stored sale, using fallback region near max pages"
                );
                self.tail_fallback(max_pages)
            }
        };

        let plan = IngestionPlan {
            strategy: Strategy::DateSandwich,
            older_pages,
            skipped_range: Some(SkippedRange {
                first_date: range.first_date,
                last_date: range.last_date,
                record_count: range.total_records,
            }),
            newer_pages,
        };

        tracing::info!(
            older = plan.older_pages.len(),
            newer = plan.newer_pages.len(),
            "Date sandwich planned"
        );

        Ok(plan)
    }

    fn head_fallback(&self, max_pages: u32) -> Vec<u32> {
        (0..self.settings.fallback_region_pages.min(max_pages)).collect()
    }

    fn tail_fallback(&self, max_pages: u32) -> Vec<u32> {
        (max_pages.saturating_sub(self.settings.fallback_region_pages)..max_pages).collect()
    }
}

fn exact_page(result: &LocateResult) -> Option<u32> {
    result.page_number.filter(|_| result.found_exact)
}
