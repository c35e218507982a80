use std::collections::HashMap;

use crate::api::{PageOutcome, PageSource};
use crate::db::{Store, COMPANIES_TABLE, JOBS_TABLE};
use crate::error::{IngestError, StoreError};
use crate::models::{Company, Job};
use crate::normalize::{normalize, Diagnostic, LevelPolicy};
use crate::ratelimit::{Pause, RateLimitGovernor, ThreadSleep};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Upstream page count reached
    Exhausted,
    /// Caller's page limit reached
    PageLimit,
    /// Upstream answered with a status other than 200
    UpstreamStatus(u16),
}

#[derive(Debug)]
pub struct IngestOutcome {
    pub jobs: Vec<Job>,
    pub companies: HashMap<i64, Company>,
    pub diagnostics: Vec<Diagnostic>,
    pub pages_fetched: u32,
    pub stop_reason: StopReason,
}

impl IngestOutcome {
    /// Companies ordered by id, for a stable table layout.
    pub fn sorted_companies(&self) -> Vec<Company> {
        let mut companies: Vec<Company> = self.companies.values().cloned().collect();
        companies.sort_by_key(|c| c.company_id);
        companies
    }
}

/// Drives the page loop: fetch, normalize, accumulate, respect the quota.
pub struct Ingestor<S: PageSource, P: Pause = ThreadSleep> {
    source: S,
    governor: RateLimitGovernor<P>,
    level_policy: LevelPolicy,
}

impl<S: PageSource, P: Pause> Ingestor<S, P> {
    pub fn new(source: S, governor: RateLimitGovernor<P>, level_policy: LevelPolicy) -> Self {
        Self {
            source,
            governor,
            level_policy,
        }
    }

    /// Fetch pages from 0 upward until the upstream page count or
    /// `page_limit` is reached, or the API rejects a request.
    ///
    /// `page_limit` of `None` means no limit; `Some(0)` fetches nothing.
    /// A rejected request ends the loop with whatever was collected so far.
    pub fn run(&self, page_limit: Option<u32>) -> Result<IngestOutcome, IngestError> {
        match page_limit {
            Some(limit) => tracing::info!("Will query up to {} pages", limit),
            None => tracing::info!("Will query all available pages"),
        }

        let mut jobs = Vec::new();
        let mut companies = HashMap::new();
        let mut diagnostics = Vec::new();
        let mut page_num = 0u32;
        let limit_reached = |pages: u32| page_limit.is_some_and(|limit| pages >= limit);

        let stop_reason = loop {
            if limit_reached(page_num) {
                break StopReason::PageLimit;
            }

            tracing::info!(page = page_num, "Querying page {}...", page_num);
            let (page, quota) = match self.source.fetch_page(page_num)? {
                PageOutcome::Page { page, quota } => (page, quota),
                PageOutcome::Rejected { status, quota } => {
                    tracing::warn!(
                        remaining = ?quota.remaining,
                        reset_after = ?quota.reset_after,
                        "Exiting API due to error. Response code: {}",
                        status
                    );
                    break StopReason::UpstreamStatus(status.as_u16());
                }
            };

            for raw in &page.results {
                let normalized = normalize(raw, self.level_policy)?;
                jobs.push(normalized.job);
                // last write wins for a company seen on several pages
                companies.insert(normalized.company.company_id, normalized.company);
                diagnostics.extend(normalized.diagnostics);
            }
            page_num += 1;

            if page_num >= page.page_count {
                break StopReason::Exhausted;
            }
            if limit_reached(page_num) {
                break StopReason::PageLimit;
            }
            self.governor.observe(quota);
        };

        tracing::info!(
            pages = page_num,
            jobs = jobs.len(),
            companies = companies.len(),
            diagnostics = diagnostics.len(),
            "Pagination finished: {:?}",
            stop_reason
        );

        Ok(IngestOutcome {
            jobs,
            companies,
            diagnostics,
            pages_fetched: page_num,
            stop_reason,
        })
    }
}

/// Replace the `jobs` and `companies` tables with the run's results.
pub fn persist(store: &mut Store, outcome: &IngestOutcome) -> Result<(usize, usize), StoreError> {
    let jobs = store.replace_table(JOBS_TABLE, &outcome.jobs)?;
    let companies = store.replace_table(COMPANIES_TABLE, &outcome.sorted_companies())?;
    Ok((jobs, companies))
}
