//! Reconciles URLs found in task text against stored link rows.
//!
//! There is one row per (url, source task). A url seen for a new task copies the
//! best title already on file instead of resolving again. Titles only move up
//! in confidence: a fetched page title replaces a fallback, never the reverse.

use chrono::NaiveDateTime;
use futures::future::join_all;
use url::Url;
use uuid::Uuid;

use super::title::{ResolvedTitle, TitleFetcher, TitleResolver, fallback_title};
use crate::core::link::{Link, NewLink, TitleSource, domain_of};
use crate::parse::urls::{find_urls, parse_url};
use crate::store::{RecordStore, StoreError};

/// What `record` did for one url.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// New row with a freshly resolved title.
    Inserted,
    /// New row carrying a title from another row for the same url.
    Reused,
    /// Row already present, nothing changed.
    Existing,
    /// Row already present and at least one title for the url was upgraded.
    Retitled,
    /// Not a valid absolute URL.
    Skipped,
}

/// Totals from a retroactive scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub tasks_scanned: usize,
    pub inserted: usize,
    pub reused: usize,
    pub retitled: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Plan {
    Resolve,
    Reuse(ResolvedTitle),
    Refresh,
    Keep,
}

impl Plan {
    fn needs_resolution(&self) -> bool {
        matches!(self, Self::Resolve | Self::Refresh)
    }
}

pub struct LinkRegistry<F> {
    resolver: TitleResolver<F>,
    refresh_fallback_titles: bool,
    clock: fn() -> NaiveDateTime,
}

impl<F: TitleFetcher> LinkRegistry<F> {
    pub fn new(resolver: TitleResolver<F>) -> Self {
        Self {
            resolver,
            refresh_fallback_titles: true,
            clock: || chrono::Local::now().naive_local(),
        }
    }

    /// Whether an existing row whose title is only a fallback gets another fetch attempt.
    pub fn refresh_fallback_titles(mut self, enabled: bool) -> Self {
        self.refresh_fallback_titles = enabled;
        self
    }

    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    /// Record one sighting of `url` for `source`. Idempotent per (url, source).
    pub async fn record<S: RecordStore>(
        &self,
        store: &mut S,
        url: &str,
        source: Option<Uuid>,
    ) -> Result<RecordOutcome, StoreError> {
        let Some(url) = parse_url(url) else {
            log::warn!("Not recording malformed URL: {}", url);
            return Ok(RecordOutcome::Skipped);
        };
        let outcomes = self.record_all(store, vec![url], source).await?;
        Ok(outcomes
            .into_iter()
            .next()
            .map_or(RecordOutcome::Skipped, |(_, outcome)| outcome))
    }

    /// Scan free text for URLs and record each distinct one for `source`.
    pub async fn register_links<S: RecordStore>(
        &self,
        store: &mut S,
        text: &str,
        source: Option<Uuid>,
    ) -> Result<Vec<(String, RecordOutcome)>, StoreError> {
        let mut urls: Vec<Url> = Vec::new();
        for found in find_urls(text) {
            if !urls.contains(&found.url) {
                urls.push(found.url);
            }
        }
        self.record_all(store, urls, source).await
    }

    /// Re-scan every stored task. Tasks are processed one at a time.
    pub async fn scan_tasks<S: RecordStore>(&self, store: &mut S) -> Result<ScanSummary, StoreError> {
        let mut summary = ScanSummary::default();
        for task in store.tasks()? {
            let text = task.scannable_text();
            summary.tasks_scanned += 1;
            if text.is_empty() {
                continue;
            }
            for (_, outcome) in self.register_links(store, &text, Some(task.id)).await? {
                match outcome {
                    RecordOutcome::Inserted => summary.inserted += 1,
                    RecordOutcome::Reused => summary.reused += 1,
                    RecordOutcome::Retitled => summary.retitled += 1,
                    RecordOutcome::Existing | RecordOutcome::Skipped => {}
                }
            }
        }
        log::info!(
            "Link scan: {} tasks, {} new, {} reused, {} retitled",
            summary.tasks_scanned,
            summary.inserted,
            summary.reused,
            summary.retitled
        );
        Ok(summary)
    }

    /// Plan every url against the store, resolve the ones that need it
    /// concurrently, then write in order.
    async fn record_all<S: RecordStore>(
        &self,
        store: &mut S,
        urls: Vec<Url>,
        source: Option<Uuid>,
    ) -> Result<Vec<(String, RecordOutcome)>, StoreError> {
        let mut plans = Vec::with_capacity(urls.len());
        for url in &urls {
            plans.push(self.plan(store, url, source)?);
        }

        let resolved = join_all(urls.iter().zip(&plans).map(move |(url, plan)| async move {
            if plan.needs_resolution() {
                Some(self.resolver.resolve(url).await)
            } else {
                None
            }
        }))
        .await;

        let mut outcomes = Vec::with_capacity(urls.len());
        for ((url, plan), resolved) in urls.into_iter().zip(plans).zip(resolved) {
            let outcome = self.apply(store, &url, source, plan, resolved)?;
            log::debug!("{} ({:?}): {:?}", url, source, outcome);
            outcomes.push((url.to_string(), outcome));
        }
        Ok(outcomes)
    }

    fn plan<S: RecordStore>(&self, store: &S, url: &Url, source: Option<Uuid>) -> Result<Plan, StoreError> {
        let rows = store.links_by_url(url.as_str())?;
        let Some(best) = best_title(&rows) else {
            return Ok(Plan::Resolve);
        };
        if !rows.iter().any(|l| l.source_task_id == source) {
            Ok(Plan::Reuse(best))
        } else if self.refresh_fallback_titles && best.source < TitleSource::Fetched {
            Ok(Plan::Refresh)
        } else {
            Ok(Plan::Keep)
        }
    }

    fn apply<S: RecordStore>(
        &self,
        store: &mut S,
        url: &Url,
        source: Option<Uuid>,
        plan: Plan,
        resolved: Option<ResolvedTitle>,
    ) -> Result<RecordOutcome, StoreError> {
        match plan {
            Plan::Resolve => {
                let title = resolved.unwrap_or_else(|| fallback_title(url));
                self.insert(store, url, source, title)?;
                Ok(RecordOutcome::Inserted)
            }
            Plan::Reuse(title) => {
                self.insert(store, url, source, title)?;
                Ok(RecordOutcome::Reused)
            }
            Plan::Refresh => {
                let changed = match resolved {
                    Some(title) => retitle(store, url, &title)?,
                    None => 0,
                };
                Ok(if changed > 0 { RecordOutcome::Retitled } else { RecordOutcome::Existing })
            }
            Plan::Keep => Ok(RecordOutcome::Existing),
        }
    }

    fn insert<S: RecordStore>(
        &self,
        store: &mut S,
        url: &Url,
        source: Option<Uuid>,
        title: ResolvedTitle,
    ) -> Result<Uuid, StoreError> {
        store.insert_link(NewLink {
            url: url.to_string(),
            title: title.title,
            title_source: title.source,
            domain: domain_of(url),
            source_task_id: source,
            created_at: (self.clock)(),
        })
    }
}

/// The most trusted title on file; the earliest row wins a tie.
fn best_title(rows: &[Link]) -> Option<ResolvedTitle> {
    rows.iter()
        .filter(|l| !l.title.trim().is_empty())
        .fold(None::<&Link>, |best, l| match best {
            Some(b) if b.title_source >= l.title_source => Some(b),
            _ => Some(l),
        })
        .map(|l| ResolvedTitle {
            title: l.title.clone(),
            source: l.title_source,
        })
}

/// Upgrade every row for `url` whose title is less trusted than, or as trusted
/// as but different from, `title`. Returns the number of rows changed.
fn retitle<S: RecordStore>(store: &mut S, url: &Url, title: &ResolvedTitle) -> Result<usize, StoreError> {
    if title.title.trim().is_empty() {
        return Ok(0);
    }
    let mut changed = 0;
    for row in store.links_by_url(url.as_str())? {
        if title.source >= row.title_source && title.title != row.title {
            store.update_link_title(row.id, &title.title, title.source)?;
            changed += 1;
        }
    }
    Ok(changed)
}
