//! The discovery pipeline.
//!
//! One subject at a time, one URL at a time:
//!
//! ```text
//! breaker check -> known publications -> query -> pause -> search
//!     -> for each result: normalize -> filter -> known? -> fetch -> score -> resolve
//!     -> touch subject
//! ```
//!
//! Every per-URL problem is recorded in the [`DiscoveryReport`] and the
//! loop moves on. A failing search trips the circuit breaker and aborts
//! with [`DiscoveryError::ProviderBlocked`].

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::dedupe::{DuplicateResolver, Resolution};
use crate::error::{DiscoveryError, Result};
use crate::matcher::PublicationMatcher;
use crate::normalize::normalize_url;
use crate::query::{QueryBuilder, QueryStrategy};
use crate::rate::{Gate, RateController};
use crate::scorer::{HeuristicScorer, PageScorer};
use crate::traits::{
    bibliography::BibliographySource, fetcher::PageFetcher, searcher::WebSearcher,
    store::CatalogueStore,
};
use crate::types::{
    config::FinderConfig,
    source::{DiscoveryReport, ScoredSource, SourceDisposition},
    subject::titles,
};
use crate::url_filter::UrlFilter;

/// Result of one discovery attempt.
#[derive(Debug, Clone)]
pub enum Discovery {
    /// The attempt ran to completion.
    Completed(DiscoveryReport),

    /// The circuit breaker is active; nothing was searched.
    Skipped { retry_after: Duration },
}

impl Discovery {
    pub fn report(&self) -> Option<&DiscoveryReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Skipped { .. } => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

/// Result of processing a batch of subjects.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    /// Reports of completed attempts, in processing order
    pub reports: Vec<DiscoveryReport>,

    /// Set when the run stopped because the circuit breaker is active
    pub skipped: Option<Duration>,
}

impl RunOutcome {
    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }

    /// All accepted URLs across the run.
    pub fn accepted_urls(&self) -> Vec<&str> {
        self.reports.iter().flat_map(|r| r.accepted_urls()).collect()
    }
}

/// Finds papers pages for subjects and records them in the catalogue.
pub struct DiscoveryPipeline<W, F, S, B>
where
    W: WebSearcher,
    F: PageFetcher,
    S: CatalogueStore,
    B: BibliographySource,
{
    searcher: W,
    fetcher: F,
    store: Arc<S>,
    matcher: PublicationMatcher<B>,
    scorer: Box<dyn PageScorer>,
    filter: UrlFilter,
    queries: QueryBuilder,
    rate: RateController,
    resolver: DuplicateResolver,
    rng: StdRng,
    strategy: Option<QueryStrategy>,
    config: FinderConfig,
}

impl<W, F, S, B> DiscoveryPipeline<W, F, S, B>
where
    W: WebSearcher,
    F: PageFetcher,
    S: CatalogueStore,
    B: BibliographySource,
{
    /// Create a pipeline with the heuristic scorer, the built-in URL
    /// blacklist (plus `config.extra_blacklist`) and an OS-seeded RNG.
    pub fn new(
        searcher: W,
        fetcher: F,
        store: Arc<S>,
        bibliography: B,
        rate: RateController,
        config: FinderConfig,
    ) -> Self {
        let filter = UrlFilter::new()
            .with_max_len(config.max_url_len)
            .with_parts(config.extra_blacklist.iter().cloned());

        Self {
            searcher,
            fetcher,
            store,
            matcher: PublicationMatcher::new(bibliography),
            scorer: Box::new(HeuristicScorer::new()),
            filter,
            queries: QueryBuilder::new(config.field_term.clone()),
            rate,
            resolver: DuplicateResolver::new(),
            rng: StdRng::from_os_rng(),
            strategy: None,
            config,
        }
    }

    /// Use a different page scorer.
    pub fn with_scorer(mut self, scorer: impl PageScorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    /// Replace the URL filter.
    pub fn with_filter(mut self, filter: UrlFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Seed the RNG for reproducible queries.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Always use this query strategy instead of picking one at random.
    pub fn with_strategy(mut self, strategy: QueryStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn searcher(&self) -> &W {
        &self.searcher
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Run one discovery attempt for `name`.
    ///
    /// With `dry_run` the catalogue is only read: accepted pages come back
    /// as `WouldInsert`/`WouldOverwrite` and `last_searched` stays as it is.
    pub async fn discover(&mut self, name: &str, dry_run: bool) -> Result<Discovery> {
        if let Gate::Blocked { retry_after } = self.rate.check().await? {
            info!(subject = %name, retry_after_secs = retry_after.as_secs(), "circuit breaker active, skipping");
            return Ok(Discovery::Skipped { retry_after });
        }

        let publications = self
            .matcher
            .get_publications(name, !self.config.lenient_publications)
            .await;
        let known_titles = titles(&publications);

        let query = match self.strategy {
            Some(strategy) => {
                self.queries
                    .build_with_strategy(&mut self.rng, name, &known_titles, strategy)
            }
            None => self.queries.build(&mut self.rng, name, &known_titles),
        };

        if let Gate::Blocked { retry_after } = self.rate.before_attempt(&mut self.rng).await? {
            return Ok(Discovery::Skipped { retry_after });
        }

        info!(subject = %name, query = %query, "searching");
        let hits = match self
            .searcher
            .search_with_limit(&query, self.config.search_result_limit)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                self.rate.record_blocked(e.to_string()).await?;
                return Err(DiscoveryError::ProviderBlocked { source: e });
            }
        };

        let mut report = DiscoveryReport::new(name, query);
        let mut seen = HashSet::new();

        for hit in hits {
            let Some(url) = normalize_url(&hit.url) else {
                debug!(url = %hit.url, "unusable URL");
                report.record(hit.url, SourceDisposition::BadUrl);
                continue;
            };

            let disposition = if !seen.insert(url.clone()) {
                SourceDisposition::AlreadyKnown
            } else {
                self.process_url(name, &url, &known_titles, dry_run).await?
            };
            report.record(url, disposition);
        }

        if !dry_run {
            self.store.touch_subject(name).await?;
        }

        info!(
            subject = %name,
            candidates = report.outcomes.len(),
            accepted = report.accepted_urls().len(),
            "discovery finished"
        );
        Ok(Discovery::Completed(report))
    }

    async fn process_url(
        &self,
        name: &str,
        url: &str,
        known_titles: &[String],
        dry_run: bool,
    ) -> Result<SourceDisposition> {
        if self.filter.is_bad(url) {
            debug!(url = %url, "bad URL");
            return Ok(SourceDisposition::BadUrl);
        }

        if self.store.url_known(url).await? {
            debug!(url = %url, "already known");
            return Ok(SourceDisposition::AlreadyKnown);
        }

        self.rate.before_fetch().await;
        let page = match self.fetcher.fetch(url).await {
            Ok(page) => page,
            Err(e) => {
                warn!(url = %url, error = %e, "fetch failed");
                return Ok(SourceDisposition::FetchFailed {
                    reason: e.to_string(),
                });
            }
        };
        if !page.is_ok() {
            warn!(url = %url, status = page.status, "fetch failed");
            return Ok(SourceDisposition::FetchFailed {
                reason: format!("status {}", page.status),
            });
        }

        let score = self.scorer.score(&page.body, name, known_titles);
        let candidate = ScoredSource::new(url, name, page.body, score);
        if !candidate.is_accepted(self.config.accept_threshold) {
            debug!(url = %url, score, "not a papers page");
            return Ok(SourceDisposition::LowScore {
                score: candidate.score,
            });
        }

        if dry_run {
            let disposition = match self.resolver.resolve(self.store.as_ref(), &candidate).await? {
                Resolution::Insert => SourceDisposition::WouldInsert {
                    score: candidate.score,
                },
                Resolution::Overwrite(entry) => SourceDisposition::WouldOverwrite {
                    entry_id: entry.id,
                    previous_url: entry.url,
                    score: candidate.score,
                },
            };
            info!(url = %url, score, "papers page (dry run)");
            return Ok(disposition);
        }

        self.resolver.apply(self.store.as_ref(), &candidate).await
    }

    /// Process explicit names, or the least recently searched subjects.
    ///
    /// Stops early, without error, when the circuit breaker is active.
    pub async fn run(&mut self, names: Option<Vec<String>>, dry_run: bool) -> Result<RunOutcome> {
        let names = match names {
            Some(names) => names,
            None => self
                .store
                .stale_subjects(self.config.subjects_per_run)
                .await?
                .into_iter()
                .map(|s| s.name)
                .collect(),
        };

        let mut outcome = RunOutcome::default();
        for name in names {
            match self.discover(&name, dry_run).await? {
                Discovery::Completed(report) => outcome.reports.push(report),
                Discovery::Skipped { retry_after } => {
                    outcome.skipped = Some(retry_after);
                    break;
                }
            }
        }
        Ok(outcome)
    }
}
