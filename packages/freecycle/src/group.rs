//! Post collection across a group's paginated listing.

use std::marker::PhantomData;
use std::time::Duration;

use futures::StreamExt;
use tokio::time::Instant;

use crate::error::Error;
use crate::model::{Category, Post};
use crate::page::{self, HttpSource, MAX_PAGE_SIZE, PageSource};
use crate::parse::{DomRowResolver, RowResolver};

/// Ten most recent posts, matching the remote's default listing depth.
pub const DEFAULT_RESULTS: u32 = 10;

/// Tuning for a [`Group`]'s fetch behavior.
#[derive(Debug, Clone)]
pub struct GroupOptions {
    /// Rows requested per page, clamped to 1..=[`MAX_PAGE_SIZE`].
    pub page_size: u32,
    /// Bound on concurrently in-flight page fetches.
    pub concurrency: usize,
    /// Overall deadline for one collect call. Once it passes, no further
    /// pages are requested and the posts gathered so far are returned.
    pub timeout: Option<Duration>,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            concurrency: 4,
            timeout: None,
        }
    }
}

/// Handle on one group's posts listing.
pub struct Group<S: PageSource = HttpSource, R: RowResolver = DomRowResolver> {
    id: String,
    source: S,
    options: GroupOptions,
    _resolver: PhantomData<R>,
}

impl Group {
    /// Group handle using the live HTTP transport and default options.
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_source(id, HttpSource::new(), GroupOptions::default())
    }

    /// Group handle using the live HTTP transport.
    pub fn with_options(id: impl Into<String>, options: GroupOptions) -> Self {
        Self::with_source(id, HttpSource::new(), options)
    }
}

impl<S: PageSource, R: RowResolver> Group<S, R> {
    pub fn with_source(id: impl Into<String>, source: S, options: GroupOptions) -> Self {
        let options = GroupOptions {
            page_size: options.page_size.clamp(1, MAX_PAGE_SIZE),
            ..options
        };
        Self {
            id: id.into(),
            source,
            options,
            _resolver: PhantomData,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Ten most recent posts of any category.
    pub async fn posts(&self) -> Result<Vec<Post>, Error> {
        self.posts_limit(Category::All, DEFAULT_RESULTS).await
    }

    /// Ten most recent posts matching `category`.
    pub async fn posts_by(&self, category: Category) -> Result<Vec<Post>, Error> {
        self.posts_limit(category, DEFAULT_RESULTS).await
    }

    /// Up to `max_results` most recent posts matching `category`.
    ///
    /// Requests larger than one page paginate at the remote's page-size
    /// ceiling instead of asking for an oversized page. Rows that fail to
    /// parse and non-first pages that fail to fetch reduce the result set
    /// rather than failing the call; a failure on the first page propagates.
    pub async fn posts_limit(
        &self,
        category: Category,
        max_results: u32,
    ) -> Result<Vec<Post>, Error> {
        if max_results == 0 {
            return Ok(vec![]);
        }

        let per_page = max_results.min(self.options.page_size);
        let deadline = self.options.timeout.map(|timeout| Instant::now() + timeout);

        if max_results <= per_page {
            // One page suffices, nothing to plan.
            return self
                .collect_sequential(category, max_results, per_page, deadline)
                .await;
        }

        match page::fetch_result_count(&self.source, &self.id, category).await {
            Ok(total) => {
                self.collect_parallel(category, max_results, per_page, total, deadline)
                    .await
            }
            Err(Error::Structure { message, .. }) => {
                tracing::info!(reason = %message, "result count unavailable, paginating on demand");
                self.collect_sequential(category, max_results, per_page, deadline)
                    .await
            }
            Err(err) => Err(err),
        }
    }

    /// Best-effort total number of posts matching `category`, as advertised
    /// by the listing's summary counter.
    pub async fn result_count(&self, category: Category) -> Result<u64, Error> {
        page::fetch_result_count(&self.source, &self.id, category).await
    }

    /// Known-total strategy: fan page fetches out over a bounded ordered
    /// stream. Completion order of the network calls is unspecified, but the
    /// stream yields pages in page-number order, so the merge is inherent.
    async fn collect_parallel(
        &self,
        category: Category,
        max_results: u32,
        per_page: u32,
        total: u64,
        deadline: Option<Instant>,
    ) -> Result<Vec<Post>, Error> {
        let wanted = u64::from(max_results).min(total);
        let pages = page::pages_needed(wanted, per_page);
        tracing::info!(total, pages, "collecting with known total");

        let mut fetches = futures::stream::iter(1..=pages)
            .map(|number| async move {
                (
                    number,
                    page::fetch_rows(&self.source, &self.id, category, number, per_page).await,
                )
            })
            .buffered(self.options.concurrency.max(1));

        let mut posts = Vec::new();
        loop {
            let next = match deadline {
                Some(deadline) => tokio::select! {
                    biased;
                    _ = tokio::time::sleep_until(deadline) => {
                        tracing::warn!("deadline passed, returning posts gathered so far");
                        break;
                    }
                    next = fetches.next() => next,
                },
                None => fetches.next().await,
            };
            let Some((number, outcome)) = next else { break };
            match outcome {
                Ok(Some(rows)) => posts.extend(parse_rows::<R>(&rows)),
                // No table this far in: past the last page.
                Ok(None) => break,
                Err(err) if number == 1 => return Err(err),
                Err(err) => {
                    tracing::warn!(page = number, error = %err, "dropping failed page")
                }
            }
        }
        posts.truncate(max_results as usize);
        Ok(posts)
    }

    /// Unknown-total strategy: walk pages 1, 2, 3… until the limit is
    /// reached or the listing runs out. Strictly sequential, since each
    /// page's outcome decides whether another fetch is issued.
    async fn collect_sequential(
        &self,
        category: Category,
        max_results: u32,
        per_page: u32,
        deadline: Option<Instant>,
    ) -> Result<Vec<Post>, Error> {
        let mut posts: Vec<Post> = Vec::new();
        let mut number = 1;
        loop {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                tracing::warn!(page = number, "deadline passed, returning posts gathered so far");
                break;
            }
            match page::fetch_rows(&self.source, &self.id, category, number, per_page).await {
                Ok(Some(rows)) => {
                    let short_page = rows.len() < per_page as usize;
                    posts.extend(parse_rows::<R>(&rows));
                    if posts.len() >= max_results as usize {
                        break;
                    }
                    if short_page {
                        // The remote served fewer rows than asked for: last
                        // page, even if it silently capped our page size.
                        tracing::info!(page = number, "short page, assuming end of results");
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) if number == 1 => return Err(err),
                Err(err) => {
                    tracing::warn!(page = number, error = %err, "stopping pagination after transport failure");
                    break;
                }
            }
            number += 1;
        }
        posts.truncate(max_results as usize);
        Ok(posts)
    }
}

fn parse_rows<R: RowResolver>(rows: &[String]) -> Vec<Post> {
    rows.iter()
        .filter_map(|row| {
            R::resolve(row)
                .inspect_err(|err| tracing::warn!(error = %err, "dropping unparsable row"))
                .ok()
        })
        .collect()
}
