//! Page-level access to a group's posts listing.

use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::error::Error;
use crate::model::Category;

/// Largest `resultsperpage` value the remote accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

static TABLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("#group_posts_table").expect("Failed to parse posts table selector")
});

static ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("Failed to parse row selector"));

static COUNT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("#post_counts").expect("Failed to parse post count selector")
});

/// Abstract transport capability: fetch the markup body at `url`.
pub trait PageSource {
    fn fetch_document(
        &self,
        url: &str,
    ) -> impl std::future::Future<Output = Result<String, Error>> + Send;
}

/// Live [`PageSource`] backed by a shared reqwest client.
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .build()
                .expect("Failed to build HTTP client"),
        }
    }
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PageSource for HttpSource {
    async fn fetch_document(&self, url: &str) -> Result<String, Error> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::transport(url, &e))?
            .error_for_status()
            .map_err(|e| Error::transport(url, &e))?;
        response.text().await.map_err(|e| Error::transport(url, &e))
    }
}

/// Builds a group posts listing URL.
///
/// The shape is load-bearing: the remote routes on the lowercased category
/// path segment and the 1-based `page`/`resultsperpage` query pair.
pub fn posts_url(group_id: &str, category: Category, page: u32, per_page: u32) -> String {
    format!(
        "http://groups.freecycle.org/group/{group_id}/posts/{}?page={page}&resultsperpage={per_page}",
        category.path_segment()
    )
}

/// Number of pages needed to cover `total` results at `page_size` per page.
///
/// Zero results plan zero pages, so a known-empty listing costs no fetch.
pub fn pages_needed(total: u64, page_size: u32) -> u32 {
    total.div_ceil(u64::from(page_size.max(1))) as u32
}

/// Fetches one listing page and extracts its raw rows in source order.
///
/// `Ok(None)` means the results table is absent from the response, which
/// callers interpret as the end of pagination rather than a failure.
pub(crate) async fn fetch_rows<S: PageSource>(
    source: &S,
    group_id: &str,
    category: Category,
    page: u32,
    per_page: u32,
) -> Result<Option<Vec<String>>, Error> {
    let url = posts_url(group_id, category, page, per_page);
    tracing::debug!(%url, "fetching posts page");
    let html = source.fetch_document(&url).await?;
    let document = Html::parse_document(&html);
    let Some(table) = document.select(&TABLE_SELECTOR).next() else {
        return Ok(None);
    };
    Ok(Some(
        table.select(&ROW_SELECTOR).map(|row| row.html()).collect(),
    ))
}

/// Probes page 1 for the summary counter and returns the advertised total.
pub(crate) async fn fetch_result_count<S: PageSource>(
    source: &S,
    group_id: &str,
    category: Category,
) -> Result<u64, Error> {
    let url = posts_url(group_id, category, 1, 1);
    tracing::debug!(%url, "probing result count");
    let html = source.fetch_document(&url).await?;
    read_result_count(&Html::parse_document(&html), &url)
}

/// Reads the total out of the counter element, e.g.
/// `Showing 1 to 10 of 372 posts` yields 372.
fn read_result_count(document: &Html, url: &str) -> Result<u64, Error> {
    let counter = document
        .select(&COUNT_SELECTOR)
        .next()
        .ok_or_else(|| Error::structure(url, "post count element missing"))?;
    let text = counter.text().collect::<String>();
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .next_back()
        .and_then(|run| run.parse().ok())
        .ok_or_else(|| Error::structure(url, format!("no count in {text:?}")))
}
