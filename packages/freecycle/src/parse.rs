//! Turns one raw `<tr>` fragment from a group posts table into a [`Post`].
//!
//! The remote has served two observable row layouts over time, so all
//! fixed-offset knowledge about the markup lives behind [`RowResolver`],
//! one implementation per layout. Everything else in the crate only sees
//! `row html in, Post out`.

use std::sync::LazyLock;

use scraper::{Element, ElementRef, Html, Selector};
use thiserror::Error;
use time::{PrimitiveDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::model::{Post, PostKind};

static CELL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("Failed to parse cell selector"));

/// Fixed English date rendering used by the posts table,
/// e.g. `Thu Jul 24 18:30:02 2025`.
const DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!(
    "[weekday repr:short] [month repr:short] [day] [hour]:[minute]:[second] [year]"
);

/// Why a single row yielded no [`Post`].
///
/// A `RowError` is always confined to its row; the surrounding page keeps
/// processing.
#[derive(Debug, Error)]
pub enum RowError {
    #[error("expected 2 cells in row, found {0}")]
    CellCount(usize),
    #[error("category element missing from summary cell")]
    CategoryMissing,
    #[error("summary cell has too few fields: {0:?}")]
    FieldCount(String),
    #[error("post id not in (#<digits>) form: {0:?}")]
    Id(String),
    #[error("title missing or empty")]
    Title,
    #[error("unparsable post date {text:?}: {source}")]
    Date {
        text: String,
        source: time::error::Parse,
    },
}

/// Strategy seam over the remote's row layouts.
pub trait RowResolver {
    fn resolve(row_html: &str) -> Result<Post, RowError>;
}

/// Resolver for the current layout: the category sits in a nested element at
/// the head of the summary cell, date and id are the cell's own text.
pub struct DomRowResolver;

impl RowResolver for DomRowResolver {
    fn resolve(row_html: &str) -> Result<Post, RowError> {
        let fragment = parse_row_fragment(row_html);
        let (summary, details) = cells(&fragment)?;

        let kind_token = summary
            .first_element_child()
            .ok_or(RowError::CategoryMissing)?
            .text()
            .collect::<String>();

        // Own text reads `<date> (#<id>)`; the id token never contains
        // spaces, so the last space splits the two fields.
        let text = own_text(summary);
        let (date_text, id_token) = text
            .rsplit_once(' ')
            .ok_or_else(|| RowError::FieldCount(text.clone()))?;

        build_post(kind_token.trim(), date_text, id_token, details)
    }
}

/// Resolver for the older layout where the summary cell flattens to a single
/// whitespace-joined phrase: category, five date fields, `(#<id>)`.
pub struct TokenRowResolver;

impl RowResolver for TokenRowResolver {
    fn resolve(row_html: &str) -> Result<Post, RowError> {
        let fragment = parse_row_fragment(row_html);
        let (summary, details) = cells(&fragment)?;

        let text = summary.text().collect::<String>();
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.len() < 7 {
            return Err(RowError::FieldCount(text.trim().to_string()));
        }

        let date_text = tokens[1..6].join(" ");
        build_post(tokens[0], &date_text, tokens[tokens.len() - 1], details)
    }
}

fn parse_row_fragment(row_html: &str) -> Html {
    // A bare <tr> is discarded by the fragment parser outside of a table
    // context, so the row is re-rooted before parsing.
    Html::parse_fragment(&format!("<table>{row_html}</table>"))
}

fn cells(fragment: &Html) -> Result<(ElementRef<'_>, ElementRef<'_>), RowError> {
    let cells: Vec<_> = fragment.select(&CELL_SELECTOR).collect();
    match cells[..] {
        [summary, details, ..] => Ok((summary, details)),
        _ => Err(RowError::CellCount(cells.len())),
    }
}

/// Text nodes sitting directly under `element`, without descendant text.
fn own_text(element: ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|node| node.value().as_text().map(|text| &**text))
        .collect::<String>()
        .trim()
        .to_string()
}

fn build_post(
    kind_token: &str,
    date_text: &str,
    id_token: &str,
    details: ElementRef<'_>,
) -> Result<Post, RowError> {
    // The remote only ever labels offers explicitly; every other token is a
    // want. This asymmetry is the real mapping rule, not an allowlist.
    let kind = if kind_token == "OFFER" {
        PostKind::Offer
    } else {
        PostKind::Wanted
    };

    let id = id_token
        .strip_prefix("(#")
        .and_then(|token| token.strip_suffix(')'))
        .and_then(|digits| digits.parse::<u64>().ok())
        .ok_or_else(|| RowError::Id(id_token.to_string()))?;

    let posted_at = PrimitiveDateTime::parse(date_text, DATE_FORMAT)
        .map_err(|source| RowError::Date {
            text: date_text.to_string(),
            source,
        })?
        .assume_utc();

    let title = details
        .first_element_child()
        .ok_or(RowError::Title)?
        .text()
        .collect::<String>()
        .trim()
        .to_string();
    if title.is_empty() {
        return Err(RowError::Title);
    }

    let location = strip_parens(&own_text(details));

    Ok(Post {
        kind,
        posted_at,
        title,
        location,
        id,
    })
}

fn strip_parens(text: &str) -> String {
    text.strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .unwrap_or(text)
        .to_string()
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn row(kind: &str, date: &str, id: &str, title: &str, location: &str) -> String {
        format!(
            "<tr><td><a class=\"post_type\"><b>{kind}</b></a> {date} (#{id})</td>\
             <td><a href=\"/posts/{id}\">{title}</a> ({location})</td></tr>"
        )
    }

    #[test]
    fn offer_row_round_trips() {
        let html = row("OFFER", "Thu Jul 24 18:30:02 2025", "42", "Chair", "Town");
        let post = DomRowResolver::resolve(&html).unwrap();
        assert_eq!(post.kind, PostKind::Offer);
        assert_eq!(post.id, 42);
        assert_eq!(post.title, "Chair");
        assert_eq!(post.location, "Town");
        assert_eq!(post.posted_at, datetime!(2025-07-24 18:30:02 UTC));
    }

    #[test]
    fn token_resolver_reads_flattened_summary_cell() {
        let html = row("WANTED", "Fri Jul 25 09:01:15 2025", "77", "Bike", "Old Town");
        let post = TokenRowResolver::resolve(&html).unwrap();
        assert_eq!(post.kind, PostKind::Wanted);
        assert_eq!(post.id, 77);
        assert_eq!(post.title, "Bike");
        assert_eq!(post.location, "Old Town");
        assert_eq!(post.posted_at, datetime!(2025-07-25 09:01:15 UTC));
    }

    #[test]
    fn any_non_offer_token_maps_to_wanted() {
        for token in ["WANTED", "BORROW", "garbage"] {
            let html = row(token, "Thu Jul 24 18:30:02 2025", "7", "Lamp", "Town");
            let post = DomRowResolver::resolve(&html).unwrap();
            assert_eq!(post.kind, PostKind::Wanted, "token {token:?}");
            let post = TokenRowResolver::resolve(&html).unwrap();
            assert_eq!(post.kind, PostKind::Wanted, "token {token:?}");
        }
    }

    #[test]
    fn non_numeric_id_fails_the_row() {
        let html = row("OFFER", "Thu Jul 24 18:30:02 2025", "x42", "Chair", "Town");
        assert!(matches!(
            DomRowResolver::resolve(&html),
            Err(RowError::Id(_))
        ));
    }

    #[test]
    fn unparsable_date_drops_the_row() {
        let html = row("OFFER", "Thu Smarch 99 18:30:02 2025", "42", "Chair", "Town");
        assert!(matches!(
            DomRowResolver::resolve(&html),
            Err(RowError::Date { .. })
        ));
    }

    #[test]
    fn row_with_one_cell_is_a_structural_failure() {
        let html = "<tr><td>OFFER Thu Jul 24 18:30:02 2025 (#42)</td></tr>";
        assert!(matches!(
            DomRowResolver::resolve(html),
            Err(RowError::CellCount(1))
        ));
    }

    #[test]
    fn empty_title_fails_the_row() {
        let html = row("OFFER", "Thu Jul 24 18:30:02 2025", "42", " ", "Town");
        assert!(matches!(DomRowResolver::resolve(&html), Err(RowError::Title)));
    }

    #[test]
    fn location_keeps_inner_parentheses() {
        let html = row("OFFER", "Thu Jul 24 18:30:02 2025", "42", "Chair", "Town (north)");
        let post = DomRowResolver::resolve(&html).unwrap();
        assert_eq!(post.location, "Town (north)");
    }
}
