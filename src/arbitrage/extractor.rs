//! Best-odds extraction from market odds tables.

use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::error::ParseError;
use crate::page::{Page, PageElement};

/// Classes of one outcome row in the odds table.
pub const ROW_CLASSES: &str = "diff-row evTabRow bc";
/// Classes of the bet-basket marker naming a row's selection.
pub const SELECTION_CLASSES: &str = "beta-sprite add-to-bet-basket";
/// Attribute of the bet-basket marker holding the selection name.
pub const SELECTION_ATTR: &str = "data-name";
/// Class of the table header row naming bookmaker columns.
pub const HEADER_CLASS: &str = "eventTableHeader";
/// Class of a closed bookmaker column.
pub const CLOSED_COLUMN_CLASS: &str = "wo-col";
/// Class of a non-participating cell.
pub const NOT_PARTICIPATING_CLASS: &str = "np";
/// Decimal odds attribute.
pub const DECIMAL_ODDS_ATTR: &str = "data-odig";
/// Raw odds attribute.
pub const RAW_ODDS_ATTR: &str = "data-o";

/// Best price found for one outcome row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutcomeQuote {
    /// Selection name (empty when the row has no bet-basket marker).
    pub selection: String,
    /// Best decimal odds seen; zero when no cell was eligible.
    pub best_odds: Decimal,
    /// Column index of the cell holding `best_odds`.
    pub best_index: Option<usize>,
    /// Bookmaker offering `best_odds`, resolved from the table header.
    pub bookmaker: Option<String>,
}

impl OutcomeQuote {
    /// Whether an eligible price was found for this outcome.
    pub fn has_price(&self) -> bool {
        self.best_odds > Decimal::ZERO
    }
}

/// Scan every outcome row of a market page.
#[instrument(skip(page), fields(page = %page.name))]
pub fn extract_quotes(page: &Page) -> Result<Vec<OutcomeQuote>, ParseError> {
    let quotes = page
        .find_by_class(ROW_CLASSES)
        .into_iter()
        .map(scan_row)
        .collect::<Result<Vec<_>, _>>()?;

    debug!(rows = quotes.len(), "Odds table scanned");
    Ok(quotes)
}

/// Scan one row's cells left to right, keeping the strictly highest price.
pub fn scan_row(row: &PageElement) -> Result<OutcomeQuote, ParseError> {
    let mut quote = OutcomeQuote::default();

    for (index, cell) in row.children().iter().enumerate() {
        if quote.selection.is_empty() {
            if let Some(name) = selection_name(cell) {
                quote.selection = name.to_string();
            }
        }

        if cell.has_class(CLOSED_COLUMN_CLASS) {
            break;
        }

        let Some(raw) = eligible_odds(cell) else {
            continue;
        };

        let odds = parse_odds(raw)?;
        if odds > quote.best_odds {
            quote.best_odds = odds;
            quote.best_index = Some(index);
        }
    }

    Ok(quote)
}

/// Selection named by a cell's single bet-basket marker.
fn selection_name(cell: &PageElement) -> Option<&str> {
    match cell.find_by_class(SELECTION_CLASSES).as_slice() {
        [marker] => marker.attr(SELECTION_ATTR),
        _ => None,
    }
}

/// Decimal odds text of a cell that quotes a live price.
fn eligible_odds(cell: &PageElement) -> Option<&str> {
    let decimal = cell.attr(DECIMAL_ODDS_ATTR)?;
    let raw = cell.attr(RAW_ODDS_ATTR)?;
    if raw.is_empty() || cell.has_class(NOT_PARTICIPATING_CLASS) {
        return None;
    }
    Some(decimal)
}

fn parse_odds(raw: &str) -> Result<Decimal, ParseError> {
    Decimal::from_str(raw.trim()).map_err(|_| ParseError::InvalidOdds {
        value: raw.to_string(),
    })
}

/// Resolve the bookmaker for each quote from the header row.
///
/// Header column `best_index` names the bookmaker through the first `title`
/// attribute in its subtree. Quotes whose column cannot be resolved keep
/// `None`.
pub fn resolve_bookmakers(page: &Page, quotes: &mut [OutcomeQuote]) {
    let header = page.first_by_class(HEADER_CLASS);
    for quote in quotes.iter_mut() {
        quote.bookmaker = header
            .zip(quote.best_index)
            .and_then(|(header, index)| header.children().get(index))
            .and_then(|column| column.descendants_and_self().find_map(|e| e.attr("title")))
            .map(str::to_string);
    }
}
