use scraper::{ElementRef, Html, Selector};

/// Row text of the link back up the hierarchy.
pub const PARENT_DIRECTORY: &str = "Parent Directory";

const ROW_CELLS: &str = "#bulkdata td";

/// Extracts the row links of a listing page, in document order.
///
/// Cells reading [`PARENT_DIRECTORY`] are skipped, as are cells whose first
/// anchor is missing or has no `href`.
pub fn parse_listing(html: &str) -> Vec<String> {
    let Ok(cells) = Selector::parse(ROW_CELLS) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    document
        .select(&cells)
        .filter(|cell| cell.text().collect::<String>().trim() != PARENT_DIRECTORY)
        .filter_map(first_anchor_href)
        .collect()
}

fn first_anchor_href(cell: ElementRef<'_>) -> Option<String> {
    cell.children()
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name() == "a")
        .and_then(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string)
}
