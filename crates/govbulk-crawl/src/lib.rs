//! Recursive traversal of bulk-data listing pages.
//!
//! A listing is an HTML page whose `#bulkdata` table holds one link per row.
//! Links whose path has no extension are sub-listings; everything else is a
//! file and ends up in the [`Frontier`].
//!
//! ```ignore
//! let crawler = Crawler::new(client, Gate::new(16), base);
//! let report = crawler.crawl(root).await;
//! for file in report.frontier.iter() {
//!     println!("{}", file.url);
//! }
//! ```

mod crawler;
mod frontier;
mod link;
mod listing;

pub use crawler::{CrawlReport, Crawler};
pub use frontier::Frontier;
pub use link::{Link, classify_link, extension};
pub use listing::{PARENT_DIRECTORY, parse_listing};
