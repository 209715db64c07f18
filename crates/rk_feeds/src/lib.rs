pub mod reader;
pub mod select;

pub use reader::{parse_entries, FeedReader};
pub use select::{cutoff, select_entries};

pub mod prelude {
    pub use super::reader::FeedReader;
    pub use super::select::select_entries;
    pub use rk_core::{FeedEntry, FeedFetchError, FeedSource, FeedSourceReader};
}
