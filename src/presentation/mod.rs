//! Table view over the published snapshot

pub mod render;
pub mod table;

pub use render::{format_price, format_volume, render_html, render_text};
pub use table::{Filter, SortKey, SortOrder, TableQuery};
