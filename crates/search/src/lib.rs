mod error;
mod query;
mod rewrite;
mod suggest;

pub use error::{Result, SearchError};
pub use query::{Entry, MappingView, QueryEngine};
pub use rewrite::{escape_for_code_block, TextRewriter};
pub use suggest::{suggest, SUGGESTION_LIMIT};
