mod read;
mod types;
mod write;

/// Column list shared by every post query, in `PostRow` order.
pub(crate) const POST_COLUMNS: &str =
    "id, title, content, datetime, draft, tags, created_at, modified_at";

/// Document searched by full-text queries.
pub(crate) const SEARCH_DOCUMENT: &str =
    "to_tsvector('english', title || ' ' || content || ' ' || array_to_string(tags, ' '))";
