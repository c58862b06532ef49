use crate::types::ArticleRecord;

/// True iff every required field is present and non-blank.
pub fn is_valid(record: &ArticleRecord) -> bool {
    !record.title.trim().is_empty()
        && !record.url.trim().is_empty()
        && !record.content.trim().is_empty()
        && record.published_at.is_some()
}
