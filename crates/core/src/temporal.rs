#![forbid(unsafe_code)]

/// Anything scoped to "valid from chapter N onward".
pub trait Chronological {
    fn valid_from_chapter(&self) -> i64;
}

/// Latest item whose `valid_from_chapter` is not after `current_chapter`.
///
/// Items with a later chapter are never returned, which is what keeps a
/// reader from seeing content of chapters they have not reached. Input order
/// does not matter.
pub fn resolve_at<T: Chronological>(items: &[T], current_chapter: i64) -> Option<&T> {
    items
        .iter()
        .filter(|item| item.valid_from_chapter() <= current_chapter)
        .max_by_key(|item| item.valid_from_chapter())
}
