use crate::feed::Item;

/// Decide whether an item is dropped before storage
///
/// The title is lower-cased and searched for each keyword as a substring;
/// categories must contain the keyword exactly, case included. Keywords are
/// used as configured, so write them in lower case to match titles. Empty
/// keywords are ignored.
pub fn should_skip(item: &Item, keywords: &[String]) -> bool {
    let title = item.title.to_lowercase();

    keywords
        .iter()
        .filter(|keyword| !keyword.is_empty())
        .any(|keyword| {
            title.contains(keyword.as_str()) || item.categories.iter().any(|c| c == keyword)
        })
}
