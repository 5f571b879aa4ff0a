/// Maximum number of completions returned for one needle.
pub const SUGGESTION_LIMIT: usize = 25;

/// Keys containing `needle`, ignoring case, in iteration order.
///
/// An empty needle yields nothing.
pub fn suggest<'a, I>(keys: I, needle: &str, limit: usize) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a String>,
{
    if needle.is_empty() {
        return Vec::new();
    }

    let needle = needle.to_lowercase();
    keys.into_iter()
        .filter(|key| key.to_lowercase().contains(&needle))
        .map(String::as_str)
        .take(limit)
        .collect()
}
