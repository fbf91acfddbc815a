//! Shared utility functions.

/// Truncate a string to approximately `max_bytes` without splitting a UTF-8
/// character boundary.
///
/// Returns a sub-slice of the original string. If the string is shorter than
/// `max_bytes`, the entire string is returned unchanged.
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Normalize a user- or detector-supplied tool name into a lookup key.
///
/// Lowercases and maps `_` and whitespace to `-` so that `Semantic_Kernel`,
/// `semantic kernel` and `semantic-kernel` all resolve to the same key.
pub fn normalize_key(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c == '_' || c.is_whitespace() {
                '-'
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

/// Extract `(owner, repo)` from a GitHub URL or `owner/repo` shorthand
pub fn parse_github_repository(url: &str) -> Option<(String, String)> {
    let trimmed = url.trim().trim_end_matches('/');
    let path = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let path = path
        .strip_prefix("www.")
        .unwrap_or(path)
        .strip_prefix("github.com/")
        .unwrap_or(path);

    let mut parts = path.split('/');
    let owner = parts.next()?.trim();
    let repo = parts.next()?.trim().trim_end_matches(".git");
    let valid = |s: &str| {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };
    // GitHub owners never contain dots; this also rejects other hosts
    if !valid(owner) || !valid(repo) || owner.contains('.') {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}
