const ELLIPSIS: &str = "...";

/// Fit `title` into `limit` characters, marking truncation with `...`.
///
/// # Panics
///
/// Panics when the title must be truncated and `limit < 3`: there is no
/// room for the ellipsis. Configuration loading rejects such limits.
pub fn clamp_title(title: &str, limit: usize) -> String {
    if title.chars().count() <= limit {
        return title.to_string();
    }

    assert!(
        limit >= ELLIPSIS.len(),
        "title limit {limit} is smaller than the truncation marker"
    );

    let mut out: String = title.chars().take(limit - ELLIPSIS.len()).collect();
    out.push_str(ELLIPSIS);
    out
}
