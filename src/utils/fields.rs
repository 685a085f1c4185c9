/// Returns the value of a required request field, or None when it is absent,
/// null or empty.
pub fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

/// Like [`present`], but trims surrounding whitespace first.
pub fn present_trimmed(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|value| !value.is_empty())
}
