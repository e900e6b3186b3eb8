use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("tax identifier is empty")]
    Empty,
}

/// Normalizes a tax identifier (NIT) for comparison: keeps what precedes the
/// first `-` (the check digit goes) and drops every `.`.
///
/// ```rust
/// use review::identifier::normalize;
///
/// assert_eq!(normalize("900.123.456-1").unwrap(), "900123456");
/// ```
pub fn normalize(raw: &str) -> Result<String, IdentifierError> {
    if raw.trim().is_empty() {
        return Err(IdentifierError::Empty);
    }
    let head = raw.split('-').next().unwrap_or(raw);
    Ok(head.replace('.', ""))
}

/// Total version of [`normalize`]: empty input comes back unchanged.
pub fn normalize_lenient(raw: &str) -> String {
    normalize(raw).unwrap_or_else(|_| raw.to_string())
}
