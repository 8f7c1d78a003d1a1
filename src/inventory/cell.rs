use crate::error::RowError;

pub fn split_cell(raw: &str, delimiter: char) -> Vec<String> {
    raw.split(delimiter)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

pub fn split_bracketed_cell(
    column: &str,
    raw: &str,
    open: char,
    close: char,
    delimiter: char,
) -> Result<Vec<String>, RowError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let inner = trimmed
        .strip_prefix(open)
        .and_then(|rest| rest.strip_suffix(close))
        .ok_or_else(|| RowError::MalformedCell {
            column: column.to_string(),
            value: raw.to_string(),
            reason: format!("expected the list to be wrapped in {open}{close}"),
        })?;

    Ok(split_cell(inner, delimiter))
}
