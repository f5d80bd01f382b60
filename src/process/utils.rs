use regex::Regex;

/// Cell spellings that mean "no value", besides the empty cell.
/// These are the tokens the upstream exports write for missing readings.
pub const NA_TOKENS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// True for index columns left behind by earlier exports (`Unnamed: 0`, or a blank header).
pub fn is_unnamed(name: &str) -> bool {
    let name = name.trim();
    name.is_empty() || name.starts_with("Unnamed")
}

/// True when a raw cell is missing: empty, or one of [`NA_TOKENS`].
pub fn is_na_token(cell: &str) -> bool {
    cell.is_empty() || NA_TOKENS.contains(&cell)
}

/// Whole-cell regex matching exactly what [`is_na_token`] accepts.
pub fn na_regex() -> Result<Regex, regex::Error> {
    let alternatives: Vec<String> = NA_TOKENS.iter().map(|t| regex::escape(t)).collect();
    Regex::new(&format!("^(?:{})?$", alternatives.join("|")))
}
