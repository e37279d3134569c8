use std::str::FromStr;

use crate::validation::ConfigWarnings;

pub fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|part| {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

pub fn parse_csv_var(name: &str) -> Option<Vec<String>> {
    std::env::var(name).ok().map(|raw| parse_csv(&raw))
}

/// Parse `raw` for variable `name`, falling back to `default` with a
/// warning when the value does not parse.
pub fn parse_or_default<T>(
    name: &str,
    raw: Option<&str>,
    default: T,
    warnings: &mut ConfigWarnings,
) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return default;
    };
    match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            warnings.push(format!(
                "{name}={raw:?} is not a valid number; using default {default}"
            ));
            default
        }
    }
}
