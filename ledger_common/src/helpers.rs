use std::{env, str::FromStr};

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Reads a boolean flag from the environment variable `key`.
pub fn env_flag(key: &str, default: bool) -> bool {
    parse_boolean_flag(env::var(key).ok(), default)
}

/// Reads and parses the environment variable `key`.
///
/// Returns `Ok(None)` if the variable is not set, and `Err` with a human-readable message if it is set but cannot be
/// parsed.
pub fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>, String>
where T::Err: std::fmt::Display {
    match env::var(key) {
        Ok(s) => s.trim().parse::<T>().map(Some).map_err(|e| format!("{key} has an invalid value '{s}'. {e}")),
        Err(_) => Ok(None),
    }
}
