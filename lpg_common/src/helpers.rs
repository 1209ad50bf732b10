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

/// Reads `name` from the environment and parses it. Returns `None` if the variable is unset, and `Err` with a
/// human-readable message if it is set but cannot be parsed.
pub fn parse_env_var<T: FromStr>(name: &str) -> Option<Result<T, String>>
where T::Err: std::fmt::Display {
    env::var(name).ok().map(|s| s.trim().parse::<T>().map_err(|e| format!("Invalid value '{s}' for {name}. {e}")))
}
