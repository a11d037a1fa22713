//! Configuration read from environment variables.

/// Interpret a string value such as "1" or "no" as a boolean.
///
/// Returns `None` if the value is not recognized.
pub fn str_as_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" => Some(true),
        "0" | "false" | "f" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Return whether a feature flag controlled by an environment variable is
/// enabled.
///
/// Unset variables and unrecognized values yield `default`.
pub fn env_flag(name: &str, default: bool) -> bool {
    parse_flag(name, std::env::var(name).ok().as_deref(), default)
}

/// Interpret the value of flag `name`, if set, falling back to `default`.
pub(crate) fn parse_flag(name: &str, value: Option<&str>, default: bool) -> bool {
    let Some(value) = value else {
        return default;
    };
    str_as_bool(value).unwrap_or_else(|| {
        log::warn!(
            "Unrecognized boolean value \"{}\" for {}, using {}",
            value,
            name,
            default
        );
        default
    })
}
