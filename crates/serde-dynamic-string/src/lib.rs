//! A `FromStr`/`Display` wrapper that expands `{{ env.VAR }}` placeholders
//! (optionally `{{ env.VAR:-default }}`) before parsing the inner value,
//! so a config file can defer secrets to the process environment.

use std::{fmt, str::FromStr, sync::LazyLock};

use itertools::Itertools;
use regex::Regex;
use serde_with::{DeserializeFromStr, SerializeDisplay};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*env\.([A-Za-z_][A-Za-z0-9_]*)(?::-(.*?))?\s*\}\}").expect("valid regex"));

/// Wraps `T`, expanding environment placeholders in the raw string before
/// delegating to `T::from_str`. Deserializes via [`FromStr`] and serializes
/// via [`fmt::Display`] (`serde_with`'s `DeserializeFromStr`/`SerializeDisplay`),
/// so it drops into any field that would otherwise just be `T`.
#[derive(Debug, Clone, PartialEq, Eq, DeserializeFromStr, SerializeDisplay)]
pub struct DynamicString<T>(T);

impl<T> DynamicString<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: fmt::Display> fmt::Display for DynamicString<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failure expanding or parsing a dynamic string.
#[derive(Debug)]
pub enum DynamicStringError<E> {
    /// One or more `{{ env.VAR }}` placeholders had no default and no
    /// matching environment variable.
    MissingEnvVars(String),
    /// The expanded string didn't parse as `T`.
    Parse(E),
}

impl<E: fmt::Display> fmt::Display for DynamicStringError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEnvVars(names) => write!(f, "missing environment variable(s): {names}"),
            Self::Parse(err) => write!(f, "{err}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for DynamicStringError<E> {}

impl<T: FromStr> FromStr for DynamicString<T> {
    type Err = DynamicStringError<T::Err>;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let missing = missing_vars(raw);
        if !missing.is_empty() {
            return Err(DynamicStringError::MissingEnvVars(missing.join(", ")));
        }

        let expanded = expand(raw);
        expanded.parse::<T>().map(DynamicString).map_err(DynamicStringError::Parse)
    }
}

/// Names referenced by a placeholder with no `:-default` fallback, for
/// which `std::env::var` currently fails. Deduplicated and sorted so a
/// config with several bad placeholders reports all of them at once.
fn missing_vars(raw: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(raw)
        .filter(|capture| capture.get(2).is_none())
        .map(|capture| capture[1].to_string())
        .filter(|name| std::env::var(name).is_err())
        .unique()
        .sorted()
        .collect()
}

fn expand(raw: &str) -> String {
    let mut output = String::with_capacity(raw.len());
    let mut last_end = 0;

    for capture in PLACEHOLDER.captures_iter(raw) {
        let whole = capture.get(0).expect("group 0 always matches");
        output.push_str(&raw[last_end..whole.start()]);

        let var_name = &capture[1];
        let default = capture.get(2).map(|m| m.as_str());

        let value = match std::env::var(var_name) {
            Ok(value) => value,
            Err(_) => default.unwrap_or_default().to_string(),
        };

        output.push_str(&value);
        last_end = whole.end();
    }

    output.push_str(&raw[last_end..]);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_env_var() {
        temp_env::with_var("SDS_TEST_A", Some("hello"), || {
            let value = DynamicString::<String>::from_str("{{ env.SDS_TEST_A }}").unwrap();
            assert_eq!(value.into_inner(), "hello");
        });
    }

    #[test]
    fn falls_back_to_default_when_unset() {
        temp_env::with_var_unset("SDS_TEST_MISSING", || {
            let value = DynamicString::<String>::from_str("{{ env.SDS_TEST_MISSING:-fallback }}").unwrap();
            assert_eq!(value.into_inner(), "fallback");
        });
    }

    #[test]
    fn errors_on_missing_var_without_default() {
        temp_env::with_var_unset("SDS_TEST_MISSING_2", || {
            assert!(DynamicString::<String>::from_str("{{ env.SDS_TEST_MISSING_2 }}").is_err());
        });
    }

    #[test]
    fn passes_through_plain_strings() {
        let value = DynamicString::<u32>::from_str("42").unwrap();
        assert_eq!(value.into_inner(), 42);
    }
}
