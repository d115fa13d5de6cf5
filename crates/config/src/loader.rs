use std::{path::Path, str::FromStr};

use anyhow::bail;
use serde::Deserialize;
use serde_dynamic_string::DynamicString;
use std::fmt::Write;
use toml::Value;

use crate::Config;

/// Loads a `Config` from a TOML file, expanding `${ENV_VAR}`-style
/// placeholders before deserializing and validating board invariants that
/// serde's `deny_unknown_fields` cannot express.
pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let path = path.as_ref().to_path_buf();
    let content = std::fs::read_to_string(&path)?;
    let mut raw_config: Value = toml::from_str(&content)?;

    expand_dynamic_strings(&mut Vec::new(), &mut raw_config)?;

    let config = Config::deserialize(raw_config)?;
    validate(&config)?;

    Ok(config)
}

pub(crate) fn validate(config: &Config) -> anyhow::Result<()> {
    if config.boards.is_empty() {
        bail!("No boards configured. The council engine requires at least one `[boards.*]` entry to run.");
    }

    for board in config.boards.values() {
        board.validate().map_err(anyhow::Error::msg)?;
    }

    Ok(())
}

fn expand_dynamic_strings<'a>(path: &mut Vec<Result<&'a str, usize>>, value: &'a mut Value) -> anyhow::Result<()> {
    match value {
        Value::String(s) => match DynamicString::<String>::from_str(s) {
            Ok(out) => *s = out.into_inner(),
            Err(err) => {
                let mut p = String::new();

                for segment in path.iter() {
                    match segment {
                        Ok(s) => {
                            p.push_str(s);
                            p.push('.');
                        }
                        Err(i) => write!(p, "[{i}]").unwrap(),
                    }
                }

                if p.ends_with('.') {
                    p.pop();
                }

                bail!("Failed to expand dynamic string at path '{p}': {err}");
            }
        },
        Value::Array(values) => {
            for (i, value) in values.iter_mut().enumerate() {
                path.push(Err(i));
                expand_dynamic_strings(path, value)?;
                path.pop();
            }
        }
        Value::Table(map) => {
            for (key, value) in map {
                path.push(Ok(key.as_str()));
                expand_dynamic_strings(path, value)?;
                path.pop();
            }
        }
        Value::Integer(_) | Value::Float(_) | Value::Boolean(_) | Value::Datetime(_) => (),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use std::io::Write as _;

    use super::load;

    #[test]
    fn expands_env_vars() {
        // SAFETY: test-only, single-threaded access to this var.
        unsafe { std::env::set_var("COUNCIL_TEST_KEY", "sk-from-env") };

        let toml = indoc! {r#"
            [gateway]
            base_url = "https://openrouter.ai/api/v1"
            api_key = "{{ env.COUNCIL_TEST_KEY }}"

            [boards.general]
            name = "General"
            council_members = ["m1"]
            chairman = "m1"
        "#};

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(toml.as_bytes()).unwrap();

        let config = load(file.path()).unwrap();
        assert_eq!(
            secrecy::ExposeSecret::expose_secret(&config.gateway.api_key),
            "sk-from-env"
        );
    }

    #[test]
    fn rejects_empty_boards() {
        let toml = indoc! {r#"
            [gateway]
            base_url = "https://openrouter.ai/api/v1"
            api_key = "sk-test"
        "#};

        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, toml.as_bytes()).unwrap();

        assert!(load(file.path()).is_err());
    }
}
