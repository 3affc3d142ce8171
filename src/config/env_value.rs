// ABOUTME: Environment variable value types with interpolation support.
// ABOUTME: Handles literal values and references to environment variables.

use crate::error::{Error, Result};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn resolve(&self) -> Result<String> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) => Ok(val),
                Err(_) => default
                    .clone()
                    .ok_or_else(|| Error::MissingEnvVar(var.clone())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_resolves_to_itself() {
        let value: EnvValue = serde_yaml::from_str("robot").unwrap();
        assert_eq!(value.resolve().unwrap(), "robot");
    }

    #[test]
    fn env_reference_reads_variable() {
        let value: EnvValue = serde_yaml::from_str("env: OCIROOTFS_TEST_TOKEN").unwrap();
        temp_env::with_var("OCIROOTFS_TEST_TOKEN", Some("s3cret"), || {
            assert_eq!(value.resolve().unwrap(), "s3cret");
        });
    }

    #[test]
    fn env_reference_falls_back_to_default() {
        let value: EnvValue =
            serde_yaml::from_str("{ env: OCIROOTFS_TEST_UNSET, default: anon }").unwrap();
        temp_env::with_var_unset("OCIROOTFS_TEST_UNSET", || {
            assert_eq!(value.resolve().unwrap(), "anon");
        });
    }

    #[test]
    fn missing_variable_without_default_is_an_error() {
        let value: EnvValue = serde_yaml::from_str("env: OCIROOTFS_TEST_MISSING").unwrap();
        temp_env::with_var_unset("OCIROOTFS_TEST_MISSING", || {
            let err = value.resolve().unwrap_err();
            assert!(matches!(err, Error::MissingEnvVar(var) if var == "OCIROOTFS_TEST_MISSING"));
        });
    }
}
