// ABOUTME: Template environment values: literals or references to host variables.
// ABOUTME: References resolve against the invoking process environment.

use serde::Deserialize;
use std::collections::HashMap;

use super::TemplateError;

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
    pub fn resolve(&self) -> Result<String, TemplateError> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, default } => std::env::var(var).or_else(|_| {
                default
                    .clone()
                    .ok_or_else(|| TemplateError::MissingEnvVar(var.clone()))
            }),
        }
    }
}

pub fn resolve_env_map(
    map: &HashMap<String, EnvValue>,
) -> Result<HashMap<String, String>, TemplateError> {
    map.iter()
        .map(|(k, v)| v.resolve().map(|resolved| (k.clone(), resolved)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_resolves_to_itself() {
        let value = EnvValue::Literal("on".to_string());
        assert_eq!(value.resolve().unwrap(), "on");
    }

    #[test]
    fn reference_prefers_host_variable() {
        temp_env::with_var("ROLLOVER_TEST_DB_PASS", Some("s3cret"), || {
            let value = EnvValue::FromEnv {
                var: "ROLLOVER_TEST_DB_PASS".to_string(),
                default: Some("fallback".to_string()),
            };
            assert_eq!(value.resolve().unwrap(), "s3cret");
        });
    }

    #[test]
    fn reference_falls_back_to_default() {
        temp_env::with_var_unset("ROLLOVER_TEST_UNSET", || {
            let value = EnvValue::FromEnv {
                var: "ROLLOVER_TEST_UNSET".to_string(),
                default: Some("fallback".to_string()),
            };
            assert_eq!(value.resolve().unwrap(), "fallback");
        });
    }

    #[test]
    fn missing_reference_without_default_fails() {
        temp_env::with_var_unset("ROLLOVER_TEST_UNSET", || {
            let value = EnvValue::FromEnv {
                var: "ROLLOVER_TEST_UNSET".to_string(),
                default: None,
            };
            assert!(matches!(
                value.resolve(),
                Err(TemplateError::MissingEnvVar(var)) if var == "ROLLOVER_TEST_UNSET"
            ));
        });
    }
}
