//! Keyword backend - first matching substring rule wins.

use reflex_core::{ActionId, EncodedInput};
use serde::Deserialize;

use super::{Model, ModelBackend};
use crate::error::InferenceError;

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordRule {
    pub pattern: String,
    pub action: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordModel {
    #[serde(default)]
    pub rules: Vec<KeywordRule>,
    /// Output when no rule matches.
    pub default: u32,
    #[serde(default)]
    pub case_sensitive: bool,
}

impl KeywordModel {
    pub(crate) fn validate(&self) -> Result<(), String> {
        match self.rules.iter().position(|r| r.pattern.is_empty()) {
            Some(i) => Err(format!("rule {i} has an empty pattern")),
            None => Ok(()),
        }
    }
}

impl Model for KeywordModel {
    fn predict(&self, input: &EncodedInput) -> Result<ActionId, InferenceError> {
        let text = input.to_string_lossy();
        let text = if self.case_sensitive {
            text.into_owned()
        } else {
            text.to_lowercase()
        };

        let matched = self.rules.iter().find(|rule| {
            if self.case_sensitive {
                text.contains(rule.pattern.as_str())
            } else {
                text.contains(rule.pattern.to_lowercase().as_str())
            }
        });

        Ok(ActionId(matched.map_or(self.default, |rule| rule.action)))
    }

    fn backend(&self) -> &'static str {
        ModelBackend::Keyword.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(case_sensitive: bool) -> KeywordModel {
        KeywordModel {
            rules: vec![
                KeywordRule {
                    pattern: "Goblin".into(),
                    action: 0,
                },
                KeywordRule {
                    pattern: "north".into(),
                    action: 2,
                },
            ],
            default: 6,
            case_sensitive,
        }
    }

    fn predict(model: &KeywordModel, text: &str) -> ActionId {
        model
            .predict(&EncodedInput::from(text.as_bytes()))
            .unwrap()
    }

    #[test]
    fn first_matching_rule_wins() {
        let m = model(false);
        assert_eq!(predict(&m, "a goblin to the north"), ActionId(0));
        assert_eq!(predict(&m, "go NORTH"), ActionId(2));
        assert_eq!(predict(&m, "nothing here"), ActionId(6));
    }

    #[test]
    fn case_sensitive_matching() {
        let m = model(true);
        assert_eq!(predict(&m, "a goblin"), ActionId(6));
        assert_eq!(predict(&m, "a Goblin"), ActionId(0));
    }

    #[test]
    fn empty_patterns_are_rejected() {
        let mut m = model(false);
        m.rules.push(KeywordRule {
            pattern: String::new(),
            action: 1,
        });
        assert!(m.validate().is_err());
    }
}
