// validation.rs
use crate::DomainError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Regla de validación de un parámetro. Un parámetro guarda como mucho una.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationRule {
  Choice { choices: Vec<JsonValue> },
  Range { min: Option<f64>, max: Option<f64> },
  Regex { pattern: String },
}

impl ValidationRule {
  /// Elige la regla a guardar con precedencia fija: conjunto de opciones,
  /// luego rango numérico, luego expresión regular.
  pub fn select(choices: Option<Vec<JsonValue>>,
                min: Option<f64>,
                max: Option<f64>,
                pattern: Option<String>)
                -> Option<Self> {
    if let Some(choices) = choices.filter(|c| !c.is_empty()) {
      return Some(Self::Choice { choices });
    }
    if min.is_some() || max.is_some() {
      return Some(Self::Range { min, max });
    }
    pattern.filter(|p| !p.is_empty()).map(|pattern| Self::Regex { pattern })
  }

  /// Comprueba un valor ya ligado.
  pub fn check(&self, value: &JsonValue) -> Result<(), DomainError> {
    match self {
      Self::Choice { choices } => {
        let wanted = plain_text(value);
        if choices.iter().any(|c| c == value || plain_text(c) == wanted) {
          Ok(())
        } else {
          Err(DomainError::ValidationError(format!("'{}' no es una opción válida", wanted)))
        }
      }
      Self::Range { min, max } => {
        let number = value.as_f64()
                          .or_else(|| value.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
                          .ok_or_else(|| DomainError::ValidationError(format!("'{}' no es numérico", plain_text(value))))?;
        if let Some(lo) = min {
          if number < *lo {
            return Err(DomainError::ValidationError(format!("{} es menor que el mínimo {}", number, lo)));
          }
        }
        if let Some(hi) = max {
          if number > *hi {
            return Err(DomainError::ValidationError(format!("{} es mayor que el máximo {}", number, hi)));
          }
        }
        Ok(())
      }
      Self::Regex { pattern } => {
        let re = Regex::new(pattern).map_err(|e| {
                                       DomainError::ValidationError(format!("expresión regular inválida '{}': {}", pattern, e))
                                     })?;
        let text = plain_text(value);
        if re.is_match(&text) {
          Ok(())
        } else {
          Err(DomainError::ValidationError(format!("'{}' no cumple el patrón {}", text, pattern)))
        }
      }
    }
  }
}

fn plain_text(value: &JsonValue) -> String {
  match value {
    JsonValue::String(s) => s.clone(),
    other => other.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn serializes_with_kind_tag() {
    let rule = ValidationRule::Range { min: Some(0.0), max: None };
    let v = serde_json::to_value(&rule).expect("serializa");
    assert_eq!(v["kind"], "range");
  }

  #[test]
  fn choice_accepts_textual_numbers() {
    let rule = ValidationRule::Choice { choices: vec![json!(1), json!(2)] };
    assert!(rule.check(&json!("2")).is_ok());
    assert!(rule.check(&json!(3)).is_err());
  }
}
