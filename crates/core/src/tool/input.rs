use std::fmt::{self, Display};

use serde::de::{self, Deserialize, Deserializer};
use serde_json::{Value, json};

/// Input of a tool that takes one free-form string.
///
/// Models are inconsistent about how they pass a lone string argument, so
/// all of these are accepted:
///
/// - a bare JSON string: `"Paris"`
/// - `{"input": "Paris"}`
/// - `{"__arg1": "Paris"}`
/// - any object with exactly one string value: `{"city": "Paris"}`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SingleInput(pub String);

impl SingleInput {
    /// Returns the schema advertised for single-string tools.
    pub fn parameter_schema(description: &str) -> Value {
        json!({
            "type": "object",
            "properties": {
                "input": {
                    "type": "string",
                    "description": description
                }
            },
            "required": ["input"]
        })
    }

    /// Unwraps the string.
    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for SingleInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SingleInput {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(SingleInput(s)),
            Value::Object(mut map) => {
                for key in ["input", "__arg1"] {
                    if let Some(Value::String(s)) = map.remove(key) {
                        return Ok(SingleInput(s));
                    }
                }
                let mut strings =
                    map.into_iter().filter_map(|(_, v)| match v {
                        Value::String(s) => Some(s),
                        _ => None,
                    });
                match (strings.next(), strings.next()) {
                    (Some(s), None) => Ok(SingleInput(s)),
                    _ => Err(de::Error::custom(
                        "expected an object with a single string field `input`",
                    )),
                }
            }
            other => Err(de::Error::custom(format!(
                "expected a string argument, got {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(value: Value) -> Result<SingleInput, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[test]
    fn test_accepted_shapes() {
        let expected = SingleInput("Paris".to_owned());
        assert_eq!(parse(json!("Paris")).unwrap(), expected);
        assert_eq!(parse(json!({ "input": "Paris" })).unwrap(), expected);
        assert_eq!(parse(json!({ "__arg1": "Paris" })).unwrap(), expected);
        assert_eq!(parse(json!({ "city": "Paris" })).unwrap(), expected);
        assert_eq!(
            parse(json!({ "input": "Paris", "units": "metric" })).unwrap(),
            expected
        );
    }

    #[test]
    fn test_rejected_shapes() {
        assert!(parse(json!(42)).is_err());
        assert!(parse(json!({})).is_err());
        assert!(parse(json!({ "from": "Paris", "to": "Lyon" })).is_err());
    }
}
