//! `{name}` style prompt templates.

use thiserror::Error;

/// Errors of [`PromptTemplate`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A `{` at this byte offset has no matching `}`.
    #[error("unclosed placeholder at position {0}")]
    Unclosed(usize),
    /// A `}` at this byte offset closes nothing. Literal braces are
    /// written `}}`.
    #[error("single '}}' encountered at position {0}")]
    UnmatchedClose(usize),
    /// A `{}` at this byte offset has no variable name.
    #[error("empty placeholder at position {0}")]
    EmptyPlaceholder(usize),
    /// The template needs a variable that was not supplied.
    #[error("missing value for template variable `{0}`")]
    MissingVariable(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// A text template with `{name}` placeholders.
///
/// `{{` and `}}` produce literal braces.
///
/// ```
/// use toolwire_core::PromptTemplate;
///
/// let template = PromptTemplate::from_template(
///     "Translate the following text to {language}: {text}",
/// )
/// .unwrap();
/// assert_eq!(template.input_variables(), ["language", "text"]);
///
/// let prompt = template
///     .format(&[("language", "French"), ("text", "Hello")])
///     .unwrap();
/// assert_eq!(prompt, "Translate the following text to French: Hello");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
    variables: Vec<String>,
}

impl PromptTemplate {
    /// Parses a template.
    pub fn from_template(template: &str) -> Result<Self, TemplateError> {
        let mut segments = vec![];
        let mut variables: Vec<String> = vec![];
        let mut literal = String::new();
        let mut chars = template.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if chars.peek().is_some_and(|(_, c)| *c == '{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().is_some_and(|(_, c)| *c == '}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let closed = loop {
                        match chars.next() {
                            Some((_, '}')) => break true,
                            Some((_, c)) => name.push(c),
                            None => break false,
                        }
                    };
                    if !closed {
                        return Err(TemplateError::Unclosed(pos));
                    }
                    let name = name.trim().to_owned();
                    if name.is_empty() {
                        return Err(TemplateError::EmptyPlaceholder(pos));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(
                            &mut literal,
                        )));
                    }
                    if !variables.contains(&name) {
                        variables.push(name.clone());
                    }
                    segments.push(Segment::Variable(name));
                }
                '}' => return Err(TemplateError::UnmatchedClose(pos)),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            segments,
            variables,
        })
    }

    /// Returns the variable names in order of first appearance.
    #[inline]
    pub fn input_variables(&self) -> &[String] {
        &self.variables
    }

    /// Substitutes the variables. Values for unknown names are ignored.
    pub fn format(
        &self,
        values: &[(&str, &str)],
    ) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(name) => {
                    let (_, value) = values
                        .iter()
                        .find(|(key, _)| *key == name.as_str())
                        .ok_or_else(|| {
                            TemplateError::MissingVariable(name.clone())
                        })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variables_in_order() {
        let template = PromptTemplate::from_template(
            "{question} Use {context}. Again: {question}",
        )
        .unwrap();
        assert_eq!(template.input_variables(), ["question", "context"]);
    }

    #[test]
    fn test_escaped_braces() {
        let template =
            PromptTemplate::from_template("Return {{\"city\": {city}}}")
                .unwrap();
        assert_eq!(template.input_variables(), ["city"]);
        assert_eq!(
            template.format(&[("city", "\"Paris\"")]).unwrap(),
            "Return {\"city\": \"Paris\"}"
        );
    }

    #[test]
    fn test_missing_and_extra_values() {
        let template = PromptTemplate::from_template("{a} and {b}").unwrap();
        assert_eq!(
            template.format(&[("a", "1")]),
            Err(TemplateError::MissingVariable("b".to_owned()))
        );
        assert_eq!(
            template.format(&[("a", "1"), ("b", "2"), ("c", "3")]).unwrap(),
            "1 and 2"
        );
    }

    #[test]
    fn test_malformed() {
        assert_eq!(
            PromptTemplate::from_template("Hello {name"),
            Err(TemplateError::Unclosed(6))
        );
        assert_eq!(
            PromptTemplate::from_template("Hello {}"),
            Err(TemplateError::EmptyPlaceholder(6))
        );
    }

    #[test]
    fn test_single_closing_brace() {
        assert_eq!(
            PromptTemplate::from_template("Return {city}}"),
            Err(TemplateError::UnmatchedClose(13))
        );
        assert_eq!(
            PromptTemplate::from_template("a } b"),
            Err(TemplateError::UnmatchedClose(2))
        );
        assert_eq!(
            PromptTemplate::from_template("Return {city}}}")
                .unwrap()
                .format(&[("city", "Oslo")])
                .unwrap(),
            "Return Oslo}"
        );
    }
}
