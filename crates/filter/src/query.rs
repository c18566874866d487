//! Selection expression parser
//!
//! Grammar (whitespace-separated):
//!
//! ```text
//! selection := field*
//! field     := IDENT [ '{' selection '}' ]
//! IDENT     := [A-Za-z_][A-Za-z0-9_]*
//! ```
//!
//! The root selection is written without surrounding braces.

use crate::error::FilterError;

/// A parsed selection set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    fields: Vec<Field>,
}

/// One selected field, optionally with a nested selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    children: Option<Selection>,
}

impl Field {
    /// The field name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nested selection, if the field was followed by `{ ... }`
    #[inline]
    pub fn children(&self) -> Option<&Selection> {
        self.children.as_ref()
    }
}

impl Selection {
    /// The selected fields, in expression order
    #[inline]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Parse a selection expression
    ///
    /// # Errors
    ///
    /// [`FilterError::Syntax`] on unexpected characters, unbalanced braces,
    /// empty groups, or an empty expression.
    pub fn parse(expression: &str) -> Result<Self, FilterError> {
        let mut parser = Parser::new(expression);
        let selection = parser.parse_fields()?;

        match parser.peek() {
            None => {}
            Some((pos, '}')) => {
                return Err(FilterError::syntax(pos, "unbalanced '}'"));
            }
            Some((pos, c)) => {
                return Err(FilterError::syntax(pos, format!("unexpected character '{c}'")));
            }
        }

        if selection.fields.is_empty() {
            return Err(FilterError::syntax(0, "expression selects no fields"));
        }

        Ok(selection)
    }
}

/// Hand-rolled recursive-descent parser over the raw expression
struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    /// Peek at the next non-whitespace character
    fn peek(&mut self) -> Option<(usize, char)> {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }
        self.chars.peek().copied()
    }

    /// Parse zero or more fields until '}' or end of input
    fn parse_fields(&mut self) -> Result<Selection, FilterError> {
        let mut fields = Vec::new();

        while let Some((pos, c)) = self.peek() {
            if c == '}' {
                break;
            }

            if !is_ident_start(c) {
                return Err(FilterError::syntax(
                    pos,
                    format!("expected field name, found '{c}'"),
                ));
            }

            let name = self.read_ident(pos);
            let children = self.maybe_parse_group()?;
            fields.push(Field { name, children });
        }

        Ok(Selection { fields })
    }

    /// Parse `'{' fields '}'` if the next character opens a group
    fn maybe_parse_group(&mut self) -> Result<Option<Selection>, FilterError> {
        match self.peek() {
            Some((open_pos, '{')) => {
                self.chars.next();
                let inner = self.parse_fields()?;

                match self.peek() {
                    Some((_, '}')) => {
                        self.chars.next();
                    }
                    _ => {
                        return Err(FilterError::syntax(open_pos, "unclosed '{'"));
                    }
                }

                if inner.fields.is_empty() {
                    return Err(FilterError::syntax(open_pos, "empty selection group"));
                }

                Ok(Some(inner))
            }
            _ => Ok(None),
        }
    }

    /// Consume an identifier starting at `start`
    fn read_ident(&mut self, start: usize) -> String {
        let mut end = start;
        while let Some(&(pos, c)) = self.chars.peek() {
            if is_ident_continue(c) {
                end = pos + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        self.input[start..end].to_string()
    }
}

#[inline]
fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

#[inline]
fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
