use crate::ast::FunctionDef;
use pest::error::{Error as PestError, LineColLocation};
use pest::Parser;
use std::fmt;

mod builder;

use builder::build_function;

// Define the parser struct using the grammar file
#[derive(pest_derive::Parser)]
#[grammar = "parser/function.pest"] // Path relative to src/
pub struct FunctionParser;

/// Errors produced while parsing callable source text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },
    InvalidLiteral {
        message: String,
        line: usize,
        column: usize,
    },
    UnexpectedRule {
        expected: String,
        found: String,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Syntax {
                message,
                line,
                column,
            } => write!(f, "syntax error at {}:{}: {}", line, column, message),
            ParseError::InvalidLiteral {
                message,
                line,
                column,
            } => write!(f, "invalid literal at {}:{}: {}", line, column, message),
            ParseError::UnexpectedRule { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for ParseError {}

impl From<PestError<Rule>> for ParseError {
    fn from(err: PestError<Rule>) -> Self {
        let (line, column) = match err.line_col {
            LineColLocation::Pos(pos) => pos,
            LineColLocation::Span(start, _) => start,
        };
        ParseError::Syntax {
            message: err.variant.message().to_string(),
            line,
            column,
        }
    }
}

/// Parses `input` as exactly one function definition (arrow function or function expression).
pub fn parse_function(input: &str) -> Result<FunctionDef, ParseError> {
    let mut pairs = FunctionParser::parse(Rule::program, input)?;
    let program = pairs.next().ok_or_else(|| ParseError::UnexpectedRule {
        expected: "program".to_string(),
        found: "end of input".to_string(),
    })?;
    let definition = program
        .into_inner()
        .find(|p| p.as_rule() == Rule::function_def)
        .ok_or_else(|| ParseError::UnexpectedRule {
            expected: "function definition".to_string(),
            found: input.to_string(),
        })?;
    build_function(definition)
}
