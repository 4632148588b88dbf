use nom::{
    error::{ErrorKind, FromExternalError},
    IResult,
};
use nom_locate::LocatedSpan;
use thiserror::Error;

/// A [`LocatedSpan`] over the input.
pub(crate) type Span<'a> = LocatedSpan<&'a str>;

/// An intermediate parsing result
pub(crate) type IntermediateResult<'a, T> = IResult<Span<'a>, T, LocatedParseError>;

/// The result of a parse
pub type ParseResult<T> = Result<T, LocatedParseError>;

/// A [`ParseError`] at a certain location
#[derive(Debug, Error)]
#[error("Parse error on line {}, column {}: {}\nat {}{}", .line, .column, .source, .fragment, format_parse_error_context(.context))]
pub struct LocatedParseError {
    #[source]
    pub(crate) source: ParseError,
    pub(crate) line: u32,
    pub(crate) column: usize,
    pub(crate) fragment: String,
    pub(crate) context: Vec<LocatedParseError>,
}

impl LocatedParseError {
    /// Append another [`LocatedParseError`] as context to this error.
    pub fn append(&mut self, other: LocatedParseError) {
        self.context.push(other)
    }

    /// Return the underlying [`ParseError`].
    pub fn error(&self) -> &ParseError {
        &self.source
    }

    /// Return the line on which the error occurred.
    pub fn line(&self) -> u32 {
        self.line
    }
}

fn format_parse_error_context(context: &[LocatedParseError]) -> String {
    let mut fragments = Vec::new();

    for error in context {
        let error_string = format!("{error}");
        for line in error_string.split('\n') {
            fragments.push(format!("{}{line}", " ".repeat(2)));
        }
    }

    if fragments.is_empty() {
        String::new()
    } else {
        format!("\nContext:\n{}", fragments.join("\n"))
    }
}

/// Errors that can occur during parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// A syntax error. Note that we cannot take [&'a str] here, as
    /// bounds on [std::error::Error] require ['static] lifetime.
    #[error("Syntax error: {0}")]
    SyntaxError(String),
    /// More input needed.
    #[error("Expected further input: {0}")]
    MissingInput(String),
    /// Expected a token.
    #[error(r#"Expected "{0}""#)]
    ExpectedToken(String),
    /// Expected a rule.
    #[error("Expected a rule")]
    ExpectedRule,
    /// Expected an atom.
    #[error("Expected an atom")]
    ExpectedAtom,
    /// Expected a term.
    #[error("Expected a term")]
    ExpectedTerm,
    /// Expected a bare name.
    #[error("Expected a bare name")]
    ExpectedBareName,
    /// Expected a variable name.
    #[error("Expected a variable name")]
    ExpectedVariableName,
    /// Expected a universally quantified variable.
    #[error("Expected a universally quantified variable")]
    ExpectedUniversalVariable,
    /// Expected an existentially quantified variable.
    #[error("Expected an existentially quantified variable")]
    ExpectedExistentialVariable,
    /// Expected a constant.
    #[error("Expected a constant")]
    ExpectedConstant,
    /// An existentially quantified variable occurs in the body of a rule.
    #[error(r#"Variable "{0}" occurs existentially quantified in the rule body."#)]
    BodyExistential(String),
    /// The universal variable does not occur in a body literal.
    #[error(r#"The universal variable "{0}" does not occur in a body literal."#)]
    UnsafeHeadVariable(String),
    /// A variable is both existentially and universally quantified
    #[error(r#"Variable "{0}" occurs with existential and universal quantification"#)]
    BothQuantifiers(String),
    /// A predicate is used with different arities.
    #[error(r#"Predicate "{predicate}" was used with arity {expected} before, but is used with arity {found} here"#)]
    ArityMismatch {
        /// Name of the predicate
        predicate: String,
        /// Arity of the first occurrence
        expected: usize,
        /// Arity of the offending occurrence
        found: usize,
    },
}

impl ParseError {
    /// Locate this error by adding a position.
    pub fn at(self, position: Span) -> LocatedParseError {
        let column = position.naive_get_utf8_column();
        let fragment = if position.is_empty() {
            String::new()
        } else {
            let line = String::from_utf8_lossy(position.get_line_beginning());
            format!("\"{line}\"\n{}^", "-".repeat(3 + column))
        };

        LocatedParseError {
            source: self,
            line: position.location_line(),
            column,
            fragment,
            context: Vec::new(),
        }
    }
}

impl nom::error::ParseError<Span<'_>> for LocatedParseError {
    fn from_error_kind(input: Span, kind: ErrorKind) -> Self {
        ParseError::SyntaxError(kind.description().to_string()).at(input)
    }

    fn append(input: Span, kind: ErrorKind, other: Self) -> Self {
        let mut error = ParseError::SyntaxError(kind.description().to_string()).at(input);
        error.append(other);
        error
    }
}

impl FromExternalError<Span<'_>, ParseError> for LocatedParseError {
    fn from_external_error(input: Span<'_>, kind: ErrorKind, e: ParseError) -> Self {
        let mut err = <Self as nom::error::ParseError<Span<'_>>>::from_error_kind(input, kind);
        err.append(e.at(input));
        err
    }
}

/// A term as written in the rule file.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ParsedTerm<'a> {
    /// `?name`
    Universal(Span<'a>),
    /// `!name`
    Existential(Span<'a>),
    Constant(Span<'a>),
}

/// An atom as written in the rule file.
#[derive(Debug, Clone)]
pub(crate) struct ParsedAtom<'a> {
    pub(crate) predicate: Span<'a>,
    pub(crate) terms: Vec<ParsedTerm<'a>>,
}

/// A rule as written in the rule file.
#[derive(Debug, Clone)]
pub(crate) struct ParsedRule<'a> {
    pub(crate) head: Vec<ParsedAtom<'a>>,
    pub(crate) body: Vec<ParsedAtom<'a>>,
}
