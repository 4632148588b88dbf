//! A parser for rule files in the `?x`/`!v` rule syntax.
//!
//! A rule file is a sequence of rules `head :- body .`,
//! where head and body are comma-separated atoms.
//! Universal variables are written `?x`, existential variables `!x`,
//! and everything else in term position is a constant.
//! Comments start with `%` and extend to the end of the line.

use std::{
    collections::{HashMap, HashSet},
    fmt::Debug,
};

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{alpha1, char, digit1, multispace1, satisfy},
    combinator::{cut, map, opt, recognize, value},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, terminated},
    Err,
};

use crate::model::{Literal, Program, Rule, SymbolTable, Term, VariableIndex};

pub(crate) mod types;

use types::{IntermediateResult, ParsedAtom, ParsedRule, ParsedTerm, Span};
pub use types::{LocatedParseError, ParseError, ParseResult};

/// Parse a program in the given `input`-String and return a [`Program`].
///
/// # Error
/// Returns an appropriate [`LocatedParseError`] on syntax errors
/// and on rules violating the quantifier restrictions.
pub fn parse_program(input: impl AsRef<str>) -> ParseResult<Program> {
    let input = Span::new(input.as_ref());
    let parsed = match parse_rules(input) {
        Ok((_, parsed)) => parsed,
        Err(Err::Error(error)) | Err(Err::Failure(error)) => return Err(error),
        Err(Err::Incomplete(needed)) => {
            return Err(ParseError::MissingInput(match needed {
                nom::Needed::Unknown => "expected an unknown amount of further input".to_string(),
                nom::Needed::Size(size) => format!("expected at least {size} more bytes"),
            })
            .at(input))
        }
    };

    let mut builder = ProgramBuilder::default();
    for rule in parsed {
        builder.add_rule(rule)?;
    }

    Ok(builder.finish())
}

/// A combinator to add tracing to the parser.
/// [fun] is an identifier for the parser and [parser] is the actual parser.
#[inline(always)]
fn traced<'a, T, P>(
    fun: &'static str,
    mut parser: P,
) -> impl FnMut(Span<'a>) -> IntermediateResult<'a, T>
where
    T: Debug,
    P: FnMut(Span<'a>) -> IntermediateResult<'a, T>,
{
    move |input| {
        log::trace!(target: "parser", "{fun}({input:?})");
        let result = parser(input);
        log::trace!(target: "parser", "{fun}({input:?}) -> {result:?}");
        result
    }
}

/// A combinator that modifies the associated error.
fn map_error<'a, T: 'a>(
    mut parser: impl FnMut(Span<'a>) -> IntermediateResult<'a, T> + 'a,
    mut error: impl FnMut() -> ParseError + 'a,
) -> impl FnMut(Span<'a>) -> IntermediateResult<'a, T> + 'a {
    move |input| {
        parser(input).map_err(|e| match e {
            Err::Incomplete(_) => e,
            Err::Error(context) => {
                let mut err = error().at(input);
                err.append(context);
                Err::Error(err)
            }
            Err::Failure(context) => {
                let mut err = error().at(input);
                err.append(context);
                Err::Failure(err)
            }
        })
    }
}

/// A combinator that recognises a comment, starting at a `%`
/// character and ending at the end of the line.
fn comment(input: Span) -> IntermediateResult<()> {
    alt((
        value((), pair(tag("%"), is_not("\n\r"))),
        // a comment that immediately precedes the end of the line –
        // this must come after the normal line comment above
        value((), tag("%")),
    ))(input)
}

/// A combinator that recognises an arbitrary amount of whitespace and
/// comments.
fn multispace_or_comment0(input: Span) -> IntermediateResult<()> {
    value((), many0(alt((value((), multispace1), comment))))(input)
}

/// A combinator that creates a parser for a specific token,
/// surrounded by whitespace or comments.
fn space_delimited_token<'a>(
    token: &'a str,
) -> impl FnMut(Span<'a>) -> IntermediateResult<'a, Span<'a>> + 'a {
    map_error(
        delimited(multispace_or_comment0, tag(token), multispace_or_comment0),
        || ParseError::ExpectedToken(token.to_string()),
    )
}

/// Parse a bare name, used for predicates, variables and constants.
fn parse_bare_name(input: Span<'_>) -> IntermediateResult<Span<'_>> {
    map_error(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0(satisfy(|c| c.is_alphanumeric() || c == '_')),
        )),
        || ParseError::ExpectedBareName,
    )(input)
}

fn parse_variable_name(input: Span<'_>) -> IntermediateResult<Span<'_>> {
    map_error(parse_bare_name, || ParseError::ExpectedVariableName)(input)
}

fn parse_universal_variable(input: Span<'_>) -> IntermediateResult<ParsedTerm<'_>> {
    traced(
        "parse_universal_variable",
        map_error(
            map(
                preceded(char('?'), cut(parse_variable_name)),
                ParsedTerm::Universal,
            ),
            || ParseError::ExpectedUniversalVariable,
        ),
    )(input)
}

fn parse_existential_variable(input: Span<'_>) -> IntermediateResult<ParsedTerm<'_>> {
    traced(
        "parse_existential_variable",
        map_error(
            map(
                preceded(char('!'), cut(parse_variable_name)),
                ParsedTerm::Existential,
            ),
            || ParseError::ExpectedExistentialVariable,
        ),
    )(input)
}

fn parse_constant(input: Span<'_>) -> IntermediateResult<ParsedTerm<'_>> {
    traced(
        "parse_constant",
        map_error(
            map(
                alt((
                    parse_bare_name,
                    recognize(pair(opt(char('-')), digit1)),
                    recognize(delimited(char('"'), opt(is_not("\"")), char('"'))),
                )),
                ParsedTerm::Constant,
            ),
            || ParseError::ExpectedConstant,
        ),
    )(input)
}

fn parse_term(input: Span<'_>) -> IntermediateResult<ParsedTerm<'_>> {
    traced(
        "parse_term",
        map_error(
            alt((
                parse_universal_variable,
                parse_existential_variable,
                parse_constant,
            )),
            || ParseError::ExpectedTerm,
        ),
    )(input)
}

fn parse_atom(input: Span<'_>) -> IntermediateResult<ParsedAtom<'_>> {
    traced(
        "parse_atom",
        map_error(
            move |input| {
                let (remainder, predicate) = parse_bare_name(input)?;
                let (remainder, terms) = delimited(
                    space_delimited_token("("),
                    cut(separated_list0(space_delimited_token(","), parse_term)),
                    cut(space_delimited_token(")")),
                )(remainder)?;

                Ok((remainder, ParsedAtom { predicate, terms }))
            },
            || ParseError::ExpectedAtom,
        ),
    )(input)
}

fn parse_rule(input: Span<'_>) -> IntermediateResult<ParsedRule<'_>> {
    traced(
        "parse_rule",
        map_error(
            move |input| {
                let (remainder, (head, body)) = pair(
                    terminated(
                        separated_list1(space_delimited_token(","), parse_atom),
                        space_delimited_token(":-"),
                    ),
                    cut(terminated(
                        separated_list1(space_delimited_token(","), parse_atom),
                        space_delimited_token("."),
                    )),
                )(input)?;

                Ok((remainder, ParsedRule { head, body }))
            },
            || ParseError::ExpectedRule,
        ),
    )(input)
}

fn parse_rules(input: Span<'_>) -> IntermediateResult<Vec<ParsedRule<'_>>> {
    traced("parse_rules", move |input| {
        let (remainder, _) = multispace_or_comment0(input)?;
        let (remainder, rules) = many0(terminated(parse_rule, multispace_or_comment0))(remainder)?;

        if !remainder.is_empty() {
            // Reparse to obtain the error of the offending statement
            return match parse_rule(remainder) {
                Err(error) => Err(error),
                Ok(_) => Err(Err::Failure(ParseError::ExpectedRule.at(remainder))),
            };
        }

        Ok((remainder, rules))
    })(input)
}

/// Register a new variable name and return its index.
fn next_variable(name: &str, names: &mut Vec<String>) -> VariableIndex {
    names.push(name.to_string());
    names.len() as VariableIndex
}

/// Converts parsed rules into [`Rule`]s,
/// numbering variables and checking quantifier restrictions.
#[derive(Debug, Default)]
struct ProgramBuilder {
    symbols: SymbolTable,
    rules: Vec<Rule>,
}

impl ProgramBuilder {
    fn add_rule(&mut self, parsed: ParsedRule<'_>) -> ParseResult<()> {
        let mut variables = HashMap::<&str, VariableIndex>::new();
        let mut names = Vec::<String>::new();
        let mut existential_names = HashSet::<&str>::new();

        for atom in &parsed.body {
            for term in &atom.terms {
                match term {
                    ParsedTerm::Existential(name) => {
                        return Err(ParseError::BodyExistential(name.fragment().to_string()).at(*name))
                    }
                    ParsedTerm::Universal(name) => {
                        if !variables.contains_key(name.fragment()) {
                            let index = next_variable(name.fragment(), &mut names);
                            variables.insert(name.fragment(), index);
                        }
                    }
                    ParsedTerm::Constant(_) => {}
                }
            }
        }

        for atom in &parsed.head {
            for term in &atom.terms {
                if let ParsedTerm::Existential(name) = term {
                    if variables.contains_key(name.fragment()) {
                        return Err(
                            ParseError::BothQuantifiers(name.fragment().to_string()).at(*name)
                        );
                    }

                    existential_names.insert(name.fragment());
                }
            }
        }

        for atom in &parsed.head {
            for term in &atom.terms {
                match term {
                    ParsedTerm::Universal(name) => {
                        if existential_names.contains(name.fragment()) {
                            return Err(
                                ParseError::BothQuantifiers(name.fragment().to_string()).at(*name)
                            );
                        }
                        if !variables.contains_key(name.fragment()) {
                            return Err(ParseError::UnsafeHeadVariable(
                                name.fragment().to_string(),
                            )
                            .at(*name));
                        }
                    }
                    ParsedTerm::Existential(name) => {
                        if !variables.contains_key(name.fragment()) {
                            let index = next_variable(name.fragment(), &mut names);
                            variables.insert(name.fragment(), index);
                        }
                    }
                    ParsedTerm::Constant(_) => {}
                }
            }
        }

        let head = self.convert_atoms(&parsed.head, &variables)?;
        let body = self.convert_atoms(&parsed.body, &variables)?;

        let rule = Rule::new(head, body).with_variable_names(names);
        log::trace!(target: "parser", "found rule {rule:?}");

        self.rules.push(rule);
        Ok(())
    }

    fn convert_atoms(
        &mut self,
        atoms: &[ParsedAtom<'_>],
        variables: &HashMap<&str, VariableIndex>,
    ) -> ParseResult<Vec<Literal>> {
        let mut result = Vec::with_capacity(atoms.len());

        for atom in atoms {
            let (predicate, arity) = self
                .symbols
                .intern_predicate(atom.predicate.fragment(), atom.terms.len());

            if arity != atom.terms.len() {
                return Err(ParseError::ArityMismatch {
                    predicate: atom.predicate.fragment().to_string(),
                    expected: arity,
                    found: atom.terms.len(),
                }
                .at(atom.predicate));
            }

            let mut terms = Vec::with_capacity(atom.terms.len());
            for term in &atom.terms {
                let converted = match term {
                    ParsedTerm::Universal(name) => variables
                        .get(name.fragment())
                        .map(|index| Term::Universal(*index)),
                    ParsedTerm::Existential(name) => variables
                        .get(name.fragment())
                        .map(|index| Term::Existential(*index)),
                    ParsedTerm::Constant(name) => {
                        Some(Term::Constant(self.symbols.intern_constant(name.fragment())))
                    }
                };

                match converted {
                    Some(converted) => terms.push(converted),
                    None => return Err(ParseError::ExpectedTerm.at(atom.predicate)),
                }
            }

            result.push(Literal::new(predicate, terms));
        }

        Ok(result)
    }

    fn finish(self) -> Program {
        Program::new(self.rules, self.symbols)
    }
}
