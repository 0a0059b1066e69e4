//! The composed checking pipeline: tokenize, parse, scope-check, elaborate,
//! type-check. One call, one result; the first failing phase wins.

use crate::diagnostics::{Diagnostic, Phase};
use crate::elaborator;
use crate::parser::{ParseError, Parser};
use crate::scope::{self, ScopeError};
use crate::surface::Span;
use crate::token::TokenError;
use kernel::checker::check_context;
use kernel::{JudgContext, WFError};
use thiserror::Error;

// Stable diagnostic codes, one per error tag.
const CODE_UNEXPECTED_CHAR: &str = "K0001";
const CODE_UNCLOSED_COMMENT: &str = "K0002";
const CODE_UNEXPECTED_TOKEN: &str = "K0101";
const CODE_DUPLICATE_GLOBAL: &str = "K0201";
const CODE_DUPLICATE_LOCAL: &str = "K0202";
const CODE_SELF_REFERENCE: &str = "K0203";
const CODE_UNDEFINED: &str = "K0204";
const CODE_CYCLE: &str = "K0205";
const CODE_TYPE_HAS_NO_TYPE: &str = "K0301";
const CODE_UNBOUND_VARIABLE: &str = "K0302";
const CODE_EXPECTED_SORT: &str = "K0303";
const CODE_EXPECTED_PI: &str = "K0304";
const CODE_EXPECTED_SIGMA: &str = "K0305";
const CODE_IMPOSSIBLE_COMBINATION: &str = "K0306";
const CODE_TYPE_MISMATCH: &str = "K0307";

/// Any failure of the pipeline, tagged by phase.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Scope(#[from] ScopeError),
    #[error("{error}")]
    Typecheck {
        error: WFError,
        /// The name span of the declaration the error occurred in.
        span: Option<Span>,
    },
}

impl PipelineError {
    pub fn phase(&self) -> Phase {
        match self {
            PipelineError::Parse(ParseError::Token(_)) => Phase::Tokenize,
            PipelineError::Parse(_) => Phase::Parse,
            PipelineError::Scope(_) => Phase::Context,
            PipelineError::Typecheck { .. } => Phase::Typecheck,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Parse(ParseError::Token(TokenError::UnexpectedChar(..))) => {
                CODE_UNEXPECTED_CHAR
            }
            PipelineError::Parse(ParseError::Token(TokenError::UnclosedComment(_))) => {
                CODE_UNCLOSED_COMMENT
            }
            PipelineError::Parse(ParseError::UnexpectedToken { .. }) => CODE_UNEXPECTED_TOKEN,
            PipelineError::Scope(ScopeError::DuplicateGlobal { .. }) => CODE_DUPLICATE_GLOBAL,
            PipelineError::Scope(ScopeError::DuplicateLocal { .. }) => CODE_DUPLICATE_LOCAL,
            PipelineError::Scope(ScopeError::SelfReference { .. }) => CODE_SELF_REFERENCE,
            PipelineError::Scope(ScopeError::Undefined { .. }) => CODE_UNDEFINED,
            PipelineError::Scope(ScopeError::Cycle { .. }) => CODE_CYCLE,
            PipelineError::Typecheck { error, .. } => match error.error {
                kernel::TypeError::TypeHasNoType => CODE_TYPE_HAS_NO_TYPE,
                kernel::TypeError::UnboundVariable(_) => CODE_UNBOUND_VARIABLE,
                kernel::TypeError::ExpectedSort(_) => CODE_EXPECTED_SORT,
                kernel::TypeError::ExpectedPi { .. } => CODE_EXPECTED_PI,
                kernel::TypeError::ExpectedSigma { .. } => CODE_EXPECTED_SIGMA,
                kernel::TypeError::ImpossibleCombination(..) => CODE_IMPOSSIBLE_COMBINATION,
                kernel::TypeError::TypeMismatch { .. } => CODE_TYPE_MISMATCH,
            },
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            PipelineError::Parse(err) => Some(err.span()),
            PipelineError::Scope(err) => match err {
                ScopeError::DuplicateGlobal { span, .. }
                | ScopeError::DuplicateLocal { span, .. }
                | ScopeError::SelfReference { span, .. }
                | ScopeError::Undefined { span, .. }
                | ScopeError::Cycle { span, .. } => Some(*span),
            },
            PipelineError::Typecheck { span, .. } => *span,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diagnostic = Diagnostic::new(self.phase(), self.code(), self.to_string());
        if let Some(span) = self.span() {
            diagnostic = diagnostic.with_span(span);
        }
        if let PipelineError::Typecheck { error, span } = self {
            if let Some(span) = span {
                diagnostic =
                    diagnostic.with_label(*span, format!("while checking `{}`", error.at.name()));
            }
        }
        diagnostic
    }
}

/// Runs the whole pipeline over one source string (line endings normalized
/// to `\n`). On success, the checked global context.
pub fn check_source(source: &str) -> Result<JudgContext, PipelineError> {
    let mut parser = Parser::new(source);
    let program = parser.parse_program()?;
    let order = scope::check_program(&program)?;
    // Forward references between globals are fine as long as the use graph
    // is acyclic; the kernel sees the declarations dependencies-first.
    let globals = order
        .into_iter()
        .map(|i| elaborator::elaborate_decl(&program.decls[i]))
        .collect::<Vec<_>>();
    check_context(globals).map_err(|error| {
        let span = program
            .decls
            .iter()
            .find(|decl| decl.name.name == error.at.name())
            .map(|decl| decl.name.span);
        PipelineError::Typecheck { error, span }
    })
}
