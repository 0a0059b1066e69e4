//! Structured diagnostics handed to presentation layers.
//!
//! The kernel and frontend phases return typed errors; a [`Diagnostic`] is
//! the flattened, render-ready view of one of them: phase, stable code,
//! message, main span and optional extra labels. Rendering (color, source
//! excerpts) is the consumer's business.

use crate::surface::Span;
use std::fmt;

/// The pipeline phase an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Tokenize,
    Parse,
    Context,
    Typecheck,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Tokenize => write!(f, "tokenize"),
            Phase::Parse => write!(f, "parse"),
            Phase::Context => write!(f, "context"),
            Phase::Typecheck => write!(f, "typecheck"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub phase: Phase,
    pub code: &'static str,
    pub message: String,
    pub span: Option<Span>,
    pub labels: Vec<(Span, String)>,
}

impl Diagnostic {
    pub fn new(phase: Phase, code: &'static str, message: String) -> Self {
        Diagnostic {
            phase,
            code,
            message,
            span: None,
            labels: Vec::new(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_label(mut self, span: Span, message: String) -> Self {
        self.labels.push((span, message));
        self
    }

    pub fn message_with_code(&self) -> String {
        format!("[{}] {}", self.code, self.message)
    }
}
