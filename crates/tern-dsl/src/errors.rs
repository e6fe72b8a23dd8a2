#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

use crate::ast::Span;

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("Syntax error: {message}")]
    #[diagnostic(code(tern::parse::syntax))]
    Syntax {
        message: String,
        #[label("here")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("Duplicate definition: {name}")]
    #[diagnostic(code(tern::parse::duplicate))]
    Duplicate {
        name: String,
        #[label("duplicate")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("next() applied to an expression that already refers to the next state")]
    #[diagnostic(
        code(tern::parse::nested_next),
        help("next-state references cannot be nested")
    )]
    NestedNext {
        #[label("nested next")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("Bit-vector width {width} is out of range")]
    #[diagnostic(
        code(tern::parse::bv_width),
        help("widths from 1 to 62 are supported")
    )]
    BadWidth {
        width: u64,
        #[label("width")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("Unknown state label '{name}'")]
    #[diagnostic(code(tern::parse::unknown_state))]
    UnknownState {
        name: String,
        #[label("not defined in STATES")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("Missing required section: {section}")]
    #[diagnostic(code(tern::parse::missing_section))]
    MissingSection { section: String },
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, span: Span, source: &str, filename: &str) -> Self {
        ParseError::Syntax {
            message: message.into(),
            span: to_source_span(span),
            src: miette::NamedSource::new(filename, source.to_owned()),
        }
    }

    pub fn duplicate(name: impl Into<String>, span: Span) -> Self {
        ParseError::Duplicate {
            name: name.into(),
            span: to_source_span(span),
            src: empty_source(),
        }
    }

    pub fn nested_next(span: Span) -> Self {
        ParseError::NestedNext {
            span: to_source_span(span),
            src: empty_source(),
        }
    }

    pub fn bad_width(width: u64, span: Span) -> Self {
        ParseError::BadWidth {
            width,
            span: to_source_span(span),
            src: empty_source(),
        }
    }

    pub fn unknown_state(name: impl Into<String>, span: Span) -> Self {
        ParseError::UnknownState {
            name: name.into(),
            span: to_source_span(span),
            src: empty_source(),
        }
    }

    /// Attach the source text and filename so miette can render snippets.
    ///
    /// Errors raised while walking the parse tree carry byte offsets only.
    pub fn with_source_context(self, source: &str, filename: &str) -> Self {
        let src = || miette::NamedSource::new(filename, source.to_owned());
        match self {
            ParseError::Syntax { message, span, .. } => ParseError::Syntax {
                message,
                span,
                src: src(),
            },
            ParseError::Duplicate { name, span, .. } => ParseError::Duplicate {
                name,
                span,
                src: src(),
            },
            ParseError::NestedNext { span, .. } => ParseError::NestedNext { span, src: src() },
            ParseError::BadWidth { width, span, .. } => ParseError::BadWidth {
                width,
                span,
                src: src(),
            },
            ParseError::UnknownState { name, span, .. } => ParseError::UnknownState {
                name,
                span,
                src: src(),
            },
            other => other,
        }
    }
}

fn to_source_span(span: Span) -> miette::SourceSpan {
    (span.start, span.end.saturating_sub(span.start)).into()
}

fn empty_source() -> miette::NamedSource<String> {
    miette::NamedSource::new("", String::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_syntax_error() {
        let err = ParseError::syntax("unexpected EOF", Span::new(0, 5), "hello", "m.sts");
        assert_eq!(err.to_string(), "Syntax error: unexpected EOF");
    }

    #[test]
    fn syntax_constructor_computes_length() {
        let err = ParseError::syntax("bad token", Span::new(5, 10), "some source code", "m.sts");
        match &err {
            ParseError::Syntax { span, .. } => {
                assert_eq!(span.offset(), 5);
                assert_eq!(span.len(), 5);
            }
            _ => panic!("expected Syntax variant"),
        }
    }

    #[test]
    fn with_source_context_enriches_span_only_errors() {
        let err = ParseError::unknown_state("S9", Span::new(0, 2));
        match err.with_source_context("S9 -> I;", "m.ets") {
            ParseError::UnknownState { src, name, .. } => {
                assert_eq!(src.name(), "m.ets");
                assert_eq!(name, "S9");
            }
            _ => panic!("expected UnknownState variant"),
        }
    }

    #[test]
    fn display_missing_section_error() {
        let err = ParseError::MissingSection {
            section: "STATES".into(),
        };
        assert_eq!(err.to_string(), "Missing required section: STATES");
    }
}
