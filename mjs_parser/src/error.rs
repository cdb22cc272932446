use miette::{Diagnostic, SourceSpan};
use mjs_lexer::LexError;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SyntaxError {
    #[error("{message}")]
    Lex {
        message: String,
        #[label("{message}")]
        span: SourceSpan,
    },
    #[error("{message}")]
    Parse {
        message: String,
        #[label("{message}")]
        span: SourceSpan,
    },
}

impl SyntaxError {
    pub fn parse(message: impl Into<String>, byte_offset: u32) -> Self {
        SyntaxError::Parse {
            message: message.into(),
            span: SourceSpan::from((byte_offset as usize, 0)),
        }
    }
}

impl From<LexError> for SyntaxError {
    fn from(e: LexError) -> Self {
        SyntaxError::Lex {
            message: e.message,
            span: e.span,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyntaxError>;
