use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct LexError {
    pub message: String,
    #[label("{message}")]
    pub span: SourceSpan,
    pub byte_offset: u32,
}

impl LexError {
    pub fn new(message: impl Into<String>, byte_offset: u32) -> Self {
        let message = message.into();
        Self {
            message,
            span: SourceSpan::from((byte_offset as usize, 0)),
            byte_offset,
        }
    }
}
