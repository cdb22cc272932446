use std::rc::Rc;

use mjs_heap::Value;

/// Statement evaluation's outcome: normal completions carry a result value
/// only incidentally (the last expression statement's value, used by
/// `eval`'s return), while the four abrupt kinds carry the payload their
/// corresponding statement produced and propagate outward until a matching
/// statement handles them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Normal,
    Break,
    Continue,
    Return,
    Throw,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub kind: CompletionKind,
    pub value: Value,
    pub target: Option<Rc<str>>,
}

impl Completion {
    pub fn normal(value: Value) -> Self {
        Self {
            kind: CompletionKind::Normal,
            value,
            target: None,
        }
    }

    pub fn empty() -> Self {
        Self::normal(Value::Undefined)
    }

    pub fn break_(target: Option<Rc<str>>) -> Self {
        Self {
            kind: CompletionKind::Break,
            value: Value::Undefined,
            target,
        }
    }

    pub fn continue_(target: Option<Rc<str>>) -> Self {
        Self {
            kind: CompletionKind::Continue,
            value: Value::Undefined,
            target,
        }
    }

    pub fn return_(value: Value) -> Self {
        Self {
            kind: CompletionKind::Return,
            value,
            target: None,
        }
    }

    pub fn throw(value: Value) -> Self {
        Self {
            kind: CompletionKind::Throw,
            value,
            target: None,
        }
    }

    pub fn is_normal(&self) -> bool {
        self.kind == CompletionKind::Normal
    }

    pub fn is_abrupt(&self) -> bool {
        self.kind != CompletionKind::Normal
    }

    /// Whether this `break`/`continue` is satisfied by an enclosing loop or
    /// switch whose own label set is `labels`: an untargeted completion is
    /// always satisfied, a targeted one only if its label appears here.
    pub fn targets(&self, labels: &[Rc<str>]) -> bool {
        match &self.target {
            None => true,
            Some(label) => labels.iter().any(|l| l == label),
        }
    }
}
