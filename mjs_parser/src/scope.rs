/// Tracks which restricted grammar positions are legal at the parser's
/// current nesting point, mirroring the teacher's packed `ScopeState`.
#[derive(Debug, Clone, Copy, Default)]
#[repr(packed)]
pub struct ScopeState {
    pub is_loop: bool,
    pub is_switch: bool,
    pub is_function: bool,
}

impl ScopeState {
    pub fn function_body() -> Self {
        Self {
            is_loop: false,
            is_switch: false,
            is_function: true,
        }
    }

    pub fn enter_loop(self) -> Self {
        Self {
            is_loop: true,
            ..self
        }
    }

    pub fn enter_switch(self) -> Self {
        Self {
            is_switch: true,
            ..self
        }
    }

    /// `break` is legal directly inside a loop or a `switch`; `continue`
    /// only inside a loop.
    pub fn allows_break(self) -> bool {
        { self.is_loop } || { self.is_switch }
    }

    pub fn allows_continue(self) -> bool {
        { self.is_loop }
    }
}
