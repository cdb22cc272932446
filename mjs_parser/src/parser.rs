use std::rc::Rc;

use mjs_ast::{
    Ast, AssignOp, BinaryOp, ForInBinding, FunctionNode, MemberProp, Node, NodeId, ObjectProperty,
    PostfixOp, PrefixOp, PropertyKey, PropertyKind, SourceExtend, SourceFile, SwitchCase, Version,
};
use mjs_lexer::{is_strict_reserved_word, Keyword, Lexer, Token};

use crate::error::{Result, SyntaxError};
use crate::scope::ScopeState;

/// Recursive-descent parser over a single source file. Builds an [`Ast`]
/// directly rather than an intermediate tree, so every node is inserted
/// exactly once with its source extend attached at the point it's known.
pub struct Parser {
    lex: Lexer,
    ast: Ast,
    file: Rc<SourceFile>,
    version: Version,
    /// Whether the current parse position is inside strict-mode code.
    /// Saved and restored around each function/program body so a nested
    /// directive prologue's effect doesn't leak to the enclosing scope.
    strict: bool,
    /// Suppresses treating `in` as a binary operator while parsing a
    /// `for (...)` head's init expression, so `for (x in y)` can be
    /// disambiguated from a binary `in` expression.
    no_in: bool,
    prev_end: u32,
}

/// Parses a complete program and returns its arena plus the `Node::Program`
/// root. `filename` is only used for diagnostics.
pub fn parse_program(source: &str, filename: &str, version: Version) -> Result<(Ast, NodeId)> {
    let file = SourceFile::new(filename, source, version);
    let mut parser = Parser {
        lex: Lexer::new(file.text(), version),
        ast: Ast::new(),
        file: file.clone(),
        version,
        strict: false,
        no_in: false,
        prev_end: 0,
    };
    parser.advance()?;
    let start = parser.lex.token_start();
    let (body, strict) =
        parser.parse_statement_list(|t| matches!(t, Token::Eof), ScopeState::default())?;
    if !matches!(parser.lex.token, Token::Eof) {
        return Err(parser.error("expected end of input"));
    }
    let program = parser.finish(start, Node::Program { body, strict });
    Ok((parser.ast, program))
}

impl Parser {
    // ---- token plumbing -------------------------------------------------

    fn advance(&mut self) -> Result<()> {
        self.prev_end = self.lex.byte_offset();
        self.lex.next()?;
        Ok(())
    }

    fn at(&self, t: &Token) -> bool {
        &self.lex.token == t
    }

    fn eat(&mut self, t: Token) -> Result<bool> {
        if self.lex.token == t {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, t: Token) -> Result<()> {
        if self.lex.token == t {
            self.advance()
        } else {
            Err(self.error(format!("expected {t:?}, found {:?}", self.lex.token)))
        }
    }

    /// Automatic semicolon insertion (spec.md §4.3): a literal `;` is always
    /// fine; otherwise insertion is allowed only at EOF, before `}`, or when
    /// a line terminator separated the previous token from this one.
    fn expect_semicolon(&mut self) -> Result<()> {
        if self.eat(Token::Semi)? {
            return Ok(());
        }
        if self.at(&Token::Eof) || self.at(&Token::RBrace) || self.lex.has_newline_before {
            return Ok(());
        }
        Err(self.error("expected ';'"))
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::parse(message, self.lex.token_start())
    }

    fn error_at(&self, node: NodeId, message: impl Into<String>) -> SyntaxError {
        let offset = self.ast.extend(node).map(|e| e.start).unwrap_or(self.lex.token_start());
        SyntaxError::parse(message, offset)
    }

    fn finish(&mut self, start: u32, node: Node) -> NodeId {
        let extend = SourceExtend::new(self.file.clone(), start, self.prev_end);
        self.ast.insert(node, extend)
    }

    /// The exact quoted source text of a node, if it has one recorded.
    fn node_text(&self, node: NodeId) -> Option<&str> {
        self.ast.extend(node).map(|e| e.text())
    }

    // ---- statements -------------------------------------------------------

    /// Parses statements until `terminator` matches the lookahead token (or
    /// EOF), tracking the directive prologue to decide the body's strict-
    /// ness. Returns `(statements, strict)`; `strict` already accounts for
    /// the enclosing scope, so callers don't need to OR it in themselves.
    fn parse_statement_list(
        &mut self,
        terminator: impl Fn(&Token) -> bool,
        state: ScopeState,
    ) -> Result<(Vec<NodeId>, bool)> {
        let enclosing_strict = self.strict;
        let mut body = Vec::new();
        let mut in_prologue = true;
        let mut directive_strict = false;
        while !terminator(&self.lex.token) && !self.at(&Token::Eof) {
            let stmt = self.parse_statement(state)?;
            if in_prologue {
                if let Node::ExprStmt(expr) = self.ast.get(stmt) {
                    let expr = *expr;
                    if matches!(self.ast.get(expr), Node::StringLiteral(_)) {
                        if let Some(text) = self.node_text(expr) {
                            if text == "\"use strict\"" || text == "'use strict'" {
                                directive_strict = true;
                                self.strict = true;
                            }
                        }
                    } else {
                        in_prologue = false;
                    }
                } else {
                    in_prologue = false;
                }
            }
            body.push(stmt);
        }
        let strict = enclosing_strict || directive_strict;
        self.strict = enclosing_strict;
        Ok((body, strict))
    }

    fn parse_statement(&mut self, state: ScopeState) -> Result<NodeId> {
        match &self.lex.token {
            Token::LBrace => self.parse_block(state),
            Token::Keyword(Keyword::Var) => {
                let id = self.parse_var_decl()?;
                self.expect_semicolon()?;
                Ok(id)
            }
            Token::Keyword(Keyword::Debugger) => {
                let start = self.lex.token_start();
                self.advance()?;
                self.expect_semicolon()?;
                Ok(self.finish(start, Node::Debugger))
            }
            Token::Semi => {
                self.advance()?;
                Ok(Ast::empty())
            }
            Token::Keyword(Keyword::If) => self.parse_if(state),
            Token::Keyword(Keyword::Do) => self.parse_do_while(state),
            Token::Keyword(Keyword::While) => self.parse_while(state),
            Token::Keyword(Keyword::For) => self.parse_for(state),
            Token::Keyword(Keyword::Continue) => self.parse_continue(state),
            Token::Keyword(Keyword::Break) => self.parse_break(state),
            Token::Keyword(Keyword::Return) => self.parse_return(state),
            Token::Keyword(Keyword::With) => self.parse_with(state),
            Token::Keyword(Keyword::Switch) => self.parse_switch(state),
            Token::Keyword(Keyword::Throw) => self.parse_throw(),
            Token::Keyword(Keyword::Try) => self.parse_try(state),
            Token::Keyword(Keyword::Function) => self.parse_function_declaration(),
            Token::Ident(_) => self.parse_identifier_or_label_statement(state),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_block(&mut self, state: ScopeState) -> Result<NodeId> {
        let start = self.lex.token_start();
        self.expect(Token::LBrace)?;
        let (body, strict) = self.parse_statement_list(|t| matches!(t, Token::RBrace), state)?;
        self.expect(Token::RBrace)?;
        Ok(self.finish(start, Node::Block { body, strict }))
    }

    fn parse_var_decl(&mut self) -> Result<NodeId> {
        let start = self.lex.token_start();
        self.expect(Token::Keyword(Keyword::Var))?;
        let mut decls = Vec::new();
        loop {
            let name = self.binding_identifier()?;
            let init = if self.eat(Token::Equal)? {
                self.parse_assignment_expression()?
            } else {
                Ast::empty()
            };
            decls.push((name, init));
            if !self.eat(Token::Comma)? {
                break;
            }
        }
        Ok(self.finish(start, Node::VarDecl(decls)))
    }

    fn parse_if(&mut self, state: ScopeState) -> Result<NodeId> {
        let start = self.lex.token_start();
        self.advance()?;
        self.expect(Token::LParen)?;
        let test = self.parse_expression()?;
        self.expect(Token::RParen)?;
        let consequent = self.parse_statement(state)?;
        let alternate = if self.eat(Token::Keyword(Keyword::Else))? {
            self.parse_statement(state)?
        } else {
            Ast::empty()
        };
        Ok(self.finish(
            start,
            Node::If { test, consequent, alternate },
        ))
    }

    fn parse_do_while(&mut self, state: ScopeState) -> Result<NodeId> {
        let start = self.lex.token_start();
        self.advance()?;
        let body = self.parse_statement(state.enter_loop())?;
        self.expect(Token::Keyword(Keyword::While))?;
        self.expect(Token::LParen)?;
        let test = self.parse_expression()?;
        self.expect(Token::RParen)?;
        // A trailing `;` after `do...while(...)` is not required by ASI at
        // all; treat a missing one the same as any other statement.
        self.eat(Token::Semi)?;
        Ok(self.finish(start, Node::DoWhile { body, test }))
    }

    fn parse_while(&mut self, state: ScopeState) -> Result<NodeId> {
        let start = self.lex.token_start();
        self.advance()?;
        self.expect(Token::LParen)?;
        let test = self.parse_expression()?;
        self.expect(Token::RParen)?;
        let body = self.parse_statement(state.enter_loop())?;
        Ok(self.finish(start, Node::While { test, body }))
    }

    /// Handles all three `for` head shapes: `for (var ...)`, `for (;;)` and
    /// `for (expr...)`, upgrading to a `for-in` when `in` follows a single
    /// binding/expression instead of the expected `;`.
    fn parse_for(&mut self, state: ScopeState) -> Result<NodeId> {
        let start = self.lex.token_start();
        self.advance()?;
        self.expect(Token::LParen)?;

        if self.at(&Token::Keyword(Keyword::Var)) {
            let var_start = self.lex.token_start();
            self.advance()?;
            let name = self.binding_identifier()?;
            if self.eat(Token::Keyword(Keyword::In))? {
                let object = self.parse_expression()?;
                self.expect(Token::RParen)?;
                let body = self.parse_statement(state.enter_loop())?;
                return Ok(self.finish(
                    start,
                    Node::ForIn { binding: ForInBinding::Var(name), object, body },
                ));
            }
            let init = if self.eat(Token::Equal)? {
                self.no_in = true;
                let v = self.parse_assignment_expression();
                self.no_in = false;
                v?
            } else {
                Ast::empty()
            };
            let mut decls = vec![(name, init)];
            while self.eat(Token::Comma)? {
                let name = self.binding_identifier()?;
                let init = if self.eat(Token::Equal)? {
                    self.no_in = true;
                    let v = self.parse_assignment_expression();
                    self.no_in = false;
                    v?
                } else {
                    Ast::empty()
                };
                decls.push((name, init));
            }
            let init = self.finish(var_start, Node::VarDecl(decls));
            self.expect(Token::Semi)?;
            return self.parse_for_rest(start, init, state);
        }

        if self.eat(Token::Semi)? {
            return self.parse_for_rest(start, Ast::empty(), state);
        }

        self.no_in = true;
        let init = self.parse_expression();
        self.no_in = false;
        let init = init?;

        if self.eat(Token::Keyword(Keyword::In))? {
            let binding = self.expression_to_for_in_binding(init)?;
            let object = self.parse_expression()?;
            self.expect(Token::RParen)?;
            let body = self.parse_statement(state.enter_loop())?;
            return Ok(self.finish(start, Node::ForIn { binding, object, body }));
        }

        self.expect(Token::Semi)?;
        self.parse_for_rest(start, init, state)
    }

    fn expression_to_for_in_binding(&self, expr: NodeId) -> Result<ForInBinding> {
        match self.ast.get(expr) {
            Node::Identifier(_) | Node::Member { .. } => Ok(ForInBinding::Pattern(expr)),
            _ => Err(self.error_at(expr, "invalid for-in left-hand side")),
        }
    }

    fn parse_for_rest(&mut self, start: u32, init: NodeId, state: ScopeState) -> Result<NodeId> {
        let test = if self.at(&Token::Semi) { Ast::empty() } else { self.parse_expression()? };
        self.expect(Token::Semi)?;
        let update = if self.at(&Token::RParen) { Ast::empty() } else { self.parse_expression()? };
        self.expect(Token::RParen)?;
        let body = self.parse_statement(state.enter_loop())?;
        Ok(self.finish(start, Node::For { init, test, update, body }))
    }

    fn parse_continue(&mut self, state: ScopeState) -> Result<NodeId> {
        let start = self.lex.token_start();
        self.advance()?;
        if !state.allows_continue() {
            return Err(self.error("'continue' outside of a loop"));
        }
        let label = self.parse_optional_label()?;
        self.expect_semicolon()?;
        Ok(self.finish(start, Node::Continue(label)))
    }

    fn parse_break(&mut self, state: ScopeState) -> Result<NodeId> {
        let start = self.lex.token_start();
        self.advance()?;
        let label = self.parse_optional_label()?;
        if label.is_none() && !state.allows_break() {
            return Err(self.error("'break' outside of a loop or switch"));
        }
        self.expect_semicolon()?;
        Ok(self.finish(start, Node::Break(label)))
    }

    /// `continue`/`break` take an optional label, but only if no line
    /// terminator separates the keyword from it (restricted production).
    fn parse_optional_label(&mut self) -> Result<Option<String>> {
        if self.lex.has_newline_before {
            return Ok(None);
        }
        if let Token::Ident(name) = &self.lex.token {
            let name = name.clone();
            self.advance()?;
            Ok(Some(name))
        } else {
            Ok(None)
        }
    }

    fn parse_return(&mut self, state: ScopeState) -> Result<NodeId> {
        let start = self.lex.token_start();
        self.advance()?;
        let value = if self.lex.has_newline_before
            || matches!(self.lex.token, Token::Semi | Token::RBrace | Token::Eof)
        {
            Ast::empty()
        } else {
            self.parse_expression()?
        };
        self.expect_semicolon()?;
        if !state.is_function {
            return Err(self.error("'return' outside of a function"));
        }
        Ok(self.finish(start, Node::Return(value)))
    }

    fn parse_with(&mut self, state: ScopeState) -> Result<NodeId> {
        let start = self.lex.token_start();
        if self.strict {
            return Err(self.error("'with' statements are not allowed in strict mode"));
        }
        self.advance()?;
        self.expect(Token::LParen)?;
        let object = self.parse_expression()?;
        self.expect(Token::RParen)?;
        let body = self.parse_statement(state)?;
        Ok(self.finish(start, Node::With { object, body }))
    }

    fn parse_switch(&mut self, state: ScopeState) -> Result<NodeId> {
        let start = self.lex.token_start();
        self.advance()?;
        self.expect(Token::LParen)?;
        let discriminant = self.parse_expression()?;
        self.expect(Token::RParen)?;
        self.expect(Token::LBrace)?;
        let inner_state = state.enter_switch();
        let mut cases = Vec::new();
        let mut seen_default = false;
        while !self.at(&Token::RBrace) {
            let test = if self.eat(Token::Keyword(Keyword::Default))? {
                if seen_default {
                    return Err(self.error("multiple 'default' clauses in switch"));
                }
                seen_default = true;
                None
            } else {
                self.expect(Token::Keyword(Keyword::Case))?;
                Some(self.parse_expression()?)
            };
            self.expect(Token::Colon)?;
            let mut body = Vec::new();
            while !matches!(
                self.lex.token,
                Token::RBrace | Token::Keyword(Keyword::Case) | Token::Keyword(Keyword::Default)
            ) {
                body.push(self.parse_statement(inner_state)?);
            }
            cases.push(SwitchCase { test, body });
        }
        self.expect(Token::RBrace)?;
        Ok(self.finish(start, Node::Switch { discriminant, cases }))
    }

    fn parse_throw(&mut self) -> Result<NodeId> {
        let start = self.lex.token_start();
        self.advance()?;
        // Restricted production: a line terminator right after `throw` is a
        // hard syntax error, unlike `return`'s silent ASI.
        if self.lex.has_newline_before {
            return Err(self.error("illegal newline after 'throw'"));
        }
        let value = self.parse_expression()?;
        self.expect_semicolon()?;
        Ok(self.finish(start, Node::Throw(value)))
    }

    fn parse_try(&mut self, state: ScopeState) -> Result<NodeId> {
        let start = self.lex.token_start();
        self.advance()?;
        let block = self.parse_block(state)?;
        let handler = if self.eat(Token::Keyword(Keyword::Catch))? {
            self.expect(Token::LParen)?;
            let param = self.binding_identifier()?;
            self.expect(Token::RParen)?;
            let catch_body = self.parse_block(state)?;
            Some((param, catch_body))
        } else {
            None
        };
        let finalizer = if self.eat(Token::Keyword(Keyword::Finally))? {
            Some(self.parse_block(state)?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.error("missing 'catch' or 'finally' after 'try'"));
        }
        Ok(self.finish(
            start,
            Node::Try { block, handler, finalizer },
        ))
    }

    fn parse_function_declaration(&mut self) -> Result<NodeId> {
        let start = self.lex.token_start();
        self.advance()?;
        let name = self.binding_identifier()?;
        let func = self.parse_function_rest(Some(name))?;
        Ok(self.finish(start, Node::FunctionDecl(func)))
    }

    /// `identifier ...` might be a labelled statement (`label: stmt`) or an
    /// ordinary expression statement starting with that identifier; the
    /// distinction needs one token of lookahead past the identifier, done
    /// with a cloned lexer so the main cursor isn't disturbed if it turns
    /// out not to be a label.
    fn parse_identifier_or_label_statement(&mut self, state: ScopeState) -> Result<NodeId> {
        let mut lookahead = self.lex.clone();
        lookahead.next()?;
        if matches!(lookahead.token, Token::Colon) {
            let start = self.lex.token_start();
            let label = self.binding_identifier()?;
            self.expect(Token::Colon)?;
            let body = self.parse_statement(state)?;
            return Ok(self.finish(start, Node::Labelled { label, body }));
        }
        self.parse_expression_statement()
    }

    fn parse_expression_statement(&mut self) -> Result<NodeId> {
        let start = self.lex.token_start();
        let expr = self.parse_expression()?;
        self.expect_semicolon()?;
        Ok(self.finish(start, Node::ExprStmt(expr)))
    }

    // ---- expressions --------------------------------------------------

    fn parse_expression(&mut self) -> Result<NodeId> {
        let start = self.lex.token_start();
        let first = self.parse_assignment_expression()?;
        if !self.at(&Token::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(Token::Comma)? {
            items.push(self.parse_assignment_expression()?);
        }
        Ok(self.finish(start, Node::Sequence(items)))
    }

    fn parse_assignment_expression(&mut self) -> Result<NodeId> {
        let start = self.lex.token_start();
        let left = self.parse_conditional_expression()?;
        if !self.lex.token.is_assignment_op() {
            return Ok(left);
        }
        let op = assign_op_of(&self.lex.token);
        self.check_valid_assignment_target(left)?;
        self.advance()?;
        let value = self.parse_assignment_expression()?;
        Ok(self.finish(start, Node::Assignment { op, target: left, value }))
    }

    fn check_valid_assignment_target(&self, target: NodeId) -> Result<()> {
        match self.ast.get(target) {
            Node::Identifier(name) => {
                if self.strict && (name == "eval" || name == "arguments") {
                    return Err(self.error_at(
                        target,
                        "cannot assign to 'eval' or 'arguments' in strict mode",
                    ));
                }
                Ok(())
            }
            Node::Member { .. } => Ok(()),
            _ => Err(self.error_at(target, "invalid assignment target")),
        }
    }

    fn parse_conditional_expression(&mut self) -> Result<NodeId> {
        let start = self.lex.token_start();
        let test = self.parse_binary_expression(5)?;
        if !self.eat(Token::Ternary)? {
            return Ok(test);
        }
        let no_in = self.no_in;
        self.no_in = false;
        let consequent = self.parse_assignment_expression();
        self.no_in = no_in;
        let consequent = consequent?;
        self.expect(Token::Colon)?;
        let alternate = self.parse_assignment_expression()?;
        Ok(self.finish(
            start,
            Node::Conditional { test, consequent, alternate },
        ))
    }

    /// Precedence-climbing loop over binary operators only. Every token
    /// with `binding_power() < 5` is either not a binary operator at all or
    /// belongs to a tier above this one (assignment, ternary, comma), so
    /// this loop never needs to special-case them.
    fn parse_binary_expression(&mut self, min_bp: u8) -> Result<NodeId> {
        let start = self.lex.token_start();
        let mut left = self.parse_unary_expression()?;
        loop {
            if self.no_in && matches!(self.lex.token, Token::Keyword(Keyword::In)) {
                break;
            }
            let bp = self.lex.token.binding_power();
            if bp < 5 || bp < min_bp {
                break;
            }
            let op_token = self.lex.token.clone();
            let next_min = if self.lex.token.is_right_associative() { bp } else { bp + 1 };
            self.advance()?;
            let right = self.parse_binary_expression(next_min)?;
            let op = binary_op_of(&op_token);
            left = self.finish(start, Node::Binary { op, left, right });
        }
        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> Result<NodeId> {
        let start = self.lex.token_start();
        let op = match &self.lex.token {
            Token::Add => Some(PrefixOp::Plus),
            Token::Sub => Some(PrefixOp::Minus),
            Token::Not => Some(PrefixOp::Not),
            Token::BitNot => Some(PrefixOp::BitNot),
            Token::Keyword(Keyword::TypeOf) => Some(PrefixOp::TypeOf),
            Token::Keyword(Keyword::Void) => Some(PrefixOp::Void),
            Token::Keyword(Keyword::Delete) => Some(PrefixOp::Delete),
            Token::Inc => Some(PrefixOp::PreIncrement),
            Token::Dec => Some(PrefixOp::PreDecrement),
            _ => None,
        };
        let Some(op) = op else { return self.parse_postfix_expression() };
        self.advance()?;
        let operand = self.parse_unary_expression()?;
        if matches!(op, PrefixOp::PreIncrement | PrefixOp::PreDecrement) {
            self.check_valid_assignment_target(operand)?;
        }
        Ok(self.finish(start, Node::Prefix { op, operand }))
    }

    fn parse_postfix_expression(&mut self) -> Result<NodeId> {
        let start = self.lex.token_start();
        let operand = self.parse_lhs_expression()?;
        // Restricted production: `++`/`--` only bind as postfix if no line
        // terminator separates them from the operand.
        if self.lex.has_newline_before {
            return Ok(operand);
        }
        let op = match self.lex.token {
            Token::Inc => Some(PostfixOp::PostIncrement),
            Token::Dec => Some(PostfixOp::PostDecrement),
            _ => None,
        };
        let Some(op) = op else { return Ok(operand) };
        self.check_valid_assignment_target(operand)?;
        self.advance()?;
        Ok(self.finish(start, Node::Postfix { op, operand }))
    }

    /// `.`/`[...]`/`(...)` chain following a `new`-or-primary base.
    fn parse_lhs_expression(&mut self) -> Result<NodeId> {
        let start = self.lex.token_start();
        let mut expr = self.parse_new_or_primary()?;
        loop {
            match &self.lex.token {
                Token::Dot => {
                    self.advance()?;
                    let name = self.identifier_name()?;
                    expr = self.finish(
                        start,
                        Node::Member { object: expr, property: MemberProp::Identifier(name) },
                    );
                }
                Token::LBrack => {
                    self.advance()?;
                    let index = self.parse_expression()?;
                    self.expect(Token::RBrack)?;
                    expr = self.finish(
                        start,
                        Node::Member { object: expr, property: MemberProp::Computed(index) },
                    );
                }
                Token::LParen => {
                    let args = self.parse_arguments()?;
                    expr = self.finish(start, Node::Call { callee: expr, args });
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Handles `new Foo(...)`, nested `new new Foo()`, and plain primaries.
    /// The callee of a `new` is parsed as a member-only chain (no call
    /// parens) so `new Foo().bar` binds `()`  to the `new`, not to `Foo`.
    fn parse_new_or_primary(&mut self) -> Result<NodeId> {
        if !matches!(self.lex.token, Token::Keyword(Keyword::New)) {
            return self.parse_primary_expression();
        }
        let start = self.lex.token_start();
        self.advance()?;
        let callee = self.parse_member_chain_no_call(start)?;
        let args = if self.at(&Token::LParen) { self.parse_arguments()? } else { Vec::new() };
        Ok(self.finish(start, Node::New { callee, args }))
    }

    fn parse_member_chain_no_call(&mut self, start: u32) -> Result<NodeId> {
        let mut expr = self.parse_new_or_primary()?;
        loop {
            match &self.lex.token {
                Token::Dot => {
                    self.advance()?;
                    let name = self.identifier_name()?;
                    expr = self.finish(
                        start,
                        Node::Member { object: expr, property: MemberProp::Identifier(name) },
                    );
                }
                Token::LBrack => {
                    self.advance()?;
                    let index = self.parse_expression()?;
                    self.expect(Token::RBrack)?;
                    expr = self.finish(
                        start,
                        Node::Member { object: expr, property: MemberProp::Computed(index) },
                    );
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_arguments(&mut self) -> Result<Vec<NodeId>> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        if !self.at(&Token::RParen) {
            loop {
                args.push(self.parse_assignment_expression()?);
                if !self.eat(Token::Comma)? {
                    break;
                }
            }
        }
        self.expect(Token::RParen)?;
        Ok(args)
    }

    fn identifier_name(&mut self) -> Result<String> {
        match &self.lex.token {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance()?;
                Ok(name)
            }
            Token::Keyword(kw) => {
                let name = keyword_text(*kw);
                self.advance()?;
                Ok(name.to_string())
            }
            _ => Err(self.error("expected a property name")),
        }
    }

    fn parse_primary_expression(&mut self) -> Result<NodeId> {
        let start = self.lex.token_start();
        match self.lex.token.clone() {
            Token::Keyword(Keyword::This) => {
                self.advance()?;
                Ok(self.finish(start, Node::This))
            }
            Token::Ident(name) => {
                if self.strict && is_strict_reserved_word(&name) {
                    return Err(self.error(format!("'{name}' is reserved in strict mode")));
                }
                self.advance()?;
                Ok(self.finish(start, Node::Identifier(name)))
            }
            Token::Number(value) => {
                let legacy_octal = self.lex.last_number_was_legacy_octal;
                self.advance()?;
                if self.strict && legacy_octal {
                    return Err(SyntaxError::parse(
                        "octal literals are not allowed in strict mode",
                        start,
                    ));
                }
                Ok(self.finish(start, Node::NumberLiteral(value)))
            }
            Token::String(value) => {
                self.advance()?;
                Ok(self.finish(start, Node::StringLiteral(value)))
            }
            Token::Keyword(Keyword::Null) => {
                self.advance()?;
                Ok(self.finish(start, Node::NullLiteral))
            }
            Token::Keyword(Keyword::True) => {
                self.advance()?;
                Ok(self.finish(start, Node::BooleanLiteral(true)))
            }
            Token::Keyword(Keyword::False) => {
                self.advance()?;
                Ok(self.finish(start, Node::BooleanLiteral(false)))
            }
            Token::LParen => {
                self.advance()?;
                let no_in = self.no_in;
                self.no_in = false;
                let expr = self.parse_expression();
                self.no_in = no_in;
                let expr = expr?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::LBrack => self.parse_array_literal(),
            Token::LBrace => self.parse_object_literal(),
            Token::Keyword(Keyword::Function) => {
                self.advance()?;
                let name = if let Token::Ident(name) = self.lex.token.clone() {
                    self.advance()?;
                    Some(name)
                } else {
                    None
                };
                let func = self.parse_function_rest(name)?;
                Ok(self.finish(start, Node::FunctionExpr(func)))
            }
            Token::Div | Token::DivAssign => {
                self.lex.relex_regex_literal()?;
                let Token::RegExp { pattern, flags } = self.lex.token.clone() else {
                    unreachable!()
                };
                self.advance()?;
                Ok(self.finish(start, Node::RegExpLiteral { pattern, flags }))
            }
            other => Err(self.error(format!("unexpected token {other:?}"))),
        }
    }

    /// Elisions (`[1,,3]`) are pushed as `Ast::empty()` so the vector's
    /// length always equals the array's length, matching how elisions
    /// interact with real JS `.length` semantics (`[1,2,]` has length 2,
    /// `[1,,]` has length 2, `[,]` has length 1, `[,,]` has length 2).
    fn parse_array_literal(&mut self) -> Result<NodeId> {
        let start = self.lex.token_start();
        self.expect(Token::LBrack)?;
        let mut elements = Vec::new();
        loop {
            if self.at(&Token::RBrack) {
                break;
            }
            if self.eat(Token::Comma)? {
                elements.push(Ast::empty());
                continue;
            }
            elements.push(self.parse_assignment_expression()?);
            if !self.eat(Token::Comma)? {
                break;
            }
        }
        self.expect(Token::RBrack)?;
        Ok(self.finish(start, Node::ArrayLiteral(elements)))
    }

    fn parse_object_literal(&mut self) -> Result<NodeId> {
        let start = self.lex.token_start();
        self.expect(Token::LBrace)?;
        let mut props = Vec::new();
        while !self.at(&Token::RBrace) {
            props.push(self.parse_object_property()?);
            if !self.eat(Token::Comma)? {
                break;
            }
        }
        self.expect(Token::RBrace)?;
        Ok(self.finish(start, Node::ObjectLiteral(props)))
    }

    fn parse_object_property(&mut self) -> Result<ObjectProperty> {
        if let Token::Ident(word) = self.lex.token.clone() {
            if word == "get" || word == "set" {
                let mut lookahead = self.lex.clone();
                lookahead.next()?;
                let is_accessor = !matches!(
                    lookahead.token,
                    Token::Colon | Token::Comma | Token::RBrace | Token::LParen
                );
                if is_accessor {
                    self.advance()?;
                    let key = self.parse_property_key()?;
                    let func = self.parse_function_rest(None)?;
                    let func_start = self.lex.token_start();
                    let func_node = self.finish(func_start, Node::FunctionExpr(func));
                    let kind = if word == "get" {
                        PropertyKind::Get(func_node)
                    } else {
                        PropertyKind::Set(func_node)
                    };
                    return Ok(ObjectProperty { key, kind });
                }
            }
        }
        let key = self.parse_property_key()?;
        self.expect(Token::Colon)?;
        let value = self.parse_assignment_expression()?;
        Ok(ObjectProperty { key, kind: PropertyKind::Init(value) })
    }

    fn parse_property_key(&mut self) -> Result<PropertyKey> {
        match self.lex.token.clone() {
            Token::Ident(name) => {
                self.advance()?;
                Ok(PropertyKey::Identifier(name))
            }
            Token::Keyword(kw) => {
                self.advance()?;
                Ok(PropertyKey::Identifier(keyword_text(kw).to_string()))
            }
            Token::String(value) => {
                self.advance()?;
                Ok(PropertyKey::String(value))
            }
            Token::Number(value) => {
                self.advance()?;
                Ok(PropertyKey::Number(value))
            }
            _ => Err(self.error("expected a property name")),
        }
    }

    /// Parses `(params) { body }`. Duplicate-parameter and `eval`/
    /// `arguments`-parameter checks are deferred until after the body is
    /// parsed, since a function's own directive prologue can make it
    /// strict only once its body has been scanned.
    fn parse_function_rest(&mut self, name: Option<String>) -> Result<FunctionNode> {
        self.expect(Token::LParen)?;
        let mut params = Vec::new();
        if !self.at(&Token::RParen) {
            loop {
                let param_start = self.lex.token_start();
                let param = self.binding_identifier()?;
                if is_strict_reserved_word(&param) {
                    return Err(SyntaxError::parse(
                        format!("'{param}' is reserved in strict mode"),
                        param_start,
                    ));
                }
                params.push(param);
                if !self.eat(Token::Comma)? {
                    break;
                }
            }
        }
        self.expect(Token::RParen)?;

        let enclosing_strict = self.strict;
        self.expect(Token::LBrace)?;
        let (body_stmts, strict) =
            self.parse_statement_list(|t| matches!(t, Token::RBrace), ScopeState::function_body())?;
        let body_start = self.prev_end;
        self.expect(Token::RBrace)?;
        let body = self.finish(body_start, Node::Block { body: body_stmts, strict });
        self.strict = enclosing_strict;

        if strict {
            let mut seen = std::collections::HashSet::new();
            for param in &params {
                if param == "eval" || param == "arguments" {
                    return Err(self.error(format!(
                        "'{param}' cannot be used as a parameter name in strict mode"
                    )));
                }
                if !seen.insert(param.clone()) {
                    return Err(self.error("duplicate parameter name in strict mode"));
                }
            }
        }

        Ok(FunctionNode { name, params, body, is_strict: strict })
    }

    /// Binding-identifier position (`var` names, function/catch params,
    /// function names): rejects strict-reserved words when in strict mode.
    /// Does not carry the narrower `eval`/`arguments` restriction, which is
    /// scoped to assignment targets and parameter lists specifically.
    fn binding_identifier(&mut self) -> Result<String> {
        match self.lex.token.clone() {
            Token::Ident(name) => {
                if self.strict && is_strict_reserved_word(&name) {
                    return Err(self.error(format!("'{name}' is reserved in strict mode")));
                }
                self.advance()?;
                Ok(name)
            }
            _ => Err(self.error("expected an identifier")),
        }
    }
}

fn binary_op_of(token: &Token) -> BinaryOp {
    match token {
        Token::Add => BinaryOp::Add,
        Token::Sub => BinaryOp::Sub,
        Token::Mul => BinaryOp::Mul,
        Token::Div => BinaryOp::Div,
        Token::Mod => BinaryOp::Mod,
        Token::ShiftLeft => BinaryOp::ShiftLeft,
        Token::ShiftRight => BinaryOp::ShiftRight,
        Token::UnsignedShiftRight => BinaryOp::UnsignedShiftRight,
        Token::Lt => BinaryOp::Lt,
        Token::Gt => BinaryOp::Gt,
        Token::Lte => BinaryOp::Lte,
        Token::Gte => BinaryOp::Gte,
        Token::Keyword(Keyword::InstanceOf) => BinaryOp::InstanceOf,
        Token::Keyword(Keyword::In) => BinaryOp::In,
        Token::Equality => BinaryOp::Equal,
        Token::Inequality => BinaryOp::NotEqual,
        Token::StrictEquality => BinaryOp::StrictEqual,
        Token::StrictInequality => BinaryOp::StrictNotEqual,
        Token::BitAnd => BinaryOp::BitAnd,
        Token::BitXor => BinaryOp::BitXor,
        Token::BitOr => BinaryOp::BitOr,
        Token::And => BinaryOp::LogicalAnd,
        Token::Or => BinaryOp::LogicalOr,
        other => unreachable!("not a binary operator: {other:?}"),
    }
}

fn assign_op_of(token: &Token) -> AssignOp {
    match token {
        Token::Equal => AssignOp::Assign,
        Token::AddAssign => AssignOp::Add,
        Token::SubAssign => AssignOp::Sub,
        Token::MulAssign => AssignOp::Mul,
        Token::DivAssign => AssignOp::Div,
        Token::ModAssign => AssignOp::Mod,
        Token::ShiftLeftAssign => AssignOp::ShiftLeft,
        Token::ShiftRightAssign => AssignOp::ShiftRight,
        Token::UnsignedShiftRightAssign => AssignOp::UnsignedShiftRight,
        Token::BitAndAssign => AssignOp::BitAnd,
        Token::BitOrAssign => AssignOp::BitOr,
        Token::BitXorAssign => AssignOp::BitXor,
        other => unreachable!("not an assignment operator: {other:?}"),
    }
}

fn keyword_text(kw: Keyword) -> &'static str {
    match kw {
        Keyword::Break => "break",
        Keyword::Case => "case",
        Keyword::Catch => "catch",
        Keyword::Continue => "continue",
        Keyword::Debugger => "debugger",
        Keyword::Default => "default",
        Keyword::Delete => "delete",
        Keyword::Do => "do",
        Keyword::Else => "else",
        Keyword::False => "false",
        Keyword::Finally => "finally",
        Keyword::For => "for",
        Keyword::Function => "function",
        Keyword::If => "if",
        Keyword::In => "in",
        Keyword::InstanceOf => "instanceof",
        Keyword::New => "new",
        Keyword::Null => "null",
        Keyword::Return => "return",
        Keyword::Switch => "switch",
        Keyword::This => "this",
        Keyword::Throw => "throw",
        Keyword::True => "true",
        Keyword::Try => "try",
        Keyword::TypeOf => "typeof",
        Keyword::Var => "var",
        Keyword::Void => "void",
        Keyword::While => "while",
        Keyword::With => "with",
        Keyword::Implements => "implements",
        Keyword::Interface => "interface",
        Keyword::Let => "let",
        Keyword::Package => "package",
        Keyword::Private => "private",
        Keyword::Protected => "protected",
        Keyword::Public => "public",
        Keyword::Static => "static",
        Keyword::Yield => "yield",
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(source: &str, version: Version) -> Result<(Ast, NodeId)> {
        parse_program(source, "test.js", version)
    }

    #[test]
    fn parses_var_decl_with_initializer() {
        let (ast, program) = parse("var x = 1 + 2;", Version::Es5).unwrap();
        let Node::Program { body, .. } = ast.get(program) else { panic!() };
        assert_eq!(body.len(), 1);
        let Node::VarDecl(decls) = ast.get(body[0]) else { panic!() };
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].0, "x");
        assert!(matches!(ast.get(decls[0].1), Node::Binary { op: BinaryOp::Add, .. }));
    }

    #[test]
    fn directive_prologue_sets_strict_mode() {
        let (ast, program) = parse("'use strict';\nvar eval;", Version::Es5).unwrap();
        let Node::Program { strict, .. } = ast.get(program) else { panic!() };
        assert!(*strict);
    }

    #[test]
    fn for_in_disambiguates_from_binary_in() {
        let (ast, program) = parse("for (x in y) ;", Version::Es5).unwrap();
        let Node::Program { body, .. } = ast.get(program) else { panic!() };
        assert!(matches!(ast.get(body[0]), Node::ForIn { .. }));
    }

    #[test]
    fn for_with_in_operator_in_test_position() {
        let (ast, program) = parse("for (var i = 0; i in obj; i++) ;", Version::Es5).unwrap();
        let Node::Program { body, .. } = ast.get(program) else { panic!() };
        let Node::For { test, .. } = ast.get(body[0]) else { panic!() };
        assert!(matches!(ast.get(*test), Node::Binary { op: BinaryOp::In, .. }));
    }

    #[test]
    fn array_literal_elisions_match_js_length_semantics() {
        let (ast, program) = parse("[1,2,]; [1,,]; [,]; [,,];", Version::Es5).unwrap();
        let Node::Program { body, .. } = ast.get(program) else { panic!() };
        let lens: Vec<usize> = body
            .iter()
            .map(|stmt| {
                let Node::ExprStmt(expr) = ast.get(*stmt) else { panic!() };
                let Node::ArrayLiteral(elements) = ast.get(*expr) else { panic!() };
                elements.len()
            })
            .collect();
        assert_eq!(lens, vec![2, 2, 1, 2]);
    }

    #[test]
    fn object_literal_accessors() {
        let (ast, program) = parse("({ get x() { return 1; }, set x(v) {} });", Version::Es5).unwrap();
        let Node::Program { body, .. } = ast.get(program) else { panic!() };
        let Node::ExprStmt(expr) = ast.get(body[0]) else { panic!() };
        let Node::ObjectLiteral(props) = ast.get(*expr) else { panic!() };
        assert_eq!(props.len(), 2);
        assert!(matches!(props[0].kind, PropertyKind::Get(_)));
        assert!(matches!(props[1].kind, PropertyKind::Set(_)));
    }

    #[test]
    fn restricted_return_does_not_cross_newline() {
        let (ast, program) = parse("function f() { return\n1; }", Version::Es5).unwrap();
        let Node::Program { body, .. } = ast.get(program) else { panic!() };
        let Node::FunctionDecl(func) = ast.get(body[0]) else { panic!() };
        let Node::Block { body: stmts, .. } = ast.get(func.body) else { panic!() };
        let Node::Return(value) = ast.get(stmts[0]) else { panic!() };
        assert_eq!(*value, Ast::empty());
    }

    #[test]
    fn throw_rejects_newline_before_expression() {
        assert!(parse("throw\n1;", Version::Es5).is_err());
    }

    #[test]
    fn legacy_octal_rejected_only_in_strict_mode() {
        assert!(parse("010;", Version::Es5).is_ok());
        assert!(parse("'use strict'; 010;", Version::Es5).is_err());
    }

    #[test]
    fn duplicate_strict_params_rejected() {
        assert!(parse("function f(a, a) { 'use strict'; }", Version::Es5).is_err());
        assert!(parse("function f(a, a) {}", Version::Es5).is_ok());
    }

    #[test]
    fn break_outside_loop_or_switch_is_an_error() {
        assert!(parse("break;", Version::Es5).is_err());
        assert!(parse("while (1) break;", Version::Es5).is_ok());
    }

    #[test]
    fn new_expression_binds_call_parens_to_new_not_callee() {
        let (ast, program) = parse("new Foo().bar;", Version::Es5).unwrap();
        let Node::Program { body, .. } = ast.get(program) else { panic!() };
        let Node::ExprStmt(expr) = ast.get(body[0]) else { panic!() };
        let Node::Member { object, .. } = ast.get(*expr) else { panic!() };
        assert!(matches!(ast.get(*object), Node::New { .. }));
    }

    #[test]
    fn regex_literal_after_division_context() {
        let (ast, program) = parse("var r = /ab+c/gi;", Version::Es5).unwrap();
        let Node::Program { body, .. } = ast.get(program) else { panic!() };
        let Node::VarDecl(decls) = ast.get(body[0]) else { panic!() };
        assert!(matches!(ast.get(decls[0].1), Node::RegExpLiteral { .. }));
    }
}
