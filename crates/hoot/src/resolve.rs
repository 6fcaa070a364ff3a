//! Static resolution: scope distances and semantic checks.
//!
//! A single pre-execution pass walks the statements, maintaining a stack of
//! lexical scopes (the global scope is implicit and never on the stack). For
//! every variable, assignment, `this` and `super` expression it records the
//! number of enclosing scopes between the use and the binding; absence from
//! the resulting [`Bindings`] table means the reference is global.
//!
//! The pass also enforces the rules that need no evaluation: `return` and
//! `break` placement, `this`/`super` context, duplicate declarations,
//! self-inheritance, and reading a local in its own initializer. Resolution
//! continues after each error so one pass reports them all.

use ahash::AHashMap;

use crate::{
    ast::{Expr, ExprId, ExprKind, FunctionDecl, Stmt},
    error::Diagnostics,
    token::Token,
};

/// Depth table produced by resolution: expression id to scope distance.
///
/// Immutable once built; the interpreter only reads it.
#[derive(Debug, Default)]
pub(crate) struct Bindings(AHashMap<ExprId, usize>);

impl Bindings {
    /// Scope distance for a resolved reference; `None` means global.
    pub fn depth(&self, id: ExprId) -> Option<usize> {
        self.0.get(&id).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassKind {
    None,
    Class,
    Subclass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopKind {
    None,
    While,
}

pub(crate) struct Resolver<'d> {
    diagnostics: &'d Diagnostics,
    /// Per-scope maps from name to "fully defined" flag. `false` means the
    /// name is declared but its initializer has not finished resolving.
    scopes: Vec<AHashMap<String, bool>>,
    bindings: AHashMap<ExprId, usize>,
    current_function: FunctionKind,
    current_class: ClassKind,
    current_loop: LoopKind,
}

impl<'d> Resolver<'d> {
    pub fn new(diagnostics: &'d Diagnostics) -> Self {
        Self {
            diagnostics,
            scopes: Vec::new(),
            bindings: AHashMap::new(),
            current_function: FunctionKind::None,
            current_class: ClassKind::None,
            current_loop: LoopKind::None,
        }
    }

    pub fn resolve(mut self, statements: &[Stmt]) -> Bindings {
        self.resolve_stmts(statements);
        Bindings(self.bindings)
    }

    fn resolve_stmts(&mut self, statements: &[Stmt]) {
        for statement in statements {
            self.resolve_stmt(statement);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),
            Stmt::Let { name, initializer } => {
                self.declare(name);
                if let Some(initializer) = initializer {
                    self.resolve_expr(initializer);
                }
                self.define(name);
            }
            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_stmts(statements);
                self.end_scope();
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                let enclosing = self.current_loop;
                self.current_loop = LoopKind::While;
                self.resolve_stmt(body);
                self.current_loop = enclosing;
            }
            Stmt::Break { keyword } => {
                if self.current_loop == LoopKind::None {
                    self.diagnostics.error_at(keyword, "Can't use 'break' outside of a loop.");
                }
            }
            Stmt::Function(declaration) => {
                self.declare(&declaration.name);
                self.define(&declaration.name);
                self.resolve_function(declaration, FunctionKind::Function);
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods),
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionKind::None {
                    self.diagnostics.error_at(keyword, "Can't return from top-level code.");
                }
                if let Some(value) = value {
                    if self.current_function == FunctionKind::Initializer {
                        self.diagnostics
                            .error_at(keyword, "Can't return a value from an initializer.");
                    }
                    self.resolve_expr(value);
                }
            }
        }
    }

    fn resolve_class(&mut self, name: &Token, superclass: Option<&Expr>, methods: &[std::rc::Rc<FunctionDecl>]) {
        let enclosing_class = self.current_class;
        self.current_class = ClassKind::Class;

        self.declare(name);
        self.define(name);

        if let Some(superclass) = superclass {
            if let ExprKind::Variable { name: super_name } = &superclass.kind {
                if super_name.lexeme == name.lexeme {
                    self.diagnostics
                        .error_at(super_name, "A class can't inherit from itself.");
                }
            }
            self.current_class = ClassKind::Subclass;
            self.resolve_expr(superclass);

            // The methods of a subclass close over a scope holding 'super'.
            self.begin_scope();
            self.scope_define("super");
        }

        self.begin_scope();
        self.scope_define("this");

        for method in methods {
            let declaration = if method.name.lexeme == "init" {
                FunctionKind::Initializer
            } else {
                FunctionKind::Method
            };
            self.resolve_function(method, declaration);
        }

        self.end_scope();
        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(_) => {}
            ExprKind::Variable { name } => {
                if self
                    .scopes
                    .last()
                    .is_some_and(|scope| scope.get(&name.lexeme) == Some(&false))
                {
                    self.diagnostics
                        .error_at(name, "Can't read local variable in its own initializer.");
                }
                self.resolve_local(expr.id, name);
            }
            ExprKind::Assign { name, value } => {
                self.resolve_expr(value);
                self.resolve_local(expr.id, name);
            }
            ExprKind::Unary { right, .. } => self.resolve_expr(right),
            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            ExprKind::Grouping { expression } => self.resolve_expr(expression),
            ExprKind::Call { callee, arguments, .. } => {
                self.resolve_expr(callee);
                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }
            ExprKind::Get { object, .. } => self.resolve_expr(object),
            ExprKind::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }
            ExprKind::This { keyword } => {
                if self.current_class == ClassKind::None {
                    self.diagnostics.error_at(keyword, "Can't use 'this' outside of a class.");
                }
                self.resolve_local(expr.id, keyword);
            }
            ExprKind::Super { keyword, .. } => {
                match self.current_class {
                    ClassKind::None => {
                        self.diagnostics
                            .error_at(keyword, "Can't use 'super' outside of a class.");
                    }
                    ClassKind::Class => {
                        self.diagnostics
                            .error_at(keyword, "Can't use 'super' in a class with no superclass.");
                    }
                    ClassKind::Subclass => {}
                }
                self.resolve_local(expr.id, keyword);
            }
            ExprKind::Lambda(declaration) => self.resolve_function(declaration, FunctionKind::Function),
        }
    }

    fn resolve_function(&mut self, declaration: &FunctionDecl, kind: FunctionKind) {
        let enclosing_function = self.current_function;
        self.current_function = kind;
        // A function body starts outside any loop: a 'break' in it must not
        // see a loop enclosing the declaration.
        let enclosing_loop = self.current_loop;
        self.current_loop = LoopKind::None;

        self.begin_scope();
        for param in &declaration.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(&declaration.body);
        self.end_scope();

        self.current_function = enclosing_function;
        self.current_loop = enclosing_loop;
    }

    fn begin_scope(&mut self) {
        self.scopes.push(AHashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        if scope.contains_key(&name.lexeme) {
            self.diagnostics
                .error_at(name, "Already a variable with this name in this scope.");
        }
        scope.insert(name.lexeme.clone(), false);
    }

    fn define(&mut self, name: &Token) {
        self.scope_define(&name.lexeme);
    }

    fn scope_define(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_owned(), true);
        }
    }

    /// Scans scopes innermost-outward; the first hit records
    /// `stack size - 1 - index` as the distance. No hit means global.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (index, scope) in self.scopes.iter().enumerate().rev() {
            if scope.contains_key(&name.lexeme) {
                self.bindings.insert(id, self.scopes.len() - 1 - index);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse::Parser, scan::Scanner};

    fn resolve(source: &str) -> (Bindings, Diagnostics) {
        let diagnostics = Diagnostics::new();
        let tokens = Scanner::new(source, &diagnostics).scan_tokens();
        let statements = Parser::new(tokens, &diagnostics).parse();
        assert!(!diagnostics.had_error(), "test source should parse cleanly");
        let bindings = Resolver::new(&diagnostics).resolve(&statements);
        (bindings, diagnostics)
    }

    #[test]
    fn global_references_are_absent_from_the_table() {
        let (_, diagnostics) = resolve("let a = 1; print a;");
        assert!(!diagnostics.had_error());
    }

    #[test]
    fn return_at_top_level_is_an_error() {
        let (_, diagnostics) = resolve("return 1;");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn bare_return_in_initializer_is_allowed() {
        let (_, diagnostics) = resolve("class C { init() { return; } }");
        assert!(!diagnostics.had_error());
    }

    #[test]
    fn value_return_in_initializer_is_an_error() {
        let (_, diagnostics) = resolve("class C { init() { return 1; } }");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn this_outside_a_class_is_an_error() {
        let (_, diagnostics) = resolve("print this;");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn super_without_a_superclass_is_an_error() {
        let (_, diagnostics) = resolve("class C { speak() { super.speak(); } }");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn super_in_a_subclass_is_allowed() {
        let (_, diagnostics) = resolve("class A { speak() {} } class B < A { speak() { super.speak(); } }");
        assert!(!diagnostics.had_error());
    }

    #[test]
    fn break_outside_a_loop_is_an_error() {
        let (_, diagnostics) = resolve("break;");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn break_inside_a_function_inside_a_loop_is_an_error() {
        // The loop does not reach through a function boundary.
        let (_, diagnostics) = resolve("while (true) { fun f() { break; } }");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn self_inheritance_is_an_error() {
        let (_, diagnostics) = resolve("class X < X {}");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn reading_a_local_in_its_own_initializer_is_an_error() {
        let (_, diagnostics) = resolve("{ let a = a; }");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn shadowing_reads_the_outer_binding_in_the_initializer_at_global_scope() {
        // At global scope the rule does not apply.
        let (_, diagnostics) = resolve("let a = 1; let a = a;");
        assert!(!diagnostics.had_error());
    }

    #[test]
    fn duplicate_declaration_in_a_local_scope_is_an_error() {
        let (_, diagnostics) = resolve("{ let a = 1; let a = 2; }");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn resolution_continues_past_errors() {
        let diagnostics = Diagnostics::new();
        let tokens = Scanner::new("break; return 1;", &diagnostics).scan_tokens();
        let statements = Parser::new(tokens, &diagnostics).parse();
        Resolver::new(&diagnostics).resolve(&statements);
        assert_eq!(diagnostics.messages().len(), 2, "both misuses should be reported");
    }
}
