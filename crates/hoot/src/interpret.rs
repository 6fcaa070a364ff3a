//! The tree-walking evaluator.
//!
//! Statements and expressions are dispatched by match over the AST variants.
//! Runtime errors, `return` and `break` all unwind through [`Unwind`];
//! `execute_block` restores the previous environment on every exit path, so
//! non-local signals never leave a stale frame installed.
//!
//! After the top-level statements finish, [`Interpreter::interpret`] drains
//! the background task inbox: each completion's payload is wrapped into
//! values and its user callback runs synchronously on this thread, in
//! completion order. Callbacks may spawn further tasks; the loop re-checks
//! the pending table until it is empty.

use std::rc::Rc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::{
    ast::{Expr, ExprId, ExprKind, LiteralValue, Stmt},
    env::{EnvRef, Environment},
    error::{Diagnostics, Exec, RunResult, RuntimeError, Unwind},
    function::HootFunction,
    natives,
    object::{self, HootClass},
    io::PrintWriter,
    resolve::Bindings,
    sched::Scheduler,
    token::{Token, TokenType},
    tracer::RunTracer,
    value::Value,
};

/// Argument buffer for the call path; most calls carry only a few values.
pub(crate) type Args = SmallVec<[Value; 8]>;

pub(crate) struct Interpreter<'io> {
    globals: EnvRef,
    environment: EnvRef,
    bindings: Bindings,
    scheduler: Scheduler,
    diagnostics: &'io Diagnostics,
    stdout: &'io mut dyn PrintWriter,
}

impl<'io> Interpreter<'io> {
    pub fn new(
        globals: EnvRef,
        bindings: Bindings,
        tracer: Rc<dyn RunTracer>,
        diagnostics: &'io Diagnostics,
        stdout: &'io mut dyn PrintWriter,
    ) -> Self {
        Self {
            environment: Rc::clone(&globals),
            globals,
            bindings,
            scheduler: Scheduler::new(tracer),
            diagnostics,
            stdout,
        }
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Runs the top-level statements, then drains background tasks until
    /// none remain. A runtime error stops the program but not the drain:
    /// already-scheduled I/O still completes and reports.
    pub fn interpret(&mut self, statements: &[Stmt]) {
        for statement in statements {
            if let Err(unwind) = self.execute(statement) {
                self.report_unwind(unwind);
                break;
            }
        }
        self.drain_tasks();
    }

    /// Formats a runtime error on the program's stdout and flags it.
    fn report_unwind(&mut self, unwind: Unwind) {
        match unwind {
            Unwind::Error(error) => {
                self.stdout
                    .print_line(&format!("[line {}] {}", error.token.line, error.message));
                self.diagnostics.mark_runtime_error();
            }
            Unwind::Return(_) | Unwind::Break => {
                unreachable!("the resolver keeps 'return' and 'break' inside their contexts")
            }
        }
    }

    fn drain_tasks(&mut self) {
        while self.scheduler.has_pending() {
            let (pending, outcome) = self.scheduler.next_completion();
            match outcome {
                Ok(payload) => {
                    if let Some(callback) = pending.callback {
                        let arguments = natives::payload_arguments(payload);
                        if let Err(unwind) = self.call_value(callback, arguments, &pending.token) {
                            self.report_unwind(unwind);
                        }
                    }
                }
                // A failed task reports through diagnostics; its callback is
                // not invoked and the drain continues.
                Err(message) => self.diagnostics.error_at(&pending.token, &message),
            }
        }
    }

    fn execute(&mut self, stmt: &Stmt) -> Exec<()> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(())
            }
            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                self.stdout.print_line(&value.stringify());
                Ok(())
            }
            Stmt::Let { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                self.environment.borrow_mut().define(name.lexeme.clone(), value);
                Ok(())
            }
            Stmt::Block(statements) => {
                let environment = Environment::nested(&self.environment);
                self.execute_block(statements, environment)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            }
            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body) {
                        Ok(()) => {}
                        Err(Unwind::Break) => break,
                        Err(other) => return Err(other),
                    }
                }
                Ok(())
            }
            Stmt::Break { .. } => Err(Unwind::Break),
            Stmt::Function(declaration) => {
                let function = HootFunction::new(Rc::clone(declaration), Rc::clone(&self.environment), false);
                self.environment
                    .borrow_mut()
                    .define(declaration.name.lexeme.clone(), Value::Function(Rc::new(function)));
                Ok(())
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Err(Unwind::Return(value))
            }
        }
    }

    fn execute_class(&mut self, name: &Token, superclass: Option<&Expr>, methods: &[Rc<crate::ast::FunctionDecl>]) -> Exec<()> {
        let superclass_value = match superclass {
            Some(expr) => {
                let value = self.evaluate(expr)?;
                if let Value::Class(class) = value {
                    Some(class)
                } else {
                    let token = match &expr.kind {
                        ExprKind::Variable { name } => name.clone(),
                        _ => name.clone(),
                    };
                    return Err(RuntimeError::new(token, "Superclass must be a class.").into());
                }
            }
            None => None,
        };

        self.environment.borrow_mut().define(name.lexeme.clone(), Value::Nil);

        // Methods of a subclass close over an extra frame defining 'super'.
        let method_closure = if let Some(superclass) = &superclass_value {
            let environment = Environment::nested(&self.environment);
            environment
                .borrow_mut()
                .define("super", Value::Class(Rc::clone(superclass)));
            environment
        } else {
            Rc::clone(&self.environment)
        };

        let mut method_table = IndexMap::new();
        for method in methods {
            let is_initializer = method.name.lexeme == "init";
            let function = HootFunction::new(Rc::clone(method), Rc::clone(&method_closure), is_initializer);
            method_table.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        let class = HootClass {
            name: name.lexeme.clone(),
            superclass: superclass_value,
            methods: method_table,
        };
        Environment::assign(&self.environment, name, Value::Class(Rc::new(class)))?;
        Ok(())
    }

    /// Executes statements in `environment`, restoring the previous frame on
    /// all exit paths including non-local unwinds.
    pub(crate) fn execute_block(&mut self, statements: &[Stmt], environment: EnvRef) -> Exec<()> {
        let previous = std::mem::replace(&mut self.environment, environment);
        let result = statements.iter().try_for_each(|statement| self.execute(statement));
        self.environment = previous;
        result
    }

    fn evaluate(&mut self, expr: &Expr) -> Exec<Value> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(match literal {
                LiteralValue::Nil => Value::Nil,
                LiteralValue::Bool(value) => Value::Bool(*value),
                LiteralValue::Number(value) => Value::Number(*value),
                LiteralValue::Str(text) => Value::Str(Rc::clone(text)),
            }),
            ExprKind::Variable { name } => Ok(self.look_up_variable(name, expr.id)?),
            ExprKind::Assign { name, value } => {
                let value = self.evaluate(value)?;
                match self.bindings.depth(expr.id) {
                    Some(distance) => {
                        if !Environment::assign_at(&self.environment, distance, name, value.clone()) {
                            return Err(RuntimeError::new(
                                name.clone(),
                                format!("Undefined variable '{}'.", name.lexeme),
                            )
                            .into());
                        }
                    }
                    None => Environment::assign(&self.globals, name, value.clone())?,
                }
                Ok(value)
            }
            ExprKind::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                match operator.token_type {
                    TokenType::Minus => {
                        let value = check_number_operand(operator, &right)?;
                        Ok(Value::Number(-value))
                    }
                    TokenType::Bang => Ok(Value::Bool(!right.is_truthy())),
                    _ => unreachable!("parser only builds unary '!' and '-'"),
                }
            }
            ExprKind::Binary { left, operator, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                Ok(binary(operator, &left, &right)?)
            }
            ExprKind::Logical { left, operator, right } => {
                let left = self.evaluate(left)?;
                let short_circuits = if operator.token_type == TokenType::Or {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };
                if short_circuits {
                    return Ok(left);
                }
                self.evaluate(right)
            }
            ExprKind::Grouping { expression } => self.evaluate(expression),
            ExprKind::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;
                let mut evaluated: Args = SmallVec::new();
                for argument in arguments {
                    evaluated.push(self.evaluate(argument)?);
                }
                self.call_value(callee, evaluated, paren)
            }
            ExprKind::Get { object, name } => {
                let object = self.evaluate(object)?;
                if let Value::Instance(instance) = &object {
                    Ok(object::get_property(instance, name)?)
                } else {
                    Err(RuntimeError::new(name.clone(), "Only instances have properties").into())
                }
            }
            ExprKind::Set { object, name, value } => {
                let object = self.evaluate(object)?;
                let Value::Instance(instance) = &object else {
                    return Err(RuntimeError::new(name.clone(), "Only instances have fields.").into());
                };
                let value = self.evaluate(value)?;
                object::set_property(instance, name, value.clone());
                Ok(value)
            }
            ExprKind::This { keyword } => Ok(self.look_up_variable(keyword, expr.id)?),
            ExprKind::Super { keyword, method } => self.evaluate_super(expr.id, keyword, method),
            ExprKind::Lambda(declaration) => {
                let function = HootFunction::new(Rc::clone(declaration), Rc::clone(&self.environment), false);
                Ok(Value::Function(Rc::new(function)))
            }
        }
    }

    /// `super.method`: the method is looked up starting at the lexical
    /// superclass but bound to the dynamic `this`, read one frame below the
    /// frame holding `super`.
    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> Exec<Value> {
        let distance = self
            .bindings
            .depth(id)
            .ok_or_else(|| Unwind::from(undefined(keyword, "super")))?;
        let superclass = Environment::get_at(&self.environment, distance, "super")
            .ok_or_else(|| Unwind::from(undefined(keyword, "super")))?;
        let Value::Class(superclass) = superclass else {
            return Err(RuntimeError::new(keyword.clone(), "Superclass must be a class.").into());
        };
        let this = Environment::get_at(&self.environment, distance - 1, "this")
            .ok_or_else(|| Unwind::from(undefined(keyword, "this")))?;
        let Value::Instance(instance) = this else {
            return Err(RuntimeError::new(keyword.clone(), "Only instances have methods.").into());
        };

        let found = superclass.find_method(&method.lexeme).ok_or_else(|| {
            Unwind::from(RuntimeError::new(
                method.clone(),
                format!("Undefined property '{}'.", method.lexeme),
            ))
        })?;
        Ok(Value::Function(Rc::new(found.bind(&instance))))
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> RunResult<Value> {
        match self.bindings.depth(id) {
            Some(distance) => Environment::get_at(&self.environment, distance, &name.lexeme)
                .ok_or_else(|| undefined(name, &name.lexeme)),
            None => Environment::get(&self.globals, name),
        }
    }

    /// Calls any callable value: checks call capability and arity, then
    /// dispatches. Arity −1 (variadic natives) disables the check.
    pub(crate) fn call_value(&mut self, callee: Value, arguments: Args, paren: &Token) -> Exec<Value> {
        let arity: i32 = match &callee {
            Value::Function(function) => i32::try_from(function.arity()).unwrap_or(i32::MAX),
            Value::Class(class) => i32::try_from(class.arity()).unwrap_or(i32::MAX),
            Value::Native(native) => native.kind.arity(),
            _ => return Err(RuntimeError::new(paren.clone(), "Can only call functions and classes.").into()),
        };
        if arity >= 0 && arguments.len() != arity as usize {
            return Err(RuntimeError::new(
                paren.clone(),
                format!("Expected {arity} arguments but got {}.", arguments.len()),
            )
            .into());
        }

        match callee {
            Value::Function(function) => self.call_function(&function, arguments),
            Value::Class(class) => self.construct(&class, arguments),
            Value::Native(native) => Ok(natives::call(self, &native, arguments, paren)?),
            _ => unreachable!("non-callables rejected above"),
        }
    }

    /// Function call protocol: a fresh frame over the closure, parameters
    /// bound left to right, body executed. `return` unwinds here; an
    /// initializer always yields `this` regardless.
    fn call_function(&mut self, function: &HootFunction, arguments: Args) -> Exec<Value> {
        let environment = Environment::nested(&function.closure);
        {
            let mut frame = environment.borrow_mut();
            for (param, argument) in function.declaration.params.iter().zip(arguments) {
                frame.define(param.lexeme.clone(), argument);
            }
        }

        match self.execute_block(&function.declaration.body, environment) {
            Ok(()) => {
                if function.is_initializer {
                    self.initializer_this(function)
                } else {
                    Ok(Value::Nil)
                }
            }
            Err(Unwind::Return(value)) => {
                if function.is_initializer {
                    self.initializer_this(function)
                } else {
                    Ok(value)
                }
            }
            Err(other) => Err(other),
        }
    }

    /// `this` lives at depth 0 in a bound initializer's closure.
    fn initializer_this(&self, function: &HootFunction) -> Exec<Value> {
        Environment::get_at(&function.closure, 0, "this")
            .ok_or_else(|| Unwind::from(undefined(&function.declaration.name, "this")))
    }

    /// Class call: construct an instance, then bind and run `init` if present.
    fn construct(&mut self, class: &Rc<HootClass>, arguments: Args) -> Exec<Value> {
        let instance = crate::object::Instance::new(Rc::clone(class));
        if let Some(initializer) = class.find_method("init") {
            let bound = initializer.bind(&instance);
            self.call_function(&bound, arguments)?;
        }
        Ok(Value::Instance(instance))
    }
}

fn undefined(token: &Token, name: &str) -> RuntimeError {
    RuntimeError::new(token.clone(), format!("Undefined variable '{name}'."))
}

/// Binary operator semantics. `+` is overloaded over numbers and text;
/// everything else is numbers-only except equality, which never coerces.
fn binary(operator: &Token, left: &Value, right: &Value) -> RunResult<Value> {
    match operator.token_type {
        TokenType::Minus => {
            let (a, b) = check_number_operands(operator, left, right)?;
            Ok(Value::Number(a - b))
        }
        TokenType::Slash => {
            // Division by zero is not trapped: IEEE inf/NaN.
            let (a, b) = check_number_operands(operator, left, right)?;
            Ok(Value::Number(a / b))
        }
        TokenType::Star => {
            let (a, b) = check_number_operands(operator, left, right)?;
            Ok(Value::Number(a * b))
        }
        TokenType::Plus => add(operator, left, right),
        TokenType::Greater => {
            let (a, b) = check_number_operands(operator, left, right)?;
            Ok(Value::Bool(a > b))
        }
        TokenType::GreaterEqual => {
            let (a, b) = check_number_operands(operator, left, right)?;
            Ok(Value::Bool(a >= b))
        }
        TokenType::Less => {
            let (a, b) = check_number_operands(operator, left, right)?;
            Ok(Value::Bool(a < b))
        }
        TokenType::LessEqual => {
            let (a, b) = check_number_operands(operator, left, right)?;
            Ok(Value::Bool(a <= b))
        }
        TokenType::BangEqual => Ok(Value::Bool(!left.equals(right))),
        TokenType::EqualEqual => Ok(Value::Bool(left.equals(right))),
        _ => unreachable!("parser only builds the binary operators above"),
    }
}

/// `+`: number + number, string + string, and any mix of primitive string
/// and string-instance (the result is a string-instance when either side is
/// one). Everything else is an error.
fn add(operator: &Token, left: &Value, right: &Value) -> RunResult<Value> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::Str(a), Value::Str(b)) => {
            let mut joined = String::with_capacity(a.len() + b.len());
            joined.push_str(a);
            joined.push_str(b);
            Ok(Value::Str(Rc::from(joined)))
        }
        _ => match (left.as_text(), right.as_text()) {
            (Some(a), Some(b)) => Ok(natives::collections::string_instance(a + &b)),
            _ => Err(RuntimeError::new(
                operator.clone(),
                "Operands must be two numbers or two strings.",
            )),
        },
    }
}

fn check_number_operand(operator: &Token, operand: &Value) -> RunResult<f64> {
    match operand {
        Value::Number(value) => Ok(*value),
        _ => Err(RuntimeError::new(operator.clone(), "Operand must be a number")),
    }
}

fn check_number_operands(operator: &Token, left: &Value, right: &Value) -> RunResult<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::new(operator.clone(), "Operand must be a number")),
    }
}
