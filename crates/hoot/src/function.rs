//! User-defined function values.
//!
//! A function value pairs its declaration with the environment chain captured
//! where it was produced (the closure). Binding a method is just producing a
//! new function whose closure is extended by one frame defining `this`.

use std::rc::Rc;

use crate::{
    ast::FunctionDecl,
    env::{EnvRef, Environment},
    object::InstanceRef,
    value::Value,
};

pub(crate) struct HootFunction {
    pub declaration: Rc<FunctionDecl>,
    pub closure: EnvRef,
    /// True for methods named `init`; their calls always yield `this`.
    pub is_initializer: bool,
}

impl HootFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    /// Returns a copy of this function whose closure is prefixed with a
    /// frame binding `this` to the instance.
    pub fn bind(&self, instance: &InstanceRef) -> Self {
        let environment = Environment::nested(&self.closure);
        environment
            .borrow_mut()
            .define("this", Value::Instance(Rc::clone(instance)));
        Self {
            declaration: Rc::clone(&self.declaration),
            closure: environment,
            is_initializer: self.is_initializer,
        }
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }
}
