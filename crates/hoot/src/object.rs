//! Classes and instances.
//!
//! Property lookup order on a plain instance is fields first, then the class
//! chain for a method, which is bound to the instance on resolution. The
//! built-in collection values (`string`, `list`, `map`) are instances too,
//! carrying a native payload instead of user-visible fields; their methods
//! resolve to natives bound to the receiver, so `Get` dispatch stays uniform.

use std::{cell::RefCell, rc::Rc};

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::{
    error::{RunResult, RuntimeError},
    function::HootFunction,
    natives::{self, NativeFunction},
    token::Token,
    value::{Value, format_number},
};

pub(crate) struct HootClass {
    pub name: String,
    pub superclass: Option<Rc<HootClass>>,
    /// Insertion-ordered so repeated introspection is stable.
    pub methods: IndexMap<String, Rc<HootFunction>>,
}

impl HootClass {
    /// A class with no superclass and no methods, used as the class of
    /// runtime-synthesized instances (collections, HTTP responses).
    pub fn blank(name: &str) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_owned(),
            superclass: None,
            methods: IndexMap::new(),
        })
    }

    /// Walks this class and then its superclass chain for a method.
    pub fn find_method(&self, name: &str) -> Option<Rc<HootFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }
        self.superclass.as_ref().and_then(|superclass| superclass.find_method(name))
    }

    /// Constructor arity: the arity of `init` if present, else zero.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |initializer| initializer.arity())
    }
}

pub(crate) type InstanceRef = Rc<RefCell<Instance>>;

/// Backing storage of a runtime-synthesized collection instance.
#[derive(Debug)]
pub(crate) enum NativePayload {
    /// A plain user-class instance; state lives in `fields`.
    None,
    /// A `string(…)` instance wrapping characters.
    Text(String),
    /// A `list(…)` instance.
    List(Vec<Value>),
    /// A `map()` instance. Insertion-ordered.
    Map(IndexMap<MapKey, Value>),
}

impl NativePayload {
    /// The noun used in "Can't call 'x' on a …" errors.
    pub fn noun(&self) -> &'static str {
        match self {
            Self::None => "instance",
            Self::Text(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

/// Hashable key for `map()` storage: the primitive values.
///
/// Numbers are keyed by bit pattern with `-0.0` collapsed into `0.0` so the
/// two compare-equal zeros share one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum MapKey {
    Nil,
    Bool(bool),
    Number(u64),
    Str(Rc<str>),
}

impl MapKey {
    /// Converts a value into a key; `None` for non-primitive values.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Nil => Some(Self::Nil),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => {
                let normalized = if *n == 0.0 { 0.0 } else { *n };
                Some(Self::Number(normalized.to_bits()))
            }
            Value::Str(text) => Some(Self::Str(Rc::clone(text))),
            _ => None,
        }
    }

    fn stringify(&self) -> String {
        match self {
            Self::Nil => "nil".to_owned(),
            Self::Bool(b) => b.to_string(),
            Self::Number(bits) => format_number(f64::from_bits(*bits)),
            Self::Str(text) => text.to_string(),
        }
    }
}

pub(crate) struct Instance {
    pub class: Rc<HootClass>,
    pub fields: AHashMap<String, Value>,
    pub payload: NativePayload,
}

impl Instance {
    pub fn new(class: Rc<HootClass>) -> InstanceRef {
        Self::with_payload(class, NativePayload::None)
    }

    pub fn with_payload(class: Rc<HootClass>, payload: NativePayload) -> InstanceRef {
        Rc::new(RefCell::new(Self {
            class,
            fields: AHashMap::new(),
            payload,
        }))
    }

    pub fn stringify(&self) -> String {
        match &self.payload {
            NativePayload::None => format!("{} instance", self.class.name),
            NativePayload::Text(text) => text.clone(),
            NativePayload::List(elements) => {
                let rendered: Vec<String> = elements.iter().map(Value::stringify).collect();
                format!("[{}]", rendered.join(", "))
            }
            NativePayload::Map(entries) => {
                let rendered: Vec<String> = entries
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key.stringify(), value.stringify()))
                    .collect();
                format!("{{{}}}", rendered.join(", "))
            }
        }
    }
}

/// Property access on an instance.
///
/// Plain instances look up fields, then methods (bound to the receiver).
/// Payload instances expose only their collection methods.
pub(crate) fn get_property(instance: &InstanceRef, name: &Token) -> RunResult<Value> {
    {
        let inner = instance.borrow();
        match &inner.payload {
            NativePayload::None => {
                if let Some(value) = inner.fields.get(&name.lexeme) {
                    return Ok(value.clone());
                }
            }
            payload => {
                return match natives::collections::method_for(payload, &name.lexeme) {
                    Some(kind) => Ok(Value::Native(NativeFunction::bound(kind, Rc::clone(instance)))),
                    None => Err(RuntimeError::new(
                        name.clone(),
                        format!("Can't call '{}' on a {}.", name.lexeme, payload.noun()),
                    )),
                };
            }
        }
    }

    let method = instance.borrow().class.find_method(&name.lexeme);
    if let Some(method) = method {
        return Ok(Value::Function(Rc::new(method.bind(instance))));
    }

    Err(RuntimeError::new(
        name.clone(),
        format!("Undefined property '{}'.", name.lexeme),
    ))
}

/// Property assignment: defines or overwrites a field.
pub(crate) fn set_property(instance: &InstanceRef, name: &Token, value: Value) {
    instance.borrow_mut().fields.insert(name.lexeme.clone(), value);
}
