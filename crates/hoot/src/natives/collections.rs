//! Collection natives: `string`, `list` and `map`.
//!
//! These construct instances carrying a native payload; their methods are
//! resolved by `Get` like any other property and come back as natives bound
//! to the receiver. Indexes must be numbers; out-of-range access is a
//! runtime error rather than an unwind of the driver.

use indexmap::IndexMap;

use crate::{
    error::{RunResult, RuntimeError},
    interpret::Args,
    natives::{NativeFn, number_arg},
    object::{HootClass, Instance, InstanceRef, MapKey, NativePayload},
    token::Token,
    value::Value,
};

/// Resolves a method name against a payload kind.
pub(crate) fn method_for(payload: &NativePayload, name: &str) -> Option<NativeFn> {
    match payload {
        NativePayload::Text(_) => match name {
            "at" => Some(NativeFn::At),
            "alter" => Some(NativeFn::Alter),
            "length" => Some(NativeFn::Length),
            _ => None,
        },
        NativePayload::List(_) => match name {
            "at" => Some(NativeFn::At),
            "alter" => Some(NativeFn::Alter),
            "length" => Some(NativeFn::Length),
            "push" => Some(NativeFn::Push),
            "pop" => Some(NativeFn::Pop),
            _ => None,
        },
        NativePayload::Map(_) => match name {
            "get" => Some(NativeFn::MapGet),
            "set" => Some(NativeFn::MapSet),
            _ => None,
        },
        NativePayload::None => None,
    }
}

/// Builds a string-instance wrapping `text`.
pub(crate) fn string_instance(text: impl Into<String>) -> Value {
    Value::Instance(Instance::with_payload(
        HootClass::blank("String"),
        NativePayload::Text(text.into()),
    ))
}

/// Builds a list-instance over `elements`.
pub(crate) fn list_instance(elements: Vec<Value>) -> Value {
    Value::Instance(Instance::with_payload(
        HootClass::blank("List"),
        NativePayload::List(elements),
    ))
}

/// Builds a map-instance from string pairs; values become string-instances.
pub(crate) fn map_from_pairs(pairs: Vec<(String, String)>) -> Value {
    let mut entries = IndexMap::new();
    for (key, value) in pairs {
        entries.insert(MapKey::Str(key.into()), string_instance(value));
    }
    Value::Instance(Instance::with_payload(
        HootClass::blank("Map"),
        NativePayload::Map(entries),
    ))
}

/// `string(x)`: wraps the textualized argument.
pub(super) fn new_string(args: &[Value]) -> Value {
    let text = args[0].as_text().unwrap_or_else(|| args[0].stringify());
    string_instance(text)
}

/// `list(...)`: variadic constructor over the arguments.
pub(super) fn new_list(args: Args) -> Value {
    list_instance(args.into_vec())
}

/// `map()`: empty insertion-ordered storage.
pub(super) fn new_map() -> Value {
    Value::Instance(Instance::with_payload(
        HootClass::blank("Map"),
        NativePayload::Map(IndexMap::new()),
    ))
}

/// Dispatches a bound collection method.
pub(super) fn call_method(
    receiver: &InstanceRef,
    kind: NativeFn,
    args: &[Value],
    token: &Token,
) -> RunResult<Value> {
    // Textualize the replacement before borrowing the receiver: the argument
    // may alias it (e.g. `s.alter(0, s)`).
    let alter_replacement = match (kind, args.get(1)) {
        (NativeFn::Alter, Some(value)) => Some((value.as_text(), value.stringify())),
        _ => None,
    };

    let mut inner = receiver.borrow_mut();
    match (&mut inner.payload, kind) {
        (NativePayload::Text(text), NativeFn::At) => {
            let index = index_arg(&args[0], "at", text.chars().count(), token)?;
            let ch = text.chars().nth(index).expect("index checked against length");
            Ok(string_instance(ch.to_string()))
        }
        (NativePayload::Text(text), NativeFn::Alter) => {
            let index = index_arg(&args[0], "alter", text.chars().count(), token)?;
            let (replacement, rendered) = alter_replacement.expect("arity checked");
            let replacement = replacement.ok_or_else(|| {
                RuntimeError::new(token.clone(), format!("'alter' only accepts strings. Got '{rendered}'."))
            })?;
            let mut replacement_chars = replacement.chars();
            let ch = replacement_chars.next();
            let Some(ch) = ch.filter(|_| replacement_chars.next().is_none()) else {
                return Err(RuntimeError::new(
                    token.clone(),
                    format!("'alter' expects a single character. Got '{replacement}'."),
                ));
            };
            *text = text
                .chars()
                .enumerate()
                .map(|(i, existing)| if i == index { ch } else { existing })
                .collect();
            Ok(Value::Nil)
        }
        (NativePayload::Text(text), NativeFn::Length) => Ok(Value::Number(text.chars().count() as f64)),

        (NativePayload::List(elements), NativeFn::At) => {
            let index = index_arg(&args[0], "at", elements.len(), token)?;
            Ok(elements[index].clone())
        }
        (NativePayload::List(elements), NativeFn::Alter) => {
            let index = index_arg(&args[0], "alter", elements.len(), token)?;
            elements[index] = args[1].clone();
            Ok(Value::Nil)
        }
        (NativePayload::List(elements), NativeFn::Length) => Ok(Value::Number(elements.len() as f64)),
        (NativePayload::List(elements), NativeFn::Push) => {
            elements.push(args[0].clone());
            Ok(Value::Nil)
        }
        (NativePayload::List(elements), NativeFn::Pop) => elements
            .pop()
            .ok_or_else(|| RuntimeError::new(token.clone(), "Can't pop from an empty list.")),

        (NativePayload::Map(entries), NativeFn::MapGet) => {
            let key = map_key(&args[0], token)?;
            Ok(entries.get(&key).cloned().unwrap_or(Value::Nil))
        }
        (NativePayload::Map(entries), NativeFn::MapSet) => {
            let key = map_key(&args[0], token)?;
            entries.insert(key, args[1].clone());
            Ok(Value::Nil)
        }

        _ => unreachable!("method_for only binds methods matching the payload"),
    }
}

fn index_arg(value: &Value, what: &str, length: usize, token: &Token) -> RunResult<usize> {
    let number = number_arg(value, what, token)?;
    let index = number.trunc();
    if index < 0.0 || (index as usize) >= length {
        return Err(RuntimeError::new(
            token.clone(),
            format!("Index {} out of range.", crate::value::format_number(index)),
        ));
    }
    Ok(index as usize)
}

fn map_key(value: &Value, token: &Token) -> RunResult<MapKey> {
    MapKey::from_value(value).ok_or_else(|| {
        RuntimeError::new(token.clone(), "Map keys must be nil, booleans, numbers, or strings.")
    })
}
