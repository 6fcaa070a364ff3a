//! HTTP native: `request`.
//!
//! `request(url, body, headers, method, callback)` performs the blocking
//! HTTP call on a worker thread via `ureq`. Header extraction happens on the
//! driver thread before the task is spawned (values never cross threads);
//! the response is shipped back as plain data and wrapped into a `Response`
//! instance with `body` (string-instance) and `headers` (map-instance)
//! fields right before the callback runs.

use crate::{
    error::{RunResult, RuntimeError},
    interpret::{Args, Interpreter},
    natives::{collections, text_arg},
    object::{HootClass, Instance, MapKey, NativePayload},
    sched::{TaskKind, TaskOutcome, TaskPayload},
    token::Token,
    value::Value,
};

pub(super) fn request(interpreter: &mut Interpreter<'_>, args: Args, paren: &Token) -> RunResult<Value> {
    let mut args = args.into_iter();
    let url = text_arg(&args.next().expect("arity checked"), "request", paren)?;
    let body = match args.next().expect("arity checked") {
        Value::Nil => None,
        value => Some(text_arg(&value, "request", paren)?),
    };
    let headers = header_pairs(&args.next().expect("arity checked"), paren)?;
    let method = text_arg(&args.next().expect("arity checked"), "request", paren)?;
    let callback = args.next().expect("arity checked");

    interpreter
        .scheduler_mut()
        .spawn(TaskKind::HttpRequest, Some(callback), paren.clone(), move || {
            perform(&url, body.as_deref(), &headers, &method)
        });

    Ok(Value::Nil)
}

/// Flattens a headers argument (a map-instance or nil) into string pairs.
fn header_pairs(value: &Value, paren: &Token) -> RunResult<Vec<(String, String)>> {
    match value {
        Value::Nil => Ok(Vec::new()),
        Value::Instance(instance) => {
            if let NativePayload::Map(entries) = &instance.borrow().payload {
                let mut pairs = Vec::with_capacity(entries.len());
                for (key, header_value) in entries {
                    let MapKey::Str(name) = key else {
                        return Err(RuntimeError::new(
                            paren.clone(),
                            "Header names must be strings.".to_owned(),
                        ));
                    };
                    let text = header_value
                        .as_text()
                        .unwrap_or_else(|| header_value.stringify());
                    pairs.push((name.to_string(), text));
                }
                Ok(pairs)
            } else {
                Err(header_type_error(paren))
            }
        }
        _ => Err(header_type_error(paren)),
    }
}

fn header_type_error(paren: &Token) -> RuntimeError {
    RuntimeError::new(paren.clone(), "'request' headers must be a map or nil.")
}

/// The blocking HTTP call; runs on a worker thread.
fn perform(url: &str, body: Option<&str>, headers: &[(String, String)], method: &str) -> TaskOutcome {
    let mut request = ureq::request(method, url);
    for (name, value) in headers {
        request = request.set(name, value);
    }

    let response = match body {
        Some(text) => request.send_string(text),
        None => request.call(),
    }
    .map_err(|err| format!("Error requesting '{url}'. Caught error: {err}"))?;

    let mut header_pairs = Vec::new();
    for name in response.headers_names() {
        let value = response.header(&name).unwrap_or_default().to_owned();
        header_pairs.push((name, value));
    }

    let body = response
        .into_string()
        .map_err(|err| format!("Error requesting '{url}'. Caught error: {err}"))?;

    Ok(TaskPayload::Response {
        body,
        headers: header_pairs,
    })
}

/// Builds the `Response` instance handed to the user callback.
pub(crate) fn response_instance(body: String, headers: Vec<(String, String)>) -> Value {
    let instance = Instance::new(HootClass::blank("Response"));
    {
        let mut inner = instance.borrow_mut();
        inner.fields.insert("body".to_owned(), collections::string_instance(body));
        inner
            .fields
            .insert("headers".to_owned(), collections::map_from_pairs(headers));
    }
    Value::Instance(instance)
}
