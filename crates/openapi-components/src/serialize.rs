//! Call-time serialization of arguments into path, query, headers and body.
//!
//! [`serialize_request`] is pure: no I/O, no shared state.

use crate::components::Component;
use crate::error::{OpenApiComponentsError, Result};
use crate::routes::{ArrayStyle, HttpMethod, ParamLocation, RouteParameter};
use serde_json::{Map, Value};

/// The outbound request parts for one call, before the base URL is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedRequest {
    pub method: HttpMethod,
    /// Path template with every placeholder substituted (percent-encoded).
    pub path: String,
    /// Query pairs in parameter declaration order; values are not yet percent-encoded.
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Content type of `body`, when there is one.
    pub content_type: Option<String>,
}

/// Map `arguments` onto the request parts of `component`'s route.
///
/// Arguments that match no declared parameter or body field are ignored.
///
/// # Errors
///
/// Returns [`OpenApiComponentsError::MissingPathParameters`] listing every path parameter that
/// is absent or null.
pub fn serialize_request(
    component: &Component,
    arguments: &Map<String, Value>,
) -> Result<SerializedRequest> {
    let route = &component.route;

    let path = substitute_path(&route.path, route.parameters_in(ParamLocation::Path), arguments)?;

    let query = route
        .parameters_in(ParamLocation::Query)
        .filter_map(|p| arguments.get(&p.name).map(|v| (p, v)))
        .flat_map(|(p, v)| serialize_query_param(p, v))
        .collect();

    let headers = route
        .parameters_in(ParamLocation::Header)
        .filter_map(|p| {
            arguments
                .get(&p.name)
                .map(|v| (p.name.clone(), header_value(v)))
        })
        .collect();

    let (body, content_type) = match &route.request_body {
        Some(rb) => {
            let body = match &rb.fields {
                Some(fields) => {
                    let obj: Map<String, Value> = fields
                        .iter()
                        .filter_map(|f| arguments.get(f).map(|v| (f.clone(), v.clone())))
                        .collect();
                    (!obj.is_empty() || rb.required).then_some(Value::Object(obj))
                }
                None => arguments.get("body").cloned(),
            };
            let content_type = body.as_ref().map(|_| rb.content_type.clone());
            (body, content_type)
        }
        None => (None, None),
    };

    Ok(SerializedRequest {
        method: route.method,
        path,
        query,
        headers,
        body,
        content_type,
    })
}

fn substitute_path<'a>(
    template: &str,
    params: impl Iterator<Item = &'a RouteParameter>,
    arguments: &Map<String, Value>,
) -> Result<String> {
    let mut path = template.to_string();
    let mut missing = Vec::new();

    for param in params {
        match arguments.get(&param.name) {
            None | Some(Value::Null) => missing.push(param.name.clone()),
            Some(value) => {
                let encoded = encode_path_segment(&simple_style(value));
                path = path.replace(&format!("{{{}}}", param.name), &encoded);
            }
        }
    }

    if missing.is_empty() {
        Ok(path)
    } else {
        Err(OpenApiComponentsError::MissingPathParameters(missing))
    }
}

/// Simple style: arrays as `a,b,c`, objects as `k1,v1,k2,v2`.
fn simple_style(value: &Value) -> String {
    match value {
        Value::Array(items) => items.iter().map(value_to_string).collect::<Vec<_>>().join(","),
        Value::Object(map) => map
            .iter()
            .flat_map(|(k, v)| [k.clone(), value_to_string(v)])
            .collect::<Vec<_>>()
            .join(","),
        other => value_to_string(other),
    }
}

fn header_value(value: &Value) -> String {
    simple_style(value)
}

fn query_value_is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

fn serialize_query_param(param: &RouteParameter, value: &Value) -> Vec<(String, String)> {
    if query_value_is_empty(value) {
        return Vec::new();
    }
    match value {
        Value::Array(items) => serialize_query_array(&param.name, items, param.array_style),
        Value::Object(map) => serialize_query_object(&param.name, map, param.array_style),
        scalar => vec![(param.name.clone(), value_to_string(scalar))],
    }
}

fn serialize_query_array(name: &str, items: &[Value], style: ArrayStyle) -> Vec<(String, String)> {
    let items: Vec<String> = items.iter().map(value_to_string).collect();
    let joined = |sep: &str| vec![(name.to_string(), items.join(sep))];
    match style {
        ArrayStyle::Exploded => items
            .iter()
            .map(|v| (name.to_string(), v.clone()))
            .collect(),
        ArrayStyle::CommaJoined | ArrayStyle::DeepObject => joined(","),
        ArrayStyle::SpaceDelimited => joined(" "),
        ArrayStyle::PipeDelimited => joined("|"),
    }
}

fn serialize_query_object(
    name: &str,
    map: &Map<String, Value>,
    style: ArrayStyle,
) -> Vec<(String, String)> {
    match style {
        ArrayStyle::DeepObject => map
            .iter()
            .map(|(k, v)| (format!("{name}[{k}]"), value_to_string(v)))
            .collect(),
        ArrayStyle::Exploded => map
            .iter()
            .map(|(k, v)| (k.clone(), value_to_string(v)))
            .collect(),
        ArrayStyle::CommaJoined => {
            vec![(name.to_string(), simple_style(&Value::Object(map.clone())))]
        }
        ArrayStyle::SpaceDelimited | ArrayStyle::PipeDelimited => {
            vec![(name.to_string(), Value::Object(map.clone()).to_string())]
        }
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}

/// Percent-encode a path segment, keeping RFC 3986 `pchar` characters (so `a,b` stays as is).
fn encode_path_segment(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if is_pchar(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}

fn is_pchar(b: u8) -> bool {
    matches!(
        b,
        b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'.'
            | b'_'
            | b'~'
            | b'!'
            | b'$'
            | b'&'
            | b'\''
            | b'('
            | b')'
            | b'*'
            | b'+'
            | b','
            | b';'
            | b'='
            | b':'
            | b'@'
    )
}
