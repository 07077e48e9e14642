// Injection point handling for idox
// Finds which request field carries the marker and substitutes tokens into it

use crate::error::IdoxError;
use crate::models::{render_cookies, Body, Request};
use serde_json::Value;
use std::fmt;

/// The single request field that receives each token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionSite {
    Url,
    Headers,
    Cookies,
    Body,
}

impl fmt::Display for InjectionSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InjectionSite::Url => write!(f, "url"),
            InjectionSite::Headers => write!(f, "headers"),
            InjectionSite::Cookies => write!(f, "cookies"),
            InjectionSite::Body => write!(f, "body"),
        }
    }
}

/// Return the first field, in the order URL, headers, cookies, body, whose
/// rendered form contains `marker` as a plain substring.
pub fn locate(request: &Request, marker: &str) -> Result<InjectionSite, IdoxError> {
    if marker.is_empty() {
        return Err(IdoxError::EmptyInjectionPoint);
    }

    if request.url.contains(marker) {
        Ok(InjectionSite::Url)
    } else if request.headers.to_string().contains(marker) {
        Ok(InjectionSite::Headers)
    } else if render_cookies(&request.cookies).contains(marker) {
        Ok(InjectionSite::Cookies)
    } else if request.body.to_string().contains(marker) {
        Ok(InjectionSite::Body)
    } else {
        Err(IdoxError::InjectionPointNotFound {
            marker: marker.to_string(),
        })
    }
}

/// Copy `template` with every occurrence of `marker` in the `site` field
/// replaced by `token`. Every other field is left untouched.
pub fn substitute(template: &Request, site: InjectionSite, marker: &str, token: &str) -> Request {
    let mut request = template.clone();
    match site {
        InjectionSite::Url => request.url = template.url.replace(marker, token),
        InjectionSite::Headers => {
            request.headers = template.headers.map_entries(|s| s.replace(marker, token));
        }
        InjectionSite::Cookies => {
            request.cookies = template
                .cookies
                .iter()
                .map(|(name, value)| (name.replace(marker, token), value.replace(marker, token)))
                .collect();
        }
        InjectionSite::Body => {
            request.body = match &template.body {
                Body::Text(text) => Body::Text(text.replace(marker, token)),
                Body::Json(value) => {
                    let mut value = value.clone();
                    replace_in_json(&mut value, marker, token);
                    Body::Json(value)
                }
            };
        }
    }
    request
}

// Walks objects and arrays, replacing inside keys and string values.
fn replace_in_json(json: &mut Value, marker: &str, token: &str) {
    match json {
        Value::String(s) => {
            if s.contains(marker) {
                *s = s.replace(marker, token);
            }
        }
        Value::Object(map) => {
            if map.keys().any(|k| k.contains(marker)) {
                let entries: Vec<(String, Value)> = std::mem::take(map).into_iter().collect();
                for (k, v) in entries {
                    map.insert(k.replace(marker, token), v);
                }
            }
            for v in map.values_mut() {
                replace_in_json(v, marker, token);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                replace_in_json(v, marker, token);
            }
        }
        _ => {}
    }
}
