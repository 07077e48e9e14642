// Core data models for idox

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Scheme used when a template URL carries none
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    Http,
    #[default]
    Https,
}

impl Protocol {
    /// Prefix `url` with this scheme unless it already has one.
    pub fn apply(&self, url: &str) -> String {
        if has_scheme(url) {
            url.to_string()
        } else {
            format!("{}://{}", self, url)
        }
    }
}

fn has_scheme(url: &str) -> bool {
    let lowered = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://")
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Https => write!(f, "https"),
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            other => Err(format!("unsupported protocol: {}", other)),
        }
    }
}

/// Ordered header collection with case-insensitive names.
///
/// Inserting a name that already exists (in any casing) replaces its value
/// in place; the first-seen casing of the name is kept. Equality compares
/// names case-insensitively and values exactly, ignoring order.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(idx) => self.entries[idx].1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|idx| self.entries[idx].1.as_str())
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|idx| self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply `f` to every name and value, keeping order.
    pub fn map_entries<F>(&self, mut f: F) -> Headers
    where
        F: FnMut(&str) -> String,
    {
        let mut out = Headers::new();
        for (k, v) in self.iter() {
            out.insert(f(k), f(v));
        }
        out
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))
    }
}

impl PartialEq for Headers {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl Eq for Headers {}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in self.iter() {
            writeln!(f, "{}: {}", k, v)?;
        }
        Ok(())
    }
}

/// Request body: raw text, or a JSON value when the template declared JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Text(String),
    Json(Value),
}

impl Body {
    pub fn is_empty(&self) -> bool {
        match self {
            Body::Text(text) => text.is_empty(),
            Body::Json(_) => false,
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::Text(String::new())
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Text(text) => f.write_str(text),
            Body::Json(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

/// A parsed request template
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub url: String,
    pub method: String,
    pub body: Body,
    pub headers: Headers,
    pub cookies: Vec<(String, String)>,
}

impl Request {
    /// Build a bare request for a target URL, with no headers, cookies or body.
    pub fn from_url(url: impl Into<String>, method: &str) -> Self {
        Self {
            url: url.into(),
            method: method.to_ascii_uppercase(),
            body: Body::default(),
            headers: Headers::new(),
            cookies: Vec::new(),
        }
    }
}

/// Render cookie pairs the way a `Cookie` header carries them.
pub fn render_cookies(cookies: &[(String, String)]) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// A parsed raw HTTP response (captured from a proxy or a file)
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub proto: String,
    pub status_code: u16,
    pub status_text: String,
    pub headers: Headers,
    pub body: String,
}
