use std::collections::HashMap;

use anyhow::{Context, Result, bail};

use crate::network::Value;

/// Named configuration values handed to every filter, e.g. substitutions for `$MODEL`.
pub type ContextValues = HashMap<String, Value>;

/// Read-only inputs shared by every filter in one execution.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    values: &'a ContextValues,
    shader_type_priority: &'a [String],
}

impl<'a> FilterContext<'a> {
    pub fn new(values: &'a ContextValues, shader_type_priority: &'a [String]) -> Self {
        Self {
            values,
            shader_type_priority,
        }
    }

    pub fn values(&self) -> &'a ContextValues {
        self.values
    }

    pub fn value(&self, name: &str) -> Option<&'a Value> {
        self.values.get(name)
    }

    pub fn str_value(&self, name: &str) -> Option<&'a str> {
        self.values.get(name).and_then(|v| v.as_str())
    }

    pub fn f64_value(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(Value::as_f64)
    }

    pub fn bool_value(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(|v| v.as_bool())
    }

    /// Backend shader types, most preferred first.
    pub fn shader_type_priority(&self) -> &'a [String] {
        self.shader_type_priority
    }

    /// First entry of the priority list that appears among `candidates`.
    pub fn preferred_shader_type<'c, I>(&self, candidates: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'c str>,
    {
        let candidates: Vec<&str> = candidates.into_iter().collect();
        self.shader_type_priority
            .iter()
            .map(String::as_str)
            .find(|ty| candidates.contains(ty))
    }
}

pub fn context_values_from_json_str(text: &str) -> Result<ContextValues> {
    let value: Value = serde_json::from_str(text).context("failed to parse context values json")?;
    let Value::Object(map) = value else {
        bail!("context values json must be an object");
    };
    Ok(map.into_iter().collect())
}

pub fn load_context_values_from_path(path: impl AsRef<std::path::Path>) -> Result<ContextValues> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read context values at {}", path.display()))?;
    context_values_from_json_str(&text)
        .with_context(|| format!("invalid context values at {}", path.display()))
}
