//! Reading typed values out of resolved block inputs
//!
//! The runner hands every declared input over, unconnected ones as their
//! empty default, so `null` and missing values are read as "nothing".

use flow_engine::{FlowError, PortValues, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::stix::{StixBundle, Technique};

fn input<'a>(inputs: &'a PortValues, port: &str) -> Option<&'a Value> {
    inputs.get(port).filter(|v| !v.is_null())
}

fn list<T: DeserializeOwned>(inputs: &PortValues, port: &str) -> Result<Vec<T>> {
    match input(inputs, port) {
        None => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| FlowError::failed(format!("Input '{}' is not a valid list: {}", port, e))),
    }
}

/// A technique list; absent input reads as empty
pub(crate) fn techniques(inputs: &PortValues, port: &str) -> Result<Vec<Technique>> {
    list(inputs, port)
}

/// A list of strings; absent input reads as empty
pub(crate) fn strings(inputs: &PortValues, port: &str) -> Result<Vec<String>> {
    list(inputs, port)
}

/// A text value; absent input reads as empty
pub(crate) fn text(inputs: &PortValues, port: &str) -> Result<String> {
    match input(inputs, port) {
        None => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(FlowError::failed(format!(
            "Input '{}' must be text, got {}",
            port, other
        ))),
    }
}

/// A STIX bundle; `None` when nothing is connected
pub(crate) fn bundle(inputs: &PortValues, port: &str) -> Result<Option<StixBundle>> {
    input(inputs, port)
        .map(|value| {
            serde_json::from_value(value.clone())
                .map_err(|e| FlowError::failed(format!("Input '{}' is not a STIX bundle: {}", port, e)))
        })
        .transpose()
}

/// A single-port output map
pub(crate) fn output(port: &str, value: impl serde::Serialize) -> Result<PortValues> {
    let mut outputs = PortValues::new();
    outputs.insert(port.to_string(), serde_json::to_value(value)?);
    Ok(outputs)
}
