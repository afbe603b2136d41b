// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! JSON batch documents in readsb / adsb.lol style.
//!
//! Accepted shapes:
//!
//! ```text
//! [ {report}, {report}, ... ]
//! { "ac": [ {report}, ... ], ... }
//! { "aircraft": [ {report}, ... ], ... }
//! ```

use log::warn;
use serde_json::Value;

use super::{ParseError, Protocol, RawReport};

/// Parser for one JSON batch document per input.
#[derive(Debug, Default)]
pub struct JsonBatchParser;

impl JsonBatchParser {
    /// Create a new JSON batch parser.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Protocol for JsonBatchParser {
    type Message = Vec<RawReport>;
    type Error = ParseError;

    fn parse(&mut self, input: &[u8]) -> Result<Option<Vec<RawReport>>, ParseError> {
        if input.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let document: Value = serde_json::from_slice(input)?;
        parse_batch_document(document).map(Some)
    }
}

fn parse_batch_document(document: Value) -> Result<Vec<RawReport>, ParseError> {
    let entries = match document {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("ac").or_else(|| map.remove("aircraft")) {
            Some(Value::Array(entries)) => entries,
            Some(other) => {
                return Err(ParseError::UnrecognizedShape(format!(
                    "aircraft list is {}",
                    json_type(&other)
                )))
            }
            None => {
                return Err(ParseError::UnrecognizedShape(
                    "object without \"ac\" or \"aircraft\"".to_string(),
                ))
            }
        },
        other => {
            return Err(ParseError::UnrecognizedShape(format!(
                "top level is {}",
                json_type(&other)
            )))
        }
    };

    // A single bad entry is dropped, not the batch
    let reports = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<RawReport>(entry) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("Skipping unreadable report #{index}: {e}");
                None
            }
        })
        .collect();

    Ok(reports)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
