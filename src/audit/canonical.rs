//! Canonical Serialization
//!
//! Deterministic JSON rendering of events and envelopes, byte-compatible
//! with the form the log service used when it hashed and signed a record.
//!
//! Rules:
//! - object keys are sorted at every level
//! - no insignificant whitespace; non-ASCII text is emitted as raw UTF-8
//! - timestamps render as `YYYY-MM-DDTHH:MM:SS.mmmZ`
//! - numbers follow the ECMAScript `Number#toString` rendering
//! - top-level event values that are objects or arrays are replaced by
//!   their own canonical JSON text before the event is serialized

use chrono::{DateTime, Utc};
use serde_json::Number;
use std::collections::BTreeMap;

use crate::audit::entry::{Envelope, Event, EventValue};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Canonical bytes of an event, as signed by the event producer
pub fn canonicalize_event(event: &Event) -> Vec<u8> {
    canonical_json(&prepare_event(event)).into_bytes()
}

/// Canonical bytes of an envelope, as hashed into the tree
pub fn canonicalize_envelope(envelope: &Envelope) -> Vec<u8> {
    let mut fields: BTreeMap<String, EventValue> = envelope
        .extra
        .iter()
        .map(|(k, v)| (k.clone(), EventValue::from(v.clone())))
        .collect();

    fields.insert("event".to_string(), prepare_event(&envelope.event));
    if let Some(signature) = &envelope.signature {
        fields.insert("signature".to_string(), EventValue::from(signature.as_str()));
    }
    if let Some(public_key) = &envelope.public_key {
        fields.insert("public_key".to_string(), EventValue::from(public_key.as_str()));
    }
    if let Some(received_at) = &envelope.received_at {
        fields.insert("received_at".to_string(), EventValue::from(received_at.as_str()));
    }

    canonical_json(&EventValue::Object(fields)).into_bytes()
}

/// Replace structured top-level values with their canonical text.
pub fn prepare_event(event: &Event) -> EventValue {
    EventValue::Object(
        event
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    EventValue::Object(_) | EventValue::Array(_) => {
                        EventValue::String(canonical_json(value))
                    }
                    other => other.clone(),
                };
                (key.clone(), value)
            })
            .collect(),
    )
}

/// Render any value as canonical JSON text
pub fn canonical_json(value: &EventValue) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &EventValue, out: &mut String) {
    match value {
        EventValue::Null => out.push_str("null"),
        EventValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        EventValue::Number(n) => out.push_str(&format_number(n)),
        EventValue::String(s) => write_string(s, out),
        EventValue::Timestamp(ts) => write_string(&format_timestamp(ts), out),
        EventValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        EventValue::Object(map) => {
            let mut entries: Vec<(&String, &EventValue)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_value(item, out);
            }
            out.push('}');
        }
    }
}

fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) => format_float(f),
        None => n.to_string(),
    }
}

fn format_float(f: f64) -> String {
    if !f.is_finite() {
        return "null".to_string();
    }
    if f == 0.0 {
        return "0".to_string();
    }
    if f < 0.0 {
        return format!("-{}", format_float(-f));
    }

    // Shortest round-trip digits, e.g. "1.2345e2"
    let sci = format!("{:e}", f);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some(parts) => parts,
        None => return sci,
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = match exponent.parse() {
        Ok(e) => e,
        Err(_) => return sci,
    };

    let k = digits.len() as i32;
    let n = exponent + 1;

    if k <= n && n <= 21 {
        format!("{}{}", digits, "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        format!("{}.{}", &digits[..n as usize], &digits[n as usize..])
    } else if -6 < n && n <= 0 {
        format!("0.{}{}", "0".repeat((-n) as usize), digits)
    } else {
        let sign = if n - 1 < 0 { '-' } else { '+' };
        let exp = (n - 1).abs();
        if k == 1 {
            format!("{}e{}{}", digits, sign, exp)
        } else {
            format!("{}.{}e{}{}", &digits[..1], &digits[1..], sign, exp)
        }
    }
}
