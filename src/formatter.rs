// Copyright (C) 2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of tracing-logstash.
//
// tracing-logstash is free software: you can redistribute it and/or modify it under the terms of
// the GNU General Public License as published by the Free Software Foundation, either version 3 of
// the License, or (at your option) any later version.
//
// tracing-logstash is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See
// the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with tracing-logstash.
// If not, see <http://www.gnu.org/licenses/>.

//! Logstash record formatting.
//!
//! This module defines the [`Formatter`] capability & its default implementation,
//! [`LogstashFormatter`].

use crate::{
    event::LogEvent,
    value::{Fields, Value},
};

use bytes::BufMut;
use chrono::SecondsFormat;

type StdResult<T, E> = std::result::Result<T, E>;

/// The result of formatting one event: a complete record, ready for the wire
pub type FormatResult = StdResult<Vec<u8>, Box<dyn std::error::Error + Send + Sync + 'static>>;

/// Operations all formatters must support
/// ======================================
///
/// The translation from a [`LogEvent`] to bytes on the wire occurs in two parts:
///
/// 1. serializing the event (its message, level, timestamp & fields) to a record
///
/// 2. transporting that record to Logstash
///
/// [`Formatter`] implements step 1. Implementations must not mutate the event; by the time
/// a formatter sees it, any static fields have already been merged in. The trait is object-safe
/// so that callers can supply their own at runtime (see
/// [`OptionsBuilder::formatter`](crate::options::OptionsBuilder::formatter)); any closure of the
/// right shape will do.
pub trait Formatter {
    fn format(&self, event: &LogEvent) -> FormatResult;
}

impl<F> Formatter for F
where
    F: Fn(&LogEvent) -> FormatResult,
{
    fn format(&self, event: &LogEvent) -> FormatResult {
        self(event)
    }
}

/// How [`LogstashFormatter`] treats field names carrying a hook-only prefix
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyMode {
    /// Emit every key exactly as it appears on the event
    Verbatim,
    /// Emit keys that begin with the given (non-empty) prefix with that prefix removed. Should the
    /// stripped name collide with an un-prefixed field, the un-prefixed field wins.
    StripPrefix(String),
}

impl std::default::Default for KeyMode {
    fn default() -> Self {
        KeyMode::Verbatim
    }
}

/// Serialize [`LogEvent`]s to the Logstash JSON event schema, one object per line.
///
/// The record is the event's fields plus the reserved keys `@timestamp`, `@version`, `@level`,
/// `@message` & `type`. Reserved keys are computed last, so user fields can never replace them; a
/// user field that *would* have collided with `message`, `level` or `type` is kept under
/// `fields.message`, `fields.level` or `fields.type` respectively.
#[derive(Clone, Debug)]
pub struct LogstashFormatter {
    kind: String,
    version: String,
    timestamp_format: Option<String>,
    keys: KeyMode,
}

impl LogstashFormatter {
    /// The Logstash event schema version this crate speaks
    pub const SCHEMA_VERSION: &'static str = "1";

    /// Construct a formatter whose records will carry `type: kind`; if `kind` is empty, the
    /// `type` key is omitted.
    pub fn new<S: Into<String>>(kind: S) -> LogstashFormatter {
        LogstashFormatter {
            kind: kind.into(),
            version: LogstashFormatter::SCHEMA_VERSION.to_owned(),
            timestamp_format: None,
            keys: KeyMode::Verbatim,
        }
    }
    pub fn kind(&self) -> &str {
        &self.kind
    }
    pub fn with_version<S: Into<String>>(mut self, version: S) -> Self {
        self.version = version.into();
        self
    }
    /// Render `@timestamp` with a [`chrono` format string] rather than RFC 3339.
    ///
    /// [`chrono` format string]: https://docs.rs/chrono/latest/chrono/format/strftime/index.html
    pub fn with_timestamp_format<S: Into<String>>(mut self, fmt: S) -> Self {
        self.timestamp_format = Some(fmt.into());
        self
    }
    pub fn with_key_mode(mut self, keys: KeyMode) -> Self {
        self.keys = keys;
        self
    }

    fn timestamp(&self, event: &LogEvent) -> StdResult<String, std::fmt::Error> {
        match &self.timestamp_format {
            None => Ok(event.time.to_rfc3339_opts(SecondsFormat::Secs, true)),
            Some(fmt) => {
                // Unlike `to_string()`, `write!` reports a bad format string rather than
                // panicking.
                use std::fmt::Write;
                let mut s = String::new();
                write!(s, "{}", event.time.format(fmt))?;
                Ok(s)
            }
        }
    }

    fn copy_fields(&self, event: &LogEvent) -> Fields {
        let mut fields = Fields::new();
        for (key, value) in &event.fields {
            match &self.keys {
                KeyMode::StripPrefix(prefix) if !prefix.is_empty() && key.starts_with(prefix) => {
                    fields
                        .entry(key[prefix.len()..].to_owned())
                        .or_insert_with(|| value.clone());
                }
                _ => {
                    fields.insert(key.clone(), value.clone());
                }
            }
        }
        fields
    }
}

impl Formatter for LogstashFormatter {
    fn format(&self, event: &LogEvent) -> FormatResult {
        let mut fields = self.copy_fields(event);

        fields.insert("@version".to_owned(), Value::from(self.version.as_str()));
        fields.insert("@timestamp".to_owned(), Value::Str(self.timestamp(event)?));

        if let Some(v) = event.fields.get("message") {
            fields.insert("fields.message".to_owned(), v.clone());
        }
        fields.insert("@message".to_owned(), Value::from(event.message.as_str()));

        if let Some(v) = event.fields.get("level") {
            fields.insert("fields.level".to_owned(), v.clone());
        }
        fields.insert("@level".to_owned(), Value::from(event.level.as_str()));

        if !self.kind.is_empty() {
            if let Some(v) = event.fields.get("type") {
                fields.insert("fields.type".to_owned(), v.clone());
            }
            fields.insert("type".to_owned(), Value::from(self.kind.as_str()));
        }

        let mut buf = Vec::with_capacity(256);
        serde_json::to_writer(&mut buf, &fields)?;
        buf.put_u8(b'\n');
        Ok(buf)
    }
}

#[cfg(test)]
mod test {

    use super::*;

    use crate::level::Level;

    fn parse(buf: &[u8]) -> serde_json::Value {
        assert_eq!(buf.last(), Some(&b'\n'));
        serde_json::from_slice(buf).unwrap()
    }

    #[test]
    fn logstash_schema() {
        let event = LogEvent::new(Level::Panic, "hello world")
            .with_time(LogEvent::zero_time())
            .with_field("id", "a1");
        let rsp = LogstashFormatter::new("test1").format(&event).unwrap();
        assert_eq!(
            parse(&rsp),
            serde_json::json!({"id": "a1", "@message": "hello world", "@level": "panic",
                               "@timestamp": "0001-01-01T00:00:00Z", "type": "test1",
                               "@version": "1"})
        );
        // Formatting is read-only
        assert_eq!(event.fields.len(), 1);
    }

    #[test]
    fn reserved_keys_win() {
        let event = LogEvent::new(Level::Warn, "msg")
            .with_time(LogEvent::zero_time())
            .with_field("message", "user message")
            .with_field("level", 3)
            .with_field("type", "user type")
            .with_field("@version", "99");
        let rsp = parse(&LogstashFormatter::new("app").format(&event).unwrap());
        assert_eq!(rsp["@message"], "msg");
        assert_eq!(rsp["fields.message"], "user message");
        assert_eq!(rsp["@level"], "warning");
        assert_eq!(rsp["fields.level"], 3);
        assert_eq!(rsp["type"], "app");
        assert_eq!(rsp["fields.type"], "user type");
        assert_eq!(rsp["@version"], "1");
        // The user's `message` key survives alongside `fields.message`
        assert_eq!(rsp["message"], "user message");
    }

    #[test]
    fn empty_kind_omits_type() {
        let event = LogEvent::new(Level::Info, "x").with_field("type", "mine");
        let rsp = parse(&LogstashFormatter::new("").format(&event).unwrap());
        assert_eq!(rsp["type"], "mine");
        assert!(rsp.get("fields.type").is_none());
    }

    #[test]
    fn key_modes() {
        let event = LogEvent::new(Level::Info, "x")
            .with_field("_hostname", "h1")
            .with_field("status", "up");

        let verbatim = parse(&LogstashFormatter::new("app").format(&event).unwrap());
        assert_eq!(verbatim["_hostname"], "h1");
        assert!(verbatim.get("hostname").is_none());

        let stripped = parse(
            &LogstashFormatter::new("app")
                .with_key_mode(KeyMode::StripPrefix("_".to_owned()))
                .format(&event)
                .unwrap(),
        );
        assert_eq!(stripped["hostname"], "h1");
        assert_eq!(stripped["status"], "up");
        assert!(stripped.get("_hostname").is_none());

        // Un-prefixed fields beat stripped ones
        let event = event.with_field("hostname", "h2");
        let stripped = parse(
            &LogstashFormatter::new("app")
                .with_key_mode(KeyMode::StripPrefix("_".to_owned()))
                .format(&event)
                .unwrap(),
        );
        assert_eq!(stripped["hostname"], "h2");
    }

    #[test]
    fn timestamps() {
        let event = LogEvent::new(Level::Debug, "x").with_time(LogEvent::zero_time());
        let rsp = parse(
            &LogstashFormatter::new("app")
                .with_timestamp_format("%Y/%m/%d")
                .format(&event)
                .unwrap(),
        );
        assert_eq!(rsp["@timestamp"], "0001/01/01");

        assert!(LogstashFormatter::new("app")
            .with_timestamp_format("%Y %")
            .format(&event)
            .is_err());
    }

    #[test]
    fn unserializable_values() {
        let event = LogEvent::new(Level::Info, "x").with_field("ratio", f64::NAN);
        let err = LogstashFormatter::new("app").format(&event).unwrap_err();
        assert!(err.to_string().contains("unsupported value"));
    }

    #[test]
    fn closures_are_formatters() {
        let f = |event: &LogEvent| -> FormatResult { Ok(event.message.clone().into_bytes()) };
        assert_eq!(f.format(&LogEvent::new(Level::Info, "abc")).unwrap(), b"abc");
    }
}
