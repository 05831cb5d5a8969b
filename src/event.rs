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

//! The unit of work handed to a [`Hook`](crate::hook::Hook).

use crate::{
    level::Level,
    value::{Fields, Value},
};

use chrono::prelude::*;

/// One log event: a severity, a message, a timestamp & an arbitrary field mapping.
///
/// Hooks receive a `&mut LogEvent`: static fields are merged into `fields` in place, and a prefix
/// filter may remove keys from it, so hooks fired later on the same event observe those changes.
#[derive(Clone, Debug, PartialEq)]
pub struct LogEvent {
    pub level: Level,
    pub message: String,
    pub time: DateTime<Utc>,
    pub fields: Fields,
}

impl LogEvent {
    /// A new event stamped with the current time & no fields
    pub fn new<S: Into<String>>(level: Level, message: S) -> LogEvent {
        LogEvent {
            level,
            message: message.into(),
            time: Utc::now(),
            fields: Fields::new(),
        }
    }
    /// Midnight, January 1 of the year 1, UTC; the "zero" timestamp
    pub fn zero_time() -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(1, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| Utc.from_utc_datetime(&dt))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }
    pub fn with_field<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields.extend(fields);
        self
    }
    /// Insert every entry of `fields` whose key is not already present; existing keys win.
    pub fn merge_missing(&mut self, fields: &Fields) {
        for (key, value) in fields {
            if !self.fields.contains_key(key) {
                self.fields.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn merge_never_overwrites() {
        let mut event = LogEvent::new(Level::Info, "world").with_field("f1", "a2");
        let mut statics = Fields::new();
        statics.insert("f1".to_owned(), 1.into());
        statics.insert("f2".to_owned(), true.into());
        event.merge_missing(&statics);
        assert_eq!(event.fields.get("f1"), Some(&Value::from("a2")));
        assert_eq!(event.fields.get("f2"), Some(&Value::Bool(true)));
        assert_eq!(event.fields.len(), 2);
    }

    #[test]
    fn zero_time() {
        assert_eq!(
            LogEvent::zero_time().to_rfc3339_opts(SecondsFormat::Secs, true),
            "0001-01-01T00:00:00Z"
        );
    }
}
