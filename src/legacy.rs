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

//! The legacy hook: always-sent fields & hook-only prefixes.
//!
//! [`LegacyHook`] predates [`Options`](crate::options::Options). Besides forwarding, it
//! supports a "hook-only" field-name prefix: fields whose names begin with the prefix are sent to
//! Logstash (with the prefix removed) and then stripped from the event, so that hooks handling the
//! event afterwards never see them. A [`LegacyHook`] with no transport does the stripping alone.
//! In a [`Chain`](crate::hook::Chain), hooks placed after a prefixed [`LegacyHook`] (forwarding or
//! filter-only) never see hook-only fields; place it ahead of every sink that must not get them.
//!
//! ```
//! use tracing_logstash::{event::LogEvent, hook::Hook, legacy::LegacyHook, level::Level};
//! let mut filter = LegacyHook::filter_with_prefix("_");
//! let mut event = LogEvent::new(Level::Info, "up")
//!     .with_field("_hostname", "h1")
//!     .with_field("status", "up");
//! filter.fire(&mut event).unwrap();
//! assert_eq!(event.fields.len(), 1);
//! assert!(event.fields.contains_key("status"));
//! ```

use crate::{
    error::Result,
    event::LogEvent,
    formatter::{Formatter, KeyMode, LogstashFormatter},
    hook::Hook,
    transport::{dial, Protocol, Transport},
    value::{Fields, Value},
};

/// A connection to Logstash (or none at all) plus hook-only prefix rules.
pub struct LegacyHook {
    transport: Option<Box<dyn Transport + Send>>,
    app_name: String,
    always_sent_fields: Fields,
    hook_only_prefix: String,
}

impl LegacyHook {
    /// Connect to Logstash at `protocol`://`address`
    pub fn connect(protocol: Protocol, address: &str, app_name: &str) -> Result<LegacyHook> {
        LegacyHook::connect_with_fields(protocol, address, app_name, Fields::new())
    }
    /// Connect to Logstash at `protocol`://`address`; `always_sent_fields` will be sent with every
    /// event
    pub fn connect_with_fields(
        protocol: Protocol,
        address: &str,
        app_name: &str,
        always_sent_fields: Fields,
    ) -> Result<LegacyHook> {
        LegacyHook::connect_with_fields_and_prefix(
            protocol,
            address,
            app_name,
            always_sent_fields,
            "",
        )
    }
    /// Connect to Logstash at `protocol`://`address`; `always_sent_fields` will be sent with every
    /// event, and fields beginning with `prefix` will be kept from subsequent hooks
    pub fn connect_with_fields_and_prefix(
        protocol: Protocol,
        address: &str,
        app_name: &str,
        always_sent_fields: Fields,
        prefix: &str,
    ) -> Result<LegacyHook> {
        Ok(LegacyHook::with_transport(
            dial(protocol, address)?,
            app_name,
            always_sent_fields,
            prefix,
        ))
    }
    /// Forward over a transport the caller has already opened
    pub fn with_transport<T: Transport + Send + 'static>(
        transport: T,
        app_name: &str,
        always_sent_fields: Fields,
        prefix: &str,
    ) -> LegacyHook {
        LegacyHook {
            transport: Some(Box::new(transport)),
            app_name: app_name.to_owned(),
            always_sent_fields,
            hook_only_prefix: prefix.to_owned(),
        }
    }
    /// A hook that forwards nothing; with no prefix, it does nothing but merge static fields
    pub fn filter() -> LegacyHook {
        LegacyHook::filter_with_prefix("")
    }
    /// A hook that forwards nothing, but strips fields beginning with `prefix` from every event
    pub fn filter_with_prefix(prefix: &str) -> LegacyHook {
        LegacyHook {
            transport: None,
            app_name: String::new(),
            always_sent_fields: Fields::new(),
            hook_only_prefix: prefix.to_owned(),
        }
    }
    /// Use `prefix` to select hook-only fields in all subsequent events; "" disables filtering
    pub fn set_prefix(&mut self, prefix: &str) {
        self.hook_only_prefix = prefix.to_owned();
    }
    pub fn prefix(&self) -> &str {
        &self.hook_only_prefix
    }
    /// Set one always-sent field, replacing any previous value for `key`
    pub fn with_field<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        self.always_sent_fields.insert(key.into(), value.into());
    }
    /// Add all of `fields` to the always-sent fields, replacing existing values
    pub fn with_fields(&mut self, fields: Fields) {
        self.always_sent_fields.extend(fields);
    }
    pub fn is_filter_only(&self) -> bool {
        self.transport.is_none()
    }
}

/// Strips hook-only fields from an event when dropped, so the strip happens however
/// [`LegacyHook::fire`] returns.
struct StripHookOnly<'a> {
    event: &'a mut LogEvent,
    prefix: &'a str,
}

impl Drop for StripHookOnly<'_> {
    fn drop(&mut self) {
        if !self.prefix.is_empty() {
            let prefix = self.prefix;
            self.event.fields.retain(|key, _| !key.starts_with(prefix));
        }
    }
}

impl Hook for LegacyHook {
    fn fire(&mut self, event: &mut LogEvent) -> Result<()> {
        let guard = StripHookOnly {
            event,
            prefix: &self.hook_only_prefix,
        };

        // Existing fields are never overridden.
        guard.event.merge_missing(&self.always_sent_fields);

        let transport = match self.transport.as_mut() {
            Some(transport) => transport,
            None => return Ok(()),
        };

        // The formatter is rebuilt per event since both the prefix & the application name may
        // have been changed since the last one.
        let record = LogstashFormatter::new(self.app_name.as_str())
            .with_key_mode(KeyMode::StripPrefix(self.hook_only_prefix.clone()))
            .format(&*guard.event)
            .map_err(crate::error::Error::format)?;
        transport.send(&record)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {

    use super::*;

    use crate::{
        error::Error,
        hook::{test::SharedBuffer, Chain},
        level::Level,
        transport::WriterTransport,
    };

    use std::sync::{Arc, Mutex};

    struct Broken;

    impl Transport for Broken {
        fn send(&mut self, _buf: &[u8]) -> Result<usize> {
            Err(Error::write(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "broken pipe",
            )))
        }
    }

    fn event() -> LogEvent {
        LogEvent::new(Level::Info, "status report")
            .with_time(LogEvent::zero_time())
            .with_field("_hostname", "h1")
            .with_field("status", "up")
    }

    #[test]
    fn filter_only() {
        let mut hook = LegacyHook::filter_with_prefix("_");
        assert!(hook.is_filter_only());
        let mut e = event();
        hook.fire(&mut e).unwrap();
        assert_eq!(e.fields.len(), 1);
        assert_eq!(e.fields.get("status"), Some(&Value::from("up")));

        // Even unserializable fields are fine, since nothing is formatted
        let mut e = event().with_field("_ratio", f64::NAN);
        assert!(hook.fire(&mut e).is_ok());
        assert_eq!(e.fields.len(), 1);

        // No prefix, no filtering
        let mut hook = LegacyHook::filter();
        hook.with_field("env", "test");
        let mut e = event();
        hook.fire(&mut e).unwrap();
        assert_eq!(e.fields.len(), 3);
        assert_eq!(e.fields.get("env"), Some(&Value::from("test")));
    }

    #[test]
    fn forwards_stripped_keys() {
        let buffer = SharedBuffer::default();
        let mut statics = Fields::new();
        statics.insert("_dc".to_owned(), "east".into());
        statics.insert("status".to_owned(), "unknown".into());
        let mut hook =
            LegacyHook::with_transport(WriterTransport::new(buffer.clone()), "app", statics, "_");
        let mut e = event();
        hook.fire(&mut e).unwrap();

        assert_eq!(
            buffer.records(),
            vec![serde_json::json!({"hostname": "h1", "dc": "east", "status": "up",
                                    "@message": "status report", "@level": "info",
                                    "@timestamp": "0001-01-01T00:00:00Z", "type": "app",
                                    "@version": "1"})]
        );
        // Hook-only fields (including merged ones) are gone from the event afterward
        assert_eq!(e.fields.len(), 1);
        assert_eq!(e.fields.get("status"), Some(&Value::from("up")));
    }

    #[test]
    fn strips_on_error() {
        let mut hook = LegacyHook::with_transport(Broken, "app", Fields::new(), "_");
        let mut e = event();
        assert_eq!(hook.fire(&mut e).unwrap_err().to_string(), "broken pipe");
        assert!(!e.fields.contains_key("_hostname"));

        let buffer = SharedBuffer::default();
        let mut hook = LegacyHook::with_transport(
            WriterTransport::new(buffer.clone()),
            "app",
            Fields::new(),
            "_",
        );
        let mut e = event().with_field("_ratio", f64::INFINITY);
        assert!(hook.fire(&mut e).is_err());
        assert_eq!(e.fields.len(), 1);
        assert!(buffer.records().is_empty());
    }

    #[test]
    fn mutation() {
        let buffer = SharedBuffer::default();
        let mut hook = LegacyHook::with_transport(
            WriterTransport::new(buffer.clone()),
            "app",
            Fields::new(),
            "",
        );
        let mut e = event();
        hook.fire(&mut e).unwrap();
        // No prefix: keys go out verbatim & stay on the event
        assert_eq!(e.fields.len(), 2);

        hook.set_prefix("_");
        assert_eq!(hook.prefix(), "_");
        hook.with_fields(
            [("a".to_owned(), Value::from(1)), ("b".to_owned(), Value::from(2))]
                .into_iter()
                .collect(),
        );
        hook.with_field("a", 3);
        let mut e = event();
        hook.fire(&mut e).unwrap();

        let rsp = buffer.records();
        assert_eq!(rsp[0]["_hostname"], "h1");
        assert_eq!(rsp[1]["hostname"], "h1");
        assert_eq!(rsp[1]["a"], 3);
        assert_eq!(rsp[1]["b"], 2);
        assert_eq!(e.fields.len(), 3);
    }

    struct Recorder(Arc<Mutex<Vec<LogEvent>>>);

    impl Hook for Recorder {
        fn fire(&mut self, event: &mut LogEvent) -> Result<()> {
            self.0.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    #[test]
    fn chained_sinks_never_see_hook_only_fields() {
        let buffer = SharedBuffer::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut statics = Fields::new();
        statics.insert("_dc".to_owned(), "east".into());
        let mut chain = Chain::new()
            .with(LegacyHook::with_transport(
                WriterTransport::new(buffer.clone()),
                "app",
                statics,
                "_",
            ))
            .with(Recorder(seen.clone()));

        chain.fire(&mut event()).unwrap();
        chain
            .fire(&mut event().with_field("_user", "bob").with_field("code", 7))
            .unwrap();

        let rsp = buffer.records();
        assert_eq!(rsp.len(), 2);
        assert_eq!(rsp[0]["hostname"], "h1");
        assert_eq!(rsp[0]["dc"], "east");
        assert_eq!(rsp[1]["user"], "bob");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        for e in seen.iter() {
            assert!(e.fields.keys().all(|k| !k.starts_with('_')), "{:?}", e.fields);
            assert_eq!(e.fields.get("status"), Some(&Value::from("up")));
        }
        assert_eq!(seen[1].fields.get("code"), Some(&Value::from(7)));
    }

    #[test]
    fn connects() {
        let server = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap().to_string();
        let mut hook = LegacyHook::connect(Protocol::Udp, &addr, "legacy").unwrap();
        assert!(!hook.is_filter_only());
        hook.fire(&mut event()).unwrap();
        let mut buf = [0u8; 512];
        let n = server.recv(&mut buf).unwrap();
        let rsp: serde_json::Value = serde_json::from_slice(&buf[..n]).unwrap();
        assert_eq!(rsp["type"], "legacy");
        assert_eq!(rsp["_hostname"], "h1");
    }
}
