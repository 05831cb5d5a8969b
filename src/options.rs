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

//! Hook configuration.
//!
//! [`Options`] names where records go & how they are formatted. Two pairs of settings are
//! mutually exclusive: a pre-built [`Transport`] versus a protocol & address to dial, and an
//! application name versus a custom [`Formatter`]. [`Options::validate`] enforces both before
//! anything is constructed.
//!
//! # Examples
//!
//! ```no_run
//! use tracing_logstash::{hook::LogstashHook, options::Options, transport::Protocol};
//! let hook = LogstashHook::new(
//!     Options::builder()
//!         .protocol(Protocol::Tcp)
//!         .address("logstash.local:5000")
//!         .app_name("billing")
//!         .field("env", "prod")
//!         .build(),
//! )
//! .unwrap();
//! ```

use crate::{
    error::{Error, Result},
    formatter::Formatter,
    transport::{Protocol, Transport},
    value::{Fields, Value},
};

/// Everything needed to build a [`LogstashHook`](crate::hook::LogstashHook)
#[derive(Default)]
pub struct Options {
    /// A transport the caller has already opened
    pub transport: Option<Box<dyn Transport + Send>>,
    /// Protocol to dial; requires `address`
    pub protocol: Option<Protocol>,
    /// Address to dial; requires `protocol`
    pub address: Option<String>,
    /// Value for the `type` key of every record
    pub app_name: Option<String>,
    /// Static fields merged into every event
    pub fields: Option<Fields>,
    /// A custom formatter
    pub formatter: Option<Box<dyn Formatter + Send>>,
}

impl Options {
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder {
            imp: Options::default(),
        }
    }
    /// Check the connection & formatter settings for consistency.
    ///
    /// The checks run in a fixed order, so a set of options with several problems always
    /// reports the same one: missing connection details, then an ambiguous connection source,
    /// then an ambiguous formatter source. An empty address or application name counts as not
    /// given at all.
    pub fn validate(&self) -> Result<()> {
        let address = non_empty(&self.address).is_some();
        if self.transport.is_none() && (!address || self.protocol.is_none()) {
            return Err(Error::MissingConnection);
        }
        if self.transport.is_some() && (address || self.protocol.is_some()) {
            return Err(Error::AmbiguousConnection);
        }
        if non_empty(&self.app_name).is_some() && self.formatter.is_some() {
            return Err(Error::AmbiguousFormatter);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("transport", &self.transport.as_ref().map(|_| "..."))
            .field("protocol", &self.protocol)
            .field("address", &self.address)
            .field("app_name", &self.app_name)
            .field("fields", &self.fields)
            .field("formatter", &self.formatter.as_ref().map(|_| "..."))
            .finish()
    }
}

pub struct OptionsBuilder {
    imp: Options,
}

impl OptionsBuilder {
    pub fn transport<T: Transport + Send + 'static>(mut self, transport: T) -> Self {
        self.imp.transport = Some(Box::new(transport));
        self
    }
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.imp.protocol = Some(protocol);
        self
    }
    /// Parse the protocol from its name ("tcp", "udp", "unix" or "unixgram")
    pub fn protocol_as_str(mut self, protocol: &str) -> Result<Self> {
        self.imp.protocol = Some(protocol.parse()?);
        Ok(self)
    }
    pub fn address<S: Into<String>>(mut self, address: S) -> Self {
        self.imp.address = Some(address.into());
        self
    }
    pub fn app_name<S: Into<String>>(mut self, app_name: S) -> Self {
        self.imp.app_name = Some(app_name.into());
        self
    }
    pub fn fields(mut self, fields: Fields) -> Self {
        self.imp.fields = Some(fields);
        self
    }
    /// Add one static field
    pub fn field<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.imp
            .fields
            .get_or_insert_with(Fields::new)
            .insert(key.into(), value.into());
        self
    }
    pub fn formatter<F: Formatter + Send + 'static>(mut self, formatter: F) -> Self {
        self.imp.formatter = Some(Box::new(formatter));
        self
    }
    pub fn build(self) -> Options {
        self.imp
    }
}

/// `s`, unless it is absent or empty
pub(crate) fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|s| !s.is_empty())
}

/// An application name for when the caller gives neither a name nor a formatter: the file name of
/// the current executable, or "-".
pub(crate) fn default_app_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|pbuf| {
            pbuf.file_name()
                .map(|os_str| os_str.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "-".to_owned())
}

#[cfg(test)]
mod test {

    use super::*;

    use crate::{
        event::LogEvent, formatter::FormatResult, formatter::LogstashFormatter,
        transport::WriterTransport,
    };

    fn buffer() -> WriterTransport<Vec<u8>> {
        WriterTransport::new(Vec::new())
    }

    fn check(opts: Options, expected: Option<&str>) {
        match (opts.validate(), expected) {
            (Ok(()), None) => (),
            (Err(err), Some(msg)) => {
                assert!(err.is_configuration());
                assert_eq!(err.to_string(), msg);
            }
            (rsp, _) => panic!("{:?}: expected {:?}, got {:?}", opts, expected, rsp),
        }
    }

    #[test]
    fn validation() {
        check(Options::default(), Some("missing connection details"));
        check(Options::builder().transport(buffer()).build(), None);
        check(
            Options::builder()
                .address("localhost:8989")
                .protocol(Protocol::Udp)
                .build(),
            None,
        );
        check(
            Options::builder().address("localhost:8989").build(),
            Some("missing connection details"),
        );
        check(
            Options::builder().protocol(Protocol::Tcp).build(),
            Some("missing connection details"),
        );
        check(
            Options::builder()
                .transport(buffer())
                .protocol(Protocol::Tcp)
                .build(),
            Some("ambiguous connection source"),
        );
        check(
            Options::builder()
                .transport(buffer())
                .address("localhost")
                .build(),
            Some("ambiguous connection source"),
        );
        check(
            Options::builder()
                .transport(buffer())
                .app_name("bla")
                .formatter(LogstashFormatter::new("bla"))
                .build(),
            Some("ambiguous formatter source"),
        );
        // Empty strings count as unset
        check(
            Options::builder()
                .protocol(Protocol::Tcp)
                .address("")
                .build(),
            Some("missing connection details"),
        );
        check(
            Options::builder().transport(buffer()).address("").build(),
            None,
        );
        check(
            Options::builder()
                .transport(buffer())
                .app_name("")
                .formatter(LogstashFormatter::new("bla"))
                .build(),
            None,
        );
        // Connection problems are reported ahead of formatter problems
        check(
            Options::builder()
                .app_name("bla")
                .formatter(|_: &LogEvent| -> FormatResult { Ok(Vec::new()) })
                .build(),
            Some("missing connection details"),
        );
    }

    #[test]
    fn builder() {
        let opts = Options::builder()
            .protocol_as_str("udp")
            .unwrap()
            .address("localhost:5000")
            .field("a", 1)
            .field("b", "two")
            .build();
        assert_eq!(opts.protocol, Some(Protocol::Udp));
        assert_eq!(opts.fields.as_ref().map(|f| f.len()), Some(2));
        assert!(Options::builder().protocol_as_str("http").is_err());
        assert!(!default_app_name().is_empty());
    }
}
