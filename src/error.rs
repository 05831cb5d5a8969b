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

//! [tracing-logstash](crate) errors

use backtrace::Backtrace;

/// [tracing-logstash](crate) error type
///
/// Like its sibling crates, [tracing-logstash](crate) eschews libraries like [thiserror] &
/// [anyhow] in favor of a straightforward enumeration with a few match arms chosen on the basis of
/// what the caller will need to respond.
///
/// The first four variants are configuration errors: they are only ever returned while building a
/// hook, never from [`Hook::fire`](crate::hook::Hook::fire).
///
/// [thiserror]: https://docs.rs/thiserror
/// [anyhow]: https://docs.rs/anyhow
#[non_exhaustive]
pub enum Error {
    /// Neither a transport nor a protocol & address were given
    MissingConnection,
    /// Both a transport and a protocol and/or address were given
    AmbiguousConnection,
    /// Both an application name & a custom formatter were given
    AmbiguousFormatter,
    /// Unrecognized protocol name
    BadProtocol { name: String, back: Backtrace },
    /// Failed to establish the connection to Logstash
    Connect {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// The formatter failed to serialize an event
    Format {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// The transport failed to write a serialized event
    Write {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
}

impl Error {
    /// True if this error stems from an invalid combination of options
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::MissingConnection
                | Error::AmbiguousConnection
                | Error::AmbiguousFormatter
                | Error::BadProtocol { .. }
        )
    }
    pub(crate) fn connect<E>(err: E) -> Error
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Error::Connect {
            source: err.into(),
            back: Backtrace::new(),
        }
    }
    pub(crate) fn format<E>(err: E) -> Error
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Error::Format {
            source: err.into(),
            back: Backtrace::new(),
        }
    }
    pub(crate) fn write<E>(err: E) -> Error
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Error::Write {
            source: err.into(),
            back: Backtrace::new(),
        }
    }
}

impl std::fmt::Display for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::MissingConnection => write!(f, "missing connection details"),
            Error::AmbiguousConnection => write!(f, "ambiguous connection source"),
            Error::AmbiguousFormatter => write!(f, "ambiguous formatter source"),
            Error::BadProtocol { name, .. } => write!(f, "unknown protocol '{}'", name),
            // Format & write failures are reported verbatim; callers match on the underlying
            // message.
            Error::Connect { source, .. } => write!(f, "{}", source),
            Error::Format { source, .. } => write!(f, "{}", source),
            Error::Write { source, .. } => write!(f, "{}", source),
            _ => write!(f, "Other tracing-logstash error"),
        }
    }
}

impl std::fmt::Debug for Error {
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::BadProtocol { name: _, back } => write!(f, "{}\n{:#?}", self, back),
            Error::Connect { source: _, back } => write!(f, "{}\n{:#?}", self, back),
            Error::Format { source: _, back } => write!(f, "{}\n{:#?}", self, back),
            Error::Write { source: _, back } => write!(f, "{}\n{:#?}", self, back),
            err => write!(f, "tracing-logstash error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connect { source, .. }
            | Error::Format { source, .. }
            | Error::Write { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn messages() {
        assert_eq!(
            Error::MissingConnection.to_string(),
            "missing connection details"
        );
        assert_eq!(
            Error::AmbiguousConnection.to_string(),
            "ambiguous connection source"
        );
        assert_eq!(
            Error::AmbiguousFormatter.to_string(),
            "ambiguous formatter source"
        );
        assert!(Error::AmbiguousFormatter.is_configuration());

        let err = Error::write(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "write error",
        ));
        assert_eq!(err.to_string(), "write error");
        assert!(!err.is_configuration());
        assert!(std::error::Error::source(&err).is_some());
    }
}
