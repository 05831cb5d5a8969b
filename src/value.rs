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

//! Dynamically-typed event fields.
//!
//! Events carry arbitrary key/value data. Rather than reach for reflection (or for
//! `serde_json::Value`, which can't distinguish a timestamp from any other string), fields are
//! held as a small tagged union, [`Value`], that maps one-to-one onto JSON.

use chrono::prelude::*;
use serde::ser::{Error as _, Serialize, Serializer};

use std::collections::BTreeMap;

/// The field mapping carried by every [`LogEvent`](crate::event::LogEvent) and attached to every
/// hook; ordered so that serialized records are stable.
pub type Fields = BTreeMap<String, Value>;

/// A single field value
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    /// Only finite values can be serialized; `NaN` & the infinities fail formatting.
    F64(f64),
    Str(String),
    /// Serialized as an RFC 3339 string
    Timestamp(DateTime<Utc>),
    Map(Fields),
    List(Vec<Value>),
}

impl Value {
    /// If this is a [`Value::Str`], the underlying string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::I64(i) => serializer.serialize_i64(*i),
            Value::U64(u) => serializer.serialize_u64(*u),
            Value::F64(x) if x.is_finite() => serializer.serialize_f64(*x),
            Value::F64(x) => Err(S::Error::custom(format!("unsupported value: {}", x))),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Timestamp(t) => {
                serializer.serialize_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Map(m) => m.serialize(serializer),
            Value::List(l) => l.serialize(serializer),
        }
    }
}

macro_rules! value_from {
    ($variant:ident, $target:ty; $($t:ty),+) => {
        $(
            impl std::convert::From<$t> for Value {
                fn from(x: $t) -> Self {
                    Value::$variant(x as $target)
                }
            }
        )+
    };
}

value_from!(I64, i64; i8, i16, i32, i64, isize);
value_from!(U64, u64; u8, u16, u32, u64, usize);
value_from!(F64, f64; f32, f64);

impl std::convert::From<bool> for Value {
    fn from(x: bool) -> Self {
        Value::Bool(x)
    }
}

impl std::convert::From<String> for Value {
    fn from(x: String) -> Self {
        Value::Str(x)
    }
}

impl std::convert::From<&str> for Value {
    fn from(x: &str) -> Self {
        Value::Str(x.to_owned())
    }
}

impl std::convert::From<DateTime<Utc>> for Value {
    fn from(x: DateTime<Utc>) -> Self {
        Value::Timestamp(x)
    }
}

impl std::convert::From<Fields> for Value {
    fn from(x: Fields) -> Self {
        Value::Map(x)
    }
}

impl std::convert::From<Vec<Value>> for Value {
    fn from(x: Vec<Value>) -> Self {
        Value::List(x)
    }
}

impl<T: Into<Value>> std::convert::From<Option<T>> for Value {
    fn from(x: Option<T>) -> Self {
        x.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn to_json() {
        let mut inner = Fields::new();
        inner.insert("up".to_owned(), true.into());
        let mut fields = Fields::new();
        fields.insert("n".to_owned(), (-3i32).into());
        fields.insert("m".to_owned(), 7usize.into());
        fields.insert("x".to_owned(), 0.5f64.into());
        fields.insert("inner".to_owned(), inner.into());
        fields.insert("none".to_owned(), Option::<i64>::None.into());
        fields.insert(
            "at".to_owned(),
            Utc.with_ymd_and_hms(2022, 6, 23, 16, 10, 55).unwrap().into(),
        );
        fields.insert("l".to_owned(), vec![Value::from("a"), Value::from(1u8)].into());

        assert_eq!(
            serde_json::to_string(&fields).unwrap(),
            r#"{"at":"2022-06-23T16:10:55Z","inner":{"up":true},"l":["a",1],"m":7,"n":-3,"none":null,"x":0.5}"#
        );
    }

    #[test]
    fn non_finite_floats_fail() {
        let err = serde_json::to_vec(&Value::F64(f64::NAN)).unwrap_err();
        assert!(err.to_string().contains("unsupported value"));
        assert!(serde_json::to_vec(&Value::F64(f64::INFINITY)).is_err());
    }
}
