//! Binding fixture values to PostgreSQL parameters.
//!
//! PostgreSQL infers a type for every `$n` placeholder when a statement is
//! prepared and rejects binary parameters of any other type. Fixture values
//! are untyped scalars, so [`FixtureValue`] accepts every parameter type and
//! converts itself to the inferred one at bind time. Parameters go over the
//! wire in binary format, so only text-like types may receive raw text;
//! anything without a conversion here is rejected rather than sent malformed.

use std::error::Error;
use std::net::IpAddr;
use std::str::FromStr;

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use tokio_postgres::types::{to_sql_checked, IsNull, Kind, ToSql, Type};
use uuid::Uuid;

use crate::core::value::FixtureValue;

type BoxError = Box<dyn Error + Sync + Send>;

impl ToSql for FixtureValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        if self.is_null() {
            return Ok(IsNull::Yes);
        }

        match ty.kind() {
            Kind::Domain(base) => return self.to_sql(base, out),
            Kind::Enum(_) => return write_text(self, out),
            _ => {}
        }

        match *ty {
            Type::BOOL => to_bool(self, ty)?.to_sql(ty, out),
            Type::INT2 => {
                let v = i16::try_from(to_i64(self, ty)?).map_err(|_| out_of_range(self, ty))?;
                v.to_sql(ty, out)
            }
            Type::INT4 => {
                let v = i32::try_from(to_i64(self, ty)?).map_err(|_| out_of_range(self, ty))?;
                v.to_sql(ty, out)
            }
            Type::INT8 => to_i64(self, ty)?.to_sql(ty, out),
            Type::OID => {
                let v = u32::try_from(to_i64(self, ty)?).map_err(|_| out_of_range(self, ty))?;
                v.to_sql(ty, out)
            }
            Type::FLOAT4 => {
                let v = to_f64(self, ty)?;
                if v.is_finite() && v.abs() > f64::from(f32::MAX) {
                    return Err(out_of_range(self, ty));
                }
                (v as f32).to_sql(ty, out)
            }
            Type::FLOAT8 => to_f64(self, ty)?.to_sql(ty, out),
            Type::NUMERIC => to_decimal(self, ty)?.to_sql(ty, out),
            Type::UUID => match self {
                FixtureValue::Text(s) => Uuid::parse_str(s.trim())?.to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Type::JSON | Type::JSONB => to_json(self).to_sql(ty, out),
            Type::TIMESTAMP => to_naive_timestamp(self, ty)?.to_sql(ty, out),
            Type::TIMESTAMPTZ => to_timestamptz(self, ty)?.to_sql(ty, out),
            Type::DATE => match self {
                FixtureValue::Now => Utc::now().date_naive().to_sql(ty, out),
                FixtureValue::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?.to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Type::TIME => match self {
                FixtureValue::Now => Utc::now().time().to_sql(ty, out),
                FixtureValue::Text(s) => parse_time(s)
                    .ok_or_else(|| mismatch(self, ty))?
                    .to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Type::BYTEA => match self {
                FixtureValue::Text(s) => decode_bytea(s).to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Type::INET | Type::CIDR => match self {
                FixtureValue::Text(s) => {
                    write_inet(s, *ty == Type::CIDR, out).ok_or_else(|| mismatch(self, ty))?;
                    Ok(IsNull::No)
                }
                _ => Err(mismatch(self, ty)),
            },
            _ if is_textual(ty) => write_text(self, out),
            _ => Err(mismatch(self, ty)),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn mismatch(value: &FixtureValue, ty: &Type) -> BoxError {
    format!("cannot bind fixture value {} to a column of type {}", value, ty).into()
}

fn out_of_range(value: &FixtureValue, ty: &Type) -> BoxError {
    format!("fixture value {} is out of range for type {}", value, ty).into()
}

fn to_bool(value: &FixtureValue, ty: &Type) -> Result<bool, BoxError> {
    match value {
        FixtureValue::Bool(b) => Ok(*b),
        FixtureValue::Int(i) => Ok(*i != 0),
        FixtureValue::Text(s) => match s.trim().to_lowercase().as_str() {
            "t" | "true" | "y" | "yes" | "on" | "1" => Ok(true),
            "f" | "false" | "n" | "no" | "off" | "0" => Ok(false),
            _ => Err(mismatch(value, ty)),
        },
        _ => Err(mismatch(value, ty)),
    }
}

fn to_i64(value: &FixtureValue, ty: &Type) -> Result<i64, BoxError> {
    match value {
        FixtureValue::Int(i) => Ok(*i),
        FixtureValue::Bool(b) => Ok(i64::from(*b)),
        FixtureValue::Text(s) => s.trim().parse().map_err(|_| mismatch(value, ty)),
        _ => Err(mismatch(value, ty)),
    }
}

fn to_f64(value: &FixtureValue, ty: &Type) -> Result<f64, BoxError> {
    match value {
        FixtureValue::Float(f) => Ok(*f),
        FixtureValue::Int(i) => Ok(*i as f64),
        FixtureValue::Text(s) => s.trim().parse().map_err(|_| mismatch(value, ty)),
        _ => Err(mismatch(value, ty)),
    }
}

fn to_decimal(value: &FixtureValue, ty: &Type) -> Result<Decimal, BoxError> {
    match value {
        FixtureValue::Int(i) => Ok(Decimal::from(*i)),
        FixtureValue::Float(f) => Decimal::try_from(*f).map_err(|_| out_of_range(value, ty)),
        FixtureValue::Text(s) => Decimal::from_str(s.trim())
            .or_else(|_| Decimal::from_scientific(s.trim()))
            .map_err(|_| mismatch(value, ty)),
        _ => Err(mismatch(value, ty)),
    }
}

fn to_json(value: &FixtureValue) -> serde_json::Value {
    match value {
        FixtureValue::Null => serde_json::Value::Null,
        FixtureValue::Bool(b) => serde_json::Value::Bool(*b),
        FixtureValue::Int(i) => serde_json::Value::from(*i),
        FixtureValue::Float(f) => serde_json::Value::from(*f),
        FixtureValue::Text(s) => {
            serde_json::from_str(s).unwrap_or_else(|_| serde_json::Value::String(s.clone()))
        }
        FixtureValue::Now => serde_json::Value::String(Utc::now().to_rfc3339()),
    }
}

fn to_naive_timestamp(value: &FixtureValue, ty: &Type) -> Result<NaiveDateTime, BoxError> {
    match value {
        FixtureValue::Now => Ok(Utc::now().naive_utc()),
        FixtureValue::Text(s) => parse_timestamp(s)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| mismatch(value, ty)),
        _ => Err(mismatch(value, ty)),
    }
}

fn to_timestamptz(value: &FixtureValue, ty: &Type) -> Result<DateTime<Utc>, BoxError> {
    match value {
        FixtureValue::Now => Ok(Utc::now()),
        FixtureValue::Text(s) => parse_timestamp(s).ok_or_else(|| mismatch(value, ty)),
        _ => Err(mismatch(value, ty)),
    }
}

/// Types whose binary wire format is the UTF-8 text itself.
fn is_textual(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::XML | Type::UNKNOWN
    ) || ty.name() == "citext"
}

fn write_text(value: &FixtureValue, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    out.extend_from_slice(to_text(value).as_bytes());
    Ok(IsNull::No)
}

/// Textual form used for text, enum and unknown parameter types.
fn to_text(value: &FixtureValue) -> String {
    match value {
        FixtureValue::Null => String::new(),
        FixtureValue::Bool(b) => b.to_string(),
        FixtureValue::Int(i) => i.to_string(),
        FixtureValue::Float(f) => f.to_string(),
        FixtureValue::Text(s) => s.clone(),
        FixtureValue::Now => Utc::now().to_rfc3339(),
    }
}

/// Parse a timestamp written in a fixture.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.f][offset]` and bare dates.
/// Values without an offset are taken as UTC.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

/// Encode `addr` or `addr/bits` in the binary inet/cidr layout:
/// family, prefix length, cidr flag, address length, address bytes.
fn write_inet(s: &str, is_cidr: bool, out: &mut BytesMut) -> Option<()> {
    let s = s.trim();
    let (addr, bits) = match s.split_once('/') {
        Some((addr, bits)) => (addr, Some(bits.parse::<u8>().ok()?)),
        None => (s, None),
    };
    let (family, max_bits, octets) = match addr.parse::<IpAddr>().ok()? {
        IpAddr::V4(v4) => (2u8, 32u8, v4.octets().to_vec()),
        IpAddr::V6(v6) => (3u8, 128u8, v6.octets().to_vec()),
    };
    let bits = bits.unwrap_or(max_bits);
    if bits > max_bits {
        return None;
    }

    out.extend_from_slice(&[family, bits, u8::from(is_cidr), octets.len() as u8]);
    out.extend_from_slice(&octets);
    Some(())
}

/// Decode a `\x`-prefixed hex literal; any other text is taken as raw bytes.
fn decode_bytea(s: &str) -> Vec<u8> {
    if let Some(hex) = s.strip_prefix("\\x") {
        if hex.len() % 2 == 0 && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return (0..hex.len())
                .step_by(2)
                .filter_map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
                .collect();
        }
    }
    s.as_bytes().to_vec()
}
