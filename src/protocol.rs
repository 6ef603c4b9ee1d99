use crate::helper::millis_to_duration;
use std::{error, fmt, str, time::Duration};

/// Field of a record that was found to be empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// The metric name, before the `:`.
    Name,

    /// The metric value, between the `:` and the `|`.
    Value,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Field::Name => write!(f, "name"),
            Field::Value => write!(f, "value"),
        }
    }
}

/// Errors while parsing or applying a single statsd record.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// The name or value of a record was empty.
    MissingField(Field),

    /// The given delimiter could not be found in the remaining packet.
    DelimiterNotFound(u8),

    /// The type tag was not one of `c`, `g` or `ms`.
    UnknownType(String),

    /// The metric name was not valid UTF-8.
    InvalidName(String),

    /// The value could not be parsed as the number its metric type requires.
    Parse {
        kind: MetricType,
        value: String,
        reason: String,
    },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProtocolError::MissingField(field) => write!(f, "missing {}", field),
            ProtocolError::DelimiterNotFound(delim) => {
                write!(f, "cannot find {:?} in packet", char::from(*delim))
            },
            ProtocolError::UnknownType(tag) => write!(f, "unknown metric type: {:?}", tag),
            ProtocolError::InvalidName(name) => write!(f, "metric name is not valid UTF-8: {:?}", name),
            ProtocolError::Parse { kind, value, reason } => {
                write!(f, "failed to process {} value {:?}: {}", kind, value, reason)
            },
        }
    }
}

impl error::Error for ProtocolError {}

/// The type tag of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricType {
    /// `c`: added to the existing value.
    Counter,

    /// `g`: replaces the existing value.
    Gauge,

    /// `ms`: appended to the sample list, in milliseconds.
    Timer,
}

impl MetricType {
    /// Parses a type tag, returning `UnknownType` for anything unrecognized.
    pub fn from_tag(tag: &[u8]) -> Result<MetricType, ProtocolError> {
        match tag {
            b"c" => Ok(MetricType::Counter),
            b"g" => Ok(MetricType::Gauge),
            b"ms" => Ok(MetricType::Timer),
            other => Err(ProtocolError::UnknownType(String::from_utf8_lossy(other).into_owned())),
        }
    }

    /// The tag used for this type on the wire.
    pub fn tag(self) -> &'static str {
        match self {
            MetricType::Counter => "c",
            MetricType::Gauge => "g",
            MetricType::Timer => "ms",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MetricType::Counter => write!(f, "counter"),
            MetricType::Gauge => write!(f, "gauge"),
            MetricType::Timer => write!(f, "timer"),
        }
    }
}

/// Splits `packet` at the first occurrence of `delim`.
///
/// Returns the token before the delimiter and the remainder after it.  A delimiter at position
/// zero yields an empty token, which is left for the caller to reject.
pub fn split_token(packet: &[u8], delim: u8) -> Result<(&[u8], &[u8]), ProtocolError> {
    match packet.iter().position(|b| *b == delim) {
        Some(idx) => Ok((&packet[..idx], &packet[idx + 1..])),
        None => Err(ProtocolError::DelimiterNotFound(delim)),
    }
}

/// A single `<name>:<value>|<type>` record, borrowed from the packet.
#[derive(Debug, PartialEq, Eq)]
pub struct Record<'a> {
    pub name: &'a [u8],
    pub value: &'a [u8],
    pub kind: &'a [u8],
}

/// Reads the next record from `packet`, returning it along with the rest of the packet.
///
/// The trailing newline is optional: when it is missing, everything after the `|` is the type
/// and the returned remainder is empty.
pub fn next_record(packet: &[u8]) -> Result<(Record<'_>, &[u8]), ProtocolError> {
    let (name, rest) = split_token(packet, b':')?;
    let (value, rest) = split_token(rest, b'|')?;
    let (kind, rest) = split_token(rest, b'\n').unwrap_or((rest, &[][..]));

    Ok((Record { name, value, kind }, rest))
}

/// Returns the record at the front of `packet`, up to but excluding the next newline.
pub(crate) fn current_record(packet: &[u8]) -> &[u8] {
    split_token(packet, b'\n').map(|(record, _)| record).unwrap_or(packet)
}

/// Validates a metric name.
///
/// Names are kept byte-for-byte, so anything that isn't valid UTF-8 is rejected rather than
/// replaced.
pub fn parse_name(name: &[u8]) -> Result<&str, ProtocolError> {
    str::from_utf8(name).map_err(|_| ProtocolError::InvalidName(String::from_utf8_lossy(name).into_owned()))
}

fn parse_error(kind: MetricType, value: &[u8], reason: impl fmt::Display) -> ProtocolError {
    ProtocolError::Parse {
        kind,
        value: String::from_utf8_lossy(value).into_owned(),
        reason: reason.to_string(),
    }
}

/// Parses a counter or gauge value.
///
/// The value is parsed as an integer first.  Failing that, it is parsed as a float and truncated
/// toward zero.  Non-finite floats are rejected.
pub fn parse_int(kind: MetricType, value: &[u8]) -> Result<i64, ProtocolError> {
    let raw = str::from_utf8(value).map_err(|e| parse_error(kind, value, e))?;
    if let Ok(parsed) = raw.parse::<i64>() {
        return Ok(parsed);
    }

    let parsed = raw.parse::<f64>().map_err(|e| parse_error(kind, value, e))?;
    if !parsed.is_finite() {
        return Err(parse_error(kind, value, "value is not finite"));
    }

    Ok(parsed.trunc() as i64)
}

/// Parses a timer value as fractional milliseconds.
///
/// There is no integer path here: anything that isn't a finite, non-negative float is an error.
pub fn parse_millis(value: &[u8]) -> Result<Duration, ProtocolError> {
    let kind = MetricType::Timer;
    let raw = str::from_utf8(value).map_err(|e| parse_error(kind, value, e))?;
    let millis = raw.parse::<f64>().map_err(|e| parse_error(kind, value, e))?;

    millis_to_duration(millis).ok_or_else(|| parse_error(kind, value, "not a finite, non-negative duration"))
}
