//! Scalar payloads carried by tree nodes.
//!
//! A node either holds one [`PropValue`], holds ordered children, or is a
//! zombie. Values are cheap to clone: strings and blobs are reference
//! counted, everything else is `Copy`-sized.
//!
//! # Design
//!
//! Numeric writes coming from loosely typed plugin code arrive as `f64`.
//! [`PropValue::from_number`] collapses integral doubles into `Int` so that
//! renderers and stores observe stable integer values; anything fractional
//! or outside the 32-bit range stays `Float`.

use std::fmt;
use std::rc::Rc;

/// Value held by a leaf node.
///
/// `Void` is the state of a freshly created node and of a node whose value
/// was explicitly cleared. Subscribers can opt out of seeing it with
/// [`SubOpts::IGNORE_VOID`](crate::SubOpts::IGNORE_VOID).
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PropValue {
    /// No value set.
    #[default]
    Void,
    /// UTF-8 text.
    Str(Rc<str>),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Boolean flag.
    Bool(bool),
    /// Opaque binary payload.
    Blob(Rc<[u8]>),
}

impl PropValue {
    /// Builds a string value.
    pub fn str(s: impl AsRef<str>) -> Self {
        PropValue::Str(Rc::from(s.as_ref()))
    }

    /// Collapses an `f64` into `Int` when it is integral and fits in 32 bits,
    /// otherwise keeps it as `Float`.
    #[must_use]
    pub fn from_number(n: f64) -> Self {
        if n.fract() == 0.0 && n >= f64::from(i32::MIN) && n <= f64::from(i32::MAX) {
            PropValue::Int(n as i64)
        } else {
            PropValue::Float(n)
        }
    }

    /// True when no value is set.
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, PropValue::Void)
    }

    /// Borrows the string payload, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer payload without coercion.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the float payload without coercion.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Strict boolean reading: `Bool` passes through, ints and the strings
    /// `"0"`/`"1"` fold, anything else reads as `None`.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            PropValue::Int(n) => Some(*n != 0),
            PropValue::Str(s) if s.as_ref() == "0" => Some(false),
            PropValue::Str(s) if s.as_ref() == "1" => Some(true),
            _ => None,
        }
    }

    /// Coerces any value to an integer.
    ///
    /// Strings are parsed with a leading-digits rule (`"12px"` is 12);
    /// unparsable strings, voids and blobs coerce to 0.
    #[must_use]
    pub fn coerce_int(&self) -> i64 {
        match self {
            PropValue::Void | PropValue::Blob(_) => 0,
            PropValue::Str(s) => parse_leading_int(s),
            PropValue::Int(n) => *n,
            PropValue::Float(f) => *f as i64,
            PropValue::Bool(b) => i64::from(*b),
        }
    }

    /// Coerces any value to a float. Same rules as [`coerce_int`](Self::coerce_int).
    #[must_use]
    pub fn coerce_float(&self) -> f64 {
        match self {
            PropValue::Float(f) => *f,
            other => other.coerce_int() as f64,
        }
    }

    /// Loose truthiness used by toggles and conditionals.
    ///
    /// `"0"` and the empty string are false; any other string is true.
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            PropValue::Void => false,
            PropValue::Str(s) => !s.is_empty() && s.as_ref() != "0",
            PropValue::Int(n) => *n != 0,
            PropValue::Float(f) => *f != 0.0,
            PropValue::Bool(b) => *b,
            PropValue::Blob(b) => !b.is_empty(),
        }
    }

    /// Short tag for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            PropValue::Void => "void",
            PropValue::Str(_) => "string",
            PropValue::Int(_) => "int",
            PropValue::Float(_) => "float",
            PropValue::Bool(_) => "bool",
            PropValue::Blob(_) => "blob",
        }
    }
}

fn parse_leading_int(s: &str) -> i64 {
    let t = s.trim_start();
    let (sign, digits) = match t.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, t.strip_prefix('+').unwrap_or(t)),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(digits.len(), |(i, _)| i);
    digits[..end].parse::<i64>().map_or(0, |n| n * sign)
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Void => write!(f, "(void)"),
            PropValue::Str(s) => write!(f, "{s}"),
            PropValue::Int(n) => write!(f, "{n}"),
            PropValue::Float(v) => write!(f, "{v}"),
            PropValue::Bool(b) => write!(f, "{b}"),
            PropValue::Blob(b) => write!(f, "<blob {} bytes>", b.len()),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        PropValue::Str(Rc::from(s))
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        PropValue::Str(Rc::from(s.as_str()))
    }
}

impl From<Rc<str>> for PropValue {
    fn from(s: Rc<str>) -> Self {
        PropValue::Str(s)
    }
}

impl From<i32> for PropValue {
    fn from(n: i32) -> Self {
        PropValue::Int(i64::from(n))
    }
}

impl From<i64> for PropValue {
    fn from(n: i64) -> Self {
        PropValue::Int(n)
    }
}

impl From<f64> for PropValue {
    fn from(n: f64) -> Self {
        PropValue::from_number(n)
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        PropValue::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_collapse_to_int() {
        assert_eq!(PropValue::from_number(3.0), PropValue::Int(3));
        assert_eq!(PropValue::from_number(-7.0), PropValue::Int(-7));
        assert_eq!(PropValue::from_number(0.0), PropValue::Int(0));
    }

    #[test]
    fn fractional_and_wide_numbers_stay_float() {
        assert_eq!(PropValue::from_number(3.5), PropValue::Float(3.5));
        let wide = f64::from(i32::MAX) * 4.0;
        assert_eq!(PropValue::from_number(wide), PropValue::Float(wide));
    }

    #[test]
    fn truthiness_table() {
        assert!(!PropValue::Void.truthy());
        assert!(!PropValue::from("").truthy());
        assert!(!PropValue::from("0").truthy());
        assert!(PropValue::from("0x").truthy());
        assert!(PropValue::from("yes").truthy());
        assert!(!PropValue::Int(0).truthy());
        assert!(PropValue::Int(-1).truthy());
        assert!(!PropValue::Bool(false).truthy());
        assert!(PropValue::Bool(true).truthy());
        assert!(!PropValue::Float(0.0).truthy());
    }

    #[test]
    fn as_bool_folds_ints_and_binary_strings() {
        assert_eq!(PropValue::Bool(true).as_bool(), Some(true));
        assert_eq!(PropValue::Int(0).as_bool(), Some(false));
        assert_eq!(PropValue::Int(3).as_bool(), Some(true));
        assert_eq!(PropValue::from("0").as_bool(), Some(false));
        assert_eq!(PropValue::from("1").as_bool(), Some(true));
        assert_eq!(PropValue::from("yes").as_bool(), None);
        assert_eq!(PropValue::Void.as_bool(), None);
    }

    #[test]
    fn coerce_int_parses_leading_digits() {
        assert_eq!(PropValue::from("12px").coerce_int(), 12);
        assert_eq!(PropValue::from("  -4 ").coerce_int(), -4);
        assert_eq!(PropValue::from("+9").coerce_int(), 9);
        assert_eq!(PropValue::from("px").coerce_int(), 0);
        assert_eq!(PropValue::Float(9.9).coerce_int(), 9);
        assert_eq!(PropValue::Bool(true).coerce_int(), 1);
        assert_eq!(PropValue::Void.coerce_int(), 0);
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(PropValue::Void.to_string(), "(void)");
        assert_eq!(PropValue::from("abc").to_string(), "abc");
        assert_eq!(PropValue::Int(42).to_string(), "42");
        assert_eq!(PropValue::Blob(Rc::from(&b"xyz"[..])).to_string(), "<blob 3 bytes>");
    }

    #[test]
    fn default_is_void() {
        assert_eq!(PropValue::default(), PropValue::Void);
    }
}
