//! JSON text and truthiness rules for event records.
//!
//! Digests are taken over the exact text an ECMAScript `JSON.stringify` call
//! would produce, so records hash the same whether the key is derived here or
//! by an upstream producer. That means:
//!
//! - object members come out in ECMAScript property order: array-index keys
//!   (`"0"` to `"4294967294"`) ascending, then the rest in insertion order
//!   (serde_json is built with `preserve_order`);
//! - numbers follow the ECMAScript Number-to-String rules, and integers beyond
//!   2^53 are rounded to the nearest double first.

use std::io;

use serde::ser::{Error as _, SerializeMap, Serializer};
use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::Value;

/// Largest integer magnitude an ECMAScript number holds exactly.
const MAX_SAFE_INTEGER: u64 = 1 << 53;

/// Compact formatter that prints numbers the way ECMAScript does.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcmaFormatter;

impl EcmaFormatter {
    fn write_integer<W>(writer: &mut W, magnitude: u128, negative: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if magnitude <= u128::from(MAX_SAFE_INTEGER) {
            let sign = if negative && magnitude != 0 { "-" } else { "" };
            return write!(writer, "{sign}{magnitude}");
        }
        let rounded = magnitude as f64;
        let value = if negative { -rounded } else { rounded };
        writer.write_all(ecma_number(value).as_bytes())
    }
}

impl Formatter for EcmaFormatter {
    fn write_i64<W>(&mut self, writer: &mut W, value: i64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        Self::write_integer(writer, u128::from(value.unsigned_abs()), value < 0)
    }

    fn write_u64<W>(&mut self, writer: &mut W, value: u64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        Self::write_integer(writer, u128::from(value), false)
    }

    fn write_i128<W>(&mut self, writer: &mut W, value: i128) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        Self::write_integer(writer, value.unsigned_abs(), value < 0)
    }

    fn write_u128<W>(&mut self, writer: &mut W, value: u128) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        Self::write_integer(writer, value, false)
    }

    fn write_f32<W>(&mut self, writer: &mut W, value: f32) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        // Same widening serde_json::to_value applies.
        self.write_f64(writer, f64::from(value))
    }

    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(ecma_number(value).as_bytes())
    }
}

/// Returns the array index a property key denotes, if any.
fn array_index(key: &str) -> Option<u32> {
    let index: u32 = key.parse().ok()?;
    (index != u32::MAX && index.to_string() == key).then_some(index)
}

/// Serializes a JSON value with object members in ECMAScript property order.
struct PropertyOrder<'a>(&'a Value);

impl Serialize for PropertyOrder<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0 {
            Value::Array(items) => serializer.collect_seq(items.iter().map(PropertyOrder)),
            Value::Object(members) => {
                let mut indexed = Vec::new();
                let mut named = Vec::new();
                for (name, value) in members {
                    match array_index(name) {
                        Some(index) => indexed.push((index, name, value)),
                        None => named.push((name, value)),
                    }
                }
                indexed.sort_by_key(|(index, _, _)| *index);

                let mut map = serializer.serialize_map(Some(members.len()))?;
                for (_, name, value) in indexed {
                    map.serialize_entry(name, &PropertyOrder(value))?;
                }
                for (name, value) in named {
                    map.serialize_entry(name, &PropertyOrder(value))?;
                }
                map.end()
            }
            scalar => scalar.serialize(serializer),
        }
    }
}

/// Renders a finite number with the ECMAScript Number-to-String algorithm.
/// Non-finite values render as `null`, matching JSON serialization.
pub fn ecma_number(value: f64) -> String {
    if !value.is_finite() {
        return "null".to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let sign = if value < 0.0 { "-" } else { "" };
    // `{:e}` yields the shortest round-tripping digits, e.g. "1.2345e3".
    let scientific = format!("{:e}", value.abs());
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return format!("{value}");
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return format!("{value}");
    };

    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let n = exponent + 1;

    let body = if k <= n && n <= 21 {
        format!("{digits}{}", "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int_part, frac_part) = digits.split_at(n as usize);
        format!("{int_part}.{frac_part}")
    } else if -6 < n && n <= 0 {
        format!("0.{}{digits}", "0".repeat((-n) as usize))
    } else {
        let e = n - 1;
        let e_sign = if e < 0 { '-' } else { '+' };
        let (lead, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{lead}e{e_sign}{}", e.abs())
        } else {
            format!("{lead}.{rest}e{e_sign}{}", e.abs())
        }
    };

    format!("{sign}{body}")
}

/// Serializes a value to compact, ECMAScript-compatible JSON text. The value
/// goes through `serde_json::Value` first, exactly as key derivation does.
pub fn to_ecma_json<T>(value: &T) -> Result<String, serde_json::Error>
where
    T: Serialize + ?Sized,
{
    let value = serde_json::to_value(value)?;
    let mut buffer = Vec::with_capacity(128);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, EcmaFormatter);
    PropertyOrder(&value).serialize(&mut serializer)?;
    String::from_utf8(buffer).map_err(serde_json::Error::custom)
}

/// ECMAScript truthiness over a JSON value. `null`, `false`, `0`, `NaN` and the
/// empty string are falsy; every array and object is truthy, even when empty.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number
            .as_f64()
            .map_or(true, |float| float != 0.0 && !float.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Length of a string in UTF-16 code units, the unit ECMAScript strings count.
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

#[cfg(test)]
mod tests {
    use super::{array_index, ecma_number, is_truthy, to_ecma_json, utf16_len, EcmaFormatter};
    use serde::Serialize;
    use serde_json::json;

    #[test]
    fn integral_floats_drop_fraction() {
        assert_eq!(ecma_number(1.0), "1");
        assert_eq!(ecma_number(-42.0), "-42");
        assert_eq!(ecma_number(-0.0), "0");
        assert_eq!(ecma_number(1e20), "100000000000000000000");
    }

    #[test]
    fn large_and_small_magnitudes_use_exponents() {
        assert_eq!(ecma_number(1e21), "1e+21");
        assert_eq!(ecma_number(1.5e-7), "1.5e-7");
        assert_eq!(ecma_number(0.000001), "0.000001");
        assert_eq!(ecma_number(1.2345e25), "1.2345e+25");
    }

    #[test]
    fn fractions_keep_shortest_digits() {
        assert_eq!(ecma_number(0.1), "0.1");
        assert_eq!(ecma_number(123.456), "123.456");
        assert_eq!(ecma_number(f64::NAN), "null");
    }

    #[test]
    fn serializes_compactly_in_insertion_order() {
        let value = json!({"zeta": 1.0, "alpha": [true, null, "x"], "mid": {"b": 2, "a": 0.5}});
        assert_eq!(
            to_ecma_json(&value).unwrap(),
            r#"{"zeta":1,"alpha":[true,null,"x"],"mid":{"b":2,"a":0.5}}"#
        );
    }

    #[test]
    fn serializes_structs_in_field_order() {
        #[derive(Serialize)]
        struct Reading {
            sensor: &'static str,
            celsius: f32,
        }
        let text = to_ecma_json(&Reading { sensor: "t1", celsius: 21.5 }).unwrap();
        assert_eq!(text, r#"{"sensor":"t1","celsius":21.5}"#);
    }

    #[test]
    fn widens_f32_fields_like_value_conversion() {
        #[derive(Serialize)]
        struct Ratio {
            v: f32,
        }
        let text = to_ecma_json(&Ratio { v: 0.1 }).unwrap();
        assert_eq!(text, r#"{"v":0.10000000149011612}"#);
        assert_eq!(text, to_ecma_json(&serde_json::to_value(Ratio { v: 0.1 }).unwrap()).unwrap());
    }

    #[test]
    fn orders_index_keys_before_named_keys() {
        let value: serde_json::Value = serde_json::from_str(
            r#"{"z":{"10":"ten","x":0,"9":"nine","01":"lead"},"4294967295":"max","4294967294":"idx"}"#,
        )
        .unwrap();
        assert_eq!(
            to_ecma_json(&value).unwrap(),
            r#"{"4294967294":"idx","z":{"9":"nine","10":"ten","x":0,"01":"lead"},"4294967295":"max"}"#
        );
    }

    #[test]
    fn recognises_array_index_keys() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("4294967294"), Some(4_294_967_294));
        for key in ["4294967295", "01", "+1", "-1", "1.0", "", "a1"] {
            assert_eq!(array_index(key), None, "{key:?} is not an index");
        }
    }

    #[test]
    fn rounds_integers_beyond_safe_range() {
        assert_eq!(to_ecma_json(&9_007_199_254_740_992u64).unwrap(), "9007199254740992");
        assert_eq!(to_ecma_json(&9_007_199_254_740_993u64).unwrap(), "9007199254740992");
        assert_eq!(to_ecma_json(&-9_007_199_254_740_993i64).unwrap(), "-9007199254740992");
        assert_eq!(to_ecma_json(&u64::MAX).unwrap(), "18446744073709552000");
        assert_eq!(to_ecma_json(&i64::MIN).unwrap(), "-9223372036854776000");
        assert_eq!(to_ecma_json(&-12i64).unwrap(), "-12");
    }

    #[test]
    fn formatter_rounds_wide_integers() {
        let mut buffer = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, EcmaFormatter);
        (u128::from(u64::MAX) + 1, -9_007_199_254_740_993i128)
            .serialize(&mut serializer)
            .unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "[18446744073709552000,-9007199254740992]");
    }

    #[test]
    fn escapes_control_characters() {
        assert_eq!(to_ecma_json("a\"b\\c\n\u{1}").unwrap(), r#""a\"b\\c\n\u0001""#);
    }

    #[test]
    fn truthiness_matches_ecmascript() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert!(!is_truthy(&falsy), "{falsy} should be falsy");
        }
        for truthy in [json!(true), json!(-1), json!("0"), json!({}), json!([])] {
            assert!(is_truthy(&truthy), "{truthy} should be truthy");
        }
    }

    #[test]
    fn counts_utf16_units() {
        assert_eq!(utf16_len("abc"), 3);
        assert_eq!(utf16_len("é"), 1);
        assert_eq!(utf16_len("😀"), 2);
    }
}
