//! Value
//!
//! Dynamically typed cell values and the ordering used to compare them.
//! Every record field, leaf prediction and numerical threshold is a [`Value`].
use chrono::NaiveDate;
use serde::de::{self, Deserializer, Visitor};
use serde::ser;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt::{self, Display};

const PERSISTED_DATE_FORMAT: &str = "%Y-%m-%dT00:00:00Z";

/// A single cell of a record.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    /// Timestamp with date-only precision.
    Date(NaiveDate),
    /// No entry, or an explicit null.
    #[default]
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric view of the value, integers widened to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Normalized identity key of the value.
    ///
    /// Two values are treated as the same class, category or group when
    /// their keys match. This conflates values of different types that
    /// render identically, e.g. `Int(1)` and `Str("1")`.
    pub fn key(&self) -> String {
        self.to_string()
    }

    fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    fn same_variant(&self, other: &Value) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Value::Missing => write!(f, "nil"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

/// Best-effort total order over heterogeneous values.
///
/// Missing sorts before everything, integers and floats compare
/// numerically after widening to f64, like-typed strings, booleans and
/// dates compare natively, and every other pairing compares the rendered
/// keys. The fallback is not transitive across all type mixes.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Missing, Value::Missing) => Ordering::Equal,
        (Value::Missing, _) => Ordering::Less,
        (_, Value::Missing) => Ordering::Greater,
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            // Both arms are numeric, so the widened views exist.
            let (x, y) = (a.as_f64().unwrap_or_default(), b.as_f64().unwrap_or_default());
            x.partial_cmp(&y).unwrap_or_else(|| x.total_cmp(&y))
        }
        (Value::Str(x), Value::Str(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        _ => a.key().cmp(&b.key()),
    }
}

// Exact comparison of an integer with a float.
fn compare_int_float(x: i64, y: f64) -> Ordering {
    // 2^63, the first float above i64::MAX.
    const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;
    if y.is_nan() {
        return (x as f64).total_cmp(&y);
    }
    if y >= I64_BOUND {
        return Ordering::Less;
    }
    if y < -I64_BOUND {
        return Ordering::Greater;
    }
    let whole = y.trunc();
    match x.cmp(&(whole as i64)) {
        Ordering::Equal => whole.partial_cmp(&y).unwrap_or(Ordering::Equal),
        ord => ord,
    }
}

// Total order over numeric values: widened f64 first, then exact value.
// `compare_values` mixes exact `Int`/`Int` with widened `Int`/`Float`
// comparisons, which is intransitive above 2^53.
fn compare_numeric(a: &Value, b: &Value) -> Ordering {
    let (x, y) = (a.as_f64().unwrap_or_default(), b.as_f64().unwrap_or_default());
    let widened = x.partial_cmp(&y).unwrap_or_else(|| x.total_cmp(&y));
    widened.then_with(|| match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Int(x), Value::Float(y)) => compare_int_float(*x, *y),
        (Value::Float(x), Value::Int(y)) => compare_int_float(*y, *x).reverse(),
        _ => Ordering::Equal,
    })
}

/// Sort values ascending by [`compare_values`].
///
/// Numeric slices use the standard sort, with values that only widen to the
/// same f64 ordered exactly. Single-variant slices use the standard sort too.
/// Mixed slices may hit the non-transitive string fallback, which the
/// standard sort is allowed to reject, so they are insertion sorted instead.
pub fn sort_values(values: &mut [Value]) {
    if values.iter().all(Value::is_numeric) {
        values.sort_by(compare_numeric);
        return;
    }
    let homogeneous = match values.first() {
        None => true,
        Some(first) => values.iter().all(|v| first.same_variant(v)),
    };
    if homogeneous {
        values.sort_by(compare_values);
        return;
    }
    for i in 1..values.len() {
        let mut j = i;
        while j > 0 && compare_values(&values[j], &values[j - 1]) == Ordering::Less {
            values.swap(j, j - 1);
            j -= 1;
        }
    }
}

/// Candidate threshold halfway between two adjacent sorted values.
///
/// Two integers average to an integer (truncated toward zero), any float
/// operand widens the average to a float, and non-numeric operands have
/// no midpoint.
pub fn midpoint(a: &Value, b: &Value) -> Option<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(Value::Int(((*x as i128 + *y as i128) / 2) as i64)),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            Some(Value::Float((a.as_f64()? + b.as_f64()?) / 2.0))
        }
        _ => None,
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Float(v) if !v.is_finite() => {
                Err(ser::Error::custom(format!("cannot persist non-finite value {}", v)))
            }
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Str(v) => serializer.serialize_str(v),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Date(v) => serializer.collect_str(&v.format(PERSISTED_DATE_FORMAT)),
            Value::Missing => serializer.serialize_none(),
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an integer, float, string, boolean or null")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(match i64::try_from(v) {
            Ok(v) => Value::Int(v),
            Err(_) => Value::Float(v as f64),
        })
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(match NaiveDate::parse_from_str(v, PERSISTED_DATE_FORMAT) {
            Ok(d) => Value::Date(d),
            Err(_) => Value::Str(v.to_string()),
        })
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Missing)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Missing)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_missing_sorts_first() {
        assert_eq!(compare_values(&Value::Missing, &Value::Int(i64::MIN)), Ordering::Less);
        assert_eq!(compare_values(&Value::from("a"), &Value::Missing), Ordering::Greater);
        assert_eq!(compare_values(&Value::Missing, &Value::Missing), Ordering::Equal);
    }

    #[test]
    fn test_numeric_widening() {
        assert_eq!(compare_values(&Value::Int(2), &Value::Float(2.5)), Ordering::Less);
        assert_eq!(compare_values(&Value::Float(3.0), &Value::Int(3)), Ordering::Equal);
        assert_eq!(compare_values(&Value::Int(-4), &Value::Int(-5)), Ordering::Greater);
    }

    #[test]
    fn test_exact_numeric_tie_break() {
        let base: i64 = 1 << 53;
        let (big, float) = (Value::Int(base + 1), Value::Float(base as f64));
        assert_eq!(compare_values(&big, &float), Ordering::Equal);
        assert_eq!(compare_numeric(&big, &float), Ordering::Greater);
        assert_eq!(compare_numeric(&float, &Value::Int(base)), Ordering::Equal);
        assert_eq!(compare_int_float(-3, -2.5), Ordering::Less);
        assert_eq!(compare_int_float(-2, -2.5), Ordering::Greater);
        assert_eq!(compare_int_float(i64::MAX, 1e19), Ordering::Less);
        assert_eq!(compare_int_float(i64::MIN, -1e19), Ordering::Greater);
        assert_eq!(compare_int_float(i64::MAX, f64::NAN), Ordering::Less);
    }

    #[test]
    fn test_sort_large_mixed_numerics() {
        let base: i64 = 1 << 53;
        let mut values: Vec<Value> = (0..400_i64)
            .map(|k| {
                if k % 2 == 0 {
                    Value::Int(base + k)
                } else {
                    Value::Float((base + 400 - k) as f64)
                }
            })
            .collect();
        sort_values(&mut values);
        assert_eq!(values.len(), 400);
        assert!(values
            .windows(2)
            .all(|w| compare_numeric(&w[0], &w[1]) != Ordering::Greater));
    }

    #[test]
    fn test_native_and_fallback() {
        assert_eq!(compare_values(&Value::from("apple"), &Value::from("banana")), Ordering::Less);
        assert_eq!(compare_values(&Value::Bool(false), &Value::Bool(true)), Ordering::Less);
        assert_eq!(compare_values(&date(2024, 1, 2), &date(2023, 12, 31)), Ordering::Greater);
        // "1" < "true" as strings.
        assert_eq!(compare_values(&Value::Int(1), &Value::Bool(true)), Ordering::Less);
        // "10" < "9" as strings, even though 10 > 9.
        assert_eq!(compare_values(&Value::Int(10), &Value::from("9")), Ordering::Less);
    }

    #[test]
    fn test_keys() {
        assert_eq!(Value::Float(2.0).key(), "2");
        assert_eq!(Value::Float(1.5).key(), "1.5");
        assert_eq!(Value::Int(1).key(), Value::from("1").key());
        assert_eq!(Value::Missing.key(), "nil");
        assert_eq!(date(2024, 3, 9).key(), "2024-03-09");
    }

    #[test]
    fn test_midpoint() {
        assert_eq!(midpoint(&Value::Int(1), &Value::Int(4)), Some(Value::Int(2)));
        assert_eq!(midpoint(&Value::Int(-3), &Value::Int(0)), Some(Value::Int(-1)));
        assert_eq!(midpoint(&Value::Int(1), &Value::Float(2.0)), Some(Value::Float(1.5)));
        assert_eq!(midpoint(&Value::Float(1.2), &Value::Float(1.8)), Some(Value::Float(1.5)));
        assert_eq!(midpoint(&Value::from("a"), &Value::Int(1)), None);
        assert_eq!(midpoint(&Value::Int(i64::MAX), &Value::Int(i64::MAX)), Some(Value::Int(i64::MAX)));
    }

    #[test]
    fn test_sort_mixed_values_terminates() {
        let mut v = vec![Value::Int(10), Value::Int(9), Value::from("5"), Value::Missing, Value::Float(9.5)];
        sort_values(&mut v);
        assert_eq!(v[0], Value::Missing);
        assert_eq!(v.len(), 5);

        let mut n = vec![Value::Float(2.5), Value::Int(1), Value::Int(3)];
        sort_values(&mut n);
        assert_eq!(n, vec![Value::Int(1), Value::Float(2.5), Value::Int(3)]);
    }

    #[test]
    fn test_json_encoding() {
        let values = vec![
            Value::Int(3),
            Value::Float(1.5),
            Value::from("yes"),
            Value::Bool(true),
            date(2021, 6, 1),
            Value::Missing,
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[3,1.5,"yes",true,"2021-06-01T00:00:00Z",null]"#);
        let decoded: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_non_finite_floats_are_not_persisted() {
        for v in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(serde_json::to_string(&Value::Float(v)).is_err());
        }
    }
}
