//! Stored values and the "unknown" sample.
//!
//! Archives mark samples they could not consolidate as NaN. NaN is a normal
//! value here, never an error, and it has to survive every output format:
//!
//! - serde writes NaN as `null` and reads `null` back as NaN (JSON has no NaN)
//! - text output prints it as `NaN`, the way rrdtool does

/// Returns whether `value` is the unknown marker.
#[inline]
pub fn is_unknown(value: f64) -> bool {
    value.is_nan()
}

/// Formats a value like C's `%.10e` (`1.2340000000e+02`), NaN as `NaN`.
///
/// # Examples
///
/// ```rust
/// use rrdump::value::format_value;
///
/// assert_eq!(format_value(123.4), "1.2340000000e+02");
/// assert_eq!(format_value(0.0), "0.0000000000e+00");
/// assert_eq!(format_value(f64::NAN), "NaN");
/// ```
pub fn format_value(value: f64) -> String {
    if is_unknown(value) {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Inf" } else { "-Inf" }.to_string();
    }

    let formatted = format!("{value:.10e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => formatted,
    }
}

/// Serde support for a list of values that may contain unknowns.
pub(crate) mod unknown_as_null {
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&super::known(*value))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let values = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(values
            .into_iter()
            .map(|value| value.unwrap_or(f64::NAN))
            .collect())
    }
}

/// Maps the unknown marker to `None`.
pub(crate) fn known(value: f64) -> Option<f64> {
    if is_unknown(value) { None } else { Some(value) }
}
