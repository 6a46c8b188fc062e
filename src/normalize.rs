//! Value normalization: one raw value in, one report-safe rendering out.

use crate::error::{AnalyzerError, Result};
use crate::report::{NormalizedValue, Rendered, DEFAULT_VALUE_NAME};
use crate::tree::{RawValue, TypeTag};
use crate::value::ValueData;
use byteorder::{ByteOrder, LittleEndian};

/// Normalizes one value.
///
/// Never fails: a payload that cannot be read or interpreted produces an
/// `[ERROR: <reason>]` placeholder for this value alone.
///
/// ```rust
/// use hive_report::normalize::normalize;
/// use hive_report::report::Rendered;
/// use hive_report::tree::MemoryValue;
///
/// let value = normalize(&MemoryValue::binary("Blob", [0xDE, 0xAD]));
/// assert_eq!(value.rendered, Rendered::Text("dead".into()));
/// ```
pub fn normalize<V: RawValue>(value: &V) -> NormalizedValue {
    let rendered = render(value).unwrap_or_else(Rendered::error);
    NormalizedValue {
        display_name: display_name(value.name()),
        value_type: value.value_type(),
        rendered,
    }
}

/// Name under which a value is reported.
pub fn display_name(name: &str) -> String {
    if name.is_empty() {
        DEFAULT_VALUE_NAME.to_string()
    } else {
        name.to_string()
    }
}

fn render<V: RawValue>(value: &V) -> Result<Rendered> {
    let value_type = value.value_type();
    let data = value.data()?;

    match TypeTag::from(value_type) {
        TypeTag::Binary => Ok(Rendered::Text(hex::encode(&data))),
        TypeTag::Integer32 => {
            if data.len() != 4 {
                return Err(AnalyzerError::PayloadSize {
                    type_name: value_type.name(),
                    expected: 4,
                    actual: data.len(),
                });
            }
            Ok(Rendered::Integer(LittleEndian::read_u32(&data)))
        }
        TypeTag::Other => Ok(Rendered::Text(ValueData::parse(&data, value_type)?.to_string())),
    }
}
