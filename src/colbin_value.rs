use crate::config::DocConfig;
use crate::error::{DocError, Result};
use crate::scalar::{Number, Scalar};
use crate::types::*;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use smol_str::SmolStr;

// ─── Containers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ColbinArray {
    pub class: AbstractClass,
    pub items: Vec<ColbinValue>,
}

/// Properties in insertion order. Duplicate keys are kept as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct ColbinObject {
    pub class: AbstractClass,
    pub entries: Vec<(SmolStr, ColbinValue)>,
}

impl ColbinObject {
    /// First property named `key`.
    pub fn get(&self, key: &str) -> Option<&ColbinValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| v)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColbinColumn {
    pub column_type: ColumnType,
    pub class: AbstractClass,
    /// Slot count reserved on encode, never below `slots.len()`.
    pub capacity: u64,
    pub slots: Vec<Scalar>,
}

impl ColbinColumn {
    pub fn new(column_type: ColumnType, slots: Vec<Scalar>) -> Self {
        ColbinColumn {
            column_type,
            class: AbstractClass::UnsortedMultiset,
            capacity: slots.len() as u64,
            slots,
        }
    }

    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity.max(self.slots.len() as u64);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BinaryKind {
    Mime(u64),
    Custom(SmolStr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColbinBinary {
    pub kind: BinaryKind,
    pub data: Vec<u8>,
}

impl ColbinBinary {
    pub fn type_name(&self) -> &str {
        match &self.kind {
            BinaryKind::Mime(id) => mime_name(*id),
            BinaryKind::Custom(name) => name.as_str(),
        }
    }
}

// ─── ColbinValue ────────────────────────────────────────────────────────────

/// Owned tree mirroring every field kind of the binary format. Numbers keep
/// their encoded width, containers their refinement, so decoding a field and
/// encoding the result gives back the same bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ColbinValue {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    Str(SmolStr),
    Binary(ColbinBinary),
    Array(ColbinArray),
    Column(ColbinColumn),
    Object(ColbinObject),
}

impl ColbinValue {
    pub fn array(items: Vec<ColbinValue>) -> Self {
        ColbinValue::Array(ColbinArray {
            class: AbstractClass::UnsortedMultiset,
            items,
        })
    }

    pub fn object<K: Into<SmolStr>>(entries: impl IntoIterator<Item = (K, ColbinValue)>) -> Self {
        ColbinValue::Object(ColbinObject {
            class: AbstractClass::UnsortedMultimap,
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        })
    }

    pub fn column(column_type: ColumnType, slots: Vec<Scalar>) -> Self {
        ColbinValue::Column(ColbinColumn::new(column_type, slots))
    }

    pub fn from_scalar(value: Scalar) -> Self {
        match value {
            Scalar::Null => ColbinValue::Null,
            Scalar::Bool(b) => ColbinValue::Bool(b),
            Scalar::Unsigned(v) => ColbinValue::Number(Number::unsigned(v)),
            Scalar::Signed(v) => ColbinValue::Number(Number::signed(v)),
            Scalar::Float(v) => ColbinValue::Number(Number::Float(v)),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ColbinValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ColbinValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ColbinValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ColbinValue::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ColbinValue::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ColbinValue::Number(n) => Some(n.as_f64()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ColbinValue]> {
        match self {
            ColbinValue::Array(array) => Some(&array.items),
            _ => None,
        }
    }

    pub fn as_column(&self) -> Option<&ColbinColumn> {
        match self {
            ColbinValue::Column(column) => Some(column),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ColbinObject> {
        match self {
            ColbinValue::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&ColbinValue> {
        self.as_object()?.get(key)
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            ColbinValue::Null => FieldType::Null,
            ColbinValue::Bool(true) => FieldType::True,
            ColbinValue::Bool(false) => FieldType::False,
            ColbinValue::Number(n) => n.field_type(),
            ColbinValue::Str(_) => FieldType::String,
            ColbinValue::Binary(ColbinBinary {
                kind: BinaryKind::Mime(_),
                ..
            }) => FieldType::Binary,
            ColbinValue::Binary(_) => FieldType::BinaryCustom,
            ColbinValue::Array(_) => FieldType::Array,
            ColbinValue::Column(column) => FieldType::Column(column.column_type),
            ColbinValue::Object(_) => FieldType::Object,
        }
    }

    /// Converts parsed JSON, turning homogeneous arrays into columns when
    /// `config.columnize_arrays` is set.
    pub fn from_json(value: &serde_json::Value, config: &DocConfig) -> Result<Self> {
        json_to_value(value, config, 0)
    }

    pub fn from_cbor(value: &cbor4ii::core::Value, config: &DocConfig) -> Result<Self> {
        cbor_to_value(value, config, 0)
    }
}

// ─── Columnization ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum SlotKind {
    Bool,
    Int,
    Float,
}

/// Narrowest column holding every slot, or `None` if the slots mix kinds,
/// are all null, or some value collides with every candidate's sentinel.
pub(crate) fn columnize(slots: Vec<Scalar>, config: &DocConfig) -> Option<ColbinColumn> {
    if !config.columnize_arrays {
        return None;
    }
    let mut kind = None;
    let mut negative = false;
    for slot in &slots {
        let slot_kind = match *slot {
            Scalar::Null => continue,
            Scalar::Bool(_) => SlotKind::Bool,
            Scalar::Float(_) => SlotKind::Float,
            Scalar::Unsigned(_) => SlotKind::Int,
            Scalar::Signed(v) => {
                negative |= v < 0;
                SlotKind::Int
            }
        };
        match kind {
            None => kind = Some(slot_kind),
            Some(prev) if prev != slot_kind => return None,
            Some(_) => {}
        }
    }
    let candidates: &[ColumnType] = match kind? {
        SlotKind::Bool => &[ColumnType::Boolean],
        SlotKind::Float => &[ColumnType::Float],
        SlotKind::Int if negative => &ColumnType::SIGNED,
        SlotKind::Int => &ColumnType::UNSIGNED,
    };
    let column_type = candidates
        .iter()
        .copied()
        .find(|ct| slots.iter().all(|s| s.fits_column(*ct)))?;
    let capacity = slots.len() as u64 + config.column_spare_slots;
    Some(ColbinColumn {
        column_type,
        class: AbstractClass::UnsortedMultiset,
        capacity,
        slots,
    })
}

fn check_depth(depth: usize, config: &DocConfig) -> Result<()> {
    if depth >= config.max_depth {
        return Err(DocError::DepthLimit {
            max: config.max_depth,
        });
    }
    Ok(())
}

// ─── From serde_json::Value ─────────────────────────────────────────────────

fn json_number(n: &serde_json::Number) -> Scalar {
    if let Some(u) = n.as_u64() {
        Scalar::Unsigned(u)
    } else if let Some(i) = n.as_i64() {
        Scalar::Signed(i)
    } else {
        Scalar::Float(n.as_f64().unwrap_or(0.0) as f32)
    }
}

fn json_scalar(value: &serde_json::Value) -> Option<Scalar> {
    match value {
        serde_json::Value::Null => Some(Scalar::Null),
        serde_json::Value::Bool(b) => Some(Scalar::Bool(*b)),
        serde_json::Value::Number(n) => Some(json_number(n)),
        _ => None,
    }
}

fn json_to_value(value: &serde_json::Value, config: &DocConfig, depth: usize) -> Result<ColbinValue> {
    let converted = match value {
        serde_json::Value::Null => ColbinValue::Null,
        serde_json::Value::Bool(b) => ColbinValue::Bool(*b),
        serde_json::Value::Number(n) => ColbinValue::from_scalar(json_number(n)),
        serde_json::Value::String(s) => ColbinValue::Str(SmolStr::from(s.as_str())),
        serde_json::Value::Array(items) => {
            check_depth(depth, config)?;
            let column = items
                .iter()
                .map(json_scalar)
                .collect::<Option<Vec<_>>>()
                .and_then(|slots| columnize(slots, config));
            match column {
                Some(column) => ColbinValue::Column(column),
                None => ColbinValue::array(
                    items
                        .iter()
                        .map(|item| json_to_value(item, config, depth + 1))
                        .collect::<Result<_>>()?,
                ),
            }
        }
        serde_json::Value::Object(map) => {
            check_depth(depth, config)?;
            let entries = map
                .iter()
                .map(|(k, v)| -> Result<(SmolStr, ColbinValue)> {
                    Ok((SmolStr::from(k.as_str()), json_to_value(v, config, depth + 1)?))
                })
                .collect::<Result<Vec<_>>>()?;
            ColbinValue::object(entries)
        }
    };
    Ok(converted)
}

/// Uses the default config without a depth limit.
impl From<serde_json::Value> for ColbinValue {
    fn from(v: serde_json::Value) -> Self {
        let config = DocConfig {
            max_depth: usize::MAX,
            ..DocConfig::default()
        };
        json_to_value(&v, &config, 0).unwrap_or_default()
    }
}

// ─── From cbor4ii::core::Value ──────────────────────────────────────────────

fn cbor_scalar(value: &cbor4ii::core::Value) -> Option<Scalar> {
    match value {
        cbor4ii::core::Value::Null => Some(Scalar::Null),
        cbor4ii::core::Value::Bool(b) => Some(Scalar::Bool(*b)),
        cbor4ii::core::Value::Integer(i) => Some(cbor_integer(*i)),
        cbor4ii::core::Value::Float(f) => Some(Scalar::Float(*f as f32)),
        _ => None,
    }
}

fn cbor_integer(i: i128) -> Scalar {
    if let Ok(u) = u64::try_from(i) {
        Scalar::Unsigned(u)
    } else if let Ok(s) = i64::try_from(i) {
        Scalar::Signed(s)
    } else {
        Scalar::Float(i as f32)
    }
}

fn cbor_to_value(value: &cbor4ii::core::Value, config: &DocConfig, depth: usize) -> Result<ColbinValue> {
    let converted = match value {
        cbor4ii::core::Value::Text(s) => ColbinValue::Str(SmolStr::from(s.as_str())),
        cbor4ii::core::Value::Bytes(bytes) => ColbinValue::Binary(ColbinBinary {
            kind: BinaryKind::Mime(MIME_OCTET_STREAM),
            data: bytes.clone(),
        }),
        cbor4ii::core::Value::Array(items) => {
            check_depth(depth, config)?;
            let column = items
                .iter()
                .map(cbor_scalar)
                .collect::<Option<Vec<_>>>()
                .and_then(|slots| columnize(slots, config));
            match column {
                Some(column) => ColbinValue::Column(column),
                None => ColbinValue::array(
                    items
                        .iter()
                        .map(|item| cbor_to_value(item, config, depth + 1))
                        .collect::<Result<_>>()?,
                ),
            }
        }
        cbor4ii::core::Value::Map(map) => {
            check_depth(depth, config)?;
            let entries = map
                .iter()
                .map(|(k, v)| -> Result<(SmolStr, ColbinValue)> {
                    let key = match k {
                        cbor4ii::core::Value::Text(s) => SmolStr::from(s.as_str()),
                        cbor4ii::core::Value::Integer(i) => SmolStr::from(i.to_string()),
                        other => SmolStr::from(format!("{:?}", other)),
                    };
                    Ok((key, cbor_to_value(v, config, depth + 1)?))
                })
                .collect::<Result<Vec<_>>>()?;
            ColbinValue::object(entries)
        }
        other => match cbor_scalar(other) {
            Some(scalar) => ColbinValue::from_scalar(scalar),
            None => ColbinValue::Null,
        },
    };
    Ok(converted)
}

// ─── Into serde_json::Value ─────────────────────────────────────────────────

/// f32 → f64 through the shortest decimal form, so 0.1f32 stays 0.1.
pub(crate) fn float_to_json(v: f32) -> serde_json::Value {
    v.to_string()
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

fn scalar_to_json(value: Scalar) -> serde_json::Value {
    match value {
        Scalar::Null => serde_json::Value::Null,
        Scalar::Bool(b) => serde_json::Value::Bool(b),
        Scalar::Unsigned(u) => serde_json::json!(u),
        Scalar::Signed(i) => serde_json::json!(i),
        Scalar::Float(f) => float_to_json(f),
    }
}

impl From<&ColbinValue> for serde_json::Value {
    fn from(val: &ColbinValue) -> Self {
        match val {
            ColbinValue::Null => serde_json::Value::Null,
            ColbinValue::Bool(b) => serde_json::Value::Bool(*b),
            ColbinValue::Number(n) => scalar_to_json(n.to_scalar()),
            ColbinValue::Str(s) => serde_json::Value::String(s.to_string()),
            ColbinValue::Binary(binary) => serde_json::json!({
                "type": binary.type_name(),
                "encoding": "base64",
                "binary-string": STANDARD.encode(&binary.data),
            }),
            ColbinValue::Array(array) => {
                serde_json::Value::Array(array.items.iter().map(|v| v.into()).collect())
            }
            ColbinValue::Column(column) => {
                serde_json::Value::Array(column.slots.iter().map(|s| scalar_to_json(*s)).collect())
            }
            ColbinValue::Object(object) => serde_json::Value::Object(
                object
                    .entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.into()))
                    .collect(),
            ),
        }
    }
}

impl From<ColbinValue> for serde_json::Value {
    fn from(val: ColbinValue) -> Self {
        (&val).into()
    }
}

// ─── Serialize ──────────────────────────────────────────────────────────────

struct SlotSer(Scalar);

impl Serialize for SlotSer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Scalar::Null => serializer.serialize_none(),
            Scalar::Bool(b) => serializer.serialize_bool(b),
            Scalar::Unsigned(u) => serializer.serialize_u64(u),
            Scalar::Signed(i) => serializer.serialize_i64(i),
            Scalar::Float(f) => serializer.serialize_f32(f),
        }
    }
}

impl Serialize for ColbinValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ColbinValue::Null => serializer.serialize_none(),
            ColbinValue::Bool(b) => serializer.serialize_bool(*b),
            ColbinValue::Number(n) => SlotSer(n.to_scalar()).serialize(serializer),
            ColbinValue::Str(s) => serializer.serialize_str(s.as_str()),
            ColbinValue::Binary(binary) => {
                let mut m = serializer.serialize_map(Some(3))?;
                m.serialize_entry("type", binary.type_name())?;
                m.serialize_entry("encoding", "base64")?;
                m.serialize_entry("binary-string", &STANDARD.encode(&binary.data))?;
                m.end()
            }
            ColbinValue::Array(array) => {
                let mut seq = serializer.serialize_seq(Some(array.items.len()))?;
                for v in &array.items {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
            ColbinValue::Column(column) => {
                let mut seq = serializer.serialize_seq(Some(column.slots.len()))?;
                for slot in &column.slots {
                    seq.serialize_element(&SlotSer(*slot))?;
                }
                seq.end()
            }
            ColbinValue::Object(object) => {
                let mut m = serializer.serialize_map(Some(object.entries.len()))?;
                for (k, v) in &object.entries {
                    m.serialize_entry(k.as_str(), v)?;
                }
                m.end()
            }
        }
    }
}

// ─── From impls ─────────────────────────────────────────────────────────────

impl From<bool> for ColbinValue {
    fn from(b: bool) -> Self {
        ColbinValue::Bool(b)
    }
}

impl From<u64> for ColbinValue {
    fn from(n: u64) -> Self {
        ColbinValue::Number(Number::unsigned(n))
    }
}

/// Non-negative values take the unsigned encoding, like JSON input does.
impl From<i64> for ColbinValue {
    fn from(n: i64) -> Self {
        match u64::try_from(n) {
            Ok(u) => ColbinValue::from(u),
            Err(_) => ColbinValue::Number(Number::signed(n)),
        }
    }
}

impl From<f32> for ColbinValue {
    fn from(n: f32) -> Self {
        ColbinValue::Number(Number::Float(n))
    }
}

impl From<&str> for ColbinValue {
    fn from(s: &str) -> Self {
        ColbinValue::Str(SmolStr::from(s))
    }
}

impl From<String> for ColbinValue {
    fn from(s: String) -> Self {
        ColbinValue::Str(SmolStr::from(s))
    }
}

impl From<Vec<ColbinValue>> for ColbinValue {
    fn from(items: Vec<ColbinValue>) -> Self {
        ColbinValue::array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_homogeneous_arrays_become_columns() {
        let config = DocConfig::default();
        let value = ColbinValue::from_json(&json!([1, null, 3]), &config).unwrap();
        let column = value.as_column().unwrap();
        assert_eq!(column.column_type, ColumnType::U8);
        assert_eq!(column.slots[1], Scalar::Null);

        let value = ColbinValue::from_json(&json!([1, -300]), &config).unwrap();
        assert_eq!(value.as_column().unwrap().column_type, ColumnType::I16);

        let value = ColbinValue::from_json(&json!([true, null]), &config).unwrap();
        assert_eq!(value.as_column().unwrap().column_type, ColumnType::Boolean);

        let value = ColbinValue::from_json(&json!([255]), &config).unwrap();
        assert_eq!(value.as_column().unwrap().column_type, ColumnType::U16);
    }

    #[test]
    fn test_mixed_arrays_stay_arrays() {
        let config = DocConfig::default();
        for input in [json!([1, -42, 23.0]), json!([1, "a"]), json!([]), json!([null, null]), json!([true, 1])] {
            let value = ColbinValue::from_json(&input, &config).unwrap();
            assert!(value.as_array().is_some(), "{input}");
        }
        let off = DocConfig {
            columnize_arrays: false,
            ..DocConfig::default()
        };
        assert!(ColbinValue::from_json(&json!([1, 2]), &off).unwrap().as_array().is_some());
    }

    #[test]
    fn test_default_is_null() {
        assert_eq!(ColbinValue::default(), ColbinValue::Null);
    }

    #[test]
    fn test_spare_slots() {
        let config = DocConfig {
            column_spare_slots: 6,
            ..DocConfig::default()
        };
        let value = ColbinValue::from_json(&json!([7, 8]), &config).unwrap();
        assert_eq!(value.as_column().unwrap().capacity, 8);
    }

    #[test]
    fn test_depth_limit() {
        let config = DocConfig {
            max_depth: 2,
            ..DocConfig::default()
        };
        assert!(ColbinValue::from_json(&json!({"a": {"b": 1}}), &config).is_ok());
        assert!(matches!(
            ColbinValue::from_json(&json!({"a": {"b": {"c": 1}}}), &config),
            Err(DocError::DepthLimit { max: 2 })
        ));
    }

    #[test]
    fn test_json_round_trip_keeps_key_order() {
        let input = json!({"z": 1, "a": [1, "x"], "m": {"k": null}, "f": 0.1});
        let value = ColbinValue::from(input.clone());
        assert_eq!(serde_json::Value::from(&value), input);
        assert_eq!(serde_json::to_value(&value).unwrap()["z"], json!(1));
    }

    #[test]
    fn test_cbor_conversion() {
        let cbor = cbor4ii::core::Value::Map(vec![
            (
                cbor4ii::core::Value::Text("n".into()),
                cbor4ii::core::Value::Integer(-5),
            ),
            (
                cbor4ii::core::Value::Text("b".into()),
                cbor4ii::core::Value::Bytes(vec![1, 2]),
            ),
            (
                cbor4ii::core::Value::Integer(7),
                cbor4ii::core::Value::Array(vec![
                    cbor4ii::core::Value::Integer(1),
                    cbor4ii::core::Value::Integer(2),
                ]),
            ),
        ]);
        let value = ColbinValue::from_cbor(&cbor, &DocConfig::default()).unwrap();
        assert_eq!(value.get("n").and_then(|v| v.as_i64()), Some(-5));
        assert_eq!(value.get("b").map(|v| v.field_type()), Some(FieldType::Binary));
        assert_eq!(
            value.get("7").map(|v| v.field_type()),
            Some(FieldType::Column(ColumnType::U8))
        );
    }
}
