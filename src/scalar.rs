use crate::error::{DocError, Result};
use crate::types::*;
use std::fmt::Debug;

/// Reserved quiet-NaN payload marking a null float slot.
pub const FLOAT_NULL_BITS: u32 = 0x7FC0_0001;

// ─── ColumnValue ────────────────────────────────────────────────────────────

/// One implementation per slot type: width, null sentinel and LE codec.
/// Every per-width column operation is written once against this trait.
pub trait ColumnValue: Copy + PartialEq + Debug {
    const COLUMN_TYPE: ColumnType;

    fn null() -> Self;

    /// Decodes the first `COLUMN_TYPE.width()` bytes of `slot`.
    fn from_slot(slot: &[u8]) -> Self;

    fn write_slot(self, slot: &mut [u8]);

    #[inline]
    fn is_null(self) -> bool {
        self == Self::null()
    }
}

macro_rules! int_column_value {
    ($ty:ty, $column_type:ident, $null:expr) => {
        impl ColumnValue for $ty {
            const COLUMN_TYPE: ColumnType = ColumnType::$column_type;

            #[inline]
            fn null() -> Self {
                $null
            }

            #[inline]
            fn from_slot(slot: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(&slot[..std::mem::size_of::<$ty>()]);
                <$ty>::from_le_bytes(raw)
            }

            #[inline]
            fn write_slot(self, slot: &mut [u8]) {
                slot[..std::mem::size_of::<$ty>()].copy_from_slice(&self.to_le_bytes());
            }
        }
    };
}

int_column_value!(u8, U8, u8::MAX);
int_column_value!(u16, U16, u16::MAX);
int_column_value!(u32, U32, u32::MAX);
int_column_value!(u64, U64, u64::MAX);
int_column_value!(i8, I8, i8::MIN);
int_column_value!(i16, I16, i16::MIN);
int_column_value!(i32, I32, i32::MIN);
int_column_value!(i64, I64, i64::MIN);

impl ColumnValue for f32 {
    const COLUMN_TYPE: ColumnType = ColumnType::Float;

    #[inline]
    fn null() -> Self {
        f32::from_bits(FLOAT_NULL_BITS)
    }

    #[inline]
    fn from_slot(slot: &[u8]) -> Self {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&slot[..4]);
        f32::from_le_bytes(raw)
    }

    #[inline]
    fn write_slot(self, slot: &mut [u8]) {
        slot[..4].copy_from_slice(&self.to_le_bytes());
    }

    // NaN != NaN, compare bit patterns
    #[inline]
    fn is_null(self) -> bool {
        self.to_bits() == FLOAT_NULL_BITS
    }
}

/// A boolean column slot: three-valued byte, independent of the scalar
/// true/false markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boolean(pub u8);

impl Boolean {
    pub const FALSE: Boolean = Boolean(0);
    pub const TRUE: Boolean = Boolean(1);
    pub const NULL: Boolean = Boolean(2);

    pub fn get(self) -> Option<bool> {
        match self {
            Boolean::NULL => None,
            Boolean::FALSE => Some(false),
            _ => Some(true),
        }
    }
}

impl From<bool> for Boolean {
    fn from(b: bool) -> Self {
        if b { Boolean::TRUE } else { Boolean::FALSE }
    }
}

impl ColumnValue for Boolean {
    const COLUMN_TYPE: ColumnType = ColumnType::Boolean;

    #[inline]
    fn null() -> Self {
        Boolean::NULL
    }

    #[inline]
    fn from_slot(slot: &[u8]) -> Self {
        Boolean(slot[0])
    }

    #[inline]
    fn write_slot(self, slot: &mut [u8]) {
        slot[0] = self.0;
    }
}

fn read_typed<T: ColumnValue>(slot: &[u8], wrap: impl FnOnce(T) -> Scalar) -> Scalar {
    let value = T::from_slot(slot);
    if value.is_null() { Scalar::Null } else { wrap(value) }
}

// ─── Dynamic slot codec ─────────────────────────────────────────────────────

impl ColumnType {
    /// Largest unsigned value a slot stores without hitting the sentinel.
    fn unsigned_limit(self) -> Option<u64> {
        match self {
            ColumnType::U8 => Some(u8::MAX as u64 - 1),
            ColumnType::U16 => Some(u16::MAX as u64 - 1),
            ColumnType::U32 => Some(u32::MAX as u64 - 1),
            ColumnType::U64 => Some(u64::MAX - 1),
            _ => None,
        }
    }

    /// Inclusive signed range, the minimum being reserved for null.
    fn signed_range(self) -> Option<(i64, i64)> {
        match self {
            ColumnType::I8 => Some((i8::MIN as i64 + 1, i8::MAX as i64)),
            ColumnType::I16 => Some((i16::MIN as i64 + 1, i16::MAX as i64)),
            ColumnType::I32 => Some((i32::MIN as i64 + 1, i32::MAX as i64)),
            ColumnType::I64 => Some((i64::MIN + 1, i64::MAX)),
            _ => None,
        }
    }

    pub fn read_slot(self, slot: &[u8]) -> Scalar {
        match self {
            ColumnType::U8 => read_typed::<u8>(slot, |v| Scalar::Unsigned(v as u64)),
            ColumnType::U16 => read_typed::<u16>(slot, |v| Scalar::Unsigned(v as u64)),
            ColumnType::U32 => read_typed::<u32>(slot, |v| Scalar::Unsigned(v as u64)),
            ColumnType::U64 => read_typed::<u64>(slot, Scalar::Unsigned),
            ColumnType::I8 => read_typed::<i8>(slot, |v| Scalar::Signed(v as i64)),
            ColumnType::I16 => read_typed::<i16>(slot, |v| Scalar::Signed(v as i64)),
            ColumnType::I32 => read_typed::<i32>(slot, |v| Scalar::Signed(v as i64)),
            ColumnType::I64 => read_typed::<i64>(slot, Scalar::Signed),
            ColumnType::Float => read_typed::<f32>(slot, Scalar::Float),
            ColumnType::Boolean => match Boolean::from_slot(slot).get() {
                Some(b) => Scalar::Bool(b),
                None => Scalar::Null,
            },
        }
    }

    pub fn slot_is_null(self, slot: &[u8]) -> bool {
        match self {
            ColumnType::U8 => u8::from_slot(slot).is_null(),
            ColumnType::U16 => u16::from_slot(slot).is_null(),
            ColumnType::U32 => u32::from_slot(slot).is_null(),
            ColumnType::U64 => u64::from_slot(slot).is_null(),
            ColumnType::I8 => i8::from_slot(slot).is_null(),
            ColumnType::I16 => i16::from_slot(slot).is_null(),
            ColumnType::I32 => i32::from_slot(slot).is_null(),
            ColumnType::I64 => i64::from_slot(slot).is_null(),
            ColumnType::Float => f32::from_slot(slot).is_null(),
            ColumnType::Boolean => Boolean::from_slot(slot).is_null(),
        }
    }

    pub fn write_null(self, slot: &mut [u8]) {
        match self {
            ColumnType::U8 => u8::null().write_slot(slot),
            ColumnType::U16 => u16::null().write_slot(slot),
            ColumnType::U32 => u32::null().write_slot(slot),
            ColumnType::U64 => u64::null().write_slot(slot),
            ColumnType::I8 => i8::null().write_slot(slot),
            ColumnType::I16 => i16::null().write_slot(slot),
            ColumnType::I32 => i32::null().write_slot(slot),
            ColumnType::I64 => i64::null().write_slot(slot),
            ColumnType::Float => f32::null().write_slot(slot),
            ColumnType::Boolean => Boolean::NULL.write_slot(slot),
        }
    }

    /// Encodes `value` into `slot`. The value must fit the column domain,
    /// see [`Scalar::fits_column`].
    pub fn write_slot(self, value: Scalar, slot: &mut [u8]) -> Result<()> {
        if !value.fits_column(self) {
            return Err(DocError::TypeMismatch {
                expected: self.name(),
                actual: value.minimal_type().scalar_marker().unwrap_or(MARKER_NULL),
            });
        }
        match value {
            Scalar::Null => self.write_null(slot),
            Scalar::Bool(b) => Boolean::from(b).write_slot(slot),
            Scalar::Float(v) => v.write_slot(slot),
            Scalar::Unsigned(v) => self.write_int(v as i128, slot),
            Scalar::Signed(v) => self.write_int(v as i128, slot),
        }
        Ok(())
    }

    // range already checked by fits_column
    fn write_int(self, v: i128, slot: &mut [u8]) {
        match self {
            ColumnType::U8 => (v as u8).write_slot(slot),
            ColumnType::U16 => (v as u16).write_slot(slot),
            ColumnType::U32 => (v as u32).write_slot(slot),
            ColumnType::U64 => (v as u64).write_slot(slot),
            ColumnType::I8 => (v as i8).write_slot(slot),
            ColumnType::I16 => (v as i16).write_slot(slot),
            ColumnType::I32 => (v as i32).write_slot(slot),
            ColumnType::I64 => (v as i64).write_slot(slot),
            ColumnType::Float | ColumnType::Boolean => {}
        }
    }

    /// Appends one encoded slot (null sentinel for `Scalar::Null`).
    pub fn push_slot(self, value: Scalar, out: &mut Vec<u8>) -> Result<()> {
        let start = out.len();
        out.resize(start + self.width(), 0);
        self.write_slot(value, &mut out[start..])
    }
}

// ─── Scalar ─────────────────────────────────────────────────────────────────

/// A value that fits in a column slot or a fixed-size field. The update
/// engine works in these; the concrete width is chosen at write time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Unsigned(u64),
    Signed(i64),
    Float(f32),
}

impl Scalar {
    /// Narrowest field type that encodes this value.
    pub fn minimal_type(self) -> FieldType {
        match self {
            Scalar::Null => FieldType::Null,
            Scalar::Bool(true) => FieldType::True,
            Scalar::Bool(false) => FieldType::False,
            Scalar::Unsigned(v) => Number::unsigned(v).field_type(),
            Scalar::Signed(v) => Number::signed(v).field_type(),
            Scalar::Float(_) => FieldType::Float,
        }
    }

    /// Writes the value as a standalone field of its minimal type.
    pub fn encode_field(self, buf: &mut Vec<u8>) {
        match self {
            Scalar::Null => buf.push(MARKER_NULL),
            Scalar::Bool(true) => buf.push(MARKER_TRUE),
            Scalar::Bool(false) => buf.push(MARKER_FALSE),
            Scalar::Unsigned(v) => Number::unsigned(v).encode(buf),
            Scalar::Signed(v) => Number::signed(v).encode(buf),
            Scalar::Float(v) => Number::Float(v).encode(buf),
        }
    }

    /// Whether a column of `column_type` stores this value as-is. Null fits
    /// everywhere, booleans only boolean columns, floats only float columns;
    /// integers fit any integer column whose range holds the value without
    /// colliding with its null sentinel.
    pub fn fits_column(self, column_type: ColumnType) -> bool {
        match (self, column_type) {
            (Scalar::Null, _) => true,
            (Scalar::Bool(_), ColumnType::Boolean) => true,
            (Scalar::Float(v), ColumnType::Float) => v.to_bits() != FLOAT_NULL_BITS,
            (Scalar::Unsigned(v), ct) => {
                if let Some(limit) = ct.unsigned_limit() {
                    v <= limit
                } else if let Some((_, max)) = ct.signed_range() {
                    v <= max as u64
                } else {
                    false
                }
            }
            (Scalar::Signed(v), ct) => {
                if let Some((min, max)) = ct.signed_range() {
                    v >= min && v <= max
                } else if let Some(limit) = ct.unsigned_limit() {
                    v >= 0 && v as u64 <= limit
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    /// Narrowest strictly wider column of the same signedness family that
    /// holds this integer, if any.
    pub fn widened_column(self, current: ColumnType) -> Option<ColumnType> {
        if !matches!(self, Scalar::Unsigned(_) | Scalar::Signed(_)) {
            return None;
        }
        let family: &[ColumnType] = if current.is_unsigned() {
            &ColumnType::UNSIGNED
        } else if current.is_signed() {
            &ColumnType::SIGNED
        } else {
            return None;
        };
        family
            .iter()
            .copied()
            .filter(|ct| ct.width() > current.width())
            .find(|ct| self.fits_column(*ct))
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<u64> for Scalar {
    fn from(v: u64) -> Self {
        Scalar::Unsigned(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Signed(v)
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::Float(v)
    }
}

// ─── Number ─────────────────────────────────────────────────────────────────

/// A numeric field with its exact encoded width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Float(f32),
}

impl Number {
    pub fn unsigned(v: u64) -> Number {
        if let Ok(v) = u8::try_from(v) {
            Number::U8(v)
        } else if let Ok(v) = u16::try_from(v) {
            Number::U16(v)
        } else if let Ok(v) = u32::try_from(v) {
            Number::U32(v)
        } else {
            Number::U64(v)
        }
    }

    pub fn signed(v: i64) -> Number {
        if let Ok(v) = i8::try_from(v) {
            Number::I8(v)
        } else if let Ok(v) = i16::try_from(v) {
            Number::I16(v)
        } else if let Ok(v) = i32::try_from(v) {
            Number::I32(v)
        } else {
            Number::I64(v)
        }
    }

    /// A column slot value re-expressed at the column's own width.
    pub fn of_column(column_type: ColumnType, value: Scalar) -> Option<Number> {
        match (column_type, value) {
            (ColumnType::U8, Scalar::Unsigned(v)) => u8::try_from(v).ok().map(Number::U8),
            (ColumnType::U16, Scalar::Unsigned(v)) => u16::try_from(v).ok().map(Number::U16),
            (ColumnType::U32, Scalar::Unsigned(v)) => u32::try_from(v).ok().map(Number::U32),
            (ColumnType::U64, Scalar::Unsigned(v)) => Some(Number::U64(v)),
            (ColumnType::I8, Scalar::Signed(v)) => i8::try_from(v).ok().map(Number::I8),
            (ColumnType::I16, Scalar::Signed(v)) => i16::try_from(v).ok().map(Number::I16),
            (ColumnType::I32, Scalar::Signed(v)) => i32::try_from(v).ok().map(Number::I32),
            (ColumnType::I64, Scalar::Signed(v)) => Some(Number::I64(v)),
            (ColumnType::Float, Scalar::Float(v)) => Some(Number::Float(v)),
            _ => None,
        }
    }

    pub fn field_type(self) -> FieldType {
        match self {
            Number::U8(_) => FieldType::U8,
            Number::U16(_) => FieldType::U16,
            Number::U32(_) => FieldType::U32,
            Number::U64(_) => FieldType::U64,
            Number::I8(_) => FieldType::I8,
            Number::I16(_) => FieldType::I16,
            Number::I32(_) => FieldType::I32,
            Number::I64(_) => FieldType::I64,
            Number::Float(_) => FieldType::Float,
        }
    }

    pub fn to_scalar(self) -> Scalar {
        match self {
            Number::U8(v) => Scalar::Unsigned(v as u64),
            Number::U16(v) => Scalar::Unsigned(v as u64),
            Number::U32(v) => Scalar::Unsigned(v as u64),
            Number::U64(v) => Scalar::Unsigned(v),
            Number::I8(v) => Scalar::Signed(v as i64),
            Number::I16(v) => Scalar::Signed(v as i64),
            Number::I32(v) => Scalar::Signed(v as i64),
            Number::I64(v) => Scalar::Signed(v),
            Number::Float(v) => Scalar::Float(v),
        }
    }

    pub fn encode(self, buf: &mut Vec<u8>) {
        match self {
            Number::U8(v) => {
                buf.push(MARKER_U8);
                buf.push(v);
            }
            Number::U16(v) => {
                buf.push(MARKER_U16);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            Number::U32(v) => {
                buf.push(MARKER_U32);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            Number::U64(v) => {
                buf.push(MARKER_U64);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            Number::I8(v) => {
                buf.push(MARKER_I8);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            Number::I16(v) => {
                buf.push(MARKER_I16);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            Number::I32(v) => {
                buf.push(MARKER_I32);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            Number::I64(v) => {
                buf.push(MARKER_I64);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            Number::Float(v) => {
                buf.push(MARKER_FLOAT);
                buf.extend_from_slice(&v.to_le_bytes());
            }
        }
    }

    /// Decodes a numeric payload (bytes after the marker). `None` if
    /// `field_type` is not numeric or the payload is too short.
    pub fn decode(field_type: FieldType, payload: &[u8]) -> Option<Number> {
        let number = match field_type {
            FieldType::U8 => Number::U8(*payload.first()?),
            FieldType::U16 => Number::U16(u16::from_le_bytes(payload.get(..2)?.try_into().ok()?)),
            FieldType::U32 => Number::U32(u32::from_le_bytes(payload.get(..4)?.try_into().ok()?)),
            FieldType::U64 => Number::U64(u64::from_le_bytes(payload.get(..8)?.try_into().ok()?)),
            FieldType::I8 => Number::I8(i8::from_le_bytes([*payload.first()?])),
            FieldType::I16 => Number::I16(i16::from_le_bytes(payload.get(..2)?.try_into().ok()?)),
            FieldType::I32 => Number::I32(i32::from_le_bytes(payload.get(..4)?.try_into().ok()?)),
            FieldType::I64 => Number::I64(i64::from_le_bytes(payload.get(..8)?.try_into().ok()?)),
            FieldType::Float => {
                Number::Float(f32::from_le_bytes(payload.get(..4)?.try_into().ok()?))
            }
            _ => return None,
        };
        Some(number)
    }

    pub fn as_f64(self) -> f64 {
        match self.to_scalar() {
            Scalar::Unsigned(v) => v as f64,
            Scalar::Signed(v) => v as f64,
            Scalar::Float(v) => v as f64,
            Scalar::Null | Scalar::Bool(_) => 0.0,
        }
    }

    pub fn as_i64(self) -> Option<i64> {
        match self.to_scalar() {
            Scalar::Unsigned(v) => i64::try_from(v).ok(),
            Scalar::Signed(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u64(self) -> Option<u64> {
        match self.to_scalar() {
            Scalar::Unsigned(v) => Some(v),
            Scalar::Signed(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }
}
