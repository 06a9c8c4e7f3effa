use crate::error::{DocError, Result};
use std::fmt;

// ─── Markers ────────────────────────────────────────────────────────────────
pub const MARKER_NULL: u8 = 0x01;
pub const MARKER_TRUE: u8 = 0x02;
pub const MARKER_FALSE: u8 = 0x03;

pub const MARKER_U8: u8 = 0x10;
pub const MARKER_U16: u8 = 0x11;
pub const MARKER_U32: u8 = 0x12;
pub const MARKER_U64: u8 = 0x13;
pub const MARKER_I8: u8 = 0x14;
pub const MARKER_I16: u8 = 0x15;
pub const MARKER_I32: u8 = 0x16;
pub const MARKER_I64: u8 = 0x17;
pub const MARKER_FLOAT: u8 = 0x18;

pub const MARKER_STRING: u8 = 0x20;
pub const MARKER_BINARY: u8 = 0x21;
pub const MARKER_BINARY_CUSTOM: u8 = 0x22;

pub const MARKER_ARRAY: u8 = 0x40; // + refinement
pub const MARKER_OBJECT: u8 = 0x44; // + refinement
pub const MARKER_COLUMN: u8 = 0x50; // + 4 * column type + refinement

const REFINEMENT_SORTED: u8 = 0b01;
const REFINEMENT_DISTINCT: u8 = 0b10;
const REFINEMENT_MASK: u8 = 0b11;
const REFINEMENT_COUNT: u8 = 4;
const COLUMN_TYPE_COUNT: u8 = 10;
const MARKER_COLUMN_END: u8 = MARKER_COLUMN + COLUMN_TYPE_COUNT * REFINEMENT_COUNT;

// ─── Binary Layout ──────────────────────────────────────────────────────────
//
//  ┌──────────────────────────────────────────────────────────┐
//  │ Record (offset 0)                                        │
//  │   marker:        u8   array marker                       │
//  │   num_elements:  varint                                  │
//  │   elements:      fields back-to-back                     │
//  ├──────────────────────────────────────────────────────────┤
//  │ Object element                                           │
//  │   key_len: varint, key: UTF-8, value: field              │
//  ├──────────────────────────────────────────────────────────┤
//  │ Column                                                   │
//  │   marker, num_elements: varint, capacity: varint         │
//  │   slots: capacity × width (LE, null sentinel if unset)   │
//  ├──────────────────────────────────────────────────────────┤
//  │ Scalars                                                  │
//  │   null/true/false: marker only                           │
//  │   numbers:  marker + LE payload                          │
//  │   string:   marker + len: varint + UTF-8                 │
//  │   binary:   marker + mime: varint + len: varint + bytes  │
//  │   custom:   marker + name_len + name + len + bytes       │
//  └──────────────────────────────────────────────────────────┘

// ─── ColumnType ─────────────────────────────────────────────────────────────

/// Element type of a column. Every slot is `width()` bytes wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    Float,
    Boolean,
}

impl ColumnType {
    pub const ALL: [ColumnType; 10] = [
        ColumnType::U8,
        ColumnType::U16,
        ColumnType::U32,
        ColumnType::U64,
        ColumnType::I8,
        ColumnType::I16,
        ColumnType::I32,
        ColumnType::I64,
        ColumnType::Float,
        ColumnType::Boolean,
    ];

    /// Unsigned integer types, narrowest first.
    pub const UNSIGNED: [ColumnType; 4] = [
        ColumnType::U8,
        ColumnType::U16,
        ColumnType::U32,
        ColumnType::U64,
    ];

    /// Signed integer types, narrowest first.
    pub const SIGNED: [ColumnType; 4] = [
        ColumnType::I8,
        ColumnType::I16,
        ColumnType::I32,
        ColumnType::I64,
    ];

    #[inline]
    fn index(self) -> u8 {
        self as u8
    }

    fn from_index(index: u8) -> Option<ColumnType> {
        Self::ALL.get(index as usize).copied()
    }

    #[inline]
    pub fn width(self) -> usize {
        match self {
            ColumnType::U8 | ColumnType::I8 | ColumnType::Boolean => 1,
            ColumnType::U16 | ColumnType::I16 => 2,
            ColumnType::U32 | ColumnType::I32 | ColumnType::Float => 4,
            ColumnType::U64 | ColumnType::I64 => 8,
        }
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            ColumnType::U8 | ColumnType::U16 | ColumnType::U32 | ColumnType::U64
        )
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            ColumnType::I8 | ColumnType::I16 | ColumnType::I32 | ColumnType::I64
        )
    }

    pub fn is_integer(self) -> bool {
        self.is_unsigned() || self.is_signed()
    }

    pub fn name(self) -> &'static str {
        match self {
            ColumnType::U8 => "u8",
            ColumnType::U16 => "u16",
            ColumnType::U32 => "u32",
            ColumnType::U64 => "u64",
            ColumnType::I8 => "i8",
            ColumnType::I16 => "i16",
            ColumnType::I32 => "i32",
            ColumnType::I64 => "i64",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── FieldType ──────────────────────────────────────────────────────────────

/// What a marker byte says about the field that starts with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Null,
    True,
    False,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    Float,
    String,
    Binary,
    BinaryCustom,
    Array,
    Object,
    Column(ColumnType),
}

impl FieldType {
    pub fn of_marker(marker: u8) -> Result<FieldType> {
        let field_type = match marker {
            MARKER_NULL => FieldType::Null,
            MARKER_TRUE => FieldType::True,
            MARKER_FALSE => FieldType::False,
            MARKER_U8 => FieldType::U8,
            MARKER_U16 => FieldType::U16,
            MARKER_U32 => FieldType::U32,
            MARKER_U64 => FieldType::U64,
            MARKER_I8 => FieldType::I8,
            MARKER_I16 => FieldType::I16,
            MARKER_I32 => FieldType::I32,
            MARKER_I64 => FieldType::I64,
            MARKER_FLOAT => FieldType::Float,
            MARKER_STRING => FieldType::String,
            MARKER_BINARY => FieldType::Binary,
            MARKER_BINARY_CUSTOM => FieldType::BinaryCustom,
            m if (MARKER_ARRAY..MARKER_ARRAY + REFINEMENT_COUNT).contains(&m) => FieldType::Array,
            m if (MARKER_OBJECT..MARKER_OBJECT + REFINEMENT_COUNT).contains(&m) => {
                FieldType::Object
            }
            m if (MARKER_COLUMN..MARKER_COLUMN_END).contains(&m) => {
                let index = (m - MARKER_COLUMN) / REFINEMENT_COUNT;
                match ColumnType::from_index(index) {
                    Some(column_type) => FieldType::Column(column_type),
                    None => return Err(unknown_marker(m)),
                }
            }
            other => return Err(unknown_marker(other)),
        };
        Ok(field_type)
    }

    /// Marker of a scalar type. Containers carry a refinement and go
    /// through [`concrete_marker`] instead.
    pub fn scalar_marker(self) -> Option<u8> {
        let marker = match self {
            FieldType::Null => MARKER_NULL,
            FieldType::True => MARKER_TRUE,
            FieldType::False => MARKER_FALSE,
            FieldType::U8 => MARKER_U8,
            FieldType::U16 => MARKER_U16,
            FieldType::U32 => MARKER_U32,
            FieldType::U64 => MARKER_U64,
            FieldType::I8 => MARKER_I8,
            FieldType::I16 => MARKER_I16,
            FieldType::I32 => MARKER_I32,
            FieldType::I64 => MARKER_I64,
            FieldType::Float => MARKER_FLOAT,
            FieldType::String => MARKER_STRING,
            FieldType::Binary => MARKER_BINARY,
            FieldType::BinaryCustom => MARKER_BINARY_CUSTOM,
            FieldType::Array | FieldType::Object | FieldType::Column(_) => return None,
        };
        Some(marker)
    }

    /// Payload width of fixed-size scalars (bytes after the marker).
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            FieldType::Null | FieldType::True | FieldType::False => Some(0),
            FieldType::U8 | FieldType::I8 => Some(1),
            FieldType::U16 | FieldType::I16 => Some(2),
            FieldType::U32 | FieldType::I32 | FieldType::Float => Some(4),
            FieldType::U64 | FieldType::I64 => Some(8),
            _ => None,
        }
    }

    /// Smallest number of bytes a well-formed field of this type occupies.
    pub fn min_extent(self) -> usize {
        match self {
            FieldType::String | FieldType::Array | FieldType::Object => 2,
            FieldType::Binary | FieldType::BinaryCustom | FieldType::Column(_) => 3,
            fixed => 1 + fixed.fixed_width().unwrap_or(0),
        }
    }

    pub fn is_null(self) -> bool {
        self == FieldType::Null
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, FieldType::True | FieldType::False)
    }

    pub fn is_number(self) -> bool {
        matches!(
            self,
            FieldType::U8
                | FieldType::U16
                | FieldType::U32
                | FieldType::U64
                | FieldType::I8
                | FieldType::I16
                | FieldType::I32
                | FieldType::I64
                | FieldType::Float
        )
    }

    pub fn is_container(self) -> bool {
        matches!(
            self,
            FieldType::Array | FieldType::Object | FieldType::Column(_)
        )
    }

    pub fn is_column(self) -> bool {
        matches!(self, FieldType::Column(_))
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldType::Null => "null",
            FieldType::True => "true",
            FieldType::False => "false",
            FieldType::U8 => "u8",
            FieldType::U16 => "u16",
            FieldType::U32 => "u32",
            FieldType::U64 => "u64",
            FieldType::I8 => "i8",
            FieldType::I16 => "i16",
            FieldType::I32 => "i32",
            FieldType::I64 => "i64",
            FieldType::Float => "float",
            FieldType::String => "string",
            FieldType::Binary => "binary",
            FieldType::BinaryCustom => "binary-custom",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Column(_) => "column",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Column(column_type) => write!(f, "column-{column_type}"),
            other => f.write_str(other.name()),
        }
    }
}

fn unknown_marker(marker: u8) -> DocError {
    DocError::InternalError(format!("unknown marker {marker:#04x}"))
}

#[inline]
pub fn type_of(marker: u8) -> Result<FieldType> {
    FieldType::of_marker(marker)
}

// ─── Abstract Classes ───────────────────────────────────────────────────────

/// Sortedness/distinctness refinement carried by every container marker.
/// Lists (arrays, columns) use the set classes, objects the map classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbstractClass {
    UnsortedMultiset,
    SortedMultiset,
    UnsortedSet,
    SortedSet,
    UnsortedMultimap,
    SortedMultimap,
    UnsortedMap,
    SortedMap,
}

impl AbstractClass {
    const LIST: [AbstractClass; 4] = [
        AbstractClass::UnsortedMultiset,
        AbstractClass::SortedMultiset,
        AbstractClass::UnsortedSet,
        AbstractClass::SortedSet,
    ];

    const MAP: [AbstractClass; 4] = [
        AbstractClass::UnsortedMultimap,
        AbstractClass::SortedMultimap,
        AbstractClass::UnsortedMap,
        AbstractClass::SortedMap,
    ];

    fn refinement(self) -> u8 {
        match self {
            AbstractClass::UnsortedMultiset | AbstractClass::UnsortedMultimap => 0,
            AbstractClass::SortedMultiset | AbstractClass::SortedMultimap => REFINEMENT_SORTED,
            AbstractClass::UnsortedSet | AbstractClass::UnsortedMap => REFINEMENT_DISTINCT,
            AbstractClass::SortedSet | AbstractClass::SortedMap => {
                REFINEMENT_SORTED | REFINEMENT_DISTINCT
            }
        }
    }

    fn list(refinement: u8) -> AbstractClass {
        Self::LIST[(refinement & REFINEMENT_MASK) as usize]
    }

    fn map(refinement: u8) -> AbstractClass {
        Self::MAP[(refinement & REFINEMENT_MASK) as usize]
    }

    pub fn is_sorted(self) -> bool {
        self.refinement() & REFINEMENT_SORTED != 0
    }

    pub fn is_distinct(self) -> bool {
        self.refinement() & REFINEMENT_DISTINCT != 0
    }

    pub fn is_list(self) -> bool {
        Self::LIST.contains(&self)
    }

    pub fn is_map(self) -> bool {
        Self::MAP.contains(&self)
    }

    pub fn is_multiset(self) -> bool {
        self.is_list() && !self.is_distinct()
    }

    pub fn is_multimap(self) -> bool {
        self.is_map() && !self.is_distinct()
    }

    /// Base classes are the unrefined containers: unsorted, duplicates allowed.
    pub fn is_base(self) -> bool {
        self.refinement() == 0
    }
}

/// Container family, independent of refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Array,
    Object,
    Column(ColumnType),
}

pub fn container_kind(marker: u8) -> Result<ContainerKind> {
    match FieldType::of_marker(marker)? {
        FieldType::Array => Ok(ContainerKind::Array),
        FieldType::Object => Ok(ContainerKind::Object),
        FieldType::Column(column_type) => Ok(ContainerKind::Column(column_type)),
        other => Err(DocError::InternalError(format!(
            "marker {marker:#04x} ({other}) has no abstract class"
        ))),
    }
}

pub fn class_of(marker: u8) -> Result<AbstractClass> {
    let class = match container_kind(marker)? {
        ContainerKind::Array => AbstractClass::list(marker - MARKER_ARRAY),
        ContainerKind::Object => AbstractClass::map(marker - MARKER_OBJECT),
        ContainerKind::Column(_) => AbstractClass::list((marker - MARKER_COLUMN) % REFINEMENT_COUNT),
    };
    Ok(class)
}

/// Marker for `kind` refined to `class`. Lists only take set classes and
/// objects only map classes.
pub fn concrete_marker(kind: ContainerKind, class: AbstractClass) -> Result<u8> {
    let refinement = class.refinement();
    match kind {
        ContainerKind::Array if class.is_list() => Ok(MARKER_ARRAY + refinement),
        ContainerKind::Object if class.is_map() => Ok(MARKER_OBJECT + refinement),
        ContainerKind::Column(column_type) if class.is_list() => {
            Ok(MARKER_COLUMN + column_type.index() * REFINEMENT_COUNT + refinement)
        }
        _ => Err(DocError::InternalError(format!(
            "no concrete marker for {kind:?} refined as {class:?}"
        ))),
    }
}

// ─── Binary MIME Types ──────────────────────────────────────────────────────

const MIME_TYPES: [&str; 12] = [
    "application/octet-stream",
    "application/json",
    "application/cbor",
    "application/pdf",
    "application/zip",
    "text/plain",
    "text/csv",
    "text/html",
    "image/png",
    "image/jpeg",
    "image/gif",
    "audio/mpeg",
];

pub const MIME_OCTET_STREAM: u64 = 0;

/// Unknown ids fall back to `application/octet-stream`.
pub fn mime_name(id: u64) -> &'static str {
    usize::try_from(id)
        .ok()
        .and_then(|i| MIME_TYPES.get(i))
        .copied()
        .unwrap_or(MIME_TYPES[MIME_OCTET_STREAM as usize])
}

pub fn mime_id(name: &str) -> Option<u64> {
    MIME_TYPES
        .iter()
        .position(|m| m.eq_ignore_ascii_case(name))
        .map(|i| i as u64)
}
