use crate::deserialization::{FieldRef, read_field};
use crate::document::{ArrayIter, ColumnIter, ObjectIter};
use crate::error::Result;
use crate::memfile::{MemFile, Offset};
use crate::scalar::{Number, Scalar};
use crate::types::mime_name;
use base64::{Engine as _, engine::general_purpose::STANDARD};

/// Renders the document at offset 0 as JSON text. A unit record prints as
/// its only element.
pub fn print_document(file: &MemFile) -> Result<String> {
    let mut record = ArrayIter::open(file, Offset::ZERO)?;
    let mut printer = JsonPrinter::new(file);
    if record.is_unit() && record.next()? {
        printer.field(record.value_offset()?)?;
    } else {
        printer.field(Offset::ZERO)?;
    }
    Ok(printer.out)
}

/// Renders the field at `at` and everything nested in it.
pub fn print_field(file: &MemFile, at: Offset) -> Result<String> {
    let mut printer = JsonPrinter::new(file);
    printer.field(at)?;
    Ok(printer.out)
}

/// Walks fields with the document iterators and appends JSON text.
/// Sequences print as `[a, b]`, objects as `{"k": v}`.
struct JsonPrinter<'f> {
    file: &'f MemFile,
    out: String,
}

impl<'f> JsonPrinter<'f> {
    fn new(file: &'f MemFile) -> Self {
        JsonPrinter {
            file,
            out: String::new(),
        }
    }

    fn field(&mut self, at: Offset) -> Result<()> {
        match read_field(self.file, at)? {
            FieldRef::Null => self.out.push_str("null"),
            FieldRef::Bool(b) => self.out.push_str(if b { "true" } else { "false" }),
            FieldRef::Number(n) => self.number(n),
            FieldRef::Str(s) => self.string(s)?,
            FieldRef::Binary { mime_id, data } => self.binary(mime_name(mime_id), data)?,
            FieldRef::CustomBinary { type_name, data } => self.binary(type_name, data)?,
            FieldRef::Array(at) => {
                let mut it = ArrayIter::open(self.file, at)?;
                self.out.push('[');
                while it.next()? {
                    if it.index() > 0 {
                        self.out.push_str(", ");
                    }
                    self.field(it.value_offset()?)?;
                }
                self.out.push(']');
            }
            FieldRef::Object(at) => {
                let mut it = ObjectIter::open(self.file, at)?;
                self.out.push('{');
                while it.next()? {
                    if it.index() > 0 {
                        self.out.push_str(", ");
                    }
                    self.string(it.key()?)?;
                    self.out.push_str(": ");
                    self.field(it.value_offset()?)?;
                }
                self.out.push('}');
            }
            FieldRef::Column(at, _) => {
                let column = ColumnIter::open(self.file, at)?;
                self.out.push('[');
                for pos in 0..column.len() {
                    if pos > 0 {
                        self.out.push_str(", ");
                    }
                    self.scalar(column.get(pos)?);
                }
                self.out.push(']');
            }
        }
        Ok(())
    }

    fn scalar(&mut self, value: Scalar) {
        match value {
            Scalar::Null => self.out.push_str("null"),
            Scalar::Bool(b) => self.out.push_str(if b { "true" } else { "false" }),
            Scalar::Unsigned(v) => self.out.push_str(&v.to_string()),
            Scalar::Signed(v) => self.out.push_str(&v.to_string()),
            Scalar::Float(v) => self.float(v),
        }
    }

    fn number(&mut self, n: Number) {
        self.scalar(n.to_scalar());
    }

    // integral floats keep a fractional digit so they read back as floats
    fn float(&mut self, v: f32) {
        if !v.is_finite() {
            self.out.push_str("null");
        } else if v.fract() == 0.0 && v.abs() < 1e16 {
            self.out.push_str(&format!("{v:.1}"));
        } else {
            self.out.push_str(&v.to_string());
        }
    }

    fn string(&mut self, s: &str) -> Result<()> {
        self.out.push_str(&serde_json::to_string(s)?);
        Ok(())
    }

    fn binary(&mut self, type_name: &str, data: &[u8]) -> Result<()> {
        self.out.push_str("{\"type\": ");
        self.string(type_name)?;
        self.out.push_str(", \"encoding\": \"base64\", \"binary-string\": ");
        self.string(&STANDARD.encode(data))?;
        self.out.push('}');
        Ok(())
    }
}
