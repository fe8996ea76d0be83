use crate::constant_pool::{ConstantPool, CpInfo};
use crate::error::{Error, Result};
use crate::reader::Reader;

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Field descriptor of the annotation type, e.g. `Ljolt/annotations/OnMethod;`.
    pub type_descriptor: String,
    pub elements: Vec<(String, ElementValue)>,
}

impl Annotation {
    pub(crate) fn parse(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<Self> {
        let type_descriptor = cp.get_utf8(reader.read_u2()?)?.to_string();

        let count = reader.read_u2()? as usize;
        let mut elements = Vec::with_capacity(count);
        for _ in 0..count {
            let name = cp.get_utf8(reader.read_u2()?)?.to_string();
            let value = ElementValue::parse(reader, cp)?;
            elements.push((name, value));
        }

        Ok(Self {
            type_descriptor,
            elements,
        })
    }

    /// Internal name of the annotation type (`jolt/annotations/OnMethod`).
    pub fn type_internal_name(&self) -> Option<&str> {
        self.type_descriptor
            .strip_prefix('L')
            .and_then(|rest| rest.strip_suffix(';'))
    }

    pub fn element(&self, name: &str) -> Option<&ElementValue> {
        self.elements
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// String-valued element; enum constants yield their constant name.
    pub fn string_element(&self, name: &str) -> Option<&str> {
        match self.element(name)? {
            ElementValue::Const(ConstValue::String(value)) => Some(value),
            ElementValue::Enum { const_name, .. } => Some(const_name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Const(ConstValue),
    Enum {
        type_descriptor: String,
        const_name: String,
    },
    Class(String),
    Annotation(Box<Annotation>),
    Array(Vec<ElementValue>),
}

impl ElementValue {
    fn parse(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<Self> {
        let tag = reader.read_u1()?;
        let value = match tag {
            b'B' | b'C' | b'I' | b'S' | b'Z' => {
                let index = reader.read_u2()?;
                let CpInfo::Integer(raw) = *cp.get(index)? else {
                    return Err(mismatch(cp, index, "Integer"));
                };
                let value = match tag {
                    b'B' => ConstValue::Byte(raw as i8),
                    b'C' => ConstValue::Char(
                        char::from_u32(raw as u32)
                            .ok_or(Error::MalformedAttribute("RuntimeVisibleAnnotations"))?,
                    ),
                    b'S' => ConstValue::Short(raw as i16),
                    b'Z' => ConstValue::Boolean(raw != 0),
                    _ => ConstValue::Int(raw),
                };
                ElementValue::Const(value)
            }
            b'J' => {
                let index = reader.read_u2()?;
                let CpInfo::Long(raw) = *cp.get(index)? else {
                    return Err(mismatch(cp, index, "Long"));
                };
                ElementValue::Const(ConstValue::Long(raw))
            }
            b'F' => {
                let index = reader.read_u2()?;
                let CpInfo::Float(raw) = *cp.get(index)? else {
                    return Err(mismatch(cp, index, "Float"));
                };
                ElementValue::Const(ConstValue::Float(raw))
            }
            b'D' => {
                let index = reader.read_u2()?;
                let CpInfo::Double(raw) = *cp.get(index)? else {
                    return Err(mismatch(cp, index, "Double"));
                };
                ElementValue::Const(ConstValue::Double(raw))
            }
            b's' => {
                let value = cp.get_utf8(reader.read_u2()?)?.to_string();
                ElementValue::Const(ConstValue::String(value))
            }
            b'e' => {
                let type_descriptor = cp.get_utf8(reader.read_u2()?)?.to_string();
                let const_name = cp.get_utf8(reader.read_u2()?)?.to_string();
                ElementValue::Enum {
                    type_descriptor,
                    const_name,
                }
            }
            b'c' => ElementValue::Class(cp.get_utf8(reader.read_u2()?)?.to_string()),
            b'@' => ElementValue::Annotation(Box::new(Annotation::parse(reader, cp)?)),
            b'[' => {
                let count = reader.read_u2()? as usize;
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(ElementValue::parse(reader, cp)?);
                }
                ElementValue::Array(values)
            }
            _ => return Err(Error::MalformedAttribute("RuntimeVisibleAnnotations")),
        };
        Ok(value)
    }
}

fn mismatch(cp: &ConstantPool, index: u16, expected: &'static str) -> Error {
    match cp.get(index) {
        Ok(found) => Error::ConstantPoolTypeMismatch {
            index,
            expected,
            found: found.kind(),
        },
        Err(err) => err,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(String),
}
