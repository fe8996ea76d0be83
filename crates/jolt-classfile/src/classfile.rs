use crate::annotation::Annotation;
use crate::constant_pool::ConstantPool;
use crate::error::{Error, Result};
use crate::reader::Reader;

const MAGIC: u32 = 0xCAFE_BABE;

#[derive(Debug, Clone)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub access_flags: u16,
    /// Internal form, e.g. `com/example/Foo`.
    pub this_class: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub methods: Vec<ClassMember>,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone)]
pub struct ClassMember {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    /// Visible and invisible runtime annotations, in attribute order.
    pub annotations: Vec<Annotation>,
}

impl ClassMember {
    pub fn annotation(&self, internal_name: &str) -> Option<&Annotation> {
        find_annotation(&self.annotations, internal_name)
    }
}

impl ClassFile {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let magic = reader.read_u4()?;
        if magic != MAGIC {
            return Err(Error::InvalidMagic(magic));
        }

        let minor_version = reader.read_u2()?;
        let major_version = reader.read_u2()?;
        let cp = ConstantPool::parse(&mut reader)?;

        let access_flags = reader.read_u2()?;
        let this_class = cp.get_class_name(reader.read_u2()?)?;
        let super_index = reader.read_u2()?;
        let super_class = if super_index == 0 {
            None
        } else {
            Some(cp.get_class_name(super_index)?)
        };

        let interfaces_count = reader.read_u2()? as usize;
        let mut interfaces = Vec::with_capacity(interfaces_count);
        for _ in 0..interfaces_count {
            interfaces.push(cp.get_class_name(reader.read_u2()?)?);
        }

        // Fields are skipped; their attributes still have to be walked.
        let fields_count = reader.read_u2()?;
        for _ in 0..fields_count {
            reader.skip(6)?;
            parse_annotations(&mut reader, &cp)?;
        }

        let methods_count = reader.read_u2()? as usize;
        let mut methods = Vec::with_capacity(methods_count);
        for _ in 0..methods_count {
            let access_flags = reader.read_u2()?;
            let name = cp.get_utf8(reader.read_u2()?)?.to_string();
            let descriptor = cp.get_utf8(reader.read_u2()?)?.to_string();
            let annotations = parse_annotations(&mut reader, &cp)?;
            methods.push(ClassMember {
                access_flags,
                name,
                descriptor,
                annotations,
            });
        }

        let annotations = parse_annotations(&mut reader, &cp)?;
        reader.ensure_empty()?;

        Ok(Self {
            minor_version,
            major_version,
            access_flags,
            this_class,
            super_class,
            interfaces,
            methods,
            annotations,
        })
    }

    pub fn annotation(&self, internal_name: &str) -> Option<&Annotation> {
        find_annotation(&self.annotations, internal_name)
    }

    /// Direct supertypes: the superclass (if any) followed by interfaces.
    pub fn supertypes(&self) -> impl Iterator<Item = &str> {
        self.super_class
            .as_deref()
            .into_iter()
            .chain(self.interfaces.iter().map(String::as_str))
    }
}

fn find_annotation<'a>(annotations: &'a [Annotation], internal_name: &str) -> Option<&'a Annotation> {
    annotations
        .iter()
        .find(|ann| ann.type_internal_name() == Some(internal_name))
}

/// Walks an attribute table, returning the runtime annotations and skipping
/// every other attribute.
fn parse_annotations(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<Vec<Annotation>> {
    let count = reader.read_u2()? as usize;
    let mut annotations = Vec::new();
    for _ in 0..count {
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let info = reader.read_bytes(length)?;
        let name = cp.get_utf8(name_index)?;

        if name == "RuntimeVisibleAnnotations" || name == "RuntimeInvisibleAnnotations" {
            let mut sub = Reader::new(info);
            let num = sub.read_u2()? as usize;
            for _ in 0..num {
                annotations.push(Annotation::parse(&mut sub, cp)?);
            }
            sub.ensure_empty()
                .map_err(|_| Error::MalformedAttribute("RuntimeVisibleAnnotations"))?;
        }
    }
    Ok(annotations)
}
