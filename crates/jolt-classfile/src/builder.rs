//! Assembles small, valid class files for tests.
//!
//! Only the structures the reader understands are emitted: header, methods
//! without code and runtime-visible annotations.

use std::collections::HashMap;

const ACC_PUBLIC: u16 = 0x0001;
const ACC_STATIC: u16 = 0x0008;
const ACC_SUPER: u16 = 0x0020;
const JAVA_8_MAJOR: u16 = 52;

#[derive(Debug, Clone)]
pub enum ElementSpec {
    String(String),
    Int(i32),
    Bool(bool),
    Enum { type_descriptor: String, const_name: String },
    Array(Vec<ElementSpec>),
}

impl ElementSpec {
    pub fn string(value: impl Into<String>) -> Self {
        ElementSpec::String(value.into())
    }

    pub fn enum_const(type_descriptor: impl Into<String>, const_name: impl Into<String>) -> Self {
        ElementSpec::Enum {
            type_descriptor: type_descriptor.into(),
            const_name: const_name.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnnotationSpec {
    internal_name: String,
    elements: Vec<(String, ElementSpec)>,
}

impl AnnotationSpec {
    pub fn new(internal_name: impl Into<String>) -> Self {
        Self {
            internal_name: internal_name.into(),
            elements: Vec::new(),
        }
    }

    pub fn element(mut self, name: impl Into<String>, value: ElementSpec) -> Self {
        self.elements.push((name.into(), value));
        self
    }
}

struct MethodSpec {
    name: String,
    descriptor: String,
    annotations: Vec<AnnotationSpec>,
}

pub struct ClassFileBuilder {
    this_class: String,
    super_class: Option<String>,
    interfaces: Vec<String>,
    methods: Vec<MethodSpec>,
    annotations: Vec<AnnotationSpec>,
}

impl ClassFileBuilder {
    pub fn new(this_class: impl Into<String>) -> Self {
        Self {
            this_class: this_class.into(),
            super_class: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            annotations: Vec::new(),
        }
    }

    pub fn super_class(mut self, name: impl Into<String>) -> Self {
        self.super_class = Some(name.into());
        self
    }

    pub fn interface(mut self, name: impl Into<String>) -> Self {
        self.interfaces.push(name.into());
        self
    }

    pub fn class_annotation(mut self, annotation: AnnotationSpec) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn method(
        mut self,
        name: impl Into<String>,
        descriptor: impl Into<String>,
        annotations: Vec<AnnotationSpec>,
    ) -> Self {
        self.methods.push(MethodSpec {
            name: name.into(),
            descriptor: descriptor.into(),
            annotations,
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut pool = PoolBuilder::default();
        let mut body = Vec::new();

        put_u2(&mut body, ACC_PUBLIC | ACC_SUPER);
        put_u2(&mut body, pool.class(&self.this_class));
        let super_index = self.super_class.as_deref().map_or(0, |name| pool.class(name));
        put_u2(&mut body, super_index);

        put_u2(&mut body, self.interfaces.len() as u16);
        for interface in &self.interfaces {
            put_u2(&mut body, pool.class(interface));
        }

        // fields
        put_u2(&mut body, 0);

        put_u2(&mut body, self.methods.len() as u16);
        for method in &self.methods {
            put_u2(&mut body, ACC_PUBLIC | ACC_STATIC);
            put_u2(&mut body, pool.utf8(&method.name));
            put_u2(&mut body, pool.utf8(&method.descriptor));
            write_annotation_attributes(&mut body, &mut pool, &method.annotations);
        }

        write_annotation_attributes(&mut body, &mut pool, &self.annotations);

        let mut out = Vec::with_capacity(body.len() + pool.bytes.len() + 10);
        out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
        put_u2(&mut out, 0);
        put_u2(&mut out, JAVA_8_MAJOR);
        put_u2(&mut out, pool.next_index);
        out.extend_from_slice(&pool.bytes);
        out.extend_from_slice(&body);
        out
    }
}

fn write_annotation_attributes(
    out: &mut Vec<u8>,
    pool: &mut PoolBuilder,
    annotations: &[AnnotationSpec],
) {
    if annotations.is_empty() {
        put_u2(out, 0);
        return;
    }

    let mut info = Vec::new();
    put_u2(&mut info, annotations.len() as u16);
    for annotation in annotations {
        write_annotation(&mut info, pool, annotation);
    }

    put_u2(out, 1);
    put_u2(out, pool.utf8("RuntimeVisibleAnnotations"));
    out.extend_from_slice(&(info.len() as u32).to_be_bytes());
    out.extend_from_slice(&info);
}

fn write_annotation(out: &mut Vec<u8>, pool: &mut PoolBuilder, annotation: &AnnotationSpec) {
    put_u2(out, pool.utf8(&format!("L{};", annotation.internal_name)));
    put_u2(out, annotation.elements.len() as u16);
    for (name, value) in &annotation.elements {
        put_u2(out, pool.utf8(name));
        write_element(out, pool, value);
    }
}

fn write_element(out: &mut Vec<u8>, pool: &mut PoolBuilder, value: &ElementSpec) {
    match value {
        ElementSpec::String(s) => {
            out.push(b's');
            put_u2(out, pool.utf8(s));
        }
        ElementSpec::Int(v) => {
            out.push(b'I');
            put_u2(out, pool.integer(*v));
        }
        ElementSpec::Bool(v) => {
            out.push(b'Z');
            put_u2(out, pool.integer(i32::from(*v)));
        }
        ElementSpec::Enum {
            type_descriptor,
            const_name,
        } => {
            out.push(b'e');
            put_u2(out, pool.utf8(type_descriptor));
            put_u2(out, pool.utf8(const_name));
        }
        ElementSpec::Array(values) => {
            out.push(b'[');
            put_u2(out, values.len() as u16);
            for value in values {
                write_element(out, pool, value);
            }
        }
    }
}

struct PoolBuilder {
    bytes: Vec<u8>,
    next_index: u16,
    utf8: HashMap<String, u16>,
    classes: HashMap<String, u16>,
    integers: HashMap<i32, u16>,
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self {
            bytes: Vec::new(),
            next_index: 1,
            utf8: HashMap::new(),
            classes: HashMap::new(),
            integers: HashMap::new(),
        }
    }
}

impl PoolBuilder {
    fn push(&mut self, entry: &[u8]) -> u16 {
        let index = self.next_index;
        self.bytes.extend_from_slice(entry);
        self.next_index += 1;
        index
    }

    fn utf8(&mut self, value: &str) -> u16 {
        if let Some(index) = self.utf8.get(value) {
            return *index;
        }
        let mut entry = vec![1u8];
        put_u2(&mut entry, value.len() as u16);
        entry.extend_from_slice(value.as_bytes());
        let index = self.push(&entry);
        self.utf8.insert(value.to_string(), index);
        index
    }

    fn class(&mut self, name: &str) -> u16 {
        if let Some(index) = self.classes.get(name) {
            return *index;
        }
        let name_index = self.utf8(name);
        let mut entry = vec![7u8];
        put_u2(&mut entry, name_index);
        let index = self.push(&entry);
        self.classes.insert(name.to_string(), index);
        index
    }

    fn integer(&mut self, value: i32) -> u16 {
        if let Some(index) = self.integers.get(&value) {
            return *index;
        }
        let mut entry = vec![3u8];
        entry.extend_from_slice(&value.to_be_bytes());
        let index = self.push(&entry);
        self.integers.insert(value, index);
        index
    }
}

fn put_u2(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}
