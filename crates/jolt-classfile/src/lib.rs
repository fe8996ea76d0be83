//! Minimal JVM class-file reader.
//!
//! Jolt only needs a narrow slice of the class-file format: the class header
//! (name, superclass, interfaces), the method table and runtime annotations.
//! Code attributes, fields and everything else are skipped without being
//! interpreted.
#![forbid(unsafe_code)]

mod annotation;
#[cfg(any(test, feature = "test-support"))]
mod builder;
mod classfile;
mod constant_pool;
mod error;
mod reader;

pub use crate::annotation::{Annotation, ConstValue, ElementValue};
#[cfg(any(test, feature = "test-support"))]
pub use crate::builder::{AnnotationSpec, ClassFileBuilder, ElementSpec};
pub use crate::classfile::{ClassFile, ClassMember};
pub use crate::error::{Error, Result};

/// `com.example.Foo` -> `com/example/Foo`.
pub fn to_internal_name(name: &str) -> String {
    name.replace('.', "/")
}

/// `com/example/Foo` -> `com.example.Foo`.
pub fn to_binary_name(name: &str) -> String {
    name.replace('/', ".")
}
