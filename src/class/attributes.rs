use std::sync::Arc;

use crate::{
    consts::NestedClassAccessFlag,
    descriptor::{FieldDescriptor, ReturnType},
    signature::Signature,
};

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeInfo {
    Code(CodeAttribute),
    ConstantValue(Const),
    /// Checked exceptions a method declares.
    Exceptions(Vec<Arc<str>>),
    InnerClasses(Vec<InnerClass>),
    EnclosingMethod {
        class: Arc<str>,
        /// `(name, descriptor)`, absent for classes enclosed by an initializer.
        method: Option<(Arc<str>, Arc<str>)>,
    },
    /// Decoded according to what the attribute is attached to.
    Signature(Signature),
    SourceFile(Arc<str>),
    LineNumberTable(Vec<LineNumberTableItem>),
    LocalVariableTable(Vec<LocalVariable>),
    Synthetic,
    Deprecated,
    RuntimeVisibleAnnotations(Vec<Annotation>),
    RuntimeInvisibleAnnotations(Vec<Annotation>),
    RuntimeVisibleParameterAnnotations(Vec<Vec<Annotation>>),
    RuntimeInvisibleParameterAnnotations(Vec<Vec<Annotation>>),
    AnnotationDefault(ElementValue),
    /// Anything not decoded above, kept byte for byte.
    Unknown { name: Arc<str>, info: Vec<u8> },
}

impl AttributeInfo {
    pub fn name(&self) -> &str {
        match self {
            AttributeInfo::Code(_) => "Code",
            AttributeInfo::ConstantValue(_) => "ConstantValue",
            AttributeInfo::Exceptions(_) => "Exceptions",
            AttributeInfo::InnerClasses(_) => "InnerClasses",
            AttributeInfo::EnclosingMethod { .. } => "EnclosingMethod",
            AttributeInfo::Signature(_) => "Signature",
            AttributeInfo::SourceFile(_) => "SourceFile",
            AttributeInfo::LineNumberTable(_) => "LineNumberTable",
            AttributeInfo::LocalVariableTable(_) => "LocalVariableTable",
            AttributeInfo::Synthetic => "Synthetic",
            AttributeInfo::Deprecated => "Deprecated",
            AttributeInfo::RuntimeVisibleAnnotations(_) => "RuntimeVisibleAnnotations",
            AttributeInfo::RuntimeInvisibleAnnotations(_) => "RuntimeInvisibleAnnotations",
            AttributeInfo::RuntimeVisibleParameterAnnotations(_) => {
                "RuntimeVisibleParameterAnnotations"
            }
            AttributeInfo::RuntimeInvisibleParameterAnnotations(_) => {
                "RuntimeInvisibleParameterAnnotations"
            }
            AttributeInfo::AnnotationDefault(_) => "AnnotationDefault",
            AttributeInfo::Unknown { name, .. } => name,
        }
    }
}

/// A method body. The bytecode itself is not decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Arc<[u8]>,
    pub exception_table: Vec<ExceptionTableItem>,
    pub attributes: Vec<AttributeInfo>,
}

impl CodeAttribute {
    pub fn line_numbers(&self) -> &[LineNumberTableItem] {
        self.attributes
            .iter()
            .find_map(|attr| match attr {
                AttributeInfo::LineNumberTable(items) => Some(items.as_slice()),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn local_variables(&self) -> &[LocalVariable] {
        self.attributes
            .iter()
            .find_map(|attr| match attr {
                AttributeInfo::LocalVariableTable(items) => Some(items.as_slice()),
                _ => None,
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionTableItem {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// `None` catches everything (`finally`).
    pub catch_type: Option<Arc<str>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineNumberTableItem {
    pub start_pc: u16,
    pub line_number: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariable {
    pub start_pc: u16,
    pub length: u16,
    pub name: Arc<str>,
    pub descriptor: FieldDescriptor,
    pub index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClass {
    pub inner_class: Option<Arc<str>>,
    pub outer_class: Option<Arc<str>>,
    /// `None` for anonymous classes.
    pub inner_name: Option<Arc<str>>,
    pub access_flags: NestedClassAccessFlag,
}

impl InnerClass {
    pub fn is_anonymous(&self) -> bool {
        self.inner_name.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub type_descriptor: FieldDescriptor,
    pub element_value_pairs: Vec<ElementValuePair>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementValuePair {
    pub element_name: Arc<str>,
    pub value: ElementValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Const(Const),
    Enum {
        type_name: Arc<str>,
        const_name: Arc<str>,
    },
    Class(ReturnType),
    Annotation(Annotation),
    Array(Vec<ElementValue>),
}

/// A literal from the constant pool, typed by where it was used.
#[derive(Debug, Clone, PartialEq)]
pub enum Const {
    Byte(i32),
    Char(i32),
    Double(f64),
    Float(f32),
    Int(i32),
    Long(i64),
    Short(i32),
    Boolean(i32),
    String(Arc<str>),
}
