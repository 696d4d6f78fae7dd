use std::sync::Arc;

use crate::{
    class::{AttributeInfo, CodeAttribute, Const, ConstantPool, InnerClass, parser},
    consts::{ClassAccessFlag, FieldAccessFlag, MethodAccessFlag, NestedClassAccessFlag},
    descriptor::{FieldType, MethodDescriptor},
    error::Result,
    signature::{ClassSignature, MethodSignature, Signature, TypeSignature},
};

/// One parsed class. Every symbolic reference is resolved to an owned string,
/// so nothing here borrows from the buffer it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    pub(crate) minor_version: u16,
    pub(crate) major_version: u16,
    pub(crate) constant_pool: ConstantPool,
    pub(crate) access_flags: ClassAccessFlag,
    pub(crate) this_class: Arc<str>,
    pub(crate) super_class: Option<Arc<str>>,
    pub(crate) interfaces: Vec<Arc<str>>,
    pub(crate) fields: Vec<FieldInfo>,
    pub(crate) methods: Vec<MethodInfo>,
    pub(crate) attributes: Vec<AttributeInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub(crate) access_flags: FieldAccessFlag,
    pub(crate) name: Arc<str>,
    pub(crate) descriptor: Arc<str>,
    pub(crate) field_type: FieldType,
    pub(crate) attributes: Vec<AttributeInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub(crate) access_flags: MethodAccessFlag,
    pub(crate) name: Arc<str>,
    pub(crate) descriptor: Arc<str>,
    pub(crate) method_descriptor: MethodDescriptor,
    pub(crate) attributes: Vec<AttributeInfo>,
}

pub const OBJECT_CLASS_NAME: &str = "java/lang/Object";

impl ClassFile {
    pub fn parse(input: &[u8]) -> Result<Self> {
        parser::class_file(input)
    }

    pub fn major_version(&self) -> u16 {
        self.major_version
    }

    pub fn minor_version(&self) -> u16 {
        self.minor_version
    }

    pub fn constant_pool(&self) -> &ConstantPool {
        &self.constant_pool
    }

    pub fn access_flags(&self) -> ClassAccessFlag {
        self.access_flags
    }

    /// Internal name, e.g. `java/util/Map$Entry`.
    pub fn name(&self) -> &str {
        &self.this_class
    }

    /// `None` only for the root of the hierarchy.
    pub fn super_class(&self) -> Option<&str> {
        self.super_class.as_deref()
    }

    pub fn interfaces(&self) -> &[Arc<str>] {
        &self.interfaces
    }

    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    pub fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    pub fn attributes(&self) -> &[AttributeInfo] {
        &self.attributes
    }

    /// First attribute with the given name, typed or not.
    pub fn attribute(&self, name: &str) -> Option<&AttributeInfo> {
        self.attributes.iter().find(|attr| attr.name() == name)
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlag::INTERFACE)
    }

    pub fn is_abstract(&self) -> bool {
        self.access_flags.contains(ClassAccessFlag::ABSTRACT)
    }

    pub fn is_enum(&self) -> bool {
        self.access_flags.contains(ClassAccessFlag::ENUM)
    }

    pub fn is_annotation(&self) -> bool {
        self.access_flags.contains(ClassAccessFlag::ANNOTATION)
    }

    pub fn is_object(&self) -> bool {
        self.name() == OBJECT_CLASS_NAME
    }

    pub fn source_file(&self) -> Option<&str> {
        self.attributes.iter().find_map(|attr| match attr {
            AttributeInfo::SourceFile(source_file) => Some(&**source_file),
            _ => None,
        })
    }

    /// Generic signature, if the class has one.
    pub fn signature(&self) -> Option<&ClassSignature> {
        self.attributes.iter().find_map(|attr| match attr {
            AttributeInfo::Signature(Signature::Class(signature)) => Some(signature),
            _ => None,
        })
    }

    /// All entries of the `InnerClasses` attribute.
    pub fn inner_classes(&self) -> &[InnerClass] {
        self.attributes
            .iter()
            .find_map(|attr| match attr {
                AttributeInfo::InnerClasses(classes) => Some(classes.as_slice()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// The `InnerClasses` entry describing this class itself.
    fn own_inner_class_entry(&self) -> Option<&InnerClass> {
        self.inner_classes().iter().find(|inner| {
            !inner.is_anonymous() && inner.inner_class.as_deref() == Some(self.name())
        })
    }

    /// Classes declared directly inside this one, plus anonymous classes.
    pub fn nested_classes(&self) -> impl Iterator<Item = &InnerClass> {
        self.inner_classes().iter().filter(|inner| {
            inner.is_anonymous() || inner.outer_class.as_deref() == Some(self.name())
        })
    }

    pub fn is_nested(&self) -> bool {
        self.own_inner_class_entry().is_some()
    }

    /// Name of the enclosing class for a nested class.
    pub fn declaring_class(&self) -> Option<&str> {
        self.own_inner_class_entry()
            .and_then(|inner| inner.outer_class.as_deref())
    }

    /// Source-level flags of a nested class; these include `private`,
    /// `protected` and `static`, which the class file flags cannot express.
    pub fn nested_access_flags(&self) -> Option<NestedClassAccessFlag> {
        self.own_inner_class_entry().map(|inner| inner.access_flags)
    }

    /// Package part of the name, `""` for the default package.
    pub fn package(&self) -> &str {
        self.name()
            .rsplit_once('/')
            .map(|(package, _)| package)
            .unwrap_or("")
    }

    /// Name without the package, using the declared name for nested classes.
    pub fn simple_name(&self) -> &str {
        if let Some(inner_name) = self
            .own_inner_class_entry()
            .and_then(|inner| inner.inner_name.as_deref())
        {
            return inner_name;
        }
        self.name()
            .rsplit_once('/')
            .map(|(_, name)| name)
            .unwrap_or(self.name())
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|field| field.name() == name)
    }

    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|method| method.name() == name && method.descriptor() == descriptor)
    }

    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodInfo> {
        self.methods.iter().filter(move |method| method.name() == name)
    }
}

impl FieldInfo {
    pub fn access_flags(&self) -> FieldAccessFlag {
        self.access_flags
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn attributes(&self) -> &[AttributeInfo] {
        &self.attributes
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.contains(FieldAccessFlag::STATIC)
    }

    pub fn constant_value(&self) -> Option<&Const> {
        self.attributes.iter().find_map(|attr| match attr {
            AttributeInfo::ConstantValue(value) => Some(value),
            _ => None,
        })
    }

    pub fn signature(&self) -> Option<&TypeSignature> {
        self.attributes.iter().find_map(|attr| match attr {
            AttributeInfo::Signature(Signature::Field(signature)) => Some(signature),
            _ => None,
        })
    }
}

impl MethodInfo {
    pub fn access_flags(&self) -> MethodAccessFlag {
        self.access_flags
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn method_descriptor(&self) -> &MethodDescriptor {
        &self.method_descriptor
    }

    pub fn attributes(&self) -> &[AttributeInfo] {
        &self.attributes
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlag::STATIC)
    }

    pub fn is_abstract(&self) -> bool {
        self.access_flags.contains(MethodAccessFlag::ABSTRACT)
    }

    pub fn is_native(&self) -> bool {
        self.access_flags.contains(MethodAccessFlag::NATIVE)
    }

    pub fn is_constructor(&self) -> bool {
        self.name() == "<init>"
    }

    pub fn is_class_initializer(&self) -> bool {
        self.name() == "<clinit>"
    }

    /// The method body; `None` for abstract and native methods.
    pub fn code(&self) -> Option<&CodeAttribute> {
        self.attributes.iter().find_map(|attr| match attr {
            AttributeInfo::Code(code) => Some(code),
            _ => None,
        })
    }

    /// Declared checked exceptions.
    pub fn exceptions(&self) -> &[Arc<str>] {
        self.attributes
            .iter()
            .find_map(|attr| match attr {
                AttributeInfo::Exceptions(exceptions) => Some(exceptions.as_slice()),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn signature(&self) -> Option<&MethodSignature> {
        self.attributes.iter().find_map(|attr| match attr {
            AttributeInfo::Signature(Signature::Method(signature)) => Some(signature),
            _ => None,
        })
    }
}
