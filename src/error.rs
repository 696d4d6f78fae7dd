use std::fmt::{self, Display};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClassFileError>;

/// Failure to decode a single class file. There is no partial model: any of
/// these aborts the parse of that one class.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassFileError {
    #[error("unexpected end of data at offset {offset:#x}, {needed} more byte(s) needed")]
    UnexpectedEndOfData { offset: usize, needed: usize },

    #[error("not a class file: magic is {found:#010x}")]
    NotAClassFile { found: u32 },

    #[error("unsupported constant pool tag {tag} at offset {offset:#x}")]
    UnsupportedConstantKind { tag: u8, offset: usize },

    #[error("invalid constant pool index {index}")]
    InvalidConstantPoolIndex { index: u16 },

    #[error("constant pool entry {index} is {found}, expected {expected}")]
    ConstantKindMismatch {
        index: u16,
        expected: ConstantKind,
        found: ConstantKind,
    },

    #[error("malformed class file at offset {offset:#x}: {reason}")]
    MalformedClassFile { offset: usize, reason: String },
}

impl ClassFileError {
    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        Self::MalformedClassFile {
            offset,
            reason: reason.into(),
        }
    }
}

/// The kind of a constant pool entry, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantKind {
    Utf8,
    Integer,
    Float,
    Long,
    Double,
    Class,
    String,
    Fieldref,
    Methodref,
    InterfaceMethodref,
    NameAndType,
    MethodHandle,
    MethodType,
    Dynamic,
    InvokeDynamic,
    Module,
    Package,
    Unusable,
    /// Any of the loadable literal kinds.
    Loadable,
    /// Any of the member reference kinds.
    MemberRef,
}

impl Display for ConstantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstantKind::Utf8 => "CONSTANT_Utf8",
            ConstantKind::Integer => "CONSTANT_Integer",
            ConstantKind::Float => "CONSTANT_Float",
            ConstantKind::Long => "CONSTANT_Long",
            ConstantKind::Double => "CONSTANT_Double",
            ConstantKind::Class => "CONSTANT_Class",
            ConstantKind::String => "CONSTANT_String",
            ConstantKind::Fieldref => "CONSTANT_Fieldref",
            ConstantKind::Methodref => "CONSTANT_Methodref",
            ConstantKind::InterfaceMethodref => "CONSTANT_InterfaceMethodref",
            ConstantKind::NameAndType => "CONSTANT_NameAndType",
            ConstantKind::MethodHandle => "CONSTANT_MethodHandle",
            ConstantKind::MethodType => "CONSTANT_MethodType",
            ConstantKind::Dynamic => "CONSTANT_Dynamic",
            ConstantKind::InvokeDynamic => "CONSTANT_InvokeDynamic",
            ConstantKind::Module => "CONSTANT_Module",
            ConstantKind::Package => "CONSTANT_Package",
            ConstantKind::Unusable => "the slot after a long/double",
            ConstantKind::Loadable => "a constant value",
            ConstantKind::MemberRef => "a member reference",
        };
        f.write_str(name)
    }
}

/// Failure of an archive operation. A class that is simply absent is not an
/// error; lookups report it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("{label}: cannot open archive")]
    Open {
        label: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{label}: corrupt archive")]
    Corrupt {
        label: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("{label}: cannot read entry {entry}")]
    Io {
        label: String,
        entry: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{label}: invalid class file {entry}")]
    Class {
        label: String,
        entry: String,
        #[source]
        source: ClassFileError,
    },

    #[error("{label}: entry {entry} declares class {declared}")]
    NameMismatch {
        label: String,
        entry: String,
        declared: String,
    },
}
