//! Class-file reading for the IL-to-JVM compiler backend: a defensive parser
//! for the class-file format, lazily cached jar/zip archives, and the name
//! allocator used when synthesizing identifiers.

pub mod archive;
pub mod class;
pub mod consts;
pub mod descriptor;
pub mod error;
pub mod naming;
pub mod reader;
pub mod signature;

pub use archive::{Archive, ClassPath};
pub use class::ClassFile;
pub use error::{ArchiveError, ClassFileError};
pub use naming::NameSet;
