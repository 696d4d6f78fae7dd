use std::sync::Arc;

use crate::{
    class::Const,
    error::{ClassFileError, ConstantKind, Result},
    reader::Reader,
};

#[derive(Debug, Clone, PartialEq)]
pub enum ConstantPoolInfo {
    Utf8(Arc<str>),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class {
        name_index: u16,
    },
    String {
        string_index: u16,
    },
    Fieldref {
        class_index: u16,
        name_and_type_index: u16,
    },
    Methodref {
        class_index: u16,
        name_and_type_index: u16,
    },
    InterfaceMethodref {
        class_index: u16,
        name_and_type_index: u16,
    },
    NameAndType {
        name_index: u16,
        descriptor_index: u16,
    },
    MethodHandle {
        reference_kind: u8,
        reference_index: u16,
    },
    MethodType {
        descriptor_index: u16,
    },
    Dynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    InvokeDynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    Module {
        name_index: u16,
    },
    Package {
        name_index: u16,
    },
    /// The slot following a `Long` or `Double`.
    Unusable,
}

impl ConstantPoolInfo {
    pub fn kind(&self) -> ConstantKind {
        match self {
            ConstantPoolInfo::Utf8(_) => ConstantKind::Utf8,
            ConstantPoolInfo::Integer(_) => ConstantKind::Integer,
            ConstantPoolInfo::Float(_) => ConstantKind::Float,
            ConstantPoolInfo::Long(_) => ConstantKind::Long,
            ConstantPoolInfo::Double(_) => ConstantKind::Double,
            ConstantPoolInfo::Class { .. } => ConstantKind::Class,
            ConstantPoolInfo::String { .. } => ConstantKind::String,
            ConstantPoolInfo::Fieldref { .. } => ConstantKind::Fieldref,
            ConstantPoolInfo::Methodref { .. } => ConstantKind::Methodref,
            ConstantPoolInfo::InterfaceMethodref { .. } => ConstantKind::InterfaceMethodref,
            ConstantPoolInfo::NameAndType { .. } => ConstantKind::NameAndType,
            ConstantPoolInfo::MethodHandle { .. } => ConstantKind::MethodHandle,
            ConstantPoolInfo::MethodType { .. } => ConstantKind::MethodType,
            ConstantPoolInfo::Dynamic { .. } => ConstantKind::Dynamic,
            ConstantPoolInfo::InvokeDynamic { .. } => ConstantKind::InvokeDynamic,
            ConstantPoolInfo::Module { .. } => ConstantKind::Module,
            ConstantPoolInfo::Package { .. } => ConstantKind::Package,
            ConstantPoolInfo::Unusable => ConstantKind::Unusable,
        }
    }
}

/// A field, method or interface method reference with every index resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub kind: ConstantKind,
    pub class: Arc<str>,
    pub name: Arc<str>,
    pub descriptor: Arc<str>,
}

/// The constant table of one class file. Indices are 1-based, as in the
/// class file itself.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstantPool {
    entries: Vec<ConstantPoolInfo>,
}

impl ConstantPool {
    /// Parses `constant_pool_count` followed by the entries.
    pub fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        let count_offset = reader.offset();
        let constant_pool_count = reader.u16()? as usize;
        if constant_pool_count == 0 {
            return Err(ClassFileError::malformed(
                count_offset,
                "constant_pool_count must be at least 1",
            ));
        }
        let slots = constant_pool_count - 1;

        let mut entries = Vec::with_capacity(slots);
        while entries.len() < slots {
            let offset = reader.offset();
            let constant = parse_constant(reader)?;
            let need_empty = matches!(
                constant,
                ConstantPoolInfo::Long(_) | ConstantPoolInfo::Double(_)
            );
            entries.push(constant);
            if need_empty {
                if entries.len() == slots {
                    return Err(ClassFileError::malformed(
                        offset,
                        "long or double constant occupies the last pool slot",
                    ));
                }
                entries.push(ConstantPoolInfo::Unusable);
            }
        }

        Ok(ConstantPool { entries })
    }

    /// Number of slots, including unusable ones. Valid indices are `1..=len()`.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(index, entry)`, skipping unusable slots.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &ConstantPoolInfo)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| !matches!(entry, ConstantPoolInfo::Unusable))
            .map(|(i, entry)| ((i + 1) as u16, entry))
    }

    pub fn get(&self, index: u16) -> Result<&ConstantPoolInfo> {
        match (index as usize)
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
        {
            None | Some(ConstantPoolInfo::Unusable) => {
                Err(ClassFileError::InvalidConstantPoolIndex { index })
            }
            Some(entry) => Ok(entry),
        }
    }

    pub fn utf8(&self, index: u16) -> Result<Arc<str>> {
        match self.get(index)? {
            ConstantPoolInfo::Utf8(string) => Ok(Arc::clone(string)),
            other => Err(mismatch(index, ConstantKind::Utf8, other)),
        }
    }

    /// Like [`ConstantPool::utf8`], but index 0 means "absent".
    pub fn optional_utf8(&self, index: u16) -> Result<Option<Arc<str>>> {
        if index == 0 {
            return Ok(None);
        }
        self.utf8(index).map(Some)
    }

    /// Resolves a `Class` entry to its name.
    pub fn class_name(&self, index: u16) -> Result<Arc<str>> {
        match self.get(index)? {
            ConstantPoolInfo::Class { name_index } => self.utf8(*name_index),
            other => Err(mismatch(index, ConstantKind::Class, other)),
        }
    }

    /// Like [`ConstantPool::class_name`], but index 0 means "absent".
    pub fn optional_class_name(&self, index: u16) -> Result<Option<Arc<str>>> {
        if index == 0 {
            return Ok(None);
        }
        self.class_name(index).map(Some)
    }

    /// Resolves a `String` entry to its text.
    pub fn string(&self, index: u16) -> Result<Arc<str>> {
        match self.get(index)? {
            ConstantPoolInfo::String { string_index } => self.utf8(*string_index),
            other => Err(mismatch(index, ConstantKind::String, other)),
        }
    }

    pub fn integer(&self, index: u16) -> Result<i32> {
        match self.get(index)? {
            ConstantPoolInfo::Integer(value) => Ok(*value),
            other => Err(mismatch(index, ConstantKind::Integer, other)),
        }
    }

    pub fn float(&self, index: u16) -> Result<f32> {
        match self.get(index)? {
            ConstantPoolInfo::Float(value) => Ok(*value),
            other => Err(mismatch(index, ConstantKind::Float, other)),
        }
    }

    pub fn long(&self, index: u16) -> Result<i64> {
        match self.get(index)? {
            ConstantPoolInfo::Long(value) => Ok(*value),
            other => Err(mismatch(index, ConstantKind::Long, other)),
        }
    }

    pub fn double(&self, index: u16) -> Result<f64> {
        match self.get(index)? {
            ConstantPoolInfo::Double(value) => Ok(*value),
            other => Err(mismatch(index, ConstantKind::Double, other)),
        }
    }

    /// Resolves a `NameAndType` entry to `(name, descriptor)`.
    pub fn name_and_type(&self, index: u16) -> Result<(Arc<str>, Arc<str>)> {
        match self.get(index)? {
            ConstantPoolInfo::NameAndType {
                name_index,
                descriptor_index,
            } => Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?)),
            other => Err(mismatch(index, ConstantKind::NameAndType, other)),
        }
    }

    /// Resolves a `Fieldref`, `Methodref` or `InterfaceMethodref` entry.
    pub fn member_ref(&self, index: u16) -> Result<MemberRef> {
        let entry = self.get(index)?;
        let (class_index, name_and_type_index) = match entry {
            ConstantPoolInfo::Fieldref {
                class_index,
                name_and_type_index,
            }
            | ConstantPoolInfo::Methodref {
                class_index,
                name_and_type_index,
            }
            | ConstantPoolInfo::InterfaceMethodref {
                class_index,
                name_and_type_index,
            } => (*class_index, *name_and_type_index),
            other => return Err(mismatch(index, ConstantKind::MemberRef, other)),
        };
        let (name, descriptor) = self.name_and_type(name_and_type_index)?;
        Ok(MemberRef {
            kind: entry.kind(),
            class: self.class_name(class_index)?,
            name,
            descriptor,
        })
    }

    /// Resolves the target of a `ConstantValue` attribute.
    pub fn constant_value(&self, index: u16) -> Result<Const> {
        match self.get(index)? {
            ConstantPoolInfo::Integer(i) => Ok(Const::Int(*i)),
            ConstantPoolInfo::Float(f) => Ok(Const::Float(*f)),
            ConstantPoolInfo::Long(l) => Ok(Const::Long(*l)),
            ConstantPoolInfo::Double(d) => Ok(Const::Double(*d)),
            ConstantPoolInfo::String { string_index } => {
                Ok(Const::String(self.utf8(*string_index)?))
            }
            other => Err(mismatch(index, ConstantKind::Loadable, other)),
        }
    }
}

fn mismatch(index: u16, expected: ConstantKind, found: &ConstantPoolInfo) -> ClassFileError {
    ClassFileError::ConstantKindMismatch {
        index,
        expected,
        found: found.kind(),
    }
}

fn parse_constant(reader: &mut Reader<'_>) -> Result<ConstantPoolInfo> {
    let offset = reader.offset();
    let tag = reader.u8()?;
    let cp_info = match tag {
        1 => ConstantPoolInfo::Utf8(reader.utf8()?),
        3 => ConstantPoolInfo::Integer(reader.i32()?),
        4 => ConstantPoolInfo::Float(reader.f32()?),
        5 => ConstantPoolInfo::Long(reader.i64()?),
        6 => ConstantPoolInfo::Double(reader.f64()?),
        7 => ConstantPoolInfo::Class {
            name_index: reader.u16()?,
        },
        8 => ConstantPoolInfo::String {
            string_index: reader.u16()?,
        },
        9 => ConstantPoolInfo::Fieldref {
            class_index: reader.u16()?,
            name_and_type_index: reader.u16()?,
        },
        10 => ConstantPoolInfo::Methodref {
            class_index: reader.u16()?,
            name_and_type_index: reader.u16()?,
        },
        11 => ConstantPoolInfo::InterfaceMethodref {
            class_index: reader.u16()?,
            name_and_type_index: reader.u16()?,
        },
        12 => ConstantPoolInfo::NameAndType {
            name_index: reader.u16()?,
            descriptor_index: reader.u16()?,
        },
        15 => ConstantPoolInfo::MethodHandle {
            reference_kind: reader.u8()?,
            reference_index: reader.u16()?,
        },
        16 => ConstantPoolInfo::MethodType {
            descriptor_index: reader.u16()?,
        },
        17 => ConstantPoolInfo::Dynamic {
            bootstrap_method_attr_index: reader.u16()?,
            name_and_type_index: reader.u16()?,
        },
        18 => ConstantPoolInfo::InvokeDynamic {
            bootstrap_method_attr_index: reader.u16()?,
            name_and_type_index: reader.u16()?,
        },
        19 => ConstantPoolInfo::Module {
            name_index: reader.u16()?,
        },
        20 => ConstantPoolInfo::Package {
            name_index: reader.u16()?,
        },
        _ => return Err(ClassFileError::UnsupportedConstantKind { tag, offset }),
    };
    Ok(cp_info)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn utf8(s: &str) -> Vec<u8> {
        let mut bytes = vec![1];
        bytes.extend_from_slice(&(s.len() as u16).to_be_bytes());
        bytes.extend_from_slice(s.as_bytes());
        bytes
    }

    fn pool(count: u16, entries: &[Vec<u8>]) -> Result<ConstantPool> {
        let mut data = count.to_be_bytes().to_vec();
        for entry in entries {
            data.extend_from_slice(entry);
        }
        let mut reader = Reader::new(&data);
        let pool = ConstantPool::parse(&mut reader)?;
        reader.finish("constant pool")?;
        Ok(pool)
    }

    fn sample() -> ConstantPool {
        pool(
            9,
            &[
                utf8("java/lang/Object"),   // 1
                vec![7, 0, 1],              // 2 Class
                utf8("hashCode"),           // 3
                utf8("()I"),                // 4
                vec![12, 0, 3, 0, 4],       // 5 NameAndType
                vec![10, 0, 2, 0, 5],       // 6 Methodref
                vec![8, 0, 3],              // 7 String
                vec![3, 0xff, 0xff, 0xff, 0xfe], // 8 Integer
            ],
        )
        .unwrap()
    }

    #[test]
    fn resolves_chains() {
        let pool = sample();
        assert_eq!(pool.len(), 8);
        assert_eq!(&*pool.class_name(2).unwrap(), "java/lang/Object");
        let (name, descriptor) = pool.name_and_type(5).unwrap();
        assert_eq!((&*name, &*descriptor), ("hashCode", "()I"));
        assert_eq!(
            pool.member_ref(6).unwrap(),
            MemberRef {
                kind: ConstantKind::Methodref,
                class: "java/lang/Object".into(),
                name: "hashCode".into(),
                descriptor: "()I".into(),
            }
        );
        assert_eq!(&*pool.string(7).unwrap(), "hashCode");
        assert_eq!(pool.integer(8).unwrap(), -2);
        assert_eq!(pool.constant_value(7).unwrap(), Const::String("hashCode".into()));
    }

    #[test]
    fn index_bounds() {
        let pool = sample();
        assert_eq!(
            pool.get(0),
            Err(ClassFileError::InvalidConstantPoolIndex { index: 0 })
        );
        assert_eq!(
            pool.get(9),
            Err(ClassFileError::InvalidConstantPoolIndex { index: 9 })
        );
        assert_eq!(pool.optional_class_name(0).unwrap(), None);
    }

    #[test]
    fn kind_mismatch() {
        let pool = sample();
        assert_eq!(
            pool.utf8(2),
            Err(ClassFileError::ConstantKindMismatch {
                index: 2,
                expected: ConstantKind::Utf8,
                found: ConstantKind::Class,
            })
        );
        assert_eq!(
            pool.member_ref(5),
            Err(ClassFileError::ConstantKindMismatch {
                index: 5,
                expected: ConstantKind::MemberRef,
                found: ConstantKind::NameAndType,
            })
        );
        assert!(matches!(
            pool.constant_value(6),
            Err(ClassFileError::ConstantKindMismatch { index: 6, .. })
        ));
    }

    #[test]
    fn wide_constants_take_two_slots() {
        let pool = pool(
            6,
            &[
                vec![5, 0, 0, 0, 0, 0, 0, 0, 42],                  // 1 Long, 2 unusable
                vec![6, 0x40, 0x09, 0x21, 0xfb, 0x54, 0x44, 0x2d, 0x18], // 3 Double, 4 unusable
                utf8("after"),                                     // 5
            ],
        )
        .unwrap();
        assert_eq!(pool.long(1).unwrap(), 42);
        assert_eq!(pool.double(3).unwrap(), std::f64::consts::PI);
        assert_eq!(
            pool.get(2),
            Err(ClassFileError::InvalidConstantPoolIndex { index: 2 })
        );
        assert_eq!(
            pool.get(4),
            Err(ClassFileError::InvalidConstantPoolIndex { index: 4 })
        );
        assert_eq!(&*pool.utf8(5).unwrap(), "after");
        let indices: Vec<u16> = pool.iter().map(|(index, _)| index).collect();
        assert_eq!(indices, vec![1, 3, 5]);
    }

    #[test]
    fn dynamic_and_module_constants() {
        let pool = pool(
            11,
            &[
                utf8("bootstrap"),            // 1
                utf8("()V"),                  // 2
                vec![12, 0, 1, 0, 2],         // 3 NameAndType
                vec![15, 6, 0, 3],            // 4 MethodHandle
                vec![16, 0, 2],               // 5 MethodType
                vec![17, 0, 0, 0, 3],         // 6 Dynamic
                vec![18, 0, 1, 0, 3],         // 7 InvokeDynamic
                utf8("java.base"),            // 8
                vec![19, 0, 8],               // 9 Module
                vec![20, 0, 8],               // 10 Package
            ],
        )
        .unwrap();

        assert_eq!(
            pool.get(4),
            Ok(&ConstantPoolInfo::MethodHandle {
                reference_kind: 6,
                reference_index: 3,
            })
        );
        assert_eq!(
            pool.get(5),
            Ok(&ConstantPoolInfo::MethodType {
                descriptor_index: 2
            })
        );
        assert_eq!(
            pool.get(6),
            Ok(&ConstantPoolInfo::Dynamic {
                bootstrap_method_attr_index: 0,
                name_and_type_index: 3,
            })
        );
        assert_eq!(
            pool.get(7),
            Ok(&ConstantPoolInfo::InvokeDynamic {
                bootstrap_method_attr_index: 1,
                name_and_type_index: 3,
            })
        );
        assert_eq!(pool.get(9), Ok(&ConstantPoolInfo::Module { name_index: 8 }));
        assert_eq!(pool.get(10), Ok(&ConstantPoolInfo::Package { name_index: 8 }));

        let kinds: Vec<ConstantKind> = (4..=7)
            .chain(9..=10)
            .map(|index| pool.get(index).unwrap().kind())
            .collect();
        assert_eq!(
            kinds,
            vec![
                ConstantKind::MethodHandle,
                ConstantKind::MethodType,
                ConstantKind::Dynamic,
                ConstantKind::InvokeDynamic,
                ConstantKind::Module,
                ConstantKind::Package,
            ]
        );
        assert!(matches!(
            pool.utf8(9),
            Err(ClassFileError::ConstantKindMismatch {
                found: ConstantKind::Module,
                ..
            })
        ));
    }

    #[test]
    fn wide_constant_in_last_slot_is_malformed() {
        let result = pool(2, &[vec![5, 0, 0, 0, 0, 0, 0, 0, 1]]);
        assert!(matches!(
            result,
            Err(ClassFileError::MalformedClassFile { offset: 2, .. })
        ));
    }

    #[test]
    fn unknown_tag() {
        let result = pool(3, &[utf8("x"), vec![2, 0, 0]]);
        assert_eq!(
            result,
            Err(ClassFileError::UnsupportedConstantKind { tag: 2, offset: 6 })
        );
    }

    #[test]
    fn zero_count_is_malformed() {
        assert!(matches!(
            pool(0, &[]),
            Err(ClassFileError::MalformedClassFile { offset: 0, .. })
        ));
    }
}
