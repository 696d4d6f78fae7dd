use std::sync::Arc;

use crate::{
    class::{
        Annotation, AttributeInfo, ClassFile, CodeAttribute, Const, ConstantPool, ElementValue,
        ElementValuePair, ExceptionTableItem, FieldInfo, InnerClass, LineNumberTableItem,
        LocalVariable, MethodInfo,
    },
    consts::{
        CLASS_FILE_MAGIC, ClassAccessFlag, FieldAccessFlag, MethodAccessFlag,
        NestedClassAccessFlag,
    },
    descriptor::{
        FieldDescriptor, parse_field_descriptor, parse_method_descriptor,
        parse_return_type_descriptor,
    },
    error::{ClassFileError, Result},
    reader::Reader,
    signature::{Signature, parse_class_signature, parse_field_signature, parse_method_signature},
};

/// Nesting limit for annotation element values.
const MAX_ELEMENT_VALUE_DEPTH: usize = 64;

/// What an attribute table belongs to. Decides how `Signature` is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeOwner {
    Class,
    Field,
    Method,
    Code,
}

pub fn class_file(input: &[u8]) -> Result<ClassFile> {
    let mut reader = Reader::new(input);

    let (minor, major) = parse_header(&mut reader)?;
    let constant_pool = ConstantPool::parse(&mut reader)?;

    let access_flags = reader.u16()?;
    let this_class = constant_pool.class_name(reader.u16()?)?;
    let super_class = constant_pool.optional_class_name(reader.u16()?)?;
    let interfaces = reader.table("interface", 2, |reader| {
        constant_pool.class_name(reader.u16()?)
    })?;
    let fields = reader.table("field", 8, |reader| parse_field(reader, &constant_pool))?;
    let methods = reader.table("method", 8, |reader| parse_method(reader, &constant_pool))?;
    let attributes = parse_attributes(&mut reader, &constant_pool, AttributeOwner::Class)?;

    reader.finish("class file")?;

    Ok(ClassFile {
        major_version: major,
        minor_version: minor,
        access_flags: ClassAccessFlag::from_bits_retain(access_flags),
        this_class,
        super_class,
        constant_pool,
        interfaces,
        fields,
        methods,
        attributes,
    })
}

fn parse_header(reader: &mut Reader<'_>) -> Result<(u16, u16)> {
    let magic = reader.u32()?;
    if magic != CLASS_FILE_MAGIC {
        return Err(ClassFileError::NotAClassFile { found: magic });
    }
    let minor = reader.u16()?;
    let major = reader.u16()?;
    Ok((minor, major))
}

fn field_descriptor(
    pool: &ConstantPool,
    index: u16,
    offset: usize,
) -> Result<(Arc<str>, FieldDescriptor)> {
    let descriptor = pool.utf8(index)?;
    let (_, parsed) = parse_field_descriptor(&descriptor).map_err(|_| {
        ClassFileError::malformed(offset, format!("invalid field descriptor {descriptor:?}"))
    })?;
    Ok((descriptor, parsed))
}

fn parse_field(reader: &mut Reader<'_>, pool: &ConstantPool) -> Result<FieldInfo> {
    let access_flags = reader.u16()?;
    let name = pool.utf8(reader.u16()?)?;
    let descriptor_offset = reader.offset();
    let (descriptor, FieldDescriptor(field_type)) =
        field_descriptor(pool, reader.u16()?, descriptor_offset)?;
    let attributes = parse_attributes(reader, pool, AttributeOwner::Field)?;

    Ok(FieldInfo {
        access_flags: FieldAccessFlag::from_bits_retain(access_flags),
        name,
        descriptor,
        field_type,
        attributes,
    })
}

fn parse_method(reader: &mut Reader<'_>, pool: &ConstantPool) -> Result<MethodInfo> {
    let access_flags = reader.u16()?;
    let name = pool.utf8(reader.u16()?)?;
    let descriptor_offset = reader.offset();
    let descriptor = pool.utf8(reader.u16()?)?;
    let (_, method_descriptor) = parse_method_descriptor(&descriptor).map_err(|_| {
        ClassFileError::malformed(
            descriptor_offset,
            format!("invalid method descriptor {descriptor:?}"),
        )
    })?;
    let attributes = parse_attributes(reader, pool, AttributeOwner::Method)?;

    Ok(MethodInfo {
        access_flags: MethodAccessFlag::from_bits_retain(access_flags),
        name,
        descriptor,
        method_descriptor,
        attributes,
    })
}

fn parse_attributes(
    reader: &mut Reader<'_>,
    pool: &ConstantPool,
    owner: AttributeOwner,
) -> Result<Vec<AttributeInfo>> {
    reader.table("attribute", 6, |reader| parse_attribute(reader, pool, owner))
}

fn parse_attribute(
    reader: &mut Reader<'_>,
    pool: &ConstantPool,
    owner: AttributeOwner,
) -> Result<AttributeInfo> {
    let attribute_name = pool.utf8(reader.u16()?)?;
    let attribute_length = reader.u32()?;
    let mut input = reader.sub_reader(attribute_length as usize, &attribute_name)?;

    let attribute_info = match &*attribute_name {
        "Code" => AttributeInfo::Code(parse_code_attribute(&mut input, pool)?),
        "ConstantValue" => AttributeInfo::ConstantValue(pool.constant_value(input.u16()?)?),
        "Exceptions" => AttributeInfo::Exceptions(
            input.table("exception", 2, |input| pool.class_name(input.u16()?))?,
        ),
        "InnerClasses" => AttributeInfo::InnerClasses(input.table("inner class", 8, |input| {
            Ok(InnerClass {
                inner_class: pool.optional_class_name(input.u16()?)?,
                outer_class: pool.optional_class_name(input.u16()?)?,
                inner_name: pool.optional_utf8(input.u16()?)?,
                access_flags: NestedClassAccessFlag::from_bits_retain(input.u16()?),
            })
        })?),
        "EnclosingMethod" => {
            let class = pool.class_name(input.u16()?)?;
            let method_index = input.u16()?;
            let method = if method_index == 0 {
                None
            } else {
                Some(pool.name_and_type(method_index)?)
            };
            AttributeInfo::EnclosingMethod { class, method }
        }
        "Signature" if owner != AttributeOwner::Code => {
            let offset = input.offset();
            let text = pool.utf8(input.u16()?)?;
            AttributeInfo::Signature(parse_signature(owner, &text, offset)?)
        }
        "SourceFile" => AttributeInfo::SourceFile(pool.utf8(input.u16()?)?),
        "LineNumberTable" => {
            AttributeInfo::LineNumberTable(input.table("line number", 4, |input| {
                Ok(LineNumberTableItem {
                    start_pc: input.u16()?,
                    line_number: input.u16()?,
                })
            })?)
        }
        "LocalVariableTable" => AttributeInfo::LocalVariableTable(
            input.table("local variable", 10, |input| parse_local_variable(input, pool))?,
        ),
        "Synthetic" => AttributeInfo::Synthetic,
        "Deprecated" => AttributeInfo::Deprecated,
        "RuntimeVisibleAnnotations" => {
            AttributeInfo::RuntimeVisibleAnnotations(parse_annotations(&mut input, pool)?)
        }
        "RuntimeInvisibleAnnotations" => {
            AttributeInfo::RuntimeInvisibleAnnotations(parse_annotations(&mut input, pool)?)
        }
        "RuntimeVisibleParameterAnnotations" => AttributeInfo::RuntimeVisibleParameterAnnotations(
            parse_parameter_annotations(&mut input, pool)?,
        ),
        "RuntimeInvisibleParameterAnnotations" => {
            AttributeInfo::RuntimeInvisibleParameterAnnotations(parse_parameter_annotations(
                &mut input, pool,
            )?)
        }
        "AnnotationDefault" => {
            AttributeInfo::AnnotationDefault(parse_element_value(&mut input, pool, 0)?)
        }
        _ => {
            let info = input.bytes(input.remaining())?;
            AttributeInfo::Unknown {
                name: Arc::clone(&attribute_name),
                info: info.to_vec(),
            }
        }
    };

    input.finish(&attribute_name)?;

    Ok(attribute_info)
}

fn parse_signature(owner: AttributeOwner, text: &str, offset: usize) -> Result<Signature> {
    let parsed = match owner {
        AttributeOwner::Class => parse_class_signature(text).map(|(_, s)| Signature::Class(s)),
        AttributeOwner::Method => parse_method_signature(text).map(|(_, s)| Signature::Method(s)),
        AttributeOwner::Field | AttributeOwner::Code => {
            parse_field_signature(text).map(|(_, s)| Signature::Field(s))
        }
    };
    parsed.map_err(|_| ClassFileError::malformed(offset, format!("invalid signature {text:?}")))
}

fn parse_code_attribute(input: &mut Reader<'_>, pool: &ConstantPool) -> Result<CodeAttribute> {
    let max_stack = input.u16()?;
    let max_locals = input.u16()?;

    let code_length = input.u32()?;
    let code = input.bytes(code_length as usize)?;

    let exception_table = input.table("exception table", 8, |input| {
        Ok(ExceptionTableItem {
            start_pc: input.u16()?,
            end_pc: input.u16()?,
            handler_pc: input.u16()?,
            catch_type: pool.optional_class_name(input.u16()?)?,
        })
    })?;

    let attributes = parse_attributes(input, pool, AttributeOwner::Code)?;

    Ok(CodeAttribute {
        max_stack,
        max_locals,
        code: code.into(),
        exception_table,
        attributes,
    })
}

fn parse_local_variable(input: &mut Reader<'_>, pool: &ConstantPool) -> Result<LocalVariable> {
    let start_pc = input.u16()?;
    let length = input.u16()?;
    let name = pool.utf8(input.u16()?)?;
    let descriptor_offset = input.offset();
    let (_, descriptor) = field_descriptor(pool, input.u16()?, descriptor_offset)?;
    let index = input.u16()?;

    Ok(LocalVariable {
        start_pc,
        length,
        name,
        descriptor,
        index,
    })
}

fn parse_annotations(input: &mut Reader<'_>, pool: &ConstantPool) -> Result<Vec<Annotation>> {
    input.table("annotation", 4, |input| parse_annotation(input, pool, 0))
}

fn parse_parameter_annotations(
    input: &mut Reader<'_>,
    pool: &ConstantPool,
) -> Result<Vec<Vec<Annotation>>> {
    let num_parameters = input.u8()?;
    (0..num_parameters)
        .map(|_| parse_annotations(input, pool))
        .collect()
}

fn parse_annotation(input: &mut Reader<'_>, pool: &ConstantPool, depth: usize) -> Result<Annotation> {
    let type_offset = input.offset();
    let (_, type_descriptor) = field_descriptor(pool, input.u16()?, type_offset)?;
    let element_value_pairs = input.table("element value pair", 5, |input| {
        Ok(ElementValuePair {
            element_name: pool.utf8(input.u16()?)?,
            value: parse_element_value(input, pool, depth)?,
        })
    })?;

    Ok(Annotation {
        type_descriptor,
        element_value_pairs,
    })
}

fn parse_element_value(
    input: &mut Reader<'_>,
    pool: &ConstantPool,
    depth: usize,
) -> Result<ElementValue> {
    let offset = input.offset();
    if depth > MAX_ELEMENT_VALUE_DEPTH {
        return Err(ClassFileError::malformed(
            offset,
            "element values nested too deeply",
        ));
    }

    let tag = input.u8()?;
    let value = match tag {
        b'B' => ElementValue::Const(Const::Byte(pool.integer(input.u16()?)?)),
        b'C' => ElementValue::Const(Const::Char(pool.integer(input.u16()?)?)),
        b'S' => ElementValue::Const(Const::Short(pool.integer(input.u16()?)?)),
        b'Z' => ElementValue::Const(Const::Boolean(pool.integer(input.u16()?)?)),
        b'I' => ElementValue::Const(Const::Int(pool.integer(input.u16()?)?)),
        b'J' => ElementValue::Const(Const::Long(pool.long(input.u16()?)?)),
        b'F' => ElementValue::Const(Const::Float(pool.float(input.u16()?)?)),
        b'D' => ElementValue::Const(Const::Double(pool.double(input.u16()?)?)),
        b's' => ElementValue::Const(Const::String(pool.utf8(input.u16()?)?)),
        b'e' => ElementValue::Enum {
            type_name: pool.utf8(input.u16()?)?,
            const_name: pool.utf8(input.u16()?)?,
        },
        b'c' => {
            let class_info = pool.utf8(input.u16()?)?;
            let (_, class) = parse_return_type_descriptor(&class_info)
                .ok()
                .filter(|(rest, _)| rest.is_empty())
                .ok_or_else(|| {
                    ClassFileError::malformed(
                        offset,
                        format!("invalid class element value {class_info:?}"),
                    )
                })?;
            ElementValue::Class(class)
        }
        b'@' => ElementValue::Annotation(parse_annotation(input, pool, depth + 1)?),
        b'[' => ElementValue::Array(input.table("element value", 3, |input| {
            parse_element_value(input, pool, depth + 1)
        })?),
        _ => {
            return Err(ClassFileError::malformed(
                offset,
                format!("unknown element value tag {tag:#04x}"),
            ));
        }
    };
    Ok(value)
}
