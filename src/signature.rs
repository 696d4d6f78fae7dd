//! Generic signatures, as stored in `Signature` attributes.

use std::fmt::{self, Display};

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::take_while1,
    character::complete::char,
    combinator::{eof, map, opt, verify},
    error::{Error, ErrorKind},
    multi::{many0, many1, many1_count},
    sequence::{delimited, preceded},
};

use crate::descriptor::{FieldType, MAX_ARRAY_DIMENSIONS, parse_base_type};

/// Nesting limit for type arguments and bounds.
pub const MAX_SIGNATURE_DEPTH: usize = 64;

/// A decoded `Signature` attribute; which form it takes depends on what the
/// attribute is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Signature {
    Class(ClassSignature),
    Method(MethodSignature),
    Field(TypeSignature),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassSignature {
    pub type_parameters: Vec<TypeParameter>,
    pub super_class: ClassTypeSignature,
    pub interfaces: Vec<ClassTypeSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    pub type_parameters: Vec<TypeParameter>,
    pub parameters: Vec<TypeSignature>,
    /// `None` is `void`.
    pub return_type: Option<TypeSignature>,
    pub throws: Vec<TypeSignature>,
}

/// `T:Ljava/lang/Object;:Ljava/lang/Comparable<TT;>;`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeParameter {
    pub name: String,
    pub class_bound: Option<TypeSignature>,
    pub interface_bounds: Vec<TypeSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSignature {
    /// A primitive type, only used for parameters, return types and array
    /// elements.
    Base(FieldType),
    Class(ClassTypeSignature),
    TypeVariable(String),
    Array(Box<TypeSignature>),
}

/// `Lpkg/Outer<..>.Inner<..>;`, one segment per class of the nesting chain.
/// The first segment carries the package.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassTypeSignature {
    pub segments: Vec<SimpleClassTypeSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimpleClassTypeSignature {
    pub name: String,
    pub type_arguments: Vec<TypeArgument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeArgument {
    /// `*`
    Any,
    Exact(TypeSignature),
    /// `+`, i.e. `? extends`
    Extends(TypeSignature),
    /// `-`, i.e. `? super`
    Super(TypeSignature),
}

impl ClassTypeSignature {
    /// Internal name of the class, e.g. `java/util/Map$Entry`.
    pub fn name(&self) -> String {
        self.segments
            .iter()
            .map(|segment| segment.name.as_str())
            .collect::<Vec<_>>()
            .join("$")
    }

    /// Type arguments of the innermost class.
    pub fn type_arguments(&self) -> &[TypeArgument] {
        self.segments
            .last()
            .map(|segment| segment.type_arguments.as_slice())
            .unwrap_or_default()
    }
}

fn write_type_arguments(f: &mut fmt::Formatter<'_>, arguments: &[TypeArgument]) -> fmt::Result {
    if arguments.is_empty() {
        return Ok(());
    }
    f.write_str("<")?;
    for argument in arguments {
        write!(f, "{argument}")?;
    }
    f.write_str(">")
}

fn write_type_parameters(f: &mut fmt::Formatter<'_>, parameters: &[TypeParameter]) -> fmt::Result {
    if parameters.is_empty() {
        return Ok(());
    }
    f.write_str("<")?;
    for parameter in parameters {
        write!(f, "{parameter}")?;
    }
    f.write_str(">")
}

impl Display for ClassTypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("L")?;
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&segment.name)?;
            write_type_arguments(f, &segment.type_arguments)?;
        }
        f.write_str(";")
    }
}

impl Display for TypeArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeArgument::Any => f.write_str("*"),
            TypeArgument::Exact(signature) => write!(f, "{signature}"),
            TypeArgument::Extends(signature) => write!(f, "+{signature}"),
            TypeArgument::Super(signature) => write!(f, "-{signature}"),
        }
    }
}

impl Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSignature::Base(field_type) => write!(f, "{field_type}"),
            TypeSignature::Class(class) => write!(f, "{class}"),
            TypeSignature::TypeVariable(name) => write!(f, "T{name};"),
            TypeSignature::Array(element) => write!(f, "[{element}"),
        }
    }
}

impl Display for TypeParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.name)?;
        if let Some(class_bound) = &self.class_bound {
            write!(f, "{class_bound}")?;
        }
        for bound in &self.interface_bounds {
            write!(f, ":{bound}")?;
        }
        Ok(())
    }
}

impl Display for ClassSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type_parameters(f, &self.type_parameters)?;
        write!(f, "{}", self.super_class)?;
        for interface in &self.interfaces {
            write!(f, "{interface}")?;
        }
        Ok(())
    }
}

impl Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type_parameters(f, &self.type_parameters)?;
        f.write_str("(")?;
        for parameter in &self.parameters {
            write!(f, "{parameter}")?;
        }
        f.write_str(")")?;
        match &self.return_type {
            Some(return_type) => write!(f, "{return_type}")?,
            None => f.write_str("V")?,
        }
        for throws in &self.throws {
            write!(f, "^{throws}")?;
        }
        Ok(())
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signature::Class(signature) => write!(f, "{signature}"),
            Signature::Method(signature) => write!(f, "{signature}"),
            Signature::Field(signature) => write!(f, "{signature}"),
        }
    }
}

pub fn parse_class_signature(input: &str) -> IResult<&str, ClassSignature> {
    let (input, type_parameters) = opt(|i| parse_type_parameters(i, 0)).parse(input)?;
    let (input, super_class) = parse_class_type(input, 0)?;
    let (input, interfaces) = many0(|i| parse_class_type(i, 0)).parse(input)?;
    eof(input)?;
    Ok((
        input,
        ClassSignature {
            type_parameters: type_parameters.unwrap_or_default(),
            super_class,
            interfaces,
        },
    ))
}

pub fn parse_method_signature(input: &str) -> IResult<&str, MethodSignature> {
    let (input, type_parameters) = opt(|i| parse_type_parameters(i, 0)).parse(input)?;
    let (input, parameters) =
        delimited(char('('), many0(|i| parse_java_type(i, 0)), char(')')).parse(input)?;
    let (input, return_type) = alt((
        map(char('V'), |_| None),
        map(|i| parse_java_type(i, 0), Some),
    ))
    .parse(input)?;
    let (input, throws) = many0(preceded(char('^'), |i| parse_throws_type(i, 0))).parse(input)?;
    eof(input)?;
    Ok((
        input,
        MethodSignature {
            type_parameters: type_parameters.unwrap_or_default(),
            parameters,
            return_type,
            throws,
        },
    ))
}

/// Field signatures are always reference types.
pub fn parse_field_signature(input: &str) -> IResult<&str, TypeSignature> {
    let (input, signature) = parse_reference_type(input, 0)?;
    eof(input)?;
    Ok((input, signature))
}

fn too_large(input: &str) -> nom::Err<Error<&str>> {
    nom::Err::Failure(Error::new(input, ErrorKind::TooLarge))
}

fn parse_identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !matches!(c, '.' | ';' | '[' | '/' | '<' | '>' | ':')).parse(input)
}

/// An identifier that may carry a package path.
fn parse_qualified_identifier(input: &str) -> IResult<&str, &str> {
    verify(
        take_while1(|c: char| !matches!(c, '.' | ';' | '[' | '<' | '>' | ':')),
        |name: &str| !name.split('/').any(str::is_empty),
    )
    .parse(input)
}

fn parse_type_parameters(input: &str, depth: usize) -> IResult<&str, Vec<TypeParameter>> {
    delimited(
        char('<'),
        many1(|i| parse_type_parameter(i, depth)),
        char('>'),
    )
    .parse(input)
}

fn parse_type_parameter(input: &str, depth: usize) -> IResult<&str, TypeParameter> {
    let (input, name) = parse_identifier(input)?;
    let (input, class_bound) =
        preceded(char(':'), opt(|i| parse_reference_type(i, depth + 1))).parse(input)?;
    let (input, interface_bounds) =
        many0(preceded(char(':'), |i| parse_reference_type(i, depth + 1))).parse(input)?;
    Ok((
        input,
        TypeParameter {
            name: name.to_string(),
            class_bound,
            interface_bounds,
        },
    ))
}

fn parse_java_type(input: &str, depth: usize) -> IResult<&str, TypeSignature> {
    alt((
        map(parse_base_type, TypeSignature::Base),
        |i| parse_reference_type(i, depth),
    ))
    .parse(input)
}

fn parse_reference_type(input: &str, depth: usize) -> IResult<&str, TypeSignature> {
    alt((
        map(|i| parse_class_type(i, depth), TypeSignature::Class),
        map(parse_type_variable, TypeSignature::TypeVariable),
        |i| parse_array_type(i, depth),
    ))
    .parse(input)
}

fn parse_throws_type(input: &str, depth: usize) -> IResult<&str, TypeSignature> {
    alt((
        map(|i| parse_class_type(i, depth), TypeSignature::Class),
        map(parse_type_variable, TypeSignature::TypeVariable),
    ))
    .parse(input)
}

fn parse_type_variable(input: &str) -> IResult<&str, String> {
    map(delimited(char('T'), parse_identifier, char(';')), str::to_string).parse(input)
}

fn parse_array_type(input: &str, depth: usize) -> IResult<&str, TypeSignature> {
    let (rest, dimensions) = many1_count(char('[')).parse(input)?;
    if dimensions > MAX_ARRAY_DIMENSIONS {
        return Err(too_large(input));
    }
    // every `[` is consumed above, so the element is never an array itself
    let (rest, element) = parse_java_type(rest, depth)?;
    let signature = (0..dimensions).fold(element, |signature, _| {
        TypeSignature::Array(Box::new(signature))
    });
    Ok((rest, signature))
}

fn parse_class_type(input: &str, depth: usize) -> IResult<&str, ClassTypeSignature> {
    let (input, _) = char('L').parse(input)?;
    if depth > MAX_SIGNATURE_DEPTH {
        return Err(too_large(input));
    }
    let (input, first) = parse_class_segment(input, parse_qualified_identifier, depth)?;
    let (input, inner) = many0(preceded(char('.'), |i| {
        parse_class_segment(i, parse_identifier, depth)
    }))
    .parse(input)?;
    let (input, _) = char(';').parse(input)?;

    let mut segments = Vec::with_capacity(inner.len() + 1);
    segments.push(first);
    segments.extend(inner);
    Ok((input, ClassTypeSignature { segments }))
}

fn parse_class_segment<'a>(
    input: &'a str,
    name: fn(&'a str) -> IResult<&'a str, &'a str>,
    depth: usize,
) -> IResult<&'a str, SimpleClassTypeSignature> {
    let (input, name) = name(input)?;
    let (input, type_arguments) = opt(|i| parse_type_arguments(i, depth + 1)).parse(input)?;
    Ok((
        input,
        SimpleClassTypeSignature {
            name: name.to_string(),
            type_arguments: type_arguments.unwrap_or_default(),
        },
    ))
}

fn parse_type_arguments(input: &str, depth: usize) -> IResult<&str, Vec<TypeArgument>> {
    delimited(
        char('<'),
        many1(|i| parse_type_argument(i, depth)),
        char('>'),
    )
    .parse(input)
}

fn parse_type_argument(input: &str, depth: usize) -> IResult<&str, TypeArgument> {
    alt((
        map(char('*'), |_| TypeArgument::Any),
        map(
            preceded(char('+'), |i| parse_reference_type(i, depth)),
            TypeArgument::Extends,
        ),
        map(
            preceded(char('-'), |i| parse_reference_type(i, depth)),
            TypeArgument::Super,
        ),
        map(|i| parse_reference_type(i, depth), TypeArgument::Exact),
    ))
    .parse(input)
}
