use std::fmt::{self, Display};

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::take_until,
    character::complete::{char, one_of},
    combinator::{eof, map, verify},
    error::{Error, ErrorKind},
    multi::{many0, many0_count},
    sequence::delimited,
};

/// Array types may have at most this many dimensions.
pub const MAX_ARRAY_DIMENSIONS: usize = 255;

/// Method parameters may take at most this many local variable slots.
pub const MAX_PARAMETER_SLOTS: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor(pub FieldType);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub parameters: Vec<FieldType>,
    pub return_type: ReturnType,
}

/// `None` is `void`.
pub type ReturnType = Option<FieldType>;

#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum FieldType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Object(String),
    Short,
    Boolean,
    Array(Box<FieldType>),
}

impl FieldType {
    /// `long` and `double` take two local variable and operand stack slots.
    pub fn is_wide(&self) -> bool {
        matches!(self, FieldType::Long | FieldType::Double)
    }

    pub fn array_dimensions(&self) -> usize {
        let mut dimensions = 0;
        let mut field_type = self;
        while let FieldType::Array(element) = field_type {
            dimensions += 1;
            field_type = element;
        }
        dimensions
    }

    pub fn to_descriptor(&self) -> String {
        match self {
            FieldType::Byte => "B".to_string(),
            FieldType::Char => "C".to_string(),
            FieldType::Double => "D".to_string(),
            FieldType::Float => "F".to_string(),
            FieldType::Int => "I".to_string(),
            FieldType::Long => "J".to_string(),
            FieldType::Short => "S".to_string(),
            FieldType::Boolean => "Z".to_string(),
            FieldType::Object(class_name) => format!("L{class_name};"),
            FieldType::Array(element) => format!("[{}", element.to_descriptor()),
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_descriptor())
    }
}

impl MethodDescriptor {
    /// Number of argument slots, not counting `this`.
    pub fn parameter_slots(&self) -> usize {
        self.parameters
            .iter()
            .map(|p| if p.is_wide() { 2 } else { 1 })
            .sum()
    }

    pub fn to_descriptor(&self) -> String {
        let mut descriptor = String::from("(");
        for parameter in &self.parameters {
            descriptor.push_str(&parameter.to_descriptor());
        }
        descriptor.push(')');
        match &self.return_type {
            Some(return_type) => descriptor.push_str(&return_type.to_descriptor()),
            None => descriptor.push('V'),
        }
        descriptor
    }
}

impl Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_descriptor())
    }
}

pub fn parse_field_descriptor(input: &str) -> IResult<&str, FieldDescriptor> {
    let (input, field_type) = parse_field_type(input)?;
    eof(input)?;
    Ok((input, FieldDescriptor(field_type)))
}

pub fn parse_method_descriptor(input: &str) -> IResult<&str, MethodDescriptor> {
    let (input, parameters) =
        delimited(char('('), many0(parse_field_type), char(')')).parse(input)?;

    let (input, return_type) = parse_return_type_descriptor(input)?;

    eof(input)?;
    let descriptor = MethodDescriptor {
        parameters,
        return_type,
    };
    if descriptor.parameter_slots() > MAX_PARAMETER_SLOTS {
        return Err(nom::Err::Failure(Error::new(input, ErrorKind::TooLarge)));
    }
    Ok((input, descriptor))
}

pub fn parse_return_type_descriptor(input: &str) -> IResult<&str, ReturnType> {
    alt((map(parse_field_type, Some), parse_void_type)).parse(input)
}

fn parse_field_type(input: &str) -> IResult<&str, FieldType> {
    let (rest, dimensions) = many0_count(char('[')).parse(input)?;
    if dimensions > MAX_ARRAY_DIMENSIONS {
        return Err(nom::Err::Failure(Error::new(input, ErrorKind::TooLarge)));
    }
    let (rest, element) = alt((parse_base_type, parse_object_type)).parse(rest)?;
    Ok((rest, wrap_in_arrays(element, dimensions)))
}

fn wrap_in_arrays(element: FieldType, dimensions: usize) -> FieldType {
    (0..dimensions).fold(element, |field_type, _| FieldType::Array(Box::new(field_type)))
}

pub(crate) fn parse_base_type(input: &str) -> IResult<&str, FieldType> {
    let (input, ch) = one_of("BCDFIJSZ").parse(input)?;
    let field_type = match ch {
        'B' => FieldType::Byte,
        'C' => FieldType::Char,
        'D' => FieldType::Double,
        'F' => FieldType::Float,
        'I' => FieldType::Int,
        'J' => FieldType::Long,
        'S' => FieldType::Short,
        _ => FieldType::Boolean,
    };
    Ok((input, field_type))
}

fn parse_object_type(input: &str) -> IResult<&str, FieldType> {
    let (input, _) = char('L').parse(input)?;

    let (input, class_name) = verify(take_until(";"), |name: &str| {
        !name.is_empty() && !name.contains(['.', '[']) && !name.split('/').any(str::is_empty)
    })
    .parse(input)?;

    let (input, _) = char(';').parse(input)?;

    Ok((input, FieldType::Object(class_name.to_string())))
}

fn parse_void_type(input: &str) -> IResult<&str, Option<FieldType>> {
    let (input, _) = char('V').parse(input)?;
    Ok((input, None))
}
