#![allow(dead_code)]

use std::{collections::HashMap, io::{Cursor, Write}};

use classlib::class::java_str;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

/// Assembles class files byte by byte, with a deduplicating constant pool.
#[derive(Debug, Default)]
pub struct ClassBuilder {
    pool: Vec<u8>,
    next_index: u16,
    utf8_entries: HashMap<String, u16>,
    class_entries: HashMap<String, u16>,
    access_flags: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    interface_count: Option<u16>,
    fields: Vec<Vec<u8>>,
    methods: Vec<Vec<u8>>,
    attributes: Vec<Vec<u8>>,
}

fn u16_be(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

impl ClassBuilder {
    pub fn new(name: &str, super_name: Option<&str>) -> Self {
        let mut builder = ClassBuilder {
            next_index: 1,
            access_flags: 0x0021,
            ..Default::default()
        };
        builder.this_class = builder.class(name);
        builder.super_class = super_name.map(|s| builder.class(s)).unwrap_or(0);
        builder
    }

    /// A public class extending `java/lang/Object`.
    pub fn simple(name: &str) -> Self {
        ClassBuilder::new(name, Some("java/lang/Object"))
    }

    fn push_entry(&mut self, bytes: &[u8], slots: u16) -> u16 {
        let index = self.next_index;
        self.pool.extend_from_slice(bytes);
        self.next_index += slots;
        index
    }

    /// Appends arbitrary bytes as one pool entry.
    pub fn raw_entry(&mut self, bytes: &[u8]) -> u16 {
        self.push_entry(bytes, 1)
    }

    pub fn utf8(&mut self, s: &str) -> u16 {
        if let Some(index) = self.utf8_entries.get(s) {
            return *index;
        }
        let encoded = java_str::encode(s);
        let mut bytes = vec![1];
        bytes.extend_from_slice(&u16_be(encoded.len() as u16));
        bytes.extend_from_slice(&encoded);
        let index = self.push_entry(&bytes, 1);
        self.utf8_entries.insert(s.to_string(), index);
        index
    }

    pub fn class(&mut self, name: &str) -> u16 {
        if let Some(index) = self.class_entries.get(name) {
            return *index;
        }
        let name_index = self.utf8(name);
        let mut bytes = vec![7];
        bytes.extend_from_slice(&u16_be(name_index));
        let index = self.push_entry(&bytes, 1);
        self.class_entries.insert(name.to_string(), index);
        index
    }

    pub fn integer(&mut self, value: i32) -> u16 {
        let mut bytes = vec![3];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.push_entry(&bytes, 1)
    }

    pub fn float(&mut self, value: f32) -> u16 {
        let mut bytes = vec![4];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.push_entry(&bytes, 1)
    }

    pub fn long(&mut self, value: i64) -> u16 {
        let mut bytes = vec![5];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.push_entry(&bytes, 2)
    }

    pub fn double(&mut self, value: f64) -> u16 {
        let mut bytes = vec![6];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.push_entry(&bytes, 2)
    }

    pub fn string(&mut self, value: &str) -> u16 {
        let utf8 = self.utf8(value);
        let mut bytes = vec![8];
        bytes.extend_from_slice(&u16_be(utf8));
        self.push_entry(&bytes, 1)
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        let mut bytes = vec![12];
        bytes.extend_from_slice(&u16_be(name));
        bytes.extend_from_slice(&u16_be(descriptor));
        self.push_entry(&bytes, 1)
    }

    pub fn method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(class);
        let name_and_type = self.name_and_type(name, descriptor);
        let mut bytes = vec![10];
        bytes.extend_from_slice(&u16_be(class));
        bytes.extend_from_slice(&u16_be(name_and_type));
        self.push_entry(&bytes, 1)
    }

    pub fn set_access_flags(&mut self, flags: u16) {
        self.access_flags = flags;
    }

    pub fn set_this_class_index(&mut self, index: u16) {
        self.this_class = index;
    }

    pub fn set_interface_count(&mut self, count: u16) {
        self.interface_count = Some(count);
    }

    pub fn interface(&mut self, name: &str) {
        let index = self.class(name);
        self.interfaces.push(index);
    }

    /// Encodes an attribute with the given payload.
    pub fn attribute(&mut self, name: &str, payload: &[u8]) -> Vec<u8> {
        let name = self.utf8(name);
        let mut bytes = u16_be(name).to_vec();
        bytes.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    /// Encodes an attribute whose payload is a single constant pool index.
    pub fn index_attribute(&mut self, name: &str, index: u16) -> Vec<u8> {
        self.attribute(name, &u16_be(index))
    }

    fn member(&mut self, flags: u16, name: &str, descriptor: &str, attributes: &[Vec<u8>]) -> Vec<u8> {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&u16_be(flags));
        bytes.extend_from_slice(&u16_be(name));
        bytes.extend_from_slice(&u16_be(descriptor));
        bytes.extend_from_slice(&u16_be(attributes.len() as u16));
        for attribute in attributes {
            bytes.extend_from_slice(attribute);
        }
        bytes
    }

    pub fn field(&mut self, flags: u16, name: &str, descriptor: &str, attributes: &[Vec<u8>]) {
        let field = self.member(flags, name, descriptor, attributes);
        self.fields.push(field);
    }

    pub fn method(&mut self, flags: u16, name: &str, descriptor: &str, attributes: &[Vec<u8>]) {
        let method = self.member(flags, name, descriptor, attributes);
        self.methods.push(method);
    }

    pub fn class_attribute(&mut self, attribute: Vec<u8>) {
        self.attributes.push(attribute);
    }

    pub fn build(&self) -> Vec<u8> {
        let mut bytes = vec![0xca, 0xfe, 0xba, 0xbe, 0x00, 0x00, 0x00, 0x34];
        bytes.extend_from_slice(&u16_be(self.next_index));
        bytes.extend_from_slice(&self.pool);
        bytes.extend_from_slice(&u16_be(self.access_flags));
        bytes.extend_from_slice(&u16_be(self.this_class));
        bytes.extend_from_slice(&u16_be(self.super_class));
        bytes.extend_from_slice(&u16_be(
            self.interface_count.unwrap_or(self.interfaces.len() as u16),
        ));
        for interface in &self.interfaces {
            bytes.extend_from_slice(&u16_be(*interface));
        }
        for table in [&self.fields, &self.methods, &self.attributes] {
            bytes.extend_from_slice(&u16_be(table.len() as u16));
            for entry in table {
                bytes.extend_from_slice(entry);
            }
        }
        bytes
    }
}

/// Big-endian byte sink for attribute payloads.
#[derive(Debug, Default)]
pub struct Payload(Vec<u8>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(mut self, value: u8) -> Self {
        self.0.push(value);
        self
    }

    pub fn u16(mut self, value: u16) -> Self {
        self.0.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn u32(mut self, value: u32) -> Self {
        self.0.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.0.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.0
    }
}

/// Writes `entries` into an in-memory zip. Entries whose name ends in `/`
/// become directories; the rest alternate between deflated and stored.
pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (i, (name, content)) in entries.iter().enumerate() {
        if name.ends_with('/') {
            writer
                .add_directory(*name, SimpleFileOptions::default())
                .unwrap();
            continue;
        }
        let method = if i % 2 == 0 {
            CompressionMethod::Deflated
        } else {
            CompressionMethod::Stored
        };
        writer
            .start_file(*name, SimpleFileOptions::default().compression_method(method))
            .unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
