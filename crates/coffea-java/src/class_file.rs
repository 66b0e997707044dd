//! Compiled class-file parsing
//!
//! Reads just enough of the JVM class-file format to learn a class's name,
//! which classes it references, and how big it is. Constant pool entries,
//! member descriptors and method `Code` attributes are inspected; everything
//! else is skipped by length.

use std::collections::BTreeSet;
use std::path::Path;

use coffea_core::ClassArtifact;

use crate::descriptor::{class_entry_types, object_types, to_dotted};

const MAGIC: u32 = 0xCAFE_BABE;

mod tag {
    pub const UTF8: u8 = 1;
    pub const INTEGER: u8 = 3;
    pub const FLOAT: u8 = 4;
    pub const LONG: u8 = 5;
    pub const DOUBLE: u8 = 6;
    pub const CLASS: u8 = 7;
    pub const STRING: u8 = 8;
    pub const FIELD_REF: u8 = 9;
    pub const METHOD_REF: u8 = 10;
    pub const INTERFACE_METHOD_REF: u8 = 11;
    pub const NAME_AND_TYPE: u8 = 12;
    pub const METHOD_HANDLE: u8 = 15;
    pub const METHOD_TYPE: u8 = 16;
    pub const DYNAMIC: u8 = 17;
    pub const INVOKE_DYNAMIC: u8 = 18;
    pub const MODULE: u8 = 19;
    pub const PACKAGE: u8 = 20;
}

/// A parsed class file (the subset needed for dependency analysis)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFile {
    /// Qualified class name in dotted form
    pub name: String,

    /// Direct superclass, `None` for `java.lang.Object` and module-info
    pub super_class: Option<String>,

    /// Directly implemented interfaces
    pub interfaces: Vec<String>,

    /// Class-file major version (52 = Java 8)
    pub major_version: u16,

    /// Every class named anywhere in the constant pool or member descriptors,
    /// excluding the class itself
    pub referenced_classes: BTreeSet<String>,

    /// Size of the class file in bytes
    pub size: u64,

    /// Sum of `code_length` over all method bodies
    pub code_size: u64,
}

impl ClassFile {
    /// Read and parse a class file from disk
    pub fn from_file(path: &Path) -> Result<Self, ClassFileError> {
        let bytes = std::fs::read(path)
            .map_err(|e| ClassFileError::IoError(path.display().to_string(), e.to_string()))?;

        Self::parse(&bytes)
    }

    /// Parse class-file bytes
    pub fn parse(bytes: &[u8]) -> Result<Self, ClassFileError> {
        let mut reader = Reader::new(bytes);

        let magic = reader.u4()?;
        if magic != MAGIC {
            return Err(ClassFileError::BadMagic(magic));
        }

        let _minor_version = reader.u2()?;
        let major_version = reader.u2()?;
        let pool = ConstantPool::read(&mut reader)?;

        let _access_flags = reader.u2()?;
        let this_class = reader.u2()?;
        let super_class = reader.u2()?;

        let mut descriptors: Vec<u16> = Vec::new();

        let interface_count = reader.u2()?;
        let mut interface_indices = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interface_indices.push(reader.u2()?);
        }

        let field_count = reader.u2()?;
        for _ in 0..field_count {
            let member = read_member(&mut reader, &pool)?;
            descriptors.push(member.descriptor);
        }

        let mut code_size = 0u64;
        let method_count = reader.u2()?;
        for _ in 0..method_count {
            let member = read_member(&mut reader, &pool)?;
            descriptors.push(member.descriptor);
            code_size += member.code_length;
        }

        // Class-level attributes carry nothing we track
        skip_attributes(&mut reader)?;

        let name = to_dotted(pool.class_name(this_class)?);
        let super_class = match super_class {
            0 => None,
            index => Some(to_dotted(pool.class_name(index)?)),
        };
        let interfaces = interface_indices
            .into_iter()
            .map(|index| pool.class_name(index).map(to_dotted))
            .collect::<Result<Vec<_>, _>>()?;

        let mut referenced_classes = pool.referenced_classes()?;
        for index in descriptors {
            for binary_name in object_types(pool.utf8(index)?) {
                referenced_classes.insert(to_dotted(binary_name));
            }
        }
        referenced_classes.remove(&name);

        Ok(Self {
            name,
            super_class,
            interfaces,
            major_version,
            referenced_classes,
            size: bytes.len() as u64,
            code_size,
        })
    }

    /// Flatten into the artifact consumed by node factories
    pub fn into_artifact(self) -> ClassArtifact {
        ClassArtifact::new(self.name, self.referenced_classes, self.size, self.code_size)
    }
}

impl From<ClassFile> for ClassArtifact {
    fn from(class_file: ClassFile) -> Self {
        class_file.into_artifact()
    }
}

/// Big-endian cursor over class-file bytes
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ClassFileError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(ClassFileError::UnexpectedEof(self.pos))?;

        let bytes: &'a [u8] = self.bytes;
        let slice = &bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u1(&mut self) -> Result<u8, ClassFileError> {
        Ok(self.take(1)?[0])
    }

    fn u2(&mut self) -> Result<u16, ClassFileError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u4(&mut self) -> Result<u32, ClassFileError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

#[derive(Debug, Clone)]
enum Constant {
    Utf8(String),
    Class(u16),
    NameAndType { descriptor: u16 },
    MethodType(u16),
    /// Entry with no class references (numbers, strings, member refs, ...)
    Other,
    /// Second slot of a Long or Double, and slot 0
    Unusable,
}

struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    fn read(reader: &mut Reader<'_>) -> Result<Self, ClassFileError> {
        let count = reader.u2()?;
        let mut entries = Vec::with_capacity(count as usize);
        entries.push(Constant::Unusable);

        while entries.len() < count as usize {
            let kind = reader.u1()?;
            let entry = match kind {
                tag::UTF8 => {
                    let len = reader.u2()?;
                    let raw = reader.take(len as usize)?;
                    let value = cesu8::from_java_cesu8(raw)
                        .map_err(|_| ClassFileError::BadUtf8(entries.len()))?;
                    Constant::Utf8(value.into_owned())
                }
                tag::CLASS => Constant::Class(reader.u2()?),
                tag::NAME_AND_TYPE => {
                    let _name = reader.u2()?;
                    Constant::NameAndType { descriptor: reader.u2()? }
                }
                tag::METHOD_TYPE => Constant::MethodType(reader.u2()?),
                tag::INTEGER | tag::FLOAT => {
                    reader.take(4)?;
                    Constant::Other
                }
                tag::LONG | tag::DOUBLE => {
                    reader.take(8)?;
                    entries.push(Constant::Other);
                    Constant::Unusable
                }
                tag::STRING | tag::MODULE | tag::PACKAGE => {
                    reader.take(2)?;
                    Constant::Other
                }
                tag::FIELD_REF
                | tag::METHOD_REF
                | tag::INTERFACE_METHOD_REF
                | tag::DYNAMIC
                | tag::INVOKE_DYNAMIC => {
                    reader.take(4)?;
                    Constant::Other
                }
                tag::METHOD_HANDLE => {
                    reader.take(3)?;
                    Constant::Other
                }
                other => return Err(ClassFileError::UnknownConstantTag(other, entries.len())),
            };
            entries.push(entry);
        }

        Ok(Self { entries })
    }

    fn get(&self, index: u16) -> Result<&Constant, ClassFileError> {
        self.entries
            .get(index as usize)
            .ok_or(ClassFileError::BadConstantIndex(index))
    }

    fn utf8(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value.as_str()),
            _ => Err(ClassFileError::BadConstantIndex(index)),
        }
    }

    fn class_name(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.get(index)? {
            Constant::Class(name) => self.utf8(*name),
            _ => Err(ClassFileError::BadConstantIndex(index)),
        }
    }

    /// Classes named by Class, NameAndType and MethodType entries
    fn referenced_classes(&self) -> Result<BTreeSet<String>, ClassFileError> {
        let mut classes = BTreeSet::new();

        for entry in &self.entries {
            let names = match entry {
                Constant::Class(name) => class_entry_types(self.utf8(*name)?),
                Constant::NameAndType { descriptor } | Constant::MethodType(descriptor) => {
                    object_types(self.utf8(*descriptor)?)
                }
                _ => continue,
            };
            classes.extend(names.into_iter().map(to_dotted));
        }

        Ok(classes)
    }
}

struct Member {
    descriptor: u16,
    code_length: u64,
}

fn read_member(reader: &mut Reader<'_>, pool: &ConstantPool) -> Result<Member, ClassFileError> {
    let _access_flags = reader.u2()?;
    let _name = reader.u2()?;
    let descriptor = reader.u2()?;

    let mut code_length = 0u64;
    let attribute_count = reader.u2()?;
    for _ in 0..attribute_count {
        let name = reader.u2()?;
        let len = reader.u4()? as usize;
        let body = reader.take(len)?;

        if pool.utf8(name)? == "Code" {
            // max_stack (u2), max_locals (u2), code_length (u4)
            let mut code = Reader::new(body);
            code.take(4)?;
            code_length += u64::from(code.u4()?);
        }
    }

    Ok(Member { descriptor, code_length })
}

fn skip_attributes(reader: &mut Reader<'_>) -> Result<(), ClassFileError> {
    let count = reader.u2()?;
    for _ in 0..count {
        let _name = reader.u2()?;
        let len = reader.u4()? as usize;
        reader.take(len)?;
    }
    Ok(())
}

/// Class-file parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ClassFileError {
    #[error("Failed to read class file {0}: {1}")]
    IoError(String, String),

    #[error("Not a class file (magic 0x{0:08X})")]
    BadMagic(u32),

    #[error("Unexpected end of class file at byte {0}")]
    UnexpectedEof(usize),

    #[error("Unknown constant pool tag {0} at index {1}")]
    UnknownConstantTag(u8, usize),

    #[error("Invalid constant pool reference #{0}")]
    BadConstantIndex(u16),

    #[error("Malformed modified UTF-8 in constant pool entry #{0}")]
    BadUtf8(usize),
}

/// Hand-assembled class files for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod fixture {
    use std::collections::HashMap;

    /// Builds the bytes of a minimal but valid class file
    #[derive(Debug, Clone)]
    pub struct ClassFixture {
        name: String,
        super_class: Option<String>,
        interfaces: Vec<String>,
        class_refs: Vec<String>,
        method_types: Vec<String>,
        fields: Vec<(String, String)>,
        methods: Vec<(String, String, Option<u32>)>,
        with_long: bool,
    }

    impl ClassFixture {
        /// Class with binary name `name` (e.g. `a/Foo`) extending `java/lang/Object`
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                super_class: Some("java/lang/Object".to_string()),
                interfaces: Vec::new(),
                class_refs: Vec::new(),
                method_types: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
                with_long: false,
            }
        }

        pub fn super_class(mut self, name: Option<&str>) -> Self {
            self.super_class = name.map(str::to_string);
            self
        }

        pub fn interface(mut self, name: &str) -> Self {
            self.interfaces.push(name.to_string());
            self
        }

        /// Plain `CONSTANT_Class` reference (may be an array type)
        pub fn class_ref(mut self, name: &str) -> Self {
            self.class_refs.push(name.to_string());
            self
        }

        pub fn method_type(mut self, descriptor: &str) -> Self {
            self.method_types.push(descriptor.to_string());
            self
        }

        pub fn field(mut self, name: &str, descriptor: &str) -> Self {
            self.fields.push((name.to_string(), descriptor.to_string()));
            self
        }

        /// Method with a `Code` attribute of `code_length` bytes, or abstract when `None`
        pub fn method(mut self, name: &str, descriptor: &str, code_length: Option<u32>) -> Self {
            self.methods.push((name.to_string(), descriptor.to_string(), code_length));
            self
        }

        /// Put a two-slot Long constant at the front of the pool
        pub fn with_long_constant(mut self) -> Self {
            self.with_long = true;
            self
        }

        pub fn to_bytes(&self) -> Vec<u8> {
            let mut pool = Pool::new();

            if self.with_long {
                pool.long(0x0102_0304_0506_0708);
            }

            let this_class = pool.class(&self.name);
            let super_class = self.super_class.as_deref().map(|name| pool.class(name)).unwrap_or(0);
            let interfaces: Vec<u16> =
                self.interfaces.iter().map(|name| pool.class(name)).collect();
            for name in &self.class_refs {
                pool.class(name);
            }
            for descriptor in &self.method_types {
                pool.method_type(descriptor);
            }
            let fields: Vec<(u16, u16)> = self
                .fields
                .iter()
                .map(|(name, descriptor)| (pool.utf8(name), pool.utf8(descriptor)))
                .collect();
            let methods: Vec<(u16, u16, Option<u32>)> = self
                .methods
                .iter()
                .map(|(name, descriptor, code)| (pool.utf8(name), pool.utf8(descriptor), *code))
                .collect();
            let code_name = pool.utf8("Code");

            let mut out = Vec::new();
            out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
            out.extend_from_slice(&0u16.to_be_bytes());
            out.extend_from_slice(&52u16.to_be_bytes());
            out.extend_from_slice(&pool.next.to_be_bytes());
            out.extend_from_slice(&pool.bytes);

            out.extend_from_slice(&0x0021u16.to_be_bytes());
            out.extend_from_slice(&this_class.to_be_bytes());
            out.extend_from_slice(&super_class.to_be_bytes());

            out.extend_from_slice(&(interfaces.len() as u16).to_be_bytes());
            for index in interfaces {
                out.extend_from_slice(&index.to_be_bytes());
            }

            out.extend_from_slice(&(fields.len() as u16).to_be_bytes());
            for (name, descriptor) in fields {
                out.extend_from_slice(&0x0002u16.to_be_bytes());
                out.extend_from_slice(&name.to_be_bytes());
                out.extend_from_slice(&descriptor.to_be_bytes());
                out.extend_from_slice(&0u16.to_be_bytes());
            }

            out.extend_from_slice(&(methods.len() as u16).to_be_bytes());
            for (name, descriptor, code_length) in methods {
                out.extend_from_slice(&0x0001u16.to_be_bytes());
                out.extend_from_slice(&name.to_be_bytes());
                out.extend_from_slice(&descriptor.to_be_bytes());
                match code_length {
                    Some(code_length) => {
                        out.extend_from_slice(&1u16.to_be_bytes());
                        out.extend_from_slice(&code_name.to_be_bytes());
                        out.extend_from_slice(&(12 + code_length).to_be_bytes());
                        out.extend_from_slice(&1u16.to_be_bytes()); // max_stack
                        out.extend_from_slice(&1u16.to_be_bytes()); // max_locals
                        out.extend_from_slice(&code_length.to_be_bytes());
                        out.extend(std::iter::repeat(0xB1u8).take(code_length as usize));
                        out.extend_from_slice(&0u16.to_be_bytes()); // exception table
                        out.extend_from_slice(&0u16.to_be_bytes()); // attributes
                    }
                    None => out.extend_from_slice(&0u16.to_be_bytes()),
                }
            }

            out.extend_from_slice(&0u16.to_be_bytes());
            out
        }
    }

    struct Pool {
        bytes: Vec<u8>,
        next: u16,
        utf8: HashMap<String, u16>,
    }

    impl Pool {
        fn new() -> Self {
            Self { bytes: Vec::new(), next: 1, utf8: HashMap::new() }
        }

        fn push(&mut self, tag: u8, body: &[u8], slots: u16) -> u16 {
            let index = self.next;
            self.bytes.push(tag);
            self.bytes.extend_from_slice(body);
            self.next += slots;
            index
        }

        fn utf8(&mut self, value: &str) -> u16 {
            if let Some(index) = self.utf8.get(value) {
                return *index;
            }
            let encoded = cesu8::to_java_cesu8(value);
            let mut body = (encoded.len() as u16).to_be_bytes().to_vec();
            body.extend_from_slice(&encoded);
            let index = self.push(1, &body, 1);
            self.utf8.insert(value.to_string(), index);
            index
        }

        fn class(&mut self, name: &str) -> u16 {
            let name = self.utf8(name);
            self.push(7, &name.to_be_bytes(), 1)
        }

        fn method_type(&mut self, descriptor: &str) -> u16 {
            let descriptor = self.utf8(descriptor);
            self.push(16, &descriptor.to_be_bytes(), 1)
        }

        fn long(&mut self, value: i64) -> u16 {
            self.push(5, &value.to_be_bytes(), 2)
        }
    }
}
