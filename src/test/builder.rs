//! Synthetic managed images.
//!
//! [`ModuleBuilder`] writes a complete PE32 image (DOS and PE headers, one `.text` section, CLI
//! header, metadata root, heaps and tables) from a declarative description of an assembly. The
//! tables are written through the same column schema and width rules the reader uses, so every
//! image is laid out exactly as the compiler would lay it out.
//!
//! ```rust,ignore
//! let image = ModuleBuilder::new("Acme")
//!     .with_type(TypeBuilder::class("Acme", "Widget").with_method(MethodBuilder::public("Paint")))
//!     .build();
//! ```

use std::collections::{BTreeMap, HashMap};

use strum::{EnumCount, IntoEnumIterator};

use crate::{
    file::parser::compress_uint,
    metadata::{
        signatures::{ELEMENT_TYPE, SIGNATURE_HEADER},
        tables::{CodedIndexType, Column, TableId, TableInfo},
    },
};

const TYPE_PUBLIC: u32 = 0x0000_0001;
const TYPE_INTERFACE: u32 = 0x0000_0020;
const TYPE_ABSTRACT: u32 = 0x0000_0080;
const TYPE_SEALED: u32 = 0x0000_0100;
const TYPE_BEFORE_FIELD_INIT: u32 = 0x0010_0000;

const MEMBER_PRIVATE: u16 = 0x0001;
const MEMBER_PUBLIC: u16 = 0x0006;
const FIELD_STATIC: u16 = 0x0010;
const FIELD_LITERAL: u16 = 0x0040;
const FIELD_SPECIAL_NAME: u16 = 0x0200;
const FIELD_RT_SPECIAL_NAME: u16 = 0x0400;
const FIELD_HAS_DEFAULT: u16 = 0x8000;
const METHOD_STATIC: u16 = 0x0010;
const METHOD_VIRTUAL: u16 = 0x0040;
const METHOD_HIDE_BY_SIG: u16 = 0x0080;
const METHOD_NEW_SLOT: u16 = 0x0100;
const METHOD_ABSTRACT: u16 = 0x0400;

const CORE_LIBRARY: &str = "System.Runtime";
const TEXT_RVA: u32 = 0x2000;
const FILE_ALIGNMENT: usize = 0x200;

/// A type in a signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SigType {
    Void,
    Bool,
    I4,
    I8,
    String,
    Object,
    /// A reference type by full name, see [`TypeBuilder::extends`] for the naming
    Class(String),
    /// A value type by full name, see [`TypeBuilder::extends`] for the naming
    ValueType(String),
    /// `!n`, a generic parameter of the enclosing type
    TypeParameter(u32),
}

#[derive(Debug, Clone)]
pub(crate) struct FieldBuilder {
    name: String,
    flags: u16,
    field_type: SigType,
    constant: Option<i32>,
}

impl FieldBuilder {
    pub fn public(name: &str, field_type: SigType) -> Self {
        FieldBuilder {
            name: name.to_string(),
            flags: MEMBER_PUBLIC,
            field_type,
            constant: None,
        }
    }

    pub fn private(name: &str, field_type: SigType) -> Self {
        FieldBuilder {
            flags: MEMBER_PRIVATE,
            ..FieldBuilder::public(name, field_type)
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MethodBuilder {
    name: String,
    flags: u16,
    return_type: SigType,
    params: Vec<(String, SigType)>,
}

impl MethodBuilder {
    pub fn public(name: &str) -> Self {
        MethodBuilder {
            name: name.to_string(),
            flags: MEMBER_PUBLIC | METHOD_HIDE_BY_SIG,
            return_type: SigType::Void,
            params: Vec::new(),
        }
    }

    pub fn private(name: &str) -> Self {
        MethodBuilder {
            flags: MEMBER_PRIVATE | METHOD_HIDE_BY_SIG,
            ..MethodBuilder::public(name)
        }
    }

    /// An interface method: public abstract virtual
    pub fn abstract_slot(name: &str) -> Self {
        MethodBuilder {
            flags: MEMBER_PUBLIC
                | METHOD_VIRTUAL
                | METHOD_HIDE_BY_SIG
                | METHOD_NEW_SLOT
                | METHOD_ABSTRACT,
            ..MethodBuilder::public(name)
        }
    }

    pub fn with_static(mut self) -> Self {
        self.flags |= METHOD_STATIC;
        self
    }

    pub fn with_virtual(mut self) -> Self {
        self.flags |= METHOD_VIRTUAL | METHOD_NEW_SLOT;
        self
    }

    pub fn returns(mut self, return_type: SigType) -> Self {
        self.return_type = return_type;
        self
    }

    pub fn with_param(mut self, name: &str, param_type: SigType) -> Self {
        self.params.push((name.to_string(), param_type));
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct TypeBuilder {
    namespace: String,
    name: String,
    flags: u32,
    extends: Option<String>,
    interfaces: Vec<String>,
    attributes: Vec<String>,
    fields: Vec<FieldBuilder>,
    methods: Vec<MethodBuilder>,
}

impl TypeBuilder {
    fn new(namespace: &str, name: &str, flags: u32, extends: Option<&str>) -> Self {
        TypeBuilder {
            namespace: namespace.to_string(),
            name: name.to_string(),
            flags,
            extends: extends.map(str::to_string),
            interfaces: Vec::new(),
            attributes: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// A public class deriving from `System.Object`
    pub fn class(namespace: &str, name: &str) -> Self {
        Self::new(
            namespace,
            name,
            TYPE_PUBLIC | TYPE_BEFORE_FIELD_INIT,
            Some("System.Object"),
        )
    }

    pub fn interface(namespace: &str, name: &str) -> Self {
        Self::new(
            namespace,
            name,
            TYPE_PUBLIC | TYPE_INTERFACE | TYPE_ABSTRACT,
            None,
        )
    }

    /// A public `int` enum with the given members
    pub fn enumeration(namespace: &str, name: &str, members: &[(&str, i32)]) -> Self {
        let mut builder = Self::new(
            namespace,
            name,
            TYPE_PUBLIC | TYPE_SEALED,
            Some("System.Enum"),
        );
        builder.fields.push(FieldBuilder {
            name: "value__".to_string(),
            flags: MEMBER_PUBLIC | FIELD_SPECIAL_NAME | FIELD_RT_SPECIAL_NAME,
            field_type: SigType::I4,
            constant: None,
        });

        let own_type = SigType::ValueType(format!("{namespace}.{name}"));
        for (member, value) in members {
            builder.fields.push(FieldBuilder {
                name: (*member).to_string(),
                flags: MEMBER_PUBLIC | FIELD_STATIC | FIELD_LITERAL | FIELD_HAS_DEFAULT,
                field_type: own_type.clone(),
                constant: Some(*value),
            });
        }
        builder
    }

    /// Make the type assembly-private
    pub fn internal(mut self) -> Self {
        self.flags &= !TYPE_PUBLIC;
        self
    }

    pub fn sealed(mut self) -> Self {
        self.flags |= TYPE_SEALED;
        self
    }

    /// Set the base type. A type of this module is named by its full name; `[Assembly]Ns.Name`
    /// names a type of a referenced assembly, any other name one of `System.Runtime`.
    pub fn extends(mut self, base: &str) -> Self {
        self.extends = Some(base.to_string());
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    /// Apply an attribute by type full name, through a `MemberRef` to its default constructor
    pub fn with_attribute(mut self, attribute: &str) -> Self {
        self.attributes.push(attribute.to_string());
        self
    }

    pub fn with_field(mut self, field: FieldBuilder) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_method(mut self, method: MethodBuilder) -> Self {
        self.methods.push(method);
        self
    }

    fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

/// Description of a single-module assembly
#[derive(Debug, Clone)]
pub(crate) struct ModuleBuilder {
    name: String,
    version: [u16; 4],
    references: Vec<(String, [u16; 4])>,
    types: Vec<TypeBuilder>,
}

impl ModuleBuilder {
    pub fn new(name: &str) -> Self {
        ModuleBuilder {
            name: name.to_string(),
            version: [1, 0, 0, 0],
            references: Vec::new(),
            types: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: [u16; 4]) -> Self {
        self.version = version;
        self
    }

    /// Reference another assembly, in addition to `System.Runtime`
    pub fn with_reference(mut self, name: &str, version: [u16; 4]) -> Self {
        self.references.push((name.to_string(), version));
        self
    }

    pub fn with_type(mut self, ty: TypeBuilder) -> Self {
        self.types.push(ty);
        self
    }

    /// Write the image
    pub fn build(&self) -> Vec<u8> {
        let metadata = MetadataWriter::new(self).write();
        write_pe(&metadata)
    }
}

/// Deduplicating `#Strings` heap
struct StringHeap {
    data: Vec<u8>,
    offsets: HashMap<String, u32>,
}

impl StringHeap {
    fn new() -> Self {
        StringHeap {
            data: vec![0],
            offsets: HashMap::new(),
        }
    }

    fn add(&mut self, value: &str) -> u32 {
        if value.is_empty() {
            return 0;
        }
        if let Some(offset) = self.offsets.get(value) {
            return *offset;
        }

        let offset = self.data.len() as u32;
        self.data.extend_from_slice(value.as_bytes());
        self.data.push(0);
        self.offsets.insert(value.to_string(), offset);
        offset
    }
}

struct BlobHeap {
    data: Vec<u8>,
}

impl BlobHeap {
    fn add(&mut self, value: &[u8]) -> u32 {
        if value.is_empty() {
            return 0;
        }

        let offset = self.data.len() as u32;
        compress_uint(value.len() as u32, &mut self.data).unwrap();
        self.data.extend_from_slice(value);
        offset
    }
}

fn coded(ci_type: CodedIndexType, table: TableId, row: u32) -> u32 {
    let tag = ci_type
        .tables()
        .iter()
        .position(|candidate| *candidate == Some(table))
        .unwrap() as u32;
    (row << ci_type.tag_bits()) | tag
}

fn split_name(full_name: &str) -> (&str, &str) {
    match full_name.rfind('.') {
        Some(dot) => (&full_name[..dot], &full_name[dot + 1..]),
        None => ("", full_name),
    }
}

fn pad4(data: &mut Vec<u8>) {
    while data.len() % 4 != 0 {
        data.push(0);
    }
}

struct MetadataWriter<'a> {
    module: &'a ModuleBuilder,
    strings: StringHeap,
    blobs: BlobHeap,
    rows: BTreeMap<TableId, Vec<Vec<u32>>>,
    type_defs: HashMap<String, u32>,
    type_refs: HashMap<String, u32>,
    member_refs: HashMap<String, u32>,
}

impl<'a> MetadataWriter<'a> {
    fn new(module: &'a ModuleBuilder) -> Self {
        // row 1 is <Module>
        let type_defs = module
            .types
            .iter()
            .enumerate()
            .map(|(i, ty)| (ty.full_name(), i as u32 + 2))
            .collect();

        MetadataWriter {
            module,
            strings: StringHeap::new(),
            blobs: BlobHeap { data: vec![0] },
            rows: BTreeMap::new(),
            type_defs,
            type_refs: HashMap::new(),
            member_refs: HashMap::new(),
        }
    }

    fn push(&mut self, table: TableId, row: Vec<u32>) -> u32 {
        let rows = self.rows.entry(table).or_default();
        rows.push(row);
        rows.len() as u32
    }

    fn row_count(&self, table: TableId) -> u32 {
        self.rows.get(&table).map_or(0, |rows| rows.len() as u32)
    }

    /// `TypeRef` by full name. A `[Assembly]` prefix scopes the reference to that assembly,
    /// otherwise it goes to `System.Runtime` (`AssemblyRef` row 1).
    fn type_ref(&mut self, full_name: &str) -> u32 {
        if let Some(rid) = self.type_refs.get(full_name) {
            return *rid;
        }

        let (scope, type_name) = match full_name
            .strip_prefix('[')
            .and_then(|rest| rest.split_once(']'))
        {
            Some((assembly, type_name)) => {
                let position = self
                    .module
                    .references
                    .iter()
                    .position(|(name, _)| name == assembly)
                    .unwrap();
                (position as u32 + 2, type_name)
            }
            None => (1, full_name),
        };

        let (namespace, name) = split_name(type_name);
        let row = vec![
            coded(CodedIndexType::ResolutionScope, TableId::AssemblyRef, scope),
            self.strings.add(name),
            self.strings.add(namespace),
        ];
        let rid = self.push(TableId::TypeRef, row);
        self.type_refs.insert(full_name.to_string(), rid);
        rid
    }

    /// `TypeDefOrRef` coded index of a type by full name
    fn type_def_or_ref(&mut self, full_name: &str) -> u32 {
        match self.type_defs.get(full_name) {
            Some(rid) => coded(CodedIndexType::TypeDefOrRef, TableId::TypeDef, *rid),
            None => {
                let rid = self.type_ref(full_name);
                coded(CodedIndexType::TypeDefOrRef, TableId::TypeRef, rid)
            }
        }
    }

    fn encode_type(&mut self, ty: &SigType, out: &mut Vec<u8>) {
        match ty {
            SigType::Void => out.push(ELEMENT_TYPE::VOID),
            SigType::Bool => out.push(ELEMENT_TYPE::BOOLEAN),
            SigType::I4 => out.push(ELEMENT_TYPE::I4),
            SigType::I8 => out.push(ELEMENT_TYPE::I8),
            SigType::String => out.push(ELEMENT_TYPE::STRING),
            SigType::Object => out.push(ELEMENT_TYPE::OBJECT),
            SigType::Class(name) | SigType::ValueType(name) => {
                out.push(if matches!(ty, SigType::Class(_)) {
                    ELEMENT_TYPE::CLASS
                } else {
                    ELEMENT_TYPE::VALUETYPE
                });
                let index = self.type_def_or_ref(name);
                compress_uint(index, out).unwrap();
            }
            SigType::TypeParameter(position) => {
                out.push(ELEMENT_TYPE::VAR);
                compress_uint(*position, out).unwrap();
            }
        }
    }

    fn field_signature(&mut self, ty: &SigType) -> u32 {
        let mut signature = vec![SIGNATURE_HEADER::FIELD];
        self.encode_type(ty, &mut signature);
        self.blobs.add(&signature)
    }

    fn method_signature(&mut self, method: &MethodBuilder) -> u32 {
        let mut signature = vec![if method.flags & METHOD_STATIC != 0 {
            0
        } else {
            SIGNATURE_HEADER::HAS_THIS
        }];
        compress_uint(method.params.len() as u32, &mut signature).unwrap();
        self.encode_type(&method.return_type, &mut signature);
        for (_, param_type) in &method.params {
            self.encode_type(param_type, &mut signature);
        }
        self.blobs.add(&signature)
    }

    /// `MemberRef` to the parameterless constructor of an attribute type
    fn attribute_constructor(&mut self, attribute: &str) -> u32 {
        if let Some(rid) = self.member_refs.get(attribute) {
            return *rid;
        }

        let class = self.type_ref(attribute);
        let row = vec![
            coded(CodedIndexType::MemberRefParent, TableId::TypeRef, class),
            self.strings.add(".ctor"),
            self.blobs.add(&[SIGNATURE_HEADER::HAS_THIS, 0x00, ELEMENT_TYPE::VOID]),
        ];
        let rid = self.push(TableId::MemberRef, row);
        self.member_refs.insert(attribute.to_string(), rid);
        rid
    }

    fn write_manifest(&mut self) {
        let module = self.module;
        let module_name = format!("{}.dll", module.name);
        let row = vec![0, self.strings.add(&module_name), 1, 0, 0];
        self.push(TableId::Module, row);

        let [major, minor, build, revision] = module.version;
        let row = vec![
            0x8004,
            u32::from(major),
            u32::from(minor),
            u32::from(build),
            u32::from(revision),
            0,
            0,
            self.strings.add(&module.name),
            0,
        ];
        self.push(TableId::Assembly, row);

        let core_token = self
            .blobs
            .add(&[0xB0, 0x3F, 0x5F, 0x7F, 0x11, 0xD5, 0x0A, 0x3A]);
        let references = std::iter::once((CORE_LIBRARY.to_string(), [8, 0, 0, 0]))
            .chain(module.references.iter().cloned());
        for (name, [major, minor, build, revision]) in references {
            let row = vec![
                u32::from(major),
                u32::from(minor),
                u32::from(build),
                u32::from(revision),
                0,
                core_token,
                self.strings.add(&name),
                0,
                0,
            ];
            self.push(TableId::AssemblyRef, row);
        }
    }

    fn write_types(&mut self) {
        let module = self.module;

        let row = vec![0, self.strings.add("<Module>"), 0, 0, 1, 1];
        self.push(TableId::TypeDef, row);

        for (index, ty) in module.types.iter().enumerate() {
            let type_rid = index as u32 + 2;
            let extends = match &ty.extends {
                Some(base) => self.type_def_or_ref(base),
                None => 0,
            };

            let row = vec![
                ty.flags,
                self.strings.add(&ty.name),
                self.strings.add(&ty.namespace),
                extends,
                self.row_count(TableId::Field) + 1,
                self.row_count(TableId::MethodDef) + 1,
            ];
            self.push(TableId::TypeDef, row);

            for field in &ty.fields {
                let row = vec![
                    u32::from(field.flags),
                    self.strings.add(&field.name),
                    self.field_signature(&field.field_type),
                ];
                let field_rid = self.push(TableId::Field, row);

                if let Some(value) = field.constant {
                    let row = vec![
                        u32::from(ELEMENT_TYPE::I4),
                        0,
                        coded(CodedIndexType::HasConstant, TableId::Field, field_rid),
                        self.blobs.add(&value.to_le_bytes()),
                    ];
                    self.push(TableId::Constant, row);
                }
            }

            for method in &ty.methods {
                let row = vec![
                    0,
                    0,
                    u32::from(method.flags),
                    self.strings.add(&method.name),
                    self.method_signature(method),
                    self.row_count(TableId::Param) + 1,
                ];
                self.push(TableId::MethodDef, row);

                for (sequence, (name, _)) in method.params.iter().enumerate() {
                    let row = vec![0, sequence as u32 + 1, self.strings.add(name)];
                    self.push(TableId::Param, row);
                }
            }

            for interface in &ty.interfaces {
                let row = vec![type_rid, self.type_def_or_ref(interface)];
                self.push(TableId::InterfaceImpl, row);
            }

            for attribute in &ty.attributes {
                let constructor = self.attribute_constructor(attribute);
                let row = vec![
                    coded(CodedIndexType::HasCustomAttribute, TableId::TypeDef, type_rid),
                    coded(CodedIndexType::CustomAttributeType, TableId::MemberRef, constructor),
                    self.blobs.add(&[0x01, 0x00, 0x00, 0x00]),
                ];
                self.push(TableId::CustomAttribute, row);
            }
        }
    }

    fn table_stream(&self) -> Vec<u8> {
        let mut counts = vec![0_u32; TableId::COUNT];
        let mut valid = 0_u64;
        for (table, rows) in &self.rows {
            counts[*table as usize] = rows.len() as u32;
            valid |= 1 << *table as u8;
        }
        let info = TableInfo::new(&counts, 0);

        let mut stream = Vec::new();
        stream.extend_from_slice(&0_u32.to_le_bytes());
        stream.extend_from_slice(&[2, 0, 0, 1]);
        stream.extend_from_slice(&valid.to_le_bytes());
        stream.extend_from_slice(&0x0000_1600_3301_FA00_u64.to_le_bytes());
        for table in TableId::iter() {
            if valid & (1 << table as u8) != 0 {
                stream.extend_from_slice(&counts[table as usize].to_le_bytes());
            }
        }

        for (table, rows) in &self.rows {
            for row in rows {
                for (column, value) in table.columns().iter().zip(row) {
                    match info.column_bytes(*column) {
                        1 => stream.push(*value as u8),
                        2 => stream.extend_from_slice(&(*value as u16).to_le_bytes()),
                        _ => stream.extend_from_slice(&value.to_le_bytes()),
                    }
                }
                debug_assert_eq!(row.len(), table.columns().len(), "{table:?}");
                debug_assert!(!table
                    .columns()
                    .iter()
                    .any(|column| matches!(column, Column::Fixed(bytes) if *bytes > 4)));
            }
        }

        pad4(&mut stream);
        stream
    }

    fn write(mut self) -> Vec<u8> {
        self.write_manifest();
        self.write_types();

        let mut strings = std::mem::take(&mut self.strings.data);
        pad4(&mut strings);
        let mut blobs = std::mem::take(&mut self.blobs.data);
        pad4(&mut blobs);
        let guids: Vec<u8> = (1..=16).collect();
        let user_strings = vec![0_u8; 4];
        let tables = self.table_stream();

        let streams: [(&str, &[u8]); 5] = [
            ("#~", &tables),
            ("#Strings", &strings),
            ("#US", &user_strings),
            ("#GUID", &guids),
            ("#Blob", &blobs),
        ];

        let version = b"v4.0.30319\0\0";
        let header_len = 16
            + version.len()
            + 4
            + streams
                .iter()
                .map(|(name, _)| 8 + ((name.len() + 1 + 3) & !3))
                .sum::<usize>();

        let mut root = Vec::new();
        root.extend_from_slice(b"BSJB");
        root.extend_from_slice(&1_u16.to_le_bytes());
        root.extend_from_slice(&1_u16.to_le_bytes());
        root.extend_from_slice(&0_u32.to_le_bytes());
        root.extend_from_slice(&(version.len() as u32).to_le_bytes());
        root.extend_from_slice(version);
        root.extend_from_slice(&0_u16.to_le_bytes());
        root.extend_from_slice(&(streams.len() as u16).to_le_bytes());

        let mut offset = header_len;
        for (name, data) in &streams {
            root.extend_from_slice(&(offset as u32).to_le_bytes());
            root.extend_from_slice(&(data.len() as u32).to_le_bytes());
            root.extend_from_slice(name.as_bytes());
            root.push(0);
            pad4(&mut root);
            offset += data.len();
        }
        debug_assert_eq!(root.len(), header_len);

        for (_, data) in &streams {
            root.extend_from_slice(data);
        }
        root
    }
}

/// Wrap `metadata` into a PE32 image with a single `.text` section holding the CLI header
/// followed by the metadata.
fn write_pe(metadata: &[u8]) -> Vec<u8> {
    const PE_OFFSET: usize = 0x80;
    const OPTIONAL_HEADER_SIZE: u16 = 224;
    const COR20_SIZE: u32 = 72;

    let mut section = Vec::new();
    section.extend_from_slice(&COR20_SIZE.to_le_bytes());
    section.extend_from_slice(&2_u16.to_le_bytes());
    section.extend_from_slice(&5_u16.to_le_bytes());
    section.extend_from_slice(&(TEXT_RVA + COR20_SIZE).to_le_bytes());
    section.extend_from_slice(&(metadata.len() as u32).to_le_bytes());
    // ILONLY
    section.extend_from_slice(&1_u32.to_le_bytes());
    section.resize(COR20_SIZE as usize, 0);
    section.extend_from_slice(metadata);

    let virtual_size = section.len() as u32;
    section.resize(section.len().div_ceil(FILE_ALIGNMENT) * FILE_ALIGNMENT, 0);

    let mut image = vec![0_u8; PE_OFFSET];
    image[0] = b'M';
    image[1] = b'Z';
    image[0x3C..0x40].copy_from_slice(&(PE_OFFSET as u32).to_le_bytes());

    image.extend_from_slice(b"PE\0\0");
    // COFF header: i386, one section
    image.extend_from_slice(&0x014C_u16.to_le_bytes());
    image.extend_from_slice(&1_u16.to_le_bytes());
    image.extend_from_slice(&[0; 12]);
    image.extend_from_slice(&OPTIONAL_HEADER_SIZE.to_le_bytes());
    image.extend_from_slice(&0x2102_u16.to_le_bytes());

    let mut optional = vec![0_u8; usize::from(OPTIONAL_HEADER_SIZE)];
    optional[0..2].copy_from_slice(&0x010B_u16.to_le_bytes());
    optional[28..32].copy_from_slice(&0x0040_0000_u32.to_le_bytes());
    optional[32..36].copy_from_slice(&0x2000_u32.to_le_bytes());
    optional[36..40].copy_from_slice(&(FILE_ALIGNMENT as u32).to_le_bytes());
    // IMAGE_SUBSYSTEM_WINDOWS_CUI
    optional[68..70].copy_from_slice(&3_u16.to_le_bytes());
    optional[92..96].copy_from_slice(&16_u32.to_le_bytes());
    // CLI header directory, slot 14
    let clr = 96 + 14 * 8;
    optional[clr..clr + 4].copy_from_slice(&TEXT_RVA.to_le_bytes());
    optional[clr + 4..clr + 8].copy_from_slice(&COR20_SIZE.to_le_bytes());
    image.extend_from_slice(&optional);

    let mut header = [0_u8; 40];
    header[0..5].copy_from_slice(b".text");
    header[8..12].copy_from_slice(&virtual_size.to_le_bytes());
    header[12..16].copy_from_slice(&TEXT_RVA.to_le_bytes());
    header[16..20].copy_from_slice(&(section.len() as u32).to_le_bytes());
    header[20..24].copy_from_slice(&(FILE_ALIGNMENT as u32).to_le_bytes());
    // CNT_CODE | MEM_EXECUTE | MEM_READ
    header[36..40].copy_from_slice(&0x6000_0020_u32.to_le_bytes());
    image.extend_from_slice(&header);

    image.resize(FILE_ALIGNMENT, 0);
    image.extend_from_slice(&section);
    image
}

#[cfg(test)]
mod tests {
    use crate::metadata::{graph::ModuleGraph, tables::TableId, Metadata};

    use super::*;

    #[test]
    fn image_loads() {
        let image = ModuleBuilder::new("Acme")
            .with_type(
                TypeBuilder::class("Acme", "Widget")
                    .with_field(FieldBuilder::public("Count", SigType::I4))
                    .with_method(MethodBuilder::public("Resize").with_param("width", SigType::I4)),
            )
            .build();

        let metadata = Metadata::from_mem(image.clone()).unwrap();
        assert_eq!(metadata.root().version, "v4.0.30319");
        let header = metadata.tables_header();
        assert_eq!(header.row_count(TableId::TypeDef), 2);
        assert_eq!(header.row_count(TableId::MethodDef), 1);
        assert_eq!(header.row_count(TableId::Param), 1);
        assert_eq!(header.row_count(TableId::AssemblyRef), 1);

        let graph = ModuleGraph::from_mem(image).unwrap();
        assert_eq!(graph.assembly_name(), "Acme");
        assert_eq!(graph.module().unwrap().name, "Acme.dll");

        let types = graph.type_definitions().unwrap();
        let widget = types
            .iter()
            .find(|ty| ty.full_name() == "Acme.Widget")
            .unwrap();
        assert_eq!(widget.fields.len(), 1);
        assert_eq!(widget.methods.len(), 1);
        assert_eq!(
            widget.base_type.as_ref().map(ToString::to_string).as_deref(),
            Some("object")
        );

        let method = graph.method(widget.methods[0]).unwrap();
        assert_eq!(method.name, "Resize");
        let parameters = graph.method_parameters(method).unwrap();
        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters[0].definition.unwrap().name, "width");
    }

    #[test]
    fn enum_constants() {
        let image = ModuleBuilder::new("Acme")
            .with_type(TypeBuilder::enumeration("Acme", "Color", &[("Red", 1), ("Green", 2)]))
            .build();

        let graph = ModuleGraph::from_mem(image).unwrap();
        let types = graph.type_definitions().unwrap();
        let color = types
            .iter()
            .find(|ty| ty.full_name() == "Acme.Color")
            .unwrap();
        assert!(color.is_enum());

        let values: Vec<_> = color
            .fields
            .iter()
            .map(|token| graph.field(*token).unwrap())
            .filter(|field| field.is_literal())
            .map(|field| (field.name.clone(), field.constant.as_ref().and_then(|c| c.as_i128())))
            .collect();
        assert_eq!(
            values,
            vec![("Red".to_string(), Some(1)), ("Green".to_string(), Some(2))]
        );
    }
}
