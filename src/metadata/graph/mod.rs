//! Declaration graph of one module.
//!
//! [`ModuleGraph`] turns the rows of a loaded [`Metadata`] into declaration entities: types,
//! fields, methods, parameters, properties, events, generic parameters and assembly references.
//! Every entity is built the first time its token is requested and memoized in a per-table arena
//! of once-cells, so repeated resolutions of a token return the same object.
//!
//! # Architecture
//!
//! - [`entities`] - the entity types, plain data with tokens for children
//! - [`flags`] - attribute flag sets and [`flags::Visibility`]
//! - [`resolver`] - cross-module resolution: [`resolver::AssemblyResolver`],
//!   [`resolver::AssemblyPathCache`] and [`resolver::ModuleSet`]
//!
//! Signature blobs are decoded with [`crate::metadata::signatures`] and resolved into
//! [`TypeExpr`] trees while an entity is built. Generic parameter occurrences carry the names
//! declared by the enclosing type or method, for display.
//!
//! # Example
//!
//! ```rust,no_run
//! use cildiff::metadata::graph::ModuleGraph;
//! use std::path::Path;
//!
//! let graph = ModuleGraph::from_file(Path::new("MyLibrary.dll"))?;
//! for ty in graph.type_definitions()? {
//!     println!("{} ({} methods)", ty.full_name(), ty.methods.len());
//! }
//! # Ok::<(), cildiff::Error>(())
//! ```

pub mod entities;
pub mod flags;
mod indices;
pub mod resolver;

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    path::Path,
    rc::Rc,
};

use once_cell::unsync::OnceCell;
use sha1::{Digest, Sha1};
use tracing::{debug, trace};

use crate::{
    metadata::{
        graph::{
            entities::{
                AssemblyDefinition, AssemblyName, AssemblyReference, AssemblyVersion,
                CustomAttribute, Entity, EventDefinition, FieldDefinition,
                GenericParameterDefinition, MethodDefinition, MethodParameter, MethodSignature,
                ModuleDefinition, ParameterDefinition, PropertyDefinition, TypeDefinition,
            },
            flags::{
                FieldAttributes, GenericParamAttributes, MethodAttributes, ParamAttributes,
                TypeAttributes,
            },
            indices::OwnerIndex,
        },
        signatures::{
            parse_field_signature, parse_method_signature, parse_property_signature,
            parse_type_spec_signature, TypeSignature,
        },
        tables::{
            AssemblyRaw, AssemblyRefRaw, EventRaw, FieldRaw, GenericParamRaw, MemberRefRaw,
            MethodDefRaw, ModuleRaw, ParamRaw, PropertyRaw, RowReadable, TableId, TypeDefRaw,
            TypeRefRaw, TypeSpecRaw,
        },
        token::Token,
        typesystem::{
            ConstantValue, FunctionSignature, GenericArguments, NamedType, PrimitiveKind, TypeExpr,
        },
        Metadata,
    },
    Error, Result,
};

/// `AssemblyFlags.PublicKey`: the blob holds the full key rather than its token
const ASSEMBLY_FLAG_PUBLIC_KEY: u32 = 0x0001;

/// The type of a member after generic substitution
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberSignature {
    /// Field type, method return type, property type or event delegate type
    pub member_type: TypeExpr,
    /// Method or indexer parameter types
    pub parameters: Vec<TypeExpr>,
}

/// Names of the generic parameters in scope while resolving a signature
#[derive(Debug, Clone, Default)]
struct GenericContext {
    type_parameters: Vec<String>,
    method_parameters: Vec<String>,
}

impl GenericContext {
    /// Arguments that replace each parameter by a named occurrence of itself
    fn arguments(&self) -> GenericArguments {
        GenericArguments {
            type_arguments: self
                .type_parameters
                .iter()
                .enumerate()
                .map(|(i, name)| TypeExpr::type_parameter(position(i), name))
                .collect(),
            method_arguments: self
                .method_parameters
                .iter()
                .enumerate()
                .map(|(i, name)| TypeExpr::method_parameter(position(i), name))
                .collect(),
        }
    }
}

fn position(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

fn cells<T>(count: u32) -> Vec<OnceCell<T>> {
    (0..count).map(|_| OnceCell::new()).collect()
}

fn type_def_token(rid: u32) -> Token {
    Token::from_parts(TableId::TypeDef as u8, rid)
}

/// The public key token of a full public key: the last eight bytes of its SHA-1, reversed
#[must_use]
pub fn public_key_token(public_key: &[u8]) -> [u8; 8] {
    let digest = Sha1::digest(public_key);
    let mut token = [0u8; 8];
    for (target, source) in token.iter_mut().zip(digest.iter().rev()) {
        *target = *source;
    }
    token
}

/// A primitive spelled as a reference to its `System` type becomes the primitive itself
fn named_or_primitive(named: NamedType) -> TypeExpr {
    if named.namespace == "System" && named.declaring.is_none() {
        if let Some(kind) = PrimitiveKind::from_system_name(&named.name) {
            return TypeExpr::Primitive(kind);
        }
    }
    TypeExpr::Named(named)
}

/// Per-module arena of resolved declarations
pub struct ModuleGraph {
    metadata: Metadata,
    assembly_name: String,
    index: OnceCell<OwnerIndex>,
    in_progress: RefCell<HashSet<(usize, Token)>>,
    type_names: Vec<OnceCell<NamedType>>,
    type_ref_names: Vec<OnceCell<NamedType>>,
    type_specs: Vec<OnceCell<TypeExpr>>,
    types: Vec<OnceCell<TypeDefinition>>,
    fields: Vec<OnceCell<FieldDefinition>>,
    methods: Vec<OnceCell<MethodDefinition>>,
    params: Vec<OnceCell<ParameterDefinition>>,
    properties: Vec<OnceCell<PropertyDefinition>>,
    events: Vec<OnceCell<EventDefinition>>,
    generic_params: Vec<OnceCell<GenericParameterDefinition>>,
    assembly_refs: Vec<OnceCell<AssemblyReference>>,
    assembly: OnceCell<Option<AssemblyDefinition>>,
    module: OnceCell<ModuleDefinition>,
    types_by_name: OnceCell<HashMap<NamedType, Token>>,
    substitutions: RefCell<HashMap<(Token, GenericArguments, String), Rc<MemberSignature>>>,
}

impl ModuleGraph {
    /// Load the image at `path` and prepare its graph.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be read, or a parse error for malformed images.
    pub fn from_file(path: &Path) -> Result<ModuleGraph> {
        Self::new(Metadata::from_file(path)?)
    }

    /// Prepare the graph of an in-memory image.
    ///
    /// # Errors
    /// Returns a parse error for malformed images.
    pub fn from_mem(data: Vec<u8>) -> Result<ModuleGraph> {
        Self::new(Metadata::from_mem(data)?)
    }

    /// Prepare the graph of loaded metadata. Entities are built lazily.
    ///
    /// # Errors
    /// Returns a decoding error if the `Assembly` or `Module` row is damaged.
    pub fn new(metadata: Metadata) -> Result<ModuleGraph> {
        let header = metadata.tables_header();
        let rows = |id: TableId| header.row_count(id);

        let assembly_name = match metadata.table::<AssemblyRaw>()? {
            Some(table) => metadata.strings().get(table.get(1)?.name as usize)?.to_string(),
            None => match metadata.table::<ModuleRaw>()? {
                Some(table) => {
                    let name = metadata.strings().get(table.get(1)?.name as usize)?;
                    Path::new(name)
                        .file_stem()
                        .and_then(|stem| stem.to_str())
                        .unwrap_or(name)
                        .to_string()
                }
                None => String::new(),
            },
        };

        debug!(
            assembly = %assembly_name,
            types = rows(TableId::TypeDef),
            methods = rows(TableId::MethodDef),
            fields = rows(TableId::Field),
            "prepared module graph"
        );

        Ok(ModuleGraph {
            assembly_name,
            index: OnceCell::new(),
            in_progress: RefCell::new(HashSet::new()),
            type_names: cells(rows(TableId::TypeDef)),
            type_ref_names: cells(rows(TableId::TypeRef)),
            type_specs: cells(rows(TableId::TypeSpec)),
            types: cells(rows(TableId::TypeDef)),
            fields: cells(rows(TableId::Field)),
            methods: cells(rows(TableId::MethodDef)),
            params: cells(rows(TableId::Param)),
            properties: cells(rows(TableId::Property)),
            events: cells(rows(TableId::Event)),
            generic_params: cells(rows(TableId::GenericParam)),
            assembly_refs: cells(rows(TableId::AssemblyRef)),
            assembly: OnceCell::new(),
            module: OnceCell::new(),
            types_by_name: OnceCell::new(),
            substitutions: RefCell::new(HashMap::new()),
            metadata,
        })
    }

    /// The underlying metadata
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Simple name of the assembly this module belongs to
    #[must_use]
    pub fn assembly_name(&self) -> &str {
        &self.assembly_name
    }

    fn index(&self) -> Result<&OwnerIndex> {
        self.index.get_or_try_init(|| OwnerIndex::build(&self.metadata))
    }

    fn row<T: RowReadable>(&self, rid: u32) -> Result<T> {
        match self.metadata.table::<T>()? {
            Some(table) => table.get(rid),
            None => Err(Error::UnresolvedToken(Token::from_parts(
                T::TABLE_ID as u8,
                rid,
            ))),
        }
    }

    fn string(&self, index: u32) -> Result<String> {
        Ok(self.metadata.strings().get(index as usize)?.to_string())
    }

    fn blob(&self, index: u32) -> Result<&[u8]> {
        self.metadata.blobs().get(index as usize)
    }

    /// The cell of `token` in `cells`, which hold the rows of `table`
    fn slot<'a, T>(cells: &'a [OnceCell<T>], token: Token, table: TableId) -> Result<&'a OnceCell<T>> {
        if token.table() != table as u8 || token.row() == 0 {
            return Err(Error::UnresolvedToken(token));
        }

        cells
            .get(token.row() as usize - 1)
            .ok_or(Error::UnresolvedToken(token))
    }

    /// Initialize `cell` for `token` once, rejecting cyclic references back into the same cell.
    ///
    /// Several arenas are indexed by the same token (a `TypeDef` has a name cell and an entity
    /// cell), so the guard is keyed by the cell itself.
    fn memoized<'a, T>(
        &self,
        cell: &'a OnceCell<T>,
        token: Token,
        init: impl FnOnce() -> Result<T>,
    ) -> Result<&'a T> {
        if let Some(value) = cell.get() {
            return Ok(value);
        }

        let key = (std::ptr::from_ref(cell) as usize, token);
        if !self.in_progress.borrow_mut().insert(key) {
            return Err(malformed_error!("Cyclic reference through {}", token));
        }

        let result = cell.get_or_try_init(init);
        self.in_progress.borrow_mut().remove(&key);
        result
    }

    /// Resolve a token to its entity
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedToken`] for tokens of tables without entities or rows that do
    /// not exist, and a decoding error for damaged rows.
    pub fn resolve(&self, token: Token) -> Result<Entity<'_>> {
        match TableId::from_u8(token.table()) {
            Some(TableId::Assembly) if token.row() == 1 => match self.assembly()? {
                Some(assembly) => Ok(Entity::Assembly(assembly)),
                None => Err(Error::UnresolvedToken(token)),
            },
            Some(TableId::Module) if token.row() == 1 => Ok(Entity::Module(self.module()?)),
            Some(TableId::AssemblyRef) => {
                Ok(Entity::AssemblyReference(self.assembly_reference(token)?))
            }
            Some(TableId::TypeDef) => Ok(Entity::Type(self.type_definition(token)?)),
            Some(TableId::TypeRef) => Ok(Entity::TypeReference(self.type_ref_name(token)?)),
            Some(TableId::TypeSpec) => Ok(Entity::TypeSpecification(self.type_spec(token)?)),
            Some(TableId::Field) => Ok(Entity::Field(self.field(token)?)),
            Some(TableId::MethodDef) => Ok(Entity::Method(self.method(token)?)),
            Some(TableId::Param) => Ok(Entity::Parameter(self.parameter(token)?)),
            Some(TableId::Property) => Ok(Entity::Property(self.property(token)?)),
            Some(TableId::Event) => Ok(Entity::Event(self.event(token)?)),
            Some(TableId::GenericParam) => {
                Ok(Entity::GenericParameter(self.generic_parameter(token)?))
            }
            _ => Err(Error::UnresolvedToken(token)),
        }
    }

    /// The `Assembly` row, `None` for a module without a manifest
    ///
    /// # Errors
    /// Returns a decoding error for a damaged row.
    pub fn assembly(&self) -> Result<Option<&AssemblyDefinition>> {
        let assembly = self.assembly.get_or_try_init(|| -> Result<Option<AssemblyDefinition>> {
            let Some(table) = self.metadata.table::<AssemblyRaw>()? else {
                return Ok(None);
            };
            let row = table.get(1)?;
            let public_key = self.blob(row.public_key)?.to_vec();

            Ok(Some(AssemblyDefinition {
                token: row.token,
                identity: AssemblyName {
                    name: self.string(row.name)?,
                    version: AssemblyVersion::new(
                        row.major_version,
                        row.minor_version,
                        row.build_number,
                        row.revision_number,
                    ),
                    culture: self.string(row.culture)?,
                    public_key_token: (!public_key.is_empty())
                        .then(|| public_key_token(&public_key)),
                },
                flags: row.flags,
                public_key,
                custom_attributes: self.custom_attributes(row.token)?,
            }))
        })?;

        Ok(assembly.as_ref())
    }

    /// The `Module` row
    ///
    /// # Errors
    /// Returns a decoding error for a missing or damaged row.
    pub fn module(&self) -> Result<&ModuleDefinition> {
        self.module.get_or_try_init(|| -> Result<ModuleDefinition> {
            let row = self.row::<ModuleRaw>(1)?;
            let mvid = if row.mvid == 0 {
                uguid::Guid::ZERO
            } else {
                self.metadata.guids().get(row.mvid as usize)?
            };

            Ok(ModuleDefinition {
                token: row.token,
                name: self.string(row.name)?,
                mvid,
            })
        })
    }

    /// An `AssemblyRef` row
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedToken`] for a missing row, or a decoding error.
    pub fn assembly_reference(&self, token: Token) -> Result<&AssemblyReference> {
        let cell = Self::slot(&self.assembly_refs, token, TableId::AssemblyRef)?;
        self.memoized(cell, token, || {
            let row = self.row::<AssemblyRefRaw>(token.row())?;
            let key = self.blob(row.public_key_or_token)?;
            let public_key_token = if key.is_empty() {
                None
            } else if row.flags & ASSEMBLY_FLAG_PUBLIC_KEY != 0 {
                Some(public_key_token(key))
            } else {
                <[u8; 8]>::try_from(key).ok()
            };

            Ok(AssemblyReference {
                token,
                identity: AssemblyName {
                    name: self.string(row.name)?,
                    version: AssemblyVersion::new(
                        row.major_version,
                        row.minor_version,
                        row.build_number,
                        row.revision_number,
                    ),
                    culture: self.string(row.culture)?,
                    public_key_token,
                },
                flags: row.flags,
            })
        })
    }

    /// All `AssemblyRef` rows
    ///
    /// # Errors
    /// Returns a decoding error for a damaged row.
    pub fn assembly_references(&self) -> Result<Vec<&AssemblyReference>> {
        (1..=position(self.assembly_refs.len()))
            .map(|rid| self.assembly_reference(Token::from_parts(TableId::AssemblyRef as u8, rid)))
            .collect()
    }

    /// The identity of a `TypeDef` row as seen from signatures
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedToken`] for a missing row, or a decoding error.
    pub fn type_name(&self, token: Token) -> Result<&NamedType> {
        let cell = Self::slot(&self.type_names, token, TableId::TypeDef)?;
        self.memoized(cell, token, || {
            let row = self.row::<TypeDefRaw>(token.row())?;
            let name = self.string(row.type_name)?;

            match self.index()?.enclosing.get(&token.row()) {
                Some(enclosing) => Ok(NamedType::nested(
                    self.type_name(type_def_token(*enclosing))?.clone(),
                    &name,
                )),
                None => Ok(NamedType::new(
                    &self.string(row.type_namespace)?,
                    &name,
                    &self.assembly_name,
                )),
            }
        })
    }

    /// The identity of a `TypeRef` row
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedToken`] for a missing row, or a decoding error.
    pub fn type_ref_name(&self, token: Token) -> Result<&NamedType> {
        let cell = Self::slot(&self.type_ref_names, token, TableId::TypeRef)?;
        self.memoized(cell, token, || {
            let row = self.row::<TypeRefRaw>(token.row())?;
            let name = self.string(row.type_name)?;
            let namespace = self.string(row.type_namespace)?;
            let scope = row.resolution_scope;

            if scope.is_null() {
                return Ok(NamedType::new(&namespace, &name, &self.assembly_name));
            }

            match scope.tag {
                TableId::TypeRef => Ok(NamedType::nested(
                    self.type_ref_name(scope.token)?.clone(),
                    &name,
                )),
                TableId::AssemblyRef => Ok(NamedType::new(
                    &namespace,
                    &name,
                    &self.assembly_reference(scope.token)?.identity.name,
                )),
                _ => Ok(NamedType::new(&namespace, &name, &self.assembly_name)),
            }
        })
    }

    /// The type expression of a `TypeSpec` row. Generic parameters in it are unnamed.
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedToken`] for a missing row, or a decoding error.
    pub fn type_spec(&self, token: Token) -> Result<&TypeExpr> {
        let cell = Self::slot(&self.type_specs, token, TableId::TypeSpec)?;
        self.memoized(cell, token, || {
            let row = self.row::<TypeSpecRaw>(token.row())?;
            let signature = parse_type_spec_signature(self.blob(row.signature)?)?;
            self.type_expr(&signature.base, &GenericContext::default())
        })
    }

    /// Declared names of the generic parameters of a `TypeDef` or `MethodDef`, in order
    ///
    /// # Errors
    /// Returns a decoding error for a damaged `GenericParam` row.
    pub fn generic_names(&self, owner: Token) -> Result<Vec<String>> {
        self.generic_parameter_tokens(owner)?
            .into_iter()
            .map(|token| Ok(self.generic_parameter(token)?.name.clone()))
            .collect()
    }

    fn generic_parameter_tokens(&self, owner: Token) -> Result<Vec<Token>> {
        Ok(self
            .index()?
            .generic_params
            .get(&owner)
            .map(|rids| {
                rids.iter()
                    .map(|rid| Token::from_parts(TableId::GenericParam as u8, *rid))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn type_context(&self, type_token: Token) -> Result<GenericContext> {
        Ok(GenericContext {
            type_parameters: self.generic_names(type_token)?,
            method_parameters: Vec::new(),
        })
    }

    /// Resolve a `TypeDef`, `TypeRef` or `TypeSpec` token to a type expression
    fn token_type_expr(&self, token: Token, context: &GenericContext) -> Result<TypeExpr> {
        match TableId::from_u8(token.table()) {
            Some(TableId::TypeDef) => Ok(named_or_primitive(self.type_name(token)?.clone())),
            Some(TableId::TypeRef) => Ok(named_or_primitive(self.type_ref_name(token)?.clone())),
            Some(TableId::TypeSpec) => Ok(self.type_spec(token)?.substitute(&context.arguments())),
            _ => Err(malformed_error!("Token {} does not reference a type", token)),
        }
    }

    /// Resolve a decoded signature type
    fn type_expr(&self, signature: &TypeSignature, context: &GenericContext) -> Result<TypeExpr> {
        if let Some(kind) = PrimitiveKind::from_signature(signature) {
            return Ok(TypeExpr::Primitive(kind));
        }

        Ok(match signature {
            TypeSignature::Ptr(inner) => TypeExpr::Pointer(Box::new(self.type_expr(inner, context)?)),
            TypeSignature::ByRef(inner) => TypeExpr::ByRef(Box::new(self.type_expr(inner, context)?)),
            TypeSignature::Pinned(inner) => self.type_expr(inner, context)?,
            TypeSignature::SzArray(inner) => TypeExpr::sz_array(self.type_expr(inner, context)?),
            TypeSignature::Array(array) => TypeExpr::Array {
                element: Box::new(self.type_expr(&array.base, context)?),
                rank: array.rank,
                dimensions: array.dimensions.clone(),
            },
            TypeSignature::Class(token) | TypeSignature::ValueType(token) => {
                self.token_type_expr(*token, context)?
            }
            TypeSignature::GenericParamType(number) => TypeExpr::type_parameter(
                *number,
                context
                    .type_parameters
                    .get(*number as usize)
                    .map_or("", String::as_str),
            ),
            TypeSignature::GenericParamMethod(number) => TypeExpr::method_parameter(
                *number,
                context
                    .method_parameters
                    .get(*number as usize)
                    .map_or("", String::as_str),
            ),
            TypeSignature::GenericInst(definition, arguments) => TypeExpr::GenericInstance {
                definition: Box::new(self.type_expr(definition, context)?),
                arguments: arguments
                    .iter()
                    .map(|argument| self.type_expr(argument, context))
                    .collect::<Result<_>>()?,
            },
            TypeSignature::FnPtr(method) => TypeExpr::FunctionPointer(Box::new(FunctionSignature {
                has_this: method.has_this,
                return_type: self.type_expr(&method.return_type.full_type(), context)?,
                parameters: method
                    .params
                    .iter()
                    .chain(&method.varargs)
                    .map(|param| self.type_expr(&param.full_type(), context))
                    .collect::<Result<_>>()?,
            })),
            TypeSignature::Modified(modifier, inner) => {
                let modifier_type = Box::new(self.token_type_expr(modifier.modifier, context)?);
                let element = Box::new(self.type_expr(inner, context)?);
                if modifier.required {
                    TypeExpr::RequiredModifier {
                        modifier: modifier_type,
                        element,
                    }
                } else {
                    TypeExpr::OptionalModifier {
                        modifier: modifier_type,
                        element,
                    }
                }
            }
            _ => return Err(malformed_error!("Unexpected type in signature - {:?}", signature)),
        })
    }

    /// The attributes applied to `parent`. Attributes whose type cannot be named are skipped.
    fn custom_attributes(&self, parent: Token) -> Result<Vec<CustomAttribute>> {
        let index = self.index()?;
        let Some(attributes) = index.attributes.get(&parent) else {
            return Ok(Vec::new());
        };

        let mut result = Vec::with_capacity(attributes.len());
        for (rid, constructor) in attributes {
            let owner = match constructor.tag {
                TableId::MethodDef => index
                    .method_owner
                    .get(&constructor.row)
                    .map(|owner| type_def_token(*owner)),
                TableId::MemberRef => Some(self.row::<MemberRefRaw>(constructor.row)?.class.token),
                _ => None,
            };

            let attribute_type = match owner.map(|token| (TableId::from_u8(token.table()), token)) {
                Some((Some(TableId::TypeDef), token)) => Some(self.type_name(token)?.clone()),
                Some((Some(TableId::TypeRef), token)) => Some(self.type_ref_name(token)?.clone()),
                Some((Some(TableId::TypeSpec), token)) => self.type_spec(token)?.named().cloned(),
                _ => None,
            };

            match attribute_type {
                Some(attribute_type) => result.push(CustomAttribute {
                    token: Token::from_parts(TableId::CustomAttribute as u8, *rid),
                    attribute_type,
                }),
                None => trace!(%parent, constructor = %constructor.token, "skipping attribute without a named type"),
            }
        }

        Ok(result)
    }

    fn constant(&self, parent: Token) -> Result<Option<ConstantValue>> {
        match self.index()?.constants.get(&parent) {
            Some((base, value)) => Ok(Some(ConstantValue::from_bytes(*base, self.blob(*value)?)?)),
            None => Ok(None),
        }
    }

    fn owner(map: &HashMap<u32, u32>, token: Token) -> Result<u32> {
        map.get(&token.row())
            .copied()
            .ok_or_else(|| malformed_error!("{} has no owning row", token))
    }

    /// A `TypeDef` row with its members
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedToken`] for a missing row, or a decoding error.
    pub fn type_definition(&self, token: Token) -> Result<&TypeDefinition> {
        let cell = Self::slot(&self.types, token, TableId::TypeDef)?;
        self.memoized(cell, token, || {
            let rid = token.row();
            let row = self.row::<TypeDefRaw>(rid)?;
            let index = self.index()?;
            let context = self.type_context(token)?;

            let base_type = if row.extends.is_null() {
                None
            } else {
                Some(self.token_type_expr(row.extends.token, &context)?)
            };

            let interfaces = index
                .interfaces
                .get(&rid)
                .map(|interfaces| {
                    interfaces
                        .iter()
                        .map(|interface| self.token_type_expr(interface.token, &context))
                        .collect::<Result<Vec<_>>>()
                })
                .transpose()?
                .unwrap_or_default();

            let tokens = |rids: Option<&Vec<u32>>, table: TableId| -> Vec<Token> {
                rids.map(|rids| {
                    rids.iter()
                        .map(|rid| Token::from_parts(table as u8, *rid))
                        .collect()
                })
                .unwrap_or_default()
            };

            Ok(TypeDefinition {
                token,
                flags: TypeAttributes::from_bits_retain(row.flags),
                identity: self.type_name(token)?.clone(),
                declaring_type: index.enclosing.get(&rid).map(|rid| type_def_token(*rid)),
                base_type,
                interfaces,
                generic_parameters: self.generic_parameter_tokens(token)?,
                fields: tokens(index.type_fields.get(rid as usize - 1), TableId::Field),
                methods: tokens(index.type_methods.get(rid as usize - 1), TableId::MethodDef),
                properties: tokens(index.type_properties.get(&rid), TableId::Property),
                events: tokens(index.type_events.get(&rid), TableId::Event),
                nested_types: tokens(index.nested.get(&rid), TableId::TypeDef),
                custom_attributes: self.custom_attributes(token)?,
            })
        })
    }

    /// All `TypeDef` rows, including nested types and the `<Module>` pseudo type
    ///
    /// # Errors
    /// Returns a decoding error for a damaged row.
    pub fn type_definitions(&self) -> Result<Vec<&TypeDefinition>> {
        (1..=position(self.types.len()))
            .map(|rid| self.type_definition(type_def_token(rid)))
            .collect()
    }

    /// Find the definition of a type in this module by its identity
    ///
    /// # Errors
    /// Returns a decoding error if a type name cannot be read.
    pub fn find_type(&self, identity: &NamedType) -> Result<Option<&TypeDefinition>> {
        let by_name = self.types_by_name.get_or_try_init(|| {
            (1..=position(self.type_names.len()))
                .map(|rid| -> Result<(NamedType, Token)> {
                    let token = type_def_token(rid);
                    Ok((self.type_name(token)?.clone(), token))
                })
                .collect::<Result<HashMap<_, _>>>()
        })?;

        match by_name.get(identity) {
            Some(token) => Ok(Some(self.type_definition(*token)?)),
            None => Ok(None),
        }
    }

    /// Returns true if the type and all its enclosing types are visible outside the assembly
    ///
    /// # Errors
    /// Returns a decoding error for a damaged enclosing type.
    pub fn is_api_visible(&self, ty: &TypeDefinition) -> Result<bool> {
        let mut current = ty;
        for _ in 0..crate::metadata::signatures::MAX_RECURSION_DEPTH {
            if !current.visibility().is_api_visible() {
                return Ok(false);
            }
            match current.declaring_type {
                Some(declaring) => current = self.type_definition(declaring)?,
                None => return Ok(true),
            }
        }
        Err(Error::RecursionLimit(crate::metadata::signatures::MAX_RECURSION_DEPTH))
    }

    /// A `Field` row
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedToken`] for a missing row, or a decoding error.
    pub fn field(&self, token: Token) -> Result<&FieldDefinition> {
        let cell = Self::slot(&self.fields, token, TableId::Field)?;
        self.memoized(cell, token, || {
            let row = self.row::<FieldRaw>(token.row())?;
            let declaring_type = type_def_token(Self::owner(&self.index()?.field_owner, token)?);
            let signature = parse_field_signature(self.blob(row.signature)?)?;
            let context = self.type_context(declaring_type)?;

            Ok(FieldDefinition {
                token,
                flags: FieldAttributes::from_bits_retain(row.flags),
                name: self.string(row.name)?,
                declaring_type,
                field_type: self.type_expr(
                    &signature.base.with_modifiers(&signature.modifiers),
                    &context,
                )?,
                constant: self.constant(token)?,
                custom_attributes: self.custom_attributes(token)?,
            })
        })
    }

    /// A `MethodDef` row with its resolved signature
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedToken`] for a missing row, or a decoding error.
    pub fn method(&self, token: Token) -> Result<&MethodDefinition> {
        let cell = Self::slot(&self.methods, token, TableId::MethodDef)?;
        self.memoized(cell, token, || {
            let rid = token.row();
            let row = self.row::<MethodDefRaw>(rid)?;
            let index = self.index()?;
            let declaring_type = type_def_token(Self::owner(&index.method_owner, token)?);
            let signature = parse_method_signature(self.blob(row.signature)?)?;

            let context = GenericContext {
                type_parameters: self.generic_names(declaring_type)?,
                method_parameters: self.generic_names(token)?,
            };

            let parameters = index
                .method_params
                .get(rid as usize - 1)
                .map(|rids| {
                    rids.iter()
                        .map(|rid| Token::from_parts(TableId::Param as u8, *rid))
                        .collect()
                })
                .unwrap_or_default();

            Ok(MethodDefinition {
                token,
                flags: MethodAttributes::from_bits_retain(row.flags),
                impl_flags: row.impl_flags,
                name: self.string(row.name)?,
                declaring_type,
                signature: MethodSignature {
                    has_this: signature.has_this,
                    generic_param_count: signature.generic_param_count,
                    return_type: self.type_expr(&signature.return_type.full_type(), &context)?,
                    parameters: signature
                        .params
                        .iter()
                        .map(|param| self.type_expr(&param.full_type(), &context))
                        .collect::<Result<_>>()?,
                },
                parameters,
                generic_parameters: self.generic_parameter_tokens(token)?,
                custom_attributes: self.custom_attributes(token)?,
            })
        })
    }

    /// The parameters of `method`: signature types joined with their `Param` rows
    ///
    /// # Errors
    /// Returns a decoding error for a damaged `Param` row.
    pub fn method_parameters<'a>(
        &'a self,
        method: &'a MethodDefinition,
    ) -> Result<Vec<MethodParameter<'a>>> {
        let definitions = method
            .parameters
            .iter()
            .map(|token| self.parameter(*token))
            .collect::<Result<Vec<_>>>()?;

        Ok(method
            .signature
            .parameters
            .iter()
            .enumerate()
            .map(|(position, parameter_type)| MethodParameter {
                position,
                parameter_type,
                definition: definitions
                    .iter()
                    .find(|definition| usize::from(definition.sequence) == position + 1)
                    .copied(),
            })
            .collect())
    }

    /// A `Param` row
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedToken`] for a missing row, or a decoding error.
    pub fn parameter(&self, token: Token) -> Result<&ParameterDefinition> {
        let cell = Self::slot(&self.params, token, TableId::Param)?;
        self.memoized(cell, token, || {
            let row = self.row::<ParamRaw>(token.row())?;

            Ok(ParameterDefinition {
                token,
                flags: ParamAttributes::from_bits_retain(row.flags),
                sequence: row.sequence,
                name: self.string(row.name)?,
                default: self.constant(token)?,
                custom_attributes: self.custom_attributes(token)?,
            })
        })
    }

    /// A `Property` row with its resolved signature and accessors
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedToken`] for a missing row, or a decoding error.
    pub fn property(&self, token: Token) -> Result<&PropertyDefinition> {
        let cell = Self::slot(&self.properties, token, TableId::Property)?;
        self.memoized(cell, token, || {
            let row = self.row::<PropertyRaw>(token.row())?;
            let index = self.index()?;
            let declaring_type = type_def_token(Self::owner(&index.property_owner, token)?);
            let signature = parse_property_signature(self.blob(row.signature)?)?;
            let context = self.type_context(declaring_type)?;

            Ok(PropertyDefinition {
                token,
                flags: row.flags,
                name: self.string(row.name)?,
                declaring_type,
                has_this: signature.has_this,
                property_type: self.type_expr(
                    &signature.base.with_modifiers(&signature.modifiers),
                    &context,
                )?,
                parameters: signature
                    .params
                    .iter()
                    .map(|param| self.type_expr(&param.full_type(), &context))
                    .collect::<Result<_>>()?,
                accessors: index.semantics.get(&token).cloned().unwrap_or_default(),
                custom_attributes: self.custom_attributes(token)?,
            })
        })
    }

    /// An `Event` row with its accessors
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedToken`] for a missing row, or a decoding error.
    pub fn event(&self, token: Token) -> Result<&EventDefinition> {
        let cell = Self::slot(&self.events, token, TableId::Event)?;
        self.memoized(cell, token, || {
            let row = self.row::<EventRaw>(token.row())?;
            let index = self.index()?;
            let declaring_type = type_def_token(Self::owner(&index.event_owner, token)?);
            let context = self.type_context(declaring_type)?;

            let event_type = if row.event_type.is_null() {
                None
            } else {
                Some(self.token_type_expr(row.event_type.token, &context)?)
            };

            Ok(EventDefinition {
                token,
                flags: row.flags,
                name: self.string(row.name)?,
                declaring_type,
                event_type,
                accessors: index.semantics.get(&token).cloned().unwrap_or_default(),
                custom_attributes: self.custom_attributes(token)?,
            })
        })
    }

    /// A `GenericParam` row
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedToken`] for a missing row, or a decoding error.
    pub fn generic_parameter(&self, token: Token) -> Result<&GenericParameterDefinition> {
        let cell = Self::slot(&self.generic_params, token, TableId::GenericParam)?;
        self.memoized(cell, token, || {
            let row = self.row::<GenericParamRaw>(token.row())?;

            Ok(GenericParameterDefinition {
                token,
                number: row.number,
                flags: GenericParamAttributes::from_bits_retain(row.flags),
                name: self.string(row.name)?,
                owner: row.owner.token,
            })
        })
    }

    /// The type of a field, method, property or event with `arguments` substituted for the
    /// generic parameters of its declaring type. Results are memoized per member and
    /// instantiation.
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedToken`] for a token that is not a member, or a decoding error.
    pub fn member_signature(
        &self,
        member: Token,
        arguments: &GenericArguments,
    ) -> Result<Rc<MemberSignature>> {
        // Generic parameters compare by position only, their names still show up in diff text
        let key = (member, arguments.clone(), format!("{arguments:?}"));
        if let Some(signature) = self.substitutions.borrow().get(&key) {
            return Ok(Rc::clone(signature));
        }

        let substitute_all = |types: &[TypeExpr]| -> Vec<TypeExpr> {
            types.iter().map(|ty| ty.substitute(arguments)).collect()
        };

        let signature = match TableId::from_u8(member.table()) {
            Some(TableId::Field) => MemberSignature {
                member_type: self.field(member)?.field_type.substitute(arguments),
                parameters: Vec::new(),
            },
            Some(TableId::MethodDef) => {
                let method = self.method(member)?;
                MemberSignature {
                    member_type: method.signature.return_type.substitute(arguments),
                    parameters: substitute_all(&method.signature.parameters),
                }
            }
            Some(TableId::Property) => {
                let property = self.property(member)?;
                MemberSignature {
                    member_type: property.property_type.substitute(arguments),
                    parameters: substitute_all(&property.parameters),
                }
            }
            Some(TableId::Event) => MemberSignature {
                member_type: self
                    .event(member)?
                    .event_type
                    .as_ref()
                    .map_or(TypeExpr::Primitive(PrimitiveKind::Void), |ty| {
                        ty.substitute(arguments)
                    }),
                parameters: Vec::new(),
            },
            _ => return Err(Error::UnresolvedToken(member)),
        };

        let signature = Rc::new(signature);
        self.substitutions
            .borrow_mut()
            .insert(key, Rc::clone(&signature));
        Ok(signature)
    }
}
