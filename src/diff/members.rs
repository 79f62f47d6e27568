//! Field, method, property, event and accessor comparers.
//!
//! Members are compared through their substituted signatures
//! ([`ModuleGraph::member_signature`]), so a member inherited through a constructed base type
//! (`class Derived : Base<int>`) is compared with the base's type arguments filled in.

use std::{collections::HashSet, rc::Rc};

use tracing::trace;

use crate::{
    diff::{
        attributes, Comparable, Comparer, CompareOptions, DeclarationDiff, DeclarationRef,
        DiffNode, NodeKind,
    },
    metadata::{
        graph::{
            entities::{
                Accessor, EventDefinition, FieldDefinition, MethodDefinition, MethodParameter,
                PropertyDefinition, TypeDefinition,
            },
            flags::{MethodSemanticsAttributes, ParamAttributes},
            resolver::ModuleSet,
            MemberSignature, ModuleGraph,
        },
        signatures::MAX_RECURSION_DEPTH,
        token::Token,
        typesystem::{GenericArguments, TypeExpr},
    },
    Result,
};

/// Operators whose overloads differ only in their return type
const CONVERSION_OPERATORS: [&str; 2] = ["op_Implicit", "op_Explicit"];

/// A member as seen from the type being compared
pub(crate) struct Member<'a, T> {
    graph: &'a ModuleGraph,
    definition: &'a T,
    arguments: GenericArguments,
}

impl<'a, T> Member<'a, T> {
    fn new(graph: &'a ModuleGraph, definition: &'a T, arguments: &GenericArguments) -> Self {
        Member {
            graph,
            definition,
            arguments: arguments.clone(),
        }
    }

    fn signature(&self, token: Token) -> Result<Rc<MemberSignature>> {
        self.graph.member_signature(token, &self.arguments)
    }
}

fn type_list(types: &[TypeExpr]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn key_list(types: &[TypeExpr]) -> String {
    types
        .iter()
        .map(|ty| ty.erase_parameter_names().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn member_type_diff(old: &TypeExpr, new: &TypeExpr, diffs: &mut Vec<DeclarationDiff>) {
    if old != new {
        diffs.push(DeclarationDiff::MemberTypeChanged {
            old: old.to_string(),
            new: new.to_string(),
        });
    }
}

/// Accessibility and modifier differences shared by methods and accessors
fn method_modifier_diffs(
    old: &MethodDefinition,
    new: &MethodDefinition,
    diffs: &mut Vec<DeclarationDiff>,
) {
    if old.visibility() != new.visibility() {
        diffs.push(DeclarationDiff::VisibilityChanged {
            old: old.visibility(),
            new: new.visibility(),
        });
    }
    if old.is_static() != new.is_static() {
        diffs.push(DeclarationDiff::StaticChanged {
            old: old.is_static(),
        });
    }
    if old.is_virtual() != new.is_virtual() {
        diffs.push(DeclarationDiff::VirtualChanged {
            old: old.is_virtual(),
        });
    }
    if old.is_abstract() != new.is_abstract() {
        diffs.push(DeclarationDiff::AbstractChanged {
            old: old.is_abstract(),
        });
    }

    let sealed = |method: &MethodDefinition| method.is_virtual() && method.is_final();
    if sealed(old) != sealed(new) {
        diffs.push(DeclarationDiff::SealedChanged { old: sealed(old) });
    }
}

fn direction(flags: ParamAttributes) -> &'static str {
    let input = flags.contains(ParamAttributes::IN);
    let output = flags.contains(ParamAttributes::OUT);
    match (input, output) {
        (false, true) => "out",
        (true, false) => "in",
        _ => "ref",
    }
}

fn default_value(parameter: &MethodParameter<'_>) -> Option<String> {
    parameter
        .definition
        .and_then(|definition| definition.default.as_ref())
        .map(ToString::to_string)
}

fn parameter_diffs(
    old: &Member<'_, MethodDefinition>,
    new: &Member<'_, MethodDefinition>,
    diffs: &mut Vec<DeclarationDiff>,
) -> Result<()> {
    let old_parameters = old.graph.method_parameters(old.definition)?;
    let new_parameters = new.graph.method_parameters(new.definition)?;

    for (old_parameter, new_parameter) in old_parameters.iter().zip(&new_parameters) {
        if old_parameter.name() != new_parameter.name() {
            diffs.push(DeclarationDiff::ParameterNameChanged {
                position: new_parameter.position,
                old: old_parameter.name().to_string(),
                new: new_parameter.name().to_string(),
            });
        }

        if new_parameter.parameter_type.is_by_ref() {
            let old_direction = direction(old_parameter.flags());
            let new_direction = direction(new_parameter.flags());
            if old_direction != new_direction {
                diffs.push(DeclarationDiff::ParameterDirectionChanged {
                    parameter: new_parameter.name().to_string(),
                    old: old_direction,
                    new: new_direction,
                });
            }
        }

        let old_default = default_value(old_parameter);
        let new_default = default_value(new_parameter);
        if old_default != new_default {
            diffs.push(DeclarationDiff::DefaultValueChanged {
                parameter: new_parameter.name().to_string(),
                old: old_default,
                new: new_default,
            });
        }
    }

    Ok(())
}

impl Comparable for Member<'_, FieldDefinition> {
    const KIND: NodeKind = NodeKind::Field;

    fn key(&self) -> Result<String> {
        Ok(self.definition.name.clone())
    }

    fn display_name(&self) -> Result<String> {
        Ok(self.definition.name.clone())
    }

    fn declaration(&self) -> DeclarationRef {
        DeclarationRef::new(self.definition.token, self.definition.name.clone())
    }

    fn compare(&self, new: &Self, comparer: &Comparer<'_>) -> Result<Option<DiffNode>> {
        let old_field = self.definition;
        let new_field = new.definition;
        let mut diffs = Vec::new();

        member_type_diff(
            &self.signature(old_field.token)?.member_type,
            &new.signature(new_field.token)?.member_type,
            &mut diffs,
        );

        if old_field.visibility() != new_field.visibility() {
            diffs.push(DeclarationDiff::VisibilityChanged {
                old: old_field.visibility(),
                new: new_field.visibility(),
            });
        }
        if old_field.is_static() != new_field.is_static() {
            diffs.push(DeclarationDiff::StaticChanged {
                old: old_field.is_static(),
            });
        }
        if old_field.is_init_only() != new_field.is_init_only() {
            diffs.push(DeclarationDiff::ReadOnlyChanged {
                old: old_field.is_init_only(),
            });
        }

        if old_field.is_literal() || new_field.is_literal() {
            let display = |field: &FieldDefinition| {
                field
                    .constant
                    .as_ref()
                    .filter(|_| field.is_literal())
                    .map_or_else(|| "none".to_string(), ToString::to_string)
            };
            let (old_value, new_value) = (display(old_field), display(new_field));
            if old_value != new_value {
                diffs.push(DeclarationDiff::ConstantValueChanged {
                    old: old_value,
                    new: new_value,
                });
            }
        }

        diffs.extend(attributes::diffs(
            &old_field.custom_attributes,
            &new_field.custom_attributes,
            comparer.options(),
        ));

        Ok(DiffNode::modified(
            Self::KIND,
            new.display_name()?,
            self.declaration(),
            new.declaration(),
            diffs,
            Vec::new(),
        ))
    }
}

impl Comparable for Member<'_, MethodDefinition> {
    const KIND: NodeKind = NodeKind::Method;

    fn key(&self) -> Result<String> {
        let method = self.definition;
        let signature = self.signature(method.token)?;

        let mut key = format!(
            "{}`{}({})",
            method.name,
            method.signature.generic_param_count,
            key_list(&signature.parameters)
        );
        if CONVERSION_OPERATORS.contains(&method.name.as_str()) {
            key.push(':');
            key.push_str(&signature.member_type.erase_parameter_names().to_string());
        }
        Ok(key)
    }

    fn display_name(&self) -> Result<String> {
        let method = self.definition;
        let signature = self.signature(method.token)?;
        let generics = self.graph.generic_names(method.token)?;

        if generics.is_empty() {
            Ok(format!("{}({})", method.name, type_list(&signature.parameters)))
        } else {
            Ok(format!(
                "{}<{}>({})",
                method.name,
                generics.join(", "),
                type_list(&signature.parameters)
            ))
        }
    }

    fn declaration(&self) -> DeclarationRef {
        DeclarationRef::new(self.definition.token, self.definition.name.clone())
    }

    fn compare(&self, new: &Self, comparer: &Comparer<'_>) -> Result<Option<DiffNode>> {
        let old_method = self.definition;
        let new_method = new.definition;
        let mut diffs = Vec::new();

        member_type_diff(
            &self.signature(old_method.token)?.member_type,
            &new.signature(new_method.token)?.member_type,
            &mut diffs,
        );
        method_modifier_diffs(old_method, new_method, &mut diffs);
        parameter_diffs(self, new, &mut diffs)?;
        diffs.extend(attributes::diffs(
            &old_method.custom_attributes,
            &new_method.custom_attributes,
            comparer.options(),
        ));

        Ok(DiffNode::modified(
            Self::KIND,
            new.display_name()?,
            self.declaration(),
            new.declaration(),
            diffs,
            Vec::new(),
        ))
    }
}

/// A property or event accessor, paired by its role
pub(crate) struct AccessorEntry<'a> {
    semantics: MethodSemanticsAttributes,
    method: &'a MethodDefinition,
}

impl AccessorEntry<'_> {
    fn role(&self) -> &'static str {
        let semantics = self.semantics;
        if semantics.contains(MethodSemanticsAttributes::GETTER) {
            "get"
        } else if semantics.contains(MethodSemanticsAttributes::SETTER) {
            "set"
        } else if semantics.contains(MethodSemanticsAttributes::ADD_ON) {
            "add"
        } else if semantics.contains(MethodSemanticsAttributes::REMOVE_ON) {
            "remove"
        } else if semantics.contains(MethodSemanticsAttributes::FIRE) {
            "raise"
        } else {
            "other"
        }
    }
}

/// The API-visible accessors of a property or event
fn accessors<'a>(graph: &'a ModuleGraph, accessors: &[Accessor]) -> Result<Vec<AccessorEntry<'a>>> {
    let mut entries = Vec::with_capacity(accessors.len());
    for accessor in accessors {
        let method = graph.method(accessor.method)?;
        if method.visibility().is_api_visible() {
            entries.push(AccessorEntry {
                semantics: accessor.semantics,
                method,
            });
        }
    }
    Ok(entries)
}

impl Comparable for AccessorEntry<'_> {
    const KIND: NodeKind = NodeKind::Accessor;

    fn key(&self) -> Result<String> {
        match self.role() {
            "other" => Ok(format!("other:{}", self.method.name)),
            role => Ok(role.to_string()),
        }
    }

    fn display_name(&self) -> Result<String> {
        Ok(self.method.name.clone())
    }

    fn declaration(&self) -> DeclarationRef {
        DeclarationRef::new(self.method.token, self.method.name.clone())
    }

    fn compare(&self, new: &Self, comparer: &Comparer<'_>) -> Result<Option<DiffNode>> {
        let mut diffs = Vec::new();
        method_modifier_diffs(self.method, new.method, &mut diffs);
        diffs.extend(attributes::diffs(
            &self.method.custom_attributes,
            &new.method.custom_attributes,
            comparer.options(),
        ));

        Ok(DiffNode::modified(
            Self::KIND,
            new.display_name()?,
            self.declaration(),
            new.declaration(),
            diffs,
            Vec::new(),
        ))
    }
}

impl Comparable for Member<'_, PropertyDefinition> {
    const KIND: NodeKind = NodeKind::Property;

    fn key(&self) -> Result<String> {
        let signature = self.signature(self.definition.token)?;
        if signature.parameters.is_empty() {
            Ok(self.definition.name.clone())
        } else {
            Ok(format!(
                "{}[{}]",
                self.definition.name,
                key_list(&signature.parameters)
            ))
        }
    }

    fn display_name(&self) -> Result<String> {
        let signature = self.signature(self.definition.token)?;
        if signature.parameters.is_empty() {
            Ok(self.definition.name.clone())
        } else {
            Ok(format!(
                "{}[{}]",
                self.definition.name,
                type_list(&signature.parameters)
            ))
        }
    }

    fn declaration(&self) -> DeclarationRef {
        DeclarationRef::new(self.definition.token, self.definition.name.clone())
    }

    fn compare(&self, new: &Self, comparer: &Comparer<'_>) -> Result<Option<DiffNode>> {
        let old_property = self.definition;
        let new_property = new.definition;
        let mut diffs = Vec::new();

        member_type_diff(
            &self.signature(old_property.token)?.member_type,
            &new.signature(new_property.token)?.member_type,
            &mut diffs,
        );
        if old_property.has_this != new_property.has_this {
            diffs.push(DeclarationDiff::StaticChanged {
                old: !old_property.has_this,
            });
        }
        diffs.extend(attributes::diffs(
            &old_property.custom_attributes,
            &new_property.custom_attributes,
            comparer.options(),
        ));

        let children = comparer.compare_all(
            accessors(self.graph, &old_property.accessors)?,
            accessors(new.graph, &new_property.accessors)?,
        )?;

        Ok(DiffNode::modified(
            Self::KIND,
            new.display_name()?,
            self.declaration(),
            new.declaration(),
            diffs,
            children,
        ))
    }
}

impl Comparable for Member<'_, EventDefinition> {
    const KIND: NodeKind = NodeKind::Event;

    fn key(&self) -> Result<String> {
        Ok(self.definition.name.clone())
    }

    fn display_name(&self) -> Result<String> {
        Ok(self.definition.name.clone())
    }

    fn declaration(&self) -> DeclarationRef {
        DeclarationRef::new(self.definition.token, self.definition.name.clone())
    }

    fn compare(&self, new: &Self, comparer: &Comparer<'_>) -> Result<Option<DiffNode>> {
        let old_event = self.definition;
        let new_event = new.definition;
        let mut diffs = Vec::new();

        member_type_diff(
            &self.signature(old_event.token)?.member_type,
            &new.signature(new_event.token)?.member_type,
            &mut diffs,
        );
        diffs.extend(attributes::diffs(
            &old_event.custom_attributes,
            &new_event.custom_attributes,
            comparer.options(),
        ));

        let children = comparer.compare_all(
            accessors(self.graph, &old_event.accessors)?,
            accessors(new.graph, &new_event.accessors)?,
        )?;

        Ok(DiffNode::modified(
            Self::KIND,
            new.display_name()?,
            self.declaration(),
            new.declaration(),
            diffs,
            children,
        ))
    }
}

/// The comparable members of one type
#[derive(Default)]
pub(crate) struct TypeMembers<'a> {
    pub fields: Vec<Member<'a, FieldDefinition>>,
    pub methods: Vec<Member<'a, MethodDefinition>>,
    pub properties: Vec<Member<'a, PropertyDefinition>>,
    pub events: Vec<Member<'a, EventDefinition>>,
}

fn keys<T>(members: &[T]) -> Result<HashSet<String>>
where
    T: Comparable,
{
    members.iter().map(T::key).collect()
}

/// Push `member` unless an inherited member is hidden by one of `existing`
fn push_unless_hidden<T: Comparable>(
    members: &mut Vec<T>,
    member: T,
    existing: Option<&HashSet<String>>,
) -> Result<()> {
    if let Some(existing) = existing {
        if existing.contains(&member.key()?) {
            return Ok(());
        }
    }
    members.push(member);
    Ok(())
}

impl<'a> TypeMembers<'a> {
    /// The API-visible, non-ignored members of `ty`, and with `include_inherited_members` those
    /// of its ancestors that it does not hide
    pub(crate) fn collect(
        set: &'a ModuleSet,
        graph: &'a ModuleGraph,
        ty: &'a TypeDefinition,
        options: &CompareOptions,
    ) -> Result<Self> {
        let qualified = ty.full_name();
        let mut members = TypeMembers::default();
        members.add(graph, ty, &GenericArguments::default(), &qualified, options, false)?;

        if options.include_inherited_members {
            for (graph, ancestor, arguments) in ancestors(set, ty) {
                members.add(graph, ancestor, &arguments, &qualified, options, true)?;
            }
        }

        Ok(members)
    }

    fn add(
        &mut self,
        graph: &'a ModuleGraph,
        ty: &'a TypeDefinition,
        arguments: &GenericArguments,
        qualified: &str,
        options: &CompareOptions,
        inherited: bool,
    ) -> Result<()> {
        let ignored = |name: &str| {
            let member = format!("{qualified}.{name}");
            let ignored = options.is_ignored(&member);
            if ignored {
                trace!(%member, "ignoring member");
            }
            ignored
        };

        let existing_fields = if inherited { Some(keys(&self.fields)?) } else { None };
        let existing_methods = if inherited { Some(keys(&self.methods)?) } else { None };
        let existing_properties = if inherited { Some(keys(&self.properties)?) } else { None };
        let existing_events = if inherited { Some(keys(&self.events)?) } else { None };

        let mut accessor_methods = HashSet::new();

        for token in &ty.properties {
            let property = graph.property(*token)?;
            accessor_methods.extend(property.accessors.iter().map(|accessor| accessor.method));
            if !accessors(graph, &property.accessors)?.is_empty() && !ignored(&property.name) {
                push_unless_hidden(
                    &mut self.properties,
                    Member::new(graph, property, arguments),
                    existing_properties.as_ref(),
                )?;
            }
        }

        for token in &ty.events {
            let event = graph.event(*token)?;
            accessor_methods.extend(event.accessors.iter().map(|accessor| accessor.method));
            if !accessors(graph, &event.accessors)?.is_empty() && !ignored(&event.name) {
                push_unless_hidden(
                    &mut self.events,
                    Member::new(graph, event, arguments),
                    existing_events.as_ref(),
                )?;
            }
        }

        for token in &ty.fields {
            let field = graph.field(*token)?;
            if field.visibility().is_api_visible() && !ignored(&field.name) {
                push_unless_hidden(
                    &mut self.fields,
                    Member::new(graph, field, arguments),
                    existing_fields.as_ref(),
                )?;
            }
        }

        for token in &ty.methods {
            let method = graph.method(*token)?;
            if accessor_methods.contains(&method.token)
                || !method.visibility().is_api_visible()
                || (inherited && method.is_constructor())
                || ignored(&method.name)
            {
                continue;
            }
            push_unless_hidden(
                &mut self.methods,
                Member::new(graph, method, arguments),
                existing_methods.as_ref(),
            )?;
        }

        Ok(())
    }
}

/// Base classes of a class, or all base interfaces of an interface, nearest first, each with
/// the arguments that express its generic parameters in terms of `ty`'s. Ancestors that cannot
/// be found (unresolved references) end that branch of the walk.
fn ancestors<'a>(
    set: &'a ModuleSet,
    ty: &'a TypeDefinition,
) -> Vec<(&'a ModuleGraph, &'a TypeDefinition, GenericArguments)> {
    let next = |definition: &TypeDefinition| -> Vec<TypeExpr> {
        if ty.is_interface() {
            definition.interfaces.iter().rev().cloned().collect()
        } else {
            definition.base_type.iter().cloned().collect()
        }
    };

    let mut result = Vec::new();
    let mut visited = HashSet::new();
    let mut pending: Vec<(TypeExpr, GenericArguments)> = next(ty)
        .into_iter()
        .map(|expr| (expr, GenericArguments::default()))
        .collect();

    while let Some((expr, outer)) = pending.pop() {
        if result.len() >= MAX_RECURSION_DEPTH {
            trace!(ty = %ty.identity, "ancestor walk truncated");
            break;
        }

        let (named, arguments) = match &expr {
            TypeExpr::Named(named) => (named, GenericArguments::default()),
            TypeExpr::GenericInstance {
                definition,
                arguments,
            } => match definition.named() {
                Some(named) => (named, GenericArguments::for_type(arguments.clone()).then(&outer)),
                None => continue,
            },
            _ => continue,
        };

        if !visited.insert(named.clone()) {
            continue;
        }
        let Some((graph, definition)) = set.find_type(named) else {
            continue;
        };

        for parent in next(definition) {
            pending.push((parent, arguments.clone()));
        }
        result.push((graph, definition, arguments));
    }

    result
}
