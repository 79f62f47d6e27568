use crate::metadata::typesystem::{
    FunctionSignature, GenericParameter, GenericParameterKind, TypeExpr,
};

/// The actual arguments of one instantiation site.
///
/// `type_arguments` replace `!n` occurrences, `method_arguments` replace `!!n` occurrences.
/// A parameter without a corresponding argument is left in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GenericArguments {
    /// Arguments for the type's generic parameters
    pub type_arguments: Vec<TypeExpr>,
    /// Arguments for the method's generic parameters
    pub method_arguments: Vec<TypeExpr>,
}

impl GenericArguments {
    /// Arguments for a constructed type
    #[must_use]
    pub fn for_type(type_arguments: Vec<TypeExpr>) -> GenericArguments {
        GenericArguments {
            type_arguments,
            method_arguments: Vec::new(),
        }
    }

    /// The arguments of a constructed base type or interface (`Base<int, T>`), or `None` for a
    /// type that is not a generic instance.
    #[must_use]
    pub fn from_instance(instance: &TypeExpr) -> Option<GenericArguments> {
        match instance {
            TypeExpr::GenericInstance { arguments, .. } => {
                Some(GenericArguments::for_type(arguments.clone()))
            }
            _ => None,
        }
    }

    /// Returns true if no parameter would be replaced
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.type_arguments.is_empty() && self.method_arguments.is_empty()
    }

    fn lookup(&self, parameter: &GenericParameter) -> Option<&TypeExpr> {
        let arguments = match parameter.kind {
            GenericParameterKind::Type => &self.type_arguments,
            GenericParameterKind::Method => &self.method_arguments,
        };
        arguments.get(parameter.position as usize)
    }

    /// Compose two instantiation steps: the result maps every parameter of the innermost
    /// declaration directly to the outermost arguments.
    ///
    /// For `class A<T> : B<List<T>>` and a use site `A<int>`, composing the arguments of the
    /// `B<List<T>>` edge with `A<int>` yields `B`'s `T0 := List<int>`.
    #[must_use]
    pub fn then(&self, outer: &GenericArguments) -> GenericArguments {
        GenericArguments {
            type_arguments: self
                .type_arguments
                .iter()
                .map(|argument| argument.substitute(outer))
                .collect(),
            method_arguments: self
                .method_arguments
                .iter()
                .map(|argument| argument.substitute(outer))
                .collect(),
        }
    }
}

impl TypeExpr {
    /// Replace every generic parameter occurrence by its argument in `arguments`.
    #[must_use]
    pub fn substitute(&self, arguments: &GenericArguments) -> TypeExpr {
        if arguments.is_empty() {
            return self.clone();
        }
        self.map_parameters(&|parameter| arguments.lookup(parameter).cloned())
    }

    /// The same type with the declared names of its generic parameters dropped, so that it
    /// displays as `!0` / `!!0`. Used for keys that must not change when a parameter is renamed.
    #[must_use]
    pub fn erase_parameter_names(&self) -> TypeExpr {
        self.map_parameters(&|parameter| {
            (!parameter.name.is_empty()).then(|| {
                TypeExpr::GenericParameter(GenericParameter {
                    kind: parameter.kind,
                    position: parameter.position,
                    name: String::new(),
                })
            })
        })
    }

    /// Rebuild the expression, replacing each parameter for which `replace` returns a type
    fn map_parameters(&self, replace: &dyn Fn(&GenericParameter) -> Option<TypeExpr>) -> TypeExpr {
        match self {
            TypeExpr::GenericParameter(parameter) => {
                replace(parameter).unwrap_or_else(|| self.clone())
            }
            TypeExpr::Primitive(_) | TypeExpr::Named(_) => self.clone(),
            TypeExpr::Array {
                element,
                rank,
                dimensions,
            } => TypeExpr::Array {
                element: Box::new(element.map_parameters(replace)),
                rank: *rank,
                dimensions: dimensions.clone(),
            },
            TypeExpr::Pointer(element) => TypeExpr::Pointer(Box::new(element.map_parameters(replace))),
            TypeExpr::ByRef(element) => TypeExpr::ByRef(Box::new(element.map_parameters(replace))),
            TypeExpr::GenericInstance {
                definition,
                arguments,
            } => TypeExpr::GenericInstance {
                definition: definition.clone(),
                arguments: arguments
                    .iter()
                    .map(|argument| argument.map_parameters(replace))
                    .collect(),
            },
            TypeExpr::RequiredModifier { modifier, element } => TypeExpr::RequiredModifier {
                modifier: modifier.clone(),
                element: Box::new(element.map_parameters(replace)),
            },
            TypeExpr::OptionalModifier { modifier, element } => TypeExpr::OptionalModifier {
                modifier: modifier.clone(),
                element: Box::new(element.map_parameters(replace)),
            },
            TypeExpr::FunctionPointer(signature) => {
                TypeExpr::FunctionPointer(Box::new(FunctionSignature {
                    has_this: signature.has_this,
                    return_type: signature.return_type.map_parameters(replace),
                    parameters: signature
                        .parameters
                        .iter()
                        .map(|parameter| parameter.map_parameters(replace))
                        .collect(),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::metadata::typesystem::{NamedType, PrimitiveKind};

    use super::*;

    fn int() -> TypeExpr {
        TypeExpr::Primitive(PrimitiveKind::I4)
    }

    fn list_of(argument: TypeExpr) -> TypeExpr {
        TypeExpr::GenericInstance {
            definition: Box::new(TypeExpr::Named(NamedType::new(
                "System.Collections.Generic",
                "List`1",
                "System.Collections",
            ))),
            arguments: vec![argument],
        }
    }

    #[test]
    fn replaces_type_parameters() {
        let arguments = GenericArguments::for_type(vec![int()]);

        assert_eq!(
            TypeExpr::type_parameter(0, "T").substitute(&arguments),
            int()
        );
        assert_eq!(
            list_of(TypeExpr::sz_array(TypeExpr::type_parameter(0, "T"))).substitute(&arguments),
            list_of(TypeExpr::sz_array(int()))
        );
    }

    #[test]
    fn keeps_unmatched_parameters() {
        let arguments = GenericArguments::for_type(vec![int()]);

        assert_eq!(
            TypeExpr::type_parameter(1, "U").substitute(&arguments),
            TypeExpr::type_parameter(1, "U")
        );
        assert_eq!(
            TypeExpr::method_parameter(0, "M").substitute(&arguments),
            TypeExpr::method_parameter(0, "M")
        );
    }

    #[test]
    fn substitutes_inside_function_pointers() {
        let pointer = TypeExpr::FunctionPointer(Box::new(FunctionSignature {
            has_this: false,
            return_type: TypeExpr::type_parameter(0, "T"),
            parameters: vec![TypeExpr::ByRef(Box::new(TypeExpr::type_parameter(0, "T")))],
        }));

        let TypeExpr::FunctionPointer(signature) =
            pointer.substitute(&GenericArguments::for_type(vec![int()]))
        else {
            panic!("expected a function pointer");
        };
        assert_eq!(signature.return_type, int());
        assert_eq!(signature.parameters[0], TypeExpr::ByRef(Box::new(int())));
    }

    #[test]
    fn composes_instantiation_steps() {
        // class A<T> : B<List<T>>, used as A<int>
        let edge = GenericArguments::for_type(vec![list_of(TypeExpr::type_parameter(0, "T"))]);
        let use_site = GenericArguments::for_type(vec![int()]);

        let composed = edge.then(&use_site);
        assert_eq!(composed.type_arguments, vec![list_of(int())]);
    }

    #[test]
    fn erases_names_for_keys() {
        let named = list_of(TypeExpr::method_parameter(0, "TItem"));
        assert_eq!(named.to_string(), "System.Collections.Generic.List<TItem>");
        assert_eq!(
            named.erase_parameter_names().to_string(),
            "System.Collections.Generic.List<!!0>"
        );
        assert_eq!(named.erase_parameter_names(), named);
    }

    #[test]
    fn arguments_of_instances() {
        assert_eq!(
            GenericArguments::from_instance(&list_of(int())),
            Some(GenericArguments::for_type(vec![int()]))
        );
        assert_eq!(GenericArguments::from_instance(&int()), None);
    }
}
