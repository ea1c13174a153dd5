use crate::metadata::{attributes::GenericParamAttributes, typesystem::TypeRef};

/// A generic parameter declared by a type.
#[derive(Debug, Clone)]
pub struct GenericParameter {
    /// Position in the owner's parameter list
    pub number: u16,
    /// Variance and constraint flags
    pub attributes: GenericParamAttributes,
    /// Parameter name
    pub name: String,
    /// Type constraints
    pub constraints: Vec<TypeRef>,
}

impl GenericParameter {
    /// Creates an unconstrained, invariant parameter
    #[must_use]
    pub fn new(number: u16, name: impl Into<String>) -> Self {
        GenericParameter {
            number,
            attributes: GenericParamAttributes::empty(),
            name: name.into(),
            constraints: Vec::new(),
        }
    }
}
