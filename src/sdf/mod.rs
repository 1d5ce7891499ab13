//! Scene description foundations.

use strum::{Display, EnumCount, FromRepr};

mod path;
pub mod schema;
mod value;

pub use path::{path, Path};
pub use schema::{ChildrenKey, FieldKey};
pub use value::Value;

/// An enum that specifies the type of an object.
/// Objects are entities that have fields and are addressable by path.
#[repr(u32)]
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, EnumCount, Display)]
pub enum SpecType {
    // The unknown type has a value of 0 so that SdfSpecType() is unknown.
    #[default]
    Unknown = 0,

    // Real concrete types
    Attribute = 1,
    Connection = 2,
    Expression = 3,
    Mapper = 4,
    MapperArg = 5,
    Prim = 6,
    PseudoRoot = 7,
    Relationship = 8,
    RelationshipTarget = 9,
    Variant = 10,
    VariantSet = 11,
}

/// How a prim spec contributes to the composed prim.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Display)]
pub enum Specifier {
    Def = 0,
    Over = 1,
    Class = 2,
}

/// Whether a spec may be edited from other layers.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Display)]
pub enum Permission {
    Public = 0,
    Private = 1,
}

/// Whether an attribute may vary over time.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Display)]
pub enum Variability {
    Varying = 0,
    Uniform = 1,
}
