/// Fields pre-registered by Sdf that the scene reader looks at.
///
/// See <https://github.com/PixarAnimationStudios/OpenUSD/blob/release/pxr/usd/sdf/schema.h#L597>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKey {
    Active,
    Default,
    Documentation,
    Kind,
    Specifier,
    TargetPaths,
    TimeSamples,
    TypeName,
    Variability,
}

impl FieldKey {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKey::Active => "active",
            FieldKey::Default => "default",
            FieldKey::Documentation => "documentation",
            FieldKey::Kind => "kind",
            FieldKey::Specifier => "specifier",
            FieldKey::TargetPaths => "targetPaths",
            FieldKey::TimeSamples => "timeSamples",
            FieldKey::TypeName => "typeName",
            FieldKey::Variability => "variability",
        }
    }
}

/// See <https://github.com/PixarAnimationStudios/OpenUSD/blob/2864f3d04f396432f22ec5d6928fc37d34bb4c90/pxr/usd/sdf/schema.h#L652>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildrenKey {
    PrimChildren,
    PropertyChildren,
}

impl ChildrenKey {
    pub fn as_str(self) -> &'static str {
        match self {
            ChildrenKey::PrimChildren => "primChildren",
            ChildrenKey::PropertyChildren => "properties",
        }
    }
}
