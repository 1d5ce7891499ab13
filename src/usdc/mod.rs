//! `usdc` file format support.

use std::{collections::HashMap, io};

use anyhow::Result;
use tracing::{debug, warn};

mod coding;
mod compress;
mod error;
mod fieldset;
mod file;
mod layout;
mod paths;
mod reader;
mod unpack;
mod version;

#[cfg(test)]
pub(crate) mod testing;

pub use error::Error;
pub use fieldset::LiveFieldSet;
pub use file::CrateFile;
pub use layout::*;
pub use paths::{Node, PathTable, PathTree, PathVisitor};
pub use reader::CrateReader;
pub use version::{version, Version};

use crate::sdf::{self, ChildrenKey, FieldKey, Value};

/// Options for [CrateData::open].
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    /// Run structural validation after the sections are decoded.
    pub safe: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions { safe: true }
    }
}

/// Spec with its fields unpacked.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct SpecData {
    /// Specifies the type of an object.
    pub ty: sdf::SpecType,
    /// Spec fields, in file order.
    pub fields: Vec<(String, Value)>,
}

impl SpecData {
    #[inline]
    pub fn field(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find_map(|(name, value)| (name == field).then_some(value))
    }

    /// `typeName` of a prim spec.
    pub fn type_name(&self) -> Option<&str> {
        self.field(FieldKey::TypeName.as_str()).and_then(Value::as_str)
    }

    pub fn prim_children(&self) -> &[String] {
        match self.field(ChildrenKey::PrimChildren.as_str()) {
            Some(Value::TokenVector(tokens)) => tokens,
            _ => &[],
        }
    }
}

/// Decoded crate file: the path tree plus a spec for each declared path.
#[derive(Default, Debug)]
pub struct CrateData {
    pub version: Version,
    /// All paths, by path index.
    pub paths: Vec<sdf::Path>,
    /// Tree position of each path, by path index.
    pub nodes: Vec<Node>,
    /// Specs keyed by path index.
    specs: HashMap<usize, SpecData>,
    lookup: HashMap<sdf::Path, usize>,
}

impl CrateData {
    pub fn open(reader: impl io::Read + io::Seek, options: ReadOptions) -> Result<Self> {
        let mut file = CrateFile::open(reader)?;

        if options.safe {
            file.validate()?;
        }

        let fieldsets = file.live_fieldsets()?;

        let mut specs = HashMap::with_capacity(file.specs.len());

        for spec in &file.specs {
            let fields = match fieldsets.get(&spec.fieldset_index) {
                Some(set) => set.fields.clone(),
                None => {
                    warn!(
                        "Spec for path {} refers to missing field set {}",
                        spec.path_index, spec.fieldset_index
                    );
                    Vec::new()
                }
            };

            let data = SpecData {
                ty: spec.spec_type,
                fields,
            };

            if specs.insert(spec.path_index, data).is_some() {
                warn!("Path {} has more than one spec, keeping the last one", spec.path_index);
            }
        }

        let paths = std::mem::take(&mut file.paths);
        let lookup = paths
            .iter()
            .enumerate()
            .map(|(index, path)| (path.clone(), index))
            .collect();

        debug!("Decoded {} paths, {} specs", paths.len(), specs.len());

        Ok(CrateData {
            version: file.version(),
            paths,
            nodes: std::mem::take(&mut file.nodes),
            specs,
            lookup,
        })
    }

    /// Path index of `path`.
    #[inline]
    pub fn path_index(&self, path: &sdf::Path) -> Option<usize> {
        self.lookup.get(path).copied()
    }

    /// Spec declared for a path index.
    #[inline]
    pub fn spec_at(&self, index: usize) -> Option<&SpecData> {
        self.specs.get(&index)
    }

    /// Retrieve a spec by path.
    #[inline]
    pub fn spec(&self, path: &sdf::Path) -> Option<&SpecData> {
        self.path_index(path).and_then(|index| self.spec_at(index))
    }

    /// Retrieve spec and field.
    #[inline]
    pub fn field(&self, path: &sdf::Path, field: &str) -> Option<&Value> {
        self.spec(path).and_then(|spec| spec.field(field))
    }

    #[inline]
    pub fn specs_iter(&self) -> impl Iterator<Item = &SpecData> {
        self.specs.values()
    }

    /// Index of the absolute root, the first path in the table.
    pub fn root(&self) -> Option<usize> {
        self.nodes.iter().position(|node| node.parent.is_none())
    }
}
