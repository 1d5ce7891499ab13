//! Compressed path tree.
//!
//! The PATHS section stores the tree as three parallel arrays in depth-first
//! order: the output slot of each entry, its element token (negative for
//! properties) and a jump that tells where the next sibling and child are.
//!
//! See <https://github.com/PixarAnimationStudios/OpenUSD/blob/0b18ad3f840c24eb25e16b795a5b0821cf05126e/pxr/usd/usd/crateFile.cpp#L3760>

use anyhow::{ensure, Result};

use crate::sdf;

use super::Error;

/// Receives path entries in traversal order.
pub trait PathVisitor {
    /// Entry that lands in `slot`, under the `parent` slot (`None` for the root).
    fn visit(&mut self, parent: Option<usize>, slot: usize, element: i32) -> Result<()>;

    /// A sibling subtree starting at `position` is walked next, under `parent`.
    ///
    /// Sibling subtrees only share their parent, so they may be handed to
    /// separate workers as long as each writes its own slots.
    fn sibling_subtree(&mut self, _position: usize, _parent: Option<usize>) {}
}

/// The three decoded PATHS streams.
#[derive(Debug, Default, Clone)]
pub struct PathTable {
    pub path_indexes: Vec<i32>,
    pub element_tokens: Vec<i32>,
    pub jumps: Vec<i32>,
}

impl PathTable {
    pub fn new(path_indexes: Vec<i32>, element_tokens: Vec<i32>, jumps: Vec<i32>) -> Result<Self> {
        ensure!(
            path_indexes.len() == element_tokens.len() && path_indexes.len() == jumps.len(),
            Error::format(format!(
                "Path streams length mismatch: {} / {} / {}",
                path_indexes.len(),
                element_tokens.len(),
                jumps.len()
            ))
        );

        Ok(PathTable {
            path_indexes,
            element_tokens,
            jumps,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.path_indexes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.path_indexes.is_empty()
    }

    /// Walk the whole table from the root entry.
    pub fn walk(&self, visitor: &mut impl PathVisitor) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }

        self.walk_from(0, None, visitor)
    }

    /// Walk entries starting at `position` under the `parent` slot.
    pub fn walk_from(&self, mut position: usize, mut parent: Option<usize>, visitor: &mut impl PathVisitor) -> Result<()> {
        loop {
            let this_index = position;
            position += 1;

            ensure!(
                this_index < self.len(),
                Error::format(format!("Path entry {} is out of range ({})", this_index, self.len()))
            );

            let slot = usize::try_from(self.path_indexes[this_index])
                .ok()
                .filter(|slot| *slot < self.len())
                .ok_or_else(|| {
                    Error::format(format!(
                        "Invalid path index {} at entry {}",
                        self.path_indexes[this_index], this_index
                    ))
                })?;

            visitor.visit(parent, slot, self.element_tokens[this_index])?;

            let jump = self.jumps[this_index];
            let has_child = jump > 0 || jump == -1;
            let has_sibling = jump >= 0;

            if has_child {
                if has_sibling {
                    let sibling_index = this_index + jump as usize;

                    visitor.sibling_subtree(sibling_index, parent);
                    self.walk_from(sibling_index, parent, visitor)?;
                }

                // Have a child (may have also had a sibling).
                parent = Some(slot);
            }

            if !has_child && !has_sibling {
                break;
            }
        }

        Ok(())
    }
}

/// Tree position of a path.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Node {
    /// Parent node, `None` for the root.
    pub parent: Option<usize>,
    /// Child nodes (prims and properties) in traversal order.
    pub children: Vec<usize>,
}

/// Paths and nodes indexed by path index.
#[derive(Debug, Default, Clone)]
pub struct PathTree {
    pub paths: Vec<sdf::Path>,
    pub nodes: Vec<Node>,
}

impl PathTree {
    /// Reconstruct full paths and the node tree.
    pub fn build(table: &PathTable, tokens: &[String]) -> Result<Self> {
        let mut builder = TreeBuilder {
            tokens,
            paths: vec![None; table.len()],
            nodes: vec![Node::default(); table.len()],
        };

        table.walk(&mut builder)?;

        let paths = builder
            .paths
            .into_iter()
            .enumerate()
            .map(|(slot, path)| path.ok_or_else(|| Error::format(format!("Path index {slot} is never assigned"))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PathTree {
            paths,
            nodes: builder.nodes,
        })
    }

    /// Child of `node` whose local name is `name`.
    pub fn child(&self, node: usize, name: &str) -> Option<usize> {
        self.nodes
            .get(node)?
            .children
            .iter()
            .copied()
            .find(|child| self.paths[*child].name() == name)
    }
}

struct TreeBuilder<'a> {
    tokens: &'a [String],
    paths: Vec<Option<sdf::Path>>,
    nodes: Vec<Node>,
}

impl PathVisitor for TreeBuilder<'_> {
    fn visit(&mut self, parent: Option<usize>, slot: usize, element: i32) -> Result<()> {
        ensure!(
            self.paths[slot].is_none(),
            Error::format(format!("Path index {slot} is assigned twice"))
        );

        let Some(parent) = parent else {
            tracing::trace!("path[{slot}] = /");

            self.paths[slot] = Some(sdf::Path::abs_root());
            return Ok(());
        };

        let token_index = element.unsigned_abs() as usize;
        let token = self.tokens.get(token_index).ok_or_else(|| {
            Error::format(format!(
                "Path element token {} is out of range ({})",
                token_index,
                self.tokens.len()
            ))
        })?;

        let parent_path = self.paths[parent]
            .as_ref()
            .ok_or_else(|| Error::format(format!("Parent path {parent} is not built yet")))?;

        let path = if element < 0 {
            parent_path.append_property(token)
        } else {
            parent_path.append_element(token)
        }
        .map_err(|err| Error::format(format!("{err:#}")))?;

        tracing::trace!("path[{slot}] = {path}");

        self.paths[slot] = Some(path);
        self.nodes[slot].parent = Some(parent);
        self.nodes[parent].children.push(slot);

        Ok(())
    }
}
