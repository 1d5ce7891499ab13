//! `usdz-scene` decodes Pixar's binary crate (`.usdc`) format and USDZ archives
//! into a navigable scene graph of meshes, transforms, and materials.

use std::io;

use anyhow::Result;

pub mod scene;
pub mod sdf;
pub mod usdc;
pub mod usdz;

pub use half::f16;
pub use scene::Scene;
pub use usdz::Usdz;

/// Decode a crate file and build its scene graph.
pub fn decode(reader: impl io::Read + io::Seek) -> Result<Scene> {
    let data = usdc::CrateData::open(reader, usdc::ReadOptions::default())?;
    scene::build(&data)
}
