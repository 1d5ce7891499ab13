//! USDZ archive format reader.
//!
//! USDZ is a zero-compression, unencrypted ZIP archive holding a binary crate
//! file and the textures it refers to. Every entry's data must start at a
//! multiple of 64 bytes so the files can be mapped without extraction.

use std::{
    fs::File,
    io::{self, Cursor, Read},
    path::Path,
};

use anyhow::{ensure, Context, Result};
use tracing::debug;
use zip::ZipArchive;

use crate::{scene::Scene, usdc::Error};

/// Required alignment of entry data.
pub const ALIGNMENT: u64 = 64;

const TEXTURE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Decoded USDZ archive: every crate file plus raw texture files.
#[derive(Debug, Default)]
pub struct Usdz {
    /// Crate files in archive order, the first one is the main scene.
    scenes: Vec<(String, Scene)>,
    /// Texture files in archive order.
    textures: Vec<(String, Vec<u8>)>,
}

impl Usdz {
    /// Open a USDZ archive from a file path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open USDZ archive: {}", path.display()))?;

        Self::from_reader(file).with_context(|| format!("Failed to read USDZ archive: {}", path.display()))
    }

    /// Read an archive, decoding every `.usdc` entry.
    ///
    /// The first crate file becomes the main scene. Any crate file that fails to
    /// decode fails the whole archive.
    pub fn from_reader(reader: impl io::Read + io::Seek) -> Result<Self> {
        let mut archive = ZipArchive::new(reader).context("Failed to read ZIP archive")?;

        validate(&mut archive)?;

        let mut usdz = Usdz::default();

        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            let name = file.name().to_string();
            let extension = extension(&name);

            if extension == "usdc" {
                let mut buffer = Vec::new();
                file.read_to_end(&mut buffer)
                    .with_context(|| format!("Failed to read '{}' from archive", name))?;

                let scene =
                    crate::decode(Cursor::new(buffer)).with_context(|| format!("Failed to decode '{}'", name))?;

                debug!("Decoded crate file: {} ({} nodes)", name, scene.len());

                usdz.scenes.push((name, scene));
            } else if TEXTURE_EXTENSIONS.contains(&extension.as_str()) {
                let mut buffer = Vec::new();
                file.read_to_end(&mut buffer)
                    .with_context(|| format!("Failed to read '{}' from archive", name))?;

                debug!("Extracted texture: {} ({} bytes)", name, buffer.len());

                usdz.textures.push((name, buffer));
            }
        }

        Ok(usdz)
    }

    /// Archive path of the main crate file.
    #[inline]
    pub fn main_file(&self) -> Option<&str> {
        self.scenes.first().map(|(name, _)| name.as_str())
    }

    /// The main scene.
    #[inline]
    pub fn scene(&self) -> Option<&Scene> {
        self.scenes.first().map(|(_, scene)| scene)
    }

    #[inline]
    pub fn into_scene(self) -> Option<Scene> {
        self.scenes.into_iter().next().map(|(_, scene)| scene)
    }

    /// Every decoded crate file as `(archive path, scene)`, main scene first.
    pub fn scenes(&self) -> impl Iterator<Item = (&str, &Scene)> {
        self.scenes.iter().map(|(name, scene)| (name.as_str(), scene))
    }

    /// Texture files as `(archive path, bytes)`.
    pub fn textures(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.textures.iter().map(|(name, data)| (name.as_str(), data.as_slice()))
    }

    /// Texture bytes for a path authored in the scene.
    ///
    /// Tries the path without leading slashes first, then any texture whose
    /// path ends with the same file name.
    pub fn find_texture(&self, path: &str) -> Option<&[u8]> {
        let clean = path.trim_start_matches('/');

        if let Some((_, data)) = self.textures.iter().find(|(name, _)| name == clean) {
            return Some(data);
        }

        let file_name = path.rsplit(['/', '\\']).next().unwrap_or_default();
        if file_name.is_empty() {
            return None;
        }

        self.textures
            .iter()
            .find(|(name, _)| name.ends_with(file_name))
            .map(|(_, data)| data.as_slice())
    }
}

/// Every entry's data must start at a multiple of [ALIGNMENT].
fn validate<R: io::Read + io::Seek>(archive: &mut ZipArchive<R>) -> Result<()> {
    for index in 0..archive.len() {
        let file = archive.by_index_raw(index)?;
        let offset = file.data_start();

        ensure!(
            offset % ALIGNMENT == 0,
            Error::format(format!(
                "Zip entry '{}' starts at offset {}, which is not a multiple of {} bytes",
                file.name(),
                offset,
                ALIGNMENT
            ))
        );

        debug!("[{}] {}: byte range ({}, {})", index, file.name(), offset, offset + file.compressed_size());
    }

    Ok(())
}

/// Lowercase extension of an archive path.
fn extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_lowercase()
}
