//! Dumps a binary USDC file or the scene of a USDZ archive.
//!
//! For `.usdc` files this prints the structural data, specs, and the fields that
//! belong to each spec. For `.usdz` archives it prints the reconstructed scene tree
//! and the textures found in the archive.
//!
//! # Usage:
//! ```bash
//! RUST_LOG=debug cargo run --example dump_usdc ./assets/teapot.usdz
//! ```

use std::{env, fs, path::Path};

use anyhow::{Context as _, Result};
use tracing_subscriber::EnvFilter;
use usdz_scene::{
    scene::{NodeId, Scene},
    usdc::{CrateFile, Version},
    Usdz,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = env::args().collect::<Vec<_>>();

    let path = args
        .get(1)
        .context("Missing path to usdc file, use: cargo run --example dump_usdc {PATH_TO_FILE}.usdc")?;

    let is_usdz = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("usdz"));

    if is_usdz {
        dump_usdz(path)
    } else {
        dump_usdc(path)
    }
}

fn dump_usdc(path: &str) -> Result<()> {
    let reader = fs::File::open(path).context("Failed to read crate file")?;
    let mut file = CrateFile::open(reader).context("Failed to read crate file")?;
    file.validate().context("Crate file failed validation")?;

    println!("-- Bootstrap header");
    println!("Magic: {:?}", file.bootstrap.ident);
    println!("Version: {}", Version::from(file.bootstrap));
    println!("TOC offset: {}", file.bootstrap.toc_offset);
    println!();

    println!("-- Sections:");
    for (index, section) in file.sections.iter().enumerate() {
        println!(
            "#{}:\t{} (start: {}, size: {})",
            index,
            section.name(),
            section.start,
            section.size
        );
    }
    println!();

    println!("-- Tokens:");
    for (index, token) in file.tokens.iter().enumerate() {
        println!("#{}:\t{}", index, token);
    }
    println!();

    println!("-- Fields: ");
    for (index, field) in file.fields.iter().enumerate() {
        let ty = field
            .value_rep
            .ty()
            .map(|ty| ty.to_string())
            .unwrap_or_else(|_| "?".to_string());
        println!("#{}:\t{} ({})", index, file.tokens[field.token_index], ty);
    }
    println!();

    println!("-- Paths: ");
    for (index, path) in file.paths.iter().enumerate() {
        println!("#{}:\t{}", index, path);
    }
    println!();

    let fieldsets = file.live_fieldsets().context("Unable to decode field sets")?;

    println!("-- Specs: ");
    for spec in file.specs.clone() {
        println!("{} ({})", file.paths[spec.path_index], spec.spec_type);

        match fieldsets.get(&spec.fieldset_index) {
            Some(fieldset) => {
                for (name, value) in fieldset.iter() {
                    println!("\t\t{} -> {:?}", name, value);
                }
            }
            None => println!("\t\t<missing field set {}>", spec.fieldset_index),
        }
    }
    println!();

    Ok(())
}

fn dump_usdz(path: &str) -> Result<()> {
    let usdz = Usdz::open(path)?;

    println!("-- Main file: {}", usdz.main_file().unwrap_or("<none>"));
    println!();

    println!("-- Crate files:");
    for (name, scene) in usdz.scenes() {
        println!("{}\t({} nodes)", name, scene.len());
    }
    println!();

    println!("-- Textures:");
    for (name, data) in usdz.textures() {
        println!("{}\t({} bytes)", name, data.len());
    }
    println!();

    if let Some(scene) = usdz.scene() {
        println!("-- Scene:");
        if !scene.is_empty() {
            print_node(scene, NodeId(0), 0);
        }
        println!();

        println!("-- Materials:");
        for material in scene.materials() {
            println!(
                "{}: diffuse {}, metallic {}, roughness {}",
                material.path, material.diffuse_color, material.metallic, material.roughness
            );
            for (role, texture) in &material.textures {
                println!("\t{}: {}", role, texture);
            }
        }
    }

    Ok(())
}

fn print_node(scene: &Scene, id: NodeId, depth: usize) {
    let node = scene.node(id);
    let name = if node.name.is_empty() { "/" } else { node.name.as_str() };

    let mut line = format!("{:indent$}{} [{}]", "", name, node.ty, indent = depth * 2);

    if let Some(mesh) = &node.mesh {
        line.push_str(&format!(
            " {} vertices, {} faces",
            mesh.vertices.len(),
            mesh.face_vertex_counts.len()
        ));

        if let Some(material) = &mesh.material_path {
            line.push_str(&format!(", material {}", material));
        }
    }

    println!("{}", line);

    for child in &node.children {
        print_node(scene, *child, depth + 1);
    }
}
