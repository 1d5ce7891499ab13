//! Test-only crate file writer.
//!
//! Produces small, well-formed `.usdc` buffers so readers can be tested without fixture files.

use std::collections::HashMap;

use bytemuck::bytes_of;
use glam::{Vec2, Vec3};

use crate::sdf::SpecType;

use super::{Bootstrap, Section, Type, ValueRep};

/// Integer-code `values` the way crate files store them.
pub fn encode_ints(values: &[i32]) -> Vec<u8> {
    if values.is_empty() {
        return Vec::new();
    }

    let mut prev = 0_i32;
    let deltas = values
        .iter()
        .map(|value| {
            let delta = value.wrapping_sub(prev);
            prev = *value;
            delta
        })
        .collect::<Vec<_>>();

    // Most frequent delta, smallest one on ties.
    let mut counts = HashMap::<i32, usize>::new();
    for delta in &deltas {
        *counts.entry(*delta).or_default() += 1;
    }
    let common = counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
        .map(|(delta, _)| *delta)
        .unwrap_or_default();

    let mut codes = vec![0_u8; (values.len() * 2 + 7) / 8];
    let mut ints = Vec::new();

    for (i, delta) in deltas.iter().enumerate() {
        let code = if *delta == common {
            0
        } else if let Ok(small) = i8::try_from(*delta) {
            ints.extend_from_slice(&small.to_le_bytes());
            1
        } else if let Ok(medium) = i16::try_from(*delta) {
            ints.extend_from_slice(&medium.to_le_bytes());
            2
        } else {
            ints.extend_from_slice(&delta.to_le_bytes());
            3
        };

        codes[i / 4] |= code << (2 * (i % 4));
    }

    let mut out = common.to_le_bytes().to_vec();
    out.extend(codes);
    out.extend(ints);
    out
}

/// Single block compressed buffer (chunk count byte + LZ4 block).
pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut out = vec![0];
    out.extend(lz4_flex::compress(data));
    out
}

/// `u64` compressed size followed by the compressed buffer.
pub fn write_compressed(out: &mut Vec<u8>, data: &[u8]) {
    let compressed = compress(data);
    out.extend_from_slice(&(compressed.len() as u64).to_le_bytes());
    out.extend(compressed);
}

pub fn write_encoded_ints(out: &mut Vec<u8>, values: &[i32]) {
    write_compressed(out, &encode_ints(values));
}

fn write_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

#[derive(Debug, Clone)]
struct PathNode {
    token: usize,
    property: bool,
    children: Vec<usize>,
}

/// Builds a crate file in memory.
///
/// Path node ids double as path indices, node 0 is the absolute root.
pub struct CrateWriter {
    pub ident: [u8; 8],
    pub version: [u8; 3],
    /// Declared token count when it must differ from the real one.
    pub token_count: Option<u64>,
    /// Additional sections written after the known ones.
    pub extra_sections: Vec<(String, Vec<u8>)>,

    tokens: Vec<String>,
    strings: Vec<u32>,
    fields: Vec<(u32, u64)>,
    fieldsets: Vec<i32>,
    nodes: Vec<PathNode>,
    specs: Vec<(u32, u32, u32)>,
    payload: Vec<u8>,
}

impl Default for CrateWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl CrateWriter {
    pub fn new() -> Self {
        CrateWriter {
            ident: *Bootstrap::IDENT,
            version: [0, 8, 0],
            token_count: None,
            extra_sections: Vec::new(),
            tokens: Vec::new(),
            strings: Vec::new(),
            fields: Vec::new(),
            fieldsets: Vec::new(),
            nodes: vec![PathNode {
                token: 0,
                property: false,
                children: Vec::new(),
            }],
            specs: Vec::new(),
            payload: Vec::new(),
        }
    }

    pub fn intern(&mut self, token: &str) -> usize {
        match self.tokens.iter().position(|t| t == token) {
            Some(index) => index,
            None => {
                self.tokens.push(token.to_string());
                self.tokens.len() - 1
            }
        }
    }

    /// Add a path node, returns its path index.
    pub fn add_path(&mut self, parent: usize, name: &str, property: bool) -> usize {
        let token = self.intern(name);
        assert!(!property || token != 0, "Property name can't use token 0");

        self.nodes.push(PathNode {
            token,
            property,
            children: Vec::new(),
        });

        let id = self.nodes.len() - 1;
        self.nodes[parent].children.push(id);
        id
    }

    pub fn add_field(&mut self, name: &str, rep: ValueRep) -> usize {
        let token = self.intern(name) as u32;
        self.fields.push((token, rep.0));
        self.fields.len() - 1
    }

    /// Add a `-1` terminated field set, returns its start index.
    pub fn add_fieldset(&mut self, fields: &[usize]) -> usize {
        let start = self.fieldsets.len();
        self.fieldsets.extend(fields.iter().map(|index| *index as i32));
        self.fieldsets.push(-1);
        start
    }

    pub fn add_spec(&mut self, path: usize, fieldset: usize, ty: SpecType) {
        self.specs.push((path as u32, fieldset as u32, ty as u32));
    }

    /// Append raw bytes to the value area, returns their absolute file offset.
    pub fn add_payload(&mut self, bytes: &[u8]) -> u64 {
        let offset = (std::mem::size_of::<Bootstrap>() + self.payload.len()) as u64;
        self.payload.extend_from_slice(bytes);
        offset
    }

    /// Pseudo root spec with the given fields.
    pub fn def_root(&mut self, fields: &[(&str, ValueRep)]) {
        let fields = fields
            .iter()
            .map(|(name, rep)| self.add_field(name, *rep))
            .collect::<Vec<_>>();

        let fieldset = self.add_fieldset(&fields);
        self.add_spec(0, fieldset, SpecType::PseudoRoot);
    }

    /// Prim path + spec, with an optional `typeName`.
    pub fn def_prim(&mut self, parent: usize, name: &str, type_name: Option<&str>) -> usize {
        let prim = self.add_path(parent, name, false);

        let mut fields = Vec::new();
        if let Some(type_name) = type_name {
            let rep = self.token(type_name);
            fields.push(self.add_field("typeName", rep));
        }

        let fieldset = self.add_fieldset(&fields);
        self.add_spec(prim, fieldset, SpecType::Prim);
        prim
    }

    /// Attribute path + spec holding `default = value`.
    pub fn def_attribute(&mut self, prim: usize, name: &str, value: ValueRep) -> usize {
        let attr = self.add_path(prim, name, true);

        let field = self.add_field("default", value);
        let fieldset = self.add_fieldset(&[field]);
        self.add_spec(attr, fieldset, SpecType::Attribute);
        attr
    }

    /// Relationship path + spec holding `targetPaths = targets`.
    pub fn def_relationship(&mut self, prim: usize, name: &str, targets: ValueRep) -> usize {
        let rel = self.add_path(prim, name, true);

        let field = self.add_field("targetPaths", targets);
        let fieldset = self.add_fieldset(&[field]);
        self.add_spec(rel, fieldset, SpecType::Relationship);
        rel
    }

    fn has_32bit_array_sizes(&self) -> bool {
        self.version[0] == 0 && self.version[1] < 7
    }

    fn write_array_len(&self, out: &mut Vec<u8>, len: usize) {
        if self.has_32bit_array_sizes() {
            out.extend_from_slice(&(len as u32).to_le_bytes());
        } else {
            write_u64(out, len as u64);
        }
    }

    pub fn token(&mut self, token: &str) -> ValueRep {
        let index = self.intern(token);
        ValueRep::inlined(Type::Token, index as u64)
    }

    pub fn asset_path(&mut self, path: &str) -> ValueRep {
        let index = self.intern(path);
        ValueRep::inlined(Type::AssetPath, index as u64)
    }

    pub fn string(&mut self, value: &str) -> ValueRep {
        let token = self.intern(value);
        self.strings.push(token as u32);
        ValueRep::inlined(Type::String, (self.strings.len() - 1) as u64)
    }

    pub fn float(&mut self, value: f32) -> ValueRep {
        ValueRep::inlined(Type::Float, value.to_bits() as u64)
    }

    pub fn bool(&mut self, value: bool) -> ValueRep {
        ValueRep::inlined(Type::Bool, value as u64)
    }

    pub fn vec3f(&mut self, value: Vec3) -> ValueRep {
        let offset = self.add_payload(bytes_of(&value.to_array()));
        ValueRep::new(Type::Vec3f, offset, false, false, false)
    }

    pub fn vec3d(&mut self, value: [f64; 3]) -> ValueRep {
        let offset = self.add_payload(bytes_of(&value));
        ValueRep::new(Type::Vec3d, offset, false, false, false)
    }

    /// Row-major matrix as stored on disk.
    pub fn matrix4d(&mut self, rows: [[f64; 4]; 4]) -> ValueRep {
        let offset = self.add_payload(bytes_of(&rows));
        ValueRep::new(Type::Matrix4d, offset, false, false, false)
    }

    pub fn vec3f_array(&mut self, values: &[Vec3]) -> ValueRep {
        let mut data = Vec::new();
        write_u64(&mut data, values.len() as u64);
        for value in values {
            data.extend_from_slice(bytes_of(&value.to_array()));
        }

        let offset = self.add_payload(&data);
        ValueRep::new(Type::Vec3f, offset, false, true, false)
    }

    pub fn vec2f_array(&mut self, values: &[Vec2]) -> ValueRep {
        let mut data = Vec::new();
        write_u64(&mut data, values.len() as u64);
        for value in values {
            data.extend_from_slice(bytes_of(&value.to_array()));
        }

        let offset = self.add_payload(&data);
        ValueRep::new(Type::Vec2f, offset, false, true, false)
    }

    pub fn matrix4d_array(&mut self, values: &[[[f64; 4]; 4]]) -> ValueRep {
        let mut data = Vec::new();
        write_u64(&mut data, values.len() as u64);
        for rows in values {
            data.extend_from_slice(bytes_of(rows));
        }

        let offset = self.add_payload(&data);
        ValueRep::new(Type::Matrix4d, offset, false, true, false)
    }

    /// Uncompressed int array.
    pub fn int_array(&mut self, values: &[i32]) -> ValueRep {
        let mut data = Vec::new();
        self.write_array_len(&mut data, values.len());
        for value in values {
            data.extend_from_slice(&value.to_le_bytes());
        }

        let offset = self.add_payload(&data);
        ValueRep::new(Type::Int, offset, false, true, false)
    }

    /// Integer-coded int array.
    pub fn compressed_int_array(&mut self, values: &[i32]) -> ValueRep {
        let mut data = Vec::new();
        self.write_array_len(&mut data, values.len());
        write_encoded_ints(&mut data, values);

        let offset = self.add_payload(&data);
        ValueRep::new(Type::Int, offset, false, true, true)
    }

    /// Uncompressed float array.
    pub fn float_array(&mut self, values: &[f32]) -> ValueRep {
        let mut data = Vec::new();
        self.write_array_len(&mut data, values.len());
        for value in values {
            data.extend_from_slice(&value.to_le_bytes());
        }

        let offset = self.add_payload(&data);
        ValueRep::new(Type::Float, offset, false, true, false)
    }

    /// Float array stored as a lookup table plus integer-coded indices.
    pub fn float_lut_array(&mut self, lut: &[f32], indices: &[i32]) -> ValueRep {
        let mut data = Vec::new();
        self.write_array_len(&mut data, indices.len());
        data.push(b't');
        data.extend_from_slice(&(lut.len() as u32).to_le_bytes());
        for value in lut {
            data.extend_from_slice(&value.to_le_bytes());
        }
        write_encoded_ints(&mut data, indices);

        let offset = self.add_payload(&data);
        ValueRep::new(Type::Float, offset, false, true, true)
    }

    /// Float array of whole numbers stored as integer-coded values.
    pub fn float_int_coded_array(&mut self, values: &[i32]) -> ValueRep {
        let mut data = Vec::new();
        self.write_array_len(&mut data, values.len());
        data.push(b'i');
        write_encoded_ints(&mut data, values);

        let offset = self.add_payload(&data);
        ValueRep::new(Type::Float, offset, false, true, true)
    }

    pub fn token_vector(&mut self, tokens: &[&str]) -> ValueRep {
        let indices = tokens.iter().map(|t| self.intern(t) as u32).collect::<Vec<_>>();

        let mut data = Vec::new();
        write_u64(&mut data, indices.len() as u64);
        for index in indices {
            data.extend_from_slice(&index.to_le_bytes());
        }

        let offset = self.add_payload(&data);
        ValueRep::new(Type::TokenVector, offset, false, false, false)
    }

    pub fn path_vector(&mut self, paths: &[usize]) -> ValueRep {
        let mut data = Vec::new();
        write_u64(&mut data, paths.len() as u64);
        for path in paths {
            data.extend_from_slice(&(*path as u32).to_le_bytes());
        }

        let offset = self.add_payload(&data);
        ValueRep::new(Type::PathVector, offset, false, false, false)
    }

    fn encode_paths(&self) -> (Vec<i32>, Vec<i32>, Vec<i32>) {
        let mut path_indexes = Vec::new();
        let mut tokens = Vec::new();
        let mut jumps = Vec::new();

        self.encode_node(0, true, &mut path_indexes, &mut tokens, &mut jumps);

        (path_indexes, tokens, jumps)
    }

    fn encode_node(
        &self,
        id: usize,
        last: bool,
        path_indexes: &mut Vec<i32>,
        tokens: &mut Vec<i32>,
        jumps: &mut Vec<i32>,
    ) {
        let node = &self.nodes[id];
        let position = jumps.len();

        path_indexes.push(id as i32);
        tokens.push(if node.property {
            -(node.token as i32)
        } else {
            node.token as i32
        });
        jumps.push(0);

        for (i, child) in node.children.iter().enumerate() {
            let last_child = i + 1 == node.children.len();
            self.encode_node(*child, last_child, path_indexes, tokens, jumps);
        }

        jumps[position] = match (!node.children.is_empty(), !last) {
            (true, true) => (jumps.len() - position) as i32,
            (true, false) => -1,
            (false, true) => 0,
            (false, false) => -2,
        };
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0_u8; std::mem::size_of::<Bootstrap>()];
        out.extend_from_slice(&self.payload);

        let mut sections = Vec::new();
        let mut add_section = |out: &mut Vec<u8>, name: &str, data: Vec<u8>| {
            sections.push(Section::new(name, out.len() as u64, data.len() as u64));
            out.extend(data);
        };

        // TOKENS
        let mut data = Vec::new();
        let mut blob = Vec::new();
        for token in &self.tokens {
            blob.extend_from_slice(token.as_bytes());
            blob.push(0);
        }
        write_u64(&mut data, self.token_count.unwrap_or(self.tokens.len() as u64));
        write_u64(&mut data, blob.len() as u64);
        write_compressed(&mut data, &blob);
        add_section(&mut out, Section::TOKENS, data);

        // STRINGS
        let mut data = Vec::new();
        write_u64(&mut data, self.strings.len() as u64);
        for index in &self.strings {
            data.extend_from_slice(&index.to_le_bytes());
        }
        add_section(&mut out, Section::STRINGS, data);

        // FIELDS
        let mut data = Vec::new();
        write_u64(&mut data, self.fields.len() as u64);
        let indices = self.fields.iter().map(|(token, _)| *token as i32).collect::<Vec<_>>();
        write_encoded_ints(&mut data, &indices);
        let reps = self
            .fields
            .iter()
            .flat_map(|(_, rep)| rep.to_le_bytes())
            .collect::<Vec<_>>();
        write_compressed(&mut data, &reps);
        add_section(&mut out, Section::FIELDS, data);

        // FIELDSETS
        let mut data = Vec::new();
        write_u64(&mut data, self.fieldsets.len() as u64);
        write_encoded_ints(&mut data, &self.fieldsets);
        add_section(&mut out, Section::FIELDSETS, data);

        // PATHS
        let (path_indexes, tokens, jumps) = self.encode_paths();
        let mut data = Vec::new();
        write_u64(&mut data, path_indexes.len() as u64);
        write_u64(&mut data, path_indexes.len() as u64);
        write_encoded_ints(&mut data, &path_indexes);
        write_encoded_ints(&mut data, &tokens);
        write_encoded_ints(&mut data, &jumps);
        add_section(&mut out, Section::PATHS, data);

        // SPECS
        let mut data = Vec::new();
        write_u64(&mut data, self.specs.len() as u64);
        for column in 0..3 {
            let values = self
                .specs
                .iter()
                .map(|spec| [spec.0, spec.1, spec.2][column] as i32)
                .collect::<Vec<_>>();
            write_encoded_ints(&mut data, &values);
        }
        add_section(&mut out, Section::SPECS, data);

        for (name, data) in &self.extra_sections {
            add_section(&mut out, name, data.clone());
        }

        let toc_offset = out.len() as u64;
        write_u64(&mut out, sections.len() as u64);
        for section in &sections {
            out.extend_from_slice(bytes_of(section));
        }

        let mut bootstrap = Bootstrap {
            ident: self.ident,
            toc_offset,
            ..Default::default()
        };
        bootstrap.version[..3].copy_from_slice(&self.version);

        out[..std::mem::size_of::<Bootstrap>()].copy_from_slice(bytes_of(&bootstrap));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usdc::coding;

    #[test]
    fn test_encode_ints_decodes_back() {
        let values = [5, 5, 5, 300, -70000, 0, 1, 2];
        let encoded = encode_ints(&values);

        assert!(encoded.len() <= coding::encoded_buffer_size::<i32>(values.len()));
        assert_eq!(coding::decode32(&encoded, values.len()).unwrap(), values);
    }

    #[test]
    fn test_path_jumps() {
        // / -> a (-> a.x, a/b), c
        let mut writer = CrateWriter::new();
        let a = writer.add_path(0, "a", false);
        writer.add_path(a, "x", true);
        writer.add_path(a, "b", false);
        writer.add_path(0, "c", false);

        let (indexes, _, jumps) = writer.encode_paths();
        assert_eq!(indexes, vec![0, 1, 2, 3, 4]);
        assert_eq!(jumps, vec![-1, 3, 0, -2, -2]);
    }
}
