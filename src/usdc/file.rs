//! Binary crate file reader.

use std::{io, mem, str};

use anyhow::{ensure, Context, Result};
use bytemuck::pod_collect_to_vec;
use tracing::{debug, trace, warn};

use crate::{sdf, usdc};

use usdc::{
    paths::{Node, PathTable, PathTree},
    Bootstrap, CrateReader, Error, Field, Section, Spec, Version,
};

/// Crate file represents structural data loaded from a USDC file on disk.
#[derive(Debug)]
pub struct CrateFile<R: io::Read + io::Seek> {
    /// File reader.
    pub(super) reader: R,
    /// Total stream length, every offset must stay below it.
    pub(super) file_size: u64,

    /// File header.
    pub bootstrap: Bootstrap,
    /// Structural sections.
    pub sections: Vec<Section>,
    /// Tokens section.
    pub tokens: Vec<String>,
    /// Strings section, indices into `tokens`.
    pub strings: Vec<usize>,
    /// All unique fields.
    pub fields: Vec<Field>,
    /// A vector of groups of fields, invalid-index terminated.
    pub fieldsets: Vec<Option<usize>>,
    /// All unique paths.
    pub paths: Vec<sdf::Path>,
    /// Tree position of each path.
    pub nodes: Vec<Node>,
    /// All specs.
    pub specs: Vec<Spec>,
}

impl<R: io::Read + io::Seek> CrateFile<R> {
    /// Read structural sections of a crate file.
    pub fn open(mut reader: R) -> Result<Self> {
        let file_size = reader.seek(io::SeekFrom::End(0))?;
        reader.seek(io::SeekFrom::Start(0))?;

        let bootstrap = Self::read_header(&mut reader, file_size)?;

        let mut file = CrateFile {
            reader,
            file_size,
            bootstrap,
            sections: Vec::new(),
            tokens: Vec::new(),
            strings: Vec::new(),
            fields: Vec::new(),
            fieldsets: Vec::new(),
            paths: Vec::new(),
            nodes: Vec::new(),
            specs: Vec::new(),
        };

        file.read_sections().context("Unable to read sections")?;
        file.read_tokens().context("Unable to read TOKENS section")?;
        file.read_strings().context("Unable to read STRINGS section")?;
        file.read_fields().context("Unable to read FIELDS section")?;
        file.read_fieldsets().context("Unable to read FIELDSETS section")?;
        file.read_paths().context("Unable to read PATHS section")?;
        file.read_specs().context("Unable to read SPECS section")?;

        debug!(
            "Crate {}: {} tokens, {} strings, {} fields, {} fieldsets, {} paths, {} specs",
            file.version(),
            file.tokens.len(),
            file.strings.len(),
            file.fields.len(),
            file.fieldsets.len(),
            file.paths.len(),
            file.specs.len()
        );

        Ok(file)
    }

    /// Sanity check of structural validity.
    /// Roughly corresponds to `PXR_PREFER_SAFETY_OVER_SPEED` define in USD.
    pub fn validate(&self) -> Result<()> {
        // See https://github.com/PixarAnimationStudios/OpenUSD/blob/0b18ad3f840c24eb25e16b795a5b0821cf05126e/pxr/usd/usd/crateFile.cpp#L3268
        self.fields.iter().enumerate().try_for_each(|(index, field)| {
            ensure!(
                field.token_index < self.tokens.len(),
                Error::format(format!("Invalid field token index {}: {}", index, field.token_index))
            );

            anyhow::Ok(())
        })?;

        self.fieldsets
            .iter()
            .enumerate()
            .filter_map(|(i, index)| index.map(|index| (i, index)))
            .try_for_each(|(index, fieldset)| {
                ensure!(
                    fieldset < self.fields.len(),
                    Error::format(format!("Invalid fieldset index {}: {}", index, fieldset))
                );

                anyhow::Ok(())
            })?;

        self.specs.iter().enumerate().try_for_each(|(index, spec)| {
            ensure!(
                spec.path_index < self.paths.len(),
                Error::format(format!("Invalid spec {} path index: {}", index, spec.path_index))
            );

            ensure!(
                spec.fieldset_index < self.fieldsets.len(),
                Error::format(format!("Invalid spec {} fieldset index: {}", index, spec.fieldset_index))
            );

            // Additionally, a fieldSetIndex must either be 0, or the element at
            // the prior index must be a default-constructed FieldIndex.
            // See https://github.com/PixarAnimationStudios/OpenUSD/blob/0b18ad3f840c24eb25e16b795a5b0821cf05126e/pxr/usd/usd/crateFile.cpp#L3289

            if spec.fieldset_index > 0 {
                ensure!(
                    self.fieldsets[spec.fieldset_index - 1].is_none(),
                    Error::format(format!(
                        "Invalid spec {}, the element at the prior index {} must be a default-constructed field index",
                        index, spec.fieldset_index
                    ))
                );
            }

            ensure!(
                spec.spec_type != sdf::SpecType::Unknown,
                Error::format(format!("Invalid spec {} type", index))
            );

            anyhow::Ok(())
        })?;

        Ok(())
    }

    /// Returns file's version extracted from [Bootstrap::version].
    #[inline]
    pub fn version(&self) -> Version {
        Version::from(self.bootstrap)
    }

    /// Read and verify bootstrap header, retrieve offset to TOC.
    fn read_header(mut reader: impl io::Read + io::Seek, file_size: u64) -> Result<Bootstrap> {
        let header = reader.read_pod::<Bootstrap>()?;

        ensure!(
            &header.ident == Bootstrap::IDENT,
            Error::format("Usd crate bootstrap section corrupt")
        );

        let file_ver = Version::from(header);

        ensure!(
            file_ver.is_supported(),
            Error::format(format!(
                "Usd crate version mismatch, file is {}, library supports {} and newer",
                file_ver,
                Version::MIN_SUPPORTED,
            ))
        );

        ensure!(
            header.toc_offset > 0 && header.toc_offset < file_size,
            Error::format(format!("Invalid TOC offset {}", header.toc_offset))
        );

        Ok(header)
    }

    fn read_sections(&mut self) -> Result<()> {
        self.set_position(self.bootstrap.toc_offset)?;
        self.sections = self.reader.read_vec::<Section>()?;

        for section in &self.sections {
            let end = section.start.checked_add(section.size);

            ensure!(
                end.is_some_and(|end| end <= self.file_size),
                Error::format(format!("Section {:?} is outside of the file", section))
            );

            if Section::KNOWN.contains(&section.name()) {
                debug!("Section {:?}", section);
            } else {
                warn!("Ignoring unknown section {:?}", section);
            }
        }

        Ok(())
    }

    fn read_tokens(&mut self) -> Result<()> {
        let Some(section) = self.find_section(Section::TOKENS) else {
            return Ok(());
        };

        self.set_position(section.start)?;

        // Read the number of tokens.
        let count = self.reader.read_count()?;

        let uncompressed_size = self.reader.read_count()?;
        let mut buffer = self.reader.read_compressed(uncompressed_size)?;

        ensure!(
            buffer.len() == uncompressed_size,
            Error::format(format!(
                "Decompressed size mismatch (expected {}, got {})",
                uncompressed_size,
                buffer.len(),
            ))
        );

        if count == 0 && buffer.is_empty() {
            return Ok(());
        }

        ensure!(
            buffer.last() == Some(&b'\0'),
            Error::format("Tokens section not null-terminated in crate file")
        );

        // Pop last \0 byte to split strings without empty one at the end.
        buffer.pop();

        let tokens = buffer
            .split(|c| *c == b'\0')
            .map(|buf| str::from_utf8(buf).map(|str| str.to_string()))
            .collect::<Result<Vec<_>, str::Utf8Error>>()
            .map_err(|err| Error::format(format!("Failed to parse TOKENS section: {err}")))?;

        ensure!(
            tokens.len() == count,
            Error::format(format!(
                "Crate file claims {} tokens, but found {}",
                count,
                tokens.len(),
            ))
        );

        tokens
            .iter()
            .enumerate()
            .for_each(|(index, token)| trace!("token[{index}] = {token:?}"));

        self.tokens = tokens;

        Ok(())
    }

    fn read_strings(&mut self) -> Result<()> {
        let Some(section) = self.find_section(Section::STRINGS) else {
            return Ok(());
        };

        self.set_position(section.start)?;

        let strings = self.reader.read_vec::<u32>()?;

        // These are indices, so convert to usize for convenience.
        self.strings = strings.into_iter().map(|offset| offset as usize).collect::<Vec<_>>();

        Ok(())
    }

    fn read_fields(&mut self) -> Result<()> {
        let Some(section) = self.find_section(Section::FIELDS) else {
            return Ok(());
        };

        self.set_position(section.start)?;

        let field_count = self.reader.read_count()?;

        // Compressed fields in 0.4.0.
        let indices = self.reader.read_encoded_ints::<i32>(field_count)?;

        // Compressed value reps.
        let reps_size = field_count
            .checked_mul(mem::size_of::<u64>())
            .ok_or_else(|| Error::format(format!("Too many fields: {field_count}")))?;

        let reps = self.reader.read_compressed(reps_size)?;

        ensure!(
            reps.len() == reps_size,
            Error::format(format!(
                "Value reps size mismatch (expected {}, got {})",
                reps_size,
                reps.len()
            ))
        );

        let reps = pod_collect_to_vec::<u8, u64>(&reps);

        self.fields = indices
            .iter()
            .zip(reps.iter())
            .map(|(index, value)| Field::new(*index as u32, *value))
            .collect();

        for (index, field) in self.fields.iter().enumerate() {
            trace!("field[{index}] = token {} {:?}", field.token_index, field.value_rep);
        }

        Ok(())
    }

    fn read_fieldsets(&mut self) -> Result<()> {
        let Some(section) = self.find_section(Section::FIELDSETS) else {
            return Ok(());
        };

        self.set_position(section.start)?;

        let count = self.reader.read_count()?;
        let decoded = self.reader.read_encoded_ints::<i32>(count)?;

        const INVALID_INDEX: i32 = -1;

        self.fieldsets = decoded
            .into_iter()
            .map(|i| match i {
                INVALID_INDEX => Ok(None),
                i => usize::try_from(i)
                    .map(Some)
                    .map_err(|_| Error::format(format!("Invalid field index {i} in field sets"))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(())
    }

    fn read_paths(&mut self) -> Result<()> {
        let Some(section) = self.find_section(Section::PATHS) else {
            return Ok(());
        };

        self.set_position(section.start)?;

        // Read # of paths.
        let path_count = self.reader.read_count()?;
        let encoded_path_count = self.reader.read_count()?;

        ensure!(
            path_count == encoded_path_count,
            Error::format(format!(
                "Unexpected path count {}, encoded {}",
                path_count, encoded_path_count
            ))
        );

        let path_indexes = self.reader.read_encoded_ints::<i32>(path_count)?;
        let element_token_indexes = self.reader.read_encoded_ints::<i32>(path_count)?;
        let jumps = self.reader.read_encoded_ints::<i32>(path_count)?;

        let table = PathTable::new(path_indexes, element_token_indexes, jumps)?;
        let tree = PathTree::build(&table, &self.tokens)?;

        self.paths = tree.paths;
        self.nodes = tree.nodes;

        Ok(())
    }

    fn read_specs(&mut self) -> Result<()> {
        let Some(section) = self.find_section(Section::SPECS) else {
            return Ok(());
        };

        self.set_position(section.start)?;

        let spec_count = self.reader.read_count()?;

        let path_indexes = self.reader.read_encoded_ints::<i32>(spec_count)?;
        let fieldset_indexes = self.reader.read_encoded_ints::<i32>(spec_count)?;
        let spec_types = self.reader.read_encoded_ints::<i32>(spec_count)?;

        let index = |value: i32, what: &str| {
            usize::try_from(value).map_err(|_| Error::format(format!("Invalid spec {what} index: {value}")))
        };

        self.specs = path_indexes
            .into_iter()
            .zip(fieldset_indexes)
            .zip(spec_types)
            .map(|((path_index, fieldset_index), spec_type)| {
                let spec_type = u32::try_from(spec_type)
                    .ok()
                    .and_then(sdf::SpecType::from_repr)
                    .ok_or_else(|| Error::format(format!("Unable to parse SDF spec type: {}", spec_type)))?;

                Ok(Spec {
                    path_index: index(path_index, "path")?,
                    fieldset_index: index(fieldset_index, "fieldset")?,
                    spec_type,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(())
    }

    /// Find section by name.
    pub fn find_section(&self, name: &str) -> Option<Section> {
        self.sections.iter().find(|s| s.name() == name).copied()
    }

    pub(super) fn set_position(&mut self, position: u64) -> Result<()> {
        ensure!(
            position < self.file_size,
            Error::format(format!(
                "Offset {} is outside of the file ({} bytes)",
                position, self.file_size
            ))
        );

        self.reader.seek(io::SeekFrom::Start(position))?;
        Ok(())
    }

    /// Resolve a token index.
    pub fn token(&self, index: usize) -> Result<&str> {
        self.tokens
            .get(index)
            .map(|token| token.as_str())
            .ok_or_else(|| Error::format(format!("Token index {} is out of range ({})", index, self.tokens.len())).into())
    }
}
