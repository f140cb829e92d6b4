//! Loaded debug image: DWARF context, symbol table and address translation
//!
//! One `LoadedImage` owns everything needed to answer symbol queries for
//! one binary inside one process: the parsed DWARF debug information, a
//! sorted copy of the ELF symbol table as a fallback for addresses DWARF
//! does not cover, and the two base addresses (runtime and linked) whose
//! difference undoes ASLR.

use std::borrow::Cow;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use addr2line::Context;
use anyhow::{anyhow, Context as _, Result};
use gimli::{EndianArcSlice, RunTimeEndian};
use log::{debug, info};
use object::{Object, ObjectSection, ObjectSegment, ObjectSymbol};
use rustc_demangle::demangle;

use super::memory_maps::{image_range, MemoryRange};
use crate::domain::{Pid, RawAddress};

/// Source attribution of a resolved address
#[derive(Debug, Clone, Default)]
pub(crate) struct SourcePosition {
    pub file: Option<String>,
    pub line: Option<u32>,
}

/// Debug image of a running process
pub(crate) struct LoadedImage {
    dwarf: Context<EndianArcSlice<RunTimeEndian>>,
    /// Sorted (address, mangled name) pairs for the DWARF-less fallback
    symbols: Vec<(u64, String)>,
    /// Where the image sits in the target process right now
    runtime: MemoryRange,
    /// Lowest file-backed segment address: the base the debug info was
    /// linked against
    link_base: u64,
}

impl LoadedImage {
    /// Load `image_path` and locate it inside `pid`'s address space
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, carries no
    /// file-backed segments, or is not mapped into the process.
    pub(crate) fn load(pid: Pid, image_path: &Path) -> Result<LoadedImage> {
        let data = fs::read(image_path)
            .with_context(|| format!("Failed to read image {}", image_path.display()))?;
        let file = object::File::parse(&*data)
            .with_context(|| format!("Failed to parse image {}", image_path.display()))?;

        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };
        let load_section =
            |id: gimli::SectionId| -> Result<EndianArcSlice<RunTimeEndian>, gimli::Error> {
                let bytes = file
                    .section_by_name(id.name())
                    .and_then(|section| section.uncompressed_data().ok())
                    .unwrap_or(Cow::Borrowed(&[][..]));
                Ok(EndianArcSlice::new(Arc::from(&*bytes), endian))
            };
        let dwarf = Context::from_dwarf(gimli::Dwarf::load(&load_section)?)
            .context("Failed to load DWARF debug information")?;

        let link_base = file
            .segments()
            .filter_map(|segment| {
                let (_, file_size) = segment.file_range();
                if file_size == 0 {
                    return None;
                }
                Some(segment.address())
            })
            .min()
            .ok_or_else(|| anyhow!("No file-backed segments in {}", image_path.display()))?;

        let mut symbols: Vec<(u64, String)> = file
            .symbols()
            .filter(object::ObjectSymbol::is_definition)
            .filter_map(|symbol| {
                let name = symbol.name().ok()?;
                if name.is_empty() || symbol.address() == 0 {
                    return None;
                }
                Some((symbol.address(), name.to_owned()))
            })
            .collect();
        symbols.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let runtime = image_range(pid, image_path)?;
        info!(
            "Loaded debug image {} ({} symbols, link base 0x{:x})",
            image_path.display(),
            symbols.len(),
            link_base
        );

        Ok(LoadedImage {
            dwarf,
            symbols,
            runtime,
            link_base,
        })
    }

    /// Translate a runtime address into the linked address space
    ///
    /// Addresses outside the image's mapped range (JIT pages, other
    /// libraries) cannot be attributed to this image and resolve to
    /// nothing.
    fn lookup_pc(&self, address: RawAddress) -> Option<u64> {
        if !self.runtime.contains(address.0) {
            debug!("Address {address} is outside the image range");
            return None;
        }
        Some(address.0 - self.runtime.start + self.link_base)
    }

    /// Demangled function name at `address`, if any
    pub(crate) fn name_at(&self, address: RawAddress) -> Option<String> {
        let lookup_pc = self.lookup_pc(address)?;

        if let Ok(mut frames) = self.dwarf.find_frames(lookup_pc).skip_all_loads() {
            // The first frame carrying a function is the most specific
            // inlined one.
            while let Ok(Some(frame)) = frames.next() {
                let name = frame
                    .function
                    .and_then(|f| f.demangle().ok().map(Cow::into_owned));
                if let Some(name) = name {
                    return Some(name);
                }
            }
        }

        // DWARF had nothing; fall back to the nearest preceding symbol
        // table entry.
        self.symbol_before(lookup_pc)
            .map(|mangled| format!("{:#}", demangle(mangled)))
    }

    /// Source file and line at `address`, from the most specific inlined
    /// frame that carries a location
    pub(crate) fn source_at(&self, address: RawAddress) -> SourcePosition {
        let Some(lookup_pc) = self.lookup_pc(address) else {
            return SourcePosition::default();
        };

        let mut position = SourcePosition::default();
        if let Ok(mut frames) = self.dwarf.find_frames(lookup_pc).skip_all_loads() {
            while let Ok(Some(frame)) = frames.next() {
                if let Some(location) = frame.location {
                    position.file = location.file.map(ToString::to_string);
                    position.line = location.line;
                    break;
                }
            }
        }
        position
    }

    /// Last symbol starting at or before `lookup_pc`
    fn symbol_before(&self, lookup_pc: u64) -> Option<&str> {
        let index = self
            .symbols
            .partition_point(|&(address, _)| address <= lookup_pc);
        let (_, name) = self.symbols.get(index.checked_sub(1)?)?;
        Some(name.as_str())
    }
}
