//! Shared fixtures: scratch trees and hand-built ZIP archives.

#![allow(dead_code)]

use std::io::Write;
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::Crc;
use flate2::write::DeflateEncoder;

struct Entry {
    name: String,
    data: Vec<u8>,
    method: u16,
    bad_crc: bool,
    zip64_size: Option<u64>,
}

/// Minimal ZIP writer for test archives.
#[derive(Default)]
pub struct ZipBuilder {
    entries: Vec<Entry>,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(self, name: &str, data: &[u8]) -> Self {
        self.push(name, data, 0)
    }

    pub fn deflated(self, name: &str, data: &[u8]) -> Self {
        self.push(name, data, 8)
    }

    /// Entry whose data is written verbatim under an arbitrary method code.
    pub fn raw(self, name: &str, data: &[u8], method: u16) -> Self {
        self.push(name, data, method)
    }

    pub fn folder(self, name: &str) -> Self {
        self.push(name, b"", 0)
    }

    /// Declare `size` as the uncompressed length of the most recently added
    /// entry through a ZIP64 extra field, whatever its real data.
    pub fn zip64_declared_size(mut self, size: u64) -> Self {
        if let Some(last) = self.entries.last_mut() {
            last.zip64_size = Some(size);
        }
        self
    }

    /// Store a wrong CRC for the most recently added entry.
    pub fn corrupt_crc(mut self) -> Self {
        if let Some(last) = self.entries.last_mut() {
            last.bad_crc = true;
        }
        self
    }

    fn push(mut self, name: &str, data: &[u8], method: u16) -> Self {
        self.entries.push(Entry {
            name: name.to_string(),
            data: data.to_vec(),
            method,
            bad_crc: false,
            zip64_size: None,
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut central = Vec::new();

        for entry in &self.entries {
            let mut crc = Crc::new();
            crc.update(&entry.data);
            let crc = if entry.bad_crc { crc.sum() ^ 0xFFFF_FFFF } else { crc.sum() };

            let payload = if entry.method == 8 {
                let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&entry.data).unwrap();
                encoder.finish().unwrap()
            } else {
                entry.data.clone()
            };

            let lfh_offset = out.len() as u32;
            let name = entry.name.as_bytes();

            out.extend_from_slice(b"PK\x03\x04");
            out.write_u16::<LittleEndian>(20).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(entry.method).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u32::<LittleEndian>(crc).unwrap();
            out.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
            out.write_u32::<LittleEndian>(entry.data.len() as u32).unwrap();
            out.write_u16::<LittleEndian>(name.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.extend_from_slice(name);
            out.extend_from_slice(&payload);

            central.extend_from_slice(b"PK\x01\x02");
            central.write_u16::<LittleEndian>(20).unwrap();
            central.write_u16::<LittleEndian>(20).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u16::<LittleEndian>(entry.method).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u32::<LittleEndian>(crc).unwrap();
            central.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
            let (central_size, extra_len) = match entry.zip64_size {
                Some(_) => (0xFFFF_FFFF, 12),
                None => (entry.data.len() as u32, 0),
            };
            central.write_u32::<LittleEndian>(central_size).unwrap();
            central.write_u16::<LittleEndian>(name.len() as u16).unwrap();
            central.write_u16::<LittleEndian>(extra_len).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u32::<LittleEndian>(0).unwrap();
            central.write_u32::<LittleEndian>(lfh_offset).unwrap();
            central.extend_from_slice(name);
            if let Some(size) = entry.zip64_size {
                central.write_u16::<LittleEndian>(0x0001).unwrap();
                central.write_u16::<LittleEndian>(8).unwrap();
                central.write_u64::<LittleEndian>(size).unwrap();
            }
        }

        let cd_offset = out.len() as u32;
        let cd_size = central.len() as u32;
        out.extend_from_slice(&central);

        out.extend_from_slice(b"PK\x05\x06");
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(self.entries.len() as u16).unwrap();
        out.write_u16::<LittleEndian>(self.entries.len() as u16).unwrap();
        out.write_u32::<LittleEndian>(cd_size).unwrap();
        out.write_u32::<LittleEndian>(cd_offset).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();

        out
    }

    pub fn write_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, self.build()).unwrap();
    }
}

/// Write `content` at `root/relative`, creating parent folders.
pub fn write_file(root: &Path, relative: &str, content: &[u8]) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Compressible payload large enough to span several read calls.
pub fn sample_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| b"resource-bytes-"[i % 15] ^ (i / 251) as u8).collect()
}
