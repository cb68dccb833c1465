//! Reader for the mesh part of binary 3DS files.
//!
//! A 3DS file is a tree of chunks. Each chunk starts with a 6-byte header
//! (`u16` id, `u32` length including the header). Only the path down to the
//! vertex and face lists is followed; everything else is skipped by length.

use std::fs;
use std::path::Path;

use glam::Vec3;

use crate::error::ModelError;

const MAIN_CHUNK: u16 = 0x4D4D;
const EDITOR_CHUNK: u16 = 0x3D3D;
const OBJECT_BLOCK: u16 = 0x4000;
const TRIANGULAR_MESH: u16 = 0x4100;
const VERTICES_LIST: u16 = 0x4110;
const FACES_LIST: u16 = 0x4120;

const HEADER_LEN: usize = 6;
/// Real files nest main > editor > object > mesh > list; anything far
/// deeper is malformed.
const MAX_CHUNK_DEPTH: usize = 16;

/// Vertices and faces of every mesh object in a file, concatenated.
/// Face indices are already offset into the shared vertex list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Model3ds {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<[u32; 3]>,
}

impl Model3ds {
    /// Flattened triangle list; faces that index past the vertex list are
    /// dropped.
    pub fn triangle_soup(&self) -> Vec<Vec3> {
        let n = self.vertices.len();
        self.faces
            .iter()
            .filter(|f| f.iter().all(|&i| (i as usize) < n))
            .flat_map(|f| f.map(|i| self.vertices[i as usize]))
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ByteOrder {
    Little,
    Big,
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    order: ByteOrder,
}

impl<'a> Reader<'a> {
    fn take<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N], ModelError> {
        let end = self.pos + N;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or(ModelError::Truncated { offset: self.pos, what })?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.pos = end;
        Ok(out)
    }

    fn u16(&mut self, what: &'static str) -> Result<u16, ModelError> {
        let b = self.take::<2>(what)?;
        Ok(match self.order {
            ByteOrder::Little => u16::from_le_bytes(b),
            ByteOrder::Big => u16::from_be_bytes(b),
        })
    }

    fn u32(&mut self, what: &'static str) -> Result<u32, ModelError> {
        let b = self.take::<4>(what)?;
        Ok(match self.order {
            ByteOrder::Little => u32::from_le_bytes(b),
            ByteOrder::Big => u32::from_be_bytes(b),
        })
    }

    fn f32(&mut self, what: &'static str) -> Result<f32, ModelError> {
        self.u32(what).map(f32::from_bits)
    }

    fn skip_cstr(&mut self) -> Result<(), ModelError> {
        let rest = &self.data[self.pos.min(self.data.len())..];
        let nul = rest.iter().position(|&b| b == 0).ok_or(ModelError::Truncated {
            offset: self.pos,
            what: "object name",
        })?;
        self.pos += nul + 1;
        Ok(())
    }

    fn seek(&mut self, to: usize, what: &'static str) -> Result<(), ModelError> {
        if to > self.data.len() {
            return Err(ModelError::Truncated { offset: self.pos, what });
        }
        self.pos = to;
        Ok(())
    }
}

/// The main chunk id reads the same in both byte orders, so the order is
/// taken from its length field: the reading that fits the data wins, and
/// for a truncated file the smaller plausible length does.
fn probe_byte_order(data: &[u8]) -> Result<ByteOrder, ModelError> {
    let header: [u8; HEADER_LEN] = data
        .get(..HEADER_LEN)
        .and_then(|b| b.try_into().ok())
        .ok_or(ModelError::Truncated { offset: 0, what: "main chunk header" })?;
    let id = u16::from_le_bytes([header[0], header[1]]);
    if id != MAIN_CHUNK {
        return Err(ModelError::UnknownByteOrder(id));
    }
    let len_bytes = [header[2], header[3], header[4], header[5]];
    let le = u32::from_le_bytes(len_bytes) as usize;
    let be = u32::from_be_bytes(len_bytes) as usize;
    let plausible = |len: usize| len >= HEADER_LEN;
    let fits = |len: usize| plausible(len) && len <= data.len();

    match (fits(le), fits(be)) {
        (true, _) => Ok(ByteOrder::Little),
        (false, true) => Ok(ByteOrder::Big),
        (false, false) if plausible(le) && (le <= be || !plausible(be)) => Ok(ByteOrder::Little),
        (false, false) if plausible(be) => Ok(ByteOrder::Big),
        _ => Err(ModelError::UnknownByteOrder(id)),
    }
}

struct Parser<'a> {
    reader: Reader<'a>,
    model: Model3ds,
    /// First vertex of the mesh object being read.
    vertex_base: u32,
}

impl Parser<'_> {
    fn chunks(&mut self, end: usize, depth: usize) -> Result<(), ModelError> {
        while self.reader.pos < end {
            let start = self.reader.pos;
            let id = self.reader.u16("chunk id")?;
            let len = self.reader.u32("chunk length")? as usize;
            if len < HEADER_LEN {
                return Err(ModelError::Truncated { offset: start, what: "chunk length" });
            }
            let chunk_end = start.saturating_add(len);
            let is_container = matches!(
                id,
                MAIN_CHUNK | EDITOR_CHUNK | OBJECT_BLOCK | TRIANGULAR_MESH
            );
            if is_container && depth >= MAX_CHUNK_DEPTH {
                return Err(ModelError::TooDeep { offset: start });
            }

            match id {
                MAIN_CHUNK | EDITOR_CHUNK => self.chunks(chunk_end, depth + 1)?,
                OBJECT_BLOCK => {
                    self.reader.skip_cstr()?;
                    self.chunks(chunk_end, depth + 1)?;
                }
                TRIANGULAR_MESH => {
                    self.vertex_base = self.model.vertices.len() as u32;
                    self.chunks(chunk_end, depth + 1)?;
                }
                VERTICES_LIST => self.vertices()?,
                FACES_LIST => self.faces()?,
                _ => log::trace!("skipping 3ds chunk {id:#06x} ({len} bytes)"),
            }

            self.reader.seek(chunk_end, "chunk body")?;
        }
        Ok(())
    }

    fn vertices(&mut self) -> Result<(), ModelError> {
        let count = self.reader.u16("vertex count")?;
        log::debug!("3ds vertex list with {count} vertices");
        self.model.vertices.reserve(count as usize);
        for _ in 0..count {
            let x = self.reader.f32("vertex")?;
            let y = self.reader.f32("vertex")?;
            let z = self.reader.f32("vertex")?;
            self.model.vertices.push(Vec3::new(x, y, z));
        }
        Ok(())
    }

    fn faces(&mut self) -> Result<(), ModelError> {
        let count = self.reader.u16("face count")?;
        self.model.faces.reserve(count as usize);
        for _ in 0..count {
            let a = self.reader.u16("face")? as u32;
            let b = self.reader.u16("face")? as u32;
            let c = self.reader.u16("face")? as u32;
            let _flags = self.reader.u16("face flags")?;
            let base = self.vertex_base;
            self.model.faces.push([a + base, b + base, c + base]);
        }
        Ok(())
    }
}

/// Parse as much of `data` as possible.
///
/// Returns everything read before the first error together with that
/// error, so callers can keep a partially readable model.
pub fn parse_3ds_partial(data: &[u8]) -> (Model3ds, Option<ModelError>) {
    let order = match probe_byte_order(data) {
        Ok(order) => order,
        Err(e) => return (Model3ds::default(), Some(e)),
    };
    let mut parser = Parser {
        reader: Reader { data, pos: 0, order },
        model: Model3ds::default(),
        vertex_base: 0,
    };
    let result = parser.chunks(data.len(), 0);
    (parser.model, result.err())
}

/// Parse a complete 3DS file held in memory.
pub fn parse_3ds(data: &[u8]) -> Result<Model3ds, ModelError> {
    match parse_3ds_partial(data) {
        (model, None) => Ok(model),
        (_, Some(e)) => Err(e),
    }
}

/// Read a 3DS file. Errors are logged and whatever was parsed before the
/// error is returned (possibly nothing).
pub fn read_model(path: impl AsRef<Path>) -> Model3ds {
    let path = path.as_ref();
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            log::error!("error reading 3ds file {}: {}", path.display(), ModelError::from(e));
            return Model3ds::default();
        }
    };
    let (model, err) = parse_3ds_partial(&data);
    if let Some(e) = err {
        log::error!(
            "error reading 3ds file {}: {e} (kept {} vertices, {} faces)",
            path.display(),
            model.vertices.len(),
            model.faces.len()
        );
    }
    model
}

/// Vertex positions only, in file order.
pub fn read_vertices(path: impl AsRef<Path>) -> Vec<Vec3> {
    read_model(path).vertices
}
