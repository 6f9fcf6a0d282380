// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary fragment stream
//!
//! ```text
//! header   magic "FRAG" | version u32 | flags u32 | element count u32
//!          | body length u32 | stored length u32
//! body     metadata json (u32 length + bytes)
//!          group name (u32 length + bytes)
//!          coordination 3 x f64 | unit scale f64
//!          per element:
//!            id u32 | category (u16 length + bytes) | color 4 x f32
//!            positions (u32 count + f32s) | normals (u32 count + f32s)
//!            indices (u32 count + u32s)
//! ```
//!
//! All numbers are little-endian. With [`FLAG_ZLIB`] the body is stored zlib
//! compressed; the body length is always the uncompressed size.

use crate::error::{FragmentError, Result};
use crate::group::GroupData;
use bytemuck::{Pod, Zeroable};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use ifc_frag_model::{EntityId, IfcType, MeshData, ModelMetadata, ParsedElement};
use std::io::{Read, Write};

#[cfg(not(target_endian = "little"))]
compile_error!("fragment streams are written with bytemuck casts and require a little-endian target");

/// Stream magic
pub const MAGIC: [u8; 4] = *b"FRAG";
/// Current stream version
pub const VERSION: u32 = 1;
/// Body is zlib compressed
pub const FLAG_ZLIB: u32 = 1;

const KNOWN_FLAGS: u32 = FLAG_ZLIB;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct Header {
    magic: [u8; 4],
    version: u32,
    flags: u32,
    element_count: u32,
    body_len: u32,
    stored_len: u32,
}

const HEADER_LEN: usize = std::mem::size_of::<Header>();

/// A decoded stream
#[derive(Clone, Debug)]
pub struct DecodedGroup {
    /// Name the group carried when it was exported
    pub name: String,
    /// Geometry and metadata; properties are always `None`
    pub data: GroupData,
}

/// What the header says about a stream, readable without decoding the body
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamInfo {
    pub version: u32,
    pub compressed: bool,
    pub element_count: u32,
    /// Uncompressed body size in bytes
    pub body_len: u32,
}

/// Encode a group's name, geometry and structural metadata
///
/// Properties are not part of the stream; they travel as a JSON sidecar.
/// Output is byte-identical for identical input.
pub fn encode(data: &GroupData, name: &str, compress: bool) -> Result<Vec<u8>> {
    let body = encode_body(data, name)?;
    let body_len = checked_len(body.len(), "body")?;

    let (flags, stored) = if compress {
        let mut encoder = ZlibEncoder::new(Vec::with_capacity(body.len() / 2), Compression::default());
        encoder.write_all(&body)?;
        (FLAG_ZLIB, encoder.finish()?)
    } else {
        (0, body)
    };

    let header = Header {
        magic: MAGIC,
        version: VERSION,
        flags,
        element_count: checked_len(data.fragments.len(), "element count")?,
        body_len,
        stored_len: checked_len(stored.len(), "stored body")?,
    };

    let mut out = Vec::with_capacity(HEADER_LEN + stored.len());
    out.extend_from_slice(bytemuck::bytes_of(&header));
    out.extend_from_slice(&stored);
    Ok(out)
}

/// Read the header only
pub fn peek(bytes: &[u8]) -> Result<StreamInfo> {
    let header = read_header(bytes)?;
    Ok(StreamInfo {
        version: header.version,
        compressed: header.flags & FLAG_ZLIB != 0,
        element_count: header.element_count,
        body_len: header.body_len,
    })
}

/// Decode a stream back into its group name and data without properties
pub fn decode(bytes: &[u8]) -> Result<DecodedGroup> {
    let header = read_header(bytes)?;
    let stored = &bytes[HEADER_LEN..];
    if stored.len() != header.stored_len as usize {
        return Err(FragmentError::codec(format!(
            "body is {} bytes, header says {}",
            stored.len(),
            header.stored_len
        )));
    }

    let body = if header.flags & FLAG_ZLIB != 0 {
        let mut body = Vec::with_capacity(header.body_len as usize);
        ZlibDecoder::new(stored)
            .take(u64::from(header.body_len) + 1)
            .read_to_end(&mut body)
            .map_err(|e| FragmentError::codec(format!("zlib: {e}")))?;
        body
    } else {
        stored.to_vec()
    };
    if body.len() != header.body_len as usize {
        return Err(FragmentError::codec(format!(
            "body decodes to {} bytes, header says {}",
            body.len(),
            header.body_len
        )));
    }

    let decoded = decode_body(&body, header.element_count)?;
    log::debug!(
        "[Codec] decoded {} fragments of '{}' from {} bytes",
        decoded.data.fragments.len(),
        decoded.name,
        bytes.len()
    );
    Ok(decoded)
}

fn read_header(bytes: &[u8]) -> Result<Header> {
    let Some(raw) = bytes.get(..HEADER_LEN) else {
        return Err(FragmentError::codec(format!(
            "{} bytes is too short for a header",
            bytes.len()
        )));
    };
    let header: Header = bytemuck::pod_read_unaligned(raw);
    if header.magic != MAGIC {
        return Err(FragmentError::codec(format!("bad magic {:02x?}", header.magic)));
    }
    if header.version != VERSION {
        return Err(FragmentError::codec(format!(
            "unsupported version {}",
            header.version
        )));
    }
    if header.flags & !KNOWN_FLAGS != 0 {
        return Err(FragmentError::codec(format!(
            "unknown flags {:#x}",
            header.flags
        )));
    }
    Ok(header)
}

fn checked_len(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| FragmentError::codec(format!("{what} too large: {len}")))
}

fn encode_body(data: &GroupData, name: &str) -> Result<Vec<u8>> {
    let mut w = Writer::default();

    w.bytes(&serde_json::to_vec(&data.metadata)?)?;
    w.bytes(name.as_bytes())?;
    for c in data.coordination {
        w.f64(c);
    }
    w.f64(data.unit_scale);

    for fragment in &data.fragments {
        w.u32(fragment.id.0);
        w.short_str(fragment.category.name())?;
        w.0.extend_from_slice(bytemuck::cast_slice(&fragment.color));
        w.f32s(&fragment.mesh.positions)?;
        w.f32s(&fragment.mesh.normals)?;
        w.u32s(&fragment.mesh.indices)?;
    }

    Ok(w.0)
}

fn decode_body(body: &[u8], element_count: u32) -> Result<DecodedGroup> {
    let mut r = Reader { data: body, pos: 0 };

    let metadata: ModelMetadata = serde_json::from_slice(r.bytes()?)?;
    let name = std::str::from_utf8(r.bytes()?)
        .map_err(|e| FragmentError::codec(format!("group name: {e}")))?
        .to_string();
    let coordination = [r.f64()?, r.f64()?, r.f64()?];
    let unit_scale = r.f64()?;

    let mut fragments = Vec::with_capacity(element_count.min(1 << 20) as usize);
    for _ in 0..element_count {
        let id = EntityId(r.u32()?);
        let category = IfcType::parse(r.short_str()?);
        let color = [r.f32()?, r.f32()?, r.f32()?, r.f32()?];
        let mesh = MeshData {
            positions: r.f32s()?,
            normals: r.f32s()?,
            indices: r.u32s()?,
        };
        validate_mesh(id, &mesh)?;
        fragments.push(ParsedElement {
            id,
            category,
            mesh,
            color,
        });
    }

    if r.pos != body.len() {
        return Err(FragmentError::codec(format!(
            "{} trailing bytes",
            body.len() - r.pos
        )));
    }

    Ok(DecodedGroup {
        name,
        data: GroupData {
            metadata,
            fragments,
            properties: None,
            coordination,
            unit_scale,
        },
    })
}

fn validate_mesh(id: EntityId, mesh: &MeshData) -> Result<()> {
    if mesh.positions.len() % 3 != 0 {
        return Err(FragmentError::codec(format!("{id}: positions not a multiple of 3")));
    }
    if !mesh.normals.is_empty() && mesh.normals.len() != mesh.positions.len() {
        return Err(FragmentError::codec(format!("{id}: normal count mismatch")));
    }
    if mesh.indices.len() % 3 != 0 {
        return Err(FragmentError::codec(format!("{id}: indices not a multiple of 3")));
    }
    let vertices = mesh.vertex_count();
    if mesh.indices.iter().any(|&i| i as usize >= vertices) {
        return Err(FragmentError::codec(format!("{id}: index out of range")));
    }
    Ok(())
}

#[derive(Default)]
struct Writer(Vec<u8>);

impl Writer {
    fn u32(&mut self, v: u32) {
        self.0.extend_from_slice(&v.to_le_bytes());
    }

    fn f64(&mut self, v: f64) {
        self.0.extend_from_slice(&v.to_le_bytes());
    }

    fn bytes(&mut self, b: &[u8]) -> Result<()> {
        self.u32(checked_len(b.len(), "blob")?);
        self.0.extend_from_slice(b);
        Ok(())
    }

    fn short_str(&mut self, s: &str) -> Result<()> {
        let len = u16::try_from(s.len())
            .map_err(|_| FragmentError::codec(format!("name too long: {}", s.len())))?;
        self.0.extend_from_slice(&len.to_le_bytes());
        self.0.extend_from_slice(s.as_bytes());
        Ok(())
    }

    fn f32s(&mut self, v: &[f32]) -> Result<()> {
        self.u32(checked_len(v.len(), "array")?);
        self.0.extend_from_slice(bytemuck::cast_slice(v));
        Ok(())
    }

    fn u32s(&mut self, v: &[u32]) -> Result<()> {
        self.u32(checked_len(v.len(), "array")?);
        self.0.extend_from_slice(bytemuck::cast_slice(v));
        Ok(())
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| FragmentError::codec(format!("truncated at byte {}", self.pos)))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(bytemuck::pod_read_unaligned(self.take(4)?))
    }

    fn f32(&mut self) -> Result<f32> {
        Ok(bytemuck::pod_read_unaligned(self.take(4)?))
    }

    fn f64(&mut self) -> Result<f64> {
        Ok(bytemuck::pod_read_unaligned(self.take(8)?))
    }

    fn bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    fn short_str(&mut self) -> Result<&'a str> {
        let len: u16 = bytemuck::pod_read_unaligned(self.take(2)?);
        std::str::from_utf8(self.take(len as usize)?)
            .map_err(|e| FragmentError::codec(format!("category name: {e}")))
    }

    fn array<T: Pod>(&mut self) -> Result<Vec<T>> {
        let count = self.u32()? as usize;
        let size = std::mem::size_of::<T>();
        let raw = self.take(
            count
                .checked_mul(size)
                .ok_or_else(|| FragmentError::codec("array length overflow"))?,
        )?;
        Ok(raw
            .chunks_exact(size)
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }

    fn f32s(&mut self) -> Result<Vec<f32>> {
        self.array()
    }

    fn u32s(&mut self) -> Result<Vec<u32>> {
        self.array()
    }
}
