//https://github.com/CesiumGS/quantized-mesh
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Largest quantized u, v or height value.
pub const MAX_QUANTIZED: u16 = 32767;

const EXTENSION_OCT_VERTEX_NORMALS: u8 = 1;
const EXTENSION_WATER_MASK: u8 = 2;
const EXTENSION_METADATA: u8 = 4;

/// Most capacity reserved up front for a count read out of a tile.
const MAX_RESERVED: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QuantizedMeshHeader {
    pub center_x: f64,
    pub center_y: f64,
    pub center_z: f64,
    pub minimum_height: f32,
    pub maximum_height: f32,
    pub bounding_sphere_center_x: f64,
    pub bounding_sphere_center_y: f64,
    pub bounding_sphere_center_z: f64,
    pub bounding_sphere_radius: f64,
    pub horizon_occlusion_point_x: f64,
    pub horizon_occlusion_point_y: f64,
    pub horizon_occlusion_point_z: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WaterMask {
    /// Whole tile is land (0) or water (255).
    Covered(u8),
    /// 256 x 256 grid.
    Mix(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extension {
    OctEncodedVertexNormals(Vec<u8>),
    WaterMask(WaterMask),
    Metadata(String),
    Unknown { id: u8, data: Vec<u8> },
}

/// A decoded terrain tile. `u`, `v` and `height` are quantized to
/// `0..=MAX_QUANTIZED`; `u` runs west to east and `v` south to north.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuantizedMesh {
    pub header: QuantizedMeshHeader,
    pub u: Vec<u16>,
    pub v: Vec<u16>,
    pub height: Vec<u16>,
    pub indices: Vec<u32>,
    pub west_indices: Vec<u32>,
    pub south_indices: Vec<u32>,
    pub east_indices: Vec<u32>,
    pub north_indices: Vec<u32>,
    pub extensions: Vec<Extension>,
}

fn zigzag_decode(value: u16) -> i32 {
    i32::from(value >> 1) ^ -i32::from(value & 1)
}

fn zigzag_encode(value: i32) -> u16 {
    ((value << 1) ^ (value >> 31)) as u16
}

fn invalid_data(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.into())
}

/// Reads `count` indices of the width implied by the vertex count.
fn read_indices(rdr: &mut impl Read, count: usize, use_32: bool) -> io::Result<Vec<u32>> {
    let mut indices = Vec::with_capacity(count.min(MAX_RESERVED));
    for _ in 0..count {
        let index = if use_32 {
            rdr.read_u32::<LittleEndian>()?
        } else {
            u32::from(rdr.read_u16::<LittleEndian>()?)
        };
        indices.push(index);
    }
    Ok(indices)
}

fn write_indices(w: &mut impl Write, indices: &[u32], use_32: bool) -> io::Result<()> {
    for &index in indices {
        if use_32 {
            w.write_u32::<LittleEndian>(index)?;
        } else {
            let index =
                u16::try_from(index).map_err(|_| invalid_data("index does not fit in 16 bits"))?;
            w.write_u16::<LittleEndian>(index)?;
        }
    }
    Ok(())
}

pub fn from_bytes(bytes: &[u8]) -> io::Result<QuantizedMesh> {
    from_reader(io::Cursor::new(bytes))
}

pub fn from_reader(mut rdr: impl Read) -> io::Result<QuantizedMesh> {
    let header = QuantizedMeshHeader {
        center_x: rdr.read_f64::<LittleEndian>()?,
        center_y: rdr.read_f64::<LittleEndian>()?,
        center_z: rdr.read_f64::<LittleEndian>()?,
        minimum_height: rdr.read_f32::<LittleEndian>()?,
        maximum_height: rdr.read_f32::<LittleEndian>()?,
        bounding_sphere_center_x: rdr.read_f64::<LittleEndian>()?,
        bounding_sphere_center_y: rdr.read_f64::<LittleEndian>()?,
        bounding_sphere_center_z: rdr.read_f64::<LittleEndian>()?,
        bounding_sphere_radius: rdr.read_f64::<LittleEndian>()?,
        horizon_occlusion_point_x: rdr.read_f64::<LittleEndian>()?,
        horizon_occlusion_point_y: rdr.read_f64::<LittleEndian>()?,
        horizon_occlusion_point_z: rdr.read_f64::<LittleEndian>()?,
    };
    let mut position: usize = 88;

    // vertex data: u, v and height arrays, each zig-zag delta encoded
    let vertex_count = rdr.read_u32::<LittleEndian>()? as usize;
    position += 4;
    let reserved = vertex_count.min(MAX_RESERVED);
    let mut arrays = [
        Vec::with_capacity(reserved),
        Vec::with_capacity(reserved),
        Vec::with_capacity(reserved),
    ];
    for values in arrays.iter_mut() {
        let mut value = 0_i32;
        for _ in 0..vertex_count {
            value += zigzag_decode(rdr.read_u16::<LittleEndian>()?);
            let quantized = u16::try_from(value)
                .map_err(|_| invalid_data(format!("quantized value {} out of range", value)))?;
            values.push(quantized);
        }
    }
    position += vertex_count * 6;
    let [u, v, height] = arrays;

    let use_32 = vertex_count > 64 * 1024;
    let bytes_per_index = if use_32 { 4 } else { 2 };
    if position % bytes_per_index != 0 {
        let mut padding = vec![0u8; bytes_per_index - position % bytes_per_index];
        rdr.read_exact(&mut padding)?;
    }

    // triangle indices, high water mark encoded
    let triangle_count = rdr.read_u32::<LittleEndian>()? as usize;
    let index_count = triangle_count
        .checked_mul(3)
        .ok_or_else(|| invalid_data("triangle count overflows"))?;
    let mut indices = read_indices(&mut rdr, index_count, use_32)?;
    let mut highest = 0_u32;
    for index in indices.iter_mut() {
        let code = *index;
        *index = highest
            .checked_sub(code)
            .ok_or_else(|| invalid_data("corrupt high water mark encoding"))?;
        if code == 0 {
            highest += 1;
        }
    }
    if let Some(out_of_range) = indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(invalid_data(format!(
            "triangle index {} exceeds vertex count {}",
            out_of_range, vertex_count
        )));
    }

    let mut edges: [Vec<u32>; 4] = Default::default();
    for edge in edges.iter_mut() {
        let count = rdr.read_u32::<LittleEndian>()? as usize;
        *edge = read_indices(&mut rdr, count, use_32)?;
    }
    let [west_indices, south_indices, east_indices, north_indices] = edges;

    let mut extensions = Vec::new();
    loop {
        let id = match rdr.read_u8() {
            Ok(id) => id,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        };
        let length = rdr.read_u32::<LittleEndian>()? as usize;
        let mut data = Vec::with_capacity(length.min(MAX_RESERVED));
        rdr.by_ref().take(length as u64).read_to_end(&mut data)?;
        if data.len() != length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("extension {} is shorter than {} bytes", id, length),
            ));
        }
        extensions.push(match id {
            EXTENSION_OCT_VERTEX_NORMALS => Extension::OctEncodedVertexNormals(data),
            EXTENSION_WATER_MASK if length == 1 => {
                Extension::WaterMask(WaterMask::Covered(data.first().copied().unwrap_or(0)))
            }
            EXTENSION_WATER_MASK => Extension::WaterMask(WaterMask::Mix(data)),
            EXTENSION_METADATA => {
                let json = data.get(4..).unwrap_or_default();
                Extension::Metadata(String::from_utf8_lossy(json).into_owned())
            }
            id => Extension::Unknown { id, data },
        });
    }

    Ok(QuantizedMesh {
        header,
        u,
        v,
        height,
        indices,
        west_indices,
        south_indices,
        east_indices,
        north_indices,
        extensions,
    })
}

impl QuantizedMesh {
    pub fn vertex_count(&self) -> usize {
        self.u.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Height in meters of vertex `index`.
    pub fn vertex_height(&self, index: usize) -> Option<f64> {
        let quantized = f64::from(*self.height.get(index)?);
        let minimum = f64::from(self.header.minimum_height);
        let maximum = f64::from(self.header.maximum_height);
        Some(minimum + quantized / f64::from(MAX_QUANTIZED) * (maximum - minimum))
    }

    /// Interpolates the height at tile-relative `u`, `v` in `[0, 1]` by finding
    /// the triangle that contains the point.
    pub fn interpolate_height(&self, u: f64, v: f64) -> Option<f64> {
        let u = u.clamp(0.0, 1.0) * f64::from(MAX_QUANTIZED);
        let v = v.clamp(0.0, 1.0) * f64::from(MAX_QUANTIZED);
        for triangle in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [
                triangle[0] as usize,
                triangle[1] as usize,
                triangle[2] as usize,
            ];
            let (u0, v0) = (f64::from(*self.u.get(i0)?), f64::from(*self.v.get(i0)?));
            let (u1, v1) = (f64::from(*self.u.get(i1)?), f64::from(*self.v.get(i1)?));
            let (u2, v2) = (f64::from(*self.u.get(i2)?), f64::from(*self.v.get(i2)?));

            let Some([b0, b1, b2]) = barycentric(u, v, [(u0, v0), (u1, v1), (u2, v2)]) else {
                continue;
            };
            const TOLERANCE: f64 = -1e-9;
            if b0 >= TOLERANCE && b1 >= TOLERANCE && b2 >= TOLERANCE {
                return Some(
                    b0 * self.vertex_height(i0)?
                        + b1 * self.vertex_height(i1)?
                        + b2 * self.vertex_height(i2)?,
                );
            }
        }
        None
    }

    /// Encodes the tile, including extensions, in the quantized-mesh-1.0 layout.
    pub fn write_to(&self, mut w: impl Write) -> io::Result<()> {
        let header = &self.header;
        for value in [header.center_x, header.center_y, header.center_z] {
            w.write_f64::<LittleEndian>(value)?;
        }
        w.write_f32::<LittleEndian>(header.minimum_height)?;
        w.write_f32::<LittleEndian>(header.maximum_height)?;
        for value in [
            header.bounding_sphere_center_x,
            header.bounding_sphere_center_y,
            header.bounding_sphere_center_z,
            header.bounding_sphere_radius,
            header.horizon_occlusion_point_x,
            header.horizon_occlusion_point_y,
            header.horizon_occlusion_point_z,
        ] {
            w.write_f64::<LittleEndian>(value)?;
        }
        let mut position: usize = 88;

        let vertex_count = self.vertex_count();
        if self.v.len() != vertex_count || self.height.len() != vertex_count {
            return Err(invalid_data("u, v and height must have the same length"));
        }
        let vertex_count_u32 =
            u32::try_from(vertex_count).map_err(|_| invalid_data("too many vertices"))?;
        w.write_u32::<LittleEndian>(vertex_count_u32)?;
        position += 4;
        for values in [&self.u, &self.v, &self.height] {
            let mut previous = 0_i32;
            for &value in values.iter() {
                let value = i32::from(value);
                w.write_u16::<LittleEndian>(zigzag_encode(value - previous))?;
                previous = value;
            }
        }
        position += vertex_count * 6;

        let use_32 = vertex_count > 64 * 1024;
        let bytes_per_index = if use_32 { 4 } else { 2 };
        if position % bytes_per_index != 0 {
            w.write_all(&vec![0u8; bytes_per_index - position % bytes_per_index])?;
        }

        let triangle_count = u32::try_from(self.triangle_count())
            .map_err(|_| invalid_data("too many triangles"))?;
        w.write_u32::<LittleEndian>(triangle_count)?;
        let mut highest = 0_u32;
        let mut encoded = Vec::with_capacity(self.indices.len());
        for &index in &self.indices {
            let code = highest
                .checked_sub(index)
                .ok_or_else(|| invalid_data("indices must be introduced in increasing order"))?;
            encoded.push(code);
            if index == highest {
                highest += 1;
            }
        }
        write_indices(&mut w, &encoded, use_32)?;

        for edge in [
            &self.west_indices,
            &self.south_indices,
            &self.east_indices,
            &self.north_indices,
        ] {
            let count = u32::try_from(edge.len()).map_err(|_| invalid_data("edge too long"))?;
            w.write_u32::<LittleEndian>(count)?;
            write_indices(&mut w, edge, use_32)?;
        }

        for extension in &self.extensions {
            let (id, data) = match extension {
                Extension::OctEncodedVertexNormals(data) => {
                    (EXTENSION_OCT_VERTEX_NORMALS, data.clone())
                }
                Extension::WaterMask(WaterMask::Covered(mask)) => (EXTENSION_WATER_MASK, vec![*mask]),
                Extension::WaterMask(WaterMask::Mix(mask)) => (EXTENSION_WATER_MASK, mask.clone()),
                Extension::Metadata(json) => {
                    let mut data = Vec::with_capacity(json.len() + 4);
                    let length =
                        u32::try_from(json.len()).map_err(|_| invalid_data("metadata too long"))?;
                    data.write_u32::<LittleEndian>(length)?;
                    data.extend_from_slice(json.as_bytes());
                    (EXTENSION_METADATA, data)
                }
                Extension::Unknown { id, data } => (*id, data.clone()),
            };
            w.write_u8(id)?;
            let length = u32::try_from(data.len()).map_err(|_| invalid_data("extension too long"))?;
            w.write_u32::<LittleEndian>(length)?;
            w.write_all(&data)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }
}

fn barycentric(x: f64, y: f64, triangle: [(f64, f64); 3]) -> Option<[f64; 3]> {
    let [(x1, y1), (x2, y2), (x3, y3)] = triangle;
    let determinant = (y2 - y3) * (x1 - x3) + (x3 - x2) * (y1 - y3);
    if determinant == 0.0 {
        return None;
    }
    let b0 = ((y2 - y3) * (x - x3) + (x3 - x2) * (y - y3)) / determinant;
    let b1 = ((y3 - y1) * (x - x3) + (x1 - x3) * (y - y3)) / determinant;
    Some([b0, b1, 1.0 - b0 - b1])
}
