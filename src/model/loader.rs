// Binary studio model reader.
//
// The on-disk layout is a fixed header followed by offset-addressed tables
// of fixed-size records. Every table is reached through an absolute byte
// offset in the header, so tables can appear in any order. All integers are
// little-endian. Validation happens at load time; the rest of the crate
// trusts the indices a loaded model carries.

use std::io::{Cursor, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use glam::Vec3;

use crate::palette::{PaletteTexture, PALETTE_SIZE};

use super::{
    Bone, BoneController, BodyPart, Hitbox, Mesh, MeshVertex, Sequence, StudioModel, SubModel,
    BONE_CHANNELS,
};

const MAGIC: &[u8; 4] = b"IDST";
pub const FORMAT_VERSION: u32 = 10;

const NAME_LEN: usize = 64;
const LABEL_LEN: usize = 32;

const BONE_RECORD: u64 = 84;
const CONTROLLER_RECORD: u64 = 24;
const HITBOX_RECORD: u64 = 32;
const SEQUENCE_RECORD: u64 = 76;
const BODY_PART_RECORD: u64 = 40;
const SUBMODEL_RECORD: u64 = 40;
const MESH_RECORD: u64 = 12;
const STRIP_RECORD: u64 = 8;
const VERTEX_RECORD: u64 = 24;
const TEXTURE_RECORD: u64 = 80;

pub fn load_model_file(path: impl AsRef<Path>) -> Result<StudioModel> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read model file {}", path.display()))?;
    load_model(&bytes).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn load_model(bytes: &[u8]) -> Result<StudioModel> {
    let mut cur = Cursor::new(bytes);

    let mut magic = [0u8; 4];
    cur.read_exact(&mut magic).context("truncated header")?;
    if &magic != MAGIC {
        bail!("not a studio model (bad magic)");
    }
    let version = cur.read_u32::<LittleEndian>()?;
    if version != FORMAT_VERSION {
        bail!("unsupported studio version {version}, expected {FORMAT_VERSION}");
    }
    let name = read_name(&mut cur, NAME_LEN)?;

    let (bone_count, bone_offset) = read_table(&mut cur)?;
    let (controller_count, controller_offset) = read_table(&mut cur)?;
    let (hitbox_count, hitbox_offset) = read_table(&mut cur)?;
    let (sequence_count, sequence_offset) = read_table(&mut cur)?;
    let (body_part_count, body_part_offset) = read_table(&mut cur)?;
    let (texture_count, texture_offset) = read_table(&mut cur)?;
    let skin_refs = cur.read_u32::<LittleEndian>()? as usize;
    let skin_families = cur.read_u32::<LittleEndian>()? as usize;
    let skin_offset = cur.read_u32::<LittleEndian>()? as u64;

    validate_table(bone_count, BONE_RECORD, bone_offset, bytes.len(), "bone")?;
    validate_table(
        controller_count,
        CONTROLLER_RECORD,
        controller_offset,
        bytes.len(),
        "controller",
    )?;
    validate_table(hitbox_count, HITBOX_RECORD, hitbox_offset, bytes.len(), "hitbox")?;
    validate_table(
        sequence_count,
        SEQUENCE_RECORD,
        sequence_offset,
        bytes.len(),
        "sequence",
    )?;
    validate_table(
        body_part_count,
        BODY_PART_RECORD,
        body_part_offset,
        bytes.len(),
        "body part",
    )?;
    validate_table(texture_count, TEXTURE_RECORD, texture_offset, bytes.len(), "texture")?;

    // Bones. Parents must precede children so pose evaluation can walk the
    // list front to back.
    let mut bones = Vec::with_capacity(bone_count);
    for i in 0..bone_count {
        cur.set_position(bone_offset + i as u64 * BONE_RECORD);
        let bone_name = read_name(&mut cur, LABEL_LEN)
            .with_context(|| format!("truncated bone {i}"))?;
        let parent = cur.read_i32::<LittleEndian>()?;
        let parent = match parent {
            -1 => None,
            p if p >= 0 && (p as usize) < i => Some(p as usize),
            p => bail!("bone {i} has parent {p}; parents must precede children"),
        };
        let mut controllers = [None; BONE_CHANNELS];
        for slot in &mut controllers {
            let c = cur.read_i32::<LittleEndian>()?;
            *slot = optional_index(c, controller_count, "bone controller")?;
        }
        let mut defaults = [0.0f32; BONE_CHANNELS];
        for value in &mut defaults {
            *value = cur.read_f32::<LittleEndian>()?;
        }
        bones.push(Bone {
            name: bone_name,
            parent,
            defaults,
            controllers,
        });
    }

    let mut controllers = Vec::with_capacity(controller_count);
    for i in 0..controller_count {
        cur.set_position(controller_offset + i as u64 * CONTROLLER_RECORD);
        let bone = checked_index(cur.read_i32::<LittleEndian>()?, bones.len(), "controller bone")?;
        let channel = cur.read_u32::<LittleEndian>()? as usize;
        if channel >= BONE_CHANNELS {
            bail!("controller {i} drives channel {channel}, out of range");
        }
        let start = cur.read_f32::<LittleEndian>()?;
        let end = cur.read_f32::<LittleEndian>()?;
        let rest = cur.read_i32::<LittleEndian>()?;
        let index = cur.read_i32::<LittleEndian>()?;
        controllers.push(BoneController {
            bone,
            channel,
            start,
            end,
            rest,
            index,
        });
    }

    let mut hitboxes = Vec::with_capacity(hitbox_count);
    for i in 0..hitbox_count {
        cur.set_position(hitbox_offset + i as u64 * HITBOX_RECORD);
        let bone = checked_index(cur.read_i32::<LittleEndian>()?, bones.len(), "hitbox bone")?;
        let group = cur.read_i32::<LittleEndian>()?;
        let bbmin = read_vec3(&mut cur)?;
        let bbmax = read_vec3(&mut cur)?;
        hitboxes.push(Hitbox {
            bone,
            group,
            bbmin,
            bbmax,
        });
    }

    let mut sequences = Vec::with_capacity(sequence_count);
    for i in 0..sequence_count {
        cur.set_position(sequence_offset + i as u64 * SEQUENCE_RECORD);
        let label = read_name(&mut cur, LABEL_LEN)
            .with_context(|| format!("truncated sequence {i}"))?;
        let fps = cur.read_f32::<LittleEndian>()?;
        let flags = cur.read_u32::<LittleEndian>()?;
        let frame_count = cur.read_u32::<LittleEndian>()?;
        let bbmin = read_vec3(&mut cur)?;
        let bbmax = read_vec3(&mut cur)?;
        let motion_offset = cur.read_u32::<LittleEndian>()? as usize;
        let motion_len = cur.read_u32::<LittleEndian>()? as usize;
        let motion = slice_blob(bytes, motion_offset, motion_len)
            .with_context(|| format!("sequence {label:?} motion data out of bounds"))?
            .to_vec();
        sequences.push(Sequence {
            label,
            fps,
            flags,
            frame_count,
            bbmin,
            bbmax,
            motion,
        });
    }

    let mut body_parts = Vec::with_capacity(body_part_count);
    for i in 0..body_part_count {
        cur.set_position(body_part_offset + i as u64 * BODY_PART_RECORD);
        let part_name = read_name(&mut cur, LABEL_LEN)?;
        let (model_count, model_offset) = read_table(&mut cur)?;
        validate_table(model_count, SUBMODEL_RECORD, model_offset, bytes.len(), "submodel")?;

        let mut models = Vec::with_capacity(model_count);
        for m in 0..model_count {
            cur.set_position(model_offset + m as u64 * SUBMODEL_RECORD);
            let model_name = read_name(&mut cur, LABEL_LEN)?;
            let (mesh_count, mesh_offset) = read_table(&mut cur)?;
            validate_table(mesh_count, MESH_RECORD, mesh_offset, bytes.len(), "mesh")?;

            let mut meshes = Vec::with_capacity(mesh_count);
            for k in 0..mesh_count {
                cur.set_position(mesh_offset + k as u64 * MESH_RECORD);
                let skin_ref = cur.read_u32::<LittleEndian>()? as usize;
                if skin_ref >= skin_refs {
                    bail!(
                        "mesh in body part {part_name:?} uses skin ref {skin_ref}, \
                         table has {skin_refs}"
                    );
                }
                let (strip_count, strip_offset) = read_table(&mut cur)?;
                validate_table(strip_count, STRIP_RECORD, strip_offset, bytes.len(), "strip")?;

                let mut strips = Vec::with_capacity(strip_count);
                for s in 0..strip_count {
                    cur.set_position(strip_offset + s as u64 * STRIP_RECORD);
                    let (vertex_count, vertex_offset) = read_table(&mut cur)?;
                    validate_table(vertex_count, VERTEX_RECORD, vertex_offset, bytes.len(), "vertex")?;
                    let mut vertices = Vec::with_capacity(vertex_count);
                    for v in 0..vertex_count {
                        cur.set_position(vertex_offset + v as u64 * VERTEX_RECORD);
                        let bone = cur.read_u32::<LittleEndian>()? as usize;
                        if bone >= bones.len() {
                            bail!("vertex references bone {bone}, model has {}", bones.len());
                        }
                        let pos = [
                            cur.read_f32::<LittleEndian>()?,
                            cur.read_f32::<LittleEndian>()?,
                            cur.read_f32::<LittleEndian>()?,
                        ];
                        let uv = [
                            cur.read_f32::<LittleEndian>()?,
                            cur.read_f32::<LittleEndian>()?,
                        ];
                        vertices.push(MeshVertex { bone, pos, uv });
                    }
                    strips.push(vertices);
                }
                meshes.push(Mesh { skin_ref, strips });
            }
            models.push(SubModel {
                name: model_name,
                meshes,
            });
        }
        body_parts.push(BodyPart {
            name: part_name,
            models,
        });
    }

    let mut textures = Vec::with_capacity(texture_count);
    for i in 0..texture_count {
        cur.set_position(texture_offset + i as u64 * TEXTURE_RECORD);
        let tex_name = read_name(&mut cur, NAME_LEN)?;
        let width = cur.read_u32::<LittleEndian>()?;
        let height = cur.read_u32::<LittleEndian>()?;
        let pixels_offset = cur.read_u32::<LittleEndian>()? as usize;
        let palette_offset = cur.read_u32::<LittleEndian>()? as usize;
        let pixel_count = width as u64 * height as u64;
        if pixel_count > bytes.len() as u64 {
            bail!(
                "texture {tex_name:?} claims {width}x{height} pixels, more than the \
                 {} byte file holds",
                bytes.len()
            );
        }
        let pixels = slice_blob(bytes, pixels_offset, pixel_count as usize)
            .with_context(|| format!("texture {tex_name:?} pixels out of bounds"))?
            .to_vec();
        let palette = slice_blob(bytes, palette_offset, PALETTE_SIZE)
            .with_context(|| format!("texture {tex_name:?} palette out of bounds"))?
            .to_vec();
        textures.push(PaletteTexture::new(tex_name, width, height, pixels, palette)?);
    }

    let skin_entries = skin_families
        .checked_mul(skin_refs)
        .filter(|&n| {
            (n as u64)
                .checked_mul(2)
                .and_then(|span| span.checked_add(skin_offset))
                .is_some_and(|end| end <= bytes.len() as u64)
        })
        .with_context(|| {
            format!("skin table of {skin_families} families x {skin_refs} refs exceeds file")
        })?;
    cur.set_position(skin_offset);
    let mut skin_table = Vec::with_capacity(skin_entries);
    for _ in 0..skin_entries {
        let entry = cur.read_u16::<LittleEndian>().context("truncated skin table")?;
        if entry as usize >= textures.len() {
            bail!("skin table entry {entry} exceeds texture count {}", textures.len());
        }
        skin_table.push(entry);
    }

    log::info!(
        "loaded studio model {name:?}: {} bones, {} sequences, {} body parts, {} textures",
        bones.len(),
        sequences.len(),
        body_parts.len(),
        textures.len()
    );

    Ok(StudioModel {
        name,
        bones,
        controllers,
        hitboxes,
        sequences,
        body_parts,
        textures,
        skin_refs,
        skin_table,
    })
}

fn read_table(cur: &mut Cursor<&[u8]>) -> Result<(usize, u64)> {
    let count = cur.read_u32::<LittleEndian>()? as usize;
    let offset = cur.read_u32::<LittleEndian>()? as u64;
    Ok((count, offset))
}

/// Bounds-checks a count+offset table before any allocation sized by it.
/// Counts come straight from the file, so the arithmetic must not trust them.
fn validate_table(count: usize, record: u64, offset: u64, file_len: usize, what: &str) -> Result<()> {
    let fits = (count as u64)
        .checked_mul(record)
        .and_then(|span| span.checked_add(offset))
        .is_some_and(|end| end <= file_len as u64);
    if !fits {
        bail!(
            "{what} table of {count} records at offset {offset} exceeds file of {file_len} bytes"
        );
    }
    Ok(())
}

fn read_vec3(cur: &mut Cursor<&[u8]>) -> Result<Vec3> {
    Ok(Vec3::new(
        cur.read_f32::<LittleEndian>()?,
        cur.read_f32::<LittleEndian>()?,
        cur.read_f32::<LittleEndian>()?,
    ))
}

/// Fixed-width NUL-padded string field.
fn read_name(cur: &mut Cursor<&[u8]>, len: usize) -> Result<String> {
    let mut buf = vec![0u8; len];
    cur.read_exact(&mut buf)?;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(len);
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}

fn slice_blob(bytes: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    let end = offset.checked_add(len).context("blob range overflows")?;
    bytes
        .get(offset..end)
        .with_context(|| format!("blob {offset}..{end} exceeds file of {} bytes", bytes.len()))
}

fn checked_index(value: i32, limit: usize, what: &str) -> Result<usize> {
    match usize::try_from(value) {
        Ok(index) if index < limit => Ok(index),
        _ => bail!("{what} index {value} out of range (limit {limit})"),
    }
}

fn optional_index(value: i32, limit: usize, what: &str) -> Result<Option<usize>> {
    if value == -1 {
        return Ok(None);
    }
    checked_index(value, limit, what).map(Some)
}
