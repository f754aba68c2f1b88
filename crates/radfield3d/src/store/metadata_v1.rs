//! Version 1 metadata block.
//!
//! ```text
//! simulation   u64 primary particles, str geometry, str physics list
//! tube         vec3 origin, vec3 direction, str tube id,
//!              u8 shape (0 cone: f32, 1 rectangle: vec2, 2 ellipsis: vec2),
//!              u8 has max energy [f32], u8 has spectrum [u32 n, n × (f32, f32)]
//! software     str name, str version, str repository, str commit
//! dynamic      u32 n, n × (str key, u8 tag, payload)
//! ```
use crate::error::{Error, Result};
use crate::metadata::{
    DynamicValue, FieldShape, Histogram, Metadata, Simulation, Software, Spectrum, Tube,
};
use crate::store::codec::{Decoder, Encoder};
use crate::store::MetadataCodec;

pub(crate) struct MetadataV1Codec;

impl MetadataCodec for MetadataV1Codec {
    fn encode(&self, metadata: &Metadata, enc: &mut Encoder<'_>) -> Result<()> {
        write_simulation(enc, &metadata.simulation)?;
        write_software(enc, &metadata.software)?;

        let entries: Vec<_> = metadata.dynamic_entries().collect();
        enc.count(entries.len(), "dynamic metadata")?;
        for (key, value) in entries {
            enc.str(key)?;
            write_dynamic(enc, value)?;
        }
        Ok(())
    }

    fn decode(&self, dec: &mut Decoder<'_>) -> Result<Metadata> {
        let mut metadata = self.decode_header(dec)?;
        let count = dec.u32()?;
        for _ in 0..count {
            let key = dec.str()?;
            if metadata.has_dynamic(&key) {
                return Err(Error::CorruptFile(format!(
                    "dynamic metadata key '{key}' stored twice"
                )));
            }
            let value = read_dynamic(dec)?;
            metadata.set_dynamic(key, value);
        }
        Ok(metadata)
    }

    fn decode_header(&self, dec: &mut Decoder<'_>) -> Result<Metadata> {
        let simulation = read_simulation(dec)?;
        let software = read_software(dec)?;
        Ok(Metadata::new(simulation, software))
    }
}

fn write_simulation(enc: &mut Encoder<'_>, sim: &Simulation) -> Result<()> {
    enc.u64(sim.primary_particle_count)?;
    enc.str(&sim.geometry)?;
    enc.str(&sim.physics_list)?;

    let tube = &sim.tube;
    enc.vec3(tube.radiation_origin)?;
    enc.vec3(tube.radiation_direction)?;
    enc.str(&tube.tube_id)?;
    enc.u8(tube.field_shape.tag())?;
    match tube.field_shape {
        FieldShape::Cone { opening_angle_deg } => enc.f32(opening_angle_deg)?,
        FieldShape::Rectangle { dimensions_m } => enc.vec2(dimensions_m)?,
        FieldShape::Ellipsis { opening_angles_deg } => enc.vec2(opening_angles_deg)?,
    }

    enc.bool(tube.max_energy_ev().is_some())?;
    if let Some(max) = tube.max_energy_ev() {
        enc.f32(max)?;
    }
    enc.bool(tube.spectrum().is_some())?;
    if let Some(spectrum) = tube.spectrum() {
        enc.count(spectrum.len(), "spectrum bin")?;
        for (energy, intensity) in spectrum.pairs() {
            enc.f32(energy)?;
            enc.f32(intensity)?;
        }
    }
    Ok(())
}

fn read_simulation(dec: &mut Decoder<'_>) -> Result<Simulation> {
    let primary_particle_count = dec.u64()?;
    let geometry = dec.str()?;
    let physics_list = dec.str()?;

    let mut tube = Tube::default();
    tube.radiation_origin = dec.vec3()?;
    tube.radiation_direction = dec.vec3()?;
    tube.tube_id = dec.str()?;
    tube.field_shape = match dec.u8()? {
        0 => FieldShape::Cone {
            opening_angle_deg: dec.f32()?,
        },
        1 => FieldShape::Rectangle {
            dimensions_m: dec.vec2()?,
        },
        2 => FieldShape::Ellipsis {
            opening_angles_deg: dec.vec2()?,
        },
        tag => return Err(Error::CorruptFile(format!("unknown field shape {tag}"))),
    };

    if dec.bool()? {
        tube.set_max_energy_ev(dec.f32()?).map_err(invalid_tube)?;
    }
    if dec.bool()? {
        let bins = dec.u32()? as u64;
        if bins * 8 > dec.remaining()? {
            return Err(Error::CorruptFile("unexpected end of file".into()));
        }
        let mut pairs = Vec::with_capacity(bins as usize);
        for _ in 0..bins {
            pairs.push((dec.f32()?, dec.f32()?));
        }
        let spectrum = Spectrum::from_pairs(&pairs).map_err(invalid_tube)?;
        tube.set_spectrum(spectrum).map_err(invalid_tube)?;
    }

    Ok(Simulation {
        primary_particle_count,
        geometry,
        physics_list,
        tube,
    })
}

fn invalid_tube(err: Error) -> Error {
    Error::CorruptFile(format!("stored tube is invalid: {err}"))
}

fn write_software(enc: &mut Encoder<'_>, software: &Software) -> Result<()> {
    enc.str(&software.name)?;
    enc.str(&software.version)?;
    enc.str(&software.repository)?;
    enc.str(&software.commit)
}

fn read_software(dec: &mut Decoder<'_>) -> Result<Software> {
    Ok(Software {
        name: dec.str()?,
        version: dec.str()?,
        repository: dec.str()?,
        commit: dec.str()?,
    })
}

fn write_dynamic(enc: &mut Encoder<'_>, value: &DynamicValue) -> Result<()> {
    enc.u8(value.tag())?;
    match value {
        DynamicValue::Float32(v) => enc.f32(*v),
        DynamicValue::Float64(v) => enc.f64(*v),
        DynamicValue::Int32(v) => enc.i32(*v),
        DynamicValue::UInt32(v) => enc.u32(*v),
        DynamicValue::UInt64(v) => enc.u64(*v),
        DynamicValue::Vec2(v) => enc.vec2(*v),
        DynamicValue::Vec3(v) => enc.vec3(*v),
        DynamicValue::Vec4(v) => enc.vec4(*v),
        DynamicValue::Text(v) => enc.str(v),
        DynamicValue::Histogram(h) => {
            enc.f32(h.bin_width)?;
            enc.count(h.bins.len(), "histogram bin")?;
            enc.f32s(&h.bins)
        }
    }
}

fn read_dynamic(dec: &mut Decoder<'_>) -> Result<DynamicValue> {
    let value = match dec.u8()? {
        0 => DynamicValue::Float32(dec.f32()?),
        1 => DynamicValue::Float64(dec.f64()?),
        2 => DynamicValue::Int32(dec.i32()?),
        3 => DynamicValue::UInt32(dec.u32()?),
        4 => DynamicValue::UInt64(dec.u64()?),
        5 => DynamicValue::Vec2(dec.vec2()?),
        6 => DynamicValue::Vec3(dec.vec3()?),
        7 => DynamicValue::Vec4(dec.vec4()?),
        8 => DynamicValue::Text(dec.str()?),
        9 => {
            let bin_width = dec.f32()?;
            let len = dec.u32()? as u64;
            if len * 4 > dec.remaining()? {
                return Err(Error::CorruptFile("unexpected end of file".into()));
            }
            let mut bins = vec![0.0; len as usize];
            dec.f32s(&mut bins)?;
            DynamicValue::Histogram(Histogram { bin_width, bins })
        }
        tag => {
            return Err(Error::CorruptFile(format!(
                "unknown dynamic metadata tag {tag}"
            )))
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use glam::{Vec2, Vec3, Vec4};

    use super::*;

    fn sample() -> Metadata {
        let mut meta = Metadata::default();
        meta.simulation.primary_particle_count = 100;
        meta.simulation.geometry = "SomeGeometry".into();
        meta.simulation.physics_list = "PhysList".into();
        let tube = &mut meta.simulation.tube;
        tube.radiation_direction = Vec3::NEG_Y;
        tube.tube_id = "MRTLite".into();
        tube.field_shape = FieldShape::Rectangle {
            dimensions_m: Vec2::new(0.2, 0.3),
        };
        tube.set_max_energy_ev(10e3).unwrap();
        tube.set_spectrum(Spectrum::from_pairs(&[(0.0, 0.25), (5e3, 0.75)]).unwrap())
            .unwrap();
        meta.software.repository = "https://example.org/radfield3d".into();
        meta.set_dynamic("simulation_duration_s", 12.5f64);
        meta.set_dynamic("seed", 7u32);
        meta.set_dynamic("beam", Vec4::new(1.0, 2.0, 3.0, 4.0));
        meta.set_dynamic("material", "water");
        meta.set_dynamic(
            "spectrum_at_detector",
            Histogram {
                bin_width: 0.5,
                bins: vec![0.1, 0.9],
            },
        );
        meta
    }

    fn encode(meta: &Metadata) -> Vec<u8> {
        let mut bytes = Vec::new();
        MetadataV1Codec
            .encode(meta, &mut Encoder::new(&mut bytes))
            .unwrap();
        bytes
    }

    #[test]
    fn full_decode_restores_everything() {
        let meta = sample();
        let mut cursor = Cursor::new(encode(&meta));
        let decoded = MetadataV1Codec
            .decode(&mut Decoder::new(&mut cursor))
            .unwrap();
        assert_eq!(decoded, meta);
        assert_eq!(
            decoded.dynamic_keys().collect::<Vec<_>>(),
            meta.dynamic_keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn header_decode_skips_dynamic_entries() {
        let meta = sample();
        let mut cursor = Cursor::new(encode(&meta));
        let header = MetadataV1Codec
            .decode_header(&mut Decoder::new(&mut cursor))
            .unwrap();
        assert_eq!(header.simulation, meta.simulation);
        assert_eq!(header.software, meta.software);
        assert_eq!(header.dynamic_keys().count(), 0);
    }

    #[test]
    fn unknown_dynamic_tag_is_corrupt() {
        let mut bytes = encode(&Metadata::default());
        // Replace the empty dynamic section with one entry of tag 42.
        bytes.truncate(bytes.len() - 4);
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.push(b'k');
        bytes.push(42);
        let mut cursor = Cursor::new(bytes);
        assert!(matches!(
            MetadataV1Codec.decode(&mut Decoder::new(&mut cursor)),
            Err(Error::CorruptFile(_))
        ));
    }
}
