//! Versioned binary persistence of fields and their metadata.
//!
//! Every file starts with the magic bytes `RF3D` and a little-endian `u32` format version.
//! The rest of the file is owned by the codec registered for that version, so readers
//! pick the layout from the header and old files stay readable when new versions appear.
//!
//! ```no_run
//! use glam::Vec3;
//! use radfield3d::prelude::*;
//!
//! # fn main() -> radfield3d::error::Result<()> {
//! let mut field = RadiationField::cartesian(Vec3::splat(2.0), Vec3::splat(0.1))?;
//! field.add_channel("scattering")?.add_layer("doserate", "Gy/h", DType::Float32)?;
//!
//! FieldStore::store(&field, &Metadata::default(), "field.rf3", StoreVersion::V1)?;
//! let (loaded, metadata) = FieldStore::load("field.rf3")?;
//! # Ok(())
//! # }
//! ```
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::field::{Channel, FieldType, Layer, RadiationField};
use crate::metadata::{Metadata, MetadataVersion};

mod codec;
mod metadata_v1;
mod v1;

pub use codec::ReadSeek;
use codec::{Decoder, Encoder};

/// Magic bytes opening every field file.
pub const MAGIC: &[u8; 4] = b"RF3D";

/// File format version.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StoreVersion {
    #[default]
    V1,
}

impl StoreVersion {
    pub const LATEST: StoreVersion = StoreVersion::V1;

    pub fn as_u32(self) -> u32 {
        match self {
            StoreVersion::V1 => 1,
        }
    }

    pub fn from_u32(version: u32) -> Option<Self> {
        match version {
            1 => Some(StoreVersion::V1),
            _ => None,
        }
    }
}

impl fmt::Display for StoreVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.as_u32())
    }
}

/// Body layout of one file format version. Readers are positioned right after the header.
pub(crate) trait FieldCodec: Send + Sync {
    fn encode(&self, field: &RadiationField, metadata: &Metadata, writer: &mut dyn Write)
        -> Result<()>;

    fn decode(&self, reader: &mut dyn ReadSeek) -> Result<(RadiationField, Metadata)>;

    /// Full metadata without materializing voxel buffers.
    fn decode_metadata(&self, reader: &mut dyn ReadSeek) -> Result<Metadata>;

    /// Simulation and software metadata only.
    fn peek_metadata(&self, reader: &mut dyn ReadSeek) -> Result<Metadata>;

    fn decode_field_type(&self, reader: &mut dyn ReadSeek) -> Result<FieldType>;

    fn decode_channel(&self, reader: &mut dyn ReadSeek, channel: &str) -> Result<Channel>;

    fn decode_layer(&self, reader: &mut dyn ReadSeek, channel: &str, layer: &str)
        -> Result<Layer>;
}

/// Layout of one metadata block version.
pub(crate) trait MetadataCodec: Send + Sync {
    fn encode(&self, metadata: &Metadata, enc: &mut Encoder<'_>) -> Result<()>;

    fn decode(&self, dec: &mut Decoder<'_>) -> Result<Metadata>;

    /// Fixed part only; dynamic entries are left unread.
    fn decode_header(&self, dec: &mut Decoder<'_>) -> Result<Metadata>;
}

fn field_codec(version: StoreVersion) -> &'static dyn FieldCodec {
    match version {
        StoreVersion::V1 => &v1::V1Codec,
    }
}

pub(crate) fn metadata_codec(version: MetadataVersion) -> &'static dyn MetadataCodec {
    match version {
        MetadataVersion::V1 => &metadata_v1::MetadataV1Codec,
    }
}

fn write_header(writer: &mut dyn Write, version: StoreVersion) -> Result<()> {
    writer.write_all(MAGIC)?;
    Encoder::new(writer).u32(version.as_u32())
}

fn read_header(reader: &mut dyn ReadSeek) -> Result<StoreVersion> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic).map_err(Error::from_read)?;
    if &magic != MAGIC {
        return Err(Error::CorruptFile(format!(
            "not a field file, magic {magic:02x?}"
        )));
    }
    let version = Decoder::new(reader).u32()?;
    StoreVersion::from_u32(version).ok_or(Error::UnsupportedVersion(version))
}

/// Reads and writes field files.
pub struct FieldStore;

impl FieldStore {
    /// Writes `field` and `metadata` to `path` using the layout of `version`.
    pub fn store(
        field: &RadiationField,
        metadata: &Metadata,
        path: impl AsRef<Path>,
        version: StoreVersion,
    ) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        Self::write(field, metadata, &mut writer, version)?;
        writer.flush()?;
        info!(
            path = %path.display(),
            %version,
            channels = field.channels().count(),
            voxels = field.voxel_count(),
            "stored field"
        );
        Ok(())
    }

    /// Writes a complete field file to `writer`.
    pub fn write(
        field: &RadiationField,
        metadata: &Metadata,
        writer: &mut dyn Write,
        version: StoreVersion,
    ) -> Result<()> {
        let codec = field_codec(version);
        write_header(writer, version)?;
        codec.encode(field, metadata, writer)
    }

    /// Loads field and metadata; the format version is taken from the file header.
    pub fn load(path: impl AsRef<Path>) -> Result<(RadiationField, Metadata)> {
        let path = path.as_ref();
        let (field, metadata) = Self::read(&mut open(path)?)?;
        info!(path = %path.display(), %field, "loaded field");
        Ok((field, metadata))
    }

    /// Reads a complete field file from `reader`.
    pub fn read(reader: &mut dyn ReadSeek) -> Result<(RadiationField, Metadata)> {
        let codec = dispatch(reader)?;
        codec.decode(reader)
    }

    /// Full metadata, dynamic entries included, without loading voxel data.
    pub fn load_metadata(path: impl AsRef<Path>) -> Result<Metadata> {
        let mut reader = open(path.as_ref())?;
        dispatch(&mut reader)?.decode_metadata(&mut reader)
    }

    /// Simulation and software metadata only; dynamic entries stay empty.
    pub fn peek_metadata(path: impl AsRef<Path>) -> Result<Metadata> {
        let mut reader = open(path.as_ref())?;
        dispatch(&mut reader)?.peek_metadata(&mut reader)
    }

    pub fn peek_version(path: impl AsRef<Path>) -> Result<StoreVersion> {
        read_header(&mut open(path.as_ref())?)
    }

    pub fn peek_field_type(path: impl AsRef<Path>) -> Result<FieldType> {
        let mut reader = open(path.as_ref())?;
        dispatch(&mut reader)?.decode_field_type(&mut reader)
    }

    /// Loads a single channel, seeking past the buffers of all others.
    pub fn load_single_channel(path: impl AsRef<Path>, channel: &str) -> Result<Channel> {
        let mut reader = open(path.as_ref())?;
        dispatch(&mut reader)?.decode_channel(&mut reader, channel)
    }

    /// Loads a single layer of `channel`, seeking past every other buffer.
    pub fn load_single_layer(path: impl AsRef<Path>, channel: &str, layer: &str) -> Result<Layer> {
        let mut reader = open(path.as_ref())?;
        dispatch(&mut reader)?.decode_layer(&mut reader, channel, layer)
    }
}

fn open(path: &Path) -> Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}

fn dispatch(reader: &mut dyn ReadSeek) -> Result<&'static dyn FieldCodec> {
    let version = read_header(reader)?;
    debug!(%version, "dispatching to field codec");
    Ok(field_codec(version))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use glam::{UVec3, Vec2, Vec3, Vec4};
    use tempfile::TempDir;

    use super::*;
    use crate::field::DType;
    use crate::metadata::Spectrum;

    fn field() -> RadiationField {
        let mut field = RadiationField::cartesian(Vec3::splat(2.0), Vec3::splat(0.5)).unwrap();
        let scatter = field.add_channel("scattering").unwrap();
        scatter.add_layer("doserate", "Gy/h", DType::Float32).unwrap();
        scatter.add_layer("hits", "counts", DType::UInt64).unwrap();
        scatter.add_layer("directions", "", DType::Vec3).unwrap();
        scatter.add_histogram_layer("spectrum", "", 4, 2500.0).unwrap();
        scatter
            .get_voxel_mut("doserate", 1, 2, 3)
            .unwrap()
            .set(4.5f32)
            .unwrap();
        scatter
            .get_voxel_mut("directions", 0, 1, 0)
            .unwrap()
            .set(Vec3::new(1.67, 1.85, 2.0))
            .unwrap();
        scatter
            .get_voxel_mut("spectrum", 0, 0, 0)
            .unwrap()
            .histogram_mut()
            .unwrap()
            .copy_from_slice(&[0.1, 0.2, 0.3, 0.4]);
        scatter
            .get_layer_mut("doserate")
            .unwrap()
            .set_statistical_error(0.05);

        let primary = field.add_channel("primary").unwrap();
        primary.add_layer("energy", "Gy", DType::Float64).unwrap();
        primary
            .get_voxel_flat_mut("energy", 63)
            .unwrap()
            .set(1.25f64)
            .unwrap();
        primary.add_layer("interactions", "", DType::Int32).unwrap();
        primary.add_layer("photons", "counts", DType::UInt32).unwrap();
        primary.add_layer("flags", "", DType::Char).unwrap();
        primary.add_layer("detector_uv", "m", DType::Vec2).unwrap();
        primary.add_layer("polarization", "", DType::Vec4).unwrap();
        primary
            .get_voxel_mut("interactions", 3, 0, 1)
            .unwrap()
            .set(-7i32)
            .unwrap();
        primary
            .get_voxel_mut("photons", 2, 2, 2)
            .unwrap()
            .set(u32::MAX)
            .unwrap();
        primary
            .get_voxel_mut("flags", 0, 3, 0)
            .unwrap()
            .set(-1i8)
            .unwrap();
        primary
            .get_voxel_mut("detector_uv", 1, 1, 1)
            .unwrap()
            .set(Vec2::new(0.25, -0.75))
            .unwrap();
        primary
            .get_voxel_mut("polarization", 0, 0, 3)
            .unwrap()
            .set(Vec4::new(1.0, 0.0, -1.0, 0.5))
            .unwrap();
        field
    }

    fn metadata() -> Metadata {
        let mut meta = Metadata::default();
        meta.simulation.primary_particle_count = 100;
        meta.simulation.geometry = "SomeGeometry".into();
        meta.simulation.physics_list = "PhysList".into();
        meta.simulation.tube.set_max_energy_ev(10e3).unwrap();
        meta.simulation
            .tube
            .set_spectrum(Spectrum::from_pairs(&[(1e3, 0.5), (2e3, 0.5)]).unwrap())
            .unwrap();
        meta.software.version = "v0.1.0".into();
        meta.set_dynamic("simulation_duration_s", 3600.0f64);
        meta
    }

    fn stored(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("field.rf3");
        FieldStore::store(&field(), &metadata(), &path, StoreVersion::V1).unwrap();
        path
    }

    #[test]
    fn round_trip_restores_field_and_metadata() {
        let dir = TempDir::new().unwrap();
        let path = stored(&dir);

        let (loaded, meta) = FieldStore::load(&path).unwrap();
        assert_eq!(loaded, field());
        assert_eq!(meta, metadata());

        let channel = loaded.get_channel("scattering").unwrap();
        assert_eq!(
            channel.get_voxel("doserate", 1, 2, 3).unwrap().get::<f32>().unwrap(),
            4.5
        );
        assert_eq!(
            channel.get_layer("doserate").unwrap().statistical_error(),
            0.05
        );
        assert_eq!(
            loaded.channel_names().collect::<Vec<_>>(),
            ["scattering", "primary"]
        );
    }

    #[test]
    fn metadata_can_be_loaded_without_voxels() {
        let dir = TempDir::new().unwrap();
        let path = stored(&dir);

        let full = FieldStore::load_metadata(&path).unwrap();
        assert_eq!(full, metadata());
        assert_eq!(
            full.get_dynamic_as::<f64>("simulation_duration_s").unwrap(),
            3600.0
        );

        let peeked = FieldStore::peek_metadata(&path).unwrap();
        assert_eq!(peeked.simulation, metadata().simulation);
        assert_eq!(peeked.software, metadata().software);
        assert_eq!(peeked.dynamic_keys().count(), 0);
    }

    #[test]
    fn peeks_read_only_the_header() {
        let dir = TempDir::new().unwrap();
        let path = stored(&dir);
        assert_eq!(FieldStore::peek_version(&path).unwrap(), StoreVersion::V1);
        assert_eq!(
            FieldStore::peek_field_type(&path).unwrap(),
            FieldType::Cartesian
        );

        let polar_path = dir.path().join("polar.rf3");
        let polar = RadiationField::polar(1.0, Vec3::new(0.25, 0.5, 0.5)).unwrap();
        FieldStore::store(&polar, &Metadata::default(), &polar_path, StoreVersion::V1).unwrap();
        assert_eq!(
            FieldStore::peek_field_type(&polar_path).unwrap(),
            FieldType::Polar
        );
        let (loaded, _) = FieldStore::load(&polar_path).unwrap();
        assert_eq!(loaded.geometry(), polar.geometry());
    }

    #[test]
    fn single_channel_and_layer_loads() {
        let dir = TempDir::new().unwrap();
        let path = stored(&dir);
        let expected = field();

        let primary = FieldStore::load_single_channel(&path, "primary").unwrap();
        assert_eq!(&primary, expected.get_channel("primary").unwrap());

        let spectrum = FieldStore::load_single_layer(&path, "scattering", "spectrum").unwrap();
        assert_eq!(spectrum.bins(), 4);
        assert_eq!(spectrum.histogram(0).unwrap(), &[0.1, 0.2, 0.3, 0.4]);
        assert_eq!(
            &spectrum,
            expected
                .get_channel("scattering")
                .unwrap()
                .get_layer("spectrum")
                .unwrap()
        );

        assert!(matches!(
            FieldStore::load_single_channel(&path, "missing"),
            Err(Error::NotFound { kind: "channel", .. })
        ));
        assert!(matches!(
            FieldStore::load_single_layer(&path, "primary", "doserate"),
            Err(Error::NotFound { kind: "layer", .. })
        ));
    }

    #[test]
    fn every_dtype_survives_a_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = stored(&dir);

        let primary = FieldStore::load_single_channel(&path, "primary").unwrap();
        let dtypes: Vec<_> = primary
            .layer_names()
            .map(|name| primary.get_layer(name).unwrap().dtype())
            .collect();
        assert_eq!(
            dtypes,
            [
                DType::Float64,
                DType::Int32,
                DType::UInt32,
                DType::Char,
                DType::Vec2,
                DType::Vec4
            ]
        );
        assert_eq!(
            primary.get_voxel("interactions", 3, 0, 1).unwrap().get::<i32>().unwrap(),
            -7
        );
        assert_eq!(
            primary.get_voxel("photons", 2, 2, 2).unwrap().get::<u32>().unwrap(),
            u32::MAX
        );
        assert_eq!(
            primary.get_voxel("flags", 0, 3, 0).unwrap().get::<i8>().unwrap(),
            -1
        );
        assert_eq!(
            primary.get_voxel("detector_uv", 1, 1, 1).unwrap().get::<Vec2>().unwrap(),
            Vec2::new(0.25, -0.75)
        );
        assert_eq!(
            primary.get_voxel("polarization", 0, 0, 3).unwrap().get::<Vec4>().unwrap(),
            Vec4::new(1.0, 0.0, -1.0, 0.5)
        );
        assert_eq!(
            primary.get_voxel("photons", 0, 0, 0).unwrap().get::<u32>().unwrap(),
            0
        );
    }

    #[test]
    fn in_memory_round_trip() {
        let mut bytes = Vec::new();
        FieldStore::write(&field(), &metadata(), &mut bytes, StoreVersion::V1).unwrap();
        assert_eq!(&bytes[..4], MAGIC);
        assert_eq!(&bytes[4..8], &1u32.to_le_bytes());

        let (loaded, _) = FieldStore::read(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(loaded.grid_dims(), UVec3::splat(4));
    }

    #[test]
    fn wrong_magic_is_corrupt() {
        let mut bytes = Vec::new();
        FieldStore::write(&field(), &metadata(), &mut bytes, StoreVersion::V1).unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            FieldStore::read(&mut Cursor::new(bytes)),
            Err(Error::CorruptFile(_))
        ));
    }

    #[test]
    fn unknown_version_is_unsupported() {
        let mut bytes = Vec::new();
        FieldStore::write(&field(), &metadata(), &mut bytes, StoreVersion::V1).unwrap();
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
        assert!(matches!(
            FieldStore::read(&mut Cursor::new(bytes)),
            Err(Error::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn truncated_files_are_corrupt() {
        let mut bytes = Vec::new();
        FieldStore::write(&field(), &metadata(), &mut bytes, StoreVersion::V1).unwrap();
        for len in [6, 20, bytes.len() / 2, bytes.len() - 1] {
            let result = FieldStore::read(&mut Cursor::new(bytes[..len].to_vec()));
            assert!(
                matches!(result, Err(Error::CorruptFile(_))),
                "length {len}: {result:?}"
            );
        }
    }

    #[test]
    fn element_count_mismatch_is_corrupt() {
        let mut field = RadiationField::cartesian(Vec3::ONE, Vec3::splat(0.5)).unwrap();
        field
            .add_channel("c")
            .unwrap()
            .add_layer("l", "u", DType::Int32)
            .unwrap();
        let mut bytes = Vec::new();
        FieldStore::write(&field, &Metadata::default(), &mut bytes, StoreVersion::V1).unwrap();

        // header 8, geometry 25, channel count 4, "c" 5, layer count 4,
        // "l" 5, "u" 5, dtype 1, bins 4, bin width 4, stat error 4
        let offset = 8 + 25 + 4 + 5 + 4 + 5 + 5 + 1 + 4 + 4 + 4;
        assert_eq!(&bytes[offset..offset + 8], &8u64.to_le_bytes());
        bytes[offset..offset + 8].copy_from_slice(&9u64.to_le_bytes());
        assert!(matches!(
            FieldStore::read(&mut Cursor::new(bytes)),
            Err(Error::CorruptFile(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            FieldStore::load(dir.path().join("absent.rf3")),
            Err(Error::Io(_))
        ));
    }
}
