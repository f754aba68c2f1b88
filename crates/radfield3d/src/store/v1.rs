//! Version 1 field body: geometry, channel and layer schema, raw buffers, metadata.
//!
//! All layer buffers follow the schema back to back, so the offset of any layer is known
//! once the schema is read and partial loads seek straight to it.
use std::io::Write;

use tracing::debug;

use crate::error::{Error, Result};
use crate::field::{Channel, DType, FieldGeometry, FieldType, Layer, RadiationField};
use crate::metadata::{Metadata, MetadataVersion};
use crate::store::codec::{Decoder, Encoder, ReadSeek};
use crate::store::{metadata_codec, FieldCodec};

pub(crate) struct V1Codec;

/// Schema entry of one stored layer.
#[derive(Debug, Clone)]
struct LayerEntry {
    name: String,
    unit: String,
    dtype: DType,
    bins: usize,
    bin_width: f32,
    statistical_error: f32,
    element_count: u64,
}

impl LayerEntry {
    /// Number of stored elements, `bins` per voxel for histograms.
    fn buffer_len(&self) -> usize {
        (self.element_count as usize).saturating_mul(self.bins)
    }

    fn byte_len(&self) -> u64 {
        (self.buffer_len() as u64).saturating_mul(self.dtype.element_size() as u64)
    }

    fn read_layer(&self, dec: &mut Decoder<'_>) -> Result<Layer> {
        let buffer = dec.buffer(self.dtype, self.buffer_len())?;
        let mut layer =
            Layer::from_buffer(&self.name, &self.unit, self.bins, self.bin_width, buffer);
        layer.set_statistical_error(self.statistical_error);
        Ok(layer)
    }
}

#[derive(Debug, Clone)]
struct ChannelEntry {
    name: String,
    layers: Vec<LayerEntry>,
}

impl ChannelEntry {
    fn byte_len(&self) -> u64 {
        self.layers
            .iter()
            .map(LayerEntry::byte_len)
            .fold(0, u64::saturating_add)
    }
}

/// Everything in front of the raw buffers.
#[derive(Debug, Clone)]
struct Schema {
    geometry: FieldGeometry,
    channels: Vec<ChannelEntry>,
}

impl Schema {
    fn read(dec: &mut Decoder<'_>) -> Result<Self> {
        let geometry = read_geometry(dec)?;
        let voxel_count = geometry.voxel_count() as u64;

        let channel_count = dec.u32()?;
        let mut channels: Vec<ChannelEntry> = Vec::new();
        for _ in 0..channel_count {
            let name = dec.str()?;
            if channels.iter().any(|c| c.name == name) {
                return Err(Error::CorruptFile(format!("channel '{name}' stored twice")));
            }
            let layer_count = dec.u32()?;
            let mut layers: Vec<LayerEntry> = Vec::new();
            for _ in 0..layer_count {
                let layer = read_layer_entry(dec)?;
                if layers.iter().any(|l| l.name == layer.name) {
                    return Err(Error::CorruptFile(format!(
                        "layer '{}' stored twice in channel '{name}'",
                        layer.name
                    )));
                }
                if layer.element_count != voxel_count {
                    return Err(Error::CorruptFile(format!(
                        "layer '{}' stores {} voxels, the grid has {voxel_count}",
                        layer.name, layer.element_count
                    )));
                }
                layers.push(layer);
            }
            channels.push(ChannelEntry { name, layers });
        }

        let schema = Schema { geometry, channels };
        let payload = schema.buffer_bytes();
        if payload > dec.remaining()? {
            return Err(Error::CorruptFile(format!(
                "schema describes {payload} bytes of voxel data past the end of the file"
            )));
        }
        Ok(schema)
    }

    fn buffer_bytes(&self) -> u64 {
        self.channels
            .iter()
            .map(ChannelEntry::byte_len)
            .fold(0, u64::saturating_add)
    }

    /// Byte offset of the channel's first buffer relative to the start of the buffers.
    fn locate_channel(&self, name: &str) -> Result<(u64, &ChannelEntry)> {
        let mut offset = 0;
        for channel in &self.channels {
            if channel.name == name {
                return Ok((offset, channel));
            }
            offset += channel.byte_len();
        }
        Err(Error::not_found("channel", name))
    }
}

fn read_geometry(dec: &mut Decoder<'_>) -> Result<FieldGeometry> {
    let tag = dec.u8()?;
    let field_type = FieldType::from_tag(tag)
        .ok_or_else(|| Error::CorruptFile(format!("unknown field type {tag}")))?;
    let size = dec.vec3()?;
    let voxel_size = dec.vec3()?;
    FieldGeometry::new(field_type, size, voxel_size)
        .map_err(|e| Error::CorruptFile(format!("stored geometry is invalid: {e}")))
}

fn read_layer_entry(dec: &mut Decoder<'_>) -> Result<LayerEntry> {
    let name = dec.str()?;
    let unit = dec.str()?;
    let tag = dec.u8()?;
    let dtype = DType::from_tag(tag)
        .ok_or_else(|| Error::CorruptFile(format!("layer '{name}' has unknown dtype {tag}")))?;
    let bins = dec.u32()? as usize;
    let bin_width = dec.f32()?;
    let statistical_error = dec.f32()?;
    let element_count = dec.u64()?;
    if bins == 0 || (dtype != DType::Hist && bins != 1) {
        return Err(Error::CorruptFile(format!(
            "layer '{name}' of {dtype} has {bins} bins"
        )));
    }
    Ok(LayerEntry {
        name,
        unit,
        dtype,
        bins,
        bin_width,
        statistical_error,
        element_count,
    })
}

fn write_schema(enc: &mut Encoder<'_>, field: &RadiationField) -> Result<()> {
    let geometry = field.geometry();
    enc.u8(geometry.field_type().tag())?;
    enc.vec3(geometry.size())?;
    enc.vec3(geometry.voxel_size())?;

    let channels: Vec<&Channel> = field.channels().collect();
    enc.count(channels.len(), "channel")?;
    for channel in channels {
        enc.str(channel.name())?;
        enc.count(channel.len(), "layer")?;
        for layer in channel.layers() {
            enc.str(layer.name())?;
            enc.str(layer.unit())?;
            enc.u8(layer.dtype().tag())?;
            enc.count(layer.bins(), "histogram bin")?;
            enc.f32(layer.bin_width())?;
            enc.f32(layer.statistical_error())?;
            enc.u64(layer.voxel_count() as u64)?;
        }
    }
    Ok(())
}

fn read_metadata(dec: &mut Decoder<'_>, with_dynamic: bool) -> Result<Metadata> {
    let version = dec.u32()?;
    let version =
        MetadataVersion::from_u32(version).ok_or(Error::UnsupportedVersion(version))?;
    let codec = metadata_codec(version);
    if with_dynamic {
        codec.decode(dec)
    } else {
        codec.decode_header(dec)
    }
}

impl FieldCodec for V1Codec {
    fn encode(
        &self,
        field: &RadiationField,
        metadata: &Metadata,
        writer: &mut dyn Write,
    ) -> Result<()> {
        let mut enc = Encoder::new(writer);
        write_schema(&mut enc, field)?;
        for channel in field.channels() {
            for layer in channel.layers() {
                enc.buffer(layer.buffer())?;
            }
        }
        let version = MetadataVersion::LATEST;
        enc.u32(version.as_u32())?;
        metadata_codec(version).encode(metadata, &mut enc)
    }

    fn decode(&self, reader: &mut dyn ReadSeek) -> Result<(RadiationField, Metadata)> {
        let mut dec = Decoder::new(reader);
        let schema = Schema::read(&mut dec)?;
        let mut field = RadiationField::new(schema.geometry);
        for entry in &schema.channels {
            let mut channel = Channel::new(&entry.name, schema.geometry.grid_dims());
            for layer in &entry.layers {
                channel.insert_layer(layer.read_layer(&mut dec)?)?;
            }
            field.insert_channel(channel)?;
        }
        let metadata = read_metadata(&mut dec, true)?;
        Ok((field, metadata))
    }

    fn decode_metadata(&self, reader: &mut dyn ReadSeek) -> Result<Metadata> {
        let mut dec = Decoder::new(reader);
        let schema = Schema::read(&mut dec)?;
        dec.skip(schema.buffer_bytes())?;
        read_metadata(&mut dec, true)
    }

    fn peek_metadata(&self, reader: &mut dyn ReadSeek) -> Result<Metadata> {
        let mut dec = Decoder::new(reader);
        let schema = Schema::read(&mut dec)?;
        dec.skip(schema.buffer_bytes())?;
        read_metadata(&mut dec, false)
    }

    fn decode_field_type(&self, reader: &mut dyn ReadSeek) -> Result<FieldType> {
        let mut dec = Decoder::new(reader);
        let tag = dec.u8()?;
        FieldType::from_tag(tag)
            .ok_or_else(|| Error::CorruptFile(format!("unknown field type {tag}")))
    }

    fn decode_channel(&self, reader: &mut dyn ReadSeek, channel: &str) -> Result<Channel> {
        let mut dec = Decoder::new(reader);
        let schema = Schema::read(&mut dec)?;
        let (offset, entry) = schema.locate_channel(channel)?;
        debug!(channel, offset, "seeking to channel");
        dec.skip(offset)?;

        let mut decoded = Channel::new(&entry.name, schema.geometry.grid_dims());
        for layer in &entry.layers {
            decoded.insert_layer(layer.read_layer(&mut dec)?)?;
        }
        Ok(decoded)
    }

    fn decode_layer(
        &self,
        reader: &mut dyn ReadSeek,
        channel: &str,
        layer: &str,
    ) -> Result<Layer> {
        let mut dec = Decoder::new(reader);
        let schema = Schema::read(&mut dec)?;
        let (mut offset, entry) = schema.locate_channel(channel)?;
        for candidate in &entry.layers {
            if candidate.name == layer {
                debug!(channel, layer, offset, "seeking to layer");
                dec.skip(offset)?;
                return candidate.read_layer(&mut dec);
            }
            offset += candidate.byte_len();
        }
        Err(Error::not_found("layer", layer))
    }
}
