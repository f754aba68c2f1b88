//! Little-endian primitives shared by all file format versions.
use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::{Vec2, Vec3, Vec4};

use crate::error::{Error, Result};
use crate::field::{DType, LayerBuffer};

/// Longest string accepted when decoding.
const MAX_STRING_LEN: u32 = 16 << 20;

/// Elements converted per `write_all` when encoding wide buffers.
const CHUNK_ELEMENTS: usize = 16 * 1024;

/// Readers the decoders can seek in.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}

pub(crate) struct Encoder<'a> {
    inner: &'a mut dyn Write,
}

impl<'a> Encoder<'a> {
    pub(crate) fn new(inner: &'a mut dyn Write) -> Self {
        Self { inner }
    }

    pub(crate) fn u8(&mut self, v: u8) -> Result<()> {
        Ok(self.inner.write_u8(v)?)
    }

    pub(crate) fn bool(&mut self, v: bool) -> Result<()> {
        self.u8(v as u8)
    }

    pub(crate) fn u32(&mut self, v: u32) -> Result<()> {
        Ok(self.inner.write_u32::<LittleEndian>(v)?)
    }

    pub(crate) fn u64(&mut self, v: u64) -> Result<()> {
        Ok(self.inner.write_u64::<LittleEndian>(v)?)
    }

    pub(crate) fn i32(&mut self, v: i32) -> Result<()> {
        Ok(self.inner.write_i32::<LittleEndian>(v)?)
    }

    pub(crate) fn f32(&mut self, v: f32) -> Result<()> {
        Ok(self.inner.write_f32::<LittleEndian>(v)?)
    }

    pub(crate) fn f64(&mut self, v: f64) -> Result<()> {
        Ok(self.inner.write_f64::<LittleEndian>(v)?)
    }

    /// Count as `u32`, failing for collections the format can not describe.
    pub(crate) fn count(&mut self, len: usize, what: &str) -> Result<()> {
        let len = u32::try_from(len)
            .map_err(|_| Error::Validation(format!("{what} count {len} exceeds u32")))?;
        self.u32(len)
    }

    /// `u32` byte length followed by the UTF-8 bytes.
    pub(crate) fn str(&mut self, s: &str) -> Result<()> {
        self.count(s.len(), "string byte")?;
        Ok(self.inner.write_all(s.as_bytes())?)
    }

    pub(crate) fn vec2(&mut self, v: Vec2) -> Result<()> {
        self.f32s(&v.to_array())
    }

    pub(crate) fn vec3(&mut self, v: Vec3) -> Result<()> {
        self.f32s(&v.to_array())
    }

    pub(crate) fn vec4(&mut self, v: Vec4) -> Result<()> {
        self.f32s(&v.to_array())
    }

    pub(crate) fn f32s(&mut self, values: &[f32]) -> Result<()> {
        self.chunked(values, 4, LittleEndian::write_f32_into)
    }

    /// Raw layer payload, one scalar after the other.
    pub(crate) fn buffer(&mut self, buffer: &LayerBuffer) -> Result<()> {
        match buffer {
            LayerBuffer::Float32(v) | LayerBuffer::Hist(v) => self.f32s(v),
            LayerBuffer::Vec2(v) => self.f32s(bytemuck::cast_slice(v)),
            LayerBuffer::Vec3(v) => self.f32s(bytemuck::cast_slice(v)),
            LayerBuffer::Vec4(v) => self.f32s(bytemuck::cast_slice(v)),
            LayerBuffer::Float64(v) => self.chunked(v, 8, LittleEndian::write_f64_into),
            LayerBuffer::Int32(v) => self.chunked(v, 4, LittleEndian::write_i32_into),
            LayerBuffer::UInt32(v) => self.chunked(v, 4, LittleEndian::write_u32_into),
            LayerBuffer::UInt64(v) => self.chunked(v, 8, LittleEndian::write_u64_into),
            LayerBuffer::Char(v) => Ok(self.inner.write_all(bytemuck::cast_slice(v))?),
        }
    }

    fn chunked<T: Copy>(
        &mut self,
        values: &[T],
        size: usize,
        write_into: fn(&[T], &mut [u8]),
    ) -> Result<()> {
        let mut bytes = vec![0u8; values.len().min(CHUNK_ELEMENTS) * size];
        for chunk in values.chunks(CHUNK_ELEMENTS) {
            let dst = &mut bytes[..chunk.len() * size];
            write_into(chunk, dst);
            self.inner.write_all(dst)?;
        }
        Ok(())
    }
}

/// Reads primitives, mapping early end of input to [`Error::CorruptFile`].
///
/// The stream length is measured once, on the first bounds check; afterwards the position is
/// tracked from the bytes consumed so buffered readers are not flushed by repeated seeks.
pub(crate) struct Decoder<'a> {
    inner: &'a mut dyn ReadSeek,
    /// `(position, end)` of the stream once measured.
    extent: Option<(u64, u64)>,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(inner: &'a mut dyn ReadSeek) -> Self {
        Self {
            inner,
            extent: None,
        }
    }

    /// Runs `read`, which consumes exactly `bytes` on success.
    fn read_with<T>(
        &mut self,
        bytes: usize,
        read: impl FnOnce(&mut dyn ReadSeek) -> std::io::Result<T>,
    ) -> Result<T> {
        match read(&mut *self.inner) {
            Ok(value) => {
                self.advance(bytes as u64);
                Ok(value)
            }
            Err(err) => {
                self.extent = None;
                Err(Error::from_read(err))
            }
        }
    }

    fn advance(&mut self, bytes: u64) {
        if let Some((pos, _)) = &mut self.extent {
            *pos = pos.saturating_add(bytes);
        }
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        self.read_with(1, |r| r.read_u8())
    }

    pub(crate) fn bool(&mut self) -> Result<bool> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::CorruptFile(format!("invalid flag byte {other}"))),
        }
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        self.read_with(4, |r| r.read_u32::<LittleEndian>())
    }

    pub(crate) fn u64(&mut self) -> Result<u64> {
        self.read_with(8, |r| r.read_u64::<LittleEndian>())
    }

    pub(crate) fn i32(&mut self) -> Result<i32> {
        self.read_with(4, |r| r.read_i32::<LittleEndian>())
    }

    pub(crate) fn f32(&mut self) -> Result<f32> {
        self.read_with(4, |r| r.read_f32::<LittleEndian>())
    }

    pub(crate) fn f64(&mut self) -> Result<f64> {
        self.read_with(8, |r| r.read_f64::<LittleEndian>())
    }

    pub(crate) fn str(&mut self) -> Result<String> {
        let len = self.u32()?;
        if len > MAX_STRING_LEN || len as u64 > self.remaining()? {
            return Err(Error::CorruptFile(format!("string length {len} out of range")));
        }
        let mut bytes = vec![0u8; len as usize];
        self.read_with(bytes.len(), |r| r.read_exact(&mut bytes))?;
        String::from_utf8(bytes).map_err(|e| Error::CorruptFile(format!("invalid UTF-8: {e}")))
    }

    pub(crate) fn vec2(&mut self) -> Result<Vec2> {
        let mut v = [0.0; 2];
        self.f32s(&mut v)?;
        Ok(Vec2::from_array(v))
    }

    pub(crate) fn vec3(&mut self) -> Result<Vec3> {
        let mut v = [0.0; 3];
        self.f32s(&mut v)?;
        Ok(Vec3::from_array(v))
    }

    pub(crate) fn vec4(&mut self) -> Result<Vec4> {
        let mut v = [0.0; 4];
        self.f32s(&mut v)?;
        Ok(Vec4::from_array(v))
    }

    pub(crate) fn f32s(&mut self, dst: &mut [f32]) -> Result<()> {
        self.read_with(dst.len() * 4, |r| r.read_f32_into::<LittleEndian>(dst))
    }

    /// Reads a payload of `len` elements of `dtype` (bins for histograms).
    pub(crate) fn buffer(&mut self, dtype: DType, len: usize) -> Result<LayerBuffer> {
        let mut buffer = LayerBuffer::zeroed(dtype, len);
        let bytes = buffer.byte_len();
        self.read_with(bytes, |r| match &mut buffer {
            LayerBuffer::Float32(v) | LayerBuffer::Hist(v) => r.read_f32_into::<LittleEndian>(v),
            LayerBuffer::Vec2(v) => r.read_f32_into::<LittleEndian>(bytemuck::cast_slice_mut(v)),
            LayerBuffer::Vec3(v) => r.read_f32_into::<LittleEndian>(bytemuck::cast_slice_mut(v)),
            LayerBuffer::Vec4(v) => r.read_f32_into::<LittleEndian>(bytemuck::cast_slice_mut(v)),
            LayerBuffer::Float64(v) => r.read_f64_into::<LittleEndian>(v),
            LayerBuffer::Int32(v) => r.read_i32_into::<LittleEndian>(v),
            LayerBuffer::UInt32(v) => r.read_u32_into::<LittleEndian>(v),
            LayerBuffer::UInt64(v) => r.read_u64_into::<LittleEndian>(v),
            LayerBuffer::Char(v) => r.read_i8_into(v),
        })?;
        Ok(buffer)
    }

    /// Skips `bytes` without reading them.
    pub(crate) fn skip(&mut self, bytes: u64) -> Result<()> {
        if bytes > self.remaining()? {
            return Err(Error::CorruptFile("unexpected end of file".into()));
        }
        let offset = i64::try_from(bytes)
            .map_err(|_| Error::CorruptFile(format!("offset {bytes} out of range")))?;
        self.inner.seek(SeekFrom::Current(offset))?;
        self.advance(bytes);
        Ok(())
    }

    /// Bytes between the current position and the end of the input.
    pub(crate) fn remaining(&mut self) -> Result<u64> {
        let (pos, end) = match self.extent {
            Some(extent) => extent,
            None => {
                let pos = self.inner.stream_position()?;
                let end = self.inner.seek(SeekFrom::End(0))?;
                self.inner.seek(SeekFrom::Start(pos))?;
                self.extent = Some((pos, end));
                (pos, end)
            }
        };
        Ok(end.saturating_sub(pos))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn encode(f: impl FnOnce(&mut Encoder<'_>) -> Result<()>) -> Vec<u8> {
        let mut bytes = Vec::new();
        f(&mut Encoder::new(&mut bytes)).unwrap();
        bytes
    }

    #[test]
    fn primitives_are_little_endian() {
        let bytes = encode(|e| {
            e.u32(0x0102_0304)?;
            e.f32(1.0)
        });
        assert_eq!(bytes, [4, 3, 2, 1, 0, 0, 0x80, 0x3f]);
    }

    #[test]
    fn strings_are_length_prefixed() {
        let bytes = encode(|e| e.str("Gy/h"));
        assert_eq!(&bytes[..4], &[4, 0, 0, 0]);
        let mut cursor = Cursor::new(bytes);
        assert_eq!(Decoder::new(&mut cursor).str().unwrap(), "Gy/h");
    }

    #[test]
    fn oversized_string_length_is_corrupt() {
        let mut cursor = Cursor::new(vec![0xff, 0xff, 0xff, 0x00, b'a']);
        assert!(matches!(
            Decoder::new(&mut cursor).str(),
            Err(Error::CorruptFile(_))
        ));
    }

    #[test]
    fn buffers_decode_to_the_same_values() {
        let buffers = [
            LayerBuffer::Float64((0..40_000).map(|i| i as f64 * 0.5).collect()),
            LayerBuffer::Vec3(vec![Vec3::new(1.67, 1.85, 2.0); 3]),
            LayerBuffer::Char(vec![-3, 0, 7]),
            LayerBuffer::UInt64(vec![u64::MAX, 1]),
        ];
        for buffer in buffers {
            let bytes = encode(|e| e.buffer(&buffer));
            assert_eq!(bytes.len(), buffer.byte_len());
            let mut cursor = Cursor::new(bytes);
            let decoded = Decoder::new(&mut cursor)
                .buffer(buffer.dtype(), buffer.len())
                .unwrap();
            assert_eq!(decoded, buffer);
        }
    }

    /// Counts seeks issued against the wrapped reader.
    struct SeekCounter {
        inner: Cursor<Vec<u8>>,
        seeks: usize,
    }

    impl Read for SeekCounter {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Seek for SeekCounter {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            self.seeks += 1;
            self.inner.seek(pos)
        }
    }

    #[test]
    fn stream_length_is_measured_once() {
        let bytes = encode(|e| {
            for name in ["doserate", "hits", "spectrum", "directions"] {
                e.str(name)?;
                e.u32(7)?;
            }
            e.f64(2.5)
        });
        let total = bytes.len() as u64;
        let mut reader = SeekCounter {
            inner: Cursor::new(bytes),
            seeks: 0,
        };
        let mut dec = Decoder::new(&mut reader);

        assert_eq!(dec.remaining().unwrap(), total);
        for name in ["doserate", "hits", "spectrum", "directions"] {
            assert_eq!(dec.str().unwrap(), name);
            assert_eq!(dec.u32().unwrap(), 7);
        }
        assert_eq!(dec.remaining().unwrap(), 8);
        dec.skip(4).unwrap();
        assert_eq!(dec.remaining().unwrap(), 4);
        assert!(dec.skip(5).is_err());

        // stream_position, seek to end and seek back once, then the single skip.
        assert!(reader.seeks <= 4, "{} seeks", reader.seeks);
    }

    #[test]
    fn short_reads_are_corrupt() {
        let mut cursor = Cursor::new(vec![1u8, 2]);
        let mut dec = Decoder::new(&mut cursor);
        assert!(matches!(dec.u32(), Err(Error::CorruptFile(_))));

        let mut cursor = Cursor::new(vec![0u8; 10]);
        let mut dec = Decoder::new(&mut cursor);
        assert!(matches!(
            dec.buffer(DType::Float32, 3),
            Err(Error::CorruptFile(_))
        ));
        let mut cursor = Cursor::new(vec![0u8; 10]);
        assert!(Decoder::new(&mut cursor).skip(11).is_err());
    }
}
