//! Binary encoding of the fingerprint stream.
//!
//! Layout: 4 magic bytes, a `u32` little-endian format version, then one frame
//! per entry. A frame is a `u32` little-endian payload length followed by the
//! bincode-encoded [`FingerprintEntry`]. Entries keep the order in which they
//! were recorded; that order matters to the checker.

use std::io::{ErrorKind, Read, Write};

use crate::error::FingerprintError;
use crate::input::FingerprintEntry;

/// Magic bytes identifying a fingerprint stream.
const STREAM_MAGIC: [u8; 4] = *b"CCFP";

/// Current stream format version. Increment on breaking changes to the
/// framing or to [`RecordedInput`](crate::RecordedInput).
const STREAM_FORMAT_VERSION: u32 = 1;

/// Upper bound on a single frame, to reject garbage lengths before allocating.
const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Appends fingerprint entries to a byte sink.
pub struct FingerprintWriter<W: Write> {
    inner: W,
}

impl<W: Write> FingerprintWriter<W> {
    /// Writes the stream header and returns a writer ready for entries.
    pub fn new(mut inner: W) -> Result<Self, FingerprintError> {
        inner
            .write_all(&STREAM_MAGIC)
            .and_then(|_| inner.write_all(&STREAM_FORMAT_VERSION.to_le_bytes()))
            .map_err(write_error)?;
        Ok(Self { inner })
    }

    /// Appends one entry.
    pub fn write(&mut self, entry: &FingerprintEntry) -> Result<(), FingerprintError> {
        let payload = bincode::serde::encode_to_vec(entry, bincode::config::standard())
            .map_err(|e| FingerprintError::Serialization {
                reason: e.to_string(),
            })?;
        let len = u32::try_from(payload.len())
            .ok()
            .filter(|len| (*len as usize) <= MAX_FRAME_LEN)
            .ok_or_else(|| FingerprintError::Serialization {
                reason: format!("entry of {} bytes exceeds frame limit", payload.len()),
            })?;
        self.inner
            .write_all(&len.to_le_bytes())
            .and_then(|_| self.inner.write_all(&payload))
            .map_err(write_error)
    }

    /// Flushes and returns the underlying sink.
    pub fn finish(mut self) -> Result<W, FingerprintError> {
        self.inner.flush().map_err(write_error)?;
        Ok(self.inner)
    }
}

fn write_error(e: std::io::Error) -> FingerprintError {
    FingerprintError::Serialization {
        reason: e.to_string(),
    }
}

/// Encodes `entries` into a complete in-memory stream.
pub fn encode_entries<'a, I>(entries: I) -> Result<Vec<u8>, FingerprintError>
where
    I: IntoIterator<Item = &'a FingerprintEntry>,
{
    let mut writer = FingerprintWriter::new(Vec::new())?;
    for entry in entries {
        writer.write(entry)?;
    }
    writer.finish()
}

/// Lazily decodes fingerprint entries from a byte source.
///
/// Each call to `next` reads and decodes exactly one frame. After the first
/// error the reader yields nothing more.
pub struct FingerprintReader<R: Read> {
    inner: R,
    failed: bool,
}

impl<R: Read> FingerprintReader<R> {
    /// Reads and validates the stream header.
    pub fn new(mut inner: R) -> Result<Self, FingerprintError> {
        let mut header = [0u8; 8];
        inner.read_exact(&mut header).map_err(|e| {
            FingerprintError::UnsupportedFormat {
                reason: format!("cannot read header: {e}"),
            }
        })?;
        if header[..4] != STREAM_MAGIC {
            return Err(FingerprintError::UnsupportedFormat {
                reason: "missing magic bytes".to_string(),
            });
        }
        let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if version != STREAM_FORMAT_VERSION {
            return Err(FingerprintError::UnsupportedFormat {
                reason: format!("expected version {STREAM_FORMAT_VERSION}, got {version}"),
            });
        }
        Ok(Self {
            inner,
            failed: false,
        })
    }

    /// Reads the next frame length, `None` on a clean end of stream.
    fn read_frame_len(&mut self) -> Result<Option<usize>, FingerprintError> {
        let mut buf = [0u8; 4];
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => {
                    return Err(FingerprintError::CorruptStream {
                        reason: "truncated frame length".to_string(),
                    })
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    return Err(FingerprintError::CorruptStream {
                        reason: e.to_string(),
                    })
                }
            }
        }
        let len = u32::from_le_bytes(buf) as usize;
        if len > MAX_FRAME_LEN {
            return Err(FingerprintError::CorruptStream {
                reason: format!("frame of {len} bytes exceeds limit"),
            });
        }
        Ok(Some(len))
    }

    fn read_entry(&mut self) -> Result<Option<FingerprintEntry>, FingerprintError> {
        let Some(len) = self.read_frame_len()? else {
            return Ok(None);
        };
        let mut payload = vec![0u8; len];
        self.inner
            .read_exact(&mut payload)
            .map_err(|e| FingerprintError::CorruptStream {
                reason: format!("truncated frame: {e}"),
            })?;
        let (entry, consumed) =
            bincode::serde::decode_from_slice(&payload, bincode::config::standard()).map_err(
                |e| FingerprintError::UnexpectedFingerprint {
                    reason: e.to_string(),
                },
            )?;
        if consumed != len {
            return Err(FingerprintError::UnexpectedFingerprint {
                reason: format!("{} trailing bytes in frame", len - consumed),
            });
        }
        Ok(Some(entry))
    }
}

impl<R: Read> Iterator for FingerprintReader<R> {
    type Item = Result<FingerprintEntry, FingerprintError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_entry() {
            Ok(entry) => entry.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
