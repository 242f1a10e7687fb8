use bincode::{Decode, Encode};

use crate::error::{FsError, Result};

/// Trait for fixed-size on-disk records.
///
/// Every record is encoded with the bincode legacy configuration
/// (little-endian, fixed-width integers) into a zero-filled buffer of exactly
/// [`Record::SIZE`] bytes, so the position of any record in the image can be
/// computed by arithmetic alone and padding bytes are always zero.
pub trait Record: Encode + Decode<()> + Sized {
    /// encoded size of the record, padding included
    const SIZE: usize;
    /// human readable record kind, used in error messages
    const NAME: &'static str;

    /// encode into the first [`Record::SIZE`] bytes of `dst`
    /// # Errors
    /// [`FsError::Format`] if `dst` is too short or the record does not fit
    fn encode_into(&self, dst: &mut [u8]) -> Result<()> {
        let len = dst.len();
        let record = dst.get_mut(..Self::SIZE).ok_or_else(|| FsError::Format {
            record: Self::NAME,
            detail: format!("buffer holds {len} bytes, need {}", Self::SIZE),
        })?;
        record.fill(0);
        bincode::encode_into_slice(self, record, bincode::config::legacy()).map_err(|e| {
            FsError::Format {
                record: Self::NAME,
                detail: e.to_string(),
            }
        })?;
        Ok(())
    }

    /// encode into a freshly allocated [`Vec`] of [`Record::SIZE`] bytes
    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; Self::SIZE];
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    /// decode from the first [`Record::SIZE`] bytes of `src`
    /// # Errors
    /// [`FsError::Format`] if `src` is short or holds an undecodable value
    fn from_bytes(src: &[u8]) -> Result<Self> {
        let record = src.get(..Self::SIZE).ok_or_else(|| FsError::Format {
            record: Self::NAME,
            detail: format!("buffer holds {} bytes, need {}", src.len(), Self::SIZE),
        })?;
        let (object, _read): (Self, usize) =
            bincode::decode_from_slice(record, bincode::config::legacy()).map_err(|e| {
                FsError::Format {
                    record: Self::NAME,
                    detail: e.to_string(),
                }
            })?;
        Ok(object)
    }
}
