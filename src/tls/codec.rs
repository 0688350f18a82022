//! Big-endian primitives shared by the message and extension codecs.
//!
//! Readers advance an `off` cursor and fail with [`Error::Decode`] naming
//! the structure being read; writers append to a `Vec`.

use alloc::vec::Vec;

use crate::error::{Error, Result};

pub(crate) fn get_u8(data: &[u8], off: &mut usize, what: &'static str) -> Result<u8> {
    let v = *data.get(*off).ok_or(Error::Decode(what))?;
    *off += 1;
    Ok(v)
}

pub(crate) fn get_u16(data: &[u8], off: &mut usize, what: &'static str) -> Result<u16> {
    let b = get_bytes(data, off, 2, what)?;
    Ok(u16::from_be_bytes([b[0], b[1]]))
}

pub(crate) fn get_u24(data: &[u8], off: &mut usize, what: &'static str) -> Result<usize> {
    let b = get_bytes(data, off, 3, what)?;
    Ok(((b[0] as usize) << 16) | ((b[1] as usize) << 8) | b[2] as usize)
}

pub(crate) fn get_u32(data: &[u8], off: &mut usize, what: &'static str) -> Result<u32> {
    let b = get_bytes(data, off, 4, what)?;
    Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

pub(crate) fn get_bytes<'a>(
    data: &'a [u8],
    off: &mut usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8]> {
    let end = off.checked_add(len).ok_or(Error::Decode(what))?;
    let b = data.get(*off..end).ok_or(Error::Decode(what))?;
    *off = end;
    Ok(b)
}

/// `opaque x<0..2^8-1>`
pub(crate) fn get_vec8<'a>(data: &'a [u8], off: &mut usize, what: &'static str) -> Result<&'a [u8]> {
    let len = get_u8(data, off, what)? as usize;
    get_bytes(data, off, len, what)
}

/// `opaque x<0..2^16-1>`
pub(crate) fn get_vec16<'a>(data: &'a [u8], off: &mut usize, what: &'static str) -> Result<&'a [u8]> {
    let len = get_u16(data, off, what)? as usize;
    get_bytes(data, off, len, what)
}

/// `opaque x<0..2^24-1>`
pub(crate) fn get_vec24<'a>(data: &'a [u8], off: &mut usize, what: &'static str) -> Result<&'a [u8]> {
    let len = get_u24(data, off, what)?;
    get_bytes(data, off, len, what)
}

/// Fail unless the cursor consumed the whole structure.
pub(crate) fn expect_end(data: &[u8], off: usize, what: &'static str) -> Result<()> {
    if off == data.len() {
        Ok(())
    } else {
        Err(Error::Decode(what))
    }
}

pub(crate) fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub(crate) fn put_u24(out: &mut Vec<u8>, v: usize) {
    out.extend_from_slice(&(v as u32).to_be_bytes()[1..]);
}

pub(crate) fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub(crate) fn put_vec8(out: &mut Vec<u8>, data: &[u8]) {
    out.push(data.len() as u8);
    out.extend_from_slice(data);
}

pub(crate) fn put_vec16(out: &mut Vec<u8>, data: &[u8]) {
    put_u16(out, data.len() as u16);
    out.extend_from_slice(data);
}

pub(crate) fn put_vec24(out: &mut Vec<u8>, data: &[u8]) {
    put_u24(out, data.len());
    out.extend_from_slice(data);
}

/// Write a u16 length placeholder and return its position for [`patch_u16_len`].
pub(crate) fn begin_u16_len(out: &mut Vec<u8>) -> usize {
    let at = out.len();
    put_u16(out, 0);
    at
}

/// Fill in a placeholder written by [`begin_u16_len`] with the bytes appended since.
pub(crate) fn patch_u16_len(out: &mut [u8], at: usize) {
    let len = (out.len() - at - 2) as u16;
    out[at..at + 2].copy_from_slice(&len.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readers_advance_cursor() {
        let data = [0x01, 0x02, 0x03, 0x00, 0x00, 0x02, 0xaa, 0xbb, 0x00, 0x00, 0x00, 0x07];
        let mut off = 0;
        assert_eq!(get_u8(&data, &mut off, "t").unwrap(), 1);
        assert_eq!(get_u16(&data, &mut off, "t").unwrap(), 0x0203);
        assert_eq!(get_vec24(&data, &mut off, "t").unwrap(), &[0xaa, 0xbb]);
        assert_eq!(get_u32(&data, &mut off, "t").unwrap(), 7);
        assert!(expect_end(&data, off, "t").is_ok());
    }

    #[test]
    fn truncated_read_names_structure() {
        let mut off = 0;
        assert_eq!(
            get_vec16(&[0x00, 0x05, 0x01], &mut off, "cookie"),
            Err(Error::Decode("cookie"))
        );
    }

    #[test]
    fn length_placeholder() {
        let mut out = Vec::new();
        out.push(0x99);
        let at = begin_u16_len(&mut out);
        out.extend_from_slice(&[1, 2, 3]);
        patch_u16_len(&mut out, at);
        assert_eq!(out, [0x99, 0x00, 0x03, 1, 2, 3]);
    }
}
