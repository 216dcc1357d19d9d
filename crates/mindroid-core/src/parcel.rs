//! Typed, append-only byte buffer used as the unit of transaction payload.
//!
//! A `Parcel` is write-only until [`Parcel::reset_read_cursor`] (or
//! [`Parcel::from_bytes`]) switches it into read mode; reads then walk
//! forward from byte 0 in the order the fields were written. There is no
//! random access and no schema — callers read back fields in exactly the
//! order they were put, which is also what makes the wire format trivial to
//! frame (see `mindroid_core::transport`).

use crate::error::{MindroidError, Result};
use crate::uri::Uri;

#[derive(Debug, Default, Clone)]
pub struct Parcel {
    buffer: Vec<u8>,
    cursor: usize,
}

impl Parcel {
    pub fn new() -> Self {
        Parcel::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Parcel {
            buffer: Vec::with_capacity(capacity),
            cursor: 0,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Parcel {
            buffer: bytes,
            cursor: 0,
        }
    }

    /// Total number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Raw contents, for handing off to the wire framer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Rewinds the read cursor to the start without discarding content,
    /// letting a freshly-built parcel be read back immediately (useful in
    /// tests and for loopback transactions).
    pub fn reset_read_cursor(&mut self) {
        self.cursor = 0;
    }

    fn take(&mut self, len: usize) -> Result<&[u8]> {
        if self.cursor + len > self.buffer.len() {
            return Err(MindroidError::parse_error(format!(
                "parcel underflow: need {len} bytes at offset {}, have {}",
                self.cursor,
                self.buffer.len()
            )));
        }
        let slice = &self.buffer[self.cursor..self.cursor + len];
        self.cursor += len;
        Ok(slice)
    }

    pub fn put_bool(&mut self, value: bool) {
        self.buffer.push(value as u8);
    }

    pub fn get_bool(&mut self) -> Result<bool> {
        Ok(self.take(1)?[0] != 0)
    }

    pub fn put_i8(&mut self, value: i8) {
        self.buffer.push(value as u8);
    }

    pub fn get_i8(&mut self) -> Result<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn put_char(&mut self, value: char) {
        self.put_u16(value as u16);
    }

    pub fn get_char(&mut self) -> Result<char> {
        let code = self.get_u16()?;
        char::from_u32(code as u32)
            .ok_or_else(|| MindroidError::parse_error(format!("invalid char code point {code}")))
    }

    pub fn put_i16(&mut self, value: i16) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn get_i16(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    pub fn put_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn get_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    pub fn put_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn get_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn put_i64(&mut self, value: i64) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn get_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn put_u64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn get_u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn put_f32(&mut self, value: f32) {
        self.put_u32(value.to_bits());
    }

    pub fn get_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.get_u32()?))
    }

    pub fn put_f64(&mut self, value: f64) {
        self.put_u64(value.to_bits());
    }

    pub fn get_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.get_u64()?))
    }

    /// Two-byte unsigned length prefix, then raw UTF-8 bytes.
    pub fn put_string(&mut self, value: &str) {
        let bytes = value.as_bytes();
        debug_assert!(bytes.len() <= u16::MAX as usize, "string too long for a u16 length prefix");
        self.put_u16(bytes.len() as u16);
        self.buffer.extend_from_slice(bytes);
    }

    pub fn get_string(&mut self) -> Result<String> {
        let len = self.get_u16()? as usize;
        let bytes = self.take(len)?.to_vec();
        String::from_utf8(bytes).map_err(|e| MindroidError::parse_error(format!("invalid utf-8 string: {e}")))
    }

    /// Four-byte unsigned length prefix, then raw bytes.
    pub fn put_bytes(&mut self, value: &[u8]) {
        self.put_u32(value.len() as u32);
        self.buffer.extend_from_slice(value);
    }

    pub fn get_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.get_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    /// A binder reference: a base URI (the sender's local transport
    /// endpoint) and the referred binder's URI, both length-prefixed UTF-8.
    pub fn put_binder_uri(&mut self, base: &Uri, target: &Uri) {
        self.put_string(&base.to_string());
        self.put_string(&target.to_string());
    }

    pub fn get_binder_uri(&mut self) -> Result<(Uri, Uri)> {
        let base: Uri = self.get_string()?.parse()?;
        let target: Uri = self.get_string()?.parse()?;
        Ok((base, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_primitive_in_order() {
        let mut parcel = Parcel::new();
        parcel.put_bool(true);
        parcel.put_u8(42);
        parcel.put_char('X');
        parcel.put_f64(123.456);
        parcel.put_f32(17.42);
        parcel.put_i16(17);
        parcel.put_i32(12345);
        parcel.put_i64(123456789);
        parcel.put_string("Hello");

        parcel.reset_read_cursor();
        assert_eq!(parcel.get_bool().unwrap(), true);
        assert_eq!(parcel.get_u8().unwrap(), 42);
        assert_eq!(parcel.get_char().unwrap(), 'X');
        assert_eq!(parcel.get_f64().unwrap(), 123.456);
        assert_eq!(parcel.get_f32().unwrap(), 17.42);
        assert_eq!(parcel.get_i16().unwrap(), 17);
        assert_eq!(parcel.get_i32().unwrap(), 12345);
        assert_eq!(parcel.get_i64().unwrap(), 123456789);
        assert_eq!(parcel.get_string().unwrap(), "Hello");
    }

    #[test]
    fn reading_past_the_end_is_a_parse_error() {
        let mut parcel = Parcel::new();
        parcel.put_u8(1);
        parcel.reset_read_cursor();
        assert!(parcel.get_u8().is_ok());
        assert!(matches!(parcel.get_u8(), Err(MindroidError::ParseError(_))));
    }

    #[test]
    fn binder_uri_round_trip() {
        let mut parcel = Parcel::new();
        let base: Uri = "mindroid://1/1".parse().unwrap();
        let target: Uri = "mindroid://1/2a".parse().unwrap();
        parcel.put_binder_uri(&base, &target);
        parcel.reset_read_cursor();
        let (got_base, got_target) = parcel.get_binder_uri().unwrap();
        assert_eq!(got_base, base);
        assert_eq!(got_target, target);
    }

    proptest::proptest! {
        #[test]
        fn bytes_round_trip_for_any_payload(payload in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..256)) {
            let mut parcel = Parcel::new();
            parcel.put_bytes(&payload);
            parcel.reset_read_cursor();
            let got = parcel.get_bytes().unwrap();
            proptest::prop_assert_eq!(got, payload);
        }

        #[test]
        fn strings_round_trip_for_any_text(text in ".{0,64}") {
            let mut parcel = Parcel::new();
            parcel.put_string(&text);
            parcel.reset_read_cursor();
            proptest::prop_assert_eq!(parcel.get_string().unwrap(), text);
        }
    }
}
