//! Wire framing: `size:u32, type:u32, uri:utf(u16-len), transactionId:u32,
//! what:u32, payloadLen:u32, payload:bytes`, all big-endian.

use crate::error::map_io_error;
use bytes::Buf;
use mindroid_core::error::{MindroidError, Result};
use mindroid_core::transport::{Frame, FrameType};
use mindroid_core::Uri;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Frames whose declared size exceeds this are rejected and the
/// connection is closed, per the transport plugin's framing contract.
pub const MAX_FRAME_SIZE: u32 = 64 * 1024 * 1024;

pub async fn write_frame<W: AsyncWriteExt + Unpin>(writer: &mut W, frame: &Frame) -> Result<()> {
    let uri = frame.uri.to_string();
    let _span = mindroid_core::observability::frame_span("write", &uri, frame.transaction_id).entered();
    let uri_bytes = uri.as_bytes();
    let mut body = Vec::with_capacity(4 + 2 + uri_bytes.len() + 4 + 4 + 4 + frame.payload.len());
    body.extend_from_slice(&frame.frame_type.as_u32().to_be_bytes());
    body.extend_from_slice(&(uri_bytes.len() as u16).to_be_bytes());
    body.extend_from_slice(uri_bytes);
    body.extend_from_slice(&frame.transaction_id.to_be_bytes());
    body.extend_from_slice(&frame.what.to_be_bytes());
    body.extend_from_slice(&(frame.payload.len() as u32).to_be_bytes());
    body.extend_from_slice(&frame.payload);

    writer.write_u32(body.len() as u32).await.map_err(map_io_error("write frame size"))?;
    writer.write_all(&body).await.map_err(map_io_error("write frame body"))?;
    writer.flush().await.map_err(map_io_error("flush frame"))?;
    Ok(())
}

pub async fn read_frame<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<Frame> {
    let size = reader.read_u32().await.map_err(map_io_error("read frame size"))?;
    if size > MAX_FRAME_SIZE {
        return Err(MindroidError::transaction_failure(format!("frame size {size} exceeds the {MAX_FRAME_SIZE}-byte limit")));
    }
    let mut body = vec![0u8; size as usize];
    reader.read_exact(&mut body).await.map_err(map_io_error("read frame body"))?;

    let mut cursor = &body[..];
    require(cursor.remaining() >= 4, "truncated frame type")?;
    let frame_type = FrameType::from_u32(cursor.get_u32()).ok_or_else(|| MindroidError::transaction_failure("unknown frame type"))?;

    require(cursor.remaining() >= 2, "truncated uri length")?;
    let uri_len = cursor.get_u16() as usize;
    require(cursor.remaining() >= uri_len, "truncated uri")?;
    let uri_bytes = cursor.copy_to_bytes(uri_len);
    let uri_str = std::str::from_utf8(&uri_bytes).map_err(|e| MindroidError::transaction_failure(format!("invalid utf-8 uri: {e}")))?;
    let uri: Uri = uri_str.parse()?;

    require(cursor.remaining() >= 12, "truncated frame header")?;
    let transaction_id = cursor.get_u32();
    let _span = mindroid_core::observability::frame_span("read", &uri.to_string(), transaction_id).entered();
    let what = cursor.get_u32();
    let payload_len = cursor.get_u32() as usize;
    require(cursor.remaining() >= payload_len, "truncated payload")?;
    let payload = cursor.copy_to_bytes(payload_len).to_vec();

    Ok(Frame { frame_type, uri, transaction_id, what, payload })
}

fn require(condition: bool, message: &'static str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(MindroidError::transaction_failure(message))
    }
}
