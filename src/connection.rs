// ABOUTME: Buffered frame I/O for SMPP over any async byte stream half
// ABOUTME: The reader accumulates bytes until a whole PDU is available; the writer batches and flushes

use crate::codec::{CodecError, Frame, PduHeader};
use bytes::{Bytes, BytesMut};
use std::io::{self, Cursor};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};

/// Reading side of an SMPP connection.
///
/// Reading and writing are split so the transport can wait for inbound PDUs
/// while it writes outbound ones; SMPP is full duplex and the SMSC may send
/// deliver_sm or enquire_link at any moment.
#[derive(Debug)]
pub struct FrameReader<R> {
    stream: R,

    // The buffer for reading frames.
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(stream: R) -> Self {
        FrameReader {
            stream,
            // 4KB comfortably holds several maximum-size short messages.
            buffer: BytesMut::with_capacity(4 * 1024),
        }
    }

    /// Read a single `Frame` value from the underlying stream.
    ///
    /// Waits until enough data has been buffered to parse a frame; anything
    /// left over stays in the buffer for the next call. Returns `None` when the
    /// peer closes the stream on a frame boundary.
    ///
    /// Cancel safe: bytes read before cancellation stay buffered.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, CodecError> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            // `0` indicates "end of stream".
            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                // A clean shutdown leaves nothing half-read in the buffer.
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(CodecError::Io(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                )));
            }
        }
    }

    /// Tries to parse a frame from the buffer.
    ///
    /// Once the length checks out the PDU's bytes are consumed whether or not
    /// its contents decode; a bad body comes back as
    /// [`CodecError::Malformed`] and the next read starts on the following PDU.
    fn parse_frame(&mut self) -> Result<Option<Frame>, CodecError> {
        let mut buf = Cursor::new(&self.buffer[..]);

        match Frame::check(&mut buf) {
            Ok(len) => {
                let data = self.buffer.split_to(len);
                match Frame::parse(&data) {
                    Ok(frame) => Ok(Some(frame)),
                    Err(source) => Err(match PduHeader::peek(&data) {
                        Some(header) => CodecError::Malformed {
                            header,
                            source: Box::new(source),
                        },
                        None => source,
                    }),
                }
            }
            // Not an error: wait for more bytes from the socket.
            Err(CodecError::Incomplete) => Ok(None),
            // Framing is lost; the connection has to be dropped.
            Err(e) => Err(e),
        }
    }
}

/// Writing side of an SMPP connection.
#[derive(Debug)]
pub struct FrameWriter<W: AsyncWrite> {
    stream: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(stream: W) -> Self {
        FrameWriter {
            stream: BufWriter::new(stream),
        }
    }

    /// Write one encoded PDU and flush it to the socket.
    pub async fn write_pdu(&mut self, pdu: &Bytes) -> io::Result<()> {
        self.stream.write_all(pdu).await?;
        self.stream.flush().await
    }

    /// Encode and write a frame.
    pub async fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        let bytes = frame
            .to_bytes()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        self.write_pdu(&bytes).await
    }

    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Encodable;
    use crate::datatypes::{EnquireLink, SubmitSmResponse};
    use tokio::io::duplex;

    #[tokio::test]
    async fn reads_frames_split_across_writes() {
        let (client, mut server) = duplex(1024);
        let mut reader = FrameReader::new(client);

        let bytes = SubmitSmResponse::new(3, 0, "MSG-1").to_bytes().unwrap();
        server.write_all(&bytes[..5]).await.unwrap();
        let pending = tokio::spawn(async move {
            let frame = reader.read_frame().await.unwrap();
            (frame, reader)
        });
        server.write_all(&bytes[5..]).await.unwrap();

        let (frame, _reader) = pending.await.unwrap();
        assert_eq!(
            frame,
            Some(Frame::SubmitSmResp(SubmitSmResponse::new(3, 0, "MSG-1")))
        );
    }

    #[tokio::test]
    async fn reads_back_to_back_frames_and_clean_eof() {
        let (client, server) = duplex(1024);
        let mut reader = FrameReader::new(client);
        let mut writer = FrameWriter::new(server);

        writer
            .write_frame(&Frame::EnquireLink(EnquireLink::new(1)))
            .await
            .unwrap();
        writer
            .write_frame(&Frame::EnquireLink(EnquireLink::new(2)))
            .await
            .unwrap();
        writer.shutdown().await.unwrap();
        drop(writer);

        assert_eq!(reader.read_frame().await.unwrap().unwrap().sequence_number(), 1);
        assert_eq!(reader.read_frame().await.unwrap().unwrap().sequence_number(), 2);
        assert!(reader.read_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn undecodable_pdu_is_skipped_and_next_frame_is_read() {
        let (client, mut server) = duplex(1024);
        let mut reader = FrameReader::new(client);

        // bind_transceiver_resp whose system_id is not UTF-8.
        let mut bad = vec![0, 0, 0, 20, 0x80, 0, 0, 0x09, 0, 0, 0, 0, 0, 0, 0, 5];
        bad.extend_from_slice(&[b'S', 0xFF, b'C', 0]);
        server.write_all(&bad).await.unwrap();
        server
            .write_all(&EnquireLink::new(6).to_bytes().unwrap())
            .await
            .unwrap();

        match reader.read_frame().await {
            Err(CodecError::Malformed { header, source }) => {
                assert_eq!(header.command_id, 0x8000_0009);
                assert_eq!(header.sequence_number, 5);
                assert!(matches!(*source, CodecError::Utf8Error { field: "system_id", .. }));
            }
            other => panic!("Expected a malformed PDU, got {other:?}"),
        }
        assert_eq!(
            reader.read_frame().await.unwrap(),
            Some(Frame::EnquireLink(EnquireLink::new(6)))
        );
    }

    #[tokio::test]
    async fn truncated_frame_is_a_reset() {
        let (client, mut server) = duplex(1024);
        let mut reader = FrameReader::new(client);

        server.write_all(&[0, 0, 0, 16, 0, 0]).await.unwrap();
        drop(server);

        assert!(matches!(reader.read_frame().await, Err(CodecError::Io(_))));
    }
}
