//! AT channel over an RFCOMM byte stream.

use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use headset_core::{AtMessage, AtMessageKind, LinkError, OutgoingCommand};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::time::timeout;

use crate::framer::{AtFramer, Frame, MAX_LINE_LEN};
use crate::parser::parse_line;
use crate::traits::AtSender;

/// Upper bound on a single command write.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(2);

const READ_CHUNK: usize = 1024;

/// Split a connected stream into its reading and writing halves.
pub fn split<S>(stream: S, send_timeout: Duration) -> (AtReader<ReadHalf<S>>, AtWriter<WriteHalf<S>>)
where
    S: AsyncRead + AsyncWrite + Send,
{
    let (read, write) = tokio::io::split(stream);
    (AtReader::new(read), AtWriter::new(write, send_timeout))
}

/// Inbound half: yields parsed messages in arrival order.
pub struct AtReader<R> {
    reader: R,
    framer: AtFramer,
    finished: bool,
}

impl<R: AsyncRead + Unpin> AtReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            framer: AtFramer::new(),
            finished: false,
        }
    }

    /// Next message from the phone.
    ///
    /// A closed or failed link yields one `Err` and then `None` forever.
    pub async fn next_message(&mut self) -> Option<Result<AtMessage, LinkError>> {
        if self.finished {
            return None;
        }

        loop {
            if let Some(frame) = self.framer.next_frame() {
                let message = match frame {
                    Frame::Line(line) => parse_line(&line),
                    Frame::Overlong(head) => {
                        tracing::warn!("Discarding AT line longer than {} bytes", MAX_LINE_LEN);
                        AtMessage::new(AtMessageKind::Unknown(head.clone()), head)
                    }
                };
                tracing::debug!("AT <- {}", message.raw);
                return Some(Ok(message));
            }

            let mut chunk = [0u8; READ_CHUNK];
            match self.reader.read(&mut chunk).await {
                Ok(0) => {
                    self.finished = true;
                    if self.framer.pending() > 0 {
                        tracing::debug!(
                            bytes = self.framer.pending(),
                            "Discarding unterminated AT line at end of stream"
                        );
                    }
                    return Some(Err(LinkError::Closed));
                }
                Ok(n) => self.framer.push(&chunk[..n]),
                Err(e) => {
                    self.finished = true;
                    return Some(Err(LinkError::Io(e)));
                }
            }
        }
    }

    /// Turn the reader into a lazy stream of messages.
    pub fn into_stream(self) -> impl Stream<Item = Result<AtMessage, LinkError>> {
        futures::stream::unfold(self, |mut reader| async move {
            reader.next_message().await.map(|item| (item, reader))
        })
    }
}

/// Outbound half: serializes commands with a `\r\n` terminator.
pub struct AtWriter<W> {
    writer: W,
    send_timeout: Duration,
}

impl<W: AsyncWrite + Unpin + Send> AtWriter<W> {
    pub fn new(writer: W, send_timeout: Duration) -> Self {
        Self {
            writer,
            send_timeout,
        }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> AtSender for AtWriter<W> {
    async fn send(&mut self, command: &OutgoingCommand) -> Result<(), LinkError> {
        let line = format!("{}\r\n", command);
        tracing::debug!("AT -> {}", command);

        let writer = &mut self.writer;
        timeout(self.send_timeout, async {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await
        })
        .await
        .map_err(|_| LinkError::Timeout)??;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), LinkError> {
        timeout(self.send_timeout, self.writer.shutdown())
            .await
            .map_err(|_| LinkError::Timeout)??;
        Ok(())
    }
}
