use async_trait::async_trait;
use pmcp::error::TransportError;
use pmcp::shared::{StdioTransport, Transport, TransportMessage};
use std::fmt::Debug;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// JSON-RPC messages framed one per line over any async byte stream.
///
/// Used on both ends: the server over stdio or a TCP connection, the client
/// over a TCP connection or a spawned server's pipes.
#[derive(Debug)]
pub struct LineDelimitedTransport<R, W> {
    reader: Arc<Mutex<BufReader<R>>>,
    writer: Arc<Mutex<W>>,
    closed: CancellationToken,
}

impl<R, W> LineDelimitedTransport<R, W>
where
    R: AsyncRead + Unpin + Send + Debug + 'static,
    W: AsyncWrite + Unpin + Send + Debug + 'static,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Arc::new(Mutex::new(BufReader::new(reader))),
            writer: Arc::new(Mutex::new(writer)),
            closed: CancellationToken::new(),
        }
    }

    /// Cancelled once the peer hangs up or the read side fails.
    pub fn closed(&self) -> CancellationToken {
        self.closed.clone()
    }
}

impl LineDelimitedTransport<Stdin, Stdout> {
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl LineDelimitedTransport<OwnedReadHalf, OwnedWriteHalf> {
    pub fn tcp(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self::new(reader, writer)
    }
}

fn io_error(e: std::io::Error) -> pmcp::Error {
    pmcp::Error::Transport(TransportError::Io(e.to_string()))
}

#[async_trait]
impl<R, W> Transport for LineDelimitedTransport<R, W>
where
    R: AsyncRead + Unpin + Send + Debug + 'static,
    W: AsyncWrite + Unpin + Send + Debug + 'static,
{
    async fn send(&mut self, message: TransportMessage) -> pmcp::Result<()> {
        let json = StdioTransport::serialize_message(&message)?;

        let mut writer = self.writer.lock().await;
        writer.write_all(&json).await.map_err(io_error)?;
        writer.write_all(b"\n").await.map_err(io_error)?;
        writer.flush().await.map_err(io_error)?;
        Ok(())
    }

    async fn receive(&mut self) -> pmcp::Result<TransportMessage> {
        let mut reader = self.reader.lock().await;
        let mut line = String::new();

        loop {
            line.clear();
            let bytes = match reader.read_line(&mut line).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    self.closed.cancel();
                    return Err(io_error(e));
                }
            };
            if bytes == 0 {
                self.closed.cancel();
                return Err(pmcp::Error::Transport(TransportError::ConnectionClosed));
            }
            if !line.trim().is_empty() {
                break;
            }
        }

        serde_json::from_str::<serde_json::Value>(&line).map_err(|e| {
            pmcp::Error::Transport(TransportError::InvalidMessage(format!("Invalid JSON: {e}")))
        })?;

        StdioTransport::parse_message(line.trim().as_bytes())
    }

    async fn close(&mut self) -> pmcp::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.shutdown().await.map_err(io_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmcp::types::{ClientRequest, ListToolsRequest, Request, RequestId};
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_sent_request_is_a_jsonrpc_line() {
        let (peer, local) = duplex(4096);
        let (read_half, write_half) = tokio::io::split(local);
        let mut transport = LineDelimitedTransport::new(read_half, write_half);

        transport
            .send(TransportMessage::Request {
                id: RequestId::Number(7),
                request: Request::Client(Box::new(ClientRequest::ListTools(ListToolsRequest {
                    cursor: None,
                }))),
            })
            .await
            .unwrap();

        let mut line = String::new();
        BufReader::new(peer).read_line(&mut line).await.unwrap();
        assert!(line.ends_with('\n'));

        let frame: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(frame["jsonrpc"], "2.0");
        assert_eq!(frame["method"], "tools/list");
        assert_eq!(frame["id"], 7);

        match StdioTransport::parse_message(line.trim().as_bytes()).unwrap() {
            TransportMessage::Request { id, request } => {
                assert_eq!(id, RequestId::Number(7));
                assert!(matches!(
                    request,
                    Request::Client(ref req) if matches!(**req, ClientRequest::ListTools(_))
                ));
            }
            other => panic!("expected a request, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_eof_cancels_closed_token() {
        let (peer, local) = duplex(64);
        let (read_half, write_half) = tokio::io::split(local);
        let mut transport = LineDelimitedTransport::new(read_half, write_half);
        let closed = transport.closed();
        assert!(!closed.is_cancelled());

        drop(peer);
        assert!(transport.receive().await.is_err());
        assert!(closed.is_cancelled());
    }

    #[tokio::test]
    async fn test_blank_lines_are_skipped_and_eof_closes() {
        let (mut peer, local) = duplex(1024);
        let (read_half, write_half) = tokio::io::split(local);
        let mut transport = LineDelimitedTransport::new(read_half, write_half);

        peer.write_all(b"\n\n{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n")
            .await
            .unwrap();
        drop(peer);

        assert!(transport.receive().await.is_ok());
        assert!(matches!(
            transport.receive().await,
            Err(pmcp::Error::Transport(TransportError::ConnectionClosed))
        ));
    }

    #[tokio::test]
    async fn test_invalid_json_is_rejected() {
        let (mut peer, local) = duplex(1024);
        let (read_half, write_half) = tokio::io::split(local);
        let mut transport = LineDelimitedTransport::new(read_half, write_half);

        peer.write_all(b"not json\n").await.unwrap();

        assert!(matches!(
            transport.receive().await,
            Err(pmcp::Error::Transport(TransportError::InvalidMessage(_)))
        ));
    }
}
