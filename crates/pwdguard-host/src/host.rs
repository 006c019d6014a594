// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The host serve loop: frames in on one stream, responses out on another.
//!
//! Frames are handled strictly one at a time in arrival order. Vault I/O
//! runs on the blocking pool and is awaited before the next frame is read.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use pwdguard_config::PwdGuardConfig;
use pwdguard_core::{FrameCodec, FrameError, PwdGuardError, WireMessage};
use pwdguard_vault::{AppEvent, EventLog, Vault};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::router::Router;

/// Why the serve loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeExit {
    /// The peer closed its end of the input stream.
    EndOfInput,
    /// The shutdown token fired.
    Shutdown,
}

/// Serve requests from `reader` until EOF or shutdown.
///
/// Returns an error only when the streams themselves fail.
pub async fn serve<R, W>(
    reader: R,
    writer: W,
    router: Arc<Router>,
    max_frame_len: usize,
    shutdown: CancellationToken,
) -> Result<ServeExit, PwdGuardError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let codec = FrameCodec::with_max_frame_len(max_frame_len);
    let mut frames = FramedRead::new(reader, codec);
    let mut sink = FramedWrite::new(writer, codec);

    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("shutdown requested, leaving serve loop");
                return Ok(ServeExit::Shutdown);
            }
            frame = frames.next() => frame,
        };

        let decoded = match frame {
            None => {
                info!("input closed, leaving serve loop");
                return Ok(ServeExit::EndOfInput);
            }
            Some(Err(e)) => return Err(e.into()),
            Some(Ok(decoded)) => decoded,
        };

        let handler = Arc::clone(&router);
        let reply = tokio::task::spawn_blocking(move || handler.handle_frame(decoded))
            .await
            .map_err(|e| PwdGuardError::Internal(format!("request handler panicked: {e}")))?;

        send_reply(&mut sink, reply).await?;
    }
}

async fn send_reply<W>(
    sink: &mut FramedWrite<W, FrameCodec>,
    reply: WireMessage,
) -> Result<(), PwdGuardError>
where
    W: AsyncWrite + Unpin,
{
    let kind = reply.kind();
    let message_id = reply.message_id().cloned();

    match sink.send(reply).await {
        Ok(()) => {
            debug!(%kind, "response sent");
            Ok(())
        }
        Err(FrameError::Io(e)) => Err(FrameError::Io(e).into()),
        Err(e) => {
            // The reply itself could not be framed; tell the peer instead.
            warn!(%kind, error = %e, "response could not be encoded");
            sink.send(WireMessage::error(format!("Response too large: {e}"), message_id))
                .await
                .map_err(PwdGuardError::from)
        }
    }
}

/// Open the vault from `config` and serve the browser over stdin/stdout.
pub async fn run_stdio(
    config: &PwdGuardConfig,
    shutdown: CancellationToken,
) -> Result<ServeExit, PwdGuardError> {
    let storage = config.storage.clone();
    let vault = tokio::task::spawn_blocking(move || Vault::open(&storage))
        .await
        .map_err(|e| PwdGuardError::Internal(format!("vault open panicked: {e}")))??;

    let events = if config.storage.event_log_enabled {
        EventLog::new(config.storage.event_log_path())
    } else {
        EventLog::disabled()
    };
    events.record(AppEvent::NativeHostStarted {
        pid: std::process::id(),
    });

    info!(
        credentials = %vault.store().dir().display(),
        max_frame_bytes = config.host.max_frame_bytes,
        "native host ready"
    );

    let router = Arc::new(Router::new(Arc::new(vault), events));
    serve(
        tokio::io::stdin(),
        tokio::io::stdout(),
        router,
        config.host.max_frame_bytes,
        shutdown,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pwdguard_config::StorageConfig;
    use pwdguard_core::encode_frame;
    use serde_json::{Value, json};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio_util::codec::Decoder;

    fn decode_all(bytes: &[u8]) -> Vec<Value> {
        let mut buf = bytes::BytesMut::from(bytes);
        let mut codec = FrameCodec::new();
        let mut out = Vec::new();
        while let Some(frame) = codec.decode(&mut buf).unwrap() {
            out.push(frame.unwrap());
        }
        out
    }

    fn router() -> (tempfile::TempDir, Arc<Router>) {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            data_dir: dir.path().to_string_lossy().to_string(),
            ..StorageConfig::default()
        };
        let vault = Arc::new(Vault::open(&config).unwrap());
        (dir, Arc::new(Router::new(vault, EventLog::disabled())))
    }

    #[tokio::test]
    async fn serves_requests_in_order_until_eof() {
        let (_dir, router) = router();
        let mut input = Vec::new();
        input.extend(encode_frame(&json!({ "type": "connection-test", "messageId": "1" })).unwrap());
        input.extend(
            encode_frame(&json!({
                "type": "save-credentials",
                "domain": "example.com",
                "username": "alice",
                "password": "P@ss1",
                "timestamp": 1,
                "messageId": "2",
            }))
            .unwrap(),
        );
        input.extend(
            encode_frame(&json!({ "type": "get-credentials", "domain": "example.com", "messageId": "3" }))
                .unwrap(),
        );

        let mut output = Vec::new();
        let exit = serve(
            input.as_slice(),
            &mut output,
            router,
            1024 * 1024,
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(exit, ServeExit::EndOfInput);

        let replies = decode_all(&output);
        let ids: Vec<&str> = replies.iter().map(|r| r["messageId"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(replies[0]["type"], "connection-test");
        assert_eq!(replies[1]["success"], true);
        assert_eq!(replies[2]["credentials"][0]["password"], "P@ss1");
    }

    #[tokio::test]
    async fn bad_frame_gets_error_and_loop_continues() {
        let (_dir, router) = router();
        let mut input = Vec::new();
        let garbage = b"not json";
        input.extend((garbage.len() as u32).to_le_bytes());
        input.extend(garbage);
        input.extend(encode_frame(&json!({ "type": "nope" })).unwrap());
        input.extend(encode_frame(&json!({ "type": "connection-test" })).unwrap());

        let mut output = Vec::new();
        serve(input.as_slice(), &mut output, router, 1024, CancellationToken::new())
            .await
            .unwrap();

        let replies = decode_all(&output);
        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0]["type"], "error");
        assert_eq!(replies[1]["error"], "Unknown message type: nope");
        assert_eq!(replies[2]["type"], "connection-test");
    }

    #[tokio::test]
    async fn shutdown_token_ends_the_loop() {
        let (_dir, router) = router();
        let (client, server) = tokio::io::duplex(1024);
        let (server_read, server_write) = tokio::io::split(server);
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(serve(
            server_read,
            server_write,
            router,
            1024,
            shutdown.clone(),
        ));
        shutdown.cancel();
        assert_eq!(task.await.unwrap().unwrap(), ServeExit::Shutdown);
        drop(client);
    }

    #[tokio::test]
    async fn works_over_a_live_duplex_stream() {
        let (_dir, router) = router();
        let (mut client, server) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server);
        let task = tokio::spawn(serve(
            server_read,
            server_write,
            router,
            64 * 1024,
            CancellationToken::new(),
        ));

        let request = encode_frame(&json!({ "type": "get-all-credentials", "messageId": "all" })).unwrap();
        client.write_all(&request).await.unwrap();

        let mut len = [0u8; 4];
        client.read_exact(&mut len).await.unwrap();
        let mut payload = vec![0u8; u32::from_le_bytes(len) as usize];
        client.read_exact(&mut payload).await.unwrap();
        let reply: Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(reply["type"], "all-credentials-response");
        assert_eq!(reply["messageId"], "all");

        client.shutdown().await.unwrap();
        drop(client);
        assert_eq!(task.await.unwrap().unwrap(), ServeExit::EndOfInput);
    }
}
