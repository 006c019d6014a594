// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport over byte streams, and the connector that launches the host
//! binary the way a browser does.

use std::process::Stdio;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use pwdguard_config::ClientConfig;
use pwdguard_core::{Connector, FrameCodec, Port, PwdGuardError, WireMessage};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, warn};

/// Wrap a reader/writer pair in frame codecs and expose it as a [`Port`].
///
/// A writer task encodes outbound messages; a reader task decodes inbound
/// frames, skipping ones that are not valid protocol messages. The port's
/// inbound side closes when the reader hits EOF or an I/O error.
pub fn spawn_framed_port<R, W>(reader: R, writer: W, max_frame_len: usize, buffer: usize) -> Port
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    spawn_framed_port_with(reader, writer, max_frame_len, buffer, None)
}

fn spawn_framed_port_with<R, W>(
    reader: R,
    writer: W,
    max_frame_len: usize,
    buffer: usize,
    child: Option<Child>,
) -> Port
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let codec = FrameCodec::with_max_frame_len(max_frame_len);
    let (outbound, mut to_host) = mpsc::channel::<WireMessage>(buffer.max(1));
    let (from_host, inbound) = mpsc::channel::<WireMessage>(buffer.max(1));

    tokio::spawn(async move {
        let mut sink = FramedWrite::new(writer, codec);
        while let Some(message) = to_host.recv().await {
            let kind = message.kind();
            if let Err(e) = sink.send(message).await {
                warn!(%kind, error = %e, "failed to write frame, closing transport");
                break;
            }
        }
        debug!("transport writer finished");
    });

    tokio::spawn(async move {
        let mut frames = FramedRead::new(reader, codec);
        while let Some(frame) = frames.next().await {
            match frame {
                Ok(Ok(value)) => match WireMessage::from_value(value) {
                    Ok(message) => {
                        if from_host.send(message).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "ignoring invalid message from host"),
                },
                Ok(Err(e)) => warn!(error = %e, "ignoring undecodable frame from host"),
                Err(e) => {
                    warn!(error = %e, "transport read failed");
                    break;
                }
            }
        }
        debug!("transport reader finished");

        if let Some(mut child) = child {
            let _ = child.start_kill();
            match child.wait().await {
                Ok(status) => info!(%status, "host process exited"),
                Err(e) => warn!(error = %e, "failed to reap host process"),
            }
        }
    });

    Port { outbound, inbound }
}

/// Launches the host executable with piped stdio for every connect.
#[derive(Debug, Clone)]
pub struct ProcessConnector {
    command: String,
    args: Vec<String>,
    max_frame_len: usize,
    buffer: usize,
}

impl ProcessConnector {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            max_frame_len: pwdguard_core::frame::DEFAULT_MAX_FRAME_LEN,
            buffer: 64,
        }
    }

    pub fn from_config(config: &ClientConfig, max_frame_len: usize) -> Self {
        Self {
            command: config.host_command.clone(),
            args: config.host_args.clone(),
            max_frame_len,
            buffer: config.outbound_buffer,
        }
    }
}

#[async_trait]
impl Connector for ProcessConnector {
    fn name(&self) -> &str {
        "process"
    }

    async fn connect(&self) -> Result<Port, PwdGuardError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PwdGuardError::Transport {
                message: format!("failed to launch `{}`", self.command),
                source: Some(Box::new(e)),
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| PwdGuardError::transport("host stdin was not piped"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PwdGuardError::transport("host stdout was not piped"))?;

        info!(command = %self.command, pid = ?child.id(), "launched native host");
        Ok(spawn_framed_port_with(
            stdout,
            stdin,
            self.max_frame_len,
            self.buffer,
            Some(child),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pwdguard_core::encode_frame;
    use pwdguard_core::message::GetAllCredentials;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn framed_port_round_trips_over_duplex() {
        let (near, far) = tokio::io::duplex(4096);
        let (near_read, near_write) = tokio::io::split(near);
        let (mut far_read, mut far_write) = tokio::io::split(far);
        let mut port = spawn_framed_port(near_read, near_write, 4096, 4);

        port.outbound
            .send(WireMessage::GetAllCredentials(GetAllCredentials::default()))
            .await
            .unwrap();
        let mut len = [0u8; 4];
        far_read.read_exact(&mut len).await.unwrap();
        let mut payload = vec![0u8; u32::from_le_bytes(len) as usize];
        far_read.read_exact(&mut payload).await.unwrap();
        assert_eq!(payload, br#"{"type":"get-all-credentials"}"#);

        // Junk is skipped, the valid frame behind it is delivered.
        far_write
            .write_all(&encode_frame(&serde_json::json!({ "type": "bogus" })).unwrap())
            .await
            .unwrap();
        far_write
            .write_all(&encode_frame(&WireMessage::error("boom", None)).unwrap())
            .await
            .unwrap();
        match port.inbound.recv().await.unwrap() {
            WireMessage::Error(e) => assert_eq!(e.error, "boom"),
            other => panic!("unexpected {other:?}"),
        }

        far_write.shutdown().await.unwrap();
        drop(far_write);
        drop(far_read);
        assert!(port.inbound.recv().await.is_none());
    }

    #[tokio::test]
    async fn missing_executable_is_a_transport_error() {
        let connector = ProcessConnector::new("/nonexistent/pwdguard-host-binary", vec![]);
        assert!(matches!(
            connector.connect().await,
            Err(PwdGuardError::Transport { .. })
        ));
    }
}
