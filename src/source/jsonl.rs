use super::frame::LandmarkFrame;
use super::{DetectorSettings, LandmarkSource};
use crate::error::SourceError;
use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, trace};

type LineReader = Box<dyn AsyncBufRead + Send + Unpin>;
type SettingsWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Reads one landmark frame per JSON line from stdin, a recording or a
/// detector sidecar. Blank lines are skipped; EOF ends the stream.
pub struct JsonLinesSource {
    reader: LineReader,
    writer: Option<SettingsWriter>,
    description: String,
    mirror: bool,
    pacer: Option<Interval>,
    line: String,
    applied: Option<DetectorSettings>,
}

impl JsonLinesSource {
    pub fn from_reader<R>(reader: R, description: impl Into<String>) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            writer: None,
            description: description.into(),
            mirror: false,
            pacer: None,
            line: String::new(),
            applied: None,
        }
    }

    pub fn stdin() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()), "stdin")
    }

    pub async fn open_file<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| SourceError::Open {
                target: path.display().to_string(),
                source: e,
            })?;
        info!("Replaying landmarks from {}", path.display());
        Ok(Self::from_reader(
            BufReader::new(file),
            format!("file:{}", path.display()),
        ))
    }

    /// Connect to a sidecar; the write half carries detector settings back
    pub async fn connect(address: &str) -> Result<Self, SourceError> {
        let stream = TcpStream::connect(address)
            .await
            .map_err(|e| SourceError::Open {
                target: address.to_string(),
                source: e,
            })?;
        stream.set_nodelay(true).map_err(SourceError::Read)?;
        info!("Connected to landmark sidecar at {}", address);

        let (read_half, write_half) = stream.into_split();
        let mut source = Self::from_reader(BufReader::new(read_half), format!("tcp:{}", address));
        source.writer = Some(Box::new(write_half));
        Ok(source)
    }

    pub fn with_writer<W>(mut self, writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        self.writer = Some(Box::new(writer));
        self
    }

    pub fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    /// Deliver at most one frame per `period`, for replaying recordings in real time
    pub fn with_frame_interval(mut self, period: Duration) -> Self {
        if !period.is_zero() {
            let mut pacer = interval(period);
            pacer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.pacer = Some(pacer);
        }
        self
    }

    pub fn applied_settings(&self) -> Option<DetectorSettings> {
        self.applied
    }
}

#[async_trait]
impl LandmarkSource for JsonLinesSource {
    async fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, SourceError> {
        loop {
            self.line.clear();
            let read = self.reader.read_line(&mut self.line).await?;
            if read == 0 {
                debug!("{} reached end of stream", self.description);
                return Ok(None);
            }

            let line = self.line.trim();
            if line.is_empty() {
                continue;
            }
            trace!("{} <- {}", self.description, line);

            let frame = LandmarkFrame::parse_line(line)?;
            if let Some(pacer) = self.pacer.as_mut() {
                pacer.tick().await;
            }
            return Ok(Some(if self.mirror { frame.mirrored() } else { frame }));
        }
    }

    async fn apply_detector_settings(
        &mut self,
        settings: DetectorSettings,
    ) -> Result<(), SourceError> {
        self.applied = Some(settings);

        let Some(writer) = self.writer.as_mut() else {
            debug!(
                "{} has no back-channel, detector settings recorded only",
                self.description
            );
            return Ok(());
        };

        let mut message = json!({
            "type": "configure",
            "detection_confidence": settings.detection_confidence,
            "presence_confidence": settings.presence_confidence,
            "tracking_confidence": settings.tracking_confidence,
        })
        .to_string();
        message.push('\n');

        send_line(writer, &message)
            .await
            .map_err(|e| SourceError::Configure {
                details: format!("{}: {}", self.description, e),
            })?;

        debug!("Sent detector settings to {}", self.description);
        Ok(())
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

async fn send_line(writer: &mut SettingsWriter, message: &str) -> std::io::Result<()> {
    writer.write_all(message.as_bytes()).await?;
    writer.flush().await
}
