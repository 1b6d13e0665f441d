//! Audio preview player.
//!
//! The worker downloads a track's preview clip, decodes it fully into stereo
//! f32 frames and hands a shared [`ClipCursor`] to a cpal output stream. The
//! stream is not `Send`, so it lives on its own thread for as long as the clip
//! plays. Position is reported back to the UI as [`AppMessage`]s.

use std::io::{self, Cursor};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, mpsc as std_mpsc};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use reqwest::{Client, header};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::app::AppMessage;
use crate::config::AppConfig;
use crate::models::Track;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewJob {
    pub id: String,
    pub title: String,
    pub url: String,
}

impl PreviewJob {
    pub fn for_track(track: &Track) -> Option<Self> {
        Some(Self {
            id: track.id.clone(),
            title: track.title.clone(),
            url: track.preview_url.clone()?,
        })
    }

    /// File extension of the clip, passed to the format detector as a hint.
    fn extension(&self) -> Option<&str> {
        self.url
            .rsplit('/')
            .next()
            .and_then(|name| name.split(['?', '#']).next())
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewCommand {
    Play(PreviewJob),
    TogglePause,
    Seek(i64),
    Stop,
}

#[derive(Clone)]
pub struct PreviewPlayerHandle {
    tx: UnboundedSender<PreviewCommand>,
}

impl PreviewPlayerHandle {
    pub fn send(&self, command: PreviewCommand) -> Result<()> {
        self.tx
            .send(command)
            .context("preview player is no longer running")
    }
}

/// Decoded clip plus the read position the output callback advances.
#[derive(Debug, Clone)]
pub struct ClipCursor {
    /// Interleaved stereo frames.
    samples: Vec<f32>,
    sample_rate: u32,
    position: f64,
    paused: bool,
}

impl ClipCursor {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate: sample_rate.max(1),
            position: 0.0,
            paused: false,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate))
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.position.min(self.frames() as f64) / f64::from(self.sample_rate))
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.frames() as f64
    }

    /// Moves the read position, clamped to the clip.
    pub fn seek_by(&mut self, secs: i64) {
        let target = self.position + secs as f64 * f64::from(self.sample_rate);
        self.position = target.clamp(0.0, self.frames() as f64);
    }

    /// Writes the next output frames, stepping through the clip at the ratio
    /// of the clip rate to the device rate. Paused or exhausted clips write
    /// silence.
    pub fn fill(&mut self, out: &mut [f32], channels: usize, output_rate: u32) {
        if self.paused || channels == 0 {
            out.fill(0.0);
            return;
        }

        let step = f64::from(self.sample_rate) / f64::from(output_rate.max(1));
        let frames = self.frames();
        for frame in out.chunks_mut(channels) {
            let index = self.position as usize;
            if index >= frames {
                frame.fill(0.0);
                continue;
            }
            let left = self.samples[index * 2];
            let right = self.samples[index * 2 + 1];
            if channels == 1 {
                frame[0] = (left + right) * 0.5;
            } else {
                for (channel, sample) in frame.iter_mut().enumerate() {
                    *sample = match channel {
                        0 => left,
                        1 => right,
                        _ => 0.0,
                    };
                }
            }
            self.position += step;
        }
    }
}

pub fn spawn(
    config: &AppConfig,
    message_tx: UnboundedSender<AppMessage>,
) -> Result<PreviewPlayerHandle> {
    let (tx, rx) = mpsc::unbounded_channel();
    let client = build_client(config)?;

    tokio::spawn(async move {
        run_player(client, message_tx, rx).await;
    });

    Ok(PreviewPlayerHandle { tx })
}

fn build_client(config: &AppConfig) -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::USER_AGENT,
        header::HeaderValue::from_str(config.user_agent())
            .context("invalid user agent header value for preview client")?,
    );
    headers.insert(header::ACCEPT, header::HeaderValue::from_static("audio/*"));

    Client::builder()
        .default_headers(headers)
        .timeout(config.request_timeout())
        .build()
        .context("unable to create HTTP client for previews")
}

struct ActivePreview {
    id: String,
    clip: Arc<Mutex<ClipCursor>>,
    _output: AudioOutput,
}

impl ActivePreview {
    fn clip(&self) -> MutexGuard<'_, ClipCursor> {
        lock_clip(&self.clip)
    }

    fn report(&self, message_tx: &UnboundedSender<AppMessage>) {
        let (elapsed, paused) = {
            let clip = self.clip();
            (clip.elapsed(), clip.is_paused())
        };
        let _ = message_tx.send(AppMessage::PreviewProgress {
            id: self.id.clone(),
            elapsed,
            paused,
        });
    }
}

async fn run_player(
    client: Client,
    message_tx: UnboundedSender<AppMessage>,
    mut rx: UnboundedReceiver<PreviewCommand>,
) {
    let mut ticker = interval(PROGRESS_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut active: Option<ActivePreview> = None;

    loop {
        tokio::select! {
            command = rx.recv() => {
                let Some(command) = command else { break };
                match command {
                    PreviewCommand::Play(job) => {
                        active = None;
                        match start_preview(&client, &job).await {
                            Ok(preview) => {
                                let duration = preview.clip().duration();
                                info!(id = %job.id, ?duration, "preview started");
                                let _ = message_tx.send(AppMessage::PreviewStarted {
                                    id: job.id.clone(),
                                    duration,
                                });
                                active = Some(preview);
                            }
                            Err(err) => {
                                warn!(id = %job.id, error = %err, "preview failed");
                                let _ = message_tx.send(AppMessage::PreviewFailed {
                                    id: job.id,
                                    error: format!("Preview unavailable: {err}"),
                                });
                            }
                        }
                    }
                    PreviewCommand::TogglePause => {
                        if let Some(preview) = &active {
                            preview.clip().toggle_pause();
                            preview.report(&message_tx);
                        }
                    }
                    PreviewCommand::Seek(secs) => {
                        if let Some(preview) = &active {
                            preview.clip().seek_by(secs);
                            preview.report(&message_tx);
                        }
                    }
                    PreviewCommand::Stop => {
                        active = None;
                    }
                }
            }
            _ = ticker.tick() => {
                let finished = match &active {
                    Some(preview) if preview.clip().is_finished() => Some(preview.id.clone()),
                    Some(preview) => {
                        if !preview.clip().is_paused() {
                            preview.report(&message_tx);
                        }
                        None
                    }
                    None => None,
                };
                if let Some(id) = finished {
                    debug!(%id, "preview finished");
                    active = None;
                    let _ = message_tx.send(AppMessage::PreviewFinished { id });
                }
            }
        }
    }
}

async fn start_preview(client: &Client, job: &PreviewJob) -> Result<ActivePreview> {
    let bytes = download_preview(client, job).await?;
    let extension = job.extension().map(str::to_owned);
    let cursor =
        tokio::task::spawn_blocking(move || decode_preview(bytes, extension.as_deref())).await??;

    let clip = Arc::new(Mutex::new(cursor));
    let output_clip = Arc::clone(&clip);
    let output = tokio::task::spawn_blocking(move || AudioOutput::open(output_clip)).await??;

    Ok(ActivePreview {
        id: job.id.clone(),
        clip,
        _output: output,
    })
}

async fn download_preview(client: &Client, job: &PreviewJob) -> Result<Vec<u8>> {
    let response = client
        .get(&job.url)
        .send()
        .await
        .context("failed to request preview")?;

    if !response.status().is_success() {
        return Err(anyhow!("preview returned status {}", response.status()));
    }

    let bytes = response
        .bytes()
        .await
        .context("failed to read preview bytes")?;
    Ok(bytes.to_vec())
}

/// Decodes a whole clip into interleaved stereo f32 frames.
pub fn decode_preview(bytes: Vec<u8>, extension: Option<&str>) -> Result<ClipCursor> {
    let source = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }

    let detected = symphonia::default::get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| anyhow!("unrecognised preview format: {err}"))?;
    let mut format = detected.format;

    let track = format
        .default_track()
        .ok_or_else(|| anyhow!("preview has no audio track"))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(44_100);
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|err| anyhow!("unsupported preview codec: {err}"))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err)) if err.kind() == io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(err) => bail!("failed to read preview: {err}"),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(reason)) => {
                debug!(reason, "skipping undecodable preview packet");
                continue;
            }
            Err(err) => bail!("failed to decode preview: {err}"),
        };

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        let channels = spec.channels.count();
        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        push_stereo(&mut samples, buffer.samples(), channels);
    }

    if samples.is_empty() {
        bail!("preview contained no audio");
    }
    Ok(ClipCursor::new(samples, sample_rate))
}

/// Mono is duplicated, anything wider keeps its first two channels.
fn push_stereo(out: &mut Vec<f32>, interleaved: &[f32], channels: usize) {
    if channels == 0 {
        return;
    }
    for frame in interleaved.chunks_exact(channels) {
        let left = frame[0];
        let right = frame.get(1).copied().unwrap_or(left);
        out.push(left);
        out.push(right);
    }
}

fn lock_clip(clip: &Mutex<ClipCursor>) -> MutexGuard<'_, ClipCursor> {
    clip.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps the output thread, and with it the cpal stream, alive until dropped.
struct AudioOutput {
    _shutdown: std_mpsc::Sender<()>,
}

impl AudioOutput {
    fn open(clip: Arc<Mutex<ClipCursor>>) -> Result<Self> {
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<()>>();
        let (shutdown_tx, shutdown_rx) = std_mpsc::channel::<()>();

        thread::Builder::new()
            .name(String::from("preview-output"))
            .spawn(move || match build_stream(clip) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    // Returns once the sender side is dropped.
                    let _ = shutdown_rx.recv();
                    drop(stream);
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .context("failed to spawn audio output thread")?;

        ready_rx
            .recv()
            .context("audio output thread exited before starting")??;
        Ok(Self {
            _shutdown: shutdown_tx,
        })
    }
}

fn build_stream(clip: Arc<Mutex<ClipCursor>>) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow!("no audio output device available"))?;
    let supported = device
        .default_output_config()
        .context("failed to read default output config")?;
    if supported.sample_format() != cpal::SampleFormat::F32 {
        bail!("unsupported output sample format {:?}", supported.sample_format());
    }

    let config: cpal::StreamConfig = supported.into();
    let channels = usize::from(config.channels);
    let output_rate = config.sample_rate.0;
    debug!(channels, output_rate, "opening audio output");

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| match clip.try_lock() {
                Ok(mut cursor) => cursor.fill(data, channels, output_rate),
                Err(_) => data.fill(0.0),
            },
            |err| error!(error = %err, "audio output stream error"),
            None,
        )
        .context("failed to build audio output stream")?;
    stream.play().context("failed to start audio output stream")?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::itunes::tests::serve_once;

    fn wav_bytes(sample_rate: u32, channels: u16, frames: usize) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
            for frame in 0..frames {
                for _ in 0..channels {
                    let sample = if frame % 2 == 0 { 8_000 } else { -8_000 };
                    writer.write_sample(sample as i16).expect("write sample");
                }
            }
            writer.finalize().expect("finalize wav");
        }
        cursor.into_inner()
    }

    fn ramp(frames: usize, sample_rate: u32) -> ClipCursor {
        let samples = (0..frames)
            .flat_map(|frame| {
                let value = frame as f32;
                [value, -value]
            })
            .collect();
        ClipCursor::new(samples, sample_rate)
    }

    #[test]
    fn job_needs_a_preview_url() {
        let mut track = Track {
            id: "909090".into(),
            title: "Golden Hour".into(),
            artist: "JVKE".into(),
            ..Track::default()
        };
        assert!(PreviewJob::for_track(&track).is_none());

        track.preview_url = Some("https://audio.example/a/b/preview.m4a?x=1".into());
        let job = PreviewJob::for_track(&track).expect("job");
        assert_eq!(job.extension(), Some("m4a"));
    }

    #[test]
    fn mono_wav_decodes_to_stereo_frames() -> anyhow::Result<()> {
        let clip = decode_preview(wav_bytes(8_000, 1, 8_000), Some("wav"))?;
        assert_eq!(clip.sample_rate(), 8_000);
        assert_eq!(clip.frames(), 8_000);
        assert_eq!(clip.duration(), Duration::from_secs(1));
        assert_eq!(clip.samples[0], clip.samples[1]);
        Ok(())
    }

    #[test]
    fn garbage_is_not_a_preview() {
        let result = decode_preview(b"definitely not audio".to_vec(), Some("m4a"));
        assert!(result.is_err());
    }

    #[test]
    fn fill_steps_through_the_clip() {
        let mut clip = ramp(4, 100);
        let mut out = [9.0_f32; 6];
        clip.fill(&mut out, 2, 100);
        assert_eq!(out, [0.0, 0.0, 1.0, -1.0, 2.0, -2.0]);
        assert!(!clip.is_finished());

        let mut rest = [9.0_f32; 4];
        clip.fill(&mut rest, 2, 100);
        assert_eq!(rest, [3.0, -3.0, 0.0, 0.0]);
        assert!(clip.is_finished());
    }

    #[test]
    fn fill_resamples_and_downmixes() {
        let mut clip = ClipCursor::new(vec![1.0, 3.0, 5.0, 7.0, 9.0, 11.0, 13.0, 15.0], 200);
        let mut out = [9.0_f32; 3];
        clip.fill(&mut out, 1, 100);
        assert_eq!(out, [2.0, 10.0, 0.0]);
        assert!(clip.is_finished());
        assert!((clip.elapsed().as_secs_f64() - 0.02).abs() < 1e-9);
    }

    #[test]
    fn paused_clip_outputs_silence_and_holds_position() {
        let mut clip = ramp(10, 100);
        clip.toggle_pause();
        let mut out = [1.0_f32; 4];
        clip.fill(&mut out, 2, 100);
        assert_eq!(out, [0.0; 4]);
        assert_eq!(clip.elapsed(), Duration::ZERO);
    }

    #[test]
    fn seeking_is_clamped_to_the_clip() {
        let mut clip = ramp(1_000, 100);
        clip.seek_by(5);
        assert_eq!(clip.elapsed(), Duration::from_secs(5));
        clip.seek_by(-10);
        assert_eq!(clip.elapsed(), Duration::ZERO);
        clip.seek_by(60);
        assert_eq!(clip.elapsed(), Duration::from_secs(10));
        assert!(clip.is_finished());
    }

    #[tokio::test]
    async fn missing_preview_is_reported_as_failure() -> anyhow::Result<()> {
        let (base, _server) = serve_once(404, String::from("gone")).await;
        let (msg_tx, mut msg_rx) = mpsc::unbounded_channel();
        let player = spawn(&AppConfig::default(), msg_tx)?;

        player.send(PreviewCommand::Play(PreviewJob {
            id: "909090".into(),
            title: "Golden Hour".into(),
            url: format!("{base}/preview.m4a"),
        }))?;

        let message = msg_rx.recv().await.expect("player reports");
        assert!(matches!(
            message,
            AppMessage::PreviewFailed { ref id, ref error } if id == "909090" && error.contains("404")
        ));
        Ok(())
    }

    #[tokio::test]
    async fn undecodable_preview_is_reported_as_failure() -> anyhow::Result<()> {
        let (base, _server) = serve_once(200, String::from("not audio at all")).await;
        let (msg_tx, mut msg_rx) = mpsc::unbounded_channel();
        let player = spawn(&AppConfig::default(), msg_tx)?;

        player.send(PreviewCommand::Play(PreviewJob {
            id: "1".into(),
            title: "Song".into(),
            url: format!("{base}/preview.m4a"),
        }))?;

        let message = msg_rx.recv().await.expect("player reports");
        assert!(matches!(message, AppMessage::PreviewFailed { ref id, .. } if id == "1"));
        Ok(())
    }
}
