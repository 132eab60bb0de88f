//! Local file cue sources backed by Symphonia
//!
//! Decodes wav/flac/mp3/ogg cue files on demand: only the container probe
//! and decoder setup happen at open time, packets are decoded as playback
//! pulls samples. Every sample format is converted to interleaved stereo
//! f32 (mono is duplicated), and files whose rate differs from the opener's
//! target rate are resampled with rubato.

use std::collections::VecDeque;
use std::fs::File;
use std::path::{Path, PathBuf};

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use audioq_playback::{CueSource, PlaybackError, Result, SignalSpec, SourceOpener};

/// Cues always play back as stereo.
const OUTPUT_CHANNELS: u16 = 2;

/// Opens cue files for decoding at a fixed target sample rate, normally
/// the output device's native rate.
pub struct SymphoniaOpener {
    target_sample_rate: u32,
}

impl SymphoniaOpener {
    pub fn new(target_sample_rate: u32) -> Self {
        Self { target_sample_rate }
    }
}

impl SourceOpener for SymphoniaOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn CueSource>> {
        Ok(Box::new(LocalCueSource::new(path, self.target_sample_rate)?))
    }
}

/// Streaming decoder for one local audio file.
pub struct LocalCueSource {
    path: PathBuf,
    spec: SignalSpec,
    source_sample_rate: u32,

    format_reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,

    resampler: Option<SincFixedIn<f32>>,
    /// Frames waiting for a full resampler chunk
    carry: Vec<f32>,
    /// Decoded, converted, resampled samples ready to hand out
    pending: VecDeque<f32>,
    is_eof: bool,
}

impl LocalCueSource {
    /// Open `path` and prepare it for streaming decode.
    ///
    /// Every failure maps to `InvalidSource`: a cue that cannot open is a
    /// cue the operator has to fix or remove, whatever the low-level cause.
    pub fn new(path: impl AsRef<Path>, target_sample_rate: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = File::open(&path).map_err(|e| {
            PlaybackError::InvalidSource(format!("{}: {}", path.display(), e))
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| PlaybackError::InvalidSource(format!("probe failed: {e}")))?;
        let format_reader = probed.format;

        let track = format_reader
            .default_track()
            .ok_or_else(|| PlaybackError::InvalidSource("no audio track".to_string()))?;
        let source_sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
        let track_id = track.id;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| PlaybackError::InvalidSource(format!("no decoder: {e}")))?;

        let resampler = if source_sample_rate == target_sample_rate {
            None
        } else {
            Some(build_resampler(source_sample_rate, target_sample_rate)?)
        };

        debug!(
            path = %path.display(),
            source_sample_rate,
            target_sample_rate,
            "cue source opened"
        );

        Ok(Self {
            path,
            spec: SignalSpec::new(target_sample_rate, OUTPUT_CHANNELS),
            source_sample_rate,
            format_reader,
            decoder,
            track_id,
            resampler,
            carry: Vec::new(),
            pending: VecDeque::new(),
            is_eof: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file's own rate, before any conversion.
    pub fn source_sample_rate(&self) -> u32 {
        self.source_sample_rate
    }

    /// Decode one packet into `pending`. Returns false at end of file.
    fn decode_next_packet(&mut self) -> Result<bool> {
        if self.is_eof {
            return Ok(false);
        }

        let packet = match self.format_reader.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                self.is_eof = true;
                // Whatever is left is shorter than a resampler chunk; let
                // it play out unconverted rather than swallowing the tail
                let tail = std::mem::take(&mut self.carry);
                self.pending.extend(tail);
                return Ok(false);
            }
            Err(e) => {
                return Err(PlaybackError::InvalidSource(format!("read packet: {e}")));
            }
        };

        // Skip packets from other tracks
        if packet.track_id() != self.track_id {
            return Ok(true);
        }

        let decoded = self
            .decoder
            .decode(&packet)
            .map_err(|e| PlaybackError::InvalidSource(format!("decode: {e}")))?;

        let samples = convert_to_stereo_f32(decoded);
        let samples = if self.resampler.is_some() {
            self.resample(samples)?
        } else {
            samples
        };

        self.pending.extend(samples);
        Ok(true)
    }

    /// Push `samples` through the resampler in full chunks, carrying the
    /// remainder until the next packet arrives.
    fn resample(&mut self, samples: Vec<f32>) -> Result<Vec<f32>> {
        let Some(ref mut resampler) = self.resampler else {
            return Ok(samples);
        };

        let channels = OUTPUT_CHANNELS as usize;
        let mut input = std::mem::take(&mut self.carry);
        input.extend(samples);

        let frames = input.len() / channels;
        let chunk_frames = resampler.input_frames_next();

        let mut result = Vec::new();
        let mut offset = 0;

        while offset + chunk_frames <= frames {
            let mut deinterleaved = vec![Vec::with_capacity(chunk_frames); channels];
            for frame in 0..chunk_frames {
                for (ch, lane) in deinterleaved.iter_mut().enumerate() {
                    lane.push(input[(offset + frame) * channels + ch]);
                }
            }

            let resampled = resampler
                .process(&deinterleaved, None)
                .map_err(|e| PlaybackError::InvalidSource(format!("resample: {e}")))?;

            let out_frames = resampled[0].len();
            for frame in 0..out_frames {
                for lane in resampled.iter().take(channels) {
                    result.push(lane[frame]);
                }
            }

            offset += chunk_frames;
        }

        self.carry = input[offset * channels..].to_vec();
        Ok(result)
    }
}

impl CueSource for LocalCueSource {
    fn spec(&self) -> SignalSpec {
        self.spec
    }

    fn read_samples(&mut self, buffer: &mut [f32]) -> Result<usize> {
        while self.pending.len() < buffer.len() && !self.is_eof {
            if !self.decode_next_packet()? {
                break;
            }
        }

        let available = self.pending.len().min(buffer.len());
        for slot in buffer.iter_mut().take(available) {
            if let Some(sample) = self.pending.pop_front() {
                *slot = sample;
            }
        }
        Ok(available)
    }
}

fn build_resampler(source_rate: u32, target_rate: u32) -> Result<SincFixedIn<f32>> {
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    // 0.1 s chunks at the source rate
    let chunk_frames = (source_rate as usize / 10).max(1);

    SincFixedIn::<f32>::new(
        target_rate as f64 / source_rate as f64,
        2.0,
        params,
        chunk_frames,
        OUTPUT_CHANNELS as usize,
    )
    .map_err(|e| PlaybackError::InvalidSource(format!("resampler: {e}")))
}

/// Interleave a planar buffer to stereo f32, duplicating mono.
fn interleave_to_stereo<T, F>(
    buf: &symphonia::core::audio::AudioBuffer<T>,
    normalize: F,
) -> Vec<f32>
where
    T: symphonia::core::sample::Sample,
    F: Fn(T) -> f32,
{
    let channels = buf.spec().channels.count();
    let frames = buf.frames();
    let mut output = Vec::with_capacity(frames * 2);

    for frame in 0..frames {
        output.push(normalize(buf.chan(0)[frame]));
        if channels > 1 {
            output.push(normalize(buf.chan(1)[frame]));
        } else {
            output.push(normalize(buf.chan(0)[frame]));
        }
    }

    output
}

/// Convert any Symphonia sample format to interleaved stereo f32 in
/// [-1.0, 1.0].
fn convert_to_stereo_f32(decoded: AudioBufferRef) -> Vec<f32> {
    match decoded {
        // Float formats are already normalized
        AudioBufferRef::F32(buf) => interleave_to_stereo(&buf, |s| s),
        AudioBufferRef::F64(buf) => interleave_to_stereo(&buf, |s| s as f32),

        // Signed integers divide by MAX
        AudioBufferRef::S8(buf) => interleave_to_stereo(&buf, |s| s as f32 / i8::MAX as f32),
        AudioBufferRef::S16(buf) => interleave_to_stereo(&buf, |s| s as f32 / i16::MAX as f32),
        AudioBufferRef::S24(buf) => {
            interleave_to_stereo(&buf, |s| s.inner() as f32 / 8_388_607.0)
        }
        AudioBufferRef::S32(buf) => interleave_to_stereo(&buf, |s| s as f32 / i32::MAX as f32),

        // Unsigned integers normalize to [0, 1] then center
        AudioBufferRef::U8(buf) => {
            interleave_to_stereo(&buf, |s| (s as f32 / u8::MAX as f32) * 2.0 - 1.0)
        }
        AudioBufferRef::U16(buf) => {
            interleave_to_stereo(&buf, |s| (s as f32 / u16::MAX as f32) * 2.0 - 1.0)
        }
        AudioBufferRef::U24(buf) => {
            interleave_to_stereo(&buf, |s| (s.inner() as f32 / 8_388_607.0) * 2.0 - 1.0)
        }
        AudioBufferRef::U32(buf) => {
            interleave_to_stereo(&buf, |s| (s as f32 / u32::MAX as f32) * 2.0 - 1.0)
        }
    }
}
