//! Audio output seam.
//!
//! `AudioBackend` opens a resolved source into an `OutputDevice` that is
//! ready to start. The production backend decodes with rodio; network
//! sources are fetched with reqwest first.

use std::fs::File;
use std::io::{BufReader, Cursor};

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};

use super::source::SoundSource;
use crate::core::error::AlertError;

/// An opened sound bound to an output device, not yet playing.
///
/// Dropping the device releases the decoder and the output stream.
pub trait OutputDevice {
    fn play(&mut self) -> Result<(), AlertError>;

    /// True once playback finished naturally or was stopped.
    fn is_stopped(&self) -> bool;
}

/// Opens sources into output devices. Called from the playback worker only.
pub trait AudioBackend: Send + Sync {
    fn open(&self, source: &SoundSource, volume: f32) -> Result<Box<dyn OutputDevice>, AlertError>;
}

/// rodio output on the default device
#[derive(Debug, Default)]
pub struct RodioBackend;

impl RodioBackend {
    pub fn new() -> Self {
        Self
    }
}

enum Decoded {
    File(Decoder<BufReader<File>>),
    Stream(Decoder<Cursor<Vec<u8>>>),
}

impl AudioBackend for RodioBackend {
    fn open(&self, source: &SoundSource, volume: f32) -> Result<Box<dyn OutputDevice>, AlertError> {
        let decoded = decode(source)?;

        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| AlertError::Device(e.to_string()))?;
        stream.log_on_drop(false);
        let sink = Sink::connect_new(stream.mixer());
        sink.pause();
        queue_decoded(&sink, decoded, volume);

        Ok(Box::new(RodioDevice {
            sink,
            _stream: stream,
        }))
    }
}

fn decode(source: &SoundSource) -> Result<Decoded, AlertError> {
    match source {
        SoundSource::File(path) => {
            let file = File::open(path).map_err(|err| AlertError::OpenFile {
                path: path.clone(),
                source: err,
            })?;
            let decoder =
                Decoder::new(BufReader::new(file)).map_err(|e| decode_error(source, &e))?;
            Ok(Decoded::File(decoder))
        }
        SoundSource::Url(url) => {
            let bytes = fetch(url)?;
            let decoder = Decoder::new(Cursor::new(bytes)).map_err(|e| decode_error(source, &e))?;
            Ok(Decoded::Stream(decoder))
        }
    }
}

fn queue_decoded(sink: &Sink, decoded: Decoded, volume: f32) {
    match decoded {
        // Local files carry the volume on the decoded source itself
        Decoded::File(decoder) => sink.append(decoder.amplify(volume)),
        // Streams are attenuated at the output stage
        Decoded::Stream(decoder) => {
            sink.set_volume(volume);
            sink.append(decoder);
        }
    }
}

fn decode_error(source: &SoundSource, error: &dyn std::fmt::Display) -> AlertError {
    AlertError::Decode {
        origin: source.describe(),
        reason: error.to_string(),
    }
}

fn fetch(url: &str) -> Result<Vec<u8>, AlertError> {
    let to_error = |source| AlertError::Fetch {
        url: url.to_string(),
        source,
    };
    let response = reqwest::blocking::get(url)
        .and_then(|response| response.error_for_status())
        .map_err(to_error)?;
    let bytes = response.bytes().map_err(to_error)?;
    log::debug!("[Doorbell] fetched {} bytes from {}", bytes.len(), url);
    Ok(bytes.to_vec())
}

/// Sink and stream for one playback. Field order drops the sink first.
struct RodioDevice {
    sink: Sink,
    _stream: OutputStream,
}

impl OutputDevice for RodioDevice {
    fn play(&mut self) -> Result<(), AlertError> {
        self.sink.play();
        Ok(())
    }

    fn is_stopped(&self) -> bool {
        self.sink.empty()
    }
}

impl Drop for RodioDevice {
    fn drop(&mut self) {
        self.sink.stop();
    }
}
