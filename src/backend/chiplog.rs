//! Register-log adapter (VGM family).
//!
//! VGM files are read twice: the engine parses the header for the exact
//! length and the GD3 tags, and the native player gets the whole file for
//! playback. Other register-log formats have no header the engine knows,
//! so their length comes from the native player. Gzip-compressed VGM (`.vgz`)
//! goes to the native player as is, which inflates it itself; the engine
//! then knows neither header nor tags.

use super::{fixed_to_i16, Backend, Capabilities, OpenParams, StereoFrame};
use crate::container::vgm::{self, ticks_to_samples, VgmHeader, VGM_MAGIC};
use crate::error::{NativeError, OpenError, OpenResult};
use crate::format::BackendKind;
use crate::native::{ChipLogEngine, DeviceInfo, FixedFrame, SourceFile};
use crate::tags::CanonicalTagSet;

/// Adapter around a [`ChipLogEngine`].
pub struct ChipLogBackend {
    native: Box<dyn ChipLogEngine>,
    header: Option<VgmHeader>,
    tags: CanonicalTagSet,
    sample_rate: u32,
    scratch: Vec<FixedFrame>,
}

impl ChipLogBackend {
    /// Parse what the engine reads itself, then load the native player.
    pub fn open(source: &SourceFile, params: OpenParams<'_>) -> OpenResult<Self> {
        let data = source.data.as_slice();
        let compressed = vgm::is_gzip(data);

        let (header, tags) = if !compressed
            && (data.starts_with(VGM_MAGIC) || source.extension().as_deref() == Some("vgm"))
        {
            let header = VgmHeader::parse(data)?;
            let tags = header.tags(data);
            (Some(header), tags)
        } else {
            (None, CanonicalTagSet::new())
        };

        let mut native = params
            .library
            .open_chip_log(source, params.sample_rate, params.aux)
            .map_err(|e| match e {
                NativeError::Rejected(msg) if compressed => {
                    OpenError::UnsupportedPayload(format!("gzip-compressed VGM: {msg}"))
                }
                other => OpenError::native(BackendKind::ChipLog, other),
            })?;
        native.set_sample_rate(params.sample_rate);

        if compressed {
            log::debug!("gzip payload handed to the native player; length from native ticks");
        }
        if let Some(header) = &header {
            log::debug!(
                "VGM {}: {} ticks, loop {} ticks",
                header.version_string(),
                header.total_samples,
                header.loop_samples
            );
        }

        Ok(Self {
            native,
            header,
            tags,
            sample_rate: params.sample_rate,
            scratch: Vec::new(),
        })
    }

    /// Parsed VGM header, when the file is a VGM.
    pub fn header(&self) -> Option<&VgmHeader> {
        self.header.as_ref()
    }
}

impl Backend for ChipLogBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::ChipLog
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::TRANSPORT
            | Capabilities::SEEK
            | Capabilities::EXACT_POSITION
            | Capabilities::EXACT_DURATION
            | Capabilities::TEMPO
            | Capabilities::END_DETECTION
            | Capabilities::DEVICES
    }

    fn render(&mut self, out: &mut [StereoFrame]) -> usize {
        if self.scratch.len() < out.len() {
            self.scratch.resize(out.len(), FixedFrame::default());
        }
        let scratch = &mut self.scratch[..out.len()];
        scratch.fill(FixedFrame::default());

        let got = self.native.render(scratch).min(out.len());
        for (dst, src) in out.iter_mut().zip(&scratch[..got]) {
            *dst = StereoFrame::new(fixed_to_i16(src.left), fixed_to_i16(src.right));
        }
        got
    }

    fn position(&self) -> u64 {
        ticks_to_samples(self.native.position_ticks(), self.sample_rate)
    }

    fn total_length(&self) -> u64 {
        match &self.header {
            Some(header) => header.length_samples(self.sample_rate),
            None => ticks_to_samples(self.native.total_ticks(), self.sample_rate),
        }
    }

    fn seek(&mut self, sample: u64) {
        self.native.seek_sample(sample);
    }

    fn is_ended(&self) -> bool {
        self.native.is_ended()
    }

    fn set_speed(&mut self, speed: f64) {
        self.native.set_speed(speed);
    }

    fn set_endless_loop(&mut self, endless: bool) {
        self.native.set_loop_forever(endless);
    }

    fn set_sample_rate(&mut self, rate: u32) {
        self.sample_rate = rate;
        self.native.set_sample_rate(rate);
    }

    fn play(&mut self) {
        self.native.start();
    }

    fn stop(&mut self) {
        self.native.stop();
    }

    fn tags(&self) -> CanonicalTagSet {
        self.tags.clone()
    }

    fn devices(&self) -> Vec<DeviceInfo> {
        let mut unique: Vec<DeviceInfo> = Vec::new();
        for device in self.native.devices() {
            if !unique.iter().any(|known| known.id == device.id) {
                unique.push(device);
            }
        }
        unique
    }

    fn set_device_volume(&mut self, id: u32, volume: u16) {
        self.native.set_device_volume(id, volume);
    }
}
