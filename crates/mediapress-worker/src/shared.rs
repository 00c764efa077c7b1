//! Lazily started, explicitly released compressor owned by the application.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::compressor::Compressor;
use crate::error::CompressorResult;
use crate::settings::CompressorSettings;
use crate::transcoder::{DynTranscoder, ImageTranscoder};

/// Holds at most one [`Compressor`], started on the first [`acquire`](Self::acquire).
///
/// Keep one of these in the application's composition root and hand out
/// the acquired handles; nothing here is a hidden global.
pub struct SharedCompressor {
    settings: CompressorSettings,
    transcoder: DynTranscoder,
    slot: Mutex<Option<Compressor>>,
}

impl SharedCompressor {
    pub fn new(settings: CompressorSettings) -> Self {
        Self::with_transcoder(settings, std::sync::Arc::new(ImageTranscoder))
    }

    pub fn with_transcoder(settings: CompressorSettings, transcoder: DynTranscoder) -> Self {
        Self {
            settings,
            transcoder,
            slot: Mutex::new(None),
        }
    }

    /// Return the shared compressor, starting its worker on first use.
    pub fn acquire(&self) -> CompressorResult<Compressor> {
        let mut slot = self.lock();
        if let Some(compressor) = slot.as_ref() {
            return Ok(compressor.clone());
        }

        debug!("Starting shared compressor");
        let compressor =
            Compressor::open_with_transcoder(self.settings.clone(), self.transcoder.clone())?;
        *slot = Some(compressor.clone());
        Ok(compressor)
    }

    /// Stop the shared worker and forget it. The next `acquire` starts a new one.
    ///
    /// Outstanding tasks resolve with a failure result; see [`Compressor::close`].
    pub fn release(&self) {
        let compressor = self.lock().take();
        if let Some(compressor) = compressor {
            compressor.close();
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Compressor>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SharedCompressor {
    fn default() -> Self {
        Self::new(CompressorSettings::default())
    }
}
