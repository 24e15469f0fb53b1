// Turns the live sample ring into byte spectra and byte waveforms,
// the way a browser analyser node reports them.

use std::f32::consts::PI;
use std::sync::{Arc, Mutex, TryLockError};

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::buffer::SampleRing;
use crate::error::Error;

pub const MIN_FFT_SIZE: usize = 32;
pub const MAX_FFT_SIZE: usize = 32_768;

/// Where the render pipeline gets its samples from. Both fills write
/// `fft_size() / 2` bytes in place, each in 0..=255.
pub trait AnalysisSource {
    fn fft_size(&self) -> usize;

    fn frequency_bin_count(&self) -> usize {
        self.fft_size() / 2
    }

    fn fill_frequency_domain(&mut self, buf: &mut [u8]) -> Result<(), Error>;
    fn fill_time_domain(&mut self, buf: &mut [u8]) -> Result<(), Error>;
}

pub fn check_len(what: &'static str, expected: usize, buf: &[u8]) -> Result<(), Error> {
    if buf.len() != expected {
        return Err(Error::SizeMismatch { what, expected, actual: buf.len() });
    }
    Ok(())
}

pub struct Analyser {
    ring: Arc<Mutex<SampleRing>>,
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
    window: Vec<f32>,
    time: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl Analyser {
    /// `fft_size` must be a power of two in 32..=32768.
    pub fn new(fft_size: usize, ring: Arc<Mutex<SampleRing>>) -> Result<Self, Error> {
        if !fft_size.is_power_of_two() || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&fft_size) {
            return Err(Error::Config(format!(
                "fft size {fft_size} must be a power of two in {MIN_FFT_SIZE}..={MAX_FFT_SIZE}"
            )));
        }
        let fft = FftPlanner::<f32>::new().plan_fft_forward(fft_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Ok(Self {
            ring,
            fft,
            fft_size,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
            window: blackman(fft_size),
            time: vec![0.0; fft_size],
            spectrum: vec![Complex::new(0.0, 0.0); fft_size],
            scratch,
            smoothed: vec![0.0; fft_size / 2],
        })
    }

    /// Weight of the previous spectrum in the running average, 0..1.
    pub fn with_smoothing(mut self, tau: f32) -> Self {
        self.smoothing = tau.clamp(0.0, 1.0);
        self
    }

    /// dB values mapped onto 0 and 255 respectively.
    pub fn with_decibel_range(mut self, min_db: f32, max_db: f32) -> Result<Self, Error> {
        if !(min_db < max_db) {
            return Err(Error::Config(format!("min dB {min_db} must be below max dB {max_db}")));
        }
        self.min_db = min_db;
        self.max_db = max_db;
        Ok(self)
    }

    /// Copy the newest window out of the ring without waiting on the audio
    /// thread. If it holds the lock right now, the previous window is reused.
    fn snapshot(&mut self) {
        match self.ring.try_lock() {
            Ok(ring) => ring.copy_latest_into(&mut self.time),
            Err(TryLockError::Poisoned(p)) => p.into_inner().copy_latest_into(&mut self.time),
            Err(TryLockError::WouldBlock) => {}
        }
    }
}

impl AnalysisSource for Analyser {
    fn fft_size(&self) -> usize {
        self.fft_size
    }

    fn fill_frequency_domain(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        check_len("frequency buffer", self.fft_size / 2, buf)?;
        self.snapshot();

        for ((dst, &x), &w) in self.spectrum.iter_mut().zip(&self.time).zip(&self.window) {
            *dst = Complex::new(x * w, 0.0);
        }
        self.fft.process_with_scratch(&mut self.spectrum, &mut self.scratch);

        let n = self.fft_size as f32;
        let tau = self.smoothing;
        let scale = 255.0 / (self.max_db - self.min_db);
        for ((out, s), bin) in buf.iter_mut().zip(self.smoothed.iter_mut()).zip(&self.spectrum) {
            let mag = bin.norm() / n;
            let next = tau * *s + (1.0 - tau) * mag;
            *s = if next.is_finite() { next } else { 0.0 };

            let db = 20.0 * s.log10();
            let scaled = scale * (db - self.min_db);
            *out = if scaled.is_nan() { 0 } else { scaled.clamp(0.0, 255.0) as u8 };
        }
        Ok(())
    }

    fn fill_time_domain(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        check_len("time-domain buffer", self.fft_size / 2, buf)?;
        self.snapshot();
        for (out, &x) in buf.iter_mut().zip(&self.time) {
            *out = (128.0 * (1.0 + x)).clamp(0.0, 255.0) as u8;
        }
        Ok(())
    }
}

/// Periodic Blackman window (alpha = 0.16).
pub fn blackman(n: usize) -> Vec<f32> {
    let (a0, a1, a2) = (0.42, 0.5, 0.08);
    (0..n)
        .map(|i| {
            let t = i as f32 / n as f32;
            a0 - a1 * (2.0 * PI * t).cos() + a2 * (4.0 * PI * t).cos()
        })
        .collect()
}
