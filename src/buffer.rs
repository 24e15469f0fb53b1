/// Fixed-capacity ring of mono samples. The audio callback pushes, the
/// analyser copies out the newest window.
pub struct SampleRing {
    data: Vec<f32>,
    write_idx: usize,
    filled: bool,
}

impl SampleRing {
    pub fn new(cap: usize) -> Self {
        Self {
            data: vec![0.0; cap.max(1)],
            write_idx: 0,
            filled: false,
        }
    }

    #[inline]
    pub fn push(&mut self, x: f32) {
        self.data[self.write_idx] = x;
        self.write_idx = (self.write_idx + 1) % self.data.len();
        if self.write_idx == 0 {
            self.filled = true;
        }
    }

    pub fn extend_from_slice(&mut self, xs: &[f32]) {
        for &x in xs {
            self.push(x);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        if self.filled {
            self.data.len()
        } else {
            self.write_idx
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.filled && self.write_idx == 0
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
        self.write_idx = 0;
        self.filled = false;
    }

    /// Copy the newest `out.len()` samples into `out`, oldest first. If fewer
    /// have been pushed, the front of `out` is zero-filled. Never allocates.
    pub fn copy_latest_into(&self, out: &mut [f32]) {
        let n = out.len();
        let have = self.len().min(n);
        let pad = n - have;
        out[..pad].fill(0.0);

        let cap = self.data.len();
        let start = (self.write_idx + cap - have) % cap;
        let dst = &mut out[pad..];
        if start + have <= cap {
            dst.copy_from_slice(&self.data[start..start + have]);
        } else {
            let first = cap - start;
            dst[..first].copy_from_slice(&self.data[start..cap]);
            dst[first..].copy_from_slice(&self.data[..have - first]);
        }
    }
}
