// =============================================================================
// Wavelet Denoising — multi-level DWT with detail coefficients discarded
// =============================================================================
//
// Decomposition:
//   cA_j[o] = sum_k lo[k] * a_{j-1}[2o + 1 - k]
//   cD_j[o] = sum_k hi[k] * a_{j-1}[2o + 1 - k]
// with half-sample symmetric extension at both edges, so a level of length n
// yields floor((n + f - 1) / 2) coefficients for a filter of length f.
//
// Reconstruction is the matching upsample-and-convolve, keeping the
// 2m - f + 2 "valid" samples. An odd-length level comes back one sample
// longer, which is trimmed before the next level up.
//
// Denoising keeps cA_L and zeroes every cD_j. A constant input survives
// unchanged because the lowpass filters sum to sqrt(2) on each phase.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, SignalError};

/// Supported orthogonal Daubechies wavelets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Wavelet {
    #[serde(alias = "db1")]
    Haar,
    Db2,
    Db3,
    Db4,
}

impl Default for Wavelet {
    fn default() -> Self {
        Self::Db4
    }
}

impl std::fmt::Display for Wavelet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Haar => write!(f, "haar"),
            Self::Db2 => write!(f, "db2"),
            Self::Db3 => write!(f, "db3"),
            Self::Db4 => write!(f, "db4"),
        }
    }
}

impl std::str::FromStr for Wavelet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "haar" | "db1" => Ok(Self::Haar),
            "db2" => Ok(Self::Db2),
            "db3" => Ok(Self::Db3),
            "db4" => Ok(Self::Db4),
            other => Err(format!("unsupported wavelet '{other}'")),
        }
    }
}

const HAAR_DEC_LO: [f64; 2] = [0.7071067811865476, 0.7071067811865476];

const DB2_DEC_LO: [f64; 4] = [
    -0.12940952255126037,
    0.2241438680420134,
    0.8365163037378079,
    0.48296291314453416,
];

const DB3_DEC_LO: [f64; 6] = [
    0.03522629188570953,
    -0.08544127388202666,
    -0.13501102001025458,
    0.45987750211849154,
    0.8068915093110925,
    0.33267055295008263,
];

const DB4_DEC_LO: [f64; 8] = [
    -0.010597401785069032,
    0.0328830116668852,
    0.030841381835560764,
    -0.18703481171909309,
    -0.027983769416859854,
    0.6308807679298589,
    0.7148465705529157,
    0.2303778133088965,
];

impl Wavelet {
    /// Decomposition lowpass filter.
    pub fn dec_lo(&self) -> &'static [f64] {
        match self {
            Self::Haar => &HAAR_DEC_LO,
            Self::Db2 => &DB2_DEC_LO,
            Self::Db3 => &DB3_DEC_LO,
            Self::Db4 => &DB4_DEC_LO,
        }
    }

    pub fn filter_len(&self) -> usize {
        self.dec_lo().len()
    }

    fn filter_bank(&self) -> FilterBank {
        let dec_lo = self.dec_lo().to_vec();
        let rec_lo: Vec<f64> = dec_lo.iter().rev().copied().collect();
        // Quadrature mirror of the reconstruction lowpass.
        let dec_hi: Vec<f64> = rec_lo
            .iter()
            .enumerate()
            .map(|(k, &c)| if k % 2 == 0 { -c } else { c })
            .collect();
        let rec_hi: Vec<f64> = dec_hi.iter().rev().copied().collect();
        FilterBank {
            dec_lo,
            dec_hi,
            rec_lo,
            rec_hi,
        }
    }
}

struct FilterBank {
    dec_lo: Vec<f64>,
    dec_hi: Vec<f64>,
    rec_lo: Vec<f64>,
    rec_hi: Vec<f64>,
}

/// Deepest level at which the coarsest approximation still spans a filter:
/// `floor(log2(data_len / (filter_len - 1)))`, or 0 for short inputs.
pub fn max_level(data_len: usize, filter_len: usize) -> usize {
    if filter_len < 2 {
        return 0;
    }
    let step = filter_len - 1;
    let mut level = 0;
    while step << (level + 1) <= data_len {
        level += 1;
    }
    level
}

/// Map an out-of-range index onto the half-sample symmetric extension of a
/// signal of length `n`.
fn symmetric_index(k: isize, n: usize) -> usize {
    let n = n as isize;
    let period = 2 * n;
    let r = k.rem_euclid(period);
    if r < n {
        r as usize
    } else {
        (period - 1 - r) as usize
    }
}

/// Single-level decomposition into (approximation, detail).
fn dwt(x: &[f64], bank: &FilterBank) -> (Vec<f64>, Vec<f64>) {
    let n = x.len();
    let f = bank.dec_lo.len();
    let out_len = (n + f - 1) / 2;

    let mut approx = Vec::with_capacity(out_len);
    let mut detail = Vec::with_capacity(out_len);

    for o in 0..out_len {
        let centre = (2 * o + 1) as isize;
        let mut a = 0.0;
        let mut d = 0.0;
        for k in 0..f {
            let v = x[symmetric_index(centre - k as isize, n)];
            a += bank.dec_lo[k] * v;
            d += bank.dec_hi[k] * v;
        }
        approx.push(a);
        detail.push(d);
    }

    (approx, detail)
}

/// Single-level reconstruction from equally long approximation and detail.
fn idwt(approx: &[f64], detail: &[f64], bank: &FilterBank) -> Result<Vec<f64>, SignalError> {
    let m = approx.len();
    let f = bank.rec_lo.len();
    if detail.len() != m {
        return Err(SignalError::InvalidParams(format!(
            "coefficient length mismatch: approximation {m}, detail {}",
            detail.len()
        )));
    }
    if m == 0 || 2 * m + 2 < f {
        return Err(SignalError::InsufficientData {
            have: m,
            need: f.saturating_sub(2).div_ceil(2).max(1),
        });
    }

    let out_len = 2 * m + 2 - f;
    let mut out = Vec::with_capacity(out_len);

    for n in 0..out_len {
        let t = n + f - 2;
        let k_lo = (t + 1).saturating_sub(f).div_ceil(2);
        let k_hi = (t / 2).min(m - 1);
        let mut acc = 0.0;
        for k in k_lo..=k_hi {
            let idx = t - 2 * k;
            acc += approx[k] * bank.rec_lo[idx] + detail[k] * bank.rec_hi[idx];
        }
        out.push(acc);
    }

    Ok(out)
}

/// Multi-level decomposition. Returns `[cA_L, cD_L, cD_{L-1}, ..., cD_1]`.
///
/// `level = None` picks [`max_level`]. A level of zero returns the input as
/// the only coefficient array.
pub fn wavedec(
    values: &[f64],
    wavelet: Wavelet,
    level: Option<usize>,
) -> Result<Vec<Vec<f64>>, SignalError> {
    ensure_finite(values)?;

    let deepest = max_level(values.len(), wavelet.filter_len());
    let level = level.unwrap_or(deepest);
    if level > deepest {
        return Err(SignalError::InvalidParams(format!(
            "decomposition level {level} exceeds maximum {deepest} for {} values with {wavelet}",
            values.len()
        )));
    }

    let bank = wavelet.filter_bank();
    let mut details = Vec::with_capacity(level);
    let mut approx = values.to_vec();
    for _ in 0..level {
        let (a, d) = dwt(&approx, &bank);
        details.push(d);
        approx = a;
    }

    let mut coeffs = Vec::with_capacity(level + 1);
    coeffs.push(approx);
    coeffs.extend(details.into_iter().rev());
    Ok(coeffs)
}

/// Inverse of [`wavedec`]. The result can be one sample longer than the
/// original signal when its length was odd.
pub fn waverec(coeffs: &[Vec<f64>], wavelet: Wavelet) -> Result<Vec<f64>, SignalError> {
    let (first, details) = coeffs.split_first().ok_or(SignalError::EmptySeries)?;
    let bank = wavelet.filter_bank();

    let mut approx = first.clone();
    for detail in details {
        if approx.len() == detail.len() + 1 {
            approx.pop();
        }
        approx = idwt(&approx, detail, &bank)?;
    }
    Ok(approx)
}

/// Smooth `values` by discarding every detail band of a max-level
/// decomposition. The output always has the input's length.
///
/// Fails on an empty series or one containing NaN/infinite values.
pub fn denoise(values: &[f64], wavelet: Wavelet) -> Result<Vec<f64>, SignalError> {
    let mut coeffs = wavedec(values, wavelet, None)?;
    for band in coeffs.iter_mut().skip(1) {
        band.iter_mut().for_each(|c| *c = 0.0);
    }
    let smooth = waverec(&coeffs, wavelet)?;
    Ok(fit_length(smooth, values.len()))
}

/// Truncate to `len`, or pad by repeating the last value.
fn fit_length(mut values: Vec<f64>, len: usize) -> Vec<f64> {
    if values.len() >= len {
        values.truncate(len);
    } else if let Some(&last) = values.last() {
        values.resize(len, last);
    }
    values
}
