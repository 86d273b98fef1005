//! Photo records and the skip log produced while reading a folder

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// EXIF exposure compensation, kept as an exact rational in lowest terms.
///
/// Cameras store ExposureBiasValue as an SRATIONAL such as `-2/3` or `+1/1`.
/// Two biases are equal only when their reduced fractions match, so a
/// `-2/6` written by one firmware equals the `-1/3` written by another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExposureBias {
    numerator: i32,
    denominator: i32,
}

impl ExposureBias {
    /// Build a bias from a raw SRATIONAL. Returns `None` for a zero denominator.
    pub fn new(numerator: i32, denominator: i32) -> Option<Self> {
        if denominator == 0 {
            return None;
        }

        // Widen so i32::MIN survives the sign flip.
        let (mut num, mut den) = (numerator as i64, denominator as i64);
        if den < 0 {
            num = -num;
            den = -den;
        }
        let divisor = gcd(num.unsigned_abs(), den.unsigned_abs()).max(1) as i64;
        let (num, den) = (num / divisor, den / divisor);

        Some(Self {
            numerator: i32::try_from(num).ok()?,
            denominator: i32::try_from(den).ok()?,
        })
    }

    /// Whole-stop bias, e.g. `ExposureBias::ev(-2)`
    pub fn ev(stops: i32) -> Self {
        Self { numerator: stops, denominator: 1 }
    }

    pub fn numerator(&self) -> i32 {
        self.numerator
    }

    pub fn denominator(&self) -> i32 {
        self.denominator
    }

    /// Bias in EV stops as a float, for display and sorting
    pub fn as_ev(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

impl Ord for ExposureBias {
    fn cmp(&self, other: &Self) -> Ordering {
        // Denominators are positive after reduction, so cross-multiplying keeps order.
        let lhs = self.numerator as i64 * other.denominator as i64;
        let rhs = other.numerator as i64 * self.denominator as i64;
        lhs.cmp(&rhs)
    }
}

impl PartialOrd for ExposureBias {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ExposureBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.numerator > 0 { "+" } else { "" };
        if self.denominator == 1 {
            write!(f, "{}{} EV", sign, self.numerator)
        } else {
            write!(f, "{}{}/{} EV", sign, self.numerator, self.denominator)
        }
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// A RAW file whose capture time and exposure bias were both readable.
///
/// Files with unreadable or missing tags never become a `PhotoRecord`;
/// they are logged as a [`SkippedEntry`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// Full path to the file at scan time
    pub path: PathBuf,
    /// File name, unique within one scanned folder
    pub filename: String,
    /// DateTimeOriginal plus SubSecTimeOriginal, camera clock treated as UTC
    pub captured_at: DateTime<Utc>,
    pub exposure_bias: ExposureBias,
}

impl PhotoRecord {
    pub fn new(path: PathBuf, captured_at: DateTime<Utc>, exposure_bias: ExposureBias) -> Self {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            filename,
            captured_at,
            exposure_bias,
        }
    }

    /// Processing order: capture time, then file name for identical timestamps
    pub fn chronological(a: &PhotoRecord, b: &PhotoRecord) -> Ordering {
        a.captured_at
            .cmp(&b.captured_at)
            .then_with(|| a.filename.cmp(&b.filename))
    }
}

/// Why a file never made it into the record sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    MissingTimestamp,
    MissingExposureBias,
    /// The file could not be parsed, or kept failing after retries
    ReadError(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingTimestamp => write!(f, "missing capture timestamp"),
            SkipReason::MissingExposureBias => write!(f, "missing exposure bias"),
            SkipReason::ReadError(message) => write!(f, "read error: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub filename: String,
    pub reason: SkipReason,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_bias_reduces_to_lowest_terms() {
        let bias = ExposureBias::new(-2, 6).unwrap();
        assert_eq!(bias.numerator(), -1);
        assert_eq!(bias.denominator(), 3);
        assert_eq!(bias, ExposureBias::new(-1, 3).unwrap());
        assert_eq!(ExposureBias::new(2, -2).unwrap(), ExposureBias::ev(-1));
        assert_eq!(ExposureBias::new(0, 7).unwrap(), ExposureBias::ev(0));
    }

    #[test]
    fn test_bias_rejects_zero_denominator() {
        assert!(ExposureBias::new(1, 0).is_none());
    }

    #[test]
    fn test_bias_ordering_and_display() {
        let under = ExposureBias::new(-2, 3).unwrap();
        let over = ExposureBias::new(1, 3).unwrap();
        assert!(under < ExposureBias::ev(0));
        assert!(over > ExposureBias::ev(0));
        assert_eq!(under.to_string(), "-2/3 EV");
        assert_eq!(ExposureBias::ev(1).to_string(), "+1 EV");
        assert_eq!(ExposureBias::ev(0).to_string(), "0 EV");
        assert!((under.as_ev() + 0.6667).abs() < 1e-3);
    }

    #[test]
    fn test_record_filename_and_order() {
        let t = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let b = PhotoRecord::new(PathBuf::from("/shoot/DSC_0002.NEF"), t, ExposureBias::ev(0));
        let a = PhotoRecord::new(PathBuf::from("/shoot/DSC_0001.NEF"), t, ExposureBias::ev(0));
        assert_eq!(a.filename, "DSC_0001.NEF");

        let mut records = vec![b.clone(), a.clone()];
        records.sort_by(PhotoRecord::chronological);
        assert_eq!(records, vec![a, b]);
    }
}
