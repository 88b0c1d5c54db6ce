use serde::{Deserialize, Serialize};

use super::loader::Channel;
use crate::error::{Error, Result};

/// How an acquisition window is cut from a raw trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowStrategy {
    /// Keep only the first `sample_size` samples: exactly one row per file.
    /// A shorter trace is an error.
    #[default]
    Truncate,
    /// Cut the whole trace into `len / sample_size` non-overlapping windows.
    /// A shorter trace yields no rows.
    Segment,
}

impl WindowStrategy {
    /// Slice `channels` into rows of `sample_size * channels.len()` values.
    ///
    /// Multi-channel rows are channel-major: `[ch0 window | ch1 window | ...]`.
    /// All channels are cut to the length of the shortest one.
    pub fn windows(
        self,
        key: &str,
        channels: &[Channel],
        sample_size: usize,
    ) -> Result<Vec<Vec<f64>>> {
        if sample_size == 0 {
            return Err(Error::Unsupported("sample_size must be positive".into()));
        }
        let len = channels.iter().map(|c| c.samples.len()).min().unwrap_or(0);

        let count = match self {
            WindowStrategy::Truncate => {
                if len < sample_size {
                    return Err(Error::ShortTrace {
                        key: key.to_string(),
                        len,
                        sample_size,
                    });
                }
                1
            }
            WindowStrategy::Segment => len / sample_size,
        };

        Ok((0..count)
            .map(|i| {
                let range = i * sample_size..(i + 1) * sample_size;
                channels
                    .iter()
                    .flat_map(|c| c.samples[range.clone()].iter().copied())
                    .collect()
            })
            .collect())
    }
}
