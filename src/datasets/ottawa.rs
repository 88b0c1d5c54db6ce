use regex::Regex;

use super::{Dataset, LabelRule, MetadataSource, RemoteFile, Source};
use crate::data::metadata::MetadataSpec;
use crate::error::Result;

const URL: &str = "https://prod-dcd-datasets-cache-zipfiles.s3.eu-west-1.amazonaws.com/y2px5tg92h-4.zip";

/// University of Ottawa bearing data under time-varying speed.
///
/// `O_2_1.mat` holds one array named after the file. Health states are
/// `H` (healthy), `I` (inner), `O` (outer), `B` (ball) and `C` (combined).
#[derive(Debug, Clone)]
pub struct Ottawa {
    source: Source,
    metadata: MetadataSource,
    channels: Vec<Regex>,
    label_rule: LabelRule,
}

impl Ottawa {
    pub fn new() -> Result<Self> {
        let spec = MetadataSpec::new(r"^([A-Z])_(\d+)_(\d+)\.mat$")?
            .headers(&["label"])
            .columns(&["${1}_${2}_${3}"]);
        Ok(Self {
            source: Source::Archives {
                files: vec![RemoteFile::new(URL, "ottawa_bearing.zip")],
                members: Regex::new(r"([^/]+\.mat)$")?,
            },
            metadata: MetadataSource::Generated(spec),
            channels: vec![Regex::new(r"^[A-Z]_\d+_\d+$")?],
            label_rule: LabelRule::Capture {
                pattern: Regex::new(r"^([A-Z])_(\d+)_(\d+)")?,
                group: 1,
            },
        })
    }
}

impl Dataset for Ottawa {
    fn name(&self) -> &str {
        "ottawa"
    }

    fn source(&self) -> &Source {
        &self.source
    }

    fn metadata(&self) -> &MetadataSource {
        &self.metadata
    }

    fn channels(&self) -> &[Regex] {
        &self.channels
    }

    fn label_rule(&self) -> &LabelRule {
        &self.label_rule
    }

    fn healthy_labels(&self) -> Vec<String> {
        vec!["H".to_string()]
    }
}
