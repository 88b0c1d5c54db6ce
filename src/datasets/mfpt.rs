use regex::Regex;

use super::{Dataset, LabelRule, MetadataSource, RemoteFile, Source};
use crate::data::metadata::MetadataSpec;
use crate::error::Result;

const URL: &str =
    "https://www.mfpt.org/wp-content/uploads/2020/02/MFPT-Fault-Data-Sets-20200227T131140Z-001.zip";

/// Society for Machinery Failure Prevention Technology bearing data.
///
/// Every file stores a `bearing` struct whose `gs` field is the
/// acceleration trace. Baseline runs are healthy.
#[derive(Debug, Clone)]
pub struct Mfpt {
    source: Source,
    metadata: MetadataSource,
    channels: Vec<Regex>,
    label_rule: LabelRule,
}

impl Mfpt {
    pub fn new() -> Result<Self> {
        // `OuterRaceFault_vload_5.mat` -> O, OuterRaceFault, vload_5
        let spec = MetadataSpec::new(
            r"^(baseline|OuterRaceFault|InnerRaceFault)_((?:vload_)?\d+)\.mat$",
        )?
        .headers(&["fault", "fault_type", "run"])
        .lookup(
            1,
            &[
                ("baseline", "N"),
                ("OuterRaceFault", "O"),
                ("InnerRaceFault", "I"),
            ],
        );
        Ok(Self {
            source: Source::Archives {
                files: vec![RemoteFile::new(URL, "mfpt_bearing.zip")],
                members: Regex::new(r"((?:baseline|OuterRaceFault|InnerRaceFault)[^/]*\.mat)$")?,
            },
            metadata: MetadataSource::Generated(spec),
            channels: vec![Regex::new(r"^bearing\.gs$")?],
            label_rule: LabelRule::Field(0),
        })
    }
}

impl Dataset for Mfpt {
    fn name(&self) -> &str {
        "mfpt"
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
}
