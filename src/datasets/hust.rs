use regex::Regex;

use super::{Dataset, LabelRule, MetadataSource, RemoteFile, Source};
use crate::data::metadata::MetadataSpec;
use crate::error::Result;

const URL: &str = "https://prod-dcd-datasets-cache-zipfiles.s3.eu-west-1.amazonaws.com/cbv7jyx4p9-2.zip";

/// Huazhong University of Science and Technology bearing data.
///
/// File names encode defect, bearing and working condition: `IB504.mat`
/// is an inner+ball defect on a 6205 bearing at 400 W. The label is the
/// defect code.
#[derive(Debug, Clone)]
pub struct Hust {
    source: Source,
    metadata: MetadataSource,
    channels: Vec<Regex>,
    label_rule: LabelRule,
}

impl Hust {
    pub fn new() -> Result<Self> {
        let spec = MetadataSpec::new(r"^([A-Za-z]+)(\d)\d*(\d)\.mat$")?
            .headers(&["defect", "bearing", "condition"])
            .columns(&["$1", "620$2", "${3}00_W"]);
        Ok(Self {
            source: Source::Archives {
                files: vec![RemoteFile::new(URL, "hust_bearing.zip")],
                members: Regex::new(r"([^/]+\.mat)$")?,
            },
            metadata: MetadataSource::Generated(spec),
            channels: vec![Regex::new(r"^data$")?],
            label_rule: LabelRule::Field(0),
        })
    }
}

impl Dataset for Hust {
    fn name(&self) -> &str {
        "hust"
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
