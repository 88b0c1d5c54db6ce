use regex::Regex;

use super::{Dataset, LabelRule, MetadataSource, RemoteFile, Source};
use crate::data::metadata::MetadataSpec;
use crate::error::Result;

const DRIVE_URL: &str = "https://drive.usercontent.google.com/download";

/// Google Drive ids of the six RAR volumes, in part order.
const PART_IDS: [&str; 6] = [
    "1ATvZuD6j3bPxhyR07Zm-PURmOC4b4uRn",
    "162KvWNIpBGtd7EDWo4yP1j5XsaoNHOYU",
    "1NvzrGW-KOSy48OZmiFxlE3TPV4CKAcw0",
    "1VuQ5-mK11p1S2pTxUZaH_IxOwUlsmN0S",
    "1WH4OU4MLaMGQkbh6DghxPA5Dwvsq8tEf",
    "1wzQzQUx6-J8DuGczT81OkrkTgOUwL-I_",
];

/// Failed element of each run-to-failure bearing: `O` outer race, `I`
/// inner race, `C` cage, combinations concatenated.
const FAULTS: &[(&str, &str)] = &[
    ("Bearing1_1", "O"),
    ("Bearing1_2", "O"),
    ("Bearing1_3", "O"),
    ("Bearing1_4", "C"),
    ("Bearing1_5", "IO"),
    ("Bearing2_1", "I"),
    ("Bearing2_2", "O"),
    ("Bearing2_3", "C"),
    ("Bearing2_4", "O"),
    ("Bearing2_5", "O"),
    ("Bearing3_1", "O"),
    ("Bearing3_2", "IBCO"),
    ("Bearing3_3", "I"),
    ("Bearing3_4", "I"),
    ("Bearing3_5", "O"),
];

/// XJTU-SY run-to-failure bearing data.
///
/// Each bearing directory holds one CSV per minute (`Bearing1_1/37.csv`);
/// extraction flattens them to `Bearing1_1_37.csv`. The horizontal
/// accelerometer column is read and the label is the failed element.
#[derive(Debug, Clone)]
pub struct Xjut {
    source: Source,
    metadata: MetadataSource,
    channels: Vec<Regex>,
    label_rule: LabelRule,
}

impl Xjut {
    pub fn new() -> Result<Self> {
        let files = PART_IDS
            .iter()
            .enumerate()
            .map(|(i, id)| {
                RemoteFile::new(
                    format!("{DRIVE_URL}?id={id}&export=download&confirm=t"),
                    format!("xjut_bearing.part{:02}.rar", i + 1),
                )
            })
            .collect();
        let spec = MetadataSpec::new(r"^(Bearing\d_\d)_(\d+)\.csv$")?
            .headers(&["fault", "bearing", "minute"])
            .lookup(1, FAULTS);
        Ok(Self {
            source: Source::Archives {
                files,
                members: Regex::new(r"(Bearing\d_\d/\d+\.csv)$")?,
            },
            metadata: MetadataSource::Generated(spec),
            channels: vec![Regex::new(r"(?i)^horizontal")?],
            label_rule: LabelRule::Field(0),
        })
    }
}

impl Dataset for Xjut {
    fn name(&self) -> &str {
        "xjut"
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
