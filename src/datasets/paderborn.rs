use std::path::Path;

use regex::Regex;

use super::{Dataset, LabelRule, MetadataSource, RemoteFile, Source};
use crate::data::loader::Channel;
use crate::data::mat::MatFile;
use crate::data::metadata::MetadataSpec;
use crate::error::{Error, Result};

const BASE_URL: &str = "https://groups.uni-paderborn.de/kat/BearingDataCenter/";

/// Measurement channel holding the bearing-housing acceleration.
const VIBRATION: &str = "vibration_1";

/// Bearing code and damage class: `N` healthy, `O` outer ring, `I` inner
/// ring, `IO` both.
const BEARINGS: &[(&str, &str)] = &[
    ("K001", "N"),
    ("K002", "N"),
    ("K003", "N"),
    ("K004", "N"),
    ("K005", "N"),
    ("K006", "N"),
    ("KA01", "O"),
    ("KA03", "O"),
    ("KA04", "O"),
    ("KA05", "O"),
    ("KA06", "O"),
    ("KA07", "O"),
    ("KA08", "O"),
    ("KA09", "O"),
    ("KA15", "O"),
    ("KA16", "O"),
    ("KA22", "O"),
    ("KA30", "O"),
    ("KI01", "I"),
    ("KI03", "I"),
    ("KI04", "I"),
    ("KI05", "I"),
    ("KI07", "I"),
    ("KI08", "I"),
    ("KI14", "I"),
    ("KI16", "I"),
    ("KI17", "I"),
    ("KI18", "I"),
    ("KI21", "I"),
    ("KB23", "IO"),
    ("KB24", "IO"),
    ("KB27", "IO"),
];

/// Paderborn University bearing data center.
///
/// One RAR per bearing, each holding `N15_M07_F10_KA04_3.mat` style files
/// (speed, torque, radial force, bearing, run). The signal lives in a
/// struct array: the entry of `<stem>.Y` whose `Name` is `vibration_1`.
#[derive(Debug, Clone)]
pub struct Paderborn {
    source: Source,
    metadata: MetadataSource,
    channels: Vec<Regex>,
    label_rule: LabelRule,
}

impl Paderborn {
    pub fn new() -> Result<Self> {
        let files = BEARINGS
            .iter()
            .map(|(code, _)| {
                RemoteFile::new(format!("{BASE_URL}{code}.rar"), format!("{code}.rar"))
            })
            .collect();
        let spec = MetadataSpec::new(r"^(N\d{2}_M\d{2}_F\d{2})_(K[A-Z0-9]\d{2})_(\d+)\.mat$")?
            .headers(&["damage", "setting", "bearing", "run"])
            .lookup(2, BEARINGS);
        Ok(Self {
            source: Source::Archives {
                files,
                members: Regex::new(r"([^/]+\.mat)$")?,
            },
            metadata: MetadataSource::Generated(spec),
            channels: vec![Regex::new(r"\.Y\[\d+\]\.Data$")?],
            label_rule: LabelRule::Field(0),
        })
    }
}

/// Key of the `Data` field next to the `Name == vibration_1` entry of any
/// variable's `Y` struct array.
fn vibration_key(mat: &MatFile) -> Option<String> {
    let is_vibration = |entry: &String| {
        mat.text(&format!("{entry}.Name"))
            .is_some_and(|name| name.trim() == VIBRATION)
    };
    mat.variables().iter().find_map(|(name, _)| {
        let single = format!("{name}.Y");
        if is_vibration(&single) {
            return Some(format!("{single}.Data"));
        }
        (0..)
            .map(|i| format!("{name}.Y[{i}]"))
            .take_while(|entry| mat.text(&format!("{entry}.Name")).is_some())
            .find(|entry| is_vibration(entry))
            .map(|entry| format!("{entry}.Data"))
    })
}

impl Dataset for Paderborn {
    fn name(&self) -> &str {
        "paderborn"
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

    fn read_signal(&self, path: &Path) -> Result<Vec<Channel>> {
        let mat = MatFile::open(path)?;
        let missing = || Error::MissingSignal {
            path: path.to_path_buf(),
            selector: format!("Y[*].Name == {VIBRATION}"),
        };
        let key = vibration_key(&mat).ok_or_else(missing)?;
        let samples = mat.numeric(&key).ok_or_else(missing)?.data.clone();
        Ok(vec![Channel { name: key, samples }])
    }
}
