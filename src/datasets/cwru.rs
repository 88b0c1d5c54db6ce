use regex::Regex;

use super::{Dataset, LabelRule, MetadataSource, Source};
use crate::data::model::BearingRecord;
use crate::data::window::WindowStrategy;
use crate::error::Result;

const BASE_URL: &str = "https://engineering.case.edu/sites/default/files/";

/// 12 kHz drive-end acquisitions: condition code and the four file numbers
/// recorded at motor loads 0 to 3 hp.
///
/// Condition codes: `N` normal, `IR` inner race, `B` ball, `OR..@6` outer
/// race centred at 6 o'clock; `007`/`014`/`021` is the fault diameter in
/// thousandths of an inch.
const FILES: &[(&str, [u32; 4])] = &[
    ("N", [97, 98, 99, 100]),
    ("IR007", [105, 106, 107, 108]),
    ("B007", [118, 119, 120, 121]),
    ("OR007@6", [130, 131, 132, 133]),
    ("IR014", [169, 170, 171, 172]),
    ("B014", [185, 186, 187, 188]),
    ("OR014@6", [197, 198, 199, 200]),
    ("IR021", [209, 210, 211, 212]),
    ("B021", [222, 223, 224, 225]),
    ("OR021@6", [234, 235, 236, 237]),
];

/// Case Western Reserve University bearing data.
///
/// Files are downloaded one by one. Each file yields as many windows as fit
/// in its drive-end and fan-end traces; files lacking either are skipped.
/// The label is the first letter of the condition (`N`, `I`, `B`, `O`).
#[derive(Debug, Clone)]
pub struct Cwru {
    source: Source,
    metadata: MetadataSource,
    channels: Vec<Regex>,
    label_rule: LabelRule,
}

impl Cwru {
    pub fn new() -> Result<Self> {
        let records: Vec<BearingRecord> = FILES
            .iter()
            .flat_map(|(condition, numbers)| {
                numbers.iter().enumerate().map(move |(load, n)| {
                    BearingRecord::new(vec![format!("{condition}_{load}")], format!("{n}.mat"))
                })
            })
            .collect();
        let names = records.iter().map(|r| r.file.clone()).collect();

        Ok(Self {
            source: Source::Files {
                base_url: BASE_URL.to_string(),
                names,
            },
            metadata: MetadataSource::Table {
                headers: vec!["condition".to_string()],
                records,
            },
            channels: vec![Regex::new(r"DE_time$")?, Regex::new(r"FE_time$")?],
            label_rule: LabelRule::FirstChar,
        })
    }
}

impl Dataset for Cwru {
    fn name(&self) -> &str {
        "cwru"
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

    fn window(&self) -> WindowStrategy {
        WindowStrategy::Segment
    }

    fn skip_incomplete(&self) -> bool {
        true
    }
}
