use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

pub const HEADER: [&str; 5] = ["dataset", "classifier", "y_actual", "y_pred", "y_proba"];

// ---------------------------------------------------------------------------
// Literal values
// ---------------------------------------------------------------------------

/// A scalar or (nested) list as written in a results cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Literal>),
}

impl Literal {
    /// Parse `['F', 'N']`, `[0, 1, 1, 0]` or whitespace-separated
    /// `[0 1 1 0]`.
    pub fn parse(text: &str) -> Result<Literal> {
        let mut parser = Parser {
            chars: text.char_indices().peekable(),
            text,
        };
        let value = parser.value()?;
        parser.skip_ws();
        if let Some((pos, c)) = parser.chars.next() {
            bail!("unexpected '{c}' at offset {pos} in {text:?}");
        }
        Ok(value)
    }

    /// The value as a class label (`'F'` -> `F`, `1` -> `1`).
    pub fn label(&self) -> String {
        match self {
            Literal::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Int(i) => Some(*i as f64),
            Literal::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn strings<S: AsRef<str>>(items: &[S]) -> Literal {
        Literal::List(items.iter().map(|s| Literal::Str(s.as_ref().to_string())).collect())
    }

    /// Items of a list, unwrapping a single nested list (`[[0, 1]]`).
    fn into_items(self) -> Vec<Literal> {
        match self {
            Literal::List(mut items)
                if items.len() == 1 && matches!(items[0], Literal::List(_)) =>
            {
                match items.remove(0) {
                    Literal::List(inner) => inner,
                    other => vec![other],
                }
            }
            Literal::List(items) => items,
            scalar => vec![scalar],
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            Literal::Float(v) => write!(f, "{v}"),
            Literal::Str(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Literal::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    text: &'a str,
}

impl Parser<'_> {
    fn skip_ws(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn value(&mut self) -> Result<Literal> {
        self.skip_ws();
        match self.chars.peek().copied() {
            None => bail!("unexpected end of {:?}", self.text),
            Some((_, '[')) => self.list(),
            Some((_, q @ ('\'' | '"'))) => self.string(q),
            Some((start, _)) => self.number(start),
        }
    }

    fn list(&mut self) -> Result<Literal> {
        self.chars.next();
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.chars.peek().copied() {
                Some((_, ']')) => {
                    self.chars.next();
                    return Ok(Literal::List(items));
                }
                Some((_, ',')) => {
                    self.chars.next();
                }
                Some(_) => items.push(self.value()?),
                None => bail!("unterminated list in {:?}", self.text),
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<Literal> {
        self.chars.next();
        let mut out = String::new();
        while let Some((_, c)) = self.chars.next() {
            match c {
                '\\' => match self.chars.next() {
                    Some((_, escaped)) => out.push(escaped),
                    None => break,
                },
                c if c == quote => return Ok(Literal::Str(out)),
                c => out.push(c),
            }
        }
        bail!("unterminated string in {:?}", self.text)
    }

    fn number(&mut self, start: usize) -> Result<Literal> {
        let mut end = start;
        while let Some((pos, c)) = self
            .chars
            .next_if(|(_, c)| !c.is_whitespace() && !matches!(c, ',' | '[' | ']'))
        {
            end = pos + c.len_utf8();
        }
        let token = &self.text[start..end];
        if let Ok(i) = token.parse::<i64>() {
            return Ok(Literal::Int(i));
        }
        token
            .parse::<f64>()
            .map(Literal::Float)
            .with_context(|| format!("'{token}' is not a number or list"))
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub dataset: String,
    pub classifier: String,
    pub y_actual: Vec<Literal>,
    pub y_pred: Vec<Literal>,
    /// Per-row class probabilities.
    pub y_proba: Vec<Vec<f64>>,
}

impl ResultRow {
    pub fn actual_labels(&self) -> Vec<String> {
        self.y_actual.iter().map(Literal::label).collect()
    }

    pub fn predicted_labels(&self) -> Vec<String> {
        self.y_pred.iter().map(Literal::label).collect()
    }

    fn proba_literal(&self) -> Literal {
        Literal::List(
            self.y_proba
                .iter()
                .map(|row| Literal::List(row.iter().map(|&v| Literal::Float(v)).collect()))
                .collect(),
        )
    }
}

fn proba_rows(value: Literal) -> Vec<Vec<f64>> {
    let rows = match value {
        Literal::List(rows) => rows,
        scalar => vec![scalar],
    };
    rows.into_iter()
        .map(|row| match row {
            Literal::List(items) => items.iter().filter_map(Literal::as_f64).collect(),
            scalar => scalar.as_f64().into_iter().collect(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Write `rows` to `<dir>/<YYYY.MM.DD_HH.MM.SS>.csv` and return the path.
pub fn save_results(dir: &Path, rows: &[ResultRow]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let stamp = chrono::Local::now().format("%Y.%m.%d_%H.%M.%S").to_string();
    let mut path = dir.join(format!("{stamp}.csv"));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{stamp}_{n}.csv"));
        n += 1;
    }

    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("creating results file {}", path.display()))?;
    writer.write_record(HEADER)?;
    for row in rows {
        writer.write_record([
            row.dataset.clone(),
            row.classifier.clone(),
            Literal::List(row.y_actual.clone()).to_string(),
            Literal::List(row.y_pred.clone()).to_string(),
            row.proba_literal().to_string(),
        ])?;
    }
    writer.flush()?;
    log::info!("Results saved to {}", path.display());
    Ok(path)
}

pub fn load_results(path: &Path) -> Result<Vec<ResultRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening results file {}", path.display()))?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading {}", path.display()))?;
        let field = |i: usize| {
            record
                .get(i)
                .with_context(|| {
                    format!("{}: row {line} has no '{}' column", path.display(), HEADER[i])
                })
        };
        let parse = |i: usize| -> Result<Literal> {
            Literal::parse(field(i)?)
                .with_context(|| format!("{}: row {line}, column '{}'", path.display(), HEADER[i]))
        };
        rows.push(ResultRow {
            dataset: field(0)?.to_string(),
            classifier: field(1)?.to_string(),
            y_actual: parse(2)?.into_items(),
            y_pred: parse(3)?.into_items(),
            y_proba: match field(4)?.trim() {
                "" => Vec::new(),
                _ => proba_rows(parse(4)?),
            },
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<Literal> {
        values.iter().map(|&v| Literal::Int(v)).collect()
    }

    #[test]
    fn parses_python_and_numpy_style_lists() {
        assert_eq!(Literal::parse("[0, 1, 1, 0]").unwrap(), Literal::List(ints(&[0, 1, 1, 0])));
        assert_eq!(Literal::parse("[0 1 1 0]").unwrap(), Literal::List(ints(&[0, 1, 1, 0])));
        assert_eq!(
            Literal::parse("['F', \"N\"]").unwrap(),
            Literal::strings(&["F", "N"])
        );
        assert_eq!(
            Literal::parse("[[0.5 0.5]\n [1. 0.]]").unwrap(),
            Literal::List(vec![
                Literal::List(vec![Literal::Float(0.5), Literal::Float(0.5)]),
                Literal::List(vec![Literal::Float(1.0), Literal::Float(0.0)]),
            ])
        );
        assert!(Literal::parse("[0, 1").is_err());
        assert!(Literal::parse("[0] trailing").is_err());
    }

    #[test]
    fn display_matches_python_repr() {
        let value = Literal::List(vec![
            Literal::Str("it's".into()),
            Literal::Int(3),
            Literal::Float(1.0),
            Literal::Float(0.25),
        ]);
        assert_eq!(value.to_string(), r"['it\'s', 3, 1.0, 0.25]");
        assert_eq!(Literal::parse(&value.to_string()).unwrap(), value);
    }

    #[test]
    fn integer_labels_survive_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let row = ResultRow {
            dataset: "cwru".into(),
            classifier: "K-Nearest Neighbors".into(),
            y_actual: ints(&[0, 1, 1, 0]),
            y_pred: ints(&[0, 1, 0, 0]),
            y_proba: vec![vec![1.0, 0.0], vec![0.2, 0.8], vec![0.6, 0.4], vec![1.0, 0.0]],
        };
        let path = save_results(dir.path(), std::slice::from_ref(&row)).unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("csv"));

        let loaded = load_results(&path).unwrap();
        assert_eq!(loaded, vec![row]);
        assert_eq!(loaded[0].actual_labels(), ["0", "1", "1", "0"]);
    }

    #[test]
    fn single_nested_list_is_unwrapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.csv");
        std::fs::write(
            &path,
            "dataset,classifier,y_actual,y_pred,y_proba\nhust,KNN,[['N' 'F']],\"['N', 'N']\",\n",
        )
        .unwrap();
        let rows = load_results(&path).unwrap();
        assert_eq!(rows[0].actual_labels(), ["N", "F"]);
        assert!(rows[0].y_proba.is_empty());
    }
}
