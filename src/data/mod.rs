//! Training and validation datasets
//!
//! A [`Dataset`] holds the aligned input/target vectors of one split together
//! with the class-balance counts derived from each target's first component.
//! The on-disk layout is plain text: a header line `num_data num_input
//! num_output`, then one whitespace-separated input line and one target line
//! per example.

use crate::{Error, Result};
use std::path::Path;

/// Decision threshold separating the low and high classes.
pub const CLASS_THRESHOLD: f32 = 0.5;

/// Input/target vectors for one data split, immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    inputs: Vec<Vec<f32>>,
    targets: Vec<Vec<f32>>,
    num_input: usize,
    num_output: usize,
    low_count: usize,
    high_count: usize,
}

impl Dataset {
    /// Build a dataset from in-memory vectors.
    ///
    /// Every input must have the same length, likewise every target, and the
    /// two sequences must be aligned.
    pub fn new(inputs: Vec<Vec<f32>>, targets: Vec<Vec<f32>>) -> Result<Self> {
        Self::build(inputs, targets).map_err(|reason| Error::DataLoad {
            path: "<memory>".into(),
            reason,
        })
    }

    /// Read a dataset from `path`.
    ///
    /// Fails when the file is missing or any header/vector line is malformed;
    /// the error names the offending line.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::DataLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&text).map_err(|reason| Error::DataLoad {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Read an optional validation split.
    ///
    /// Returns `Ok(None)` when no path is supplied or the file does not
    /// exist, so the caller can fall back to the training split. A file that
    /// exists but cannot be parsed is still an error.
    pub fn load_optional(path: Option<&Path>) -> Result<Option<Self>> {
        match path {
            Some(p) if p.exists() => Ok(Some(Self::load(p)?)),
            _ => Ok(None),
        }
    }

    /// Write the dataset in the same plain-text layout `load` reads.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut out = format!("{} {} {}\n", self.len(), self.num_input, self.num_output);
        for (input, target) in self.inputs.iter().zip(&self.targets) {
            push_vector(&mut out, input);
            push_vector(&mut out, target);
        }
        std::fs::write(path, out)?;
        Ok(())
    }

    fn parse(text: &str) -> std::result::Result<Self, String> {
        // Line numbers are 1-based and skip blank lines, matching how the
        // files are usually hand-edited.
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty());

        let (header_no, header) = lines.next().ok_or("file is empty")?;
        let fields: Vec<&str> = header.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(format!(
                "line {header_no}: header must be `num_data num_input num_output`"
            ));
        }
        let parse_count = |field: &str, name: &str| {
            field
                .parse::<usize>()
                .map_err(|_| format!("line {header_no}: invalid {name} `{field}`"))
        };
        let num_data = parse_count(fields[0], "example count")?;
        let num_input = parse_count(fields[1], "input dimensionality")?;
        let num_output = parse_count(fields[2], "output dimensionality")?;

        let mut inputs = Vec::with_capacity(num_data);
        let mut targets = Vec::with_capacity(num_data);
        for example in 0..num_data {
            inputs.push(parse_vector(lines.next(), num_input, example, "input")?);
            targets.push(parse_vector(lines.next(), num_output, example, "target")?);
        }
        if let Some((line_no, _)) = lines.next() {
            return Err(format!(
                "line {line_no}: trailing data after {num_data} examples"
            ));
        }

        Self::build(inputs, targets)
    }

    fn build(
        inputs: Vec<Vec<f32>>,
        targets: Vec<Vec<f32>>,
    ) -> std::result::Result<Self, String> {
        if inputs.len() != targets.len() {
            return Err(format!(
                "{} inputs but {} targets",
                inputs.len(),
                targets.len()
            ));
        }
        if inputs.is_empty() {
            return Err("dataset contains no examples".to_string());
        }
        let num_input = inputs[0].len();
        let num_output = targets[0].len();
        if num_input == 0 || num_output == 0 {
            return Err("input and output dimensionality must be at least 1".to_string());
        }
        for (i, input) in inputs.iter().enumerate() {
            if input.len() != num_input {
                return Err(format!(
                    "example {i}: input has {} components, expected {num_input}",
                    input.len()
                ));
            }
        }
        for (i, target) in targets.iter().enumerate() {
            if target.len() != num_output {
                return Err(format!(
                    "example {i}: target has {} components, expected {num_output}",
                    target.len()
                ));
            }
        }

        let (low_count, high_count) = class_balance(&targets);
        Ok(Self {
            inputs,
            targets,
            num_input,
            num_output,
            low_count,
            high_count,
        })
    }

    /// Number of examples.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Length of every input vector.
    pub fn num_input(&self) -> usize {
        self.num_input
    }

    /// Length of every target vector.
    pub fn num_output(&self) -> usize {
        self.num_output
    }

    /// Examples whose first target component is below the class threshold.
    pub fn low_count(&self) -> usize {
        self.low_count
    }

    /// Examples whose first target component is above the class threshold.
    pub fn high_count(&self) -> usize {
        self.high_count
    }

    pub fn inputs(&self) -> &[Vec<f32>] {
        &self.inputs
    }

    pub fn targets(&self) -> &[Vec<f32>] {
        &self.targets
    }

    /// Input vector of example `i`.
    pub fn input(&self, i: usize) -> &[f32] {
        &self.inputs[i]
    }

    /// Target vector of example `i`.
    pub fn target(&self, i: usize) -> &[f32] {
        &self.targets[i]
    }
}

/// Count low/high class membership over target first components.
///
/// A target sitting exactly on the threshold belongs to neither class.
fn class_balance(targets: &[Vec<f32>]) -> (usize, usize) {
    let mut low = 0;
    let mut high = 0;
    for target in targets {
        if target[0] < CLASS_THRESHOLD {
            low += 1;
        } else if target[0] > CLASS_THRESHOLD {
            high += 1;
        }
    }
    (low, high)
}

fn parse_vector(
    line: Option<(usize, &str)>,
    expected: usize,
    example: usize,
    kind: &str,
) -> std::result::Result<Vec<f32>, String> {
    let (line_no, line) =
        line.ok_or_else(|| format!("unexpected end of file in example {example} ({kind})"))?;
    let values: Vec<f32> = line
        .split_whitespace()
        .map(|field| {
            field
                .parse::<f32>()
                .map_err(|_| format!("line {line_no}: invalid number `{field}`"))
        })
        .collect::<std::result::Result<_, _>>()?;
    if values.len() != expected {
        return Err(format!(
            "line {line_no}: {kind} has {} components, expected {expected}",
            values.len()
        ));
    }
    Ok(values)
}

fn push_vector(out: &mut String, values: &[f32]) {
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&v.to_string());
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn four_example_set() -> Dataset {
        Dataset::new(
            vec![vec![0.0], vec![0.1], vec![0.9], vec![1.0]],
            vec![vec![0.1], vec![0.2], vec![0.9], vec![0.8]],
        )
        .unwrap()
    }

    #[test]
    fn test_class_balance_counts() {
        let data = four_example_set();
        assert_eq!(data.low_count(), 2);
        assert_eq!(data.high_count(), 2);
    }

    #[test]
    fn test_threshold_tie_counted_in_neither() {
        let data = Dataset::new(
            vec![vec![0.0], vec![1.0], vec![2.0]],
            vec![vec![0.5], vec![0.1], vec![0.9]],
        )
        .unwrap();
        assert_eq!(data.low_count(), 1);
        assert_eq!(data.high_count(), 1);
        assert_eq!(data.low_count() + data.high_count(), data.len() - 1);
    }

    #[test]
    fn test_new_rejects_misaligned_splits() {
        let result = Dataset::new(vec![vec![0.0], vec![1.0]], vec![vec![0.5]]);
        assert!(matches!(result, Err(Error::DataLoad { .. })));
    }

    #[test]
    fn test_new_rejects_empty() {
        assert!(Dataset::new(vec![], vec![]).is_err());
    }

    #[test]
    fn test_new_rejects_ragged_inputs() {
        let result = Dataset::new(
            vec![vec![0.0, 1.0], vec![1.0]],
            vec![vec![0.5], vec![0.5]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Dataset::load("/nonexistent/data.train");
        assert!(matches!(result, Err(Error::DataLoad { .. })));
    }

    #[test]
    fn test_load_parses_layout() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "2 2 1\n0 0\n0.1\n1 1\n0.9\n").unwrap();

        let data = Dataset::load(file.path()).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.num_input(), 2);
        assert_eq!(data.num_output(), 1);
        assert_eq!(data.input(1), &[1.0, 1.0]);
        assert_eq!(data.target(0), &[0.1]);
        assert_eq!(data.low_count(), 1);
        assert_eq!(data.high_count(), 1);
    }

    #[test]
    fn test_load_rejects_bad_header() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "2 2\n0 0\n0.1\n").unwrap();

        let err = Dataset::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("header"));
    }

    #[test]
    fn test_load_names_offending_line() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "1 2 1\n0 oops\n0.1\n").unwrap();

        let err = Dataset::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_load_rejects_truncated_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "2 1 1\n0\n0.1\n1\n").unwrap();

        let err = Dataset::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("end of file"));
    }

    #[test]
    fn test_load_rejects_trailing_examples() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "1 1 1\n0\n0.1\n1\n0.9\n").unwrap();

        let err = Dataset::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("trailing"));
    }

    #[test]
    fn test_save_load_round_trip() {
        let data = four_example_set();
        let file = NamedTempFile::new().unwrap();
        data.save(file.path()).unwrap();

        let reloaded = Dataset::load(file.path()).unwrap();
        assert_eq!(reloaded, data);
    }

    #[test]
    fn test_load_optional_missing_is_none() {
        assert!(Dataset::load_optional(None).unwrap().is_none());
        assert!(
            Dataset::load_optional(Some(Path::new("/nonexistent/val.train")))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_load_optional_present_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "1 1 1\n0\n0.9\n").unwrap();

        let data = Dataset::load_optional(Some(file.path())).unwrap().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data.high_count(), 1);
    }

    #[test]
    fn test_load_optional_malformed_file_errors() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "not a dataset\n").unwrap();

        assert!(Dataset::load_optional(Some(file.path())).is_err());
    }
}
