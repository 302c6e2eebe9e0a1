use anyhow::{Context, Result};
use std::path::Path;

const COCO_NAMES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

const UNKNOWN_LABEL: &str = "object";

/// Index → class name table for a detector.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassLabels {
    names: Vec<String>,
}

impl ClassLabels {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn coco() -> Self {
        Self::new(COCO_NAMES.iter().map(|s| s.to_string()).collect())
    }

    /// One name per line; blank lines are skipped.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading labels file {}", path.display()))?;
        let names: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        anyhow::ensure!(!names.is_empty(), "labels file {} is empty", path.display());
        Ok(Self::new(names))
    }

    /// Parses the `names` entry Ultralytics writes into ONNX metadata,
    /// e.g. `{0: 'person', 1: 'bicycle'}`.
    pub fn from_metadata(raw: &str) -> Option<Self> {
        let body = raw.trim().strip_prefix('{')?.strip_suffix('}')?;
        let mut entries: Vec<(usize, String)> = Vec::new();
        let mut chars = body.chars().peekable();

        loop {
            while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ',') {
                chars.next();
            }
            if chars.peek().is_none() {
                break;
            }

            let mut key = String::new();
            while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
                key.push(c);
                chars.next();
            }
            let index: usize = key.parse().ok()?;

            while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
                chars.next();
            }
            if chars.next()? != ':' {
                return None;
            }
            while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
                chars.next();
            }

            let quote = chars.next().filter(|q| *q == '\'' || *q == '"')?;
            let mut name = String::new();
            loop {
                match chars.next()? {
                    '\\' => name.push(chars.next()?),
                    c if c == quote => break,
                    c => name.push(c),
                }
            }
            entries.push((index, name));
        }

        let max = entries.iter().map(|(i, _)| *i).max()?;
        let mut names = vec![UNKNOWN_LABEL.to_string(); max + 1];
        for (i, name) in entries {
            names[i] = name;
        }
        Some(Self::new(names))
    }

    pub fn get(&self, class_id: usize) -> &str {
        self.names.get(class_id).map(String::as_str).unwrap_or(UNKNOWN_LABEL)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_ultralytics_metadata() {
        let labels = ClassLabels::from_metadata("{0: 'person', 1: \"traffic light\", 3: 'it\\'s'}").unwrap();
        assert_eq!(labels.len(), 4);
        assert_eq!(labels.get(0), "person");
        assert_eq!(labels.get(1), "traffic light");
        assert_eq!(labels.get(2), "object");
        assert_eq!(labels.get(3), "it's");
        assert_eq!(labels.get(99), "object");
    }

    #[test]
    fn rejects_malformed_metadata() {
        assert!(ClassLabels::from_metadata("person, car").is_none());
        assert!(ClassLabels::from_metadata("{0 'person'}").is_none());
        assert!(ClassLabels::from_metadata("{}").is_none());
    }

    #[test]
    fn reads_labels_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "plastic bottle\n\nfishing net\n").unwrap();
        let labels = ClassLabels::from_file(file.path()).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.get(1), "fishing net");
    }

    #[test]
    fn coco_has_eighty_classes() {
        assert_eq!(ClassLabels::coco().len(), 80);
        assert_eq!(ClassLabels::coco().get(39), "bottle");
    }
}
