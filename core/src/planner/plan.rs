//! Test plan types

use serde::{Deserialize, Serialize};

fn full_mask() -> u8 {
    0xFF
}

/// A masked single-byte write: `new = (old & !mask) | (value & mask)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteWrite {
    pub address: u32,
    pub value: u8,
    #[serde(default = "full_mask")]
    pub mask: u8,
}

impl ByteWrite {
    /// Replace the whole byte.
    pub fn new(address: u32, value: u8) -> Self {
        Self {
            address,
            value,
            mask: full_mask(),
        }
    }

    pub fn masked(address: u32, value: u8, mask: u8) -> Self {
        Self {
            address,
            value,
            mask,
        }
    }

    /// Merge this write into the byte currently in memory.
    pub fn apply(&self, old: u8) -> u8 {
        (old & !self.mask) | (self.value & self.mask)
    }
}

/// One frame of a plan: writes applied before the frame runs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Step {
    pub comment: String,
    #[serde(default)]
    pub writes: Vec<ByteWrite>,
}

impl Step {
    pub fn new(comment: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
            writes: Vec::new(),
        }
    }

    pub fn with_writes(mut self, writes: Vec<ByteWrite>) -> Self {
        self.writes = writes;
        self
    }
}

/// Ordered frame steps that force a formula true.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TestPlan {
    pub steps: Vec<Step>,
}

impl TestPlan {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.steps.iter()
    }

    /// Total byte writes across all steps.
    pub fn write_count(&self) -> usize {
        self.steps.iter().map(|step| step.writes.len()).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl<'a> IntoIterator for &'a TestPlan {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_merge() {
        assert_eq!(ByteWrite::new(0, 0x12).apply(0xFF), 0x12);
        assert_eq!(ByteWrite::masked(0, 0x05, 0x0F).apply(0xA0), 0xA5);
        assert_eq!(ByteWrite::masked(0, 0x00, 0x10).apply(0xFF), 0xEF);
    }

    #[test]
    fn test_json_mask_defaults() {
        let step: Step =
            serde_json::from_str(r#"{"comment":"x","writes":[{"address":16,"value":3}]}"#).unwrap();
        assert_eq!(step.writes[0], ByteWrite::new(16, 3));

        let plan = TestPlan {
            steps: vec![step.clone(), Step::new("hold")],
        };
        assert_eq!(plan.write_count(), 1);
        let back: TestPlan = serde_json::from_str(&plan.to_json().unwrap()).unwrap();
        assert_eq!(back, plan);
    }
}
