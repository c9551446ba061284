// 📊 Statistics Summarizer - counts and similarity ratio

use crate::comparison::ComparisonResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_a: usize,
    pub total_b: usize,
    pub common_count: usize,
    pub only_a_count: usize,
    pub only_b_count: usize,

    /// common / (common + only_a + only_b); 0.0 for two empty records
    pub similarity_ratio: f64,

    /// Properties with at least one common value
    pub shared_property_count: usize,

    /// Properties used by both records with differing value sets
    pub divergent_property_count: usize,
}

impl Stats {
    pub fn summary(&self) -> String {
        format!(
            "{} common, {} only in A, {} only in B ({} vs {} statements), similarity {:.1}%, {} shared / {} divergent properties",
            self.common_count,
            self.only_a_count,
            self.only_b_count,
            self.total_a,
            self.total_b,
            self.similarity_ratio * 100.0,
            self.shared_property_count,
            self.divergent_property_count
        )
    }
}

pub fn summarize(result: &ComparisonResult) -> Stats {
    let common_count = result.common.len();
    let only_a_count = result.only_a.len();
    let only_b_count = result.only_b.len();

    let denominator = common_count + only_a_count + only_b_count;
    let similarity_ratio = if denominator == 0 {
        0.0
    } else {
        common_count as f64 / denominator as f64
    };

    Stats {
        total_a: result.total_a(),
        total_b: result.total_b(),
        common_count,
        only_a_count,
        only_b_count,
        similarity_ratio,
        shared_property_count: result.shared_properties().len(),
        divergent_property_count: result.divergent_properties().len(),
    }
}
