//! Complexity metrics.
//!
//! Pure functions over a generic [`NodeShape`] plus a [`MetricsCollector`]
//! that aggregates per-symbol values into project-level statistics.
//!
//! Keyword counting over text content is intentionally coarse: keywords are
//! matched as substrings, so `elif` also counts as an `if`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Keywords that open a decision point.
pub const DECISION_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "while", "for", "try", "except", "finally", "with", "and", "or",
    "case", "switch", "catch",
];

/// Node kinds that add one extra path regardless of content.
const CONTROL_FLOW_KINDS: &[&str] = &[
    "if_statement",
    "while_loop",
    "for_loop",
    "while_statement",
    "for_statement",
    "try_statement",
];

/// Generic description of a node for complexity purposes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeShape {
    pub kind: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub children: Vec<NodeShape>,
    #[serde(default)]
    pub nesting_level: u32,
}

impl NodeShape {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_children(mut self, children: Vec<NodeShape>) -> Self {
        self.children = children;
        self
    }

    pub fn with_nesting(mut self, nesting_level: u32) -> Self {
        self.nesting_level = nesting_level;
        self
    }

    /// A shape whose children are leaf shapes of the given kinds.
    pub fn flattened<I, S>(kind: impl Into<String>, descendant_kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(kind).with_children(descendant_kinds.into_iter().map(NodeShape::new).collect())
    }
}

/// Halstead size metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HalsteadMetrics {
    pub unique_operators: usize,
    pub unique_operands: usize,
    pub total_operators: usize,
    pub total_operands: usize,
    pub vocabulary: usize,
    pub length: usize,
    pub volume: f64,
    pub difficulty: f64,
    pub effort: f64,
}

/// All metrics of one shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplexityMetrics {
    pub cyclomatic: u32,
    pub cognitive: u32,
    pub nesting_depth: u32,
    pub halstead: HalsteadMetrics,
    pub maintainability_index: f64,
}

fn has_decision_keyword(kind: &str) -> bool {
    let kind = kind.to_ascii_lowercase();
    DECISION_KEYWORDS.iter().any(|keyword| kind.contains(keyword))
}

/// Cyclomatic complexity: base 1, keyword occurrences in content, control-flow
/// kind bonus, and one per decision-bearing child.
pub fn cyclomatic(shape: &NodeShape) -> u32 {
    let mut complexity = 1u32;

    if let Some(content) = &shape.content {
        let lowered = content.to_lowercase();
        for keyword in DECISION_KEYWORDS {
            complexity += lowered.matches(keyword).count() as u32;
        }
    }

    if CONTROL_FLOW_KINDS.contains(&shape.kind.as_str()) {
        complexity += 1;
    }

    complexity += shape
        .children
        .iter()
        .filter(|child| has_decision_keyword(&child.kind))
        .count() as u32;

    complexity
}

/// Weight of a construct in cognitive complexity.
pub fn cognitive_weight(kind: &str) -> u32 {
    match kind.to_ascii_lowercase().as_str() {
        "if" | "else" | "elif" | "if_statement" | "if_expression" | "elif_clause"
        | "else_clause" | "case" | "case_clause" | "switch_case" | "break" | "continue"
        | "return" | "break_statement" | "continue_statement" | "return_statement" => 1,
        "while" | "for" | "try" | "except" | "switch" | "while_statement" | "for_statement"
        | "for_in_statement" | "while_expression" | "for_expression" | "loop_expression"
        | "try_statement" | "except_clause" | "catch_clause" | "switch_statement"
        | "match_expression" | "expression_switch_statement" => 2,
        "lambda" | "nested_function" | "arrow_function" | "closure_expression"
        | "func_literal" => 3,
        _ => 0,
    }
}

/// Cognitive complexity of a single construct at a nesting level.
pub fn cognitive(kind: &str, nesting_level: u32) -> u32 {
    cognitive_weight(kind) + nesting_level.saturating_sub(1)
}

/// Maximum depth of the shape tree (a leaf has depth 0).
pub fn nesting_depth(shape: &NodeShape) -> u32 {
    let mut max = 0;
    let mut stack = vec![(shape, 0u32)];
    while let Some((node, depth)) = stack.pop() {
        max = max.max(depth);
        for child in &node.children {
            stack.push((child, depth + 1));
        }
    }
    max
}

/// Halstead metrics from operator and operand token lists.
pub fn halstead<S: AsRef<str>>(operators: &[S], operands: &[S]) -> HalsteadMetrics {
    if operators.is_empty() && operands.is_empty() {
        return HalsteadMetrics::default();
    }
    let unique = |tokens: &[S]| {
        tokens
            .iter()
            .map(|t| t.as_ref())
            .collect::<std::collections::HashSet<_>>()
            .len()
    };
    let unique_operators = unique(operators);
    let unique_operands = unique(operands);
    let total_operators = operators.len();
    let total_operands = operands.len();

    let vocabulary = unique_operators + unique_operands;
    let length = total_operators + total_operands;
    let volume = if vocabulary > 0 {
        length as f64 * (vocabulary as f64).log2()
    } else {
        0.0
    };
    let difficulty = if unique_operands > 0 {
        (unique_operators as f64 / 2.0) * (total_operands as f64 / unique_operands as f64)
    } else {
        0.0
    };

    HalsteadMetrics {
        unique_operators,
        unique_operands,
        total_operators,
        total_operands,
        vocabulary,
        length,
        volume,
        difficulty,
        effort: difficulty * volume,
    }
}

/// Maintainability index clamped to `[0, 100]`. `loc == 0` yields 100.
///
/// Volumes below 1 are treated as 1 so the logarithm stays defined.
pub fn maintainability_index(cyclomatic: f64, volume: f64, loc: u32, comment_ratio: f64) -> f64 {
    if loc == 0 {
        return 100.0;
    }
    let volume = if volume.is_finite() { volume.max(1.0) } else { 1.0 };
    let cyclomatic = cyclomatic.max(0.0);
    let mut mi = 171.0 - 5.2 * volume.ln() - 0.23 * cyclomatic - 16.2 * (loc as f64).ln();

    let comment_ratio = comment_ratio.clamp(0.0, 1.0);
    if comment_ratio > 0.0 {
        mi += 50.0 * (2.4 * comment_ratio).sqrt().sin();
    }

    if mi.is_nan() {
        return 0.0;
    }
    mi.clamp(0.0, 100.0)
}

/// Compute every metric for one shape.
pub fn calculate_all<S: AsRef<str>>(
    shape: &NodeShape,
    operators: &[S],
    operands: &[S],
    loc: u32,
    comment_ratio: f64,
) -> ComplexityMetrics {
    let cc = cyclomatic(shape);
    let halstead = halstead(operators, operands);
    ComplexityMetrics {
        cyclomatic: cc,
        cognitive: cognitive(&shape.kind, shape.nesting_level),
        nesting_depth: nesting_depth(shape),
        halstead,
        maintainability_index: maintainability_index(
            cc as f64,
            halstead.volume,
            loc,
            comment_ratio,
        ),
    }
}

// ============================================================================
// Aggregation
// ============================================================================

/// Bucket of a cyclomatic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityBand {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ComplexityBand {
    pub fn of(cyclomatic: f64) -> Self {
        if cyclomatic <= 5.0 {
            Self::Low
        } else if cyclomatic <= 10.0 {
            Self::Medium
        } else if cyclomatic <= 20.0 {
            Self::High
        } else {
            Self::VeryHigh
        }
    }
}

/// Project-level complexity summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMetrics {
    pub samples: usize,
    pub average_cyclomatic: f64,
    pub max_cyclomatic: f64,
    pub average_cognitive: f64,
    pub max_cognitive: u32,
    pub average_maintainability: f64,
    pub distribution: BTreeMap<ComplexityBand, usize>,
    pub quality_score: f64,
}

/// Accumulates per-symbol and per-file metrics.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    cyclomatic: Vec<f64>,
    cognitive: Vec<u32>,
    maintainability: Vec<f64>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_symbol(&mut self, cyclomatic: f64, cognitive: u32) {
        self.cyclomatic.push(cyclomatic);
        self.cognitive.push(cognitive);
    }

    pub fn add_maintainability(&mut self, mi: f64) {
        self.maintainability.push(mi);
    }

    pub fn aggregate(&self) -> AggregatedMetrics {
        let mean = |values: &[f64]| {
            if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            }
        };

        let average_cyclomatic = mean(&self.cyclomatic);
        let average_maintainability = if self.maintainability.is_empty() {
            100.0
        } else {
            mean(&self.maintainability)
        };
        let cognitive: Vec<f64> = self.cognitive.iter().map(|c| *c as f64).collect();

        let mut distribution = BTreeMap::new();
        for band in [
            ComplexityBand::Low,
            ComplexityBand::Medium,
            ComplexityBand::High,
            ComplexityBand::VeryHigh,
        ] {
            distribution.insert(band, 0);
        }
        for cc in &self.cyclomatic {
            *distribution.entry(ComplexityBand::of(*cc)).or_insert(0) += 1;
        }

        let complexity_score = (100.0 - average_cyclomatic * 5.0).max(0.0);
        let quality_score =
            (complexity_score * 0.4 + average_maintainability * 0.6).clamp(0.0, 100.0);

        AggregatedMetrics {
            samples: self.cyclomatic.len(),
            average_cyclomatic,
            max_cyclomatic: self.cyclomatic.iter().copied().fold(0.0, f64::max),
            average_cognitive: mean(&cognitive),
            max_cognitive: self.cognitive.iter().copied().max().unwrap_or(0),
            average_maintainability,
            distribution,
            quality_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyclomatic_counts_keywords_in_content() {
        let shape = NodeShape::new("function_definition")
            .with_content("if x: pass\nelif y: pass\nelse: pass");
        // base + "if" twice (substring of "elif") + elif + else
        assert_eq!(cyclomatic(&shape), 5);
        assert!(cyclomatic(&shape) >= 3);
    }

    #[test]
    fn test_cyclomatic_base_is_one() {
        assert_eq!(cyclomatic(&NodeShape::new("function_definition")), 1);
        assert_eq!(cyclomatic(&NodeShape::new("if_statement")), 2);
    }

    #[test]
    fn test_cyclomatic_child_kinds_match_substrings() {
        let shape = NodeShape::flattened(
            "function_definition",
            ["if_statement", "identifier", "elif_clause", "boolean_operator", "for_in_statement"],
        );
        // "identifier" holds "if", "boolean_operator" holds "or"
        assert_eq!(cyclomatic(&shape), 6);

        let plain = NodeShape::flattened("function_definition", ["call", "string", "block"]);
        assert_eq!(cyclomatic(&plain), 1);
    }

    #[test]
    fn test_cognitive_weights_and_nesting() {
        assert_eq!(cognitive("if", 0), 1);
        assert_eq!(cognitive("while", 1), 2);
        assert_eq!(cognitive("lambda", 3), 5);
        assert_eq!(cognitive("nested_function", 2), 4);
        assert_eq!(cognitive("class_definition", 4), 3);
    }

    #[test]
    fn test_nesting_depth() {
        let shape = NodeShape::new("a").with_children(vec![
            NodeShape::new("b").with_children(vec![NodeShape::new("c")]),
            NodeShape::new("d"),
        ]);
        assert_eq!(nesting_depth(&shape), 2);
        assert_eq!(nesting_depth(&NodeShape::new("leaf")), 0);
    }

    #[test]
    fn test_halstead() {
        let empty: [&str; 0] = [];
        assert_eq!(halstead(&empty, &empty), HalsteadMetrics::default());

        let h = halstead(&["=", "+", "="], &["a", "b", "a", "1"]);
        assert_eq!(h.unique_operators, 2);
        assert_eq!(h.unique_operands, 3);
        assert_eq!(h.vocabulary, 5);
        assert_eq!(h.length, 7);
        assert!((h.volume - 7.0 * 5f64.log2()).abs() < 1e-9);
        assert!((h.difficulty - (1.0 * 4.0 / 3.0)).abs() < 1e-9);
        assert!((h.effort - h.difficulty * h.volume).abs() < 1e-9);
    }

    #[test]
    fn test_maintainability_index() {
        assert_eq!(maintainability_index(50.0, 1e9, 0, 0.0), 100.0);
        let mi = maintainability_index(3.0, 120.0, 40, 0.1);
        assert!((0.0..=100.0).contains(&mi));
        assert_eq!(maintainability_index(500.0, 1e12, 1_000_000, 0.0), 0.0);
        assert_eq!(maintainability_index(1.0, 0.0, 1, 0.0), 100.0);
    }

    #[test]
    fn test_collector_aggregate() {
        let mut collector = MetricsCollector::new();
        collector.add_symbol(2.0, 1);
        collector.add_symbol(8.0, 4);
        collector.add_symbol(25.0, 9);
        collector.add_maintainability(60.0);

        let agg = collector.aggregate();
        assert_eq!(agg.samples, 3);
        assert!((agg.average_cyclomatic - 35.0 / 3.0).abs() < 1e-9);
        assert_eq!(agg.max_cyclomatic, 25.0);
        assert_eq!(agg.max_cognitive, 9);
        assert_eq!(agg.distribution[&ComplexityBand::Low], 1);
        assert_eq!(agg.distribution[&ComplexityBand::Medium], 1);
        assert_eq!(agg.distribution[&ComplexityBand::High], 0);
        assert_eq!(agg.distribution[&ComplexityBand::VeryHigh], 1);
        assert!((0.0..=100.0).contains(&agg.quality_score));
    }

    #[test]
    fn test_collector_empty() {
        let agg = MetricsCollector::new().aggregate();
        assert_eq!(agg.samples, 0);
        assert_eq!(agg.max_cyclomatic, 0.0);
        assert_eq!(agg.quality_score, 100.0);
    }
}
