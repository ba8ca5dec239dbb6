//! Scoring and region classification.

use serde::Serialize;

use super::syntax::{Module, Stmt};
use super::{BlankCandidate, GLOBAL_REGION};
use crate::config::EngineConfig;

/// A named function/method and the lines it covers (inclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionRange {
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
}

/// Function ranges of a module, names qualified as `Class.method` or
/// `outer.inner`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegionMap {
    ranges: Vec<RegionRange>,
}

impl RegionMap {
    pub fn from_module(module: &Module) -> Self {
        let mut ranges = Vec::new();
        collect_regions(&module.body, None, &mut ranges);
        Self { ranges }
    }

    pub fn ranges(&self) -> &[RegionRange] {
        &self.ranges
    }

    /// Smallest function range containing `line`, or `"global"`.
    pub fn region_for(&self, line: usize) -> &str {
        self.ranges
            .iter()
            .filter(|r| r.start_line <= line && line <= r.end_line)
            .min_by_key(|r| r.end_line - r.start_line)
            .map_or(GLOBAL_REGION, |r| r.name.as_str())
    }
}

fn collect_regions(body: &[Stmt], prefix: Option<&str>, out: &mut Vec<RegionRange>) {
    let qualify = |name: &str| match prefix {
        Some(p) => format!("{p}.{name}"),
        None => name.to_string(),
    };
    for stmt in body {
        match stmt {
            Stmt::FunctionDef { name, span, body } => {
                let qualified = qualify(name);
                out.push(RegionRange {
                    name: qualified.clone(),
                    start_line: span.start.line,
                    end_line: span.end.line,
                });
                collect_regions(body, Some(qualified.as_str()), out);
            }
            Stmt::ClassDef { name, body, .. } => {
                collect_regions(body, Some(qualify(name).as_str()), out);
            }
            Stmt::If { body, orelse, .. }
            | Stmt::While { body, orelse, .. }
            | Stmt::For { body, orelse, .. } => {
                collect_regions(body, prefix, out);
                collect_regions(orelse, prefix, out);
            }
            Stmt::Compound { body, .. } => collect_regions(body, prefix, out),
            Stmt::Assign { .. } | Stmt::Return { .. } | Stmt::Simple { .. } => {}
        }
    }
}

/// Assign region and category weight to every candidate. Pure.
pub fn score(candidates: &mut [BlankCandidate], regions: &RegionMap, cfg: &EngineConfig) {
    for c in candidates.iter_mut() {
        c.region = regions.region_for(c.line).to_string();
        c.score = cfg.weights.weight(c.category);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::syntax::parse;
    use crate::engine::Category;

    const SRC: &str = "class LinkedList:\n    def appendNode(self, data):\n        def helper():\n            return data\n        return helper()\n\nx = 1\n";

    #[test]
    fn test_qualified_region_names() {
        let map = RegionMap::from_module(&parse(SRC).unwrap());
        let names: Vec<&str> = map.ranges().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["LinkedList.appendNode", "LinkedList.appendNode.helper"]);
    }

    #[test]
    fn test_smallest_enclosing_region_wins() {
        let map = RegionMap::from_module(&parse(SRC).unwrap());
        assert_eq!(map.region_for(4), "LinkedList.appendNode.helper");
        assert_eq!(map.region_for(5), "LinkedList.appendNode");
        assert_eq!(map.region_for(1), GLOBAL_REGION);
        assert_eq!(map.region_for(7), GLOBAL_REGION);
    }

    #[test]
    fn test_score_uses_category_weights() {
        let map = RegionMap::from_module(&parse(SRC).unwrap());
        let mut cands = vec![
            BlankCandidate::new("data", Category::Return, 4, Some(19)),
            BlankCandidate::new("x = 1", Category::PointerAssign, 7, Some(0)),
        ];
        score(&mut cands, &map, &EngineConfig::default());
        assert_eq!(cands[0].score, 1.0);
        assert_eq!(cands[0].region, "LinkedList.appendNode.helper");
        assert_eq!(cands[1].score, 3.0);
        assert_eq!(cands[1].region, GLOBAL_REGION);
    }
}
