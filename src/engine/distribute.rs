//! Distributor: choose which candidates become blanks.
//!
//! Regions get a quota proportional to their weight; inside a region the
//! highest-scoring candidates win. Two relaxation passes fill whatever the
//! quotas left open. No pass ever accepts a position that is already taken or
//! a span that overlaps a selected one.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, instrument};

use super::error::EngineError;
use super::lexer::Pos;
use super::{Blank, BlankCandidate};
use crate::config::EngineConfig;

/// Quota per region: `max(1, round(target * w / total))`.
pub fn region_quota(target: usize, weight: f64, total_weight: f64) -> usize {
    if total_weight <= 0.0 {
        return 1;
    }
    ((target as f64 * weight / total_weight).round() as usize).max(1)
}

#[derive(Default)]
struct Selection {
    chosen: Vec<BlankCandidate>,
    taken: HashSet<usize>,
    positions: HashSet<(usize, usize)>,
    per_line: HashMap<usize, usize>,
    concepts: HashSet<(String, String)>,
}

impl Selection {
    fn len(&self) -> usize {
        self.chosen.len()
    }

    fn is_free(&self, cand: &BlankCandidate) -> bool {
        if self.positions.contains(&cand.position()) {
            return false;
        }
        !self.chosen.iter().any(|c| overlaps(c, cand))
    }

    fn respects_spacing(&self, cand: &BlankCandidate, cfg: &EngineConfig) -> bool {
        let too_close = self.chosen.iter().any(|c| line_gap(c, cand) < cfg.min_line_distance);
        if too_close {
            return false;
        }
        (cand.line..=cand.end_line())
            .all(|l| self.per_line.get(&l).copied().unwrap_or(0) < cfg.max_blanks_per_line)
    }

    fn accept(&mut self, idx: usize, cand: &BlankCandidate, concept: Option<(String, String)>) {
        self.taken.insert(idx);
        self.positions.insert(cand.position());
        for l in cand.line..=cand.end_line() {
            *self.per_line.entry(l).or_insert(0) += 1;
        }
        if let Some(key) = concept {
            self.concepts.insert(key);
        }
        self.chosen.push(cand.clone());
    }
}

/// Distance in lines between two candidates' line ranges (0 if they share one).
fn line_gap(a: &BlankCandidate, b: &BlankCandidate) -> usize {
    if a.end_line() < b.line {
        b.line - a.end_line()
    } else if b.end_line() < a.line {
        a.line - b.end_line()
    } else {
        0
    }
}

fn end_pos(c: &BlankCandidate, col: usize) -> Pos {
    match c.text.rsplit_once('\n') {
        Some((_, tail)) => Pos::new(c.end_line(), tail.len()),
        None => Pos::new(c.line, col + c.text.len()),
    }
}

fn overlaps(a: &BlankCandidate, b: &BlankCandidate) -> bool {
    let (Some(ac), Some(bc)) = (a.column, b.column) else {
        return false;
    };
    let (a_start, a_end) = (Pos::new(a.line, ac), end_pos(a, ac));
    let (b_start, b_end) = (Pos::new(b.line, bc), end_pos(b, bc));
    a_start < b_end && b_start < a_end
}

fn by_score_then_position(a: &BlankCandidate, b: &BlankCandidate) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.position().cmp(&b.position()))
}

/// Select up to `target` candidates. Deterministic for a given RNG state.
#[instrument(target = "drill", level = "debug", skip_all, fields(candidates = candidates.len(), target_count = target))]
pub fn distribute<R: Rng + ?Sized>(
    candidates: &[BlankCandidate],
    target: usize,
    cfg: &EngineConfig,
    rng: &mut R,
) -> Vec<BlankCandidate> {
    if target == 0 || candidates.is_empty() {
        return Vec::new();
    }

    // Groups in first-appearance order, holding indices into `candidates`.
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    for (idx, cand) in candidates.iter().enumerate() {
        match groups.iter_mut().find(|(region, _)| *region == cand.region) {
            Some((_, members)) => members.push(idx),
            None => groups.push((cand.region.clone(), vec![idx])),
        }
    }
    for (_, members) in groups.iter_mut() {
        members.shuffle(rng);
        members.sort_by(|&a, &b| {
            candidates[b]
                .score
                .partial_cmp(&candidates[a].score)
                .unwrap_or(Ordering::Equal)
        });
    }

    let weights: Vec<f64> = groups.iter().map(|(r, _)| cfg.region_weight(r)).collect();
    let mut total: f64 = weights.iter().sum();
    if total <= 0.0 {
        total = groups.len() as f64;
    }

    let mut order: Vec<usize> = (0..groups.len()).collect();
    order.sort_by(|&a, &b| weights[b].partial_cmp(&weights[a]).unwrap_or(Ordering::Equal));

    let mut sel = Selection::default();

    // Pass 1: weighted quotas.
    for &g in &order {
        let (region, members) = &groups[g];
        let quota = region_quota(target, weights[g], total);
        let mut accepted = 0;
        for &idx in members {
            if accepted >= quota || sel.len() >= target {
                break;
            }
            let cand = &candidates[idx];
            let concept = (
                region.clone(),
                cand.text.chars().take(cfg.concept_prefix_chars).collect::<String>(),
            );
            if !sel.is_free(cand) || !sel.respects_spacing(cand, cfg) || sel.concepts.contains(&concept) {
                continue;
            }
            sel.accept(idx, cand, Some(concept));
            accepted += 1;
        }
        debug!(target: "drill", %region, quota, accepted, "region quota pass");
    }

    // Pass 2: best leftovers, spacing still enforced.
    // Pass 3: spacing relaxed.
    for relaxed in [false, true] {
        if sel.len() >= target {
            break;
        }
        let mut leftovers: Vec<usize> = (0..candidates.len()).filter(|i| !sel.taken.contains(i)).collect();
        leftovers.sort_by(|&a, &b| by_score_then_position(&candidates[a], &candidates[b]));
        for idx in leftovers {
            if sel.len() >= target {
                break;
            }
            let cand = &candidates[idx];
            if !sel.is_free(cand) || (!relaxed && !sel.respects_spacing(cand, cfg)) {
                continue;
            }
            sel.accept(idx, cand, None);
        }
        debug!(target: "drill", relaxed, selected = sel.len(), "leftover pass");
    }

    let mut chosen = sel.chosen;
    chosen.truncate(target);
    chosen
}

/// Order selected candidates by (line, column) and assign ordinals `1..=N`.
pub fn number_blanks(mut selected: Vec<BlankCandidate>) -> Result<Vec<Blank>, EngineError> {
    selected.sort_by_key(|c| c.position());
    for pair in selected.windows(2) {
        if pair[0].position() == pair[1].position() {
            let (line, column) = pair[0].position();
            return Err(EngineError::DuplicatePosition { line, column });
        }
    }
    Ok(selected
        .into_iter()
        .enumerate()
        .map(|(i, candidate)| Blank {
            ordinal: i + 1,
            candidate,
        })
        .collect())
}
