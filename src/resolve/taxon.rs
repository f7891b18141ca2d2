//! Taxon context: the run's taxon snapshot
//!
//! Parent links (primary and secondary) are not guaranteed acyclic by the
//! source system. Cycles are detected once at build time with Tarjan's
//! strongly-connected-components algorithm and reported; traversals
//! never recurse.

use crate::model::{Taxon, TaxonId};
use std::collections::{HashMap, HashSet, VecDeque};

/// Immutable taxon-by-id snapshot, loaded once per run.
#[derive(Debug, Default)]
pub struct TaxonContext {
    taxa: HashMap<TaxonId, Taxon>,
    cycles: Vec<Vec<TaxonId>>,
}

impl TaxonContext {
    pub fn build(taxa: impl IntoIterator<Item = Taxon>) -> Self {
        let taxa: HashMap<TaxonId, Taxon> = taxa.into_iter().map(|t| (t.id, t)).collect();
        let cycles = find_cycles(&taxa);
        for cycle in &cycles {
            tracing::warn!(taxa = ?cycle, "taxon hierarchy contains a cycle");
        }
        Self { taxa, cycles }
    }

    pub fn get(&self, id: TaxonId) -> Option<&Taxon> {
        self.taxa.get(&id)
    }

    pub fn len(&self) -> usize {
        self.taxa.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taxa.is_empty()
    }

    /// Sets of taxa whose parent links form a cycle, each sorted by id
    pub fn cycles(&self) -> &[Vec<TaxonId>] {
        &self.cycles
    }

    /// Human-readable data-quality findings for operators
    pub fn data_quality_defects(&self) -> Vec<String> {
        self.cycles
            .iter()
            .map(|cycle| {
                let ids: Vec<String> = cycle.iter().map(|id| id.to_string()).collect();
                format!("taxon parent cycle between [{}]", ids.join(", "))
            })
            .collect()
    }

    /// All ancestors reachable through primary and secondary parents,
    /// breadth first, each visited once.
    pub fn ancestors(&self, id: TaxonId) -> Vec<TaxonId> {
        let mut seen = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        let mut out = Vec::new();
        while let Some(current) = queue.pop_front() {
            let Some(taxon) = self.taxa.get(&current) else {
                continue;
            };
            for parent in taxon.parents() {
                if seen.insert(parent) {
                    out.push(parent);
                    queue.push_back(parent);
                }
            }
        }
        out
    }

    /// True when `ancestor` is reachable from `id`
    pub fn is_descendant_of(&self, id: TaxonId, ancestor: TaxonId) -> bool {
        self.ancestors(id).contains(&ancestor)
    }
}

/// Iterative Tarjan SCC over child → parent links. Returns the components
/// that are real cycles: more than one member, or a self-loop.
fn find_cycles(taxa: &HashMap<TaxonId, Taxon>) -> Vec<Vec<TaxonId>> {
    let neighbors = |id: TaxonId| -> Vec<TaxonId> {
        taxa.get(&id)
            .map(|t| t.parents().filter(|p| taxa.contains_key(p)).collect())
            .unwrap_or_default()
    };

    let mut ids: Vec<TaxonId> = taxa.keys().copied().collect();
    ids.sort_unstable();

    let mut index_of: HashMap<TaxonId, usize> = HashMap::new();
    let mut lowlink: HashMap<TaxonId, usize> = HashMap::new();
    let mut on_stack: HashSet<TaxonId> = HashSet::new();
    let mut stack: Vec<TaxonId> = Vec::new();
    let mut next_index = 0usize;
    let mut cycles = Vec::new();

    for root in ids {
        if index_of.contains_key(&root) {
            continue;
        }

        // (node, its parents, next parent to look at)
        let mut work: Vec<(TaxonId, Vec<TaxonId>, usize)> = Vec::new();
        index_of.insert(root, next_index);
        lowlink.insert(root, next_index);
        next_index += 1;
        stack.push(root);
        on_stack.insert(root);
        work.push((root, neighbors(root), 0));

        loop {
            let Some(frame) = work.last_mut() else {
                break;
            };
            let node = frame.0;

            if frame.2 < frame.1.len() {
                let next = frame.1[frame.2];
                frame.2 += 1;

                if !index_of.contains_key(&next) {
                    index_of.insert(next, next_index);
                    lowlink.insert(next, next_index);
                    next_index += 1;
                    stack.push(next);
                    on_stack.insert(next);
                    work.push((next, neighbors(next), 0));
                } else if on_stack.contains(&next) {
                    let low = lowlink[&node].min(index_of[&next]);
                    lowlink.insert(node, low);
                }
                continue;
            }

            work.pop();
            if let Some((parent, _, _)) = work.last() {
                let low = lowlink[parent].min(lowlink[&node]);
                lowlink.insert(*parent, low);
            }

            if lowlink[&node] == index_of[&node] {
                let mut component = Vec::new();
                while let Some(member) = stack.pop() {
                    on_stack.remove(&member);
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                let self_loop = component.len() == 1 && neighbors(node).contains(&node);
                if component.len() > 1 || self_loop {
                    component.sort_unstable();
                    cycles.push(component);
                }
            }
        }
    }

    cycles.sort();
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taxon(id: TaxonId, parent: Option<TaxonId>) -> Taxon {
        let t = Taxon::new(id, format!("taxon {}", id));
        match parent {
            Some(p) => t.with_parent(p),
            None => t,
        }
    }

    #[test]
    fn acyclic_hierarchy_has_no_cycles() {
        let ctx = TaxonContext::build(vec![
            taxon(0, None),
            taxon(1, Some(0)),
            taxon(2, Some(1)),
            taxon(3, Some(1)),
        ]);
        assert!(ctx.cycles().is_empty());
        assert_eq!(ctx.ancestors(2), vec![1, 0]);
        assert!(ctx.is_descendant_of(3, 0));
        assert!(!ctx.is_descendant_of(0, 3));
    }

    #[test]
    fn secondary_parent_back_reference_is_detected() {
        let mut grandchild = taxon(3, Some(2));
        grandchild.secondary_parent_ids.push(5);
        let mut back = taxon(1, Some(0));
        back.secondary_parent_ids.push(3);
        let ctx = TaxonContext::build(vec![
            taxon(0, None),
            back,
            taxon(2, Some(1)),
            grandchild,
            taxon(5, Some(0)),
        ]);
        assert_eq!(ctx.cycles(), &[vec![1, 2, 3]]);
        assert_eq!(ctx.data_quality_defects().len(), 1);

        // Traversal terminates despite the cycle
        let ancestors = ctx.ancestors(3);
        assert!(ancestors.contains(&0));
        assert!(ancestors.contains(&5));
        assert!(ancestors.contains(&1));
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let ctx = TaxonContext::build(vec![taxon(7, Some(7))]);
        assert_eq!(ctx.cycles(), &[vec![7]]);
        assert!(ctx.ancestors(7).is_empty());
    }

    #[test]
    fn unknown_parents_are_ignored() {
        let ctx = TaxonContext::build(vec![taxon(1, Some(999))]);
        assert!(ctx.cycles().is_empty());
        assert_eq!(ctx.ancestors(1), vec![999]);
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let taxa: Vec<Taxon> = (0..50_000)
            .map(|i| taxon(i, if i == 0 { None } else { Some(i - 1) }))
            .collect();
        let ctx = TaxonContext::build(taxa);
        assert!(ctx.cycles().is_empty());
        assert_eq!(ctx.ancestors(49_999).len(), 49_999);
    }
}
