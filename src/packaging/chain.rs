//! Packaging hierarchy held as an arena.
//!
//! Nodes live in a `Vec` ordered by creation time; parent and child links are
//! indices into that vector, resolved once from each node's explicit
//! `parent_packaging_id`. Every node has at most one parent and the links never
//! form a cycle; [`PackagingChain::build`] refuses input that breaks either rule.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use super::kind::PackagingType;
use super::pricing::{self, PriceBreakdown, PricingContext};

#[derive(Debug, Clone, PartialEq)]
pub struct PackagingNode {
    pub id: Uuid,
    pub item_id: Uuid,
    pub packaging_type: PackagingType,
    pub amount: Option<Decimal>,
    pub unit: String,
    pub pack_size: Option<Decimal>,
    pub pack_unit: Option<String>,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl PackagingNode {
    pub fn base_units(&self) -> Decimal {
        pricing::base_units(self.amount, self.pack_size)
    }

    /// Human-readable quantity, e.g. `10 pieces × 1 kg`.
    pub fn describe(&self) -> String {
        let amount = self
            .amount
            .map(|a| a.normalize().to_string())
            .unwrap_or_else(|| "?".to_string());
        match self.pack_size {
            Some(size) => format!(
                "{} {} × {} {}",
                amount,
                self.unit,
                size.normalize(),
                self.pack_unit.as_deref().unwrap_or(&self.unit)
            ),
            None => format!("{} {}", amount, self.unit),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("packaging {0} appears more than once")]
    DuplicateNode(Uuid),
    #[error("packaging {0} cannot be its own parent")]
    SelfParent(Uuid),
    #[error("packaging {child} cannot be nested under {parent}, which belongs to another item")]
    ForeignParent { child: Uuid, parent: Uuid },
    #[error("packaging hierarchy contains a cycle through {0}")]
    Cycle(Uuid),
}

#[derive(Debug, Clone, Default)]
pub struct PackagingChain {
    nodes: Vec<PackagingNode>,
    index: HashMap<Uuid, usize>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

impl PackagingChain {
    /// Builds the arena. A parent id that is not part of `nodes` (for example a
    /// deactivated parent) leaves the node as a root.
    pub fn build(mut nodes: Vec<PackagingNode>) -> Result<Self, ChainError> {
        nodes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let mut index = HashMap::with_capacity(nodes.len());
        for (position, node) in nodes.iter().enumerate() {
            if index.insert(node.id, position).is_some() {
                return Err(ChainError::DuplicateNode(node.id));
            }
        }

        let mut parents = vec![None; nodes.len()];
        for (position, node) in nodes.iter().enumerate() {
            let Some(parent_id) = node.parent_id else {
                continue;
            };
            if parent_id == node.id {
                return Err(ChainError::SelfParent(node.id));
            }
            if let Some(&parent) = index.get(&parent_id) {
                if nodes[parent].item_id != node.item_id {
                    return Err(ChainError::ForeignParent {
                        child: node.id,
                        parent: parent_id,
                    });
                }
                parents[position] = Some(parent);
            }
        }

        for start in 0..nodes.len() {
            let mut seen = HashSet::new();
            let mut cursor = Some(start);
            while let Some(current) = cursor {
                if !seen.insert(current) {
                    return Err(ChainError::Cycle(nodes[start].id));
                }
                cursor = parents[current];
            }
        }

        let mut children = vec![Vec::new(); nodes.len()];
        let mut roots = Vec::new();
        for (position, parent) in parents.iter().enumerate() {
            match parent {
                Some(parent) => children[*parent].push(position),
                None => roots.push(position),
            }
        }

        Ok(Self {
            nodes,
            index,
            parents,
            children,
            roots,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&PackagingNode> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn parent_of(&self, id: Uuid) -> Option<&PackagingNode> {
        let position = *self.index.get(&id)?;
        self.parents[position].map(|p| &self.nodes[p])
    }

    fn ancestors(&self, position: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.parents[position], move |&p| self.parents[p])
    }

    pub fn depth(&self, id: Uuid) -> Option<usize> {
        let position = *self.index.get(&id)?;
        Some(self.ancestors(position).count())
    }

    /// Product of the base units of every ancestor; 1 for a root.
    pub fn multiplier(&self, id: Uuid) -> Decimal {
        match self.index.get(&id) {
            Some(&position) => self.multiplier_at(position),
            None => Decimal::ZERO,
        }
    }

    fn multiplier_at(&self, position: usize) -> Decimal {
        self.ancestors(position).fold(Decimal::ONE, |acc, ancestor| {
            acc.checked_mul(self.nodes[ancestor].base_units())
                .unwrap_or(Decimal::ZERO)
        })
    }

    pub fn total_units(&self, id: Uuid) -> Decimal {
        match self.index.get(&id) {
            Some(&position) => self.total_units_at(position),
            None => Decimal::ZERO,
        }
    }

    fn total_units_at(&self, position: usize) -> Decimal {
        self.nodes[position]
            .base_units()
            .checked_mul(self.multiplier_at(position))
            .unwrap_or(Decimal::ZERO)
    }

    /// True when re-parenting `child` under `new_parent` would close a loop.
    pub fn would_create_cycle(&self, child: Uuid, new_parent: Uuid) -> bool {
        if child == new_parent {
            return true;
        }
        let Some(&start) = self.index.get(&new_parent) else {
            return false;
        };
        std::iter::once(start)
            .chain(self.ancestors(start))
            .any(|position| self.nodes[position].id == child)
    }

    /// Ids of every node below `id`, nearest first.
    pub fn descendants(&self, id: Uuid) -> Vec<Uuid> {
        let Some(&start) = self.index.get(&id) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut queue: std::collections::VecDeque<usize> =
            self.children[start].iter().copied().collect();
        while let Some(position) = queue.pop_front() {
            out.push(self.nodes[position].id);
            queue.extend(self.children[position].iter().copied());
        }
        out
    }

    /// Depth-first traversal: roots in creation order, each followed by its subtree.
    pub fn walk(&self) -> Vec<(usize, &PackagingNode)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, usize)> = self.roots.iter().rev().map(|&r| (r, 0)).collect();
        while let Some((position, depth)) = stack.pop() {
            out.push((depth, &self.nodes[position]));
            for &child in self.children[position].iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        out
    }

    /// Indented view with cumulative units and prices for every node.
    pub fn hierarchy(&self, ctx: &PricingContext) -> Vec<HierarchyEntry> {
        self.walk()
            .into_iter()
            .map(|(depth, node)| {
                let position = self.index[&node.id];
                let multiplier = self.multiplier_at(position);
                let total_units = self.total_units_at(position);
                HierarchyEntry {
                    packaging_id: node.id,
                    parent_packaging_id: self.parents[position].map(|p| self.nodes[p].id),
                    depth,
                    label: format!("{}{}", "  ".repeat(depth), node.describe()),
                    packaging_type: node.packaging_type,
                    base_units: node.base_units(),
                    multiplier,
                    total_units,
                    pricing: ctx.quote(total_units).rounded(),
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyEntry {
    pub packaging_id: Uuid,
    pub parent_packaging_id: Option<Uuid>,
    pub depth: usize,
    pub label: String,
    pub packaging_type: PackagingType,
    pub base_units: Decimal,
    pub multiplier: Decimal,
    pub total_units: Decimal,
    pub pricing: PriceBreakdown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn node(
        item: Uuid,
        amount: Decimal,
        pack_size: Option<Decimal>,
        parent: Option<Uuid>,
        age: i64,
    ) -> PackagingNode {
        PackagingNode {
            id: Uuid::new_v4(),
            item_id: item,
            packaging_type: PackagingType::Pack,
            amount: Some(amount),
            unit: "kg".into(),
            pack_size,
            pack_unit: None,
            parent_id: parent,
            created_at: Utc::now() - Duration::minutes(100 - age),
        }
    }

    #[test]
    fn child_total_is_product_of_chain() {
        let item = Uuid::new_v4();
        let parent = node(item, dec!(5), Some(dec!(2)), None, 0);
        let child = node(item, dec!(3), None, Some(parent.id), 1);
        let (parent_id, child_id) = (parent.id, child.id);

        let chain = PackagingChain::build(vec![child, parent]).unwrap();

        assert_eq!(chain.total_units(parent_id), dec!(10));
        assert_eq!(chain.multiplier(child_id), dec!(10));
        assert_eq!(chain.total_units(child_id), dec!(30));
        assert_eq!(chain.depth(child_id), Some(1));
        assert_eq!(chain.parent_of(child_id).map(|p| p.id), Some(parent_id));
    }

    #[test]
    fn parentage_ignores_creation_order() {
        let item = Uuid::new_v4();
        // The child is older than its parent; only the explicit link matters.
        let mut child = node(item, dec!(4), None, None, 0);
        let parent = node(item, dec!(6), None, None, 5);
        let sibling = node(item, dec!(7), None, None, 9);
        child.parent_id = Some(parent.id);
        let (child_id, sibling_id) = (child.id, sibling.id);

        let chain = PackagingChain::build(vec![sibling, child, parent]).unwrap();

        assert_eq!(chain.total_units(child_id), dec!(24));
        assert_eq!(chain.total_units(sibling_id), dec!(7));
    }

    #[test]
    fn three_levels_multiply_through() {
        let item = Uuid::new_v4();
        let top = node(item, dec!(2), Some(dec!(6)), None, 0);
        let mid = node(item, dec!(4), None, Some(top.id), 1);
        let leaf = node(item, dec!(0.5), None, Some(mid.id), 2);
        let leaf_id = leaf.id;

        let chain = PackagingChain::build(vec![top, mid, leaf]).unwrap();
        assert_eq!(chain.total_units(leaf_id), dec!(24));
        assert_eq!(chain.depth(leaf_id), Some(2));
    }

    #[test]
    fn missing_parent_becomes_root() {
        let item = Uuid::new_v4();
        let orphan = node(item, dec!(3), None, Some(Uuid::new_v4()), 0);
        let id = orphan.id;
        let chain = PackagingChain::build(vec![orphan]).unwrap();
        assert_eq!(chain.depth(id), Some(0));
        assert_eq!(chain.total_units(id), dec!(3));
    }

    #[test]
    fn rejects_cycles() {
        let item = Uuid::new_v4();
        let mut a = node(item, dec!(1), None, None, 0);
        let mut b = node(item, dec!(1), None, None, 1);
        a.parent_id = Some(b.id);
        b.parent_id = Some(a.id);
        assert_matches!(PackagingChain::build(vec![a, b]), Err(ChainError::Cycle(_)));
    }

    #[test]
    fn rejects_self_parent_and_foreign_parent() {
        let item = Uuid::new_v4();
        let mut looped = node(item, dec!(1), None, None, 0);
        looped.parent_id = Some(looped.id);
        assert_matches!(
            PackagingChain::build(vec![looped]),
            Err(ChainError::SelfParent(_))
        );

        let parent = node(Uuid::new_v4(), dec!(1), None, None, 0);
        let child = node(item, dec!(1), None, Some(parent.id), 1);
        assert_matches!(
            PackagingChain::build(vec![parent, child]),
            Err(ChainError::ForeignParent { .. })
        );
    }

    #[test]
    fn detects_reparenting_cycles() {
        let item = Uuid::new_v4();
        let top = node(item, dec!(1), None, None, 0);
        let mid = node(item, dec!(1), None, Some(top.id), 1);
        let leaf = node(item, dec!(1), None, Some(mid.id), 2);
        let (top_id, mid_id, leaf_id) = (top.id, mid.id, leaf.id);
        let chain = PackagingChain::build(vec![top, mid, leaf]).unwrap();

        assert!(chain.would_create_cycle(top_id, leaf_id));
        assert!(chain.would_create_cycle(mid_id, mid_id));
        assert!(!chain.would_create_cycle(leaf_id, top_id));
        assert_eq!(chain.descendants(top_id), vec![mid_id, leaf_id]);
    }

    #[test]
    fn hierarchy_is_depth_first_and_indented() {
        let item = Uuid::new_v4();
        let root_a = node(item, dec!(5), Some(dec!(2)), None, 0);
        let root_b = node(item, dec!(1), None, None, 1);
        let child = node(item, dec!(3), None, Some(root_a.id), 2);
        let ids = (root_a.id, child.id, root_b.id);

        let chain = PackagingChain::build(vec![root_b, child, root_a]).unwrap();
        let ctx = PricingContext {
            unit_price: Some(dec!(2)),
            tax_rate: Some(dec!(15)),
            price_includes_vat: false,
        };
        let view = chain.hierarchy(&ctx);

        let order: Vec<_> = view.iter().map(|e| e.packaging_id).collect();
        assert_eq!(order, vec![ids.0, ids.1, ids.2]);
        assert_eq!(view[1].depth, 1);
        assert!(view[1].label.starts_with("  3 kg"));
        assert_eq!(view[1].pricing.price, dec!(60));
        assert_eq!(view[1].pricing.vat_amount, dec!(9));
    }
}
