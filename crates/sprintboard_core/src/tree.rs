//! Turns a flat, ordered batch of task records into a forest.
//!
//! Parent links are resolved only inside the batch handed in. A record whose
//! parent is missing from the batch (or names itself) becomes a root, so a
//! child whose parent arrived on an earlier page shows up as a root of the
//! later page. Roots and children keep the order they had in the input.

use crate::model::{Task, TaskNode};
use std::collections::HashMap;

/// Build the forest for `records`, computing `total_estimated_hour` on every node.
pub fn build_forest(records: Vec<Task>) -> Vec<TaskNode> {
    let count = records.len();

    // First pass: position of each id, then each record's parent position.
    let (keep, parent_of) = {
        let mut by_id: HashMap<&str, usize> = HashMap::with_capacity(count);
        let mut keep = vec![true; count];
        for (position, record) in records.iter().enumerate() {
            if by_id.insert(record.id.as_str(), position).is_some() {
                keep[position] = false;
            }
        }
        // Later duplicates overwrote the map; point every id back at its first copy.
        for (position, record) in records.iter().enumerate().rev() {
            if keep[position] {
                by_id.insert(record.id.as_str(), position);
            }
        }

        let parent_of: Vec<Option<usize>> = records
            .iter()
            .enumerate()
            .map(|(position, record)| {
                record
                    .parent_task_id
                    .as_deref()
                    .and_then(|parent_id| by_id.get(parent_id).copied())
                    .filter(|&parent| parent != position)
            })
            .collect();
        (keep, parent_of)
    };

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (position, parent) in parent_of.iter().enumerate() {
        if let (true, Some(parent)) = (keep[position], parent) {
            children[*parent].push(position);
        }
    }

    let reachable = mark_reachable(&keep, &parent_of, &children);

    // Second pass: assemble roots in input order. Records stuck in a parent
    // cycle are never reached from a root; the first of them becomes a root.
    let mut slots: Vec<Option<Task>> = records.into_iter().map(Some).collect();
    let mut claimed: Vec<bool> = keep.iter().map(|kept| !kept).collect();
    let mut roots = Vec::new();
    for position in 0..count {
        if claimed[position] {
            continue;
        }
        if parent_of[position].is_none() || !reachable[position] {
            if let Some(node) = assemble(position, &children, &mut slots, &mut claimed) {
                roots.push(node);
            }
        }
    }

    tracing::trace!(records = count, roots = roots.len(), "built task forest");
    roots
}

fn mark_reachable(
    keep: &[bool],
    parent_of: &[Option<usize>],
    children: &[Vec<usize>],
) -> Vec<bool> {
    let mut reachable = vec![false; keep.len()];
    let mut stack: Vec<usize> = (0..keep.len())
        .filter(|&position| keep[position] && parent_of[position].is_none())
        .collect();
    while let Some(position) = stack.pop() {
        if reachable[position] {
            continue;
        }
        reachable[position] = true;
        stack.extend(children[position].iter().copied());
    }
    reachable
}

fn assemble(
    position: usize,
    children: &[Vec<usize>],
    slots: &mut [Option<Task>],
    claimed: &mut [bool],
) -> Option<TaskNode> {
    if claimed[position] {
        return None;
    }
    claimed[position] = true;
    let task = slots[position].take()?;

    let mut node = TaskNode::leaf(task);
    for &child in &children[position] {
        if let Some(child_node) = assemble(child, children, slots, claimed) {
            node.children.push(child_node);
        }
    }
    if !node.children.is_empty() {
        node.total_estimated_hour = node
            .children
            .iter()
            .map(|child| child.total_estimated_hour)
            .sum();
    }
    Some(node)
}
