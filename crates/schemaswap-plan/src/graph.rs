//! Dependency graph over roles, with deterministic topological ordering.
//!
//! The concrete relation graph only exists after substitution: whichever
//! model fills a role contributes that role's outgoing edges. Ordering uses
//! depth-first traversal over the immediate edges; deferred edges are left
//! out of the ordering pass and may close cycles freely.

use serde::{Deserialize, Serialize};

use schemaswap_core::model::Cardinality;
use schemaswap_registry::RoleRegistry;

/// A directed relation between two roles, as contributed by the resolved
/// model filling the source role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationEdge {
    /// Referencing field on the source entity.
    pub name: String,
    pub source: String,
    pub target: String,
    pub cardinality: Cardinality,
    #[serde(default)]
    pub nullable: bool,
    /// Constraint applied only after both endpoints exist.
    #[serde(default)]
    pub deferred: bool,
}

/// The resolved dependency graph: ordered roles plus the partitioned edge set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    /// Roles in creation-safe order: every immediate-edge target precedes
    /// its source. Ties broken by contract-library declaration order.
    pub order: Vec<String>,
    /// Edges that constrain creation order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub immediate: Vec<RelationEdge>,
    /// Edges whose constraints are applied after all entities exist.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deferred: Vec<RelationEdge>,
}

impl DependencyGraph {
    pub fn edge_count(&self) -> usize {
        self.immediate.len() + self.deferred.len()
    }

    /// Render as a Graphviz DOT digraph. Deferred edges are dashed.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph schema {\n  rankdir=LR;\n");
        for role in &self.order {
            out.push_str(&format!("  \"{role}\";\n"));
        }
        for edge in self.immediate.iter().chain(&self.deferred) {
            let style = if edge.deferred { ", style=dashed" } else { "" };
            out.push_str(&format!(
                "  \"{}\" -> \"{}\" [label=\"{}\"{}];\n",
                edge.source, edge.target, edge.name, style
            ));
        }
        out.push_str("}\n");
        out
    }

    /// Render as a Mermaid flowchart. Deferred edges use dotted arrows.
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("flowchart TD\n");
        for edge in self.immediate.iter().chain(&self.deferred) {
            let arrow = if edge.deferred { "-.->" } else { "-->" };
            out.push_str(&format!(
                "    {}{}|{}| {}\n",
                sanitize(&edge.source),
                arrow,
                edge.name,
                sanitize(&edge.target)
            ));
        }
        for role in &self.order {
            out.push_str(&format!("    {}[\"{role}\"]\n", sanitize(role)));
        }
        out
    }
}

fn sanitize(id: &str) -> String {
    id.replace(|c: char| !c.is_alphanumeric(), "_")
}

/// Errors raised while building the graph. Both are unrecoverable
/// misconfiguration, never silently resolved.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("relation cycle among roles: {}", .roles.join(" -> "))]
    Cycle { roles: Vec<String> },

    #[error("relation '{relation}' on role '{role}' targets undeclared role '{target}'")]
    UnknownTarget {
        role: String,
        relation: String,
        target: String,
    },
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Build the dependency graph from every resolved role's declared relations.
pub fn build_graph(registry: &RoleRegistry) -> Result<DependencyGraph, GraphError> {
    // Nodes in contract-library declaration order.
    let nodes: Vec<&str> = registry.resolved().map(|(role, _)| role).collect();
    let index_of = |role: &str| nodes.iter().position(|n| *n == role);

    let mut immediate = Vec::new();
    let mut deferred = Vec::new();
    // Adjacency over immediate edges only, in relation declaration order.
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];

    for (source_idx, (role, model)) in registry.resolved().enumerate() {
        for rel in &model.relations {
            if !registry.library().contains(&rel.target_role) {
                return Err(GraphError::UnknownTarget {
                    role: role.to_string(),
                    relation: rel.name.clone(),
                    target: rel.target_role.clone(),
                });
            }
            let edge = RelationEdge {
                name: rel.name.clone(),
                source: role.to_string(),
                target: rel.target_role.clone(),
                cardinality: rel.cardinality,
                nullable: rel.nullable,
                deferred: rel.deferred,
            };
            if rel.deferred {
                deferred.push(edge);
            } else {
                if let Some(target_idx) = index_of(&rel.target_role)
                    && target_idx != source_idx
                {
                    adjacency[source_idx].push(target_idx);
                }
                immediate.push(edge);
            }
        }
    }

    // Depth-first traversal, dependencies emitted before dependents.
    // Roots are taken in declaration order, which fixes the topological
    // tie-break and keeps repeated runs byte-identical.
    let mut marks = vec![Mark::Unvisited; nodes.len()];
    let mut stack: Vec<usize> = Vec::new();
    let mut order: Vec<String> = Vec::with_capacity(nodes.len());

    fn visit(
        idx: usize,
        nodes: &[&str],
        adjacency: &[Vec<usize>],
        marks: &mut [Mark],
        stack: &mut Vec<usize>,
        order: &mut Vec<String>,
    ) -> Result<(), GraphError> {
        match marks[idx] {
            Mark::Done => return Ok(()),
            Mark::InProgress => {
                let start = stack.iter().position(|&i| i == idx).unwrap_or(0);
                let roles = stack[start..].iter().map(|&i| nodes[i].to_string()).collect();
                return Err(GraphError::Cycle { roles });
            }
            Mark::Unvisited => {}
        }
        marks[idx] = Mark::InProgress;
        stack.push(idx);
        for &target in &adjacency[idx] {
            visit(target, nodes, adjacency, marks, stack, order)?;
        }
        stack.pop();
        marks[idx] = Mark::Done;
        order.push(nodes[idx].to_string());
        Ok(())
    }

    for idx in 0..nodes.len() {
        visit(idx, &nodes, &adjacency, &mut marks, &mut stack, &mut order)?;
    }

    tracing::debug!(
        roles = order.len(),
        immediate = immediate.len(),
        deferred = deferred.len(),
        "dependency graph built"
    );

    Ok(DependencyGraph {
        order,
        immediate,
        deferred,
    })
}
