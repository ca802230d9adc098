//! Cyclic dependencies pass (H09xx).
//!
//! Builds a dependency graph over entities and behaviors and reports one
//! cycle per strongly connected component.
//! - H0900: Dependency cycle

use indexmap::IndexMap;
use isl_ast::{Behavior, Domain, Expr, Span};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::semantic::{PassContext, PassError, SemanticPass};
use crate::types::TypeInfo;
use crate::Diagnostic;

pub const ID: &str = "cyclic-dependencies";

pub fn cyclic_dependencies_pass() -> SemanticPass {
    SemanticPass::new(ID, "Cyclic Dependencies", analyze)
        .with_description("Reports cycles between entities and behaviors")
        .with_priority(40)
}

#[derive(Debug)]
struct Node {
    name: String,
    span: Span,
}

struct DependencyGraph {
    graph: DiGraph<Node, ()>,
    entities: IndexMap<String, NodeIndex>,
}

impl DependencyGraph {
    fn build(domain: &Domain, ctx: &PassContext) -> Self {
        let mut graph = DiGraph::new();
        let mut entities = IndexMap::new();
        for entity in &domain.entities {
            entities.entry(entity.name.name.clone()).or_insert_with(|| {
                graph.add_node(Node {
                    name: entity.name.name.clone(),
                    span: entity.name.span,
                })
            });
        }
        let behaviors: Vec<NodeIndex> = domain
            .behaviors
            .iter()
            .map(|b| {
                graph.add_node(Node {
                    name: b.name.name.clone(),
                    span: b.name.span,
                })
            })
            .collect();

        let mut this = Self { graph, entities };

        for entity in &domain.entities {
            let Some(&from) = this.entities.get(&entity.name.name) else {
                continue;
            };
            for field in &entity.fields {
                let mut targets = Vec::new();
                for name in field.ty.names() {
                    entities_in(&ctx.types.resolve_name(name), &mut targets);
                }
                this.connect(from, &targets);
            }
        }

        for (behavior, &from) in domain.behaviors.iter().zip(&behaviors) {
            let mut targets = Vec::new();
            for predicate in &behavior.postconditions {
                referenced_entities(predicate, behavior, ctx, &mut targets);
            }
            for effect in &behavior.side_effects {
                targets.push(effect.target.name.clone());
            }
            this.connect(from, &targets);
        }

        for block in &domain.invariants {
            for predicate in &block.predicates {
                predicate.walk(&mut |node| {
                    let Expr::FieldAccess(access) = node else {
                        return;
                    };
                    let owner = ctx.type_of(&access.object, None);
                    let Some(from) = owner.entity_name().and_then(|n| this.entities.get(n)).copied() else {
                        return;
                    };
                    let mut targets = Vec::new();
                    entities_in(&ctx.type_of(node, None), &mut targets);
                    this.connect(from, &targets);
                });
            }
        }

        this
    }

    fn connect(&mut self, from: NodeIndex, targets: &[String]) {
        for target in targets {
            if let Some(&to) = self.entities.get(target) {
                self.graph.update_edge(from, to, ());
            }
        }
    }

    /// Successors in declaration order
    fn successors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut next: Vec<NodeIndex> = self.graph.neighbors(node).collect();
        next.sort_unstable();
        next.dedup();
        next
    }

    /// First cycle reachable from `start` without leaving `component`
    fn find_cycle(&self, start: NodeIndex, component: &[NodeIndex]) -> Option<Vec<NodeIndex>> {
        let mut stack = Vec::new();
        let mut visited = Vec::new();
        self.dfs(start, component, &mut stack, &mut visited)
    }

    fn dfs(
        &self,
        node: NodeIndex,
        component: &[NodeIndex],
        stack: &mut Vec<NodeIndex>,
        visited: &mut Vec<NodeIndex>,
    ) -> Option<Vec<NodeIndex>> {
        stack.push(node);
        visited.push(node);
        for next in self.successors(node) {
            if !component.contains(&next) {
                continue;
            }
            if let Some(pos) = stack.iter().position(|&n| n == next) {
                let mut cycle = stack[pos..].to_vec();
                cycle.push(next);
                return Some(cycle);
            }
            if !visited.contains(&next) {
                if let Some(cycle) = self.dfs(next, component, stack, visited) {
                    return Some(cycle);
                }
            }
        }
        stack.pop();
        None
    }
}

/// Entity names mentioned by a type, looking through generics
fn entities_in(ty: &TypeInfo, out: &mut Vec<String>) {
    match ty {
        TypeInfo::Entity { name } => out.push(name.clone()),
        TypeInfo::Generic { args, .. } => {
            for arg in args {
                entities_in(arg, out);
            }
        }
        _ => {}
    }
}

fn referenced_entities(expr: &Expr, behavior: &Behavior, ctx: &PassContext, out: &mut Vec<String>) {
    expr.walk(&mut |node| {
        if matches!(node, Expr::Identifier(_) | Expr::ResultRef(_) | Expr::FieldAccess(_)) {
            entities_in(&ctx.type_of(node, Some(behavior)), out);
        }
    });
}

fn analyze(domain: &Domain, ctx: &PassContext) -> Result<Vec<Diagnostic>, PassError> {
    let deps = DependencyGraph::build(domain, ctx);

    let mut components: Vec<Vec<NodeIndex>> = tarjan_scc(&deps.graph)
        .into_iter()
        .map(|mut component| {
            component.sort_unstable();
            component
        })
        .filter(|component| {
            component.len() > 1 || deps.graph.contains_edge(component[0], component[0])
        })
        .collect();
    components.sort_by_key(|component| component[0]);

    let mut diagnostics = Vec::new();
    for component in &components {
        let start = component[0];
        let Some(cycle) = deps.find_cycle(start, component) else {
            continue;
        };
        let path: Vec<&str> = cycle.iter().map(|&n| deps.graph[n].name.as_str()).collect();
        diagnostics.push(
            Diagnostic::hint(format!("Dependency cycle: {}", path.join(" -> ")), deps.graph[start].span)
                .with_code("H0900"),
        );
    }

    Ok(diagnostics)
}
