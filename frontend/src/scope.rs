//! Scoping and dependency analysis over the parsed declaration list.
//!
//! Four passes: name uniqueness, dependency extraction, reference
//! validation, and cycle detection. Globals may forward-reference each other
//! as long as the use graph stays acyclic; parameters of one declaration
//! only see globals and the parameters to their left.

use crate::surface::{Binder, PTerm, PTermKind, Program, Span};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

/// Whether a dependency comes from a type expression or a definition body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepKind {
    Type,
    Def,
}

impl fmt::Display for DepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepKind::Type => write!(f, "type"),
            DepKind::Def => write!(f, "definition"),
        }
    }
}

/// One edge of a reported cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepEdge {
    pub from: String,
    pub to: String,
    pub kind: DepKind,
}

fn render_cycle(path: &[DepEdge]) -> String {
    let mut out = String::new();
    for (i, edge) in path.iter().enumerate() {
        if i == 0 {
            out.push_str(&edge.from);
        }
        out.push_str(" -> ");
        out.push_str(&edge.to);
    }
    out
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScopeError {
    #[error("duplicate global `{name}`")]
    DuplicateGlobal { name: String, span: Span },
    #[error("duplicate parameter `{name}`")]
    DuplicateLocal { name: String, span: Span },
    #[error("`{name}` refers to itself in its {kind}")]
    SelfReference {
        name: String,
        kind: DepKind,
        span: Span,
    },
    #[error("`{name}` is not defined, in the {kind} of `{in_name}`")]
    Undefined {
        name: String,
        in_name: String,
        kind: DepKind,
        span: Span,
    },
    #[error("cyclic definitions: {}", render_cycle(.path))]
    Cycle { path: Vec<DepEdge>, span: Span },
}

/// A dependency of some element on a name, tagged with the slot it came
/// from and where the use was written.
#[derive(Debug, Clone)]
struct Dep {
    to: String,
    kind: DepKind,
    span: Span,
}

/// Graph node: a global declaration or one parameter of one declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Node {
    Global(usize),
    Local(usize, usize),
}

/// Checks the whole program. `Ok` carries a dependency order of the
/// declarations (indices into `program.decls`, dependencies first): globals
/// may forward-reference each other as long as the graph is acyclic, and
/// the type checker wants to see every name's definition before its uses.
pub fn check_program(program: &Program) -> Result<Vec<usize>, ScopeError> {
    check_uniqueness(program)?;

    let globals: HashMap<&str, usize> = program
        .decls
        .iter()
        .enumerate()
        .map(|(i, decl)| (decl.name.name.as_str(), i))
        .collect();

    // Dependency extraction and reference validation, building the use
    // graph as we go.
    let mut edges: HashMap<Node, Vec<(Node, Dep)>> = HashMap::new();
    for (i, decl) in program.decls.iter().enumerate() {
        let params = decl.param_elems();
        let param_names: Vec<&str> = params.iter().map(|p| p.ident.name.as_str()).collect();

        // The declaration itself: free names of its type and body, minus
        // its own parameters.
        let mut deps = Vec::new();
        collect_deps(&decl.ty, &param_names, DepKind::Type, &mut deps);
        if let Some(val) = &decl.val {
            collect_deps(val, &param_names, DepKind::Def, &mut deps);
        }
        let mut decl_edges = Vec::new();
        for dep in deps {
            if dep.to == decl.name.name {
                return Err(ScopeError::SelfReference {
                    name: dep.to,
                    kind: dep.kind,
                    span: dep.span,
                });
            }
            match globals.get(dep.to.as_str()) {
                Some(&j) => decl_edges.push((Node::Global(j), dep)),
                None => {
                    return Err(ScopeError::Undefined {
                        name: dep.to,
                        in_name: decl.name.name.clone(),
                        kind: dep.kind,
                        span: dep.span,
                    })
                }
            }
        }
        // The declaration depends on each of its parameters.
        for (p, param) in params.iter().enumerate() {
            decl_edges.push((
                Node::Local(i, p),
                Dep {
                    to: param.ident.name.clone(),
                    kind: DepKind::Type,
                    span: param.ident.span,
                },
            ));
        }
        edges.insert(Node::Global(i), decl_edges);

        // Each parameter: free names of its type (and definition), resolved
        // against globals and the parameters to its left.
        for (p, param) in params.iter().enumerate() {
            let mut deps = Vec::new();
            if let Some(ty) = param.ty {
                collect_deps(ty, &[], DepKind::Type, &mut deps);
            }
            if let Some(val) = param.val {
                collect_deps(val, &[], DepKind::Def, &mut deps);
            }
            let mut param_edges = Vec::new();
            for dep in deps {
                let seen_before = param_names[..p].iter().rposition(|n| *n == dep.to);
                match seen_before {
                    Some(q) => param_edges.push((Node::Local(i, q), dep)),
                    None => match globals.get(dep.to.as_str()) {
                        Some(&j) => param_edges.push((Node::Global(j), dep)),
                        None if dep.to == param.ident.name => {
                            return Err(ScopeError::SelfReference {
                                name: dep.to,
                                kind: dep.kind,
                                span: dep.span,
                            })
                        }
                        None => {
                            return Err(ScopeError::Undefined {
                                name: dep.to,
                                in_name: decl.name.name.clone(),
                                kind: dep.kind,
                                span: dep.span,
                            })
                        }
                    },
                }
            }
            edges.insert(Node::Local(i, p), param_edges);
        }
    }

    detect_cycles(program, &edges)
}

fn check_uniqueness(program: &Program) -> Result<(), ScopeError> {
    let mut seen = HashSet::new();
    for decl in &program.decls {
        if !seen.insert(decl.name.name.as_str()) {
            return Err(ScopeError::DuplicateGlobal {
                name: decl.name.name.clone(),
                span: decl.name.span,
            });
        }
        let mut locals = HashSet::new();
        for param in decl.param_elems() {
            if !locals.insert(param.ident.name.as_str()) {
                return Err(ScopeError::DuplicateLocal {
                    name: param.ident.name.clone(),
                    span: param.ident.span,
                });
            }
        }
    }
    Ok(())
}

/// Collects the free surface variables of `term`, skipping anything in
/// `hidden` and anything bound inside the term itself.
fn collect_deps(term: &PTerm, hidden: &[&str], kind: DepKind, out: &mut Vec<Dep>) {
    let mut bound: Vec<String> = hidden.iter().map(|s| s.to_string()).collect();
    walk(term, &mut bound, kind, out);
}

fn walk(term: &PTerm, bound: &mut Vec<String>, kind: DepKind, out: &mut Vec<Dep>) {
    match &term.kind {
        PTermKind::Sort(_) => {}
        PTermKind::Var(name) => {
            if !bound.iter().any(|b| b == name) {
                out.push(Dep {
                    to: name.clone(),
                    kind,
                    span: term.span,
                });
            }
        }
        PTermKind::Lam(binders, body)
        | PTermKind::Pi(binders, body)
        | PTermKind::Sig(binders, body) => {
            let depth = bound.len();
            walk_binders(binders, bound, kind, out);
            walk(body, bound, kind, out);
            bound.truncate(depth);
        }
        PTermKind::Arrow(a, b) | PTermKind::Prod(a, b) => {
            walk(a, bound, kind, out);
            walk(b, bound, kind, out);
        }
        PTermKind::Pair(a, b, ascription) => {
            walk(a, bound, kind, out);
            walk(b, bound, kind, out);
            if let Some(ty) = ascription {
                walk(ty, bound, kind, out);
            }
        }
        PTermKind::Fst(t) | PTermKind::Snd(t) => walk(t, bound, kind, out),
        PTermKind::Let {
            name,
            params,
            ty,
            val,
            body,
        } => {
            let depth = bound.len();
            walk_binders(params, bound, kind, out);
            if let Some(ty) = ty {
                walk(ty, bound, kind, out);
            }
            walk(val, bound, kind, out);
            bound.truncate(depth);
            bound.push(name.name.clone());
            walk(body, bound, kind, out);
            bound.truncate(depth);
        }
        PTermKind::Apply(parts) => {
            for part in parts {
                walk(part, bound, kind, out);
            }
        }
    }
}

fn walk_binders(binders: &[Binder], bound: &mut Vec<String>, kind: DepKind, out: &mut Vec<Dep>) {
    for binder in binders {
        match binder {
            Binder::Vars(names, ty) => {
                walk(ty, bound, kind, out);
                for ident in names {
                    bound.push(ident.name.clone());
                }
            }
            Binder::Def(ident, ty, val) => {
                if let Some(ty) = ty {
                    walk(ty, bound, kind, out);
                }
                walk(val, bound, kind, out);
                bound.push(ident.name.clone());
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Grey,
    Black,
}

/// Three-color depth-first search; a grey-on-grey edge is a cycle, and the
/// stack slice between the two visits is the reported path. The order in
/// which globals finish is a valid dependency order, which is what the
/// caller gets back.
fn detect_cycles(
    program: &Program,
    edges: &HashMap<Node, Vec<(Node, Dep)>>,
) -> Result<Vec<usize>, ScopeError> {
    let mut colors: HashMap<Node, Color> = edges.keys().map(|&n| (n, Color::White)).collect();
    let mut order = Vec::with_capacity(program.decls.len());

    for i in 0..program.decls.len() {
        let root = Node::Global(i);
        if colors.get(&root) == Some(&Color::White) {
            let mut stack = Vec::new();
            visit(program, edges, &mut colors, root, &mut stack, &mut order)?;
        }
    }
    Ok(order)
}

fn node_name(program: &Program, node: Node) -> String {
    match node {
        Node::Global(i) => program.decls[i].name.name.clone(),
        Node::Local(i, p) => program.decls[i].param_elems()[p].ident.name.clone(),
    }
}

fn visit(
    program: &Program,
    edges: &HashMap<Node, Vec<(Node, Dep)>>,
    colors: &mut HashMap<Node, Color>,
    node: Node,
    stack: &mut Vec<(Node, Dep)>,
    order: &mut Vec<usize>,
) -> Result<(), ScopeError> {
    colors.insert(node, Color::Grey);
    if let Some(outgoing) = edges.get(&node) {
        for (next, dep) in outgoing {
            match colors.get(next).copied().unwrap_or(Color::White) {
                Color::Black => {}
                Color::White => {
                    stack.push((node, dep.clone()));
                    visit(program, edges, colors, *next, stack, order)?;
                    stack.pop();
                }
                Color::Grey => {
                    // Close the loop: everything on the stack from the
                    // first visit of `next` onward, plus this edge.
                    let start = stack
                        .iter()
                        .position(|(n, _)| *n == *next)
                        .unwrap_or(stack.len());
                    let mut path: Vec<DepEdge> = stack[start..]
                        .iter()
                        .map(|(from, dep)| DepEdge {
                            from: node_name(program, *from),
                            to: dep.to.clone(),
                            kind: dep.kind,
                        })
                        .collect();
                    path.push(DepEdge {
                        from: node_name(program, node),
                        to: dep.to.clone(),
                        kind: dep.kind,
                    });
                    return Err(ScopeError::Cycle {
                        span: dep.span,
                        path,
                    });
                }
            }
        }
    }
    colors.insert(node, Color::Black);
    if let Node::Global(i) = node {
        order.push(i);
    }
    Ok(())
}
