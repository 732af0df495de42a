// Copyright (c) 2016-2021 Fabian Schuiki

//! The elaboration traversals.
//!
//! [`DiagnosticVisitor`] touches every node in the semantic tree so that all
//! lazily evaluated members are realized and every diagnostic that can be
//! produced without simulation is reported. [`DefParamVisitor`] collects
//! `defparam` bindings one generate-nesting level at a time, probing through
//! potentially infinitely recursive instantiations up to the depth limit.
//! [`BindVisitor`] forces instance bodies until all expected `bind`
//! directives have been discovered.
//!
//! All three dispatch on the closed symbol-kind set; the default arm of the
//! diagnostic visitor performs the universal lazy-forcing work.

use crate::compilation::Compilation;
use crate::crate_prelude::*;
use crate::eval::EvalContext;
use crate::symbols::*;
use std::collections::{HashMap, HashSet};

/// The artifacts elaboration surfaces to the caller, besides diagnostics.
pub struct ElabResult<'a> {
    /// How often each definition was instantiated.
    pub instance_counts: HashMap<DefinitionId, usize>,
    pub dpi_imports: Vec<&'a Symbol<'a>>,
    pub extern_iface_protos: Vec<&'a Symbol<'a>>,
    pub modports_with_exports: Vec<(&'a Symbol<'a>, &'a Symbol<'a>)>,
    pub used_iface_ports: HashSet<DefinitionId>,
    pub timing_path_map: HashMap<Name, SymbolId>,
    pub hierarchy_problem: bool,
}

/// One pass of the defparam driver.
pub struct DefParamPass<'a> {
    pub level: usize,
    pub found: Vec<&'a Symbol<'a>>,
    pub num_blocks_seen: usize,
}

/// The outcome of the bind traversal.
pub struct BindResult {
    /// The ids of the discovered bind directives, in discovery order.
    pub found: Vec<u32>,
    /// Set when an instance body was reached twice, which the traversal
    /// treats as a violated design invariant.
    pub errored: bool,
}

/// Touches every node in the tree to force lazy members and collect
/// diagnostics.
pub struct DiagnosticVisitor<'sc, 'a> {
    comp: &'sc Compilation<'a>,
    error_limit: usize,
    hierarchy_problem: bool,
    active_instance_bodies: HashSet<SymbolId>,
    instance_counts: HashMap<DefinitionId, usize>,
    used_iface_ports: HashSet<DefinitionId>,
    generic_classes: Vec<&'a Symbol<'a>>,
    dpi_imports: Vec<&'a Symbol<'a>>,
    extern_iface_protos: Vec<&'a Symbol<'a>>,
    modports_with_exports: Vec<(&'a Symbol<'a>, &'a Symbol<'a>)>,
    timing_path_map: HashMap<Name, SymbolId>,
}

impl<'sc, 'a> DiagnosticVisitor<'sc, 'a> {
    pub fn new(comp: &'sc Compilation<'a>) -> DiagnosticVisitor<'sc, 'a> {
        DiagnosticVisitor {
            comp,
            error_limit: comp.options.error_limit,
            hierarchy_problem: false,
            active_instance_bodies: HashSet::new(),
            instance_counts: HashMap::new(),
            used_iface_ports: HashSet::new(),
            generic_classes: Vec::new(),
            dpi_imports: Vec::new(),
            extern_iface_protos: Vec::new(),
            modports_with_exports: Vec::new(),
            timing_path_map: HashMap::new(),
        }
    }

    fn cx(&self, sym: &'a Symbol<'a>) -> EvalContext<'sc, 'a> {
        EvalContext::for_compilation(self.comp, self.comp.param_env_of(sym), sym.loc)
    }

    /// Both short-circuit conditions are sticky: once set, every handler
    /// returns immediately.
    fn short_circuit(&self) -> bool {
        self.hierarchy_problem || self.comp.num_errors() > self.error_limit
    }

    /// The universal per-symbol work: force the declared type and
    /// initializer, value resolutions, attribute values, then recurse into
    /// the children. Returns false when short-circuited.
    fn handle_default(&mut self, sym: &'a Symbol<'a>) -> bool {
        if self.short_circuit() {
            return false;
        }
        if let Some(decl) = &sym.decl_type {
            decl.get_type();
            let mut cx = self.cx(sym);
            decl.get_initializer(&mut cx);
        }
        match &sym.data {
            SymbolData::Parameter { value } | SymbolData::EnumValue { value } => {
                value.force(&mut self.cx(sym));
            }
            SymbolData::Specparam { value, .. } => {
                value.force(&mut self.cx(sym));
            }
            _ => {}
        }
        if let Some(attrs) = self.comp.get_attributes(sym.id) {
            let mut cx = self.cx(sym);
            for attr in attrs.iter() {
                attr.value.force(&mut cx);
            }
        }
        for child in sym.child_list() {
            self.visit(child);
        }
        true
    }

    /// Visit one symbol, dispatching on its kind.
    pub fn visit(&mut self, sym: &'a Symbol<'a>) {
        match &sym.data {
            SymbolData::Instance { .. } => {
                self.handle_instance(sym);
                return;
            }
            SymbolData::GenerateBlock {
                is_instantiated, ..
            } => {
                // An uninstantiated branch is skipped entirely.
                if !is_instantiated {
                    return;
                }
                self.handle_default(sym);
                return;
            }
            _ => {}
        }
        if !self.handle_default(sym) {
            return;
        }
        match &sym.data {
            SymbolData::Specparam { path_source, .. } => {
                if let Some(path) = path_source {
                    path.force(&mut self.cx(sym));
                }
            }
            SymbolData::ContinuousAssign { assign, delay } => {
                let mut cx = self.cx(sym);
                assign.force(&mut cx);
                if let Some(delay) = delay {
                    delay.force(&mut cx);
                }
            }
            SymbolData::Net { delay } => {
                if let Some(delay) = delay {
                    delay.force(&mut self.cx(sym));
                }
            }
            SymbolData::NetType {
                data_type,
                ty_cell,
                resolution,
            } => {
                ty_cell.force_with(|| *data_type);
                if let Some(resolution) = resolution {
                    resolution.force(&mut self.cx(sym));
                }
            }
            SymbolData::InterfacePort { .. } => self.handle_interface_port(sym),
            SymbolData::ElabSystemTask { kind, message } => {
                let code = match kind {
                    crate::ast::ElabTaskKind::Error => DiagCode::ElabTaskError,
                    crate::ast::ElabTaskKind::Warning => DiagCode::ElabTaskWarning,
                };
                self.comp
                    .add_diag(Diagnostic::new(code, sym.loc).arg(*message));
            }
            SymbolData::MethodPrototype { flags, .. } => {
                if flags.contains(MethodFlags::INTERFACE_EXTERN) {
                    self.extern_iface_protos.push(sym);
                }
            }
            SymbolData::Subroutine { flags } => {
                if flags.contains(MethodFlags::DPI_IMPORT) {
                    self.dpi_imports.push(sym);
                }
            }
            SymbolData::GenericClassDef { .. } => {
                // Saved for later; generic classes are revisited once
                // everything else has been checked.
                self.generic_classes.push(sym);
            }
            SymbolData::ClassType { base_ctor, .. } => {
                if let Some(ctor) = base_ctor {
                    ctor.force(&mut self.cx(sym));
                }
            }
            SymbolData::Covergroup { event, options } => {
                let mut cx = self.cx(sym);
                if let Some(event) = event {
                    event.force(&mut cx);
                }
                for option in options {
                    option.force(&mut cx);
                }
            }
            SymbolData::Coverpoint { iff, options }
            | SymbolData::CoverCross { iff, options } => {
                let mut cx = self.cx(sym);
                if let Some(iff) = iff {
                    iff.force(&mut cx);
                }
                for option in options {
                    option.force(&mut cx);
                }
            }
            SymbolData::CoverageBin { values } => {
                let mut cx = self.cx(sym);
                for value in values {
                    value.force(&mut cx);
                }
            }
            SymbolData::ClockingBlock {
                event,
                input_skew,
                output_skew,
            } => {
                let mut cx = self.cx(sym);
                for e in [event, input_skew, output_skew].iter().filter_map(|e| e.as_ref()) {
                    e.force(&mut cx);
                }
            }
            SymbolData::Sequence { default_instance }
            | SymbolData::Property { default_instance }
            | SymbolData::LetDecl { default_instance } => {
                default_instance.force(&mut self.cx(sym));
            }
            SymbolData::RandSeqProduction { rules } => {
                let mut cx = self.cx(sym);
                for rule in rules {
                    rule.force(&mut cx);
                }
            }
            SymbolData::TimingPath { terminal, delay } => {
                if let Some(delay) = delay {
                    delay.force(&mut self.cx(sym));
                }
                if self.timing_path_map.insert(*terminal, sym.id).is_some() {
                    self.comp.add_diag(
                        Diagnostic::new(DiagCode::DuplicateTimingPath, sym.loc).arg(*terminal),
                    );
                }
            }
            SymbolData::PulseStyle { terminal } => {
                if self.timing_path_map.contains_key(terminal) {
                    self.comp.add_diag(
                        Diagnostic::new(DiagCode::PulseStyleAfterTimingPath, sym.loc)
                            .arg(*terminal),
                    );
                }
            }
            SymbolData::SystemTimingCheck { args } => {
                let mut cx = self.cx(sym);
                for arg in args {
                    arg.force(&mut cx);
                }
            }
            SymbolData::ConstraintBlock { constraints } => {
                let mut cx = self.cx(sym);
                for constraint in constraints {
                    constraint.force(&mut cx);
                }
            }
            SymbolData::DefParam { .. } => {
                self.comp.force_defparam(sym);
            }
            SymbolData::ExplicitImport {
                package,
                item,
                imported,
            } => {
                imported.force_with(|| match self.comp.find_package(*package) {
                    Some(pkg) => pkg.find_child(*item),
                    None => {
                        self.comp.add_diag(
                            Diagnostic::new(DiagCode::UnknownPackage, sym.loc).arg(*package),
                        );
                        None
                    }
                });
            }
            SymbolData::WildcardImport {
                package,
                package_sym,
            } => {
                package_sym.force_with(|| {
                    let pkg = self.comp.find_package(*package);
                    if pkg.is_none() {
                        self.comp.add_diag(
                            Diagnostic::new(DiagCode::UnknownPackage, sym.loc).arg(*package),
                        );
                    }
                    pkg
                });
            }
            SymbolData::PrimitiveInstance { connections, delay } => {
                let mut cx = self.cx(sym);
                for conn in connections {
                    conn.force(&mut cx);
                }
                if let Some(delay) = delay {
                    delay.force(&mut cx);
                }
            }
            SymbolData::UnknownModule { connections, .. } => {
                let mut cx = self.cx(sym);
                for conn in connections {
                    conn.force(&mut cx);
                }
            }
            _ => {}
        }
    }

    fn handle_interface_port(&mut self, sym: &'a Symbol<'a>) {
        let (interface_def, modport, connection) = match &sym.data {
            SymbolData::InterfacePort {
                interface_def,
                modport,
                connection,
            } => (*interface_def, *modport, *connection),
            _ => return,
        };
        let def = match interface_def {
            Some(def) => def,
            None => return,
        };
        self.used_iface_ports.insert(def);

        // If this interface port names a modport and that modport exports
        // methods, keep the pair for later cross-module checking.
        let (modport, connection) = match (modport, connection) {
            (Some(m), Some(c)) => (m, c),
            _ => return,
        };
        let parent = match sym.parent.get() {
            Some(parent) => parent,
            None => return,
        };
        let conn = match parent.find_child(connection) {
            Some(conn) => conn,
            None => return,
        };
        let scope = match &conn.data {
            SymbolData::Instance { .. } => match self.comp.body_of(conn) {
                Some(body) => body,
                None => return,
            },
            _ => conn,
        };
        if let Some(mp) = scope.find_child(modport) {
            if let SymbolData::Modport { exports: true } = mp.data {
                self.modports_with_exports.push((sym, mp));
            }
        }
    }

    fn handle_instance(&mut self, sym: &'a Symbol<'a>) {
        if self.short_circuit() {
            return;
        }
        let (definition, connections) = match &sym.data {
            SymbolData::Instance {
                definition,
                connections,
                ..
            } => (*definition, connections),
            _ => return,
        };
        trace!("visiting instance `{}`", sym.name);
        *self.instance_counts.entry(definition).or_insert(0) += 1;

        if let Some(attrs) = self.comp.get_attributes(sym.id) {
            let mut cx = self.cx(sym);
            for attr in attrs.iter() {
                attr.value.force(&mut cx);
            }
        }
        {
            let mut cx = self.cx(sym);
            for conn in connections {
                if let Some(expr) = &conn.expr {
                    expr.force(&mut cx);
                }
            }
        }

        let body = match self.comp.body_of(sym) {
            Some(body) => body,
            None => return,
        };

        // Detect infinite recursion: this exact body is already active
        // somewhere higher up the stack.
        if !self.active_instance_bodies.insert(body.id) {
            self.comp.add_diag(
                Diagnostic::new(DiagCode::InfinitelyRecursiveHierarchy, sym.loc).arg(sym.name),
            );
            self.hierarchy_problem = true;
            return;
        }
        // Recursions whose parameters keep changing never revisit a body;
        // cap the depth so they terminate too. The inserted body must leave
        // the active set on every exit path.
        if self.active_instance_bodies.len() > self.comp.options.max_instance_depth {
            self.comp.add_diag(
                Diagnostic::new(DiagCode::MaxInstanceDepthExceeded, sym.loc)
                    .arg(self.comp.definition_kind(definition).as_str())
                    .arg(self.comp.options.max_instance_depth),
            );
            self.hierarchy_problem = true;
            self.active_instance_bodies.remove(&body.id);
            return;
        }
        self.visit(body);
        self.active_instance_bodies.remove(&body.id);
    }

    /// The second pass: revisit generic classes until the set of
    /// specializations stops growing, then surface never-specialized
    /// generics through a synthetic invalid specialization.
    pub fn finalize(&mut self) {
        let mut visited: HashSet<SymbolId> = HashSet::new();
        let mut to_visit: Vec<&'a Symbol<'a>> = Vec::new();
        loop {
            let mut did_something = false;
            for generic in self.generic_classes.clone() {
                if let SymbolData::GenericClassDef { specializations, .. } = &generic.data {
                    for &spec in specializations.borrow().iter() {
                        if visited.insert(spec.id) {
                            to_visit.push(spec);
                        }
                    }
                }
                while let Some(spec) = to_visit.pop() {
                    self.visit(spec);
                    did_something = true;
                }
            }
            if !did_something {
                break;
            }
        }

        for generic in self.generic_classes.clone() {
            if self.comp.num_specializations(generic) == 0 {
                self.comp.add_diag(
                    Diagnostic::new(DiagCode::UnusedGenericClass, generic.loc).arg(generic.name),
                );
                let invalid = self.comp.invalid_specialization(generic);
                self.visit(invalid);
            }
        }
    }

    pub fn into_result(self) -> ElabResult<'a> {
        ElabResult {
            instance_counts: self.instance_counts,
            dpi_imports: self.dpi_imports,
            extern_iface_protos: self.extern_iface_protos,
            modports_with_exports: self.modports_with_exports,
            used_iface_ports: self.used_iface_ports,
            timing_path_map: self.timing_path_map,
            hierarchy_problem: self.hierarchy_problem,
        }
    }
}

/// Collects `defparam` symbols at one specific generate-nesting level.
///
/// Once the target level is reached the traversal does not go any deeper,
/// except when probing a potentially infinitely recursive instantiation:
/// since defparams cannot modify parameters above themselves across generate
/// blocks, such a recursion cannot be cured by a deeper defparam, so the
/// probe runs all the way to the depth limit to find out.
pub struct DefParamVisitor<'sc, 'a> {
    comp: &'sc Compilation<'a>,
    pub max_instance_depth: usize,
    pub generate_level: usize,
    pub found: Vec<&'a Symbol<'a>>,
    pub num_blocks_seen: usize,
    pub hierarchy_problem: Option<&'a Symbol<'a>>,
    active_instances: HashSet<DefinitionId>,
    instance_depth: usize,
    generate_depth: usize,
    in_recursive_instance: bool,
}

impl<'sc, 'a> DefParamVisitor<'sc, 'a> {
    pub fn new(
        comp: &'sc Compilation<'a>,
        max_instance_depth: usize,
        generate_level: usize,
    ) -> DefParamVisitor<'sc, 'a> {
        DefParamVisitor {
            comp,
            max_instance_depth,
            generate_level,
            found: Vec::new(),
            num_blocks_seen: 0,
            hierarchy_problem: None,
            active_instances: HashSet::new(),
            instance_depth: 0,
            generate_depth: 0,
            in_recursive_instance: false,
        }
    }

    pub fn visit(&mut self, sym: &'a Symbol<'a>) {
        match &sym.data {
            SymbolData::Root | SymbolData::CompilationUnit | SymbolData::Package => {
                for child in sym.child_list() {
                    self.visit(child);
                }
            }
            SymbolData::DefParam { .. } => {
                if self.generate_depth <= self.generate_level {
                    self.found.push(sym);
                }
            }
            SymbolData::Instance { definition, .. } => {
                self.handle_instance(sym, *definition);
            }
            SymbolData::GenerateBlock {
                is_instantiated, ..
            } => {
                if !is_instantiated || self.hierarchy_problem.is_some() {
                    return;
                }
                // Descending would go past the target level, unless we are
                // probing a recursive instantiation.
                if self.generate_depth >= self.generate_level && !self.in_recursive_instance {
                    return;
                }
                if self.generate_depth < self.generate_level {
                    self.num_blocks_seen += 1;
                }
                self.generate_depth += 1;
                for child in sym.child_list() {
                    self.visit(child);
                }
                self.generate_depth -= 1;
            }
            SymbolData::GenerateBlockArray => {
                // Defparams may live in any iteration.
                for child in sym.child_list() {
                    if self.hierarchy_problem.is_some() {
                        return;
                    }
                    self.visit(child);
                }
            }
            _ => {}
        }
    }

    fn handle_instance(&mut self, sym: &'a Symbol<'a>, definition: DefinitionId) {
        if self.hierarchy_problem.is_some() {
            return;
        }
        if self.instance_depth > self.max_instance_depth {
            self.hierarchy_problem = Some(sym);
            return;
        }

        let was_in_recursive = self.in_recursive_instance;
        let mut inserted = false;
        if !self.in_recursive_instance {
            // If the definition is already active we may be looking at an
            // infinitely recursive instantiation and have to probe all the
            // way down to the depth limit.
            inserted = self.active_instances.insert(definition);
            if !inserted {
                self.in_recursive_instance = true;
            }
        }

        if self.generate_depth <= self.generate_level {
            self.num_blocks_seen += 1;
        }

        self.instance_depth += 1;
        if let Some(body) = self.comp.body_of(sym) {
            for child in body.child_list() {
                self.visit(child);
            }
        }
        self.instance_depth -= 1;

        self.in_recursive_instance = was_in_recursive;
        if inserted {
            self.active_instances.remove(&definition);
        }
    }
}

/// Forces instance bodies until every expected `bind` directive has been
/// discovered. Each body is visited at most once; generate block arrays are
/// entered at their first member only, since the directives are
/// array-independent.
pub struct BindVisitor<'sc, 'a> {
    comp: &'sc Compilation<'a>,
    expected: usize,
    visited: HashSet<SymbolId>,
    pub errored: bool,
}

impl<'sc, 'a> BindVisitor<'sc, 'a> {
    pub fn new(comp: &'sc Compilation<'a>, expected: usize) -> BindVisitor<'sc, 'a> {
        BindVisitor {
            comp,
            expected,
            visited: HashSet::new(),
            errored: false,
        }
    }

    fn done(&self) -> bool {
        self.comp.num_binds_found() == self.expected
    }

    pub fn visit(&mut self, sym: &'a Symbol<'a>) {
        match &sym.data {
            SymbolData::Root => {
                for child in sym.child_list() {
                    self.visit(child);
                }
            }
            SymbolData::CompilationUnit => {
                if self.done() {
                    return;
                }
                for child in sym.child_list() {
                    self.visit(child);
                }
            }
            SymbolData::Instance { .. } => {
                if self.done() {
                    return;
                }
                let body = match self.comp.body_of(sym) {
                    Some(body) => body,
                    None => return,
                };
                if !self.visited.insert(body.id) {
                    self.errored = true;
                    return;
                }
                for child in body.child_list() {
                    self.visit(child);
                }
            }
            SymbolData::GenerateBlock {
                is_instantiated, ..
            } => {
                if self.done() || !is_instantiated {
                    return;
                }
                for child in sym.child_list() {
                    self.visit(child);
                }
            }
            SymbolData::GenerateBlockArray => {
                if self.done() {
                    return;
                }
                if let Some(first) = sym.child_list().first() {
                    self.visit(first);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{
        BindDirective, Definition, DefinitionKind, ElabTaskKind, Member,
    };
    use crate::compilation::{CompilationOptions, SymbolArena};
    use crate::eval::{BinaryOp, Expr};
    use crate::token::intern;
    use crate::value::ConstantValue;

    fn module(name: &str, members: Vec<Member>) -> Definition {
        Definition::new(intern(name), DefinitionKind::Module, members)
    }

    fn instance(name: &str, target: &str) -> Member {
        Member::Instance {
            name: intern(name),
            target: intern(target),
            overrides: vec![],
            connections: vec![],
        }
    }

    fn error_task(message: &str) -> Member {
        Member::ElabSystemTask {
            kind: ElabTaskKind::Error,
            message: intern(message),
        }
    }

    fn warning_task(message: &str) -> Member {
        Member::ElabSystemTask {
            kind: ElabTaskKind::Warning,
            message: intern(message),
        }
    }

    #[test]
    fn infinitely_recursive_hierarchy() {
        let arena = SymbolArena::new();
        let comp = Compilation::new(&arena, CompilationOptions::default());
        let m = comp.add_definition(module("M", vec![instance("u", "M")]));
        comp.add_root_instance(intern("M"), intern("top"));

        let result = comp.elaborate();
        let diags = comp.diags.borrow();
        // Exactly one report, at the first self-recursion point; deeper
        // nodes are suppressed.
        assert_eq!(diags.count_of(DiagCode::InfinitelyRecursiveHierarchy), 1);
        assert_eq!(diags.len(), 1);
        assert!(result.hierarchy_problem);
        // The top instance and the one inner entry were both counted.
        assert_eq!(result.instance_counts[&m], 2);
    }

    #[test]
    fn max_instance_depth_exceeded() {
        let arena = SymbolArena::new();
        let mut options = CompilationOptions::default();
        options.max_instance_depth = 4;
        let comp = Compilation::new(&arena, options);

        comp.add_definition(module("M5", vec![]));
        for i in (0..5).rev() {
            comp.add_definition(module(
                &format!("M{}", i),
                vec![instance("u", &format!("M{}", i + 1))],
            ));
        }
        let m0 = comp.find_definition(intern("M0")).unwrap();
        comp.add_root_instance(intern("M0"), intern("top"));

        let result = comp.elaborate();
        let diags = comp.diags.borrow();
        assert_eq!(diags.count_of(DiagCode::MaxInstanceDepthExceeded), 1);
        assert!(result.hierarchy_problem);
        assert_eq!(result.instance_counts[&m0], 1);
    }

    #[test]
    fn uninstantiated_generate_is_skipped() {
        let arena = SymbolArena::new();
        let comp = Compilation::new(&arena, CompilationOptions::default());
        comp.add_definition(module(
            "Top",
            vec![Member::GenerateIf {
                name: intern("g"),
                cond: Expr::Int(0),
                then_members: vec![error_task("inside dead branch")],
                else_members: vec![],
            }],
        ));
        comp.add_root_instance(intern("Top"), intern("top"));

        comp.elaborate();
        assert!(comp.diags.borrow().is_empty());
    }

    #[test]
    fn instantiated_generate_is_visited() {
        let arena = SymbolArena::new();
        let comp = Compilation::new(&arena, CompilationOptions::default());
        comp.add_definition(module(
            "Top",
            vec![Member::GenerateIf {
                name: intern("g"),
                cond: Expr::Binary(
                    BinaryOp::Sub,
                    Box::new(Expr::Int(2)),
                    Box::new(Expr::Int(1)),
                ),
                then_members: vec![error_task("live branch")],
                else_members: vec![error_task("dead branch")],
            }],
        ));
        comp.add_root_instance(intern("Top"), intern("top"));

        comp.elaborate();
        let diags = comp.diags.borrow();
        assert_eq!(diags.count_of(DiagCode::ElabTaskError), 1);
    }

    #[test]
    fn unused_generic_class_gets_invalid_specialization() {
        let arena = SymbolArena::new();
        let comp = Compilation::new(&arena, CompilationOptions::default());
        comp.add_definition(module(
            "Top",
            vec![Member::GenericClass {
                name: intern("C"),
                params: vec![(intern("T"), Expr::Int(0))],
                members: vec![error_task("parameter-independent problem")],
            }],
        ));
        comp.add_root_instance(intern("Top"), intern("top"));

        comp.elaborate();
        let diags = comp.diags.borrow();
        assert_eq!(diags.count_of(DiagCode::UnusedGenericClass), 1);
        // The body diagnostic is emitted exactly once, via the synthetic
        // invalid specialization.
        assert_eq!(diags.count_of(DiagCode::ElabTaskError), 1);
    }

    #[test]
    fn generic_class_fixpoint_converges() {
        // Top's enum value forces a specialization of C1; visiting that
        // specialization forces one of C2, which must be picked up by a
        // later fixpoint round.
        let arena = SymbolArena::new();
        let comp = Compilation::new(&arena, CompilationOptions::default());
        comp.add_definition(module(
            "Top",
            vec![
                Member::GenericClass {
                    name: intern("C1"),
                    params: vec![(intern("N"), Expr::Int(0))],
                    members: vec![Member::EnumValue {
                        name: intern("inner"),
                        init: Expr::SpecializationOf {
                            class: intern("C2"),
                            args: vec![Expr::Int(7)],
                        },
                    }],
                },
                Member::GenericClass {
                    name: intern("C2"),
                    params: vec![(intern("N"), Expr::Int(0))],
                    members: vec![warning_task("visited specialization")],
                },
                Member::EnumValue {
                    name: intern("e"),
                    init: Expr::SpecializationOf {
                        class: intern("C1"),
                        args: vec![Expr::Int(1)],
                    },
                },
            ],
        ));
        comp.add_root_instance(intern("Top"), intern("top"));

        comp.elaborate();
        let diags = comp.diags.borrow();
        let c1 = comp.find_generic_class(intern("C1")).unwrap();
        let c2 = comp.find_generic_class(intern("C2")).unwrap();
        assert_eq!(comp.num_specializations(c1), 1);
        assert_eq!(comp.num_specializations(c2), 1);
        // C2's specialization was visited by the fixpoint.
        assert_eq!(diags.count_of(DiagCode::ElabTaskWarning), 1);
        // Neither class is reported unused.
        assert_eq!(diags.count_of(DiagCode::UnusedGenericClass), 0);
    }

    #[test]
    fn instance_counts_with_shared_bodies() {
        let arena = SymbolArena::new();
        let comp = Compilation::new(&arena, CompilationOptions::default());
        let leaf = comp.add_definition(module("Leaf", vec![]));
        let mid = comp.add_definition(module(
            "Mid",
            vec![instance("l1", "Leaf"), instance("l2", "Leaf")],
        ));
        comp.add_definition(module("Top", vec![instance("m", "Mid")]));
        comp.add_root_instance(intern("Top"), intern("top"));

        let result = comp.elaborate();
        assert!(comp.diags.borrow().is_empty());
        assert_eq!(result.instance_counts[&mid], 1);
        assert_eq!(result.instance_counts[&leaf], 2);
        assert!(!result.hierarchy_problem);
    }

    #[test]
    fn error_limit_suppresses_work() {
        let arena = SymbolArena::new();
        let mut options = CompilationOptions::default();
        options.error_limit = 2;
        let comp = Compilation::new(&arena, options);
        comp.add_definition(module(
            "Top",
            (0..6).map(|i| error_task(&format!("e{}", i))).collect(),
        ));
        comp.add_root_instance(intern("Top"), intern("top"));

        comp.elaborate();
        let diags = comp.diags.borrow();
        // Once the count exceeds the limit, handlers return immediately.
        assert_eq!(diags.count_of(DiagCode::ElabTaskError), 3);
    }

    #[test]
    fn repeated_elaboration_is_idempotent() {
        let arena = SymbolArena::new();
        let comp = Compilation::new(&arena, CompilationOptions::default());
        comp.add_definition(module(
            "Top",
            vec![Member::Net {
                name: intern("n"),
                ty: Type::Logic(1),
                delay: Some(Expr::Invalid),
                init: None,
            }],
        ));
        comp.add_root_instance(intern("Top"), intern("top"));

        comp.elaborate();
        let first = comp.diags.borrow().len();
        assert_eq!(
            comp.diags.borrow().count_of(DiagCode::ExpressionNotConstant),
            1
        );
        comp.elaborate();
        // Lazy members memoize failures; nothing is reported twice.
        assert_eq!(comp.diags.borrow().len(), first);
    }

    #[test]
    fn parameters_freeze_per_instance() {
        let arena = SymbolArena::new();
        let comp = Compilation::new(&arena, CompilationOptions::default());
        comp.add_definition(module(
            "Sub",
            vec![Member::Parameter {
                name: intern("WIDTH"),
                init: Expr::Int(1),
            }],
        ));
        comp.add_definition(module(
            "Top",
            vec![
                Member::Instance {
                    name: intern("a"),
                    target: intern("Sub"),
                    overrides: vec![(intern("WIDTH"), Expr::Int(8))],
                    connections: vec![],
                },
                Member::Instance {
                    name: intern("b"),
                    target: intern("Sub"),
                    overrides: vec![],
                    connections: vec![],
                },
            ],
        ));
        comp.add_root_instance(intern("Top"), intern("top"));
        comp.elaborate();

        let a_param = comp
            .resolve_hierarchical(&[intern("top"), intern("a"), intern("WIDTH")])
            .unwrap();
        let b_param = comp
            .resolve_hierarchical(&[intern("top"), intern("b"), intern("WIDTH")])
            .unwrap();
        match (&a_param.data, &b_param.data) {
            (SymbolData::Parameter { value: a }, SymbolData::Parameter { value: b }) => {
                assert_eq!(a.get(), Some(ConstantValue::int32(8)));
                assert_eq!(b.get(), Some(ConstantValue::int32(1)));
            }
            _ => panic!("expected parameters"),
        }
    }

    #[test]
    fn defparam_level_progression() {
        let arena = SymbolArena::new();
        let comp = Compilation::new(&arena, CompilationOptions::default());
        comp.add_definition(module(
            "Top",
            vec![
                Member::Parameter {
                    name: intern("P"),
                    init: Expr::Int(1),
                },
                Member::DefParam {
                    path: vec![intern("top"), intern("P")],
                    value: Expr::Int(5),
                },
                Member::GenerateIf {
                    name: intern("g"),
                    cond: Expr::Int(1),
                    then_members: vec![Member::GenerateIf {
                        name: intern("g2"),
                        cond: Expr::Int(1),
                        then_members: vec![Member::DefParam {
                            path: vec![intern("top"), intern("P")],
                            value: Expr::Int(7),
                        }],
                        else_members: vec![],
                    }],
                    else_members: vec![],
                },
            ],
        ));
        comp.add_root_instance(intern("Top"), intern("top"));

        let passes = comp.collect_defparams();
        // The depth-0 defparam is available on the first pass; the depth-2
        // one appears once the traversal reaches level 2.
        assert_eq!(passes[0].level, 0);
        assert_eq!(passes[0].found.len(), 1);
        assert_eq!(passes[2].found.len(), 2);
        // num_blocks_seen is monotonically non-decreasing across passes.
        for pair in passes.windows(2) {
            assert!(pair[0].num_blocks_seen <= pair[1].num_blocks_seen);
        }
        // Everything found has its target and value forced.
        for dp in passes.last().unwrap().found.iter() {
            match &dp.data {
                SymbolData::DefParam { target, value, .. } => {
                    assert_eq!(target.get().map(|t| t.is_some()), Some(true));
                    assert!(value.is_resolved());
                }
                _ => panic!("expected defparam"),
            }
        }
    }

    #[test]
    fn defparam_recursive_hierarchy_aborts() {
        let arena = SymbolArena::new();
        let mut options = CompilationOptions::default();
        options.max_instance_depth = 8;
        let comp = Compilation::new(&arena, options);
        comp.add_definition(module("M", vec![instance("u", "M")]));
        comp.add_root_instance(intern("M"), intern("top"));

        let passes = comp.collect_defparams();
        // The driver aborts before recording a pass.
        assert!(passes.is_empty());
        assert_eq!(
            comp.diags.borrow().count_of(DiagCode::MaxInstanceDepthExceeded),
            1
        );
    }

    #[test]
    fn bind_directives_are_discovered() {
        let arena = SymbolArena::new();
        let comp = Compilation::new(&arena, CompilationOptions::default());
        comp.add_definition(module(
            "Sub",
            vec![Member::Bind(BindDirective {
                id: 1,
                target: intern("elsewhere"),
            })],
        ));
        comp.add_definition(module(
            "Top",
            vec![
                Member::Bind(BindDirective {
                    id: 0,
                    target: intern("somewhere"),
                }),
                instance("s", "Sub"),
            ],
        ));
        comp.add_root_instance(intern("Top"), intern("top"));

        assert_eq!(comp.binds_expected(), 2);
        let result = comp.collect_binds();
        assert!(!result.errored);
        assert_eq!(result.found, vec![0, 1]);
    }

    #[test]
    fn bind_visitor_flags_revisited_bodies() {
        let arena = SymbolArena::new();
        let comp = Compilation::new(&arena, CompilationOptions::default());
        comp.add_definition(module(
            "A",
            vec![Member::Bind(BindDirective {
                id: 0,
                target: intern("x"),
            })],
        ));
        // A bind that is never discovered keeps the traversal going past
        // the shared body.
        comp.add_definition(module(
            "Ghost",
            vec![Member::Bind(BindDirective {
                id: 1,
                target: intern("y"),
            })],
        ));
        comp.add_definition(module("Top", vec![instance("a", "A"), instance("b", "A")]));
        comp.add_root_instance(intern("Top"), intern("top"));

        let result = comp.collect_binds();
        assert!(result.errored);
        assert_eq!(result.found, vec![0]);
    }

    #[test]
    fn dpi_and_extern_prototypes_are_collected() {
        let arena = SymbolArena::new();
        let comp = Compilation::new(&arena, CompilationOptions::default());
        comp.add_definition(module(
            "Top",
            vec![
                Member::Subroutine {
                    name: intern("c_func"),
                    flags: MethodFlags::DPI_IMPORT,
                    members: vec![],
                },
                Member::MethodPrototype {
                    name: intern("iface_task"),
                    flags: MethodFlags::INTERFACE_EXTERN,
                    subroutine: None,
                },
            ],
        ));
        comp.add_root_instance(intern("Top"), intern("top"));

        let result = comp.elaborate();
        assert_eq!(result.dpi_imports.len(), 1);
        assert_eq!(result.dpi_imports[0].name, intern("c_func"));
        assert_eq!(result.extern_iface_protos.len(), 1);
    }

    #[test]
    fn modports_with_exports_are_recorded() {
        let arena = SymbolArena::new();
        let comp = Compilation::new(&arena, CompilationOptions::default());
        let iface = comp.add_definition(Definition::new(
            intern("I"),
            DefinitionKind::Interface,
            vec![Member::Modport {
                name: intern("mp"),
                exports: true,
            }],
        ));
        comp.add_definition(module(
            "Top",
            vec![
                instance("i0", "I"),
                Member::InterfacePort {
                    name: intern("p"),
                    interface_def: Some(intern("I")),
                    modport: Some(intern("mp")),
                    connection: Some(intern("i0")),
                },
            ],
        ));
        comp.add_root_instance(intern("Top"), intern("top"));

        let result = comp.elaborate();
        assert!(result.used_iface_ports.contains(&iface));
        assert_eq!(result.modports_with_exports.len(), 1);
        assert_eq!(result.modports_with_exports[0].0.name, intern("p"));
        assert_eq!(result.modports_with_exports[0].1.name, intern("mp"));
    }

    #[test]
    fn timing_paths_detect_duplicates_and_pulse_styles() {
        let arena = SymbolArena::new();
        let comp = Compilation::new(&arena, CompilationOptions::default());
        comp.add_definition(module(
            "Top",
            vec![
                Member::TimingPath {
                    terminal: intern("out"),
                    delay: None,
                },
                Member::TimingPath {
                    terminal: intern("out"),
                    delay: None,
                },
                Member::PulseStyle {
                    terminal: intern("out"),
                },
            ],
        ));
        comp.add_root_instance(intern("Top"), intern("top"));

        let result = comp.elaborate();
        let diags = comp.diags.borrow();
        assert_eq!(diags.count_of(DiagCode::DuplicateTimingPath), 1);
        assert_eq!(diags.count_of(DiagCode::PulseStyleAfterTimingPath), 1);
        assert_eq!(result.timing_path_map.len(), 1);
    }

    #[test]
    fn attributes_are_forced() {
        let arena = SymbolArena::new();
        let comp = Compilation::new(&arena, CompilationOptions::default());
        comp.add_definition(module(
            "Top",
            vec![Member::Attributed {
                attrs: vec![(intern("keep"), Expr::Invalid)],
                member: Box::new(Member::Net {
                    name: intern("n"),
                    ty: Type::Logic(1),
                    delay: None,
                    init: None,
                }),
            }],
        ));
        comp.add_root_instance(intern("Top"), intern("top"));

        comp.elaborate();
        assert_eq!(
            comp.diags.borrow().count_of(DiagCode::ExpressionNotConstant),
            1
        );
    }

    #[test]
    fn unknown_package_import_reports() {
        let arena = SymbolArena::new();
        let comp = Compilation::new(&arena, CompilationOptions::default());
        comp.add_package(
            intern("pkg"),
            vec![Member::Parameter {
                name: intern("K"),
                init: Expr::Int(3),
            }],
        );
        comp.add_definition(module(
            "Top",
            vec![
                Member::ExplicitImport {
                    package: intern("pkg"),
                    item: intern("K"),
                },
                Member::WildcardImport {
                    package: intern("nonexistent"),
                },
            ],
        ));
        comp.add_root_instance(intern("Top"), intern("top"));

        comp.elaborate();
        let diags = comp.diags.borrow();
        assert_eq!(diags.count_of(DiagCode::UnknownPackage), 1);
    }
}
