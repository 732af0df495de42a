// Copyright (c) 2016-2021 Fabian Schuiki

//! The central data structure of the front-end.
//!
//! A [`Compilation`] owns every symbol (through the caller-provided arena),
//! the diagnostic sink, the definition and package tables, the instance-body
//! cache, and the attribute storage. All mutation flows through it; the
//! traversals in [`crate::elab`] only ever hold shared references.
//!
//! Instance bodies are built lazily on first request and shared between
//! instances whose parameter assignments are identical. Generic-class
//! specializations are created on demand and grow monotonically.

use crate::ast;
use crate::crate_prelude::*;
use crate::elab::{
    BindResult, BindVisitor, DefParamPass, DefParamVisitor, DiagnosticVisitor, ElabResult,
};
use crate::eval::{EvalContext, Expr};
use crate::symbols::*;
use crate::token::{intern, LanguageVersion};
use crate::value::{ConstantValue, ParamKey};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use typed_arena::Arena;

/// The arena all symbols of a compilation are allocated in.
pub type SymbolArena<'a> = Arena<Symbol<'a>>;

/// The options a compilation runs under.
#[derive(Clone, Debug)]
pub struct CompilationOptions {
    /// The maximum depth of the active instance stack before elaboration
    /// gives up on a hierarchy.
    pub max_instance_depth: usize,
    /// The number of errors after which elaboration work is suppressed.
    pub error_limit: usize,
    pub language_version: LanguageVersion,
}

impl Default for CompilationOptions {
    fn default() -> CompilationOptions {
        CompilationOptions {
            max_instance_depth: 128,
            error_limit: 64,
            language_version: LanguageVersion::default(),
        }
    }
}

/// The root owning context of a design.
pub struct Compilation<'a> {
    arena: &'a SymbolArena<'a>,
    pub options: CompilationOptions,
    pub diags: RefCell<Diagnostics>,
    root: &'a Symbol<'a>,
    defs: RefCell<Vec<ast::Definition>>,
    def_names: RefCell<HashMap<Name, DefinitionId>>,
    packages: RefCell<HashMap<Name, &'a Symbol<'a>>>,
    generic_classes: RefCell<HashMap<Name, &'a Symbol<'a>>>,
    attributes: RefCell<HashMap<SymbolId, Rc<Vec<Attribute>>>>,
    body_cache: RefCell<HashMap<(DefinitionId, ParamKey), &'a Symbol<'a>>>,
    bind_expected: Cell<usize>,
    bind_found: RefCell<Vec<u32>>,
    next_symbol_id: Cell<u32>,
}

impl<'a> Compilation<'a> {
    pub fn new(arena: &'a SymbolArena<'a>, options: CompilationOptions) -> Compilation<'a> {
        let root = arena.alloc(Symbol::new(
            SymbolId(0),
            intern("$root"),
            INVALID_LOCATION,
            SymbolData::Root,
        ));
        Compilation {
            arena,
            options,
            diags: RefCell::new(Diagnostics::new()),
            root,
            defs: RefCell::new(Vec::new()),
            def_names: RefCell::new(HashMap::new()),
            packages: RefCell::new(HashMap::new()),
            generic_classes: RefCell::new(HashMap::new()),
            attributes: RefCell::new(HashMap::new()),
            body_cache: RefCell::new(HashMap::new()),
            bind_expected: Cell::new(0),
            bind_found: RefCell::new(Vec::new()),
            next_symbol_id: Cell::new(1),
        }
    }

    /// The root of the semantic tree.
    pub fn root(&self) -> &'a Symbol<'a> {
        self.root
    }

    fn next_id(&self) -> SymbolId {
        let id = self.next_symbol_id.get();
        self.next_symbol_id.set(id + 1);
        SymbolId(id)
    }

    fn alloc(&self, sym: Symbol<'a>) -> &'a Symbol<'a> {
        self.arena.alloc(sym)
    }

    fn new_symbol(&self, name: Name, loc: Location, data: SymbolData<'a>) -> &'a Symbol<'a> {
        self.alloc(Symbol::new(self.next_id(), name, loc, data))
    }

    /// Report a diagnostic into the sink.
    pub fn add_diag(&self, diag: Diagnostic) {
        self.diags.borrow_mut().add(diag);
    }

    /// The live count of error-severity diagnostics.
    pub fn num_errors(&self) -> usize {
        self.diags.borrow().num_errors()
    }

    // ------------------------------------------------------------------
    // Population by the parser collaborator

    /// Register a definition. Bind directives anywhere in its members count
    /// toward the expected total for the bind traversal.
    pub fn add_definition(&self, def: ast::Definition) -> DefinitionId {
        let id = DefinitionId(self.defs.borrow().len() as u32);
        self.bind_expected
            .set(self.bind_expected.get() + count_binds(&def.members));
        self.def_names.borrow_mut().insert(def.name, id);
        debug!("registered definition `{}` as {:?}", def.name, id);
        self.defs.borrow_mut().push(def);
        id
    }

    pub fn find_definition(&self, name: Name) -> Option<DefinitionId> {
        self.def_names.borrow().get(&name).copied()
    }

    pub fn definition_name(&self, id: DefinitionId) -> Name {
        self.defs.borrow()[id.0 as usize].name
    }

    pub fn definition_kind(&self, id: DefinitionId) -> ast::DefinitionKind {
        self.defs.borrow()[id.0 as usize].kind
    }

    /// Register a package and build its members eagerly.
    pub fn add_package(&self, name: Name, members: Vec<ast::Member>) -> &'a Symbol<'a> {
        let pkg = self.new_symbol(name, INVALID_LOCATION, SymbolData::Package);
        self.root.add_child(pkg);
        self.packages.borrow_mut().insert(name, pkg);
        let mut env = HashMap::new();
        self.build_members(pkg, &members, &mut env);
        pkg
    }

    pub fn find_package(&self, name: Name) -> Option<&'a Symbol<'a>> {
        self.packages.borrow().get(&name).copied()
    }

    pub fn find_generic_class(&self, name: Name) -> Option<&'a Symbol<'a>> {
        self.generic_classes.borrow().get(&name).copied()
    }

    /// Register a compilation unit and build its members eagerly.
    pub fn add_compilation_unit(&self, members: Vec<ast::Member>) -> &'a Symbol<'a> {
        let unit = self.new_symbol(intern("$unit"), INVALID_LOCATION, SymbolData::CompilationUnit);
        self.root.add_child(unit);
        let mut env = HashMap::new();
        self.build_members(unit, &members, &mut env);
        unit
    }

    /// Create a top-level instance of a definition; its body is built right
    /// away. Returns `None` and reports if the definition is unknown.
    pub fn add_root_instance(&self, def_name: Name, inst_name: Name) -> Option<&'a Symbol<'a>> {
        let def = match self.find_definition(def_name) {
            Some(def) => def,
            None => {
                self.add_diag(
                    Diagnostic::new(DiagCode::UnknownModule, INVALID_LOCATION).arg(def_name),
                );
                return None;
            }
        };
        let inst = self.new_symbol(
            inst_name,
            INVALID_LOCATION,
            SymbolData::Instance {
                definition: def,
                overrides: Vec::new(),
                connections: Vec::new(),
                body: Lazy::new(),
            },
        );
        self.root.add_child(inst);
        self.body_of(inst);
        Some(inst)
    }

    // ------------------------------------------------------------------
    // Body construction

    /// The body of an instance, built on first request. Identical parameter
    /// assignments share one body.
    pub fn body_of(&self, inst: &'a Symbol<'a>) -> Option<&'a Symbol<'a>> {
        match &inst.data {
            SymbolData::Instance {
                definition,
                overrides,
                body,
                ..
            } => Some(body.force_with(|| self.build_body(*definition, overrides, inst))),
            _ => None,
        }
    }

    fn build_body(
        &self,
        def_id: DefinitionId,
        overrides: &[(Name, Expr)],
        inst: &'a Symbol<'a>,
    ) -> &'a Symbol<'a> {
        let def = self.defs.borrow()[def_id.0 as usize].clone();
        let loc = inst.loc;

        // Evaluate the overrides in the instantiating scope, then freeze the
        // body's parameters in declaration order.
        let parent_env = self.param_env_of(inst);
        let mut override_values = HashMap::new();
        for (name, expr) in overrides {
            let mut cx = EvalContext::for_compilation(self, parent_env.clone(), loc);
            override_values.insert(*name, cx.eval(expr));
        }
        let mut env = HashMap::new();
        let mut key = Vec::new();
        for member in &def.members {
            if let ast::Member::Parameter { name, init } = member {
                let value = match override_values.get(name) {
                    Some(value) => value.clone(),
                    None => {
                        let mut cx = EvalContext::for_compilation(self, env.clone(), loc);
                        cx.eval(init)
                    }
                };
                key.push(value.key());
                env.insert(*name, value);
            }
        }

        if let Some(&body) = self.body_cache.borrow().get(&(def_id, key.clone())) {
            return body;
        }
        debug!("building body of `{}`", def.name);
        let body = self.new_symbol(
            def.name,
            loc,
            SymbolData::InstanceBody {
                definition: def_id,
                params: env.clone(),
            },
        );
        self.body_cache.borrow_mut().insert((def_id, key), body);
        self.build_members(body, &def.members, &mut env);
        body
    }

    fn build_members(
        &self,
        scope: &'a Symbol<'a>,
        members: &[ast::Member],
        env: &mut HashMap<Name, ConstantValue>,
    ) {
        for member in members {
            self.build_member(scope, member, env);
        }
    }

    fn eval_in(
        &self,
        env: &HashMap<Name, ConstantValue>,
        loc: Location,
        expr: &Expr,
    ) -> ConstantValue {
        let mut cx = EvalContext::for_compilation(self, env.clone(), loc);
        cx.eval(expr)
    }

    fn build_member(
        &self,
        scope: &'a Symbol<'a>,
        member: &ast::Member,
        env: &mut HashMap<Name, ConstantValue>,
    ) -> Option<&'a Symbol<'a>> {
        use ast::Member as M;
        let loc = scope.loc;
        let lazy = |e: &Option<Expr>| e.clone().map(LazyExpr::new);
        let lazies = |es: &[Expr]| es.iter().cloned().map(LazyExpr::new).collect::<Vec<_>>();
        let sym = match member {
            M::Parameter { name, init } => {
                // Parameters freeze at construction; bodies pre-compute the
                // environment, everything else evaluates in order here.
                let value = match env.get(name) {
                    Some(value) => value.clone(),
                    None => {
                        let value = self.eval_in(env, loc, init);
                        env.insert(*name, value.clone());
                        value
                    }
                };
                self.new_symbol(
                    *name,
                    loc,
                    SymbolData::Parameter {
                        value: LazyExpr::resolved(init.clone(), value),
                    },
                )
            }
            M::EnumValue { name, init } => self.new_symbol(
                *name,
                loc,
                SymbolData::EnumValue {
                    value: LazyExpr::new(init.clone()),
                },
            ),
            M::Specparam {
                name,
                init,
                path_source,
            } => self.new_symbol(
                *name,
                loc,
                SymbolData::Specparam {
                    value: LazyExpr::new(init.clone()),
                    path_source: lazy(path_source),
                },
            ),
            M::Port { name, ty, init } => self.alloc(
                Symbol::new(self.next_id(), *name, loc, SymbolData::Port)
                    .with_decl_type(DeclaredType::new(*ty, init.clone())),
            ),
            M::MultiPort { name, ty } => self.alloc(
                Symbol::new(self.next_id(), *name, loc, SymbolData::MultiPort)
                    .with_decl_type(DeclaredType::new(*ty, None)),
            ),
            M::InterfacePort {
                name,
                interface_def,
                modport,
                connection,
            } => self.new_symbol(
                *name,
                loc,
                SymbolData::InterfacePort {
                    interface_def: interface_def.and_then(|n| self.find_definition(n)),
                    modport: *modport,
                    connection: *connection,
                },
            ),
            M::Modport { name, exports } => {
                self.new_symbol(*name, loc, SymbolData::Modport { exports: *exports })
            }
            M::Net {
                name,
                ty,
                delay,
                init,
            } => self.alloc(
                Symbol::new(
                    self.next_id(),
                    *name,
                    loc,
                    SymbolData::Net { delay: lazy(delay) },
                )
                .with_decl_type(DeclaredType::new(*ty, init.clone())),
            ),
            M::NetType {
                name,
                data_type,
                resolution,
            } => self.new_symbol(
                *name,
                loc,
                SymbolData::NetType {
                    data_type: *data_type,
                    ty_cell: Lazy::new(),
                    resolution: lazy(resolution),
                },
            ),
            M::ContinuousAssign { assign, delay } => self.new_symbol(
                intern(""),
                loc,
                SymbolData::ContinuousAssign {
                    assign: LazyExpr::new(assign.clone()),
                    delay: lazy(delay),
                },
            ),
            M::Instance {
                name,
                target,
                overrides,
                connections,
            } => match self.find_definition(*target) {
                Some(def) => self.new_symbol(
                    *name,
                    loc,
                    SymbolData::Instance {
                        definition: def,
                        overrides: overrides.clone(),
                        connections: connections
                            .iter()
                            .map(|c| PortConnection {
                                port: c.port,
                                expr: c.expr.clone().map(LazyExpr::new),
                            })
                            .collect(),
                        body: Lazy::new(),
                    },
                ),
                None => {
                    self.add_diag(Diagnostic::new(DiagCode::UnknownModule, loc).arg(*target));
                    self.new_symbol(
                        *name,
                        loc,
                        SymbolData::UnknownModule {
                            target: *target,
                            connections: lazies(
                                &connections
                                    .iter()
                                    .filter_map(|c| c.expr.clone())
                                    .collect::<Vec<_>>(),
                            ),
                        },
                    )
                }
            },
            M::PrimitiveInstance {
                name,
                connections,
                delay,
            } => self.new_symbol(
                *name,
                loc,
                SymbolData::PrimitiveInstance {
                    connections: lazies(connections),
                    delay: lazy(delay),
                },
            ),
            M::GenerateIf {
                name,
                cond,
                then_members,
                else_members,
            } => {
                let cond_value = self.eval_in(env, loc, cond).is_true();
                let then_block = self.new_symbol(
                    *name,
                    loc,
                    SymbolData::GenerateBlock {
                        is_instantiated: cond_value,
                        bindings: HashMap::new(),
                    },
                );
                scope.add_child(then_block);
                // Members of an uninstantiated branch are never built, so
                // nothing in them can be visited or diagnosed.
                if cond_value {
                    let mut block_env = env.clone();
                    self.build_members(then_block, then_members, &mut block_env);
                }
                if !else_members.is_empty() {
                    let else_block = self.new_symbol(
                        *name,
                        loc,
                        SymbolData::GenerateBlock {
                            is_instantiated: !cond_value,
                            bindings: HashMap::new(),
                        },
                    );
                    scope.add_child(else_block);
                    if !cond_value {
                        let mut block_env = env.clone();
                        self.build_members(else_block, else_members, &mut block_env);
                    }
                }
                return Some(then_block);
            }
            M::GenerateFor {
                name,
                genvar,
                count,
                members,
            } => {
                let array =
                    self.new_symbol(*name, loc, SymbolData::GenerateBlockArray);
                scope.add_child(array);
                let count = self
                    .eval_in(env, loc, count)
                    .integer()
                    .and_then(|v| v.as_i32())
                    .unwrap_or(0)
                    .max(0);
                for i in 0..count {
                    let mut bindings = HashMap::new();
                    bindings.insert(*genvar, ConstantValue::int32(i));
                    let block = self.new_symbol(
                        *name,
                        loc,
                        SymbolData::GenerateBlock {
                            is_instantiated: true,
                            bindings: bindings.clone(),
                        },
                    );
                    array.add_child(block);
                    let mut block_env = env.clone();
                    block_env.insert(*genvar, ConstantValue::int32(i));
                    self.build_members(block, members, &mut block_env);
                }
                return Some(array);
            }
            M::DefParam { path, value } => self.new_symbol(
                intern(""),
                loc,
                SymbolData::DefParam {
                    path: path.clone(),
                    value: LazyExpr::new(value.clone()),
                    target: Lazy::new(),
                },
            ),
            M::Bind(directive) => {
                // Bind directives are not owned by the symbol tree; they are
                // noted as discovered when the enclosing body is built.
                self.note_bind(directive.id);
                return None;
            }
            M::Class {
                name,
                base_ctor,
                members,
            } => {
                let class = self.new_symbol(
                    *name,
                    loc,
                    SymbolData::ClassType {
                        base_ctor: lazy(base_ctor),
                        is_invalid: false,
                    },
                );
                scope.add_child(class);
                let mut class_env = env.clone();
                self.build_members(class, members, &mut class_env);
                return Some(class);
            }
            M::GenericClass {
                name,
                params,
                members,
            } => {
                let generic = self.new_symbol(
                    *name,
                    loc,
                    SymbolData::GenericClassDef {
                        params: params.clone(),
                        members: members.clone(),
                        specializations: RefCell::new(Vec::new()),
                        spec_keys: RefCell::new(HashMap::new()),
                        invalid: Cell::new(None),
                    },
                );
                self.generic_classes.borrow_mut().insert(*name, generic);
                generic
            }
            M::Subroutine {
                name,
                flags,
                members,
            } => {
                let sub =
                    self.new_symbol(*name, loc, SymbolData::Subroutine { flags: *flags });
                scope.add_child(sub);
                let mut sub_env = env.clone();
                self.build_members(sub, members, &mut sub_env);
                return Some(sub);
            }
            M::MethodPrototype {
                name,
                flags,
                subroutine,
            } => {
                let proto = self.new_symbol(
                    *name,
                    loc,
                    SymbolData::MethodPrototype {
                        flags: *flags,
                        subroutine: Cell::new(None),
                    },
                );
                scope.add_child(proto);
                if let Some(sub_member) = subroutine {
                    let mut sub_env = env.clone();
                    if let Some(sub) = self.build_member(proto, sub_member, &mut sub_env) {
                        if let SymbolData::MethodPrototype { subroutine, .. } = &proto.data {
                            subroutine.set(Some(sub));
                        }
                    }
                }
                return Some(proto);
            }
            M::Covergroup {
                name,
                event,
                options,
                members,
            } => {
                let group = self.new_symbol(
                    *name,
                    loc,
                    SymbolData::Covergroup {
                        event: lazy(event),
                        options: lazies(options),
                    },
                );
                scope.add_child(group);
                let mut group_env = env.clone();
                self.build_members(group, members, &mut group_env);
                return Some(group);
            }
            M::Coverpoint {
                name,
                iff,
                options,
                members,
            } => {
                let point = self.new_symbol(
                    *name,
                    loc,
                    SymbolData::Coverpoint {
                        iff: lazy(iff),
                        options: lazies(options),
                    },
                );
                scope.add_child(point);
                let mut point_env = env.clone();
                self.build_members(point, members, &mut point_env);
                return Some(point);
            }
            M::CoverCross { name, iff, options } => self.new_symbol(
                *name,
                loc,
                SymbolData::CoverCross {
                    iff: lazy(iff),
                    options: lazies(options),
                },
            ),
            M::CoverageBin { name, values } => self.new_symbol(
                *name,
                loc,
                SymbolData::CoverageBin {
                    values: lazies(values),
                },
            ),
            M::ClockingBlock {
                name,
                event,
                input_skew,
                output_skew,
            } => self.new_symbol(
                *name,
                loc,
                SymbolData::ClockingBlock {
                    event: lazy(event),
                    input_skew: lazy(input_skew),
                    output_skew: lazy(output_skew),
                },
            ),
            M::Sequence { name, expr } => self.new_symbol(
                *name,
                loc,
                SymbolData::Sequence {
                    default_instance: LazyExpr::new(expr.clone()),
                },
            ),
            M::Property { name, expr } => self.new_symbol(
                *name,
                loc,
                SymbolData::Property {
                    default_instance: LazyExpr::new(expr.clone()),
                },
            ),
            M::LetDecl { name, expr } => self.new_symbol(
                *name,
                loc,
                SymbolData::LetDecl {
                    default_instance: LazyExpr::new(expr.clone()),
                },
            ),
            M::RandSeqProduction { name, rules } => self.new_symbol(
                *name,
                loc,
                SymbolData::RandSeqProduction {
                    rules: lazies(rules),
                },
            ),
            M::TimingPath { terminal, delay } => self.new_symbol(
                *terminal,
                loc,
                SymbolData::TimingPath {
                    terminal: *terminal,
                    delay: lazy(delay),
                },
            ),
            M::PulseStyle { terminal } => self.new_symbol(
                *terminal,
                loc,
                SymbolData::PulseStyle {
                    terminal: *terminal,
                },
            ),
            M::SystemTimingCheck { name, args } => self.new_symbol(
                *name,
                loc,
                SymbolData::SystemTimingCheck { args: lazies(args) },
            ),
            M::ConstraintBlock { name, constraints } => self.new_symbol(
                *name,
                loc,
                SymbolData::ConstraintBlock {
                    constraints: lazies(constraints),
                },
            ),
            M::ElabSystemTask { kind, message } => self.new_symbol(
                intern(""),
                loc,
                SymbolData::ElabSystemTask {
                    kind: *kind,
                    message: *message,
                },
            ),
            M::ExplicitImport { package, item } => self.new_symbol(
                *item,
                loc,
                SymbolData::ExplicitImport {
                    package: *package,
                    item: *item,
                    imported: Lazy::new(),
                },
            ),
            M::WildcardImport { package } => self.new_symbol(
                *package,
                loc,
                SymbolData::WildcardImport {
                    package: *package,
                    package_sym: Lazy::new(),
                },
            ),
            M::Attributed { attrs, member } => {
                let sym = self.build_member(scope, member, env)?;
                let attrs = attrs
                    .iter()
                    .map(|(name, expr)| Attribute {
                        name: *name,
                        value: LazyExpr::new(expr.clone()),
                    })
                    .collect();
                self.attributes.borrow_mut().insert(sym.id, Rc::new(attrs));
                return Some(sym);
            }
        };
        scope.add_child(sym);
        Some(sym)
    }

    /// The attributes attached to a symbol.
    pub fn get_attributes(&self, id: SymbolId) -> Option<Rc<Vec<Attribute>>> {
        self.attributes.borrow().get(&id).cloned()
    }

    /// The frozen parameter environment visible at a symbol: the parameters
    /// of the enclosing bodies, the genvar bindings of the enclosing
    /// generate blocks, and the resolved parameters of every scope on the
    /// way up, with inner scopes shadowing outer ones.
    pub fn param_env_of(&self, sym: &'a Symbol<'a>) -> HashMap<Name, ConstantValue> {
        let mut chain = Vec::new();
        let mut cur = Some(sym);
        while let Some(s) = cur {
            chain.push(s);
            cur = s.parent.get();
        }
        let mut env = HashMap::new();
        for s in chain.iter().rev() {
            match &s.data {
                SymbolData::InstanceBody { params, .. } => env.extend(params.clone()),
                SymbolData::GenerateBlock { bindings, .. } => env.extend(bindings.clone()),
                _ => {}
            }
            for child in s.children.borrow().iter() {
                if let SymbolData::Parameter { value } = &child.data {
                    if let Some(v) = value.get() {
                        env.insert(child.name, v);
                    }
                }
            }
        }
        env
    }

    // ------------------------------------------------------------------
    // Generic class specializations

    /// Force the specialization of a generic class for the given positional
    /// argument values, creating it on first request. The specialization set
    /// grows monotonically within a compilation.
    pub fn request_specialization(
        &self,
        class: Name,
        args: Vec<ConstantValue>,
        loc: Location,
    ) -> Option<&'a Symbol<'a>> {
        let generic = match self.generic_classes.borrow().get(&class).copied() {
            Some(generic) => generic,
            None => {
                self.add_diag(Diagnostic::new(DiagCode::ExpressionNotConstant, loc));
                return None;
            }
        };
        Some(self.specialize(generic, args))
    }

    fn specialize(&self, generic: &'a Symbol<'a>, args: Vec<ConstantValue>) -> &'a Symbol<'a> {
        let (params, members) = match &generic.data {
            SymbolData::GenericClassDef {
                params, members, ..
            } => (params.clone(), members.clone()),
            _ => unreachable!("specialize on non-generic symbol"),
        };

        // Bind the parameters positionally, falling back to defaults.
        let mut env = HashMap::new();
        let mut key = Vec::new();
        for (i, (pname, default)) in params.iter().enumerate() {
            let value = match args.get(i) {
                Some(value) => value.clone(),
                None => self.eval_in(&env, generic.loc, default),
            };
            key.push(value.key());
            env.insert(*pname, value);
        }

        if let SymbolData::GenericClassDef { spec_keys, .. } = &generic.data {
            if let Some(&spec) = spec_keys.borrow().get(&key) {
                return spec;
            }
        }
        debug!("specializing generic class `{}`", generic.name);
        let spec = self.new_symbol(
            generic.name,
            generic.loc,
            SymbolData::ClassType {
                base_ctor: None,
                is_invalid: false,
            },
        );
        // Specializations hang off the generic's scope but are not members
        // of it; only the finalization fixpoint visits them.
        spec.parent.set(generic.parent.get());
        if let SymbolData::GenericClassDef {
            spec_keys,
            specializations,
            ..
        } = &generic.data
        {
            spec_keys.borrow_mut().insert(key, spec);
            specializations.borrow_mut().push(spec);
        }
        for (pname, default) in &params {
            let psym = self.new_symbol(
                *pname,
                generic.loc,
                SymbolData::Parameter {
                    value: LazyExpr::resolved(default.clone(), env[pname].clone()),
                },
            );
            spec.add_child(psym);
        }
        let mut spec_env = env;
        self.build_members(spec, &members, &mut spec_env);
        spec
    }

    /// The synthetic specialization used to surface parameter-independent
    /// diagnostics of a generic class that was never specialized.
    pub fn invalid_specialization(&self, generic: &'a Symbol<'a>) -> &'a Symbol<'a> {
        let (params, members, cached) = match &generic.data {
            SymbolData::GenericClassDef {
                params,
                members,
                invalid,
                ..
            } => (params.clone(), members.clone(), invalid),
            _ => unreachable!("invalid_specialization on non-generic symbol"),
        };
        if let Some(spec) = cached.get() {
            return spec;
        }
        let spec = self.new_symbol(
            generic.name,
            generic.loc,
            SymbolData::ClassType {
                base_ctor: None,
                is_invalid: true,
            },
        );
        spec.parent.set(generic.parent.get());
        cached.set(Some(spec));
        let mut env = HashMap::new();
        for (pname, default) in &params {
            env.insert(*pname, ConstantValue::Unassigned);
            let psym = self.new_symbol(
                *pname,
                generic.loc,
                SymbolData::Parameter {
                    value: LazyExpr::resolved(default.clone(), ConstantValue::Unassigned),
                },
            );
            spec.add_child(psym);
        }
        self.build_members(spec, &members, &mut env);
        spec
    }

    /// The number of specializations a generic class has received.
    pub fn num_specializations(&self, generic: &'a Symbol<'a>) -> usize {
        match &generic.data {
            SymbolData::GenericClassDef { specializations, .. } => {
                specializations.borrow().len()
            }
            _ => 0,
        }
    }

    // ------------------------------------------------------------------
    // Hierarchical resolution

    /// Resolve a hierarchical path from the root, looking through instances
    /// into their bodies.
    pub fn resolve_hierarchical(&self, path: &[Name]) -> Option<&'a Symbol<'a>> {
        let mut cur = self.root;
        for &segment in path {
            let scope = match cur.data {
                SymbolData::Instance { .. } => self.body_of(cur)?,
                _ => cur,
            };
            cur = scope.find_child(segment)?;
        }
        Some(cur)
    }

    // ------------------------------------------------------------------
    // Bind directives

    pub fn note_bind(&self, id: u32) {
        let mut found = self.bind_found.borrow_mut();
        if !found.contains(&id) {
            trace!("discovered bind directive {}", id);
            found.push(id);
        }
    }

    pub fn binds_expected(&self) -> usize {
        self.bind_expected.get()
    }

    pub fn binds_found(&self) -> Vec<u32> {
        self.bind_found.borrow().clone()
    }

    pub fn num_binds_found(&self) -> usize {
        self.bind_found.borrow().len()
    }

    // ------------------------------------------------------------------
    // Drivers

    /// Elaborate the whole design: touch every node so that all lazy
    /// members are realized and every diagnostic is reported.
    pub fn elaborate(&self) -> ElabResult<'a> {
        let mut visitor = DiagnosticVisitor::new(self);
        visitor.visit(self.root);
        visitor.finalize();
        visitor.into_result()
    }

    /// Collect `defparam` bindings level by level: run the defparam
    /// traversal at increasing generate levels until a pass makes no
    /// further progress, forcing target and value of everything found.
    pub fn collect_defparams(&self) -> Vec<DefParamPass<'a>> {
        let mut passes: Vec<DefParamPass> = Vec::new();
        let mut level = 0;
        loop {
            let mut visitor =
                DefParamVisitor::new(self, self.options.max_instance_depth, level);
            visitor.visit(self.root);
            if let Some(inst) = visitor.hierarchy_problem {
                self.add_diag(
                    Diagnostic::new(DiagCode::MaxInstanceDepthExceeded, inst.loc)
                        .arg(self.definition_kind_str(inst))
                        .arg(self.options.max_instance_depth),
                );
                break;
            }
            for &dp in &visitor.found {
                self.force_defparam(dp);
            }
            let num_blocks_seen = visitor.num_blocks_seen;
            let done = passes
                .last()
                .map_or(false, |prev| num_blocks_seen <= prev.num_blocks_seen);
            passes.push(DefParamPass {
                level,
                found: visitor.found,
                num_blocks_seen,
            });
            if done {
                break;
            }
            level += 1;
        }
        passes
    }

    fn definition_kind_str(&self, inst: &'a Symbol<'a>) -> &'static str {
        match &inst.data {
            SymbolData::Instance { definition, .. } => self.definition_kind(*definition).as_str(),
            _ => "module",
        }
    }

    /// Force the target resolution and value of a defparam symbol.
    pub fn force_defparam(&self, dp: &'a Symbol<'a>) {
        if let SymbolData::DefParam {
            path,
            value,
            target,
        } = &dp.data
        {
            target.force_with(|| self.resolve_hierarchical(path));
            let env = self.param_env_of(dp);
            let mut cx = EvalContext::for_compilation(self, env, dp.loc);
            value.force(&mut cx);
        }
    }

    /// Run the bind traversal, forcing instance bodies until all expected
    /// bind directives have been discovered.
    pub fn collect_binds(&self) -> BindResult {
        let mut visitor = BindVisitor::new(self, self.binds_expected());
        visitor.visit(self.root);
        BindResult {
            found: self.binds_found(),
            errored: visitor.errored,
        }
    }
}

/// Count the bind directives anywhere in a member tree.
fn count_binds(members: &[ast::Member]) -> usize {
    use ast::Member as M;
    members
        .iter()
        .map(|m| match m {
            M::Bind(_) => 1,
            M::GenerateIf {
                then_members,
                else_members,
                ..
            } => count_binds(then_members) + count_binds(else_members),
            M::GenerateFor { members, .. } => count_binds(members),
            M::Class { members, .. }
            | M::GenericClass { members, .. }
            | M::Subroutine { members, .. }
            | M::Covergroup { members, .. }
            | M::Coverpoint { members, .. } => count_binds(members),
            M::Attributed { member, .. } => count_binds(std::slice::from_ref(member)),
            _ => 0,
        })
        .sum()
}
