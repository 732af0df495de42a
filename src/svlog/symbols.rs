// Copyright (c) 2016-2021 Fabian Schuiki

//! The semantic symbol tree.
//!
//! Symbols live in an arena owned by the caller of [`Compilation`]; the tree
//! links them with non-owning references. The only owned direction is
//! parent-to-child; back-edges (parent scopes, defining generics) are plain
//! references into the arena. Derived attributes are two-state lazy cells
//! that freeze on first resolution, memoizing failures as values so that
//! diagnostic counts are stable across repeated queries.
//!
//! [`Compilation`]: crate::compilation::Compilation

use crate::ast;
use crate::common::name::Name;
use crate::common::source::Location;
use crate::eval::{EvalContext, Expr};
use crate::value::{ConstantValue, ParamKey};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;

/// A unique identity for a symbol within its compilation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SymbolId(pub u32);

/// A handle to a definition registered with the compilation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DefinitionId(pub u32);

bitflags! {
    /// Flags on subroutines and method prototypes.
    pub struct MethodFlags: u8 {
        const DPI_IMPORT = 0b01;
        const INTERFACE_EXTERN = 0b10;
    }
}

/// A declared type in the semantic model. Type checking proper is a
/// collaborator; the core only needs to force these into existence.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Type {
    Void,
    Bit,
    Byte,
    Int,
    Integer,
    Real,
    Str,
    Logic(u32),
    Named(Name),
    Error,
}

/// A two-state cell: unresolved until the first force, then frozen.
pub struct Lazy<T> {
    cell: RefCell<Option<T>>,
}

impl<T: Clone> Lazy<T> {
    pub fn new() -> Lazy<T> {
        Lazy {
            cell: RefCell::new(None),
        }
    }

    /// Whether the cell has been resolved.
    pub fn is_resolved(&self) -> bool {
        self.cell.borrow().is_some()
    }

    /// The resolved value, if any.
    pub fn get(&self) -> Option<T> {
        self.cell.borrow().clone()
    }

    /// Resolve the cell with `f` on first call; later calls return the
    /// memoized value without running `f`.
    pub fn force_with<F: FnOnce() -> T>(&self, f: F) -> T {
        if let Some(value) = &*self.cell.borrow() {
            return value.clone();
        }
        let value = f();
        *self.cell.borrow_mut() = Some(value.clone());
        value
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &*self.cell.borrow() {
            Some(value) => write!(f, "Resolved({:?})", value),
            None => write!(f, "Unresolved"),
        }
    }
}

/// An expression with its memoized constant value.
#[derive(Debug)]
pub struct LazyExpr {
    pub expr: Expr,
    cell: Lazy<ConstantValue>,
}

impl LazyExpr {
    pub fn new(expr: Expr) -> LazyExpr {
        LazyExpr {
            expr,
            cell: Lazy::new(),
        }
    }

    /// Create a cell that is already resolved, e.g. for parameters frozen at
    /// body construction.
    pub fn resolved(expr: Expr, value: ConstantValue) -> LazyExpr {
        let cell = Lazy::new();
        cell.force_with(|| value);
        LazyExpr { expr, cell }
    }

    /// Evaluate the expression on first call; later calls return the frozen
    /// value without re-evaluating (and without re-reporting).
    pub fn force(&self, cx: &mut EvalContext) -> ConstantValue {
        if let Some(value) = self.cell.get() {
            return value;
        }
        let value = cx.eval(&self.expr);
        self.cell.force_with(|| value)
    }

    pub fn is_resolved(&self) -> bool {
        self.cell.is_resolved()
    }

    /// The resolved value, if the cell has been forced.
    pub fn get(&self) -> Option<ConstantValue> {
        self.cell.get()
    }
}

/// The declared type of a symbol: the type plus its initializer, both
/// produced on first request.
#[derive(Debug)]
pub struct DeclaredType {
    ty: Type,
    ty_cell: Lazy<Type>,
    init: Option<LazyExpr>,
}

impl DeclaredType {
    pub fn new(ty: Type, init: Option<Expr>) -> DeclaredType {
        DeclaredType {
            ty,
            ty_cell: Lazy::new(),
            init: init.map(LazyExpr::new),
        }
    }

    pub fn get_type(&self) -> Type {
        self.ty_cell.force_with(|| self.ty)
    }

    pub fn get_initializer(&self, cx: &mut EvalContext) -> Option<ConstantValue> {
        self.init.as_ref().map(|init| init.force(cx))
    }
}

/// A port connection recorded on an instance.
#[derive(Debug)]
pub struct PortConnection {
    pub port: Name,
    pub expr: Option<LazyExpr>,
}

/// An attribute specification attached to a symbol.
#[derive(Debug)]
pub struct Attribute {
    pub name: Name,
    pub value: LazyExpr,
}

/// The closed set of symbol kinds.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SymbolKind {
    Root,
    CompilationUnit,
    Package,
    Instance,
    InstanceBody,
    Parameter,
    EnumValue,
    Specparam,
    Port,
    MultiPort,
    InterfacePort,
    Modport,
    Net,
    NetType,
    ContinuousAssign,
    Subroutine,
    MethodPrototype,
    ClassType,
    GenericClassDef,
    Covergroup,
    Coverpoint,
    CoverCross,
    CoverageBin,
    ClockingBlock,
    Sequence,
    Property,
    LetDecl,
    RandSeqProduction,
    TimingPath,
    PulseStyle,
    SystemTimingCheck,
    DefParam,
    ExplicitImport,
    WildcardImport,
    ElabSystemTask,
    ConstraintBlock,
    PrimitiveInstance,
    UnknownModule,
    GenerateBlock,
    GenerateBlockArray,
}

/// The kind-specific payload of a symbol.
pub enum SymbolData<'a> {
    Root,
    CompilationUnit,
    Package,
    Instance {
        definition: DefinitionId,
        overrides: Vec<(Name, Expr)>,
        connections: Vec<PortConnection>,
        body: Lazy<&'a Symbol<'a>>,
    },
    InstanceBody {
        definition: DefinitionId,
        params: HashMap<Name, ConstantValue>,
    },
    Parameter {
        value: LazyExpr,
    },
    EnumValue {
        value: LazyExpr,
    },
    Specparam {
        value: LazyExpr,
        path_source: Option<LazyExpr>,
    },
    Port,
    MultiPort,
    InterfacePort {
        interface_def: Option<DefinitionId>,
        modport: Option<Name>,
        connection: Option<Name>,
    },
    Modport {
        exports: bool,
    },
    Net {
        delay: Option<LazyExpr>,
    },
    NetType {
        data_type: Type,
        ty_cell: Lazy<Type>,
        resolution: Option<LazyExpr>,
    },
    ContinuousAssign {
        assign: LazyExpr,
        delay: Option<LazyExpr>,
    },
    Subroutine {
        flags: MethodFlags,
    },
    MethodPrototype {
        flags: MethodFlags,
        subroutine: Cell<Option<&'a Symbol<'a>>>,
    },
    ClassType {
        base_ctor: Option<LazyExpr>,
        is_invalid: bool,
    },
    GenericClassDef {
        params: Vec<(Name, Expr)>,
        members: Vec<ast::Member>,
        specializations: RefCell<Vec<&'a Symbol<'a>>>,
        spec_keys: RefCell<HashMap<ParamKey, &'a Symbol<'a>>>,
        invalid: Cell<Option<&'a Symbol<'a>>>,
    },
    Covergroup {
        event: Option<LazyExpr>,
        options: Vec<LazyExpr>,
    },
    Coverpoint {
        iff: Option<LazyExpr>,
        options: Vec<LazyExpr>,
    },
    CoverCross {
        iff: Option<LazyExpr>,
        options: Vec<LazyExpr>,
    },
    CoverageBin {
        values: Vec<LazyExpr>,
    },
    ClockingBlock {
        event: Option<LazyExpr>,
        input_skew: Option<LazyExpr>,
        output_skew: Option<LazyExpr>,
    },
    Sequence {
        default_instance: LazyExpr,
    },
    Property {
        default_instance: LazyExpr,
    },
    LetDecl {
        default_instance: LazyExpr,
    },
    RandSeqProduction {
        rules: Vec<LazyExpr>,
    },
    TimingPath {
        terminal: Name,
        delay: Option<LazyExpr>,
    },
    PulseStyle {
        terminal: Name,
    },
    SystemTimingCheck {
        args: Vec<LazyExpr>,
    },
    DefParam {
        path: Vec<Name>,
        value: LazyExpr,
        target: Lazy<Option<&'a Symbol<'a>>>,
    },
    ExplicitImport {
        package: Name,
        item: Name,
        imported: Lazy<Option<&'a Symbol<'a>>>,
    },
    WildcardImport {
        package: Name,
        package_sym: Lazy<Option<&'a Symbol<'a>>>,
    },
    ElabSystemTask {
        kind: ast::ElabTaskKind,
        message: Name,
    },
    ConstraintBlock {
        constraints: Vec<LazyExpr>,
    },
    PrimitiveInstance {
        connections: Vec<LazyExpr>,
        delay: Option<LazyExpr>,
    },
    UnknownModule {
        target: Name,
        connections: Vec<LazyExpr>,
    },
    GenerateBlock {
        is_instantiated: bool,
        bindings: HashMap<Name, ConstantValue>,
    },
    GenerateBlockArray,
}

/// A node in the semantic tree.
pub struct Symbol<'a> {
    pub id: SymbolId,
    pub name: Name,
    pub loc: Location,
    pub parent: Cell<Option<&'a Symbol<'a>>>,
    pub children: RefCell<Vec<&'a Symbol<'a>>>,
    pub decl_type: Option<DeclaredType>,
    pub data: SymbolData<'a>,
}

impl<'a> Symbol<'a> {
    pub fn new(id: SymbolId, name: Name, loc: Location, data: SymbolData<'a>) -> Symbol<'a> {
        Symbol {
            id,
            name,
            loc,
            parent: Cell::new(None),
            children: RefCell::new(Vec::new()),
            decl_type: None,
            data,
        }
    }

    pub fn with_decl_type(mut self, decl_type: DeclaredType) -> Symbol<'a> {
        self.decl_type = Some(decl_type);
        self
    }

    /// The kind of this symbol, derived from its payload.
    pub fn kind(&self) -> SymbolKind {
        match self.data {
            SymbolData::Root => SymbolKind::Root,
            SymbolData::CompilationUnit => SymbolKind::CompilationUnit,
            SymbolData::Package => SymbolKind::Package,
            SymbolData::Instance { .. } => SymbolKind::Instance,
            SymbolData::InstanceBody { .. } => SymbolKind::InstanceBody,
            SymbolData::Parameter { .. } => SymbolKind::Parameter,
            SymbolData::EnumValue { .. } => SymbolKind::EnumValue,
            SymbolData::Specparam { .. } => SymbolKind::Specparam,
            SymbolData::Port => SymbolKind::Port,
            SymbolData::MultiPort => SymbolKind::MultiPort,
            SymbolData::InterfacePort { .. } => SymbolKind::InterfacePort,
            SymbolData::Modport { .. } => SymbolKind::Modport,
            SymbolData::Net { .. } => SymbolKind::Net,
            SymbolData::NetType { .. } => SymbolKind::NetType,
            SymbolData::ContinuousAssign { .. } => SymbolKind::ContinuousAssign,
            SymbolData::Subroutine { .. } => SymbolKind::Subroutine,
            SymbolData::MethodPrototype { .. } => SymbolKind::MethodPrototype,
            SymbolData::ClassType { .. } => SymbolKind::ClassType,
            SymbolData::GenericClassDef { .. } => SymbolKind::GenericClassDef,
            SymbolData::Covergroup { .. } => SymbolKind::Covergroup,
            SymbolData::Coverpoint { .. } => SymbolKind::Coverpoint,
            SymbolData::CoverCross { .. } => SymbolKind::CoverCross,
            SymbolData::CoverageBin { .. } => SymbolKind::CoverageBin,
            SymbolData::ClockingBlock { .. } => SymbolKind::ClockingBlock,
            SymbolData::Sequence { .. } => SymbolKind::Sequence,
            SymbolData::Property { .. } => SymbolKind::Property,
            SymbolData::LetDecl { .. } => SymbolKind::LetDecl,
            SymbolData::RandSeqProduction { .. } => SymbolKind::RandSeqProduction,
            SymbolData::TimingPath { .. } => SymbolKind::TimingPath,
            SymbolData::PulseStyle { .. } => SymbolKind::PulseStyle,
            SymbolData::SystemTimingCheck { .. } => SymbolKind::SystemTimingCheck,
            SymbolData::DefParam { .. } => SymbolKind::DefParam,
            SymbolData::ExplicitImport { .. } => SymbolKind::ExplicitImport,
            SymbolData::WildcardImport { .. } => SymbolKind::WildcardImport,
            SymbolData::ElabSystemTask { .. } => SymbolKind::ElabSystemTask,
            SymbolData::ConstraintBlock { .. } => SymbolKind::ConstraintBlock,
            SymbolData::PrimitiveInstance { .. } => SymbolKind::PrimitiveInstance,
            SymbolData::UnknownModule { .. } => SymbolKind::UnknownModule,
            SymbolData::GenerateBlock { .. } => SymbolKind::GenerateBlock,
            SymbolData::GenerateBlockArray => SymbolKind::GenerateBlockArray,
        }
    }

    /// Append a child and set its parent back-edge.
    pub fn add_child(&'a self, child: &'a Symbol<'a>) {
        child.parent.set(Some(self));
        self.children.borrow_mut().push(child);
    }

    /// A snapshot of the child list.
    pub fn child_list(&self) -> Vec<&'a Symbol<'a>> {
        self.children.borrow().clone()
    }

    /// Find a direct child by name.
    pub fn find_child(&self, name: Name) -> Option<&'a Symbol<'a>> {
        self.children.borrow().iter().find(|c| c.name == name).copied()
    }
}

impl<'a> fmt::Debug for Symbol<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}({:?} `{}`)", self.kind(), self.id, self.name)
    }
}
