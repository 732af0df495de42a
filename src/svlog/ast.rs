// Copyright (c) 2016-2021 Fabian Schuiki

//! The syntax the parser collaborator hands to the core: definition
//! templates whose members are instantiated into symbols during body
//! construction. These nodes carry no behavior of their own.

use crate::common::name::Name;
use crate::eval::Expr;
use crate::symbols::{MethodFlags, Type};

/// The kind of a definition.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DefinitionKind {
    Module,
    Interface,
    Program,
    Primitive,
}

impl DefinitionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DefinitionKind::Module => "module",
            DefinitionKind::Interface => "interface",
            DefinitionKind::Program => "program",
            DefinitionKind::Primitive => "primitive",
        }
    }
}

/// A module/interface/program/primitive declaration with unresolved
/// parameters and ports.
#[derive(Clone, Debug)]
pub struct Definition {
    pub name: Name,
    pub kind: DefinitionKind,
    pub members: Vec<Member>,
}

impl Definition {
    pub fn new(name: Name, kind: DefinitionKind, members: Vec<Member>) -> Definition {
        Definition {
            name,
            kind,
            members,
        }
    }
}

/// A `bind` directive announcing the injection of an instantiation into a
/// target scope. Discovered by the bind traversal; identity is the id the
/// parser assigned.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BindDirective {
    pub id: u32,
    pub target: Name,
}

/// The severity of an elaboration-time system task.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ElabTaskKind {
    Error,
    Warning,
}

/// A port connection on an instance.
#[derive(Clone, Debug)]
pub struct PortConnection {
    pub port: Name,
    pub expr: Option<Expr>,
}

/// A member of a definition, package, generate block, or class body.
#[derive(Clone, Debug)]
pub enum Member {
    Parameter {
        name: Name,
        init: Expr,
    },
    EnumValue {
        name: Name,
        init: Expr,
    },
    Specparam {
        name: Name,
        init: Expr,
        path_source: Option<Expr>,
    },
    Port {
        name: Name,
        ty: Type,
        init: Option<Expr>,
    },
    MultiPort {
        name: Name,
        ty: Type,
    },
    InterfacePort {
        name: Name,
        interface_def: Option<Name>,
        modport: Option<Name>,
        /// The name of the sibling instance the port is connected to.
        connection: Option<Name>,
    },
    Modport {
        name: Name,
        exports: bool,
    },
    Net {
        name: Name,
        ty: Type,
        delay: Option<Expr>,
        init: Option<Expr>,
    },
    NetType {
        name: Name,
        data_type: Type,
        resolution: Option<Expr>,
    },
    ContinuousAssign {
        assign: Expr,
        delay: Option<Expr>,
    },
    Instance {
        name: Name,
        target: Name,
        overrides: Vec<(Name, Expr)>,
        connections: Vec<PortConnection>,
    },
    PrimitiveInstance {
        name: Name,
        connections: Vec<Expr>,
        delay: Option<Expr>,
    },
    GenerateIf {
        name: Name,
        cond: Expr,
        then_members: Vec<Member>,
        else_members: Vec<Member>,
    },
    GenerateFor {
        name: Name,
        genvar: Name,
        count: Expr,
        members: Vec<Member>,
    },
    DefParam {
        path: Vec<Name>,
        value: Expr,
    },
    Bind(BindDirective),
    Class {
        name: Name,
        base_ctor: Option<Expr>,
        members: Vec<Member>,
    },
    GenericClass {
        name: Name,
        params: Vec<(Name, Expr)>,
        members: Vec<Member>,
    },
    Subroutine {
        name: Name,
        flags: MethodFlags,
        members: Vec<Member>,
    },
    MethodPrototype {
        name: Name,
        flags: MethodFlags,
        subroutine: Option<Box<Member>>,
    },
    Covergroup {
        name: Name,
        event: Option<Expr>,
        options: Vec<Expr>,
        members: Vec<Member>,
    },
    Coverpoint {
        name: Name,
        iff: Option<Expr>,
        options: Vec<Expr>,
        members: Vec<Member>,
    },
    CoverCross {
        name: Name,
        iff: Option<Expr>,
        options: Vec<Expr>,
    },
    CoverageBin {
        name: Name,
        values: Vec<Expr>,
    },
    ClockingBlock {
        name: Name,
        event: Option<Expr>,
        input_skew: Option<Expr>,
        output_skew: Option<Expr>,
    },
    Sequence {
        name: Name,
        expr: Expr,
    },
    Property {
        name: Name,
        expr: Expr,
    },
    LetDecl {
        name: Name,
        expr: Expr,
    },
    RandSeqProduction {
        name: Name,
        rules: Vec<Expr>,
    },
    TimingPath {
        terminal: Name,
        delay: Option<Expr>,
    },
    PulseStyle {
        terminal: Name,
    },
    SystemTimingCheck {
        name: Name,
        args: Vec<Expr>,
    },
    ConstraintBlock {
        name: Name,
        constraints: Vec<Expr>,
    },
    ElabSystemTask {
        kind: ElabTaskKind,
        message: Name,
    },
    ExplicitImport {
        package: Name,
        item: Name,
    },
    WildcardImport {
        package: Name,
    },
    /// Attributes attached to the wrapped member.
    Attributed {
        attrs: Vec<(Name, Expr)>,
        member: Box<Member>,
    },
}
