use bitflags::bitflags;
use indexmap::IndexMap;

use crate::{
    symbols::symbols::SymId,
    types::{builder::FuncTypeExpr, builder::TypeExpr, types::TypeId},
    Position,
};

MK_ID!(DeclId);
MK_ID!(FuncId);

/// What a declaration node names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclOp {
    /// A variable, parameter or function name.
    Name,
    /// A name that has not been resolved (yet).
    NoName,
    Type,
    Const,
}

/// Storage class of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    /// Not assigned yet.
    Unresolved,
    /// Package level.
    Extern,
    /// Function local.
    Auto,
    /// Function local that lives on the heap, e.g. a captured variable.
    AutoHeap,
    Param,
    /// Named or synthesized result.
    ParamOut,
    Func,
}

/// A bound name: variable, constant, type or function.
#[derive(Debug, Clone)]
pub struct Decl {
    pub sym: Option<SymId>,
    pub op: DeclOp,
    pub class: Class,
    pub ty: Option<TypeId>,
    /// Type expression written in the declaration, if any.
    pub ntype: Option<TypeExpr>,
    pub pos: Position,
    /// Function this declaration belongs to; `None` at package level.
    pub curfn: Option<FuncId>,
    /// Generation number: variables and types declared inside functions,
    /// and parameters by position.
    pub vargen: u32,
    pub ddd: bool,
    pub closure_var: bool,
    /// For closure variables, the outer declaration being captured.
    pub origin: Option<DeclId>,
    /// For closure variables, the capture of the same declaration in the
    /// nearest enclosing function that has one.
    pub outer: Option<DeclId>,
    /// For function names, the function.
    pub func: Option<FuncId>,
    /// For unresolved placeholders, what the final pass resolved them to.
    pub target: Option<DeclId>,
    /// A diagnostic has been reported against this node.
    pub diag: bool,
}

impl Decl {
    pub fn new(sym: Option<SymId>, op: DeclOp, pos: Position) -> Self {
        Decl {
            sym,
            op,
            class: Class::Unresolved,
            ty: None,
            ntype: None,
            pos,
            curfn: None,
            vargen: 0,
            ddd: false,
            closure_var: false,
            origin: None,
            outer: None,
            func: None,
            target: None,
            diag: false,
        }
    }
}

bitflags! {
    /// Compiler directives attached to a function.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pragma: u16 {
        /// The function itself must not contain write barriers.
        const NOWRITEBARRIER = 1 << 0;
        /// Neither the function nor anything it calls may contain write barriers.
        const NOWRITEBARRIERREC = 1 << 1;
        /// Stops a recursive write-barrier restriction from flowing in.
        const YESWRITEBARRIERREC = 1 << 2;
    }
}

/// An argument of a call site, as far as the write-barrier pre-pass cares.
#[derive(Debug, Clone)]
pub enum CallArg {
    Name(DeclId),
    Closure(FuncId),
    Other(String),
}

/// A call appearing in a function body.
#[derive(Debug, Clone)]
pub struct CallSite {
    /// Declaration of the called name, when the callee is a plain name.
    pub callee: Option<DeclId>,
    pub args: Vec<CallArg>,
    pub pos: Position,
}

/// A function or closure.
#[derive(Debug, Clone, Default)]
pub struct Func {
    pub nname: Option<DeclId>,
    /// Signature as parsed; absent for functions built from a type.
    pub ntype: Option<FuncTypeExpr>,
    pub ty: Option<TypeId>,
    pub pos: Position,
    /// Enclosing function of a closure.
    pub outer: Option<FuncId>,
    /// Non-function declarations made inside the body, in order.
    pub dcl: Vec<DeclId>,
    /// Captured outer declarations, keyed by the declaration captured.
    pub closure_vars: IndexMap<DeclId, DeclId>,
    /// Closures created inside this function so far.
    pub closgen: u32,
    pub pragma: Pragma,
    /// First operation in the body that needs a write barrier.
    pub wb_pos: Option<Position>,
    /// Linker symbol the back end refers to this function by.
    pub lsym: Option<SymId>,
    pub calls: Vec<CallSite>,
}
