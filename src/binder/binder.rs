use parking_lot::Mutex;

use crate::{
    config::Config,
    errors::errors::{Diagnostics, Error, ErrorImpl},
    symbols::symbols::{PkgId, ScopeMark, SymId, SymbolTable},
    types::types::{BasicKind, TypeArena, TypeId, TypeKind, BUILTIN_PATH},
    Position,
};

use super::decl::{CallArg, CallSite, Class, Decl, DeclId, DeclOp, Func, FuncId};

/// Saved declaration context of the function being left behind by
/// `funchdr`, restored by `funcbody`.
#[derive(Debug)]
pub(crate) struct FuncStackEnt {
    pub(crate) curfn: Option<FuncId>,
    pub(crate) dclcontext: Class,
    pub(crate) mark: ScopeMark,
}

/// The declaration-processing state of one compilation.
#[derive(Debug)]
pub struct Binder {
    pub config: Config,
    pub symbols: SymbolTable,
    pub types: TypeArena,
    pub decls: Vec<Decl>,
    pub funcs: Vec<Func>,
    /// Package-level declarations, in declaration order, for code generation.
    pub externdcl: Vec<DeclId>,
    pub diagnostics: Diagnostics,

    pub local_pkg: PkgId,
    /// Pseudo-package qualifying methods of anonymous receiver types.
    pub go_pkg: PkgId,
    pub builtin_pkg: PkgId,
    pub unsafe_pkg: PkgId,
    pub runtime_pkg: PkgId,

    /// Declarations are being read from export data.
    pub in_import: bool,
    /// Type checking of top-level declarations has finished; compiler
    /// generated code may declare names of other packages from here on.
    pub typecheck_done: bool,

    pub fake_recv_type: TypeId,
    pub empty_interface: TypeId,
    pub invalid_type: TypeId,

    pub(crate) curfn: Option<FuncId>,
    pub(crate) dclcontext: Class,
    pub(crate) func_stack: Vec<FuncStackEnt>,
    pub(crate) vargen: u32,
    pub(crate) typegen: u32,
    pub(crate) unresolved: Vec<DeclId>,
    pub(crate) pending_layout: Vec<TypeId>,
    pub(crate) funcsyms: Mutex<Vec<SymId>>,
}

impl Binder {
    pub fn new(config: Config) -> Self {
        let mut symbols = SymbolTable::new();
        let local_pkg = symbols.add_package(&config.package_path, &config.package_name);
        let go_pkg = symbols.add_package("go", "go");
        let builtin_pkg = symbols.add_package(BUILTIN_PATH, "");
        let unsafe_pkg = symbols.add_package("unsafe", "unsafe");
        let runtime_pkg = match symbols.find_package(&config.runtime_path) {
            Some(pkg) => pkg,
            None => symbols.add_package(&config.runtime_path, "runtime"),
        };

        let mut types = TypeArena::new();
        let fake_recv_type = types.new_type(TypeKind::FakeRecv);
        let empty_interface = types.new_type(TypeKind::Interface(vec![]));
        let invalid_type = types.new_type(TypeKind::Invalid);

        let mut binder = Binder {
            config,
            symbols,
            types,
            decls: vec![],
            funcs: vec![],
            externdcl: vec![],
            diagnostics: Diagnostics::new(),
            local_pkg,
            go_pkg,
            builtin_pkg,
            unsafe_pkg,
            runtime_pkg,
            in_import: false,
            typecheck_done: false,
            fake_recv_type,
            empty_interface,
            invalid_type,
            curfn: None,
            dclcontext: Class::Extern,
            func_stack: vec![],
            vargen: 0,
            typegen: 0,
            unresolved: vec![],
            pending_layout: vec![],
            funcsyms: Mutex::new(vec![]),
        };
        binder.declare_predeclared();
        binder
    }

    fn declare_predeclared(&mut self) {
        let basics = [
            BasicKind::Int,
            BasicKind::Int64,
            BasicKind::Float64,
            BasicKind::Bool,
            BasicKind::String,
        ];
        for kind in basics {
            let sym = self.symbols.lookup(self.builtin_pkg, kind.name());
            self.predeclare_type(sym, TypeKind::Basic(kind));
        }

        let sym = self.symbols.lookup(self.unsafe_pkg, "Pointer");
        self.predeclare_type(sym, TypeKind::UnsafePointer);
    }

    fn predeclare_type(&mut self, sym: SymId, kind: TypeKind) {
        let ty = self.types.new_named(sym, kind);
        let decl = self.new_decl(Some(sym), DeclOp::Type, Position::null());
        let d = self.decl_mut(decl);
        d.class = Class::Extern;
        d.ty = Some(ty);
        self.symbols.bind_imported(sym, decl);
    }

    /// Looks up `name` in the package being compiled.
    pub fn lookup(&self, name: &str) -> SymId {
        self.symbols.lookup(self.local_pkg, name)
    }

    /// The predeclared type called `name`, e.g. `int`.
    pub fn predeclared(&self, name: &str) -> Option<TypeId> {
        let pkg = if name == "unsafe.Pointer" {
            self.unsafe_pkg
        } else {
            self.builtin_pkg
        };
        let name = name.trim_start_matches("unsafe.");
        let sym = self.symbols.lookup(pkg, name);
        self.symbols.def(sym).and_then(|d| self.decl(d).ty)
    }

    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()]
    }

    pub fn decl_mut(&mut self, id: DeclId) -> &mut Decl {
        &mut self.decls[id.index()]
    }

    pub fn func(&self, id: FuncId) -> &Func {
        &self.funcs[id.index()]
    }

    pub fn func_mut(&mut self, id: FuncId) -> &mut Func {
        &mut self.funcs[id.index()]
    }

    pub fn curfn(&self) -> Option<FuncId> {
        self.curfn
    }

    pub fn dclcontext(&self) -> Class {
        self.dclcontext
    }

    pub fn vargen(&self) -> u32 {
        self.vargen
    }

    pub fn typegen(&self) -> u32 {
        self.typegen
    }

    pub fn new_decl(&mut self, sym: Option<SymId>, op: DeclOp, pos: Position) -> DeclId {
        let id = DeclId::from_index(self.decls.len());
        self.decls.push(Decl::new(sym, op, pos));
        id
    }

    /// A name node owned by the current function.
    pub fn new_name(&mut self, sym: SymId, pos: Position) -> DeclId {
        let id = self.new_decl(Some(sym), DeclOp::Name, pos);
        self.decl_mut(id).curfn = self.curfn;
        id
    }

    /// A name node for a name about to be declared; the caller settles its
    /// op.
    pub fn dclname(&mut self, sym: SymId, pos: Position) -> DeclId {
        let id = self.new_name(sym, pos);
        self.decl_mut(id).op = DeclOp::NoName;
        id
    }

    /// A placeholder for a reference to a name not declared (yet).
    pub fn newnoname(&mut self, sym: SymId, pos: Position) -> DeclId {
        self.new_decl(Some(sym), DeclOp::NoName, pos)
    }

    pub fn new_func(&mut self, pos: Position) -> FuncId {
        let id = FuncId::from_index(self.funcs.len());
        self.funcs.push(Func {
            pos,
            ..Default::default()
        });
        id
    }

    /// Creates the name node of `func`.
    pub fn newfuncname(&mut self, pos: Position, sym: SymId, func: FuncId) -> DeclId {
        if self.func(func).nname.is_some() {
            FATAL!("newfuncname: function {:?} already has a name", func);
        }
        let id = self.new_decl(Some(sym), DeclOp::Name, pos);
        self.decl_mut(id).func = Some(func);
        self.func_mut(func).nname = Some(id);
        id
    }

    /// Outermost function enclosing `func` (itself for top-level functions).
    pub fn top_level(&self, mut func: FuncId) -> FuncId {
        while let Some(outer) = self.func(func).outer {
            func = outer;
        }
        func
    }

    pub fn sym_name(&self, sym: SymId) -> String {
        self.symbols.name(sym).to_string()
    }

    /// Name of the declaration, or `_` for anonymous nodes.
    pub fn decl_name(&self, decl: DeclId) -> String {
        match self.decl(decl).sym {
            Some(sym) => self.sym_name(sym),
            None => String::from("_"),
        }
    }

    pub fn func_name(&self, func: FuncId) -> String {
        match self.func(func).nname {
            Some(nname) => self.decl_name(nname),
            None => String::from("<func>"),
        }
    }

    pub fn type_string(&self, ty: TypeId) -> String {
        self.types.type_string(&self.symbols, self.local_pkg, ty)
    }

    /// Records the first operation in `func` that needs a write barrier.
    pub fn mark_write_barrier(&mut self, func: FuncId, pos: Position) {
        let func = self.func_mut(func);
        if func.wb_pos.is_none() {
            func.wb_pos = Some(pos);
        }
    }

    /// Records a call in the body of `func`.
    pub fn add_call(&mut self, func: FuncId, callee: Option<DeclId>, args: Vec<CallArg>, pos: Position) {
        self.func_mut(func).calls.push(CallSite { callee, args, pos });
    }

    pub fn report(&mut self, error: Error) {
        self.diagnostics.report(error);
    }

    pub fn error(&mut self, error_impl: ErrorImpl, position: Position) {
        self.diagnostics.error(error_impl, position);
    }

    /// Structs whose layout is ready to be computed by the back end.
    pub fn take_pending_layout(&mut self) -> Vec<TypeId> {
        std::mem::take(&mut self.pending_layout)
    }

    /// Aborts if a scope or function was left open.
    pub fn check_scope_stack(&self) {
        if !self.symbols.is_valid() || !self.func_stack.is_empty() {
            FATAL!("mark left on the declaration stack");
        }
    }
}
