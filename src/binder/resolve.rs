use tracing::debug;

use crate::{
    errors::errors::ErrorImpl,
    symbols::symbols::{is_exported, PkgId, SymId},
    types::{builder::TypeExpr, types::TypeId},
    Position,
};

use super::{
    binder::Binder,
    decl::{Class, DeclId, DeclOp, FuncId},
};

impl Binder {
    /// Declaration currently visible under `sym`, falling back to the
    /// predeclared names for symbols of the local package.
    pub fn lookup_def(&self, sym: SymId) -> Option<DeclId> {
        if let Some(def) = self.symbols.def(sym) {
            return Some(def);
        }
        if self.symbols.pkg(sym) != self.local_pkg {
            return None;
        }
        let universe = self.symbols.lookup(self.builtin_pkg, &self.symbols.name(sym));
        self.symbols.def(universe)
    }

    /// Resolves an identifier occurrence.
    ///
    /// Unbound names yield a placeholder that [`Binder::resolve_placeholders`]
    /// settles once every top-level declaration has been seen. A variable of
    /// an enclosing function is not returned directly: the current function
    /// gets its own closure variable for it, created on first use.
    pub fn resolve(&mut self, sym: SymId, pos: Position) -> DeclId {
        let Some(def) = self.lookup_def(sym) else {
            let placeholder = self.newnoname(sym, pos);
            self.unresolved.push(placeholder);
            return placeholder;
        };

        let (Some(curfn), Some(owner)) = (self.curfn, self.decl(def).curfn) else {
            return def;
        };
        if self.decl(def).op != DeclOp::Name || owner == curfn {
            return def;
        }

        if let Some(capture) = self.func(curfn).closure_vars.get(&def) {
            return *capture;
        }
        self.capture(curfn, def, sym, pos)
    }

    fn capture(&mut self, func: FuncId, origin: DeclId, sym: SymId, pos: Position) -> DeclId {
        let owner = self.decl(origin).curfn;
        let mut outer = None;
        let mut enclosing = self.func(func).outer;
        while let Some(f) = enclosing {
            if Some(f) == owner {
                break;
            }
            if let Some(capture) = self.func(f).closure_vars.get(&origin) {
                outer = Some(*capture);
                break;
            }
            enclosing = self.func(f).outer;
        }

        let capture = self.new_name(sym, pos);
        let ddd = self.decl(origin).ddd;
        let ty = self.decl(origin).ty;
        let c = self.decl_mut(capture);
        c.class = Class::AutoHeap;
        c.closure_var = true;
        c.ddd = ddd;
        c.ty = ty;
        c.origin = Some(origin);
        c.outer = outer;
        self.func_mut(func).closure_vars.insert(origin, capture);

        debug!(
            "{} captured by {} as {:?}",
            self.sym_name(sym),
            self.func_name(func),
            capture
        );
        capture
    }

    /// Resolves `pkg.name` written outside `pkg`.
    pub fn resolve_qualified(&mut self, pkg: PkgId, name: &str, pos: Position) -> DeclId {
        if pkg != self.local_pkg && !is_exported(name) {
            let package = self.symbols.package(pkg).name.clone();
            self.error(
                ErrorImpl::UnexportedReference {
                    package,
                    name: name.to_string(),
                },
                pos.clone(),
            );
        }
        let sym = self.symbols.lookup(pkg, name);
        self.resolve(sym, pos)
    }

    /// Binds a name brought in by an import.
    pub fn import_name(&mut self, sym: SymId, op: DeclOp, ty: Option<TypeId>) -> DeclId {
        let decl = self.new_decl(Some(sym), op, Position::null());
        let d = self.decl_mut(decl);
        d.class = Class::Extern;
        d.ty = ty;
        self.symbols.bind_imported(sym, decl);
        decl
    }

    /// Settles the placeholders created for forward references. Runs after
    /// every top-level declaration has been processed.
    pub fn resolve_placeholders(&mut self) {
        let unresolved = std::mem::take(&mut self.unresolved);
        for placeholder in unresolved {
            let Some(sym) = self.decl(placeholder).sym else {
                FATAL!("resolve_placeholders: anonymous placeholder {:?}", placeholder);
            };
            match self.lookup_def(sym) {
                Some(def) => self.decl_mut(placeholder).target = Some(def),
                None => {
                    let pos = self.decl(placeholder).pos.clone();
                    self.decl_mut(placeholder).diag = true;
                    let name = self.sym_name(sym);
                    self.error(ErrorImpl::UndefinedSymbol { name }, pos);
                }
            }
        }
    }

    /// The declaration `decl` stands for: a settled placeholder yields the
    /// declaration it was resolved to, anything else yields itself.
    pub fn resolved(&self, mut decl: DeclId) -> DeclId {
        while let Some(target) = self.decl(decl).target {
            decl = target;
        }
        decl
    }

    /// Turns a parsed type expression into a type. Failures are reported and
    /// yield the invalid type.
    pub fn resolve_type_expr(&mut self, expr: &TypeExpr) -> TypeId {
        match expr {
            TypeExpr::Type(ty) => *ty,
            TypeExpr::Name { sym, pos } => {
                let Some(def) = self.lookup_def(*sym) else {
                    let name = self.sym_name(*sym);
                    self.error(ErrorImpl::UndefinedSymbol { name }, pos.clone());
                    return self.invalid_type;
                };
                match (self.decl(def).op, self.decl(def).ty) {
                    (DeclOp::Type, Some(ty)) => ty,
                    _ => {
                        let name = self.sym_name(*sym);
                        self.error(ErrorImpl::NotAType { name }, pos.clone());
                        self.invalid_type
                    }
                }
            }
            TypeExpr::Pointer(elem) => {
                let elem = self.resolve_type_expr(elem);
                self.types.ptr_to(elem)
            }
            TypeExpr::Slice(elem) => {
                let elem = self.resolve_type_expr(elem);
                self.types.slice_of(elem)
            }
            TypeExpr::Struct(fields) => self.tostruct(fields),
            TypeExpr::Interface(fields) => self.tointerface(fields),
            TypeExpr::Func(signature) => self.functype(signature),
        }
    }
}
