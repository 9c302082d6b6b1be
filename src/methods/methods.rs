use lazy_static::lazy_static;
use regex::Regex;
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::{
    binder::{
        binder::Binder,
        decl::{DeclId, FuncId},
    },
    errors::errors::{ErrorImpl, ReceiverProblem},
    symbols::symbols::{is_exported, SymId},
    types::types::{TypeId, TypeKind},
    Position,
};

lazy_static! {
    /// Symbol suffixes must not continue the method name.
    static ref SUFFIX: Regex = Regex::new(r"^[^\p{L}\p{N}.]")
        .unwrap_or_else(|e| FATAL!("method symbol suffix pattern: {}", e));

    /// Runtime pseudo-functions that never get a function value.
    static ref INTRINSICS: FxHashSet<&'static str> =
        ["getg", "getclosureptr", "getcallerpc", "getcallersp"].into_iter().collect();
}

/// One entry of a base type's method table.
#[derive(Debug, Clone)]
pub struct Method {
    pub sym: SymId,
    /// Linker-level name, see [`Binder::method_sym`].
    pub lsym: SymId,
    /// Full signature, receiver included.
    pub ty: TypeId,
    pub pos: Position,
    /// The method does not count towards satisfying interfaces.
    pub nointerface: bool,
    pub nname: Option<DeclId>,
}

/// Stable address of a method table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId {
    pub base: TypeId,
    pub index: u32,
}

impl Binder {
    /// The type a receiver of type `ty` attaches methods to, or `None` when
    /// methods cannot be declared on it.
    pub fn methtype(&self, ty: TypeId) -> Option<TypeId> {
        let mut ty = ty;
        if self.types.is_ptr(ty) {
            if self.types.sym(ty).is_some() {
                return None;
            }
            ty = self.types.elem(ty)?;
        }

        if self.types.sym(ty).is_none() && !self.types.is_struct(ty) {
            return None;
        }
        match self.types.get(ty).kind {
            TypeKind::Basic(_) | TypeKind::Struct(_) | TypeKind::Func(_) | TypeKind::Slice(_) => {
                Some(ty)
            }
            _ => None,
        }
    }

    /// Registers the method `msym` of signature `ty`, declared by `func`.
    ///
    /// Registering the same method again returns the existing entry; that is
    /// what happens when declarations are processed in several passes.
    pub fn add_method(
        &mut self,
        func: FuncId,
        msym: SymId,
        ty: TypeId,
        local: bool,
        nointerface: bool,
    ) -> Option<MethodId> {
        let pos = self.func(func).pos.clone();
        let Some(recv) = self.types.recv(ty).map(|r| r.ty) else {
            self.error(ErrorImpl::MissingReceiver, pos);
            return None;
        };

        let methtype = self
            .methtype(recv)
            .and_then(|base| self.types.sym(base).map(|sym| (base, sym)));
        let Some((base, base_sym)) = methtype else {
            self.invalid_receiver(recv, pos);
            return None;
        };

        if local && self.symbols.pkg(base_sym) != self.local_pkg {
            let type_ = self.type_string(base);
            self.error(ErrorImpl::NonLocalMethodBase { type_ }, pos);
            return None;
        }

        if self.symbols.is_blank(msym) {
            return None;
        }

        if let TypeKind::Struct(fields) = &mut self.types.get_mut(base).kind {
            if let Some(field) = fields.iter_mut().find(|f| f.sym == Some(msym)) {
                field.broken = true;
                let type_ = self.type_string(base);
                let name = self.sym_name(msym);
                self.error(ErrorImpl::FieldMethodCollision { type_, name }, pos);
                return None;
            }
        }

        let name = self.symbols.name(msym);
        let existing = self
            .types
            .get(base)
            .methods
            .iter()
            .position(|m| self.symbols.name(m.sym) == name);
        if let Some(index) = existing {
            let previous = self.types.get(base).methods[index].ty;
            if !self.same_method_signature(previous, ty) {
                let error = ErrorImpl::MethodRedeclared {
                    type_: self.type_string(base),
                    name: name.to_string(),
                    previous: self.type_string(previous),
                    current: self.type_string(ty),
                };
                self.error(error, pos);
            }
            return Some(MethodId {
                base,
                index: index as u32,
            });
        }

        let lsym = self.method_sym(recv, msym);
        let nname = self.func(func).nname;
        self.func_mut(func).lsym = Some(lsym);

        let methods = &mut self.types.get_mut(base).methods;
        methods.push(Method {
            sym: msym,
            lsym,
            ty,
            pos,
            nointerface,
            nname,
        });
        let id = MethodId {
            base,
            index: (methods.len() - 1) as u32,
        };
        debug!(
            "method {} added to {}",
            self.sym_name(lsym),
            self.type_string(base)
        );
        Some(id)
    }

    fn invalid_receiver(&mut self, recv: TypeId, pos: Position) {
        let receiver = self.type_string(recv);
        let mut base = recv;
        if self.types.is_ptr(base) {
            if self.types.sym(base).is_some() {
                let problem = ReceiverProblem::Pointer;
                let base = receiver.clone();
                self.error(ErrorImpl::InvalidReceiverType { receiver, base, problem }, pos);
                return;
            }
            if let Some(elem) = self.types.elem(base) {
                base = elem;
            }
        }

        // A broken base has been complained about already.
        if self.types.is_broken(base) {
            return;
        }
        let problem = if self.types.sym(base).is_none() {
            ReceiverProblem::NotDefined
        } else if self.types.is_ptr(base) {
            ReceiverProblem::Pointer
        } else if self.types.is_interface(base) {
            ReceiverProblem::Interface
        } else {
            ReceiverProblem::Unsupported
        };
        let base = self.type_string(base);
        self.error(ErrorImpl::InvalidReceiverType { receiver, base, problem }, pos);
    }

    /// Identity of two method signatures, receivers included.
    fn same_method_signature(&self, a: TypeId, b: TypeId) -> bool {
        if !self.types.identical(a, b) {
            return false;
        }
        match (self.types.recv(a), self.types.recv(b)) {
            (Some(x), Some(y)) => self.types.identical(x.ty, y.ty),
            _ => false,
        }
    }

    /// Methods registered on `ty`, in declaration order.
    pub fn methods_of(&self, ty: TypeId) -> &[Method] {
        &self.types.get(ty).methods
    }

    pub fn method(&self, id: MethodId) -> &Method {
        &self.types.get(id.base).methods[id.index as usize]
    }

    /// The linker-level symbol of method `msym` on receiver type `recv`.
    pub fn method_sym(&self, recv: TypeId, msym: SymId) -> SymId {
        self.method_sym_suffix(recv, msym, "")
    }

    /// Like [`Binder::method_sym`], with `suffix` appended to tell apart
    /// variants of the same method. Safe to call from concurrent back-end
    /// workers.
    ///
    /// `T.m` names a value method and `(*T).m` a pointer method. An
    /// unexported method declared in another package than its receiver
    /// type also carries that package's prefix, so it cannot collide with
    /// a same-named method of the receiver's own package.
    pub fn method_sym_suffix(&self, recv: TypeId, msym: SymId, suffix: &str) -> SymId {
        if self.symbols.is_blank(msym) {
            FATAL!("method_sym: blank method name");
        }
        if !suffix.is_empty() && !SUFFIX.is_match(suffix) {
            FATAL!("method_sym: invalid symbol suffix {:?}", suffix);
        }

        let is_ptr = self.types.is_ptr(recv);
        let mut rsym = self.types.sym(recv);
        if is_ptr {
            if rsym.is_some() {
                FATAL!("method_sym: declared pointer receiver type {}", self.type_string(recv));
            }
            rsym = self.types.elem(recv).and_then(|elem| self.types.sym(elem));
        }

        let rpkg = match rsym {
            Some(sym) => self.symbols.pkg(sym),
            None => self.go_pkg,
        };

        let recv_name = self.types.type_string(&self.symbols, rpkg, recv);
        let mut name = if is_ptr {
            format!("({})", recv_name)
        } else {
            recv_name
        };

        let mname = self.symbols.name(msym);
        let mpkg = self.symbols.pkg(msym);
        if !is_exported(&mname) && mpkg != rpkg {
            name.push('.');
            name.push_str(&self.symbols.package(mpkg).prefix);
        }
        name.push('.');
        name.push_str(&mname);
        name.push_str(suffix);

        self.symbols.lookup(rpkg, &name)
    }

    /// The symbol of the function value of `sym`, `name·f`. Safe to call
    /// from concurrent back-end workers.
    pub fn funcsym(&self, sym: SymId) -> SymId {
        let pkg = self.symbols.pkg(sym);
        let name = format!("{}·f", self.symbols.name(sym));

        // One lock covers the lookup and recording the new symbol.
        let mut funcsyms = self.funcsyms.lock();
        let (fsym, existed) = self.symbols.lookup_ok(pkg, &name);
        if !self.config.dynlink && !existed {
            funcsyms.push(sym);
        }
        fsym
    }

    /// Requests the function value symbol of `sym` explicitly, as needed
    /// when linking dynamically.
    pub fn makefuncsym(&self, sym: SymId) {
        if !self.config.dynlink {
            FATAL!("makefuncsym: dynamic linking is off");
        }
        if self.symbols.is_blank(sym) {
            return;
        }
        if self.config.is_runtime_package() && INTRINSICS.contains(&*self.symbols.name(sym)) {
            return;
        }

        let pkg = self.symbols.pkg(sym);
        let name = format!("{}·f", self.symbols.name(sym));
        let mut funcsyms = self.funcsyms.lock();
        let (_, existed) = self.symbols.lookup_ok(pkg, &name);
        if !existed {
            funcsyms.push(sym);
        }
    }

    /// Functions whose function value symbol has been requested, in order.
    pub fn funcsyms(&self) -> Vec<SymId> {
        self.funcsyms.lock().clone()
    }
}
