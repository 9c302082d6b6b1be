use tracing::trace;

use crate::{
    errors::errors::{ErrorImpl, PreviousDecl},
    symbols::symbols::SymId,
    types::{
        builder::{FieldSpec, TypeExpr},
        types::{TypeId, TypeKind},
    },
    Position,
};

use super::{
    binder::Binder,
    decl::{Class, DeclId, DeclOp},
};

/// Initialization produced by a `var` declaration.
#[derive(Debug, Clone)]
pub enum Init<E> {
    /// Declaration of a function local.
    Dcl(DeclId),
    /// `name = value`; without a value the variable is zeroed.
    Assign { name: DeclId, value: Option<E> },
    /// `a, b = f()`.
    AssignTuple { names: Vec<DeclId>, value: E },
}

/// Left operand of `:=`.
#[derive(Debug, Clone)]
pub enum ColasTarget {
    Name { sym: SymId, pos: Position },
    /// Anything else the parser found, in source form.
    Other(String),
}

impl Binder {
    /// Declares `decl` in the current block with storage class `class`.
    pub fn declare(&mut self, decl: DeclId, class: Class) {
        let Some(sym) = self.decl(decl).sym else {
            return;
        };
        if self.symbols.is_blank(sym) {
            return;
        }

        let pos = self.decl(decl).pos.clone();
        let name = self.sym_name(sym);
        if !self.in_import && !self.typecheck_done && self.symbols.pkg(sym) != self.local_pkg {
            self.error(ErrorImpl::CannotDeclareName { name: name.clone() }, pos.clone());
        }

        let mut gen = 0;
        if class == Class::Extern {
            if name == "init" || (name == "main" && self.config.package_name == "main") {
                self.error(ErrorImpl::ReservedFuncName { name: name.clone() }, pos.clone());
            }
            self.externdcl.push(decl);
        } else {
            if self.curfn.is_none() && class == Class::Auto {
                FATAL!("{}: automatic {} outside function", pos, name);
            }
            if let Some(curfn) = self.curfn {
                if class != Class::Func {
                    self.func_mut(curfn).dcl.push(decl);
                }
            }

            let op = self.decl(decl).op;
            if op == DeclOp::Type {
                self.typegen += 1;
                gen = self.typegen;
            } else if op == DeclOp::Name && class == Class::Auto && !name.contains('·') {
                self.vargen += 1;
                gen = self.vargen;
            }

            self.symbols.push_decl(sym);
            self.decl_mut(decl).curfn = self.curfn;
        }

        // Duplicate parameters are reported once, by the signature builder.
        let binding = self.symbols.binding(sym);
        if binding.block == self.symbols.current_block()
            && class != Class::Param
            && class != Class::ParamOut
        {
            self.redeclare(sym, &binding.last_pos, pos.clone());
        }

        self.symbols.bind(sym, decl, pos);
        let d = self.decl_mut(decl);
        d.vargen = gen;
        d.class = class;
        if class == Class::Func {
            self.symbols.set_func(sym);
        }
        trace!("declare {} as {:?} in block {}", name, class, self.symbols.current_block());
    }

    fn redeclare(&mut self, sym: SymId, last_pos: &Position, pos: Position) {
        let previous = if last_pos.is_known() {
            PreviousDecl::At(last_pos.clone())
        } else {
            let pkg = self.symbols.pkg(sym);
            PreviousDecl::Import(self.symbols.package(pkg).path.clone())
        };
        let name = self.sym_name(sym);
        self.error(ErrorImpl::RedeclaredInBlock { name, previous }, pos);
    }

    /// Declares a variable whose type is already known.
    pub fn addvar(&mut self, decl: DeclId, ty: TypeId, class: Class) {
        let d = self.decl(decl);
        if d.sym.is_none() || !matches!(d.op, DeclOp::Name | DeclOp::NoName) {
            FATAL!("addvar: {:?} is not a name", decl);
        }
        self.decl_mut(decl).op = DeclOp::Name;
        self.declare(decl, class);
        self.decl_mut(decl).ty = Some(ty);
    }

    /// Declares the names of a `var` spec and pairs them with their values.
    pub fn variter<E>(&mut self, names: &[DeclId], ty: Option<TypeExpr>, values: Vec<E>) -> Vec<Init<E>> {
        let mut init = vec![];
        let class = self.dclcontext;

        if values.len() == 1 && names.len() > 1 {
            for &name in names {
                self.decl_mut(name).op = DeclOp::Name;
                self.declare(name, class);
                self.decl_mut(name).ntype = ty.clone();
                if self.curfn.is_some() {
                    init.push(Init::Dcl(name));
                }
            }
            if let Some(value) = values.into_iter().next() {
                init.push(Init::AssignTuple {
                    names: names.to_vec(),
                    value,
                });
            }
            return init;
        }

        let expected = values.len();
        let has_values = !values.is_empty();
        let mut values = values.into_iter();
        let mut mismatch = false;

        for &name in names {
            let mut value = None;
            if has_values {
                match values.next() {
                    Some(v) => value = Some(v),
                    None => {
                        mismatch = true;
                        break;
                    }
                }
            }

            self.decl_mut(name).op = DeclOp::Name;
            self.declare(name, class);
            self.decl_mut(name).ntype = ty.clone();

            let blank = self.decl(name).sym.is_some_and(|s| self.symbols.is_blank(s));
            if value.is_some() || self.curfn.is_some() || blank {
                if self.curfn.is_some() {
                    init.push(Init::Dcl(name));
                }
                init.push(Init::Assign { name, value });
            }
        }

        if mismatch || values.next().is_some() {
            let pos = names
                .first()
                .map(|&n| self.decl(n).pos.clone())
                .unwrap_or_default();
            self.error(
                ErrorImpl::AssignmentMismatch {
                    variables: names.len(),
                    values: expected,
                },
                pos,
            );
        }
        init
    }

    /// Declares a constant.
    pub fn constdcl(&mut self, sym: SymId, pos: Position, ty: Option<TypeExpr>) -> DeclId {
        let decl = self.new_decl(Some(sym), DeclOp::Const, pos);
        let class = self.dclcontext;
        self.declare(decl, class);
        self.decl_mut(decl).ntype = ty;
        decl
    }

    /// Declares a defined type whose underlying type is filled in later by
    /// [`Binder::define_type`].
    pub fn declare_type(&mut self, sym: SymId, pos: Position) -> (DeclId, TypeId) {
        let ty = self.types.new_named(sym, TypeKind::Forward { embed_pos: None });
        let decl = self.new_decl(Some(sym), DeclOp::Type, pos);
        self.decl_mut(decl).ty = Some(ty);
        let class = self.dclcontext;
        self.declare(decl, class);
        (decl, ty)
    }

    pub fn define_type(&mut self, decl: DeclId, underlying: &TypeExpr) -> TypeId {
        let Some(named) = self.decl(decl).ty else {
            FATAL!("define_type: {:?} has no type", decl);
        };
        let ty = self.resolve_type_expr(underlying);
        self.types.set_underlying(named, ty);
        self.decl_mut(decl).ntype = Some(underlying.clone());
        named
    }

    /// Declares the left side of `a, b := ...`. Returns, per operand, the
    /// declaration it now denotes.
    pub fn colasdefn(&mut self, left: &[ColasTarget], pos: Position) -> Vec<Option<DeclId>> {
        for target in left {
            if let ColasTarget::Name { sym, .. } = target {
                self.symbols.set_uniq(*sym, true);
            }
        }

        let mut result = vec![None; left.len()];
        let mut nnew = 0;
        let mut nerr = 0;

        for (i, target) in left.iter().enumerate() {
            let (sym, name_pos) = match target {
                ColasTarget::Name { sym, pos } => (*sym, pos.clone()),
                ColasTarget::Other(expr) => {
                    self.error(ErrorImpl::NonNameOnLeft { expr: expr.clone() }, pos.clone());
                    nerr += 1;
                    continue;
                }
            };
            if self.symbols.is_blank(sym) {
                continue;
            }
            if !self.symbols.uniq(sym) {
                let name = self.sym_name(sym);
                self.error(ErrorImpl::RepeatedOnLeft { name }, pos.clone());
                nerr += 1;
                continue;
            }
            self.symbols.set_uniq(sym, false);

            if self.symbols.binding(sym).block == self.symbols.current_block() {
                result[i] = self.symbols.def(sym);
                continue;
            }

            nnew += 1;
            let decl = self.new_name(sym, name_pos);
            let class = self.dclcontext;
            self.declare(decl, class);
            result[i] = Some(decl);
        }

        for target in left {
            if let ColasTarget::Name { sym, .. } = target {
                self.symbols.set_uniq(*sym, false);
            }
        }

        if nnew == 0 && nerr == 0 {
            self.error(ErrorImpl::NoNewVariables, pos);
        }
        result
    }

    /// Checks the name of an interface method.
    pub fn ifacedcl(&mut self, spec: &FieldSpec) {
        let Some(sym) = spec.name else {
            FATAL!("ifacedcl: embedded entry at {}", spec.pos);
        };
        if self.symbols.is_blank(sym) {
            self.error(ErrorImpl::BlankInterfaceMethod, spec.pos.clone());
        }
    }
}
