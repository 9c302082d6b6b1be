use tracing::trace;

use crate::{
    symbols::symbols::SymId,
    types::{
        builder::{FieldSpec, FuncTypeExpr},
        types::{Field, TypeId, TypeKind},
    },
    Position,
};

use super::{
    binder::{Binder, FuncStackEnt},
    decl::{Class, DeclId, DeclOp, FuncId, Pragma},
};

impl Binder {
    /// Enters the header of `func`: switches to function-local declarations,
    /// opens the function scope and declares the receiver, parameters and
    /// results.
    pub fn funchdr(&mut self, func: FuncId) {
        let mark = self.symbols.push_scope();
        self.func_stack.push(FuncStackEnt {
            curfn: self.curfn,
            dclcontext: self.dclcontext,
            mark,
        });
        self.curfn = Some(func);
        self.dclcontext = Class::Auto;

        if let Some(mut signature) = self.func_mut(func).ntype.take() {
            self.funcargs(&mut signature);
            self.func_mut(func).ntype = Some(signature);
        } else if let Some(ty) = self.func(func).ty {
            self.funcargs2(ty);
        } else {
            FATAL!("funchdr: function {:?} has neither a signature nor a type", func);
        }
        trace!("enter {}", self.func_name(func));
    }

    /// Declares the parameters of a parsed signature.
    ///
    /// Generation numbers 1..=n go to the n results, so parameters continue
    /// after them. Results without a name become `~r<i>` and blank results
    /// `~b<i>`, `i` counting from the number of parameters.
    pub fn funcargs(&mut self, signature: &mut FuncTypeExpr) {
        self.vargen = signature.results.len() as u32;

        if let Some(receiver) = signature.receiver.as_mut() {
            self.funcarg(receiver, Class::Param);
        }
        for param in signature.params.iter_mut() {
            self.funcarg(param, Class::Param);
        }

        let saved = self.vargen;
        self.vargen = 0;

        let mut gen = signature.params.len() as u32;
        for result in signature.results.iter_mut() {
            match result.name {
                None => {
                    result.name = Some(self.symbols.lookup_n(self.local_pkg, "~r", gen));
                    gen += 1;
                }
                Some(sym) if self.symbols.is_blank(sym) => {
                    result.name = Some(self.symbols.lookup_n(self.local_pkg, "~b", gen));
                    gen += 1;
                }
                Some(_) => {}
            }
            self.funcarg(result, Class::ParamOut);
        }

        self.vargen = saved;
    }

    fn funcarg(&mut self, spec: &mut FieldSpec, class: Class) {
        let Some(sym) = spec.name else {
            return;
        };
        let decl = self.new_name(sym, spec.pos.clone());
        let d = self.decl_mut(decl);
        d.ntype = Some(spec.ty.clone());
        d.ddd = spec.ddd;
        spec.nname = Some(decl);

        self.declare(decl, class);
        self.vargen += 1;
        let vargen = self.vargen;
        self.decl_mut(decl).vargen = vargen;
    }

    /// Declares the parameters of a function known only by its type, such as
    /// an imported function.
    pub fn funcargs2(&mut self, ty: TypeId) {
        let Some(signature) = self.types.func_type(ty).cloned() else {
            FATAL!("funcargs2: {} is not a function type", self.type_string(ty));
        };
        let receiver = self.funcargs2_group(signature.receiver, Class::Param);
        let params = self.funcargs2_group(signature.params, Class::Param);
        let results = self.funcargs2_group(signature.results, Class::ParamOut);

        if let TypeKind::Func(func) = &mut self.types.get_mut(ty).kind {
            func.receiver = receiver;
            func.params = params;
            func.results = results;
        }
    }

    fn funcargs2_group(&mut self, mut fields: Vec<Field>, class: Class) -> Vec<Field> {
        for field in fields.iter_mut() {
            let Some(sym) = field.sym else {
                continue;
            };
            let decl = self.new_name(sym, field.pos.clone());
            let d = self.decl_mut(decl);
            d.ty = Some(field.ty);
            d.ddd = field.ddd;
            field.nname = Some(decl);
            self.declare(decl, class);
        }
        fields
    }

    /// Leaves the function entered by the matching [`Binder::funchdr`].
    pub fn funcbody(&mut self) {
        if self.dclcontext != Class::Auto {
            FATAL!("funcbody: unexpected declaration context {:?}", self.dclcontext);
        }
        let Some(entry) = self.func_stack.pop() else {
            FATAL!("funcbody: no function to leave");
        };
        self.symbols.pop_scope(entry.mark);
        self.curfn = entry.curfn;
        self.dclcontext = entry.dclcontext;
    }

    /// Marks a fresh name node as naming a function.
    pub fn set_name_func(&mut self, decl: DeclId) {
        let d = self.decl(decl);
        if d.op != DeclOp::Name || d.class != Class::Unresolved {
            FATAL!("set_name_func: expected fresh name, got {:?} {:?}", d.op, d.class);
        }
        let sym = d.sym;
        self.decl_mut(decl).class = Class::Func;
        if let Some(sym) = sym {
            self.symbols.set_func(sym);
        }
    }

    /// Creates a compiler-generated function `sym` with the given signature
    /// and enters its header. The caller emits the body and closes it with
    /// [`Binder::funcbody`].
    pub fn dclfunc(&mut self, sym: SymId, signature: FuncTypeExpr, pos: Position) -> FuncId {
        let func = self.new_func(pos.clone());
        let nname = self.newfuncname(pos, sym, func);
        self.func_mut(func).ntype = Some(signature);
        self.declare(nname, Class::Func);
        self.enter_signature(func, nname);
        func
    }

    /// Starts a function declared in source. Methods are not bound in the
    /// package block; they are registered with their receiver type instead.
    pub fn func_decl(
        &mut self,
        sym: SymId,
        signature: FuncTypeExpr,
        pragma: Pragma,
        pos: Position,
    ) -> FuncId {
        let func = self.new_func(pos.clone());
        let nname = self.newfuncname(pos, sym, func);
        let is_method = signature.receiver.is_some();
        let f = self.func_mut(func);
        f.ntype = Some(signature);
        f.pragma = pragma;

        if is_method {
            self.set_name_func(nname);
        } else {
            self.declare(nname, Class::Func);
        }
        self.enter_signature(func, nname);
        func
    }

    /// Starts a function literal inside the current function.
    pub fn closure_decl(&mut self, signature: FuncTypeExpr, pos: Position) -> FuncId {
        let Some(outer) = self.curfn else {
            FATAL!("{}: function literal outside function", pos);
        };
        self.func_mut(outer).closgen += 1;
        let gen = self.func(outer).closgen;
        let name = match self.func(outer).outer {
            None => format!("{}.func{}", self.func_name(outer), gen),
            Some(_) => format!("{}.{}", self.func_name(outer), gen),
        };
        let sym = self.symbols.lookup(self.local_pkg, &name);

        let func = self.new_func(pos.clone());
        let nname = self.newfuncname(pos, sym, func);
        self.set_name_func(nname);
        let f = self.func_mut(func);
        f.outer = Some(outer);
        f.ntype = Some(signature);
        self.enter_signature(func, nname);
        func
    }

    fn enter_signature(&mut self, func: FuncId, nname: DeclId) {
        self.funchdr(func);
        let Some(signature) = self.func(func).ntype.clone() else {
            FATAL!("enter_signature: {:?} lost its signature", func);
        };
        let ty = self.functype(&signature);
        let sym = self.decl(nname).sym;
        self.decl_mut(nname).ty = Some(ty);
        let f = self.func_mut(func);
        f.ty = Some(ty);
        f.lsym = sym;
    }
}
