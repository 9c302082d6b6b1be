use rustc_hash::FxHashSet;
use tracing::trace;

use crate::{
    binder::{binder::Binder, decl::DeclId},
    errors::errors::{Error, ErrorImpl},
    symbols::symbols::SymId,
    Position,
};

use super::types::{Field, FuncType, TypeId, TypeKind};

/// A parsed type expression, as handed over by the parser.
#[derive(Debug, Clone)]
pub enum TypeExpr {
    /// An already built type.
    Type(TypeId),
    Name { sym: SymId, pos: Position },
    Pointer(Box<TypeExpr>),
    Slice(Box<TypeExpr>),
    Struct(Vec<FieldSpec>),
    Interface(Vec<FieldSpec>),
    Func(Box<FuncTypeExpr>),
}

impl TypeExpr {
    pub fn name(sym: SymId, pos: Position) -> Self {
        TypeExpr::Name { sym, pos }
    }

    pub fn pointer(elem: TypeExpr) -> Self {
        TypeExpr::Pointer(Box::new(elem))
    }

    pub fn slice(elem: TypeExpr) -> Self {
        TypeExpr::Slice(Box::new(elem))
    }

    pub fn func(func: FuncTypeExpr) -> Self {
        TypeExpr::Func(Box::new(func))
    }
}

/// One entry of a parsed struct, interface or parameter list.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// `None` for embedded fields and unnamed parameters.
    pub name: Option<SymId>,
    pub ty: TypeExpr,
    pub pos: Position,
    pub tag: Option<String>,
    pub embedded: bool,
    /// Variadic parameter.
    pub ddd: bool,
    /// Declaration bound to a parameter or result, set by `funcargs`.
    pub nname: Option<DeclId>,
}

impl FieldSpec {
    pub fn new(pos: Position, name: Option<SymId>, ty: TypeExpr) -> Self {
        FieldSpec {
            name,
            ty,
            pos,
            tag: None,
            embedded: false,
            ddd: false,
            nname: None,
        }
    }

    pub fn embedded(pos: Position, ty: TypeExpr) -> Self {
        FieldSpec {
            embedded: true,
            ..FieldSpec::new(pos, None, ty)
        }
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_string());
        self
    }

    pub fn variadic(mut self) -> Self {
        self.ddd = true;
        self
    }
}

/// A parsed function signature.
#[derive(Debug, Clone, Default)]
pub struct FuncTypeExpr {
    pub receiver: Option<FieldSpec>,
    pub params: Vec<FieldSpec>,
    pub results: Vec<FieldSpec>,
}

impl Binder {
    /// Builds the field for one struct entry or parameter.
    pub fn structfield(&mut self, spec: &FieldSpec) -> Field {
        let ty = self.resolve_type_expr(&spec.ty);

        let mut field = Field::new(spec.pos.clone(), spec.name, ty);
        field.note = spec.tag.clone();
        field.embedded = spec.embedded;
        field.ddd = spec.ddd;

        if spec.embedded {
            if field.sym.is_none() {
                field.sym = self.embedded_sym(ty);
            }
            if let Err(error) = self.check_embedded_type(ty, &spec.pos) {
                self.report(error);
            }
        }

        if self.types.is_broken(ty) {
            field.broken = true;
        }
        field
    }

    /// The name an embedded field is known by: the name of its type, seen
    /// through one pointer.
    fn embedded_sym(&self, ty: TypeId) -> Option<SymId> {
        match self.types.sym(ty) {
            Some(sym) => Some(sym),
            None => self.types.elem(ty).and_then(|elem| self.types.sym(elem)),
        }
    }

    /// Validates the type of an embedded field. A still undefined type
    /// remembers the first place it was embedded.
    pub fn check_embedded_type(&mut self, ty: TypeId, pos: &Position) -> Result<(), Error> {
        let mut ty = ty;
        if self.types.sym(ty).is_none() && self.types.is_ptr(ty) {
            if let Some(elem) = self.types.elem(ty) {
                ty = elem;
            }
            if self.types.is_interface(ty) {
                return Err(Error::new(ErrorImpl::EmbeddedPointerToInterface, pos.clone()));
            }
        }

        if self.types.is_ptr(ty) || self.types.is_unsafe_ptr(ty) {
            return Err(Error::new(ErrorImpl::EmbeddedPointerType, pos.clone()));
        }

        if let TypeKind::Forward { embed_pos } = &mut self.types.get_mut(ty).kind {
            if embed_pos.is_none() {
                *embed_pos = Some(pos.clone());
            }
        }
        Ok(())
    }

    /// Reports every repeated non-blank name across `lists`, at the later
    /// occurrence.
    pub fn check_dup_fields(&mut self, what: &'static str, lists: &[&[Field]]) {
        let mut seen: FxHashSet<SymId> = FxHashSet::default();
        let mut duplicates = vec![];

        for field in lists.iter().flat_map(|list| list.iter()) {
            let Some(sym) = field.sym else {
                continue;
            };
            if self.symbols.is_blank(sym) {
                continue;
            }
            if !seen.insert(sym) {
                duplicates.push((sym, field.pos.clone()));
            }
        }

        for (sym, pos) in duplicates {
            let name = self.sym_name(sym);
            self.error(ErrorImpl::DuplicateMember { what, name }, pos);
        }
    }

    /// Builds a struct type from its parsed fields.
    pub fn tostruct(&mut self, specs: &[FieldSpec]) -> TypeId {
        let fields: Vec<Field> = specs.iter().map(|spec| self.structfield(spec)).collect();
        self.check_dup_fields("field", &[&fields]);

        let broken = fields.iter().any(|f| f.broken);
        let id = self.types.new_type(TypeKind::Struct(fields));
        if broken {
            self.types.get_mut(id).broken = true;
        } else {
            self.pending_layout.push(id);
        }
        trace!("built struct {:?}, broken: {}", id, broken);
        id
    }

    /// Builds one receiver, parameter or result group, giving each bound
    /// parameter declaration its type.
    pub fn tofunargs(&mut self, specs: &[FieldSpec]) -> Vec<Field> {
        let mut fields = Vec::with_capacity(specs.len());
        for spec in specs {
            let mut field = self.structfield(spec);
            if let Some(nname) = spec.nname {
                let decl = self.decl_mut(nname);
                decl.ty = Some(field.ty);
                decl.ddd = spec.ddd;
                field.nname = Some(nname);
            }
            fields.push(field);
        }
        fields
    }

    /// Builds one entry of an interface type: a method or an embedded type.
    pub fn interfacefield(&mut self, spec: &FieldSpec) -> Field {
        if spec.tag.is_some() {
            self.error(ErrorImpl::InvalidInterfaceAnnotation, spec.pos.clone());
        }

        if spec.name.is_none() {
            let ty = self.resolve_type_expr(&spec.ty);
            let mut field = Field::new(spec.pos.clone(), self.types.sym(ty), ty);
            field.embedded = true;
            field.broken = self.types.is_broken(ty);
            return field;
        }

        self.ifacedcl(spec);
        let TypeExpr::Func(signature) = &spec.ty else {
            FATAL!("interfacefield: method {:?} without a signature", spec.name);
        };
        let params = self.tofunargs(&signature.params);
        let results = self.tofunargs(&signature.results);
        let receiver = self.fake_recv_field();
        let ty = self.functypefield(Some(receiver), params, results);

        let mut field = Field::new(spec.pos.clone(), spec.name, ty);
        field.broken = self.types.is_broken(ty);
        field
    }

    /// Builds an interface type. Every empty interface is the same
    /// descriptor.
    pub fn tointerface(&mut self, specs: &[FieldSpec]) -> TypeId {
        if specs.is_empty() {
            return self.empty_interface;
        }

        let fields: Vec<Field> = specs.iter().map(|spec| self.interfacefield(spec)).collect();
        let methods: Vec<Field> = fields.iter().filter(|f| !f.embedded).cloned().collect();
        self.check_dup_fields("method", &[&methods]);

        let broken = fields.iter().any(|f| f.broken);
        let id = self.types.new_type(TypeKind::Interface(fields));
        self.types.get_mut(id).broken = broken;
        id
    }

    /// The receiver slot of interface method signatures.
    pub fn fake_recv_field(&self) -> Field {
        Field::new(Position::null(), None, self.fake_recv_type)
    }

    /// Reports whether `ty` is the signature of an interface method.
    pub fn is_iface_method(&self, ty: TypeId) -> bool {
        self.types
            .recv(ty)
            .is_some_and(|recv| recv.ty == self.fake_recv_type)
    }

    /// Builds a function type from a parsed signature.
    pub fn functype(&mut self, signature: &FuncTypeExpr) -> TypeId {
        let receiver = signature
            .receiver
            .as_ref()
            .and_then(|recv| self.tofunargs(std::slice::from_ref(recv)).pop());
        let params = self.tofunargs(&signature.params);
        let results = self.tofunargs(&signature.results);
        self.functypefield(receiver, params, results)
    }

    /// Builds a function type from already built fields.
    pub fn functypefield(
        &mut self,
        receiver: Option<Field>,
        params: Vec<Field>,
        results: Vec<Field>,
    ) -> TypeId {
        let receiver: Vec<Field> = receiver.into_iter().collect();
        self.check_dup_fields("argument", &[&receiver, &params, &results]);

        for field in receiver.iter().chain(&params).chain(&results) {
            if let Some(nname) = field.nname {
                self.decl_mut(nname).ty = Some(field.ty);
            }
        }

        let broken = receiver
            .iter()
            .chain(&params)
            .chain(&results)
            .any(|f| f.broken);
        let results_named = results
            .iter()
            .any(|f| f.sym.is_some_and(|sym| !self.symbols.name(sym).starts_with("~r")));

        let id = self.types.new_type(TypeKind::Func(FuncType {
            receiver,
            params,
            results,
            results_named,
        }));
        self.types.get_mut(id).broken = broken;
        id
    }
}
