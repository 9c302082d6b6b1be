use rustc_hash::FxHashMap;

use crate::{
    binder::decl::DeclId,
    methods::methods::Method,
    symbols::symbols::{PkgId, SymId, SymbolTable},
    Position,
};

MK_ID!(TypeId);

/// Import path of the package holding the predeclared types.
pub const BUILTIN_PATH: &str = "go.builtin";

/// Predeclared scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicKind {
    Int,
    Int64,
    Float64,
    Bool,
    String,
}

impl BasicKind {
    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Int => "int",
            BasicKind::Int64 => "int64",
            BasicKind::Float64 => "float64",
            BasicKind::Bool => "bool",
            BasicKind::String => "string",
        }
    }
}

/// A struct field, interface method, or receiver/parameter/result slot.
#[derive(Debug, Clone)]
pub struct Field {
    /// `None` for anonymous fields and unnamed parameters.
    pub sym: Option<SymId>,
    pub ty: TypeId,
    pub pos: Position,
    /// Struct tag.
    pub note: Option<String>,
    pub embedded: bool,
    /// Variadic parameter.
    pub ddd: bool,
    pub broken: bool,
    /// Declaration bound to this parameter inside the function body.
    pub nname: Option<DeclId>,
}

impl Field {
    pub fn new(pos: Position, sym: Option<SymId>, ty: TypeId) -> Self {
        Field {
            sym,
            ty,
            pos,
            note: None,
            embedded: false,
            ddd: false,
            broken: false,
            nname: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FuncType {
    /// Zero or one field.
    pub receiver: Vec<Field>,
    pub params: Vec<Field>,
    pub results: Vec<Field>,
    /// At least one result carries a name written in the source.
    pub results_named: bool,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    /// Result of a type expression that failed to resolve.
    Invalid,
    Basic(BasicKind),
    UnsafePointer,
    Pointer(TypeId),
    Slice(TypeId),
    Struct(Vec<Field>),
    Interface(Vec<Field>),
    Func(FuncType),
    /// A named type whose underlying type is not known yet. Remembers where
    /// it was first embedded.
    Forward { embed_pos: Option<Position> },
    /// Receiver of interface method signatures.
    FakeRecv,
}

#[derive(Debug, Clone)]
pub struct Type {
    pub kind: TypeKind,
    /// Set for defined (named) types.
    pub sym: Option<SymId>,
    /// A prior error makes layout of this type meaningless.
    pub broken: bool,
    pub methods: Vec<Method>,
}

/// Owner of every type descriptor created during compilation.
#[derive(Debug, Default)]
pub struct TypeArena {
    types: Vec<Type>,
    ptr_cache: FxHashMap<TypeId, TypeId>,
}

impl TypeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn new_type(&mut self, kind: TypeKind) -> TypeId {
        let broken = matches!(kind, TypeKind::Invalid);
        let id = TypeId::from_index(self.types.len());
        self.types.push(Type {
            kind,
            sym: None,
            broken,
            methods: vec![],
        });
        id
    }

    pub fn new_named(&mut self, sym: SymId, kind: TypeKind) -> TypeId {
        let id = self.new_type(kind);
        self.types[id.index()].sym = Some(sym);
        id
    }

    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.index()]
    }

    pub fn get_mut(&mut self, id: TypeId) -> &mut Type {
        &mut self.types[id.index()]
    }

    /// Returns the unnamed pointer type to `elem`, creating it once.
    pub fn ptr_to(&mut self, elem: TypeId) -> TypeId {
        if let Some(ptr) = self.ptr_cache.get(&elem) {
            return *ptr;
        }
        let ptr = self.new_type(TypeKind::Pointer(elem));
        self.types[ptr.index()].broken = self.is_broken(elem);
        self.ptr_cache.insert(elem, ptr);
        ptr
    }

    pub fn slice_of(&mut self, elem: TypeId) -> TypeId {
        let slice = self.new_type(TypeKind::Slice(elem));
        self.types[slice.index()].broken = self.is_broken(elem);
        slice
    }

    /// Gives a forward-declared named type its underlying structure.
    pub fn set_underlying(&mut self, named: TypeId, underlying: TypeId) {
        let kind = self.get(underlying).kind.clone();
        let broken = self.get(underlying).broken;
        let ty = self.get_mut(named);
        ty.kind = kind;
        ty.broken = broken;
    }

    pub fn sym(&self, id: TypeId) -> Option<SymId> {
        self.get(id).sym
    }

    pub fn is_broken(&self, id: TypeId) -> bool {
        self.get(id).broken
    }

    pub fn is_ptr(&self, id: TypeId) -> bool {
        matches!(self.get(id).kind, TypeKind::Pointer(_))
    }

    pub fn is_unsafe_ptr(&self, id: TypeId) -> bool {
        matches!(self.get(id).kind, TypeKind::UnsafePointer)
    }

    pub fn is_struct(&self, id: TypeId) -> bool {
        matches!(self.get(id).kind, TypeKind::Struct(_))
    }

    pub fn is_interface(&self, id: TypeId) -> bool {
        matches!(self.get(id).kind, TypeKind::Interface(_))
    }

    pub fn elem(&self, id: TypeId) -> Option<TypeId> {
        match self.get(id).kind {
            TypeKind::Pointer(elem) | TypeKind::Slice(elem) => Some(elem),
            _ => None,
        }
    }

    pub fn fields(&self, id: TypeId) -> &[Field] {
        match &self.get(id).kind {
            TypeKind::Struct(fields) | TypeKind::Interface(fields) => fields,
            _ => &[],
        }
    }

    pub fn func_type(&self, id: TypeId) -> Option<&FuncType> {
        match &self.get(id).kind {
            TypeKind::Func(func) => Some(func),
            _ => None,
        }
    }

    /// The receiver field of a method signature.
    pub fn recv(&self, id: TypeId) -> Option<&Field> {
        self.func_type(id).and_then(|f| f.receiver.first())
    }

    /// Reports whether `a` and `b` are the same type. Defined types are only
    /// identical to themselves; function types ignore receivers and
    /// parameter names.
    pub fn identical(&self, a: TypeId, b: TypeId) -> bool {
        if a == b {
            return true;
        }
        let (ta, tb) = (self.get(a), self.get(b));
        if ta.sym.is_some() || tb.sym.is_some() {
            return false;
        }

        match (&ta.kind, &tb.kind) {
            (TypeKind::Basic(x), TypeKind::Basic(y)) => x == y,
            (TypeKind::UnsafePointer, TypeKind::UnsafePointer)
            | (TypeKind::FakeRecv, TypeKind::FakeRecv) => true,
            (TypeKind::Pointer(x), TypeKind::Pointer(y))
            | (TypeKind::Slice(x), TypeKind::Slice(y)) => self.identical(*x, *y),
            (TypeKind::Struct(x), TypeKind::Struct(y)) => {
                x.len() == y.len()
                    && x.iter().zip(y).all(|(f, g)| {
                        f.sym == g.sym
                            && f.embedded == g.embedded
                            && f.note == g.note
                            && self.identical(f.ty, g.ty)
                    })
            }
            (TypeKind::Interface(x), TypeKind::Interface(y)) => {
                x.len() == y.len()
                    && x
                        .iter()
                        .zip(y)
                        .all(|(f, g)| f.sym == g.sym && self.identical(f.ty, g.ty))
            }
            (TypeKind::Func(x), TypeKind::Func(y)) => {
                self.identical_fields(&x.params, &y.params)
                    && self.identical_fields(&x.results, &y.results)
            }
            _ => false,
        }
    }

    fn identical_fields(&self, x: &[Field], y: &[Field]) -> bool {
        x.len() == y.len()
            && x
                .iter()
                .zip(y)
                .all(|(f, g)| f.ddd == g.ddd && self.identical(f.ty, g.ty))
    }

    /// Formats `id` the way diagnostics print it. Defined types from `local`
    /// or the builtin package are unqualified.
    pub fn type_string(&self, symbols: &SymbolTable, local: PkgId, id: TypeId) -> String {
        let ty = self.get(id);
        if let Some(sym) = ty.sym {
            let pkg = symbols.pkg(sym);
            let package = symbols.package(pkg);
            if pkg == local || package.path == BUILTIN_PATH {
                return symbols.name(sym).to_string();
            }
            return format!("{}.{}", package.name, symbols.name(sym));
        }

        match &ty.kind {
            TypeKind::Invalid => String::from("<invalid>"),
            TypeKind::Basic(kind) => kind.name().to_string(),
            TypeKind::UnsafePointer => String::from("unsafe.Pointer"),
            TypeKind::Pointer(elem) => format!("*{}", self.type_string(symbols, local, *elem)),
            TypeKind::Slice(elem) => format!("[]{}", self.type_string(symbols, local, *elem)),
            TypeKind::Struct(fields) => {
                if fields.is_empty() {
                    return String::from("struct {}");
                }
                let fields: Vec<String> = fields
                    .iter()
                    .map(|f| {
                        let ty = self.type_string(symbols, local, f.ty);
                        match f.sym {
                            Some(sym) if !f.embedded => format!("{} {}", symbols.name(sym), ty),
                            _ => ty,
                        }
                    })
                    .collect();
                format!("struct {{ {} }}", fields.join("; "))
            }
            TypeKind::Interface(fields) => {
                if fields.is_empty() {
                    return String::from("interface {}");
                }
                let methods: Vec<String> = fields
                    .iter()
                    .map(|f| match (f.sym, self.func_type(f.ty)) {
                        (Some(sym), Some(func)) => {
                            format!("{}{}", symbols.name(sym), self.signature_string(symbols, local, func))
                        }
                        _ => self.type_string(symbols, local, f.ty),
                    })
                    .collect();
                format!("interface {{ {} }}", methods.join("; "))
            }
            TypeKind::Func(func) => {
                let signature = self.signature_string(symbols, local, func);
                match func.receiver.first() {
                    Some(recv) if !matches!(self.get(recv.ty).kind, TypeKind::FakeRecv) => format!(
                        "func({}) {}",
                        self.type_string(symbols, local, recv.ty),
                        signature.trim_start()
                    ),
                    _ => format!("func{}", signature),
                }
            }
            TypeKind::Forward { .. } => String::from("<forward>"),
            TypeKind::FakeRecv => String::from("FakeRecvType"),
        }
    }

    fn signature_string(&self, symbols: &SymbolTable, local: PkgId, func: &FuncType) -> String {
        let params: Vec<String> = func
            .params
            .iter()
            .map(|f| {
                let ty = self.type_string(symbols, local, f.ty);
                if f.ddd {
                    format!("...{}", ty)
                } else {
                    ty
                }
            })
            .collect();
        let results: Vec<String> = func
            .results
            .iter()
            .map(|f| self.type_string(symbols, local, f.ty))
            .collect();

        match results.len() {
            0 => format!("({})", params.join(", ")),
            1 => format!("({}) {}", params.join(", "), results[0]),
            _ => format!("({}) ({})", params.join(", "), results.join(", ")),
        }
    }
}
