use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::{binder::decl::DeclId, Position};

MK_ID!(PkgId);
MK_ID!(SymId);

/// A package that owns symbols.
#[derive(Debug, Clone)]
pub struct Package {
    /// Full import path.
    pub path: String,
    /// Package name as written in its package clause.
    pub name: String,
    /// Linker-safe form of the path, used to qualify symbol names.
    pub prefix: String,
}

#[derive(Debug)]
struct SymInfo {
    name: Arc<str>,
    pkg: PkgId,
    func: bool,
}

/// Name-interning table. One lock guards both the lookup and the
/// registration of a new symbol.
#[derive(Debug, Default)]
struct Interner {
    map: FxHashMap<(PkgId, Arc<str>), SymId>,
    syms: Vec<SymInfo>,
}

impl Interner {
    fn lookup_ok(&mut self, pkg: PkgId, name: &str) -> (SymId, bool) {
        if let Some(sym) = self.map.get(&(pkg, Arc::from(name))) {
            return (*sym, true);
        }

        let name: Arc<str> = Arc::from(name);
        let sym = SymId::from_index(self.syms.len());
        self.syms.push(SymInfo {
            name: Arc::clone(&name),
            pkg,
            func: false,
        });
        self.map.insert((pkg, name), sym);
        (sym, false)
    }
}

/// What a symbol currently resolves to.
#[derive(Debug, Clone)]
pub struct Binding {
    /// Declaration currently visible under this symbol.
    pub def: Option<DeclId>,
    /// Block in which `def` was declared; `0` when never declared.
    pub block: u32,
    /// Position of the last declaration; unknown for imported names.
    pub last_pos: Position,
    /// Scratch bit used while checking the left side of `:=`.
    pub uniq: bool,
}

impl Default for Binding {
    fn default() -> Self {
        Binding {
            def: None,
            block: 0,
            last_pos: Position::null(),
            uniq: false,
        }
    }
}

#[derive(Debug)]
struct Undo {
    sym: SymId,
    def: Option<DeclId>,
    block: u32,
    last_pos: Position,
}

#[derive(Debug)]
struct MarkState {
    undo_len: usize,
    block: u32,
}

/// Token returned by [`SymbolTable::push_scope`]; closing the scope consumes it.
#[derive(Debug)]
#[must_use = "a scope mark must be handed back to pop_scope"]
pub struct ScopeMark {
    depth: usize,
}

/// Packages, interned symbols and their scoped bindings.
///
/// Interning goes through a mutex so symbol lookups are safe from concurrent
/// back-end workers; everything touching bindings takes `&mut self` and runs
/// in source order.
#[derive(Debug)]
pub struct SymbolTable {
    packages: Vec<Package>,
    interner: Mutex<Interner>,
    bindings: Vec<Binding>,
    undo: Vec<Undo>,
    marks: Vec<MarkState>,
    block: u32,
    blockgen: u32,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            packages: vec![],
            interner: Mutex::new(Interner::default()),
            bindings: vec![],
            undo: vec![],
            marks: vec![],
            // Package block.
            block: 1,
            blockgen: 1,
        }
    }

    pub fn add_package(&mut self, path: &str, name: &str) -> PkgId {
        let id = PkgId::from_index(self.packages.len());
        self.packages.push(Package {
            path: path.to_string(),
            name: name.to_string(),
            prefix: path_to_prefix(path),
        });
        id
    }

    pub fn package(&self, pkg: PkgId) -> &Package {
        &self.packages[pkg.index()]
    }

    pub fn find_package(&self, path: &str) -> Option<PkgId> {
        self.packages
            .iter()
            .position(|p| p.path == path)
            .map(PkgId::from_index)
    }

    pub fn lookup(&self, pkg: PkgId, name: &str) -> SymId {
        self.lookup_ok(pkg, name).0
    }

    /// Like [`SymbolTable::lookup`], also reporting whether the symbol
    /// already existed.
    pub fn lookup_ok(&self, pkg: PkgId, name: &str) -> (SymId, bool) {
        self.interner.lock().lookup_ok(pkg, name)
    }

    /// Looks up `prefix` followed by `n`, e.g. `~r0`.
    pub fn lookup_n(&self, pkg: PkgId, prefix: &str, n: u32) -> SymId {
        self.lookup(pkg, &format!("{}{}", prefix, n))
    }

    pub fn name(&self, sym: SymId) -> Arc<str> {
        Arc::clone(&self.interner.lock().syms[sym.index()].name)
    }

    pub fn pkg(&self, sym: SymId) -> PkgId {
        self.interner.lock().syms[sym.index()].pkg
    }

    pub fn is_blank(&self, sym: SymId) -> bool {
        &*self.name(sym) == "_"
    }

    pub fn is_exported(&self, sym: SymId) -> bool {
        is_exported(&self.name(sym))
    }

    pub fn set_func(&self, sym: SymId) {
        self.interner.lock().syms[sym.index()].func = true;
    }

    pub fn is_func(&self, sym: SymId) -> bool {
        self.interner.lock().syms[sym.index()].func
    }

    pub fn binding(&self, sym: SymId) -> Binding {
        self.bindings.get(sym.index()).cloned().unwrap_or_default()
    }

    pub fn def(&self, sym: SymId) -> Option<DeclId> {
        self.bindings.get(sym.index()).and_then(|b| b.def)
    }

    fn binding_mut(&mut self, sym: SymId) -> &mut Binding {
        if sym.index() >= self.bindings.len() {
            self.bindings.resize_with(sym.index() + 1, Binding::default);
        }
        &mut self.bindings[sym.index()]
    }

    /// The block new declarations land in.
    pub fn current_block(&self) -> u32 {
        self.block
    }

    pub fn depth(&self) -> usize {
        self.marks.len()
    }

    /// Opens a new block.
    pub fn push_scope(&mut self) -> ScopeMark {
        self.marks.push(MarkState {
            undo_len: self.undo.len(),
            block: self.block,
        });
        self.blockgen += 1;
        self.block = self.blockgen;
        trace!("push scope: depth {}, block {}", self.marks.len(), self.block);

        ScopeMark {
            depth: self.marks.len(),
        }
    }

    /// Closes the block opened by `mark`, restoring every binding changed
    /// since then.
    pub fn pop_scope(&mut self, mark: ScopeMark) {
        if self.marks.len() != mark.depth {
            FATAL!(
                "pop_scope: mark for depth {} closed at depth {}",
                mark.depth,
                self.marks.len()
            );
        }
        let Some(state) = self.marks.pop() else {
            FATAL!("pop_scope: no open scope");
        };

        while self.undo.len() > state.undo_len {
            let Some(entry) = self.undo.pop() else {
                break;
            };
            let binding = self.binding_mut(entry.sym);
            binding.def = entry.def;
            binding.block = entry.block;
            binding.last_pos = entry.last_pos;
        }
        self.block = state.block;
        trace!("pop scope: depth {}, block {}", self.marks.len(), self.block);
    }

    /// Saves the binding of `sym` so the innermost open scope restores it.
    pub fn push_decl(&mut self, sym: SymId) {
        let binding = self.binding(sym);
        self.undo.push(Undo {
            sym,
            def: binding.def,
            block: binding.block,
            last_pos: binding.last_pos,
        });
    }

    /// Binds `sym` to `def` in the current block.
    pub fn bind(&mut self, sym: SymId, def: DeclId, pos: Position) {
        let block = self.block;
        let binding = self.binding_mut(sym);
        binding.def = Some(def);
        binding.block = block;
        binding.last_pos = pos;
    }

    /// Binds `sym` in the package block without recording a source position,
    /// the way names brought in by an import are bound.
    pub fn bind_imported(&mut self, sym: SymId, def: DeclId) {
        let binding = self.binding_mut(sym);
        binding.def = Some(def);
        binding.block = 1;
        binding.last_pos = Position::null();
    }

    pub fn set_uniq(&mut self, sym: SymId, uniq: bool) {
        self.binding_mut(sym).uniq = uniq;
    }

    pub fn uniq(&self, sym: SymId) -> bool {
        self.binding(sym).uniq
    }

    /// Whether every scope opened so far has been closed.
    pub fn is_valid(&self) -> bool {
        self.marks.is_empty()
    }
}

/// Reports whether `name` is visible outside its package.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// Escapes an import path for use inside symbol names: control characters,
/// space, `%`, `"`, non-ASCII bytes, and dots in the last path element.
pub fn path_to_prefix(path: &str) -> String {
    let slash = path.rfind('/');
    let mut prefix = String::with_capacity(path.len());

    for (i, c) in path.bytes().enumerate() {
        let after_slash = slash.map_or(true, |s| i > s);
        if c <= b' ' || (c == b'.' && after_slash) || c == b'%' || c == b'"' || c >= 0x7F {
            prefix.push_str(&format!("%{:02x}", c));
        } else {
            prefix.push(c as char);
        }
    }

    prefix
}
