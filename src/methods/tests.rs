//! Unit tests for the method registry.
//!
//! This module contains tests for:
//! - Registering methods and re-registering them
//! - Receiver validation
//! - Method symbol naming, including from concurrent workers
//! - Function value symbols

use crate::binder::{
    binder::Binder,
    decl::{FuncId, Pragma},
};
use crate::config::Config;
use crate::errors::errors::{ErrorImpl, ReceiverProblem};
use crate::types::{
    builder::{FieldSpec, FuncTypeExpr, TypeExpr},
    types::{TypeId, TypeKind},
};
use crate::Position;

fn setup() -> Binder {
    Binder::new(Config::default())
}

fn pos(line: u32) -> Position {
    Position::new("methods.go", line, 1)
}

fn named(b: &Binder, name: &str) -> TypeExpr {
    TypeExpr::name(b.lookup(name), pos(1))
}

fn define(b: &mut Binder, name: &str, underlying: TypeExpr) -> TypeId {
    let (decl, _) = b.declare_type(b.lookup(name), pos(1));
    b.define_type(decl, &underlying)
}

/// The receiver type expression for `recv`: a type name, optionally
/// prefixed by `*`, or `struct {}`.
fn receiver(b: &Binder, recv: &str) -> TypeExpr {
    match recv.strip_prefix('*') {
        Some(name) => TypeExpr::pointer(named(b, name)),
        None if recv == "struct {}" => TypeExpr::Struct(vec![]),
        None => named(b, recv),
    }
}

/// Declares `func (r <recv>) <name>() <results>` and returns it with its
/// signature.
fn method_func(
    b: &mut Binder,
    recv: &str,
    name: &str,
    results: Vec<FieldSpec>,
    line: u32,
) -> (FuncId, TypeId) {
    let signature = FuncTypeExpr {
        receiver: Some(FieldSpec::new(pos(line), Some(b.lookup("r")), receiver(b, recv))),
        params: vec![],
        results,
    };
    let func = b.func_decl(b.lookup(name), signature, Pragma::empty(), pos(line));
    b.funcbody();
    let ty = b.func(func).ty.unwrap();
    (func, ty)
}

#[test]
fn test_add_method_is_idempotent() {
    let mut b = setup();
    let t = define(&mut b, "T", TypeExpr::Struct(vec![]));
    let (func, ty) = method_func(&mut b, "T", "M", vec![], 2);

    let first = b.add_method(func, b.lookup("M"), ty, true, false);
    let second = b.add_method(func, b.lookup("M"), ty, true, false);

    assert!(first.is_some());
    assert_eq!(first, second);
    assert!(b.diagnostics.is_empty());
    assert_eq!(b.methods_of(t).len(), 1);

    let method = b.method(first.unwrap());
    assert_eq!(method.ty, ty);
    assert_eq!(method.nname, b.func(func).nname);
    assert_eq!(&*b.symbols.name(method.lsym), "T.M");
    assert_eq!(b.func(func).lsym, Some(method.lsym));
}

#[test]
fn test_identical_signature_from_second_declaration() {
    let mut b = setup();
    define(&mut b, "T", TypeExpr::Struct(vec![]));
    let (f1, ty1) = method_func(&mut b, "T", "M", vec![], 2);
    let (f2, ty2) = method_func(&mut b, "T", "M", vec![], 3);
    assert_ne!(ty1, ty2);

    let first = b.add_method(f1, b.lookup("M"), ty1, true, false);
    let second = b.add_method(f2, b.lookup("M"), ty2, true, false);
    assert_eq!(first, second);
    assert!(b.diagnostics.is_empty());
}

#[test]
fn test_method_redeclared_with_other_signature() {
    let mut b = setup();
    let t = define(&mut b, "T", TypeExpr::Struct(vec![]));
    let (f1, ty1) = method_func(&mut b, "T", "M", vec![], 2);
    let result = FieldSpec::new(pos(3), None, named(&b, "int"));
    let (f2, ty2) = method_func(&mut b, "T", "M", vec![result], 3);

    let first = b.add_method(f1, b.lookup("M"), ty1, true, false);
    let second = b.add_method(f2, b.lookup("M"), ty2, true, false);

    assert_eq!(b.diagnostics.names(), vec!["MethodRedeclared"]);
    assert_eq!(b.diagnostics.iter().next().unwrap().get_position().line, 3);
    assert_eq!(first, second);
    assert_eq!(b.methods_of(t).len(), 1);
}

#[test]
fn test_value_and_pointer_receivers_must_match() {
    let mut b = setup();
    define(&mut b, "T", TypeExpr::Struct(vec![]));
    let (f1, ty1) = method_func(&mut b, "T", "M", vec![], 2);
    let (f2, ty2) = method_func(&mut b, "*T", "M", vec![], 3);

    b.add_method(f1, b.lookup("M"), ty1, true, false);
    b.add_method(f2, b.lookup("M"), ty2, true, false);
    assert_eq!(b.diagnostics.names(), vec!["MethodRedeclared"]);
}

#[test]
fn test_interface_receiver_is_invalid() {
    let mut b = setup();
    let m = FieldSpec::new(pos(1), Some(b.lookup("Read")), TypeExpr::func(FuncTypeExpr::default()));
    define(&mut b, "I", TypeExpr::Interface(vec![m]));
    let (func, ty) = method_func(&mut b, "I", "M", vec![], 2);

    assert_eq!(b.add_method(func, b.lookup("M"), ty, true, false), None);
    assert_eq!(b.diagnostics.names(), vec!["InvalidReceiverType"]);
    let error = b.diagnostics.iter().next().unwrap();
    assert!(matches!(
        error.get_impl(),
        ErrorImpl::InvalidReceiverType {
            problem: ReceiverProblem::Interface,
            ..
        }
    ));
    assert!(error
        .to_string()
        .contains("invalid receiver type I (I is an interface type)"));
}

#[test]
fn test_pointer_receivers_that_are_invalid() {
    let mut b = setup();
    define(&mut b, "T", TypeExpr::Struct(vec![]));
    let ptr_t = TypeExpr::pointer(named(&b, "T"));
    define(&mut b, "P", ptr_t);
    let (named_ptr, ty1) = method_func(&mut b, "P", "M", vec![], 2);
    let (ptr_ptr, ty2) = method_func(&mut b, "*P", "N", vec![], 3);

    b.add_method(named_ptr, b.lookup("M"), ty1, true, false);
    b.add_method(ptr_ptr, b.lookup("N"), ty2, true, false);

    let messages: Vec<String> = b.diagnostics.iter().map(|e| e.to_string()).collect();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("invalid receiver type P (P is a pointer type)"));
    assert!(messages[1].contains("invalid receiver type *P (P is a pointer type)"));
}

#[test]
fn test_anonymous_receiver_is_not_defined() {
    let mut b = setup();
    let (func, ty) = method_func(&mut b, "struct {}", "M", vec![], 2);

    b.add_method(func, b.lookup("M"), ty, true, false);
    assert!(matches!(
        b.diagnostics.iter().next().unwrap().get_impl(),
        ErrorImpl::InvalidReceiverType {
            problem: ReceiverProblem::NotDefined,
            ..
        }
    ));
}

#[test]
fn test_broken_receiver_is_not_reported_twice() {
    let mut b = setup();
    let (func, ty) = method_func(&mut b, "Missing", "M", vec![], 2);

    b.add_method(func, b.lookup("M"), ty, true, false);
    assert_eq!(b.diagnostics.names(), vec!["UndefinedSymbol"]);
}

#[test]
fn test_methods_on_non_local_types() {
    let mut b = setup();
    let (func, ty) = method_func(&mut b, "int", "M", vec![], 2);

    assert_eq!(b.add_method(func, b.lookup("M"), ty, true, false), None);
    assert_eq!(b.diagnostics.names(), vec!["NonLocalMethodBase"]);
    assert!(b
        .diagnostics
        .iter()
        .next()
        .unwrap()
        .to_string()
        .contains("cannot define new methods on non-local type int"));

    // Imported method declarations are not restricted.
    let mut imported = setup();
    let (func, ty) = method_func(&mut imported, "int", "M", vec![], 2);
    assert!(imported.add_method(func, imported.lookup("M"), ty, false, false).is_some());
}

#[test]
fn test_missing_receiver() {
    let mut b = setup();
    let func = b.func_decl(b.lookup("f"), FuncTypeExpr::default(), Pragma::empty(), pos(1));
    b.funcbody();
    let ty = b.func(func).ty.unwrap();

    assert_eq!(b.add_method(func, b.lookup("f"), ty, true, false), None);
    assert_eq!(b.diagnostics.names(), vec!["MissingReceiver"]);
}

#[test]
fn test_blank_method_is_ignored() {
    let mut b = setup();
    let t = define(&mut b, "T", TypeExpr::Struct(vec![]));
    let (func, ty) = method_func(&mut b, "T", "_", vec![], 2);

    assert_eq!(b.add_method(func, b.lookup("_"), ty, true, false), None);
    assert!(b.diagnostics.is_empty());
    assert!(b.methods_of(t).is_empty());
}

#[test]
fn test_field_and_method_collision() {
    let mut b = setup();
    let field = FieldSpec::new(pos(1), Some(b.lookup("Name")), named(&b, "string"));
    let s = define(&mut b, "S", TypeExpr::Struct(vec![field]));
    let (func, ty) = method_func(&mut b, "*S", "Name", vec![], 2);

    assert_eq!(b.add_method(func, b.lookup("Name"), ty, true, false), None);
    assert_eq!(b.diagnostics.names(), vec!["FieldMethodCollision"]);
    assert!(b.types.fields(s)[0].broken);
    assert!(b.methods_of(s).is_empty());
}

#[test]
fn test_nointerface_flag_is_kept() {
    let mut b = setup();
    define(&mut b, "T", TypeExpr::Struct(vec![]));
    let (func, ty) = method_func(&mut b, "T", "M", vec![], 2);

    let id = b.add_method(func, b.lookup("M"), ty, true, true).unwrap();
    assert!(b.method(id).nointerface);
}

#[test]
fn test_method_symbol_names() {
    let mut b = setup();
    let t = define(&mut b, "T", TypeExpr::Struct(vec![]));
    let ptr = b.types.ptr_to(t);
    let exported = b.lookup("M");

    assert_eq!(&*b.symbols.name(b.method_sym(t, exported)), "T.M");
    assert_eq!(&*b.symbols.name(b.method_sym(ptr, exported)), "(*T).M");
    assert_eq!(
        &*b.symbols.name(b.method_sym_suffix(ptr, exported, "-fm")),
        "(*T).M-fm"
    );
    assert_eq!(b.symbols.pkg(b.method_sym(t, exported)), b.local_pkg);
}

#[test]
fn test_unexported_method_from_other_package_is_qualified() {
    let mut b = setup();
    let other = b.symbols.add_package("example.com/a", "a");
    let t = b
        .types
        .new_named(b.symbols.lookup(other, "T"), TypeKind::Struct(vec![]));
    let ptr = b.types.ptr_to(t);

    let local_unexported = b.lookup("m");
    let local_exported = b.lookup("M");
    let own_unexported = b.symbols.lookup(other, "m");

    let sym = b.method_sym(ptr, local_unexported);
    assert_eq!(&*b.symbols.name(sym), "(*T).main.m");
    assert_eq!(b.symbols.pkg(sym), other);
    assert_eq!(&*b.symbols.name(b.method_sym(t, local_exported)), "T.M");
    assert_eq!(&*b.symbols.name(b.method_sym(t, own_unexported)), "T.m");
    assert_ne!(b.method_sym(t, own_unexported), b.method_sym(t, local_unexported));
}

#[test]
fn test_anonymous_receivers_use_go_package() {
    let mut b = setup();
    let s = b.tostruct(&[]);
    let sym = b.method_sym(s, b.lookup("M"));

    assert_eq!(b.symbols.pkg(sym), b.go_pkg);
    assert_eq!(&*b.symbols.name(sym), "struct {}.M");
}

#[test]
#[should_panic(expected = "internal compiler error")]
fn test_suffix_must_not_continue_the_name() {
    let mut b = setup();
    let t = define(&mut b, "T", TypeExpr::Struct(vec![]));
    b.method_sym_suffix(t, b.lookup("M"), ".x");
}

#[test]
#[should_panic(expected = "internal compiler error")]
fn test_blank_method_symbol_is_fatal() {
    let mut b = setup();
    let t = define(&mut b, "T", TypeExpr::Struct(vec![]));
    b.method_sym(t, b.lookup("_"));
}

#[test]
#[should_panic(expected = "internal compiler error")]
fn test_named_pointer_method_symbol_is_fatal() {
    let mut b = setup();
    define(&mut b, "T", TypeExpr::Struct(vec![]));
    let ptr_t = TypeExpr::pointer(named(&b, "T"));
    let p = define(&mut b, "P", ptr_t);
    b.method_sym(p, b.lookup("M"));
}

#[test]
fn test_concurrent_method_symbols() {
    let mut b = setup();
    let t = define(&mut b, "T", TypeExpr::Struct(vec![]));
    let ptr = b.types.ptr_to(t);
    let names: Vec<String> = (0..8).map(|i| format!("M{}", i)).collect();
    let msyms: Vec<_> = names.iter().map(|n| b.lookup(n)).collect();

    let b = &b;
    let results: Vec<Vec<_>> = std::thread::scope(|s| {
        let workers: Vec<_> = (0..4)
            .map(|_| s.spawn(|| msyms.iter().map(|&m| b.method_sym(ptr, m)).collect::<Vec<_>>()))
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    for result in &results {
        assert_eq!(result, &results[0]);
    }
    for (sym, name) in results[0].iter().zip(&names) {
        assert_eq!(&*b.symbols.name(*sym), format!("(*T).{}", name));
    }
}

#[test]
fn test_concurrent_funcsym_records_once() {
    let b = setup();
    let f = b.lookup("f");

    let results: Vec<_> = std::thread::scope(|s| {
        let workers: Vec<_> = (0..8).map(|_| s.spawn(|| b.funcsym(f))).collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert!(results.iter().all(|&r| r == results[0]));
    assert_eq!(&*b.symbols.name(results[0]), "f·f");
    assert_eq!(b.funcsyms(), vec![f]);
}

#[test]
fn test_makefuncsym_under_dynlink() {
    let config = Config::new("runtime", "runtime")
        .with_dynlink(true)
        .compiling_runtime(true);
    let b = Binder::new(config);
    let getg = b.lookup("getg");
    let f = b.lookup("f");

    b.makefuncsym(getg);
    b.makefuncsym(b.lookup("_"));
    b.makefuncsym(f);
    b.makefuncsym(f);
    assert_eq!(b.funcsyms(), vec![f]);

    // Under dynamic linking, function values are only made explicitly.
    b.funcsym(b.lookup("g"));
    assert_eq!(b.funcsyms(), vec![f]);
}

#[test]
#[should_panic(expected = "internal compiler error")]
fn test_makefuncsym_requires_dynlink() {
    let b = setup();
    b.makefuncsym(b.lookup("f"));
}
