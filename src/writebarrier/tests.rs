//! Unit tests for the write-barrier recursion checker.

use crate::binder::{
    binder::Binder,
    decl::{CallArg, FuncId, Pragma},
};
use crate::config::Config;
use crate::errors::errors::ErrorImpl;
use crate::symbols::symbols::SymId;
use crate::types::builder::FuncTypeExpr;
use crate::Position;

use super::checker::WriteBarrierChecker;

fn pos(line: u32) -> Position {
    Position::new("wb.go", line, 1)
}

fn runtime() -> Binder {
    Binder::new(Config::new("runtime", "runtime"))
}

fn func(b: &mut Binder, name: &str, pragma: Pragma, line: u32) -> FuncId {
    let f = b.func_decl(b.lookup(name), FuncTypeExpr::default(), pragma, pos(line));
    b.funcbody();
    f
}

fn lsym(b: &Binder, f: FuncId) -> SymId {
    b.func(f).lsym.unwrap()
}

#[test]
fn test_violation_reports_call_chain() {
    let mut b = runtime();
    let a = func(&mut b, "A", Pragma::NOWRITEBARRIERREC, 10);
    let bf = func(&mut b, "B", Pragma::empty(), 20);
    let c = func(&mut b, "C", Pragma::empty(), 30);
    b.mark_write_barrier(c, pos(31));
    b.mark_write_barrier(c, pos(35));

    let checker = WriteBarrierChecker::new(&b);
    checker.record_call(a, lsym(&b, bf), pos(11));
    checker.record_call(bf, lsym(&b, c), pos(21));
    checker.check(&mut b);

    assert_eq!(b.diagnostics.names(), vec!["WriteBarrierProhibitedByCaller"]);
    let error = b.diagnostics.iter().next().unwrap();
    assert_eq!(error.get_position().line, 31);
    assert_eq!(
        error.to_string(),
        "wb.go:31:1: write barrier prohibited by caller; C\n\
         \twb.go:21:1: called by B\n\
         \twb.go:11:1: called by A"
    );
}

#[test]
fn test_root_with_write_barrier() {
    let mut b = runtime();
    let a = func(&mut b, "A", Pragma::NOWRITEBARRIERREC, 10);
    b.mark_write_barrier(a, pos(12));

    WriteBarrierChecker::new(&b).check(&mut b);
    let error = b.diagnostics.iter().next().unwrap();
    assert_eq!(error.to_string(), "wb.go:12:1: write barrier prohibited by caller; A");
}

#[test]
fn test_yes_write_barrier_rec_stops_propagation() {
    let mut b = runtime();
    let a = func(&mut b, "A", Pragma::NOWRITEBARRIERREC, 10);
    let bf = func(&mut b, "B", Pragma::YESWRITEBARRIERREC, 20);
    let c = func(&mut b, "C", Pragma::empty(), 30);
    b.mark_write_barrier(bf, pos(22));
    b.mark_write_barrier(c, pos(31));

    let checker = WriteBarrierChecker::new(&b);
    checker.record_call(a, lsym(&b, bf), pos(11));
    checker.record_call(bf, lsym(&b, c), pos(21));
    checker.check(&mut b);

    assert!(b.diagnostics.is_empty());
}

#[test]
fn test_cycles_terminate() {
    let mut b = runtime();
    let a = func(&mut b, "A", Pragma::NOWRITEBARRIERREC, 10);
    let bf = func(&mut b, "B", Pragma::empty(), 20);

    let checker = WriteBarrierChecker::new(&b);
    checker.record_call(a, lsym(&b, bf), pos(11));
    checker.record_call(bf, lsym(&b, a), pos(21));
    checker.record_call(bf, lsym(&b, bf), pos(22));
    checker.check(&mut b);

    assert!(b.diagnostics.is_empty());
}

#[test]
fn test_shortest_chain_is_reported_once() {
    let mut b = runtime();
    let a = func(&mut b, "A", Pragma::NOWRITEBARRIERREC, 10);
    let bf = func(&mut b, "B", Pragma::empty(), 20);
    let c = func(&mut b, "C", Pragma::empty(), 30);
    b.mark_write_barrier(c, pos(31));

    let checker = WriteBarrierChecker::new(&b);
    checker.record_call(a, lsym(&b, bf), pos(11));
    checker.record_call(a, lsym(&b, c), pos(12));
    checker.record_call(bf, lsym(&b, c), pos(21));
    checker.check(&mut b);

    assert_eq!(b.diagnostics.len(), 1);
    let message = b.diagnostics.iter().next().unwrap().to_string();
    assert!(message.ends_with("; C\n\twb.go:12:1: called by A"));
}

#[test]
fn test_unreachable_write_barriers_are_allowed() {
    let mut b = runtime();
    func(&mut b, "A", Pragma::NOWRITEBARRIERREC, 10);
    let other = func(&mut b, "B", Pragma::empty(), 20);
    b.mark_write_barrier(other, pos(21));

    WriteBarrierChecker::new(&b).check(&mut b);
    assert!(b.diagnostics.is_empty());
}

#[test]
fn test_nowritebarrier_is_local() {
    let mut b = runtime();
    let a = func(&mut b, "A", Pragma::NOWRITEBARRIER, 10);
    let bf = func(&mut b, "B", Pragma::empty(), 20);
    b.mark_write_barrier(a, pos(13));
    b.mark_write_barrier(bf, pos(21));

    let checker = WriteBarrierChecker::new(&b);
    checker.record_call(a, lsym(&b, bf), pos(11));
    checker.check(&mut b);

    assert_eq!(b.diagnostics.names(), vec!["WriteBarrierProhibited"]);
    assert_eq!(b.diagnostics.iter().next().unwrap().get_position().line, 13);
}

#[test]
fn test_unknown_targets_are_ignored() {
    let mut b = runtime();
    let a = func(&mut b, "A", Pragma::NOWRITEBARRIERREC, 10);

    let checker = WriteBarrierChecker::new(&b);
    checker.record_call(a, b.lookup("memmove"), pos(11));
    checker.check(&mut b);

    assert!(b.diagnostics.is_empty());
}

#[test]
fn test_alternate_stack_with_named_function() {
    let mut b = runtime();
    let systemstack = func(&mut b, "systemstack", Pragma::empty(), 1);
    let a = b.func_decl(b.lookup("A"), FuncTypeExpr::default(), Pragma::NOWRITEBARRIERREC, pos(10));
    b.funcbody();
    let bf = func(&mut b, "B", Pragma::empty(), 20);
    b.mark_write_barrier(bf, pos(21));

    let callee = b.func(systemstack).nname;
    let arg = CallArg::Name(b.func(bf).nname.unwrap());
    b.add_call(a, callee, vec![arg], pos(11));

    WriteBarrierChecker::new(&b).check(&mut b);
    assert_eq!(b.diagnostics.names(), vec!["WriteBarrierProhibitedByCaller"]);
    assert!(b
        .diagnostics
        .iter()
        .next()
        .unwrap()
        .to_string()
        .ends_with("; B\n\twb.go:11:1: called by A"));
}

#[test]
fn test_alternate_stack_inside_closure_counts_for_enclosing_function() {
    let mut b = runtime();
    let systemstack = func(&mut b, "systemstack", Pragma::empty(), 1);

    let a = b.func_decl(b.lookup("A"), FuncTypeExpr::default(), Pragma::NOWRITEBARRIERREC, pos(10));
    let outer = b.closure_decl(FuncTypeExpr::default(), pos(11));
    let inner = b.closure_decl(FuncTypeExpr::default(), pos(12));
    b.mark_write_barrier(inner, pos(13));
    b.funcbody();
    let callee = b.func(systemstack).nname;
    b.add_call(outer, callee, vec![CallArg::Closure(inner)], pos(14));
    b.funcbody();
    b.funcbody();
    assert_eq!(b.top_level(inner), a);

    WriteBarrierChecker::new(&b).check(&mut b);
    let message = b.diagnostics.iter().next().unwrap().to_string();
    assert_eq!(
        message,
        "wb.go:13:1: write barrier prohibited by caller; A.func1.1\n\twb.go:14:1: called by A"
    );
}

#[test]
fn test_alternate_stack_must_come_from_runtime() {
    let mut b = Binder::new(Config::default());
    let systemstack = func(&mut b, "systemstack", Pragma::empty(), 1);
    let a = func(&mut b, "A", Pragma::NOWRITEBARRIERREC, 10);
    let bf = func(&mut b, "B", Pragma::empty(), 20);
    b.mark_write_barrier(bf, pos(21));

    let callee = b.func(systemstack).nname;
    let arg = CallArg::Name(b.func(bf).nname.unwrap());
    b.add_call(a, callee, vec![arg], pos(11));

    WriteBarrierChecker::new(&b).check(&mut b);
    assert!(b.diagnostics.is_empty());
}

#[test]
fn test_alternate_stack_argument_declared_later() {
    let mut b = runtime();
    let systemstack = func(&mut b, "systemstack", Pragma::empty(), 1);
    let a = b.func_decl(b.lookup("A"), FuncTypeExpr::default(), Pragma::NOWRITEBARRIERREC, pos(10));
    let g = b.resolve(b.lookup("g"), pos(11));
    let callee = b.func(systemstack).nname;
    b.add_call(a, callee, vec![CallArg::Name(g)], pos(11));
    b.funcbody();

    let gf = func(&mut b, "g", Pragma::empty(), 20);
    b.mark_write_barrier(gf, pos(21));
    b.resolve_placeholders();
    assert!(b.diagnostics.is_empty());
    assert_eq!(b.resolved(g), b.func(gf).nname.unwrap());

    WriteBarrierChecker::new(&b).check(&mut b);
    assert_eq!(b.diagnostics.names(), vec!["WriteBarrierProhibitedByCaller"]);
    assert_eq!(
        b.diagnostics.iter().next().unwrap().to_string(),
        "wb.go:21:1: write barrier prohibited by caller; g\n\twb.go:11:1: called by A"
    );
}

#[test]
fn test_alternate_stack_wrapper_declared_later() {
    let mut b = runtime();
    let a = b.func_decl(b.lookup("A"), FuncTypeExpr::default(), Pragma::NOWRITEBARRIERREC, pos(10));
    let callee = b.resolve(b.lookup("systemstack"), pos(11));
    let arg = b.resolve(b.lookup("B"), pos(11));
    b.add_call(a, Some(callee), vec![CallArg::Name(arg)], pos(11));
    b.funcbody();

    let bf = func(&mut b, "B", Pragma::empty(), 20);
    b.mark_write_barrier(bf, pos(21));
    func(&mut b, "systemstack", Pragma::empty(), 30);
    b.resolve_placeholders();
    assert!(b.diagnostics.is_empty());

    WriteBarrierChecker::new(&b).check(&mut b);
    assert_eq!(b.diagnostics.names(), vec!["WriteBarrierProhibitedByCaller"]);
}

#[test]
fn test_unresolved_alternate_stack_wrapper_is_not_an_edge() {
    let mut b = runtime();
    let a = b.func_decl(b.lookup("A"), FuncTypeExpr::default(), Pragma::NOWRITEBARRIERREC, pos(10));
    let callee = b.resolve(b.lookup("systemstack"), pos(11));
    let bf_ref = b.resolve(b.lookup("B"), pos(11));
    b.add_call(a, Some(callee), vec![CallArg::Name(bf_ref)], pos(11));
    b.funcbody();

    let bf = func(&mut b, "B", Pragma::empty(), 20);
    b.mark_write_barrier(bf, pos(21));
    b.resolve_placeholders();
    assert_eq!(b.diagnostics.names(), vec!["UndefinedSymbol"]);

    WriteBarrierChecker::new(&b).check(&mut b);
    assert_eq!(b.diagnostics.names(), vec!["UndefinedSymbol"]);
}

#[test]
#[should_panic(expected = "internal compiler error")]
fn test_alternate_stack_with_other_argument_is_fatal() {
    let mut b = runtime();
    let systemstack = func(&mut b, "systemstack", Pragma::empty(), 1);
    let a = func(&mut b, "A", Pragma::empty(), 10);
    let callee = b.func(systemstack).nname;
    b.add_call(a, callee, vec![CallArg::Other(String::from("f()"))], pos(11));

    WriteBarrierChecker::new(&b);
}

#[test]
fn test_concurrent_record_call() {
    let mut b = runtime();
    let root = func(&mut b, "A", Pragma::NOWRITEBARRIERREC, 10);
    let callees: Vec<FuncId> = (0..8)
        .map(|i| func(&mut b, &format!("B{}", i), Pragma::empty(), 20 + i))
        .collect();
    b.mark_write_barrier(callees[5], pos(99));
    let targets: Vec<_> = callees.iter().map(|&f| lsym(&b, f)).collect();

    let checker = WriteBarrierChecker::new(&b);
    std::thread::scope(|s| {
        for (i, &target) in targets.iter().enumerate() {
            let checker = &checker;
            s.spawn(move || checker.record_call(root, target, pos(11 + i as u32)));
        }
    });
    checker.check(&mut b);

    assert_eq!(b.diagnostics.len(), 1);
    let error = b.diagnostics.iter().next().unwrap();
    assert!(matches!(
        error.get_impl(),
        ErrorImpl::WriteBarrierProhibitedByCaller { function, .. } if function == "B5"
    ));
}

#[test]
fn test_record_call_from_function_created_later() {
    let mut b = runtime();
    let a = func(&mut b, "A", Pragma::NOWRITEBARRIERREC, 10);
    let c = func(&mut b, "C", Pragma::empty(), 30);
    b.mark_write_barrier(c, pos(31));

    let checker = WriteBarrierChecker::new(&b);
    let wrapper = b.dclfunc(b.lookup("wrapper"), FuncTypeExpr::default(), pos(40));
    b.funcbody();
    checker.record_call(a, lsym(&b, wrapper), pos(11));
    checker.record_call(wrapper, lsym(&b, c), pos(41));
    checker.check(&mut b);

    assert_eq!(b.diagnostics.names(), vec!["WriteBarrierProhibitedByCaller"]);
    assert_eq!(
        b.diagnostics.iter().next().unwrap().to_string(),
        "wb.go:31:1: write barrier prohibited by caller; C\n\
         \twb.go:41:1: called by wrapper\n\
         \twb.go:11:1: called by A"
    );
}
