use std::collections::VecDeque;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::{
    binder::{
        binder::Binder,
        decl::{CallArg, Class, DeclId, FuncId, Pragma},
    },
    errors::errors::{CallChain, ErrorImpl},
    symbols::symbols::SymId,
    Position,
};

/// A call edge found by the alternate-stack pre-pass.
#[derive(Debug, Clone)]
struct Call {
    target: FuncId,
    pos: Position,
}

/// A call reported by the back end, by linker symbol.
#[derive(Debug, Clone)]
struct RecordedCall {
    target: SymId,
    pos: Position,
}

/// Number of independently locked call logs.
const SHARDS: usize = 16;

/// Checks that functions marked `NOWRITEBARRIERREC`, and everything they
/// call, never need a write barrier.
///
/// Created before closures are turned into ordinary functions, fed calls
/// while functions are lowered, and run once at the end with
/// [`WriteBarrierChecker::check`].
#[derive(Debug)]
pub struct WriteBarrierChecker {
    /// Calls through the alternate-stack wrapper, keyed by caller. Later
    /// analysis cannot see through the wrapper.
    extra_calls: FxHashMap<FuncId, Vec<Call>>,
    /// Calls reported while lowering, keyed by caller and spread over
    /// [`SHARDS`] locks. Functions created after the pre-pass log here too.
    recorded: Vec<Mutex<FxHashMap<FuncId, Vec<RecordedCall>>>>,
}

impl WriteBarrierChecker {
    /// Finds every call of the alternate-stack wrapper and records an edge
    /// to the function it runs. Calls inside function literals count as
    /// calls of the enclosing top-level function.
    pub fn new(binder: &Binder) -> Self {
        let mut extra_calls: FxHashMap<FuncId, Vec<Call>> = FxHashMap::default();

        for (index, func) in binder.funcs.iter().enumerate() {
            let caller = binder.top_level(FuncId::from_index(index));
            for call in &func.calls {
                if !is_alternate_stack(binder, call.callee) {
                    continue;
                }
                let target = match call.args.first() {
                    Some(CallArg::Name(decl)) => match binder.decl(binder.resolved(*decl)).func {
                        Some(target) => target,
                        None => FATAL!(
                            "{}: alternate stack argument {} is not a function",
                            call.pos,
                            binder.decl_name(*decl)
                        ),
                    },
                    Some(CallArg::Closure(target)) => *target,
                    Some(CallArg::Other(expr)) => {
                        FATAL!("{}: expected function name or literal, got {}", call.pos, expr)
                    }
                    None => FATAL!("{}: alternate stack call without argument", call.pos),
                };
                extra_calls.entry(caller).or_default().push(Call {
                    target,
                    pos: call.pos.clone(),
                });
            }
        }

        debug!(
            "write barrier pre-pass: {} callers through {}",
            extra_calls.len(),
            binder.config.alternate_stack_func
        );
        WriteBarrierChecker {
            extra_calls,
            recorded: (0..SHARDS).map(|_| Mutex::new(FxHashMap::default())).collect(),
        }
    }

    /// Records that `from` calls the function with linker symbol `to`. Safe
    /// to call from concurrent lowering workers.
    pub fn record_call(&self, from: FuncId, to: SymId, pos: Position) {
        self.recorded[from.index() % SHARDS]
            .lock()
            .entry(from)
            .or_default()
            .push(RecordedCall { target: to, pos });
    }

    /// Walks the call graph breadth first from every `NOWRITEBARRIERREC`
    /// function and reports each reachable function containing a write
    /// barrier, with the chain of calls that reached it.
    pub fn check(self, binder: &mut Binder) {
        let mut sym_to_func: FxHashMap<SymId, FuncId> = FxHashMap::default();
        // Parent edge of every function that must not have write barriers;
        // roots map to `None`. Doubles as the visited set.
        let mut parents: FxHashMap<FuncId, Option<(FuncId, Position)>> = FxHashMap::default();
        let mut queue: VecDeque<FuncId> = VecDeque::new();
        let mut errors = vec![];

        for (index, func) in binder.funcs.iter().enumerate() {
            let id = FuncId::from_index(index);
            if let Some(lsym) = func.lsym {
                sym_to_func.insert(lsym, id);
            }
            if func.pragma.contains(Pragma::NOWRITEBARRIERREC) {
                parents.insert(id, None);
                queue.push_back(id);
            }
            if func.pragma.contains(Pragma::NOWRITEBARRIER) {
                if let Some(pos) = &func.wb_pos {
                    errors.push((ErrorImpl::WriteBarrierProhibited, pos.clone()));
                }
            }
        }

        let recorded: FxHashMap<FuncId, Vec<RecordedCall>> = self
            .recorded
            .into_iter()
            .flat_map(Mutex::into_inner)
            .collect();
        let mut obligated = parents.len();

        while let Some(func) = queue.pop_front() {
            if let Some(pos) = binder.func(func).wb_pos.clone() {
                let mut chain = vec![];
                let mut link = parents.get(&func).cloned().flatten();
                while let Some((caller, call_pos)) = link {
                    chain.push((call_pos, binder.func_name(caller)));
                    link = parents.get(&caller).cloned().flatten();
                }
                let error = ErrorImpl::WriteBarrierProhibitedByCaller {
                    function: binder.func_name(func),
                    chain: CallChain(chain),
                };
                errors.push((error, pos));
                continue;
            }

            let extra = self
                .extra_calls
                .get(&func)
                .into_iter()
                .flatten()
                .map(|call| (call.target, call.pos.clone()));
            let lowered = recorded
                .get(&func)
                .into_iter()
                .flatten()
                .filter_map(|call| sym_to_func.get(&call.target).map(|&t| (t, call.pos.clone())));

            for (target, pos) in extra.chain(lowered) {
                // Don't flow into functions that permit write barriers.
                if binder.func(target).pragma.contains(Pragma::YESWRITEBARRIERREC) {
                    continue;
                }
                if parents.contains_key(&target) {
                    continue;
                }
                parents.insert(target, Some((func, pos)));
                queue.push_back(target);
                obligated += 1;
            }
        }

        debug!(
            "write barrier check: {} functions obligated, {} violations",
            obligated,
            errors.len()
        );
        for (error, pos) in errors {
            binder.error(error, pos);
        }
    }
}

fn is_alternate_stack(binder: &Binder, callee: Option<DeclId>) -> bool {
    let Some(callee) = callee else {
        return false;
    };
    let decl = binder.decl(binder.resolved(callee));
    let Some(sym) = decl.sym else {
        return false;
    };
    decl.class == Class::Func
        && decl.func.is_some()
        && binder.symbols.pkg(sym) == binder.runtime_pkg
        && *binder.symbols.name(sym) == *binder.config.alternate_stack_func
}
