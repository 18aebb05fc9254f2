//! Task tracking for structured concurrency.
//!
//! Every spawned task carries an obligation: before its creating scope
//! ends it must be awaited, returned from the scope, or passed to a
//! callee that takes ownership. `end_scope` reports the tasks whose
//! obligation is still open.

use rill_ast::ExprId;
use rill_binder::{ScopeId, SymbolId};
use rill_common::Span;
use rustc_hash::FxHashMap;

/// Dense task id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskId(pub u32);

impl TaskId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// One spawned task and the state of its obligation.
#[derive(Clone, Debug)]
pub struct Task {
    pub id: TaskId,
    pub spawn_expr: ExprId,
    pub span: Span,
    /// The binding holding the task handle, once `let t = spawn ...` runs.
    pub binding: Option<SymbolId>,
    pub scope: ScopeId,
    pub awaited: bool,
    pub returned: bool,
    /// Ownership handed to a callee.
    pub passed: bool,
    pub in_async_block: bool,
}

impl Task {
    /// Whether the structured-concurrency obligation is still open.
    pub fn is_leaked(&self) -> bool {
        !self.awaited && !self.returned && !self.passed
    }
}

/// Tracks spawned tasks per function body.
///
/// The dense task vector is authoritative; binding/expr/scope maps are
/// derived indices. A task expression passed to a callee before it has a
/// `TaskId` (the spawn is an argument) is buffered in `pending_passed`
/// and applied at spawn time.
#[derive(Debug, Default)]
pub struct TaskTracker {
    tasks: Vec<Task>,
    by_binding: FxHashMap<SymbolId, TaskId>,
    by_expr: FxHashMap<ExprId, TaskId>,
    by_scope: FxHashMap<ScopeId, Vec<TaskId>>,
    pending_passed: Vec<ExprId>,
}

impl TaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn_task(
        &mut self,
        expr: ExprId,
        span: Span,
        scope: ScopeId,
        in_async_block: bool,
    ) -> TaskId {
        let id = TaskId(u32::try_from(self.tasks.len()).expect("task id overflow"));
        let passed = if let Some(pos) = self.pending_passed.iter().position(|&e| e == expr) {
            self.pending_passed.swap_remove(pos);
            true
        } else {
            false
        };
        self.tasks.push(Task {
            id,
            spawn_expr: expr,
            span,
            binding: None,
            scope,
            awaited: false,
            returned: false,
            passed,
            in_async_block,
        });
        self.by_expr.insert(expr, id);
        self.by_scope.entry(scope).or_default().push(id);
        id
    }

    pub fn bind_task(&mut self, id: TaskId, binding: SymbolId) {
        self.tasks[id.index()].binding = Some(binding);
        self.by_binding.insert(binding, id);
    }

    pub fn task(&self, id: TaskId) -> &Task {
        &self.tasks[id.index()]
    }

    pub fn task_for_binding(&self, binding: SymbolId) -> Option<TaskId> {
        self.by_binding.get(&binding).copied()
    }

    pub fn task_for_expr(&self, expr: ExprId) -> Option<TaskId> {
        self.by_expr.get(&expr).copied()
    }

    pub fn mark_awaited(&mut self, id: TaskId) {
        self.tasks[id.index()].awaited = true;
    }

    pub fn mark_returned(&mut self, id: TaskId) {
        self.tasks[id.index()].returned = true;
    }

    pub fn mark_passed(&mut self, id: TaskId) {
        self.tasks[id.index()].passed = true;
    }

    /// Record that the task produced by `expr` will be passed to a callee.
    /// If the task is not spawned yet the mark is buffered.
    pub fn mark_passed_expr(&mut self, expr: ExprId) {
        match self.by_expr.get(&expr) {
            Some(&id) => self.mark_passed(id),
            None => self.pending_passed.push(expr),
        }
    }

    /// Tasks created in `scope` whose obligation is still open. Called when
    /// the scope ends; the caller reports one diagnostic per task at the
    /// original spawn span.
    pub fn end_scope(&mut self, scope: ScopeId) -> Vec<Task> {
        let Some(ids) = self.by_scope.remove(&scope) else {
            return Vec::new();
        };
        ids.into_iter()
            .map(|id| self.tasks[id.index()].clone())
            .filter(|t| t.is_leaked())
            .collect()
    }

    /// Reset for the next function body.
    pub fn reset(&mut self) {
        self.tasks.clear();
        self.by_binding.clear();
        self.by_expr.clear();
        self.by_scope.clear();
        self.pending_passed.clear();
    }
}
