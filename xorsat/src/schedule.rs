//! Scheduling of restarts, reductions, simplifications and solving steps.
use log::info;

use partial_ref::{partial, PartialRef};

use crate::cdcl::conflict_step;
use crate::clause::reduce::reduce_and_collect;
use crate::context::{
    AnalyzeConflictP, AssignmentP, BinaryClausesP, ClauseActivityP, ClauseAllocP, ClauseDbP,
    Context, GaussP, ImplGraphP, RngP, ScheduleP, SolverConfigP, SolverStateP, StatsP,
    TernaryClausesP, TmpDataP, TrailP, VariablesP, VsidsP, WatchlistsP, XorClausesP, XorReasonsP,
};
use crate::decision::init_phases;
use crate::prop::restart;
use crate::restart::RestartPolicy;
use crate::simplify::simplify_episode;
use crate::state::{SatState, StopCause};
use crate::xor::matrix::init_matrices;

/// Scheduling of restarts, reductions, simplifications and solving steps.
#[derive(Default)]
pub struct Schedule {
    pub(crate) restarts: u64,
    pub(crate) policy: RestartPolicy,
    next_simplify: u64,
    simplify_interval: u64,
    next_reduce: u64,
    reduce_interval: u64,
    last_progress_log: u64,
    initialized: bool,
}

/// Perform one step of the schedule.
///
/// Returns `false` when the search is finished, either with an answer or
/// because a budget was exhausted or an interrupt was requested.
pub fn schedule_step(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut BinaryClausesP,
        mut ClauseActivityP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut GaussP,
        mut ImplGraphP,
        mut RngP,
        mut ScheduleP,
        mut SolverStateP,
        mut StatsP,
        mut TernaryClausesP,
        mut TmpDataP,
        mut TrailP,
        mut VsidsP,
        mut WatchlistsP,
        mut XorClausesP,
        mut XorReasonsP,
        SolverConfigP,
        VariablesP,
    ),
) -> bool {
    if ctx.part(SolverStateP).sat_state != SatState::Unknown {
        return false;
    }

    // Cooperative cancellation: drain to a coherent level 0 state.
    if ctx.part(SolverStateP).interrupt.is_interrupted() {
        restart(ctx.borrow());
        ctx.part_mut(SolverStateP).stop = Some(StopCause::Interrupted);
        return false;
    }

    if !ctx.part(ScheduleP).initialized {
        init_schedule(ctx.borrow());
    }

    let conflicts = ctx.part(StatsP).conflicts;
    let max_conflicts = ctx.part(SolverConfigP).max_conflicts;
    let max_restarts = ctx.part(SolverConfigP).max_restarts;

    if max_conflicts > 0 && conflicts >= max_conflicts {
        restart(ctx.borrow());
        ctx.part_mut(SolverStateP).stop = Some(StopCause::ConflictBudget);
        return false;
    }

    if max_restarts > 0 && ctx.part(ScheduleP).restarts >= max_restarts {
        restart(ctx.borrow());
        ctx.part_mut(SolverStateP).stop = Some(StopCause::RestartBudget);
        return false;
    }

    if conflicts >= ctx.part(ScheduleP).last_progress_log + 5000 {
        ctx.part_mut(ScheduleP).last_progress_log = conflicts;
        let stats = *ctx.part(StatsP);
        let db = ctx.part(ClauseDbP);
        info!(
            "confl: {}k rest: {} units: {} bin: {} tern: {} irred: {} red: {} xor: {}",
            conflicts / 1000,
            stats.restarts,
            ctx.part(TrailP).top_level_assignment_count(),
            ctx.part(BinaryClausesP).count(),
            ctx.part(TernaryClausesP).count(),
            db.count_irredundant(),
            db.count_redundant(),
            ctx.part(XorClausesP).count(),
        );
    }

    let margin = ctx.part(SolverConfigP).dynamic_restart_margin;
    let scale = ctx.part(SolverConfigP).restart_scale;
    if ctx.part(ScheduleP).policy.should_restart(conflicts, margin) {
        restart(ctx.borrow());
        let schedule = ctx.part_mut(ScheduleP);
        schedule.restarts += 1;
        schedule.policy.on_restart(conflicts, scale);
        ctx.part_mut(StatsP).restarts += 1;
    }

    if conflicts >= ctx.part(ScheduleP).next_simplify {
        simplify_episode(ctx.borrow());
        if ctx.part(SolverStateP).sat_state != SatState::Unknown {
            return false;
        }
        let mult = ctx.part(SolverConfigP).simplify_interval_mult;
        let schedule = ctx.part_mut(ScheduleP);
        schedule.simplify_interval = (schedule.simplify_interval as f64 * mult) as u64;
        schedule.next_simplify = conflicts + schedule.simplify_interval;
    }

    if conflicts >= ctx.part(ScheduleP).next_reduce {
        reduce_and_collect(ctx.borrow());
        let inc = ctx.part(SolverConfigP).reduce_interval_inc;
        let schedule = ctx.part_mut(ScheduleP);
        schedule.reduce_interval += inc;
        schedule.next_reduce = conflicts + schedule.reduce_interval;
    }

    conflict_step(ctx.borrow());

    true
}

/// Initialize the per-search scheduling state.
fn init_schedule(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut GaussP,
        mut ScheduleP,
        BinaryClausesP,
        ClauseAllocP,
        ClauseDbP,
        SolverConfigP,
        TernaryClausesP,
        VariablesP,
        XorClausesP,
    ),
) {
    {
        let (config, mut ctx) = ctx.split_part(SolverConfigP);
        let schedule = ctx.part_mut(ScheduleP);

        schedule.initialized = true;
        schedule.policy.init(config.restart_mode, config.restart_scale);
        schedule.simplify_interval = config.simplify_interval;
        schedule.next_simplify = config.simplify_interval;
        schedule.reduce_interval = config.reduce_interval;
        schedule.next_reduce = config.reduce_interval;
    }

    init_phases(ctx.borrow());
    init_matrices(ctx.borrow());
}
