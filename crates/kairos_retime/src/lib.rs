//! Sequential retiming for AND networks with latches on edges.
//!
//! This crate moves latches across two-input AND gates to minimize the
//! clock period while preserving the cycle-accurate behavior of the network,
//! including the initial state. It also offers a mapping-aware variant in
//! which node delays come from library gates matched on sequential cuts.
//!
//! A [`Retimer`] runs the whole pipeline:
//! 1. **Period search**: bisection over candidate periods, each tested by
//!    arrival-time relaxation ([`relax`], [`search`])
//! 2. **Lag freezing**: the L-values at the winning period give each gate a
//!    lag; the mapping variant first materializes its cover ([`mapping`])
//! 3. **Scheduling**: the lags become single forward, then backward, moves
//!    ([`schedule`], [`moves`])
//! 4. **Legalization**: pending initial values from backward moves are
//!    solved with one SAT call ([`legal`], [`legalize`], [`sat`])
//! 5. **Sharing**: compatible latches on common stems merge ([`share`])
//!
//! The input network is never modified; a failed invocation returns an
//! error and emits the matching diagnostic.
//!
//! # Usage
//!
//! ```
//! use kairos_common::InitValue;
//! use kairos_config::RetimeOptions;
//! use kairos_diagnostics::DiagnosticSink;
//! use kairos_ir::{SeqNetwork, Signal};
//! use kairos_retime::Retimer;
//!
//! let mut net = SeqNetwork::new("chain");
//! let one = net.add_const();
//! let pi = net.add_input("pi");
//! let a = net.add_and(Signal::positive(pi), Signal::positive(one));
//! let b = net.add_and(Signal::positive(a), Signal::positive(one));
//! let po = net.add_output("po", Signal::positive(b));
//! net.add_latch(po, 0, InitValue::Zero);
//!
//! let sink = DiagnosticSink::new();
//! let outcome = Retimer::new(RetimeOptions::default()).run(&net, &sink).unwrap();
//! assert_eq!(outcome.period, 1.0);
//! assert!(outcome.initial_state_exact);
//! ```

#![warn(missing_docs)]

pub mod codes;
mod error;
pub mod graph;
pub mod legal;
pub mod legalize;
pub mod mapping;
pub mod moves;
pub mod relax;
pub mod ring;
pub mod sat;
pub mod schedule;
pub mod search;
pub mod share;

pub use error::RetimeError;
pub use graph::RetimeGraph;
pub use legal::LegalNet;
pub use legalize::LegalizeOutcome;
pub use mapping::{CutLeaf, CutOracle, GateMatch, MappedModel, MatchLibrary, SeqCut};
pub use moves::Direction;
pub use relax::{ArrivalModel, Feasibility, PlainModel, Relaxation};
pub use sat::{SatError, SatOutcome, SatSolver, VarisatSolver};
pub use schedule::{MovePlan, PhaseStats};
pub use share::ShareStats;

use kairos_common::Tolerance;
use kairos_config::RetimeOptions;
use kairos_diagnostics::{Diagnostic, DiagnosticSink};
use kairos_ir::{NodeId, SeqNetwork};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A step of the retiming pipeline, recorded in [`RetimeOutcome::phases`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Building the retiming graph from the input network.
    BuildGraph,
    /// Searching for the minimum feasible period.
    SearchPeriod,
    /// Deriving (and for mapping, materializing) the lags.
    FreezeLags,
    /// Performing forward moves.
    ScheduleForward,
    /// Performing backward moves.
    ScheduleBackward,
    /// Resolving pending initial values.
    Legalize,
    /// Merging compatible latches.
    ShareLatches,
    /// Converting back to a network.
    Emit,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::BuildGraph => "build-graph",
            Phase::SearchPeriod => "search-period",
            Phase::FreezeLags => "freeze-lags",
            Phase::ScheduleForward => "schedule-forward",
            Phase::ScheduleBackward => "schedule-backward",
            Phase::Legalize => "legalize",
            Phase::ShareLatches => "share-latches",
            Phase::Emit => "emit",
        })
    }
}

/// Counters collected over one invocation.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RetimeStats {
    /// Latches in the input network.
    pub latches_before: usize,
    /// Latches in the result.
    pub latches_after: usize,
    /// AND gates in the input network.
    pub gates_before: usize,
    /// AND gates in the result, including buffers and mapped cones.
    pub gates_after: usize,
    /// Relaxation runs during the period search.
    pub feasibility_tests: usize,
    /// Forward scheduling counters.
    pub forward: PhaseStats,
    /// Backward scheduling counters.
    pub backward: PhaseStats,
    /// Latches that needed legalization.
    pub pending_latches: usize,
    /// How pending latches were resolved.
    pub legalization: LegalizeOutcome,
    /// Sharing counters.
    pub sharing: ShareStats,
    /// Total gate area of a mapped result.
    pub mapped_area: Option<f64>,
}

/// The result of a successful invocation.
#[derive(Clone, Debug)]
pub struct RetimeOutcome {
    /// The retimed network.
    pub network: SeqNetwork,
    /// The achieved clock period.
    pub period: f64,
    /// The lag applied to every node of the retimed graph before sharing.
    /// For a mapped run the IDs refer to the mapped network.
    pub lags: BTreeMap<NodeId, i32>,
    /// `false` if some initial values were relaxed to don't-care.
    pub initial_state_exact: bool,
    /// Counters.
    pub stats: RetimeStats,
    /// The pipeline steps that ran, in order.
    pub phases: Vec<Phase>,
}

/// Period and lags without touching the network.
#[derive(Clone, Debug)]
pub struct PeriodReport {
    /// The minimum feasible period.
    pub period: f64,
    /// Lower end of the search bracket.
    pub lower: f64,
    /// Upper end of the search bracket.
    pub upper: f64,
    /// Relaxation runs.
    pub feasibility_tests: usize,
    /// Lags per node of the (possibly mapped) graph.
    pub lags: BTreeMap<NodeId, i32>,
}

/// Lags fixed for a graph at a period.
struct Frozen {
    graph: RetimeGraph,
    period: f64,
    lower: f64,
    upper: f64,
    lags: Vec<i32>,
    tests: usize,
    area: Option<f64>,
}

/// The retiming pipeline with its options and collaborators.
pub struct Retimer<'a> {
    options: RetimeOptions,
    solver: Box<dyn SatSolver>,
    mapping: Option<(&'a dyn CutOracle, &'a dyn MatchLibrary)>,
}

impl<'a> Retimer<'a> {
    /// A plain unit-delay retimer using the varisat solver.
    pub fn new(options: RetimeOptions) -> Self {
        Self {
            options,
            solver: Box::new(VarisatSolver),
            mapping: None,
        }
    }

    /// Replaces the legalization solver.
    pub fn with_solver(mut self, solver: Box<dyn SatSolver>) -> Self {
        self.solver = solver;
        self
    }

    /// Switches to mapping-aware retiming with the given cut oracle and library.
    pub fn with_mapping(mut self, oracle: &'a dyn CutOracle, library: &'a dyn MatchLibrary) -> Self {
        self.mapping = Some((oracle, library));
        self
    }

    /// The options in effect.
    pub fn options(&self) -> &RetimeOptions {
        &self.options
    }

    /// Retimes `network` for the minimum feasible period.
    pub fn run(&mut self, network: &SeqNetwork, sink: &DiagnosticSink) -> Result<RetimeOutcome, RetimeError> {
        let result = self.run_phases(network, sink);
        if let Err(err) = &result {
            // Stalls emit their own diagnostic where they are detected.
            if !matches!(err, RetimeError::ScheduleStall { .. }) {
                sink.emit(err.to_diagnostic());
            }
        }
        result
    }

    /// Finds the minimum period and lags without moving any latch.
    pub fn analyze(&self, network: &SeqNetwork, sink: &DiagnosticSink) -> Result<PeriodReport, RetimeError> {
        let result = RetimeGraph::from_network(network).and_then(|graph| self.freeze(graph, sink));
        match result {
            Ok(frozen) => Ok(PeriodReport {
                period: frozen.period,
                lower: frozen.lower,
                upper: frozen.upper,
                feasibility_tests: frozen.tests,
                lags: lag_map(&frozen.lags),
            }),
            Err(err) => {
                sink.emit(err.to_diagnostic());
                Err(err)
            }
        }
    }

    fn run_phases(&mut self, network: &SeqNetwork, sink: &DiagnosticSink) -> Result<RetimeOutcome, RetimeError> {
        let mut phases = vec![Phase::BuildGraph];
        let graph = RetimeGraph::from_network(network)?;
        let mut stats = RetimeStats {
            latches_before: graph.latch_count(),
            gates_before: graph.gate_count(),
            ..RetimeStats::default()
        };

        // Phase 1: period search and lags
        phases.push(Phase::SearchPeriod);
        let frozen = self.freeze(graph, sink)?;
        phases.push(Phase::FreezeLags);
        let Frozen {
            mut graph,
            mut period,
            mut lags,
            tests,
            area,
            ..
        } = frozen;
        stats.feasibility_tests = tests;
        stats.mapped_area = area;
        let clipped = self.options.forward_only && search::restrict_forward(&mut lags) > 0;
        if clipped && area.is_some() {
            return Err(RetimeError::ForwardOnlyInfeasible { period });
        }
        search::check_lags(&graph, &lags)?;

        // Phase 2: scheduling, forward before backward
        let plan = MovePlan::from_lags(&graph, &lags);
        let mut legal = LegalNet::new();
        phases.push(Phase::ScheduleForward);
        stats.forward = schedule::run_moves(&mut graph, &mut legal, &plan.forward, Direction::Forward, sink)?;
        phases.push(Phase::ScheduleBackward);
        stats.backward =
            schedule::run_moves(&mut graph, &mut legal, &plan.backward, Direction::Backward, sink)?;

        if clipped {
            period = search::achieved_period(&graph)?;
        }

        // Phase 3: initial-state legalization
        phases.push(Phase::Legalize);
        stats.pending_latches = graph.pending_count();
        let solver: Option<&mut dyn SatSolver> = if self.options.legalize {
            Some(&mut *self.solver)
        } else {
            None
        };
        stats.legalization = legalize::legalize(
            &mut graph,
            &legal,
            solver,
            self.options.sat_clause_budget,
            sink,
        )?;

        // Phase 4: latch sharing
        if self.options.share {
            phases.push(Phase::ShareLatches);
            // Mapped timing counts bound gates only; an unbound buffer is a
            // fanout point there.
            let limit = self.mapping.is_none().then_some(period);
            stats.sharing = share::share_latches(&mut graph, limit)?;
        }

        phases.push(Phase::Emit);
        let network = graph.to_network()?;
        stats.latches_after = network.latch_count();
        stats.gates_after = graph.gate_count();

        Ok(RetimeOutcome {
            network,
            period,
            lags: lag_map(&lags),
            initial_state_exact: stats.legalization.is_exact(),
            stats,
            phases,
        })
    }

    fn freeze(&self, graph: RetimeGraph, sink: &DiagnosticSink) -> Result<Frozen, RetimeError> {
        if graph.gate_count() == 0 {
            let lags = vec![0; graph.node_count()];
            return Ok(Frozen {
                graph,
                period: 0.0,
                lower: 0.0,
                upper: 0.0,
                lags,
                tests: 0,
                area: None,
            });
        }
        match self.mapping {
            None => self.freeze_plain(graph, sink),
            Some((oracle, library)) => self.freeze_mapped(graph, oracle, library, sink),
        }
    }

    fn freeze_plain(&self, graph: RetimeGraph, sink: &DiagnosticSink) -> Result<Frozen, RetimeError> {
        let tolerance = Tolerance(self.options.epsilon);
        let bounds = search::plain_bounds(&graph, &self.options, sink)?;
        let mut relax = Relaxation::new(&graph, PlainModel, tolerance, self.options.max_sweeps)?;
        let found = search::search_min_period(&mut relax, bounds, sink)?;
        let partial = search::plain_lags(&graph, &found.table, found.period, tolerance);
        let lags = search::complete_lags(&graph, &partial);
        let tests = relax.tests();
        Ok(Frozen {
            graph,
            period: found.period,
            lower: bounds.lower,
            upper: bounds.upper,
            lags,
            tests,
            area: None,
        })
    }

    fn freeze_mapped(
        &self,
        graph: RetimeGraph,
        oracle: &dyn CutOracle,
        library: &dyn MatchLibrary,
        sink: &DiagnosticSink,
    ) -> Result<Frozen, RetimeError> {
        let tolerance = Tolerance(self.options.epsilon);
        let model = MappedModel::build(&graph, oracle, library, self.options.cut_size, tolerance)?;
        let mut relax = Relaxation::new(&graph, model, tolerance, self.options.max_sweeps)?;

        // An infinite period restarts every path at a latch, which gives
        // the mapped depth of the latch-free logic.
        let acyclic = relax.run(f64::INFINITY);
        let depth = acyclic
            .table
            .iter()
            .flat_map(|slots| slots.iter().copied())
            .filter(|l| l.is_finite())
            .fold(0.0, f64::max);
        let bounds = search::SearchBounds {
            lower: 0.0,
            upper: (depth + self.options.margin).max(self.options.mapping_resolution),
            resolution: self.options.mapping_resolution,
            integral: false,
        };
        let found = search::search_min_period(&mut relax, bounds, sink)?;

        let chosen = mapping::cover(&graph, relax.model(), &found.table, found.period)?;
        let built = mapping::materialize(
            &graph,
            relax.model(),
            &chosen,
            &found.table,
            found.period,
            tolerance,
        )?;
        sink.emit(Diagnostic::note(
            codes::MAPPING_COVER,
            format!(
                "{} instances from {} candidates, area {:.2}",
                chosen.len(),
                relax.model().candidate_count(),
                built.area
            ),
        ));

        let lags = search::complete_lags(&built.graph, &built.lags);
        let tests = relax.tests();
        Ok(Frozen {
            graph: built.graph,
            period: found.period,
            lower: bounds.lower,
            upper: bounds.upper,
            lags,
            tests,
            area: Some(built.area),
        })
    }
}

fn lag_map(lags: &[i32]) -> BTreeMap<NodeId, i32> {
    lags.iter()
        .enumerate()
        .map(|(i, &lag)| (NodeId::from_raw(i as u32), lag))
        .collect()
}
