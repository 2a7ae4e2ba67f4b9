use std::collections::{HashSet, VecDeque};

use super::{
    Error, LinearProgram, Report, Solution, SolutionResult, SolverConfig, Status, Tableau,
};

/// Drives a [`Tableau`] through the simplex iterations.
#[derive(Debug, Clone)]
pub struct Simplex {
    tableau: Tableau,
    config: SolverConfig,
    history: VecDeque<Tableau>,
    alternates: Vec<Report>,
    visited: HashSet<Vec<usize>>,
    iterations: usize,
    degenerate_pivots: usize,
    status: Status,
}

impl Simplex {
    pub fn new(program: LinearProgram) -> Result<Self, Error> {
        Self::with_config(program, SolverConfig::default())
    }

    pub fn with_config(program: LinearProgram, config: SolverConfig) -> Result<Self, Error> {
        config.validate()?;
        let tableau = Tableau::with_epsilon(program, config.epsilon)?;
        let mut simplex = Self {
            tableau,
            config,
            history: VecDeque::new(),
            alternates: Vec::new(),
            visited: HashSet::new(),
            iterations: 0,
            degenerate_pivots: 0,
            status: Status::Work,
        };
        simplex.record();
        Ok(simplex)
    }

    /// Runs one iteration and returns the status it ended with. Once the run has finished this
    /// does nothing.
    pub fn step(&mut self) -> Status {
        if !self.status.is_work() {
            return self.status;
        }
        log::info!("Iteration {}", self.iterations + 1);

        self.tableau.calculate_cj_zj();
        match self.tableau.evaluate() {
            Status::Work => {}
            Status::AlternateOptimal => {
                if !self.visited.insert(self.tableau.basis_indices()) {
                    log::info!("Basis {:?} was already reported", self.tableau.basis_indices());
                    return self.finish(Status::AlternateOptimal);
                }
                let report = self.tableau.report(true);
                log::info!(
                    "Alternate optimum #{}: Z = {}",
                    report.alternates,
                    report.objective_value
                );
                self.alternates.push(report);
                if self.config.alternates.is_stop() {
                    return self.finish(Status::AlternateOptimal);
                }
            }
            // an exploration that runs into a strict optimum still found alternates on the way
            Status::Done if !self.alternates.is_empty() => {
                return self.finish(Status::AlternateOptimal)
            }
            status => return self.finish(status),
        }

        if self.iterations >= self.config.max_iterations {
            log::warn!(
                "Stopped after {} iterations without reaching an optimum",
                self.iterations
            );
            return self.finish(Status::Cyclic);
        }

        match self.tableau.ratio_test() {
            Status::NoFrontier if !self.alternates.is_empty() => {
                return self.finish(Status::AlternateOptimal)
            }
            Status::NoFrontier => return self.finish(Status::NoFrontier),
            Status::Degenerate => {
                self.degenerate_pivots += 1;
                if self.config.degeneracy.is_stop() {
                    return self.finish(Status::Degenerate);
                }
                log::warn!(
                    "Degenerate pivot on line {}",
                    self.tableau.pivot_line() + 1
                );
            }
            _ => {}
        }

        self.tableau.pivot();
        self.tableau.reduce();
        self.iterations += 1;
        self.record();
        self.status
    }

    /// Iterates until the run finishes.
    pub fn run(&mut self) -> Status {
        while self.status.is_work() {
            self.step();
        }
        self.status
    }

    /// Report of the current tableau, labelled with the driver's status.
    pub fn report(&mut self) -> Report {
        self.tableau.calculate_cj_zj();
        self.tableau.set_status(self.status);
        self.tableau.report(false)
    }

    pub fn solve(mut self) -> SolutionResult {
        self.run();
        let report = self.report();
        log::info!("Finished with {} after {} iteration(s)", report.status, self.iterations);
        Solution::try_from(report)
    }

    fn finish(&mut self, status: Status) -> Status {
        self.status = status;
        self.tableau.set_status(status);
        log::info!("Status: {status}");
        status
    }

    fn record(&mut self) {
        if self.config.history_limit == 0 {
            return;
        }
        while self.history.len() >= self.config.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(self.tableau.clone());
    }

    pub fn tableau(&self) -> &Tableau {
        &self.tableau
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Tableau snapshots, oldest first. The first one is the initial tableau until it is pushed
    /// out by the history limit.
    pub fn history(&self) -> impl Iterator<Item = &Tableau> {
        self.history.iter()
    }

    /// Reports of every distinct alternate optimum met so far.
    pub fn alternates(&self) -> &[Report] {
        &self.alternates
    }

    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    pub const fn degenerate_pivots(&self) -> usize {
        self.degenerate_pivots
    }

    pub const fn status(&self) -> Status {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use extended_number::ExtendedNumber;
    use nalgebra::DVector;
    use num_traits::Zero;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::simplex::{AlternatePolicy, DegeneracyPolicy, Relation, SolutionError};

    fn production() -> LinearProgram {
        LinearProgram::maximize([2., 3.])
            .with_restriction([1., 1.], Relation::LessEqual, 4.)
            .with_restriction([1., 2.], Relation::LessEqual, 5.)
    }

    fn tied() -> LinearProgram {
        LinearProgram::maximize([1., 0.])
            .with_restriction([1., 0.], Relation::LessEqual, 2.)
            .with_restriction([1., 1.], Relation::LessEqual, 2.)
    }

    fn flat() -> LinearProgram {
        LinearProgram::maximize([1., 1.]).with_restriction([1., 1.], Relation::LessEqual, 4.)
    }

    fn assert_invariants(tableau: &Tableau) {
        let m = tableau.restriction_count();
        for i in 0..m {
            assert!(tableau.rhs(i).real() >= -1e-9, "rhs of row {} went negative", i + 1);
        }
        let indices = tableau.basis_indices();
        assert_eq!(indices.iter().collect::<HashSet<_>>().len(), m);
    }

    #[test]
    fn production_plan() {
        let mut simplex = Simplex::new(production()).unwrap();

        assert_eq!(simplex.step(), Status::Work);
        assert_eq!(simplex.run(), Status::Done);
        assert_eq!(simplex.iterations(), 2);
        assert_eq!(simplex.step(), Status::Done);
        assert_eq!(simplex.history().count(), 3);
        simplex.history().for_each(assert_invariants);

        let report = simplex.report();
        assert_eq!(report.status, Status::Done);
        assert_eq!(report.objective_value, ExtendedNumber::from(9.));

        assert_eq!(
            simplex.solve(),
            Ok(Solution {
                variables: DVector::from_vec(vec![3., 1.]),
                function_value: 9.,
                alternates: 0,
            })
        );
    }

    #[test]
    fn infeasible() {
        let program = LinearProgram::maximize([1., 0.])
            .with_restriction([1., 1.], Relation::LessEqual, 2.)
            .with_restriction([1., 1.], Relation::GreaterEqual, 5.);

        assert_eq!(
            Simplex::new(program).unwrap().solve(),
            Err(SolutionError::Absent)
        );
    }

    #[test]
    fn infeasible_with_flat_objective() {
        let rows = |program: LinearProgram| {
            program
                .with_restriction([1., 1.], Relation::LessEqual, 2.)
                .with_restriction([1., 1.], Relation::GreaterEqual, 5.)
        };
        let config = SolverConfig::default().with_alternates(AlternatePolicy::Explore);

        for program in [
            rows(LinearProgram::maximize([0., 0.])),
            rows(LinearProgram::minimize([1., 1.])),
        ] {
            let mut simplex = Simplex::with_config(program, config.clone()).unwrap();

            assert_eq!(simplex.run(), Status::NonViable);
            assert_eq!(simplex.iterations(), 1);
            assert!(simplex.alternates().is_empty());
            assert_eq!(simplex.solve(), Err(SolutionError::Absent));
        }
    }

    #[test]
    fn unbounded() {
        let program =
            LinearProgram::maximize([1., 0.]).with_restriction([1., -1.], Relation::LessEqual, 1.);
        let mut simplex = Simplex::new(program).unwrap();

        assert_eq!(simplex.run(), Status::NoFrontier);
        assert_eq!(simplex.iterations(), 1);
        assert_eq!(simplex.solve(), Err(SolutionError::Infinite));
    }

    #[test]
    fn alternate_optimum_stops_by_default() {
        let mut simplex = Simplex::new(flat()).unwrap();

        assert_eq!(simplex.run(), Status::AlternateOptimal);
        assert_eq!(simplex.alternates().len(), 1);
        assert_eq!(
            simplex.alternates()[0].variables,
            DVector::from_vec(vec![ExtendedNumber::from(4.), ExtendedNumber::ZERO])
        );

        let solution = simplex.solve().unwrap();
        assert_eq!(solution.function_value, 4.);
        assert_eq!(solution.alternates, 1);
    }

    #[test]
    fn alternate_optima_are_explored_until_a_basis_repeats() {
        let config = SolverConfig::default().with_alternates(AlternatePolicy::Explore);
        let mut simplex = Simplex::with_config(flat(), config).unwrap();

        assert_eq!(simplex.run(), Status::AlternateOptimal);
        assert_eq!(simplex.iterations(), 3);
        assert_eq!(
            simplex
                .alternates()
                .iter()
                .map(|report| report.variables.clone())
                .collect::<Vec<_>>(),
            vec![
                DVector::from_vec(vec![ExtendedNumber::from(4.), ExtendedNumber::ZERO]),
                DVector::from_vec(vec![ExtendedNumber::ZERO, ExtendedNumber::from(4.)]),
            ]
        );
        assert!(simplex
            .alternates()
            .iter()
            .all(|report| report.objective_value == ExtendedNumber::from(4.)));
        assert_eq!(simplex.solve().map(|solution| solution.alternates), Ok(2));
    }

    #[test]
    fn degenerate_pivot_continues_by_default() {
        let mut simplex = Simplex::new(tied()).unwrap();

        assert_eq!(simplex.run(), Status::AlternateOptimal);
        assert_eq!(simplex.degenerate_pivots(), 1);

        let solution = simplex.solve().unwrap();
        assert_eq!(solution.variables, DVector::from_vec(vec![2., 0.]));
        assert_eq!(solution.function_value, 2.);
    }

    #[test]
    fn degenerate_pivot_can_stop() {
        let config = SolverConfig::default().with_degeneracy(DegeneracyPolicy::Stop);
        let mut simplex = Simplex::with_config(tied(), config).unwrap();

        assert_eq!(simplex.run(), Status::Degenerate);
        assert_eq!(simplex.iterations(), 0);
        assert_eq!(simplex.solve(), Err(SolutionError::Degenerate));
    }

    #[test]
    fn iteration_cap_is_cyclic() {
        let config = SolverConfig::default().with_max_iterations(1);
        let mut simplex = Simplex::with_config(production(), config).unwrap();

        assert_eq!(simplex.run(), Status::Cyclic);
        assert_eq!(simplex.iterations(), 1);
        assert_eq!(simplex.report().status, Status::Cyclic);
        assert_eq!(simplex.solve(), Err(SolutionError::Cyclic));
    }

    #[test]
    fn history_is_bounded() {
        let config = SolverConfig::default().with_history_limit(2);
        let mut simplex = Simplex::with_config(production(), config).unwrap();
        simplex.run();

        let history = simplex.history().collect::<Vec<_>>();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].basis_indices(), vec![1, 2]);
        assert_eq!(history[0].basis_indices(), vec![3, 2]);

        let config = SolverConfig::default().with_history_limit(0);
        let mut simplex = Simplex::with_config(production(), config).unwrap();
        simplex.run();
        assert_eq!(simplex.history().count(), 0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SolverConfig::default().with_epsilon(f64::NAN);

        assert!(matches!(
            Simplex::with_config(production(), config),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            Simplex::new(LinearProgram::maximize([1.])),
            Err(Error::Problem { .. })
        ));
    }

    fn feasible_program() -> impl Strategy<Value = LinearProgram> {
        (1usize..4, 1usize..4).prop_flat_map(|(variables, restrictions)| {
            (
                prop::collection::vec(0u8..10, variables),
                prop::collection::vec(
                    (prop::collection::vec(1u8..10, variables), 1u8..20),
                    restrictions,
                ),
            )
                .prop_map(|(objective, rows)| {
                    rows.into_iter().fold(
                        LinearProgram::maximize(objective.into_iter().map(f64::from)),
                        |program, (coefficients, rhs)| {
                            program.with_restriction(
                                coefficients.into_iter().map(f64::from),
                                Relation::LessEqual,
                                f64::from(rhs),
                            )
                        },
                    )
                })
        })
    }

    fn relation() -> impl Strategy<Value = Relation> {
        prop_oneof![
            Just(Relation::LessEqual),
            Just(Relation::GreaterEqual),
            Just(Relation::Equal),
        ]
    }

    fn mixed_program() -> impl Strategy<Value = LinearProgram> {
        (1usize..4, 1usize..4, any::<bool>()).prop_flat_map(|(variables, restrictions, minimize)| {
            (
                prop::collection::vec(-5i8..6, variables),
                prop::collection::vec(
                    (prop::collection::vec(-5i8..6, variables), relation(), -10i8..11),
                    restrictions,
                ),
            )
                .prop_map(move |(objective, rows)| {
                    let objective = objective.into_iter().map(f64::from);
                    let program = if minimize {
                        LinearProgram::minimize(objective)
                    } else {
                        LinearProgram::maximize(objective)
                    };
                    rows.into_iter().fold(program, |program, (coefficients, relation, rhs)| {
                        program.with_restriction(
                            coefficients.into_iter().map(f64::from),
                            relation,
                            f64::from(rhs),
                        )
                    })
                })
        })
    }

    proptest! {
        #[test]
        fn optima_never_keep_an_artificial_in_the_basis(program in mixed_program()) {
            let mut simplex = Simplex::new(program).unwrap();
            assert_invariants(simplex.tableau());

            while simplex.step().is_work() {
                assert_invariants(simplex.tableau());
            }

            let status = simplex.status();
            prop_assert!(!status.is_work());
            if status.is_done() || status.is_alternate_optimal() {
                let tableau = simplex.tableau();
                let penalized = tableau.basis().iter().enumerate().any(|(i, entry)| {
                    entry.objective_coefficient.has_penalty() && !tableau.rhs(i).is_zero()
                });
                prop_assert!(!penalized, "{status} with basis {:?}", tableau.basis_indices());
                prop_assert!(!simplex.report().objective_value.has_penalty());
            }
            if status.is_done() {
                let tableau = simplex.tableau();
                for (j, value) in tableau.cj_zj().iter().enumerate() {
                    prop_assert!(tableau.is_basic(j) || *value <= ExtendedNumber::ZERO);
                }
            }
        }

        #[test]
        fn bounded_feasible_programs_reach_an_optimum(program in feasible_program()) {
            let mut simplex = Simplex::new(program).unwrap();
            assert_invariants(simplex.tableau());

            while simplex.step().is_work() {
                assert_invariants(simplex.tableau());
            }

            let status = simplex.status();
            prop_assert!(!status.is_no_frontier() && !status.is_non_viable(), "{status}");
            if status.is_done() {
                let tableau = simplex.tableau();
                for (j, value) in tableau.cj_zj().iter().enumerate() {
                    prop_assert!(tableau.is_basic(j) || *value <= ExtendedNumber::ZERO);
                }
            }
            let report = simplex.report();
            prop_assert!(!report.objective_value.has_penalty());
            prop_assert!(report.objective_value.real() >= 0.);
        }

        #[test]
        fn evaluate_is_idempotent(program in mixed_program()) {
            let mut tableau = Tableau::new(program).unwrap();
            tableau.calculate_cj_zj();
            let status = tableau.evaluate();
            let column = tableau.pivot_column();

            prop_assert_eq!(tableau.evaluate(), status);
            prop_assert_eq!(tableau.pivot_column(), column);
        }
    }
}
