//! Distribution of an asset's output as a reduction across its electricity demand.
//!
//! The output is shared out evenly between all energy types which still have demand. An energy
//! type whose demand is smaller than its share is zeroed and removed from the worklist, and the
//! part of the share it could not absorb (the "excess") is shared out between the remaining
//! energy types in the next round. This repeats until the output is used up or no demand is left.
use crate::demand::{CarrierSplitSummary, ReducedSummary};
use crate::id::EnergyTypeID;
use crate::units::{Dimensionless, Energy, TOLERANCE};
use float_cmp::approx_eq;
use indexmap::IndexMap;
use itertools::Itertools;
use log::trace;

/// Demand for each component (energy type)
pub type ComponentDemand = IndexMap<EnergyTypeID, Energy>;

/// A record of one round of the distribution
#[derive(Debug, Clone, PartialEq)]
pub struct ReductionRound {
    /// The reduction allotted to each component still in the worklist
    pub share: Energy,
    /// Components whose demand was no greater than the share and so were zeroed
    pub absorbed: Vec<EnergyTypeID>,
    /// The part of the absorbed components' shares they could not use
    pub excess: Energy,
}

/// The result of distributing output across a set of components
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    /// Demand for each component after the reduction
    pub demand: ComponentDemand,
    /// The rounds which were needed, in order
    pub rounds: Vec<ReductionRound>,
}

impl Reduction {
    /// Total demand remaining after the reduction
    pub fn total(&self) -> Energy {
        self.demand.values().copied().sum()
    }
}

/// Whether `demand` can be fully absorbed by `share`
fn is_absorbed(demand: Energy, share: Energy) -> bool {
    demand < share || approx_eq!(Energy, demand, share, epsilon = TOLERANCE)
}

/// Share `output` out as a reduction across `demand`.
///
/// The total reduction applied is `min(output, sum(demand))`. Components are visited in the
/// map's order, which only affects intermediate rounding. No component ever drops below zero.
pub fn distribute_reduction(demand: &ComponentDemand, output: Energy) -> Reduction {
    let mut reduced = demand.clone();
    let mut rounds = Vec::new();

    let mut remaining: Vec<EnergyTypeID> = demand
        .iter()
        .filter(|(_, value)| value.value() > 0.0)
        .map(|(id, _)| id.clone())
        .collect();
    let total: Energy = demand.values().copied().sum();

    // Undistributed reduction, including excess carried over from the previous round
    let mut pool = output.min(total);

    while pool.value() > TOLERANCE && !remaining.is_empty() {
        let share = pool / Dimensionless(remaining.len() as f64);
        let mut excess = Energy(0.0);
        let mut absorbed = Vec::new();
        let mut next = Vec::with_capacity(remaining.len());

        for id in remaining {
            let value = &mut reduced[&id];
            if is_absorbed(*value, share) {
                excess += share - *value;
                *value = Energy(0.0);
                absorbed.push(id);
            } else {
                *value -= share;
                next.push(id);
            }
        }

        trace!(
            "Reduction round {}: share {share}, absorbed [{}], excess {excess}",
            rounds.len() + 1,
            absorbed.iter().join(", ")
        );

        // If every component was absorbed, there is nothing left to take the excess
        let any_reduced = !next.is_empty();
        rounds.push(ReductionRound {
            share,
            absorbed,
            excess,
        });
        if !any_reduced {
            break;
        }

        remaining = next;
        pool = excess;
    }

    Reduction {
        demand: reduced,
        rounds,
    }
}

/// Offset an asset's electricity demand by its output.
///
/// Non-electricity demand is never offset.
pub fn reduce_summary(summary: &CarrierSplitSummary, output: Energy) -> ReducedSummary {
    let reduction = distribute_reduction(&summary.electricity, output);
    ReducedSummary {
        electricity: reduction.demand,
        non_electricity: summary.non_electricity,
    }
}
