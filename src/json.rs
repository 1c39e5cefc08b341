//! JSON request/response types for hosting the solver behind some future
//! network boundary. Building that boundary (HTTP listener, CORS, task
//! queue) is out of scope here -- this module stops at deserialize / solve
//! / serialize.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::SolverError;
use crate::rule::Rule;
use crate::solve::solve;
use crate::tally::MinePrevalence;

/// Tag used for the aggregate "every other cell" entry in a solved board,
/// matching the rename `handle_request` performs on the empty-string tag.
pub const OTHER_TAG: &str = "_other";

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRule {
    pub num_mines: usize,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolveRequest {
    pub rules: Vec<JsonRule>,
    #[serde(default)]
    pub mine_prob: Option<f64>,
    #[serde(default)]
    pub total_cells: Option<usize>,
    #[serde(default)]
    pub total_mines: Option<usize>,
}

impl SolveRequest {
    pub fn prevalence(&self) -> Result<MinePrevalence, SolverError> {
        if let Some(p) = self.mine_prob {
            MinePrevalence::probability(p)
        } else {
            let total_cells = self.total_cells.ok_or_else(|| {
                SolverError::InvalidArgument(
                    "request must supply either mine_prob or total_cells/total_mines".to_string(),
                )
            })?;
            let total_mines = self.total_mines.ok_or_else(|| {
                SolverError::InvalidArgument(
                    "request must supply either mine_prob or total_cells/total_mines".to_string(),
                )
            })?;
            Ok(MinePrevalence::discrete(total_cells, total_mines))
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SolveResponse {
    pub solution: Option<HashMap<String, f64>>,
}

/// Solve a request, reporting any failure as an absent `solution` rather
/// than propagating it -- this is a thin convenience for a JSON-speaking
/// host, which decides for itself how to report an error to its caller.
pub fn solve_json(request: &SolveRequest) -> SolveResponse {
    let prevalence = match request.prevalence() {
        Ok(p) => p,
        Err(_) => return SolveResponse { solution: None },
    };

    let rules: Vec<Rule<String>> = request
        .rules
        .iter()
        .map(|r| Rule::new(r.num_mines, r.cells.iter().cloned()))
        .collect();

    match solve(&rules, &prevalence, OTHER_TAG.to_string()) {
        Ok(solution) => SolveResponse {
            solution: Some(solution),
        },
        Err(_) => SolveResponse { solution: None },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_a_simple_request() {
        let request: SolveRequest = serde_json::from_str(
            r#"{"rules": [{"num_mines": 1, "cells": ["a", "b"]}], "mine_prob": 0.2}"#,
        )
        .unwrap();
        let response = solve_json(&request);
        let solution = response.solution.unwrap();
        assert!((solution["a"] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn missing_prevalence_yields_no_solution() {
        let request: SolveRequest =
            serde_json::from_str(r#"{"rules": [{"num_mines": 1, "cells": ["a", "b"]}]}"#).unwrap();
        let response = solve_json(&request);
        assert!(response.solution.is_none());
    }
}
