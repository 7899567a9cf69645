//! 제약 최적화 솔버.
//!
//! 박스 제약이 있는 단체(simplex) `{ Σw = 1, lower ≤ w ≤ upper }` 위에서
//! 매끄러운 목적함수를 최소화하는 스펙트럴 사영 경사법(SPG)입니다.
//!
//! - 매 스텝마다 [`project_to_bounds`]로 실행 가능 영역에 사영
//! - Barzilai-Borwein 스텝 크기와 비단조 Armijo 백트래킹
//! - 사영 경사가 0이거나, 목적함수 변화가 `function_tolerance` 미만이면서
//!   이동량도 충분히 작으면 수렴
//!
//! 추가 선형 등식 제약(`a·w = b`)은 [`ProjectedGradientSolver::solve_with_equality`]가
//! 증강 라그랑지안 외부 루프로 처리합니다.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::error::{OptimizationError, OptimizationResult};
use crate::linalg::{dot, project_to_bounds};

/// Armijo 충분 감소 계수.
const ARMIJO_C: f64 = 1e-4;
/// 비단조 라인서치가 참조하는 최근 목적함수 값 개수.
const NONMONOTONE_WINDOW: usize = 10;
/// 사영 경사의 무한노름이 이보다 작으면 정류점으로 판단.
const STATIONARITY_TOL: f64 = 1e-10;
/// 라인서치가 더 줄일 스텝을 찾지 못했을 때 허용하는 정류성 오차.
const EXHAUSTED_STATIONARITY_TOL: f64 = 1e-6;
/// 한 스텝 이동량이 이보다 작아야 함수값 기준 수렴을 인정.
const DISPLACEMENT_TOL: f64 = 1e-9;
const MIN_STEP: f64 = 1e-16;
const MIN_SPECTRAL_STEP: f64 = 1e-10;
const MAX_SPECTRAL_STEP: f64 = 1e10;
/// 증강 라그랑지안 외부 반복 한도.
const MAX_OUTER_ITERATIONS: usize = 50;
/// 등식 제약 잔차 허용치.
const EQUALITY_TOL: f64 = 1e-6;
const MAX_PENALTY: f64 = 1e8;

/// 최소화할 목적함수.
pub trait Objective {
    /// 목적함수 값과 경사를 함께 계산합니다.
    fn value_and_gradient(&self, w: &[f64]) -> (f64, Vec<f64>);
}

impl<F> Objective for F
where
    F: Fn(&[f64]) -> (f64, Vec<f64>),
{
    fn value_and_gradient(&self, w: &[f64]) -> (f64, Vec<f64>) {
        self(w)
    }
}

/// 솔버 결과.
#[derive(Debug, Clone)]
pub struct SolverOutcome {
    /// 해
    pub x: Vec<f64>,
    /// 해에서의 목적함수 값
    pub value: f64,
    /// 사용한 반복 횟수
    pub iterations: usize,
}

/// 스펙트럴 사영 경사 솔버.
#[derive(Debug, Clone)]
pub struct ProjectedGradientSolver {
    lower: f64,
    upper: f64,
    max_iterations: usize,
    function_tolerance: f64,
}

impl ProjectedGradientSolver {
    /// 비중 한도와 반복 조건으로 솔버를 생성합니다.
    pub fn new(lower: f64, upper: f64, max_iterations: usize, function_tolerance: f64) -> Self {
        Self {
            lower,
            upper,
            max_iterations,
            function_tolerance,
        }
    }

    fn project(&self, v: &[f64]) -> Vec<f64> {
        project_to_bounds(v, self.lower, self.upper)
    }

    fn feasible(&self, n: usize) -> bool {
        let n = n as f64;
        n * self.lower <= 1.0 + 1e-12 && n * self.upper >= 1.0 - 1e-12
    }

    /// `x0`에서 출발해 목적함수를 최소화합니다.
    pub fn minimize<O: Objective + ?Sized>(
        &self,
        objective: &O,
        x0: &[f64],
    ) -> OptimizationResult<SolverOutcome> {
        let n = x0.len();
        if n == 0 {
            return Err(OptimizationError::EmptyUniverse);
        }
        if !self.feasible(n) {
            return Err(OptimizationError::InvalidInput(format!(
                "bounds [{}, {}] admit no fully invested portfolio of {} assets",
                self.lower, self.upper, n
            )));
        }

        let mut x = self.project(x0);
        let (mut fx, mut grad) = objective.value_and_gradient(&x);
        check_finite(fx, &grad)?;

        let mut spectral_step = 1.0;
        let mut recent = VecDeque::with_capacity(NONMONOTONE_WINDOW);
        recent.push_back(fx);

        for iteration in 0..self.max_iterations {
            let stationary = self.project(&axpy(&x, -1.0, &grad));
            let residual = max_abs_diff(&stationary, &x);
            if residual < STATIONARITY_TOL {
                trace!(iteration, value = fx, "Stationary point reached");
                return Ok(SolverOutcome {
                    x,
                    value: fx,
                    iterations: iteration,
                });
            }

            let direction = sub(&self.project(&axpy(&x, -spectral_step, &grad)), &x);
            let slope = dot(&grad, &direction);
            let reference = recent.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

            // 비단조 Armijo 백트래킹
            let mut lambda = 1.0;
            let (next, f_next, g_next) = loop {
                let y = axpy(&x, lambda, &direction);
                let (fy, gy) = objective.value_and_gradient(&y);
                if fy.is_finite() && fy <= reference + ARMIJO_C * lambda * slope {
                    break (y, fy, gy);
                }
                lambda *= 0.5;
                if lambda < MIN_STEP {
                    trace!(iteration, value = fx, residual, "Line search exhausted");
                    if residual < EXHAUSTED_STATIONARITY_TOL {
                        return Ok(SolverOutcome {
                            x,
                            value: fx,
                            iterations: iteration,
                        });
                    }
                    return Err(OptimizationError::NotConverged {
                        iterations: iteration,
                    });
                }
            };
            check_finite(f_next, &g_next)?;

            let s = sub(&next, &x);
            let y = sub(&g_next, &grad);
            let sy = dot(&s, &y);
            spectral_step = if sy > 0.0 {
                (dot(&s, &s) / sy).clamp(MIN_SPECTRAL_STEP, MAX_SPECTRAL_STEP)
            } else {
                MAX_SPECTRAL_STEP
            };

            let improvement = (fx - f_next).abs();
            let displacement = s.iter().map(|v| v.abs()).fold(0.0, f64::max);

            x = next;
            fx = f_next;
            grad = g_next;
            if recent.len() == NONMONOTONE_WINDOW {
                recent.pop_front();
            }
            recent.push_back(fx);

            if improvement < self.function_tolerance * fx.abs().max(1.0)
                && displacement < DISPLACEMENT_TOL
            {
                return Ok(SolverOutcome {
                    x,
                    value: fx,
                    iterations: iteration + 1,
                });
            }
        }

        Err(OptimizationError::NotConverged {
            iterations: self.max_iterations,
        })
    }

    /// 추가 등식 제약 `a·w = b` 하에서 목적함수를 최소화합니다.
    ///
    /// 외부 루프에서 라그랑주 승수와 벌점 계수를 갱신하고, 내부 문제는
    /// [`minimize`](Self::minimize)로 풉니다. 잔차가 허용치 안으로 들어오지
    /// 않으면 `NotConverged`를 반환합니다.
    pub fn solve_with_equality<O: Objective + ?Sized>(
        &self,
        objective: &O,
        a: &[f64],
        b: f64,
        x0: &[f64],
    ) -> OptimizationResult<SolverOutcome> {
        let mut multiplier = 0.0;
        let mut penalty = 10.0;
        let mut x = x0.to_vec();
        let mut total_iterations = 0;

        for outer in 0..MAX_OUTER_ITERATIONS {
            let augmented = |w: &[f64]| {
                let (f, mut g) = objective.value_and_gradient(w);
                let residual = dot(a, w) - b;
                let coef = multiplier + penalty * residual;
                for (gi, ai) in g.iter_mut().zip(a) {
                    *gi += coef * ai;
                }
                (
                    f + multiplier * residual + 0.5 * penalty * residual * residual,
                    g,
                )
            };

            let inner = self.minimize(&augmented, &x)?;
            total_iterations += inner.iterations;
            x = inner.x;

            let residual = dot(a, &x) - b;
            debug!(outer, residual, penalty, "Augmented Lagrangian step");

            if residual.abs() < EQUALITY_TOL {
                let (value, _) = objective.value_and_gradient(&x);
                return Ok(SolverOutcome {
                    x,
                    value,
                    iterations: total_iterations,
                });
            }

            multiplier += penalty * residual;
            penalty = (penalty * 10.0).min(MAX_PENALTY);
        }

        Err(OptimizationError::NotConverged {
            iterations: total_iterations,
        })
    }
}

fn check_finite(value: f64, grad: &[f64]) -> OptimizationResult<()> {
    if !value.is_finite() || grad.iter().any(|g| !g.is_finite()) {
        return Err(OptimizationError::NumericalInstability(
            "objective or gradient is not finite".into(),
        ));
    }
    Ok(())
}

/// x + alpha * y
fn axpy(x: &[f64], alpha: f64, y: &[f64]) -> Vec<f64> {
    x.iter().zip(y).map(|(xi, yi)| xi + alpha * yi).collect()
}

fn sub(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Σ(w_i - t_i)²
    fn distance_to(target: Vec<f64>) -> impl Fn(&[f64]) -> (f64, Vec<f64>) {
        move |w: &[f64]| {
            let diff: Vec<f64> = w.iter().zip(&target).map(|(a, b)| a - b).collect();
            (
                diff.iter().map(|d| d * d).sum(),
                diff.iter().map(|d| 2.0 * d).collect(),
            )
        }
    }

    #[test]
    fn test_unconstrained_target_inside_simplex() {
        let solver = ProjectedGradientSolver::new(0.0, 1.0, 1000, 1e-12);
        let outcome = solver
            .minimize(&distance_to(vec![0.5, 0.3, 0.2]), &[1.0 / 3.0; 3])
            .unwrap();

        assert!((outcome.x[0] - 0.5).abs() < 1e-6);
        assert!((outcome.x[1] - 0.3).abs() < 1e-6);
        assert!((outcome.x[2] - 0.2).abs() < 1e-6);
        assert!(outcome.value < 1e-10);
    }

    #[test]
    fn test_upper_bound_binds() {
        let solver = ProjectedGradientSolver::new(0.0, 0.4, 1000, 1e-12);
        let outcome = solver
            .minimize(&distance_to(vec![0.9, 0.05, 0.05]), &[1.0 / 3.0; 3])
            .unwrap();

        let sum: f64 = outcome.x.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!((outcome.x[0] - 0.4).abs() < 1e-6);
        assert!((outcome.x[1] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_infeasible_bounds_rejected() {
        let solver = ProjectedGradientSolver::new(0.0, 0.25, 1000, 1e-9);
        let err = solver
            .minimize(&distance_to(vec![0.5, 0.5]), &[0.5, 0.5])
            .unwrap_err();
        assert!(matches!(err, OptimizationError::InvalidInput(_)));
    }

    #[test]
    fn test_non_finite_objective() {
        let solver = ProjectedGradientSolver::new(0.0, 1.0, 100, 1e-9);
        let nan = |w: &[f64]| (f64::NAN, vec![0.0; w.len()]);
        let err = solver.minimize(&nan, &[0.5, 0.5]).unwrap_err();
        assert!(matches!(err, OptimizationError::NumericalInstability(_)));
    }

    #[test]
    fn test_stalled_line_search_is_not_converged() {
        // 시작점 밖에서는 목적함수가 정의되지 않아 스텝을 받아들일 수 없음
        let calls = std::cell::Cell::new(0usize);
        let stalled = |_: &[f64]| {
            calls.set(calls.get() + 1);
            let value = if calls.get() == 1 { 0.0 } else { f64::NAN };
            (value, vec![1.0, -1.0, 0.0])
        };

        let solver = ProjectedGradientSolver::new(0.0, 1.0, 100, 1e-9);
        let err = solver.minimize(&stalled, &[1.0 / 3.0; 3]).unwrap_err();
        assert!(matches!(err, OptimizationError::NotConverged { iterations: 0 }));
    }

    #[test]
    fn test_equality_constraint() {
        // 분산 최소화 + 기대수익 0.12 고정
        let variances = [0.04, 0.09, 0.16];
        let objective = move |w: &[f64]| {
            let value = w.iter().zip(&variances).map(|(wi, v)| wi * wi * v).sum();
            let grad = w.iter().zip(&variances).map(|(wi, v)| 2.0 * wi * v).collect();
            (value, grad)
        };
        let mu = [0.05, 0.10, 0.20];

        let solver = ProjectedGradientSolver::new(0.0, 1.0, 1000, 1e-12);
        let outcome = solver
            .solve_with_equality(&objective, &mu, 0.12, &[1.0 / 3.0; 3])
            .unwrap();

        let sum: f64 = outcome.x.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!((dot(&mu, &outcome.x) - 0.12).abs() < 1e-6);
    }

    #[test]
    fn test_unreachable_equality_target() {
        let objective = |w: &[f64]| (dot(w, w), w.iter().map(|x| 2.0 * x).collect());
        let solver = ProjectedGradientSolver::new(0.0, 0.5, 1000, 1e-12);

        // 두 자산 최대 50%씩이면 기대수익 0.3은 불가능
        let err = solver
            .solve_with_equality(&objective, &[0.1, 0.2], 0.3, &[0.5, 0.5])
            .unwrap_err();
        assert!(matches!(err, OptimizationError::NotConverged { .. }));
    }
}
