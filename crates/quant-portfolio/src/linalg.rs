//! 최적화에 쓰는 소규모 벡터/통계 연산.

/// 내적.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// 산술 평균. 빈 슬라이스는 0.
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// 모표준편차 (ddof=0).
pub fn population_std(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let m = mean(xs);
    let var = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64;
    var.sqrt()
}

/// 표본표준편차 (ddof=1). 관측치가 2개 미만이면 None.
pub fn sample_std(xs: &[f64]) -> Option<f64> {
    if xs.len() < 2 {
        return None;
    }
    let m = mean(xs);
    let var = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
    Some(var.sqrt())
}

/// Pearson 상관계수.
///
/// 길이가 다르거나 2개 미만이거나 어느 한쪽 분산이 0이면 None.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }

    let mean_x = mean(x);
    let mean_y = mean(y);

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;

    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }

    // 부동소수 오차로 ±1을 살짝 넘는 경우 방지
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// 합이 1이 되도록 정규화합니다. 합이 0 이하이거나 유한하지 않으면 None.
pub fn normalize(weights: &[f64]) -> Option<Vec<f64>> {
    let total: f64 = weights.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return None;
    }
    Some(weights.iter().map(|w| w / total).collect())
}

/// 균등 비중 벡터.
pub fn equal_weights(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}

/// `{ Σw = 1, lower ≤ w ≤ upper }` 위로의 유클리드 사영.
///
/// `clamp(v - τ, lower, upper)`의 합이 1이 되는 τ를 이분법으로 찾습니다.
/// 호출자는 `n * lower ≤ 1 ≤ n * upper`를 보장해야 합니다.
pub fn project_to_bounds(v: &[f64], lower: f64, upper: f64) -> Vec<f64> {
    if v.is_empty() {
        return Vec::new();
    }

    let clamped_sum =
        |tau: f64| -> f64 { v.iter().map(|x| (x - tau).clamp(lower, upper)).sum() };

    let max_v = v.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min_v = v.iter().cloned().fold(f64::INFINITY, f64::min);

    // lo에서는 모두 upper, hi에서는 모두 lower
    let mut lo = min_v - upper;
    let mut hi = max_v - lower;

    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if clamped_sum(mid) > 1.0 {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-15 {
            break;
        }
    }

    let tau = 0.5 * (lo + hi);
    v.iter().map(|x| (x - tau).clamp(lower, upper)).collect()
}
