use crate::algorithm::Assignment;

/// Within-cluster sum of squared distances.
pub fn calculate_inertia(assignment: &Assignment) -> f64 {
    assignment.squared_distances().iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sums_squared_distances() {
        let assignment = Assignment::new(vec![0, 1, 1], vec![0.25, 1.0, 2.75]).unwrap();
        assert_eq!(calculate_inertia(&assignment), 4.0);
        assert_eq!(calculate_inertia(&Assignment::new(vec![], vec![]).unwrap()), 0.0);
    }
}
