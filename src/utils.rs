use crate::errors::DecisionTreeError;

/// Create a string of all available items.
pub fn items_to_strings(items: Vec<&str>) -> String {
    items.join(", ")
}

// Validation
pub fn validate_positive_float_parameter(value: f64, parameter: &str) -> Result<(), DecisionTreeError> {
    validate_float_parameter(value, 0.0, f64::INFINITY, parameter)
}

pub fn validate_float_parameter(value: f64, min: f64, max: f64, parameter: &str) -> Result<(), DecisionTreeError> {
    if !value.is_finite() || value < min || max < value {
        let ex_msg = format!("real value within range {} and {}", min, max);
        Err(DecisionTreeError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

pub fn validate_nonzero_parameter(value: usize, parameter: &str) -> Result<(), DecisionTreeError> {
    if value == 0 {
        Err(DecisionTreeError::InvalidParameter(
            parameter.to_string(),
            "a value of at least 1".to_string(),
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_float() {
        assert!(validate_positive_float_parameter(0.001, "min_info_gain").is_ok());
        assert!(validate_positive_float_parameter(0.0, "min_info_gain").is_ok());
        assert!(validate_positive_float_parameter(-0.5, "min_info_gain").is_err());
        assert!(validate_positive_float_parameter(f64::NAN, "min_info_gain").is_err());
        assert!(validate_positive_float_parameter(f64::INFINITY, "min_info_gain").is_err());
        let err = validate_float_parameter(2.0, 0.0, 1.0, "p").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid parameter value passed for p, expected real value within range 0 and 1 but 2 provided."
        );
    }

    #[test]
    fn test_validate_nonzero() {
        assert!(validate_nonzero_parameter(4, "num_workers").is_ok());
        assert!(validate_nonzero_parameter(0, "num_workers").is_err());
    }

    #[test]
    fn test_items_to_strings() {
        assert_eq!(items_to_strings(vec!["a", "b"]), "a, b");
    }
}
