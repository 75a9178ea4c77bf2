use crate::utils::error::{ExporterError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(ExporterError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ExporterError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(ExporterError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// Bucket boundaries must be finite and strictly increasing.
pub fn validate_bucket_boundaries(field_name: &str, bounds: &[f64]) -> Result<()> {
    if let Some(bad) = bounds.iter().find(|b| !b.is_finite()) {
        return Err(ExporterError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: bad.to_string(),
            reason: "Boundaries must be finite numbers".to_string(),
        });
    }
    for pair in bounds.windows(2) {
        if pair[0] >= pair[1] {
            return Err(ExporterError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: format!("{:?}", bounds),
                reason: format!(
                    "Boundaries must be strictly increasing ({} >= {})",
                    pair[0], pair[1]
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("iterations", 5, 1).is_ok());
        assert!(validate_positive_number("iterations", 0, 1).is_err());
    }

    #[test]
    fn test_validate_non_empty_string() {
        assert!(validate_non_empty_string("span_name", "ExampleStatsExporter").is_ok());
        assert!(validate_non_empty_string("span_name", "   ").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("max_latency_ms", 20, 1, 60_000).is_ok());
        assert!(validate_range("max_latency_ms", 0, 1, 60_000).is_err());
    }

    #[test]
    fn test_validate_bucket_boundaries() {
        assert!(validate_bucket_boundaries("views.latency_buckets", &[0.0, 5.0, 10.0]).is_ok());
        assert!(validate_bucket_boundaries("views.latency_buckets", &[]).is_ok());
        assert!(validate_bucket_boundaries("views.latency_buckets", &[5.0, 5.0]).is_err());
        assert!(validate_bucket_boundaries("views.latency_buckets", &[10.0, 5.0]).is_err());
        assert!(validate_bucket_boundaries("views.latency_buckets", &[f64::NAN]).is_err());
    }
}
