//! Feature map files.
//!
//! One line per feature: `<index> <name> <type-code>`, where the type code is
//! `q` for quantitative and `i` for indicator features. The native model dump
//! reads the same format to print feature names instead of `f<index>`.

use std::fs;
use std::path::Path;

use crate::core::error::{Result, XGBoostError};
use crate::core::types::{Feature, FeatureType};

/// Fails for names the whitespace separated format cannot hold.
pub fn check_feature_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(XGBoostError::feature(format!(
            "Feature name {name:?} must be non-empty and contain no whitespace"
        )));
    }
    Ok(())
}

/// Render features as feature map text.
pub fn format_feature_map(features: &[Feature]) -> String {
    features
        .iter()
        .enumerate()
        .map(|(index, feature)| format!("{} {} {}", index, feature.name, feature.feature_type.code()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse feature map text. Empty lines are skipped.
pub fn parse_feature_map(text: &str) -> Result<Vec<Feature>> {
    let mut features = Vec::new();

    for (number, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(XGBoostError::feature(format!(
                "Invalid feature map line {}: expected \"<index> <name> <type>\", got {:?}",
                number + 1,
                line
            )));
        }

        let feature_type = fields[2].parse::<FeatureType>().map_err(|err| {
            XGBoostError::feature(format!("Invalid feature map line {}: {}", number + 1, err))
        })?;
        features.push(Feature::new(fields[1], feature_type));
    }

    Ok(features)
}

/// Write features to a feature map file.
pub fn save_feature_map<P: AsRef<Path>>(features: &[Feature], path: P) -> Result<()> {
    let path = path.as_ref();
    for feature in features {
        check_feature_name(&feature.name)?;
    }
    fs::write(path, format_feature_map(features))?;
    log::debug!("Saved {} features to {}", features.len(), path.display());
    Ok(())
}

/// Read features from a feature map file.
pub fn load_feature_map<P: AsRef<Path>>(path: P) -> Result<Vec<Feature>> {
    let text = fs::read_to_string(path.as_ref())?;
    parse_feature_map(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format() {
        let features = vec![Feature::quantitative("age"), Feature::indicator("is_member")];
        assert_eq!(format_feature_map(&features), "0 age q\n1 is_member i");
        assert_eq!(format_feature_map(&[]), "");
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let features = parse_feature_map("0 x q\n\n1 y i\n").unwrap();
        assert_eq!(features, vec![Feature::quantitative("x"), Feature::indicator("y")]);
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        let err = parse_feature_map("0 x q\n1 y int").unwrap_err();
        assert_eq!(err.category(), "feature");
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_rejects_short_line() {
        let err = parse_feature_map("0 x").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("features.fmap");
        let features = vec![Feature::quantitative("x"), Feature::quantitative("y")];

        save_feature_map(&features, &path).unwrap();
        assert_eq!(load_feature_map(&path).unwrap(), features);
    }

    #[test]
    fn test_whitespace_names_are_not_saved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("features.fmap");

        for name in ["a b", "tab\tname", ""] {
            let features = vec![Feature::quantitative(name)];
            let err = save_feature_map(&features, &path).unwrap_err();
            assert_eq!(err.category(), "feature", "{name:?}");
        }
        assert!(!path.exists());

        let features = vec![Feature::quantitative("a_b"), Feature::indicator("c-d")];
        save_feature_map(&features, &path).unwrap();
        assert_eq!(load_feature_map(&path).unwrap(), features);
    }
}
