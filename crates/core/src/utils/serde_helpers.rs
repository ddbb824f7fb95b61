//! Serde helpers for forgiving enum spellings in configuration files

/// Implements case-insensitive deserialization for a fieldless enum.
///
/// Underscores are read as dashes, so `artifact_directory`, `Artifact-Directory`
/// and `artifact-directory` all select the same variant.
///
/// ```ignore
/// impl_case_insensitive_deserialize!(
///     ArchiveFormat,
///     Tar => "tar",
///     Phar => "phar"
/// );
/// ```
#[macro_export]
macro_rules! impl_case_insensitive_deserialize {
    ($enum_type:ty, $($variant:ident => $str_val:expr),+ $(,)?) => {
        impl<'de> serde::Deserialize<'de> for $enum_type {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = <::std::string::String as serde::Deserialize>::deserialize(deserializer)?;
                match s.to_lowercase().replace('_', "-").as_str() {
                    $(
                        $str_val => Ok(Self::$variant),
                    )+
                    _ => Err(serde::de::Error::custom(format!(
                        "unknown variant '{}', expected one of: {}",
                        s,
                        [$($str_val),+].join(", ")
                    ))),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Mode {
        ExternalPackageManager,
        ArtifactDirectory,
    }

    impl_case_insensitive_deserialize!(
        Mode,
        ExternalPackageManager => "external-package-manager",
        ArtifactDirectory => "artifact-directory"
    );

    #[test]
    fn test_spellings_are_normalized() {
        for raw in [
            r#""artifact-directory""#,
            r#""ARTIFACT_DIRECTORY""#,
            r#""Artifact-Directory""#,
        ] {
            let mode: Mode = serde_json::from_str(raw).unwrap();
            assert_eq!(mode, Mode::ArtifactDirectory);
        }
    }

    #[test]
    fn test_unknown_variant_lists_choices() {
        let err = serde_json::from_str::<Mode>(r#""maven""#).unwrap_err().to_string();
        assert!(err.contains("unknown variant 'maven'"));
        assert!(err.contains("external-package-manager, artifact-directory"));
    }
}
